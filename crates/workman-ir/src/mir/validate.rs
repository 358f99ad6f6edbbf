//! Structural validation for MIR programs.
//!
//! Checks the invariants back ends rely on: dense 0-based tags,
//! resolvable block labels, single-assignment destinations (modulo the
//! loop rebinding exception), and definition-before-use for variable
//! operands. Run by tests and by the pipeline in debug builds.

use std::collections::HashSet;

use super::{BasicBlock, Function, Inst, InstKind, MirProgram, Terminator, Value};
use crate::IrError;

pub fn validate(program: &MirProgram) -> Result<(), Vec<IrError>> {
    let mut errors = Vec::new();

    for table in &program.tag_tables {
        for (i, ctor) in table.constructors.iter().enumerate() {
            if ctor.tag != i as u32 {
                errors.push(IrError::TagNotDense {
                    type_name: table.type_name.clone(),
                    ctor: ctor.name.clone(),
                    tag: ctor.tag,
                    expected: i as u32,
                });
            }
        }
    }

    for fun in &program.functions {
        validate_function(fun, &program.functions, &mut errors);
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

fn validate_function(fun: &Function, all: &[Function], errors: &mut Vec<IrError>) {
    let labels: HashSet<_> = fun.blocks.iter().map(|b| b.label).collect();
    for block in &fun.blocks {
        check_terminator_targets(fun, block, &labels, errors);
    }

    // Definitions accumulate in block order; the emitter only produces
    // forward control flow plus the single loop back-edge, so linear
    // accumulation is a sound dominance approximation.
    let mut defined: HashSet<String> = fun.params.iter().cloned().collect();
    for other in all {
        defined.insert(other.name.clone());
    }
    for native in super::RUNTIME_BINDINGS {
        defined.insert((*native).to_string());
    }
    let mut assigned: HashSet<String> = HashSet::new();

    for block in &fun.blocks {
        for inst in &block.instrs {
            check_inst(fun, inst, &mut defined, &mut assigned, errors);
        }
        match &block.terminator {
            Terminator::Return(v) | Terminator::Switch { value: v, .. } => {
                check_value(fun, v, &defined, errors);
            }
            Terminator::Branch(_) => {}
        }
    }
}

fn check_terminator_targets(
    fun: &Function,
    block: &BasicBlock,
    labels: &HashSet<super::BlockLabel>,
    errors: &mut Vec<IrError>,
) {
    let mut check = |label: super::BlockLabel| {
        if !labels.contains(&label) {
            errors.push(IrError::UnknownBlock {
                function: fun.name.clone(),
                label,
            });
        }
    };
    match &block.terminator {
        Terminator::Return(_) => {}
        Terminator::Branch(target) => check(*target),
        Terminator::Switch { cases, default, .. } => {
            for case in cases {
                check(case.target);
            }
            if let Some(d) = default {
                check(*d);
            }
        }
    }
}

fn check_inst(
    fun: &Function,
    inst: &Inst,
    defined: &mut HashSet<String>,
    assigned: &mut HashSet<String>,
    errors: &mut Vec<IrError>,
) {
    match &inst.kind {
        InstKind::Rebind(v) => {
            check_value(fun, v, defined, errors);
            if !fun.is_self_recursive || !fun.params.contains(&inst.dst) {
                errors.push(IrError::RebindOutsideLoop {
                    function: fun.name.clone(),
                    name: inst.dst.clone(),
                });
            }
            // Rebinds don't count as fresh assignments.
            return;
        }
        InstKind::Const(_) => {}
        InstKind::Prim { args, .. } | InstKind::MakeTuple(args) => {
            for v in args {
                check_value(fun, v, defined, errors);
            }
        }
        InstKind::GetTuple { tuple: v, .. }
        | InstKind::GetTag(v)
        | InstKind::GetField { value: v, .. } => check_value(fun, v, defined, errors),
        InstKind::MakeClosure { env, .. } => {
            for v in env {
                check_value(fun, v, defined, errors);
            }
        }
        InstKind::Call { fun: callee, args } => {
            check_value(fun, callee, defined, errors);
            for v in args {
                check_value(fun, v, defined, errors);
            }
        }
        InstKind::AllocCtor { fields, .. } => {
            for v in fields {
                check_value(fun, v, defined, errors);
            }
        }
        InstKind::IfElse {
            cond,
            then_body,
            then_result,
            else_body,
            else_result,
        } => {
            check_value(fun, cond, defined, errors);
            let mut then_defined = defined.clone();
            for i in then_body {
                check_inst(fun, i, &mut then_defined, assigned, errors);
            }
            check_value(fun, then_result, &then_defined, errors);
            let mut else_defined = defined.clone();
            for i in else_body {
                check_inst(fun, i, &mut else_defined, assigned, errors);
            }
            check_value(fun, else_result, &else_defined, errors);
        }
    }

    if !assigned.insert(inst.dst.clone()) {
        errors.push(IrError::Reassignment {
            function: fun.name.clone(),
            name: inst.dst.clone(),
        });
    }
    defined.insert(inst.dst.clone());
}

fn check_value(fun: &Function, v: &Value, defined: &HashSet<String>, errors: &mut Vec<IrError>) {
    if let Value::Var(name) = v {
        if !defined.contains(name) {
            errors.push(IrError::UndefinedValue {
                function: fun.name.clone(),
                name: name.clone(),
            });
        }
    }
}
