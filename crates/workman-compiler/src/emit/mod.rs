//! MIR lowering: Core IR to basic blocks, ANF instructions, and tagged
//! constructors.
//!
//! Three transformations live here:
//!
//! - **ANF**: every non-trivial sub-expression is hoisted onto the
//!   per-function instruction buffer under a fresh `tN` destination.
//! - **Tag assignment**: one [`TagTable`] per ADT, tags in declaration
//!   order.
//! - **Pattern-match compilation**: value-producing `IfElse` cascades in
//!   the general case; self-recursive functions whose body is a simple
//!   tail match instead compile to a `Switch` over blocks inside a loop,
//!   with tail self-calls turned into parameter rebinds plus a back-edge
//!   branch.


use std::collections::{HashMap, HashSet};

use workman_core::Span;
use workman_ir::PrimOp;
use workman_ir::core::{CoreArm, CoreBinding, CoreExpr, CoreExprKind, CoreLit, CorePat, CorePatKind, CoreProgram};
use workman_ir::mir::{
    BasicBlock, BlockLabel, Function, Inst, InstKind, MirProgram, SwitchCase, TagEntry, TagTable,
    Terminator, Value,
};

use crate::diagnostics::{DiagnosticKind, Diagnostics};

use workman_ir::mir::RUNTIME_BINDINGS;

/// Lower a Core program to MIR. Diagnostics are non-empty only for the
/// constructs this stage rejects (string patterns).
pub fn emit_program(core: &CoreProgram) -> (MirProgram, Diagnostics) {
    let tag_tables: Vec<TagTable> = core
        .types
        .iter()
        .map(|ty| TagTable {
            type_name: ty.name.clone(),
            constructors: ty
                .constructors
                .iter()
                .enumerate()
                .map(|(i, c)| TagEntry {
                    name: c.name.clone(),
                    tag: i as u32,
                    arity: c.arity,
                })
                .collect(),
        })
        .collect();

    let mut globals: HashSet<String> = core.bindings.iter().map(|b| b.name.clone()).collect();
    globals.extend(RUNTIME_BINDINGS.iter().map(|n| (*n).to_string()));

    let mut pe = ProgramEmitter {
        tag_tables,
        functions: Vec::new(),
        globals,
        diagnostics: Diagnostics::new(),
        lambda_counter: 0,
    };

    for binding in &core.bindings {
        emit_binding(&mut pe, core, binding);
    }

    let program = MirProgram {
        tag_tables: pe.tag_tables,
        functions: pe.functions,
        exports: core.exports.clone(),
    };
    (program, pe.diagnostics)
}

struct ProgramEmitter {
    tag_tables: Vec<TagTable>,
    functions: Vec<Function>,
    globals: HashSet<String>,
    diagnostics: Diagnostics,
    lambda_counter: u32,
}

impl ProgramEmitter {
    fn tag_of(&self, type_name: &str, ctor: &str) -> Option<(u32, usize)> {
        let table = self.tag_tables.iter().find(|t| t.type_name == type_name)?;
        let entry = table.constructors.iter().find(|c| c.name == ctor)?;
        Some((entry.tag, entry.arity))
    }
}

/// Whether the binding's body references its own name or any sibling of
/// its recursive group. Purely syntactic, shadowing ignored.
fn is_self_recursive(core: &CoreProgram, binding: &CoreBinding) -> bool {
    let names: Vec<&str> = match binding.rec_group {
        Some(group) => core
            .bindings
            .iter()
            .filter(|b| b.rec_group == Some(group))
            .map(|b| b.name.as_str())
            .collect(),
        None => vec![binding.name.as_str()],
    };
    let body = match &binding.expr.kind {
        CoreExprKind::Lam { body, .. } => body,
        _ => &binding.expr,
    };
    references_any(body, &names)
}

fn references_any(expr: &CoreExpr, names: &[&str]) -> bool {
    match &expr.kind {
        CoreExprKind::Var(name) => names.contains(&name.as_str()),
        CoreExprKind::Lit(_) => false,
        CoreExprKind::Lam { body, .. } => references_any(body, names),
        CoreExprKind::App { callee, args } => {
            references_any(callee, names) || args.iter().any(|a| references_any(a, names))
        }
        CoreExprKind::Let { rhs, body, .. } => {
            references_any(rhs, names) || references_any(body, names)
        }
        CoreExprKind::LetRec { bindings, body } => {
            bindings.iter().any(|(_, e)| references_any(e, names))
                || references_any(body, names)
        }
        CoreExprKind::Prim { args, .. } => args.iter().any(|a| references_any(a, names)),
        CoreExprKind::Ctor { fields, .. } => fields.iter().any(|f| references_any(f, names)),
        CoreExprKind::Tuple(elems) => elems.iter().any(|e| references_any(e, names)),
        CoreExprKind::Match { scrutinee, arms } => {
            references_any(scrutinee, names)
                || arms.iter().any(|a| references_any(&a.body, names))
        }
    }
}

fn emit_binding(pe: &mut ProgramEmitter, core: &CoreProgram, binding: &CoreBinding) {
    let (params, body) = match &binding.expr.kind {
        CoreExprKind::Lam { params, body } => (params.clone(), body.as_ref()),
        _ => (Vec::new(), &binding.expr),
    };
    let self_recursive = is_self_recursive(core, binding);

    let mut fe = FnEmitter::new(binding.name.clone(), params.clone(), self_recursive);

    // Self-recursive functions whose body is a simple tail match get
    // the loop + switch shape so tail self-calls can rebind and branch.
    let loop_match = if self_recursive {
        match &body.kind {
            CoreExprKind::Match { scrutinee, arms } if switch_mode(arms).is_some() => {
                Some((scrutinee.as_ref(), arms))
            }
            _ => None,
        }
    } else {
        None
    };

    match loop_match {
        Some((scrutinee, arms)) => {
            fe.emit_loop_match(pe, scrutinee, arms);
        }
        None => {
            if self_recursive {
                // Loop wrapper: entry branches into the (single) loop
                // body block; no back-edges unless tail calls appear.
                let entry = fe.fresh_label();
                let header = fe.fresh_label();
                fe.seal_block(entry, Terminator::Branch(header));
                let value = fe.lower_expr(pe, body);
                fe.seal_block(header, Terminator::Return(value));
            } else {
                let entry = fe.fresh_label();
                let value = fe.lower_expr(pe, body);
                fe.seal_block(entry, Terminator::Return(value));
            }
        }
    }

    pe.functions.push(Function {
        name: binding.name.clone(),
        params,
        blocks: fe.blocks,
        is_self_recursive: self_recursive,
        id: binding.expr.id,
        span: binding.expr.span,
    });
}

/// What a loop-mode switch would dispatch on.
#[derive(Clone, Copy, PartialEq)]
enum SwitchMode {
    CtorTag,
    IntLit,
    BoolLit,
}

/// Loop mode applies when every arm is a flat constructor pattern (all
/// sub-patterns irrefutable), an int/bool literal, or irrefutable, and
/// the refutable arms are homogeneous.
fn switch_mode(arms: &[CoreArm]) -> Option<SwitchMode> {
    let mut mode = None;
    for arm in arms {
        let this = match &arm.pattern.kind {
            CorePatKind::Wildcard | CorePatKind::Var(_) => continue,
            CorePatKind::Lit(CoreLit::Int(_)) => SwitchMode::IntLit,
            CorePatKind::Lit(CoreLit::Bool(_)) => SwitchMode::BoolLit,
            CorePatKind::Ctor { args, .. } if args.iter().all(CorePat::is_irrefutable) => {
                SwitchMode::CtorTag
            }
            _ => return None,
        };
        match mode {
            None => mode = Some(this),
            Some(existing) if existing == this => {}
            Some(_) => return None,
        }
    }
    mode
}

struct FnEmitter {
    name: String,
    params: Vec<String>,
    self_recursive: bool,
    loop_header: Option<BlockLabel>,
    instrs: Vec<Inst>,
    blocks: Vec<BasicBlock>,
    env: HashMap<String, Value>,
    temp: u32,
    next_label: u32,
}

impl FnEmitter {
    fn new(name: String, params: Vec<String>, self_recursive: bool) -> Self {
        Self {
            name,
            params,
            self_recursive,
            loop_header: None,
            instrs: Vec::new(),
            blocks: Vec::new(),
            env: HashMap::new(),
            temp: 0,
            next_label: 0,
        }
    }

    fn fresh_label(&mut self) -> BlockLabel {
        let label = BlockLabel(self.next_label);
        self.next_label += 1;
        label
    }

    fn tmp(&mut self) -> String {
        let name = format!("t{}", self.temp);
        self.temp += 1;
        name
    }

    /// Append an instruction with a fresh destination.
    fn emit(&mut self, kind: InstKind) -> Value {
        let dst = self.tmp();
        self.instrs.push(Inst::new(dst.clone(), kind));
        Value::Var(dst)
    }

    /// Drain the buffer into a finished block.
    fn seal_block(&mut self, label: BlockLabel, terminator: Terminator) {
        let instrs = std::mem::take(&mut self.instrs);
        self.blocks.push(BasicBlock {
            label,
            instrs,
            terminator,
        });
    }

    /// Run `f` against an empty buffer, returning what it emitted.
    fn in_buffer<F>(&mut self, pe: &mut ProgramEmitter, f: F) -> (Vec<Inst>, Value)
    where
        F: FnOnce(&mut Self, &mut ProgramEmitter) -> Value,
    {
        let saved = std::mem::take(&mut self.instrs);
        let value = f(self, pe);
        let body = std::mem::replace(&mut self.instrs, saved);
        (body, value)
    }

    fn lower_lit(lit: &CoreLit) -> Value {
        match lit {
            CoreLit::Int(v) => Value::Int(*v),
            CoreLit::Bool(v) => Value::Bool(*v),
            CoreLit::Char(v) => Value::Char(*v),
            CoreLit::Str(v) => Value::Str(v.clone()),
            CoreLit::Unit => Value::Unit,
        }
    }

    fn lower_expr(&mut self, pe: &mut ProgramEmitter, expr: &CoreExpr) -> Value {
        match &expr.kind {
            CoreExprKind::Var(name) => match self.env.get(name) {
                Some(value) => value.clone(),
                None => Value::Var(name.clone()),
            },
            CoreExprKind::Lit(lit) => Self::lower_lit(lit),
            CoreExprKind::Lam { params, body } => self.lower_lambda(pe, params, body),
            CoreExprKind::App { callee, args } => {
                let fun = self.lower_expr(pe, callee);
                let args: Vec<Value> = args.iter().map(|a| self.lower_expr(pe, a)).collect();
                self.emit(InstKind::Call { fun, args })
            }
            CoreExprKind::Let { name, rhs, body } => {
                let value = self.lower_expr(pe, rhs);
                let saved = self.env.get(name).cloned();
                self.env.insert(name.clone(), value);
                let result = self.lower_expr(pe, body);
                match saved {
                    Some(prev) => self.env.insert(name.clone(), prev),
                    None => self.env.remove(name),
                };
                result
            }
            CoreExprKind::LetRec { bindings, body } => {
                // Local recursive lambdas hoist to top-level functions
                // under their own names; captures beyond the group are
                // not closure-converted in this milestone.
                for (name, value) in bindings {
                    if let CoreExprKind::Lam { params, body } = &value.kind {
                        hoist_function(pe, name.clone(), params.clone(), body, value.span);
                    }
                }
                self.lower_expr(pe, body)
            }
            CoreExprKind::Prim { op, args } => {
                let args: Vec<Value> = args.iter().map(|a| self.lower_expr(pe, a)).collect();
                self.emit(InstKind::Prim { op: *op, args })
            }
            CoreExprKind::Ctor {
                type_name,
                ctor,
                fields,
            } => {
                let fields: Vec<Value> = fields.iter().map(|f| self.lower_expr(pe, f)).collect();
                let tag = match pe.tag_of(type_name, ctor) {
                    Some((tag, _)) => tag,
                    None => 0,
                };
                self.emit(InstKind::AllocCtor {
                    type_name: type_name.clone(),
                    tag,
                    fields,
                })
            }
            CoreExprKind::Tuple(elems) => {
                let elems: Vec<Value> = elems.iter().map(|e| self.lower_expr(pe, e)).collect();
                self.emit(InstKind::MakeTuple(elems))
            }
            CoreExprKind::Match { scrutinee, arms } => self.lower_match(pe, scrutinee, arms),
        }
    }

    /// Nested lambdas hoist to their own function; captured locals ride
    /// in a closure environment.
    fn lower_lambda(
        &mut self,
        pe: &mut ProgramEmitter,
        params: &[String],
        body: &CoreExpr,
    ) -> Value {
        let fun_name = format!("{}::lambda{}", self.name, pe.lambda_counter);
        pe.lambda_counter += 1;

        let mut captured: Vec<String> = Vec::new();
        let mut bound: HashSet<String> = params.iter().cloned().collect();
        collect_captures(body, &mut bound, &pe.globals, &mut captured);

        let mut fn_params = captured.clone();
        fn_params.extend(params.iter().cloned());
        hoist_function(pe, fun_name.clone(), fn_params, body, body.span);

        if captured.is_empty() {
            Value::Var(fun_name)
        } else {
            let env: Vec<Value> = captured
                .iter()
                .map(|name| match self.env.get(name) {
                    Some(value) => value.clone(),
                    None => Value::Var(name.clone()),
                })
                .collect();
            self.emit(InstKind::MakeClosure { fun: fun_name, env })
        }
    }

    // ---- general match compilation (IfElse cascade) -------------------

    fn lower_match(&mut self, pe: &mut ProgramEmitter, scrutinee: &CoreExpr, arms: &[CoreArm]) -> Value {
        let scr = self.lower_expr(pe, scrutinee);

        // One GetTag for the whole cascade when any top-level pattern
        // is a constructor.
        let tag_val = if arms
            .iter()
            .any(|a| matches!(a.pattern.kind, CorePatKind::Ctor { .. }))
        {
            Some(self.emit(InstKind::GetTag(scr.clone())))
        } else {
            None
        };

        self.lower_arms(pe, &scr, tag_val.as_ref(), arms)
    }

    fn lower_arms(
        &mut self,
        pe: &mut ProgramEmitter,
        scr: &Value,
        tag_val: Option<&Value>,
        arms: &[CoreArm],
    ) -> Value {
        let Some((arm, rest)) = arms.split_first() else {
            return self.emit_match_failure();
        };

        let mut conds = Vec::new();
        let mut binds = Vec::new();
        self.pattern_test(pe, &arm.pattern, scr, tag_val, &mut conds, &mut binds);

        if conds.is_empty() {
            // Irrefutable arm: evaluate the body directly.
            return self.with_bindings(pe, binds, |s, pe| s.lower_expr(pe, &arm.body));
        }

        let cond = self.conjoin(conds);
        let (then_body, then_result) =
            self.in_buffer(pe, |s, pe| {
                s.with_bindings(pe, binds, |s, pe| s.lower_expr(pe, &arm.body))
            });
        let (else_body, else_result) =
            self.in_buffer(pe, |s, pe| s.lower_arms(pe, scr, tag_val, rest));

        self.emit(InstKind::IfElse {
            cond,
            then_body,
            then_result,
            else_body,
            else_result,
        })
    }

    /// Non-exhaustive fallthrough stub. The inferencer's exhaustiveness
    /// check normally makes this unreachable.
    fn emit_match_failure(&mut self) -> Value {
        let msg = self.emit(InstKind::Const(Value::Str("match failure".to_string())));
        self.emit(InstKind::Prim {
            op: PrimOp::Print,
            args: vec![msg],
        })
    }

    fn with_bindings<F>(
        &mut self,
        pe: &mut ProgramEmitter,
        binds: Vec<(String, Value)>,
        f: F,
    ) -> Value
    where
        F: FnOnce(&mut Self, &mut ProgramEmitter) -> Value,
    {
        let saved: Vec<(String, Option<Value>)> = binds
            .iter()
            .map(|(name, _)| (name.clone(), self.env.get(name).cloned()))
            .collect();
        for (name, value) in binds {
            self.env.insert(name, value);
        }
        let result = f(self, pe);
        for (name, prev) in saved {
            match prev {
                Some(value) => self.env.insert(name, value),
                None => self.env.remove(&name),
            };
        }
        result
    }

    /// Emit the tests and bindings of one pattern against `val`.
    /// Literal sub-patterns always contribute to the condition, never
    /// silently match.
    fn pattern_test(
        &mut self,
        pe: &mut ProgramEmitter,
        pat: &CorePat,
        val: &Value,
        tag_val: Option<&Value>,
        conds: &mut Vec<Value>,
        binds: &mut Vec<(String, Value)>,
    ) {
        match &pat.kind {
            CorePatKind::Wildcard => {}
            CorePatKind::Var(name) => binds.push((name.clone(), val.clone())),
            CorePatKind::Lit(CoreLit::Int(v)) => {
                let test = self.emit(InstKind::Prim {
                    op: PrimOp::EqInt,
                    args: vec![val.clone(), Value::Int(*v)],
                });
                conds.push(test);
            }
            CorePatKind::Lit(CoreLit::Bool(true)) => {
                // The scrutinee already is the condition.
                conds.push(val.clone());
            }
            CorePatKind::Lit(CoreLit::Bool(false)) => {
                let test = self.emit(InstKind::Prim {
                    op: PrimOp::Not,
                    args: vec![val.clone()],
                });
                conds.push(test);
            }
            CorePatKind::Lit(CoreLit::Char(c)) => {
                let test = self.emit(InstKind::Prim {
                    op: PrimOp::CharEq,
                    args: vec![val.clone(), Value::Char(*c)],
                });
                conds.push(test);
            }
            CorePatKind::Lit(CoreLit::Str(_)) => {
                pe.diagnostics
                    .error(
                        DiagnosticKind::StringPatternUnsupported,
                        "string patterns are not supported in MIR lowering",
                        pat.span,
                    )
                    .hint("match on characters or restructure with equality checks")
                    .emit();
                conds.push(Value::Bool(false));
            }
            CorePatKind::Lit(CoreLit::Unit) => {}
            CorePatKind::Ctor {
                type_name,
                ctor,
                args,
            } => {
                let tag = pe.tag_of(type_name, ctor).map(|(t, _)| t).unwrap_or(0);
                let tag_value = match tag_val {
                    Some(v) => v.clone(),
                    None => self.emit(InstKind::GetTag(val.clone())),
                };
                let test = self.emit(InstKind::Prim {
                    op: PrimOp::EqInt,
                    args: vec![tag_value, Value::Int(i64::from(tag))],
                });
                conds.push(test);
                for (index, sub) in args.iter().enumerate() {
                    let field = self.emit(InstKind::GetField {
                        value: val.clone(),
                        index: index as u32,
                    });
                    self.pattern_test(pe, sub, &field, None, conds, binds);
                }
            }
            CorePatKind::Tuple(elems) => {
                for (index, sub) in elems.iter().enumerate() {
                    let element = self.emit(InstKind::GetTuple {
                        tuple: val.clone(),
                        index: index as u32,
                    });
                    self.pattern_test(pe, sub, &element, None, conds, binds);
                }
            }
        }
    }

    /// Conjoin test values with `and` primitives.
    fn conjoin(&mut self, conds: Vec<Value>) -> Value {
        let mut iter = conds.into_iter();
        let first = iter.next().expect("conjoin of no conditions");
        iter.fold(first, |acc, cond| {
            self.emit(InstKind::Prim {
                op: PrimOp::And,
                args: vec![acc, cond],
            })
        })
    }

    // ---- loop-mode match compilation ----------------------------------

    /// `fn f(xs) = match(e) { ... }` with self-recursion: entry branches
    /// to a loop header that evaluates the scrutinee and switches; tail
    /// self-calls rebind the parameters and branch back.
    fn emit_loop_match(
        &mut self,
        pe: &mut ProgramEmitter,
        scrutinee: &CoreExpr,
        arms: &[CoreArm],
    ) {
        let mode = switch_mode(arms).expect("caller checked switch mode");

        let entry = self.fresh_label();
        let header = self.fresh_label();
        self.loop_header = Some(header);
        self.seal_block(entry, Terminator::Branch(header));

        // Reserve labels for each refutable arm, the default arm, and
        // the panic fallthrough.
        let mut cases: Vec<SwitchCase> = Vec::new();
        let mut arm_labels: Vec<(BlockLabel, &CoreArm)> = Vec::new();
        let mut default: Option<(BlockLabel, &CoreArm)> = None;

        for arm in arms {
            if default.is_some() {
                // Arms after an irrefutable one are unreachable.
                break;
            }
            let label = self.fresh_label();
            match &arm.pattern.kind {
                CorePatKind::Wildcard | CorePatKind::Var(_) => {
                    default = Some((label, arm));
                }
                CorePatKind::Lit(CoreLit::Int(v)) => {
                    cases.push(SwitchCase {
                        value: *v,
                        target: label,
                    });
                    arm_labels.push((label, arm));
                }
                CorePatKind::Lit(CoreLit::Bool(b)) => {
                    cases.push(SwitchCase {
                        value: i64::from(*b),
                        target: label,
                    });
                    arm_labels.push((label, arm));
                }
                CorePatKind::Ctor {
                    type_name, ctor, ..
                } => {
                    let tag = pe.tag_of(type_name, ctor).map(|(t, _)| t).unwrap_or(0);
                    cases.push(SwitchCase {
                        value: i64::from(tag),
                        target: label,
                    });
                    arm_labels.push((label, arm));
                }
                _ => unreachable!("switch_mode admitted a refutable nested pattern"),
            }
        }

        let panic_label = if default.is_none() {
            Some(self.fresh_label())
        } else {
            None
        };

        // Loop header: evaluate the scrutinee, dispatch.
        let scr = self.lower_expr(pe, scrutinee);
        let switch_value = match mode {
            SwitchMode::CtorTag => self.emit(InstKind::GetTag(scr.clone())),
            SwitchMode::IntLit | SwitchMode::BoolLit => scr.clone(),
        };
        let default_target = default
            .as_ref()
            .map(|(label, _)| *label)
            .or(panic_label);
        self.seal_block(
            header,
            Terminator::Switch {
                value: switch_value,
                cases,
                default: default_target,
            },
        );

        for (label, arm) in arm_labels {
            self.emit_loop_arm(pe, label, arm, &scr);
        }
        if let Some((label, arm)) = default {
            self.emit_loop_arm(pe, label, arm, &scr);
        }
        if let Some(label) = panic_label {
            let value = self.emit_match_failure();
            self.seal_block(label, Terminator::Return(value));
        }
    }

    fn emit_loop_arm(
        &mut self,
        pe: &mut ProgramEmitter,
        label: BlockLabel,
        arm: &CoreArm,
        scr: &Value,
    ) {
        let mut binds = Vec::new();
        match &arm.pattern.kind {
            CorePatKind::Var(name) => binds.push((name.clone(), scr.clone())),
            CorePatKind::Ctor { args, .. } => {
                for (index, sub) in args.iter().enumerate() {
                    let field = self.emit(InstKind::GetField {
                        value: scr.clone(),
                        index: index as u32,
                    });
                    match &sub.kind {
                        CorePatKind::Var(name) => binds.push((name.clone(), field)),
                        CorePatKind::Wildcard => {}
                        // Irrefutable tuples of vars.
                        CorePatKind::Tuple(elems) => {
                            for (i, elem) in elems.iter().enumerate() {
                                if let CorePatKind::Var(name) = &elem.kind {
                                    let element = self.emit(InstKind::GetTuple {
                                        tuple: field.clone(),
                                        index: i as u32,
                                    });
                                    binds.push((name.clone(), element));
                                }
                            }
                        }
                        _ => {}
                    }
                }
            }
            _ => {}
        }

        let saved_env = self.env.clone();
        for (name, value) in binds {
            self.env.insert(name, value);
        }
        let terminator = self.lower_tail(pe, &arm.body);
        self.env = saved_env;
        self.seal_block(label, terminator);
    }

    /// Lower an expression in tail position inside a loop body.
    /// A direct self-call becomes parameter rebinds plus a back-edge.
    fn lower_tail(&mut self, pe: &mut ProgramEmitter, expr: &CoreExpr) -> Terminator {
        match &expr.kind {
            CoreExprKind::App { callee, args } => {
                if let CoreExprKind::Var(name) = &callee.kind {
                    if *name == self.name && args.len() == self.params.len() {
                        let values: Vec<Value> =
                            args.iter().map(|a| self.lower_expr(pe, a)).collect();
                        let params = self.params.clone();
                        for (param, value) in params.into_iter().zip(values) {
                            self.instrs.push(Inst::new(param, InstKind::Rebind(value)));
                        }
                        return Terminator::Branch(
                            self.loop_header.expect("loop header set in loop mode"),
                        );
                    }
                }
                let value = self.lower_expr(pe, expr);
                Terminator::Return(value)
            }
            CoreExprKind::Let { name, rhs, body } => {
                let value = self.lower_expr(pe, rhs);
                let saved = self.env.get(name).cloned();
                self.env.insert(name.clone(), value);
                let terminator = self.lower_tail(pe, body);
                match saved {
                    Some(prev) => self.env.insert(name.clone(), prev),
                    None => self.env.remove(name),
                };
                terminator
            }
            _ => {
                let value = self.lower_expr(pe, expr);
                Terminator::Return(value)
            }
        }
    }
}

/// Emit a hoisted function (nested lambda or local letrec binding).
fn hoist_function(
    pe: &mut ProgramEmitter,
    name: String,
    params: Vec<String>,
    body: &CoreExpr,
    span: Span,
) {
    let mut fe = FnEmitter::new(name.clone(), params.clone(), false);
    let entry = fe.fresh_label();
    let value = fe.lower_expr(pe, body);
    fe.seal_block(entry, Terminator::Return(value));

    pe.globals.insert(name.clone());
    pe.functions.push(Function {
        name,
        params,
        blocks: fe.blocks,
        is_self_recursive: false,
        id: body.id,
        span,
    });
}

/// Free-variable walk for closure capture: anything referenced that is
/// neither locally bound nor global gets captured, in first-use order.
fn collect_captures(
    expr: &CoreExpr,
    bound: &mut HashSet<String>,
    globals: &HashSet<String>,
    out: &mut Vec<String>,
) {
    match &expr.kind {
        CoreExprKind::Var(name) => {
            if !bound.contains(name) && !globals.contains(name) && !out.contains(name) {
                out.push(name.clone());
            }
        }
        CoreExprKind::Lit(_) => {}
        CoreExprKind::Lam { params, body } => {
            let added: Vec<String> = params
                .iter()
                .filter(|p| bound.insert((*p).clone()))
                .cloned()
                .collect();
            collect_captures(body, bound, globals, out);
            for name in added {
                bound.remove(&name);
            }
        }
        CoreExprKind::App { callee, args } => {
            collect_captures(callee, bound, globals, out);
            for arg in args {
                collect_captures(arg, bound, globals, out);
            }
        }
        CoreExprKind::Let { name, rhs, body } => {
            collect_captures(rhs, bound, globals, out);
            let added = bound.insert(name.clone());
            collect_captures(body, bound, globals, out);
            if added {
                bound.remove(name);
            }
        }
        CoreExprKind::LetRec { bindings, body } => {
            let added: Vec<String> = bindings
                .iter()
                .filter(|(name, _)| bound.insert(name.clone()))
                .map(|(name, _)| name.clone())
                .collect();
            for (_, value) in bindings {
                collect_captures(value, bound, globals, out);
            }
            collect_captures(body, bound, globals, out);
            for name in added {
                bound.remove(&name);
            }
        }
        CoreExprKind::Prim { args, .. } => {
            for arg in args {
                collect_captures(arg, bound, globals, out);
            }
        }
        CoreExprKind::Ctor { fields, .. } => {
            for field in fields {
                collect_captures(field, bound, globals, out);
            }
        }
        CoreExprKind::Tuple(elems) => {
            for elem in elems {
                collect_captures(elem, bound, globals, out);
            }
        }
        CoreExprKind::Match { scrutinee, arms } => {
            collect_captures(scrutinee, bound, globals, out);
            for arm in arms {
                let mut names = Vec::new();
                pattern_binders(&arm.pattern, &mut names);
                let added: Vec<String> = names
                    .into_iter()
                    .filter(|n| bound.insert(n.clone()))
                    .collect();
                collect_captures(&arm.body, bound, globals, out);
                for name in added {
                    bound.remove(&name);
                }
            }
        }
    }
}

fn pattern_binders(pat: &CorePat, out: &mut Vec<String>) {
    match &pat.kind {
        CorePatKind::Var(name) => out.push(name.clone()),
        CorePatKind::Ctor { args, .. } => {
            for arg in args {
                pattern_binders(arg, out);
            }
        }
        CorePatKind::Tuple(elems) => {
            for elem in elems {
                pattern_binders(elem, out);
            }
        }
        CorePatKind::Wildcard | CorePatKind::Lit(_) => {}
    }
}
