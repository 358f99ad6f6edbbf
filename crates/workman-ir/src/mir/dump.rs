//! Deterministic textual dump of a MIR program.
//!
//! Consumed by snapshot tests and `wm compile --emit mir`. The format is
//! stable: tag tables first in declaration order, then functions in
//! binding order.

use std::fmt::Write;

use super::{BasicBlock, Inst, InstKind, MirProgram, Terminator, Value};

pub fn dump(program: &MirProgram) -> String {
    let mut out = String::new();

    for table in &program.tag_tables {
        let ctors = table
            .constructors
            .iter()
            .map(|c| format!("{}: {}", c.name, c.tag))
            .collect::<Vec<_>>()
            .join(", ");
        let _ = writeln!(out, "tags {} {{ {} }}", table.type_name, ctors);
    }

    if !program.tag_tables.is_empty() && !program.functions.is_empty() {
        out.push('\n');
    }

    for (i, fun) in program.functions.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let rec = if fun.is_self_recursive {
            " [self-recursive]"
        } else {
            ""
        };
        let _ = writeln!(out, "fn {}({}){} {{", fun.name, fun.params.join(", "), rec);
        for block in &fun.blocks {
            dump_block(&mut out, block);
        }
        out.push_str("}\n");
    }

    if !program.exports.is_empty() {
        let _ = writeln!(out, "\nexports: {}", program.exports.join(", "));
    }

    out
}

fn dump_block(out: &mut String, block: &BasicBlock) {
    let _ = writeln!(out, "{}:", block.label);
    for inst in &block.instrs {
        dump_inst(out, inst, 1);
    }
    match &block.terminator {
        Terminator::Return(v) => {
            let _ = writeln!(out, "  return {}", value(v));
        }
        Terminator::Branch(target) => {
            let _ = writeln!(out, "  branch {target}");
        }
        Terminator::Switch {
            value: v,
            cases,
            default,
        } => {
            let cases = cases
                .iter()
                .map(|c| format!("{} -> {}", c.value, c.target))
                .collect::<Vec<_>>()
                .join(", ");
            match default {
                Some(d) => {
                    let _ = writeln!(out, "  switch {} [{}] else {}", value(v), cases, d);
                }
                None => {
                    let _ = writeln!(out, "  switch {} [{}]", value(v), cases);
                }
            }
        }
    }
}

fn dump_inst(out: &mut String, inst: &Inst, depth: usize) {
    let pad = "  ".repeat(depth);
    match &inst.kind {
        InstKind::Const(v) => {
            let _ = writeln!(out, "{pad}{} = const {}", inst.dst, value(v));
        }
        InstKind::Prim { op, args } => {
            let _ = writeln!(out, "{pad}{} = {} {}", inst.dst, op, values(args));
        }
        InstKind::MakeTuple(elems) => {
            let _ = writeln!(out, "{pad}{} = tuple {}", inst.dst, values(elems));
        }
        InstKind::GetTuple { tuple, index } => {
            let _ = writeln!(out, "{pad}{} = get_tuple {}, {}", inst.dst, value(tuple), index);
        }
        InstKind::MakeClosure { fun, env } => {
            let _ = writeln!(out, "{pad}{} = closure {} [{}]", inst.dst, fun, values(env));
        }
        InstKind::Call { fun, args } => {
            let _ = writeln!(out, "{pad}{} = call {} {}", inst.dst, value(fun), values(args));
        }
        InstKind::AllocCtor {
            type_name,
            tag,
            fields,
        } => {
            let _ = writeln!(
                out,
                "{pad}{} = alloc {}/{} {}",
                inst.dst,
                type_name,
                tag,
                values(fields)
            );
        }
        InstKind::GetTag(v) => {
            let _ = writeln!(out, "{pad}{} = get_tag {}", inst.dst, value(v));
        }
        InstKind::GetField { value: v, index } => {
            let _ = writeln!(out, "{pad}{} = get_field {}, {}", inst.dst, value(v), index);
        }
        InstKind::IfElse {
            cond,
            then_body,
            then_result,
            else_body,
            else_result,
        } => {
            let _ = writeln!(out, "{pad}{} = if {} {{", inst.dst, value(cond));
            for i in then_body {
                dump_inst(out, i, depth + 1);
            }
            let _ = writeln!(out, "{pad}  -> {}", value(then_result));
            let _ = writeln!(out, "{pad}}} else {{");
            for i in else_body {
                dump_inst(out, i, depth + 1);
            }
            let _ = writeln!(out, "{pad}  -> {}", value(else_result));
            let _ = writeln!(out, "{pad}}}");
        }
        InstKind::Rebind(v) => {
            let _ = writeln!(out, "{pad}{} := {}", inst.dst, value(v));
        }
    }
}

fn value(v: &Value) -> String {
    match v {
        Value::Var(name) => name.clone(),
        Value::Int(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Char(c) => format!("{c:?}"),
        Value::Str(s) => format!("{s:?}"),
        Value::Unit => "()".to_string(),
    }
}

fn values(vs: &[Value]) -> String {
    vs.iter().map(value).collect::<Vec<_>>().join(", ")
}
