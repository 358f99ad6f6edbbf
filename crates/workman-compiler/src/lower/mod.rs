//! Core IR lowering: marked surface AST to the desugared tree.
//!
//! A deterministic rewrite. Operator applications become [`PrimOp`]
//! applications when the operator is a recognized primitive (selection
//! is type-directed for equality) and calls to their backing `__op_*`
//! bindings otherwise; statement blocks become right-nested lets;
//! first-class matches were already expanded by the parser. Node IDs and
//! spans ride along unchanged; synthesized nodes allocate fresh IDs
//! above the parser's range.

#[cfg(test)]
mod lower_tests;

use workman_core::{NodeId, Span};
use workman_ir::PrimOp;
use workman_ir::core::{
    CoreArm, CoreBinding, CoreCtorDef, CoreExpr, CoreExprKind, CoreLit, CorePat, CorePatKind,
    CoreProgram, CoreTypeDef,
};

use crate::infer::Inference;
use crate::parser::ast::{
    Binding, Block, Expr, ExprKind, Item, LetDecl, PatKind, Pattern, Program, Stmt,
};
use crate::types::{Type, TypeCtx};

/// Lower a checked module to Core IR.
pub fn lower_program(program: &Program, inference: &Inference, ctx: &TypeCtx) -> CoreProgram {
    let next_id = inference
        .marks
        .iter()
        .map(|(id, _)| id.as_u32() + 1)
        .max()
        .unwrap_or(0);

    let mut lowerer = Lowerer {
        inference,
        ctx,
        next_id,
        next_group: 0,
    };

    let types = inference
        .adts
        .iter()
        .map(|adt| CoreTypeDef {
            name: adt.name.clone(),
            constructors: adt
                .ctors
                .iter()
                .map(|c| CoreCtorDef {
                    name: c.name.clone(),
                    arity: c.arity,
                })
                .collect(),
        })
        .collect();

    let mut bindings = Vec::new();
    for item in &program.items {
        match item {
            Item::Let(decl) => lowerer.lower_let_decl(decl, &mut bindings),
            Item::Infix(decl) => {
                // Alias binding so `__op_⊕` calls resolve at runtime.
                bindings.push(CoreBinding {
                    name: format!("__op_{}", decl.op),
                    expr: CoreExpr {
                        id: decl.target.id,
                        span: decl.target.span,
                        kind: CoreExprKind::Var(decl.target.name.clone()),
                    },
                    exported: decl.exported,
                    recursive: false,
                    rec_group: None,
                });
            }
            Item::Prefix(decl) => {
                bindings.push(CoreBinding {
                    name: format!("__prefix_{}", decl.op),
                    expr: CoreExpr {
                        id: decl.target.id,
                        span: decl.target.span,
                        kind: CoreExprKind::Var(decl.target.name.clone()),
                    },
                    exported: decl.exported,
                    recursive: false,
                    rec_group: None,
                });
            }
            Item::Type(_) | Item::Import(_) | Item::ReExport(_) => {}
        }
    }

    CoreProgram {
        types,
        bindings,
        exports: inference.exported_values.clone(),
    }
}

struct Lowerer<'a> {
    inference: &'a Inference,
    ctx: &'a TypeCtx,
    next_id: u32,
    next_group: u32,
}

impl Lowerer<'_> {
    fn fresh_id(&mut self) -> NodeId {
        let id = NodeId::from_raw(self.next_id);
        self.next_id += 1;
        id
    }

    fn synth(&mut self, span: Span, kind: CoreExprKind) -> CoreExpr {
        CoreExpr {
            id: self.fresh_id(),
            span,
            kind,
        }
    }

    fn resolved_type(&self, node: NodeId) -> Option<Type> {
        self.inference
            .marks
            .type_of(node)
            .map(|t| self.ctx.resolve(t))
    }

    fn lower_let_decl(&mut self, decl: &LetDecl, out: &mut Vec<CoreBinding>) {
        let group = if decl.recursive {
            let g = self.next_group;
            self.next_group += 1;
            Some(g)
        } else {
            None
        };
        for binding in &decl.bindings {
            out.push(CoreBinding {
                name: binding.name.name.clone(),
                expr: self.lower_expr(&binding.value),
                exported: decl.exported,
                recursive: decl.recursive,
                rec_group: group,
            });
        }
    }

    fn lower_expr(&mut self, expr: &Expr) -> CoreExpr {
        let kind = match &expr.kind {
            ExprKind::Var(name) => CoreExprKind::Var(name.clone()),
            ExprKind::CtorRef(name) => return self.lower_ctor_ref(expr, name, &[]),
            ExprKind::Int(v) => CoreExprKind::Lit(CoreLit::Int(*v)),
            ExprKind::Bool(v) => CoreExprKind::Lit(CoreLit::Bool(*v)),
            ExprKind::Char(v) => CoreExprKind::Lit(CoreLit::Char(*v)),
            ExprKind::Str(v) => CoreExprKind::Lit(CoreLit::Str(v.clone())),
            ExprKind::Unit => CoreExprKind::Lit(CoreLit::Unit),
            ExprKind::Tuple(elems) => {
                CoreExprKind::Tuple(elems.iter().map(|e| self.lower_expr(e)).collect())
            }
            ExprKind::Call { callee, args } => {
                if let ExprKind::CtorRef(name) = &callee.kind {
                    return self.lower_ctor_ref(expr, name, args);
                }
                let callee = Box::new(self.lower_expr(callee));
                let args = if args.is_empty() {
                    vec![self.synth(expr.span, CoreExprKind::Lit(CoreLit::Unit))]
                } else {
                    args.iter().map(|a| self.lower_expr(a)).collect()
                };
                CoreExprKind::App { callee, args }
            }
            ExprKind::Binary { op, lhs, rhs, .. } => {
                return self.lower_binary(expr, op, lhs, rhs);
            }
            ExprKind::Unary { op, operand, .. } => {
                if op == "!" {
                    CoreExprKind::Prim {
                        op: PrimOp::Not,
                        args: vec![self.lower_expr(operand)],
                    }
                } else {
                    let callee = self.synth(
                        expr.span,
                        CoreExprKind::Var(format!("__prefix_{op}")),
                    );
                    CoreExprKind::App {
                        callee: Box::new(callee),
                        args: vec![self.lower_expr(operand)],
                    }
                }
            }
            ExprKind::Arrow { params, body } => {
                let names: Vec<String> = if params.is_empty() {
                    vec!["_".to_string()]
                } else {
                    params.iter().map(|p| p.name.name.clone()).collect()
                };
                CoreExprKind::Lam {
                    params: names,
                    body: Box::new(self.lower_expr(body)),
                }
            }
            ExprKind::Block(block) => return self.lower_block(expr.span, block),
            ExprKind::Match { scrutinee, arms } => CoreExprKind::Match {
                scrutinee: Box::new(self.lower_expr(scrutinee)),
                arms: arms
                    .iter()
                    .map(|arm| CoreArm {
                        pattern: self.lower_pattern(&arm.pattern),
                        body: self.lower_expr(&arm.body),
                    })
                    .collect(),
            },
            // Namespace/record member access resolves to the exporting
            // module's top-level binding by name.
            ExprKind::Field { field, .. } => CoreExprKind::Var(field.name.clone()),
        };

        CoreExpr {
            id: expr.id,
            span: expr.span,
            kind,
        }
    }

    /// Constructor references and applications. Partial applications
    /// eta-expand so every `Ctor` node in Core is saturated.
    fn lower_ctor_ref(&mut self, expr: &Expr, name: &str, args: &[Expr]) -> CoreExpr {
        let Some((adt, info)) = self.inference.adts.lookup_ctor(name) else {
            // Unknown constructors abort inference; lowering never sees
            // them for a checked program.
            return self.synth(expr.span, CoreExprKind::Var(name.to_string()));
        };
        let type_name = adt.name.clone();
        let arity = info.arity;

        let mut fields: Vec<CoreExpr> = args.iter().map(|a| self.lower_expr(a)).collect();

        if fields.len() == arity {
            return CoreExpr {
                id: expr.id,
                span: expr.span,
                kind: CoreExprKind::Ctor {
                    type_name,
                    ctor: name.to_string(),
                    fields,
                },
            };
        }

        // Eta-expand the missing arguments.
        let missing: Vec<String> = (fields.len()..arity).map(|i| format!("__x{i}")).collect();
        for param in &missing {
            let var = self.synth(expr.span, CoreExprKind::Var(param.clone()));
            fields.push(var);
        }
        let ctor = self.synth(
            expr.span,
            CoreExprKind::Ctor {
                type_name,
                ctor: name.to_string(),
                fields,
            },
        );
        CoreExpr {
            id: expr.id,
            span: expr.span,
            kind: CoreExprKind::Lam {
                params: missing,
                body: Box::new(ctor),
            },
        }
    }

    fn lower_binary(&mut self, expr: &Expr, op: &str, lhs: &Expr, rhs: &Expr) -> CoreExpr {
        let largs = vec![self.lower_expr(lhs), self.lower_expr(rhs)];

        let prim = match op {
            "+" => Some(PrimOp::Add),
            "-" => Some(PrimOp::Sub),
            "*" => Some(PrimOp::Mul),
            "/" => Some(PrimOp::Div),
            "<" => Some(PrimOp::Lt),
            ">" => Some(PrimOp::Gt),
            "<=" => Some(PrimOp::Le),
            ">=" => Some(PrimOp::Ge),
            "&&" => Some(PrimOp::And),
            "||" => Some(PrimOp::Or),
            "==" | "!=" => None,
            _ => None,
        };

        if let Some(prim) = prim {
            return CoreExpr {
                id: expr.id,
                span: expr.span,
                kind: CoreExprKind::Prim {
                    op: prim,
                    args: largs,
                },
            };
        }

        // Equality selects its primitive from the operand type.
        if op == "==" || op == "!=" {
            let operand_ty = self.resolved_type(lhs.id);
            let base = match operand_ty {
                Some(Type::Int) | Some(Type::Bool) => Some(PrimOp::EqInt),
                Some(Type::Char) => Some(PrimOp::CharEq),
                _ => None,
            };
            if let Some(base_prim) = base {
                let eq = CoreExprKind::Prim {
                    op: base_prim,
                    args: largs,
                };
                if op == "==" {
                    return CoreExpr {
                        id: expr.id,
                        span: expr.span,
                        kind: eq,
                    };
                }
                // `!=` is the negation of the equality primitive, except
                // for ints which have a dedicated prim.
                if base_prim == PrimOp::EqInt {
                    let CoreExprKind::Prim { args, .. } = eq else {
                        unreachable!()
                    };
                    return CoreExpr {
                        id: expr.id,
                        span: expr.span,
                        kind: CoreExprKind::Prim {
                            op: PrimOp::NeInt,
                            args,
                        },
                    };
                }
                let inner = self.synth(expr.span, eq);
                return CoreExpr {
                    id: expr.id,
                    span: expr.span,
                    kind: CoreExprKind::Prim {
                        op: PrimOp::Not,
                        args: vec![inner],
                    },
                };
            }
        }

        // Unrecognized operator: call its backing binding.
        let callee = self.synth(expr.span, CoreExprKind::Var(format!("__op_{op}")));
        CoreExpr {
            id: expr.id,
            span: expr.span,
            kind: CoreExprKind::App {
                callee: Box::new(callee),
                args: largs,
            },
        }
    }

    /// Blocks become right-nested lets; expression statements bind `_`.
    fn lower_block(&mut self, span: Span, block: &Block) -> CoreExpr {
        let result = match &block.result {
            Some(result) => self.lower_expr(result),
            None => self.synth(span, CoreExprKind::Lit(CoreLit::Unit)),
        };

        block.stmts.iter().rev().fold(result, |acc, stmt| match stmt {
            Stmt::Expr(e) => {
                let rhs = self.lower_expr(e);
                let id = self.fresh_id();
                CoreExpr {
                    id,
                    span: e.span.cover(acc.span),
                    kind: CoreExprKind::Let {
                        name: "_".to_string(),
                        rhs: Box::new(rhs),
                        body: Box::new(acc),
                    },
                }
            }
            Stmt::Let(decl) => self.lower_local_let(decl, acc),
        })
    }

    fn lower_local_let(&mut self, decl: &LetDecl, body: CoreExpr) -> CoreExpr {
        if decl.recursive {
            let bindings: Vec<(String, CoreExpr)> = decl
                .bindings
                .iter()
                .map(|b| (b.name.name.clone(), self.lower_expr(&b.value)))
                .collect();
            let id = self.fresh_id();
            return CoreExpr {
                id,
                span: decl.span.cover(body.span),
                kind: CoreExprKind::LetRec {
                    bindings,
                    body: Box::new(body),
                },
            };
        }

        decl.bindings
            .iter()
            .rev()
            .fold(body, |acc, binding: &Binding| {
                let rhs = self.lower_expr(&binding.value);
                let id = self.fresh_id();
                CoreExpr {
                    id,
                    span: binding.span.cover(acc.span),
                    kind: CoreExprKind::Let {
                        name: binding.name.name.clone(),
                        rhs: Box::new(rhs),
                        body: Box::new(acc),
                    },
                }
            })
    }

    fn lower_pattern(&mut self, pat: &Pattern) -> CorePat {
        let kind = match &pat.kind {
            PatKind::Wildcard => CorePatKind::Wildcard,
            PatKind::Var(name) => CorePatKind::Var(name.clone()),
            PatKind::Int(v) => CorePatKind::Lit(CoreLit::Int(*v)),
            PatKind::Bool(v) => CorePatKind::Lit(CoreLit::Bool(*v)),
            PatKind::Char(v) => CorePatKind::Lit(CoreLit::Char(*v)),
            PatKind::Str(v) => CorePatKind::Lit(CoreLit::Str(v.clone())),
            PatKind::Tuple(elems) => {
                CorePatKind::Tuple(elems.iter().map(|e| self.lower_pattern(e)).collect())
            }
            PatKind::Ctor { name, args } => match self.inference.adts.lookup_ctor(name) {
                Some((adt, _)) => CorePatKind::Ctor {
                    type_name: adt.name.clone(),
                    ctor: name.clone(),
                    args: args.iter().map(|a| self.lower_pattern(a)).collect(),
                },
                // Error-row labels inside `Err(...)` have no tag table;
                // they compile as irrefutable in this milestone.
                None => CorePatKind::Wildcard,
            },
        };

        CorePat {
            id: pat.id,
            span: pat.span,
            kind,
        }
    }
}
