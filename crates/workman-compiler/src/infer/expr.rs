//! Expression inference: the Algorithm W walk.

use std::collections::{HashMap, HashSet};

use workman_core::{NodeId, Span};

use crate::diagnostics::DiagnosticKind;
use crate::parser::ast::{Block, Expr, ExprKind, MatchArm, Param, PatKind, Stmt};
use crate::solve::stubs::{ConstraintLabel, ConstraintStub};
use crate::types::{Scheme, Type};

use super::env::EnvBinding;
use super::pattern::Coverage;
use super::{FunctionBoundary, IResult, InferAbort, Inferencer, MatchInfo, is_infectious_mismatch};

impl Inferencer<'_> {
    pub(crate) fn infer_expr(&mut self, expr: &Expr) -> IResult<Type> {
        let ty = match &expr.kind {
            ExprKind::Var(name) => self.infer_var(expr.id, expr.span, name)?,
            ExprKind::CtorRef(name) => self.infer_ctor_ref(expr.span, name)?,
            ExprKind::Int(_) => Type::Int,
            ExprKind::Bool(_) => Type::Bool,
            ExprKind::Char(_) => Type::Char,
            ExprKind::Str(_) => Type::Str,
            ExprKind::Unit => Type::Unit,
            ExprKind::Tuple(elems) => {
                let mut tys = Vec::new();
                for elem in elems {
                    tys.push(self.infer_expr(elem)?);
                }
                Type::Tuple(tys)
            }
            ExprKind::Call { callee, args } => {
                let callee_ty = self.infer_expr(callee)?;
                if let ExprKind::CtorRef(name) = &callee.kind {
                    self.check_ctor_arity(name, args.len(), expr.span)?;
                }
                let arg_refs: Vec<&Expr> = args.iter().collect();
                self.infer_call_like(expr.id, expr.span, callee.id, callee_ty, &arg_refs)?
            }
            ExprKind::Binary {
                op,
                op_span,
                lhs,
                rhs,
            } => self.infer_binary(expr.id, *op_span, op, lhs, rhs)?,
            ExprKind::Unary {
                op,
                op_span,
                operand,
            } => self.infer_unary(expr.id, *op_span, op, operand)?,
            ExprKind::Arrow { params, body } => {
                self.infer_arrow(expr.id, expr.span, params, body)?
            }
            ExprKind::Block(block) => self.infer_block(block)?,
            ExprKind::Match { scrutinee, arms } => {
                self.infer_match(expr.id, expr.span, scrutinee, arms)?
            }
            ExprKind::Field { base, field } => {
                self.infer_field(expr.id, base, &field.name, field.span)?
            }
        };

        self.marks.record(expr.id, expr.span, ty.clone());
        let scope = self.env.visible_names();
        self.marks.set_scope(expr.id, scope);
        Ok(ty)
    }

    fn infer_var(&mut self, id: NodeId, span: Span, name: &str) -> IResult<Type> {
        match self.env.lookup(name).cloned() {
            Some(EnvBinding::Value { scheme, node }) => {
                if let Some(binder) = node {
                    self.emit(ConstraintStub::Alias {
                        left: id,
                        right: binder,
                    });
                }
                Ok(self.ctx.instantiate(&scheme))
            }
            Some(EnvBinding::Namespace(exports)) => {
                // A namespace used as a value becomes a record of its
                // (instantiated) exports.
                let fields = exports
                    .iter()
                    .map(|(k, scheme)| (k.clone(), self.ctx.instantiate(scheme)))
                    .collect();
                Ok(Type::Record(fields))
            }
            None => {
                self.diagnostics
                    .error(
                        DiagnosticKind::UnknownIdentifier,
                        format!("unknown identifier `{name}`"),
                        span,
                    )
                    .emit();
                Err(InferAbort)
            }
        }
    }

    fn infer_ctor_ref(&mut self, span: Span, name: &str) -> IResult<Type> {
        match self.adts.lookup_ctor(name) {
            Some((_, info)) => {
                let scheme = info.scheme.clone();
                Ok(self.ctx.instantiate(&scheme))
            }
            None => {
                self.diagnostics
                    .error(
                        DiagnosticKind::UnknownConstructor,
                        format!("unknown constructor `{name}`"),
                        span,
                    )
                    .emit();
                Err(InferAbort)
            }
        }
    }

    fn check_ctor_arity(&mut self, name: &str, args: usize, span: Span) -> IResult<()> {
        if let Some((_, info)) = self.adts.lookup_ctor(name) {
            if args > info.arity {
                let arity = info.arity;
                self.diagnostics
                    .error(
                        DiagnosticKind::ConstructorArityMismatch,
                        format!("constructor `{name}` takes {arity} argument(s), found {args}"),
                        span,
                    )
                    .emit();
                return Err(InferAbort);
            }
        }
        Ok(())
    }

    /// Shared call-shape inference: unify the callee with a fresh arrow
    /// chain, emit one `Call` stub per argument, seed error-row labels.
    fn infer_call_like(
        &mut self,
        expr_id: NodeId,
        span: Span,
        callee_id: NodeId,
        callee_ty: Type,
        args: &[&Expr],
    ) -> IResult<Type> {
        let mut arg_tys = Vec::new();
        for arg in args {
            arg_tys.push(self.infer_expr(arg)?);
        }

        let result = self.ctx.fresh_var();

        if args.is_empty() {
            // Zero-argument call: thunks take an implicit Unit.
            let expected = Type::fun(Type::Unit, result.clone());
            if let Err(err) = self.ctx.unify(&callee_ty, &expected) {
                self.report_unify_error(err, span);
                return Err(InferAbort);
            }
        } else {
            let params: Vec<Type> = args.iter().map(|_| self.ctx.fresh_var()).collect();
            let expected = Type::fun_from(params.clone(), result.clone());
            if let Err(err) = self.ctx.unify(&callee_ty, &expected) {
                self.report_unify_error(err, span);
                return Err(InferAbort);
            }

            for (index, (arg, (param, arg_ty))) in
                args.iter().zip(params.iter().zip(&arg_tys)).enumerate()
            {
                let resolved_arg = self.ctx.resolve(arg_ty);
                let argument_error_row = resolved_arg.result_row().cloned();

                self.emit(ConstraintStub::Call {
                    origin: expr_id,
                    callee: callee_id,
                    argument: arg.id,
                    result: expr_id,
                    result_type: result.clone(),
                    param_type: param.clone(),
                    arg_type: arg_ty.clone(),
                    index,
                    argument_error_row: argument_error_row.clone(),
                });

                // The sole place explicit flow is emitted: a Result
                // argument carries its labels into the call.
                if resolved_arg.is_result() {
                    self.emit(ConstraintStub::Flow {
                        from: arg.id,
                        to: expr_id,
                    });
                }

                if let Err(err) = self.ctx.unify(param, arg_ty) {
                    if !is_infectious_mismatch(&err) {
                        self.report_unify_error(err, arg.span);
                        return Err(InferAbort);
                    }
                }
            }
        }

        // A call producing a Result seeds an error label at the call
        // node; discharge or a boundary check picks it up later.
        let resolved_result = self.ctx.resolve(&result);
        if let Some(row) = resolved_result.result_row() {
            if !row.is_empty() {
                self.emit(ConstraintStub::Source {
                    node: expr_id,
                    label: ConstraintLabel::Error(row.clone()),
                });
            }
        }

        Ok(result)
    }

    /// `a ⊕ b` desugars to a call of the registered `__op_⊕` scheme.
    fn infer_binary(
        &mut self,
        expr_id: NodeId,
        op_span: Span,
        op: &str,
        lhs: &Expr,
        rhs: &Expr,
    ) -> IResult<Type> {
        let op_name = format!("__op_{op}");
        let scheme = self.lookup_op_scheme(&op_name, op, op_span)?;
        let callee_ty = self.ctx.instantiate(&scheme);

        let result = self.infer_call_like(expr_id, op_span, expr_id, callee_ty, &[lhs, rhs])?;

        if matches!(op, "+" | "-" | "*" | "/" | "<" | ">" | "<=" | ">=") {
            for operand in [lhs, rhs] {
                let operand_type = self
                    .marks
                    .type_of(operand.id)
                    .cloned()
                    .unwrap_or(Type::Unit);
                self.emit(ConstraintStub::Numeric {
                    operand: operand.id,
                    operand_type,
                });
            }
        } else if matches!(op, "&&" | "||") {
            for operand in [lhs, rhs] {
                let operand_type = self
                    .marks
                    .type_of(operand.id)
                    .cloned()
                    .unwrap_or(Type::Unit);
                self.emit(ConstraintStub::Boolean {
                    operand: operand.id,
                    operand_type,
                });
            }
        }

        Ok(result)
    }

    fn infer_unary(
        &mut self,
        expr_id: NodeId,
        op_span: Span,
        op: &str,
        operand: &Expr,
    ) -> IResult<Type> {
        let op_name = format!("__prefix_{op}");
        let scheme = self.lookup_op_scheme(&op_name, op, op_span)?;
        let callee_ty = self.ctx.instantiate(&scheme);

        let result = self.infer_call_like(expr_id, op_span, expr_id, callee_ty, &[operand])?;

        if op == "!" {
            let operand_type = self
                .marks
                .type_of(operand.id)
                .cloned()
                .unwrap_or(Type::Unit);
            self.emit(ConstraintStub::Boolean {
                operand: operand.id,
                operand_type,
            });
        }

        Ok(result)
    }

    fn lookup_op_scheme(&mut self, op_name: &str, op: &str, span: Span) -> IResult<Scheme> {
        match self.env.lookup_scheme(op_name) {
            Some(scheme) => Ok(scheme.clone()),
            None => {
                self.diagnostics
                    .error(
                        DiagnosticKind::UnknownOperator,
                        format!("operator `{op}` has no registered implementation"),
                        span,
                    )
                    .emit();
                Err(InferAbort)
            }
        }
    }

    fn infer_arrow(
        &mut self,
        expr_id: NodeId,
        span: Span,
        params: &[Param],
        body: &Expr,
    ) -> IResult<Type> {
        self.env.push_scope();

        let mut param_tys = Vec::new();
        for param in params {
            let ty = match &param.annotation {
                Some(te) => self.convert_type_expr(te, &HashMap::new())?,
                None => self.ctx.fresh_var(),
            };
            self.marks.record(param.name.id, param.name.span, ty.clone());
            self.env.insert(
                param.name.name.clone(),
                Scheme::mono(ty.clone()),
                Some(param.name.id),
            );
            param_tys.push(ty);
        }

        let body_ty = self.infer_expr(body);
        self.env.pop_scope();
        let body_ty = body_ty?;

        let return_node = match &body.kind {
            ExprKind::Block(block) => block.result.as_ref().map(|r| r.id).unwrap_or(body.id),
            _ => body.id,
        };
        self.functions.push(FunctionBoundary {
            name: None,
            node: expr_id,
            return_node,
            result_type: body_ty.clone(),
            declared_return: None,
            span,
        });

        if param_tys.is_empty() {
            Ok(Type::fun(Type::Unit, body_ty))
        } else {
            Ok(Type::fun_from(param_tys, body_ty))
        }
    }

    fn infer_block(&mut self, block: &Block) -> IResult<Type> {
        self.env.push_scope();
        let result = self.infer_block_inner(block);
        self.env.pop_scope();
        result
    }

    fn infer_block_inner(&mut self, block: &Block) -> IResult<Type> {
        for stmt in &block.stmts {
            match stmt {
                Stmt::Let(decl) => self.infer_let_decl(decl, false)?,
                Stmt::Expr(expr) => {
                    self.infer_expr(expr)?;
                }
            }
        }
        match &block.result {
            Some(result) => self.infer_expr(result),
            None => Ok(Type::Unit),
        }
    }

    fn infer_match(
        &mut self,
        expr_id: NodeId,
        span: Span,
        scrutinee: &Expr,
        arms: &[MatchArm],
    ) -> IResult<Type> {
        let scrutinee_ty = self.infer_expr(scrutinee)?;
        let result = self.ctx.fresh_var();

        let mut branches = Vec::new();
        let mut coverages = Vec::new();

        for arm in arms {
            self.env.push_scope();
            let mut binds = Vec::new();
            let mut seen = HashSet::new();
            let coverage = match self.infer_pattern(&arm.pattern, &scrutinee_ty, &mut binds, &mut seen)
            {
                Ok(c) => c,
                Err(abort) => {
                    self.env.pop_scope();
                    return Err(abort);
                }
            };
            for (name, ty, node) in binds {
                self.env.insert(name, Scheme::mono(ty), Some(node));
            }
            let body_ty = self.infer_expr(&arm.body);
            self.env.pop_scope();
            let body_ty = body_ty?;

            // Branch results join eagerly; a failure is left for the
            // solver's branch-join phase to report.
            let _ = self.ctx.unify(&result, &body_ty);

            branches.push((arm.body.id, body_ty));
            coverages.push(coverage);
        }

        let (covered, missing, covers_tail) =
            self.check_exhaustiveness(span, &scrutinee_ty, &coverages)?;

        // Discharge: a total match on Result strips the carrier.
        let resolved_scrutinee = self.ctx.resolve(&scrutinee_ty);
        let row = resolved_scrutinee.result_row().cloned();
        let mut discharges = false;

        if let Some(row) = &row {
            let ok_covered = covers_tail
                || coverages
                    .iter()
                    .any(|c| matches!(c, Coverage::Ctor { ctor, .. } if ctor == "Ok"));
            let err_covered = covers_tail
                || coverages
                    .iter()
                    .any(|c| matches!(c, Coverage::Ctor { ctor, .. } if ctor == "Err"));
            let (err_full, err_labels) = err_row_coverage(arms);
            let err_total = err_full
                || (row.tail.is_none()
                    && row.labels().all(|l| err_labels.iter().any(|c| c == l)));

            if ok_covered && err_covered && err_total {
                discharges = true;
                for arm in arms {
                    self.emit(ConstraintStub::Flow {
                        from: scrutinee.id,
                        to: arm.body.id,
                    });
                }
                // Ok branches drop the row right here; Err branches
                // retain it (they are the handlers).
                for arm in arms {
                    if matches!(&arm.pattern.kind, PatKind::Ctor { name, .. } if name == "Ok") {
                        self.emit(ConstraintStub::Rewrite {
                            node: arm.body.id,
                            remove: ConstraintLabel::Error(row.clone()),
                            add: None,
                        });
                    }
                }
            } else {
                // Not discharged: the carrier's labels escape upward.
                self.emit(ConstraintStub::Flow {
                    from: scrutinee.id,
                    to: expr_id,
                });
            }
        }

        self.matches.push(MatchInfo {
            node: expr_id,
            covered,
            missing,
            covers_tail,
            discharges_result: discharges,
            row: row.clone(),
        });

        self.emit(ConstraintStub::BranchJoin {
            origin: expr_id,
            scrutinee: Some(scrutinee.id),
            branches,
            result_type: result.clone(),
            discharges_result: discharges,
            error_row_coverage: row,
        });

        Ok(result)
    }

    /// Coverage check. Returns (covered, missing, covers_tail); missing
    /// non-empty aborts with `non_exhaustive_match`.
    fn check_exhaustiveness(
        &mut self,
        span: Span,
        scrutinee_ty: &Type,
        coverages: &[Coverage],
    ) -> IResult<(Vec<String>, Vec<String>, bool)> {
        let covers_tail = coverages.iter().any(|c| matches!(c, Coverage::Wildcard));
        let mut covered: Vec<String> = Vec::new();
        for c in coverages {
            match c {
                Coverage::Ctor { ctor, .. } => covered.push(ctor.clone()),
                Coverage::BoolLit(b) => covered.push(b.to_string()),
                Coverage::RowCase(label) => covered.push(label.clone()),
                Coverage::Wildcard | Coverage::None => {}
            }
        }

        if covers_tail {
            return Ok((covered, Vec::new(), true));
        }

        let resolved = self.ctx.resolve(scrutinee_ty);
        let missing: Vec<String> = match &resolved {
            Type::Bool => ["true", "false"]
                .iter()
                .filter(|b| !covered.iter().any(|c| c == *b))
                .map(|b| b.to_string())
                .collect(),
            Type::Ctor { name, .. } => match self.adts.get(name) {
                Some(adt) => adt
                    .ctor_names()
                    .into_iter()
                    .filter(|c| !covered.contains(c))
                    .collect(),
                None => Vec::new(),
            },
            _ => Vec::new(),
        };

        if !missing.is_empty() {
            self.diagnostics
                .error(
                    DiagnosticKind::NonExhaustiveMatch,
                    format!("non-exhaustive match: missing {}", missing.join(", ")),
                    span,
                )
                .detail("missing", missing.join(","))
                .emit();
            return Err(InferAbort);
        }

        Ok((covered, missing, false))
    }

    fn infer_field(
        &mut self,
        expr_id: NodeId,
        base: &Expr,
        field: &str,
        field_span: Span,
    ) -> IResult<Type> {
        // Namespace member access resolves directly.
        if let ExprKind::Var(name) = &base.kind {
            if let Some(EnvBinding::Namespace(exports)) = self.env.lookup(name) {
                let exports = exports.clone();
                // Mark the base as a record of the namespace exports.
                let record: Type = Type::Record(
                    exports
                        .iter()
                        .map(|(k, s)| (k.clone(), self.ctx.instantiate(s)))
                        .collect(),
                );
                self.marks.record(base.id, base.span, record);
                return match exports.get(field) {
                    Some(scheme) => {
                        let scheme = scheme.clone();
                        Ok(self.ctx.instantiate(&scheme))
                    }
                    None => {
                        self.diagnostics
                            .error(
                                DiagnosticKind::MissingExport,
                                format!("namespace `{name}` has no export `{field}`"),
                                field_span,
                            )
                            .emit();
                        Err(InferAbort)
                    }
                };
            }
        }

        let base_ty = self.infer_expr(base)?;
        let result = self.ctx.fresh_var();

        self.emit(ConstraintStub::HasField {
            record: base.id,
            record_type: base_ty.clone(),
            field: field.to_string(),
            result_type: result.clone(),
        });

        // Eager resolution when the record shape is already known; a
        // still-unknown base is left to the solver.
        let resolved = self.ctx.resolve(&base_ty);
        match &resolved {
            Type::Record(fields) => match fields.get(field) {
                Some(field_ty) => {
                    let field_ty = field_ty.clone();
                    if let Err(err) = self.ctx.unify(&result, &field_ty) {
                        self.report_unify_error(err, field_span);
                        return Err(InferAbort);
                    }
                }
                None => {
                    self.diagnostics
                        .error(
                            DiagnosticKind::UnknownField,
                            format!("no field `{field}` on record"),
                            field_span,
                        )
                        .emit();
                    return Err(InferAbort);
                }
            },
            Type::Var(_) | Type::Unknown(_) => {}
            other => {
                let mut namer = crate::types::TypeNamer::new();
                self.diagnostics
                    .error(
                        DiagnosticKind::UnknownField,
                        format!(
                            "field access on non-record type {}",
                            crate::types::format_type_with(other, &mut namer)
                        ),
                        field_span,
                    )
                    .emit();
                return Err(InferAbort);
            }
        }

        Ok(result)
    }
}

/// How the `Err` side of a match covers the scrutinee's error row:
/// a wildcard-ish subpattern covers everything; constructor subpatterns
/// cover their labels.
fn err_row_coverage(arms: &[MatchArm]) -> (bool, Vec<String>) {
    let mut full = false;
    let mut labels = Vec::new();
    for arm in arms {
        match &arm.pattern.kind {
            PatKind::Wildcard | PatKind::Var(_) => full = true,
            PatKind::Ctor { name, args } if name == "Err" => match args.first().map(|p| &p.kind) {
                None | Some(PatKind::Wildcard) | Some(PatKind::Var(_)) => full = true,
                Some(PatKind::Ctor { name: label, .. }) => labels.push(label.clone()),
                _ => {}
            },
            _ => {}
        }
    }
    (full, labels)
}
