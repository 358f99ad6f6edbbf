//! Pattern inference: types, bindings, and coverage.

use std::collections::HashSet;

use workman_core::NodeId;

use crate::diagnostics::DiagnosticKind;
use crate::parser::ast::{PatKind, Pattern};
use crate::types::Type;

use super::{IResult, InferAbort, Inferencer};

/// What one arm's pattern covers of the scrutinee space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Coverage {
    /// Matches anything (wildcard, variable, all-irrefutable tuple).
    Wildcard,
    /// One constructor of an ADT.
    Ctor { type_name: String, ctor: String },
    /// One boolean literal.
    BoolLit(bool),
    /// One label of an error row (inside an `Err(...)` pattern).
    RowCase(String),
    /// Covers no enumerable case (int/char/string literals, mixed
    /// tuples).
    None,
}

impl Inferencer<'_> {
    /// Infer a pattern against the expected type, accumulating variable
    /// bindings. Duplicate variables within one pattern are rejected.
    pub(crate) fn infer_pattern(
        &mut self,
        pat: &Pattern,
        expected: &Type,
        binds: &mut Vec<(String, Type, NodeId)>,
        seen: &mut HashSet<String>,
    ) -> IResult<Coverage> {
        let coverage = match &pat.kind {
            PatKind::Wildcard => {
                self.marks.record(pat.id, pat.span, expected.clone());
                Coverage::Wildcard
            }
            PatKind::Var(name) => {
                if !seen.insert(name.clone()) {
                    self.diagnostics
                        .error(
                            DiagnosticKind::DuplicatePatternVariable,
                            format!("duplicate pattern variable `{name}`"),
                            pat.span,
                        )
                        .emit();
                    return Err(InferAbort);
                }
                self.marks.record(pat.id, pat.span, expected.clone());
                binds.push((name.clone(), expected.clone(), pat.id));
                Coverage::Wildcard
            }
            PatKind::Int(_) => {
                self.unify_pattern(expected, &Type::Int, pat)?;
                Coverage::None
            }
            PatKind::Bool(b) => {
                self.unify_pattern(expected, &Type::Bool, pat)?;
                Coverage::BoolLit(*b)
            }
            PatKind::Char(_) => {
                self.unify_pattern(expected, &Type::Char, pat)?;
                Coverage::None
            }
            PatKind::Str(_) => {
                // Accepted here; MIR lowering rejects string patterns
                // with a targeted error.
                self.unify_pattern(expected, &Type::Str, pat)?;
                Coverage::None
            }
            PatKind::Tuple(elems) => {
                let resolved = self.ctx.resolve(expected);
                let elem_tys: Vec<Type> = match &resolved {
                    Type::Tuple(tys) => {
                        if tys.len() != elems.len() {
                            self.diagnostics
                                .error(
                                    DiagnosticKind::TupleArityMismatch,
                                    format!(
                                        "tuple pattern has {} elements, scrutinee has {}",
                                        elems.len(),
                                        tys.len()
                                    ),
                                    pat.span,
                                )
                                .emit();
                            return Err(InferAbort);
                        }
                        tys.clone()
                    }
                    _ => {
                        let vars: Vec<Type> =
                            elems.iter().map(|_| self.ctx.fresh_var()).collect();
                        self.unify_pattern(expected, &Type::Tuple(vars.clone()), pat)?;
                        vars
                    }
                };

                let mut all_wildcard = true;
                for (elem, elem_ty) in elems.iter().zip(&elem_tys) {
                    let sub = self.infer_pattern(elem, elem_ty, binds, seen)?;
                    if sub != Coverage::Wildcard {
                        all_wildcard = false;
                    }
                }
                self.marks.record(pat.id, pat.span, Type::Tuple(elem_tys));
                if all_wildcard {
                    Coverage::Wildcard
                } else {
                    Coverage::None
                }
            }
            PatKind::Ctor { name, args } => {
                let resolved = self.ctx.resolve(expected);
                if let Type::Row(row) = &resolved {
                    return self.infer_row_case_pattern(pat, name, args, row, binds, seen);
                }
                self.infer_ctor_pattern(pat, name, args, expected, binds, seen)?
            }
        };

        if self.marks.get(pat.id).is_none() {
            let resolved = self.ctx.resolve(expected);
            self.marks.record(pat.id, pat.span, resolved);
        }
        Ok(coverage)
    }

    fn infer_ctor_pattern(
        &mut self,
        pat: &Pattern,
        name: &str,
        args: &[Pattern],
        expected: &Type,
        binds: &mut Vec<(String, Type, NodeId)>,
        seen: &mut HashSet<String>,
    ) -> IResult<Coverage> {
        let Some((adt, info)) = self.adts.lookup_ctor(name) else {
            self.diagnostics
                .error(
                    DiagnosticKind::UnknownConstructor,
                    format!("unknown constructor `{name}` in pattern"),
                    pat.span,
                )
                .emit();
            return Err(InferAbort);
        };
        let type_name = adt.name.clone();
        let arity = info.arity;
        let scheme = info.scheme.clone();

        if args.len() != arity {
            self.diagnostics
                .error(
                    DiagnosticKind::ConstructorArityMismatch,
                    format!(
                        "constructor `{name}` takes {arity} argument(s), pattern has {}",
                        args.len()
                    ),
                    pat.span,
                )
                .emit();
            return Err(InferAbort);
        }

        // Peel field types off the instantiated constructor scheme,
        // then unify the result with the scrutinee BEFORE descending:
        // sub-patterns (row cases in particular) need resolved fields.
        let mut current = self.ctx.instantiate(&scheme);
        let mut field_tys = Vec::new();
        for _ in 0..arity {
            let Type::Fun(field_ty, rest) = current else {
                // Scheme shape is arity-many arrows by construction.
                unreachable!("constructor scheme shorter than its arity");
            };
            field_tys.push(*field_ty);
            current = *rest;
        }

        self.unify_pattern(expected, &current, pat)?;
        for (arg, field_ty) in args.iter().zip(&field_tys) {
            self.infer_pattern(arg, field_ty, binds, seen)?;
        }
        self.marks.record(pat.id, pat.span, current);

        Ok(Coverage::Ctor {
            type_name,
            ctor: name.to_string(),
        })
    }

    /// Constructor pattern matched against an error row: the name must
    /// be one of the row's labels.
    fn infer_row_case_pattern(
        &mut self,
        pat: &Pattern,
        label: &str,
        args: &[Pattern],
        row: &crate::types::ErrorRow,
        binds: &mut Vec<(String, Type, NodeId)>,
        seen: &mut HashSet<String>,
    ) -> IResult<Coverage> {
        let Some(payload) = row.cases.get(label) else {
            self.diagnostics
                .error(
                    DiagnosticKind::UnknownConstructor,
                    format!("error row has no case `{label}`"),
                    pat.span,
                )
                .detail("row", row.labels().collect::<Vec<_>>().join(","))
                .emit();
            return Err(InferAbort);
        };

        match (payload.clone(), args) {
            (None, []) => {}
            (Some(payload_ty), [sub]) => {
                self.infer_pattern(sub, &payload_ty, binds, seen)?;
            }
            (expected_payload, _) => {
                let expected_arity = usize::from(expected_payload.is_some());
                self.diagnostics
                    .error(
                        DiagnosticKind::ConstructorArityMismatch,
                        format!(
                            "error case `{label}` takes {expected_arity} argument(s), pattern has {}",
                            args.len()
                        ),
                        pat.span,
                    )
                    .emit();
                return Err(InferAbort);
            }
        }

        self.marks
            .record(pat.id, pat.span, Type::Row(row.clone()));
        Ok(Coverage::RowCase(label.to_string()))
    }

    fn unify_pattern(&mut self, expected: &Type, actual: &Type, pat: &Pattern) -> IResult<()> {
        if let Err(err) = self.ctx.unify(expected, actual) {
            self.report_unify_error(err, pat.span);
            return Err(InferAbort);
        }
        Ok(())
    }
}
