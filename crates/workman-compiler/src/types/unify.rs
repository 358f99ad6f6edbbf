//! Structural unification with open error rows.

use indexmap::IndexMap;

use super::{ErrorRow, Subst, Type, TypeCtx, TypeVarId};

/// Failure modes of unification. Converted to diagnostics by the caller
/// using the pretty-printer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnifyError {
    Mismatch { left: Type, right: Type },
    Occurs { var: TypeVarId, ty: Type },
    TupleArity { left: usize, right: usize },
}

impl TypeCtx {
    /// Unify two types, growing the substitution.
    ///
    /// Both sides are resolved against the current substitution first;
    /// `Unknown` holes unify with anything and remain holes.
    pub fn unify(&mut self, a: &Type, b: &Type) -> Result<(), UnifyError> {
        let a = self.resolve(a);
        let b = self.resolve(b);

        match (&a, &b) {
            (Type::Var(va), Type::Var(vb)) if va == vb => Ok(()),
            (Type::Var(v), other) | (other, Type::Var(v)) => self.bind(*v, other),

            (Type::Unknown(_), _) | (_, Type::Unknown(_)) => Ok(()),

            (Type::Int, Type::Int)
            | (Type::Bool, Type::Bool)
            | (Type::Char, Type::Char)
            | (Type::Str, Type::Str)
            | (Type::Unit, Type::Unit) => Ok(()),

            (Type::Fun(a1, a2), Type::Fun(b1, b2)) => {
                self.unify(a1, b1)?;
                self.unify(a2, b2)
            }

            (
                Type::Ctor {
                    name: n1,
                    args: args1,
                },
                Type::Ctor {
                    name: n2,
                    args: args2,
                },
            ) => {
                if n1 != n2 || args1.len() != args2.len() {
                    return Err(UnifyError::Mismatch { left: a.clone(), right: b.clone() });
                }
                for (x, y) in args1.iter().zip(args2) {
                    self.unify(x, y)?;
                }
                Ok(())
            }

            (Type::Tuple(e1), Type::Tuple(e2)) => {
                if e1.len() != e2.len() {
                    return Err(UnifyError::TupleArity {
                        left: e1.len(),
                        right: e2.len(),
                    });
                }
                for (x, y) in e1.iter().zip(e2) {
                    self.unify(x, y)?;
                }
                Ok(())
            }

            (Type::Record(f1), Type::Record(f2)) => {
                if f1.len() != f2.len() || !f1.keys().all(|k| f2.contains_key(k)) {
                    return Err(UnifyError::Mismatch { left: a.clone(), right: b.clone() });
                }
                for (key, x) in f1 {
                    self.unify(x, &f2[key])?;
                }
                Ok(())
            }

            (Type::Row(r1), Type::Row(r2)) => self.unify_rows(r1, r2),

            _ => Err(UnifyError::Mismatch { left: a, right: b }),
        }
    }

    fn bind(&mut self, var: TypeVarId, ty: &Type) -> Result<(), UnifyError> {
        if let Type::Var(v) = ty {
            if *v == var {
                return Ok(());
            }
        }
        if ty.occurs(var) {
            return Err(UnifyError::Occurs {
                var,
                ty: ty.clone(),
            });
        }
        self.subst.insert(var, ty.clone());
        Ok(())
    }

    /// Row unification. Shared labels unify their payloads; labels
    /// missing on one side flow into that side's tail when it is open,
    /// and are a mismatch when it is closed.
    fn unify_rows(&mut self, r1: &ErrorRow, r2: &ErrorRow) -> Result<(), UnifyError> {
        let r1 = self.subst.apply_row(r1);
        let r2 = self.subst.apply_row(r2);

        for (label, p1) in &r1.cases {
            if let Some(p2) = r2.cases.get(label) {
                match (p1, p2) {
                    (Some(x), Some(y)) => self.unify(x, y)?,
                    (None, None) => {}
                    _ => {
                        return Err(UnifyError::Mismatch {
                            left: Type::Row(r1.clone()),
                            right: Type::Row(r2.clone()),
                        });
                    }
                }
            }
        }

        let only_in_r1: IndexMap<String, Option<Box<Type>>> = r1
            .cases
            .iter()
            .filter(|(l, _)| !r2.cases.contains_key(*l))
            .map(|(l, p)| (l.clone(), p.clone()))
            .collect();
        let only_in_r2: IndexMap<String, Option<Box<Type>>> = r2
            .cases
            .iter()
            .filter(|(l, _)| !r1.cases.contains_key(*l))
            .map(|(l, p)| (l.clone(), p.clone()))
            .collect();

        match (r1.tail, r2.tail) {
            (None, None) => {
                if only_in_r1.is_empty() && only_in_r2.is_empty() {
                    Ok(())
                } else {
                    Err(UnifyError::Mismatch {
                        left: Type::Row(r1),
                        right: Type::Row(r2),
                    })
                }
            }
            (Some(t1), None) => {
                if !only_in_r1.is_empty() {
                    return Err(UnifyError::Mismatch {
                        left: Type::Row(r1),
                        right: Type::Row(r2),
                    });
                }
                self.bind_row_tail(t1, only_in_r2, None)
            }
            (None, Some(t2)) => {
                if !only_in_r2.is_empty() {
                    return Err(UnifyError::Mismatch {
                        left: Type::Row(r1),
                        right: Type::Row(r2),
                    });
                }
                self.bind_row_tail(t2, only_in_r1, None)
            }
            (Some(t1), Some(t2)) => {
                if t1 == t2 {
                    if only_in_r1.is_empty() && only_in_r2.is_empty() {
                        return Ok(());
                    }
                    return Err(UnifyError::Mismatch {
                        left: Type::Row(r1),
                        right: Type::Row(r2),
                    });
                }
                let shared = self.fresh_var_id();
                self.bind_row_tail(t1, only_in_r2, Some(shared))?;
                self.bind_row_tail(t2, only_in_r1, Some(shared))
            }
        }
    }

    fn bind_row_tail(
        &mut self,
        tail: TypeVarId,
        cases: IndexMap<String, Option<Box<Type>>>,
        new_tail: Option<TypeVarId>,
    ) -> Result<(), UnifyError> {
        if cases.is_empty() && new_tail.is_none() {
            // Close the row.
            self.subst.insert(tail, Type::Row(ErrorRow::default()));
            return Ok(());
        }
        let row = ErrorRow {
            cases,
            tail: new_tail,
        };
        let ty = Type::Row(row);
        if ty.occurs(tail) {
            return Err(UnifyError::Occurs { var: tail, ty });
        }
        self.subst.insert(tail, ty);
        Ok(())
    }
}

/// Idempotence helper used by the test suite: applying the final
/// substitution twice must equal applying it once.
pub fn substitution_is_idempotent(subst: &Subst, ty: &Type) -> bool {
    let once = subst.apply(ty);
    let twice = subst.apply(&once);
    once == twice
}
