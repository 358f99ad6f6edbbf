//! The substitution map and the shared type context.

use std::collections::HashMap;

use indexmap::IndexMap;

use super::{ErrorRow, Scheme, Type, TypeVarId};

/// Map from unification variable to type. Grows monotonically; applied
/// transitively on read (var-to-var chains are followed, without path
/// compression).
#[derive(Debug, Clone, Default)]
pub struct Subst {
    map: HashMap<TypeVarId, Type>,
}

impl Subst {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, var: TypeVarId) -> Option<&Type> {
        self.map.get(&var)
    }

    pub fn insert(&mut self, var: TypeVarId, ty: Type) {
        debug_assert!(
            !self.map.contains_key(&var),
            "substitution rebinding {var}"
        );
        self.map.insert(var, ty);
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Deeply apply the substitution, following chains.
    pub fn apply(&self, ty: &Type) -> Type {
        match ty {
            Type::Var(v) => match self.map.get(v) {
                Some(bound) => self.apply(bound),
                None => Type::Var(*v),
            },
            Type::Fun(from, to) => Type::fun(self.apply(from), self.apply(to)),
            Type::Ctor { name, args } => Type::Ctor {
                name: name.clone(),
                args: args.iter().map(|a| self.apply(a)).collect(),
            },
            Type::Tuple(elems) => Type::Tuple(elems.iter().map(|e| self.apply(e)).collect()),
            Type::Record(fields) => Type::Record(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), self.apply(v)))
                    .collect(),
            ),
            Type::Row(row) => Type::Row(self.apply_row(row)),
            Type::Int | Type::Bool | Type::Char | Type::Str | Type::Unit | Type::Unknown(_) => {
                ty.clone()
            }
        }
    }

    /// Apply to a row: payloads are substituted, and a bound tail is
    /// merged into the case set (adopting the bound row's tail).
    pub fn apply_row(&self, row: &ErrorRow) -> ErrorRow {
        let mut cases: IndexMap<String, Option<Box<Type>>> = row
            .cases
            .iter()
            .map(|(label, payload)| {
                (
                    label.clone(),
                    payload.as_ref().map(|p| Box::new(self.apply(p))),
                )
            })
            .collect();

        let mut tail = row.tail;
        while let Some(var) = tail {
            match self.map.get(&var) {
                Some(Type::Row(bound)) => {
                    let bound = self.apply_row(bound);
                    for (label, payload) in bound.cases {
                        cases.entry(label).or_insert(payload);
                    }
                    tail = bound.tail;
                }
                Some(Type::Var(next)) => tail = Some(*next),
                Some(_) | None => break,
            }
        }

        ErrorRow { cases, tail }
    }
}

/// Shared mutable state of a compilation: the fresh-variable counter and
/// the substitution. One context per program; creating a new context is
/// the `resetTypeVarCounter` of the design notes.
#[derive(Debug, Default)]
pub struct TypeCtx {
    pub subst: Subst,
    next_var: u32,
}

impl TypeCtx {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fresh_var_id(&mut self) -> TypeVarId {
        let id = TypeVarId(self.next_var);
        self.next_var += 1;
        id
    }

    pub fn fresh_var(&mut self) -> Type {
        Type::Var(self.fresh_var_id())
    }

    /// Number of variables handed out so far.
    pub fn var_count(&self) -> u32 {
        self.next_var
    }

    /// Fully resolve a type against the current substitution.
    pub fn resolve(&self, ty: &Type) -> Type {
        self.subst.apply(ty)
    }

    /// Instantiate a scheme: quantified variables become fresh ones.
    pub fn instantiate(&mut self, scheme: &Scheme) -> Type {
        if scheme.vars.is_empty() {
            return scheme.ty.clone();
        }
        let mapping: HashMap<TypeVarId, TypeVarId> = scheme
            .vars
            .iter()
            .map(|v| (*v, self.fresh_var_id()))
            .collect();
        rename(&scheme.ty, &mapping)
    }

    /// Generalize `ty` over everything not free in the environment.
    ///
    /// `env_free` must already be resolved through the substitution.
    pub fn generalize(&self, env_free: &[TypeVarId], ty: &Type) -> Scheme {
        let resolved = self.resolve(ty);
        let mut vars = Vec::new();
        resolved.free_vars(&mut vars);
        vars.retain(|v| !env_free.contains(v));
        Scheme::new(vars, resolved)
    }
}

fn rename(ty: &Type, mapping: &HashMap<TypeVarId, TypeVarId>) -> Type {
    match ty {
        Type::Var(v) => match mapping.get(v) {
            Some(fresh) => Type::Var(*fresh),
            None => Type::Var(*v),
        },
        Type::Fun(from, to) => Type::fun(rename(from, mapping), rename(to, mapping)),
        Type::Ctor { name, args } => Type::Ctor {
            name: name.clone(),
            args: args.iter().map(|a| rename(a, mapping)).collect(),
        },
        Type::Tuple(elems) => Type::Tuple(elems.iter().map(|e| rename(e, mapping)).collect()),
        Type::Record(fields) => Type::Record(
            fields
                .iter()
                .map(|(k, v)| (k.clone(), rename(v, mapping)))
                .collect(),
        ),
        Type::Row(row) => Type::Row(ErrorRow {
            cases: row
                .cases
                .iter()
                .map(|(label, payload)| {
                    (
                        label.clone(),
                        payload.as_ref().map(|p| Box::new(rename(p, mapping))),
                    )
                })
                .collect(),
            tail: row.tail.map(|t| mapping.get(&t).copied().unwrap_or(t)),
        }),
        Type::Int | Type::Bool | Type::Char | Type::Str | Type::Unit | Type::Unknown(_) => {
            ty.clone()
        }
    }
}
