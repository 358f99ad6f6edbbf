//! Semantic types for inference and solving.
//!
//! Types are owned trees; recursive ADTs are encoded by name reference
//! (`List<T>` stays a constructor application resolved through the ADT
//! environment), so no cyclic structures ever arise. Unification
//! variables are bound through the process-wide [`Subst`], applied
//! lazily on read.

mod printer;
mod subst;
mod unify;

#[cfg(test)]
mod types_tests;
#[cfg(test)]
mod unify_tests;

use indexmap::IndexMap;

pub use printer::{TypeNamer, format_scheme, format_type, format_type_with};
pub use subst::{Subst, TypeCtx};
pub use unify::{UnifyError, substitution_is_idempotent};

/// A unification variable. IDs are fresh per compilation context.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct TypeVarId(pub u32);

impl std::fmt::Display for TypeVarId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "?{}", self.0)
    }
}

/// Why an `Unknown` hole exists.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum HoleProvenance {
    /// The user wrote `?`.
    UserHole,
    /// Introduced while recovering from a type error.
    TypeError,
    /// Inference could not complete for this node.
    Incomplete,
}

/// An error row: a set of labelled error cases plus an optional open
/// tail variable. This is the `E` of `Result<T, E>`.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct ErrorRow {
    /// Label to optional payload type. Keys are unique; order is
    /// first-seen and preserved for display.
    pub cases: IndexMap<String, Option<Box<Type>>>,
    /// Open tail: more cases may flow in through unification.
    pub tail: Option<TypeVarId>,
}

impl ErrorRow {
    pub fn closed(cases: IndexMap<String, Option<Box<Type>>>) -> Self {
        Self { cases, tail: None }
    }

    pub fn from_labels<I: IntoIterator<Item = String>>(labels: I) -> Self {
        Self {
            cases: labels.into_iter().map(|l| (l, None)).collect(),
            tail: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty() && self.tail.is_none()
    }

    /// Union of two rows. Payloads from `self` win on label collision;
    /// the tail is kept when either side has one.
    pub fn union(&self, other: &ErrorRow) -> ErrorRow {
        let mut cases = self.cases.clone();
        for (label, payload) in &other.cases {
            cases.entry(label.clone()).or_insert_with(|| payload.clone());
        }
        ErrorRow {
            cases,
            tail: self.tail.or(other.tail),
        }
    }

    /// Whether every case of `other` appears in `self`.
    pub fn covers(&self, other: &ErrorRow) -> bool {
        other.cases.keys().all(|l| self.cases.contains_key(l))
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.cases.keys().map(|s| s.as_str())
    }
}

/// A semantic type.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Type {
    /// Unification variable.
    Var(TypeVarId),
    /// Curried function type; right-associative by construction.
    Fun(Box<Type>, Box<Type>),
    /// Saturated type application: user ADTs plus `Result`.
    Ctor { name: String, args: Vec<Type> },
    /// Always at least two elements; length-1 tuples are coerced to
    /// their element by the parser.
    Tuple(Vec<Type>),
    /// Record with named fields (namespace imports, foreign seeds).
    Record(IndexMap<String, Type>),
    /// First-class error row.
    Row(ErrorRow),
    Int,
    Bool,
    Char,
    Str,
    Unit,
    /// A hole with provenance; unifies with anything and stays a hole.
    Unknown(HoleProvenance),
}

impl Type {
    pub fn fun(from: Type, to: Type) -> Type {
        Type::Fun(Box::new(from), Box::new(to))
    }

    /// Build `a -> b -> ... -> result` from a parameter list.
    pub fn fun_from(params: Vec<Type>, result: Type) -> Type {
        params
            .into_iter()
            .rev()
            .fold(result, |acc, p| Type::fun(p, acc))
    }

    pub fn ctor(name: impl Into<String>, args: Vec<Type>) -> Type {
        Type::Ctor {
            name: name.into(),
            args,
        }
    }

    /// The error-row carrier `Result<ok, err>`.
    pub fn result(ok: Type, err: Type) -> Type {
        Type::ctor("Result", vec![ok, err])
    }

    /// Split a `Result<T, E>` into `(T, E)`.
    pub fn result_parts(&self) -> Option<(&Type, &Type)> {
        match self {
            Type::Ctor { name, args } if name == "Result" && args.len() == 2 => {
                Some((&args[0], &args[1]))
            }
            _ => None,
        }
    }

    pub fn is_result(&self) -> bool {
        self.result_parts().is_some()
    }

    /// The error row of a `Result` type, when its error side is a row.
    pub fn result_row(&self) -> Option<&ErrorRow> {
        match self.result_parts() {
            Some((_, Type::Row(row))) => Some(row),
            _ => None,
        }
    }

    /// Collect free unification variables in first-occurrence order.
    pub fn free_vars(&self, out: &mut Vec<TypeVarId>) {
        match self {
            Type::Var(v) => {
                if !out.contains(v) {
                    out.push(*v);
                }
            }
            Type::Fun(from, to) => {
                from.free_vars(out);
                to.free_vars(out);
            }
            Type::Ctor { args, .. } => {
                for arg in args {
                    arg.free_vars(out);
                }
            }
            Type::Tuple(elems) => {
                for elem in elems {
                    elem.free_vars(out);
                }
            }
            Type::Record(fields) => {
                for ty in fields.values() {
                    ty.free_vars(out);
                }
            }
            Type::Row(row) => {
                for payload in row.cases.values().flatten() {
                    payload.free_vars(out);
                }
                if let Some(tail) = row.tail {
                    if !out.contains(&tail) {
                        out.push(tail);
                    }
                }
            }
            Type::Int | Type::Bool | Type::Char | Type::Str | Type::Unit | Type::Unknown(_) => {}
        }
    }

    /// Whether `var` occurs anywhere in this type.
    pub fn occurs(&self, var: TypeVarId) -> bool {
        let mut vars = Vec::new();
        self.free_vars(&mut vars);
        vars.contains(&var)
    }
}

/// A type scheme: universally quantified variables plus a body.
/// The unit of let-polymorphism.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Scheme {
    pub vars: Vec<TypeVarId>,
    pub ty: Type,
}

impl Scheme {
    /// A monomorphic scheme with no quantifiers.
    pub fn mono(ty: Type) -> Self {
        Self {
            vars: Vec::new(),
            ty,
        }
    }

    pub fn new(vars: Vec<TypeVarId>, ty: Type) -> Self {
        Self { vars, ty }
    }
}
