//! Pretty-printing of types with human-readable variable names.
//!
//! Free unification variables are renamed `T, U, V, ...` in order of
//! first appearance, so the same variable prints the same way across a
//! whole diagnostic or typed view.

use std::collections::HashMap;

use super::{ErrorRow, Scheme, Type, TypeVarId};

const NAME_POOL: &[&str] = &["T", "U", "V", "W", "X", "Y", "Z"];

/// Stable `T, U, V, ...` naming for type variables.
#[derive(Debug, Default)]
pub struct TypeNamer {
    names: HashMap<TypeVarId, String>,
    next: usize,
}

impl TypeNamer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name_of(&mut self, var: TypeVarId) -> String {
        if let Some(name) = self.names.get(&var) {
            return name.clone();
        }
        let index = self.next;
        self.next += 1;
        let name = if index < NAME_POOL.len() {
            NAME_POOL[index].to_string()
        } else {
            format!("{}{}", NAME_POOL[index % NAME_POOL.len()], index / NAME_POOL.len())
        };
        self.names.insert(var, name.clone());
        name
    }
}

/// Format a type with a fresh namer.
pub fn format_type(ty: &Type) -> String {
    let mut namer = TypeNamer::new();
    format_type_with(ty, &mut namer)
}

/// Format a type, sharing variable names with the caller's namer.
pub fn format_type_with(ty: &Type, namer: &mut TypeNamer) -> String {
    match ty {
        Type::Var(v) => namer.name_of(*v),
        Type::Fun(from, to) => {
            let from_str = match from.as_ref() {
                Type::Fun(..) => format!("({})", format_type_with(from, namer)),
                _ => format_type_with(from, namer),
            };
            format!("{} -> {}", from_str, format_type_with(to, namer))
        }
        Type::Ctor { name, args } => {
            if args.is_empty() {
                name.clone()
            } else {
                let args = args
                    .iter()
                    .map(|a| format_type_with(a, namer))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{name}<{args}>")
            }
        }
        Type::Tuple(elems) => {
            let elems = elems
                .iter()
                .map(|e| format_type_with(e, namer))
                .collect::<Vec<_>>()
                .join(", ");
            format!("({elems})")
        }
        Type::Record(fields) => {
            let fields = fields
                .iter()
                .map(|(k, v)| format!("{k}: {}", format_type_with(v, namer)))
                .collect::<Vec<_>>()
                .join(", ");
            format!("{{ {fields} }}")
        }
        Type::Row(row) => format_row(row, namer),
        Type::Int => "Int".to_string(),
        Type::Bool => "Bool".to_string(),
        Type::Char => "Char".to_string(),
        Type::Str => "String".to_string(),
        Type::Unit => "Unit".to_string(),
        Type::Unknown(_) => "?".to_string(),
    }
}

fn format_row(row: &ErrorRow, namer: &mut TypeNamer) -> String {
    let mut parts: Vec<String> = row
        .cases
        .iter()
        .map(|(label, payload)| match payload {
            Some(ty) => format!("{label}<{}>", format_type_with(ty, namer)),
            None => label.clone(),
        })
        .collect();
    if let Some(tail) = row.tail {
        parts.push(format!("..{}", namer.name_of(tail)));
    }
    format!("<{}>", parts.join(", "))
}

/// Format a scheme: `∀T, U. body` (or just the body when monomorphic).
pub fn format_scheme(scheme: &Scheme) -> String {
    let mut namer = TypeNamer::new();
    if scheme.vars.is_empty() {
        return format_type_with(&scheme.ty, &mut namer);
    }
    let vars = scheme
        .vars
        .iter()
        .map(|v| namer.name_of(*v))
        .collect::<Vec<_>>()
        .join(", ");
    format!("∀{}. {}", vars, format_type_with(&scheme.ty, &mut namer))
}
