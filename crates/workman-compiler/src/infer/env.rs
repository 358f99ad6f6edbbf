//! Scoped identifier environment.

use indexmap::IndexMap;
use workman_core::NodeId;

use crate::types::{Scheme, Subst, TypeVarId};

/// What a name is bound to.
#[derive(Debug, Clone)]
pub enum EnvBinding {
    Value {
        scheme: Scheme,
        /// Binder node, when the binding came from source. Used to alias
        /// constraint labels between binder and uses.
        node: Option<NodeId>,
    },
    /// `import * as ns` binds the module's exported values as a unit.
    Namespace(IndexMap<String, Scheme>),
}

/// Identifier environment as a scope stack.
///
/// Scoped blocks push and pop; restoration on every exit path is the
/// caller's responsibility and is kept trivial by pairing each
/// `push_scope` with exactly one `pop_scope`.
#[derive(Debug, Clone)]
pub struct TypeEnv {
    scopes: Vec<IndexMap<String, EnvBinding>>,
}

impl Default for TypeEnv {
    fn default() -> Self {
        Self {
            scopes: vec![IndexMap::new()],
        }
    }
}

impl TypeEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(IndexMap::new());
    }

    pub fn pop_scope(&mut self) {
        debug_assert!(self.scopes.len() > 1, "popping the global scope");
        self.scopes.pop();
    }

    /// Bind in the innermost scope, shadowing outer bindings.
    pub fn insert(&mut self, name: impl Into<String>, scheme: Scheme, node: Option<NodeId>) {
        self.scopes
            .last_mut()
            .expect("scope stack never empty")
            .insert(name.into(), EnvBinding::Value { scheme, node });
    }

    pub fn insert_namespace(&mut self, name: impl Into<String>, exports: IndexMap<String, Scheme>) {
        self.scopes
            .last_mut()
            .expect("scope stack never empty")
            .insert(name.into(), EnvBinding::Namespace(exports));
    }

    /// Innermost binding for `name`.
    pub fn lookup(&self, name: &str) -> Option<&EnvBinding> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    pub fn lookup_scheme(&self, name: &str) -> Option<&Scheme> {
        match self.lookup(name) {
            Some(EnvBinding::Value { scheme, .. }) => Some(scheme),
            _ => None,
        }
    }

    /// Names visible at this point, innermost shadowing outermost.
    /// Captured into the marks as the per-node scope snapshot.
    pub fn visible_names(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for scope in self.scopes.iter().rev() {
            for name in scope.keys() {
                if !out.contains(name) {
                    out.push(name.clone());
                }
            }
        }
        out
    }

    /// Free unification variables of every scheme in scope, resolved
    /// through `subst`. This is the "not free in the environment" set
    /// that generalization must never capture.
    pub fn free_vars(&self, subst: &Subst) -> Vec<TypeVarId> {
        let mut out = Vec::new();
        for scope in &self.scopes {
            for binding in scope.values() {
                match binding {
                    EnvBinding::Value { scheme, .. } => {
                        collect_scheme_free_vars(scheme, subst, &mut out);
                    }
                    EnvBinding::Namespace(exports) => {
                        for scheme in exports.values() {
                            collect_scheme_free_vars(scheme, subst, &mut out);
                        }
                    }
                }
            }
        }
        out
    }
}

fn collect_scheme_free_vars(scheme: &Scheme, subst: &Subst, out: &mut Vec<TypeVarId>) {
    let resolved = subst.apply(&scheme.ty);
    let mut vars = Vec::new();
    resolved.free_vars(&mut vars);
    for v in vars {
        if !scheme.vars.contains(&v) && !out.contains(&v) {
            out.push(v);
        }
    }
}
