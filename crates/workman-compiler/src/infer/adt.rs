//! The ADT environment: named sums, their constructors, and error-row
//! aliases.

use indexmap::IndexMap;

use crate::types::{ErrorRow, Scheme, Type, TypeCtx, TypeVarId};

/// One constructor of an ADT. `tag` is the 0-based declaration index
/// and becomes the MIR tag verbatim.
#[derive(Debug, Clone)]
pub struct CtorInfo {
    pub name: String,
    pub arity: usize,
    pub scheme: Scheme,
    pub tag: u32,
}

/// A registered ADT.
#[derive(Debug, Clone)]
pub struct AdtInfo {
    pub name: String,
    pub params: Vec<TypeVarId>,
    pub ctors: Vec<CtorInfo>,
}

impl AdtInfo {
    pub fn ctor(&self, name: &str) -> Option<&CtorInfo> {
        self.ctors.iter().find(|c| c.name == name)
    }

    pub fn ctor_names(&self) -> Vec<String> {
        self.ctors.iter().map(|c| c.name.clone()).collect()
    }
}

/// Mapping from ADT name to its info, plus a reverse constructor index
/// and the error-row aliases (`type Err = <NotMul>;`).
///
/// Declaration order is preserved; MIR tag tables are generated straight
/// from iteration order.
#[derive(Debug, Clone, Default)]
pub struct AdtEnv {
    adts: IndexMap<String, AdtInfo>,
    /// Constructor name to owning ADT name.
    ctor_index: IndexMap<String, String>,
    row_aliases: IndexMap<String, ErrorRow>,
}

impl AdtEnv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Environment with the built-in carriers registered: `Result<T, E>`
    /// with `Ok`/`Err`, and `Ordering` with `Less`/`Equal`/`Greater`.
    pub fn with_builtins(ctx: &mut TypeCtx) -> Self {
        let mut env = Self::new();

        let t = ctx.fresh_var_id();
        let e = ctx.fresh_var_id();
        let result_ty = Type::result(Type::Var(t), Type::Var(e));
        env.register(AdtInfo {
            name: "Result".to_string(),
            params: vec![t, e],
            ctors: vec![
                CtorInfo {
                    name: "Ok".to_string(),
                    arity: 1,
                    scheme: Scheme::new(vec![t, e], Type::fun(Type::Var(t), result_ty.clone())),
                    tag: 0,
                },
                CtorInfo {
                    name: "Err".to_string(),
                    arity: 1,
                    scheme: Scheme::new(vec![t, e], Type::fun(Type::Var(e), result_ty)),
                    tag: 1,
                },
            ],
        });

        let ordering = Type::ctor("Ordering", vec![]);
        env.register(AdtInfo {
            name: "Ordering".to_string(),
            params: vec![],
            ctors: ["Less", "Equal", "Greater"]
                .iter()
                .enumerate()
                .map(|(i, name)| CtorInfo {
                    name: (*name).to_string(),
                    arity: 0,
                    scheme: Scheme::mono(ordering.clone()),
                    tag: i as u32,
                })
                .collect(),
        });

        env
    }

    pub fn register(&mut self, info: AdtInfo) {
        for ctor in &info.ctors {
            self.ctor_index
                .insert(ctor.name.clone(), info.name.clone());
        }
        self.adts.insert(info.name.clone(), info);
    }

    pub fn register_row_alias(&mut self, name: impl Into<String>, row: ErrorRow) {
        self.row_aliases.insert(name.into(), row);
    }

    pub fn get(&self, name: &str) -> Option<&AdtInfo> {
        self.adts.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.adts.contains_key(name)
    }

    pub fn row_alias(&self, name: &str) -> Option<&ErrorRow> {
        self.row_aliases.get(name)
    }

    /// Find a constructor and its owning ADT.
    pub fn lookup_ctor(&self, ctor: &str) -> Option<(&AdtInfo, &CtorInfo)> {
        let adt_name = self.ctor_index.get(ctor)?;
        let adt = self.adts.get(adt_name)?;
        let info = adt.ctor(ctor)?;
        Some((adt, info))
    }

    /// ADTs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &AdtInfo> {
        self.adts.values()
    }

    /// User-declared ADTs only (skips the built-in carriers).
    pub fn iter_user(&self) -> impl Iterator<Item = &AdtInfo> {
        self.adts
            .values()
            .filter(|a| a.name != "Result" && a.name != "Ordering")
    }
}
