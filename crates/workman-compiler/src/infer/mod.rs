//! Type inference (Layer 1).
//!
//! Algorithm W over the surface AST, extended with error-row tracking.
//! The inferencer unifies eagerly wherever soundness of generalization
//! depends on it, and in parallel emits constraint stubs for the solver;
//! the one systematic exception is the "infectious" shape (a `Result`
//! meeting a non-`Result`), which is deferred so the solver can report
//! it with its dedicated reason.
//!
//! Inference errors abort the module; stubs and marks from a failed
//! module are discarded.

pub mod adt;
pub mod env;
pub mod marks;
pub mod prelude;

mod expr;
mod pattern;

#[cfg(test)]
mod infer_tests;

use std::collections::HashMap;

use indexmap::IndexMap;
use workman_core::{NodeId, Span};

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::parser::ast::{
    Binding, ExprKind, Item, LetDecl, Program, TypeDecl, TypeExpr, TypeExprKind, TypeRhs,
};
use crate::solve::stubs::ConstraintStub;
use crate::types::{
    ErrorRow, HoleProvenance, Scheme, Type, TypeCtx, TypeNamer, TypeVarId, UnifyError,
    format_type_with,
};
use crate::{Error, PassResult};

use adt::{AdtEnv, AdtInfo, CtorInfo};
use env::TypeEnv;
use marks::Marks;

pub use pattern::Coverage;

/// Inference aborted; diagnostics explain why.
pub(crate) struct InferAbort;

pub(crate) type IResult<T> = Result<T, InferAbort>;

/// A function whose return boundary the solver must check.
#[derive(Debug, Clone)]
pub struct FunctionBoundary {
    /// Binding name when the arrow was directly bound; `None` for
    /// anonymous nested arrows.
    pub name: Option<String>,
    /// The arrow expression node.
    pub node: NodeId,
    /// The node whose labels are inspected at return.
    pub return_node: NodeId,
    /// Inferred result (body) type.
    pub result_type: Type,
    /// Annotated return type, when the binding carried one.
    pub declared_return: Option<Type>,
    pub span: Span,
}

/// A `?` hole introduced during inference.
#[derive(Debug, Clone)]
pub struct HoleOrigin {
    pub node: NodeId,
    pub var: TypeVarId,
    pub provenance: HoleProvenance,
}

/// Per-match coverage summary for the presenter.
#[derive(Debug, Clone)]
pub struct MatchInfo {
    pub node: NodeId,
    pub covered: Vec<String>,
    pub missing: Vec<String>,
    pub covers_tail: bool,
    pub discharges_result: bool,
    pub row: Option<ErrorRow>,
}

/// Environment seeds applied before inference: resolved imports and
/// foreign-provider declarations.
#[derive(Debug, Clone, Default)]
pub struct EnvSeeds {
    pub values: IndexMap<String, Scheme>,
    pub namespaces: IndexMap<String, IndexMap<String, Scheme>>,
    pub adts: Vec<AdtInfo>,
    pub row_aliases: IndexMap<String, ErrorRow>,
}

/// Everything Layer 1 hands to Layer 2 and beyond.
#[derive(Debug)]
pub struct Inference {
    pub marks: Marks,
    pub stubs: Vec<ConstraintStub>,
    pub functions: Vec<FunctionBoundary>,
    pub holes: Vec<HoleOrigin>,
    pub matches: Vec<MatchInfo>,
    pub adts: AdtEnv,
    /// Top-level value bindings in declaration order.
    pub bindings: IndexMap<String, Scheme>,
    pub exported_values: Vec<String>,
    pub exported_types: Vec<String>,
}

/// Run inference over a parsed module.
pub fn infer_program(
    program: &Program,
    ctx: &mut TypeCtx,
    seeds: &EnvSeeds,
) -> PassResult<Inference> {
    let mut inferencer = Inferencer::new(ctx, seeds);
    match inferencer.run(program) {
        Ok(()) => {
            if inferencer.diagnostics.has_errors() {
                return Err(Error::Infer(inferencer.diagnostics));
            }
            Ok((inferencer.into_inference(), Diagnostics::new()))
        }
        Err(InferAbort) => Err(Error::Infer(inferencer.diagnostics)),
    }
}

pub(crate) struct Inferencer<'a> {
    pub(crate) ctx: &'a mut TypeCtx,
    pub(crate) env: TypeEnv,
    pub(crate) adts: AdtEnv,
    pub(crate) marks: Marks,
    pub(crate) stubs: Vec<ConstraintStub>,
    pub(crate) functions: Vec<FunctionBoundary>,
    pub(crate) holes: Vec<HoleOrigin>,
    pub(crate) matches: Vec<MatchInfo>,
    pub(crate) bindings: IndexMap<String, Scheme>,
    pub(crate) exported_values: Vec<String>,
    pub(crate) exported_types: Vec<String>,
    pub(crate) diagnostics: Diagnostics,
}

impl<'a> Inferencer<'a> {
    pub(crate) fn new(ctx: &'a mut TypeCtx, seeds: &EnvSeeds) -> Self {
        let mut env = TypeEnv::new();
        let mut adts = AdtEnv::with_builtins(ctx);
        prelude::register(ctx, &mut env);

        for (name, scheme) in &seeds.values {
            env.insert(name.clone(), scheme.clone(), None);
        }
        for (name, exports) in &seeds.namespaces {
            env.insert_namespace(name.clone(), exports.clone());
        }
        for info in &seeds.adts {
            adts.register(info.clone());
        }
        for (name, row) in &seeds.row_aliases {
            adts.register_row_alias(name.clone(), row.clone());
        }

        Self {
            ctx,
            env,
            adts,
            marks: Marks::new(),
            stubs: Vec::new(),
            functions: Vec::new(),
            holes: Vec::new(),
            matches: Vec::new(),
            bindings: IndexMap::new(),
            exported_values: Vec::new(),
            exported_types: Vec::new(),
            diagnostics: Diagnostics::new(),
        }
    }

    fn into_inference(self) -> Inference {
        Inference {
            marks: self.marks,
            stubs: self.stubs,
            functions: self.functions,
            holes: self.holes,
            matches: self.matches,
            adts: self.adts,
            bindings: self.bindings,
            exported_values: self.exported_values,
            exported_types: self.exported_types,
        }
    }

    fn run(&mut self, program: &Program) -> IResult<()> {
        // Type declarations are registered up front so value bindings
        // can reference types declared later in the file.
        for item in &program.items {
            if let Item::Type(decl) = item {
                self.register_type_decl(decl)?;
            }
        }

        for item in &program.items {
            match item {
                Item::Let(decl) => self.infer_let_decl(decl, true)?,
                Item::Infix(decl) => {
                    let scheme = self.lookup_value_scheme(&decl.target.name, decl.target.span)?;
                    self.env
                        .insert(format!("__op_{}", decl.op), scheme, Some(decl.target.id));
                }
                Item::Prefix(decl) => {
                    let scheme = self.lookup_value_scheme(&decl.target.name, decl.target.span)?;
                    self.env
                        .insert(format!("__prefix_{}", decl.op), scheme, Some(decl.target.id));
                }
                // Registered in the first pass.
                Item::Type(_) => {}
                // Satisfied through the environment seeds by the
                // resolver; nothing to do per item.
                Item::Import(_) | Item::ReExport(_) => {}
            }
        }
        Ok(())
    }

    fn lookup_value_scheme(&mut self, name: &str, span: Span) -> IResult<Scheme> {
        match self.env.lookup_scheme(name) {
            Some(scheme) => Ok(scheme.clone()),
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

    // ---- stub emission ------------------------------------------------

    pub(crate) fn emit(&mut self, stub: ConstraintStub) -> usize {
        let index = self.stubs.len();
        let anchor = stub.anchor();
        self.stubs.push(stub);
        self.marks.add_stub(anchor, index);
        index
    }

    // ---- type declarations --------------------------------------------

    fn register_type_decl(&mut self, decl: &TypeDecl) -> IResult<()> {
        let mut param_scope = HashMap::new();
        let mut params = Vec::new();
        for p in &decl.params {
            let var = self.ctx.fresh_var_id();
            if param_scope.insert(p.name.clone(), var).is_some() {
                self.diagnostics
                    .error(
                        DiagnosticKind::DuplicateSpecifier,
                        format!("duplicate type parameter `{}`", p.name),
                        p.span,
                    )
                    .emit();
                return Err(InferAbort);
            }
            params.push(var);
        }

        match &decl.rhs {
            TypeRhs::ErrorRow(row_expr) => {
                let ty = self.convert_type_expr(row_expr, &param_scope)?;
                let Type::Row(row) = ty else {
                    self.diagnostics
                        .error(
                            DiagnosticKind::UnknownTypeConstructor,
                            "expected an error-row literal",
                            row_expr.span,
                        )
                        .emit();
                    return Err(InferAbort);
                };
                self.adts.register_row_alias(decl.name.name.clone(), row);
            }
            TypeRhs::Constructors(members) => {
                // Register the shell first so constructor fields can
                // reference the type recursively (`List<T>` in `Cons`).
                self.adts.register(AdtInfo {
                    name: decl.name.name.clone(),
                    params: params.clone(),
                    ctors: Vec::new(),
                });

                let result_ty = Type::Ctor {
                    name: decl.name.name.clone(),
                    args: params.iter().map(|v| Type::Var(*v)).collect(),
                };

                let mut ctors = Vec::new();
                for (tag, member) in members.iter().enumerate() {
                    if ctors.iter().any(|c: &CtorInfo| c.name == member.name.name) {
                        self.diagnostics
                            .error(
                                DiagnosticKind::DuplicateSpecifier,
                                format!("duplicate constructor `{}`", member.name.name),
                                member.name.span,
                            )
                            .emit();
                        return Err(InferAbort);
                    }
                    let mut fields = Vec::new();
                    for field in &member.fields {
                        fields.push(self.convert_type_expr(field, &param_scope)?);
                    }
                    let scheme = Scheme::new(
                        params.clone(),
                        Type::fun_from(fields.clone(), result_ty.clone()),
                    );
                    ctors.push(CtorInfo {
                        name: member.name.name.clone(),
                        arity: member.fields.len(),
                        scheme,
                        tag: tag as u32,
                    });
                }

                self.adts.register(AdtInfo {
                    name: decl.name.name.clone(),
                    params,
                    ctors,
                });
            }
        }

        if decl.exported {
            self.exported_types.push(decl.name.name.clone());
        }
        Ok(())
    }

    /// Convert a surface type expression to a semantic type.
    pub(crate) fn convert_type_expr(
        &mut self,
        te: &TypeExpr,
        param_scope: &HashMap<String, TypeVarId>,
    ) -> IResult<Type> {
        let ty = match &te.kind {
            TypeExprKind::Name { name, args } => {
                if let Some(var) = param_scope.get(name) {
                    if !args.is_empty() {
                        self.diagnostics
                            .error(
                                DiagnosticKind::UnknownTypeConstructor,
                                format!("type parameter `{name}` takes no arguments"),
                                te.span,
                            )
                            .emit();
                        return Err(InferAbort);
                    }
                    Type::Var(*var)
                } else if let Some(prim) = primitive_type(name) {
                    if !args.is_empty() {
                        self.diagnostics
                            .error(
                                DiagnosticKind::UnknownTypeConstructor,
                                format!("`{name}` takes no type arguments"),
                                te.span,
                            )
                            .emit();
                        return Err(InferAbort);
                    }
                    prim
                } else if let Some(row) = self.adts.row_alias(name).cloned() {
                    if !args.is_empty() {
                        self.diagnostics
                            .error(
                                DiagnosticKind::UnknownTypeConstructor,
                                format!("error-row alias `{name}` takes no type arguments"),
                                te.span,
                            )
                            .emit();
                        return Err(InferAbort);
                    }
                    Type::Row(row)
                } else if let Some(adt) = self.adts.get(name) {
                    let expected = adt.params.len();
                    if args.len() != expected {
                        self.diagnostics
                            .error(
                                DiagnosticKind::UnknownTypeConstructor,
                                format!(
                                    "`{name}` expects {expected} type argument(s), found {}",
                                    args.len()
                                ),
                                te.span,
                            )
                            .emit();
                        return Err(InferAbort);
                    }
                    let mut converted = Vec::new();
                    for arg in args {
                        converted.push(self.convert_type_expr(arg, param_scope)?);
                    }
                    Type::Ctor {
                        name: name.clone(),
                        args: converted,
                    }
                } else {
                    self.diagnostics
                        .error(
                            DiagnosticKind::UnknownTypeConstructor,
                            format!("unknown type constructor `{name}`"),
                            te.span,
                        )
                        .emit();
                    return Err(InferAbort);
                }
            }
            TypeExprKind::Fun { from, to } => Type::fun(
                self.convert_type_expr(from, param_scope)?,
                self.convert_type_expr(to, param_scope)?,
            ),
            TypeExprKind::Tuple(elems) => {
                let mut converted = Vec::new();
                for elem in elems {
                    converted.push(self.convert_type_expr(elem, param_scope)?);
                }
                Type::Tuple(converted)
            }
            TypeExprKind::Row(cases) => {
                let mut row = ErrorRow::default();
                for case in cases {
                    if row.cases.contains_key(&case.name.name) {
                        self.diagnostics
                            .error(
                                DiagnosticKind::DuplicateSpecifier,
                                format!("duplicate error-row label `{}`", case.name.name),
                                case.name.span,
                            )
                            .emit();
                        return Err(InferAbort);
                    }
                    let payload = match &case.payload {
                        Some(p) => Some(Box::new(self.convert_type_expr(p, param_scope)?)),
                        None => None,
                    };
                    row.cases.insert(case.name.name.clone(), payload);
                }
                Type::Row(row)
            }
            TypeExprKind::Unit => Type::Unit,
            TypeExprKind::Hole => {
                let var = self.ctx.fresh_var_id();
                self.holes.push(HoleOrigin {
                    node: te.id,
                    var,
                    provenance: HoleProvenance::UserHole,
                });
                Type::Var(var)
            }
        };

        self.marks.record(te.id, te.span, ty.clone());
        Ok(ty)
    }

    // ---- let declarations ---------------------------------------------

    pub(crate) fn infer_let_decl(&mut self, decl: &LetDecl, top_level: bool) -> IResult<()> {
        if decl.recursive {
            self.infer_recursive_let(decl, top_level)
        } else {
            for binding in &decl.bindings {
                let ty = self.infer_binding_value(binding)?;
                let env_free = self.env.free_vars(&self.ctx.subst);
                let scheme = self.ctx.generalize(&env_free, &ty);
                self.finish_binding(binding, scheme, decl.exported, top_level);
            }
            Ok(())
        }
    }

    /// The four-step recursive let.
    fn infer_recursive_let(&mut self, decl: &LetDecl, top_level: bool) -> IResult<()> {
        // The recursive group is not part of the ambient environment:
        // generalization must only skip variables free in the scope
        // that surrounds the group. Snapshot it before the pre-bound
        // names go in; its free vars are resolved against the final
        // substitution in step 4.
        let outer_env = self.env.clone();

        // Step 1: pre-bind every name with a fresh variable.
        let mut pre_bound = Vec::new();
        for binding in &decl.bindings {
            let var = self.ctx.fresh_var();
            self.env.insert(
                binding.name.name.clone(),
                Scheme::mono(var.clone()),
                Some(binding.name.id),
            );
            pre_bound.push(var);
        }

        // Step 2: infer each body with all names in scope.
        let mut inferred = Vec::new();
        for binding in &decl.bindings {
            if !matches!(binding.value.kind, ExprKind::Arrow { .. }) {
                self.diagnostics
                    .error(
                        DiagnosticKind::RecursiveBindingNotFunction,
                        format!("recursive binding `{}` must be a function", binding.name.name),
                        binding.span,
                    )
                    .emit();
                return Err(InferAbort);
            }
            inferred.push(self.infer_binding_value(binding)?);
        }

        // Step 3: unify pre-bound variables with inferred types.
        for ((binding, pre), ty) in decl.bindings.iter().zip(&pre_bound).zip(&inferred) {
            if let Err(err) = self.ctx.unify(pre, ty) {
                self.report_unify_error(err, binding.span);
                return Err(InferAbort);
            }
        }

        // Step 4: apply the substitution and generalize each binding,
        // against the enclosing scope only — the group's own pre-bound
        // schemes resolve to the full binding types by now and must not
        // suppress quantification.
        let env_free = outer_env.free_vars(&self.ctx.subst);
        for (binding, ty) in decl.bindings.iter().zip(&inferred) {
            let scheme = self.ctx.generalize(&env_free, ty);
            self.finish_binding(binding, scheme, decl.exported, top_level);
        }
        Ok(())
    }

    fn infer_binding_value(&mut self, binding: &Binding) -> IResult<Type> {
        let annotation = match &binding.annotation {
            Some(te) => Some(self.convert_type_expr(te, &HashMap::new())?),
            None => None,
        };

        let ty = self.infer_expr(&binding.value)?;

        if let Some(expected) = &annotation {
            self.marks.set_expected(binding.value.id, expected.clone());
            self.emit(ConstraintStub::Annotation {
                node: binding.value.id,
                expected: expected.clone(),
                actual: ty.clone(),
            });
            // Eager unification keeps generalization sound. The
            // infectious shape is left for the solver's boundary check.
            if let Err(err) = self.ctx.unify(expected, &ty) {
                if !is_infectious_mismatch(&err) {
                    self.report_unify_error(err, binding.value.span);
                    return Err(InferAbort);
                }
            }
        }

        self.marks
            .record(binding.name.id, binding.name.span, ty.clone());
        self.emit(ConstraintStub::Alias {
            left: binding.name.id,
            right: binding.value.id,
        });

        // Name the boundary entry of a directly-bound arrow and attach
        // its declared return type.
        if let ExprKind::Arrow { params, .. } = &binding.value.kind {
            let declared = annotation
                .as_ref()
                .and_then(|a| peel_return(a, params.len()));
            let value_id = binding.value.id;
            if let Some(boundary) = self.functions.iter_mut().find(|f| f.node == value_id) {
                boundary.name = Some(binding.name.name.clone());
                boundary.declared_return = declared;
            }
        }

        Ok(ty)
    }

    fn finish_binding(
        &mut self,
        binding: &Binding,
        scheme: Scheme,
        exported: bool,
        top_level: bool,
    ) {
        self.marks.set_scheme(binding.name.id, scheme.clone());
        if top_level {
            self.bindings
                .insert(binding.name.name.clone(), scheme.clone());
            if exported {
                self.exported_values.push(binding.name.name.clone());
            }
        }
        self.env
            .insert(binding.name.name.clone(), scheme, Some(binding.name.id));
    }

    // ---- error reporting ----------------------------------------------

    pub(crate) fn report_unify_error(&mut self, err: UnifyError, span: Span) {
        let mut namer = TypeNamer::new();
        match err {
            UnifyError::Mismatch { left, right } => {
                let left = self.ctx.resolve(&left);
                let right = self.ctx.resolve(&right);
                self.diagnostics
                    .error(
                        DiagnosticKind::TypeMismatch,
                        format!(
                            "Type mismatch: cannot unify {} with {}",
                            format_type_with(&left, &mut namer),
                            format_type_with(&right, &mut namer)
                        ),
                        span,
                    )
                    .detail("left", format_type_with(&left, &mut namer))
                    .detail("right", format_type_with(&right, &mut namer))
                    .emit();
            }
            UnifyError::Occurs { var, ty } => {
                let ty = self.ctx.resolve(&ty);
                let var_name = namer.name_of(var);
                self.diagnostics
                    .error(
                        DiagnosticKind::OccursCheck,
                        format!(
                            "occurs check: cannot construct the infinite type {var_name} = {}",
                            format_type_with(&ty, &mut namer)
                        ),
                        span,
                    )
                    .emit();
            }
            UnifyError::TupleArity { left, right } => {
                self.diagnostics
                    .error(
                        DiagnosticKind::TupleArityMismatch,
                        format!("tuple arity mismatch: {left} elements vs {right}"),
                        span,
                    )
                    .emit();
            }
        }
    }
}

/// A mismatch between a `Result` and a non-`Result` is the infectious
/// shape; it is deferred to the solver instead of aborting inference.
pub(crate) fn is_infectious_mismatch(err: &UnifyError) -> bool {
    match err {
        UnifyError::Mismatch { left, right } => left.is_result() != right.is_result(),
        _ => false,
    }
}

fn primitive_type(name: &str) -> Option<Type> {
    match name {
        "Int" => Some(Type::Int),
        "Bool" => Some(Type::Bool),
        "Char" => Some(Type::Char),
        "String" => Some(Type::Str),
        "Unit" => Some(Type::Unit),
        _ => None,
    }
}

/// Peel `params` arrows off an annotation to find the declared return.
fn peel_return(annotation: &Type, params: usize) -> Option<Type> {
    let mut current = annotation;
    for _ in 0..params {
        match current {
            Type::Fun(_, to) => current = to,
            _ => return None,
        }
    }
    Some(current.clone())
}
