//! High-level compilation facade.
//!
//! Drives the staged pipeline end to end, for a single source or a
//! whole module graph, and exposes the per-stage artifacts. Also the
//! home of the `expect_*` helpers the test suite leans on.

use indexmap::IndexMap;

use workman_ir::core::CoreProgram;
use workman_ir::mir::{self, MirProgram};

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::foreign::ForeignTypes;
use crate::infer::{self, EnvSeeds, Inference};
use crate::lower;
use crate::parser::{self, ast};
use crate::present::{self, TypedView};
use crate::resolve::{self, ModuleGraph, ModuleLoader, ResolverConfig};
use crate::solve::{self, Solution};
use crate::types::{TypeCtx, format_scheme};
use crate::{emit, Error, Result};

/// Options for a compilation run.
#[derive(Debug, Clone, Default)]
pub struct CompilationBuilder {
    std_roots: Vec<String>,
    prelude: Option<String>,
    foreign: Option<ForeignTypes>,
    /// Lower to Core/MIR even when solver diagnostics are present.
    force_lowering: bool,
}

impl CompilationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn std_root(mut self, root: impl Into<String>) -> Self {
        self.std_roots.push(root.into());
        self
    }

    pub fn prelude(mut self, path: impl Into<String>) -> Self {
        self.prelude = Some(path.into());
        self
    }

    pub fn foreign(mut self, foreign: ForeignTypes) -> Self {
        self.foreign = Some(foreign);
        self
    }

    pub fn force_lowering(mut self) -> Self {
        self.force_lowering = true;
        self
    }

    /// Compile a single source text (no module resolution).
    pub fn compile_source(self, source: &str) -> Result<Compilation> {
        let (program, parse_diagnostics) = parser::parse(source);
        if parse_diagnostics.has_errors() {
            // Lex errors never reach the parser proper; the stage is
            // reported faithfully either way.
            let lexical = parse_diagnostics.iter().any(|d| {
                matches!(
                    d.kind,
                    DiagnosticKind::UnexpectedCharacter | DiagnosticKind::UnterminatedString
                )
            });
            return Err(if lexical {
                Error::Lex(parse_diagnostics)
            } else {
                Error::Parse(parse_diagnostics)
            });
        }

        let mut ctx = TypeCtx::new();
        let seeds = self.seeds_from_foreign();
        let mut diagnostics = Diagnostics::new();
        if let Some(foreign) = &self.foreign {
            for detail in &foreign.diagnostics {
                diagnostics
                    .error(
                        DiagnosticKind::ForeignTypeError,
                        format!("foreign type provider: {detail}"),
                        workman_core::Span::empty(0),
                    )
                    .detail("detail", detail.clone())
                    .emit();
            }
        }

        let (inference, infer_diagnostics) = infer::infer_program(&program, &mut ctx, &seeds)?;
        diagnostics.extend(infer_diagnostics);

        let solution = solve::solve(&inference, &mut ctx);
        let view = present::present(&inference, &solution, &ctx);
        diagnostics.extend(solution.diagnostics.clone());

        let mut compilation = Compilation {
            source: source.to_string(),
            program,
            ctx,
            inference,
            solution,
            view,
            core: None,
            mir: None,
            diagnostics,
        };

        // A non-empty solver error list skips lowering unless forced.
        if !compilation.diagnostics.has_errors() || self.force_lowering {
            let core = lower::lower_program(
                &compilation.program,
                &compilation.inference,
                &compilation.ctx,
            );
            let (mir, emit_diagnostics) = emit::emit_program(&core);
            compilation.diagnostics.extend(emit_diagnostics);
            if cfg!(debug_assertions) {
                debug_assert!(
                    compilation.diagnostics.has_errors() || mir::validate(&mir).is_ok(),
                    "emitted MIR failed validation"
                );
            }
            compilation.core = Some(core);
            compilation.mir = Some(mir);
        }

        Ok(compilation)
    }

    /// Compile a module graph from an entry path.
    pub fn compile_graph(
        self,
        entry: &str,
        loader: &dyn ModuleLoader,
    ) -> Result<ProjectCompilation> {
        let config = ResolverConfig {
            std_roots: self.std_roots.clone(),
            prelude: self.prelude.clone(),
        };
        let (graph, _) = resolve::build_graph(entry, loader, &config)?;

        // One context for the whole program: the substitution and the
        // fresh-variable counter are process-wide, reset per program.
        let mut ctx = TypeCtx::new();
        let mut modules: Vec<ModuleCompilation> = Vec::new();
        let mut prelude_exports: IndexMap<String, crate::types::Scheme> = IndexMap::new();

        for &index in &graph.order {
            let module = &graph.modules[index];
            let mut seeds = self.seeds_from_foreign();
            for (name, scheme) in &prelude_exports {
                seeds.values.insert(name.clone(), scheme.clone());
            }
            build_import_seeds(module, &modules, &mut seeds);

            let (inference, _) = infer::infer_program(&module.program, &mut ctx, &seeds)
                .map_err(|err| attach_source(err, module.source_id))?;
            let solution = solve::solve(&inference, &mut ctx);

            let (core, mir, emit_diagnostics) = if solution.has_errors() && !self.force_lowering {
                (None, None, Diagnostics::new())
            } else {
                let core = lower::lower_program(&module.program, &inference, &ctx);
                let (mir, emit_diagnostics) = emit::emit_program(&core);
                (Some(core), Some(mir), emit_diagnostics)
            };

            if self.prelude.as_deref() == Some(module.path.as_str()) {
                for name in &inference.exported_values {
                    if let Some(scheme) = inference.bindings.get(name) {
                        prelude_exports.insert(name.clone(), scheme.clone());
                    }
                }
            }

            let mut diagnostics = solution.diagnostics.clone();
            diagnostics.extend(emit_diagnostics);

            modules.push(ModuleCompilation {
                path: module.path.clone(),
                inference,
                solution,
                core,
                mir,
                diagnostics,
            });
        }

        Ok(ProjectCompilation {
            graph,
            modules,
            ctx,
        })
    }

    fn seeds_from_foreign(&self) -> EnvSeeds {
        let mut seeds = EnvSeeds::default();
        if let Some(foreign) = &self.foreign {
            seeds.values = foreign.values.clone();
            seeds.adts = foreign.types.clone();
            seeds.row_aliases = foreign.row_aliases.clone();
        }
        seeds
    }
}

fn attach_source(err: Error, source_id: workman_core::SourceId) -> Error {
    let rewrite = |diags: &Diagnostics| {
        let mut out = Diagnostics::new();
        for diag in diags.iter() {
            let mut diag = diag.clone();
            if diag.source.is_none() {
                diag.source = Some(source_id);
            }
            out.push(diag);
        }
        out
    };
    match err {
        Error::Lex(d) => Error::Lex(rewrite(&d)),
        Error::Parse(d) => Error::Parse(rewrite(&d)),
        Error::Resolve(d) => Error::Resolve(rewrite(&d)),
        Error::Infer(d) => Error::Infer(rewrite(&d)),
        Error::Solve(d) => Error::Solve(rewrite(&d)),
    }
}

/// Seed the environment of one module from its compiled dependencies.
fn build_import_seeds(
    module: &resolve::ResolvedModule,
    compiled: &[ModuleCompilation],
    seeds: &mut EnvSeeds,
) {
    for import in &module.imports {
        let Some(dep) = compiled.iter().find(|m| m.path == import.from) else {
            continue;
        };
        match &import.names {
            ast::ImportNames::Named(specifiers) => {
                for spec in specifiers {
                    let local = spec.local_name().to_string();
                    if let Some(scheme) = dep.inference.bindings.get(&spec.name.name) {
                        seeds.values.insert(local, scheme.clone());
                    } else if let Some(adt) = dep.inference.adts.get(&spec.name.name) {
                        seeds.adts.push(adt.clone());
                    } else if let Some(row) = dep.inference.adts.row_alias(&spec.name.name) {
                        seeds.row_aliases.insert(local, row.clone());
                    }
                }
            }
            ast::ImportNames::Namespace(ns) => {
                let exports: IndexMap<String, crate::types::Scheme> = dep
                    .inference
                    .exported_values
                    .iter()
                    .filter_map(|name| {
                        dep.inference
                            .bindings
                            .get(name)
                            .map(|s| (name.clone(), s.clone()))
                    })
                    .collect();
                seeds.namespaces.insert(ns.name.clone(), exports);
            }
        }
    }

    // Imported and re-exported types bring their ADT info (tag tables
    // included) into scope; direct re-export only.
    for reexport in &module.reexports {
        let Some(dep) = compiled.iter().find(|m| m.path == reexport.from) else {
            continue;
        };
        for item in &reexport.items {
            if let Some(adt) = dep.inference.adts.get(&item.name.name) {
                seeds.adts.push(adt.clone());
            } else if let Some(row) = dep.inference.adts.row_alias(&item.name.name) {
                seeds.row_aliases.insert(item.name.name.clone(), row.clone());
            }
        }
    }
}

/// Result of compiling one source.
pub struct Compilation {
    pub source: String,
    pub program: ast::Program,
    pub ctx: TypeCtx,
    pub inference: Inference,
    pub solution: Solution,
    pub view: TypedView,
    pub core: Option<CoreProgram>,
    pub mir: Option<MirProgram>,
    /// Non-fatal diagnostics (solver + emit), in emission order.
    pub diagnostics: Diagnostics,
}

impl Compilation {
    pub fn builder() -> CompilationBuilder {
        CompilationBuilder::new()
    }

    /// Compile a single source with default options.
    pub fn compile(source: &str) -> Result<Compilation> {
        CompilationBuilder::new().compile_source(source)
    }

    pub fn is_valid(&self) -> bool {
        !self.diagnostics.has_errors()
    }

    /// Scheme of a top-level binding, formatted (`∀T. T -> T`).
    pub fn scheme_text(&self, name: &str) -> Option<String> {
        let scheme = self.inference.bindings.get(name)?;
        // Re-resolve through the final substitution before display.
        let resolved = crate::types::Scheme {
            vars: scheme.vars.clone(),
            ty: self.ctx.resolve(&scheme.ty),
        };
        Some(format_scheme(&resolved))
    }

    // ---- test helpers -------------------------------------------------

    /// Compile and return the formatted scheme of `name`; panics on any
    /// error. Test helper.
    pub fn expect_scheme(source: &str, name: &str) -> String {
        let compilation = Self::expect_valid(source);
        compilation
            .scheme_text(name)
            .unwrap_or_else(|| panic!("no binding `{name}`"))
    }

    /// Compile expecting full success (no diagnostics at any stage).
    pub fn expect_valid(source: &str) -> Compilation {
        match Self::compile(source) {
            Ok(compilation) => {
                assert!(
                    compilation.is_valid(),
                    "unexpected diagnostics:\n{}",
                    compilation.diagnostics.printer().source(source).render()
                );
                compilation
            }
            Err(err) => panic!(
                "compilation failed: {err}\n{}",
                err.diagnostics().printer().source(source).render()
            ),
        }
    }

    /// Compile and return the MIR dump; panics on any error.
    pub fn expect_mir(source: &str) -> String {
        let compilation = Self::expect_valid(source);
        mir::dump(compilation.mir.as_ref().expect("MIR emitted"))
    }

    /// Compile and return the diagnostic reasons, fatal or not.
    pub fn expect_reasons(source: &str) -> Vec<&'static str> {
        match Self::compile(source) {
            Ok(compilation) => compilation.diagnostics.iter().map(|d| d.reason()).collect(),
            Err(err) => err.diagnostics().iter().map(|d| d.reason()).collect(),
        }
    }
}

/// Result of compiling a module graph.
pub struct ProjectCompilation {
    pub graph: ModuleGraph,
    /// Compiled modules in topological order.
    pub modules: Vec<ModuleCompilation>,
    pub ctx: TypeCtx,
}

impl ProjectCompilation {
    pub fn module(&self, path: &str) -> Option<&ModuleCompilation> {
        self.modules.iter().find(|m| m.path == path)
    }

    pub fn has_errors(&self) -> bool {
        self.modules.iter().any(|m| m.diagnostics.has_errors())
    }
}

pub struct ModuleCompilation {
    pub path: String,
    pub inference: Inference,
    pub solution: Solution,
    pub core: Option<CoreProgram>,
    pub mir: Option<MirProgram>,
    pub diagnostics: Diagnostics,
}
