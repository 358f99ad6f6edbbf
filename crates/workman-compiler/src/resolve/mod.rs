//! Module resolver: specifier resolution, dependency DFS, export
//! collection.
//!
//! Disk access stays behind [`ModuleLoader`]; the CLI supplies a
//! filesystem loader and tests an in-memory one. The DFS uses the
//! classic tri-state visit set; re-entering a `Visiting` module is a
//! cycle and aborts the build. Post-order is the compile order.


use std::collections::HashMap;

use indexmap::IndexMap;
use workman_core::{SourceId, SourceMap, Span};

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::parser::{self, ast};
use crate::{Error, PassResult};

/// Source of module text, keyed by resolved path.
pub trait ModuleLoader {
    fn exists(&self, path: &str) -> bool;
    fn load(&self, path: &str) -> Result<String, String>;
}

/// In-memory loader for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    files: IndexMap<String, String>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, source: impl Into<String>) -> &mut Self {
        self.files.insert(path.into(), source.into());
        self
    }
}

impl ModuleLoader for MemoryLoader {
    fn exists(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    fn load(&self, path: &str) -> Result<String, String> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| format!("no such module: {path}"))
    }
}

/// Resolver configuration: std roots searched in order, plus the
/// optional prelude module visited before the entry.
#[derive(Debug, Clone, Default)]
pub struct ResolverConfig {
    pub std_roots: Vec<String>,
    pub prelude: Option<String>,
}

/// One import with its specifier resolved to an absolute module path.
#[derive(Debug, Clone)]
pub struct ResolvedImport {
    pub from: String,
    pub names: ast::ImportNames,
    pub span: Span,
}

/// A re-export with its source module resolved.
#[derive(Debug, Clone)]
pub struct ResolvedReExport {
    pub from: String,
    pub items: Vec<ast::ReExportItem>,
    pub span: Span,
}

/// Exports of a module, split by namespace.
#[derive(Debug, Clone, Default)]
pub struct ExportSet {
    pub values: Vec<String>,
    pub types: Vec<String>,
    pub type_constructors: Vec<String>,
}

impl ExportSet {
    pub fn contains(&self, name: &str) -> bool {
        self.values.iter().any(|v| v == name)
            || self.types.iter().any(|t| t == name)
            || self.type_constructors.iter().any(|c| c == name)
    }
}

/// A parsed module with resolved imports and collected exports.
#[derive(Debug)]
pub struct ResolvedModule {
    pub path: String,
    pub source_id: SourceId,
    pub program: ast::Program,
    pub imports: Vec<ResolvedImport>,
    pub reexports: Vec<ResolvedReExport>,
    pub exports: ExportSet,
}

/// The dependency graph in topological (post-)order.
#[derive(Debug)]
pub struct ModuleGraph {
    pub modules: Vec<ResolvedModule>,
    /// Indices into `modules`; every module appears after its
    /// transitive dependencies.
    pub order: Vec<usize>,
    pub sources: SourceMap,
}

impl ModuleGraph {
    pub fn module(&self, path: &str) -> Option<&ResolvedModule> {
        self.modules.iter().find(|m| m.path == path)
    }

    pub fn entry(&self) -> Option<&ResolvedModule> {
        self.order.last().map(|&i| &self.modules[i])
    }
}

#[derive(Clone, Copy, PartialEq)]
enum VisitState {
    Visiting,
    Visited,
}

/// Build the module graph from an entry path.
pub fn build_graph(
    entry: &str,
    loader: &dyn ModuleLoader,
    config: &ResolverConfig,
) -> PassResult<ModuleGraph> {
    let mut builder = GraphBuilder {
        loader,
        config,
        modules: Vec::new(),
        order: Vec::new(),
        sources: SourceMap::new(),
        states: HashMap::new(),
        index_by_path: HashMap::new(),
        diagnostics: Diagnostics::new(),
    };

    if let Some(prelude) = &config.prelude {
        let prelude = prelude.clone();
        builder.visit(&prelude, Span::empty(0));
    }
    builder.visit(&normalize(entry), Span::empty(0));

    if builder.diagnostics.has_errors() {
        return Err(Error::Resolve(builder.diagnostics));
    }
    Ok((
        ModuleGraph {
            modules: builder.modules,
            order: builder.order,
            sources: builder.sources,
        },
        builder.diagnostics,
    ))
}

struct GraphBuilder<'a> {
    loader: &'a dyn ModuleLoader,
    config: &'a ResolverConfig,
    modules: Vec<ResolvedModule>,
    order: Vec<usize>,
    sources: SourceMap,
    states: HashMap<String, VisitState>,
    index_by_path: HashMap<String, usize>,
    diagnostics: Diagnostics,
}

impl GraphBuilder<'_> {
    fn visit(&mut self, path: &str, requested_at: Span) {
        match self.states.get(path) {
            Some(VisitState::Visited) => return,
            Some(VisitState::Visiting) => {
                self.diagnostics
                    .error(
                        DiagnosticKind::CircularDependency,
                        format!("circular module dependency through `{path}`"),
                        requested_at,
                    )
                    .detail("path", path.to_string())
                    .emit();
                return;
            }
            None => {}
        }
        self.states.insert(path.to_string(), VisitState::Visiting);

        let source = match self.loader.load(path) {
            Ok(source) => source,
            Err(message) => {
                self.diagnostics
                    .error(
                        DiagnosticKind::UnresolvedSpecifier,
                        format!("cannot load module `{path}`: {message}"),
                        requested_at,
                    )
                    .emit();
                self.states.insert(path.to_string(), VisitState::Visited);
                return;
            }
        };

        let source_id = self.sources.insert(path, source.clone());
        let (program, parse_diagnostics) = parser::parse(&source);
        if parse_diagnostics.has_errors() {
            for mut diag in parse_diagnostics.iter().cloned() {
                diag.source = Some(source_id);
                self.diagnostics.push(diag);
            }
            self.states.insert(path.to_string(), VisitState::Visited);
            return;
        }

        // Resolve imports and recurse before finishing this module.
        let mut imports = Vec::new();
        let mut reexports = Vec::new();
        for item in &program.items {
            match item {
                ast::Item::Import(decl) => {
                    if let Some(resolved) = self.resolve_specifier(path, &decl.path, decl.path_span)
                    {
                        self.visit(&resolved, decl.path_span);
                        imports.push(ResolvedImport {
                            from: resolved,
                            names: decl.names.clone(),
                            span: decl.span,
                        });
                    }
                }
                ast::Item::ReExport(decl) => {
                    if let Some(resolved) = self.resolve_specifier(path, &decl.path, decl.path_span)
                    {
                        self.visit(&resolved, decl.path_span);
                        reexports.push(ResolvedReExport {
                            from: resolved,
                            items: decl.items.clone(),
                            span: decl.span,
                        });
                    }
                }
                _ => {}
            }
        }

        let exports = self.collect_exports(&program, &reexports, source_id);
        self.check_imports(&imports, source_id);

        let index = self.modules.len();
        self.modules.push(ResolvedModule {
            path: path.to_string(),
            source_id,
            program,
            imports,
            reexports,
            exports,
        });
        self.index_by_path.insert(path.to_string(), index);
        self.order.push(index);
        self.states.insert(path.to_string(), VisitState::Visited);
    }

    /// Resolve a specifier against the importing module's path.
    fn resolve_specifier(&mut self, importer: &str, spec: &str, span: Span) -> Option<String> {
        if spec.starts_with("./") || spec.starts_with("../") {
            let dir = parent_dir(importer);
            let joined = if dir.is_empty() {
                spec.to_string()
            } else {
                format!("{dir}/{spec}")
            };
            return Some(with_extension(&normalize(&joined)));
        }
        if let Some(rest) = spec.strip_prefix('/') {
            return Some(with_extension(&normalize(&format!("/{rest}"))));
        }
        if let Some(rest) = spec.strip_prefix("std/") {
            for root in &self.config.std_roots {
                let candidate = with_extension(&normalize(&format!("{root}/{rest}")));
                if self.loader.exists(&candidate) {
                    return Some(candidate);
                }
            }
            self.diagnostics
                .error(
                    DiagnosticKind::UnresolvedSpecifier,
                    format!("`{spec}` not found in any std root"),
                    span,
                )
                .emit();
            return None;
        }
        self.diagnostics
            .error(
                DiagnosticKind::UnsupportedModuleSpecifier,
                format!("unsupported module specifier `{spec}`"),
                span,
            )
            .hint("use `./relative`, `/absolute`, or `std/...` paths")
            .emit();
        None
    }

    /// Syntactic export collection, split into values, types, and type
    /// constructors. Re-exports copy from the (already visited) source
    /// module; expansion is direct only, never transitive.
    fn collect_exports(
        &mut self,
        program: &ast::Program,
        reexports: &[ResolvedReExport],
        source_id: SourceId,
    ) -> ExportSet {
        let mut exports = ExportSet::default();

        for item in &program.items {
            match item {
                ast::Item::Let(decl) if decl.exported => {
                    for binding in &decl.bindings {
                        exports.values.push(binding.name.name.clone());
                    }
                }
                ast::Item::Type(decl) if decl.exported => {
                    exports.types.push(decl.name.name.clone());
                    if let ast::TypeRhs::Constructors(members) = &decl.rhs {
                        for member in members {
                            exports.type_constructors.push(member.name.name.clone());
                        }
                    }
                }
                _ => {}
            }
        }

        for reexport in reexports {
            let Some(&dep_index) = self.index_by_path.get(&reexport.from) else {
                continue;
            };
            for item in &reexport.items {
                let dep = &self.modules[dep_index];
                if !dep.exports.types.iter().any(|t| t == &item.name.name) {
                    self.diagnostics
                        .error(
                            DiagnosticKind::MissingExport,
                            format!(
                                "module `{}` does not export type `{}`",
                                reexport.from, item.name.name
                            ),
                            item.name.span,
                        )
                        .source(source_id)
                        .emit();
                    continue;
                }
                exports.types.push(item.name.name.clone());
                if item.with_constructors {
                    // Constructor sets come from the source module's
                    // type declaration.
                    let ctors = self.constructors_of(dep_index, &item.name.name);
                    exports.type_constructors.extend(ctors);
                }
            }
        }

        exports
    }

    fn constructors_of(&self, module_index: usize, type_name: &str) -> Vec<String> {
        let module = &self.modules[module_index];
        for item in &module.program.items {
            if let ast::Item::Type(decl) = item {
                if decl.name.name == type_name {
                    if let ast::TypeRhs::Constructors(members) = &decl.rhs {
                        return members.iter().map(|m| m.name.name.clone()).collect();
                    }
                }
            }
        }
        Vec::new()
    }

    /// Every named import must exist in the dependency's exports.
    fn check_imports(&mut self, imports: &[ResolvedImport], source_id: SourceId) {
        for import in imports {
            let Some(&dep_index) = self.index_by_path.get(&import.from) else {
                continue;
            };
            if let ast::ImportNames::Named(specifiers) = &import.names {
                for spec in specifiers {
                    let dep = &self.modules[dep_index];
                    if !dep.exports.contains(&spec.name.name) {
                        self.diagnostics
                            .error(
                                DiagnosticKind::MissingExport,
                                format!(
                                    "module `{}` does not export `{}`",
                                    import.from, spec.name.name
                                ),
                                spec.name.span,
                            )
                            .source(source_id)
                            .emit();
                    }
                }
            }
        }
    }
}

/// Append `.wm` when the path has no extension.
fn with_extension(path: &str) -> String {
    let file = path.rsplit('/').next().unwrap_or(path);
    if file.contains('.') {
        path.to_string()
    } else {
        format!("{path}.wm")
    }
}

fn parent_dir(path: &str) -> &str {
    match path.rfind('/') {
        Some(i) => &path[..i],
        None => "",
    }
}

/// Purely textual path normalization: resolves `.` and `..` segments.
fn normalize(path: &str) -> String {
    let absolute = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if parts.last().is_some_and(|p| *p != "..") {
                    parts.pop();
                } else if !absolute {
                    parts.push("..");
                }
            }
            other => parts.push(other),
        }
    }
    let joined = parts.join("/");
    if absolute {
        format!("/{joined}")
    } else {
        joined
    }
}
