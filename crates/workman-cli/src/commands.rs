//! Command implementations.

use workman_compiler::compilation::{CompilationBuilder, ProjectCompilation};
use workman_compiler::Error;
use workman_ir::mir;

use crate::loader::FsLoader;

fn builder(std_roots: &[String], prelude: Option<String>) -> CompilationBuilder {
    let mut builder = CompilationBuilder::new();
    for root in std_roots {
        builder = builder.std_root(root.clone());
    }
    if let Some(prelude) = prelude {
        builder = builder.prelude(prelude);
    }
    builder
}

fn compile_project(
    file: &str,
    std_roots: &[String],
    prelude: Option<String>,
) -> Result<ProjectCompilation, Error> {
    builder(std_roots, prelude).compile_graph(file, &FsLoader)
}

fn print_fatal(err: &Error) {
    eprintln!("{err}");
    eprint!("{}", err.diagnostics().printer().colored(true).render());
}

fn print_module_diagnostics(project: &ProjectCompilation) {
    for module in &project.modules {
        if module.diagnostics.is_empty() {
            continue;
        }
        let source = project
            .graph
            .module(&module.path)
            .map(|m| m.source_id)
            .and_then(|id| project.graph.sources.try_get(id));
        let printer = module.diagnostics.printer().colored(true);
        let rendered = match source {
            Some(file) => printer.source(&file.text).path(&file.path).render(),
            None => printer.render(),
        };
        eprint!("{rendered}");
    }
}

pub fn type_check(file: &str, std_roots: &[String], prelude: Option<String>) -> i32 {
    let project = match compile_project(file, std_roots, prelude) {
        Ok(project) => project,
        Err(err) => {
            print_fatal(&err);
            return 1;
        }
    };

    print_module_diagnostics(&project);

    if let Some(entry) = project.modules.last() {
        for (name, scheme) in &entry.inference.bindings {
            println!("{name} : {}", workman_compiler::types::format_scheme(scheme));
        }
    }

    if project.has_errors() { 1 } else { 0 }
}

pub fn report_errors(file: &str, std_roots: &[String], prelude: Option<String>) -> i32 {
    let project = match compile_project(file, std_roots, prelude) {
        Ok(project) => project,
        Err(err) => {
            print_fatal(&err);
            return 1;
        }
    };
    print_module_diagnostics(&project);
    if project.has_errors() { 1 } else { 0 }
}

pub fn compile(
    file: &str,
    std_roots: &[String],
    prelude: Option<String>,
    out_dir: &str,
    emit: &str,
) -> i32 {
    let project = match compile_project(file, std_roots, prelude) {
        Ok(project) => project,
        Err(err) => {
            print_fatal(&err);
            return 1;
        }
    };

    print_module_diagnostics(&project);
    if project.has_errors() {
        return 1;
    }

    if let Err(err) = std::fs::create_dir_all(out_dir) {
        eprintln!("cannot create `{out_dir}`: {err}");
        return 1;
    }

    for module in &project.modules {
        let stem = module
            .path
            .rsplit('/')
            .next()
            .unwrap_or(&module.path)
            .trim_end_matches(".wm");
        let result = match emit {
            "core" => module.core.as_ref().map(|core| {
                let path = format!("{out_dir}/{stem}.core.json");
                (path, serde_json::to_string_pretty(core))
            }),
            _ => module.mir.as_ref().map(|mir_program| {
                let path = format!("{out_dir}/{stem}.mir.json");
                (path, serde_json::to_string_pretty(mir_program))
            }),
        };
        let Some((path, serialized)) = result else {
            continue;
        };
        let serialized = match serialized {
            Ok(json) => json,
            Err(err) => {
                eprintln!("serialization failed for `{}`: {err}", module.path);
                return 1;
            }
        };
        if let Err(err) = std::fs::write(&path, serialized) {
            eprintln!("cannot write `{path}`: {err}");
            return 1;
        }
        println!("wrote {path}");
        if emit == "mir" {
            if let Some(mir_program) = &module.mir {
                let dump_path = format!("{out_dir}/{stem}.mir.txt");
                if std::fs::write(&dump_path, mir::dump(mir_program)).is_ok() {
                    println!("wrote {dump_path}");
                }
            }
        }
    }

    0
}
