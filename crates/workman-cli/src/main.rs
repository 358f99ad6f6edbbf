//! `wm` - the Workman front-end driver.
//!
//! Exit codes: 0 on success, 1 when any diagnostic is reported, 2 on
//! usage errors (argument parsing is handled by clap).

mod commands;
mod loader;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "wm", version, about = "Workman compiler front end")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Type-check a module graph and print the entry module's schemes.
    Type(CommonArgs),
    /// Report diagnostics only; exit 1 when any are present.
    Err(CommonArgs),
    /// Compile and write Core IR / MIR artifacts.
    Compile {
        #[command(flatten)]
        common: CommonArgs,
        /// Output directory for artifacts.
        #[arg(long, default_value = "out")]
        out_dir: String,
        /// Which artifact to write.
        #[arg(long, value_parser = ["core", "mir"], default_value = "mir")]
        emit: String,
    },
}

#[derive(clap::Args)]
struct CommonArgs {
    /// Entry module path (`.wm`).
    file: String,
    /// Std library roots, searched in order for `std/...` imports.
    #[arg(long = "std-root")]
    std_roots: Vec<String>,
    /// Prelude module compiled before the entry.
    #[arg(long)]
    prelude: Option<String>,
}

fn main() {
    let cli = Cli::parse();
    let code = match cli.command {
        Command::Type(args) => commands::type_check(&args.file, &args.std_roots, args.prelude),
        Command::Err(args) => commands::report_errors(&args.file, &args.std_roots, args.prelude),
        Command::Compile {
            common,
            out_dir,
            emit,
        } => commands::compile(
            &common.file,
            &common.std_roots,
            common.prelude,
            &out_dir,
            &emit,
        ),
    };
    std::process::exit(code);
}
