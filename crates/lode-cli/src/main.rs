use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use console::style;

use lode_metadata::JsonParser;
use lode_resolver::{ArchiveStore, BuiltinMod, DirectoryModFinder, ModResolver};

#[derive(Parser)]
#[command(name = "lode")]
#[command(about = "Mod discovery and resolution", version)]
struct Cli {
    /// Increase log verbosity (-v: info, -vv: debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve the mods in a directory and print the selected set
    Resolve {
        /// Directory containing mod archives
        #[arg(long, default_value = "mods")]
        mods_dir: PathBuf,

        /// Built-in mods provided by the host, as `id@version`
        #[arg(long = "builtin", value_name = "ID@VERSION")]
        builtins: Vec<String>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("{} {error:#}", style("error:").red().bold());
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Resolve { mods_dir, builtins } => resolve(mods_dir, builtins),
    }
}

fn resolve(mods_dir: PathBuf, builtins: Vec<String>) -> Result<()> {
    let store = Arc::new(ArchiveStore::new());
    let mut resolver = ModResolver::new(store, Arc::new(JsonParser::new()));
    resolver.add_finder(DirectoryModFinder::new(&mods_dir));
    for builtin in &builtins {
        resolver.add_builtin(parse_builtin(builtin)?);
    }

    let resolution = resolver
        .resolve()
        .with_context(|| format!("failed to resolve mods in {}", mods_dir.display()))?;

    if resolution.mods.is_empty() {
        println!("{}", style("no mods found").dim());
        return Ok(());
    }

    println!(
        "{} {} mod(s):",
        style("resolved").green().bold(),
        resolution.mods.len()
    );
    for (id, candidate) in &resolution.mods {
        println!(
            "  {} {} ({})",
            style(id).bold(),
            candidate.version(),
            style(candidate.readable_origin()).dim()
        );
    }
    Ok(())
}

fn parse_builtin(spec: &str) -> Result<BuiltinMod> {
    let (id, version) = spec
        .split_once('@')
        .with_context(|| format!("invalid --builtin `{spec}`, expected `id@version`"))?;
    Ok(BuiltinMod::new(id, version))
}
