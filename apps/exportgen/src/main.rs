use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use exportgen_exports::{GenerateArgs, ListArgs, ValidateArgs};
use log::{Level, debug, error, info};
use std::io::{BufWriter, Write};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "exportgen")]
#[command(about = "Generate package.json exports for JavaScript/TypeScript packages", version)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Generate the exports field of package.json from source files
    #[command(visible_alias = "gen")]
    Generate(GenerateArgs),
    /// List the exports of a package
    #[command(visible_alias = "ls")]
    List(ListArgs),
    /// Validate the exports field of a package
    Validate(ValidateArgs),
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // --help and --version are reported as errors that go to stdout
            let code = if err.use_stderr() { 1 } else { 0 };
            if let Err(io_err) = err.print() {
                eprintln!("Failed to write usage message: {io_err}");
                std::process::exit(1);
            }
            std::process::exit(code);
        }
    };

    if cli.no_color {
        colored::control::set_override(false);
    }
    init_logger(cli.verbose);
    debug!("Parsed CLI arguments: {:?}", cli.command);

    if let Err(err) = run(cli.command) {
        error!("{:#}", err);
        std::process::exit(1);
    }
}

fn init_logger(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format(|buf, record| {
            let level = match record.level() {
                Level::Error => "error".red().bold(),
                Level::Warn => "warn".yellow().bold(),
                Level::Info => "info".green(),
                Level::Debug => "debug".blue(),
                Level::Trace => "trace".dimmed(),
            };
            writeln!(buf, "{} {}", level, record.args())
        })
        .init();
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Generate(args) => {
            // stdio is blocked by LineWriter, use a BufWriter to reduce syscalls.
            // See https://github.com/rust-lang/rust/issues/60673
            let mut stdout = BufWriter::new(std::io::stdout());
            let cwd = std::env::current_dir()?;
            let start = Instant::now();

            info!(
                "Generating exports in {} (using {} threads)",
                cwd.display(),
                rayon::current_num_threads()
            );
            let report = exportgen_exports::run_generate(&args, &cwd, &mut stdout)?;
            debug!("Skipped {} packages without exports", report.skipped.len());

            exportgen_exports::print_finished(
                &mut stdout,
                start.elapsed().as_millis(),
                report.packages.len(),
                report.export_count(),
            )?;
            stdout.flush()?;
            Ok(())
        }
        Commands::List(args) => exportgen_exports::run_list(&args),
        Commands::Validate(args) => exportgen_exports::run_validate(&args),
    }
}
