mod app;
mod config;
mod flatten;
mod interactive;
mod report;
mod review;

use clap::Parser;
use colored::Colorize;
use std::io;
use std::path::PathBuf;
use std::process;
use tracing::{debug, info, info_span, warn};
use tracing_subscriber::EnvFilter;

use app::{AppError, RunOptions};

/// Repo Review — flattens a repository with repomix, asks Gemini for the most
/// impactful code-review issues, and writes them to a formatted spreadsheet.
#[derive(Parser, Debug)]
#[command(name = "repo-review", version, about)]
struct Cli {
    /// Repository path
    #[arg(long, default_value = ".")]
    path: PathBuf,

    /// Keep the generated temporary XML file
    #[arg(long)]
    keep: bool,

    /// Number of issues to request (default 10 if omitted)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    issues: Option<u32>,

    /// Additional free-form user instructions for the model
    #[arg(long)]
    instructions: Option<String>,

    /// Don't prompt; rely solely on flags (useful for scripts)
    #[arg(long)]
    non_interactive: bool,
}

#[tokio::main]
async fn main() {
    // Values in ./.env win over the inherited environment, RUST_LOG included.
    let dotenv = dotenvy::dotenv_override();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    match dotenv {
        Ok(path) => debug!(path = %path.display(), "loaded .env"),
        Err(err) if err.not_found() => {}
        Err(err) => warn!(error = %err, "could not load .env"),
    }

    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        eprintln!("{} {err}", "error:".red().bold());
        process::exit(err.exit_code());
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let repo_path = std::fs::canonicalize(&cli.path).unwrap_or_else(|_| cli.path.clone());
    let _main_span = info_span!("repo_review", repo = %repo_path.display()).entered();

    let config = config::Config::load()?;
    let (repomix, reviewer) = app::preflight(&config, cli.keep)?;

    let (issues, instructions) = resolve_request(&cli);
    let options = RunOptions {
        repo_path,
        issues,
        instructions,
    };

    let outcome = app::execute(&options, &config, &repomix, &reviewer).await?;
    report::print_summary(&outcome.response, &outcome.output_path);

    match report::render_json(&outcome.response) {
        Ok(json) => println!("{json}"),
        Err(err) => warn!(error = %err, "could not render JSON output"),
    }
    info!(
        issues = outcome.metadata.issues_returned,
        file = %outcome.metadata.output_file,
        "done"
    );
    Ok(())
}

/// Fill in options the user left out, asking on the terminal unless
/// `--non-interactive` is set.
fn resolve_request(cli: &Cli) -> (u32, Option<String>) {
    let mut issues = cli.issues.unwrap_or(interactive::DEFAULT_ISSUES);
    let mut instructions = cli.instructions.clone();

    if cli.non_interactive {
        return (issues, instructions);
    }

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut output = io::stderr();

    if cli.issues.is_none() {
        issues = interactive::prompt_for_count(
            &mut input,
            &mut output,
            "How many issues would you like surfaced?",
            interactive::DEFAULT_ISSUES,
        )
        .unwrap_or(interactive::DEFAULT_ISSUES);
    }
    if cli.instructions.is_none() {
        instructions = interactive::prompt_for_optional_text(
            &mut input,
            &mut output,
            "Any additional user instructions?",
        )
        .unwrap_or(None);
    }
    (issues, instructions)
}
