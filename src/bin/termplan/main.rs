mod generate;
mod run;
mod validate;

use std::process::ExitCode;

use clap::{Parser, Subcommand};

use termplan::load_project;

#[derive(Parser, Debug)]
#[command(
    name = "termplan",
    about = "Generate commands from a section config tree and run them in terminals"
)]
struct Cli {
    /// Path to project file (auto-detected if not specified)
    #[arg(short, long)]
    config: Option<String>,

    /// Path to a state file replacing the project file's inline state
    #[arg(short, long)]
    state: Option<String>,

    /// Log file path (logs are also written to stderr)
    #[arg(long)]
    log_file: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the generated command list
    Generate(generate::GenerateArgs),
    /// Check the project file and report overlapping command definitions
    Validate,
    /// Run every generated command in its own terminal
    Run(run::RunArgs),
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

#[tokio::main]
async fn run() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let log_file = cli
        .log_file
        .as_ref()
        .map(std::fs::File::create)
        .transpose()?;
    termplan::logger::init(log_file)?;

    let project = load_project(cli.config.as_deref(), cli.state.as_deref())?;

    match cli.command {
        Commands::Generate(ref args) => generate::run(args, &project),
        Commands::Validate => Ok(validate::run(&project)),
        Commands::Run(ref args) => {
            run::run(args, project, cli.config.as_deref(), cli.state.as_deref()).await
        }
    }
}
