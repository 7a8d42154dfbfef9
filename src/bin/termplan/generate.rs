use std::io::Write;
use std::process::ExitCode;

use clap::Args;

use termplan::Project;
use termplan::commands::spec::CommandEntry;

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Print the entries as JSON
    #[arg(long)]
    json: bool,
}

/// Print the generated command list.
///
/// # Errors
///
/// Returns an error if writing to stdout or serializing fails.
pub fn run(args: &GenerateArgs, project: &Project) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let entries = project.generate();
    let mut stdout = std::io::stdout().lock();

    if args.json {
        serde_json::to_writer_pretty(&mut stdout, &entries)?;
        writeln!(stdout)?;
    } else {
        for entry in &entries {
            match entry {
                CommandEntry::Command(spec) => {
                    writeln!(stdout, "{} ({}): {}", spec.tab_title, spec.section_id, spec.command)?;
                }
                CommandEntry::Error(issue) => {
                    writeln!(stdout, "{}: error: {}", issue.section_id, issue.message)?;
                }
            }
        }
    }

    if entries.iter().any(CommandEntry::is_error) {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}
