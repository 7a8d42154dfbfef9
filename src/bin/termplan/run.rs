use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Args;
use log::{error, info, warn};
use tokio::sync::mpsc;

use termplan::pty::PtyBackend;
use termplan::terminals::{DockerCli, ProcessEvent, TerminalManager, TerminalStatus};
use termplan::{Project, load_project};

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Keep running and regenerate all terminals when the project or state file changes
    #[arg(long)]
    watch: bool,

    /// Docker-compatible CLI used to stop associated containers
    #[arg(long, default_value = "docker")]
    container_cli: String,
}

/// Start a watcher on the project files that sends a reload signal with manual 1s debounce.
fn start_project_watcher(
    paths: &[&Path],
    reload_tx: mpsc::Sender<()>,
) -> Option<Box<dyn notify::Watcher>> {
    use notify::{EventKind, RecursiveMode, Watcher};
    use std::time::Instant;

    let last_reload = Arc::new(parking_lot::Mutex::new(Instant::now()));

    let mut watcher =
        match notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
            if let Ok(event) = res
                && matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_))
            {
                let mut last = last_reload.lock();
                if last.elapsed().as_secs() >= 1 {
                    *last = Instant::now();
                    let _ = reload_tx.blocking_send(());
                }
            }
        }) {
            Ok(watcher) => watcher,
            Err(e) => {
                warn!("Project file watcher not started: {e}");
                return None;
            }
        };

    for path in paths {
        if let Err(e) = watcher.watch(path, RecursiveMode::NonRecursive) {
            warn!("Project file watcher not started for {}: {e}", path.display());
            return None;
        }
        info!("Watching {} for changes", path.display());
    }
    Some(Box::new(watcher))
}

/// Prints terminal output line by line, prefixed with the terminal's title
#[derive(Default)]
struct OutputPrinter {
    partial: HashMap<String, Vec<u8>>,
}

impl OutputPrinter {
    fn push(&mut self, title: &str, terminal_id: &str, data: &[u8]) {
        let buffer = self.partial.entry(terminal_id.to_string()).or_default();
        buffer.extend_from_slice(data);
        while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = buffer.drain(..=pos).collect();
            print_line(title, &line);
        }
    }

    fn flush(&mut self, title: &str, terminal_id: &str) {
        if let Some(rest) = self.partial.remove(terminal_id)
            && !rest.is_empty()
        {
            print_line(title, &rest);
        }
    }
}

fn print_line(title: &str, line: &[u8]) {
    let text = String::from_utf8_lossy(line);
    let text = text.trim_end_matches(['\r', '\n']);
    let _ = writeln!(std::io::stdout().lock(), "[{title}] {text}");
}

fn title_of(manager: &TerminalManager, terminal_id: &str) -> String {
    manager
        .get(terminal_id)
        .map_or_else(|| terminal_id.to_string(), |r| r.title.clone())
}

fn open_project(manager: &mut TerminalManager, project: &Project) {
    for (_, title) in project.attach_warnings() {
        warn!("{title}: attached despite an attach warning");
    }
    let entries = project.generate();
    manager.open_tabs(entries);
    for record in manager.records() {
        if let Some(message) = &record.error_message {
            warn!("{}: {message}", record.title);
        }
    }
}

/// Run every generated command until all have finished, or until interrupted.
///
/// # Errors
///
/// Returns an error if writing output fails.
pub async fn run(
    args: &RunArgs,
    project: Project,
    config_file: Option<&str>,
    state_file: Option<&str>,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let (backend, mut process_rx) = PtyBackend::new(&project.cwd);
    let mut manager = TerminalManager::new(
        Arc::new(backend),
        Arc::new(DockerCli::with_program(&args.container_cli)),
    );

    let (reload_tx, mut reload_rx) = mpsc::channel(16);
    let watcher = if args.watch {
        start_project_watcher(&project.watched_files(), reload_tx)
    } else {
        None
    };

    open_project(&mut manager, &project);
    let mut printer = OutputPrinter::default();

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        if !args.watch && manager.all_settled() {
            break;
        }

        tokio::select! {
            Some(event) = process_rx.recv() => {
                let title = title_of(&manager, event.terminal_id());
                match &event {
                    ProcessEvent::Output { terminal_id, data } => {
                        // Output of removed terminals is dropped
                        if manager.get(terminal_id).is_some() {
                            printer.push(&title, terminal_id, data);
                        }
                    }
                    ProcessEvent::Ended { terminal_id, .. } => printer.flush(&title, terminal_id),
                    ProcessEvent::Started { .. } => {}
                }
                manager.handle_process_event(&event);
            }
            Some(()) = reload_rx.recv() => {
                info!("Project changed, regenerating terminals");
                match load_project(config_file, state_file) {
                    Ok(project) => {
                        let report = manager.kill_all_terminals();
                        if !report.is_clean() {
                            warn!("Some terminals or containers did not stop cleanly");
                        }
                        open_project(&mut manager, &project);
                    }
                    Err(e) => error!("Failed to reload project: {e}"),
                }
            }
            _ = &mut ctrl_c => {
                info!("Interrupted, stopping all terminals");
                let report = manager.kill_all_terminals();
                for kill in report.kills.iter().filter(|k| k.error.is_some()) {
                    warn!("Terminal '{}' could not be killed", title_of(&manager, &kill.terminal_id));
                }
                drop(watcher);
                return Ok(ExitCode::from(130));
            }
        }
    }

    drop(watcher);
    std::io::stdout().flush()?;

    let failed: Vec<_> = manager
        .records()
        .iter()
        .filter(|r| r.status == TerminalStatus::Error)
        .collect();
    for record in &failed {
        error!(
            "{} failed: {}",
            record.title,
            record.error_message.as_deref().unwrap_or("unknown error")
        );
    }

    if failed.is_empty() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
