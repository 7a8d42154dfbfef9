use std::path::Path;

use log::debug;
use portable_pty::CommandBuilder;

use crate::terminals::SpawnRequest;

/// Build a shell invocation of the request's command line, run from `cwd`
pub(crate) fn shell_command(request: &SpawnRequest, cwd: &Path) -> CommandBuilder {
    debug!(
        "Building command '{}' for terminal '{}' in {}",
        request.command,
        request.terminal_id,
        cwd.display()
    );
    let mut command_builder = CommandBuilder::new("sh");
    command_builder.args(["-c", &request.command]);
    for (key, value) in std::env::vars() {
        command_builder.env(key, value);
    }
    command_builder.env("TERM", "xterm-256color");
    command_builder.env("TERMPLAN_TERMINAL_ID", &request.terminal_id);
    command_builder.cwd(cwd);
    command_builder
}
