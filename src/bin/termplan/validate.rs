use std::process::ExitCode;

use termplan::Project;

/// Report overlapping definitions and attach warnings; loading already validated
/// everything else.
pub fn run(project: &Project) -> ExitCode {
    for (id, title) in project.attach_warnings() {
        eprintln!("'{title}' ({id}) is attached but flagged with an attach warning");
    }
    let generation = project.generate_with_report();
    for ambiguity in &generation.ambiguities {
        eprintln!(
            "'{}' matches {} definitions at once: {}",
            ambiguity.owner_id,
            ambiguity.definition_ids.len(),
            ambiguity.definition_ids.join(", ")
        );
    }
    let errors = generation.entries.iter().filter(|e| e.is_error()).count();
    eprintln!(
        "{}: {} sections, {} definitions, {} entries ({errors} unsatisfied)",
        project.config_path.display(),
        project.sections.sections.len(),
        project.definitions.len(),
        generation.entries.len(),
    );

    if generation.ambiguities.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
