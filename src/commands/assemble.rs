use std::sync::LazyLock;

use log::debug;
use regex::{Captures, Regex};
use serde_json::Value;

use super::definition::{CommandDefinition, ContainerRef, ModifierAction, TabTitle};
use crate::condition::EvalInputs;
use crate::sections::Owner;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("placeholder pattern is valid"));

/// Output of assembling one command template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledCommand {
    pub command: String,
    pub tab_title: String,
    pub associated_containers: Vec<String>,
}

/// Assemble the command, tab title and container list of `definition` for `owner`.
///
/// The command is built in a fixed order: base, modifiers, post-modifiers,
/// excludes, final append, prefix, then `${name}` substitution.
#[must_use]
pub fn assemble(
    definition: &CommandDefinition,
    owner: &Owner<'_>,
    inputs: &EvalInputs<'_>,
) -> AssembledCommand {
    let template = &definition.command;
    let owner_id = owner.id();
    let holds = |condition: &str| inputs.evaluate(condition, owner_id);

    let mut command = template.base.clone();
    for modifier in &template.modifiers {
        if !holds(&modifier.condition) {
            continue;
        }
        match &modifier.action {
            ModifierAction::Append(text) => command.push_str(text),
            ModifierAction::Replace(text) => command.clone_from(text),
        }
    }
    command.push_str(&template.post_modifiers);
    for exclude in &template.excludes {
        if holds(&exclude.condition) {
            command.push_str(&exclude.append);
        }
    }
    command.push_str(&template.final_append);
    command.insert_str(0, &template.prefix);

    let command = substitute(&command, owner, inputs);
    debug!("Assembled command for '{owner_id}': {command}");

    let tab_title = match &template.tab_title {
        None => owner.title().to_string(),
        Some(TabTitle::Literal(title)) => title.clone(),
        Some(TabTitle::Conditional {
            base,
            conditional_appends,
        }) => {
            let mut title = base.clone();
            for append in conditional_appends {
                if holds(&append.condition) {
                    title.push_str(&append.append);
                }
            }
            title
        }
    };

    let associated_containers = template
        .associated_containers
        .iter()
        .filter_map(|container| match container {
            ContainerRef::Name(name) => Some(name.clone()),
            ContainerRef::Conditional { name, condition } => {
                holds(condition).then(|| name.clone())
            }
        })
        .collect();

    AssembledCommand {
        command,
        tab_title,
        associated_containers,
    }
}

fn render(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Resolve a `${name}` placeholder.
///
/// Lookup order: the parent section (sub-section owners only), the owner
/// itself, global dropdowns, and finally `mode`/`deploymentType` for `mode`.
fn resolve_variable(name: &str, owner: &Owner<'_>, inputs: &EvalInputs<'_>) -> Option<String> {
    let own = inputs.config.owner_config(owner);
    let parent = owner.parent_id().and_then(|id| inputs.config.section(id));
    let chain = [parent, own];

    chain
        .iter()
        .flatten()
        .find_map(|config| config.get(name).and_then(render))
        .or_else(|| inputs.dropdowns.get(name).and_then(render))
        .or_else(|| {
            if name != "mode" {
                return None;
            }
            chain.iter().flatten().find_map(|config| {
                config
                    .get("mode")
                    .or_else(|| config.get("deploymentType"))
                    .and_then(render)
            })
        })
}

/// Replace every `${name}` in `command`. Unresolved placeholders stay verbatim.
#[must_use]
pub fn substitute(command: &str, owner: &Owner<'_>, inputs: &EvalInputs<'_>) -> String {
    PLACEHOLDER
        .replace_all(command, |caps: &Captures<'_>| {
            resolve_variable(&caps[1], owner, inputs).unwrap_or_else(|| {
                debug!("Unresolved placeholder {} for '{}'", &caps[0], owner.id());
                caps[0].to_string()
            })
        })
        .into_owned()
}
