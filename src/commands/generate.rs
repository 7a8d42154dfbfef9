use std::collections::{BTreeMap, HashSet};

use log::{debug, warn};
use serde_json::Value;

use super::assemble::assemble;
use super::definition::CommandDefinition;
use super::spec::{CommandEntry, CommandSpec, ConfigIssue, NO_SUITABLE_COMMAND};
use crate::condition::{EvalInputs, strict_equals};
use crate::sections::{
    AttachState, ConfigTree, DropdownValues, Owner, SectionTree, is_enabled,
};

/// Everything besides the config tree and dropdowns that generation depends on
#[derive(Debug, Clone, Copy)]
pub struct GenerateOptions<'a> {
    pub attach_state: &'a AttachState,
    pub definitions: &'a [CommandDefinition],
    pub section_tree: &'a SectionTree,
    pub show_test_sections: bool,
}

/// Several definitions qualified for the same element at once
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ambiguity {
    pub owner_id: String,
    pub definition_ids: Vec<String>,
}

/// Generated entries plus any ambiguities detected along the way
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Generation {
    pub entries: Vec<CommandEntry>,
    pub ambiguities: Vec<Ambiguity>,
}

/// Look up the value a `conditions` key refers to.
///
/// * `attachState.<id>` reads the attach map (missing means `false`)
/// * `<x>Config.<prop>` reads the nested `<x>Config` object of whichever
///   section holds it, falling back to the top-level section `<x>`
/// * bare keys read the owner's own config; `*Selected` keys read the parent's
///   config when the owner is a sub-section
fn condition_value(
    key: &str,
    owner: &Owner<'_>,
    config: &ConfigTree,
    attach_state: &AttachState,
) -> Option<Value> {
    if let Some((object, property)) = key.split_once('.') {
        if object == "attachState" {
            return Some(Value::Bool(attach_state.is_attached(property)));
        }
        let section_id = object.strip_suffix("Config")?;
        return config
            .find_nested(object)
            .or_else(|| config.section(section_id))
            .and_then(|nested| nested.get(property))
            .cloned();
    }

    let source = match owner.parent_id() {
        Some(parent_id) if key.ends_with("Selected") => config.section(parent_id),
        _ => config.owner_config(owner),
    };
    source.and_then(|c| c.get(key)).cloned()
}

fn conditions_match(
    definition: &CommandDefinition,
    owner: &Owner<'_>,
    config: &ConfigTree,
    attach_state: &AttachState,
) -> bool {
    definition.conditions.iter().all(|(key, expected)| {
        let actual = condition_value(key, owner, config, attach_state);
        actual
            .as_ref()
            .is_some_and(|actual| strict_equals(Some(actual), Some(expected)))
    })
}

fn issue(section_id: &str) -> CommandEntry {
    CommandEntry::Error(ConfigIssue {
        section_id: section_id.to_string(),
        message: NO_SUITABLE_COMMAND.to_string(),
    })
}

/// Emit an error entry for every enabled element that expected a command but got none
fn completeness_issues(
    config: &ConfigTree,
    options: &GenerateOptions<'_>,
    satisfied: &HashSet<String>,
) -> Vec<CommandEntry> {
    let owners_with_definitions: HashSet<&str> = options
        .definitions
        .iter()
        .map(|d| d.section_id.as_str())
        .collect();
    let visible = |test_section: bool| options.show_test_sections || !test_section;

    let mut issues = Vec::new();
    for section in &options.section_tree.sections {
        if !visible(section.test_section) {
            continue;
        }
        if !config.section(&section.id).is_some_and(is_enabled) {
            continue;
        }

        let enabled_subs: Vec<&str> = section
            .sub_sections
            .iter()
            .filter(|sub| visible(sub.test_section))
            .filter(|sub| {
                config
                    .sub_section(&section.id, &sub.id)
                    .is_some_and(is_enabled)
            })
            .map(|sub| sub.id.as_str())
            .collect();

        if owners_with_definitions.contains(section.id.as_str()) {
            if !satisfied.contains(&section.id) {
                issues.push(issue(&section.id));
            }
        } else if !enabled_subs.is_empty()
            && !enabled_subs.iter().any(|id| satisfied.contains(*id))
        {
            issues.push(issue(&section.id));
        }

        for sub_id in enabled_subs {
            if owners_with_definitions.contains(sub_id) && !satisfied.contains(sub_id) {
                issues.push(issue(sub_id));
            }
        }
    }
    issues
}

/// Walk the catalogue against the config tree, returning entries and ambiguities.
#[must_use]
pub fn generate_with_report(
    config: &ConfigTree,
    dropdowns: &DropdownValues,
    options: &GenerateOptions<'_>,
) -> Generation {
    let inputs = EvalInputs::new(config, options.attach_state, dropdowns);
    let mut entries = Vec::new();
    let mut satisfied = HashSet::new();
    let mut emitted: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for (index, definition) in options.definitions.iter().enumerate() {
        let definition_id = definition.resolved_id(index);
        let Some(owner) = options.section_tree.find(&definition.section_id) else {
            debug!(
                "Skipping definition '{definition_id}': section '{}' not in tree",
                definition.section_id
            );
            continue;
        };
        if owner.is_test() && !options.show_test_sections {
            continue;
        }
        if !conditions_match(definition, &owner, config, options.attach_state) {
            continue;
        }

        let assembled = assemble(definition, &owner, &inputs);
        entries.push(CommandEntry::Command(CommandSpec {
            section_id: owner.id().to_string(),
            command: assembled.command,
            command_definition_id: definition_id.clone(),
            is_sub_section_command: owner.is_sub_section(),
            associated_containers: assembled.associated_containers,
            refresh_config: definition.command.refresh_config.clone(),
            tab_title: assembled.tab_title,
        }));
        satisfied.insert(owner.id().to_string());
        emitted
            .entry(owner.id().to_string())
            .or_default()
            .push(definition_id);
    }

    entries.extend(completeness_issues(config, options, &satisfied));

    let ambiguities = emitted
        .into_iter()
        .filter(|(_, ids)| ids.len() > 1)
        .map(|(owner_id, definition_ids)| Ambiguity {
            owner_id,
            definition_ids,
        })
        .collect();

    Generation {
        entries,
        ambiguities,
    }
}

/// Produce the ordered command list for the current configuration.
///
/// When several definitions qualify for the same element every one of them is
/// emitted and the overlap is logged; the catalogue is expected to avoid it.
#[must_use]
pub fn generate(
    config: &ConfigTree,
    dropdowns: &DropdownValues,
    options: &GenerateOptions<'_>,
) -> Vec<CommandEntry> {
    let generation = generate_with_report(config, dropdowns, options);
    for ambiguity in &generation.ambiguities {
        warn!(
            "Section '{}' matched {} command definitions at once: {}",
            ambiguity.owner_id,
            ambiguity.definition_ids.len(),
            ambiguity.definition_ids.join(", ")
        );
    }
    debug!("Generated {} command entries", generation.entries.len());
    generation.entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::definition::CommandTemplate;
    use crate::sections::{SectionDefinition, SubSectionDefinition};
    use serde_json::json;

    fn section(id: &str, subs: &[&str]) -> SectionDefinition {
        SectionDefinition {
            id: id.to_string(),
            title: id.to_uppercase(),
            sub_sections: subs
                .iter()
                .map(|sub| SubSectionDefinition {
                    id: (*sub).to_string(),
                    title: sub.to_uppercase(),
                    test_section: false,
                })
                .collect(),
            ..Default::default()
        }
    }

    fn def(section_id: &str, conditions: Value, base: &str) -> CommandDefinition {
        CommandDefinition {
            id: None,
            section_id: section_id.to_string(),
            conditions: serde_json::from_value(conditions).unwrap(),
            command: CommandTemplate {
                base: base.to_string(),
                ..Default::default()
            },
        }
    }

    fn commands(entries: &[CommandEntry]) -> Vec<&str> {
        entries
            .iter()
            .filter_map(CommandEntry::as_command)
            .map(|spec| spec.command.as_str())
            .collect()
    }

    fn errors(entries: &[CommandEntry]) -> Vec<&str> {
        entries
            .iter()
            .filter(|e| e.is_error())
            .map(CommandEntry::section_id)
            .collect()
    }

    #[test]
    fn test_attach_state_selects_variant() {
        let tree = SectionTree::new(vec![section("sectionA", &[])]);
        let definitions = vec![
            def(
                "sectionA",
                json!({"enabled": true, "attachState.sectionA": false}),
                "cmdA",
            ),
            def(
                "sectionA",
                json!({"enabled": true, "attachState.sectionA": true}),
                "cmdA-debug",
            ),
        ];
        let config = ConfigTree::from_value(json!({"sectionA": {"enabled": true}})).unwrap();
        let dropdowns = DropdownValues::new();

        for (attached, expected) in [(false, "cmdA"), (true, "cmdA-debug")] {
            let attach: AttachState = [("sectionA", attached)].into_iter().collect();
            let options = GenerateOptions {
                attach_state: &attach,
                definitions: &definitions,
                section_tree: &tree,
                show_test_sections: false,
            };
            let entries = generate(&config, &dropdowns, &options);
            assert_eq!(commands(&entries), vec![expected]);
            assert!(errors(&entries).is_empty());
        }
    }

    #[test]
    fn test_unsatisfied_enabled_section_reports_error() {
        let tree = SectionTree::new(vec![section("db", &[]), section("cache", &[])]);
        let definitions = vec![
            def("db", json!({"enabled": true, "mode": "local"}), "postgres"),
            def("cache", json!({"enabled": true}), "redis-server"),
        ];
        let config = ConfigTree::from_value(json!({
            "db": {"enabled": true, "mode": "cloud"},
            "cache": {"enabled": false},
        }))
        .unwrap();
        let attach = AttachState::default();
        let options = GenerateOptions {
            attach_state: &attach,
            definitions: &definitions,
            section_tree: &tree,
            show_test_sections: false,
        };
        let entries = generate(&config, &DropdownValues::new(), &options);
        assert!(commands(&entries).is_empty());
        assert_eq!(errors(&entries), vec!["db"]);
        assert_eq!(
            entries[0],
            CommandEntry::Error(ConfigIssue {
                section_id: "db".to_string(),
                message: NO_SUITABLE_COMMAND.to_string(),
            })
        );
    }

    #[test]
    fn test_sub_sections_and_parent_completeness() {
        let tree = SectionTree::new(vec![section("services", &["auth", "billing"])]);
        let definitions = vec![
            def("auth", json!({"enabled": true}), "auth-svc ${region}"),
            def("billing", json!({"enabled": true, "mode": "dev"}), "billing-svc"),
        ];
        let config = ConfigTree::from_value(json!({
            "services": {
                "enabled": true,
                "region": "eu",
                "authConfig": {"enabled": true},
                "billingConfig": {"enabled": true, "mode": "prod"},
            }
        }))
        .unwrap();
        let attach = AttachState::default();
        let options = GenerateOptions {
            attach_state: &attach,
            definitions: &definitions,
            section_tree: &tree,
            show_test_sections: false,
        };
        let entries = generate(&config, &DropdownValues::new(), &options);
        assert_eq!(commands(&entries), vec!["auth-svc eu"]);
        // the parent is satisfied by auth; billing is checked on its own
        assert_eq!(errors(&entries), vec!["billing"]);
        let spec = entries[0].as_command().unwrap();
        assert!(spec.is_sub_section_command);
        assert_eq!(spec.section_id, "auth");
        assert_eq!(spec.command_definition_id, "auth-0");
    }

    #[test]
    fn test_parent_without_definitions_and_no_satisfied_sub() {
        let tree = SectionTree::new(vec![section("services", &["auth"])]);
        let definitions = vec![def("auth", json!({"enabled": true, "mode": "x"}), "auth")];
        let config = ConfigTree::from_value(json!({
            "services": {"enabled": true, "authConfig": {"enabled": true}}
        }))
        .unwrap();
        let attach = AttachState::default();
        let options = GenerateOptions {
            attach_state: &attach,
            definitions: &definitions,
            section_tree: &tree,
            show_test_sections: false,
        };
        let entries = generate(&config, &DropdownValues::new(), &options);
        assert_eq!(errors(&entries), vec!["services", "auth"]);
    }

    #[test]
    fn test_selected_keys_resolve_against_parent() {
        let tree = SectionTree::new(vec![section("services", &["auth"])]);
        let definitions = vec![def(
            "auth",
            json!({"enabled": true, "versionSelected": "v2"}),
            "auth-v2",
        )];
        let config = ConfigTree::from_value(json!({
            "services": {"enabled": true, "versionSelected": "v2", "authConfig": {"enabled": true}}
        }))
        .unwrap();
        let attach = AttachState::default();
        let options = GenerateOptions {
            attach_state: &attach,
            definitions: &definitions,
            section_tree: &tree,
            show_test_sections: false,
        };
        assert_eq!(
            commands(&generate(&config, &DropdownValues::new(), &options)),
            vec!["auth-v2"]
        );
    }

    #[test]
    fn test_nested_config_condition_key() {
        let tree = SectionTree::new(vec![section("services", &["auth"]), section("gateway", &[])]);
        let definitions = vec![def(
            "gateway",
            json!({"enabled": true, "authConfig.enabled": true}),
            "gateway --with-auth",
        )];
        let config = ConfigTree::from_value(json!({
            "services": {"enabled": false, "authConfig": {"enabled": true}},
            "gateway": {"enabled": true},
        }))
        .unwrap();
        let attach = AttachState::default();
        let options = GenerateOptions {
            attach_state: &attach,
            definitions: &definitions,
            section_tree: &tree,
            show_test_sections: false,
        };
        assert_eq!(
            commands(&generate(&config, &DropdownValues::new(), &options)),
            vec!["gateway --with-auth"]
        );
    }

    #[test]
    fn test_test_sections_and_orphans_are_skipped() {
        let mut e2e = section("e2e", &[]);
        e2e.test_section = true;
        let tree = SectionTree::new(vec![e2e]);
        let definitions = vec![
            def("e2e", json!({"enabled": true}), "playwright test"),
            def("ghost", json!({}), "never"),
        ];
        let config = ConfigTree::from_value(json!({"e2e": {"enabled": true}})).unwrap();
        let attach = AttachState::default();
        let mut options = GenerateOptions {
            attach_state: &attach,
            definitions: &definitions,
            section_tree: &tree,
            show_test_sections: false,
        };
        assert!(generate(&config, &DropdownValues::new(), &options).is_empty());

        options.show_test_sections = true;
        assert_eq!(
            commands(&generate(&config, &DropdownValues::new(), &options)),
            vec!["playwright test"]
        );
    }

    #[test]
    fn test_overlapping_definitions_are_reported() {
        let tree = SectionTree::new(vec![section("api", &[])]);
        let definitions = vec![
            def("api", json!({"enabled": true}), "one"),
            def("api", json!({"enabled": true}), "two"),
        ];
        let config = ConfigTree::from_value(json!({"api": {"enabled": true}})).unwrap();
        let attach = AttachState::default();
        let options = GenerateOptions {
            attach_state: &attach,
            definitions: &definitions,
            section_tree: &tree,
            show_test_sections: false,
        };
        let generation = generate_with_report(&config, &DropdownValues::new(), &options);
        assert_eq!(commands(&generation.entries), vec!["one", "two"]);
        assert_eq!(
            generation.ambiguities,
            vec![Ambiguity {
                owner_id: "api".to_string(),
                definition_ids: vec!["api-0".to_string(), "api-1".to_string()],
            }]
        );
    }

    #[test]
    fn test_generation_is_deterministic() {
        let tree = SectionTree::new(vec![section("api", &["worker"]), section("db", &[])]);
        let definitions = vec![
            def("api", json!({"enabled": true}), "api ${port}"),
            def("worker", json!({"enabled": true}), "worker"),
            def("db", json!({"enabled": true, "mode": "x"}), "db"),
        ];
        let config = ConfigTree::from_value(json!({
            "api": {"enabled": true, "port": 1, "workerConfig": {"enabled": true}},
            "db": {"enabled": true},
        }))
        .unwrap();
        let attach = AttachState::default();
        let options = GenerateOptions {
            attach_state: &attach,
            definitions: &definitions,
            section_tree: &tree,
            show_test_sections: false,
        };
        let first = generate(&config, &DropdownValues::new(), &options);
        let second = generate(&config, &DropdownValues::new(), &options);
        assert_eq!(first, second);
        assert_eq!(commands(&first), vec!["api 1", "worker"]);
        assert_eq!(errors(&first), vec!["db"]);
    }
}
