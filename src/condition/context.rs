use serde_json::{Map, Value};

use crate::sections::{AttachState, ConfigTree, DropdownValues};

/// Immutable name → value lookup that condition expressions resolve against
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    values: Map<String, Value>,
}

impl Context {
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Build the evaluation context for one section or sub-section.
///
/// Later layers shadow earlier ones:
/// 1. the element's own properties as bare names
/// 2. every top-level section under `<sectionId>Config`
/// 3. every nested `*Config` object of a top-level section under its own key
/// 4. the attach map under `attachState`
/// 5. global dropdown values as bare names
#[must_use]
pub fn build_context(
    section_id: &str,
    config: &ConfigTree,
    attach_state: &AttachState,
    dropdowns: &DropdownValues,
) -> Context {
    let mut values = Map::new();

    if let Some(own) = config.element(section_id) {
        values.extend(own.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    for (id, section) in config.sections() {
        values.insert(format!("{id}Config"), section.clone());
        if let Some(properties) = section.as_object() {
            for (key, nested) in properties {
                if key.ends_with("Config") && nested.is_object() {
                    values.insert(key.clone(), nested.clone());
                }
            }
        }
    }

    values.insert("attachState".to_string(), attach_state.to_value());
    values.extend(dropdowns.iter().map(|(k, v)| (k.clone(), v.clone())));

    Context { values }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_context_layers() {
        let config = ConfigTree::from_value(json!({
            "backend": {"enabled": true, "mode": "dev", "workerConfig": {"enabled": true}},
            "frontend": {"enabled": false},
        }))
        .unwrap();
        let attach: AttachState = [("backend", true)].into_iter().collect();
        let mut dropdowns = DropdownValues::new();
        dropdowns.insert("project".to_string(), json!("test"));

        let ctx = build_context("frontend", &config, &attach, &dropdowns);
        assert_eq!(ctx.get("enabled"), Some(&json!(false)));
        assert_eq!(ctx.get("backendConfig").unwrap()["mode"], json!("dev"));
        assert_eq!(ctx.get("workerConfig"), Some(&json!({"enabled": true})));
        assert_eq!(ctx.get("attachState"), Some(&json!({"backend": true})));
        assert_eq!(ctx.get("project"), Some(&json!("test")));
        assert!(!ctx.contains("mode"));
    }

    #[test]
    fn test_sub_section_context_uses_nested_properties() {
        let config = ConfigTree::from_value(json!({
            "backend": {"enabled": true, "workerConfig": {"enabled": false, "replicas": 2}},
        }))
        .unwrap();
        let ctx = build_context(
            "worker",
            &config,
            &AttachState::default(),
            &DropdownValues::new(),
        );
        assert_eq!(ctx.get("enabled"), Some(&json!(false)));
        assert_eq!(ctx.get("replicas"), Some(&json!(2)));
    }
}
