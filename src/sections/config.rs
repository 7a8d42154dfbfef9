use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::tree::Owner;

/// Global dropdown selections, keyed by dropdown name
pub type DropdownValues = Map<String, Value>;

/// Key under which a sub-section's config is stored inside its parent
#[must_use]
pub fn sub_config_key(sub_id: &str) -> String {
    format!("{sub_id}Config")
}

/// Whether a section or sub-section config object has `enabled: true`
#[must_use]
pub fn is_enabled(config: &Map<String, Value>) -> bool {
    config
        .get("enabled")
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

/// The user-editable configuration tree, keyed by top-level section id.
///
/// Each section maps to an object of arbitrary properties (`enabled`, `mode`,
/// `deploymentType`, dropdown values, ...). Sub-section configs are nested
/// objects under the parent's `<subId>Config` key.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct ConfigTree {
    sections: Map<String, Value>,
}

impl From<Map<String, Value>> for ConfigTree {
    fn from(sections: Map<String, Value>) -> Self {
        Self { sections }
    }
}

impl ConfigTree {
    /// Build a tree from a JSON value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not an object.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    #[must_use]
    pub fn sections(&self) -> &Map<String, Value> {
        &self.sections
    }

    #[must_use]
    pub fn section(&self, id: &str) -> Option<&Map<String, Value>> {
        self.sections.get(id).and_then(Value::as_object)
    }

    #[must_use]
    pub fn sub_section(&self, parent_id: &str, sub_id: &str) -> Option<&Map<String, Value>> {
        self.section(parent_id)?
            .get(&sub_config_key(sub_id))
            .and_then(Value::as_object)
    }

    /// Config object of a tree element
    #[must_use]
    pub fn owner_config(&self, owner: &Owner<'_>) -> Option<&Map<String, Value>> {
        match owner {
            Owner::Section(section) => self.section(&section.id),
            Owner::SubSection { parent, sub } => self.sub_section(&parent.id, &sub.id),
        }
    }

    /// Config object for an id that may name either a section or a sub-section.
    ///
    /// Sub-sections are located by scanning every section for a nested
    /// `<id>Config` object.
    #[must_use]
    pub fn element(&self, id: &str) -> Option<&Map<String, Value>> {
        self.section(id).or_else(|| self.find_nested(&sub_config_key(id)))
    }

    /// Find the nested object stored under `key` in whichever top-level section holds it
    #[must_use]
    pub fn find_nested(&self, key: &str) -> Option<&Map<String, Value>> {
        self.sections
            .values()
            .filter_map(Value::as_object)
            .find_map(|section| section.get(key).and_then(Value::as_object))
    }
}

/// Per-section debugger attach toggles, independent of `enabled`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttachState {
    attached: BTreeMap<String, bool>,
    warnings: BTreeMap<String, bool>,
}

impl AttachState {
    #[must_use]
    pub fn new(attached: BTreeMap<String, bool>, warnings: BTreeMap<String, bool>) -> Self {
        Self { attached, warnings }
    }

    /// Missing sections are not attached
    #[must_use]
    pub fn is_attached(&self, section_id: &str) -> bool {
        self.attached.get(section_id).copied().unwrap_or(false)
    }

    #[must_use]
    pub fn has_warning(&self, section_id: &str) -> bool {
        self.warnings.get(section_id).copied().unwrap_or(false)
    }

    #[must_use]
    pub fn attached(&self) -> &BTreeMap<String, bool> {
        &self.attached
    }

    /// The attach map as a JSON object, as exposed to condition expressions
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::Object(
            self.attached
                .iter()
                .map(|(k, v)| (k.clone(), Value::Bool(*v)))
                .collect(),
        )
    }
}

impl<S: Into<String>> FromIterator<(S, bool)> for AttachState {
    fn from_iter<I: IntoIterator<Item = (S, bool)>>(iter: I) -> Self {
        Self {
            attached: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            warnings: BTreeMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_element_finds_nested_sub_section() {
        let config = ConfigTree::from_value(json!({
            "backend": {"enabled": true, "workerConfig": {"enabled": false, "mode": "dev"}}
        }))
        .unwrap();
        let worker = config.element("worker").unwrap();
        assert_eq!(worker.get("mode"), Some(&json!("dev")));
        assert!(!is_enabled(worker));
        assert!(is_enabled(config.element("backend").unwrap()));
    }

    #[test]
    fn test_attach_state_defaults_to_detached() {
        let attach: AttachState = [("a", true)].into_iter().collect();
        assert!(attach.is_attached("a"));
        assert!(!attach.is_attached("b"));
        assert_eq!(attach.to_value(), json!({"a": true}));
    }
}
