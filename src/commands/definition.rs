use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::condition::EvalInputs;

/// What a modifier does to the command assembled so far
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ModifierAction {
    Append(String),
    Replace(String),
}

/// A conditional edit applied in declaration order
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Modifier {
    pub condition: String,
    #[serde(flatten)]
    pub action: ModifierAction,
}

/// Text appended when `condition` holds (excludes and tab title appends)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ConditionalAppend {
    pub condition: String,
    pub append: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum TabTitle {
    Literal(String),
    #[serde(rename_all = "camelCase")]
    Conditional {
        base: String,
        #[serde(default)]
        conditional_appends: Vec<ConditionalAppend>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ContainerRef {
    Name(String),
    Conditional { name: String, condition: String },
}

/// One command fragment added around the original command on refresh
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RefreshStep {
    pub command: String,
    #[serde(default)]
    pub condition: Option<String>,
}

/// Commands wrapped around a terminal's original command when it is refreshed
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshConfig {
    #[serde(default)]
    pub prepend_commands: Vec<RefreshStep>,
    #[serde(default)]
    pub append_commands: Vec<RefreshStep>,
}

impl RefreshConfig {
    /// Wrap `original` with every prepend/append step whose condition holds.
    ///
    /// Steps are concatenated as written, without separators.
    #[must_use]
    pub fn wrap(&self, original: &str, inputs: &EvalInputs<'_>, section_id: &str) -> String {
        let holding = |steps: &[RefreshStep]| -> String {
            steps
                .iter()
                .filter(|step| inputs.holds(step.condition.as_deref(), section_id))
                .map(|step| step.command.as_str())
                .collect()
        };
        let mut wrapped = holding(&self.prepend_commands);
        wrapped.push_str(original);
        wrapped.push_str(&holding(&self.append_commands));
        wrapped
    }
}

/// The template a command string is assembled from
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandTemplate {
    pub base: String,
    #[serde(default)]
    pub modifiers: Vec<Modifier>,
    #[serde(default)]
    pub post_modifiers: String,
    #[serde(default)]
    pub excludes: Vec<ConditionalAppend>,
    #[serde(default)]
    pub final_append: String,
    #[serde(default)]
    pub prefix: String,
    #[serde(default)]
    pub tab_title: Option<TabTitle>,
    #[serde(default)]
    pub associated_containers: Vec<ContainerRef>,
    #[serde(default)]
    pub refresh_config: Option<RefreshConfig>,
}

/// A catalogue entry: when `conditions` all match, `command` is generated for `section_id`
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandDefinition {
    #[serde(default)]
    pub id: Option<String>,
    pub section_id: String,
    /// Keys are bare property names or `object.property` paths
    #[serde(default)]
    pub conditions: BTreeMap<String, Value>,
    pub command: CommandTemplate,
}

impl CommandDefinition {
    /// The definition id, or `<sectionId>-<index>` when the catalogue omits it
    #[must_use]
    pub fn resolved_id(&self, index: usize) -> String {
        self.id
            .clone()
            .unwrap_or_else(|| format!("{}-{index}", self.section_id))
    }
}
