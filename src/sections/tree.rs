use serde::{Deserialize, Serialize};

/// A sub-section nested one level below a top-level section
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubSectionDefinition {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub test_section: bool,
}

/// A top-level section of the project, independently enabled by the user
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionDefinition {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub test_section: bool,
    #[serde(default)]
    pub sub_sections: Vec<SubSectionDefinition>,
}

/// The static two-level section tree
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(transparent)]
pub struct SectionTree {
    pub sections: Vec<SectionDefinition>,
}

/// The element of the tree a command definition belongs to
#[derive(Debug, Clone, Copy)]
pub enum Owner<'a> {
    Section(&'a SectionDefinition),
    SubSection {
        parent: &'a SectionDefinition,
        sub: &'a SubSectionDefinition,
    },
}

impl<'a> Owner<'a> {
    #[must_use]
    pub fn id(&self) -> &'a str {
        match self {
            Owner::Section(section) => &section.id,
            Owner::SubSection { sub, .. } => &sub.id,
        }
    }

    #[must_use]
    pub fn title(&self) -> &'a str {
        match self {
            Owner::Section(section) => &section.title,
            Owner::SubSection { sub, .. } => &sub.title,
        }
    }

    /// Id of the parent section, for sub-sections only
    #[must_use]
    pub fn parent_id(&self) -> Option<&'a str> {
        match self {
            Owner::Section(_) => None,
            Owner::SubSection { parent, .. } => Some(&parent.id),
        }
    }

    #[must_use]
    pub fn is_sub_section(&self) -> bool {
        matches!(self, Owner::SubSection { .. })
    }

    /// Whether this element is hidden behind the test-section toggle.
    ///
    /// A sub-section inherits the flag from its parent.
    #[must_use]
    pub fn is_test(&self) -> bool {
        match self {
            Owner::Section(section) => section.test_section,
            Owner::SubSection { parent, sub } => parent.test_section || sub.test_section,
        }
    }
}

impl SectionTree {
    #[must_use]
    pub fn new(sections: Vec<SectionDefinition>) -> Self {
        Self { sections }
    }

    /// Find a section or sub-section by id. Top-level sections win on collision.
    #[must_use]
    pub fn find(&self, id: &str) -> Option<Owner<'_>> {
        if let Some(section) = self.sections.iter().find(|s| s.id == id) {
            return Some(Owner::Section(section));
        }
        self.sections.iter().find_map(|parent| {
            parent
                .sub_sections
                .iter()
                .find(|sub| sub.id == id)
                .map(|sub| Owner::SubSection { parent, sub })
        })
    }

    #[must_use]
    pub fn section(&self, id: &str) -> Option<&SectionDefinition> {
        self.sections.iter().find(|s| s.id == id)
    }

    /// Title of a section or sub-section, falling back to the id itself
    #[must_use]
    pub fn title_of<'a>(&'a self, id: &'a str) -> &'a str {
        self.find(id).map_or(id, |owner| owner.title())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> SectionTree {
        SectionTree::new(vec![
            SectionDefinition {
                id: "backend".to_string(),
                title: "Backend".to_string(),
                sub_sections: vec![SubSectionDefinition {
                    id: "worker".to_string(),
                    title: "Worker".to_string(),
                    test_section: false,
                }],
                ..Default::default()
            },
            SectionDefinition {
                id: "e2e".to_string(),
                title: "E2E".to_string(),
                test_section: true,
                sub_sections: vec![SubSectionDefinition {
                    id: "cypress".to_string(),
                    title: "Cypress".to_string(),
                    test_section: false,
                }],
            },
        ])
    }

    #[test]
    fn test_find_sub_section_reports_parent() {
        let tree = tree();
        let owner = tree.find("worker").unwrap();
        assert!(owner.is_sub_section());
        assert_eq!(owner.parent_id(), Some("backend"));
        assert_eq!(owner.title(), "Worker");
    }

    #[test]
    fn test_sub_section_inherits_test_flag() {
        let tree = tree();
        assert!(tree.find("cypress").unwrap().is_test());
        assert!(!tree.find("worker").unwrap().is_test());
    }

    #[test]
    fn test_title_falls_back_to_id() {
        let tree = tree();
        assert_eq!(tree.title_of("backend"), "Backend");
        assert_eq!(tree.title_of("missing"), "missing");
    }
}
