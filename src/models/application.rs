use serde::{Deserialize, Serialize};

/// A hosted application as published by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    /// Missing names deserialize to empty and are rejected at rule-build time.
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groups: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Application {
    pub fn new(name: impl Into<String>, groups: Vec<String>) -> Self {
        Self {
            name: name.into(),
            groups: Some(groups),
            display_name: None,
            description: None,
        }
    }

    /// Trims the name so rule paths and `/app/:name` lookups agree.
    pub fn normalized(mut self) -> Self {
        let trimmed = self.name.trim();
        if trimmed.len() != self.name.len() {
            self.name = trimmed.to_string();
        }
        self
    }

    pub fn is_restricted(&self) -> bool {
        self.groups.as_ref().is_some_and(|g| !g.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_may_be_absent_or_null() {
        let apps: Vec<Application> = serde_json::from_str(
            r#"[{"name":"a"},{"name":"b","groups":null},{"name":"c","groups":["x"]}]"#,
        )
        .unwrap();
        assert!(!apps[0].is_restricted());
        assert!(!apps[1].is_restricted());
        assert!(apps[2].is_restricted());
    }

    #[test]
    fn normalized_trims_name_only() {
        let app = Application::new("  calc\t", vec![" analyst ".to_string()]).normalized();
        assert_eq!(app.name, "calc");
        assert_eq!(app.groups, Some(vec![" analyst ".to_string()]));
    }

    #[test]
    fn missing_name_deserializes_empty() {
        let app: Application = serde_json::from_str(r#"{"groups":["x"]}"#).unwrap();
        assert!(app.name.is_empty());
    }
}
