use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConvertError, Result};

/// Field mapping for one translatable key of a JSON object.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FieldMapping {
    pub source_key: String,

    #[serde(default)]
    pub target_key: Option<String>,

    #[serde(default)]
    pub id_key: Option<String>,

    #[serde(default)]
    pub note_key: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct JsonConfig {
    #[serde(default)]
    pub translatable: Vec<FieldMapping>,

    #[serde(default)]
    pub ignorable: Vec<String>,
}

impl JsonConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path).map_err(|e| ConvertError::io(path, e))?;
        let config: JsonConfig = serde_json::from_str(&data)
            .map_err(|e| ConvertError::Config(format!("{}: {e}", path.display())))?;
        config.check()?;
        Ok(config)
    }

    fn check(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for m in &self.translatable {
            if m.source_key.is_empty() {
                return Err(ConvertError::Config("empty sourceKey".into()));
            }
            if !seen.insert(m.source_key.as_str()) {
                return Err(ConvertError::Config(format!(
                    "source key \"{}\" configured twice",
                    m.source_key
                )));
            }
        }
        Ok(())
    }

    pub fn is_ignorable(&self, key: &str) -> bool {
        self.ignorable.iter().any(|k| k == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_camel_case_mapping() {
        let config: JsonConfig = serde_json::from_str(
            r#"{"translatable":[{"sourceKey":"en","targetKey":"fr","idKey":"key","noteKey":"comment"}],"ignorable":["meta"]}"#,
        )
        .unwrap();
        assert_eq!(config.translatable[0].target_key.as_deref(), Some("fr"));
        assert!(config.is_ignorable("meta"));
        assert!(config.check().is_ok());
    }

    #[test]
    fn duplicate_source_key_is_rejected() {
        let config: JsonConfig = serde_json::from_str(
            r#"{"translatable":[{"sourceKey":"en"},{"sourceKey":"en"}]}"#,
        )
        .unwrap();
        assert!(matches!(config.check(), Err(ConvertError::Config(_))));
    }
}
