use serde::{Deserialize, Serialize};

fn default_encoding() -> String {
    "UTF-8".to_string()
}

/// Inputs of a JSON extraction run.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ExtractParams {
    pub source: String,

    pub xliff: String,

    pub skeleton: String,

    #[serde(alias = "srcLang")]
    pub source_language: String,

    #[serde(default, alias = "tgtLang")]
    pub target_language: Option<String>,

    #[serde(default = "default_encoding", alias = "srcEncoding")]
    pub encoding: String,

    /// Whole-paragraph units instead of sentence segmentation.
    #[serde(default)]
    pub paragraph: bool,

    /// Path of a JSON extraction configuration.
    #[serde(default)]
    pub config: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct BackfillParams {
    pub xliff: String,

    #[serde(alias = "backfile")]
    pub output: String,

    /// Overrides the skeleton referenced by the XLIFF header.
    #[serde(default)]
    pub skeleton: Option<String>,

    /// Output encoding; falls back to the one recorded at extraction, then UTF-8.
    #[serde(default)]
    pub encoding: Option<String>,
}

/// Inputs of a DITA merge: one XLIFF, possibly joined, and an output folder.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct DitaBackfillParams {
    pub xliff: String,

    #[serde(alias = "outputDir")]
    pub output_dir: String,

    #[serde(default)]
    pub encoding: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct DowngradeParams {
    pub source: String,

    pub output: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct JoinParams {
    pub files: Vec<String>,

    pub target: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_params_accept_toolchain_aliases() {
        let p: ExtractParams = serde_json::from_value(serde_json::json!({
            "source": "a.json",
            "xliff": "a.xlf",
            "skeleton": "a.skl",
            "srcLang": "en",
            "tgtLang": "fr",
            "srcEncoding": "ISO-8859-1"
        }))
        .unwrap();
        assert_eq!(p.source_language, "en");
        assert_eq!(p.target_language.as_deref(), Some("fr"));
        assert_eq!(p.encoding, "ISO-8859-1");
        assert!(!p.paragraph);
    }

    #[test]
    fn backfill_params_accept_backfile_alias() {
        let p: BackfillParams =
            serde_json::from_value(serde_json::json!({"xliff": "a.xlf", "backfile": "out.json"}))
                .unwrap();
        assert_eq!(p.output, "out.json");
        assert_eq!(p.encoding, None);
    }
}
