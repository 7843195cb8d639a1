use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub type UnitId = u32;

/// One piece of unit content.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Run {
    Text(String),
    /// Reference into the owning unit's tag table.
    Ph(String),
    /// Marked span; its text is translatable unless `translate` is false.
    Mrk {
        id: String,
        translate: bool,
        text: String,
    },
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TagRole {
    Ph,
    Mrk { translate: bool },
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct PlaceholderTag {
    pub id: String,

    /// Inline markup exactly as it appeared in the source.
    pub raw_text: String,

    pub role: TagRole,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct Note {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub annotates: Option<String>,

    pub text: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct AltTrans {
    #[serde(default)]
    pub match_quality: Option<u32>,

    pub origin: String,

    #[serde(default)]
    pub source: Vec<Run>,

    #[serde(default)]
    pub target: Vec<Run>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct TranslationUnit {
    pub id: UnitId,

    #[serde(default)]
    pub resname: Option<String>,

    #[serde(default)]
    pub source: Vec<Run>,

    #[serde(default)]
    pub target: Option<Vec<Run>>,

    #[serde(default)]
    pub tags: BTreeMap<String, PlaceholderTag>,

    #[serde(default)]
    pub approved: Option<bool>,

    #[serde(default)]
    pub preserve_space: bool,

    #[serde(default)]
    pub notes: Vec<Note>,

    #[serde(default)]
    pub matches: Vec<AltTrans>,
}

impl TranslationUnit {
    pub fn new(id: UnitId) -> Self {
        TranslationUnit {
            id,
            ..Default::default()
        }
    }

    /// Content to publish: the target when it has real text, otherwise the source.
    pub fn effective_runs(&self) -> &[Run] {
        match &self.target {
            Some(t) if !runs_blank(t) => t,
            _ => &self.source,
        }
    }

    /// Render runs as plain text with placeholders expanded to their raw markup.
    pub fn render(&self, runs: &[Run]) -> String {
        let mut out = String::new();
        for run in runs {
            match run {
                Run::Text(t) => out.push_str(t),
                Run::Ph(id) => {
                    if let Some(tag) = self.tags.get(id) {
                        out.push_str(&tag.raw_text);
                    }
                }
                Run::Mrk { text, .. } => out.push_str(text),
            }
        }
        out
    }

    pub fn raw_tag(&self, id: &str) -> Option<&str> {
        self.tags.get(id).map(|t| t.raw_text.as_str())
    }
}

pub fn runs_blank(runs: &[Run]) -> bool {
    runs.iter().all(|r| match r {
        Run::Text(t) => t.trim().is_empty(),
        _ => false,
    })
}
