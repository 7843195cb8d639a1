use tracing::debug;

use crate::error::{ConvertError, Result};
use crate::model::unit::{runs_blank, Note, TranslationUnit, UnitId};
use crate::services::placeholder::{self, Protected};
use crate::services::segmenter::Segmenter;

pub const MARKER: &str = "%%%";

pub fn marker(id: UnitId) -> String {
    format!("{MARKER}{id}{MARKER}")
}

/// Per-run state: the unit id counter and the units emitted so far.
#[derive(Debug, Default)]
pub struct RunContext {
    next_id: UnitId,
    units: Vec<TranslationUnit>,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&mut self) -> UnitId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn units(&self) -> &[TranslationUnit] {
        &self.units
    }

    pub fn into_units(self) -> Vec<TranslationUnit> {
        self.units
    }
}

/// Extra data a configured field contributes to its unit.
#[derive(Debug, Default)]
pub struct UnitExtras<'a> {
    pub target: Option<&'a str>,
    pub resname: Option<&'a str>,
    pub notes: Vec<String>,
}

pub struct SegmentBuilder<'a> {
    ctx: RunContext,
    segmenter: Option<&'a dyn Segmenter>,
    language: String,
}

impl<'a> SegmentBuilder<'a> {
    /// `segmenter: None` selects whole-paragraph mode.
    pub fn new(segmenter: Option<&'a dyn Segmenter>) -> Self {
        SegmentBuilder {
            ctx: RunContext::new(),
            segmenter,
            language: String::new(),
        }
    }

    /// Source language handed to the segmenter.
    pub fn with_language(mut self, language: &str) -> Self {
        self.language = language.to_string();
        self
    }

    pub fn context(&self) -> &RunContext {
        &self.ctx
    }

    pub fn finish(self) -> RunContext {
        self.ctx
    }

    /// Add `text` in the configured mode and return its skeleton replacement.
    pub fn add_text(&mut self, text: &str) -> String {
        match self.segmenter {
            Some(_) => self.add_sentence_segmented(text),
            None => self.add_paragraph(text),
        }
    }

    /// Text left blank once wrapper tags are lifted makes no unit and goes
    /// back to the skeleton unchanged.
    pub fn add_paragraph(&mut self, text: &str) -> String {
        let protected = placeholder::protect(text);
        if runs_blank(&protected.runs) {
            debug!(text, "no translatable text after lifting tags");
            return text.to_string();
        }
        let id = self.ctx.allocate();
        let unit = unit_from(id, &protected);
        self.ctx.units.push(unit);
        decorate(id, &protected)
    }

    pub fn add_sentence_segmented(&mut self, text: &str) -> String {
        let spans = match self.segmenter {
            Some(s) => s.segment(text, &self.language),
            None => vec![text.to_string()],
        };
        debug!(spans = spans.len(), language = %self.language, "segmented text");
        spans.iter().map(|span| self.add_paragraph(span)).collect()
    }

    /// Add one configured field as a single unit with its target, id and notes.
    ///
    /// `None` when the source has no translatable text.
    pub fn add_unit(&mut self, source: &str, extras: UnitExtras<'_>) -> Result<Option<String>> {
        if let Some(name) = extras.resname.filter(|n| !n.is_empty()) {
            validate_id(name)?;
        }
        let protected = placeholder::protect(source);
        if runs_blank(&protected.runs) {
            debug!(source, "configured field has no translatable text");
            return Ok(None);
        }
        let id = self.ctx.allocate();
        let mut unit = unit_from(id, &protected);
        unit.resname = extras.resname.filter(|n| !n.is_empty()).map(str::to_string);
        unit.target = extras
            .target
            .filter(|t| !t.is_empty())
            .map(|t| placeholder::protect_target(t, &protected));
        unit.notes = extras
            .notes
            .into_iter()
            .map(|text| Note {
                text,
                ..Default::default()
            })
            .collect();
        self.ctx.units.push(unit);
        Ok(Some(decorate(id, &protected)))
    }
}

fn unit_from(id: UnitId, protected: &Protected) -> TranslationUnit {
    TranslationUnit {
        id,
        source: protected.runs.clone(),
        tags: protected.tags.clone(),
        preserve_space: protected.preserve_space,
        ..TranslationUnit::new(id)
    }
}

fn decorate(id: UnitId, protected: &Protected) -> String {
    format!("{}{}{}", protected.start, marker(id), protected.end)
}

/// Check an identifier against the XML `Name` production.
pub fn validate_id(id: &str) -> Result<()> {
    let mut chars = id.chars();
    let first = chars.next().ok_or_else(|| ConvertError::InvalidUnitId {
        id: id.to_string(),
        reason: "empty identifier".into(),
    })?;
    if !is_name_start_char(first) {
        return Err(ConvertError::InvalidUnitId {
            id: id.to_string(),
            reason: format!("invalid initial character '{first}'"),
        });
    }
    if let Some(bad) = chars.find(|&c| !is_name_char(c)) {
        return Err(ConvertError::InvalidUnitId {
            id: id.to_string(),
            reason: format!("invalid character '{bad}'"),
        });
    }
    Ok(())
}

fn is_name_start_char(c: char) -> bool {
    matches!(c,
        ':' | '_' | 'A'..='Z' | 'a'..='z'
        | '\u{C0}'..='\u{D6}'
        | '\u{D8}'..='\u{F6}'
        | '\u{F8}'..='\u{2FF}'
        | '\u{370}'..='\u{37D}'
        | '\u{37F}'..='\u{1FFF}'
        | '\u{200C}'..='\u{200D}'
        | '\u{2070}'..='\u{218F}'
        | '\u{2C00}'..='\u{2FEF}'
        | '\u{3001}'..='\u{D7FF}'
        | '\u{F900}'..='\u{FDCF}'
        | '\u{FDF0}'..='\u{FFFD}'
        | '\u{10000}'..='\u{EFFFF}')
}

fn is_name_char(c: char) -> bool {
    is_name_start_char(c)
        || matches!(c,
            '-' | '.' | '0'..='9' | '\u{B7}'
            | '\u{300}'..='\u{36F}'
            | '\u{203F}'..='\u{2040}')
}
