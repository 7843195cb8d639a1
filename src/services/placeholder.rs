//! Inline markup protection.
//!
//! Tags found in a translatable string are swapped for numbered `ph`
//! references; the raw tag text goes into a side table so it can be put back
//! byte-for-byte at merge time.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::model::unit::{PlaceholderTag, Run, TagRole};

static TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<[A-Za-z0-9]+(?:\s[A-Za-z\-.]+=["'][^<&>]*["'])*\s*/?>|</[A-Za-z0-9]+>"#)
        .expect("tag pattern is valid")
});

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Protected {
    pub runs: Vec<Run>,
    pub tags: BTreeMap<String, PlaceholderTag>,

    /// Tag lifted from the start of the run; stays in the skeleton.
    pub start: String,

    /// Tag lifted from the end of the run; stays in the skeleton.
    pub end: String,

    /// No markup was found, so the text was kept verbatim.
    pub preserve_space: bool,
}

pub fn normalize(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").into_owned()
}

pub fn has_markup(text: &str) -> bool {
    TAG.is_match(text)
}

/// Split `text` into text runs and placeholders, lifting wrapper tags.
pub fn protect(text: &str) -> Protected {
    let normalized = normalize(text);
    if !TAG.is_match(&normalized) {
        let runs = if text.is_empty() {
            Vec::new()
        } else {
            vec![Run::Text(text.to_string())]
        };
        return Protected {
            runs,
            preserve_space: true,
            ..Default::default()
        };
    }

    let mut protected = scan(&normalized);
    lift_wrappers(&mut protected);
    protected
}

fn scan(normalized: &str) -> Protected {
    let mut out = Protected::default();
    let mut last = 0;
    for (count, m) in TAG.find_iter(normalized).enumerate() {
        if m.start() > last {
            out.runs.push(Run::Text(normalized[last..m.start()].to_string()));
        }
        let id = count.to_string();
        out.tags.insert(
            id.clone(),
            PlaceholderTag {
                id: id.clone(),
                raw_text: m.as_str().to_string(),
                role: TagRole::Ph,
            },
        );
        out.runs.push(Run::Ph(id));
        last = m.end();
    }
    if last < normalized.len() {
        out.runs.push(Run::Text(normalized[last..].to_string()));
    }
    out
}

fn lift_wrappers(p: &mut Protected) {
    let tag_count = p.runs.iter().filter(|r| matches!(r, Run::Ph(_))).count();
    match tag_count {
        1 => {
            if let Some(Run::Ph(id)) = p.runs.first().cloned() {
                p.start = take_tag(p, &id);
                p.runs.remove(0);
            }
            if let Some(Run::Ph(id)) = p.runs.last().cloned() {
                p.end = take_tag(p, &id);
                p.runs.pop();
            }
        }
        2 => {
            let first = p.runs.first().cloned();
            let last = p.runs.last().cloned();
            if let (Some(Run::Ph(a)), Some(Run::Ph(b))) = (first, last) {
                p.start = take_tag(p, &a);
                p.end = take_tag(p, &b);
                p.runs.remove(0);
                p.runs.pop();
            }
        }
        _ => {}
    }
    if !p.start.is_empty() || !p.end.is_empty() {
        debug!(start = %p.start, end = %p.end, "lifted wrapper tags out of unit");
    }
}

fn take_tag(p: &mut Protected, id: &str) -> String {
    p.tags.remove(id).map(|t| t.raw_text).unwrap_or_default()
}

/// Protect a target string against the tag table of its source.
///
/// Tags are matched to source placeholders by raw text, first unused match
/// wins; tags with no source counterpart stay literal text. Decorations lifted
/// from the source are stripped from the target ends when present.
pub fn protect_target(text: &str, source: &Protected) -> Vec<Run> {
    let mut body = text;
    if !source.start.is_empty() {
        body = body.strip_prefix(source.start.as_str()).unwrap_or(body);
    }
    if !source.end.is_empty() {
        body = body.strip_suffix(source.end.as_str()).unwrap_or(body);
    }
    if source.preserve_space || !TAG.is_match(&normalize(body)) {
        return if body.is_empty() {
            Vec::new()
        } else {
            vec![Run::Text(body.to_string())]
        };
    }

    let scanned = scan(&normalize(body));
    let mut used: Vec<&str> = Vec::new();
    let mut runs: Vec<Run> = Vec::new();
    for run in scanned.runs {
        let resolved = match run {
            Run::Ph(local) => {
                let raw = scanned.tags.get(&local).map(|t| t.raw_text.clone()).unwrap_or_default();
                let matched = source
                    .tags
                    .values()
                    .find(|t| t.raw_text == raw && !used.contains(&t.id.as_str()));
                match matched {
                    Some(t) => {
                        used.push(t.id.as_str());
                        Run::Ph(t.id.clone())
                    }
                    None => Run::Text(raw),
                }
            }
            other => other,
        };
        match (runs.last_mut(), resolved) {
            (Some(Run::Text(prev)), Run::Text(t)) => prev.push_str(&t),
            (_, r) => runs.push(r),
        }
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ph(id: &str) -> Run {
        Run::Ph(id.to_string())
    }

    fn text(t: &str) -> Run {
        Run::Text(t.to_string())
    }

    #[test]
    fn plain_text_is_kept_verbatim() {
        let p = protect("Hello\n   world");
        assert_eq!(p.runs, vec![text("Hello\n   world")]);
        assert!(p.preserve_space);
        assert!(p.tags.is_empty());
    }

    #[test]
    fn inner_tags_become_placeholders_in_order() {
        let p = protect("Click <b>here</b> or <i>there</i> now");
        assert_eq!(
            p.runs,
            vec![
                text("Click "),
                ph("0"),
                text("here"),
                ph("1"),
                text(" or "),
                ph("2"),
                text("there"),
                ph("3"),
                text(" now"),
            ]
        );
        assert_eq!(p.tags["1"].raw_text, "</b>");
        assert!(!p.preserve_space);
        assert!(p.start.is_empty() && p.end.is_empty());
    }

    #[test]
    fn markup_forces_whitespace_normalization() {
        let p = protect("a\n\n  <br/>   b");
        assert_eq!(p.runs, vec![text("a "), ph("0"), text(" b")]);
    }

    #[test]
    fn wrapping_pair_is_lifted() {
        let p = protect("<b>Bold text</b>");
        assert_eq!(p.start, "<b>");
        assert_eq!(p.end, "</b>");
        assert_eq!(p.runs, vec![text("Bold text")]);
        assert!(p.tags.is_empty());
    }

    #[test]
    fn single_leading_tag_is_lifted() {
        let p = protect("<br/>Next line");
        assert_eq!(p.start, "<br/>");
        assert_eq!(p.end, "");
        assert_eq!(p.runs, vec![text("Next line")]);
    }

    #[test]
    fn single_trailing_tag_is_lifted() {
        let p = protect("Line end<br/>");
        assert_eq!(p.end, "<br/>");
        assert_eq!(p.runs, vec![text("Line end")]);
    }

    #[test]
    fn pair_not_at_both_ends_stays_inline() {
        let p = protect("<b>Bold</b> tail");
        assert!(p.start.is_empty());
        assert_eq!(p.runs.len(), 4);
    }

    #[test]
    fn attributes_are_part_of_the_tag() {
        let p = protect("See <a href=\"x.html\" class='k'>link</a> here");
        assert_eq!(p.tags["0"].raw_text, "<a href=\"x.html\" class='k'>");
    }

    #[test]
    fn target_reuses_source_ids_by_raw_text() {
        let source = protect("Click <b>here</b> now");
        let runs = protect_target("Cliquez <b>ici</b> <u>x</u>", &source);
        assert_eq!(
            runs,
            vec![
                text("Cliquez "),
                ph("0"),
                text("ici"),
                ph("1"),
                text(" <u>x</u>"),
            ]
        );
    }

    #[test]
    fn target_drops_lifted_decoration() {
        let source = protect("<b>Hello</b>");
        assert_eq!(protect_target("<b>Bonjour</b>", &source), vec![text("Bonjour")]);
    }
}
