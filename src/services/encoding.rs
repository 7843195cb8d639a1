use std::borrow::Cow;
use std::fs;
use std::path::Path;

use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8};
use serde::Serialize;

use crate::error::{ConvertError, Result};

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];
const UTF16LE_BOM: &[u8] = &[0xFF, 0xFE];
const UTF16BE_BOM: &[u8] = &[0xFE, 0xFF];

#[derive(Debug, Serialize)]
pub struct EncodingCandidate {
    pub name: String,
    pub confidence: f32,
}

#[derive(Debug, Serialize)]
pub struct EncodingDetectionResult {
    pub best: String,
    pub confidence: f32,
    pub bom: bool,
    pub candidates: Vec<EncodingCandidate>,
}

pub fn detect_from_file(path: &Path) -> Result<EncodingDetectionResult> {
    let bytes = fs::read(path).map_err(|e| ConvertError::io(path, e))?;
    Ok(detect(&bytes))
}

pub fn detect(bytes: &[u8]) -> EncodingDetectionResult {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        let name = encoding.name().to_string();
        return EncodingDetectionResult {
            best: name.clone(),
            confidence: 0.99,
            bom: true,
            candidates: vec![EncodingCandidate {
                name,
                confidence: 0.99,
            }],
        };
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);

    let encoding = detector.guess(None, true);
    let best = encoding.name().to_string();
    let confidence = estimate_confidence(bytes, encoding);

    let mut candidates = vec![EncodingCandidate {
        name: best.clone(),
        confidence,
    }];

    // Latin-1 family labels are commonly mixed up in legacy sources.
    if best == "windows-1252" {
        candidates.push(EncodingCandidate {
            name: "ISO-8859-15".into(),
            confidence: (confidence - 0.05).max(0.0),
        });
    } else if best == "UTF-8" && bytes.is_ascii() {
        candidates.push(EncodingCandidate {
            name: "windows-1252".into(),
            confidence: (confidence - 0.20).max(0.0),
        });
    }

    EncodingDetectionResult {
        best,
        confidence,
        bom: false,
        candidates,
    }
}

fn estimate_confidence(bytes: &[u8], encoding: &'static Encoding) -> f32 {
    let (text, _, had_errors) = encoding.decode(bytes);

    if had_errors {
        return 0.35;
    }

    let len = text.len();
    if len < 64 {
        0.55
    } else if len < 512 {
        0.70
    } else if len < 4096 {
        0.82
    } else {
        0.90
    }
}

/// Number of leading bytes taken by a byte-order mark, 0 when there is none.
pub fn bom_length(bytes: &[u8]) -> usize {
    if bytes.starts_with(UTF8_BOM) {
        UTF8_BOM.len()
    } else if bytes.starts_with(UTF16LE_BOM) || bytes.starts_with(UTF16BE_BOM) {
        2
    } else {
        0
    }
}

pub fn encoding_for(label: &str) -> Result<&'static Encoding> {
    Encoding::for_label(label.trim().as_bytes())
        .ok_or_else(|| ConvertError::Config(format!("unknown encoding \"{label}\"")))
}

/// Decode `bytes` with `label`, skipping any BOM. A BOM wins over the label.
pub fn decode(bytes: &[u8], label: &str) -> Result<String> {
    let encoding = match Encoding::for_bom(bytes) {
        Some((bom_encoding, _)) => bom_encoding,
        None => encoding_for(label)?,
    };
    let body = &bytes[bom_length(bytes)..];
    let (text, had_errors) = encoding.decode_without_bom_handling(body);
    if had_errors {
        tracing::warn!(encoding = encoding.name(), "malformed byte sequences replaced while decoding");
    }
    Ok(text.into_owned())
}

/// Encode `text` for output. UTF-16 labels fall back to UTF-8, the only
/// output encoding `encoding_rs` provides for them.
pub fn encode<'a>(text: &'a str, label: &str) -> Result<Cow<'a, [u8]>> {
    let encoding = encoding_for(label)?;
    if encoding == UTF_16LE || encoding == UTF_16BE {
        return Ok(Cow::Borrowed(text.as_bytes()));
    }
    let (bytes, _, had_errors) = encoding.encode(text);
    if had_errors {
        tracing::warn!(
            encoding = encoding.name(),
            "characters not representable in the output encoding were written as numeric references"
        );
    }
    Ok(bytes)
}

pub fn is_utf8(label: &str) -> bool {
    encoding_for(label).map(|e| e == UTF_8).unwrap_or(false)
}
