//! File reads and atomic writes shared by every pipeline.

use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::bytes::Regex;
use tracing::warn;

use crate::error::{ConvertError, Result};
use crate::services::encoding;
use crate::xml::{self, Document};

static DECLARED_ENCODING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^<\?xml[^>]*\sencoding\s*=\s*["']([A-Za-z0-9._\-]+)["']"#)
        .expect("declaration pattern is valid")
});

/// Write `bytes` to `<path>.tmp`, then move it over `path`.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = tmp_path(path);

    if let Some(parent) = tmp.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| ConvertError::io(parent, e))?;
    }

    if let Err(e) = fs::write(&tmp, bytes) {
        discard(&tmp);
        return Err(ConvertError::io(&tmp, e));
    }

    if path.exists() {
        fs::remove_file(path).map_err(|e| ConvertError::io(path, e))?;
    }

    fs::rename(&tmp, path).map_err(|e| {
        discard(&tmp);
        ConvertError::io(path, e)
    })
}

/// Write two outputs of one run; the first is removed again if the second fails.
pub fn write_pair(first: (&Path, &[u8]), second: (&Path, &[u8])) -> Result<()> {
    write_atomic(first.0, first.1)?;
    if let Err(e) = write_atomic(second.0, second.1) {
        discard(first.0);
        return Err(e);
    }
    Ok(())
}

pub fn tmp_path(path: &Path) -> PathBuf {
    let mut p = path.to_path_buf();
    let file_name = match path.file_name().and_then(|s| s.to_str()) {
        Some(n) => n.to_string(),
        None => "output".to_string(),
    };
    p.set_file_name(format!("{file_name}.tmp"));
    p
}

fn discard(path: &Path) {
    if path.exists() {
        if let Err(e) = fs::remove_file(path) {
            warn!(path = %path.display(), "failed to remove partial output: {e}");
        }
    }
}

pub fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| ConvertError::io(path, e))
}

pub fn read_text(path: &Path, label: &str) -> Result<String> {
    encoding::decode(&read_bytes(path)?, label)
}

/// Read and parse an XML file, honouring a BOM or the declared encoding.
pub fn read_document(path: &Path) -> Result<Document> {
    let bytes = read_bytes(path)?;
    let label = declared_encoding(&bytes[encoding::bom_length(&bytes)..]).unwrap_or("UTF-8");
    let text = encoding::decode(&bytes, label)?;
    xml::parse(&text).map_err(|e| match e {
        ConvertError::Xml { message, .. } => ConvertError::xml(path.display().to_string(), message),
        other => other,
    })
}

fn declared_encoding(bytes: &[u8]) -> Option<&str> {
    let head = &bytes[..bytes.len().min(256)];
    let caps = DECLARED_ENCODING.captures(head)?;
    std::str::from_utf8(caps.get(1)?.as_bytes()).ok()
}

/// Serialize `doc` and write it atomically in `label`, keeping the declaration in step.
pub fn write_document(path: &Path, doc: &mut Document, label: &str) -> Result<()> {
    let label = if encoding::is_utf8(label) { "UTF-8" } else { label };
    if doc.declaration().is_some() || label != "UTF-8" {
        doc.set_declared_encoding(label);
    }
    let text = doc.to_xml_string();
    let bytes = encoding::encode(&text, label)?;
    write_atomic(path, &bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tmp_path_sits_beside_target() {
        assert_eq!(tmp_path(Path::new("/a/b/out.xlf")), PathBuf::from("/a/b/out.xlf.tmp"));
    }

    #[test]
    fn atomic_write_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.txt");
        write_atomic(&path, b"one").unwrap();
        write_atomic(&path, b"two").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"two");
        assert!(!tmp_path(&path).exists());
    }

    #[test]
    fn failed_second_write_removes_first() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("a.skl");
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"file").unwrap();
        let second = blocker.join("b.xlf");

        let err = write_pair((&first, b"skeleton"), (&second, b"xliff")).unwrap_err();
        assert!(matches!(err, ConvertError::Io { .. }));
        assert!(!first.exists());
    }

    #[test]
    fn declared_encoding_drives_decoding() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latin.xml");
        fs::write(&path, b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?><p>caf\xE9</p>").unwrap();
        let doc = read_document(&path).unwrap();
        assert_eq!(doc.text(doc.root()), "café");
    }

    #[test]
    fn missing_file_error_names_path() {
        let err = read_bytes(Path::new("/definitely/not/here.xlf")).unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.xlf"));
    }
}
