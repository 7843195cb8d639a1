use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{json, Value};
use xliff_core::model::params::{BackfillParams, DowngradeParams, ExtractParams};
use xliff_core::parsers::json::{extract_file, ExtractOutcome};
use xliff_core::services::segmenter::PunctuationSegmenter;
use xliff_core::services::{backfill, dita, downgrade, join, store};
use xliff_core::ConvertError;

fn path_str(p: &Path) -> String {
    p.to_string_lossy().into_owned()
}

fn extract_params(dir: &Path, source: &Path, paragraph: bool) -> ExtractParams {
    ExtractParams {
        source: path_str(source),
        xliff: path_str(&dir.join("out.xlf")),
        skeleton: path_str(&dir.join("out.skl")),
        source_language: "en".into(),
        target_language: Some("fr".into()),
        encoding: "UTF-8".into(),
        paragraph,
        config: None,
    }
}

fn round_trip(original: Value, paragraph: bool) -> Value {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("strings.json");
    fs::write(&source, serde_json::to_string_pretty(&original).unwrap()).unwrap();

    let params = extract_params(dir.path(), &source, paragraph);
    let report = match extract_file(&params, &PunctuationSegmenter).unwrap() {
        ExtractOutcome::Extracted(r) => r,
        ExtractOutcome::NothingToTranslate => panic!("expected units"),
    };
    assert!(report.units > 0);
    assert!(report.xliff.exists());
    assert!(report.skeleton.exists());

    let output = dir.path().join("back.json");
    let back = backfill::backfill_json_file(&BackfillParams {
        xliff: params.xliff.clone(),
        output: path_str(&output),
        skeleton: None,
        encoding: None,
    })
    .unwrap();
    assert_eq!(back.replaced, report.units);

    let written = fs::read_to_string(&output).unwrap();
    assert_eq!(written, fs::read_to_string(&source).unwrap());
    serde_json::from_str(&written).unwrap()
}

#[test]
fn untranslated_json_comes_back_unchanged() {
    let original = json!({
        "title": "Welcome home",
        "count": 2,
        "menu": ["Open file", "Save as", " "],
        "nested": {"hint": "Press the button."}
    });
    assert_eq!(round_trip(original.clone(), true), original);
}

#[test]
fn segmented_json_comes_back_unchanged() {
    let original = json!({"body": "First sentence. Second one."});
    assert_eq!(round_trip(original.clone(), false), original);
}

#[test]
fn inline_markup_survives_paragraph_round_trip() {
    let original = json!({
        "a": "Click <b>here</b> now",
        "b": "<br/><br/><br/>",
        "c": "<img src=\"a\"/> <img src=\"b\"/>",
        "d": "<b>Bold text</b>",
        "e": "<i>x</i><i>y</i>",
        "f": "<b></b>"
    });
    assert_eq!(round_trip(original.clone(), true), original);
}

#[test]
fn inline_markup_survives_sentence_round_trip() {
    let original = json!({
        "body": "Hello <b>world</b>. Next <br/> one.",
        "tags": ["<br/><br/>", "<img src=\"a\"/> <img src=\"b\"/>", "<em>Lifted.</em> Tail."]
    });
    assert_eq!(round_trip(original.clone(), false), original);
}

#[test]
fn json_without_text_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("numbers.json");
    fs::write(&source, r#"{"a": 1, "b": [true, null]}"#).unwrap();
    let params = extract_params(dir.path(), &source, false);

    let outcome = extract_file(&params, &PunctuationSegmenter).unwrap();
    assert!(matches!(outcome, ExtractOutcome::NothingToTranslate));
    assert!(!Path::new(&params.xliff).exists());
    assert!(!Path::new(&params.skeleton).exists());
}

fn write(dir: &Path, name: &str, text: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, text).unwrap();
    path
}

fn xliff_12(skeleton: &Path, original: &str, units: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<xliff version="1.2" xmlns="urn:oasis:names:tc:xliff:document:1.2">
  <file original="{original}" source-language="en" target-language="de" datatype="xml">
    <header><skl><external-file href="{}"/></skl></header>
    <body>{units}</body>
  </file>
</xliff>"#,
        skeleton.display()
    )
}

#[test]
fn xml_backfill_uses_targets_and_falls_back_to_source() {
    let dir = tempfile::tempdir().unwrap();
    let skeleton = write(
        dir.path(),
        "doc.skl",
        r#"<?xml version="1.0" encoding="UTF-8"?><doc><p>%%%1%%%</p><p>%%%2%%%</p></doc>"#,
    );
    let xliff = write(
        dir.path(),
        "doc.xlf",
        &xliff_12(
            &skeleton,
            "doc.xml",
            r#"<trans-unit id="1"><source>Hello</source><target>Hallo</target></trans-unit>
<trans-unit id="2"><source>Bye</source></trans-unit>"#,
        ),
    );
    let output = dir.path().join("doc.de.xml");
    let report = backfill::backfill_xml_file(&BackfillParams {
        xliff: path_str(&xliff),
        output: path_str(&output),
        skeleton: None,
        encoding: None,
    })
    .unwrap();
    assert_eq!(report.replaced, 2);

    let doc = store::read_document(&output).unwrap();
    let paragraphs = doc.children_named(doc.root(), "p");
    assert_eq!(doc.text(paragraphs[0]), "Hallo");
    assert_eq!(doc.text(paragraphs[1]), "Bye");
}

#[test]
fn xml_backfill_with_missing_unit_leaves_no_output() {
    let dir = tempfile::tempdir().unwrap();
    let skeleton = write(dir.path(), "doc.skl", "<doc><p>%%%9%%%</p></doc>");
    let xliff = write(
        dir.path(),
        "doc.xlf",
        &xliff_12(&skeleton, "doc.xml", r#"<trans-unit id="1"><source>A</source></trans-unit>"#),
    );
    let output = dir.path().join("doc.out.xml");
    let err = backfill::backfill_xml_file(&BackfillParams {
        xliff: path_str(&xliff),
        output: path_str(&output),
        skeleton: None,
        encoding: None,
    })
    .unwrap_err();
    assert!(matches!(err, ConvertError::UnresolvedUnit(9)));
    assert!(!output.exists());
}

#[test]
fn dita_backfill_writes_cleaned_topics() {
    let dir = tempfile::tempdir().unwrap();
    let skeleton = write(
        dir.path(),
        "topic.skl",
        r#"<?xml version="1.0" encoding="UTF-8"?><topic id="t1" class="- topic/topic " domains="(topic hi-d)"><title>%%%1%%%</title></topic>"#,
    );
    let xliff = write(
        dir.path(),
        "topic.xlf",
        &xliff_12(
            &skeleton,
            "topics/intro.dita",
            r#"<trans-unit id="1"><source>Intro</source><target>Einleitung</target></trans-unit>"#,
        ),
    );
    let out_dir = dir.path().join("out");
    let report = dita::backfill_dita(&xliff, &out_dir, None).unwrap();
    assert_eq!(report.replaced, 1);
    assert_eq!(report.files, vec![out_dir.join("topics/intro.dita")]);

    let topic = store::read_document(&report.files[0]).unwrap();
    let root = topic.root();
    assert_eq!(topic.attr(root, "xml:lang"), Some("de"));
    assert_eq!(topic.attr(root, "class"), None);
    assert_eq!(topic.attr(root, "domains"), None);
    assert_eq!(topic.attr(root, "id"), Some("t1"));
    assert_eq!(topic.text(topic.child(root, "title").unwrap()), "Einleitung");
}

const XLIFF_2: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xliff xmlns="urn:oasis:names:tc:xliff:document:2.0" version="2.0" srcLang="en" trgLang="es">
  <file id="f1" original="guide.xml">
    <unit id="1">
      <segment state="final"><source>Start</source><target>Inicio</target></segment>
    </unit>
    <unit id="2">
      <segment><source>Stop</source></segment>
    </unit>
  </file>
</xliff>"#;

#[test]
fn downgrade_writes_a_12_document() {
    let dir = tempfile::tempdir().unwrap();
    let source = write(dir.path(), "guide.xlf", XLIFF_2);
    let output = dir.path().join("guide.12.xlf");
    let report = downgrade::downgrade_file(&DowngradeParams {
        source: path_str(&source),
        output: path_str(&output),
    })
    .unwrap();
    assert_eq!(report.files, 1);
    assert_eq!(report.units, 2);

    let doc = store::read_document(&output).unwrap();
    let root = doc.root();
    assert_eq!(doc.attr(root, "version"), Some("1.2"));
    let file = doc.child(root, "file").unwrap();
    assert_eq!(doc.attr(file, "source-language"), Some("en"));
    assert_eq!(doc.attr(file, "target-language"), Some("es"));
    let units = doc.children_named(doc.child(file, "body").unwrap(), "trans-unit");
    assert_eq!(units.len(), 2);
    assert_eq!(doc.attr(units[0], "approved"), Some("yes"));
    assert_eq!(doc.text(doc.child(units[0], "target").unwrap()), "Inicio");
    assert!(doc.child(units[1], "target").is_none());
}

#[test]
fn downgrade_rejects_12_input() {
    let dir = tempfile::tempdir().unwrap();
    let skeleton = dir.path().join("x.skl");
    let source = write(dir.path(), "old.xlf", &xliff_12(&skeleton, "x.xml", ""));
    let output = dir.path().join("never.xlf");
    let err = downgrade::downgrade_file(&DowngradeParams {
        source: path_str(&source),
        output: path_str(&output),
    })
    .unwrap_err();
    assert!(matches!(err, ConvertError::UnsupportedVersion(_)));
    assert!(!output.exists());
}

#[test]
fn joined_12_files_keep_relative_originals() {
    let dir = tempfile::tempdir().unwrap();
    let skeleton = dir.path().join("x.skl");
    let a = write(
        dir.path(),
        "a.xlf",
        &xliff_12(&skeleton, "/work/site/en/index.xml", r#"<trans-unit id="1"><source>A</source></trans-unit>"#),
    );
    let b = write(
        dir.path(),
        "b.xlf",
        &xliff_12(&skeleton, "/work/site/en/docs/b.xml", r#"<trans-unit id="1"><source>B</source></trans-unit>"#),
    );
    let output = dir.path().join("all.xlf");
    let report = join::join(&[a, b], &output).unwrap();
    assert_eq!(report.files, 2);
    assert_eq!(report.common_root, "/work/site/en/");

    let doc = store::read_document(&output).unwrap();
    let files = doc.children_named(doc.root(), "file");
    assert_eq!(doc.attr(files[0], "original"), Some("index.xml"));
    assert_eq!(doc.attr(files[1], "original"), Some("docs/b.xml"));
    assert_eq!(doc.attr(doc.root(), "version"), Some("1.2"));
}
