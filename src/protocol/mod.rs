use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, error};

use crate::error::ConvertError;
use crate::model::params::{BackfillParams, DitaBackfillParams, DowngradeParams, ExtractParams, JoinParams};
use crate::parsers::json::{self as json_parser, ExtractOutcome};
use crate::services::segmenter::PunctuationSegmenter;
use crate::services::validation::{StructuralValidator, Validator};
use crate::services::{backfill, dita, downgrade, encoding, join, store};

mod command;
use command::Command;

pub const NOTHING_TO_TRANSLATE: &str = "Nothing to translate.";

fn get_cmd(req: &Value) -> &str {
    req.get("cmd").and_then(|v| v.as_str()).unwrap_or("")
}

fn get_id(req: &Value) -> Value {
    req.get("id").cloned().unwrap_or(Value::Null)
}

fn get_payload(req: &Value) -> &Value {
    static EMPTY: Value = Value::Null;
    req.get("payload").unwrap_or(&EMPTY)
}

fn ok(id: Value, payload: Value) -> String {
    json!({
        "id": id,
        "status": "ok",
        "payload": payload
    })
    .to_string()
}

fn err(id: Value, message: impl Into<String>) -> String {
    json!({
        "id": id,
        "status": "error",
        "message": message.into()
    })
    .to_string()
}

fn empty(id: Value, message: impl Into<String>) -> String {
    json!({
        "id": id,
        "status": "empty",
        "message": message.into()
    })
    .to_string()
}

fn parse_params<T: DeserializeOwned>(payload: &Value) -> Result<T, String> {
    serde_json::from_value(payload.clone()).map_err(|e| format!("invalid payload: {e}"))
}

fn path_from_payload(payload: &Value) -> Result<PathBuf, String> {
    match payload.get("path").and_then(|v| v.as_str()) {
        Some(p) if !p.is_empty() => Ok(PathBuf::from(p)),
        _ => Err("payload.path is required".to_string()),
    }
}

/// Turn a pipeline result into a response line, logging failures.
fn respond<T: Serialize>(id: Value, cmd: &str, result: Result<T, ConvertError>) -> String {
    match result {
        Ok(report) => match serde_json::to_value(report) {
            Ok(payload) => ok(id, payload),
            Err(e) => err(id, e.to_string()),
        },
        Err(e) => {
            error!(cmd, "{e}");
            err(id, e.to_string())
        }
    }
}

pub fn handle(input: &str) -> String {
    let req: Value = match serde_json::from_str(input) {
        Ok(v) => v,
        Err(_) => {
            return json!({
                "status": "error",
                "message": "invalid json"
            })
            .to_string();
        }
    };

    let id = get_id(&req);
    let cmd_str = get_cmd(&req);
    let payload = get_payload(&req);

    match Command::from(cmd_str) {
        Command::Ping => ok(id, json!({ "message": "xliff-core alive" })),

        Command::JsonExtract => {
            let params: ExtractParams = match parse_params(payload) {
                Ok(p) => p,
                Err(e) => return err(id, e),
            };
            match json_parser::extract_file(&params, &PunctuationSegmenter) {
                Ok(ExtractOutcome::Extracted(report)) => respond(id, cmd_str, Ok(report)),
                Ok(ExtractOutcome::NothingToTranslate) => empty(id, NOTHING_TO_TRANSLATE),
                Err(e) => respond::<()>(id, cmd_str, Err(e)),
            }
        }

        Command::JsonBackfill => match parse_params::<BackfillParams>(payload) {
            Ok(params) => respond(id, cmd_str, backfill::backfill_json_file(&params)),
            Err(e) => err(id, e),
        },

        Command::XmlBackfill => match parse_params::<BackfillParams>(payload) {
            Ok(params) => respond(id, cmd_str, backfill::backfill_xml_file(&params)),
            Err(e) => err(id, e),
        },

        Command::DitaBackfill => match parse_params::<DitaBackfillParams>(payload) {
            Ok(params) => respond(
                id,
                cmd_str,
                dita::backfill_dita(
                    Path::new(&params.xliff),
                    Path::new(&params.output_dir),
                    params.encoding.as_deref(),
                ),
            ),
            Err(e) => err(id, e),
        },

        Command::XliffDowngrade => match parse_params::<DowngradeParams>(payload) {
            Ok(params) => respond(id, cmd_str, downgrade::downgrade_file(&params)),
            Err(e) => err(id, e),
        },

        Command::XliffJoin => match parse_params::<JoinParams>(payload) {
            Ok(params) => {
                let files: Vec<PathBuf> = params.files.iter().map(PathBuf::from).collect();
                respond(id, cmd_str, join::join(&files, Path::new(&params.target)))
            }
            Err(e) => err(id, e),
        },

        Command::XliffValidate => match path_from_payload(payload) {
            Ok(path) => respond(
                id,
                cmd_str,
                store::read_document(&path).map(|doc| StructuralValidator.validate(&doc)),
            ),
            Err(e) => err(id, e),
        },

        Command::DetectEncoding => match path_from_payload(payload) {
            Ok(path) => respond(id, cmd_str, encoding::detect_from_file(&path)),
            Err(e) => err(id, e),
        },

        Command::Unknown => err(id, format!("unknown command: {cmd_str}")),
    }
}

/// Run the conversion server: one JSON request per input line, one JSON
/// response per output line, flushed after each so the host can read it.
///
/// Blank lines are skipped. A panic inside a request is answered with
/// `internal core error` and the loop keeps going. Returns the number of
/// requests answered.
pub fn serve<R: BufRead, W: Write>(input: R, mut output: W) -> io::Result<usize> {
    let mut answered = 0;
    for line in input.lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                error!("unreadable request line: {e}");
                continue;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let response = std::panic::catch_unwind(|| handle(&line)).unwrap_or_else(|_| {
            error!("panic while handling request");
            json!({
                "status": "error",
                "message": "internal core error"
            })
            .to_string()
        });

        writeln!(output, "{response}")?;
        output.flush()?;
        answered += 1;
    }
    debug!(answered, "input closed");
    Ok(answered)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Value {
        serde_json::from_str(line).unwrap()
    }

    #[test]
    fn serve_answers_each_request_line() {
        let input = io::Cursor::new("{\"id\":1,\"cmd\":\"ping\"}\n\n   \n{nope\n");
        let mut output = Vec::new();
        assert_eq!(serve(input, &mut output).unwrap(), 2);
        let text = String::from_utf8(output).unwrap();
        let lines: Vec<Value> = text.lines().map(parse).collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["status"], "ok");
        assert_eq!(lines[1]["message"], "invalid json");
    }

    #[test]
    fn ping_answers_ok() {
        let resp = parse(&handle(r#"{"id":1,"cmd":"ping"}"#));
        assert_eq!(resp["status"], "ok");
        assert_eq!(resp["id"], 1);
    }

    #[test]
    fn invalid_json_is_reported() {
        let resp = parse(&handle("{nope"));
        assert_eq!(resp["message"], "invalid json");
    }

    #[test]
    fn unknown_command_is_an_error() {
        let resp = parse(&handle(r#"{"id":"a","cmd":"rebuild_text"}"#));
        assert_eq!(resp["status"], "error");
    }

    #[test]
    fn missing_payload_fields_are_errors() {
        let resp = parse(&handle(r#"{"id":2,"cmd":"xliff.downgrade","payload":{"source":"a.xlf"}}"#));
        assert_eq!(resp["status"], "error");
        assert!(resp["message"].as_str().unwrap().starts_with("invalid payload"));
    }

    #[test]
    fn empty_extraction_has_its_own_status() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("numbers.json");
        std::fs::write(&source, "[1, 2, 3]").unwrap();
        let req = json!({
            "id": 3,
            "cmd": "json.extract",
            "payload": {
                "source": source,
                "xliff": dir.path().join("n.xlf"),
                "skeleton": dir.path().join("n.skl"),
                "srcLang": "en"
            }
        });
        let resp = parse(&handle(&req.to_string()));
        assert_eq!(resp["status"], "empty");
        assert_eq!(resp["message"], NOTHING_TO_TRANSLATE);
    }

    #[test]
    fn io_failures_name_the_path() {
        let resp = parse(&handle(
            r#"{"id":4,"cmd":"xliff.validate","payload":{"path":"/no/such/file.xlf"}}"#,
        ));
        assert_eq!(resp["status"], "error");
        assert!(resp["message"].as_str().unwrap().contains("/no/such/file.xlf"));
    }
}
