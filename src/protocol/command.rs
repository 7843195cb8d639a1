#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Ping,
    JsonExtract,
    JsonBackfill,
    XmlBackfill,
    DitaBackfill,
    XliffDowngrade,
    XliffJoin,
    XliffValidate,
    DetectEncoding,
    Unknown,
}

impl From<&str> for Command {
    fn from(s: &str) -> Self {
        match s {
            "ping" => Command::Ping,
            "json.extract" => Command::JsonExtract,
            "json.backfill" => Command::JsonBackfill,
            "xml.backfill" => Command::XmlBackfill,
            "dita.backfill" => Command::DitaBackfill,
            "xliff.downgrade" => Command::XliffDowngrade,
            "xliff.join" => Command::XliffJoin,
            "xliff.validate" => Command::XliffValidate,
            "encoding.detect" | "detect_encoding" => Command::DetectEncoding,
            _ => Command::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_map_to_commands() {
        assert_eq!(Command::from("json.extract"), Command::JsonExtract);
        assert_eq!(Command::from("detect_encoding"), Command::DetectEncoding);
        assert_eq!(Command::from("project.open"), Command::Unknown);
    }
}
