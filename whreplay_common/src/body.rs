//! Body pretty-printing

use serde::Serialize;

/// A body ready for display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedBody {
    pub text: String,
    pub is_json: bool,
}

/// Pretty-print JSON bodies with four-space indentation, pass anything else through
pub fn format_body(raw: &str) -> FormattedBody {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(value) => match to_pretty(&value) {
            Some(text) => FormattedBody { text, is_json: true },
            None => plain(raw),
        },
        Err(_) => plain(raw),
    }
}

fn plain(raw: &str) -> FormattedBody {
    FormattedBody {
        text: raw.to_string(),
        is_json: false,
    }
}

fn to_pretty(value: &serde_json::Value) -> Option<String> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser).ok()?;
    String::from_utf8(buf).ok()
}
