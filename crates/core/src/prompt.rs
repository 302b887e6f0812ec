//! Prompt document parsing and validation for batch intake.
//!
//! A prompt document is a JSON object carrying the full lyrics and a style
//! description. Portuguese keys from the legacy upload format (`letra`,
//! `estilo`) are accepted as aliases. All other keys are kept verbatim as
//! track metadata.

use serde::Serialize;

use crate::error::CoreError;

/// Keys recognised as the lyrics field, in lookup order.
const LYRICS_KEYS: &[&str] = &["lyrics", "letra"];
/// Keys recognised as the style field, in lookup order.
const STYLE_KEYS: &[&str] = &["style", "estilo"];

/// Longest title kept from the first lyrics line, in characters.
pub const MAX_TITLE_CHARS: usize = 200;

/// A validated prompt, ready to become a `submitted` track.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PromptDocument {
    pub title: String,
    pub style: String,
    pub lyrics: String,
    /// Every key other than lyrics and style.
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// Parse and validate one uploaded prompt file.
///
/// `source` names the file in error messages.
pub fn parse_prompt_document(source: &str, bytes: &[u8]) -> Result<PromptDocument, CoreError> {
    let value: serde_json::Value = serde_json::from_slice(bytes)
        .map_err(|e| CoreError::Validation(format!("File {source} is not valid JSON: {e}")))?;
    prompt_from_value(source, value)
}

/// Validate an already-decoded prompt object.
pub fn prompt_from_value(
    source: &str,
    value: serde_json::Value,
) -> Result<PromptDocument, CoreError> {
    let serde_json::Value::Object(mut object) = value else {
        return Err(CoreError::Validation(format!(
            "File {source} must contain a JSON object"
        )));
    };

    let lyrics = take_text(&mut object, LYRICS_KEYS);
    let style = take_text(&mut object, STYLE_KEYS);
    let (Some(lyrics), Some(style)) = (lyrics, style) else {
        return Err(CoreError::Validation(format!(
            "File {source} must contain non-empty 'lyrics' and 'style'"
        )));
    };

    let title = title_from_lyrics(&lyrics).ok_or_else(|| {
        CoreError::Validation(format!("File {source} has lyrics without any text"))
    })?;

    Ok(PromptDocument {
        title,
        style,
        lyrics,
        metadata: object,
    })
}

/// First non-blank lyrics line, trimmed and capped at [`MAX_TITLE_CHARS`].
pub fn title_from_lyrics(lyrics: &str) -> Option<String> {
    lyrics
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(|line| line.chars().take(MAX_TITLE_CHARS).collect())
}

/// Remove all alias keys and return the first non-blank string value.
fn take_text(
    object: &mut serde_json::Map<String, serde_json::Value>,
    keys: &[&str],
) -> Option<String> {
    let mut found = None;
    for key in keys {
        if let Some(serde_json::Value::String(text)) = object.remove(*key) {
            if found.is_none() && !text.trim().is_empty() {
                found = Some(text);
            }
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parses_english_keys_and_keeps_metadata() {
        let doc = parse_prompt_document(
            "a.json",
            br#"{"lyrics": "First line\nSecond", "style": "synthwave", "bpm": 120}"#,
        )
        .unwrap();
        assert_eq!(doc.title, "First line");
        assert_eq!(doc.style, "synthwave");
        assert_eq!(doc.lyrics, "First line\nSecond");
        assert_eq!(doc.metadata.get("bpm"), Some(&serde_json::json!(120)));
        assert!(!doc.metadata.contains_key("lyrics"));
    }

    #[test]
    fn accepts_legacy_portuguese_keys() {
        let doc = parse_prompt_document(
            "b.json",
            r#"{"letra": "Canção\nverso", "estilo": "samba"}"#.as_bytes(),
        )
        .unwrap();
        assert_eq!(doc.title, "Canção");
        assert_eq!(doc.style, "samba");
        assert!(doc.metadata.is_empty());
    }

    #[test]
    fn title_skips_leading_blank_lines() {
        assert_eq!(
            title_from_lyrics("\n   \n  Hello there \nmore"),
            Some("Hello there".to_string())
        );
        assert_eq!(title_from_lyrics(" \n "), None);
    }

    #[test]
    fn long_titles_are_truncated() {
        let line = "x".repeat(MAX_TITLE_CHARS + 50);
        assert_eq!(title_from_lyrics(&line).unwrap().chars().count(), MAX_TITLE_CHARS);
    }

    #[test]
    fn missing_style_is_rejected() {
        assert_matches!(
            parse_prompt_document("c.json", br#"{"lyrics": "la la"}"#),
            Err(CoreError::Validation(msg)) if msg.contains("c.json")
        );
    }

    #[test]
    fn blank_lyrics_are_rejected() {
        assert_matches!(
            parse_prompt_document("d.json", br#"{"lyrics": "  ", "style": "pop"}"#),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn invalid_json_is_rejected() {
        assert_matches!(
            parse_prompt_document("e.json", b"{not json"),
            Err(CoreError::Validation(msg)) if msg.contains("not valid JSON")
        );
    }

    #[test]
    fn non_object_is_rejected() {
        assert_matches!(
            parse_prompt_document("f.json", b"[1, 2]"),
            Err(CoreError::Validation(msg)) if msg.contains("JSON object")
        );
    }
}
