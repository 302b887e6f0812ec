//! Artifact file naming conventions.
//!
//! Generates deterministic filenames for downloaded and stitched audio so
//! that provider identifiers can never escape the output directory.

use crate::duration::ArtifactKind;
use crate::types::DbId;

/// Filename for a freshly generated artifact.
///
/// Convention: `{generation_id}.{ext}`
///
/// ```
/// use songbatch_core::duration::ArtifactKind;
/// use songbatch_core::naming::generated_filename;
///
/// assert_eq!(generated_filename("abc-123", ArtifactKind::Wav), "abc-123.wav");
/// assert_eq!(generated_filename("../x", ArtifactKind::Mp3), "___x.mp3");
/// ```
pub fn generated_filename(generation_id: &str, kind: ArtifactKind) -> String {
    format!("{}.{}", sanitize(generation_id), kind.extension())
}

/// Filename for an extension artifact.
///
/// Convention: `{generation_id}_ext.{ext}`
pub fn extension_filename(generation_id: &str, kind: ArtifactKind) -> String {
    format!("{}_ext.{}", sanitize(generation_id), kind.extension())
}

/// Filename for the concatenation of all segments of a track.
pub fn stitched_filename(track_id: DbId) -> String {
    format!("track_{track_id}_full.wav")
}

/// Filename offered to clients downloading a track.
///
/// Lowercase snake_case title, falling back to `track_{id}` when the title
/// has no usable characters.
pub fn download_filename(track_id: DbId, title: &str, kind: ArtifactKind) -> String {
    let mut stem = String::new();
    for c in title.trim().chars() {
        if c.is_alphanumeric() {
            stem.extend(c.to_lowercase());
        } else if !stem.ends_with('_') && !stem.is_empty() {
            stem.push('_');
        }
    }
    let stem = stem.trim_end_matches('_');
    if stem.is_empty() {
        format!("track_{track_id}.{}", kind.extension())
    } else {
        format!("{stem}.{}", kind.extension())
    }
}

/// Replace anything outside `[A-Za-z0-9_-]` with `_`.
fn sanitize(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "unnamed".to_string()
    } else {
        cleaned
    }
}
