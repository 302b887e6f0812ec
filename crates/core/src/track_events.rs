//! Stage labels written to the per-track event log.
//!
//! Used by the track job when appending events and by clients filtering
//! a track's history.

/// Track moved to `generating`.
pub const STAGE_GENERATING: &str = "generating";

/// A generation attempt is starting.
pub const STAGE_ATTEMPT_STARTED: &str = "attempt_started";

/// A generation attempt failed or timed out.
pub const STAGE_ATTEMPT_FAILED: &str = "attempt_failed";

/// A generation attempt produced an artifact.
pub const STAGE_GENERATED: &str = "generated";

/// Track moved to `extending`.
pub const STAGE_EXTENDING: &str = "extending";

/// An extend call produced an artifact.
pub const STAGE_EXTENDED: &str = "extended";

/// An extend call failed; extension stops, the track still finalizes.
pub const STAGE_EXTEND_FAILED: &str = "extend_failed";

/// Segments were concatenated into one artifact.
pub const STAGE_STITCHED: &str = "stitched";

/// Segments could not be concatenated; the latest segment is kept.
pub const STAGE_STITCH_SKIPPED: &str = "stitch_skipped";

/// Track reached `finalized`.
pub const STAGE_FINALIZED: &str = "finalized";

/// Track reached `error`.
pub const STAGE_ERROR: &str = "error";

/// Generation key for the first successful generation.
pub const INITIAL_GENERATION_KEY: &str = "initial";

/// Generation key for the `n`-th extension (1-based).
pub fn extend_generation_key(n: u32) -> String {
    format!("extend_{n}")
}
