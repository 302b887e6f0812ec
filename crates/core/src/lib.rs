//! Domain types, rules, and pure helpers shared by every songbatch crate.
//!
//! Nothing in here performs I/O against the database or the generation
//! provider; the only filesystem access is reading artifact sizes for
//! duration estimation.

pub mod artifact;
pub mod batch;
pub mod duration;
pub mod error;
pub mod naming;
pub mod prompt;
pub mod track_events;
pub mod track_status;
pub mod types;
