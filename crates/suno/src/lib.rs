//! Client for the Suno music generation API.
//!
//! Provides the REST wrapper, response normalization, task polling with a
//! bounded wait, artifact download, and an offline stub that synthesizes
//! WAV noise. Both [`SunoClient`] and [`StubGenerationService`] implement
//! the pipeline's `GenerationService` capability.

pub mod api;
pub mod client;
pub mod config;
pub mod messages;
pub mod models;
pub mod poll;
pub mod stub;

pub use client::SunoClient;
pub use config::{GenerationBackend, SunoConfig};
pub use stub::StubGenerationService;
