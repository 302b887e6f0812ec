//! Row models and creation DTOs.

pub mod batch;
pub mod track;
pub mod track_event;
