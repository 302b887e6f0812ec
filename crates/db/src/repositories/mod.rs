//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod batch_repo;
pub mod track_event_repo;
pub mod track_repo;

pub use batch_repo::BatchRepo;
pub use track_event_repo::TrackEventRepo;
pub use track_repo::TrackRepo;
