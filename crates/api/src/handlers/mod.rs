pub mod batches;
pub mod models;
pub mod tracks;
