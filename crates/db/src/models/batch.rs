//! Batch entity model and DTO.

use serde::Serialize;
use songbatch_core::batch::BatchParameters;
use songbatch_core::types::{DbId, Timestamp};
use sqlx::types::Json;
use sqlx::FromRow;

/// A row from the `batches` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Batch {
    pub id: DbId,
    pub parameters: Json<BatchParameters>,
    pub initiator: Option<String>,
    pub total_files: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a batch at intake.
#[derive(Debug, Clone)]
pub struct CreateBatch {
    pub parameters: BatchParameters,
    pub initiator: Option<String>,
}
