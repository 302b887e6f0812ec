use axum::Json;
use songbatch_core::batch::AVAILABLE_MODELS;

use crate::response::DataResponse;

/// GET /api/v1/models
pub async fn list_models() -> Json<DataResponse<&'static [&'static str]>> {
    Json(DataResponse {
        data: AVAILABLE_MODELS,
    })
}
