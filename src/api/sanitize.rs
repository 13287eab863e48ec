use axum::Json;

use crate::{
    model::{SanitizePayload, SanitizeResponse},
    sanitizer::sanitize_optional,
};

pub async fn sanitize_fragment(Json(payload): Json<SanitizePayload>) -> Json<SanitizeResponse> {
    Json(SanitizeResponse {
        html: sanitize_optional(payload.html.as_deref()),
    })
}
