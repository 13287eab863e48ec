use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use tracing::Instrument;

use crate::{
    app::AppState, auth::AdminIdentity, error::AppResult, middleware::TraceId,
    model::BaseLinkerPayload, service,
};

/// Relays the connector's JSON as is; a non-2xx answer from BaseLinker becomes 502.
pub async fn proxy(
    State(state): State<AppState>,
    Extension(trace): Extension<TraceId>,
    Extension(admin): Extension<AdminIdentity>,
    Json(payload): Json<BaseLinkerPayload>,
) -> AppResult<Response> {
    let span = tracing::info_span!(
        "baselinker",
        trace_id = %trace.0,
        admin = %admin.username
    );
    let reply = service::baselinker::call(&state.http_client, &state.baselinker, payload)
        .instrument(span)
        .await?;

    let status = if reply.ok {
        StatusCode::OK
    } else {
        StatusCode::BAD_GATEWAY
    };
    Ok((status, Json(reply.body)).into_response())
}
