use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
    Extension, Json,
};
use tracing::Instrument;

use crate::{
    app::AppState, auth::AdminIdentity, error::AppResult, feed::TransformReport,
    middleware::TraceId, model::FeedImportPayload, service,
};

const DOWNLOAD_NAME: &str = "attachment; filename=\"kaufland_feed_cleaned.xml\"";

pub async fn clean_feed(
    State(state): State<AppState>,
    Extension(trace): Extension<TraceId>,
    body: Bytes,
) -> AppResult<Response> {
    let span = tracing::info_span!("clean_feed", trace_id = %trace.0);
    let report = service::feeds::clean(state.transformer, body)
        .instrument(span)
        .await?;
    Ok(xml_response(report))
}

pub async fn import_feed(
    State(state): State<AppState>,
    Extension(trace): Extension<TraceId>,
    Extension(admin): Extension<AdminIdentity>,
    Json(payload): Json<FeedImportPayload>,
) -> AppResult<Response> {
    let span = tracing::info_span!(
        "import_feed",
        trace_id = %trace.0,
        admin = %admin.username
    );
    let report = service::feeds::import(
        &state.http_client,
        &state.importer,
        state.transformer,
        payload,
    )
    .instrument(span)
    .await?;
    Ok(xml_response(report))
}

fn xml_response(report: TransformReport) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/xml; charset=utf-8"),
    );
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_static(DOWNLOAD_NAME),
    );
    headers.insert("x-shop-items", HeaderValue::from(report.items));
    headers.insert("x-cleaned-fields", HeaderValue::from(report.fields_cleaned));
    (headers, report.xml).into_response()
}
