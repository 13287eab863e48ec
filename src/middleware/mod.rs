use axum::{
    body::Body,
    http::{HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

/// Request id carried in extensions and echoed back as `X-Trace-Id`.
#[derive(Clone, Debug)]
pub struct TraceId(pub String);

pub async fn assign_trace_id(mut req: Request<Body>, next: Next) -> Response {
    let trace_id = Uuid::new_v4().to_string();
    req.extensions_mut().insert(TraceId(trace_id.clone()));
    let mut res = next.run(req).await;
    res.headers_mut().insert(
        "X-Trace-Id",
        HeaderValue::from_str(&trace_id).unwrap_or(HeaderValue::from_static("invalid")),
    );
    res
}
