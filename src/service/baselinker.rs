use reqwest::{header::CONTENT_TYPE, Client};
use serde_json::Value;

use crate::{
    config::BaseLinkerConfig,
    error::{AppError, AppResult},
    model::BaseLinkerPayload,
};

const RAW_PREVIEW_CHARS: usize = 500;

/// Decoded connector answer; `ok` is false when BaseLinker replied with a non-2xx status.
#[derive(Debug)]
pub struct BaseLinkerReply {
    pub ok: bool,
    pub body: Value,
}

/// Forward one API call to the BaseLinker connector and return its JSON answer.
pub async fn call(
    client: &Client,
    config: &BaseLinkerConfig,
    payload: BaseLinkerPayload,
) -> AppResult<BaseLinkerReply> {
    let missing = || AppError::BadRequest("missing token or method".into());
    let token = non_blank(payload.token)
        .or_else(|| non_blank(config.token.clone()))
        .ok_or_else(missing)?;
    let method = non_blank(payload.method).ok_or_else(missing)?;

    let form = form_urlencoded::Serializer::new(String::new())
        .append_pair("method", &method)
        .append_pair("parameters", &encode_parameters(payload.parameters))
        .finish();

    let response = client
        .post(config.api_url.trim())
        .header("X-BLToken", token)
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(form)
        .send()
        .await
        .map_err(connection_error)?;
    let status = response.status();
    let text = response.text().await.map_err(connection_error)?;

    let body: Value = serde_json::from_str(&text).map_err(|_| {
        let raw: String = text.chars().take(RAW_PREVIEW_CHARS).collect();
        AppError::Upstream(format!("invalid response from BaseLinker API: {raw}"))
    })?;

    if status.is_success() {
        tracing::info!(%method, "baselinker call forwarded");
    } else {
        tracing::warn!(%method, status = status.as_u16(), "baselinker call rejected");
    }
    Ok(BaseLinkerReply {
        ok: status.is_success(),
        body,
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn encode_parameters(parameters: Option<Value>) -> String {
    match parameters {
        None | Some(Value::Null) => "{}".to_string(),
        Some(Value::String(raw)) => raw,
        Some(other) => other.to_string(),
    }
}

fn connection_error(err: reqwest::Error) -> AppError {
    AppError::Upstream(format!("failed to reach BaseLinker: {err}"))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parameters_are_sent_as_json_text() {
        assert_eq!(encode_parameters(None), "{}");
        assert_eq!(encode_parameters(Some(Value::Null)), "{}");
        assert_eq!(
            encode_parameters(Some(json!("{\"inventory_id\":7}"))),
            "{\"inventory_id\":7}"
        );
        assert_eq!(
            encode_parameters(Some(json!({ "inventory_id": 7 }))),
            "{\"inventory_id\":7}"
        );
    }

    #[tokio::test]
    async fn missing_method_is_a_bad_request() {
        let payload = BaseLinkerPayload {
            token: Some("t".into()),
            method: Some("  ".into()),
            parameters: None,
        };
        let err = call(&Client::new(), &BaseLinkerConfig::default(), payload)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn missing_token_is_a_bad_request() {
        let payload = BaseLinkerPayload {
            method: Some("getInventories".into()),
            ..BaseLinkerPayload::default()
        };
        let err = call(&Client::new(), &BaseLinkerConfig::default(), payload)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
