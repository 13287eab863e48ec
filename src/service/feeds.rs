use anyhow::anyhow;
use axum::body::Bytes;
use reqwest::{header::ACCEPT, Client};
use url::Url;

use crate::{
    config::ImporterConfig,
    error::{AppError, AppResult},
    feed::{FeedTransformer, TransformReport},
    model::FeedImportPayload,
};

/// Clean an uploaded feed on the blocking pool.
pub async fn clean(transformer: FeedTransformer, bytes: Bytes) -> AppResult<TransformReport> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(AppError::BadRequest("uploaded file is empty".into()));
    }

    let size = bytes.len();
    let report = tokio::task::spawn_blocking(move || transformer.transform_report(&bytes))
        .await
        .map_err(|err| anyhow!("feed transform task failed: {err}"))??;

    tracing::info!(
        bytes_in = size,
        bytes_out = report.xml.len(),
        items = report.items,
        "feed cleaned"
    );
    Ok(report)
}

/// Download the exporter's feed and clean it.
pub async fn import(
    client: &Client,
    config: &ImporterConfig,
    transformer: FeedTransformer,
    payload: FeedImportPayload,
) -> AppResult<TransformReport> {
    let url = resolve_feed_url(config, payload.feed_url)?;
    let api_key = payload
        .api_key
        .or_else(|| config.api_key.clone())
        .filter(|key| !key.trim().is_empty());

    let mut request = client
        .get(url.clone())
        .header(ACCEPT, "application/xml, text/xml, */*");
    if let Some(key) = api_key {
        request = request.bearer_auth(key.trim());
    }

    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(AppError::Upstream(format!(
            "feed server answered {status} for {url}"
        )));
    }

    let bytes = response.bytes().await?;
    tracing::info!(url = %url, bytes = bytes.len(), "feed downloaded");

    clean(transformer, bytes).await
}

fn resolve_feed_url(config: &ImporterConfig, requested: Option<String>) -> AppResult<Url> {
    let raw = requested
        .filter(|url| !url.trim().is_empty())
        .or_else(|| config.feed_url.clone())
        .ok_or_else(|| {
            AppError::Unavailable(
                "feed url is not configured; set FEED_URL or send feed_url in the request".into(),
            )
        })?;

    Url::parse(raw.trim())
        .ok()
        .filter(|url| matches!(url.scheme(), "http" | "https"))
        .ok_or_else(|| AppError::Unavailable(format!("feed url {raw:?} is not an http(s) url")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn importer(feed_url: Option<&str>) -> ImporterConfig {
        ImporterConfig {
            feed_url: feed_url.map(str::to_string),
            ..ImporterConfig::default()
        }
    }

    #[test]
    fn request_url_wins_over_configured_one() {
        let config = importer(Some("https://configured.example/feed.xml"));
        let url = resolve_feed_url(&config, Some("http://other.example/x.xml".into())).unwrap();
        assert_eq!(url.as_str(), "http://other.example/x.xml");

        let url = resolve_feed_url(&config, Some("  ".into())).unwrap();
        assert_eq!(url.host_str(), Some("configured.example"));
    }

    #[test]
    fn missing_or_non_http_url_is_unavailable() {
        assert!(matches!(
            resolve_feed_url(&importer(None), None),
            Err(AppError::Unavailable(_))
        ));
        assert!(matches!(
            resolve_feed_url(&importer(Some("ftp://example.com/feed.xml")), None),
            Err(AppError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn blank_upload_is_rejected() {
        let err = clean(FeedTransformer::default(), Bytes::from_static(b" \n "))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn upload_is_cleaned() {
        let xml = b"<SHOP><SHOPITEM><DESCRIPTION>&lt;div&gt;Hi&lt;/div&gt;</DESCRIPTION></SHOPITEM></SHOP>";
        let report = clean(FeedTransformer::default(), Bytes::from_static(xml))
            .await
            .unwrap();
        assert_eq!(report.items, 1);
        assert_eq!(report.fields_cleaned, 1);
    }
}
