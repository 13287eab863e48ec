use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct AdminLoginPayload {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AdminLoginResponse {
    pub token: String,
    pub expires_in: u64,
    pub expires_at: String,
}

#[derive(Debug, Deserialize)]
pub struct AdminLogoutPayload {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct SanitizePayload {
    pub html: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SanitizeResponse {
    pub html: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FeedImportPayload {
    pub feed_url: Option<String>,
    pub api_key: Option<String>,
}

/// One BaseLinker API call. `parameters` is sent as JSON text; a string is passed through.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct BaseLinkerPayload {
    pub token: Option<String>,
    pub method: Option<String>,
    pub parameters: Option<serde_json::Value>,
}
