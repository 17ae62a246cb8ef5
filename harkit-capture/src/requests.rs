use crate::CaptureError;
use anyhow::Context;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use harkit_builder::{ContentData, LiveCookie};
use harkit_format::ProtocolTiming;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_with::serde_as;
use std::{
    fs::read,
    path::{Path, PathBuf},
};
use tracing::debug;

pub trait MakeStatic<T> {
    fn make_static(&self, file_path: &Path) -> anyhow::Result<T>;
}

/// A response body, inline `data` or a `file` next to the capture. Files that
/// are not UTF-8 are carried as base64.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct BodyData {
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl MakeStatic<ContentData> for BodyData {
    fn make_static(&self, capture_dir: &Path) -> anyhow::Result<ContentData> {
        match (&self.data, &self.file) {
            (Some(data), None) => Ok(ContentData {
                content: Some(data.clone()),
                encoded: false,
            }),
            (None, Some(path)) => {
                let file_to_load = capture_dir.join(path);
                debug!("Loading body file {:?}", file_to_load);
                let content = match String::from_utf8(read(file_to_load)?) {
                    Ok(text) => ContentData {
                        content: Some(text),
                        encoded: false,
                    },
                    Err(binary) => ContentData {
                        content: Some(STANDARD.encode(binary.into_bytes())),
                        encoded: true,
                    },
                };
                Ok(content)
            }
            _ => Err(CaptureError::InvalidBody.into()),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct PageConfig {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub start_time: f64,
    #[serde(default = "unknown_time")]
    pub content_load_time: f64,
    #[serde(default = "unknown_time")]
    pub load_time: f64,
}

/// One recorded request. Times are seconds on the capture clock, `wall-time`
/// is the wall clock time at `start-time`.
#[serde_as]
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case")]
#[serde(bound = "T: Serialize + DeserializeOwned")]
pub struct RequestConfig<T> {
    pub url: String,

    #[serde(default = "default_method")]
    pub method: String,

    /// `id` of the page this request belongs to.
    #[serde(default)]
    pub page: Option<String>,

    pub wall_time: DateTime<Utc>,

    #[serde(default)]
    pub start_time: f64,

    #[serde(default = "unknown_time")]
    pub duration: f64,

    #[serde(default = "default_http_version")]
    pub http_version: String,

    #[serde_as(as = "serde_with::Map<_, _>")]
    #[serde(default)]
    pub request_headers: Vec<(String, String)>,

    #[serde(default)]
    pub form_data: Option<String>,

    #[serde_as(as = "Option<serde_with::Map<_, _>>")]
    #[serde(default)]
    pub form_parameters: Option<Vec<(String, String)>>,

    #[serde(default)]
    pub request_cookies: Vec<LiveCookie>,

    #[serde(default)]
    pub status: u16,

    #[serde(default)]
    pub status_text: String,

    #[serde_as(as = "serde_with::Map<_, _>")]
    #[serde(default)]
    pub response_headers: Vec<(String, String)>,

    #[serde(default)]
    pub response_cookies: Vec<LiveCookie>,

    #[serde(default)]
    pub mime_type: String,

    #[serde(default)]
    pub resource_size: f64,

    #[serde(default)]
    pub transfer_size: f64,

    #[serde(default)]
    pub timing: Option<ProtocolTiming>,

    /// `host:port` of the server.
    #[serde(default)]
    pub remote_address: String,

    #[serde(default = "default_connection_id")]
    pub connection_id: String,

    #[serde(default)]
    pub cached: bool,

    #[serde(default)]
    pub error: Option<String>,

    #[serde(default)]
    pub body: Option<T>,

    /// The body is already base64.
    #[serde(default)]
    pub body_encoded: bool,
}

impl MakeStatic<RequestConfig<String>> for RequestConfig<BodyData> {
    fn make_static(&self, capture_dir: &Path) -> anyhow::Result<RequestConfig<String>> {
        let (body, body_encoded) = match &self.body {
            None => (None, self.body_encoded),
            Some(body) => {
                let loaded = body
                    .make_static(capture_dir)
                    .with_context(|| format!("Unable to load body of {}", self.url))?;
                (loaded.content, self.body_encoded || loaded.encoded)
            }
        };

        Ok(RequestConfig {
            url: self.url.clone(),
            method: self.method.clone(),
            page: self.page.clone(),
            wall_time: self.wall_time,
            start_time: self.start_time,
            duration: self.duration,
            http_version: self.http_version.clone(),
            request_headers: self.request_headers.clone(),
            form_data: self.form_data.clone(),
            form_parameters: self.form_parameters.clone(),
            request_cookies: self.request_cookies.clone(),
            status: self.status,
            status_text: self.status_text.clone(),
            response_headers: self.response_headers.clone(),
            response_cookies: self.response_cookies.clone(),
            mime_type: self.mime_type.clone(),
            resource_size: self.resource_size,
            transfer_size: self.transfer_size,
            timing: self.timing,
            remote_address: self.remote_address.clone(),
            connection_id: self.connection_id.clone(),
            cached: self.cached,
            error: self.error.clone(),
            body,
            body_encoded,
        })
    }
}

fn default_method() -> String {
    "GET".to_string()
}

fn default_http_version() -> String {
    "HTTP/1.1".to_string()
}

fn default_connection_id() -> String {
    "0".to_string()
}

fn unknown_time() -> f64 {
    -1.0
}
