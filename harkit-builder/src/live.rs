use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use harkit_format::ProtocolTiming;
use serde::{Deserialize, Serialize};
use std::{fmt::Debug, sync::Arc};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct NameValue {
    pub name: String,
    pub value: String,
}

impl NameValue {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A cookie as seen by the network stack.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LiveCookie {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub expires: Option<DateTime<Utc>>,
    /// Seconds, takes precedence over `expires`.
    #[serde(default)]
    pub max_age: Option<i64>,
    #[serde(default)]
    pub http_only: bool,
    #[serde(default)]
    pub secure: bool,
    #[serde(default)]
    pub same_site: Option<String>,
}

impl LiveCookie {
    /// Absolute expiry, resolving `max-age` against the time the request was sent.
    pub fn expires_date(&self, request_date: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if let Some(max_age) = self.max_age {
            return request_date.checked_add_signed(Duration::seconds(max_age));
        }
        self.expires
    }
}

/// Response body as handed out by the network stack. `encoded` means
/// `content` is already base64.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentData {
    pub content: Option<String>,
    pub encoded: bool,
}

/// Read-only view of a captured request.
///
/// Times are in seconds on the capture's monotonic clock, `-1` when unknown.
/// Sizes are in bytes.
#[async_trait]
pub trait LiveRequest: Debug + Send + Sync {
    fn request_method(&self) -> &str;
    fn url(&self) -> &str;
    fn request_http_version(&self) -> &str;
    fn request_headers(&self) -> &[NameValue];
    fn request_headers_text(&self) -> Option<&str>;

    fn request_header_value(&self, name: &str) -> Option<&str> {
        header_value(self.request_headers(), name)
    }

    fn query_parameters(&self) -> Option<&[NameValue]>;
    fn request_cookies(&self) -> &[LiveCookie];
    fn response_cookies(&self) -> &[LiveCookie];
    fn request_form_data(&self) -> Option<&str>;
    fn form_parameters(&self) -> Option<&[NameValue]>;

    fn status_code(&self) -> u16;
    fn status_text(&self) -> &str;
    fn response_http_version(&self) -> &str;
    fn response_headers(&self) -> &[NameValue];
    fn response_headers_text(&self) -> Option<&str>;

    fn response_header_value(&self, name: &str) -> Option<&str> {
        header_value(self.response_headers(), name)
    }

    fn resource_size(&self) -> f64;
    fn mime_type(&self) -> &str;
    fn transfer_size(&self) -> f64;

    fn timing(&self) -> Option<&ProtocolTiming>;
    fn duration(&self) -> f64;
    fn start_time(&self) -> f64;
    /// Wall clock time of a point on this request's monotonic clock.
    fn pseudo_wall_time(&self, time: f64) -> DateTime<Utc>;

    /// `host:port` of the peer, may be empty.
    fn remote_address(&self) -> &str;
    fn cached(&self) -> bool;
    fn connection_id(&self) -> &str;
    fn localized_fail_description(&self) -> Option<&str>;

    fn page_load(&self) -> Option<Arc<dyn PageLoad>>;

    async fn content_data(&self) -> anyhow::Result<ContentData>;
}

/// A navigation that requests are grouped under. Pages are told apart by the
/// identity of the shared `Arc`, not by `id`.
pub trait PageLoad: Debug + Send + Sync {
    fn id(&self) -> &str;
    fn url(&self) -> &str;
    fn start_time(&self) -> f64;
    fn content_load_time(&self) -> f64;
    fn load_time(&self) -> f64;
    fn main_request(&self) -> Option<Arc<dyn LiveRequest>>;
}

/// Receives one unit of work per built entry.
pub trait ProgressSink: Send + Sync {
    fn set_total_work(&self, total: usize);
    fn worked(&self, units: usize);
}

fn header_value<'a>(headers: &'a [NameValue], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|header| header.name.eq_ignore_ascii_case(name))
        .map(|header| header.value.as_str())
}

#[test]
fn test_max_age_wins_over_expires() {
    let sent = "2021-06-01T12:00:00Z".parse::<DateTime<Utc>>().unwrap();
    let cookie = LiveCookie {
        name: "a".to_string(),
        value: "1".to_string(),
        expires: Some("2030-01-01T00:00:00Z".parse().unwrap()),
        max_age: Some(60),
        ..Default::default()
    };
    assert_eq!(
        Some("2021-06-01T12:01:00Z".parse::<DateTime<Utc>>().unwrap()),
        cookie.expires_date(sent)
    );

    let session = LiveCookie::default();
    assert_eq!(None, session.expires_date(sent));
}
