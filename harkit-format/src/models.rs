use chrono::{DateTime, Utc};
use serde::Serialize;

/// Root of a HAR file.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct HarDocument {
    pub log: HarLog,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct HarLog {
    pub version: String,
    pub creator: HarCreator,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub browser: Option<HarCreator>,
    pub pages: Vec<HarPage>,
    pub entries: Vec<HarEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Used for both `creator` and `browser`.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct HarCreator {
    pub name: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HarPage {
    #[serde(with = "iso_date")]
    pub started_date_time: DateTime<Utc>,
    pub id: String,
    pub title: String,
    pub page_timings: HarPageTimings,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Page event offsets in milliseconds from the page start.
#[derive(Serialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HarPageTimings {
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "number::optional"
    )]
    pub on_content_load: Option<f64>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "number::optional"
    )]
    pub on_load: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HarEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pageref: Option<String>,
    #[serde(with = "iso_date")]
    pub started_date_time: DateTime<Utc>,
    #[serde(serialize_with = "number::required")]
    pub time: f64,
    pub request: HarRequest,
    pub response: HarResponse,
    pub cache: HarCache,
    pub timings: HarTimings,
    #[serde(rename = "serverIPAddress", skip_serializing_if = "Option::is_none")]
    pub server_ip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Cache information is not recorded, this always serializes to `{}`.
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct HarCache {}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HarRequest {
    pub method: String,
    pub url: String,
    pub http_version: String,
    pub cookies: Vec<HarCookie>,
    pub headers: Vec<HarHeader>,
    pub query_string: Vec<HarQueryString>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_data: Option<HarPostData>,
    #[serde(serialize_with = "number::required")]
    pub headers_size: f64,
    #[serde(serialize_with = "number::required")]
    pub body_size: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(
        rename = "_transferSize",
        skip_serializing_if = "Option::is_none",
        serialize_with = "number::optional"
    )]
    pub transfer_size: Option<f64>,
    #[serde(rename = "_error", skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HarResponse {
    #[serde(serialize_with = "number::required")]
    pub status: f64,
    pub status_text: String,
    pub http_version: String,
    pub cookies: Vec<HarCookie>,
    pub headers: Vec<HarHeader>,
    pub content: HarContent,
    #[serde(rename = "redirectURL")]
    pub redirect_url: String,
    #[serde(serialize_with = "number::required")]
    pub headers_size: f64,
    #[serde(serialize_with = "number::required")]
    pub body_size: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(
        rename = "_transferSize",
        skip_serializing_if = "Option::is_none",
        serialize_with = "number::optional"
    )]
    pub transfer_size: Option<f64>,
    #[serde(rename = "_error", skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HarResponse {
    /// First header with a case-insensitive name match.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|header| header.name.eq_ignore_ascii_case(name))
            .map(|header| header.value.as_str())
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HarCookie {
    pub name: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    /// Written as `null` when unknown.
    #[serde(with = "iso_date::optional")]
    pub expires: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_only: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secure: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub same_site: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct HarHeader {
    pub name: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl HarHeader {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            comment: None,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct HarQueryString {
    pub name: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl HarQueryString {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            comment: None,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HarPostData {
    pub mime_type: String,
    pub params: Vec<HarParam>,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HarParam {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HarContent {
    #[serde(serialize_with = "number::required")]
    pub size: f64,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "number::optional"
    )]
    pub compression: Option<f64>,
    pub mime_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Per-phase durations in milliseconds. Optional phases use `-1` in freshly
/// built documents and may be absent in decoded ones.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct HarTimings {
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "number::optional"
    )]
    pub blocked: Option<f64>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "number::optional"
    )]
    pub dns: Option<f64>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "number::optional"
    )]
    pub connect: Option<f64>,
    #[serde(serialize_with = "number::required")]
    pub send: f64,
    #[serde(serialize_with = "number::required")]
    pub wait: f64,
    #[serde(serialize_with = "number::required")]
    pub receive: f64,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "number::optional"
    )]
    pub ssl: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(
        rename = "_blocked_queueing",
        skip_serializing_if = "Option::is_none",
        serialize_with = "number::optional"
    )]
    pub blocked_queueing: Option<f64>,
    #[serde(
        rename = "_blocked_proxy",
        skip_serializing_if = "Option::is_none",
        serialize_with = "number::optional"
    )]
    pub blocked_proxy: Option<f64>,
}

impl HarTimings {
    /// Timings for a request whose protocol timing was never recorded.
    pub fn unknown() -> Self {
        Self {
            blocked: Some(-1.0),
            dns: Some(-1.0),
            connect: Some(-1.0),
            send: 0.0,
            wait: 0.0,
            receive: 0.0,
            ssl: Some(-1.0),
            comment: None,
            blocked_queueing: None,
            blocked_proxy: None,
        }
    }
}

impl HarDocument {
    /// Two-space indented JSON, the layout written to `.har` files.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Numbers are held as `f64` but integral values are written without a
/// fraction, so `-1` stays `-1` on the wire.
pub(crate) mod number {
    use serde::Serializer;

    const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

    pub fn required<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.fract() == 0.0 && value.abs() <= MAX_SAFE_INTEGER {
            serializer.serialize_i64(*value as i64)
        } else {
            serializer.serialize_f64(*value)
        }
    }

    pub fn optional<S: Serializer>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(value) => required(value, serializer),
            None => serializer.serialize_none(),
        }
    }
}

pub(crate) mod iso_date {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::Serializer;

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub mod optional {
        use chrono::{DateTime, Utc};
        use serde::Serializer;

        pub fn serialize<S: Serializer>(
            value: &Option<DateTime<Utc>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(value) => super::serialize(value, serializer),
                None => serializer.serialize_none(),
            }
        }
    }
}

#[test]
fn test_integral_numbers_have_no_fraction() {
    let timings = HarTimings::unknown();
    let json = serde_json::to_string(&timings).unwrap();
    assert_eq!(
        json,
        r#"{"blocked":-1,"dns":-1,"connect":-1,"send":0,"wait":0,"receive":0,"ssl":-1}"#
    );
}

#[test]
fn test_fractional_numbers_are_kept() {
    let content = HarContent {
        size: 10.5,
        compression: None,
        mime_type: "text/plain".to_string(),
        text: None,
        encoding: None,
        comment: None,
    };
    let json = serde_json::to_value(&content).unwrap();
    assert_eq!(json["size"], serde_json::json!(10.5));
    assert!(json.get("compression").is_none());
}

#[test]
fn test_cookie_expires_written_as_null() {
    let cookie = HarCookie {
        name: "a".to_string(),
        value: "b".to_string(),
        path: None,
        domain: None,
        expires: None,
        http_only: Some(true),
        secure: None,
        same_site: None,
        comment: None,
    };
    let json = serde_json::to_value(&cookie).unwrap();
    assert_eq!(json["expires"], serde_json::Value::Null);
    assert_eq!(json["httpOnly"], serde_json::json!(true));
    assert!(json.get("secure").is_none());
}
