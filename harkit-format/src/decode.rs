use crate::coerce::*;
use crate::models::*;
use crate::FormatError;
use serde_json::{Map, Value};
use tracing::{debug, instrument};

type Fields = Map<String, Value>;

/// Decode an already parsed JSON value into a HAR document.
#[instrument(skip_all)]
pub fn decode(raw: &Value) -> Result<HarDocument, FormatError> {
    let root = object(Some(raw), "HAR document")?;
    let log = HarLog::try_from(object(root.get("log"), "log")?)?;

    debug!(
        "Decoded HAR {} with {} pages and {} entries",
        log.version,
        log.pages.len(),
        log.entries.len()
    );

    Ok(HarDocument { log })
}

pub fn decode_str(input: &str) -> Result<HarDocument, FormatError> {
    let raw: Value = serde_json::from_str(input)?;
    decode(&raw)
}

pub fn decode_slice(input: &[u8]) -> Result<HarDocument, FormatError> {
    let raw: Value = serde_json::from_slice(input)?;
    decode(&raw)
}

fn object<'a>(value: Option<&'a Value>, what: &'static str) -> Result<&'a Fields, FormatError> {
    match value {
        Some(Value::Object(fields)) => Ok(fields),
        _ => Err(FormatError::NotAnObject(what)),
    }
}

fn records<T>(value: Option<&Value>) -> Result<Vec<T>, FormatError>
where
    T: for<'a> TryFrom<&'a Fields, Error = FormatError>,
{
    array_or_empty(value)
        .iter()
        .map(|item| T::try_from(object(Some(item), "array item")?))
        .collect()
}

/// Page timings treat zero as "not meaningful".
fn nonzero(value: Option<f64>) -> Option<f64> {
    value.filter(|value| *value != 0.0)
}

impl TryFrom<&Fields> for HarLog {
    type Error = FormatError;

    fn try_from(data: &Fields) -> Result<Self, Self::Error> {
        let entries = match data.get("entries") {
            Some(Value::Array(entries)) => entries,
            _ => return Err(FormatError::EntriesNotArray),
        };
        let entries = entries
            .iter()
            .map(|entry| HarEntry::try_from(object(Some(entry), "entry")?))
            .collect::<Result<Vec<_>, _>>()?;

        let browser = match data.get("browser") {
            None | Some(Value::Null) => None,
            browser => Some(HarCreator::try_from(object(browser, "log.browser")?)?),
        };

        Ok(HarLog {
            version: string_or_empty(data.get("version")),
            creator: HarCreator::try_from(object(data.get("creator"), "log.creator")?)?,
            browser,
            pages: records(data.get("pages"))?,
            entries,
            comment: optional_string(data.get("comment")),
        })
    }
}

impl TryFrom<&Fields> for HarCreator {
    type Error = FormatError;

    fn try_from(data: &Fields) -> Result<Self, Self::Error> {
        Ok(HarCreator {
            name: string_or_empty(data.get("name")),
            version: string_or_empty(data.get("version")),
            comment: optional_string(data.get("comment")),
        })
    }
}

impl TryFrom<&Fields> for HarPage {
    type Error = FormatError;

    fn try_from(data: &Fields) -> Result<Self, Self::Error> {
        let page_timings = match data.get("pageTimings") {
            None | Some(Value::Null) => HarPageTimings::default(),
            timings => HarPageTimings::try_from(object(timings, "page.pageTimings")?)?,
        };

        Ok(HarPage {
            started_date_time: safe_date(data.get("startedDateTime"), "page.startedDateTime")?,
            id: string_or_empty(data.get("id")),
            title: string_or_empty(data.get("title")),
            page_timings,
            comment: optional_string(data.get("comment")),
        })
    }
}

impl TryFrom<&Fields> for HarPageTimings {
    type Error = FormatError;

    fn try_from(data: &Fields) -> Result<Self, Self::Error> {
        Ok(HarPageTimings {
            on_content_load: nonzero(optional_number(
                data.get("onContentLoad"),
                "pageTimings.onContentLoad",
            )?),
            on_load: nonzero(optional_number(data.get("onLoad"), "pageTimings.onLoad")?),
            comment: optional_string(data.get("comment")),
        })
    }
}

impl TryFrom<&Fields> for HarEntry {
    type Error = FormatError;

    fn try_from(data: &Fields) -> Result<Self, Self::Error> {
        Ok(HarEntry {
            pageref: optional_string(data.get("pageref")),
            started_date_time: safe_date(data.get("startedDateTime"), "entry.startedDateTime")?,
            time: safe_number(data.get("time"), "entry.time")?,
            request: HarRequest::try_from(object(data.get("request"), "entry.request")?)?,
            response: HarResponse::try_from(object(data.get("response"), "entry.response")?)?,
            cache: HarCache::default(),
            timings: HarTimings::try_from(object(data.get("timings"), "entry.timings")?)?,
            server_ip_address: optional_string(data.get("serverIPAddress")),
            connection: optional_string(data.get("connection")),
            comment: optional_string(data.get("comment")),
        })
    }
}

impl TryFrom<&Fields> for HarRequest {
    type Error = FormatError;

    fn try_from(data: &Fields) -> Result<Self, Self::Error> {
        let post_data = match data.get("postData") {
            None | Some(Value::Null) => None,
            post_data => Some(HarPostData::try_from(object(post_data, "request.postData")?)?),
        };

        Ok(HarRequest {
            method: string_or_empty(data.get("method")),
            url: string_or_empty(data.get("url")),
            http_version: string_or_empty(data.get("httpVersion")),
            cookies: records(data.get("cookies"))?,
            headers: records(data.get("headers"))?,
            query_string: records(data.get("queryString"))?,
            post_data,
            headers_size: safe_number(data.get("headersSize"), "request.headersSize")?,
            body_size: safe_number(data.get("bodySize"), "request.bodySize")?,
            comment: optional_string(data.get("comment")),
            transfer_size: optional_number(data.get("_transferSize"), "request._transferSize")?,
            error: optional_string(data.get("_error")),
        })
    }
}

impl TryFrom<&Fields> for HarResponse {
    type Error = FormatError;

    fn try_from(data: &Fields) -> Result<Self, Self::Error> {
        Ok(HarResponse {
            status: safe_number(data.get("status"), "response.status")?,
            status_text: string_or_empty(data.get("statusText")),
            http_version: string_or_empty(data.get("httpVersion")),
            cookies: records(data.get("cookies"))?,
            headers: records(data.get("headers"))?,
            content: HarContent::try_from(object(data.get("content"), "response.content")?)?,
            redirect_url: string_or_empty(data.get("redirectURL")),
            headers_size: safe_number(data.get("headersSize"), "response.headersSize")?,
            body_size: safe_number(data.get("bodySize"), "response.bodySize")?,
            comment: optional_string(data.get("comment")),
            transfer_size: optional_number(data.get("_transferSize"), "response._transferSize")?,
            error: optional_string(data.get("_error")),
        })
    }
}

impl TryFrom<&Fields> for HarCookie {
    type Error = FormatError;

    fn try_from(data: &Fields) -> Result<Self, Self::Error> {
        Ok(HarCookie {
            name: string_or_empty(data.get("name")),
            value: string_or_empty(data.get("value")),
            path: optional_string(data.get("path")),
            domain: optional_string(data.get("domain")),
            expires: lenient_date(data.get("expires")),
            http_only: optional_bool(data.get("httpOnly")),
            secure: optional_bool(data.get("secure")),
            same_site: optional_string(data.get("sameSite")),
            comment: optional_string(data.get("comment")),
        })
    }
}

impl TryFrom<&Fields> for HarHeader {
    type Error = FormatError;

    fn try_from(data: &Fields) -> Result<Self, Self::Error> {
        Ok(HarHeader {
            name: string_or_empty(data.get("name")),
            value: string_or_empty(data.get("value")),
            comment: optional_string(data.get("comment")),
        })
    }
}

impl TryFrom<&Fields> for HarQueryString {
    type Error = FormatError;

    fn try_from(data: &Fields) -> Result<Self, Self::Error> {
        Ok(HarQueryString {
            name: string_or_empty(data.get("name")),
            value: string_or_empty(data.get("value")),
            comment: optional_string(data.get("comment")),
        })
    }
}

impl TryFrom<&Fields> for HarPostData {
    type Error = FormatError;

    fn try_from(data: &Fields) -> Result<Self, Self::Error> {
        Ok(HarPostData {
            mime_type: string_or_empty(data.get("mimeType")),
            params: records(data.get("params"))?,
            text: string_or_empty(data.get("text")),
            comment: optional_string(data.get("comment")),
        })
    }
}

impl TryFrom<&Fields> for HarParam {
    type Error = FormatError;

    fn try_from(data: &Fields) -> Result<Self, Self::Error> {
        Ok(HarParam {
            name: string_or_empty(data.get("name")),
            value: optional_string(data.get("value")),
            file_name: optional_string(data.get("fileName")),
            content_type: optional_string(data.get("contentType")),
            comment: optional_string(data.get("comment")),
        })
    }
}

impl TryFrom<&Fields> for HarContent {
    type Error = FormatError;

    fn try_from(data: &Fields) -> Result<Self, Self::Error> {
        Ok(HarContent {
            size: safe_number(data.get("size"), "content.size")?,
            compression: optional_number(data.get("compression"), "content.compression")?,
            mime_type: string_or_empty(data.get("mimeType")),
            text: optional_string(data.get("text")),
            encoding: optional_string(data.get("encoding")),
            comment: optional_string(data.get("comment")),
        })
    }
}

impl TryFrom<&Fields> for HarTimings {
    type Error = FormatError;

    fn try_from(data: &Fields) -> Result<Self, Self::Error> {
        Ok(HarTimings {
            blocked: optional_number(data.get("blocked"), "timings.blocked")?,
            dns: optional_number(data.get("dns"), "timings.dns")?,
            connect: optional_number(data.get("connect"), "timings.connect")?,
            send: safe_number(data.get("send"), "timings.send")?,
            wait: safe_number(data.get("wait"), "timings.wait")?,
            receive: safe_number(data.get("receive"), "timings.receive")?,
            ssl: optional_number(data.get("ssl"), "timings.ssl")?,
            comment: optional_string(data.get("comment")),
            blocked_queueing: optional_number(
                data.get("_blocked_queueing"),
                "timings._blocked_queueing",
            )?,
            blocked_proxy: optional_number(data.get("_blocked_proxy"), "timings._blocked_proxy")?,
        })
    }
}
