use crate::{
    requests::{PageConfig, RequestConfig},
    CaptureError,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use harkit_builder::{ContentData, LiveCookie, LiveRequest, NameValue, PageLoad};
use harkit_format::ProtocolTiming;
use std::sync::Arc;
use url::Url;

/// A request read from a capture file.
#[derive(Debug, Clone)]
pub struct CaptureRequest {
    config: RequestConfig<String>,
    request_headers: Vec<NameValue>,
    request_headers_text: Option<String>,
    response_headers: Vec<NameValue>,
    response_headers_text: Option<String>,
    query: Option<Vec<NameValue>>,
    form_parameters: Option<Vec<NameValue>>,
    page: Option<Arc<CapturePage>>,
}

impl CaptureRequest {
    pub fn new(
        config: RequestConfig<String>,
        page: Option<Arc<CapturePage>>,
    ) -> Result<Self, CaptureError> {
        let url = Url::parse(&config.url).map_err(|source| CaptureError::InvalidUrl {
            url: config.url.clone(),
            source,
        })?;

        let query = url.query().map(|_| {
            url.query_pairs()
                .map(|(name, value)| NameValue::new(name, value))
                .collect()
        });

        let request_headers = to_name_values(&config.request_headers);
        let response_headers = to_name_values(&config.response_headers);

        let request_line = match url.query() {
            Some(query) => format!(
                "{} {}?{} {}",
                config.method,
                url.path(),
                query,
                config.http_version
            ),
            None => format!("{} {} {}", config.method, url.path(), config.http_version),
        };
        let status_line = format!(
            "{} {} {}",
            config.http_version, config.status, config.status_text
        );

        Ok(Self {
            request_headers_text: headers_text(&request_line, &request_headers),
            response_headers_text: headers_text(&status_line, &response_headers),
            form_parameters: config.form_parameters.as_deref().map(to_name_values),
            request_headers,
            response_headers,
            query,
            page,
            config,
        })
    }

    /// Same request, detached from its page.
    fn without_page(&self) -> Self {
        Self {
            page: None,
            ..self.clone()
        }
    }
}

fn to_name_values(pairs: &[(String, String)]) -> Vec<NameValue> {
    pairs
        .iter()
        .map(|(name, value)| NameValue::new(name.as_str(), value.as_str()))
        .collect()
}

/// Raw header block as it went over the wire. Unknown when no headers were recorded.
fn headers_text(first_line: &str, headers: &[NameValue]) -> Option<String> {
    if headers.is_empty() {
        return None;
    }

    let mut text = format!("{}\r\n", first_line);
    for header in headers {
        text.push_str(&format!("{}: {}\r\n", header.name, header.value));
    }
    text.push_str("\r\n");
    Some(text)
}

#[async_trait]
impl LiveRequest for CaptureRequest {
    fn request_method(&self) -> &str {
        &self.config.method
    }

    fn url(&self) -> &str {
        &self.config.url
    }

    fn request_http_version(&self) -> &str {
        &self.config.http_version
    }

    fn request_headers(&self) -> &[NameValue] {
        &self.request_headers
    }

    fn request_headers_text(&self) -> Option<&str> {
        self.request_headers_text.as_deref()
    }

    fn query_parameters(&self) -> Option<&[NameValue]> {
        self.query.as_deref()
    }

    fn request_cookies(&self) -> &[LiveCookie] {
        &self.config.request_cookies
    }

    fn response_cookies(&self) -> &[LiveCookie] {
        &self.config.response_cookies
    }

    fn request_form_data(&self) -> Option<&str> {
        self.config.form_data.as_deref()
    }

    fn form_parameters(&self) -> Option<&[NameValue]> {
        self.form_parameters.as_deref()
    }

    fn status_code(&self) -> u16 {
        self.config.status
    }

    fn status_text(&self) -> &str {
        &self.config.status_text
    }

    fn response_http_version(&self) -> &str {
        &self.config.http_version
    }

    fn response_headers(&self) -> &[NameValue] {
        &self.response_headers
    }

    fn response_headers_text(&self) -> Option<&str> {
        self.response_headers_text.as_deref()
    }

    fn resource_size(&self) -> f64 {
        self.config.resource_size
    }

    fn mime_type(&self) -> &str {
        &self.config.mime_type
    }

    fn transfer_size(&self) -> f64 {
        self.config.transfer_size
    }

    fn timing(&self) -> Option<&ProtocolTiming> {
        self.config.timing.as_ref()
    }

    fn duration(&self) -> f64 {
        self.config.duration
    }

    fn start_time(&self) -> f64 {
        self.config.start_time
    }

    fn pseudo_wall_time(&self, time: f64) -> DateTime<Utc> {
        let offset =
            Duration::milliseconds(((time - self.config.start_time) * 1000.0).round() as i64);
        self.config.wall_time + offset
    }

    fn remote_address(&self) -> &str {
        &self.config.remote_address
    }

    fn cached(&self) -> bool {
        self.config.cached
    }

    fn connection_id(&self) -> &str {
        &self.config.connection_id
    }

    fn localized_fail_description(&self) -> Option<&str> {
        self.config.error.as_deref()
    }

    fn page_load(&self) -> Option<Arc<dyn PageLoad>> {
        self.page.clone().map(|page| page as Arc<dyn PageLoad>)
    }

    async fn content_data(&self) -> anyhow::Result<ContentData> {
        Ok(ContentData {
            content: self.config.body.clone(),
            encoded: self.config.body_encoded,
        })
    }
}

/// A page read from a capture file.
#[derive(Debug)]
pub struct CapturePage {
    config: PageConfig,
    main: Option<Arc<CaptureRequest>>,
}

impl CapturePage {
    /// `main` is the first request recorded for the page, it is kept without
    /// a back reference to the page.
    pub fn new(config: PageConfig, main: Option<&CaptureRequest>) -> Self {
        Self {
            config,
            main: main.map(|request| Arc::new(request.without_page())),
        }
    }
}

impl PageLoad for CapturePage {
    fn id(&self) -> &str {
        &self.config.id
    }

    fn url(&self) -> &str {
        &self.config.url
    }

    fn start_time(&self) -> f64 {
        self.config.start_time
    }

    fn content_load_time(&self) -> f64 {
        self.config.content_load_time
    }

    fn load_time(&self) -> f64 {
        self.config.load_time
    }

    fn main_request(&self) -> Option<Arc<dyn LiveRequest>> {
        self.main.clone().map(|main| main as Arc<dyn LiveRequest>)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn request(url: &str) -> RequestConfig<String> {
        RequestConfig {
            url: url.to_string(),
            method: "GET".to_string(),
            page: None,
            wall_time: "2024-03-01T10:00:00Z".parse().unwrap(),
            start_time: 5.0,
            duration: 0.5,
            http_version: "HTTP/1.1".to_string(),
            request_headers: vec![("Host".to_string(), "example.com".to_string())],
            form_data: None,
            form_parameters: None,
            request_cookies: Vec::new(),
            status: 200,
            status_text: "OK".to_string(),
            response_headers: Vec::new(),
            response_cookies: Vec::new(),
            mime_type: "text/plain".to_string(),
            resource_size: 0.0,
            transfer_size: 0.0,
            timing: None,
            remote_address: String::new(),
            connection_id: "0".to_string(),
            cached: false,
            error: None,
            body: Some("hello".to_string()),
            body_encoded: false,
        }
    }

    #[test]
    fn test_query_from_url() {
        let with_query =
            CaptureRequest::new(request("https://example.com/a?x=1&y=two%20words"), None).unwrap();
        assert_eq!(
            Some(&[NameValue::new("x", "1"), NameValue::new("y", "two words")][..]),
            with_query.query_parameters()
        );

        let without_query = CaptureRequest::new(request("https://example.com/a"), None).unwrap();
        assert_eq!(None, without_query.query_parameters());
    }

    #[test]
    fn test_headers_text() {
        let request = CaptureRequest::new(request("https://example.com/a?x=1"), None).unwrap();
        assert_eq!(
            Some("GET /a?x=1 HTTP/1.1\r\nHost: example.com\r\n\r\n"),
            request.request_headers_text()
        );
        assert_eq!(None, request.response_headers_text());
    }

    #[test]
    fn test_invalid_url() {
        let err = CaptureRequest::new(request("not a url"), None).unwrap_err();
        assert_eq!("Unable to parse request url not a url", err.to_string());
    }

    #[test]
    fn test_pseudo_wall_time() {
        let request = CaptureRequest::new(request("https://example.com/"), None).unwrap();
        assert_eq!(
            "2024-03-01T10:00:00Z".parse::<DateTime<Utc>>().unwrap(),
            request.pseudo_wall_time(5.0)
        );
        assert_eq!(
            "2024-03-01T10:00:01.250Z".parse::<DateTime<Utc>>().unwrap(),
            request.pseudo_wall_time(6.25)
        );
    }

    #[tokio::test]
    async fn test_content_from_body() {
        let request = CaptureRequest::new(request("https://example.com/"), None).unwrap();
        assert_eq!(
            ContentData {
                content: Some("hello".to_string()),
                encoded: false
            },
            request.content_data().await.unwrap()
        );
    }
}
