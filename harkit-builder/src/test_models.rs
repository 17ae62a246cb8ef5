use crate::{ContentData, LiveCookie, LiveRequest, NameValue, PageLoad};
use chrono::{DateTime, Duration, TimeZone, Utc};
use harkit_format::ProtocolTiming;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct FakeRequest {
    pub method: String,
    pub url: String,
    pub http_version: String,
    pub request_headers: Vec<NameValue>,
    pub request_headers_text: Option<String>,
    pub query: Option<Vec<NameValue>>,
    pub request_cookies: Vec<LiveCookie>,
    pub response_cookies: Vec<LiveCookie>,
    pub form_data: Option<String>,
    pub form_parameters: Option<Vec<NameValue>>,
    pub status_code: u16,
    pub status_text: String,
    pub response_headers: Vec<NameValue>,
    pub response_headers_text: Option<String>,
    pub resource_size: f64,
    pub mime_type: String,
    pub transfer_size: f64,
    pub timing: Option<ProtocolTiming>,
    pub duration: f64,
    pub start_time: f64,
    pub remote_address: String,
    pub cached: bool,
    pub connection_id: String,
    pub fail: Option<String>,
    pub page: Option<Arc<dyn PageLoad>>,
    /// `None` makes `content_data` fail.
    pub content: Option<ContentData>,
}

impl FakeRequest {
    pub fn get(url: &str) -> Self {
        Self {
            method: "GET".to_string(),
            url: url.to_string(),
            http_version: "HTTP/1.1".to_string(),
            status_code: 200,
            status_text: "OK".to_string(),
            resource_size: 2048.0,
            mime_type: "text/html".to_string(),
            transfer_size: 1024.0,
            timing: Some(ProtocolTiming {
                request_time: 1.0,
                dns_start: 1.0,
                dns_end: 3.0,
                connect_start: 3.0,
                connect_end: 9.0,
                send_start: 9.0,
                send_end: 10.0,
                receive_headers_end: 200.0,
                ..Default::default()
            }),
            duration: 0.25,
            start_time: 1.0,
            ..Default::default()
        }
    }
}

#[async_trait::async_trait]
impl LiveRequest for FakeRequest {
    fn request_method(&self) -> &str {
        &self.method
    }

    fn url(&self) -> &str {
        &self.url
    }

    fn request_http_version(&self) -> &str {
        &self.http_version
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
        &self.request_cookies
    }

    fn response_cookies(&self) -> &[LiveCookie] {
        &self.response_cookies
    }

    fn request_form_data(&self) -> Option<&str> {
        self.form_data.as_deref()
    }

    fn form_parameters(&self) -> Option<&[NameValue]> {
        self.form_parameters.as_deref()
    }

    fn status_code(&self) -> u16 {
        self.status_code
    }

    fn status_text(&self) -> &str {
        &self.status_text
    }

    fn response_http_version(&self) -> &str {
        &self.http_version
    }

    fn response_headers(&self) -> &[NameValue] {
        &self.response_headers
    }

    fn response_headers_text(&self) -> Option<&str> {
        self.response_headers_text.as_deref()
    }

    fn resource_size(&self) -> f64 {
        self.resource_size
    }

    fn mime_type(&self) -> &str {
        &self.mime_type
    }

    fn transfer_size(&self) -> f64 {
        self.transfer_size
    }

    fn timing(&self) -> Option<&ProtocolTiming> {
        self.timing.as_ref()
    }

    fn duration(&self) -> f64 {
        self.duration
    }

    fn start_time(&self) -> f64 {
        self.start_time
    }

    fn pseudo_wall_time(&self, time: f64) -> DateTime<Utc> {
        let origin = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        origin + Duration::milliseconds((time * 1000.0) as i64)
    }

    fn remote_address(&self) -> &str {
        &self.remote_address
    }

    fn cached(&self) -> bool {
        self.cached
    }

    fn connection_id(&self) -> &str {
        &self.connection_id
    }

    fn localized_fail_description(&self) -> Option<&str> {
        self.fail.as_deref()
    }

    fn page_load(&self) -> Option<Arc<dyn PageLoad>> {
        self.page.clone()
    }

    async fn content_data(&self) -> anyhow::Result<ContentData> {
        match &self.content {
            Some(content) => Ok(content.clone()),
            None => anyhow::bail!("content for {} was evicted", self.url),
        }
    }
}

#[derive(Debug)]
pub struct FakePage {
    pub id: String,
    pub url: String,
    pub start_time: f64,
    pub content_load_time: f64,
    pub load_time: f64,
    pub main: Option<Arc<FakeRequest>>,
}

impl FakePage {
    pub fn new(id: &str, url: &str) -> Self {
        Self {
            id: id.to_string(),
            url: url.to_string(),
            start_time: 0.5,
            content_load_time: 1.0,
            load_time: 2.0,
            main: None,
        }
    }
}

impl PageLoad for FakePage {
    fn id(&self) -> &str {
        &self.id
    }

    fn url(&self) -> &str {
        &self.url
    }

    fn start_time(&self) -> f64 {
        self.start_time
    }

    fn content_load_time(&self) -> f64 {
        self.content_load_time
    }

    fn load_time(&self) -> f64 {
        self.load_time
    }

    fn main_request(&self) -> Option<Arc<dyn LiveRequest>> {
        self.main.clone().map(|main| main as Arc<dyn LiveRequest>)
    }
}
