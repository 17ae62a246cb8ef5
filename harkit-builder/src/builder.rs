use crate::timings::build_timings;
use crate::{BuildError, ContentData, LiveCookie, LiveRequest, NameValue, PageLoad, ProgressSink};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use futures::future::try_join_all;
use harkit_format::*;
use std::{collections::HashSet, sync::Arc};
use tracing::{debug, instrument, trace};

/// Builds HAR documents out of live requests.
#[derive(Debug, Clone)]
pub struct HarBuilder {
    creator: HarCreator,
}

impl Default for HarBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HarBuilder {
    pub fn new() -> Self {
        Self {
            creator: HarCreator {
                name: "harkit".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                comment: None,
            },
        }
    }

    pub fn with_creator(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            creator: HarCreator {
                name: name.into(),
                version: version.into(),
                comment: None,
            },
        }
    }

    /// Entries are built concurrently and returned in input order. The only
    /// failure is a content read when `include_content` is set, which aborts
    /// the whole build.
    #[instrument(
        skip_all,
        fields(har.requests = requests.len(), har.include_content = include_content)
    )]
    pub async fn build(
        &self,
        requests: &[Arc<dyn LiveRequest>],
        include_content: bool,
        progress: Option<&dyn ProgressSink>,
    ) -> Result<HarDocument, BuildError> {
        if let Some(progress) = progress {
            progress.set_total_work(requests.len());
        }

        let pages = build_pages(requests);
        debug!("Grouped {} requests into {} pages", requests.len(), pages.len());

        let entries = try_join_all(requests.iter().map(|request| async move {
            let entry = EntryBuilder::new(request.as_ref())
                .build(include_content)
                .await?;
            if let Some(progress) = progress {
                progress.worked(1);
            }
            Ok::<_, BuildError>(entry)
        }))
        .await?;

        Ok(HarDocument {
            log: HarLog {
                version: HAR_VERSION.to_string(),
                creator: self.creator.clone(),
                browser: None,
                pages,
                entries,
                comment: None,
            },
        })
    }
}

fn build_pages(requests: &[Arc<dyn LiveRequest>]) -> Vec<HarPage> {
    let mut seen = HashSet::new();
    let mut pages = Vec::new();

    for request in requests {
        let Some(page) = request.page_load() else {
            continue;
        };
        if !seen.insert(Arc::as_ptr(&page) as *const () as usize) {
            continue;
        }
        pages.push(convert_page(page.as_ref(), request.as_ref()));
    }

    pages
}

fn convert_page(page: &dyn PageLoad, first_request: &dyn LiveRequest) -> HarPage {
    let started_date_time = if page.start_time() == -1.0 {
        first_request.pseudo_wall_time(first_request.start_time())
    } else {
        match page.main_request() {
            Some(main) => main.pseudo_wall_time(page.start_time()),
            None => first_request.pseudo_wall_time(page.start_time()),
        }
    };

    HarPage {
        started_date_time,
        id: page_ref(page),
        // Page title is not tracked, the URL is the closest thing.
        title: page.url().to_string(),
        page_timings: HarPageTimings {
            on_content_load: Some(page_event_time(page, page.content_load_time())),
            on_load: Some(page_event_time(page, page.load_time())),
            comment: None,
        },
        comment: None,
    }
}

fn page_ref(page: &dyn PageLoad) -> String {
    format!("page_{}", page.id())
}

fn page_event_time(page: &dyn PageLoad, time: f64) -> f64 {
    let start_time = page.start_time();
    if time == -1.0 || start_time == -1.0 {
        return -1.0;
    }
    to_milliseconds(time - start_time)
}

fn to_milliseconds(time: f64) -> f64 {
    if time == -1.0 {
        -1.0
    } else {
        time * 1000.0
    }
}

struct EntryBuilder<'a> {
    request: &'a dyn LiveRequest,
}

impl<'a> EntryBuilder<'a> {
    fn new(request: &'a dyn LiveRequest) -> Self {
        Self { request }
    }

    async fn build(&self, include_content: bool) -> Result<HarEntry, BuildError> {
        let request = self.request;
        let mut response = self.build_response();

        if include_content {
            let data = request
                .content_data()
                .await
                .map_err(|source| BuildError::Content {
                    url: request.url().to_string(),
                    source,
                })?;
            apply_content(&mut response.content, data);
        }

        let duration = request.duration();
        let connection = Some(request.connection_id())
            .filter(|id| !id.is_empty() && *id != "0")
            .map(String::from);
        let server_ip_address = Some(strip_port(request.remote_address()))
            .filter(|address| !address.is_empty())
            .map(String::from);

        trace!("Built entry for {}", request.url());

        Ok(HarEntry {
            pageref: request.page_load().map(|page| page_ref(page.as_ref())),
            started_date_time: request.pseudo_wall_time(request.start_time()),
            time: if duration != -1.0 { duration * 1000.0 } else { 0.0 },
            request: self.build_request(),
            response,
            cache: HarCache::default(),
            timings: build_timings(request.timing(), to_milliseconds(duration)),
            server_ip_address,
            connection,
            comment: None,
        })
    }

    fn build_request(&self) -> HarRequest {
        let request = self.request;

        HarRequest {
            method: request.request_method().to_string(),
            url: strip_fragment(request.url()).to_string(),
            http_version: request.request_http_version().to_string(),
            cookies: self.build_cookies(request.request_cookies()),
            headers: build_headers(request.request_headers()),
            query_string: request
                .query_parameters()
                .unwrap_or_default()
                .iter()
                .map(|param| HarQueryString::new(&param.name, &param.value))
                .collect(),
            post_data: self.build_post_data(),
            headers_size: text_size(request.request_headers_text()),
            body_size: request
                .request_form_data()
                .map(|data| data.len() as f64)
                .unwrap_or(0.0),
            comment: None,
            transfer_size: None,
            error: None,
        }
    }

    fn build_response(&self) -> HarResponse {
        let request = self.request;

        HarResponse {
            status: f64::from(request.status_code()),
            status_text: request.status_text().to_string(),
            http_version: request.response_http_version().to_string(),
            cookies: self.build_cookies(request.response_cookies()),
            headers: build_headers(request.response_headers()),
            content: self.build_content(),
            redirect_url: request
                .response_header_value("Location")
                .unwrap_or_default()
                .to_string(),
            headers_size: text_size(request.response_headers_text()),
            body_size: self.response_body_size(),
            comment: None,
            transfer_size: Some(request.transfer_size()),
            error: request.localized_fail_description().map(String::from),
        }
    }

    fn build_content(&self) -> HarContent {
        let mime_type = match self.request.mime_type() {
            "" => "x-unknown",
            mime_type => mime_type,
        };

        HarContent {
            size: self.request.resource_size(),
            compression: self.response_compression(),
            mime_type: mime_type.to_string(),
            text: None,
            encoding: None,
            comment: None,
        }
    }

    fn build_post_data(&self) -> Option<HarPostData> {
        let text = self.request.request_form_data()?;

        Some(HarPostData {
            mime_type: self
                .request
                .request_header_value("Content-Type")
                .unwrap_or_default()
                .to_string(),
            params: self
                .request
                .form_parameters()
                .unwrap_or_default()
                .iter()
                .map(|param| HarParam {
                    name: param.name.clone(),
                    value: Some(param.value.clone()),
                    file_name: None,
                    content_type: None,
                    comment: None,
                })
                .collect(),
            text: text.to_string(),
            comment: None,
        })
    }

    fn build_cookies(&self, cookies: &[LiveCookie]) -> Vec<HarCookie> {
        let start_time = self.request.start_time();
        let request_date = Some(start_time)
            .filter(|start| *start != -1.0)
            .map(|start| self.request.pseudo_wall_time(start));

        cookies
            .iter()
            .map(|cookie| HarCookie {
                name: cookie.name.clone(),
                value: cookie.value.clone(),
                path: Some(cookie.path.clone()),
                domain: Some(cookie.domain.clone()),
                expires: request_date.and_then(|date| cookie.expires_date(date)),
                http_only: Some(cookie.http_only),
                secure: Some(cookie.secure),
                same_site: cookie.same_site.clone(),
                comment: None,
            })
            .collect()
    }

    fn response_body_size(&self) -> f64 {
        let request = self.request;
        if request.cached() || request.status_code() == 304 {
            return 0.0;
        }
        match request.response_headers_text() {
            Some(headers_text) => request.transfer_size() - headers_text.len() as f64,
            None => -1.0,
        }
    }

    /// Not meaningful for cache hits, 304s or partial (206) bodies.
    fn response_compression(&self) -> Option<f64> {
        let request = self.request;
        if request.cached() || matches!(request.status_code(), 206 | 304) {
            return None;
        }
        request.response_headers_text()?;
        Some(request.resource_size() - self.response_body_size())
    }
}

fn build_headers(headers: &[NameValue]) -> Vec<HarHeader> {
    headers
        .iter()
        .map(|header| HarHeader::new(&header.name, &header.value))
        .collect()
}

fn text_size(text: Option<&str>) -> f64 {
    text.map(|text| text.len() as f64).unwrap_or(-1.0)
}

fn strip_fragment(url: &str) -> &str {
    url.split_once('#').map(|(url, _)| url).unwrap_or(url)
}

/// `1.2.3.4:80` becomes `1.2.3.4`, `[::1]:443` becomes `::1`.
fn strip_port(address: &str) -> &str {
    if let Some(bracketed) = address.strip_prefix('[') {
        return bracketed.split_once(']').map(|(ip, _)| ip).unwrap_or(bracketed);
    }
    match address.rsplit_once(':') {
        Some((host, _)) if !host.contains(':') => host,
        _ => address,
    }
}

fn apply_content(content: &mut HarContent, data: ContentData) {
    let mut encoded = data.encoded;
    if let Some(text) = data.content {
        if !encoded && needs_encoding(&text) {
            content.text = Some(STANDARD.encode(text.as_bytes()));
            encoded = true;
        } else {
            content.text = Some(text);
        }
    }
    if encoded {
        content.encoding = Some("base64".to_string());
    }
}

fn needs_encoding(text: &str) -> bool {
    text.chars()
        .any(|c| c.is_control() && !matches!(c, '\t' | '\n' | '\r'))
}
