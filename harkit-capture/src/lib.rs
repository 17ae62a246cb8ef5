//! Recorded network activity described in yaml, toml or json files, exposed
//! through the `LiveRequest` and `PageLoad` views the HAR builder consumes.

use anyhow::Result as AnyResult;
use glob::glob;
use harkit_builder::LiveRequest;
use requests::{MakeStatic, PageConfig, RequestConfig};
use serde::de::DeserializeOwned;
use std::{
    collections::HashMap,
    fs::read_to_string,
    path::{Path, PathBuf},
    sync::Arc,
};
use thiserror::Error;
use tracing::debug;

mod live;
mod requests;
mod user;

pub use live::{CapturePage, CaptureRequest};
pub use user::CreatorConfig;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Request {url} refers to unknown page {page}")]
    UnknownPage { url: String, page: String },
    #[error("Page {0} is declared more than once")]
    DuplicatePage(String),
    #[error("Unable to parse request url {url}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("Unsupported capture file {0:?}, expected yaml, toml or json")]
    UnsupportedFormat(PathBuf),
    #[error("A body needs exactly one of `data` or `file`")]
    InvalidBody,
}

pub struct CaptureContainer {
    root_capture_file: PathBuf,
    base_capture_dir: PathBuf,
}

#[derive(Debug)]
pub struct ParsedCapture {
    pub creator: Option<CreatorConfig>,
    pub page_count: usize,
    requests: Vec<Arc<CaptureRequest>>,
}

impl ParsedCapture {
    pub fn requests(&self) -> Vec<Arc<dyn LiveRequest>> {
        self.requests
            .iter()
            .map(|request| request.clone() as Arc<dyn LiveRequest>)
            .collect()
    }

    fn assemble(
        creator: Option<CreatorConfig>,
        page_configs: Vec<PageConfig>,
        request_configs: Vec<RequestConfig<String>>,
    ) -> Result<Self, CaptureError> {
        let mut pages: HashMap<String, Arc<CapturePage>> = HashMap::new();
        for page_config in page_configs {
            if pages.contains_key(&page_config.id) {
                return Err(CaptureError::DuplicatePage(page_config.id));
            }

            let main = match request_configs
                .iter()
                .find(|request| request.page.as_deref() == Some(page_config.id.as_str()))
            {
                Some(config) => Some(CaptureRequest::new(config.clone(), None)?),
                None => None,
            };

            let id = page_config.id.clone();
            pages.insert(id, Arc::new(CapturePage::new(page_config, main.as_ref())));
        }

        let mut requests = Vec::with_capacity(request_configs.len());
        for config in request_configs {
            let page = match &config.page {
                None => None,
                Some(id) => match pages.get(id) {
                    Some(page) => Some(page.clone()),
                    None => {
                        return Err(CaptureError::UnknownPage {
                            url: config.url.clone(),
                            page: id.clone(),
                        })
                    }
                },
            };
            requests.push(Arc::new(CaptureRequest::new(config, page)?));
        }

        Ok(Self {
            creator,
            page_count: pages.len(),
            requests,
        })
    }
}

impl CaptureContainer {
    pub fn new(root_capture_file: &Path) -> Self {
        let base_capture_dir = match root_capture_file.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        Self {
            root_capture_file: root_capture_file.to_path_buf(),
            base_capture_dir,
        }
    }

    pub fn load_capture(&self) -> AnyResult<ParsedCapture> {
        debug!("Loading root capture {:?}", self.root_capture_file);
        let parsed_root: user::CaptureRootConfig = parse_file(&self.root_capture_file)?;

        let mut parsed_requests = Vec::new();
        for request in &parsed_root.requests {
            parsed_requests.push(request.make_static(&self.base_capture_dir)?);
        }

        let mut request_paths: Vec<PathBuf> = Vec::new();
        for include in &parsed_root.include {
            let glob_path = format!("{}/{}", self.base_capture_dir.display(), include);

            debug!("Glob path: {}", glob_path);
            let mut found_files: Vec<PathBuf> = glob(&glob_path)?.filter_map(|x| x.ok()).collect();
            found_files.sort();
            request_paths.append(&mut found_files);
        }

        for request_file in request_paths {
            debug!("Loading dependent capture {:?}", request_file);
            let parsed: user::RequestsFile = parse_file(&request_file)?;
            let parent_folder = request_file.parent().unwrap_or(&self.base_capture_dir);

            for request in parsed.requests {
                parsed_requests.push(request.make_static(parent_folder)?);
            }
        }

        let capture =
            ParsedCapture::assemble(parsed_root.creator, parsed_root.pages, parsed_requests)?;
        debug!(
            "Loaded {} requests over {} pages",
            capture.requests.len(),
            capture.page_count
        );
        Ok(capture)
    }
}

fn parse_file<T: DeserializeOwned>(path: &Path) -> AnyResult<T> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    let contents = match extension.as_deref() {
        Some("yaml" | "yml" | "toml" | "json") => read_to_string(path)?,
        _ => return Err(CaptureError::UnsupportedFormat(path.to_path_buf()).into()),
    };

    let parsed = match extension.as_deref() {
        Some("toml") => toml::from_str(&contents)?,
        Some("json") => serde_json::from_str(&contents)?,
        _ => serde_yaml::from_str(&contents)?,
    };
    Ok(parsed)
}

pub mod prelude {
    pub use crate::{CaptureContainer, CaptureError, ParsedCapture};
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fs;

    const ROOT: &str = r#"
creator:
  name: recorder
  version: "2.1"
pages:
  - id: "1"
    url: https://example.com/
    start-time: 10.0
    content-load-time: 10.4
    load-time: 10.9
requests:
  - url: https://example.com/
    page: "1"
    wall-time: 2024-03-01T10:00:00Z
    start-time: 10.0
    duration: 0.3
    status: 200
    status-text: OK
    request-headers:
      Host: example.com
      Accept: "*/*"
    response-headers:
      Content-Type: text/html
    mime-type: text/html
    body:
      file: bodies/index.html
include:
  - "more/*.yaml"
"#;

    const MORE: &str = r#"
requests:
  - url: https://example.com/app.js?v=3
    page: "1"
    wall-time: 2024-03-01T10:00:00.100Z
    start-time: 10.1
    status: 200
    mime-type: application/javascript
    body:
      data: "console.log(1)"
"#;

    fn write_capture(dir: &Path) -> PathBuf {
        fs::create_dir_all(dir.join("bodies")).unwrap();
        fs::create_dir_all(dir.join("more")).unwrap();
        fs::write(dir.join("bodies/index.html"), "<html></html>").unwrap();
        fs::write(dir.join("more/app.yaml"), MORE).unwrap();
        let root = dir.join("capture.yaml");
        fs::write(&root, ROOT).unwrap();
        root
    }

    #[tokio::test]
    async fn test_load_capture() {
        let dir = tempfile::tempdir().unwrap();
        let root = write_capture(dir.path());

        let capture = CaptureContainer::new(&root).load_capture().unwrap();
        assert_eq!("recorder", capture.creator.as_ref().unwrap().name);
        assert_eq!(1, capture.page_count);

        let requests = capture.requests();
        assert_eq!(2, requests.len());

        let index = &requests[0];
        assert_eq!("GET", index.request_method());
        assert_eq!(
            vec!["Host", "Accept"],
            index
                .request_headers()
                .iter()
                .map(|h| h.name.as_str())
                .collect::<Vec<_>>()
        );
        assert_eq!(Some("text/html"), index.response_header_value("content-type"));
        assert_eq!(
            Some("<html></html>".to_string()),
            index.content_data().await.unwrap().content
        );

        let script = &requests[1];
        assert_eq!(
            Some(&[harkit_builder::NameValue::new("v", "3")][..]),
            script.query_parameters()
        );
        assert_eq!(-1.0, script.duration());
        assert_eq!("0", script.connection_id());

        let page_a = index.page_load().unwrap();
        let page_b = script.page_load().unwrap();
        assert!(Arc::ptr_eq(&page_a, &page_b));
        assert_eq!("https://example.com/", page_a.main_request().unwrap().url());
        assert!(page_a.main_request().unwrap().page_load().is_none());
    }

    #[test]
    fn test_json_capture() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("capture.json");
        fs::write(
            &root,
            r#"{"requests": [{"url": "http://localhost:8080/x", "wall-time": "2024-03-01T10:00:00Z",
                "response-headers": {"X-A": "1"}, "body": {"data": "x"}}]}"#,
        )
        .unwrap();

        let capture = CaptureContainer::new(&root).load_capture().unwrap();
        let requests = capture.requests();
        assert_eq!(1, requests.len());
        assert!(requests[0].page_load().is_none());
        assert_eq!(Some("1"), requests[0].response_header_value("x-a"));
        assert_eq!(0, capture.page_count);
    }

    #[test]
    fn test_unknown_page() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("capture.yaml");
        fs::write(
            &root,
            "requests:\n  - url: https://example.com/\n    page: missing\n    wall-time: 2024-03-01T10:00:00Z\n",
        )
        .unwrap();

        let err = CaptureContainer::new(&root).load_capture().unwrap_err();
        assert_eq!(
            "Request https://example.com/ refers to unknown page missing",
            err.to_string()
        );
    }

    #[test]
    fn test_duplicate_page() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("capture.yaml");
        fs::write(
            &root,
            "pages:\n  - id: a\n    url: https://a/\n  - id: a\n    url: https://b/\n",
        )
        .unwrap();

        let err = CaptureContainer::new(&root).load_capture().unwrap_err();
        assert_eq!("Page a is declared more than once", err.to_string());
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("capture.txt");
        fs::write(&root, "requests: []").unwrap();

        let err = CaptureContainer::new(&root).load_capture().unwrap_err();
        assert!(err.to_string().starts_with("Unsupported capture file"));
    }

    #[tokio::test]
    async fn test_binary_body_file_is_base64() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("logo.png"),
            [0x89, 0x50, 0x4e, 0x47, 0xff, 0xfe, 0x00],
        )
        .unwrap();
        let root = dir.path().join("capture.yaml");
        fs::write(
            &root,
            r#"
requests:
  - url: https://example.com/logo.png
    wall-time: 2024-03-01T10:00:00Z
    mime-type: image/png
    body:
      file: logo.png
"#,
        )
        .unwrap();

        let capture = CaptureContainer::new(&root).load_capture().unwrap();
        let content = capture.requests()[0].content_data().await.unwrap();
        assert!(content.encoded);
        assert_eq!(Some("iVBOR//+AA==".to_string()), content.content);
    }

    #[test]
    fn test_body_needs_data_or_file() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("capture.yaml");
        fs::write(
            &root,
            r#"
requests:
  - url: https://example.com/
    wall-time: 2024-03-01T10:00:00Z
    body: {}
"#,
        )
        .unwrap();

        let err = CaptureContainer::new(&root).load_capture().unwrap_err();
        assert_eq!("Unable to load body of https://example.com/", err.to_string());
        assert!(err
            .chain()
            .any(|cause| cause.to_string().starts_with("A body needs exactly one")));
    }
}
