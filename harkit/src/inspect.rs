use clap::Parser;
use harkit_format::{decode_slice, HarDocument};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser, Debug)]
pub struct InspectCommandConfig {
    #[clap(long("har"))]
    /// Input HAR file
    pub har_file: PathBuf,

    #[clap(long)]
    /// Print the normalized document to stdout
    pub json: bool,
}

#[derive(Serialize, Debug, PartialEq)]
pub struct HarSummary {
    pub version: String,
    pub creator: String,
    pub pages: usize,
    pub entries: usize,
    pub total_bytes: f64,
}

impl InspectCommandConfig {
    pub async fn run_inspect(&self) -> Result<(), anyhow::Error> {
        let document = read_har(&self.har_file).await?;
        let summary = summarize(&document);

        info!(
            version = %summary.version,
            creator = %summary.creator,
            pages = summary.pages,
            entries = summary.entries,
            total_bytes = summary.total_bytes,
            "Decoded {:?}",
            self.har_file
        );

        if self.json {
            println!("{}", document.to_json_pretty()?);
        }
        Ok(())
    }
}

pub async fn read_har(path: &Path) -> Result<HarDocument, anyhow::Error> {
    let contents = tokio::fs::read(path).await?;
    Ok(decode_slice(&contents)?)
}

/// Bytes on the wire, falling back to the body size when the transfer size
/// was not recorded.
pub fn summarize(document: &HarDocument) -> HarSummary {
    let log = &document.log;
    let total_bytes = log
        .entries
        .iter()
        .map(|entry| match entry.response.transfer_size {
            Some(size) if size >= 0.0 => size,
            _ => entry.response.body_size.max(0.0),
        })
        .sum();

    HarSummary {
        version: log.version.clone(),
        creator: format!("{} {}", log.creator.name, log.creator.version),
        pages: log.pages.len(),
        entries: log.entries.len(),
        total_bytes,
    }
}

#[cfg(test)]
fn entry(started: &str, response: serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "startedDateTime": started,
        "time": 5,
        "request": {"method": "GET", "url": "https://example.com/", "headersSize": -1, "bodySize": 0},
        "response": response,
        "timings": {"send": 1, "wait": 2, "receive": 2}
    })
}

#[test]
fn test_summarize() {
    let content = serde_json::json!({"size": 10, "mimeType": "text/plain"});
    let raw = serde_json::json!({"log": {
        "version": "1.2",
        "creator": {"name": "tool", "version": "3"},
        "pages": [{"id": "p", "title": "t", "startedDateTime": "2024-01-01T00:00:00Z"}],
        "entries": [
            entry("2024-01-01T00:00:00Z", serde_json::json!({
                "status": 200, "content": content, "headersSize": -1,
                "bodySize": 100, "_transferSize": 300
            })),
            entry("2024-01-01T00:00:01Z", serde_json::json!({
                "status": 200, "content": content, "headersSize": -1, "bodySize": 40
            })),
            entry("2024-01-01T00:00:02Z", serde_json::json!({
                "status": 200, "content": content, "headersSize": -1, "bodySize": -1
            })),
        ]
    }});
    let document = harkit_format::decode(&raw).unwrap();

    assert_eq!(
        HarSummary {
            version: "1.2".to_string(),
            creator: "tool 3".to_string(),
            pages: 1,
            entries: 3,
            total_bytes: 340.0,
        },
        summarize(&document)
    );
}

#[tokio::test]
async fn test_read_har_reports_decode_errors() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.har");
    std::fs::write(&path, r#"{"log": {"entries": {}}}"#).unwrap();

    let err = read_har(&path).await.unwrap_err();
    assert_eq!("log.entries is expected to be an array", err.to_string());
}
