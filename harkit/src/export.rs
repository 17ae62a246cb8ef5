use clap::Parser;
use harkit_builder::{CountingProgress, HarBuilder};
use harkit_capture::prelude::*;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
pub struct ExportCommandConfig {
    #[clap(long("capture"))]
    /// Capture description to build the HAR from
    pub capture_file: PathBuf,

    #[clap(long("output"))]
    /// Where the HAR file is written
    pub output: PathBuf,

    #[clap(long)]
    /// Embed response bodies
    pub include_content: bool,
}

impl ExportCommandConfig {
    pub async fn run_export(&self) -> Result<(), anyhow::Error> {
        let capture = CaptureContainer::new(&self.capture_file).load_capture()?;
        let builder = match &capture.creator {
            Some(creator) => HarBuilder::with_creator(&creator.name, &creator.version),
            None => HarBuilder::new(),
        };

        let progress = CountingProgress::new();
        let document = builder
            .build(&capture.requests(), self.include_content, Some(&progress))
            .await?;

        tokio::fs::write(&self.output, document.to_json_pretty()?).await?;
        info!(
            entries = document.log.entries.len(),
            pages = document.log.pages.len(),
            "Wrote {:?} ({}/{} requests)",
            self.output,
            progress.done(),
            progress.total()
        );
        Ok(())
    }
}

#[tokio::test]
async fn test_export_capture() {
    let dir = tempfile::tempdir().unwrap();
    let capture_file = dir.path().join("capture.yaml");
    std::fs::write(
        &capture_file,
        r#"
pages:
  - id: "7"
    url: https://example.com/
    start-time: 1.0
    content-load-time: 1.5
    load-time: 2.0
requests:
  - url: https://example.com/#top
    page: "7"
    wall-time: 2024-03-01T10:00:00Z
    start-time: 1.0
    duration: 0.5
    status: 200
    status-text: OK
    mime-type: text/html
    remote-address: "93.184.216.34:443"
    connection-id: "12"
    body:
      data: "<p>hi</p>"
  - url: https://example.com/logo.png
    page: "7"
    wall-time: 2024-03-01T10:00:00.250Z
    start-time: 1.25
    duration: 0.25
    status: 200
    mime-type: image/png
    body:
      data: "iVBORw0KGgo="
    body-encoded: true
"#,
    )
    .unwrap();
    let output = dir.path().join("out.har");

    let command = ExportCommandConfig {
        capture_file,
        output: output.clone(),
        include_content: true,
    };
    command.run_export().await.unwrap();

    let written = std::fs::read(&output).unwrap();
    let document = harkit_format::decode_slice(&written).unwrap();
    let log = &document.log;

    assert_eq!("harkit", log.creator.name);
    assert_eq!(1, log.pages.len());
    assert_eq!("page_7", log.pages[0].id);
    assert_eq!(Some(500.0), log.pages[0].page_timings.on_content_load);

    assert_eq!(2, log.entries.len());
    let html = &log.entries[0];
    assert_eq!("https://example.com/", html.request.url);
    assert_eq!(Some("page_7".to_string()), html.pageref);
    assert_eq!(Some("93.184.216.34".to_string()), html.server_ip_address);
    assert_eq!(Some("12".to_string()), html.connection);
    assert_eq!(500.0, html.time);
    assert_eq!(Some("<p>hi</p>".to_string()), html.response.content.text);
    assert_eq!(None, html.response.content.encoding);

    let png = &log.entries[1];
    assert_eq!(Some("base64".to_string()), png.response.content.encoding);
    assert_eq!(
        250,
        (png.started_date_time - html.started_date_time).num_milliseconds()
    );
}
