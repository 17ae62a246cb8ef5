use clap::{Parser, ValueEnum};
use harkit_format::{requests_from_log, ImportedRequest};
use std::path::PathBuf;
use tracing::info;

#[derive(ValueEnum, Clone, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Yaml,
    Json,
}

#[derive(Parser, Debug)]
pub struct ImportCommandConfig {
    #[clap(long("har"))]
    /// Input HAR file
    pub har_file: PathBuf,

    #[clap(long, value_enum, default_value_t = OutputFormat::Yaml)]
    /// How the timeline is printed
    pub format: OutputFormat,
}

impl ImportCommandConfig {
    pub async fn run_import(&self) -> Result<(), anyhow::Error> {
        let document = crate::inspect::read_har(&self.har_file).await?;
        let requests = requests_from_log(&document.log);
        info!("Imported {} requests from {:?}", requests.len(), self.har_file);

        println!("{}", render(&requests, &self.format)?);
        Ok(())
    }
}

fn render(requests: &[ImportedRequest], format: &OutputFormat) -> Result<String, anyhow::Error> {
    let rendered = match format {
        OutputFormat::Yaml => serde_yaml::to_string(requests)?,
        OutputFormat::Json => serde_json::to_string_pretty(requests)?,
    };
    Ok(rendered)
}

#[test]
fn test_render_json() {
    let requests = vec![ImportedRequest {
        method: "GET".to_string(),
        url: "https://example.com/".to_string(),
        status: 200.0,
        mime_type: "text/html".to_string(),
        page: None,
        issue_time: 1.5,
        end_time: 2.0,
        resource_size: 10.0,
        transfer_size: 20.0,
        timing: Default::default(),
    }];

    let rendered: serde_json::Value =
        serde_json::from_str(&render(&requests, &OutputFormat::Json).unwrap()).unwrap();
    assert_eq!("GET", rendered[0]["method"]);
    assert_eq!(1.5, rendered[0]["issueTime"]);
    assert_eq!(-1.0, rendered[0]["timing"]["dnsStart"]);

    let yaml = render(&requests, &OutputFormat::Yaml).unwrap();
    assert!(yaml.contains("mimeType: text/html"));
}
