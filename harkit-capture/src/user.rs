use crate::requests::{BodyData, PageConfig, RequestConfig};
use serde::{Deserialize, Serialize};

/// The root of a capture description.
#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "kebab-case")]
pub struct CaptureRootConfig {
    #[serde(default)]
    pub creator: Option<CreatorConfig>,

    #[serde(default)]
    pub pages: Vec<PageConfig>,

    #[serde(default)]
    pub requests: Vec<RequestConfig<BodyData>>,

    /// Globs, relative to the root file, of more files holding `requests`.
    #[serde(default)]
    pub include: Vec<String>,
}

/// A file pulled in through `include`.
#[derive(Serialize, Deserialize, Debug)]
pub struct RequestsFile {
    #[serde(default)]
    pub requests: Vec<RequestConfig<BodyData>>,
}

/// Name and version written as the HAR `creator`.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CreatorConfig {
    pub name: String,
    pub version: String,
}
