//! Export captured network requests as HAR.

use thiserror::Error;

mod builder;
mod live;
mod progress;
#[cfg(test)]
mod test_models;
mod timings;

pub use builder::HarBuilder;
pub use live::{ContentData, LiveCookie, LiveRequest, NameValue, PageLoad, ProgressSink};
pub use progress::CountingProgress;
pub use timings::build_timings;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Unable to read content of {url}")]
    Content {
        url: String,
        #[source]
        source: anyhow::Error,
    },
}
