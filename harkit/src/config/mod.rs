mod cli;
mod logging;

pub use cli::{Opts, SubCommands};
pub use logging::*;
