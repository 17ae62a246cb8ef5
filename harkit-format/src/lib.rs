//! Typed HAR 1.2 records.
//!
//! Decoding is strict about the parts a viewer needs (the entry list and the
//! page/entry start dates) and forgiving about descriptive metadata.

pub mod coerce;
mod decode;
mod errors;
mod import;
mod models;
mod timing;

pub use decode::{decode, decode_slice, decode_str};
pub use errors::FormatError;
pub use import::{reconstruct_timing, requests_from_log, ImportedPage, ImportedRequest};
pub use models::*;
pub use timing::ProtocolTiming;

/// HAR version written by this crate.
pub const HAR_VERSION: &str = "1.2";
