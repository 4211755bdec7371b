pub mod config;
pub mod converter;
pub mod error;
pub mod escape;
pub mod extractor;
pub mod history;
pub mod sentence;
pub mod window;

/// Label reserved for sentence boundaries, both on padding positions and on
/// the trailing marker of every sentence.
pub const BOUNDARY: &str = "__BOS_EOS__";

const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn get_version() -> &'static str {
    VERSION
}
