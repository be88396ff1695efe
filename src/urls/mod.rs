//! Helpers for discovering and admitting external URLs referenced by bundled assets.
//!
//! Extraction and filtering live in separate submodules so the textual scan and the
//! allow-list rules can be tested independently. Both operate purely on strings.

mod extract;
mod filter;

pub use extract::{extract_external_urls, extract_json_urls, normalise_url};
pub use filter::{FilteredUrls, filter_urls, host_matches_domain};
