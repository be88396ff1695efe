use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;
use url::Url;

fn url_pattern() -> &'static Regex {
  static PATTERN: OnceLock<Regex> = OnceLock::new();
  PATTERN.get_or_init(|| Regex::new(r#"https?://[^\s'"]+"#).expect("invalid url regex"))
}

/// Collect every distinct absolute `http(s)` URL mentioned in `text`.
///
/// Matches are runs of non-whitespace, non-quote characters following the scheme. Each match
/// is normalised through [`normalise_url`]; matches that fail to parse are skipped.
pub fn extract_external_urls(text: &str) -> BTreeSet<String> {
  url_pattern()
    .find_iter(text)
    .filter_map(|candidate| normalise_url(candidate.as_str()))
    .collect()
}

/// Collect the URLs mentioned in the string keys and values of a JSON document.
///
/// Strings are decoded before scanning, so escaped quotes and `\/` sequences do not leak into
/// the matches. Text that is not valid JSON is scanned as-is.
pub fn extract_json_urls(text: &str) -> BTreeSet<String> {
  let Ok(document) = serde_json::from_str::<Value>(text) else {
    return extract_external_urls(text);
  };
  let mut urls = BTreeSet::new();
  collect_string_urls(&document, &mut urls);
  urls
}

fn collect_string_urls(value: &Value, urls: &mut BTreeSet<String>) {
  match value {
    Value::String(text) => urls.extend(extract_external_urls(text)),
    Value::Array(items) => {
      for item in items {
        collect_string_urls(item, urls);
      }
    }
    Value::Object(entries) => {
      for (key, item) in entries {
        urls.extend(extract_external_urls(key));
        collect_string_urls(item, urls);
      }
    }
    _ => {}
  }
}

/// Reduce a URL to `scheme://host[:port]/path`, dropping query string and fragment.
///
/// Returns `None` when the value is not a valid absolute URL with a host.
pub fn normalise_url(value: &str) -> Option<String> {
  let parsed = Url::parse(value).ok()?;
  parsed.host_str()?;
  Some(format!(
    "{}{}",
    parsed.origin().ascii_serialization(),
    parsed.path()
  ))
}
