use std::collections::BTreeSet;

use url::Url;

use crate::models::AllowList;

/// Partition of a URL batch into admitted and rejected URLs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilteredUrls {
  /// URLs admitted by an exemption or the allow-list.
  pub kept: BTreeSet<String>,
  /// URLs that matched no admission rule.
  pub removed: BTreeSet<String>,
}

/// Split `urls` into kept and removed sets.
///
/// A URL is kept when it is exempt, listed verbatim in the allow-list, or hosted on an allowed
/// domain or one of its subdomains. URLs whose host cannot be parsed are removed.
pub fn filter_urls<'a, I>(urls: I, exempt: &BTreeSet<String>, allow: &AllowList) -> FilteredUrls
where
  I: IntoIterator<Item = &'a String>,
{
  let mut result = FilteredUrls::default();

  for url in urls {
    if is_admitted(url, exempt, allow) {
      result.kept.insert(url.clone());
    } else {
      result.removed.insert(url.clone());
    }
  }

  result
}

fn is_admitted(url: &str, exempt: &BTreeSet<String>, allow: &AllowList) -> bool {
  if exempt.contains(url) || allow.urls.contains(url) {
    return true;
  }

  let Some(host) = Url::parse(url)
    .ok()
    .and_then(|parsed| parsed.host_str().map(str::to_string))
  else {
    return false;
  };

  allow
    .domains
    .iter()
    .any(|domain| host_matches_domain(&host, domain))
}

/// Returns `true` when `host` equals `domain` or is a dot-separated subdomain of it.
pub fn host_matches_domain(host: &str, domain: &str) -> bool {
  if host == domain {
    return true;
  }

  host
    .strip_suffix(domain)
    .is_some_and(|prefix| prefix.ends_with('.'))
}
