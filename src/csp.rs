//! Content-Security-Policy header synthesis from audited assets and external URLs.

use std::fmt;

const SELF_SOURCE: &str = "'self'";
const DATA_SOURCE: &str = "data:";

const IMAGE_EXTENSIONS: &[&str] = &[".png", ".jpg", ".gif", ".svg"];
const FONT_EXTENSIONS: &[&str] = &[".woff", ".woff2", ".ttf", ".otf"];

/// Resource category a source token is filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
  /// `script-src`
  Script,
  /// `style-src`
  Style,
  /// `img-src`
  Image,
  /// `font-src`
  Font,
  /// Anything else; only external URLs land here (`connect-src`).
  Other,
}

impl ResourceKind {
  /// Classify a file name or URL by its extension. The first matching rule wins.
  pub fn classify(value: &str) -> Self {
    if value.ends_with(".js") {
      Self::Script
    } else if value.ends_with(".css") {
      Self::Style
    } else if IMAGE_EXTENSIONS.iter().any(|ext| value.ends_with(ext)) {
      Self::Image
    } else if FONT_EXTENSIONS.iter().any(|ext| value.ends_with(ext)) {
      Self::Font
    } else {
      Self::Other
    }
  }
}

/// Ordered directive set backing a generated header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CspDirectives {
  default_src: Vec<String>,
  script_src: Vec<String>,
  style_src: Vec<String>,
  img_src: Vec<String>,
  font_src: Vec<String>,
  connect_src: Vec<String>,
}

impl Default for CspDirectives {
  fn default() -> Self {
    Self {
      default_src: vec![SELF_SOURCE.to_string()],
      script_src: vec![SELF_SOURCE.to_string()],
      style_src: vec![SELF_SOURCE.to_string()],
      img_src: vec![SELF_SOURCE.to_string(), DATA_SOURCE.to_string()],
      font_src: vec![SELF_SOURCE.to_string()],
      connect_src: vec![SELF_SOURCE.to_string()],
    }
  }
}

impl CspDirectives {
  /// Add a bundled asset. Scripts and styles are referenced by nonce; images and fonts by
  /// name. Assets of any other kind are ignored.
  pub fn add_asset(&mut self, asset: &str) {
    match ResourceKind::classify(asset) {
      ResourceKind::Script => self.script_src.push(format!("'nonce-{asset}'")),
      ResourceKind::Style => self.style_src.push(format!("'nonce-{asset}'")),
      ResourceKind::Image => self.img_src.push(asset.to_string()),
      ResourceKind::Font => self.font_src.push(asset.to_string()),
      ResourceKind::Other => {}
    }
  }

  /// Add an admitted external URL verbatim under the directive matching its extension.
  pub fn add_external_url(&mut self, url: &str) {
    let target = match ResourceKind::classify(url) {
      ResourceKind::Script => &mut self.script_src,
      ResourceKind::Style => &mut self.style_src,
      ResourceKind::Image => &mut self.img_src,
      ResourceKind::Font => &mut self.font_src,
      ResourceKind::Other => &mut self.connect_src,
    };
    target.push(url.to_string());
  }

  /// Directive names paired with their source tokens, in header order.
  pub fn entries(&self) -> [(&'static str, &[String]); 6] {
    [
      ("default-src", &self.default_src),
      ("script-src", &self.script_src),
      ("style-src", &self.style_src),
      ("img-src", &self.img_src),
      ("font-src", &self.font_src),
      ("connect-src", &self.connect_src),
    ]
  }
}

impl fmt::Display for CspDirectives {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (position, (name, tokens)) in self.entries().into_iter().enumerate() {
      if position > 0 {
        f.write_str("; ")?;
      }
      f.write_str(name)?;
      for token in tokens {
        write!(f, " {token}")?;
      }
    }
    Ok(())
  }
}

/// Render a `Content-Security-Policy` header value.
///
/// Tokens follow the iteration order of the inputs, so pass ordered collections for a
/// reproducible header.
pub fn generate_csp_header<'a, A, U>(assets: A, external_urls: U) -> String
where
  A: IntoIterator<Item = &'a String>,
  U: IntoIterator<Item = &'a String>,
{
  let mut directives = CspDirectives::default();
  for asset in assets {
    directives.add_asset(asset);
  }
  for url in external_urls {
    directives.add_external_url(url);
  }
  directives.to_string()
}
