//! URL canonicalization helpers.
//!
//! Incoming module urls carry dev-server noise: `t=<ms>` cache-busting
//! stamps added after an HMR update and an `import` marker that forces a
//! re-import. Both are stripped before a url is used as an index key.

use std::path::Path;

use once_cell::sync::Lazy;
use path_clean::PathClean;
use regex::Regex;

/// Url prefix for files served straight from the file system.
pub const FS_PREFIX: &str = "/@fs/";

static TIMESTAMP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bt=\d{13}&?\b").unwrap());
static IMPORT_QUERY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\?|&)import=?(?:&|$)").unwrap());
static TRAILING_SEPARATOR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[?&]$").unwrap());
static CSS_LANG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\.(css|less|sass|scss|styl|stylus|pcss|postcss)($|\?)").unwrap()
});
static DIRECT_REQUEST_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\?|&)direct\b").unwrap());

/// Remove the HMR `t=<13 digit ms>` query parameter.
pub fn remove_timestamp_query(url: &str) -> String {
    let stripped = TIMESTAMP_RE.replace(url, "");
    TRAILING_SEPARATOR_RE.replace(&stripped, "").into_owned()
}

/// Remove the `import` marker query parameter.
pub fn remove_import_query(url: &str) -> String {
    let stripped = IMPORT_QUERY_RE.replace(url, "${1}");
    TRAILING_SEPARATOR_RE.replace(&stripped, "").into_owned()
}

/// Strip query and hash, leaving the file path part of a url or id.
pub fn clean_url(url: &str) -> &str {
    match url.find(['?', '#']) {
        Some(pos) => &url[..pos],
        None => url,
    }
}

/// Whether the request targets a style-language file.
pub fn is_css_request(url: &str) -> bool {
    CSS_LANG_RE.is_match(url)
}

/// Whether the request asks for the raw stylesheet (`?direct`) rather than
/// its script wrapper.
pub fn is_direct_css_request(url: &str) -> bool {
    is_css_request(url) && DIRECT_REQUEST_RE.is_match(url)
}

/// Extension of the last path segment including the dot, if any.
///
/// Dot-files (`.env`) and trailing dots have no extension.
pub fn extname(path: &str) -> Option<&str> {
    let name = path.rsplit('/').next().unwrap_or(path);
    match name.rfind('.') {
        Some(0) | None => None,
        Some(pos) if pos + 1 == name.len() => None,
        Some(pos) => Some(&name[pos..]),
    }
}

/// Url split into its pathname, search (`?..`) and hash (`#..`) parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UrlParts<'a> {
    pub pathname: &'a str,
    pub search: &'a str,
    pub hash: &'a str,
}

/// Split a url into [`UrlParts`]. Missing parts are empty strings.
pub fn split_url(url: &str) -> UrlParts<'_> {
    let (before_hash, hash) = match url.find('#') {
        Some(pos) => (&url[..pos], &url[pos..]),
        None => (url, ""),
    };
    let (pathname, search) = match before_hash.find('?') {
        Some(pos) => (&before_hash[..pos], &before_hash[pos..]),
        None => (before_hash, ""),
    };
    UrlParts {
        pathname,
        search,
        hash,
    }
}

/// Normalize a file path to forward slashes with `.`/`..` segments folded.
pub fn normalize_path(path: &str) -> String {
    let slashed = path.replace('\\', "/");
    Path::new(&slashed)
        .clean()
        .to_string_lossy()
        .replace('\\', "/")
}

/// Public url for a file that has no servable url of its own.
pub fn fs_url(file: &str) -> String {
    format!("{}{}", FS_PREFIX, file.trim_start_matches('/'))
}
