//! Image localization for converted documents.
//!
//! Discovers absolute image URLs in a document body, downloads them into a
//! per-directory `assets/` folder, and rewrites the Markdown to reference the
//! local copies. Every fetch is best-effort: a failed download leaves the
//! original remote URL in place and is reported back to the caller.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use reqwest::Client;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, ORIGIN, REFERER};
use scraper::{Html, Selector};
use tracing::{debug, warn};
use url::Url;

use lakeport_shared::{LakeportError, Result};

/// Browser user agent presented to the CDN; it rejects obvious bots.
const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Per-document mapping from remote image URL to local relative path
/// (`assets/<file>`), plus the URLs that could not be fetched.
#[derive(Debug, Default)]
pub struct DownloadOutcome {
    pub mapping: HashMap<String, String>,
    pub failures: Vec<ImageFailure>,
}

/// One image that stayed remote because its fetch failed.
#[derive(Debug, Clone)]
pub struct ImageFailure {
    pub url: String,
    pub reason: String,
}

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

/// Collect distinct absolute HTTP(S) image source URLs in first-occurrence
/// order. Relative, empty, and non-HTTP sources are ignored.
pub fn extract_image_urls(html: &str) -> Vec<String> {
    let doc = Html::parse_fragment(html);
    let img_sel = Selector::parse("img[src]").expect("valid selector");

    let mut urls = Vec::new();
    for img in doc.select(&img_sel) {
        let src = img.value().attr("src").unwrap_or("").trim();
        if (src.starts_with("http://") || src.starts_with("https://"))
            && !urls.iter().any(|u| u == src)
        {
            urls.push(src.to_string());
        }
    }
    urls
}

// ---------------------------------------------------------------------------
// Fetching
// ---------------------------------------------------------------------------

/// HTTP client configured to present as a browser request originating from
/// the export's source site.
pub struct ImageFetcher {
    client: Client,
}

impl ImageFetcher {
    /// Build a fetcher with the given per-request timeout and referring
    /// origin (the CDN validates `Referer`/`Origin`).
    pub fn new(timeout: Duration, referer: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("image/avif,image/webp,image/apng,image/*,*/*;q=0.8"),
        );
        let origin = referer.trim_end_matches('/');
        headers.insert(
            REFERER,
            HeaderValue::from_str(&format!("{origin}/"))
                .map_err(|e| LakeportError::Network(format!("invalid referer: {e}")))?,
        );
        headers.insert(
            ORIGIN,
            HeaderValue::from_str(origin)
                .map_err(|e| LakeportError::Network(format!("invalid origin: {e}")))?,
        );

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| LakeportError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client })
    }

    /// Download each URL into `assets_dir`, resolving file-name collisions
    /// with a numeric suffix before the extension.
    ///
    /// Failures are skipped (absent from the mapping) and reported in the
    /// outcome; they never abort the document.
    pub async fn download_all(&self, urls: &[String], assets_dir: &Path) -> Result<DownloadOutcome> {
        let mut outcome = DownloadOutcome::default();
        if urls.is_empty() {
            return Ok(outcome);
        }

        std::fs::create_dir_all(assets_dir).map_err(|e| LakeportError::io(assets_dir, e))?;

        for (index, url) in urls.iter().enumerate() {
            let name = resolve_collision(assets_dir, &local_basename(url, index));
            let dest = assets_dir.join(&name);

            match self.fetch(url).await {
                Ok(bytes) => {
                    std::fs::write(&dest, bytes).map_err(|e| LakeportError::io(&dest, e))?;
                    debug!(url, file = %name, "image localized");
                    outcome.mapping.insert(url.clone(), format!("assets/{name}"));
                }
                Err(e) => {
                    warn!(url, error = %e, "image fetch failed, keeping remote URL");
                    outcome.failures.push(ImageFailure {
                        url: url.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        Ok(outcome)
    }

    async fn fetch(&self, url: &str) -> std::result::Result<Vec<u8>, reqwest::Error> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }
}

// ---------------------------------------------------------------------------
// Naming
// ---------------------------------------------------------------------------

/// Derive a local file name from an image URL's final path segment.
///
/// Nameless or extensionless URLs fall back to a placeholder with a `.png`
/// default; illegal filesystem characters become underscores.
pub fn local_basename(url: &str, index: usize) -> String {
    let segment = Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut s| s.next_back().map(str::to_string))
        })
        .unwrap_or_default();

    let mut name = if segment.is_empty() {
        format!("image_{index}.png")
    } else if !segment.contains('.') {
        format!("{segment}_{index}.png")
    } else {
        segment
    };

    name = name
        .chars()
        .map(|c| match c {
            '\\' | '/' | '*' | '?' | ':' | '"' | '<' | '>' | '|' => '_',
            c => c,
        })
        .collect();

    if name.trim().is_empty() {
        name = format!("image_{index}.png");
    }
    name
}

/// Pick a file name not yet present in `dir`, inserting `_1`, `_2`, … before
/// the extension as needed.
fn resolve_collision(dir: &Path, base: &str) -> String {
    if !dir.join(base).exists() {
        return base.to_string();
    }

    let (stem, ext) = match base.rsplit_once('.') {
        Some((stem, ext)) => (stem, format!(".{ext}")),
        None => (base, String::new()),
    };

    let mut n = 1;
    loop {
        let candidate = format!("{stem}_{n}{ext}");
        if !dir.join(&candidate).exists() {
            return candidate;
        }
        n += 1;
    }
}

// ---------------------------------------------------------------------------
// Rewriting
// ---------------------------------------------------------------------------

/// Replace every mapped remote URL in the Markdown with its local path.
/// URLs are distinct strings, so replacement order does not matter.
pub fn rewrite_images(md: &str, mapping: &HashMap<String, String>) -> String {
    let mut result = md.to_string();
    for (url, local) in mapping {
        result = result.replace(url, local);
    }
    result
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
