//! Per-document Markdown output.
//!
//! Converts one document body, localizes its images next to the output file,
//! makes sure the text opens with a title heading, and persists it under the
//! node's assigned path stem.

use std::path::{Path, PathBuf};

use tracing::debug;

use lakeport_assets::{ImageFailure, ImageFetcher, extract_image_urls, rewrite_images};
use lakeport_shared::{DocNode, LakeportError, Result};

/// Name of the per-directory image folder.
const ASSETS_DIR: &str = "assets";

/// Result of writing a single document.
#[derive(Debug)]
pub struct DocOutput {
    /// Path of the written `.md` file.
    pub path: PathBuf,
    /// Images that stayed remote because their fetch failed.
    pub skipped_images: Vec<ImageFailure>,
}

/// Convert `html` and write it to `output_root / rel_path_stem + ".md"`.
///
/// Passing `fetcher: None` disables image download entirely; the Markdown
/// then keeps every remote URL. Write failures are fatal to the run.
pub async fn write_doc(
    node: &DocNode,
    html: &str,
    output_root: &Path,
    fetcher: Option<&ImageFetcher>,
    frontmatter: bool,
) -> Result<DocOutput> {
    debug_assert!(!node.rel_path_stem.is_empty(), "paths must be assigned first");

    let md_path = output_root.join(format!("{}.md", node.rel_path_stem));
    let parent = md_path.parent().unwrap_or(output_root);
    std::fs::create_dir_all(parent).map_err(|e| LakeportError::io(parent, e))?;

    let mut md = lakeport_markdown::convert(html)?;
    let mut skipped_images = Vec::new();

    if let Some(fetcher) = fetcher {
        let urls = extract_image_urls(html);
        if !urls.is_empty() {
            let outcome = fetcher.download_all(&urls, &parent.join(ASSETS_DIR)).await?;
            md = rewrite_images(&md, &outcome.mapping);
            skipped_images = outcome.failures;
        }
    }

    md = ensure_title_heading(&md, &node.title);
    if frontmatter {
        md = format!("{}{md}", frontmatter_block(&node.title));
    }

    std::fs::write(&md_path, md).map_err(|e| LakeportError::io(&md_path, e))?;
    debug!(path = %md_path.display(), "document written");

    Ok(DocOutput {
        path: md_path,
        skipped_images,
    })
}

/// Prepend a `# title` heading unless the text already starts with one.
pub fn ensure_title_heading(md: &str, title: &str) -> String {
    let md = md.trim();
    if md.is_empty() {
        format!("# {title}\n")
    } else if md.starts_with('#') {
        format!("{md}\n")
    } else {
        format!("# {title}\n\n{md}\n")
    }
}

/// Minimal YAML frontmatter carrying the document title.
fn frontmatter_block(title: &str) -> String {
    format!("---\ntitle: \"{}\"\n---\n\n", escape_yaml_string(title))
}

/// Escape special characters in a YAML double-quoted scalar.
fn escape_yaml_string(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace(['\n', '\r'], " ")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn node(title: &str, stem: &str) -> DocNode {
        let mut n = DocNode::new(title, 1, "u1", "url1");
        n.rel_path_stem = stem.to_string();
        n
    }

    #[test]
    fn heading_prepended_when_missing() {
        assert_eq!(
            ensure_title_heading("plain text", "My Doc"),
            "# My Doc\n\nplain text\n"
        );
    }

    #[test]
    fn heading_kept_when_present() {
        assert_eq!(
            ensure_title_heading("## Already\n\nbody", "My Doc"),
            "## Already\n\nbody\n"
        );
    }

    #[test]
    fn empty_body_becomes_bare_heading() {
        assert_eq!(ensure_title_heading("", "My Doc"), "# My Doc\n");
        assert_eq!(ensure_title_heading("  \n ", "My Doc"), "# My Doc\n");
    }

    #[test]
    fn frontmatter_escapes_quotes_and_newlines() {
        let block = frontmatter_block("He said \"hi\"\nand left");
        assert_eq!(block, "---\ntitle: \"He said \\\"hi\\\" and left\"\n---\n\n");
    }

    #[tokio::test]
    async fn write_doc_creates_parents_and_file() {
        let dir = tempfile::tempdir().unwrap();
        let n = node("Intro", "Guides/Basics/Intro");

        let out = write_doc(&n, "<p>hello</p>", dir.path(), None, false)
            .await
            .unwrap();

        assert_eq!(out.path, dir.path().join("Guides/Basics/Intro.md"));
        let content = std::fs::read_to_string(&out.path).unwrap();
        assert!(content.starts_with("# Intro\n"));
        assert!(content.contains("hello"));
        assert!(out.skipped_images.is_empty());
    }

    #[tokio::test]
    async fn write_doc_with_frontmatter() {
        let dir = tempfile::tempdir().unwrap();
        let n = node("Intro", "Intro");

        let out = write_doc(&n, "<h1>Intro</h1><p>x</p>", dir.path(), None, true)
            .await
            .unwrap();

        let content = std::fs::read_to_string(&out.path).unwrap();
        assert!(content.starts_with("---\ntitle: \"Intro\"\n---\n\n# Intro"));
    }

    #[tokio::test]
    async fn write_doc_without_download_keeps_remote_urls() {
        let dir = tempfile::tempdir().unwrap();
        let n = node("Pics", "Pics");
        let html = r#"<p><img src="https://cdn.example.com/p/q.jpg"></p>"#;

        let out = write_doc(&n, html, dir.path(), None, false).await.unwrap();

        let content = std::fs::read_to_string(&out.path).unwrap();
        assert!(content.contains("https://cdn.example.com/p/q.jpg"));
        assert!(!dir.path().join("assets").exists());
    }

    #[tokio::test]
    async fn write_doc_localizes_fetched_images() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/p/q.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"img".to_vec()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let url = format!("{}/p/q.jpg", server.uri());
        let html = format!(r#"<p>pic:</p><img src="{url}">"#);
        let fetcher = ImageFetcher::new(std::time::Duration::from_secs(5), &server.uri()).unwrap();

        let out = write_doc(&node("Pics", "Pics"), &html, dir.path(), Some(&fetcher), false)
            .await
            .unwrap();

        let content = std::fs::read_to_string(&out.path).unwrap();
        assert!(content.contains("assets/q.jpg"));
        assert!(!content.contains(&url));
        assert!(dir.path().join("assets/q.jpg").exists());
        assert!(out.skipped_images.is_empty());
    }

    #[tokio::test]
    async fn write_doc_reports_failed_images_and_keeps_urls() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gone.png"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let url = format!("{}/gone.png", server.uri());
        let html = format!(r#"<img src="{url}">"#);
        let fetcher = ImageFetcher::new(std::time::Duration::from_secs(5), &server.uri()).unwrap();

        let out = write_doc(&node("Pics", "Pics"), &html, dir.path(), Some(&fetcher), false)
            .await
            .unwrap();

        let content = std::fs::read_to_string(&out.path).unwrap();
        assert!(content.contains(&url));
        assert_eq!(out.skipped_images.len(), 1);
        assert_eq!(out.skipped_images[0].url, url);
    }

    #[tokio::test]
    async fn download_toggle_is_noop_without_images() {
        let dir = tempfile::tempdir().unwrap();
        let html = "<h2>Section</h2><p>no pictures here</p>";

        let disabled = write_doc(&node("Doc", "off/Doc"), html, dir.path(), None, false)
            .await
            .unwrap();

        let fetcher = ImageFetcher::new(std::time::Duration::from_secs(1), "https://www.yuque.com")
            .unwrap();
        let enabled = write_doc(&node("Doc", "on/Doc"), html, dir.path(), Some(&fetcher), false)
            .await
            .unwrap();

        assert_eq!(
            std::fs::read_to_string(&disabled.path).unwrap(),
            std::fs::read_to_string(&enabled.path).unwrap()
        );
    }

    #[tokio::test]
    async fn write_doc_empty_body_writes_title_only() {
        let dir = tempfile::tempdir().unwrap();
        let n = node("Ghost", "Ghost");

        let out = write_doc(&n, "", dir.path(), None, false).await.unwrap();

        assert_eq!(std::fs::read_to_string(&out.path).unwrap(), "# Ghost\n");
    }
}
