//! End-to-end lakebook conversion: open package → parse outline → assign
//! paths → convert and write each document in outline order.
//!
//! The traversal is sequential, one document at a time; the package's
//! temporary workspace is released on every exit path. A write failure
//! aborts the run (partial output stays on disk, not rolled back); missing
//! bodies and failed image fetches only degrade the affected document.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use tracing::{info, instrument};

use lakeport_archive::Package;
use lakeport_assets::ImageFetcher;
use lakeport_shared::{ConvertOptions, DocNode, LakeportError, Node, Result};

use crate::outline::build_tree;
use crate::paths::assign_paths;
use crate::writer::write_doc;

/// Configuration for one lakebook conversion.
#[derive(Debug, Clone)]
pub struct ConvertConfig {
    /// Path to the `.lakebook` file.
    pub lakebook: PathBuf,
    /// Root directory the Markdown tree is written under.
    pub output_dir: PathBuf,
    /// Merged config-file/CLI options.
    pub options: ConvertOptions,
}

/// Summary of a completed conversion.
#[derive(Debug, Default)]
pub struct ConvertReport {
    /// Written `.md` paths, in outline order.
    pub written: Vec<PathBuf>,
    /// Images that could not be fetched; their documents keep the remote URL.
    pub skipped_images: Vec<SkippedImage>,
    /// Total elapsed time.
    pub elapsed: Duration,
}

/// One image left remote because its download failed.
#[derive(Debug, Clone)]
pub struct SkippedImage {
    /// The document file the image belongs to.
    pub doc: PathBuf,
    pub url: String,
    pub reason: String,
}

/// Progress callback for reporting conversion status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each document is written.
    fn doc_written(&self, stem: &str, current: usize, total: usize);
    /// Called when the conversion completes.
    fn done(&self, report: &ConvertReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn doc_written(&self, _stem: &str, _current: usize, _total: usize) {}
    fn done(&self, _report: &ConvertReport) {}
}

/// Convert a single lakebook into a Markdown tree.
///
/// Returns the ordered list of written paths (and the image failure report),
/// or the first fatal error. The extraction workspace is removed whether the
/// run succeeds or fails.
#[instrument(skip_all, fields(lakebook = %config.lakebook.display()))]
pub async fn convert_lakebook(
    config: &ConvertConfig,
    progress: &dyn ProgressReporter,
) -> Result<ConvertReport> {
    let start = Instant::now();

    progress.phase("Opening lakebook");
    let mut package = Package::open(&config.lakebook)?;

    progress.phase("Parsing outline");
    let entries = package.raw_outline()?;
    let mut tree = build_tree(entries);
    assign_paths(&mut tree, config.options.unique_suffix);

    let docs = collect_docs(&tree);
    info!(docs = docs.len(), "outline parsed");

    let fetcher = if config.options.download_images {
        Some(ImageFetcher::new(
            Duration::from_secs(config.options.image_timeout_secs),
            &config.options.image_referer,
        )?)
    } else {
        None
    };

    std::fs::create_dir_all(&config.output_dir)
        .map_err(|e| LakeportError::io(&config.output_dir, e))?;

    progress.phase("Converting documents");
    let mut report = ConvertReport::default();
    let total = docs.len();

    for (i, doc) in docs.iter().enumerate() {
        let html = package.body_of(&doc.url);
        let output = write_doc(
            doc,
            &html,
            &config.output_dir,
            fetcher.as_ref(),
            config.options.frontmatter,
        )
        .await?;

        progress.doc_written(&doc.rel_path_stem, i + 1, total);
        report
            .skipped_images
            .extend(output.skipped_images.into_iter().map(|f| SkippedImage {
                doc: output.path.clone(),
                url: f.url,
                reason: f.reason,
            }));
        report.written.push(output.path);
    }

    package.cleanup();

    report.elapsed = start.elapsed();
    info!(
        written = report.written.len(),
        skipped_images = report.skipped_images.len(),
        "conversion complete"
    );
    progress.done(&report);

    Ok(report)
}

/// Flatten the tree into document order (depth-first, as the outline lists
/// them).
fn collect_docs(nodes: &[Node]) -> Vec<DocNode> {
    let mut docs = Vec::new();
    collect_into(nodes, &mut docs);
    docs
}

fn collect_into(nodes: &[Node], docs: &mut Vec<DocNode>) {
    for node in nodes {
        match node {
            Node::Doc(doc) => docs.push(doc.clone()),
            Node::Group(group) => collect_into(&group.children, docs),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
