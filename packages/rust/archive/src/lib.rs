//! `.lakebook` package access.
//!
//! A lakebook is a tar archive (optionally gzip-compressed) that unpacks to a
//! single knowledge-base root directory containing:
//! - `$meta.json` — JSON whose string-valued `meta` field is itself JSON with
//!   `book.tocYml`, a YAML outline of the book
//! - `{url}.json` — one per document, with the HTML body at `doc.body`
//!
//! [`Package`] owns a temporary extraction workspace for the lifetime of the
//! conversion run and removes it on drop, on every exit path.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use serde::Deserialize;
use tempfile::TempDir;
use tracing::{debug, warn};

use lakeport_shared::{LakeportError, OutlineEntry, RawTocItem, Result};

/// Manifest file expected at the knowledge-base root.
const META_FILE: &str = "$meta.json";

/// `$meta.json` top level: `meta` is a JSON-encoded string.
#[derive(Debug, Deserialize)]
struct MetaFile {
    meta: String,
}

/// The decoded `meta` payload; only the outline is of interest.
#[derive(Debug, Deserialize)]
struct MetaInner {
    book: BookMeta,
}

#[derive(Debug, Deserialize)]
struct BookMeta {
    #[serde(rename = "tocYml", default)]
    toc_yml: String,
}

/// Per-document resource: `{url}.json` with the body nested under `doc`.
#[derive(Debug, Deserialize)]
struct DocFile {
    #[serde(default)]
    doc: Option<DocInner>,
}

#[derive(Debug, Deserialize)]
struct DocInner {
    #[serde(default)]
    body: Option<String>,
}

// ---------------------------------------------------------------------------
// Package
// ---------------------------------------------------------------------------

/// An opened lakebook, extracted into an exclusively-owned temp workspace.
#[derive(Debug)]
pub struct Package {
    workspace: Option<TempDir>,
    root: PathBuf,
}

impl Package {
    /// Extract `path` into a fresh temporary workspace and locate the
    /// knowledge-base root.
    ///
    /// Fails with [`LakeportError::PackageNotFound`] before any extraction if
    /// the path does not exist, and with [`LakeportError::MalformedPackage`]
    /// if the extracted content has no `$meta.json` (the workspace is
    /// released before the error surfaces).
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(LakeportError::PackageNotFound {
                path: path.to_path_buf(),
            });
        }

        let workspace = tempfile::Builder::new()
            .prefix("lakebook_")
            .tempdir()
            .map_err(|e| LakeportError::io("<tempdir>", e))?;

        extract_tar(path, workspace.path())?;

        let root = locate_root(workspace.path())?;
        if !root.join(META_FILE).exists() {
            // workspace dropped here, removing the extracted content
            return Err(LakeportError::malformed(format!(
                "no {META_FILE} in extracted archive"
            )));
        }

        debug!(root = %root.display(), "lakebook extracted");

        Ok(Self {
            workspace: Some(workspace),
            root,
        })
    }

    /// The knowledge-base root directory (where `$meta.json` lives).
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Read the manifest and parse the embedded `tocYml` outline.
    pub fn raw_outline(&self) -> Result<Vec<OutlineEntry>> {
        let meta_path = self.root.join(META_FILE);
        let content = std::fs::read_to_string(&meta_path)
            .map_err(|e| LakeportError::io(&meta_path, e))?;

        let meta: MetaFile = serde_json::from_str(&content)
            .map_err(|e| LakeportError::malformed(format!("invalid {META_FILE}: {e}")))?;
        let inner: MetaInner = serde_json::from_str(&meta.meta)
            .map_err(|e| LakeportError::malformed(format!("invalid meta payload: {e}")))?;

        parse_toc_yml(&inner.book.toc_yml)
    }

    /// Read the HTML body of the document stored as `{url}.json`.
    ///
    /// A missing or unreadable resource yields an empty body rather than
    /// aborting the run.
    pub fn body_of(&self, url: &str) -> String {
        let path = self.root.join(format!("{url}.json"));
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return String::new(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "unreadable document resource");
                return String::new();
            }
        };

        match serde_json::from_str::<DocFile>(&content) {
            Ok(doc) => doc.doc.and_then(|d| d.body).unwrap_or_default(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "malformed document resource");
                String::new()
            }
        }
    }

    /// Remove the temporary workspace now instead of waiting for drop.
    /// Idempotent.
    pub fn cleanup(&mut self) {
        if let Some(workspace) = self.workspace.take() {
            let path = workspace.path().to_path_buf();
            if let Err(e) = workspace.close() {
                warn!(path = %path.display(), error = %e, "failed to remove workspace");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Extraction helpers
// ---------------------------------------------------------------------------

/// Unpack a tar archive, transparently handling gzip compression.
fn extract_tar(path: &Path, dest: &Path) -> Result<()> {
    let mut file = File::open(path).map_err(|e| LakeportError::io(path, e))?;

    // Sniff the gzip magic rather than trusting the file extension.
    let mut magic = [0u8; 2];
    let n = file.read(&mut magic).map_err(|e| LakeportError::io(path, e))?;
    let file = File::open(path).map_err(|e| LakeportError::io(path, e))?;

    let reader: Box<dyn Read> = if n == 2 && magic == [0x1f, 0x8b] {
        Box::new(GzDecoder::new(file))
    } else {
        Box::new(file)
    };

    tar::Archive::new(reader)
        .unpack(dest)
        .map_err(|e| LakeportError::malformed(format!("failed to unpack archive: {e}")))
}

/// Find the knowledge-base root inside the workspace: the single top-level
/// directory if the archive has a wrapping directory, else the workspace.
fn locate_root(workspace: &Path) -> Result<PathBuf> {
    let entries: Vec<PathBuf> = std::fs::read_dir(workspace)
        .map_err(|e| LakeportError::io(workspace, e))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .collect();

    match entries.as_slice() {
        [] => Err(LakeportError::malformed("archive is empty")),
        [single] if single.is_dir() => Ok(single.clone()),
        _ => Ok(workspace.to_path_buf()),
    }
}

/// Parse the YAML outline text into normalized entries.
///
/// Real exports have been seen with a sequence, a single mapping, or nothing
/// at all in `tocYml`.
fn parse_toc_yml(toc_yml: &str) -> Result<Vec<OutlineEntry>> {
    let value: serde_yaml::Value = serde_yaml::from_str(toc_yml)
        .map_err(|e| LakeportError::malformed(format!("invalid tocYml: {e}")))?;

    let items: Vec<RawTocItem> = match value {
        serde_yaml::Value::Null => Vec::new(),
        serde_yaml::Value::Sequence(_) => serde_yaml::from_value(value)
            .map_err(|e| LakeportError::malformed(format!("invalid tocYml entries: {e}")))?,
        other => vec![
            serde_yaml::from_value(other)
                .map_err(|e| LakeportError::malformed(format!("invalid tocYml entry: {e}")))?,
        ],
    };

    Ok(items.into_iter().map(OutlineEntry::from).collect())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use lakeport_shared::OutlineKind;

    const TOC_YML: &str = "\
- type: META
- type: TITLE
  level: 0
  title: Guides
- type: DOC
  level: 1
  title: Intro
  uuid: aefApMTk01
  url: intro
";

    /// Build a lakebook in `dir` with the given inner files, wrapped in a
    /// `book/` directory like real exports.
    fn make_lakebook(dir: &Path, gzip: bool, toc_yml: &str, with_meta: bool) -> PathBuf {
        let staging = dir.join("staging");
        std::fs::create_dir_all(&staging).unwrap();

        if with_meta {
            let inner = serde_json::json!({ "book": { "tocYml": toc_yml } }).to_string();
            let meta = serde_json::json!({ "meta": inner }).to_string();
            std::fs::write(staging.join("$meta.json"), meta).unwrap();
        }

        let doc = serde_json::json!({ "doc": { "body": "<p>hello</p>" } }).to_string();
        std::fs::write(staging.join("intro.json"), doc).unwrap();

        let archive_path = dir.join(if gzip { "book.lakebook" } else { "book.tar" });
        let file = File::create(&archive_path).unwrap();

        if gzip {
            let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
            let mut builder = tar::Builder::new(encoder);
            builder.append_dir_all("book", &staging).unwrap();
            builder.into_inner().unwrap().finish().unwrap().flush().unwrap();
        } else {
            let mut builder = tar::Builder::new(file);
            builder.append_dir_all("book", &staging).unwrap();
            builder.into_inner().unwrap().flush().unwrap();
        }

        archive_path
    }

    #[test]
    fn open_missing_path_fails_before_extraction() {
        let err = Package::open("/nonexistent/book.lakebook").unwrap_err();
        assert!(matches!(err, LakeportError::PackageNotFound { .. }));
    }

    #[test]
    fn open_gzipped_lakebook_and_read_outline() {
        let dir = tempfile::tempdir().unwrap();
        let path = make_lakebook(dir.path(), true, TOC_YML, true);

        let package = Package::open(&path).unwrap();
        let outline = package.raw_outline().unwrap();

        assert_eq!(outline.len(), 3);
        assert_eq!(outline[0].kind, OutlineKind::Ignored);
        assert_eq!(outline[1].kind, OutlineKind::Group);
        assert_eq!(outline[1].title, "Guides");
        assert_eq!(outline[2].kind, OutlineKind::Doc);
        assert_eq!(outline[2].uuid, "aefApMTk01");
    }

    #[test]
    fn open_plain_tar_works() {
        let dir = tempfile::tempdir().unwrap();
        let path = make_lakebook(dir.path(), false, TOC_YML, true);

        let package = Package::open(&path).unwrap();
        assert_eq!(package.raw_outline().unwrap().len(), 3);
    }

    #[test]
    fn missing_manifest_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = make_lakebook(dir.path(), true, TOC_YML, false);

        let err = Package::open(&path).unwrap_err();
        assert!(matches!(err, LakeportError::MalformedPackage { .. }));
    }

    #[test]
    fn body_of_reads_doc_body() {
        let dir = tempfile::tempdir().unwrap();
        let path = make_lakebook(dir.path(), true, TOC_YML, true);

        let package = Package::open(&path).unwrap();
        assert_eq!(package.body_of("intro"), "<p>hello</p>");
    }

    #[test]
    fn body_of_missing_resource_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = make_lakebook(dir.path(), true, TOC_YML, true);

        let package = Package::open(&path).unwrap();
        assert_eq!(package.body_of("no-such-doc"), "");
    }

    #[test]
    fn body_of_malformed_resource_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = make_lakebook(dir.path(), true, TOC_YML, true);

        let package = Package::open(&path).unwrap();
        std::fs::write(package.root().join("broken.json"), "{not json").unwrap();
        assert_eq!(package.body_of("broken"), "");
    }

    #[test]
    fn empty_toc_yml_yields_no_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = make_lakebook(dir.path(), true, "", true);

        let package = Package::open(&path).unwrap();
        assert!(package.raw_outline().unwrap().is_empty());
    }

    #[test]
    fn single_mapping_toc_yml_yields_one_entry() {
        let dir = tempfile::tempdir().unwrap();
        let path = make_lakebook(
            dir.path(),
            true,
            "type: DOC\nlevel: 0\ntitle: Lonely\nurl: lonely\n",
            true,
        );

        let package = Package::open(&path).unwrap();
        let outline = package.raw_outline().unwrap();
        assert_eq!(outline.len(), 1);
        assert_eq!(outline[0].title, "Lonely");
    }

    #[test]
    fn cleanup_removes_workspace_and_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = make_lakebook(dir.path(), true, TOC_YML, true);

        let mut package = Package::open(&path).unwrap();
        let root = package.root().to_path_buf();
        assert!(root.exists());

        package.cleanup();
        assert!(!root.exists());
        package.cleanup();
    }

    #[test]
    fn workspace_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = make_lakebook(dir.path(), true, TOC_YML, true);

        let root = {
            let package = Package::open(&path).unwrap();
            package.root().to_path_buf()
        };
        assert!(!root.exists());
    }
}
