//! Directory-sweep conversion.
//!
//! Finds every `.lakebook` under a source directory and converts each into
//! its own subdirectory of the output root, named after the package file.
//! Thin wrapper over [`convert_lakebook`]; the first failing package aborts
//! the sweep.

use std::path::{Path, PathBuf};

use tracing::{info, instrument};

use lakeport_shared::{ConvertOptions, LakeportError, Result};

use crate::pipeline::{ConvertConfig, ConvertReport, ProgressReporter, convert_lakebook};

/// Summary of a directory sweep.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Per-package reports, in discovery order: (lakebook path, report).
    pub packages: Vec<(PathBuf, ConvertReport)>,
}

/// Convert every `.lakebook` under `source_dir` into
/// `output_root/<file stem>/`.
#[instrument(skip_all, fields(source = %source_dir.display()))]
pub async fn convert_directory(
    source_dir: &Path,
    output_root: &Path,
    options: &ConvertOptions,
    progress: &dyn ProgressReporter,
) -> Result<BatchReport> {
    let lakebooks = find_lakebooks(source_dir)?;
    info!(count = lakebooks.len(), "lakebooks discovered");

    let mut report = BatchReport::default();
    for (i, lakebook) in lakebooks.iter().enumerate() {
        let stem = lakebook
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("lakebook");

        progress.phase(&format!(
            "[{}/{}] {}",
            i + 1,
            lakebooks.len(),
            lakebook.display()
        ));

        let config = ConvertConfig {
            lakebook: lakebook.clone(),
            output_dir: output_root.join(stem),
            options: options.clone(),
        };
        let package_report = convert_lakebook(&config, progress).await?;
        report.packages.push((lakebook.clone(), package_report));
    }

    Ok(report)
}

/// Recursively collect `*.lakebook` files, sorted for a stable sweep order.
pub fn find_lakebooks(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(LakeportError::config(format!(
            "not a directory: {}",
            dir.display()
        )));
    }

    let mut found = Vec::new();
    walk(dir, &mut found)?;
    found.sort();
    Ok(found)
}

fn walk(dir: &Path, found: &mut Vec<PathBuf>) -> Result<()> {
    for entry in std::fs::read_dir(dir).map_err(|e| LakeportError::io(dir, e))? {
        let path = entry.map_err(|e| LakeportError::io(dir, e))?.path();
        if path.is_dir() {
            walk(&path, found)?;
        } else if path.extension().is_some_and(|ext| ext == "lakebook") {
            found.push(path);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
