//! HTML-to-Markdown conversion for lakebook document bodies.
//!
//! Converts the `doc.body` HTML of an exported document to Markdown using the
//! `htmd` crate, then applies a series of cleanup passes to normalize
//! whitespace, code blocks, and leftover markup. Headings, lists, tables,
//! links, and image references survive the conversion textually; image
//! localization happens downstream.

mod cleanup;

use scraper::{Html, Selector};
use tracing::debug;

use lakeport_shared::{LakeportError, Result};

/// Convert a document body to Markdown.
///
/// Empty or blank input yields empty output. Image references keep their
/// original URLs; replacing them with local paths is the caller's concern.
pub fn convert(html: &str) -> Result<String> {
    if html.trim().is_empty() {
        return Ok(String::new());
    }

    // htmd 0.1 has no table support, so tables are rendered to Markdown
    // up front and pass through the converter as text.
    let html = preprocess_tables(html);

    let converter = htmd::HtmlToMarkdown::builder()
        .skip_tags(vec!["script", "style", "nav", "iframe", "noscript", "svg"])
        .build();

    let raw = converter
        .convert(&html)
        .map_err(|e| LakeportError::Conversion(format!("htmd conversion failed: {e}")))?;

    debug!(raw_len = raw.len(), "htmd conversion complete");

    Ok(cleanup::run_pipeline(&raw))
}

// ---------------------------------------------------------------------------
// Table pre-processing
// ---------------------------------------------------------------------------

/// Replace each `<table>` element with an equivalent Markdown table.
fn preprocess_tables(html: &str) -> String {
    let doc = Html::parse_fragment(html);
    let table_sel = Selector::parse("table").expect("valid selector");

    let mut result = html.to_string();
    for table in doc.select(&table_sel) {
        let rendered = render_table(&table);
        result = result.replacen(&table.html(), &rendered, 1);
    }
    result
}

/// Render one table element as Markdown, using the first row as the header.
fn render_table(table: &scraper::ElementRef) -> String {
    let tr_sel = Selector::parse("tr").expect("valid selector");
    let cell_sel = Selector::parse("th, td").expect("valid selector");

    let rows: Vec<Vec<String>> = table
        .select(&tr_sel)
        .map(|tr| {
            tr.select(&cell_sel)
                .map(|cell| cell.text().collect::<String>().trim().replace('\n', " "))
                .collect()
        })
        .filter(|cells: &Vec<String>| !cells.is_empty())
        .collect();

    let Some(width) = rows.iter().map(Vec::len).max() else {
        return String::new();
    };

    let mut md = String::from("\n\n");
    for (i, row) in rows.iter().enumerate() {
        md.push('|');
        for col in 0..width {
            md.push(' ');
            md.push_str(row.get(col).map(String::as_str).unwrap_or(""));
            md.push_str(" |");
        }
        md.push('\n');
        if i == 0 {
            md.push('|');
            md.push_str(&" --- |".repeat(width));
            md.push('\n');
        }
    }
    md.push('\n');
    md
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
