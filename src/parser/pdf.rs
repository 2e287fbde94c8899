use crate::error::{ParseError, RagError};
use std::path::Path;

/// Extract text from a PDF file and lay it out as Markdown
pub fn extract_pdf_to_markdown(path: &Path) -> Result<String, RagError> {
    let text = pdf_extract::extract_text(path).map_err(|e| ParseError::ParseFailed {
        file: path.display().to_string(),
        reason: e.to_string(),
    })?;
    Ok(pdf_text_to_markdown(&text))
}

/// Raw PDF text has no structure; recover headings and column tables from
/// layout hints.
fn pdf_text_to_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut table_columns: Option<usize> = None;

    for line in text.lines().map(str::trim) {
        if line.is_empty() {
            if table_columns.take().is_some() {
                out.push('\n');
            }
            out.push('\n');
            continue;
        }

        if let Some(cells) = table_cells(line) {
            if table_columns.is_none() {
                out.push_str(&render_row(&cells));
                out.push('\n');
                out.push_str(&render_row(&vec!["---"; cells.len()]));
                out.push('\n');
                table_columns = Some(cells.len());
            } else {
                out.push_str(&render_row(&cells));
                out.push('\n');
            }
            continue;
        }

        if table_columns.take().is_some() {
            out.push('\n');
        }

        if looks_like_heading(line) {
            let marker = if line.len() < 30 { "##" } else { "###" };
            out.push_str(&format!("{} {}\n\n", marker, line.trim_end_matches(':')));
        } else {
            out.push_str(line);
            out.push('\n');
        }
    }

    out
}

/// Split a line into table cells when it has three or more columns separated
/// by tabs or runs of spaces
fn table_cells(line: &str) -> Option<Vec<&str>> {
    if line.split_whitespace().count() < 3 {
        return None;
    }
    let cells: Vec<&str> = if line.contains('\t') {
        line.split('\t').map(str::trim).collect()
    } else if line.contains("  ") {
        line.split("  ")
            .map(str::trim)
            .filter(|cell| !cell.is_empty())
            .collect()
    } else {
        return None;
    };
    (cells.len() >= 2).then_some(cells)
}

fn render_row(cells: &[&str]) -> String {
    format!("| {} |", cells.join(" | "))
}

/// Mostly-uppercase short lines and short lines ending in ':' are headings
fn looks_like_heading(line: &str) -> bool {
    let alpha = line.chars().filter(|c| c.is_alphabetic()).count();
    if alpha > 0 && line.len() < 100 {
        let upper = line.chars().filter(|c| c.is_uppercase()).count();
        if upper as f64 / alpha as f64 > 0.8 {
            return true;
        }
    }

    line.ends_with(':') && line.len() < 80 && !line.contains("://")
}
