//! In-process `.docx` parser backed by docx-rs

use super::DocumentParser;
use crate::config::ResultType;
use crate::error::{ParseError, RagError};
use docx_rs::{DocumentChild, Paragraph, Table, TableCellContent, TableChild, TableRowChild};
use std::path::Path;

/// Parses Word documents into Markdown (headings, list items, pipe tables)
/// or plain paragraph text
#[derive(Debug, Clone)]
pub struct DocxParser {
    result_type: ResultType,
}

impl DocxParser {
    pub fn new(result_type: ResultType) -> Self {
        Self { result_type }
    }

    /// Convert raw `.docx` bytes
    pub fn parse_bytes(&self, bytes: &[u8]) -> Result<String, String> {
        let docx = docx_rs::read_docx(bytes).map_err(|e| e.to_string())?;

        let mut blocks = Vec::new();
        for child in &docx.document.children {
            match child {
                DocumentChild::Paragraph(p) => {
                    if let Some(block) = self.render_paragraph(p) {
                        blocks.push(block);
                    }
                }
                DocumentChild::Table(t) => {
                    let rows = table_rows(t);
                    if rows.is_empty() {
                        continue;
                    }
                    blocks.push(match self.result_type {
                        ResultType::Markdown => markdown_table(&rows),
                        ResultType::Text => rows
                            .iter()
                            .map(|row| row.join("\t"))
                            .collect::<Vec<_>>()
                            .join("\n"),
                    });
                }
                _ => {}
            }
        }

        Ok(blocks.join("\n\n"))
    }

    fn render_paragraph(&self, p: &Paragraph) -> Option<String> {
        let text = p.raw_text();
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        if self.result_type == ResultType::Text {
            return Some(text.to_string());
        }

        let style = p.property.style.as_ref().map(|s| s.val.as_str());
        if let Some(level) = style.and_then(heading_level) {
            return Some(format!("{} {}", "#".repeat(level), text));
        }
        if p.property.numbering_property.is_some() {
            return Some(format!("- {}", text));
        }
        Some(text.to_string())
    }
}

impl Default for DocxParser {
    fn default() -> Self {
        Self::new(ResultType::Markdown)
    }
}

#[async_trait::async_trait]
impl DocumentParser for DocxParser {
    async fn parse(&self, path: &Path) -> Result<String, RagError> {
        let bytes = tokio::fs::read(path).await?;
        let parser = self.clone();
        let file = path.display().to_string();

        tokio::task::spawn_blocking(move || parser.parse_bytes(&bytes))
            .await
            .map_err(|e| ParseError::ParseFailed {
                file: file.clone(),
                reason: format!("parser task failed: {}", e),
            })?
            .map_err(|reason| ParseError::ParseFailed { file, reason }.into())
    }

    fn result_type(&self) -> ResultType {
        self.result_type
    }
}

/// Map a paragraph style id such as "Heading2" or "Title" to a Markdown level
fn heading_level(style: &str) -> Option<usize> {
    let lower = style.to_lowercase();
    if lower == "title" {
        return Some(1);
    }
    if lower == "subtitle" {
        return Some(2);
    }
    let digits = lower
        .strip_prefix("heading")?
        .trim_start_matches([' ', '_', '-']);
    let level: usize = digits.parse().ok()?;
    (1..=6).contains(&level).then_some(level)
}

#[allow(unreachable_patterns)]
fn table_rows(table: &Table) -> Vec<Vec<String>> {
    table
        .rows
        .iter()
        .filter_map(|row| match row {
            TableChild::TableRow(r) => Some(
                r.cells
                    .iter()
                    .map(|cell| match cell {
                        TableRowChild::TableCell(c) => c
                            .children
                            .iter()
                            .filter_map(|content| match content {
                                TableCellContent::Paragraph(p) => Some(p.raw_text()),
                                _ => None,
                            })
                            .collect::<Vec<_>>()
                            .join(" ")
                            .trim()
                            .to_string(),
                        _ => String::new(),
                    })
                    .collect(),
            ),
            _ => None,
        })
        .collect()
}

fn markdown_table(rows: &[Vec<String>]) -> String {
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);

    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(markdown_row(&rows[0], width));
    lines.push(format!("| {} |", vec!["---"; width].join(" | ")));
    lines.extend(rows[1..].iter().map(|row| markdown_row(row, width)));
    lines.join("\n")
}

fn markdown_row(cells: &[String], width: usize) -> String {
    let mut padded: Vec<String> = cells.iter().map(|c| c.replace('|', "\\|")).collect();
    padded.resize(width, String::new());
    format!("| {} |", padded.join(" | "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use docx_rs::{Docx, Run, TableCell, TableRow};
    use tempfile::TempDir;

    fn write_docx(dir: &TempDir, name: &str, docx: Docx) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let file = std::fs::File::create(&path).unwrap();
        docx.build().pack(file).unwrap();
        path
    }

    fn para(text: &str) -> Paragraph {
        Paragraph::new().add_run(Run::new().add_text(text))
    }

    #[test]
    fn test_heading_level() {
        assert_eq!(heading_level("Heading1"), Some(1));
        assert_eq!(heading_level("heading 3"), Some(3));
        assert_eq!(heading_level("Title"), Some(1));
        assert_eq!(heading_level("Heading9"), None);
        assert_eq!(heading_level("Normal"), None);
    }

    #[test]
    fn test_markdown_table_pads_short_rows() {
        let rows = vec![
            vec!["Name".to_string(), "Role".to_string()],
            vec!["Ada".to_string()],
        ];
        assert_eq!(
            markdown_table(&rows),
            "| Name | Role |\n| --- | --- |\n| Ada |  |"
        );
    }

    #[tokio::test]
    async fn test_parse_paragraphs_and_headings() {
        let dir = TempDir::new().unwrap();
        let docx = Docx::new()
            .add_paragraph(para("Company Overview").style("Heading1"))
            .add_paragraph(para("We build retrieval systems."))
            .add_paragraph(Paragraph::new());
        let path = write_docx(&dir, "overview.docx", docx);

        let markdown = DocxParser::new(ResultType::Markdown)
            .parse(&path)
            .await
            .unwrap();
        assert!(markdown.contains("# Company Overview"));
        assert!(markdown.contains("We build retrieval systems."));

        let text = DocxParser::new(ResultType::Text).parse(&path).await.unwrap();
        assert!(!text.contains('#'));
        assert!(text.contains("Company Overview"));
    }

    #[tokio::test]
    async fn test_parse_table() {
        let dir = TempDir::new().unwrap();
        let table = Table::new(vec![
            TableRow::new(vec![
                TableCell::new().add_paragraph(para("Plan")),
                TableCell::new().add_paragraph(para("Price")),
            ]),
            TableRow::new(vec![
                TableCell::new().add_paragraph(para("Basic")),
                TableCell::new().add_paragraph(para("10")),
            ]),
        ]);
        let path = write_docx(&dir, "pricing.docx", Docx::new().add_table(table));

        let markdown = DocxParser::default().parse(&path).await.unwrap();
        assert!(markdown.contains("| Plan | Price |"));
        assert!(markdown.contains("| --- | --- |"));
        assert!(markdown.contains("| Basic | 10 |"));
    }

    #[tokio::test]
    async fn test_parse_invalid_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.docx");
        std::fs::write(&path, b"not a zip archive").unwrap();

        let result = DocxParser::default().parse(&path).await;
        assert!(matches!(
            result,
            Err(RagError::Parse(ParseError::ParseFailed { .. }))
        ));
    }

    #[tokio::test]
    async fn test_parse_missing_file_is_io_error() {
        let result = DocxParser::default()
            .parse(Path::new("/nonexistent/missing.docx"))
            .await;
        assert!(matches!(result, Err(RagError::Io(_))));
    }
}
