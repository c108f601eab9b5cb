//! Source file parsing and text extraction.
//!
//! Every supported format is flattened to plain text before chunking.

use docqa_core::{AppError, AppResult};
use std::fs;
use std::path::Path;

/// Content type classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    PlainText,
    Markdown,
    Csv,
    Json,
}

impl ContentType {
    /// Detect content type from file extension. `None` means unsupported.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "txt" => Some(Self::PlainText),
            "md" | "markdown" => Some(Self::Markdown),
            "csv" => Some(Self::Csv),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PlainText => "text",
            Self::Markdown => "markdown",
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }
}

/// Whether ingestion accepts files with this path's extension.
pub fn is_supported(path: &Path) -> bool {
    ContentType::from_path(path).is_some()
}

/// Parse a source file and extract plain text.
///
/// Files over `max_file_size` bytes and unsupported extensions are rejected
/// with `AppError::Ingestion`.
pub fn parse_file(path: &Path, max_file_size: u64) -> AppResult<String> {
    let content_type = ContentType::from_path(path).ok_or_else(|| {
        AppError::Ingestion(format!("Unsupported file type: {}", path.display()))
    })?;

    let size = fs::metadata(path)
        .map_err(|e| AppError::Ingestion(format!("Failed to stat {}: {}", path.display(), e)))?
        .len();
    if size > max_file_size {
        return Err(AppError::Ingestion(format!(
            "File too large: {} ({} bytes, limit {} bytes)",
            path.display(),
            size,
            max_file_size
        )));
    }

    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::Ingestion(format!("Failed to read {}: {}", path.display(), e)))?;

    tracing::debug!(path = %path.display(), kind = content_type.as_str(), "Parsing file");
    parse_text(&raw, content_type)
}

/// Flatten already-read content of the given type.
pub fn parse_text(raw: &str, content_type: ContentType) -> AppResult<String> {
    match content_type {
        ContentType::PlainText | ContentType::Markdown => Ok(raw.to_string()),
        ContentType::Csv => Ok(flatten_csv(raw)),
        ContentType::Json => flatten_json(raw),
    }
}

/// One line per data row, cells joined by a single space. The first row is
/// the header and is not emitted.
fn flatten_csv(raw: &str) -> String {
    let rows = split_csv(raw);
    let mut out = String::new();

    for row in rows.iter().skip(1) {
        if row.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        out.push_str(&row.join(" "));
        out.push('\n');
    }

    out
}

/// Split CSV text into rows of cells, honouring double-quoted fields with
/// embedded commas, newlines and doubled quotes.
fn split_csv(raw: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut row = Vec::new();
    let mut cell = String::new();
    let mut in_quotes = false;
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    cell.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            '"' if cell.is_empty() => in_quotes = true,
            ',' if !in_quotes => row.push(std::mem::take(&mut cell)),
            '\r' if !in_quotes => {}
            '\n' if !in_quotes => {
                row.push(std::mem::take(&mut cell));
                rows.push(std::mem::take(&mut row));
            }
            _ => cell.push(c),
        }
    }

    if !cell.is_empty() || !row.is_empty() {
        row.push(cell);
        rows.push(row);
    }

    rows
}

/// Re-serialize JSON compactly. Non-ASCII characters are kept as is.
fn flatten_json(raw: &str) -> AppResult<String> {
    let value: serde_json::Value = serde_json::from_str(raw)
        .map_err(|e| AppError::Ingestion(format!("Invalid JSON: {}", e)))?;
    Ok(serde_json::to_string(&value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_content_type_detection() {
        assert_eq!(
            ContentType::from_path(Path::new("a.TXT")),
            Some(ContentType::PlainText)
        );
        assert_eq!(ContentType::from_path(Path::new("a.csv")), Some(ContentType::Csv));
        assert_eq!(ContentType::from_path(Path::new("a.pdf")), None);
        assert_eq!(ContentType::from_path(Path::new("Makefile")), None);
    }

    #[test]
    fn test_csv_rows_flattened() {
        let text = parse_text(
            "city,country\nМосква,Россия\n\"Paris, center\",France\n",
            ContentType::Csv,
        )
        .unwrap();
        assert_eq!(text, "Москва Россия\nParis, center France\n");
    }

    #[test]
    fn test_csv_quotes_and_multiline() {
        let rows = split_csv("a,b\r\n\"say \"\"hi\"\"\",\"two\nlines\"");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1], vec!["say \"hi\"", "two\nlines"]);
    }

    #[test]
    fn test_json_keeps_unicode() {
        let text = parse_text("{ \"город\": \"Москва\" }", ContentType::Json).unwrap();
        assert_eq!(text, "{\"город\":\"Москва\"}");
    }

    #[test]
    fn test_invalid_json_is_ingestion_error() {
        let result = parse_text("{ not json", ContentType::Json);
        assert!(matches!(result, Err(AppError::Ingestion(_))));
    }

    #[test]
    fn test_parse_file_rejects_unsupported() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("scan.pdf");
        fs::write(&path, "%PDF").unwrap();

        let err = parse_file(&path, 1024).unwrap_err();
        assert!(err.to_string().contains("Unsupported file type"));
    }

    #[test]
    fn test_parse_file_rejects_oversized() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("big.txt");
        fs::write(&path, "x".repeat(64)).unwrap();

        let err = parse_file(&path, 16).unwrap_err();
        assert!(err.to_string().contains("File too large"));
        assert_eq!(parse_file(&path, 64).unwrap().len(), 64);
    }
}
