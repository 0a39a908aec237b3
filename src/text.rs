//! Text normalization and paragraph segmentation shared by the loaders.
//!
//! Every length threshold in this crate counts characters, not bytes, so a
//! paragraph of Chinese prose is measured the way a reader would see it.

use crate::error::{CorpusError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::cmp::Ordering;
use std::fs;
use std::path::Path;

/// Marker appended to truncated text.
pub const ELLIPSIS: char = '…';

const BOM: char = '\u{FEFF}';

static CHAPTER_HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^第\s*[0-9]+\s*回").expect("valid heading pattern"));

static PARAGRAPH_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n\s*\n+").expect("valid paragraph pattern"));

/// Strip a leading byte-order mark, unify line endings and trim.
pub fn normalize_text(raw: &str) -> String {
    let without_bom = raw.strip_prefix(BOM).unwrap_or(raw);
    without_bom.replace("\r\n", "\n").trim().to_string()
}

/// Read a file as UTF-8 (lossy) and normalize it.
pub fn read_text(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|e| CorpusError::io(path, e))?;
    Ok(normalize_text(&String::from_utf8_lossy(&bytes)))
}

/// Whether a line opens with a `第N回` chapter heading.
pub fn is_chapter_heading(line: &str) -> bool {
    CHAPTER_HEADING.is_match(line.trim())
}

/// First line of the text, trimmed.
pub fn first_line(text: &str) -> &str {
    text.split('\n').next().unwrap_or("").trim()
}

/// The text without its first line when that line is a chapter heading.
pub fn strip_heading(text: &str) -> &str {
    let (head, rest) = match text.split_once('\n') {
        Some((head, rest)) => (head, rest),
        None => (text, ""),
    };

    if is_chapter_heading(head) { rest } else { text }
}

/// Split on blank-line boundaries, trimming pieces and dropping empty ones.
pub fn split_paragraphs(text: &str) -> Vec<&str> {
    PARAGRAPH_BREAK
        .split(text)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect()
}

/// Order names ignoring ASCII case, then by code point.
///
/// `Claude` sorts between `alpha` and `gpt-5` instead of ahead of both.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    a.chars()
        .map(|c| c.to_ascii_lowercase())
        .cmp(b.chars().map(|c| c.to_ascii_lowercase()))
        .then_with(|| a.cmp(b))
}

/// Length in characters.
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Keep at most `max` characters, appending [`ELLIPSIS`] when cut.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => {
            let mut out = String::with_capacity(cut + ELLIPSIS.len_utf8());
            out.push_str(&text[..cut]);
            out.push(ELLIPSIS);
            out
        }
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_normalize_strips_bom_and_crlf() {
        let raw = "\u{FEFF}  第1回\r\n\r\n正文  \r\n";
        assert_eq!(normalize_text(raw), "第1回\n\n正文");
    }

    #[test]
    fn test_normalize_keeps_inner_bom() {
        assert_eq!(normalize_text("a\u{FEFF}b"), "a\u{FEFF}b");
    }

    #[test]
    fn test_read_text_is_lossy() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.txt");
        fs::write(&path, [0xEF, 0xBB, 0xBF, b'o', b'k', 0xFF, b'\r', b'\n']).unwrap();

        let text = read_text(&path).unwrap();
        assert_eq!(text, "ok\u{FFFD}");
    }

    #[test]
    fn test_read_missing_file() {
        assert!(read_text(Path::new("/nonexistent/file.txt")).is_err());
    }

    #[test]
    fn test_chapter_heading() {
        assert!(is_chapter_heading("第100回：凤姐遗计护幼女"));
        assert!(is_chapter_heading("  第 3 回"));
        assert!(!is_chapter_heading("第三回"));
        assert!(!is_chapter_heading("话说第1回"));
        assert!(!is_chapter_heading("第12章"));
    }

    #[test]
    fn test_strip_heading() {
        assert_eq!(strip_heading("第1回 标题\n正文"), "正文");
        assert_eq!(strip_heading("第1回 标题"), "");
        assert_eq!(strip_heading("开篇\n正文"), "开篇\n正文");
    }

    #[test]
    fn test_split_paragraphs() {
        let text = "甲段\n续行\n\n\n乙段\n  \n丙段\n\n   ";
        assert_eq!(split_paragraphs(text), vec!["甲段\n续行", "乙段", "丙段"]);
        assert!(split_paragraphs("").is_empty());
    }

    #[test]
    fn test_compare_names_ignores_ascii_case() {
        let mut names = vec!["gpt-5", "Claude", "alpha", "claude", "文心"];
        names.sort_by(|a, b| compare_names(a, b));
        assert_eq!(names, vec!["alpha", "Claude", "claude", "gpt-5", "文心"]);
        assert_eq!(compare_names("Qwen", "qwen"), Ordering::Less);
        assert_eq!(compare_names("qwen", "qwen"), Ordering::Equal);
    }

    #[test]
    fn test_truncate_counts_chars() {
        let text = "红".repeat(5);
        assert_eq!(truncate_chars(&text, 5), text);
        assert_eq!(truncate_chars(&text, 3), "红红红…");
        assert_eq!(char_len(&truncate_chars(&text, 3)), 4);
    }
}
