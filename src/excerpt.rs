//! Blind-comparison excerpts drawn from best-chapter samples.
//!
//! Each `<model>_第<N>回.txt` file in the best-chapters directory contributes
//! up to [`MAX_PER_FILE`] paragraphs. The pool is deterministic; random
//! pairing happens in whatever consumes it.

use crate::cache::Cached;
use crate::error::Result;
use crate::text::{
    char_len, compare_names, read_text, split_paragraphs, strip_heading, truncate_chars,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

/// Paragraphs shorter than this (in characters) are not worth comparing.
pub const MIN_PARAGRAPH_CHARS: usize = 60;

/// Longer paragraphs are cut and marked with an ellipsis.
pub const MAX_EXCERPT_CHARS: usize = 420;

/// Paragraphs kept per file.
pub const MAX_PER_FILE: usize = 8;

static BEST_CHAPTER_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.+?)_第([0-9]+)回$").expect("valid file name pattern"));

/// One paragraph offered for blind A/B comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Excerpt {
    /// `<model>-<chapter or 0>-<position from 1>`.
    pub key: String,
    /// Model that wrote the paragraph, revealed after the vote.
    pub model_name: String,
    /// Paragraph text, at most [`MAX_EXCERPT_CHARS`] plus the ellipsis.
    pub text: String,
}

/// Model and chapter recovered from a best-chapter file stem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BestChapterName {
    pub model: String,
    pub chapter: Option<u64>,
}

/// Parse `gpt-5_第100回` into its model and chapter.
///
/// Stems that do not follow the pattern are taken whole as the model name.
pub fn parse_best_chapter_filename(stem: &str) -> BestChapterName {
    BEST_CHAPTER_NAME
        .captures(stem)
        .and_then(|caps| {
            let chapter = caps[2].parse().ok()?;
            Some(BestChapterName {
                model: caps[1].to_string(),
                chapter: Some(chapter),
            })
        })
        .unwrap_or_else(|| BestChapterName {
            model: stem.to_string(),
            chapter: None,
        })
}

/// Comparison-sized paragraphs of a normalized chapter text, in order.
pub fn pick_paragraphs(text: &str) -> Vec<String> {
    split_paragraphs(strip_heading(text))
        .into_iter()
        .filter(|p| char_len(p) >= MIN_PARAGRAPH_CHARS)
        .map(|p| truncate_chars(p, MAX_EXCERPT_CHARS))
        .collect()
}

/// Excerpts for one file's content.
pub fn excerpts_for_file(name: &BestChapterName, content: &str) -> Vec<Excerpt> {
    let chapter = name.chapter.unwrap_or(0);

    pick_paragraphs(content)
        .into_iter()
        .take(MAX_PER_FILE)
        .enumerate()
        .map(|(i, text)| Excerpt {
            key: format!("{}-{}-{}", name.model, chapter, i + 1),
            model_name: name.model.clone(),
            text,
        })
        .collect()
}

/// Best-chapter `.txt` files in `dir`, in file name order.
///
/// A missing directory is not a failure and yields an empty list.
pub fn list_best_chapter_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        tracing::debug!(dir = %dir.display(), "Best-chapters directory absent");
        return Ok(Vec::new());
    }

    let mut files = Vec::new();

    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let file_name = entry.file_name().to_string_lossy();
        if file_name.to_lowercase().ends_with(".txt") {
            files.push(entry.into_path());
        }
    }

    Ok(files)
}

/// Excerpts of every listed file, sorted by model then key.
///
/// One unreadable file fails the whole batch.
pub fn excerpts_from_files(files: &[PathBuf]) -> Result<Vec<Excerpt>> {
    let mut out = Vec::new();

    for path in files {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let name = parse_best_chapter_filename(&stem);
        let content = read_text(path)?;
        out.extend(excerpts_for_file(&name, &content));
    }

    out.sort_by(|a, b| {
        compare_names(&a.model_name, &b.model_name).then_with(|| compare_names(&a.key, &b.key))
    });

    Ok(out)
}

/// Build the excerpt list, reporting the first failure.
pub fn try_build_excerpts(dir: &Path) -> Result<Vec<Excerpt>> {
    excerpts_from_files(&list_best_chapter_files(dir)?)
}

/// Build the excerpt list; any failure yields an empty list.
pub fn build_excerpts(dir: &Path) -> Vec<Excerpt> {
    try_build_excerpts(dir).unwrap_or_else(|e| {
        tracing::debug!(dir = %dir.display(), error = %e, "Excerpt build failed");
        Vec::new()
    })
}

/// Lazily built, shared excerpt list for one directory.
#[derive(Debug)]
pub struct ExcerptPool {
    dir: PathBuf,
    cache: Cached<Vec<Excerpt>>,
}

impl ExcerptPool {
    /// Create a pool over a best-chapters directory. Nothing is read yet.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            cache: Cached::new(),
        }
    }

    /// The directory this pool scans.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The excerpts, built on first access.
    pub fn excerpts(&self) -> Arc<Vec<Excerpt>> {
        self.cache.get_or_init(|| build_excerpts(&self.dir))
    }

    /// Discard the current list and scan again.
    pub fn rebuild(&self) -> Arc<Vec<Excerpt>> {
        self.cache.reset();
        self.excerpts()
    }
}
