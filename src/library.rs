//! Per-chapter continuation library.
//!
//! Directory layout (next to the project root):
//!
//! ```text
//! 续写内容_gpt-5/
//!     第100回_凤姐遗计护幼女_檀纸密书寄风尘.txt
//!     第101回.txt
//!     全部续写内容.txt        (bundle, ignored)
//! 续写内容_claude/
//!     ...
//! ```
//!
//! The library is scanned once and cached until [`ChapterLibrary::invalidate`].

use crate::cache::Cached;
use crate::error::{CorpusError, Result};
use crate::text::{
    char_len, compare_names, first_line, is_chapter_heading, read_text, split_paragraphs,
    strip_heading, truncate_chars,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

/// Prefix of per-model continuation directories.
pub const MODEL_DIR_PREFIX: &str = "续写内容_";

/// Files whose name contains this bundle every chapter and are skipped.
pub const BUNDLE_MARKER: &str = "全部续写内容";

/// Preferred minimum length (characters) of the excerpt paragraph.
pub const EXCERPT_MIN_CHARS: usize = 40;

/// Excerpts are cut to this many characters.
pub const EXCERPT_MAX_CHARS: usize = 220;

/// Ideographic space used between title parts.
const TITLE_SEPARATOR: char = '\u{3000}';

static CHAPTER_FILE_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^第([0-9]+)回(?:[_\s-]+(.+))?$").expect("valid chapter file pattern")
});

/// One continuation chapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    pub model: String,
    pub chapter_number: u64,
    pub title: String,
    pub file_path: PathBuf,
    pub full_text: String,
    pub excerpt: String,
}

/// Chapter number and title fragment parsed from a file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterName {
    pub chapter: u64,
    pub title: String,
}

/// Parse `第100回_凤姐遗计护幼女_檀纸密书寄风尘.txt`.
///
/// Underscores inside the title become ideographic spaces. Returns `None` for
/// names that are not per-chapter files.
pub fn parse_chapter_filename(file_name: &str) -> Option<ChapterName> {
    let stem = Path::new(file_name).file_stem()?.to_str()?;
    let caps = CHAPTER_FILE_NAME.captures(stem)?;
    let chapter = caps[1].parse().ok()?;
    let title = caps
        .get(2)
        .map(|m| m.as_str().replace('_', &TITLE_SEPARATOR.to_string()).trim().to_string())
        .unwrap_or_default();

    Some(ChapterName { chapter, title })
}

/// Display title: the heading line of the text, else one built from the file name.
pub fn chapter_title(text: &str, name: &ChapterName) -> String {
    let first = first_line(text);
    if is_chapter_heading(first) {
        return first.to_string();
    }

    if name.title.is_empty() {
        format!("第{}回", name.chapter)
    } else {
        format!("第{}回{}{}", name.chapter, TITLE_SEPARATOR, name.title)
    }
}

/// Short preview: the first substantial paragraph after the heading.
pub fn make_excerpt(text: &str) -> String {
    let paragraphs = split_paragraphs(strip_heading(text));
    let picked = paragraphs
        .iter()
        .find(|p| char_len(p) >= EXCERPT_MIN_CHARS)
        .or_else(|| paragraphs.first())
        .copied()
        .unwrap_or("");

    truncate_chars(picked, EXCERPT_MAX_CHARS)
}

/// Load one chapter file. `None` when the name does not match or it cannot be read.
fn load_chapter(model: &str, path: &Path) -> Option<Chapter> {
    let file_name = path.file_name()?.to_string_lossy();
    if file_name.contains(BUNDLE_MARKER) {
        return None;
    }

    let name = parse_chapter_filename(&file_name)?;

    let text = match read_text(path) {
        Ok(text) => text,
        Err(e) => {
            tracing::debug!(error = %e, "Skipping unreadable chapter");
            return None;
        }
    };

    Some(Chapter {
        model: model.to_string(),
        chapter_number: name.chapter,
        title: chapter_title(&text, &name),
        file_path: path.to_path_buf(),
        excerpt: make_excerpt(&text),
        full_text: text,
    })
}

fn list_dir(dir: &Path) -> Result<Vec<walkdir::DirEntry>> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(CorpusError::from)
}

/// Scan every `续写内容_<model>` directory under `base`.
pub fn scan_library(base: &Path) -> Result<Vec<Chapter>> {
    if !base.exists() {
        tracing::debug!(base = %base.display(), "Chapter library directory absent");
        return Ok(Vec::new());
    }

    let mut model_dirs: Vec<(String, PathBuf)> = list_dir(base)?
        .into_iter()
        .filter(|e| e.file_type().is_dir())
        .filter_map(|e| {
            let name = e.file_name().to_string_lossy().into_owned();
            name.starts_with(MODEL_DIR_PREFIX)
                .then(|| (name, e.into_path()))
        })
        .collect();
    model_dirs.sort_by(|a, b| compare_names(&a.0, &b.0));

    let mut out = Vec::new();

    for (dir_name, dir) in model_dirs {
        let model = dir_name[MODEL_DIR_PREFIX.len()..].trim().to_string();

        let entries = match list_dir(&dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::debug!(model = %model, error = %e, "Skipping unreadable model directory");
                continue;
            }
        };

        out.extend(
            entries
                .iter()
                .filter(|e| e.file_name().to_string_lossy().to_lowercase().ends_with(".txt"))
                .filter_map(|e| load_chapter(&model, e.path())),
        );
    }

    out.sort_by(|a, b| {
        compare_names(&a.model, &b.model)
            .then_with(|| a.chapter_number.cmp(&b.chapter_number))
    });

    Ok(out)
}

/// Cached view over the continuation library.
#[derive(Debug)]
pub struct ChapterLibrary {
    base: Result<PathBuf>,
    cache: Cached<Vec<Chapter>>,
}

impl ChapterLibrary {
    /// Library rooted at `base`. Nothing is read until the first query.
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self::from_resolved(Ok(base.into()))
    }

    /// Library whose base path may have failed to resolve.
    ///
    /// An unresolved base behaves like a failed scan: the cache warms to an
    /// empty list.
    pub fn from_resolved(base: Result<PathBuf>) -> Self {
        Self {
            base,
            cache: Cached::new(),
        }
    }

    /// The base directory, if it resolved.
    pub fn base(&self) -> Option<&Path> {
        self.base.as_ref().ok().map(PathBuf::as_path)
    }

    /// All chapters, sorted by model then chapter number.
    ///
    /// The first call scans the disk; later calls return the same list until
    /// [`invalidate`](Self::invalidate). A failed or empty scan is cached too.
    pub fn chapters(&self) -> Arc<Vec<Chapter>> {
        self.cache.get_or_init(|| {
            let base = match &self.base {
                Ok(base) => base,
                Err(e) => {
                    tracing::debug!(error = %e, "Chapter library base unresolved");
                    return Vec::new();
                }
            };

            scan_library(base).unwrap_or_else(|e| {
                tracing::debug!(base = %base.display(), error = %e, "Chapter library scan failed");
                Vec::new()
            })
        })
    }

    /// Forget the cached scan.
    pub fn invalidate(&self) {
        self.cache.reset();
    }

    pub fn is_warm(&self) -> bool {
        self.cache.is_warm()
    }

    /// Distinct model ids, sorted.
    pub fn models(&self) -> Vec<String> {
        let mut models: Vec<String> = self.chapters().iter().map(|c| c.model.clone()).collect();
        models.dedup();
        models
    }

    /// Chapters written by one model, in chapter order.
    pub fn by_model(&self, model: &str) -> Vec<Chapter> {
        self.chapters()
            .iter()
            .filter(|c| c.model == model)
            .cloned()
            .collect()
    }

    /// A single chapter.
    pub fn find(&self, model: &str, chapter_number: u64) -> Option<Chapter> {
        self.chapters()
            .iter()
            .find(|c| c.model == model && c.chapter_number == chapter_number)
            .cloned()
    }

    /// Chapters whose title or text contains `query` (case-insensitive).
    pub fn search(&self, query: &str) -> Vec<Chapter> {
        let needle = query.trim().to_lowercase();

        self.chapters()
            .iter()
            .filter(|c| {
                needle.is_empty()
                    || c.title.to_lowercase().contains(&needle)
                    || c.full_text.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect()
    }
}
