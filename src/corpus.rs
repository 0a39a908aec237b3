//! The three report data sources bound to one configuration.

use crate::config::{Config, PathsConfig};
use crate::evaluation::{self, EvaluationRow};
use crate::excerpt::{Excerpt, ExcerptPool};
use crate::library::{Chapter, ChapterLibrary};
use once_cell::sync::Lazy;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Excerpt pool, evaluation directory and chapter library for one project.
#[derive(Debug)]
pub struct Corpus {
    excerpts: ExcerptPool,
    eval_dir: PathBuf,
    library: ChapterLibrary,
}

impl Corpus {
    /// Bind the loaders to configured paths. Nothing is read yet.
    pub fn new(paths: &PathsConfig) -> Self {
        Self {
            excerpts: ExcerptPool::new(paths.best_chapters_path()),
            eval_dir: paths.eval_path(),
            library: ChapterLibrary::from_resolved(paths.library_path()),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.paths)
    }

    /// Blind-comparison excerpts, built once.
    pub fn excerpts(&self) -> Arc<Vec<Excerpt>> {
        self.excerpts.excerpts()
    }

    /// Rescan the best-chapters directory.
    pub fn rebuild_excerpts(&self) -> Arc<Vec<Excerpt>> {
        self.excerpts.rebuild()
    }

    /// Evaluation averages, read fresh on every call.
    pub fn evaluation_averages(&self) -> Vec<EvaluationRow> {
        evaluation::evaluation_averages(&self.eval_dir)
    }

    /// Continuation chapters, scanned once.
    pub fn chapters(&self) -> Arc<Vec<Chapter>> {
        self.library.chapters()
    }

    pub fn library(&self) -> &ChapterLibrary {
        &self.library
    }

    pub fn best_chapters_dir(&self) -> &Path {
        self.excerpts.dir()
    }

    pub fn eval_dir(&self) -> &Path {
        &self.eval_dir
    }
}

static DEFAULT_CORPUS: Lazy<Corpus> =
    Lazy::new(|| Corpus::from_config(&Config::load_or_default()));

/// Process-wide corpus built from [`Config::load_or_default`].
pub fn default_corpus() -> &'static Corpus {
    &DEFAULT_CORPUS
}

/// Blind-comparison excerpts of the default corpus.
pub fn excerpts() -> Arc<Vec<Excerpt>> {
    DEFAULT_CORPUS.excerpts()
}

/// Force the default excerpt pool to rescan.
pub fn rebuild_excerpts() -> Arc<Vec<Excerpt>> {
    DEFAULT_CORPUS.rebuild_excerpts()
}

/// Evaluation averages of the default corpus.
pub fn evaluation_averages() -> Vec<EvaluationRow> {
    DEFAULT_CORPUS.evaluation_averages()
}

/// Continuation chapters of the default corpus.
pub fn chapters() -> Arc<Vec<Chapter>> {
    DEFAULT_CORPUS.chapters()
}

/// Drop the default chapter cache so the next call rescans.
pub fn reset_chapters() {
    DEFAULT_CORPUS.library().invalidate();
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn project() -> (TempDir, PathBuf) {
        let workspace = TempDir::new().unwrap();
        let root = workspace.path().join("my-log");
        fs::create_dir_all(&root).unwrap();
        (workspace, root)
    }

    #[test]
    fn test_empty_project() {
        let (_workspace, root) = project();
        let corpus = Corpus::new(&PathsConfig::rooted_at(&root));

        assert!(corpus.excerpts().is_empty());
        assert!(corpus.evaluation_averages().is_empty());
        assert!(corpus.chapters().is_empty());
    }

    #[test]
    fn test_full_layout() {
        let (workspace, root) = project();

        let best = root.join("data").join("best_chapters");
        fs::create_dir_all(&best).unwrap();
        fs::write(best.join("gpt-5_第100回.txt"), "段".repeat(61)).unwrap();

        let eval = root.join("data").join("eval");
        fs::create_dir_all(&eval).unwrap();
        fs::write(
            eval.join("评测结果_gpt-5.json"),
            json!({ "model_name": "gpt-5", "total_chapters": 3 }).to_string(),
        )
        .unwrap();

        let lib = workspace.path().join("续写内容_gpt-5");
        fs::create_dir_all(&lib).unwrap();
        fs::write(lib.join("第100回.txt"), "正文").unwrap();

        let corpus = Corpus::new(&PathsConfig::rooted_at(&root));
        assert_eq!(corpus.best_chapters_dir(), best.as_path());
        assert_eq!(corpus.eval_dir(), eval.as_path());

        assert_eq!(corpus.excerpts()[0].key, "gpt-5-100-1");
        assert_eq!(corpus.evaluation_averages()[0].chapter_count, 3.0);
        assert_eq!(corpus.chapters()[0].title, "第100回");
    }

    fn relative_to_cwd(path: &Path) -> PathBuf {
        let cwd = std::env::current_dir().unwrap();
        let mut relative = PathBuf::new();
        for _ in cwd.components().skip(1) {
            relative.push("..");
        }
        relative.join(path.strip_prefix("/").unwrap())
    }

    #[test]
    fn test_relative_root_finds_sibling_chapters() {
        let (workspace, root) = project();
        let lib = workspace.path().join("续写内容_gpt-5");
        fs::create_dir_all(&lib).unwrap();
        fs::write(lib.join("第1回.txt"), "正文").unwrap();

        let relative = relative_to_cwd(&root);
        assert!(relative.is_relative());

        let corpus = Corpus::new(&PathsConfig::rooted_at(&relative));
        assert_eq!(corpus.library().base(), Some(workspace.path()));

        let chapters = corpus.chapters();
        assert_eq!(chapters.len(), 1);
        assert_eq!(chapters[0].model, "gpt-5");
    }
}
