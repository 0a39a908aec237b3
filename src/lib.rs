//! Xuxie Corpus - data loaders for the continuation report.
//!
//! The report compares model-written continuations of a classical novel.
//! This library turns the files the generation and evaluation runs leave on
//! disk into the three collections the report renders.
//!
//! # Overview
//!
//! 1. **Excerpts**: paragraphs from `data/best_chapters/<model>_第N回.txt`,
//!    used for blind A/B comparison
//! 2. **Evaluation averages**: per-model scores from
//!    `data/eval/评测结果_*.json`
//! 3. **Chapters**: every `续写内容_<model>/第N回_<title>.txt` next to the
//!    project, with titles and previews
//!
//! None of the loaders fail. Missing directories and unreadable files come
//! back as empty collections.
//!
//! # Quick Start
//!
//! ```no_run
//! use xuxie_corpus::{config::Config, corpus::Corpus};
//!
//! let corpus = Corpus::from_config(&Config::load_or_default());
//!
//! for row in corpus.evaluation_averages() {
//!     println!("{}: {:.2}", row.model, row.average_score);
//! }
//!
//! let chapters = corpus.chapters();
//! println!("{} chapters, {} excerpts", chapters.len(), corpus.excerpts().len());
//! ```
//!
//! # Architecture
//!
//! - **ExcerptPool**: lazily built excerpt list with a rebuild hook
//! - **evaluation**: loosely typed JSON view and score aggregation
//! - **ChapterLibrary**: cached chapter scan with lookup and search
//! - **Corpus**: the three bound to one configuration

pub mod cache;
pub mod config;
pub mod corpus;
pub mod error;
pub mod evaluation;
pub mod excerpt;
pub mod library;
pub mod text;

// Re-export commonly used types
pub use config::Config;
pub use corpus::{
    Corpus, chapters, default_corpus, evaluation_averages, excerpts, rebuild_excerpts,
    reset_chapters,
};
pub use error::{CorpusError, Result};
pub use evaluation::{Dimension, DimensionScores, EvaluationRow};
pub use excerpt::{Excerpt, ExcerptPool};
pub use library::{Chapter, ChapterLibrary};
