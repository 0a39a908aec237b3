//! Xuxie Corpus CLI
//!
//! Inspect the data behind the continuation report.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};
use xuxie_corpus::{
    config::Config,
    corpus::Corpus,
    evaluation::Dimension,
};

/// Xuxie Corpus - data loaders for the continuation report
#[derive(Parser)]
#[command(name = "xuxie-corpus")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Project root (overrides config file and XUXIE_PROJECT_ROOT)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List blind-comparison excerpts
    Excerpts {
        /// Only excerpts from this model
        #[arg(short, long)]
        model: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show per-model evaluation averages
    Evals {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List continuation chapters
    Chapters {
        /// Only chapters from this model
        #[arg(short, long)]
        model: Option<String>,

        /// Case-insensitive text search over titles and bodies
        #[arg(short, long)]
        query: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the full text of one chapter
    Show {
        /// Model id (directory name without the 续写内容_ prefix)
        model: String,

        /// Chapter number
        chapter: u64,
    },

    /// Show resolved paths and collection sizes
    Info,
}

fn init_tracing(json_format: bool) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    if json_format {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_target(true).with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let mut config = Config::load_or_default();
    if let Some(root) = cli.root {
        config.paths.project_root = root;
    }
    tracing::debug!(root = %config.paths.project_root.display(), "Configuration loaded");

    let corpus = Corpus::from_config(&config);

    match cli.command {
        Commands::Excerpts { model, json } => cmd_excerpts(&corpus, model, json),
        Commands::Evals { json } => cmd_evals(&corpus, json),
        Commands::Chapters { model, query, json } => cmd_chapters(&corpus, model, query, json),
        Commands::Show { model, chapter } => cmd_show(&corpus, &model, chapter),
        Commands::Info => cmd_info(&corpus),
    }
}

fn cmd_excerpts(corpus: &Corpus, model: Option<String>, json: bool) -> Result<()> {
    let all = corpus.excerpts();
    let excerpts: Vec<_> = all
        .iter()
        .filter(|e| model.as_ref().is_none_or(|m| &e.model_name == m))
        .collect();

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&excerpts).context("Failed to serialize excerpts")?
        );
        return Ok(());
    }

    if excerpts.is_empty() {
        println!("No excerpts found in {}", corpus.best_chapters_dir().display());
        return Ok(());
    }

    for excerpt in &excerpts {
        println!("[{}]", excerpt.key);
        println!("  {}", excerpt.text);
        println!();
    }
    println!("{} excerpts", excerpts.len());

    Ok(())
}

fn cmd_evals(corpus: &Corpus, json: bool) -> Result<()> {
    let rows = corpus.evaluation_averages();

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&rows).context("Failed to serialize evaluations")?
        );
        return Ok(());
    }

    if rows.is_empty() {
        println!("No evaluation results found in {}", corpus.eval_dir().display());
        return Ok(());
    }

    print!("{:<24} {:>8} {:>8}", "Model", "Chapters", "Average");
    for dimension in Dimension::ALL {
        print!("  {}", dimension.label());
    }
    println!();
    println!("{}", "─".repeat(80));

    for row in &rows {
        print!(
            "{:<24} {:>8} {:>8.2}",
            row.model, row.chapter_count, row.average_score
        );
        for dimension in Dimension::ALL {
            print!("  {:>8.2}", row.dimension_scores.get(dimension));
        }
        println!();
    }

    Ok(())
}

fn cmd_chapters(
    corpus: &Corpus,
    model: Option<String>,
    query: Option<String>,
    json: bool,
) -> Result<()> {
    let library = corpus.library();
    let matches = match &query {
        Some(q) => library.search(q),
        None => library.chapters().as_ref().clone(),
    };
    let chapters: Vec<_> = matches
        .into_iter()
        .filter(|c| model.as_ref().is_none_or(|m| &c.model == m))
        .collect();

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&chapters).context("Failed to serialize chapters")?
        );
        return Ok(());
    }

    if chapters.is_empty() {
        println!("No chapters found.");
        return Ok(());
    }

    for chapter in &chapters {
        println!("{:<16} {:>4}  {}", chapter.model, chapter.chapter_number, chapter.title);
        if !chapter.excerpt.is_empty() {
            println!("    {}", chapter.excerpt);
        }
    }

    println!("{}", "─".repeat(60));
    println!(
        "{} chapters across {} models",
        chapters.len(),
        library.models().len()
    );

    Ok(())
}

fn cmd_show(corpus: &Corpus, model: &str, chapter: u64) -> Result<()> {
    let Some(found) = corpus.library().find(model, chapter) else {
        anyhow::bail!("Chapter {} of model '{}' not found", chapter, model);
    };

    println!("{}", found.title);
    println!("{}", found.file_path.display());
    println!("{}", "─".repeat(60));
    println!("{}", found.full_text);

    Ok(())
}

fn cmd_info(corpus: &Corpus) -> Result<()> {
    let library_dir = corpus
        .library()
        .base()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(unresolved)".to_string());

    println!("Corpus Information");
    println!("{}", "─".repeat(40));
    println!("  Best chapters: {}", corpus.best_chapters_dir().display());
    println!("  Evaluations:   {}", corpus.eval_dir().display());
    println!("  Library:       {}", library_dir);
    if let Some(path) = Config::config_file_path() {
        println!("  Config file:   {}", path.display());
    }
    println!();
    println!("  Excerpts:      {}", corpus.excerpts().len());
    println!("  Eval rows:     {}", corpus.evaluation_averages().len());
    println!("  Chapters:      {}", corpus.chapters().len());
    println!("  Models:        {}", corpus.library().models().join(", "));

    Ok(())
}
