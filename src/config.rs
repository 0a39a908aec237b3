//! Path configuration for the corpus loaders.
//!
//! Supports both environment variables and YAML config file.
//! Environment variables take precedence over config file values.

use crate::error::{CorpusError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Component, Path, PathBuf};

/// Where the loaders look for their input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Base directory for `data/...` lookups.
    pub project_root: PathBuf,

    /// Best-chapter samples, relative to the project root unless absolute.
    #[serde(default = "default_best_chapters_dir")]
    pub best_chapters_dir: PathBuf,

    /// Evaluation result documents, relative to the project root unless absolute.
    #[serde(default = "default_eval_dir")]
    pub eval_dir: PathBuf,

    /// Directory holding the `续写内容_<model>` folders.
    /// Defaults to the parent of the project root.
    #[serde(default)]
    pub library_dir: Option<PathBuf>,
}

fn default_project_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

fn default_best_chapters_dir() -> PathBuf {
    PathBuf::from("data").join("best_chapters")
}

fn default_eval_dir() -> PathBuf {
    PathBuf::from("data").join("eval")
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            project_root: default_project_root(),
            best_chapters_dir: default_best_chapters_dir(),
            eval_dir: default_eval_dir(),
            library_dir: None,
        }
    }
}

impl PathsConfig {
    /// Paths rooted at `project_root` with the default layout.
    pub fn rooted_at(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            ..Default::default()
        }
    }

    /// Directory of best-chapter `.txt` files.
    pub fn best_chapters_path(&self) -> PathBuf {
        self.resolve(&self.best_chapters_dir)
    }

    /// Directory of `评测结果_*.json` files.
    pub fn eval_path(&self) -> PathBuf {
        self.resolve(&self.eval_dir)
    }

    /// Directory of per-model continuation folders.
    pub fn library_path(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.library_dir {
            return Ok(self.resolve(dir));
        }

        let root = self.absolute_root();
        root.parent()
            .map(Path::to_path_buf)
            .ok_or(CorpusError::NoProjectParent(root))
    }

    /// The project root as an absolute path without `.` or `..` parts.
    ///
    /// Relative roots are taken against the current directory.
    pub fn absolute_root(&self) -> PathBuf {
        let absolute = std::path::absolute(&self.project_root)
            .unwrap_or_else(|_| self.project_root.clone());
        normalize_lexically(&absolute)
    }

    fn resolve(&self, dir: &Path) -> PathBuf {
        if dir.is_absolute() {
            normalize_lexically(dir)
        } else {
            normalize_lexically(&self.absolute_root().join(dir))
        }
    }
}

/// Drop `.` components and fold `..` into its parent without touching the disk.
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() && !out.has_root() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }

    out
}

/// Full application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Input locations
    pub paths: PathsConfig,
}

/// Configuration file structure (YAML format).
#[derive(Debug, Deserialize)]
struct ConfigFile {
    paths: Option<PathsFileSection>,
}

#[derive(Debug, Deserialize)]
struct PathsFileSection {
    project_root: Option<PathBuf>,
    best_chapters_dir: Option<PathBuf>,
    eval_dir: Option<PathBuf>,
    library_dir: Option<PathBuf>,
}

impl Config {
    /// Load configuration from environment variables and optional config file.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (XUXIE_PROJECT_ROOT, XUXIE_BEST_CHAPTERS_DIR,
    ///    XUXIE_EVAL_DIR, XUXIE_LIBRARY_DIR)
    /// 2. Config file (~/.config/xuxie-corpus/config.yaml)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        let mut config = Config::default();

        if let Some(config_path) = Self::config_file_path() {
            if config_path.exists() {
                config = Self::load_from_file(&config_path)?;
            }
        }

        config.apply_env();
        Ok(config)
    }

    /// Like [`Config::load`], but falls back to defaults on a broken config file.
    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(error = %e, "Falling back to default configuration");
                let mut config = Config::default();
                config.apply_env();
                config
            }
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| CorpusError::io(path, e))?;

        let file_config: ConfigFile = serde_yaml::from_str(&content)
            .map_err(|e| CorpusError::Config(format!("Failed to parse config file: {}", e)))?;

        let mut config = Config::default();

        if let Some(paths) = file_config.paths {
            if let Some(project_root) = paths.project_root {
                config.paths.project_root = project_root;
            }
            if let Some(dir) = paths.best_chapters_dir {
                config.paths.best_chapters_dir = dir;
            }
            if let Some(dir) = paths.eval_dir {
                config.paths.eval_dir = dir;
            }
            if paths.library_dir.is_some() {
                config.paths.library_dir = paths.library_dir;
            }
        }

        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Some(root) = env::var_os("XUXIE_PROJECT_ROOT") {
            self.paths.project_root = PathBuf::from(root);
        }

        if let Some(dir) = env::var_os("XUXIE_BEST_CHAPTERS_DIR") {
            self.paths.best_chapters_dir = PathBuf::from(dir);
        }

        if let Some(dir) = env::var_os("XUXIE_EVAL_DIR") {
            self.paths.eval_dir = PathBuf::from(dir);
        }

        if let Some(dir) = env::var_os("XUXIE_LIBRARY_DIR") {
            self.paths.library_dir = Some(PathBuf::from(dir));
        }
    }

    /// Get the default config file path.
    pub fn config_file_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "xuxie-corpus")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Create a config rooted at an explicit project directory (useful for testing).
    pub fn with_root(project_root: impl Into<PathBuf>) -> Self {
        Self {
            paths: PathsConfig::rooted_at(project_root),
        }
    }
}
