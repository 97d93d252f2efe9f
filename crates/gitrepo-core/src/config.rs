//! Settings for driving git: which binary, what extra environment, and the
//! remote/branch used when a caller omits them.
//!
//! Later layers win: built-in defaults, the per-user file, the working
//! tree's `.gitrepo/settings.json`, then `GITREPO_*` variables. Command-line
//! flags are applied on top by the binary.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::command::DEFAULT_CLONE_BRANCH;
use crate::error::{Error, Result};
use crate::executor::Executor;

/// Complete gitrepo configuration.
#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub git: GitConfig,
    #[serde(default)]
    pub defaults: DefaultsConfig,
    #[serde(default)]
    pub log: LogConfig,
}

/// How git is invoked.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GitConfig {
    /// Program name or path of the git binary.
    pub binary: PathBuf,
    /// Extra environment passed to every git invocation.
    pub env: BTreeMap<String, String>,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("git"),
            // Never block on a credential prompt; there is no terminal to answer it.
            env: BTreeMap::from([("GIT_TERMINAL_PROMPT".to_string(), "0".to_string())]),
        }
    }
}

impl GitConfig {
    pub fn executor(&self) -> Executor {
        Executor::new(&self.binary)
    }
}

/// Defaults for operations whose parameters the caller may omit.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DefaultsConfig {
    pub branch: String,
    pub remote: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            branch: DEFAULT_CLONE_BRANCH.to_string(),
            remote: "origin".to_string(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Name of the settings file, both globally and inside a working tree.
const SETTINGS_FILE: &str = "settings.json";

/// Resolve the settings for a repository whose working tree is `tree_dir`
/// (`None` for bare repositories, which carry no project file).
pub fn load_config(tree_dir: Option<&Path>) -> Result<Config> {
    let files = global_config_path()
        .into_iter()
        .chain(tree_dir.map(project_config_path));

    let mut config = Config::default();
    for path in files.filter(|p| p.is_file()) {
        debug!(path = %path.display(), "Applying settings file");
        merge_config(&mut config, read_settings(&path)?);
    }
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

/// Per-user settings: `$XDG_CONFIG_HOME/gitrepo` (or `~/.config/gitrepo`),
/// `%APPDATA%\gitrepo` on Windows.
pub fn global_config_path() -> Option<PathBuf> {
    let base = if cfg!(windows) {
        std::env::var_os("APPDATA").map(PathBuf::from)
    } else {
        std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))
    };
    base.map(|dir| dir.join("gitrepo").join(SETTINGS_FILE))
}

/// Settings checked into (or ignored by) a working tree.
pub fn project_config_path(tree_dir: &Path) -> PathBuf {
    tree_dir.join(".gitrepo").join(SETTINGS_FILE)
}

fn read_settings(path: &Path) -> Result<Config> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
    serde_json::from_str(&text)
        .map_err(|e| Error::Config(format!("invalid settings in {}: {e}", path.display())))
}

/// Fields still at their built-in default in `overlay` leave `base` untouched,
/// so a project file that omits a section does not undo the global file.
fn merge_config(base: &mut Config, overlay: Config) {
    let defaults = Config::default();

    if overlay.git.binary != defaults.git.binary {
        base.git.binary = overlay.git.binary;
    }
    base.git.env.extend(overlay.git.env);

    if overlay.defaults.branch != defaults.defaults.branch {
        base.defaults.branch = overlay.defaults.branch;
    }
    if overlay.defaults.remote != defaults.defaults.remote {
        base.defaults.remote = overlay.defaults.remote;
    }

    if overlay.log.level != defaults.log.level {
        base.log.level = overlay.log.level;
    }
    base.log.json |= overlay.log.json;
}

fn apply_env_overrides(config: &mut Config, var: impl Fn(&str) -> Option<String>) {
    if let Some(val) = var("GITREPO_GIT_BIN") {
        config.git.binary = PathBuf::from(val);
    }
    if let Some(val) = var("GITREPO_DEFAULT_BRANCH") {
        config.defaults.branch = val;
    }
    if let Some(val) = var("GITREPO_DEFAULT_REMOTE") {
        config.defaults.remote = val;
    }
    if let Some(val) = var("GITREPO_LOG_LEVEL") {
        config.log.level = val;
    }
}
