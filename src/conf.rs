use config::{Config, ConfigError, Environment, File};
use directories::ProjectDirs;
use serde::Deserialize;
use std::path::PathBuf;

use crate::tracker::Session;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Sqlite,
    Rest,
}

/// Runtime settings, read from `<config_dir>/jobtrack.toml` and then
/// `JOBTRACK_*` environment variables (environment wins).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub backend: Backend,
    pub database_path: Option<PathBuf>,
    pub rest_url: Option<String>,
    pub rest_api_key: Option<String>,
    pub rest_access_token: Option<String>,
    pub user_id: Option<String>,
    pub export_dir: Option<PathBuf>,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(dirs) = project_dirs() {
            let file = dirs.config_dir().join("jobtrack.toml");
            builder = builder.add_source(File::from(file).required(false));
        }
        let conf = builder
            .add_source(Environment::with_prefix("JOBTRACK"))
            .build()?;
        conf.try_deserialize()
    }

    pub fn database_path(&self) -> anyhow::Result<PathBuf> {
        if let Some(path) = &self.database_path {
            return Ok(path.clone());
        }
        // XDG data directory, or the working directory as a last resort
        if let Some(dirs) = project_dirs() {
            Ok(dirs.data_dir().join("jobtrack.db"))
        } else {
            Ok(PathBuf::from("jobtrack.db"))
        }
    }

    pub fn export_dir(&self) -> PathBuf {
        self.export_dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }

    /// The signed-in user, if any. Blank ids count as signed out.
    pub fn session(&self) -> Option<Session> {
        self.user_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(Session::new)
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "jobtrack")
}
