use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::csv::CsvOptions;
use crate::selection_model::SelectionModelOptions;
use crate::staged_rows::DEFAULT_CLIENT_PRIMARY_KEY;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GridPreferences {
    #[serde(default)]
    pub copy_with_headers: bool,
    #[serde(default = "default_true")]
    pub select_active_cell: bool,
    #[serde(default = "default_client_primary_key")]
    pub client_primary_key: String,
    #[serde(default)]
    pub csv: CsvOptions,
}

fn default_true() -> bool {
    true
}

fn default_client_primary_key() -> String {
    DEFAULT_CLIENT_PRIMARY_KEY.to_string()
}

impl Default for GridPreferences {
    fn default() -> Self {
        Self {
            copy_with_headers: false,
            select_active_cell: true,
            client_primary_key: default_client_primary_key(),
            csv: CsvOptions::default(),
        }
    }
}

impl GridPreferences {
    #[must_use]
    pub fn selection_model_options(&self) -> SelectionModelOptions {
        SelectionModelOptions {
            select_active_cell: self.select_active_cell,
        }
    }
}

#[derive(Debug, Error)]
pub enum PreferencesError {
    #[error("config directory is unavailable for this platform")]
    ConfigDirUnavailable,
    #[error("failed to read preferences file at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse preferences file at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("failed to create config directory at {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize preferences: {source}")]
    Serialize {
        #[source]
        source: toml::ser::Error,
    },
    #[error("failed to write preferences file at {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PreferencesDocument {
    #[serde(default)]
    grid: GridPreferences,
}

#[derive(Debug, Clone)]
pub struct FilePreferencesStore {
    path: PathBuf,
    preferences: GridPreferences,
}

impl FilePreferencesStore {
    pub fn load_default() -> Result<Self, PreferencesError> {
        let path = default_preferences_path()?;
        Self::load_from_path(path)
    }

    pub fn load_from_path(path: impl Into<PathBuf>) -> Result<Self, PreferencesError> {
        let path = path.into();
        if !path.exists() {
            return Ok(Self {
                path,
                preferences: GridPreferences::default(),
            });
        }

        let raw = fs::read_to_string(&path).map_err(|source| PreferencesError::Read {
            path: path.clone(),
            source,
        })?;

        let doc: PreferencesDocument =
            toml::from_str(&raw).map_err(|source| PreferencesError::Parse {
                path: path.clone(),
                source,
            })?;
        log::debug!("loaded preferences from {}", path.display());

        Ok(Self {
            path,
            preferences: doc.grid,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn preferences(&self) -> &GridPreferences {
        &self.preferences
    }

    pub fn preferences_mut(&mut self) -> &mut GridPreferences {
        &mut self.preferences
    }

    pub fn persist(&self) -> Result<(), PreferencesError> {
        if let Some(parent_dir) = self.path.parent() {
            fs::create_dir_all(parent_dir).map_err(|source| PreferencesError::CreateDir {
                path: parent_dir.to_path_buf(),
                source,
            })?;
        }

        let doc = PreferencesDocument {
            grid: self.preferences.clone(),
        };
        let rendered = toml::to_string_pretty(&doc)
            .map_err(|source| PreferencesError::Serialize { source })?;

        fs::write(&self.path, rendered).map_err(|source| PreferencesError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

/// Directory holding the preferences file and the log.
pub fn config_dir() -> Result<PathBuf, PreferencesError> {
    let base_dir = if let Some(custom) = env::var_os("QGRID_CONFIG_DIR") {
        PathBuf::from(custom)
    } else if cfg!(target_os = "windows") {
        env::var_os("APPDATA")
            .map(PathBuf::from)
            .ok_or(PreferencesError::ConfigDirUnavailable)?
    } else if let Some(xdg_config_home) = env::var_os("XDG_CONFIG_HOME") {
        PathBuf::from(xdg_config_home)
    } else {
        let home = env::var_os("HOME").ok_or(PreferencesError::ConfigDirUnavailable)?;
        PathBuf::from(home).join(".config")
    };

    Ok(base_dir.join("qgrid"))
}

pub fn default_preferences_path() -> Result<PathBuf, PreferencesError> {
    Ok(config_dir()?.join("preferences.toml"))
}
