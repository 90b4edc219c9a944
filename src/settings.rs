//! Runtime settings and catalog file discovery.
//!
//! Settings come from built-in defaults, then an optional settings file, then
//! `TRAJCAT_*` environment variables (`TRAJCAT_CATALOGS`, `TRAJCAT_INSTALL_DIR`,
//! `TRAJCAT_LOG`).

use std::env;
use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::Deserialize;
use tracing::debug;

use crate::error::{CatalogError, Result};

pub const ENV_PREFIX: &str = "TRAJCAT";
pub const DEFAULT_INSTALL_DIR: &str = "/usr/local/share/trajcat";
pub const CATALOG_EXTENSION: &str = "cat";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Settings {
    /// directory searched for catalogs after the working directory
    pub catalogs: Option<PathBuf>,
    /// last directory searched for catalogs
    pub install_dir: PathBuf,
    /// default log filter for the binary
    pub log: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self { catalogs: None, install_dir: PathBuf::from(DEFAULT_INSTALL_DIR), log: "warn".to_owned() }
    }
}

impl Settings {
    /// Defaults overlaid with the environment.
    pub fn from_env() -> Result<Self> {
        Self::load(None)
    }

    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("install_dir", DEFAULT_INSTALL_DIR)?
            .set_default("log", "warn")?;
        if let Some(file) = file {
            builder = builder.add_source(File::from(file).required(true));
        }
        let built = builder.add_source(Environment::with_prefix(ENV_PREFIX)).build()?;
        Ok(built.try_deserialize()?)
    }

    /// Finds the catalog file for a locator: `<locator>.cat` in the working
    /// directory, the catalogs directory and the install directory, in that
    /// order; failing those, the locator is taken as the name of an
    /// environment variable holding the path.
    pub fn find_catalog(&self, locator: &str) -> Result<PathBuf> {
        if locator.is_empty() {
            return Err(CatalogError::ConfigNotFound("no catalog locator given".to_owned()));
        }
        let file_name = format!("{locator}.{CATALOG_EXTENSION}");
        let mut candidates = vec![PathBuf::from(&file_name)];
        if let Some(dir) = &self.catalogs {
            candidates.push(dir.join(&file_name));
        }
        candidates.push(self.install_dir.join(&file_name));
        for candidate in candidates {
            debug!(path = %candidate.display(), "probing for catalog");
            if candidate.is_file() {
                return Ok(candidate);
            }
        }
        match env::var(locator) {
            Ok(path) if !path.is_empty() => {
                debug!(variable = locator, path = %path, "catalog named by environment");
                Ok(PathBuf::from(path))
            }
            _ => Err(CatalogError::ConfigNotFound(locator.to_owned())),
        }
    }
}
