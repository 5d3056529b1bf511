//! Run settings from the environment (and `.env`), overridden by the CLI.

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::data::store::{SqliteStore, TableStore};

pub const FILES_PATH_VAR: &str = "FILES_PATH";
pub const DB_PATH_VAR: &str = "DB_PATH";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Root under which `output/` is written.
    pub files_path: PathBuf,
    /// SQLite backing store. `None` means datasets must come from files.
    pub db_path: Option<PathBuf>,
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty()).map(PathBuf::from);
        Self {
            files_path: get(FILES_PATH_VAR).unwrap_or_else(|| PathBuf::from(".")),
            db_path: get(DB_PATH_VAR),
        }
    }

    pub fn with_overrides(mut self, files_path: Option<PathBuf>, db_path: Option<PathBuf>) -> Self {
        if let Some(p) = files_path {
            self.files_path = p;
        }
        if let Some(p) = db_path {
            self.db_path = Some(p);
        }
        self
    }

    pub fn output_dir(&self) -> PathBuf {
        self.files_path.join("output")
    }

    pub fn open_store(&self) -> Result<Option<Box<dyn TableStore>>> {
        let Some(path) = &self.db_path else {
            log::info!("{DB_PATH_VAR} not set, datasets must be supplied as files");
            return Ok(None);
        };
        let store = SqliteStore::open(path)
            .with_context(|| format!("opening backing store {}", path.display()))?;
        log::info!("using backing store {}", path.display());
        Ok(Some(Box::new(store)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let settings = Settings::from_lookup(lookup(&[]));
        assert_eq!(settings.files_path, PathBuf::from("."));
        assert_eq!(settings.db_path, None);
        assert_eq!(settings.output_dir(), PathBuf::from("./output"));
    }

    #[test]
    fn empty_values_count_as_unset() {
        let settings = Settings::from_lookup(lookup(&[(DB_PATH_VAR, " ")]));
        assert_eq!(settings.db_path, None);
    }

    #[test]
    fn cli_overrides_environment() {
        let settings = Settings::from_lookup(lookup(&[
            (FILES_PATH_VAR, "/data/energy"),
            (DB_PATH_VAR, "/data/ds.sqlite"),
        ]))
        .with_overrides(None, Some(PathBuf::from("local.sqlite")));
        assert_eq!(settings.files_path, PathBuf::from("/data/energy"));
        assert_eq!(settings.db_path, Some(PathBuf::from("local.sqlite")));
    }

    #[test]
    fn no_store_without_db_path() {
        let settings = Settings::from_lookup(lookup(&[]));
        assert!(settings.open_store().unwrap().is_none());
    }
}
