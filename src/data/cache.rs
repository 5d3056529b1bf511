use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};

use super::filter::remove_aggregate_geographies;
use super::loader::load_file;
use super::model::Table;
use super::store::TableStore;
use super::tag::DatasetTag;
use crate::error::DatasetError;

/// A file supplied on the command line in place of a dataset's store table.
#[derive(Debug, Clone, PartialEq)]
pub struct FileOverride {
    pub path: PathBuf,
    pub tag: DatasetTag,
}

impl FileOverride {
    /// Parse flat `PATH TAG` argument pairs as the command line collects them.
    pub fn from_args<S: AsRef<str>>(args: &[S]) -> Result<Vec<FileOverride>, DatasetError> {
        args.chunks_exact(2)
            .map(|pair| -> Result<FileOverride, DatasetError> {
                Ok(FileOverride {
                    path: PathBuf::from(pair[0].as_ref()),
                    tag: pair[1].as_ref().parse()?,
                })
            })
            .collect()
    }
}

/// Resolves dataset tags to tables for one run.
///
/// Each tag is loaded at most once: the first request reads the override file
/// (or the backing store), applies the geography filter and caches the result;
/// later requests, from any sector, get the same `Arc<Table>`.
pub struct DatasetLoader {
    overrides: BTreeMap<DatasetTag, PathBuf>,
    store: Option<Box<dyn TableStore>>,
    cache: HashMap<DatasetTag, Arc<Table>>,
}

impl DatasetLoader {
    pub fn new(overrides: Vec<FileOverride>, store: Option<Box<dyn TableStore>>) -> Self {
        let mut by_tag = BTreeMap::new();
        for o in overrides {
            // First override for a tag wins, later ones never get loaded.
            if by_tag.contains_key(&o.tag) {
                log::warn!("ignoring second file override for {}: {}", o.tag, o.path.display());
                continue;
            }
            by_tag.insert(o.tag, o.path);
        }
        Self {
            overrides: by_tag,
            store,
            cache: HashMap::new(),
        }
    }

    pub fn load(&mut self, tag: DatasetTag) -> Result<Arc<Table>> {
        if let Some(table) = self.cache.get(&tag) {
            return Ok(Arc::clone(table));
        }

        let raw = self.fetch_raw(tag)?;
        let table = Arc::new(remove_aggregate_geographies(&raw));
        self.cache.insert(tag, Arc::clone(&table));
        Ok(table)
    }

    /// Whether a tag is already resolved.
    pub fn is_cached(&self, tag: DatasetTag) -> bool {
        self.cache.contains_key(&tag)
    }

    fn fetch_raw(&self, tag: DatasetTag) -> Result<Table> {
        if let Some(path) = self.overrides.get(&tag) {
            log::info!("loading {tag} from file {}", path.display());
            return load_file(path).with_context(|| format!("loading {tag} from {}", path.display()));
        }

        let Some(table_name) = tag.store_table() else {
            bail!(DatasetError::MissingDataset { tag });
        };
        let Some(store) = &self.store else {
            bail!(DatasetError::StoreNotConfigured { tag });
        };

        log::info!("loading {tag} from table {table_name}");
        store
            .fetch(table_name)
            .with_context(|| format!("loading {tag} from the backing store"))
    }
}
