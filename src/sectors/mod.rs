//! Per-sector estimation methodologies.
//!
//! Architecture:
//! ```text
//!   DatasetLoader ──► TableSet (tag → Arc<Table>)
//!                         │
//!                         ▼
//!              Methodology::estimate      pure, no I/O
//!                         │
//!                         ▼
//!                 Vec<Methodology::Row>  ──► calibrate (C & I) ──► Table
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{bail, Result};

use crate::data::model::Table;
use crate::data::schema::Schema;
use crate::data::tag::DatasetTag;
use crate::error::DatasetError;

pub mod commercial;
pub mod industrial;
pub mod residential;

pub use commercial::{Commercial, CommercialEstimate};
pub use industrial::{Industrial, IndustrialEstimate};
pub use residential::{Residential, ResidentialEstimate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Sector {
    Commercial,
    Residential,
    Industrial,
}

impl Sector {
    pub const ALL: [Sector; 3] = [Sector::Commercial, Sector::Residential, Sector::Industrial];

    pub fn as_str(self) -> &'static str {
        match self {
            Sector::Commercial => "commercial",
            Sector::Residential => "residential",
            Sector::Industrial => "industrial",
        }
    }

    pub fn valid_names() -> String {
        Sector::ALL.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", ")
    }

    /// Resolve sector arguments into run order. No arguments, or `all`
    /// anywhere, selects every sector. Unknown names are returned as messages
    /// naming the valid sectors; the known ones are still selected.
    pub fn select<S: AsRef<str>>(names: &[S]) -> (Vec<Sector>, Vec<String>) {
        if names.is_empty() || names.iter().any(|n| n.as_ref().trim().eq_ignore_ascii_case("all")) {
            return (Sector::ALL.to_vec(), Vec::new());
        }
        let mut wanted = Vec::new();
        let mut rejected = Vec::new();
        for name in names {
            match name.as_ref().parse::<Sector>() {
                Ok(sector) => wanted.push(sector),
                Err(msg) => rejected.push(msg),
            }
        }
        let selected = Sector::ALL.into_iter().filter(|s| wanted.contains(s)).collect();
        (selected, rejected)
    }
}

impl fmt::Display for Sector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sector {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Sector::ALL
            .into_iter()
            .find(|sector| sector.as_str() == wanted)
            .ok_or_else(|| {
                format!(
                    "{s} is not a valid sector! Valid sector arguments are {}.",
                    Sector::valid_names()
                )
            })
    }
}

// ---------------------------------------------------------------------------
// TableSet – the resolved inputs of one methodology
// ---------------------------------------------------------------------------

/// The named tables handed to a methodology.
#[derive(Debug, Clone, Default)]
pub struct TableSet {
    tables: BTreeMap<DatasetTag, Arc<Table>>,
}

impl TableSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, tag: DatasetTag, table: Arc<Table>) {
        self.tables.insert(tag, table);
    }

    pub fn with(mut self, tag: DatasetTag, table: Table) -> Self {
        self.insert(tag, Arc::new(table));
        self
    }

    pub fn get(&self, tag: DatasetTag) -> Result<&Table> {
        match self.tables.get(&tag) {
            Some(table) => Ok(table.as_ref()),
            None => bail!(DatasetError::MissingDataset { tag }),
        }
    }

    /// Read a dataset through its declared schema.
    pub fn records<S: Schema>(&self, tag: DatasetTag) -> Result<Vec<S>> {
        S::from_table(self.get(tag)?, tag)
    }
}

/// A sector methodology: a pure function from named tables to result rows.
pub trait Methodology {
    type Row;

    fn sector(&self) -> Sector;

    /// Datasets `estimate` reads.
    fn datasets(&self) -> &'static [DatasetTag];

    fn estimate(&self, tables: &TableSet) -> Result<Vec<Self::Row>>;
}

/// Result rows that can be written out as a table.
pub trait ToTable {
    fn columns() -> Vec<String>;
    fn to_row(&self) -> Vec<crate::data::model::Value>;
}

pub fn rows_to_table<R: ToTable>(rows: &[R]) -> Table {
    Table::new(&R::columns(), rows.iter().map(ToTable::to_row).collect())
}

/// Most recent year among census rows already narrowed to a NAICS range.
pub(crate) fn latest_year<I>(years: I) -> Option<i64>
where
    I: IntoIterator<Item = Option<i64>>,
{
    years.into_iter().flatten().max()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sector_names_parse() {
        assert_eq!("Industrial".parse::<Sector>(), Ok(Sector::Industrial));
        let err = "agricultural".parse::<Sector>().unwrap_err();
        assert!(err.contains("commercial, residential, industrial"));
    }

    #[test]
    fn unknown_sector_is_reported_and_the_rest_still_run() {
        let (selected, rejected) = Sector::select(&["commercial", "bogus"]);
        assert_eq!(selected, vec![Sector::Commercial]);
        assert_eq!(rejected.len(), 1);
        assert!(rejected[0].starts_with("bogus is not a valid sector"));
        assert!(rejected[0].contains("commercial, residential, industrial"));
    }

    #[test]
    fn all_or_nothing_selects_every_sector() {
        let (selected, rejected) = Sector::select(&["residential", "ALL"]);
        assert_eq!(selected, Sector::ALL.to_vec());
        assert!(rejected.is_empty());

        let (selected, rejected) = Sector::select::<&str>(&[]);
        assert_eq!(selected, Sector::ALL.to_vec());
        assert!(rejected.is_empty());
    }

    #[test]
    fn selection_follows_run_order() {
        let (selected, _) = Sector::select(&["industrial", "commercial", "industrial"]);
        assert_eq!(selected, vec![Sector::Commercial, Sector::Industrial]);
    }

    #[test]
    fn only_unknown_names_select_nothing() {
        let (selected, rejected) = Sector::select(&["farms"]);
        assert!(selected.is_empty());
        assert_eq!(rejected.len(), 1);
    }

    #[test]
    fn missing_table_in_set() {
        let set = TableSet::new();
        let err = set.get(DatasetTag::Eowld).unwrap_err();
        assert_eq!(
            err.downcast_ref::<DatasetError>(),
            Some(&DatasetError::MissingDataset {
                tag: DatasetTag::Eowld
            })
        );
    }
}
