//! Drive the requested sectors from loaded datasets to output tables.

use anyhow::{Context, Result};

use crate::calibrate::{calibrate, CalibrationReport, MeteredUsage};
use crate::data::cache::DatasetLoader;
use crate::data::model::Table;
use crate::data::schema::{MeteredUsageRecord, Schema};
use crate::data::tag::DatasetTag;
use crate::error::DatasetError;
use crate::sectors::{
    rows_to_table, Commercial, Industrial, Methodology, Residential, Sector, TableSet, ToTable,
};

/// One sector's finished result table.
#[derive(Debug, Clone)]
pub struct SectorOutput {
    pub sector: Sector,
    pub table: Table,
}

#[derive(Debug, Clone, Default)]
pub struct RunOutcome {
    pub outputs: Vec<SectorOutput>,
    /// Present when commercial/industrial estimates were scaled to metered use.
    pub calibration: Option<CalibrationReport>,
}

/// Resolve a methodology's datasets through the loader and estimate.
pub fn run_methodology<M: Methodology>(m: &M, loader: &mut DatasetLoader) -> Result<Vec<M::Row>> {
    let sector = m.sector();
    let mut tables = TableSet::new();
    for &tag in m.datasets() {
        let table = loader
            .load(tag)
            .with_context(|| format!("loading {tag} for the {sector} sector"))?;
        tables.insert(tag, table);
    }

    log::info!("estimating {sector} sector");
    let rows = m
        .estimate(&tables)
        .with_context(|| format!("estimating the {sector} sector"))?;
    log::info!("{sector} sector: {} rows", rows.len());
    Ok(rows)
}

/// Metered commercial & industrial use, or `None` when no metered dataset
/// was provided.
pub fn load_metered(loader: &mut DatasetLoader) -> Result<Option<MeteredUsage>> {
    let tag = DatasetTag::MasssaveCi;
    let table = match loader.load(tag) {
        Ok(table) => table,
        Err(err) => {
            if let Some(DatasetError::MissingDataset { .. }) = err.downcast_ref::<DatasetError>() {
                log::info!("no {tag} dataset provided, skipping calibration");
                return Ok(None);
            }
            return Err(err);
        }
    };
    let records = MeteredUsageRecord::from_table(&table, tag)?;
    let usage = MeteredUsage::from_records(&records);
    if usage.is_empty() {
        log::warn!("{tag} has no usable rows, skipping calibration");
        return Ok(None);
    }
    Ok(Some(usage))
}

fn output<R: ToTable>(sector: Sector, rows: &[R]) -> SectorOutput {
    SectorOutput {
        sector,
        table: rows_to_table(rows),
    }
}

/// Run every requested sector. Output follows [`Sector::ALL`] order.
pub fn run(requested: &[Sector], loader: &mut DatasetLoader) -> Result<RunOutcome> {
    let wants = |s: Sector| requested.contains(&s);
    let mut outcome = RunOutcome::default();

    let mut commercial = None;
    let mut industrial = None;
    if wants(Sector::Commercial) || wants(Sector::Industrial) {
        match load_metered(loader)? {
            Some(metered) => {
                if !(wants(Sector::Commercial) && wants(Sector::Industrial)) {
                    log::info!("estimating both commercial and industrial sectors for calibration");
                }
                let c = run_methodology(&Commercial, loader)?;
                let i = run_methodology(&Industrial, loader)?;
                let calibrated = calibrate(&c, &i, &metered);
                commercial = wants(Sector::Commercial).then(|| output(Sector::Commercial, &calibrated.commercial));
                industrial = wants(Sector::Industrial).then(|| output(Sector::Industrial, &calibrated.industrial));
                outcome.calibration = Some(calibrated.report);
            }
            None => {
                if wants(Sector::Commercial) {
                    let rows = run_methodology(&Commercial, loader)?;
                    commercial = Some(output(Sector::Commercial, &rows));
                }
                if wants(Sector::Industrial) {
                    let rows = run_methodology(&Industrial, loader)?;
                    industrial = Some(output(Sector::Industrial, &rows));
                }
            }
        }
    }

    let residential = if wants(Sector::Residential) {
        let rows = run_methodology(&Residential, loader)?;
        Some(output(Sector::Residential, &rows))
    } else {
        None
    };

    outcome.outputs = [commercial, residential, industrial]
        .into_iter()
        .flatten()
        .collect();
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::store::MemoryStore;

    fn census() -> Table {
        Table::from_text(
            &["muni_id", "municipal", "naicscode", "naicstitle", "cal_year", "avgemp", "estab"],
            &[&["1", "Testville", "311", "Food manufacturing", "2015", "50", "2"]],
        )
    }

    fn industrial_store() -> MemoryStore {
        let mut store = MemoryStore::new();
        store.insert(DatasetTag::Eowld.store_table().unwrap(), census());
        store.insert(
            DatasetTag::MecsFce.store_table().unwrap(),
            Table::from_text(&["naics_code", "region", "cons_emp"], &[&["311", "Northeast", "400"]]),
        );
        store.insert(
            DatasetTag::MecsAmi.store_table().unwrap(),
            Table::from_text(
                &[
                    "naics_code", "geography", "elec", "ng", "dist_foil", "res_foil", "lpgngl",
                    "coal", "coke", "other", "tot",
                ],
                &[&["311", "Northeast", "40", "30", "6", "4", "10", "0", "5", "5", "100"]],
            ),
        );
        store
    }

    #[test]
    fn missing_metered_data_skips_calibration() {
        let store = industrial_store();
        let mut loader = DatasetLoader::new(Vec::new(), Some(Box::new(store)));
        let outcome = run(&[Sector::Industrial], &mut loader).unwrap();
        assert!(outcome.calibration.is_none());
        assert_eq!(outcome.outputs.len(), 1);
        assert_eq!(outcome.outputs[0].sector, Sector::Industrial);
        assert_eq!(outcome.outputs[0].table.len(), 1);
        // commercial inputs are never touched
        assert!(!loader.is_cached(DatasetTag::CbecsElec));
    }

    #[test]
    fn missing_sector_input_names_the_dataset() {
        let mut loader = DatasetLoader::new(Vec::new(), Some(Box::new(MemoryStore::new())));
        let err = run(&[Sector::Residential], &mut loader).unwrap_err();
        assert!(format!("{err:#}").contains("acs_uis"), "{err:#}");
    }
}
