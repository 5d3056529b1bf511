//! Declared schemas for every dataset the methodologies read.
//!
//! Each record type resolves its columns once against the loaded [`Table`]
//! and fails with [`DatasetError::MissingColumn`] if one is absent, so no
//! methodology ever looks a column up by string at row level.

use anyhow::Result;

use super::model::{Table, Value};
use super::tag::DatasetTag;
use crate::error::DatasetError;
use crate::measure::Measure;

/// A typed view over the rows of one dataset.
pub trait Schema: Sized {
    fn from_table(table: &Table, tag: DatasetTag) -> Result<Vec<Self>>;
}

/// Resolved column positions for one table.
struct Columns<'a> {
    table: &'a Table,
    tag: DatasetTag,
}

impl<'a> Columns<'a> {
    fn new(table: &'a Table, tag: DatasetTag) -> Self {
        Self { table, tag }
    }

    fn require(&self, name: &str) -> Result<usize, DatasetError> {
        self.table
            .column_index(name)
            .ok_or_else(|| DatasetError::MissingColumn {
                dataset: self.tag,
                column: name.to_string(),
            })
    }

    fn optional(&self, name: &str) -> Option<usize> {
        self.table.column_index(name)
    }
}

/// Read one cell as a measure, attaching dataset/row/column on failure.
fn measure(
    row: &[Value],
    idx: usize,
    tag: DatasetTag,
    row_no: usize,
    table: &Table,
) -> Result<Measure, DatasetError> {
    row[idx].as_measure().map_err(|value| DatasetError::InvalidCell {
        dataset: tag,
        row: row_no,
        column: table.columns()[idx].clone(),
        value,
    })
}

fn text(row: &[Value], idx: usize) -> String {
    row[idx].as_text().map(|s| s.trim().to_string()).unwrap_or_default()
}

// ---------------------------------------------------------------------------
// eowld
// ---------------------------------------------------------------------------

/// One municipality × NAICS × year row of the employment census.
#[derive(Debug, Clone, PartialEq)]
pub struct EmploymentRecord {
    pub muni_id: Option<i64>,
    pub municipal: String,
    pub naics_code: Option<i64>,
    pub naics_title: String,
    pub cal_year: Option<i64>,
    pub avg_employment: Measure,
    pub establishments: Measure,
}

impl Schema for EmploymentRecord {
    fn from_table(table: &Table, tag: DatasetTag) -> Result<Vec<Self>> {
        let cols = Columns::new(table, tag);
        let muni_id = cols.optional("muni_id");
        let municipal = cols.require("municipal")?;
        let naics = cols.require("naicscode")?;
        let title = cols.optional("naicstitle");
        let year = cols.require("cal_year")?;
        let avgemp = cols.require("avgemp")?;
        let estab = cols.require("estab")?;

        table
            .rows()
            .iter()
            .enumerate()
            .map(|(i, row)| -> Result<Self> {
                Ok(EmploymentRecord {
                    muni_id: muni_id.and_then(|idx| row[idx].as_i64()),
                    municipal: text(row, municipal),
                    naics_code: row[naics].as_i64(),
                    naics_title: title.map(|idx| text(row, idx)).unwrap_or_default(),
                    cal_year: row[year].as_i64(),
                    avg_employment: measure(row, avgemp, tag, i, table)?,
                    establishments: measure(row, estab, tag, i, table)?,
                })
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// cbecs_elec / cbecs_ng / cbecs_foil
// ---------------------------------------------------------------------------

/// Building-energy survey rates for one principal building activity.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildingSurveyRecord {
    pub activity: String,
    pub con_per_building: Measure,
    pub exp_per_building: Measure,
    pub con_per_worker: Measure,
    pub exp_per_worker: Measure,
}

impl Schema for BuildingSurveyRecord {
    fn from_table(table: &Table, tag: DatasetTag) -> Result<Vec<Self>> {
        let cols = Columns::new(table, tag);
        let activity = cols.require("activity")?;
        let cpb = cols.require("cnsperbldng")?;
        let epb = cols.require("experbldng")?;
        let cpw = cols.require("cnsperworker")?;
        let epw = cols.require("experworker")?;

        table
            .rows()
            .iter()
            .enumerate()
            .map(|(i, row)| -> Result<Self> {
                Ok(BuildingSurveyRecord {
                    activity: text(row, activity),
                    con_per_building: measure(row, cpb, tag, i, table)?,
                    exp_per_building: measure(row, epb, tag, i, table)?,
                    con_per_worker: measure(row, cpw, tag, i, table)?,
                    exp_per_worker: measure(row, epw, tag, i, table)?,
                })
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// cbecs_sources
// ---------------------------------------------------------------------------

/// Building counts by energy source for one building activity.
#[derive(Debug, Clone, PartialEq)]
pub struct EnergySourcesRecord {
    pub activity: String,
    pub all: Measure,
    pub natural_gas: Measure,
    pub fuel_oil: Measure,
}

impl Schema for EnergySourcesRecord {
    fn from_table(table: &Table, tag: DatasetTag) -> Result<Vec<Self>> {
        let cols = Columns::new(table, tag);
        let activity = cols.require("activity")?;
        let all = cols.require("all")?;
        let ng = cols.require("ng")?;
        let fueloil = cols.require("fueloil")?;

        table
            .rows()
            .iter()
            .enumerate()
            .map(|(i, row)| -> Result<Self> {
                Ok(EnergySourcesRecord {
                    activity: text(row, activity),
                    all: measure(row, all, tag, i, table)?,
                    natural_gas: measure(row, ng, tag, i, table)?,
                    fuel_oil: measure(row, fueloil, tag, i, table)?,
                })
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// mecs_fce
// ---------------------------------------------------------------------------

/// Manufacturing energy consumption per employee (MMBtu) for one NAICS code.
#[derive(Debug, Clone, PartialEq)]
pub struct IntensityRecord {
    pub naics_code: Option<i64>,
    pub region: String,
    pub cons_per_employee: Measure,
}

impl Schema for IntensityRecord {
    fn from_table(table: &Table, tag: DatasetTag) -> Result<Vec<Self>> {
        let cols = Columns::new(table, tag);
        let naics = cols.require("naics_code")?;
        let region = cols.require("region")?;
        let cons = cols.require("cons_emp")?;

        table
            .rows()
            .iter()
            .enumerate()
            .map(|(i, row)| -> Result<Self> {
                Ok(IntensityRecord {
                    naics_code: row[naics].as_i64(),
                    region: text(row, region),
                    cons_per_employee: measure(row, cons, tag, i, table)?,
                })
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// mecs_ami
// ---------------------------------------------------------------------------

/// Manufacturing fuel consumption by fuel for one NAICS code.
#[derive(Debug, Clone, PartialEq)]
pub struct FuelMixRecord {
    pub naics_code: Option<i64>,
    pub geography: String,
    pub electricity: Measure,
    pub natural_gas: Measure,
    pub distillate_oil: Measure,
    pub residual_oil: Measure,
    pub lpg_ngl: Measure,
    pub coal: Measure,
    pub coke: Measure,
    pub other: Measure,
    pub total: Measure,
}

impl Schema for FuelMixRecord {
    fn from_table(table: &Table, tag: DatasetTag) -> Result<Vec<Self>> {
        let cols = Columns::new(table, tag);
        let naics = cols.require("naics_code")?;
        let geography = cols.require("geography")?;
        let elec = cols.require("elec")?;
        let ng = cols.require("ng")?;
        let dist = cols.require("dist_foil")?;
        let res = cols.require("res_foil")?;
        let lpg = cols.require("lpgngl")?;
        let coal = cols.require("coal")?;
        let coke = cols.require("coke")?;
        let other = cols.require("other")?;
        let tot = cols.require("tot")?;

        table
            .rows()
            .iter()
            .enumerate()
            .map(|(i, row)| -> Result<Self> {
                let m = |idx| measure(row, idx, tag, i, table);
                Ok(FuelMixRecord {
                    naics_code: row[naics].as_i64(),
                    geography: text(row, geography),
                    electricity: m(elec)?,
                    natural_gas: m(ng)?,
                    distillate_oil: m(dist)?,
                    residual_oil: m(res)?,
                    lpg_ngl: m(lpg)?,
                    coal: m(coal)?,
                    coke: m(coke)?,
                    other: m(other)?,
                    total: m(tot)?,
                })
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// recs_sc
// ---------------------------------------------------------------------------

/// Housing units of one structure type in Massachusetts (millions).
#[derive(Debug, Clone, PartialEq)]
pub struct StructureShareRecord {
    pub hu_type: String,
    pub massachusetts: Measure,
}

impl Schema for StructureShareRecord {
    fn from_table(table: &Table, tag: DatasetTag) -> Result<Vec<Self>> {
        let cols = Columns::new(table, tag);
        let hu_type = cols.require("hu_type")?;
        let ma = cols.require("ma")?;

        table
            .rows()
            .iter()
            .enumerate()
            .map(|(i, row)| -> Result<Self> {
                Ok(StructureShareRecord {
                    hu_type: text(row, hu_type),
                    massachusetts: measure(row, ma, tag, i, table)?,
                })
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// recs_hfc / recs_hfe
// ---------------------------------------------------------------------------

/// Average per-household consumption (MMBtu) or expenditure (dollars) by fuel.
#[derive(Debug, Clone, PartialEq)]
pub struct HouseholdFuelRecord {
    pub geography: String,
    pub hu_type: String,
    pub avg_elec: Measure,
    pub avg_ng: Measure,
    pub avg_foil: Measure,
}

impl Schema for HouseholdFuelRecord {
    fn from_table(table: &Table, tag: DatasetTag) -> Result<Vec<Self>> {
        let cols = Columns::new(table, tag);
        let geography = cols.require("geography")?;
        let hu_type = cols.require("hu_type")?;
        let elec = cols.require("avg_elec")?;
        let ng = cols.require("avg_ng")?;
        let foil = cols.require("avg_foil")?;

        table
            .rows()
            .iter()
            .enumerate()
            .map(|(i, row)| -> Result<Self> {
                Ok(HouseholdFuelRecord {
                    geography: text(row, geography),
                    hu_type: text(row, hu_type),
                    avg_elec: measure(row, elec, tag, i, table)?,
                    avg_ng: measure(row, ng, tag, i, table)?,
                    avg_foil: measure(row, foil, tag, i, table)?,
                })
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// acs_uis
// ---------------------------------------------------------------------------

/// Housing units by units-in-structure for one municipality and survey period.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitsInStructureRecord {
    pub muni_id: Option<i64>,
    pub municipal: String,
    pub acs_year: String,
    pub u1a: Measure,
    pub u1d: Measure,
    pub u2_4: Measure,
    pub u5_9: Measure,
    pub u10_19: Measure,
    pub u20ov: Measure,
    pub u_oth: Measure,
}

impl Schema for UnitsInStructureRecord {
    fn from_table(table: &Table, tag: DatasetTag) -> Result<Vec<Self>> {
        let cols = Columns::new(table, tag);
        let muni_id = cols.require("muni_id")?;
        let municipal = cols.require("municipal")?;
        let acs_year = cols.require("acs_year")?;
        let u1a = cols.require("u1a")?;
        let u1d = cols.require("u1d")?;
        let u2_4 = cols.require("u2_4")?;
        let u5_9 = cols.require("u5_9")?;
        let u10_19 = cols.require("u10_19")?;
        let u20ov = cols.require("u20ov")?;
        let u_oth = cols.require("u_oth")?;

        table
            .rows()
            .iter()
            .enumerate()
            .map(|(i, row)| -> Result<Self> {
                let m = |idx| measure(row, idx, tag, i, table);
                Ok(UnitsInStructureRecord {
                    muni_id: row[muni_id].as_i64(),
                    municipal: text(row, municipal),
                    acs_year: text(row, acs_year),
                    u1a: m(u1a)?,
                    u1d: m(u1d)?,
                    u2_4: m(u2_4)?,
                    u5_9: m(u5_9)?,
                    u10_19: m(u10_19)?,
                    u20ov: m(u20ov)?,
                    u_oth: m(u_oth)?,
                })
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// acs_hf
// ---------------------------------------------------------------------------

/// Occupied housing units by heating fuel for one municipality.
#[derive(Debug, Clone, PartialEq)]
pub struct HeatingFuelRecord {
    pub muni_id: Option<i64>,
    pub acs_year: String,
    pub gas: Measure,
    pub electricity: Measure,
    pub oil: Measure,
}

impl Schema for HeatingFuelRecord {
    fn from_table(table: &Table, tag: DatasetTag) -> Result<Vec<Self>> {
        let cols = Columns::new(table, tag);
        let muni_id = cols.require("muni_id")?;
        let acs_year = cols.require("acs_year")?;
        let gas = cols.require("gas")?;
        let elec = cols.require("elec")?;
        let oil = cols.require("oil")?;

        table
            .rows()
            .iter()
            .enumerate()
            .map(|(i, row)| -> Result<Self> {
                Ok(HeatingFuelRecord {
                    muni_id: row[muni_id].as_i64(),
                    acs_year: text(row, acs_year),
                    gas: measure(row, gas, tag, i, table)?,
                    electricity: measure(row, elec, tag, i, table)?,
                    oil: measure(row, oil, tag, i, table)?,
                })
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// masssave_ci
// ---------------------------------------------------------------------------

/// Metered commercial & industrial utility-program use for a municipality/year.
#[derive(Debug, Clone, PartialEq)]
pub struct MeteredUsageRecord {
    pub municipal: String,
    pub cal_year: Option<i64>,
    pub mwh: Measure,
    pub therms: Measure,
}

impl Schema for MeteredUsageRecord {
    fn from_table(table: &Table, tag: DatasetTag) -> Result<Vec<Self>> {
        let cols = Columns::new(table, tag);
        let municipal = cols.require("municipal")?;
        let year = cols.require("cal_year")?;
        let mwh = cols.require("mwh_use")?;
        let therm = cols.require("therm_use")?;

        table
            .rows()
            .iter()
            .enumerate()
            .map(|(i, row)| -> Result<Self> {
                Ok(MeteredUsageRecord {
                    municipal: text(row, municipal),
                    cal_year: row[year].as_i64(),
                    mwh: measure(row, mwh, tag, i, table)?,
                    therms: measure(row, therm, tag, i, table)?,
                })
            })
            .collect()
    }
}
