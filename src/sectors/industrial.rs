//! Industrial sector: manufacturing energy intensity per employee, split by
//! the regional fuel mix of each NAICS code.

use std::collections::BTreeMap;

use anyhow::Result;

use super::{latest_year, Methodology, Sector, TableSet, ToTable};
use crate::calibrate::{CalibrationStatus, MeteredRow, CALIBRATED_FUELS};
use crate::data::model::Value;
use crate::data::schema::{EmploymentRecord, FuelMixRecord, IntensityRecord};
use crate::data::tag::DatasetTag;
use crate::fuel::{FactorTable, FuelType, FuelUse, INDUSTRIAL_FACTORS, METERED_FUELS};
use crate::measure::{self, Measure};

/// NAICS range of manufacturing establishments.
pub const NAICS_RANGE: std::ops::RangeInclusive<i64> = 311..=339;

/// Census region whose survey rows apply to Massachusetts.
pub const REGION: &str = "northeast";

const ALL_FUELS: [FuelType; 4] = [
    FuelType::Electricity,
    FuelType::NaturalGas,
    FuelType::FuelOil,
    FuelType::Other,
];

/// One municipality × NAICS result row.
#[derive(Debug, Clone, PartialEq)]
pub struct IndustrialEstimate {
    pub muni_id: Option<i64>,
    pub municipal: String,
    pub year: Option<i64>,
    pub calibration: Option<CalibrationStatus>,
    pub naics_code: i64,
    pub naics_title: String,
    pub avg_employment: Measure,
    pub establishments: Measure,
    pub cons_per_employee: Measure,
    pub shares: BTreeMap<FuelType, Measure>,
    pub fuels: BTreeMap<FuelType, FuelUse>,
    pub total_con_mmbtu: Measure,
}

impl IndustrialEstimate {
    /// Employment × regional intensity, before any fuel split.
    fn energy(&self) -> Measure {
        measure::product(self.avg_employment, self.cons_per_employee)
    }

    /// Modeled energy moved by whatever calibration changed in the metered
    /// fuels. Energy behind a suppressed fuel-mix cell stays in the total.
    fn refresh_total_mmbtu(&mut self) {
        let energy = self.energy();
        let shift = measure::sum_available(CALIBRATED_FUELS.into_iter().map(|fuel| {
            let modeled = measure::product(energy, self.shares.get(&fuel).copied().flatten())?;
            let current = self.fuels.get(&fuel).and_then(|f| f.con_mmbtu).unwrap_or(0.0);
            Some(current - modeled)
        }));
        self.total_con_mmbtu = match shift {
            Some(delta) => energy.map(|e| e + delta),
            None => energy,
        };
    }
}

/// Fraction of a NAICS code's energy supplied by each fuel.
pub fn fuel_shares(mix: &FuelMixRecord) -> BTreeMap<FuelType, Measure> {
    let fuel_oil = measure::sum_available([mix.distillate_oil, mix.residual_oil]);
    let other = measure::sum_available([mix.lpg_ngl, mix.coal, mix.coke, mix.other]);
    [
        (FuelType::Electricity, mix.electricity),
        (FuelType::NaturalGas, mix.natural_gas),
        (FuelType::FuelOil, fuel_oil),
        (FuelType::Other, other),
    ]
    .into_iter()
    .map(|(fuel, amount)| (fuel, measure::ratio(amount, mix.total)))
    .collect()
}

/// Split one fuel's MMBtu back into units, dollars and emissions.
fn estimate_fuel(fuel: FuelType, mmbtu: Measure, factors: &FactorTable) -> FuelUse {
    match factors.get(fuel) {
        Some(f) => {
            let con_pu = f.to_physical_units(mmbtu);
            FuelUse {
                con_pu,
                exp_dollar: f.dollars_per_unit.and_then(|price| measure::scale(con_pu, price)),
                con_mmbtu: mmbtu,
                emissions_co2: f.emissions(con_pu),
            }
        }
        None => FuelUse {
            con_mmbtu: mmbtu,
            ..FuelUse::default()
        },
    }
}

pub struct Industrial;

impl Methodology for Industrial {
    type Row = IndustrialEstimate;

    fn sector(&self) -> Sector {
        Sector::Industrial
    }

    fn datasets(&self) -> &'static [DatasetTag] {
        &[DatasetTag::Eowld, DatasetTag::MecsFce, DatasetTag::MecsAmi]
    }

    fn estimate(&self, tables: &TableSet) -> Result<Vec<IndustrialEstimate>> {
        let census: Vec<EmploymentRecord> = tables
            .records::<EmploymentRecord>(DatasetTag::Eowld)?
            .into_iter()
            .filter(|r| r.naics_code.is_some_and(|c| NAICS_RANGE.contains(&c)))
            .collect();
        let Some(year) = latest_year(census.iter().map(|r| r.cal_year)) else {
            log::warn!("no manufacturing establishments in the employment census");
            return Ok(Vec::new());
        };
        log::info!("industrial census year {year}");

        let intensity: BTreeMap<i64, Measure> = tables
            .records::<IntensityRecord>(DatasetTag::MecsFce)?
            .into_iter()
            .filter(|r| r.region.eq_ignore_ascii_case(REGION))
            .filter_map(|r| Some((r.naics_code?, r.cons_per_employee)))
            .collect();

        let mix: BTreeMap<i64, BTreeMap<FuelType, Measure>> = tables
            .records::<FuelMixRecord>(DatasetTag::MecsAmi)?
            .iter()
            .filter(|r| r.geography.eq_ignore_ascii_case(REGION))
            .filter_map(|r| Some((r.naics_code?, fuel_shares(r))))
            .collect();

        let mut results: Vec<IndustrialEstimate> = census
            .into_iter()
            .filter(|r| r.cal_year == Some(year))
            .filter_map(|r| {
                let code = r.naics_code?;
                let cons_per_employee = *intensity.get(&code)?;
                let shares = mix.get(&code)?.clone();
                Some((r, code, cons_per_employee, shares))
            })
            .map(|(r, code, cons_per_employee, shares)| {
                let energy = measure::product(r.avg_employment, cons_per_employee);
                let fuels = ALL_FUELS
                    .into_iter()
                    .map(|fuel| {
                        let share = shares.get(&fuel).copied().flatten();
                        let mmbtu = measure::product(energy, share);
                        (fuel, estimate_fuel(fuel, mmbtu, &INDUSTRIAL_FACTORS))
                    })
                    .collect();
                IndustrialEstimate {
                    muni_id: r.muni_id,
                    municipal: r.municipal,
                    year: None,
                    calibration: None,
                    naics_code: code,
                    naics_title: r.naics_title,
                    avg_employment: r.avg_employment,
                    establishments: r.establishments,
                    cons_per_employee,
                    shares,
                    fuels,
                    total_con_mmbtu: energy,
                }
            })
            .collect();

        sort_rows(&mut results);
        Ok(results)
    }
}

pub(crate) fn sort_rows(rows: &mut [IndustrialEstimate]) {
    rows.sort_by(|a, b| {
        (a.municipal.as_str(), a.year, a.naics_code)
            .cmp(&(b.municipal.as_str(), b.year, b.naics_code))
    });
}

impl MeteredRow for IndustrialEstimate {
    fn municipal(&self) -> &str {
        &self.municipal
    }

    fn factors(&self) -> &'static FactorTable {
        &INDUSTRIAL_FACTORS
    }

    fn fuel(&self, fuel: FuelType) -> Option<&FuelUse> {
        self.fuels.get(&fuel)
    }

    fn fuel_mut(&mut self, fuel: FuelType) -> Option<&mut FuelUse> {
        self.fuels.get_mut(&fuel)
    }

    fn stamp(&mut self, year: i64, status: CalibrationStatus) {
        self.year = Some(year);
        self.calibration = Some(status);
    }

    fn refresh_total(&mut self) {
        self.refresh_total_mmbtu();
    }
}

impl ToTable for IndustrialEstimate {
    fn columns() -> Vec<String> {
        let mut cols: Vec<String> = [
            "muni_id",
            "municipal",
            "year",
            "calibration",
            "naics_code",
            "naicstitle",
            "avgemp",
            "estab",
            "cons_emp",
        ]
        .iter()
        .map(|c| c.to_string())
        .collect();
        for fuel in METERED_FUELS {
            for suffix in ["con_perc", "con_mmbtu", "con_pu", "exp_dollar", "emissions_co2"] {
                cols.push(format!("{}_{suffix}", fuel.prefix()));
            }
        }
        cols.extend(
            ["other_con_perc", "other_con_mmbtu", "total_con_mmbtu"]
                .iter()
                .map(|c| c.to_string()),
        );
        cols
    }

    fn to_row(&self) -> Vec<Value> {
        let mut row = vec![
            Value::from(self.muni_id),
            Value::from(self.municipal.clone()),
            Value::from(self.year),
            self.calibration
                .map_or(Value::Null, |c| Value::from(c.as_str())),
            Value::from(self.naics_code),
            Value::from(self.naics_title.clone()),
            Value::from(self.avg_employment),
            Value::from(self.establishments),
            Value::from(self.cons_per_employee),
        ];
        let share = |fuel: FuelType| self.shares.get(&fuel).copied().flatten();
        for fuel in METERED_FUELS {
            let use_ = self.fuels.get(&fuel).copied().unwrap_or_default();
            row.extend([
                Value::from(share(fuel)),
                Value::from(use_.con_mmbtu),
                Value::from(use_.con_pu),
                Value::from(use_.exp_dollar),
                Value::from(use_.emissions_co2),
            ]);
        }
        let other = self.fuels.get(&FuelType::Other).copied().unwrap_or_default();
        row.extend([
            Value::from(share(FuelType::Other)),
            Value::from(other.con_mmbtu),
            Value::from(self.total_con_mmbtu),
        ]);
        row
    }
}
