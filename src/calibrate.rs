//! Scale commercial and industrial estimates to metered utility-program use.
//!
//! For every municipality and metered year, the modeled electricity and gas
//! physical units of both sectors are summed and scaled so that together they
//! equal the metered total. The commercial/industrial split of each fuel is
//! preserved. Fuel oil is not metered and passes through unchanged.
//!
//! Each sector keeps its own physical unit in `con_pu` (commercial gas is in
//! Mcf, industrial gas in therms). Modeled units are converted to the metered
//! unit through their MMBtu content before they are summed, and calibrated
//! MMBtu and CO2 are computed from the converted quantity.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::data::schema::MeteredUsageRecord;
use crate::fuel::{calibration_factors, metered_unit_mmbtu, FactorTable, FuelFactors, FuelType, FuelUse};
use crate::measure::{self, Measure};

/// Metered fuels, in the order they are calibrated.
pub const CALIBRATED_FUELS: [FuelType; 2] = [FuelType::Electricity, FuelType::NaturalGas];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CalibrationStatus {
    Calibrated,
    Uncalibrated,
}

impl CalibrationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CalibrationStatus::Calibrated => "calibrated",
            CalibrationStatus::Uncalibrated => "uncalibrated",
        }
    }
}

/// A modeled result row that can be scaled to metered use.
pub trait MeteredRow: Clone {
    fn municipal(&self) -> &str;
    /// Constants the row's physical units were derived with.
    fn factors(&self) -> &'static FactorTable;
    fn fuel(&self, fuel: FuelType) -> Option<&FuelUse>;
    fn fuel_mut(&mut self, fuel: FuelType) -> Option<&mut FuelUse>;
    /// Record the metered year and whether the row was scaled.
    fn stamp(&mut self, year: i64, status: CalibrationStatus);
    fn refresh_total(&mut self);
}

/// Metered readings and census tables spell municipalities differently.
fn municipality_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Metered units in one of the row's physical units.
fn metered_units_per_unit<R: MeteredRow>(row: &R, fuel: FuelType) -> Option<f64> {
    let native = row.factors().get(fuel)?.mmbtu_per_unit;
    Some(native / metered_unit_mmbtu(fuel)?)
}

/// Metered totals in physical units, keyed by municipality and year.
#[derive(Debug, Clone, Default)]
pub struct MeteredUsage {
    totals: BTreeMap<(String, i64), BTreeMap<FuelType, Measure>>,
}

impl MeteredUsage {
    pub fn from_records(records: &[MeteredUsageRecord]) -> Self {
        let mut totals = BTreeMap::new();
        for r in records {
            let Some(year) = r.cal_year else {
                log::debug!("masssave_ci: skipping {} row without a year", r.municipal);
                continue;
            };
            let key = (municipality_key(&r.municipal), year);
            if totals.contains_key(&key) {
                log::warn!(
                    "masssave_ci: duplicate row for {} {year}, keeping the first",
                    r.municipal
                );
                continue;
            }
            let mut fuels = BTreeMap::new();
            // MWh to kWh
            fuels.insert(FuelType::Electricity, measure::scale(r.mwh, 1000.0));
            fuels.insert(FuelType::NaturalGas, r.therms);
            totals.insert(key, fuels);
        }
        Self { totals }
    }

    pub fn years(&self) -> BTreeSet<i64> {
        self.totals.keys().map(|(_, year)| *year).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }

    /// Metered totals, or `None` when the year has no usable reading.
    fn get(&self, municipal: &str, year: i64) -> Option<&BTreeMap<FuelType, Measure>> {
        self.totals
            .get(&(municipality_key(municipal), year))
            .filter(|fuels| fuels.values().any(Option::is_some))
    }
}

/// Municipality-years that could not be scaled.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CalibrationReport {
    pub years: Vec<i64>,
    pub calibrated: usize,
    pub uncalibrated: BTreeSet<(String, i64)>,
}

#[derive(Debug, Clone)]
pub struct Calibrated<C, I> {
    pub commercial: Vec<C>,
    pub industrial: Vec<I>,
    pub report: CalibrationReport,
}

fn scale_fuel(fuel_use: &mut FuelUse, ratio: Measure, to_metered: f64, factors: &FuelFactors) {
    fuel_use.con_pu = measure::product(fuel_use.con_pu, ratio);
    fuel_use.exp_dollar = measure::product(fuel_use.exp_dollar, ratio);
    let metered_units = measure::scale(fuel_use.con_pu, to_metered);
    fuel_use.con_mmbtu = factors.to_mmbtu(metered_units);
    fuel_use.emissions_co2 = factors.emissions(metered_units);
}

fn scale_row<R: MeteredRow>(
    row: &mut R,
    year: i64,
    ratios: &BTreeMap<FuelType, Measure>,
    factors: &BTreeMap<(i64, FuelType), FuelFactors>,
) {
    for fuel in CALIBRATED_FUELS {
        let Some(to_metered) = metered_units_per_unit(&*row, fuel) else {
            continue;
        };
        let (Some(f), Some(fuel_use)) = (factors.get(&(year, fuel)), row.fuel_mut(fuel)) else {
            continue;
        };
        scale_fuel(fuel_use, ratios.get(&fuel).copied().flatten(), to_metered, f);
    }
    row.refresh_total();
    row.stamp(year, CalibrationStatus::Calibrated);
}

/// Modeled use of each row, in metered units.
fn modeled_units<'a, R: MeteredRow>(rows: &'a [&'a R], fuel: FuelType) -> impl Iterator<Item = Measure> + 'a {
    rows.iter().map(move |r| {
        let con_pu = r.fuel(fuel).and_then(|f| f.con_pu);
        measure::scale(con_pu, metered_units_per_unit(*r, fuel)?)
    })
}

/// Emit one copy of every modeled row per metered year, scaled where a
/// metered reading exists.
pub fn calibrate<C, I>(commercial: &[C], industrial: &[I], metered: &MeteredUsage) -> Calibrated<C, I>
where
    C: MeteredRow,
    I: MeteredRow,
{
    let years = metered.years();
    let factors: BTreeMap<(i64, FuelType), FuelFactors> = years
        .iter()
        .flat_map(|&year| {
            CALIBRATED_FUELS
                .into_iter()
                .filter_map(move |fuel| Some(((year, fuel), calibration_factors(fuel, year)?)))
        })
        .collect();

    let municipalities: BTreeSet<&str> = commercial
        .iter()
        .map(MeteredRow::municipal)
        .chain(industrial.iter().map(MeteredRow::municipal))
        .collect();

    let mut out = Calibrated {
        commercial: Vec::with_capacity(commercial.len() * years.len()),
        industrial: Vec::with_capacity(industrial.len() * years.len()),
        report: CalibrationReport {
            years: years.iter().copied().collect(),
            ..CalibrationReport::default()
        },
    };

    for municipality in municipalities {
        let local_c: Vec<&C> = commercial.iter().filter(|r| r.municipal() == municipality).collect();
        let local_i: Vec<&I> = industrial.iter().filter(|r| r.municipal() == municipality).collect();

        for &year in &years {
            let Some(totals) = metered.get(municipality, year) else {
                out.report.uncalibrated.insert((municipality.to_string(), year));
                out.commercial.extend(local_c.iter().map(|r| {
                    let mut r = (*r).clone();
                    r.stamp(year, CalibrationStatus::Uncalibrated);
                    r
                }));
                out.industrial.extend(local_i.iter().map(|r| {
                    let mut r = (*r).clone();
                    r.stamp(year, CalibrationStatus::Uncalibrated);
                    r
                }));
                continue;
            };

            let ratios: BTreeMap<FuelType, Measure> = CALIBRATED_FUELS
                .into_iter()
                .map(|fuel| {
                    let modeled = measure::sum_available(
                        modeled_units(&local_c, fuel).chain(modeled_units(&local_i, fuel)),
                    );
                    let target = totals.get(&fuel).copied().flatten();
                    (fuel, measure::ratio(target, modeled))
                })
                .collect();
            log::debug!("{municipality} {year}: calibration ratios {ratios:?}");

            for r in &local_c {
                let mut r = (*r).clone();
                scale_row(&mut r, year, &ratios, &factors);
                out.commercial.push(r);
            }
            for r in &local_i {
                let mut r = (*r).clone();
                scale_row(&mut r, year, &ratios, &factors);
                out.industrial.push(r);
            }
            out.report.calibrated += 1;
        }
    }

    log::info!(
        "calibration: {} municipality-years scaled, {} without metered data",
        out.report.calibrated,
        out.report.uncalibrated.len()
    );
    out
}
