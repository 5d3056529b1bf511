//! Residential sector: national per-household consumption by housing type,
//! reweighted to Massachusetts and applied to local housing and heating-fuel
//! counts.

use std::collections::BTreeMap;
use std::fmt;

use anyhow::Result;

use super::{Methodology, Sector, TableSet, ToTable};
use crate::data::model::Value;
use crate::data::schema::{
    HeatingFuelRecord, HouseholdFuelRecord, StructureShareRecord, UnitsInStructureRecord,
};
use crate::data::tag::DatasetTag;
use crate::fuel::{FuelType, FuelUse, METERED_FUELS, RESIDENTIAL_FACTORS};
use crate::measure::{self, Measure};

pub const NATIONAL: &str = "united states";
pub const STATE: &str = "massachusetts";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HousingType {
    SingleFamilyAttached,
    SingleFamilyDetached,
    TwoToFourUnits,
    FivePlusUnits,
    MobileOrOther,
}

impl HousingType {
    pub const ALL: [HousingType; 5] = [
        HousingType::SingleFamilyAttached,
        HousingType::SingleFamilyDetached,
        HousingType::TwoToFourUnits,
        HousingType::FivePlusUnits,
        HousingType::MobileOrOther,
    ];

    /// Column name in the units-in-structure table and the output `hu_type`.
    pub fn as_str(self) -> &'static str {
        match self {
            HousingType::SingleFamilyAttached => "u1a",
            HousingType::SingleFamilyDetached => "u1d",
            HousingType::TwoToFourUnits => "u2_4",
            HousingType::FivePlusUnits => "u5ov",
            HousingType::MobileOrOther => "u_oth",
        }
    }

    fn units(self, r: &UnitsInStructureRecord) -> Measure {
        match self {
            HousingType::SingleFamilyAttached => r.u1a,
            HousingType::SingleFamilyDetached => r.u1d,
            HousingType::TwoToFourUnits => r.u2_4,
            HousingType::FivePlusUnits => measure::sum_available([r.u5_9, r.u10_19, r.u20ov]),
            HousingType::MobileOrOther => r.u_oth,
        }
    }
}

impl fmt::Display for HousingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A housing-type row of a survey table: one of the five types or the
/// all-households total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Bucket {
    Total,
    Housing(HousingType),
}

fn normalize_label(label: &str) -> String {
    label
        .to_lowercase()
        .replace(['-', '_'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

impl Bucket {
    /// Map the housing-type labels used across the survey tables.
    pub fn from_label(label: &str) -> Option<Bucket> {
        use HousingType::*;
        let bucket = match normalize_label(label).as_str() {
            "total households" | "total" => Bucket::Total,
            "single family attached" => Bucket::Housing(SingleFamilyAttached),
            "single family detached" => Bucket::Housing(SingleFamilyDetached),
            "two four units" | "apartments in 2 4 unit buildings" => {
                Bucket::Housing(TwoToFourUnits)
            }
            "five plus units" | "apartments in 5 or more unit buildings" => {
                Bucket::Housing(FivePlusUnits)
            }
            "mobile home" | "mobile homes" => Bucket::Housing(MobileOrOther),
            _ => return None,
        };
        Some(bucket)
    }
}

/// Per-household consumption (MMBtu) and expenditure (dollars) for one fuel.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HouseholdRate {
    pub consumption: Measure,
    pub expenditure: Measure,
}

/// Massachusetts share of housing units by type.
pub fn structure_weights(records: &[StructureShareRecord]) -> BTreeMap<HousingType, Measure> {
    let mut by_type: BTreeMap<HousingType, Measure> = BTreeMap::new();
    for r in records {
        match Bucket::from_label(&r.hu_type) {
            Some(Bucket::Housing(t)) => {
                let entry = by_type.entry(t).or_insert(None);
                *entry = measure::sum_available([*entry, r.massachusetts]);
            }
            _ => log::debug!("recs_sc: ignoring housing type {:?}", r.hu_type),
        }
    }
    let total = measure::sum_available(by_type.values().copied());
    by_type
        .into_iter()
        .map(|(t, units)| (t, measure::ratio(units, total)))
        .collect()
}

fn fuel_value(r: &HouseholdFuelRecord, fuel: FuelType) -> Measure {
    match fuel {
        FuelType::Electricity => r.avg_elec,
        FuelType::NaturalGas => r.avg_ng,
        FuelType::FuelOil => r.avg_foil,
        FuelType::Other => None,
    }
}

/// National rows summed per bucket.
fn national_by_bucket(records: &[HouseholdFuelRecord]) -> BTreeMap<Bucket, BTreeMap<FuelType, Measure>> {
    let mut out: BTreeMap<Bucket, BTreeMap<FuelType, Measure>> = BTreeMap::new();
    for r in records.iter().filter(|r| r.geography.eq_ignore_ascii_case(NATIONAL)) {
        let Some(bucket) = Bucket::from_label(&r.hu_type) else {
            log::debug!("ignoring national housing type {:?}", r.hu_type);
            continue;
        };
        let fuels = out.entry(bucket).or_default();
        for fuel in METERED_FUELS {
            let entry = fuels.entry(fuel).or_insert(None);
            *entry = measure::sum_available([*entry, fuel_value(r, fuel)]);
        }
    }
    out
}

/// The state's reported average consumption per household, by fuel.
fn state_anchor(records: &[HouseholdFuelRecord]) -> Option<&HouseholdFuelRecord> {
    let state: Vec<&HouseholdFuelRecord> = records
        .iter()
        .filter(|r| r.geography.eq_ignore_ascii_case(STATE))
        .collect();
    state
        .iter()
        .find(|r| Bucket::from_label(&r.hu_type) == Some(Bucket::Total))
        .or(state.first())
        .copied()
}

/// Solve, per fuel, the ratio that brings the weighted national consumption
/// to the state's reported average, and apply it to both national tables.
pub fn state_household_rates(
    weights: &BTreeMap<HousingType, Measure>,
    consumption: &[HouseholdFuelRecord],
    expenditure: &[HouseholdFuelRecord],
) -> BTreeMap<HousingType, BTreeMap<FuelType, HouseholdRate>> {
    let national_con = national_by_bucket(consumption);
    let national_exp = national_by_bucket(expenditure);
    let anchor = state_anchor(consumption);
    if anchor.is_none() {
        log::warn!("recs_hfc has no {STATE} row, household rates are not available");
    }

    let ratios: BTreeMap<FuelType, Measure> = METERED_FUELS
        .into_iter()
        .map(|fuel| {
            let weighted = measure::sum_available(national_con.iter().filter_map(|(b, fuels)| {
                let Bucket::Housing(t) = b else { return None };
                let weight = weights.get(t).copied().flatten();
                Some(measure::product(fuels.get(&fuel).copied().flatten(), weight))
            }));
            let state_mean = anchor.and_then(|a| fuel_value(a, fuel));
            (fuel, measure::ratio(state_mean, weighted))
        })
        .collect();
    log::debug!("residential state adjustment ratios: {ratios:?}");

    HousingType::ALL
        .into_iter()
        .filter_map(|t| {
            let con = national_con.get(&Bucket::Housing(t))?;
            let exp = national_exp.get(&Bucket::Housing(t))?;
            let rates = METERED_FUELS
                .into_iter()
                .map(|fuel| {
                    let ratio = ratios.get(&fuel).copied().flatten();
                    let rate = HouseholdRate {
                        consumption: measure::product(con.get(&fuel).copied().flatten(), ratio),
                        expenditure: measure::product(exp.get(&fuel).copied().flatten(), ratio),
                    };
                    (fuel, rate)
                })
                .collect();
            Some((t, rates))
        })
        .collect()
}

/// Fraction of heated households using each fuel.
pub fn heating_shares(r: &HeatingFuelRecord) -> BTreeMap<FuelType, Measure> {
    let heated = measure::sum_available([r.gas, r.electricity, r.oil]);
    [
        (FuelType::Electricity, r.electricity),
        (FuelType::NaturalGas, r.gas),
        (FuelType::FuelOil, r.oil),
    ]
    .into_iter()
    .map(|(fuel, count)| (fuel, measure::ratio(count, heated)))
    .collect()
}

fn latest_period<'a, I>(periods: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    periods
        .into_iter()
        .filter(|p| !p.is_empty())
        .max()
        .map(str::to_string)
}

/// One municipality × housing type result row.
#[derive(Debug, Clone, PartialEq)]
pub struct ResidentialEstimate {
    pub muni_id: Option<i64>,
    pub municipal: String,
    pub hu_type: HousingType,
    pub housing_units: Measure,
    pub shares: BTreeMap<FuelType, Measure>,
    pub households: BTreeMap<FuelType, Measure>,
    pub fuels: BTreeMap<FuelType, FuelUse>,
    pub con_by_structure_mmbtu: Measure,
    pub exp_by_structure_dollar: Measure,
}

pub struct Residential;

impl Methodology for Residential {
    type Row = ResidentialEstimate;

    fn sector(&self) -> Sector {
        Sector::Residential
    }

    fn datasets(&self) -> &'static [DatasetTag] {
        &[
            DatasetTag::AcsUis,
            DatasetTag::AcsHf,
            DatasetTag::RecsSc,
            DatasetTag::RecsHfc,
            DatasetTag::RecsHfe,
        ]
    }

    fn estimate(&self, tables: &TableSet) -> Result<Vec<ResidentialEstimate>> {
        // Step 1: housing units by type, most recent survey period.
        let units = tables.records::<UnitsInStructureRecord>(DatasetTag::AcsUis)?;
        let Some(period) = latest_period(units.iter().map(|r| r.acs_year.as_str())) else {
            log::warn!("acs_uis has no survey period");
            return Ok(Vec::new());
        };
        log::info!("residential housing period {period}");

        // Step 2: heating-fuel shares.
        let heating = tables.records::<HeatingFuelRecord>(DatasetTag::AcsHf)?;
        let heating_period = latest_period(heating.iter().map(|r| r.acs_year.as_str()));
        let shares: BTreeMap<i64, BTreeMap<FuelType, Measure>> = heating
            .iter()
            .filter(|r| Some(&r.acs_year) == heating_period.as_ref())
            .filter_map(|r| Some((r.muni_id?, heating_shares(r))))
            .collect();

        // Step 3: state-adjusted per-household rates.
        let weights = structure_weights(&tables.records::<StructureShareRecord>(DatasetTag::RecsSc)?);
        let consumption = tables.records::<HouseholdFuelRecord>(DatasetTag::RecsHfc)?;
        let expenditure = tables.records::<HouseholdFuelRecord>(DatasetTag::RecsHfe)?;
        let rates = state_household_rates(&weights, &consumption, &expenditure);

        // Steps 4–5
        let mut results = Vec::new();
        for r in units.iter().filter(|r| r.acs_year == period) {
            let Some(muni_shares) = r.muni_id.and_then(|id| shares.get(&id)) else {
                continue;
            };
            for (hu_type, type_rates) in &rates {
                let housing_units = hu_type.units(r);
                let mut households = BTreeMap::new();
                let mut fuels = BTreeMap::new();
                for fuel in METERED_FUELS {
                    let share = muni_shares.get(&fuel).copied().flatten();
                    let count = measure::product(housing_units, share);
                    let rate = type_rates.get(&fuel).copied().unwrap_or_default();
                    let con_mmbtu = measure::product(count, rate.consumption);
                    let fuel_use = match RESIDENTIAL_FACTORS.get(fuel) {
                        Some(f) => {
                            let con_pu = f.to_physical_units(con_mmbtu);
                            FuelUse {
                                con_pu,
                                exp_dollar: measure::product(count, rate.expenditure),
                                con_mmbtu,
                                emissions_co2: f.emissions(con_pu),
                            }
                        }
                        None => FuelUse::default(),
                    };
                    households.insert(fuel, count);
                    fuels.insert(fuel, fuel_use);
                }

                // Step 6
                results.push(ResidentialEstimate {
                    muni_id: r.muni_id,
                    municipal: r.municipal.clone(),
                    hu_type: *hu_type,
                    housing_units,
                    shares: muni_shares.clone(),
                    households,
                    con_by_structure_mmbtu: measure::sum_available(
                        fuels.values().map(|f: &FuelUse| f.con_mmbtu),
                    ),
                    exp_by_structure_dollar: measure::sum_available(
                        fuels.values().map(|f: &FuelUse| f.exp_dollar),
                    ),
                    fuels,
                });
            }
        }

        results.sort_by(|a, b| {
            (a.municipal.as_str(), a.hu_type).cmp(&(b.municipal.as_str(), b.hu_type))
        });
        Ok(results)
    }
}

impl ToTable for ResidentialEstimate {
    fn columns() -> Vec<String> {
        let mut cols: Vec<String> = ["muni_id", "municipal", "hu_type", "hu"]
            .iter()
            .map(|c| c.to_string())
            .collect();
        for fuel in METERED_FUELS {
            for suffix in [
                "share",
                "households",
                "con_mmbtu",
                "con_pu",
                "exp_dollar",
                "emissions_co2",
            ] {
                cols.push(format!("{}_{suffix}", fuel.prefix()));
            }
        }
        cols.push("con_by_structure_mmbtu".to_string());
        cols.push("exp_by_structure_dollar".to_string());
        cols
    }

    fn to_row(&self) -> Vec<Value> {
        let mut row = vec![
            Value::from(self.muni_id),
            Value::from(self.municipal.clone()),
            Value::from(self.hu_type.as_str()),
            Value::from(self.housing_units),
        ];
        for fuel in METERED_FUELS {
            let use_ = self.fuels.get(&fuel).copied().unwrap_or_default();
            row.extend([
                Value::from(self.shares.get(&fuel).copied().flatten()),
                Value::from(self.households.get(&fuel).copied().flatten()),
                Value::from(use_.con_mmbtu),
                Value::from(use_.con_pu),
                Value::from(use_.exp_dollar),
                Value::from(use_.emissions_co2),
            ]);
        }
        row.push(Value::from(self.con_by_structure_mmbtu));
        row.push(Value::from(self.exp_by_structure_dollar));
        row
    }
}
