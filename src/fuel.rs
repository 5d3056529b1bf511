//! Fuel types and their conversion constants.

use std::fmt;

use crate::measure::{self, Measure};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FuelType {
    Electricity,
    NaturalGas,
    FuelOil,
    /// LPG/NGL, coal, coke and other minor fuels; no single physical unit.
    Other,
}

impl FuelType {
    /// Column prefix used in every output table.
    pub fn prefix(self) -> &'static str {
        match self {
            FuelType::Electricity => "elec",
            FuelType::NaturalGas => "ng",
            FuelType::FuelOil => "foil",
            FuelType::Other => "other",
        }
    }
}

impl fmt::Display for FuelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// The three fuels with a physical unit, in output column order.
pub const METERED_FUELS: [FuelType; 3] =
    [FuelType::Electricity, FuelType::NaturalGas, FuelType::FuelOil];

/// Per-physical-unit constants for one fuel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FuelFactors {
    pub mmbtu_per_unit: f64,
    pub co2_per_unit: f64,
    /// Flat price, when the sector does not take expenditure from a survey.
    pub dollars_per_unit: Option<f64>,
}

impl FuelFactors {
    const fn new(mmbtu_per_unit: f64, co2_per_unit: f64) -> Self {
        Self {
            mmbtu_per_unit,
            co2_per_unit,
            dollars_per_unit: None,
        }
    }

    const fn priced(mmbtu_per_unit: f64, co2_per_unit: f64, dollars_per_unit: f64) -> Self {
        Self {
            mmbtu_per_unit,
            co2_per_unit,
            dollars_per_unit: Some(dollars_per_unit),
        }
    }

    pub fn to_mmbtu(&self, physical_units: Measure) -> Measure {
        measure::scale(physical_units, self.mmbtu_per_unit)
    }

    pub fn to_physical_units(&self, mmbtu: Measure) -> Measure {
        measure::ratio(mmbtu, Some(self.mmbtu_per_unit))
    }

    pub fn emissions(&self, physical_units: Measure) -> Measure {
        measure::scale(physical_units, self.co2_per_unit)
    }
}

/// Constants for the three metered fuels of one sector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FactorTable {
    pub electricity: FuelFactors,
    pub natural_gas: FuelFactors,
    pub fuel_oil: FuelFactors,
}

impl FactorTable {
    /// `None` for [`FuelType::Other`].
    pub fn get(&self, fuel: FuelType) -> Option<&FuelFactors> {
        match fuel {
            FuelType::Electricity => Some(&self.electricity),
            FuelType::NaturalGas => Some(&self.natural_gas),
            FuelType::FuelOil => Some(&self.fuel_oil),
            FuelType::Other => None,
        }
    }
}

/// Electricity in kWh, gas in Mcf, fuel oil in gallons.
pub const COMMERCIAL_FACTORS: FactorTable = FactorTable {
    electricity: FuelFactors::new(0.003412, 0.828),
    natural_gas: FuelFactors::new(1.0, 117.1),
    fuel_oil: FuelFactors::new(0.139, 22.38),
};

/// Electricity in kWh, gas in therms, fuel oil in gallons.
pub const INDUSTRIAL_FACTORS: FactorTable = FactorTable {
    electricity: FuelFactors::priced(0.003412, 0.828, 0.078),
    natural_gas: FuelFactors::priced(0.1, 11.71, 7.77),
    fuel_oil: FuelFactors::priced(0.139, 22.38, 1.11),
};

pub const RESIDENTIAL_FACTORS: FactorTable = FactorTable {
    electricity: FuelFactors::new(0.003412, 0.828),
    natural_gas: FuelFactors::new(1.0, 11.71),
    fuel_oil: FuelFactors::new(0.139, 22.38),
};

// ---------------------------------------------------------------------------
// Calibration-year factors
// ---------------------------------------------------------------------------

/// Grid electricity (source MMBtu and CO2 per kWh) by calendar year.
pub const ELECTRICITY_BY_YEAR: &[(i64, FuelFactors)] = &[
    (2013, FuelFactors::new(0.006841, 0.93)),
    (2014, FuelFactors::new(0.007692, 0.941)),
    (2015, FuelFactors::new(0.006707, 0.857)),
];

/// Site energy of one metered kWh.
pub const KWH_MMBTU: f64 = 0.003412;
/// Metered gas is reported in therms.
pub const THERM_MMBTU: f64 = 0.1;

pub const CALIBRATION_GAS: FuelFactors = FuelFactors::new(THERM_MMBTU, 11.71);

/// MMBtu in one unit of the metered reading for `fuel`.
pub fn metered_unit_mmbtu(fuel: FuelType) -> Option<f64> {
    match fuel {
        FuelType::Electricity => Some(KWH_MMBTU),
        FuelType::NaturalGas => Some(THERM_MMBTU),
        _ => None,
    }
}

/// Electricity factors for `year`. Years missing from the table resolve to
/// the latest known year; the resolved year is returned alongside.
pub fn electricity_for_year(year: i64) -> (i64, FuelFactors) {
    if let Some((y, f)) = ELECTRICITY_BY_YEAR.iter().find(|(y, _)| *y == year) {
        return (*y, *f);
    }
    let (latest, factors) = ELECTRICITY_BY_YEAR
        .iter()
        .max_by_key(|(y, _)| *y)
        .copied()
        .unwrap_or((year, INDUSTRIAL_FACTORS.electricity));
    log::warn!("no electricity factors for {year}, using {latest}");
    (latest, factors)
}

/// Factors applied to calibrated physical units in a given year.
pub fn calibration_factors(fuel: FuelType, year: i64) -> Option<FuelFactors> {
    match fuel {
        FuelType::Electricity => Some(electricity_for_year(year).1),
        FuelType::NaturalGas => Some(CALIBRATION_GAS),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// FuelUse – the four per-fuel result measures
// ---------------------------------------------------------------------------

/// Consumption, expenditure and emissions of one fuel for one result row.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FuelUse {
    /// Physical units (kWh, therms/Mcf, gallons).
    pub con_pu: Measure,
    pub exp_dollar: Measure,
    pub con_mmbtu: Measure,
    pub emissions_co2: Measure,
}
