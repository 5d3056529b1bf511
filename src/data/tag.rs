use std::fmt;
use std::str::FromStr;

use crate::error::DatasetError;

/// Logical name of every dataset the methodologies consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DatasetTag {
    /// ES-202 employment and wages census by municipality and NAICS code.
    Eowld,
    CbecsElec,
    CbecsNg,
    CbecsFoil,
    /// Building counts by energy source and principal building activity.
    CbecsSources,
    /// Manufacturing fuel mix by NAICS code.
    MecsAmi,
    /// Manufacturing consumption per employee by NAICS code and region.
    MecsFce,
    RecsHfc,
    RecsHfe,
    RecsSc,
    AcsUis,
    AcsHf,
    /// Metered commercial & industrial utility-program totals.
    MasssaveCi,
}

impl DatasetTag {
    pub const ALL: [DatasetTag; 13] = [
        DatasetTag::Eowld,
        DatasetTag::CbecsElec,
        DatasetTag::CbecsNg,
        DatasetTag::CbecsFoil,
        DatasetTag::CbecsSources,
        DatasetTag::MecsAmi,
        DatasetTag::MecsFce,
        DatasetTag::RecsHfc,
        DatasetTag::RecsHfe,
        DatasetTag::RecsSc,
        DatasetTag::AcsUis,
        DatasetTag::AcsHf,
        DatasetTag::MasssaveCi,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DatasetTag::Eowld => "eowld",
            DatasetTag::CbecsElec => "cbecs_elec",
            DatasetTag::CbecsNg => "cbecs_ng",
            DatasetTag::CbecsFoil => "cbecs_foil",
            DatasetTag::CbecsSources => "cbecs_sources",
            DatasetTag::MecsAmi => "mecs_ami",
            DatasetTag::MecsFce => "mecs_fce",
            DatasetTag::RecsHfc => "recs_hfc",
            DatasetTag::RecsHfe => "recs_hfe",
            DatasetTag::RecsSc => "recs_sc",
            DatasetTag::AcsUis => "acs_uis",
            DatasetTag::AcsHf => "acs_hf",
            DatasetTag::MasssaveCi => "masssave_ci",
        }
    }

    /// Physical table in the backing store, if the dataset lives there.
    pub fn store_table(self) -> Option<&'static str> {
        match self {
            DatasetTag::Eowld => Some("econ_es202_naics_3d_m"),
            DatasetTag::CbecsElec => Some("energy_cbecs_elec_consumption_expenditure_us"),
            DatasetTag::CbecsNg => Some("energy_cbecs_natgas_consumption_expenditure_us"),
            DatasetTag::CbecsFoil => Some("energy_cbecs_fueloil_consumption_expenditure_us"),
            DatasetTag::CbecsSources => Some("energy_cbecs_building_energy_sources_us"),
            DatasetTag::MecsAmi => Some("energy_mecs_fuel_consumption_ne_us"),
            DatasetTag::MecsFce => Some("energy_mecs_consumption_ratios_ne_us"),
            DatasetTag::RecsHfc => Some("energy_recs_hh_fuel_consumption_ne_us"),
            DatasetTag::RecsHfe => Some("energy_recs_hh_fuel_expenditures_ne_us"),
            DatasetTag::RecsSc => Some("energy_recs_hu_structural_characteristics"),
            DatasetTag::AcsUis => Some("b25024_hu_units_in_structure_acs_m"),
            DatasetTag::AcsHf => Some("b25117_hu_tenure_by_fuel_acs_m"),
            DatasetTag::MasssaveCi => None,
        }
    }

    pub fn valid_names() -> String {
        DatasetTag::ALL
            .iter()
            .map(|t| t.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for DatasetTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatasetTag {
    type Err = DatasetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        DatasetTag::ALL
            .into_iter()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| DatasetError::UnknownTag(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_round_trip_through_names() {
        for tag in DatasetTag::ALL {
            assert_eq!(tag.as_str().parse::<DatasetTag>(), Ok(tag));
        }
        assert_eq!(" CBECS_NG ".parse::<DatasetTag>(), Ok(DatasetTag::CbecsNg));
    }

    #[test]
    fn unknown_tag_is_an_error() {
        assert_eq!(
            "cbecs_el".parse::<DatasetTag>(),
            Err(DatasetError::UnknownTag("cbecs_el".to_string()))
        );
    }

    #[test]
    fn metered_data_has_no_store_table() {
        assert_eq!(DatasetTag::MasssaveCi.store_table(), None);
        assert_eq!(DatasetTag::Eowld.store_table(), Some("econ_es202_naics_3d_m"));
    }
}
