//! End-to-end runs over a hand-computed town, "Testville", read through an
//! in-memory backing store plus file overrides.

use std::fs;
use std::sync::Arc;

use energy_estimator::data::cache::{DatasetLoader, FileOverride};
use energy_estimator::data::model::{Table, Value};
use energy_estimator::data::store::MemoryStore;
use energy_estimator::data::tag::DatasetTag;
use energy_estimator::error::DatasetError;
use energy_estimator::pipeline::{self, RunOutcome};
use energy_estimator::publish::{Publisher, ARCHIVE_NAME};
use energy_estimator::sectors::Sector;

const SURVEY_COLUMNS: [&str; 5] = ["activity", "cnsperbldng", "experbldng", "cnsperworker", "experworker"];
const HOUSEHOLD_COLUMNS: [&str; 5] = ["geography", "hu_type", "avg_elec", "avg_ng", "avg_foil"];

fn put(store: &mut MemoryStore, tag: DatasetTag, columns: &[&str], rows: &[&[&str]]) {
    let name = tag.store_table().expect("store-backed tag");
    store.insert(name, Table::from_text(columns, rows));
}

fn testville_store() -> MemoryStore {
    let mut store = MemoryStore::new();
    put(
        &mut store,
        DatasetTag::Eowld,
        &["muni_id", "municipal", "naicscode", "naicstitle", "cal_year", "avgemp", "estab"],
        &[
            &["999", "Testville", "611", "Educational services", "2015", "100", "4"],
            &["999", "Testville", "611", "Educational services", "2014", "80", "3"],
            &["999", "Testville", "311", "Food manufacturing", "2015", "50", "2"],
            &["900", "Middlesex County", "611", "Educational services", "2015", "9000", "300"],
            &["900", "Middlesex County", "311", "Food manufacturing", "2015", "4000", "90"],
        ],
    );
    put(&mut store, DatasetTag::CbecsElec, &SURVEY_COLUMNS, &[&["Education", "300", "36000", "10", "1200"]]);
    put(&mut store, DatasetTag::CbecsNg, &SURVEY_COLUMNS, &[&["Education", "100", "1000", "5", "50"]]);
    put(&mut store, DatasetTag::CbecsFoil, &SURVEY_COLUMNS, &[&["Education", "20", "60", "2", "6"]]);
    put(
        &mut store,
        DatasetTag::CbecsSources,
        &["activity", "all", "ng", "fueloil"],
        &[&["Education", "100", "60", "20"]],
    );
    put(
        &mut store,
        DatasetTag::MecsFce,
        &["naics_code", "region", "cons_emp"],
        &[&["311", "Northeast", "400"], &["311", "South", "700"]],
    );
    put(
        &mut store,
        DatasetTag::MecsAmi,
        &[
            "naics_code", "geography", "elec", "ng", "dist_foil", "res_foil", "lpgngl", "coal",
            "coke", "other", "tot",
        ],
        &[&["311", "Northeast", "40", "30", "6", "4", "10", "*", "5", "5", "100"]],
    );
    put(
        &mut store,
        DatasetTag::RecsSc,
        &["hu_type", "ma"],
        &[
            &["Single_family_detached", "3.0"],
            &["Single_family_attached", "0.5"],
            &["two_four_units", "1.0"],
            &["five_plus_units", "0.5"],
            &["Mobile_home", "Q"],
        ],
    );
    put(
        &mut store,
        DatasetTag::RecsHfc,
        &HOUSEHOLD_COLUMNS,
        &[
            &["United States", "Total Households", "10", "50", "60"],
            &["United States", "Single-Family Detached", "12", "60", "70"],
            &["United States", "Single-Family Attached", "10", "50", "60"],
            &["United States", "Apartments in 2-4 Unit Buildings", "8", "40", "50"],
            &["United States", "Apartments in 5 or More Unit Buildings", "6", "30", "40"],
            &["United States", "Mobile Homes", "9", "45", "Q"],
            &["Massachusetts", "Total Households", "13", "39", "93"],
        ],
    );
    put(
        &mut store,
        DatasetTag::RecsHfe,
        &HOUSEHOLD_COLUMNS,
        &[
            &["United States", "total households", "1,400", "900", "1900"],
            &["United States", "Single family detached", "1,500", "1000", "2000"],
            &["United States", "Single family attached", "1,300", "800", "1800"],
            &["United States", "Apartments in 2-4 Unit Buildings", "1,000", "700", "1500"],
            &["United States", "Apartments in 5 or More Unit Buildings", "900", "600", "1200"],
            &["United States", "mobile homes", "1,200", "500", "1000"],
        ],
    );
    put(
        &mut store,
        DatasetTag::AcsUis,
        &[
            "muni_id", "municipal", "acs_year", "hu", "u1a", "u1d", "u2_4", "u5_9", "u10_19",
            "u20ov", "u_oth",
        ],
        &[
            &["999", "Testville", "2011-15", "300", "0", "100", "0", "0", "0", "0", "0"],
            &["999", "Testville", "2010-14", "290", "0", "95", "0", "0", "0", "0", "0"],
            &["900", "Middlesex County", "2011-15", "9000", "0", "5000", "0", "0", "0", "0", "0"],
        ],
    );
    put(
        &mut store,
        DatasetTag::AcsHf,
        &["muni_id", "municipal", "acs_year", "gas", "elec", "oil"],
        &[
            &["999", "Testville", "2011-15", "50", "25", "25"],
            &["900", "Middlesex County", "2011-15", "10", "10", "10"],
        ],
    );
    store
}

fn loader(overrides: Vec<FileOverride>) -> DatasetLoader {
    DatasetLoader::new(overrides, Some(Box::new(testville_store())))
}

fn output(outcome: &RunOutcome, sector: Sector) -> &Table {
    &outcome
        .outputs
        .iter()
        .find(|o| o.sector == sector)
        .unwrap_or_else(|| panic!("no {sector} output"))
        .table
}

fn cell<'a>(table: &'a Table, row: usize, column: &str) -> &'a Value {
    let idx = table
        .column_index(column)
        .unwrap_or_else(|| panic!("no column {column}"));
    &table.rows()[row][idx]
}

fn num(table: &Table, row: usize, column: &str) -> f64 {
    cell(table, row, column)
        .as_measure()
        .unwrap()
        .unwrap_or_else(|| panic!("{column} is NA"))
}

fn assert_close(actual: f64, expected: f64) {
    let tolerance = 1e-9 * actual.abs().max(expected.abs()).max(1.0);
    assert!((actual - expected).abs() <= tolerance, "{actual} != {expected}");
}

fn metered_override(dir: &tempfile::TempDir, contents: &str) -> FileOverride {
    let path = dir.path().join("masssave.csv");
    fs::write(&path, contents).unwrap();
    FileOverride {
        path,
        tag: DatasetTag::MasssaveCi,
    }
}

#[test]
fn all_sectors_without_metered_data() {
    let mut loader = loader(Vec::new());
    let outcome = pipeline::run(&Sector::ALL, &mut loader).unwrap();
    assert!(outcome.calibration.is_none());

    let sectors: Vec<Sector> = outcome.outputs.iter().map(|o| o.sector).collect();
    assert_eq!(sectors, Sector::ALL.to_vec());

    // Commercial: Education, 100 workers.
    let commercial = output(&outcome, Sector::Commercial);
    assert_eq!(commercial.len(), 1);
    assert_eq!(cell(commercial, 0, "municipal"), &Value::from("Testville"));
    assert_eq!(cell(commercial, 0, "muni_id"), &Value::Integer(999));
    assert_eq!(cell(commercial, 0, "year"), &Value::Null);
    assert_eq!(cell(commercial, 0, "calibration"), &Value::Null);
    assert_close(num(commercial, 0, "emps"), 100.0);
    assert_close(num(commercial, 0, "elec_con_pu"), 1_000_000.0);
    // expenditure = physical units × survey dollars per worker
    assert_close(num(commercial, 0, "elec_exp_dollar"), 1_000_000.0 * 1200.0);
    assert_close(num(commercial, 0, "elec_emissions_co2"), 828_000.0);
    assert_close(num(commercial, 0, "ng_con_pu"), 300.0);
    assert_close(num(commercial, 0, "ng_exp_dollar"), 300.0 * 50.0);
    assert_close(num(commercial, 0, "ng_emissions_co2"), 35_130.0);
    assert_close(num(commercial, 0, "foil_con_pu"), 40.0);
    assert_close(num(commercial, 0, "foil_exp_dollar"), 40.0 * 6.0);
    assert_close(num(commercial, 0, "foil_con_mmbtu"), 5.56);
    assert_close(num(commercial, 0, "total_con_mmbtu"), 3412.0 + 300.0 + 5.56);

    // Industrial: 50 employees × 400 MMBtu.
    let industrial = output(&outcome, Sector::Industrial);
    assert_eq!(industrial.len(), 1);
    assert_close(num(industrial, 0, "elec_con_perc"), 0.4);
    assert_close(num(industrial, 0, "foil_con_perc"), 0.1);
    assert_close(num(industrial, 0, "other_con_perc"), 0.2);
    assert_close(num(industrial, 0, "ng_con_mmbtu"), 6000.0);
    assert_close(num(industrial, 0, "ng_con_pu"), 60_000.0);
    assert_close(num(industrial, 0, "ng_exp_dollar"), 466_200.0);
    assert_close(num(industrial, 0, "foil_con_pu"), 2000.0 / 0.139);
    assert_close(num(industrial, 0, "foil_exp_dollar"), 2000.0 / 0.139 * 1.11);
    assert_close(num(industrial, 0, "other_con_mmbtu"), 4000.0);
    assert_close(num(industrial, 0, "total_con_mmbtu"), 20_000.0);

    // Residential: five housing types for Testville only.
    let residential = output(&outcome, Sector::Residential);
    assert_eq!(residential.len(), 5);
    assert_eq!(cell(residential, 1, "hu_type"), &Value::from("u1d"));
    assert_close(num(residential, 1, "hu"), 100.0);
    assert_close(num(residential, 1, "ng_share"), 0.5);
    assert_close(num(residential, 1, "ng_households"), 50.0);
    assert_close(num(residential, 1, "elec_con_mmbtu"), 375.0);
    assert_close(num(residential, 1, "elec_exp_dollar"), 46_875.0);
    assert_close(num(residential, 1, "foil_con_mmbtu"), 2625.0);
    assert_close(num(residential, 1, "foil_exp_dollar"), 75_000.0);
    assert_close(num(residential, 1, "con_by_structure_mmbtu"), 5250.0);
    assert_close(num(residential, 1, "exp_by_structure_dollar"), 159_375.0);
}

#[test]
fn aggregate_geographies_never_reach_output() {
    let mut loader = loader(Vec::new());
    let outcome = pipeline::run(&Sector::ALL, &mut loader).unwrap();
    for out in &outcome.outputs {
        for row in 0..out.table.len() {
            assert_eq!(cell(&out.table, row, "municipal"), &Value::from("Testville"));
        }
    }
}

#[test]
fn census_is_loaded_once_for_both_sectors() {
    let mut loader = loader(Vec::new());
    pipeline::run(&[Sector::Commercial, Sector::Industrial], &mut loader).unwrap();
    assert!(loader.is_cached(DatasetTag::Eowld));
    let first = loader.load(DatasetTag::Eowld).unwrap();
    let second = loader.load(DatasetTag::Eowld).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.len(), 3);
}

#[test]
fn commercial_alone_is_calibrated_against_both_sectors() {
    let dir = tempfile::tempdir().unwrap();
    let metered = metered_override(
        &dir,
        "municipal,cal_year,mwh_use,therm_use\n\
         Testville,2014,\"3,000\",1000\n\
         Testville,2015,*,*\n",
    );
    let mut loader = loader(vec![metered]);
    let outcome = pipeline::run(&[Sector::Commercial], &mut loader).unwrap();

    assert_eq!(outcome.outputs.len(), 1);
    let report = outcome.calibration.as_ref().unwrap();
    assert_eq!(report.years, vec![2014, 2015]);
    assert_eq!(report.calibrated, 1);
    assert!(report.uncalibrated.contains(&("Testville".to_string(), 2015)));

    let commercial = output(&outcome, Sector::Commercial);
    assert_eq!(commercial.len(), 2);

    // 2014: 3,000 MWh shared with the industrial estimate.
    let industrial_kwh = 8000.0 / 0.003412;
    let elec_ratio = 3_000_000.0 / (1_000_000.0 + industrial_kwh);
    // commercial gas is in Mcf: 300 Mcf is 3000 therms
    let gas_ratio = 1000.0 / (3000.0 + 60_000.0);
    assert_eq!(cell(commercial, 0, "year"), &Value::Integer(2014));
    assert_eq!(cell(commercial, 0, "calibration"), &Value::from("calibrated"));
    assert_close(num(commercial, 0, "elec_con_pu"), 1_000_000.0 * elec_ratio);
    assert_close(num(commercial, 0, "elec_exp_dollar"), 1_200_000_000.0 * elec_ratio);
    assert_close(num(commercial, 0, "elec_con_mmbtu"), 1_000_000.0 * elec_ratio * 0.007692);
    assert_close(num(commercial, 0, "elec_emissions_co2"), 1_000_000.0 * elec_ratio * 0.941);
    assert_close(num(commercial, 0, "ng_con_pu"), 300.0 * gas_ratio);
    assert_close(num(commercial, 0, "ng_con_mmbtu"), 3000.0 * gas_ratio * 0.1);
    assert_close(num(commercial, 0, "foil_con_mmbtu"), 5.56);
    assert_close(
        num(commercial, 0, "total_con_mmbtu"),
        1_000_000.0 * elec_ratio * 0.007692 + 3000.0 * gas_ratio * 0.1 + 5.56,
    );

    // 2015: suppressed readings leave the modeled values in place.
    assert_eq!(cell(commercial, 1, "year"), &Value::Integer(2015));
    assert_eq!(cell(commercial, 1, "calibration"), &Value::from("uncalibrated"));
    assert_close(num(commercial, 1, "elec_con_pu"), 1_000_000.0);
}

#[test]
fn malformed_survey_table_fails_the_sector() {
    let mut store = testville_store();
    store.insert(DatasetTag::MecsAmi.store_table().unwrap(), Table::from_text(&["naics_code"], &[]));
    let mut loader = DatasetLoader::new(Vec::new(), Some(Box::new(store)));
    let err = pipeline::run(&[Sector::Industrial], &mut loader).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<DatasetError>(),
        Some(DatasetError::MissingColumn { dataset: DatasetTag::MecsAmi, .. })
    ));
}

#[test]
fn published_files_and_archive() {
    let dir = tempfile::tempdir().unwrap();
    let mut loader = loader(Vec::new());
    let outcome = pipeline::run(&Sector::ALL, &mut loader).unwrap();
    let publisher = Publisher::new(dir.path().join("output"));
    let manifest = publisher.publish(&outcome).unwrap();

    assert_eq!(manifest.sectors.len(), 3);
    assert_eq!(manifest.archive, Some(dir.path().join("output").join(ARCHIVE_NAME)));
    let csv = fs::read_to_string(dir.path().join("output/sectors/commercial-data.csv")).unwrap();
    let header = csv.lines().next().unwrap();
    assert!(header.starts_with("muni_id,municipal,year,calibration,activity,emps,estabs,elec_con_per_b"));
    assert!(header.ends_with("total_con_mmbtu"));
    assert!(!csv.contains("Middlesex"));
    // uncalibrated rows leave year and calibration empty
    assert!(csv.lines().nth(1).unwrap().starts_with("999,Testville,,,Education,"));
}
