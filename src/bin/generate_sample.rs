//! Write a synthetic parquet file for every dataset tag, for trying the
//! estimator without the backing store:
//!
//! ```text
//! generate_sample [DIR]
//! energy-estimator -f DIR/eowld.parquet eowld -f DIR/cbecs_elec.parquet cbecs_elec ...
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Array, ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

use energy_estimator::data::tag::DatasetTag;
use energy_estimator::sectors::commercial::ACTIVITY_GROUPS;

const TOWNS: [(i64, &str); 4] = [
    (101, "Ashby"),
    (102, "Brookfield"),
    (103, "Carver"),
    (104, "Dover"),
];

/// Aggregate geography the loader must drop.
const AGGREGATE: (i64, &str) = (900, "Middlesex County");

const MANUFACTURING: [(i64, &str); 3] = [
    (311, "Food manufacturing"),
    (325, "Chemical manufacturing"),
    (332, "Fabricated metal product manufacturing"),
];

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_f64()
    }

    /// Rounded value, suppressed (null) with probability `p_missing`.
    fn reading(&mut self, lo: f64, hi: f64, p_missing: f64) -> Option<f64> {
        if self.next_f64() < p_missing {
            None
        } else {
            Some((self.uniform(lo, hi) * 100.0).round() / 100.0)
        }
    }
}

/// Column-major table under construction.
#[derive(Default)]
struct Columns {
    fields: Vec<Field>,
    arrays: Vec<ArrayRef>,
}

impl Columns {
    fn text<S: AsRef<str>>(mut self, name: &str, values: &[S]) -> Self {
        let values: Vec<&str> = values.iter().map(|v| v.as_ref()).collect();
        self.fields.push(Field::new(name, DataType::Utf8, false));
        self.arrays.push(Arc::new(StringArray::from(values)));
        self
    }

    fn int(mut self, name: &str, values: Vec<i64>) -> Self {
        self.fields.push(Field::new(name, DataType::Int64, false));
        self.arrays.push(Arc::new(Int64Array::from(values)));
        self
    }

    fn float(mut self, name: &str, values: Vec<Option<f64>>) -> Self {
        self.fields.push(Field::new(name, DataType::Float64, true));
        self.arrays.push(Arc::new(Float64Array::from(values)));
        self
    }

    fn write(self, dir: &Path, tag: DatasetTag) -> Result<PathBuf> {
        let schema = Arc::new(Schema::new(self.fields));
        let rows = self.arrays.first().map_or(0, |a| a.len());
        let batch = RecordBatch::try_new(schema.clone(), self.arrays)
            .with_context(|| format!("building {tag} batch"))?;

        let path = dir.join(format!("{tag}.parquet"));
        let file = std::fs::File::create(&path)
            .with_context(|| format!("creating {}", path.display()))?;
        let mut writer = ArrowWriter::try_new(file, schema, None)?;
        writer.write(&batch)?;
        writer.close()?;
        println!("Wrote {rows} rows to {}", path.display());
        Ok(path)
    }
}

fn all_places() -> Vec<(i64, &'static str)> {
    TOWNS.iter().copied().chain([AGGREGATE]).collect()
}

fn employment(rng: &mut SimpleRng, dir: &Path) -> Result<()> {
    let mut muni_id = Vec::new();
    let mut municipal = Vec::new();
    let mut naics = Vec::new();
    let mut title = Vec::new();
    let mut year = Vec::new();
    let mut avgemp = Vec::new();
    let mut estab = Vec::new();

    let commercial = ACTIVITY_GROUPS
        .iter()
        .flat_map(|(activity, codes)| codes.iter().take(2).map(move |&c| (c, *activity)));
    let codes: Vec<(i64, &str)> = commercial.chain(MANUFACTURING).collect();

    for cal_year in [2014, 2015] {
        for (id, name) in all_places() {
            for &(code, code_title) in &codes {
                muni_id.push(id);
                municipal.push(name);
                naics.push(code);
                title.push(code_title);
                year.push(cal_year);
                let emp = rng.reading(5.0, 400.0, 0.05);
                avgemp.push(emp.map(f64::round));
                estab.push(emp.map(|e| (e / 25.0).ceil()));
            }
        }
    }

    Columns::default()
        .int("muni_id", muni_id)
        .text("municipal", &municipal)
        .int("naicscode", naics)
        .text("naicstitle", &title)
        .int("cal_year", year)
        .float("avgemp", avgemp)
        .float("estab", estab)
        .write(dir, DatasetTag::Eowld)?;
    Ok(())
}

fn building_survey(rng: &mut SimpleRng, dir: &Path) -> Result<()> {
    let activities: Vec<&str> = ACTIVITY_GROUPS.iter().map(|(a, _)| *a).collect();
    // (tag, consumption per worker range, dollars per unit)
    let fuels = [
        (DatasetTag::CbecsElec, (5.0, 30.0), 0.12),
        (DatasetTag::CbecsNg, (10.0, 80.0), 9.5),
        (DatasetTag::CbecsFoil, (5.0, 40.0), 2.8),
    ];
    for (tag, (lo, hi), price) in fuels {
        let per_worker: Vec<Option<f64>> =
            activities.iter().map(|_| rng.reading(lo, hi, 0.1)).collect();
        let per_building: Vec<Option<f64>> = per_worker
            .iter()
            .map(|w| w.map(|w| (w * rng.uniform(8.0, 30.0)).round()))
            .collect();
        let unit_scale = if tag == DatasetTag::CbecsElec { 1000.0 } else { 1.0 };
        let dollars = |c: &Option<f64>| c.map(|c| (c * unit_scale * price).round());

        Columns::default()
            .text("activity", &activities)
            .float("cnsperbldng", per_building.clone())
            .float("experbldng", per_building.iter().map(dollars).collect())
            .float("cnsperworker", per_worker.clone())
            .float("experworker", per_worker.iter().map(dollars).collect())
            .write(dir, tag)?;
    }

    let all: Vec<f64> = activities.iter().map(|_| rng.uniform(50.0, 900.0).round()).collect();
    let ng = all.iter().map(|a| Some((a * rng.uniform(0.3, 0.8)).round())).collect();
    let foil = all
        .iter()
        .map(|a| rng.reading(0.0, 0.3, 0.2).map(|f| (a * f).round()))
        .collect();
    Columns::default()
        .text("activity", &activities)
        .float("all", all.into_iter().map(Some).collect())
        .float("ng", ng)
        .float("fueloil", foil)
        .write(dir, DatasetTag::CbecsSources)?;
    Ok(())
}

fn manufacturing_survey(rng: &mut SimpleRng, dir: &Path) -> Result<()> {
    let mut codes = Vec::new();
    let mut regions = Vec::new();
    let mut cons = Vec::new();
    for region in ["Northeast", "Midwest"] {
        for (code, _) in MANUFACTURING {
            codes.push(code);
            regions.push(region);
            cons.push(rng.reading(100.0, 2000.0, 0.0));
        }
    }
    Columns::default()
        .int("naics_code", codes)
        .text("region", &regions)
        .float("cons_emp", cons)
        .write(dir, DatasetTag::MecsFce)?;

    let names = ["elec", "ng", "dist_foil", "res_foil", "lpgngl", "coal", "coke", "other"];
    let mut mix: Vec<Vec<Option<f64>>> = vec![Vec::new(); names.len()];
    let mut total = Vec::new();
    for _ in MANUFACTURING {
        let row: Vec<Option<f64>> = names.iter().map(|_| rng.reading(0.0, 50.0, 0.15)).collect();
        total.push(Some(row.iter().flatten().sum::<f64>()));
        for (column, value) in mix.iter_mut().zip(row) {
            column.push(value);
        }
    }
    let mut columns = Columns::default()
        .int("naics_code", MANUFACTURING.iter().map(|(c, _)| *c).collect())
        .text("geography", &["Northeast"; 3]);
    for (name, values) in names.iter().zip(mix) {
        columns = columns.float(name, values);
    }
    columns.float("tot", total).write(dir, DatasetTag::MecsAmi)?;
    Ok(())
}

fn household_survey(rng: &mut SimpleRng, dir: &Path) -> Result<()> {
    Columns::default()
        .text(
            "hu_type",
            &[
                "Single_family_detached",
                "Single_family_attached",
                "two_four_units",
                "five_plus_units",
                "Mobile_home",
            ],
        )
        .float("ma", vec![Some(1.6), Some(0.1), Some(0.5), Some(0.4), None])
        .write(dir, DatasetTag::RecsSc)?;

    let labels = [
        "Total Households",
        "Single-Family Detached",
        "Single-Family Attached",
        "Apartments in 2-4 Unit Buildings",
        "Apartments in 5 or More Unit Buildings",
        "Mobile Homes",
    ];
    for (tag, scale) in [(DatasetTag::RecsHfc, 1.0), (DatasetTag::RecsHfe, 25.0)] {
        let mut geography = vec!["United States"; labels.len()];
        let mut hu_type = labels.to_vec();
        let mut columns: [Vec<Option<f64>>; 3] = Default::default();
        for _ in labels {
            columns[0].push(rng.reading(8.0, 15.0, 0.0).map(|v| v * scale));
            columns[1].push(rng.reading(30.0, 70.0, 0.0).map(|v| v * scale));
            columns[2].push(rng.reading(40.0, 80.0, 0.1).map(|v| v * scale));
        }
        if tag == DatasetTag::RecsHfc {
            geography.push("Massachusetts");
            hu_type.push("Total Households");
            columns[0].push(Some(11.5));
            columns[1].push(Some(58.0));
            columns[2].push(Some(64.0));
        }
        let [elec, ng, foil] = columns;
        Columns::default()
            .text("geography", &geography)
            .text("hu_type", &hu_type)
            .float("avg_elec", elec)
            .float("avg_ng", ng)
            .float("avg_foil", foil)
            .write(dir, tag)?;
    }
    Ok(())
}

fn housing(rng: &mut SimpleRng, dir: &Path) -> Result<()> {
    let buckets = ["u1a", "u1d", "u2_4", "u5_9", "u10_19", "u20ov", "u_oth"];
    let mut ids = Vec::new();
    let mut names = Vec::new();
    let mut periods = Vec::new();
    let mut hu = Vec::new();
    let mut units: Vec<Vec<Option<f64>>> = vec![Vec::new(); buckets.len()];
    let mut gas = Vec::new();
    let mut elec = Vec::new();
    let mut oil = Vec::new();

    for period in ["2010-14", "2011-15"] {
        for (id, name) in all_places() {
            ids.push(id);
            names.push(name);
            periods.push(period);
            let counts: Vec<f64> = buckets.iter().map(|_| rng.uniform(0.0, 2000.0).round()).collect();
            let total: f64 = counts.iter().sum();
            hu.push(Some(total));
            for (column, count) in units.iter_mut().zip(&counts) {
                column.push(Some(*count));
            }
            gas.push(Some((total * rng.uniform(0.3, 0.6)).round()));
            elec.push(Some((total * rng.uniform(0.1, 0.3)).round()));
            oil.push(rng.reading(0.0, total * 0.3, 0.1).map(f64::round));
        }
    }

    let mut columns = Columns::default()
        .int("muni_id", ids.clone())
        .text("municipal", &names)
        .text("acs_year", &periods)
        .float("hu", hu);
    for (name, values) in buckets.iter().zip(units) {
        columns = columns.float(name, values);
    }
    columns.write(dir, DatasetTag::AcsUis)?;

    Columns::default()
        .int("muni_id", ids)
        .text("municipal", &names)
        .text("acs_year", &periods)
        .float("gas", gas)
        .float("elec", elec)
        .float("oil", oil)
        .write(dir, DatasetTag::AcsHf)?;
    Ok(())
}

fn metered(rng: &mut SimpleRng, dir: &Path) -> Result<()> {
    let mut names = Vec::new();
    let mut years = Vec::new();
    let mut mwh = Vec::new();
    let mut therms = Vec::new();
    for cal_year in [2013, 2014, 2015] {
        // The last town has no metered program data.
        for (_, name) in &TOWNS[..TOWNS.len() - 1] {
            names.push(*name);
            years.push(cal_year);
            mwh.push(rng.reading(5_000.0, 60_000.0, 0.0));
            therms.push(rng.reading(100_000.0, 2_000_000.0, 0.0));
        }
    }
    Columns::default()
        .text("municipal", &names)
        .int("cal_year", years)
        .float("mwh_use", mwh)
        .float("therm_use", therms)
        .write(dir, DatasetTag::MasssaveCi)?;
    Ok(())
}

fn main() -> Result<()> {
    let dir = std::env::args()
        .nth(1)
        .map_or_else(|| PathBuf::from("sample_data"), PathBuf::from);
    std::fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;

    let mut rng = SimpleRng::new(42);
    employment(&mut rng, &dir)?;
    building_survey(&mut rng, &dir)?;
    manufacturing_survey(&mut rng, &dir)?;
    household_survey(&mut rng, &dir)?;
    housing(&mut rng, &dir)?;
    metered(&mut rng, &dir)?;

    let args: Vec<String> = DatasetTag::ALL
        .iter()
        .map(|tag| format!("-f {}/{tag}.parquet {tag}", dir.display()))
        .collect();
    println!("\nenergy-estimator {}", args.join(" "));
    Ok(())
}
