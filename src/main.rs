use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};

use energy_estimator::config::Settings;
use energy_estimator::data::cache::{DatasetLoader, FileOverride};
use energy_estimator::data::tag::DatasetTag;
use energy_estimator::pipeline;
use energy_estimator::publish::Publisher;
use energy_estimator::sectors::Sector;

#[derive(Parser)]
#[command(name = "energy-estimator")]
#[command(about = "Estimate municipal energy use, expenditure and CO2 emissions by sector")]
#[command(version)]
struct Cli {
    /// Sector to estimate (commercial, residential, industrial or all). Repeatable.
    #[arg(short, long = "sector", value_name = "NAME")]
    sectors: Vec<String>,

    /// Use a file in place of a dataset's store table: --file <PATH> <TAG>. Repeatable.
    #[arg(short, long = "file", num_args = 2, value_names = ["PATH", "TAG"])]
    files: Vec<String>,

    /// SQLite backing store (overrides DB_PATH)
    #[arg(long, value_name = "PATH")]
    db: Option<PathBuf>,

    /// Root directory for output/ (overrides FILES_PATH)
    #[arg(long, value_name = "DIR")]
    output: Option<PathBuf>,
}

impl Cli {
    /// Requested sectors in run order. Unknown names are reported and skipped.
    fn requested_sectors(&self) -> Vec<Sector> {
        let (selected, rejected) = Sector::select(&self.sectors);
        for msg in rejected {
            log::warn!("{msg}");
        }
        selected
    }

    fn file_overrides(&self) -> Vec<FileOverride> {
        match FileOverride::from_args(&self.files) {
            Ok(overrides) => overrides,
            Err(err) => Cli::command()
                .error(
                    ErrorKind::InvalidValue,
                    format!("{err}. Valid dataset tags are {}.", DatasetTag::valid_names()),
                )
                .exit(),
        }
    }
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let overrides = cli.file_overrides();
    let sectors = cli.requested_sectors();
    if sectors.is_empty() {
        bail!("no valid sectors requested. Valid sector arguments are {}.", Sector::valid_names());
    }

    let settings = Settings::from_env().with_overrides(cli.output.clone(), cli.db.clone());
    let store = settings.open_store()?;
    let mut loader = DatasetLoader::new(overrides, store);

    let outcome = pipeline::run(&sectors, &mut loader)?;
    let manifest = Publisher::new(settings.output_dir()).publish(&outcome)?;

    for published in &manifest.sectors {
        log::info!("{}: {} rows", published.sector, published.rows);
    }
    if let Some(archive) = &manifest.archive {
        log::info!("archive: {}", archive.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("energy-estimator").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn unknown_sector_is_skipped() {
        let cli = parse(&["-s", "commercial", "-s", "bogus"]);
        assert_eq!(cli.requested_sectors(), vec![Sector::Commercial]);
    }

    #[test]
    fn all_and_default_select_every_sector() {
        assert_eq!(parse(&["-s", "all"]).requested_sectors(), Sector::ALL.to_vec());
        assert_eq!(parse(&[]).requested_sectors(), Sector::ALL.to_vec());
    }

    #[test]
    fn file_flag_takes_a_path_and_a_tag() {
        let cli = parse(&["-f", "census.csv", "eowld", "--file", "mix.parquet", "mecs_ami"]);
        let overrides = cli.file_overrides();
        assert_eq!(overrides.len(), 2);
        assert_eq!(overrides[0].path, PathBuf::from("census.csv"));
        assert_eq!(overrides[1].tag, DatasetTag::MecsAmi);
    }

    #[test]
    fn file_flag_without_a_tag_is_rejected() {
        assert!(Cli::try_parse_from(["energy-estimator", "-f", "census.csv"]).is_err());
    }
}
