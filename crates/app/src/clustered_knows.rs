use graph::prelude::*;

use log::info;

use std::collections::BTreeSet;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

/// A population member read from a plain-text input file: one line per
/// person, `account_id target_degree max_knows`.
struct CliPerson {
    account_id: u64,
    target_degree: u64,
    max_knows: u64,
    knows: BTreeSet<usize>,
}

impl Person for CliPerson {
    fn target_edges(&self, _step_index: u32, _percentages: &[f32]) -> u64 {
        self.target_degree
    }

    fn max_knows(&self) -> u64 {
        self.max_knows
    }

    fn account_id(&self) -> u64 {
        self.account_id
    }

    fn knows(&self) -> &BTreeSet<usize> {
        &self.knows
    }

    fn knows_mut(&mut self) -> &mut BTreeSet<usize> {
        &mut self.knows
    }
}

fn read_population(path: &PathBuf) -> Result<Vec<CliPerson>, Box<dyn std::error::Error>> {
    let file = std::fs::File::open(path)?;
    let mut persons = Vec::new();

    for line in BufReader::new(file).lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let mut fields = line.split_whitespace();
        let account_id: u64 = fields
            .next()
            .ok_or("missing account_id field")?
            .parse()?;
        let target_degree: u64 = fields
            .next()
            .ok_or("missing target_degree field")?
            .parse()?;
        let max_knows: u64 = fields
            .next()
            .ok_or("missing max_knows field")?
            .parse()?;

        persons.push(CliPerson {
            account_id,
            target_degree,
            max_knows,
            knows: BTreeSet::new(),
        });
    }

    Ok(persons)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli::AppArgs {
        path,
        seed,
        clustering_coefficient,
        step_index,
    } = cli::create()?;

    let mut persons = read_population(&path)?;
    info!("loaded {} persons from {:?}", persons.len(), path);

    let generator = ClusteredKnowsGenerator::initialize(ClusteredKnowsConfig::new(
        clustering_coefficient,
    ))?;
    let stats = generator.generate_knows(&mut persons, seed, &[], step_index);

    println!("{stats}");

    Ok(())
}

mod cli {
    use pico_args::Arguments;
    use std::path::PathBuf;

    #[derive(Debug)]
    pub(crate) struct AppArgs {
        pub(crate) path: PathBuf,
        pub(crate) seed: u64,
        pub(crate) clustering_coefficient: f64,
        pub(crate) step_index: u32,
    }

    pub(crate) fn create() -> Result<AppArgs, Box<dyn std::error::Error>> {
        let mut pargs = Arguments::from_env();

        let args = AppArgs {
            path: pargs.value_from_str(["-p", "--path"])?,
            seed: pargs.opt_value_from_str(["-s", "--seed"])?.unwrap_or(42),
            clustering_coefficient: pargs
                .opt_value_from_str(["-c", "--clustering-coefficient"])?
                .unwrap_or(0.1),
            step_index: pargs.opt_value_from_str("--step-index")?.unwrap_or(0),
        };

        Ok(args)
    }
}
