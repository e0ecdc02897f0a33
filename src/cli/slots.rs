use std::path::PathBuf;

use clap::Parser;
use marten::{input::ProblemFile, prelude::*, tables::build_slots_table};

#[derive(Parser)]
pub struct SlotsArgs {
    /// Problem file, `.toml` or `.json`.
    path: PathBuf,
}

impl SlotsArgs {
    pub fn run(self) -> Result {
        let instance = ProblemFile::read(&self.path)?.into_instance()?;
        info!(n_slots = instance.slots.len(), horizon = instance.site.horizon, "aggregated");
        println!("{}", build_slots_table(&instance.slots));
        Ok(())
    }
}
