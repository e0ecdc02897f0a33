mod slots;
mod solve;

use clap::{Parser, Subcommand};

use crate::cli::{slots::SlotsArgs, solve::SolveArgs};

#[derive(Parser)]
#[command(author, version, about, propagate_version = true)]
#[must_use]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Main command: find the optimal battery schedule for the problem file.
    #[clap(name = "solve")]
    Solve(Box<SolveArgs>),

    /// Print the aggregated forecast slots.
    #[clap(name = "slots")]
    Slots(SlotsArgs),
}
