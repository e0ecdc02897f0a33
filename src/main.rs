#![allow(clippy::doc_markdown)]
#![doc = include_str!("../README.md")]

mod cli;

use clap::{Parser, crate_version};
use marten::prelude::*;

use crate::cli::{Args, Command};

fn main() -> Result {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().without_time().compact().with_writer(std::io::stderr).init();
    info!(version = crate_version!(), "starting…");

    match Args::parse().command {
        Command::Solve(args) => args.run(),
        Command::Slots(args) => args.run(),
    }
}
