use std::path::PathBuf;

use clap::Parser;
use marten::{
    core::solver::{LogSubscriber, Outcome, Solver, StopCondition, Strategy},
    input::ProblemFile,
    prelude::*,
    tables::{build_schedule_table, build_summary_table},
};

#[derive(Parser)]
pub struct SolveArgs {
    /// Problem file, `.toml` or `.json`.
    path: PathBuf,

    #[clap(long, env = "STRATEGY", default_value = "dp")]
    strategy: Strategy,

    /// Number of worker threads, `0` stands for the number of logical CPUs.
    #[clap(long, env = "THREADS", default_value = "0")]
    threads: usize,

    /// Stop and return the best schedule found so far after the timeout.
    #[clap(long, env = "TIMEOUT")]
    timeout: Option<humantime::Duration>,

    /// Stop after exploring the number of search nodes.
    #[clap(long, env = "NODE_LIMIT")]
    node_limit: Option<u64>,

    /// Print the result as JSON instead of the tables.
    #[clap(long)]
    json: bool,
}

impl SolveArgs {
    pub fn run(self) -> Result {
        let instance = ProblemFile::read(&self.path)?.into_instance()?;
        let problem = instance.problem()?;
        let stop = StopCondition::builder()
            .maybe_timeout(self.timeout.map(Into::into))
            .maybe_node_limit(self.node_limit)
            .build();
        let outcome = Solver::builder()
            .problem(&problem)
            .strategy(self.strategy)
            .threads(self.threads)
            .stop(stop)
            .subscriber(&LogSubscriber)
            .solve()?;
        match outcome {
            Outcome::Scheduled(result) => {
                if self.json {
                    println!("{}", serde_json::to_string_pretty(&result)?);
                } else {
                    println!("{}", build_schedule_table(&instance.slots, &result.schedule));
                    println!("{}", build_summary_table(&result));
                }
                Ok(())
            }
            Outcome::Infeasible => bail!("no schedule satisfies the constraints"),
            Outcome::Interrupted => bail!("stopped before any feasible schedule was found"),
        }
    }
}
