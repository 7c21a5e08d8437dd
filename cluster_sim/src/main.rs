use anyhow::Context;
use clap::{Parser, ValueEnum};
use cluster_sim::scheduler::{
    ConservativeScheduler, EasyPlusPlusScheduler, EasyScheduler, FcfsScheduler,
    GreedyEasyScheduler, MauiScheduler, Weights,
};
use cluster_sim::{Job, Scheduler, Simulator};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Discrete-event simulator for batch scheduling on a parallel machine.
///
/// Reads a workload in the Standard Workload Format and prints the run's
/// statistics block on stdout; everything else goes to the log on stderr.
#[derive(Parser)]
#[command(name = "cluster_sim")]
struct Cli {
    /// Number of identical processors in the simulated machine.
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    num_processors: u32,

    /// Scheduling policy to simulate.
    #[arg(long, value_enum)]
    scheduler: SchedulerKind,

    /// Maui: weights ordering the waiting list, as
    /// wtime,sld,user,bypass,admin,size.
    #[arg(long, default_value = "1,0,0,0,0,0")]
    weights_list: Weights,

    /// Maui: weights ordering the backfill pass, same six coordinates.
    #[arg(long, default_value = "1,0,0,0,0,0")]
    weights_backfill: Weights,

    /// Workload file; stdin when absent or "-".
    input: Option<PathBuf>,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SchedulerKind {
    Fcfs,
    Conservative,
    Easy,
    #[value(name = "easy++")]
    EasyPlusPlus,
    Maui,
    #[value(name = "greedy-easy")]
    GreedyEasy,
}

impl Cli {
    fn build_scheduler(&self) -> Box<dyn Scheduler> {
        let n = self.num_processors;
        match self.scheduler {
            SchedulerKind::Fcfs => Box::new(FcfsScheduler::new(n)),
            SchedulerKind::Conservative => Box::new(ConservativeScheduler::new(n)),
            SchedulerKind::Easy => Box::new(EasyScheduler::new(n)),
            SchedulerKind::EasyPlusPlus => Box::new(EasyPlusPlusScheduler::new(n)),
            SchedulerKind::Maui => Box::new(MauiScheduler::with_weights(
                n,
                self.weights_list,
                self.weights_backfill,
            )),
            SchedulerKind::GreedyEasy => Box::new(GreedyEasyScheduler::new(n)),
        }
    }
}

/// Turns usable workload records into jobs. Malformed lines and lines the
/// machine cannot serve are reported and dropped; only I/O failures abort.
fn load_jobs(reader: impl BufRead, num_processors: u32) -> anyhow::Result<Vec<Job>> {
    let mut jobs = Vec::new();
    for record in swf::records(reader) {
        let record = match record {
            Ok(record) => record,
            Err(error @ swf::Error::Io(_)) => {
                return Err(error).context("reading the workload input")
            }
            Err(swf::Error::Line { line, source }) => {
                log::warn!("skipping malformed workload line {line}: {source}");
                continue;
            }
        };

        let Ok(id) = u32::try_from(record.number) else {
            log::warn!("skipping job {}: id out of range", record.number);
            continue;
        };
        if record.requested_time <= 0 {
            log::warn!("skipping job {id}: no requested run time");
            continue;
        }
        let procs = record.required_processors() as u32;
        if procs > num_processors {
            log::warn!(
                "skipping job {id}: wants {procs} processors, the machine has {num_processors}"
            );
            continue;
        }

        let actual = record.run_time as u64;
        let mut estimated = record.requested_time as u64;
        if actual > estimated {
            // an estimate is a bound; repair traces that outran it
            log::debug!("job {id}: run time {actual} exceeds the request {estimated}, raising the estimate");
            estimated = actual;
        }

        jobs.push(
            Job::new(id, record.submit_time as u64, estimated, actual, procs)
                .with_user(record.user_id as u32),
        );
    }
    Ok(jobs)
}

fn load_input(path: Option<&Path>, num_processors: u32) -> anyhow::Result<Vec<Job>> {
    match path {
        Some(path) if path.as_os_str() != "-" => {
            let file = File::open(path)
                .with_context(|| format!("opening workload file {}", path.display()))?;
            load_jobs(BufReader::new(file), num_processors)
        }
        _ => load_jobs(io::stdin().lock(), num_processors),
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let jobs = load_input(cli.input.as_deref(), cli.num_processors)?;
    anyhow::ensure!(!jobs.is_empty(), "no usable jobs in the workload input");

    let mut simulator = Simulator::new(jobs, cli.num_processors, cli.build_scheduler());
    simulator.run();

    let stats = simulator
        .stats()
        .expect("a non-empty workload always terminates jobs");
    println!("{stats}");
    Ok(())
}
