use crate::Job;
use std::fmt;

/// Run times below this are treated as this long when computing bounded
/// slowdown, so trivially short jobs cannot dominate the average.
const BOUNDED_SLOWDOWN_FLOOR: f64 = 10.0;

/// Aggregate statistics over the terminated jobs of one run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Stats {
    pub num_jobs: usize,
    pub average_slowdown: f64,
    pub average_bounded_slowdown: f64,
    pub average_wait_time: f64,
    pub average_flow_time: f64,
}

impl Stats {
    /// Aggregates over terminated jobs; `None` when there are none.
    pub fn from_jobs<'a>(jobs: impl IntoIterator<Item = &'a Job>) -> Option<Self> {
        let mut count = 0usize;
        let mut slowdowns = 0.0;
        let mut bounded_slowdowns = 0.0;
        let mut waits = 0.0;
        let mut flows = 0.0;

        for job in jobs {
            let wait = (job.start_time() - job.submit_time) as f64;
            let run = job.actual_run_time as f64;

            count += 1;
            waits += wait;
            flows += wait + run;
            slowdowns += (wait + run) / run;
            bounded_slowdowns += (wait + run) / run.max(BOUNDED_SLOWDOWN_FLOOR);
        }

        if count == 0 {
            return None;
        }
        let n = count as f64;
        Some(Self {
            num_jobs: count,
            average_slowdown: slowdowns / n,
            average_bounded_slowdown: bounded_slowdowns / n,
            average_wait_time: waits / n,
            average_flow_time: flows / n,
        })
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "STATISTICS:")?;
        writeln!(f, "average_slowdown: {}", self.average_slowdown)?;
        writeln!(f, "average_bounded_slowdown: {}", self.average_bounded_slowdown)?;
        write!(f, "num_jobs: {}", self.num_jobs)
    }
}
