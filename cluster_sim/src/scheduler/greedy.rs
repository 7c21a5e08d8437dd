use super::{shadow_backfill, start_from_head, Scheduler};
use crate::{Calendar, Event, Job, JobId, JobTable, Time};
use std::cmp::Ordering;

/// Orders two jobs for a candidate backfill pass.
pub type Comparator = fn(&Job, &Job) -> Ordering;

/// Scores the set of jobs a candidate ordering managed to place.
pub type ScoreFn = fn(&[&Job]) -> f64;

pub fn by_submit_desc(a: &Job, b: &Job) -> Ordering {
    b.submit_time.cmp(&a.submit_time)
}

pub fn by_submit(a: &Job, b: &Job) -> Ordering {
    a.submit_time.cmp(&b.submit_time)
}

/// Smallest job first.
pub fn by_size(a: &Job, b: &Job) -> Ordering {
    a.num_required_processors.cmp(&b.num_required_processors)
}

/// Shortest estimate first.
pub fn by_estimate(a: &Job, b: &Job) -> Ordering {
    a.estimated_run_time.cmp(&b.estimated_run_time)
}

/// Default score: total resource consumption of the placed set.
pub fn resource_consumption(placed: &[&Job]) -> f64 {
    placed
        .iter()
        .map(|job| job.num_required_processors as f64 * job.estimated_run_time as f64)
        .sum()
}

/// EASY backfill over the most promising of several tail orderings.
///
/// At each backfill decision every configured comparator sorts the tail,
/// the resulting placements are simulated against a cloned calendar (with
/// the head already parked at its shadow start) and scored; the ordering
/// with the highest score wins, earliest comparator taking ties. The real
/// backfill then runs over the reordered tail under the ordinary
/// shadow-preservation rule.
pub struct GreedyEasyScheduler {
    calendar: Calendar,
    waiting: Vec<JobId>,
    comparators: Vec<Comparator>,
    score: ScoreFn,
}

impl GreedyEasyScheduler {
    pub fn new(num_processors: u32) -> Self {
        Self::with_policies(
            num_processors,
            vec![by_submit_desc, by_submit, by_size, by_estimate],
            resource_consumption,
        )
    }

    pub fn with_policies(
        num_processors: u32,
        comparators: Vec<Comparator>,
        score: ScoreFn,
    ) -> Self {
        assert!(!comparators.is_empty(), "need at least one tail ordering");
        Self {
            calendar: Calendar::new(num_processors),
            waiting: Vec::new(),
            comparators,
            score,
        }
    }

    fn schedule(&mut self, now: Time, jobs: &mut JobTable) -> Vec<Event> {
        self.waiting.sort_by(|&a, &b| by_submit(&jobs[a], &jobs[b]));

        let mut started = start_from_head(&mut self.calendar, &mut self.waiting, now, jobs);
        if self.waiting.len() > 1 {
            self.reorder_tail(now, jobs);
            started.extend(shadow_backfill(&mut self.calendar, &mut self.waiting, now, jobs));
        }

        // leave the list in submission order for the next decision
        self.waiting.sort_by(|&a, &b| by_submit(&jobs[a], &jobs[b]));
        started.into_iter().map(|id| Event::start(now, id)).collect()
    }

    /// Scores every comparator's ordering on a scratch calendar and sorts
    /// the real tail by the winner.
    fn reorder_tail(&mut self, now: Time, jobs: &JobTable) {
        let head = &jobs[self.waiting[0]];
        let mut base = self.calendar.clone();
        let shadow = base.earliest_start(head, now);
        base.reserve(head, shadow);

        let mut winner = 0;
        let mut best_score = 0.0;
        for (index, comparator) in self.comparators.iter().enumerate() {
            let mut scratch = base.clone();
            let mut order: Vec<JobId> = self.waiting[1..].to_vec();
            order.sort_by(|&a, &b| comparator(&jobs[a], &jobs[b]));

            let mut placed: Vec<&Job> = Vec::new();
            for &id in &order {
                let job = &jobs[id];
                if scratch.can_start_now(job, now) {
                    scratch.reserve(job, now);
                    placed.push(job);
                }
            }

            let score = (self.score)(&placed);
            log::debug!(target: "scheduler", "tail ordering {index} places {} jobs, score {score}", placed.len());
            if score > best_score {
                best_score = score;
                winner = index;
            }
        }

        let comparator = self.comparators[winner];
        self.waiting[1..].sort_by(|&a, &b| comparator(&jobs[a], &jobs[b]));
    }
}

impl Scheduler for GreedyEasyScheduler {
    fn on_job_submission(&mut self, job: JobId, now: Time, jobs: &mut JobTable) -> Vec<Event> {
        self.calendar.archive_old_slices(now);
        self.waiting.push(job);
        self.schedule(now, jobs)
    }

    fn on_job_termination(&mut self, job: JobId, now: Time, jobs: &mut JobTable) -> Vec<Event> {
        self.calendar.archive_old_slices(now);
        self.calendar.release_tail(&jobs[job]);
        self.schedule(now, jobs)
    }

    fn calendar(&self) -> &Calendar {
        &self.calendar
    }

    fn calendar_mut(&mut self) -> &mut Calendar {
        &mut self.calendar
    }
}
