use crate::{Calendar, Event, JobId, JobTable, Time};

pub use self::conservative::ConservativeScheduler;
pub use self::easy::EasyScheduler;
pub use self::easy_plus_plus::EasyPlusPlusScheduler;
pub use self::fcfs::FcfsScheduler;
pub use self::greedy::{
    by_estimate, by_size, by_submit, by_submit_desc, resource_consumption, Comparator,
    GreedyEasyScheduler, ScoreFn,
};
pub use self::maui::{MauiScheduler, ParseWeightsError, Weights};

mod conservative;
mod easy;
mod easy_plus_plus;
mod fcfs;
mod greedy;
mod maui;

#[cfg(test)]
mod test;

/// A scheduling policy. The simulator forwards each submission and
/// termination here; the scheduler answers with the events it wants
/// enqueued (job starts, and for adaptive policies prediction expiries).
///
/// Every implementation owns a [`Calendar`] and begins each reaction by
/// archiving the slices that have passed.
pub trait Scheduler {
    fn on_job_submission(&mut self, job: JobId, now: Time, jobs: &mut JobTable) -> Vec<Event>;

    fn on_job_termination(&mut self, job: JobId, now: Time, jobs: &mut JobTable) -> Vec<Event>;

    /// Fired when a job outlives its predicted run time. Only adaptive
    /// schedulers care.
    fn on_prediction_expiry(&mut self, _job: JobId, _now: Time, _jobs: &mut JobTable) -> Vec<Event> {
        Vec::new()
    }

    fn calendar(&self) -> &Calendar;

    /// Mutable calendar access, for the post-run feasibility
    /// reconstruction.
    fn calendar_mut(&mut self) -> &mut Calendar;
}

/// Starts jobs off the front of `waiting` for as long as the head can run
/// immediately; stops at the first head that cannot. Returns the started
/// ids in start order.
pub(crate) fn start_from_head(
    calendar: &mut Calendar,
    waiting: &mut Vec<JobId>,
    now: Time,
    jobs: &mut JobTable,
) -> Vec<JobId> {
    let mut started = Vec::new();
    while let Some(&head) = waiting.first() {
        if !calendar.can_start_now(&jobs[head], now) {
            break;
        }
        calendar.assign(&mut jobs[head], now);
        waiting.remove(0);
        started.push(head);
    }
    started
}

/// The EASY backfill rule over `waiting[1..]`: a candidate may start now iff
/// doing so does not push the head job's shadow start later. Each candidate
/// is tentatively assigned, the shadow re-measured, and the placement either
/// committed (the id is removed from `waiting` and returned) or rolled back.
pub(crate) fn shadow_backfill(
    calendar: &mut Calendar,
    waiting: &mut Vec<JobId>,
    now: Time,
    jobs: &mut JobTable,
) -> Vec<JobId> {
    if waiting.len() < 2 {
        return Vec::new();
    }
    let head = waiting[0];
    let shadow = calendar.earliest_start(&jobs[head], now);

    let mut committed = Vec::new();
    let candidates: Vec<JobId> = waiting[1..].to_vec();
    for candidate in candidates {
        if !calendar.can_start_now(&jobs[candidate], now) {
            continue;
        }
        calendar.assign(&mut jobs[candidate], now);
        let pushed = calendar.earliest_start(&jobs[head], now);
        if pushed <= shadow {
            waiting.retain(|&id| id != candidate);
            committed.push(candidate);
            log::debug!(target: "scheduler", "backfilled job {candidate} at t={now}");
        } else {
            calendar.release_full(&jobs[candidate]);
            log::debug!(
                target: "scheduler",
                "not backfilling job {candidate}: head {head} would slip {shadow} -> {pushed}"
            );
        }
    }
    committed
}
