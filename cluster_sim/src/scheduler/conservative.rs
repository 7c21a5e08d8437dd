use super::Scheduler;
use crate::{Calendar, Event, JobId, JobTable, Time};

/// Conservative backfill: every job is reserved at its earliest feasible
/// start the moment it is submitted. Reservations only ever move earlier,
/// when a tail released by an early termination opens a gap.
pub struct ConservativeScheduler {
    calendar: Calendar,
    /// Reserved but not yet started, in submission order.
    reserved: Vec<JobId>,
}

impl ConservativeScheduler {
    pub fn new(num_processors: u32) -> Self {
        Self {
            calendar: Calendar::new(num_processors),
            reserved: Vec::new(),
        }
    }

    /// Re-places every pending reservation in submission order and starts
    /// the ones that landed on `now`.
    fn compact(&mut self, now: Time, jobs: &mut JobTable) -> Vec<Event> {
        let mut events = Vec::new();
        let mut still_reserved = Vec::with_capacity(self.reserved.len());
        for id in std::mem::take(&mut self.reserved) {
            let job = &mut jobs[id];
            let previous = job.start_time();
            self.calendar.release_full(job);
            let start = self.calendar.assign_earliest(job, now);
            debug_assert!(start <= previous, "job {id} moved later: {previous} -> {start}");
            if start < previous {
                log::debug!(target: "scheduler", "job {id} reservation moved {previous} -> {start}");
            }
            if start == now {
                events.push(Event::start(now, id));
            } else {
                still_reserved.push(id);
            }
        }
        self.reserved = still_reserved;
        events
    }
}

impl Scheduler for ConservativeScheduler {
    fn on_job_submission(&mut self, job: JobId, now: Time, jobs: &mut JobTable) -> Vec<Event> {
        self.calendar.archive_old_slices(now);
        let start = self.calendar.assign_earliest(&mut jobs[job], now);
        if start == now {
            vec![Event::start(now, job)]
        } else {
            self.reserved.push(job);
            Vec::new()
        }
    }

    fn on_job_termination(&mut self, job: JobId, now: Time, jobs: &mut JobTable) -> Vec<Event> {
        self.calendar.archive_old_slices(now);
        self.calendar.release_tail(&jobs[job]);
        self.compact(now, jobs)
    }

    fn calendar(&self) -> &Calendar {
        &self.calendar
    }

    fn calendar_mut(&mut self) -> &mut Calendar {
        &mut self.calendar
    }
}
