use super::{start_from_head, Scheduler};
use crate::{Calendar, Event, JobId, JobTable, Time};

/// First-come first-served: jobs start strictly in submission order, the
/// queue stalls behind any head that does not fit. No backfill.
pub struct FcfsScheduler {
    calendar: Calendar,
    waiting: Vec<JobId>,
}

impl FcfsScheduler {
    pub fn new(num_processors: u32) -> Self {
        Self {
            calendar: Calendar::new(num_processors),
            waiting: Vec::new(),
        }
    }

    fn schedule(&mut self, now: Time, jobs: &mut JobTable) -> Vec<Event> {
        start_from_head(&mut self.calendar, &mut self.waiting, now, jobs)
            .into_iter()
            .map(|id| Event::start(now, id))
            .collect()
    }
}

impl Scheduler for FcfsScheduler {
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
