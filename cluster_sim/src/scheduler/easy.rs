use super::{shadow_backfill, start_from_head, Scheduler};
use crate::{Calendar, Event, JobId, JobTable, Time};

/// EASY backfill: FCFS at the head of the queue, and any later job may jump
/// ahead as long as the head's shadow start does not slip.
pub struct EasyScheduler {
    calendar: Calendar,
    waiting: Vec<JobId>,
}

impl EasyScheduler {
    pub fn new(num_processors: u32) -> Self {
        Self {
            calendar: Calendar::new(num_processors),
            waiting: Vec::new(),
        }
    }

    fn schedule(&mut self, now: Time, jobs: &mut JobTable) -> Vec<Event> {
        let mut started = start_from_head(&mut self.calendar, &mut self.waiting, now, jobs);
        started.extend(shadow_backfill(
            &mut self.calendar,
            &mut self.waiting,
            now,
            jobs,
        ));
        started.into_iter().map(|id| Event::start(now, id)).collect()
    }
}

impl Scheduler for EasyScheduler {
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
