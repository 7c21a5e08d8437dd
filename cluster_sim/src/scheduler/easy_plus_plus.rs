use super::{start_from_head, Scheduler};
use crate::{Calendar, Event, JobId, JobTable, Time};
use fxhash::FxHashMap;

/// The last two completed run times of one user.
#[derive(Clone, Copy, Default)]
struct RunTimeHistory {
    prev: Option<Time>,
    last: Option<Time>,
}

impl RunTimeHistory {
    fn record(&mut self, actual: Time) {
        self.prev = self.last;
        self.last = Some(actual);
    }

    /// Average of the two samples, once both exist.
    fn average(&self) -> Option<Time> {
        Some((self.prev? + self.last?) / 2)
    }
}

/// EASY with adaptive run-time prediction (Tsafrir, Etzion and Feitelson):
/// a waiting job's reservation extent is the smaller of its user estimate
/// and the average of that user's last two actual run times. Backfill
/// considers the tail shortest-predicted-first. A job that outlives its
/// prediction triggers a prediction-expiry event, which stretches its
/// reservation back out to the user estimate.
pub struct EasyPlusPlusScheduler {
    calendar: Calendar,
    waiting: Vec<JobId>,
    history: FxHashMap<u32, RunTimeHistory>,
}

impl EasyPlusPlusScheduler {
    pub fn new(num_processors: u32) -> Self {
        Self {
            calendar: Calendar::new(num_processors),
            waiting: Vec::new(),
            history: FxHashMap::default(),
        }
    }

    fn refresh_predictions(&self, jobs: &mut JobTable) {
        for &id in &self.waiting {
            let job = &mut jobs[id];
            if let Some(average) = self.history.get(&job.user_id).and_then(RunTimeHistory::average)
            {
                job.predicted_run_time = average.max(1).min(job.estimated_run_time);
            }
        }
    }

    fn schedule(&mut self, now: Time, jobs: &mut JobTable) -> Vec<Event> {
        self.refresh_predictions(jobs);

        let mut started = start_from_head(&mut self.calendar, &mut self.waiting, now, jobs);
        started.extend(self.backfill(now, jobs));

        let mut events = Vec::new();
        for id in started {
            let job = &jobs[id];
            events.push(Event::start(now, id));
            // probe the predicted end, so a job that outlives its
            // prediction gets its reservation stretched back out
            if job.predicted_run_time < job.estimated_run_time {
                events.push(Event::prediction_expiry(now + job.predicted_run_time, id));
            }
        }
        events
    }

    /// Backfill under the head's predicted reservation: the head is parked
    /// at its earliest predicted start, tail jobs are admitted
    /// shortest-predicted-first whenever they can run immediately, and the
    /// head's reservation is dropped again at the end.
    fn backfill(&mut self, now: Time, jobs: &mut JobTable) -> Vec<JobId> {
        if self.waiting.len() < 2 {
            return Vec::new();
        }
        let head = self.waiting[0];
        self.calendar.assign_earliest(&mut jobs[head], now);

        let mut tail: Vec<JobId> = self.waiting[1..].to_vec();
        tail.sort_by_key(|&id| jobs[id].predicted_run_time);

        let mut started = Vec::new();
        for id in tail {
            if self.calendar.can_start_now(&jobs[id], now) {
                self.calendar.assign(&mut jobs[id], now);
                self.waiting.retain(|&w| w != id);
                started.push(id);
                log::debug!(target: "scheduler", "backfilled job {id} at t={now} under predicted head start");
            }
        }

        self.calendar.release_full(&jobs[head]);
        started
    }
}

impl Scheduler for EasyPlusPlusScheduler {
    fn on_job_submission(&mut self, job: JobId, now: Time, jobs: &mut JobTable) -> Vec<Event> {
        self.history.entry(jobs[job].user_id).or_default();
        self.calendar.archive_old_slices(now);
        self.waiting.push(job);
        self.schedule(now, jobs)
    }

    fn on_job_termination(&mut self, job: JobId, now: Time, jobs: &mut JobTable) -> Vec<Event> {
        {
            let job = &jobs[job];
            self.history
                .entry(job.user_id)
                .or_default()
                .record(job.actual_run_time);
        }
        self.calendar.archive_old_slices(now);
        self.calendar.release_tail(&jobs[job]);
        self.schedule(now, jobs)
    }

    fn on_prediction_expiry(&mut self, job: JobId, now: Time, jobs: &mut JobTable) -> Vec<Event> {
        let job = &mut jobs[job];
        if job.has_terminated() {
            return Vec::new();
        }
        log::debug!(
            target: "scheduler",
            "job {} outlived its prediction at t={now}, restoring the estimate",
            job.id
        );
        self.calendar.archive_old_slices(now);
        self.calendar.reattach_tail(job);
        Vec::new()
    }

    fn calendar(&self) -> &Calendar {
        &self.calendar
    }

    fn calendar_mut(&mut self) -> &mut Calendar {
        &mut self.calendar
    }
}
