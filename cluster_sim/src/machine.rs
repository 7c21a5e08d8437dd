use crate::{Event, JobId, JobTable};
use fxhash::FxHashMap;

/// The parallel machine itself, validating proper usage: it admits a start
/// only if the processors are really there, tracks the live set, and
/// produces the termination event at `start + actual_run_time`.
pub struct Machine {
    num_processors: u32,
    /// Live jobs and the processor count each one holds.
    running: FxHashMap<JobId, u32>,
    busy: u32,
}

impl Machine {
    pub fn new(num_processors: u32) -> Self {
        assert!(num_processors > 0, "a machine needs at least one processor");
        Self {
            num_processors,
            running: FxHashMap::default(),
            busy: 0,
        }
    }

    pub fn num_processors(&self) -> u32 {
        self.num_processors
    }

    pub fn busy_processors(&self) -> u32 {
        self.busy
    }

    pub fn free_processors(&self) -> u32 {
        self.num_processors - self.busy
    }

    pub fn num_running(&self) -> usize {
        self.running.len()
    }

    /// Reacts to a start event. Start events whose timestamp does not match
    /// the job's recorded start time are stale leftovers of a scheduler that
    /// re-placed the job; those are dropped without effect.
    pub fn on_job_start(&mut self, event: Event, jobs: &JobTable) -> Vec<Event> {
        let job = &jobs[event.job];
        if job.start_to_run_at_time != Some(event.timestamp) {
            log::trace!(target: "machine", "dropping stale start event {event}");
            return Vec::new();
        }

        assert!(
            job.num_required_processors <= self.free_processors(),
            "machine oversubscribed at t={}: job {} wants {} processors, {} free",
            event.timestamp,
            job.id,
            job.num_required_processors,
            self.free_processors()
        );
        let prev = self.running.insert(job.id, job.num_required_processors);
        assert!(prev.is_none(), "job {} started twice", job.id);
        self.busy += job.num_required_processors;
        log::trace!(
            target: "machine",
            "job {} started at t={}, {} processors busy",
            job.id,
            event.timestamp,
            self.busy
        );

        vec![Event::termination(
            event.timestamp + job.actual_run_time,
            job.id,
        )]
    }

    /// Reacts to a termination event by handing the processors back.
    pub fn on_job_termination(&mut self, event: Event) {
        let released = self
            .running
            .remove(&event.job)
            .unwrap_or_else(|| panic!("job {} terminated but never ran", event.job));
        self.busy -= released;
        log::trace!(
            target: "machine",
            "job {} terminated at t={}, {} processors busy",
            event.job,
            event.timestamp,
            self.busy
        );
    }

    /// True iff a termination for `job` is still pending.
    pub fn is_running(&self, job: JobId) -> bool {
        self.running.contains_key(&job)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Job, Time};

    fn started_job(id: u32, start: Time, actual: Time, procs: u32) -> Job {
        let mut job = Job::new(id, 0, actual, actual, procs);
        job.start_to_run_at_time = Some(start);
        job
    }

    #[test]
    fn start_emits_the_matching_termination() {
        let mut jobs = JobTable::new();
        jobs.insert(started_job(1, 4, 10, 60));
        let mut machine = Machine::new(100);

        let produced = machine.on_job_start(Event::start(4, 1), &jobs);
        assert_eq!(produced, [Event::termination(14, 1)]);
        assert_eq!(machine.free_processors(), 40);
        assert!(machine.is_running(1));

        machine.on_job_termination(Event::termination(14, 1));
        assert_eq!(machine.free_processors(), 100);
        assert_eq!(machine.num_running(), 0);
    }

    #[test]
    fn stale_start_events_are_discarded() {
        let mut jobs = JobTable::new();
        // recorded start is 8; the event below carries the older time 4
        jobs.insert(started_job(1, 8, 10, 60));
        let mut machine = Machine::new(100);

        assert!(machine.on_job_start(Event::start(4, 1), &jobs).is_empty());
        assert_eq!(machine.busy_processors(), 0);
        assert!(!machine.is_running(1));
    }

    #[test]
    #[should_panic(expected = "machine oversubscribed")]
    fn oversubscription_is_fatal() {
        let mut jobs = JobTable::new();
        jobs.insert(started_job(1, 0, 10, 60));
        jobs.insert(started_job(2, 0, 10, 60));
        let mut machine = Machine::new(100);

        machine.on_job_start(Event::start(0, 1), &jobs);
        machine.on_job_start(Event::start(0, 2), &jobs);
    }
}
