use crate::{JobId, Time};
use fxhash::FxHashMap;
use std::ops::{Index, IndexMut};

/// A single batch job: the immutable attributes read off the workload, plus
/// the state the simulation mutates as the job moves through the system.
///
/// `estimated_run_time` is the user-declared upper bound;
/// `actual_run_time` is the ground truth. Real installations only learn the
/// actual value at termination, the simulation knows it up front and is
/// careful to only consume it where a real machine could.
#[derive(Clone, Debug)]
pub struct Job {
    pub id: JobId,
    pub submit_time: Time,
    pub estimated_run_time: Time,
    pub actual_run_time: Time,
    pub num_required_processors: u32,
    pub user_id: u32,
    pub user_qos: i64,
    pub admin_qos: i64,

    /// Stamped by the calendar on every assignment; final once the machine
    /// accepts a start event carrying the same timestamp.
    pub start_to_run_at_time: Option<Time>,
    /// Set by the simulator when the termination event is dispatched.
    pub finish_time: Option<Time>,
    /// Reservation extent used by the calendar. Equal to the user estimate
    /// unless an adaptive scheduler lowers it.
    pub predicted_run_time: Time,
    /// Per-submission ordinal, assigned by schedulers that need to know who
    /// was submitted before whom after re-sorting their waiting list.
    pub maui_counter: u64,
    /// How many times a later-submitted job was started ahead of this one.
    pub maui_bypass_counter: u64,
}

impl Job {
    pub fn new(
        id: JobId,
        submit_time: Time,
        estimated_run_time: Time,
        actual_run_time: Time,
        num_required_processors: u32,
    ) -> Self {
        assert!(estimated_run_time > 0, "job_id={id}: estimated run time must be positive");
        assert!(actual_run_time > 0, "job_id={id}: actual run time must be positive");
        assert!(num_required_processors > 0, "job_id={id}: processor count must be positive");
        Self {
            id,
            submit_time,
            estimated_run_time,
            actual_run_time,
            num_required_processors,
            user_id: 0,
            user_qos: 0,
            admin_qos: 0,
            start_to_run_at_time: None,
            finish_time: None,
            predicted_run_time: estimated_run_time,
            maui_counter: 0,
            maui_bypass_counter: 0,
        }
    }

    pub fn with_user(mut self, user_id: u32) -> Self {
        self.user_id = user_id;
        self
    }

    pub fn with_qos(mut self, user_qos: i64, admin_qos: i64) -> Self {
        self.user_qos = user_qos;
        self.admin_qos = admin_qos;
        self
    }

    /// The start time, once one has been assigned. Panics on jobs that were
    /// never placed; callers only ask after placement.
    pub fn start_time(&self) -> Time {
        self.start_to_run_at_time
            .unwrap_or_else(|| panic!("job {} was never assigned a start time", self.id))
    }

    pub fn has_terminated(&self) -> bool {
        self.finish_time.is_some()
    }
}

/// The central job store, owned by the simulator. Every other structure
/// (waiting lists, the calendar, the machine's live set) refers to jobs by
/// [`JobId`] only, so cloning a calendar never clones a job.
#[derive(Default)]
pub struct JobTable {
    jobs: FxHashMap<JobId, Job>,
}

impl JobTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, job: Job) {
        let prev = self.jobs.insert(job.id, job);
        assert!(prev.is_none(), "duplicate job id");
    }

    pub fn get(&self, id: JobId) -> Option<&Job> {
        self.jobs.get(&id)
    }

    pub fn get_mut(&mut self, id: JobId) -> Option<&mut Job> {
        self.jobs.get_mut(&id)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Job> {
        self.jobs.values()
    }
}

impl Index<JobId> for JobTable {
    type Output = Job;

    fn index(&self, id: JobId) -> &Self::Output {
        self.get(id)
            .unwrap_or_else(|| panic!("no entry found for job {id}"))
    }
}

impl IndexMut<JobId> for JobTable {
    fn index_mut(&mut self, id: JobId) -> &mut Self::Output {
        self.get_mut(id)
            .unwrap_or_else(|| panic!("no entry found for job {id}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prediction_defaults_to_the_user_estimate() {
        let job = Job::new(7, 0, 100, 40, 8);
        assert_eq!(job.predicted_run_time, 100);
        assert_eq!(job.start_to_run_at_time, None);
        assert!(!job.has_terminated());
    }

    #[test]
    #[should_panic(expected = "processor count")]
    fn zero_processors_is_rejected() {
        let _ = Job::new(1, 0, 10, 10, 0);
    }

    #[test]
    #[should_panic(expected = "actual run time")]
    fn zero_run_time_is_rejected() {
        let _ = Job::new(1, 0, 10, 0, 4);
    }

    #[test]
    fn table_indexes_by_id() {
        let mut table = JobTable::new();
        table.insert(Job::new(3, 0, 5, 5, 1));
        table.insert(Job::new(9, 2, 5, 5, 1));

        table[9].start_to_run_at_time = Some(2);
        assert_eq!(table[9].start_time(), 2);
        assert_eq!(table[3].id, 3);
        assert_eq!(table.len(), 2);
    }

    #[test]
    #[should_panic(expected = "no entry found for job 42")]
    fn missing_id_panics() {
        let table = JobTable::new();
        let _ = &table[42];
    }
}
