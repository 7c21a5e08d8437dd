use crate::{Event, EventKind, EventQueue, Job, JobId, JobTable, Machine, Scheduler, Stats};

/// Everything the event handlers operate on: the job store, the machine,
/// the scheduling policy and the termination log.
pub struct Core {
    pub jobs: JobTable,
    pub machine: Machine,
    pub scheduler: Box<dyn Scheduler>,
    /// Terminated job ids in the order their terminations were dispatched.
    pub terminated: Vec<JobId>,
}

/// Binds the workload, event queue, machine and scheduler together and
/// drives the event loop to exhaustion.
///
/// The clock only moves forward: an event at time `t` may only produce
/// events at `t` or later, and the queue enforces that. Every job handed in
/// at construction is seeded as one submission event.
pub struct Simulator {
    queue: EventQueue<Core>,
    core: Core,
    seeded: usize,
}

impl Simulator {
    pub fn new(
        jobs: impl IntoIterator<Item = Job>,
        num_processors: u32,
        scheduler: Box<dyn Scheduler>,
    ) -> Self {
        let mut queue = EventQueue::new();

        // The machine's handlers go first: its capacity bookkeeping has to
        // be settled before the scheduler reacts to the same event.
        queue.add_handler(EventKind::Start, |core: &mut Core, event| {
            let Core { machine, jobs, .. } = core;
            machine.on_job_start(event, jobs)
        });
        queue.add_handler(EventKind::Termination, |core: &mut Core, event| {
            core.machine.on_job_termination(event);
            Vec::new()
        });

        queue.add_handler(EventKind::Submission, |core: &mut Core, event| {
            let Core { scheduler, jobs, .. } = core;
            scheduler.on_job_submission(event.job, event.timestamp, jobs)
        });
        queue.add_handler(EventKind::Termination, |core: &mut Core, event| {
            let Core {
                scheduler,
                jobs,
                terminated,
                ..
            } = core;
            jobs[event.job].finish_time = Some(event.timestamp);
            terminated.push(event.job);
            scheduler.on_job_termination(event.job, event.timestamp, jobs)
        });
        queue.add_handler(EventKind::PredictionExpiry, |core: &mut Core, event| {
            let Core { scheduler, jobs, .. } = core;
            scheduler.on_prediction_expiry(event.job, event.timestamp, jobs)
        });

        let mut table = JobTable::new();
        let mut seeded = 0;
        for job in jobs {
            queue.add_event(Event::submission(job.submit_time, job.id));
            table.insert(job);
            seeded += 1;
        }
        log::info!(target: "simulator", "seeded {seeded} submission events");

        Self {
            queue,
            core: Core {
                jobs: table,
                machine: Machine::new(num_processors),
                scheduler,
                terminated: Vec::new(),
            },
            seeded,
        }
    }

    /// Runs the event loop until the queue is empty. Draining the queue
    /// with jobs never terminated means the driver or a scheduler lost
    /// track of them, and that is fatal.
    pub fn run(&mut self) {
        let mut dispatched = 0u64;
        while self.queue.advance(&mut self.core).is_some() {
            dispatched += 1;
        }
        assert_eq!(
            self.core.terminated.len(),
            self.seeded,
            "event queue drained at t={} with {} of {} jobs unterminated",
            self.queue.clock(),
            self.seeded - self.core.terminated.len(),
            self.seeded
        );
        log::info!(
            target: "simulator",
            "simulation finished at t={} after {dispatched} events",
            self.queue.clock()
        );
    }

    pub fn jobs(&self) -> &JobTable {
        &self.core.jobs
    }

    pub fn machine(&self) -> &Machine {
        &self.core.machine
    }

    /// Terminated jobs in the order they finished.
    pub fn terminated_jobs(&self) -> impl Iterator<Item = &Job> {
        self.core.terminated.iter().map(|&id| &self.core.jobs[id])
    }

    pub fn stats(&self) -> Option<Stats> {
        Stats::from_jobs(self.terminated_jobs())
    }

    /// Replays the finished schedule against the scheduler's calendar,
    /// archive included; see [`crate::Calendar::feasibility_check`].
    pub fn verify_feasibility(&mut self) -> bool {
        let Core {
            jobs,
            scheduler,
            terminated,
            ..
        } = &mut self.core;
        let jobs = &*jobs;
        scheduler
            .calendar_mut()
            .feasibility_check(terminated.iter().map(|&id| &jobs[id]))
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::FcfsScheduler;
    use crate::{Calendar, Time};

    #[test]
    fn drains_a_random_workload_and_accounts_for_every_job() {
        let jobs = generator::simple_jobs(60, 5);
        let mut simulator = Simulator::new(jobs, 100, Box::new(FcfsScheduler::new(100)));
        simulator.run();

        assert_eq!(simulator.terminated_jobs().count(), 60);
        assert_eq!(simulator.machine().busy_processors(), 0);
        assert!(simulator.verify_feasibility());
        for job in simulator.terminated_jobs() {
            assert!(job.start_time() >= job.submit_time);
            assert_eq!(job.finish_time, Some(job.start_time() + job.actual_run_time));
        }
    }

    #[test]
    fn terminations_are_recorded_in_finish_order() {
        let jobs = generator::simple_jobs(40, 3);
        let mut simulator = Simulator::new(jobs, 100, Box::new(FcfsScheduler::new(100)));
        simulator.run();

        let finishes: Vec<_> = simulator
            .terminated_jobs()
            .map(|job| job.finish_time.unwrap())
            .collect();
        assert!(finishes.windows(2).all(|w| w[0] <= w[1]));
    }

    /// A scheduler that sits on its hands, to exercise the drained-but-
    /// unterminated guard.
    struct DeafScheduler(Calendar);

    impl Scheduler for DeafScheduler {
        fn on_job_submission(&mut self, _: JobId, _: Time, _: &mut JobTable) -> Vec<Event> {
            Vec::new()
        }
        fn on_job_termination(&mut self, _: JobId, _: Time, _: &mut JobTable) -> Vec<Event> {
            Vec::new()
        }
        fn calendar(&self) -> &Calendar {
            &self.0
        }
        fn calendar_mut(&mut self) -> &mut Calendar {
            &mut self.0
        }
    }

    #[test]
    #[should_panic(expected = "unterminated")]
    fn losing_a_job_is_fatal() {
        let jobs = vec![Job::new(1, 0, 10, 10, 4)];
        let mut simulator = Simulator::new(jobs, 100, Box::new(DeafScheduler(Calendar::new(100))));
        simulator.run();
    }
}
