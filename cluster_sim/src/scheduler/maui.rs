use super::{shadow_backfill, start_from_head, Scheduler};
use crate::{Calendar, Event, Job, JobId, JobTable, Time};
use std::str::FromStr;

/// One weight vector for the Maui priority function. Two of these are
/// configured independently: one orders the waiting list for head
/// selection, the other orders the tail for backfill attempts.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Weights {
    /// Wait time since submission.
    pub wtime: f64,
    /// Estimated slowdown at the current wait.
    pub sld: f64,
    /// Quality of service the user asked for.
    pub user: f64,
    /// Times this job was bypassed by a later submission.
    pub bypass: f64,
    /// Quality of service the administrator granted.
    pub admin: f64,
    /// Processor count.
    pub size: f64,
}

impl Weights {
    pub fn new(wtime: f64, sld: f64, user: f64, bypass: f64, admin: f64, size: f64) -> Self {
        Self { wtime, sld, user, bypass, admin, size }
    }

    /// Aggregated priority of `job` at `now`; higher runs first.
    pub fn priority(&self, job: &Job, now: Time) -> f64 {
        let wait = (now - job.submit_time) as f64;
        let estimated = job.estimated_run_time as f64;
        let sld = (wait + estimated) / estimated;

        self.wtime * wait
            + self.sld * sld
            + self.user * job.user_qos as f64
            + self.bypass * job.maui_bypass_counter as f64
            + self.admin * job.admin_qos as f64
            + self.size * job.num_required_processors as f64
    }
}

/// The defaults order strictly by wait time, which is submission order.
impl Default for Weights {
    fn default() -> Self {
        Self::new(1.0, 0.0, 0.0, 0.0, 0.0, 0.0)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("expected six comma-separated weights: wtime,sld,user,bypass,admin,size")]
pub struct ParseWeightsError;

impl FromStr for Weights {
    type Err = ParseWeightsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut coords = [0f64; 6];
        let mut count = 0;
        for part in s.split(',') {
            if count >= coords.len() {
                return Err(ParseWeightsError);
            }
            coords[count] = part.trim().parse().map_err(|_| ParseWeightsError)?;
            count += 1;
        }
        if count != coords.len() {
            return Err(ParseWeightsError);
        }
        let [wtime, sld, user, bypass, admin, size] = coords;
        Ok(Self::new(wtime, sld, user, bypass, admin, size))
    }
}

/// Weighted-priority backfill in the style of the Maui scheduler: the
/// waiting list is re-sorted on every decision by a configurable priority,
/// so the "head" need not be the oldest job; the backfill pass uses a
/// second, independent priority. Every backfill that overtakes an
/// earlier-submitted job bumps that job's bypass counter, which a suitable
/// weight vector can turn into a starvation brake.
///
/// With both vectors left at their defaults this behaves exactly like EASY.
pub struct MauiScheduler {
    calendar: Calendar,
    waiting: Vec<JobId>,
    weights_list: Weights,
    weights_backfill: Weights,
    /// Submission ordinal handed to `Job::maui_counter`.
    submitted: u64,
}

impl MauiScheduler {
    pub fn new(num_processors: u32) -> Self {
        Self::with_weights(num_processors, Weights::default(), Weights::default())
    }

    pub fn with_weights(num_processors: u32, weights_list: Weights, weights_backfill: Weights) -> Self {
        Self {
            calendar: Calendar::new(num_processors),
            waiting: Vec::new(),
            weights_list,
            weights_backfill,
            submitted: 0,
        }
    }

    fn schedule(&mut self, now: Time, jobs: &mut JobTable) -> Vec<Event> {
        if self.waiting.is_empty() {
            return Vec::new();
        }

        let list = self.weights_list;
        self.waiting
            .sort_by(|&a, &b| list.priority(&jobs[b], now).total_cmp(&list.priority(&jobs[a], now)));
        let mut started = start_from_head(&mut self.calendar, &mut self.waiting, now, jobs);

        if self.waiting.len() > 1 {
            let backfill = self.weights_backfill;
            self.waiting[1..].sort_by(|&a, &b| {
                backfill
                    .priority(&jobs[b], now)
                    .total_cmp(&backfill.priority(&jobs[a], now))
            });
            let committed = shadow_backfill(&mut self.calendar, &mut self.waiting, now, jobs);
            for &overtaker in &committed {
                self.count_bypasses(overtaker, jobs);
            }
            started.extend(committed);
        }

        started.into_iter().map(|id| Event::start(now, id)).collect()
    }

    /// Every waiting job submitted before `overtaker` was just skipped over.
    fn count_bypasses(&self, overtaker: JobId, jobs: &mut JobTable) {
        let overtaker_counter = jobs[overtaker].maui_counter;
        for &id in &self.waiting {
            let job = &mut jobs[id];
            if job.maui_counter < overtaker_counter {
                job.maui_bypass_counter += 1;
            }
        }
    }
}

impl Scheduler for MauiScheduler {
    fn on_job_submission(&mut self, job: JobId, now: Time, jobs: &mut JobTable) -> Vec<Event> {
        jobs[job].maui_counter = self.submitted;
        self.submitted += 1;
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_parse_from_comma_separated_coordinates() {
        let weights: Weights = "1,0,0.5,0,2,-1".parse().unwrap();
        assert_eq!(weights, Weights::new(1.0, 0.0, 0.5, 0.0, 2.0, -1.0));
    }

    #[test]
    fn short_and_long_vectors_are_rejected() {
        assert!("1,2,3".parse::<Weights>().is_err());
        assert!("1,2,3,4,5,6,7".parse::<Weights>().is_err());
        assert!("1,2,3,x,5,6".parse::<Weights>().is_err());
    }

    #[test]
    fn priority_weights_each_coordinate() {
        let mut job = Job::new(1, 10, 100, 100, 8).with_qos(3, 5);
        job.maui_bypass_counter = 2;

        // wait = 40, sld = (40 + 100) / 100
        assert_eq!(Weights::default().priority(&job, 50), 40.0);
        assert_eq!(Weights::new(0.0, 1.0, 0.0, 0.0, 0.0, 0.0).priority(&job, 50), 1.4);
        assert_eq!(Weights::new(0.0, 0.0, 1.0, 0.0, 0.0, 0.0).priority(&job, 50), 3.0);
        assert_eq!(Weights::new(0.0, 0.0, 0.0, 1.0, 0.0, 0.0).priority(&job, 50), 2.0);
        assert_eq!(Weights::new(0.0, 0.0, 0.0, 0.0, 1.0, 0.0).priority(&job, 50), 5.0);
        assert_eq!(Weights::new(0.0, 0.0, 0.0, 0.0, 0.0, -1.0).priority(&job, 50), -8.0);
    }
}
