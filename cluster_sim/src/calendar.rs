use crate::{Job, Time};

const FOREVER: Time = Time::MAX;

/// A maximal time interval `[start, end)` over which the free-processor
/// count is constant. The calendar's last slice always has `end == FOREVER`
/// and full capacity: the unbounded idle tail.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Slice {
    pub start: Time,
    pub end: Time,
    /// Signed so that an optimistic tail reattachment can run a slice
    /// transiently negative; see [`Calendar::reattach_tail`].
    pub free: i64,
}

/// The reservation calendar ("CPU snapshot"): free processors over the
/// future, as an ordered sequence of contiguous slices covering
/// `[now, FOREVER)`.
///
/// A reservation of job `j` at time `t` is nothing but `free` decremented by
/// `j.num_required_processors` on every slice overlapping
/// `[t, t + j.predicted_run_time)`; there is no per-job record in here.
/// Slices that have fully passed are moved to an append-only archive so a
/// post-run feasibility reconstruction can replay the complete history.
#[derive(Clone)]
pub struct Calendar {
    total: u32,
    slices: Vec<Slice>,
    archive: Vec<Slice>,
}

impl Calendar {
    pub fn new(total: u32) -> Self {
        assert!(total > 0, "a machine needs at least one processor");
        Self {
            total,
            slices: vec![Slice {
                start: 0,
                end: FOREVER,
                free: total as i64,
            }],
            archive: Vec::new(),
        }
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    /// Active slices, for inspection. The first covers the current time,
    /// the last is the infinite tail.
    pub fn slices(&self) -> &[Slice] {
        &self.slices
    }

    /// Moves every slice ending at or before `now` into the archive; the
    /// active sequence begins exactly at `now` afterwards.
    pub fn archive_old_slices(&mut self, now: Time) {
        self.split_at(now);
        let cut = self.slices.partition_point(|s| s.end <= now);
        self.archive.extend(self.slices.drain(..cut));
    }

    /// Free processors in the slice containing `t`.
    pub fn free_processors_at(&self, t: Time) -> i64 {
        self.slices[self.index_at(t)].free
    }

    /// The smallest `t >= not_before` at which `job` fits for its whole
    /// reservation extent. Existence is guaranteed by the full-capacity
    /// tail slice.
    pub fn earliest_start(&self, job: &Job, not_before: Time) -> Time {
        let need = job.num_required_processors as i64;
        assert!(
            need <= self.total as i64,
            "job {} wants {} processors, the machine has {}",
            job.id,
            need,
            self.total
        );
        let span = job.predicted_run_time;

        let mut t = not_before.max(self.slices[0].start);
        loop {
            let finish = t.saturating_add(span);
            match self.first_blocking_slice(t, finish, need) {
                None => return t,
                // A slice with too few processors blocks the whole window;
                // no start before its end can work, so jump there.
                Some(end) => t = end,
            }
        }
    }

    pub fn can_start_now(&self, job: &Job, now: Time) -> bool {
        self.earliest_start(job, now) == now
    }

    /// Reserves `[t, t + job.predicted_run_time)` without touching the job
    /// record. Panics if any covered slice lacks capacity: a scheduler that
    /// places a job it never checked is broken, not unlucky.
    pub fn reserve(&mut self, job: &Job, t: Time) {
        let need = job.num_required_processors as i64;
        let finish = t.saturating_add(job.predicted_run_time);
        for slice in self.span_mut(t, finish) {
            assert!(
                slice.free >= need,
                "infeasible reservation: job {} needs {} processors at t={}, slice [{}, {}) has {}",
                job.id,
                need,
                t,
                slice.start,
                slice.end,
                slice.free
            );
            slice.free -= need;
        }
    }

    /// Reserves and stamps the start time on the job.
    pub fn assign(&mut self, job: &mut Job, t: Time) {
        self.reserve(job, t);
        job.start_to_run_at_time = Some(t);
    }

    /// `assign` at the earliest feasible start; returns that start.
    pub fn assign_earliest(&mut self, job: &mut Job, not_before: Time) -> Time {
        let t = self.earliest_start(job, not_before);
        self.assign(job, t);
        t
    }

    /// Restores the unused tail of a reservation when the job terminated
    /// before its reserved extent ran out. No-op for jobs that consumed
    /// their whole reservation.
    pub fn release_tail(&mut self, job: &Job) {
        let start = job.start_time();
        let finish = start + job.actual_run_time;
        let reserved_end = start.saturating_add(job.predicted_run_time);
        if finish >= reserved_end {
            return;
        }
        log::debug!(
            target: "calendar",
            "job {} ended early, releasing [{finish}, {reserved_end})",
            job.id
        );
        self.release(finish, reserved_end, job);
    }

    /// Removes the entire reservation of `job`. Used to roll back
    /// speculative backfill placements and to move reservations around.
    pub fn release_full(&mut self, job: &Job) {
        let start = job.start_time();
        let reserved_end = start.saturating_add(job.predicted_run_time);
        self.release(start, reserved_end, job);
    }

    /// Re-reserves the stretch between a too-short prediction and the user
    /// estimate, and restores the estimate as the job's reservation extent.
    ///
    /// No feasibility assertion here: a backfill admitted under the old
    /// prediction may already sit on this stretch, in which case a slice
    /// goes negative until that job's own tail release balances the books.
    /// Committed placements still never oversubscribe the machine itself.
    pub fn reattach_tail(&mut self, job: &mut Job) {
        assert!(job.predicted_run_time <= job.estimated_run_time);
        let start = job.start_time();
        let from = start.saturating_add(job.predicted_run_time);
        let until = start.saturating_add(job.estimated_run_time);
        let need = job.num_required_processors as i64;
        for slice in self.span_mut(from, until) {
            slice.free -= need;
        }
        job.predicted_run_time = job.estimated_run_time;
    }

    /// Splices the archived past back in front of the active slices.
    pub fn restore_archive(&mut self) {
        if self.archive.is_empty() {
            return;
        }
        let mut all = std::mem::take(&mut self.archive);
        all.append(&mut self.slices);
        self.slices = all;
    }

    /// Post-run verification: with the archive merged back in, every
    /// historical slice must have held a sane free count, and removing every
    /// job's actual footprint `[start, start + actual_run_time)` must leave
    /// the whole timeline at exactly full capacity.
    pub fn feasibility_check<'a>(&mut self, jobs: impl IntoIterator<Item = &'a Job>) -> bool {
        self.restore_archive();
        let total = self.total as i64;

        if !self.slices.iter().all(|s| 0 <= s.free && s.free <= total) {
            return false;
        }

        for job in jobs {
            let Some(start) = job.start_to_run_at_time else {
                return false;
            };
            let need = job.num_required_processors as i64;
            let finish = start + job.actual_run_time;
            for slice in self.span_mut(start, finish) {
                slice.free += need;
            }
        }
        self.merge_adjacent();
        self.slices.iter().all(|s| s.free == total)
    }

    /// Index of the slice containing `t`. `t` must not lie in the archive.
    fn index_at(&self, t: Time) -> usize {
        debug_assert!(t >= self.slices[0].start, "t={t} is archived history");
        self.slices.partition_point(|s| s.end <= t)
    }

    /// End of the first slice overlapping `[from, until)` whose free count
    /// is below `need`, if any.
    fn first_blocking_slice(&self, from: Time, until: Time, need: i64) -> Option<Time> {
        let mut i = self.index_at(from);
        while i < self.slices.len() && self.slices[i].start < until {
            if self.slices[i].free < need {
                return Some(self.slices[i].end);
            }
            i += 1;
        }
        None
    }

    /// Inserts a slice boundary at `t` unless one is already there.
    fn split_at(&mut self, t: Time) {
        if t == FOREVER {
            return;
        }
        let i = self.index_at(t);
        let slice = self.slices[i];
        if slice.start == t {
            return;
        }
        self.slices[i].end = t;
        self.slices.insert(i + 1, Slice { start: t, ..slice });
    }

    /// The slices exactly covering `[from, until)`, splitting at both ends
    /// as needed. Empty for an empty interval.
    fn span_mut(&mut self, from: Time, until: Time) -> &mut [Slice] {
        if from >= until {
            return &mut [];
        }
        self.split_at(from);
        self.split_at(until);
        let lo = self.index_at(from);
        let hi = self.slices.partition_point(|s| s.start < until);
        &mut self.slices[lo..hi]
    }

    fn release(&mut self, from: Time, until: Time, job: &Job) {
        let need = job.num_required_processors as i64;
        let total = self.total as i64;
        for slice in self.span_mut(from, until) {
            slice.free += need;
            assert!(
                slice.free <= total,
                "double release: job {} freed slice [{}, {}) past {} processors",
                job.id,
                slice.start,
                slice.end,
                total
            );
        }
        self.merge_adjacent();
    }

    /// Collapses adjacent slices with equal free counts; keeps the slice
    /// count proportional to the number of distinct future boundaries.
    fn merge_adjacent(&mut self) {
        self.slices.dedup_by(|next, prev| {
            if prev.free == next.free {
                prev.end = next.end;
                true
            } else {
                false
            }
        });
    }
}
