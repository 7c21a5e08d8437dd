use super::*;
use crate::simulator::generator::simple_jobs;
use crate::{Job, Simulator};

const TOTAL: u32 = 100;

fn job(id: u32, submit: Time, estimated: Time, actual: Time, procs: u32) -> Job {
    Job::new(id, submit, estimated, actual, procs)
}

/// Runs the workload to exhaustion and replays the finished schedule
/// against the calendar before handing the simulator back.
fn run(jobs: Vec<Job>, scheduler: Box<dyn Scheduler>) -> Simulator {
    let mut simulator = Simulator::new(jobs, TOTAL, scheduler);
    simulator.run();
    assert!(
        simulator.verify_feasibility(),
        "schedule does not reconstruct to an idle machine"
    );
    simulator
}

fn start_of(simulator: &Simulator, id: u32) -> Time {
    simulator.jobs()[id].start_time()
}

fn finish_of(simulator: &Simulator, id: u32) -> Time {
    simulator.jobs()[id].finish_time.expect("job never finished")
}

fn every_scheduler() -> Vec<Box<dyn Scheduler>> {
    vec![
        Box::new(FcfsScheduler::new(TOTAL)),
        Box::new(ConservativeScheduler::new(TOTAL)),
        Box::new(EasyScheduler::new(TOTAL)),
        Box::new(EasyPlusPlusScheduler::new(TOTAL)),
        Box::new(MauiScheduler::new(TOTAL)),
        Box::new(GreedyEasyScheduler::new(TOTAL)),
    ]
}

#[test]
fn a_single_job_starts_the_moment_it_arrives() {
    for scheduler in every_scheduler() {
        let simulator = run(vec![job(10, 0, 10, 10, 50)], scheduler);
        assert_eq!(start_of(&simulator, 10), 0);
        assert_eq!(finish_of(&simulator, 10), 10);
    }
}

#[test]
fn fcfs_queues_jobs_that_do_not_fit_together() {
    let jobs = vec![job(1, 0, 10, 10, 60), job(2, 0, 5, 5, 60)];
    let simulator = run(jobs, Box::new(FcfsScheduler::new(TOTAL)));
    assert_eq!(start_of(&simulator, 1), 0);
    assert_eq!(start_of(&simulator, 2), 10);
    assert_eq!(finish_of(&simulator, 2), 15);
}

#[test]
fn easy_cannot_backfill_a_job_as_wide_as_the_blocked_head() {
    // the second job needs the same 60 processors the first one holds, so
    // EASY behaves exactly like FCFS here
    let jobs = vec![job(1, 0, 10, 10, 60), job(2, 0, 5, 5, 60)];
    let simulator = run(jobs, Box::new(EasyScheduler::new(TOTAL)));
    assert_eq!(start_of(&simulator, 1), 0);
    assert_eq!(start_of(&simulator, 2), 10);
}

#[test]
fn fcfs_starts_the_narrow_job_only_in_queue_order() {
    // job 3 would fit beside job 1 right away, but FCFS never looks past
    // the blocked job 2; it runs once the queue ahead of it has drained
    let jobs = vec![
        job(1, 0, 20, 20, 80),
        job(2, 0, 20, 20, 80),
        job(3, 0, 5, 5, 10),
    ];
    let simulator = run(jobs, Box::new(FcfsScheduler::new(TOTAL)));
    assert_eq!(start_of(&simulator, 1), 0);
    assert_eq!(start_of(&simulator, 2), 20);
    assert_eq!(start_of(&simulator, 3), 20);
}

#[test]
fn easy_backfills_a_narrow_job_that_finishes_under_the_shadow() {
    // job 3 ends at 5, well before job 2's shadow start of 20
    let jobs = vec![
        job(1, 0, 20, 20, 80),
        job(2, 0, 20, 20, 80),
        job(3, 0, 5, 5, 10),
    ];
    let simulator = run(jobs, Box::new(EasyScheduler::new(TOTAL)));
    assert_eq!(start_of(&simulator, 1), 0);
    assert_eq!(start_of(&simulator, 2), 20);
    assert_eq!(start_of(&simulator, 3), 0);
}

#[test]
fn easy_rolls_back_a_backfill_that_would_delay_the_head() {
    // job 3 fits right now, but holding 30 processors until t=35 would
    // push job 2's start from 10 out to 35
    let jobs = vec![
        job(1, 0, 10, 10, 60),
        job(2, 5, 10, 10, 80),
        job(3, 5, 30, 30, 30),
    ];
    let simulator = run(jobs, Box::new(EasyScheduler::new(TOTAL)));
    assert_eq!(start_of(&simulator, 2), 10);
    assert_eq!(start_of(&simulator, 3), 20);
}

#[test]
fn conservative_compacts_reservations_after_an_early_termination() {
    // job 1 is estimated at 20 but ends at 5; job 2's reservation at 20
    // must slide down to 5 the moment the tail is released
    let jobs = vec![job(1, 0, 20, 5, 80), job(2, 1, 10, 10, 80)];
    let simulator = run(jobs, Box::new(ConservativeScheduler::new(TOTAL)));
    assert_eq!(start_of(&simulator, 1), 0);
    assert_eq!(finish_of(&simulator, 1), 5);
    assert_eq!(start_of(&simulator, 2), 5);
    assert_eq!(finish_of(&simulator, 2), 15);
}

#[test]
fn conservative_matches_fcfs_when_nothing_ends_early() {
    let jobs = vec![job(1, 0, 10, 10, 60), job(2, 0, 5, 5, 60)];
    let simulator = run(jobs, Box::new(ConservativeScheduler::new(TOTAL)));
    assert_eq!(start_of(&simulator, 1), 0);
    assert_eq!(start_of(&simulator, 2), 10);
}

/// A full-machine job that keeps both candidates waiting until t=5, so the
/// list weights get to pick the head.
fn size_contest(first: Job, second: Job) -> Vec<Job> {
    vec![job(1, 0, 5, 5, 100), first, second]
}

#[test]
fn maui_size_weight_prefers_the_small_job_in_either_submit_order() {
    let list = Weights::new(0.0, 0.0, 0.0, 0.0, 0.0, -1.0);

    // big job submitted first
    let jobs = size_contest(job(2, 1, 10, 10, 95), job(3, 2, 10, 10, 10));
    let simulator = run(
        jobs,
        Box::new(MauiScheduler::with_weights(TOTAL, list, Weights::default())),
    );
    assert_eq!(start_of(&simulator, 3), 5);
    assert_eq!(start_of(&simulator, 2), 15);

    // small job submitted first
    let jobs = size_contest(job(2, 1, 10, 10, 10), job(3, 2, 10, 10, 95));
    let simulator = run(
        jobs,
        Box::new(MauiScheduler::with_weights(TOTAL, list, Weights::default())),
    );
    assert_eq!(start_of(&simulator, 2), 5);
    assert_eq!(start_of(&simulator, 3), 15);
}

#[test]
fn maui_default_weights_take_the_bigger_but_older_job_first() {
    let jobs = size_contest(job(2, 1, 10, 10, 95), job(3, 2, 10, 10, 10));
    let simulator = run(jobs, Box::new(MauiScheduler::new(TOTAL)));
    assert_eq!(start_of(&simulator, 2), 5);
    assert_eq!(start_of(&simulator, 3), 15);
}

#[test]
fn maui_admin_weight_overrules_submission_order() {
    let list = Weights::new(0.0, 0.0, 0.0, 0.0, 1.0, 0.0);
    let jobs = vec![
        job(1, 0, 10, 10, 100),
        job(2, 1, 10, 10, 60).with_qos(0, 5),
        job(3, 2, 10, 10, 60).with_qos(0, 9),
    ];
    let simulator = run(
        jobs,
        Box::new(MauiScheduler::with_weights(TOTAL, list, Weights::default())),
    );
    assert_eq!(start_of(&simulator, 3), 10);
    assert_eq!(start_of(&simulator, 2), 20);
}

#[test]
fn maui_counts_a_bypass_for_every_overtaken_job() {
    // job 3 backfills past the blocked job 2
    let jobs = vec![
        job(1, 0, 30, 30, 60),
        job(2, 1, 50, 50, 95),
        job(3, 2, 20, 20, 30),
    ];
    let simulator = run(jobs, Box::new(MauiScheduler::new(TOTAL)));
    assert_eq!(start_of(&simulator, 3), 2);
    assert_eq!(start_of(&simulator, 2), 30);
    assert_eq!(simulator.jobs()[2].maui_bypass_counter, 1);
    assert_eq!(simulator.jobs()[3].maui_bypass_counter, 0);
}

#[test]
fn maui_with_default_weights_behaves_exactly_like_easy() {
    let jobs = simple_jobs(80, 6);
    let easy = run(jobs.clone(), Box::new(EasyScheduler::new(TOTAL)));
    let maui = run(jobs.clone(), Box::new(MauiScheduler::new(TOTAL)));

    for job in &jobs {
        assert_eq!(
            start_of(&easy, job.id),
            start_of(&maui, job.id),
            "job {} diverged",
            job.id
        );
    }
}

#[test]
fn easy_plus_plus_predicts_the_average_of_the_last_two_runs() {
    // user 7 completes a 10 and a 20; the next job is predicted at 15 and
    // ends inside it, so the prediction is still visible after the run
    let jobs = vec![
        job(1, 0, 100, 10, 10).with_user(7),
        job(2, 0, 100, 20, 10).with_user(7),
        job(3, 30, 100, 12, 10).with_user(7),
    ];
    let simulator = run(jobs, Box::new(EasyPlusPlusScheduler::new(TOTAL)));
    assert_eq!(start_of(&simulator, 3), 30);
    assert_eq!(finish_of(&simulator, 3), 42);
    assert_eq!(simulator.jobs()[3].predicted_run_time, 15);
}

#[test]
fn easy_plus_plus_reattaches_the_estimate_when_the_prediction_expires() {
    // same history, but the third job runs to 40: the expiry at t=45
    // stretches its reservation back out to the estimate
    let jobs = vec![
        job(1, 0, 100, 10, 10).with_user(7),
        job(2, 0, 100, 20, 10).with_user(7),
        job(3, 30, 100, 40, 10).with_user(7),
    ];
    let simulator = run(jobs, Box::new(EasyPlusPlusScheduler::new(TOTAL)));
    assert_eq!(start_of(&simulator, 3), 30);
    assert_eq!(finish_of(&simulator, 3), 70);
    assert_eq!(simulator.jobs()[3].predicted_run_time, 100);
}

#[test]
fn easy_plus_plus_backfills_on_the_predicted_length_where_easy_cannot() {
    // user 9's history predicts 10 for the last job, so it fits the hole
    // in front of the blocked 70-wide head; under EASY its 40-long
    // estimate would push the head's shadow and be rolled back
    let jobs = vec![
        job(1, 0, 50, 8, 5).with_user(9),
        job(2, 0, 50, 12, 5).with_user(9),
        job(3, 20, 34, 34, 60).with_user(3),
        job(4, 25, 100, 46, 70).with_user(4),
        job(5, 26, 40, 9, 40).with_user(9),
    ];

    let plus = run(jobs.clone(), Box::new(EasyPlusPlusScheduler::new(TOTAL)));
    assert_eq!(start_of(&plus, 4), 54);
    assert_eq!(start_of(&plus, 5), 26);

    let easy = run(jobs, Box::new(EasyScheduler::new(TOTAL)));
    assert_eq!(start_of(&easy, 4), 54);
    assert_eq!(start_of(&easy, 5), 100);
}

#[test]
fn greedy_easy_backfills_the_whole_tail_into_the_hole() {
    // the hole in front of job 2's shadow start fits the short-wide job
    // immediately and both narrow jobs once it is gone
    let jobs = vec![
        job(1, 0, 20, 20, 80),
        job(2, 1, 20, 20, 80),
        job(3, 2, 4, 4, 20),
        job(4, 3, 19, 19, 10),
        job(5, 4, 19, 19, 10),
    ];
    let simulator = run(jobs, Box::new(GreedyEasyScheduler::new(TOTAL)));
    assert_eq!(start_of(&simulator, 2), 20);
    assert_eq!(start_of(&simulator, 3), 2);
    assert_eq!(start_of(&simulator, 4), 6);
    assert_eq!(start_of(&simulator, 5), 6);
}

#[test]
fn greedy_easy_prefers_the_tail_ordering_with_more_resource_consumption() {
    // jobs 4 and 5 compete for one 50-wide hole open until t=22. EASY in
    // submission order would take job 4 (500 processor-ticks); the greedy
    // pass scores job 5's ordering higher (850) and runs it first.
    let jobs = vec![
        job(1, 0, 5, 5, 60),
        job(2, 0, 22, 22, 20),
        job(3, 1, 20, 20, 90),
        job(4, 2, 10, 10, 50),
        job(5, 3, 17, 17, 50),
    ];

    let greedy = run(jobs.clone(), Box::new(GreedyEasyScheduler::new(TOTAL)));
    assert_eq!(start_of(&greedy, 5), 5);
    assert_eq!(start_of(&greedy, 3), 22);
    assert_eq!(start_of(&greedy, 4), 42);

    let easy = run(jobs, Box::new(EasyScheduler::new(TOTAL)));
    assert_eq!(start_of(&easy, 4), 5);
    assert_eq!(start_of(&easy, 5), 42);
}

#[test]
fn greedy_easy_accepts_custom_orderings_and_scores() {
    fn placed_count(placed: &[&Job]) -> f64 {
        placed.len() as f64
    }
    let scheduler =
        GreedyEasyScheduler::with_policies(TOTAL, vec![by_estimate, by_size], placed_count);
    let simulator = run(simple_jobs(40, 4), Box::new(scheduler));
    assert_eq!(simulator.terminated_jobs().count(), 40);
}

#[test]
fn every_scheduler_reconstructs_to_an_idle_machine_on_random_workloads() {
    for scheduler in every_scheduler() {
        let jobs = simple_jobs(60, 5);
        let simulator = run(jobs, scheduler);
        for job in simulator.terminated_jobs() {
            assert!(job.start_time() >= job.submit_time);
            assert_eq!(
                job.finish_time,
                Some(job.start_time() + job.actual_run_time)
            );
        }
    }
}
