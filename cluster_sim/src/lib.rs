pub use self::calendar::Calendar;
pub use self::event::{Event, EventKind, EventQueue};
pub use self::job::{Job, JobTable};
pub use self::machine::Machine;
pub use self::scheduler::Scheduler;
pub use self::simulator::Simulator;
pub use self::stats::Stats;

pub mod calendar;
pub mod event;
pub mod job;
pub mod machine;
pub mod scheduler;
pub mod simulator;
pub mod stats;

/// Identifier a job carries through the whole simulation; waiting lists and
/// the reservation calendar refer to jobs by id, the [`JobTable`] owns the
/// records themselves.
pub type JobId = u32;

/// Simulation time. The clock is a bare tick counter with no calendar
/// semantics; it only ever moves forward.
pub type Time = u64;
