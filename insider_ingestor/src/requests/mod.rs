pub mod batch_request;
pub mod scheduler;
pub mod single_request;

pub use batch_request::{BatchFetcher, BatchOutcome};
pub use scheduler::{
    BatchJob, CancelSignal, RunReport, ScheduleConfig, SchedulerState, Sleeper, TokioSleeper,
    WindowedScheduler,
};
pub use single_request::fetch_cached;
