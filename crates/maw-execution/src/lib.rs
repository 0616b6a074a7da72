//! The adaptive scheduling and bookkeeping core of maw.
//!
//! A master engine keeps a queue of submitted jobs and dispatches them to the
//! workers that are predicted to finish them fastest. The prediction is learned
//! online from the observed completion times of every worker.

pub mod engine;
pub mod error;
pub mod estimator;
pub mod id;
pub mod job;
pub mod message;
pub mod scheduler;
pub mod transport;
pub mod worker_admin;

pub use engine::{Engine, EngineHandle, EngineOptions, EngineReport, JobTicket};
pub use job::{Job, JobError, JobInstance, JobOutcome};
pub use scheduler::Scheduler;
pub use worker_admin::WorkerAdministration;

#[cfg(test)]
mod testing;
