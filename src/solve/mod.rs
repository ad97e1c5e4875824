//! Parallel solve orchestration for a single image.
//!
//! A solve session splits the search space into partitions and races one
//! solve task per partition until one of them produces an accepted match.
//!
//! # Architecture
//!
//! The solve system consists of:
//! - A **partitioner** that splits the scale or depth range into slices
//! - **Solve tasks** that extract once and run the external solver on one slice
//! - An **orchestrator** that owns the tasks and commits the winner exactly once
//! - A **cancellation channel** shared by every task, mirrored to marker files
//! - A **result arbiter** that applies the log-odds thresholds
//!
//! # Example
//!
//! ```ignore
//! use skysolve::solve::{Orchestrator, OrchestratorConfig};
//!
//! let orchestrator = Orchestrator::new(extractor, solver)
//!     .with_config(OrchestratorConfig::default().with_workers(4));
//! let abort = orchestrator.abort_handle();
//!
//! let solution = orchestrator.solve(image, &params, scale_hint, None)?;
//! ```

pub mod arbiter;
pub mod cancel;
pub mod channel;
pub mod config;
pub mod events;
pub mod orchestrator;
pub mod partition;
pub mod result;
pub mod task;

pub use arbiter::{ResultArbiter, Verdict};
pub use cancel::{CancelReason, CancelSource, CancelToken, MarkerFiles};
pub use config::{OrchestratorConfig, PartitionConfig};
pub use events::{EventSink, NullSink, SolveEvent};
pub use orchestrator::{Orchestrator, SessionHandle};
pub use partition::{DepthRange, Partition, Partitioner, Plan, ScaleRange, Strategy};
pub use result::{
    PartitionError, PartitionFailure, PartitionRecord, SessionState, SolveFailure, SolveReport,
    Winner,
};
pub use task::{NotSolvedReason, SolveTask, TaskOutcome, TaskState};
