pub mod job_ctx;
pub mod job_flow;
pub mod retry_policy;

pub use job_ctx::JobCtx;
pub use job_flow::{FlowOutcome, JobFlow, JobState};
pub use retry_policy::{RetryDecision, RetryPolicy};
