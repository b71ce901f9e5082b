pub mod enrich_flow;
pub mod retry;

pub use enrich_flow::{EnrichFlow, Outcome, WorkOutcome};
pub use retry::RetryPolicy;
