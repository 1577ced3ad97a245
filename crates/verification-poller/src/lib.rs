//! Tracks a company profile's verification state until the backend accepts it.

mod poller;
mod source;

pub use poller::{PollerConfig, PollerHandle, RefetchOutcome, VerificationPoller};
pub use source::{HttpVerificationSource, PollError, VerificationSource};
