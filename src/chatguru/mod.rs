pub mod client;
pub mod error;
pub mod poll;
pub mod types;

pub use client::{ChatGuruClient, RegistrationApi};
pub use poll::{PollOutcome, PollPolicy, poll_status};
pub use types::ContactRequest;
