//! Cooperative cancellation of running instances.

mod token;

pub use token::CancellationToken;
