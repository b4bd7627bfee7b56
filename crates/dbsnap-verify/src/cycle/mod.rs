//! The verification cycle
//!
//! [`decide`] holds one pure decision function per state; [`machine`]
//! gathers the facts they need, performs the requested effects and
//! persists the transitions.

pub mod decide;
pub mod machine;

pub use decide::{Decision, Effect, Members, Observed};
pub use machine::{MAX_STEPS, Machine, Outcome};
