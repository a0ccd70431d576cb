pub mod coordinator;
pub mod jobs;
pub mod lifecycle;
pub mod webhooks;

#[cfg(test)]
pub(crate) mod testing;

pub use coordinator::{Coordinator, CycleState, Status};
pub use lifecycle::{Integration, ReauthError, SetupError};
