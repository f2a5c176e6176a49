//! External collaborators consumed through narrow interfaces.
//!
//! - [`TransitionRunner`] - show/hide effects
//! - [`Network`] - remote template data
//!
//! Both complete through tickets, so a collaborator never needs a reference
//! to the engine. The headless implementations are cloneable handles: keep
//! one, give the other to the engine builder.

mod network;
mod transition;

pub use network::{Network, QueuedNetwork, Request};
pub use transition::{
    Progress, RecordingTransitions, Transition, TransitionKind, TransitionOptions, TransitionRunner,
};
