//! Session bookkeeping
//!
//! - [`registry`] - ordered session collection (tab order, lookup by id)
//! - [`selector`] - single active session and circular navigation

pub mod registry;
pub mod selector;

pub use registry::{Direction, SessionRegistry};
pub use selector::{ActiveChange, ActiveSelector};
