//! lessongate: progress-gated access control for sequential lesson content.
//!
//! The decision engine (catalog, frontier, access rules, redirect advice)
//! lives in the `lessongate-common` crate; this crate adds the progress store,
//! the service components and the HTTP and CLI surfaces.

pub mod config;
pub mod errors;
pub mod gate;
pub mod logging;

pub use errors::GateError;
