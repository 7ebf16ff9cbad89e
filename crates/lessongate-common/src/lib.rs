//! Storage-free core of the lessongate progress gate.
//!
//! Everything in this crate is a pure function of a [`Catalog`] and a
//! [`ProgressSnapshot`]. The root crate owns the store, the HTTP surface and
//! the collaborators; it hands snapshots in and gets decisions out.
//!
//! | Module     | Responsibility                                         |
//! |------------|--------------------------------------------------------|
//! | `catalog`  | Ordered modules/sections, slug resolution              |
//! | `status`   | `ProgressStatus` enum shared with the store            |
//! | `frontier` | Frontier Resolver over a progress snapshot             |
//! | `access`   | Allow/deny decision against a frontier                 |
//! | `redirect` | Next-destination advice for login and denial routing   |
//! | `error`    | `EngineError` taxonomy                                 |

pub mod access;
pub mod catalog;
pub mod error;
pub mod frontier;
pub mod redirect;
pub mod status;

pub use access::{AccessDecision, AccessRequest, Target, decide_access, evaluate};
pub use catalog::{Catalog, Location, Module, ResolvedContent, Section};
pub use error::EngineError;
pub use frontier::{Frontier, ProgressSnapshot, resolve_frontier};
pub use redirect::next_destination;
pub use status::ProgressStatus;
