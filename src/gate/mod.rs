//! The progress-gated access control service.
//!
//! | Module | Role |
//! |--------|------|
//! | `db` | SQLite progress store and catalog tables |
//! | `catalog_file` | TOML catalog seed format |
//! | `models` | Store records and write requests |
//! | `identity` | Identity and permission collaborators |
//! | `writer` | Progress Writer |
//! | `service` | Access Gate and Redirect Advisor |
//! | `api` / `server` | HTTP surface |

pub mod api;
pub mod catalog_file;
pub mod db;
pub mod identity;
pub mod models;
pub mod server;
pub mod service;
pub mod writer;

pub use catalog_file::CatalogFile;
pub use db::{DbHandle, GateDb};
pub use models::{EnrollmentProfile, ProgressRecord, SeedSummary};
pub use service::{AccessGate, RedirectAdvisor, Services};
pub use writer::{ProgressWriter, RecordProgress};
