//! Incremental export of helpdesk ticket activity.
//!
//! Pulls tickets from a paginated, time-ordered feed, enriches each with
//! requester identity and public comment text, stages the rows durably,
//! and, once the target calendar month is drained, materializes a
//! report, shares it, and notifies recipients. Progress is checkpointed
//! per page so any invocation can be killed and re-run without losing or
//! duplicating work.

pub mod cli;
pub mod controller;
pub mod enrich;
pub mod error;
pub mod finalize;
pub mod model;
pub mod notify;
pub mod report;
pub mod runner;
pub mod store;
pub mod upstream;
pub mod util;
pub mod window;
