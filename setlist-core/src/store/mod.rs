//! The boundary form and page callers talk to.
//!
//! Mutations take raw JSON input, validate it, run one transaction and hand
//! back an [`ActionResult`](crate::outcome::ActionResult). Reads return plain
//! [`StoreResult`](crate::error::StoreResult)s.

mod exercises;
mod sets;
mod store;
mod workouts;

pub use store::Store;
