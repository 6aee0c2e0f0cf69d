pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod outcome;
pub mod store;
pub mod validation;

pub use config::StoreConfig;
pub use error::{ErrorKind, FieldError, StoreError, StoreResult};
pub use outcome::ActionResult;
pub use store::Store;
