//! # UserAPI Core
//!
//! Error taxonomy, result alias and the user record entity shared by the
//! configuration, data access and server crates.

pub mod error;
pub mod record;
pub mod result;
pub mod telemetry;

pub use error::*;
pub use record::*;
pub use result::*;
