//! Core types, validation, and billing math for the Confera real-time core.

pub mod billing;
pub mod call;
pub mod error;
pub mod limits;
pub mod trial;

pub use call::*;
pub use error::{Error, Result};
pub use trial::*;
