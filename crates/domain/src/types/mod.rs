//! Domain data types

pub mod entities;
pub mod reports;

pub use entities::*;
pub use reports::*;
