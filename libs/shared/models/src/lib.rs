pub mod auth;
pub mod dates;
pub mod error;
pub mod record;

pub use record::{Parsed, Record, RecordError, RecordMap, SymbolicEnum};
