pub mod commands;
pub mod config;
pub mod error;
pub mod hextools;
pub mod net;
pub mod registry;
pub mod segment;
pub mod types;

pub use error::{Error, Result};
pub use registry::SessionRegistry;
pub use segment::{FieldUpdate, Segment, SegmentParams};
