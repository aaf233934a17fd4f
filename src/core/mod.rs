pub mod connector;
pub mod params;
pub mod prepare;
pub mod request;

pub use crate::utils::error::Result;
pub use connector::Connector;
pub use request::{NotFound, Outcome, Verb};
