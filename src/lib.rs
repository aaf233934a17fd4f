//! Client for the recurring scheduling service (RSS).
//!
//! [`Rule`] models a recurrence definition; [`Connector`] talks to the
//! service for one tenant and scope.

pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use config::RssConfig;
pub use crate::core::connector::Connector;
pub use domain::{AttrValue, Attributes, ConfigProvider, Occurrence, Rule};
pub use utils::error::{Result, RssError};
pub use utils::time::TimeInput;
