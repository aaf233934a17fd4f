// Domain layer: entities and ports. No I/O.

pub mod occurrence;
pub mod ports;
pub mod rule;
pub mod value;

pub use occurrence::Occurrence;
pub use ports::ConfigProvider;
pub use rule::{Recurrence, RecurrenceField, Rule, RuleField};
pub use value::{AttrValue, Attributes};
