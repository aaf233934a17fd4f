use crate::utils::error::Result;
use chrono_tz::Tz;

/// Settings the connector reads on every call.
pub trait ConfigProvider: Send + Sync {
    fn base_uri(&self) -> &str;
    fn secret(&self) -> &str;
    /// Zone for reading and writing local timestamps; an unknown name is an error.
    fn time_zone(&self) -> Result<Tz>;
}
