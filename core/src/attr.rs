//! # Attribute Surface
//!
//! A file-like view of the controller, laid out the way a sysfs kobject
//! would expose it:
//!
//! ```text
//!   thermal_throttled        r   current tier, 0..=3
//!   version                  r   "thermcap <major>.<minor>.<patch>"
//!   conf/shutdown_temp       rw
//!   conf/allowed_max_high    rw
//!   ...                          one entry per configuration field
//!   conf/mid_max_poll_ms     rw
//! ```
//!
//! Values are rendered with a trailing newline into a fixed-capacity
//! [`AttrBuf`]. Stores take a decimal integer; surrounding whitespace is
//! ignored, anything else is rejected and leaves the value unchanged.

use core::fmt::{self, Write};

use heapless::String;

use crate::config::ConfigField;
use crate::error::AttrError;

/// Group holding the configuration fields
pub const CONF_GROUP: &str = "conf";

/// Capacity of a rendered attribute
pub const ATTR_BUF_LEN: usize = 32;

/// Rendered attribute value
pub type AttrBuf = String<ATTR_BUF_LEN>;

/// Addressable attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    /// `conf/<field>`
    Conf(ConfigField),
    /// `thermal_throttled`
    ThermalThrottled,
    /// `version`
    Version,
}

impl Attribute {
    /// Resolve a path such as `conf/poll_ms`
    pub fn from_path(path: &str) -> Result<Attribute, AttrError> {
        let path = path.trim_matches('/');
        match path.split_once('/') {
            Some((CONF_GROUP, name)) => ConfigField::from_name(name)
                .map(Attribute::Conf)
                .ok_or(AttrError::UnknownAttribute),
            Some(_) => Err(AttrError::UnknownAttribute),
            None => match path {
                "thermal_throttled" => Ok(Attribute::ThermalThrottled),
                "version" => Ok(Attribute::Version),
                _ => Err(AttrError::UnknownAttribute),
            },
        }
    }

    /// Group the attribute lives in
    pub const fn group(&self) -> Option<&'static str> {
        match self {
            Attribute::Conf(_) => Some(CONF_GROUP),
            _ => None,
        }
    }

    /// Attribute name within its group
    pub const fn name(&self) -> &'static str {
        match self {
            Attribute::Conf(field) => field.name(),
            Attribute::ThermalThrottled => "thermal_throttled",
            Attribute::Version => "version",
        }
    }

    /// Can the attribute be stored to?
    pub const fn is_writable(&self) -> bool {
        matches!(self, Attribute::Conf(_))
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.group() {
            Some(group) => write!(f, "{}/{}", group, self.name()),
            None => f.write_str(self.name()),
        }
    }
}

/// Parse a stored value
pub fn parse_u32(input: &str) -> Result<u32, AttrError> {
    let digits = input.trim();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AttrError::InvalidInput);
    }
    digits.parse::<u32>().map_err(|_| AttrError::InvalidInput)
}

/// Render any displayable value followed by a newline
pub fn render(value: impl fmt::Display) -> Result<AttrBuf, AttrError> {
    let mut buf = AttrBuf::new();
    writeln!(buf, "{}", value).map_err(|_| AttrError::BufferFull)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_path() {
        assert_eq!(
            Attribute::from_path("conf/poll_ms"),
            Ok(Attribute::Conf(ConfigField::PollMs))
        );
        assert_eq!(Attribute::from_path("thermal_throttled"), Ok(Attribute::ThermalThrottled));
        assert_eq!(Attribute::from_path("/version"), Ok(Attribute::Version));
        assert_eq!(Attribute::from_path("conf/nope"), Err(AttrError::UnknownAttribute));
        assert_eq!(Attribute::from_path("poll_ms"), Err(AttrError::UnknownAttribute));
        assert_eq!(Attribute::from_path("other/poll_ms"), Err(AttrError::UnknownAttribute));
    }

    #[test]
    fn test_display_path() {
        let attr = Attribute::Conf(ConfigField::AllowedMidFreq);
        assert_eq!(render(attr).unwrap().as_str(), "conf/allowed_mid_freq\n");
        assert!(!Attribute::ThermalThrottled.is_writable());
    }

    #[test]
    fn test_parse_accepts_whitespace() {
        assert_eq!(parse_u32("65\n"), Ok(65));
        assert_eq!(parse_u32("  1200000 "), Ok(1_200_000));
        assert_eq!(parse_u32("0"), Ok(0));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for input in ["", "\n", "-1", "+5", "abc", "12abc", "1 2", "4294967296"] {
            assert_eq!(parse_u32(input), Err(AttrError::InvalidInput), "{:?}", input);
        }
    }

    #[test]
    fn test_render_appends_newline() {
        assert_eq!(render(1_512_000u32).unwrap().as_str(), "1512000\n");
    }
}
