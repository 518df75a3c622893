use std::fmt;
use std::str::FromStr;

/// Identifies which of the two monitored streams an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VideoTag {
    Local,
    Remote,
}

impl fmt::Display for VideoTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VideoTag::Local => write!(f, "LOCAL"),
            VideoTag::Remote => write!(f, "REMOTE"),
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("malformed rgba color string '{0}'")]
pub struct ParseColorError(String);

/// Color value observed on a rendered frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl FromStr for Rgb {
    type Err = ParseColorError;

    /// Parses the browser-reported `"r,g,b,a"` form. The alpha component,
    /// when present, is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() < 3 {
            return Err(ParseColorError(s.to_owned()));
        }
        let channel = |p: &str| p.parse::<u8>().map_err(|_| ParseColorError(s.to_owned()));
        Ok(Rgb {
            r: channel(parts[0])?,
            g: channel(parts[1])?,
            b: channel(parts[2])?,
        })
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.r, self.g, self.b)
    }
}

/// One observed color change on an endpoint. Immutable once constructed;
/// ownership moves to the controller on publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorChangeEvent {
    pub tag: VideoTag,
    pub color: Rgb,
    pub timestamp_ms: i64,
}

impl ColorChangeEvent {
    pub fn new(tag: VideoTag, color: Rgb, timestamp_ms: i64) -> Self {
        Self {
            tag,
            color,
            timestamp_ms,
        }
    }
}

/// Renders a millisecond timestamp as `mm:ss.SSS` for violation reports.
pub fn format_clock_ms(timestamp_ms: i64) -> String {
    let millis = timestamp_ms.rem_euclid(1000);
    let total_secs = timestamp_ms.div_euclid(1000);
    let secs = total_secs.rem_euclid(60);
    let mins = total_secs.div_euclid(60).rem_euclid(60);
    format!("{:02}:{:02}.{:03}", mins, secs, millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rgba_string() {
        assert_eq!("255, 0, 64, 1".parse::<Rgb>().unwrap(), Rgb::new(255, 0, 64));
        assert_eq!("0,128,255".parse::<Rgb>().unwrap(), Rgb::new(0, 128, 255));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("255,0".parse::<Rgb>().is_err());
        assert!("red,green,blue".parse::<Rgb>().is_err());
        assert!("300,0,0".parse::<Rgb>().is_err());
    }

    #[test]
    fn test_clock_format() {
        assert_eq!(format_clock_ms(0), "00:00.000");
        assert_eq!(format_clock_ms(61_234), "01:01.234");
        // Hours wrap, only mm:ss.SSS is rendered
        assert_eq!(format_clock_ms(3_661_005), "01:01.005");
    }
}
