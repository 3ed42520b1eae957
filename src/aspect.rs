use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::Error;

/// Display aspect ratios a sequence header can be rewritten to
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize)]
pub enum AspectRatio {
    #[serde(rename = "1:1")]
    Square, // code 1
    #[serde(rename = "4:3")]
    Standard, // code 2
    #[serde(rename = "16:9")]
    Widescreen, // code 3
}

impl AspectRatio {
    /// The 4-bit aspect_ratio_information value stored in the header
    pub fn code(self) -> u8 {
        match self {
            AspectRatio::Square => 1,
            AspectRatio::Standard => 2,
            AspectRatio::Widescreen => 3,
        }
    }

    /// Map a decoded code back to a ratio; reserved codes give `None`
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(AspectRatio::Square),
            2 => Some(AspectRatio::Standard),
            3 => Some(AspectRatio::Widescreen),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Standard => "4:3",
            AspectRatio::Widescreen => "16:9",
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for AspectRatio {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1:1" => Ok(AspectRatio::Square),
            "4:3" => Ok(AspectRatio::Standard),
            "16:9" => Ok(AspectRatio::Widescreen),
            other => Err(Error::UnknownRatio(other.to_string())),
        }
    }
}

/// Get a human-readable name for any decoded aspect code, reserved ones included
pub fn code_name(code: u8) -> &'static str {
    match AspectRatio::from_code(code) {
        Some(ratio) => ratio.label(),
        None => "reserved",
    }
}
