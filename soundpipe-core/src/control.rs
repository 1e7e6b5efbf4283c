//! Decode stop-control signalling.

use std::fmt;

/// Value returned by a decoded-audio callback to steer decoding.
///
/// Returning a stop variant terminates the current decode call early; the
/// decoder reports how many input bytes were consumed so the caller can
/// resume from the next packet boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodeControl {
    /// Keep decoding.
    #[default]
    Continue,
    /// Stop decoding; not an error.
    StopOk,
    /// Stop decoding and treat the stop as an error.
    StopErr,
}

impl DecodeControl {
    /// Whether this control requests a stop.
    pub const fn is_stop(&self) -> bool {
        !matches!(self, Self::Continue)
    }

    /// One-letter code used in test and log labels.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Continue => "C",
            Self::StopOk => "O",
            Self::StopErr => "E",
        }
    }
}

impl fmt::Display for DecodeControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Continue => write!(f, "continue"),
            Self::StopOk => write!(f, "stop-ok"),
            Self::StopErr => write!(f, "stop-err"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(DecodeControl::Continue.code(), "C");
        assert_eq!(DecodeControl::StopOk.code(), "O");
        assert_eq!(DecodeControl::StopErr.code(), "E");
    }

    #[test]
    fn test_is_stop() {
        assert!(!DecodeControl::Continue.is_stop());
        assert!(DecodeControl::StopOk.is_stop());
        assert!(DecodeControl::StopErr.is_stop());
    }
}
