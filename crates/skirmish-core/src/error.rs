use std::fmt;

/// Rejected construction arguments at the simulation boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum CoreError {
    /// A seat number other than 1 or 2.
    UnknownSlot(u8),
    /// A position or vector with NaN/Inf components.
    NonFinite { what: &'static str, x: f32, y: f32 },
    /// The roster handed to `init` does not seat exactly one player per slot.
    InvalidRoster(String),
    /// A configuration value outside its valid range.
    InvalidConfig(String),
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownSlot(n) => write!(f, "unknown player slot {n}"),
            Self::NonFinite { what, x, y } => {
                write!(f, "{what} must be finite, got ({x}, {y})")
            },
            Self::InvalidRoster(m) | Self::InvalidConfig(m) => write!(f, "{m}"),
        }
    }
}

impl std::error::Error for CoreError {}

/// Reject NaN/Inf coordinates before they reach an entity constructor.
pub fn ensure_finite(what: &'static str, x: f32, y: f32) -> Result<(), CoreError> {
    if x.is_finite() && y.is_finite() {
        Ok(())
    } else {
        Err(CoreError::NonFinite { what, x, y })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finite_coordinates_pass() {
        assert!(ensure_finite("origin", 1.0, -3.5).is_ok());
    }

    #[test]
    fn nan_coordinates_rejected() {
        let err = ensure_finite("origin", f32::NAN, 0.0).unwrap_err();
        assert!(matches!(err, CoreError::NonFinite { what: "origin", .. }));
        assert!(err.to_string().contains("origin must be finite"));
    }

    #[test]
    fn display_messages() {
        assert_eq!(
            CoreError::UnknownSlot(7).to_string(),
            "unknown player slot 7"
        );
        assert_eq!(
            CoreError::InvalidConfig("tile_size must be positive".into()).to_string(),
            "tile_size must be positive"
        );
    }
}
