use serde::{Deserialize, Serialize};
use std::fmt;

/// Publication lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum PublicationStatus {
    /// Listed and accepting offers
    #[default]
    Open,
    /// An offer was accepted
    Closed,
    /// Withdrawn by its owner
    Canceled,
}

impl fmt::Display for PublicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl PublicationStatus {
    /// Convert from database string representation
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "OPEN" => Some(Self::Open),
            "CLOSED" => Some(Self::Closed),
            "CANCELED" | "CANCELLED" => Some(Self::Canceled),
            _ => None,
        }
    }

    /// Convert to database string representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Closed => "CLOSED",
            Self::Canceled => "CANCELED",
        }
    }

    /// Check if offers can be made, and the listing edited
    #[must_use]
    pub const fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }

    #[must_use]
    pub const fn can_transition_to(&self, next: Self) -> bool {
        matches!((self, next), (Self::Open, Self::Closed | Self::Canceled))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str() {
        assert_eq!(PublicationStatus::from_str("open"), Some(PublicationStatus::Open));
        assert_eq!(PublicationStatus::from_str("CLOSED"), Some(PublicationStatus::Closed));
        assert_eq!(
            PublicationStatus::from_str("canceled"),
            Some(PublicationStatus::Canceled)
        );
        assert_eq!(PublicationStatus::from_str("pending"), None);
    }

    #[test]
    fn test_is_open() {
        assert!(PublicationStatus::Open.is_open());
        assert!(!PublicationStatus::Closed.is_open());
        assert!(!PublicationStatus::Canceled.is_open());
    }

    #[test]
    fn test_transitions() {
        assert!(PublicationStatus::Open.can_transition_to(PublicationStatus::Closed));
        assert!(PublicationStatus::Open.can_transition_to(PublicationStatus::Canceled));
        assert!(!PublicationStatus::Closed.can_transition_to(PublicationStatus::Open));
        assert!(!PublicationStatus::Canceled.can_transition_to(PublicationStatus::Open));
        assert!(!PublicationStatus::Closed.can_transition_to(PublicationStatus::Canceled));
    }

    #[test]
    fn test_default() {
        assert_eq!(PublicationStatus::default(), PublicationStatus::Open);
    }
}
