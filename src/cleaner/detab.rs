//! Tab-expansion mode selected in preferences

use serde::{Deserialize, Serialize};

/// How tabs are treated when cleaning: left alone, or expanded to a
/// fixed number of spaces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetabMode {
    #[default]
    Off,
    Two,
    Four,
    Eight,
}

impl DetabMode {
    /// All modes, in the order the preferences UI lists them.
    pub const ALL: [DetabMode; 4] = [Self::Off, Self::Two, Self::Four, Self::Eight];

    /// Parse the persisted string tag. Unknown tags resolve to `None`;
    /// callers fall back to the default.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "off" => Some(Self::Off),
            "two" => Some(Self::Two),
            "four" => Some(Self::Four),
            "eight" => Some(Self::Eight),
            _ => None,
        }
    }

    pub fn as_tag(&self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Two => "two",
            Self::Four => "four",
            Self::Eight => "eight",
        }
    }

    /// Expansion width in spaces. `Off` reports 0 and also disables
    /// expansion entirely via [`DetabMode::is_enabled`].
    pub fn tab_width(&self) -> usize {
        match self {
            Self::Off => 0,
            Self::Two => 2,
            Self::Four => 4,
            Self::Eight => 8,
        }
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self, Self::Off)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_round_trip() {
        for mode in DetabMode::ALL {
            assert_eq!(DetabMode::from_tag(mode.as_tag()), Some(mode));
        }
    }

    #[test]
    fn test_unknown_tag() {
        assert_eq!(DetabMode::from_tag("three"), None);
        assert_eq!(DetabMode::from_tag(""), None);
    }

    #[test]
    fn test_widths() {
        assert_eq!(DetabMode::Off.tab_width(), 0);
        assert_eq!(DetabMode::Two.tab_width(), 2);
        assert_eq!(DetabMode::Four.tab_width(), 4);
        assert_eq!(DetabMode::Eight.tab_width(), 8);
    }

    #[test]
    fn test_only_off_disabled() {
        assert!(!DetabMode::Off.is_enabled());
        assert!(DetabMode::Two.is_enabled());
        assert!(DetabMode::Four.is_enabled());
        assert!(DetabMode::Eight.is_enabled());
    }

    #[test]
    fn test_serde_tag() {
        let json = serde_json::to_string(&DetabMode::Four).unwrap();
        assert_eq!(json, r#""four""#);
        let back: DetabMode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, DetabMode::Four);
    }
}
