//! Playback volume

use serde::{Deserialize, Serialize};

/// Volume as an integer percentage in `0..=100`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Volume(u8);

impl Volume {
    pub const MAX_PERCENT: u32 = 100;

    /// Build from a percentage, clamping anything above 100
    pub fn from_percent(percent: u32) -> Self {
        Self(percent.min(Self::MAX_PERCENT) as u8)
    }

    pub fn percent(self) -> u8 {
        self.0
    }

    /// Playback gain in `0.0..=1.0`
    pub fn gain(self) -> f32 {
        f32::from(self.0) / Self::MAX_PERCENT as f32
    }
}

impl Default for Volume {
    fn default() -> Self {
        Self(50)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_to_gain() {
        assert_eq!(Volume::from_percent(50).gain(), 0.5);
        assert_eq!(Volume::from_percent(0).gain(), 0.0);
        assert_eq!(Volume::from_percent(100).gain(), 1.0);
    }

    #[test]
    fn test_clamps_above_hundred() {
        assert_eq!(Volume::from_percent(250).percent(), 100);
    }
}
