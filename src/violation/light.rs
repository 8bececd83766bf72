use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LightColor {
    Red,
    Yellow,
    Green,
}

/// Traffic-light reading for one frame, one color per direction.
///
/// Any direction may be unknown. A missing left signal follows the straight
/// one; a missing right signal is treated as green (free right turn).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightState {
    pub left: Option<LightColor>,
    pub straight: Option<LightColor>,
    pub right: Option<LightColor>,
}

impl LightState {
    pub fn new(
        left: Option<LightColor>,
        straight: Option<LightColor>,
        right: Option<LightColor>,
    ) -> Self {
        Self {
            left,
            straight,
            right,
        }
    }

    /// Same color in every direction.
    pub fn uniform(color: LightColor) -> Self {
        Self::new(Some(color), Some(color), Some(color))
    }

    pub fn effective_left(&self) -> Option<LightColor> {
        self.left.or(self.straight)
    }

    pub fn effective_straight(&self) -> Option<LightColor> {
        self.straight
    }

    pub fn effective_right(&self) -> LightColor {
        self.right.unwrap_or(LightColor::Green)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_directions_fall_back() {
        let state = LightState::new(None, Some(LightColor::Red), None);
        assert_eq!(state.effective_left(), Some(LightColor::Red));
        assert_eq!(state.effective_right(), LightColor::Green);
    }

    #[test]
    fn test_explicit_directions_win() {
        let state = LightState::new(
            Some(LightColor::Green),
            Some(LightColor::Red),
            Some(LightColor::Red),
        );
        assert_eq!(state.effective_left(), Some(LightColor::Green));
        assert_eq!(state.effective_right(), LightColor::Red);
    }

    #[test]
    fn test_deserialize_uppercase() {
        let state: LightState =
            serde_json::from_str(r#"{"left": null, "straight": "RED", "right": "GREEN"}"#).unwrap();
        assert_eq!(state.straight, Some(LightColor::Red));
        assert_eq!(state.left, None);
    }
}
