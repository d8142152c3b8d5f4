use serde::{Deserialize, Serialize};
use std::fmt;

/// Класс устройства, определяющий набор стратегий
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Desktop,
    Mobile,
}

impl Platform {
    /// Классификация по возможностям сенсорного ввода: любой признак
    /// сенсорного экрана означает mobile.
    pub fn classify(caps: &TouchCapabilities) -> Self {
        if caps.touch_events || caps.max_touch_points > 0 || caps.coarse_pointer {
            Platform::Mobile
        } else {
            Platform::Desktop
        }
    }

    pub fn is_desktop(&self) -> bool {
        matches!(self, Platform::Desktop)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Desktop => write!(f, "desktop"),
            Platform::Mobile => write!(f, "mobile"),
        }
    }
}

/// Признаки сенсорного ввода, которые сообщает хост
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TouchCapabilities {
    /// Окружение поддерживает touch-события (`ontouchstart`)
    pub touch_events: bool,
    pub max_touch_points: u32,
    /// Основной указатель грубый (`pointer: coarse`)
    pub coarse_pointer: bool,
}

impl TouchCapabilities {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn touchscreen() -> Self {
        Self {
            touch_events: true,
            max_touch_points: 5,
            coarse_pointer: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(Platform::classify(&TouchCapabilities::none()), Platform::Desktop);
        assert_eq!(Platform::classify(&TouchCapabilities::touchscreen()), Platform::Mobile);

        // Достаточно одного признака
        let caps = TouchCapabilities {
            max_touch_points: 1,
            ..TouchCapabilities::none()
        };
        assert_eq!(Platform::classify(&caps), Platform::Mobile);
        assert!(!Platform::classify(&caps).is_desktop());
    }
}
