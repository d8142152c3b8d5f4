use serde::{Deserialize, Serialize};
use std::fmt;

/// Стратегия, которая зафиксировала намерение уйти со страницы
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cause {
    #[serde(rename = "inactivity")]
    Inactivity,
    #[serde(rename = "mouseleave")]
    MouseLeave,
    #[serde(rename = "blur")]
    Blur,
    #[serde(rename = "scroll-bottom")]
    ScrollBottom,
    #[serde(rename = "fast-scroll-top")]
    FastScrollTop,
}

impl Cause {
    pub const ALL: [Cause; 5] = [
        Cause::Inactivity,
        Cause::MouseLeave,
        Cause::Blur,
        Cause::ScrollBottom,
        Cause::FastScrollTop,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Cause::Inactivity => "inactivity",
            Cause::MouseLeave => "mouseleave",
            Cause::Blur => "blur",
            Cause::ScrollBottom => "scroll-bottom",
            Cause::FastScrollTop => "fast-scroll-top",
        }
    }
}

impl fmt::Display for Cause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
