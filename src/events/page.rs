use serde::{Deserialize, Serialize};
use std::fmt;

/// Цель подписки: окно или `document.body`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventTarget {
    Window,
    Body,
}

impl fmt::Display for EventTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventTarget::Window => write!(f, "window"),
            EventTarget::Body => write!(f, "document.body"),
        }
    }
}

/// Типы событий, на которые подписывается движок
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    #[serde(rename = "mouseleave")]
    MouseLeave,
    #[serde(rename = "mousemove")]
    MouseMove,
    #[serde(rename = "wheel")]
    Wheel,
    #[serde(rename = "scroll")]
    Scroll,
    #[serde(rename = "blur")]
    Blur,
    #[serde(rename = "touchstart")]
    TouchStart,
    #[serde(rename = "touchend")]
    TouchEnd,
    #[serde(rename = "touchmove")]
    TouchMove,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::MouseLeave => "mouseleave",
            EventKind::MouseMove => "mousemove",
            EventKind::Wheel => "wheel",
            EventKind::Scroll => "scroll",
            EventKind::Blur => "blur",
            EventKind::TouchStart => "touchstart",
            EventKind::TouchEnd => "touchend",
            EventKind::TouchMove => "touchmove",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Источник события. Синтетические события (dispatchEvent без указателя)
/// не считаются движением мыши.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventOrigin {
    Mouse,
    Touch,
    #[default]
    Synthetic,
}

/// Событие страницы в том виде, в каком его доставляет хост
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageEvent {
    pub kind: EventKind,
    pub origin: EventOrigin,
}

impl PageEvent {
    pub fn new(kind: EventKind, origin: EventOrigin) -> Self {
        Self { kind, origin }
    }

    /// Событие с источником, естественным для его типа
    pub fn natural(kind: EventKind) -> Self {
        let origin = match kind {
            EventKind::MouseLeave | EventKind::MouseMove | EventKind::Wheel => EventOrigin::Mouse,
            EventKind::TouchStart | EventKind::TouchEnd | EventKind::TouchMove => EventOrigin::Touch,
            EventKind::Scroll | EventKind::Blur => EventOrigin::Synthetic,
        };
        Self::new(kind, origin)
    }

    pub fn is_from_mouse(&self) -> bool {
        self.origin == EventOrigin::Mouse
    }
}

impl fmt::Display for PageEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:?})", self.kind, self.origin)
    }
}

/// Геометрия страницы в пикселях
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PageMetrics {
    pub viewport_height: f64,
    pub scroll_y: f64,
    pub document_height: f64,
}

impl PageMetrics {
    pub fn new(viewport_height: f64, document_height: f64) -> Self {
        Self {
            viewport_height,
            scroll_y: 0.0,
            document_height,
        }
    }

    pub fn with_scroll(mut self, scroll_y: f64) -> Self {
        self.scroll_y = scroll_y;
        self
    }

    /// Нижний край окна (с учётом отступа) достиг конца документа
    pub fn is_at_bottom(&self, offset_px: f64) -> bool {
        self.viewport_height + self.scroll_y + offset_px >= self.document_height
    }
}
