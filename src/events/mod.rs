pub mod cause;
pub mod page;

pub use cause::Cause;
pub use page::{EventKind, EventOrigin, EventTarget, PageEvent, PageMetrics};

/// События сброса таймера бездействия на desktop
pub const DESKTOP_ACTIVITY_EVENTS: [EventKind; 3] =
    [EventKind::Scroll, EventKind::MouseMove, EventKind::Wheel];

/// События сброса таймера бездействия на mobile
pub const MOBILE_ACTIVITY_EVENTS: [EventKind; 3] =
    [EventKind::TouchStart, EventKind::TouchEnd, EventKind::TouchMove];
