use crate::events::{Cause, EventKind, EventTarget};
use crate::services::subscriptions::Subscriptions;
use std::sync::Arc;

use super::r#trait::{ExitStrategy, StrategyContext};

/// Desktop: курсор покинул `document.body`
pub struct MouseLeaveStrategy {
    subscriptions: Subscriptions,
}

impl MouseLeaveStrategy {
    pub fn register(ctx: &StrategyContext) -> Arc<Self> {
        let subscriptions = ctx.subscriptions("mouseleave");
        let gate = ctx.gate.clone();
        let debug = ctx.config.debug;

        debug_if_enabled!(debug, "Регистрация триггера mouseleave для desktop");
        subscriptions.listen_throttled(
            EventTarget::Body,
            EventKind::MouseLeave,
            ctx.config.mouse_leave_throttle(),
            move |event| {
                // Синтетические события без указателя не считаются уходом
                if !event.is_from_mouse() {
                    return;
                }
                debug_if_enabled!(debug, "Сработал триггер mouseleave");
                gate.attempt(Cause::MouseLeave);
            },
        );

        Arc::new(Self { subscriptions })
    }
}

impl ExitStrategy for MouseLeaveStrategy {
    fn cause(&self) -> Cause {
        Cause::MouseLeave
    }

    fn subscriptions(&self) -> &Subscriptions {
        &self.subscriptions
    }
}
