use crate::events::{Cause, EventKind, EventTarget};
use crate::services::subscriptions::Subscriptions;
use std::sync::Arc;

use super::r#trait::{ExitStrategy, StrategyContext};

/// Mobile: окно потеряло фокус (переключение вкладки или приложения)
pub struct BlurStrategy {
    subscriptions: Subscriptions,
}

impl BlurStrategy {
    pub fn register(ctx: &StrategyContext) -> Arc<Self> {
        let subscriptions = ctx.subscriptions("blur");
        let gate = ctx.gate.clone();
        let debug = ctx.config.debug;

        debug_if_enabled!(debug, "Регистрация триггера blur для mobile");
        subscriptions.listen_throttled(
            EventTarget::Window,
            EventKind::Blur,
            ctx.config.event_throttle(),
            move |_| {
                debug_if_enabled!(debug, "Сработал триггер blur");
                gate.attempt(Cause::Blur);
            },
        );

        Arc::new(Self { subscriptions })
    }
}

impl ExitStrategy for BlurStrategy {
    fn cause(&self) -> Cause {
        Cause::Blur
    }

    fn subscriptions(&self) -> &Subscriptions {
        &self.subscriptions
    }
}
