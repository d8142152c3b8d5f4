use crate::events::{Cause, EventKind, EventTarget};
use crate::services::display_gate::DisplayGate;
use crate::services::subscriptions::Subscriptions;
use std::sync::Arc;
use std::time::Duration;

use super::r#trait::{ExitStrategy, StrategyContext};

/// Mobile: пользователь долистал до конца документа
pub struct ScrollBottomStrategy {
    subscriptions: Subscriptions,
    gate: Arc<DisplayGate>,
    offset_px: f64,
    settle_delay: Duration,
    debug: bool,
}

impl ScrollBottomStrategy {
    /// `None`, если документ слишком короткий для этой эвристики
    pub fn register(ctx: &StrategyContext) -> Option<Arc<Self>> {
        let debug = ctx.config.debug;
        let document_height = ctx.page.metrics().document_height;
        let min_height = ctx.config.mobile.min_document_height_px;

        if document_height <= min_height {
            debug_if_enabled!(
                debug,
                "Триггер scroll-bottom пропущен: высота документа {} <= {}",
                document_height,
                min_height
            );
            return None;
        }

        let strategy = Arc::new(Self {
            subscriptions: ctx.subscriptions("scroll-bottom"),
            gate: ctx.gate.clone(),
            offset_px: ctx.config.mobile.scroll_bottom_offset_px,
            settle_delay: ctx.config.settle_delay(),
            debug,
        });

        debug_if_enabled!(debug, "Регистрация триггера scroll-bottom для mobile");
        // Слушатель держит стратегию; снимается в dispose()
        let this = Arc::clone(&strategy);
        strategy.subscriptions.listen_throttled(
            EventTarget::Window,
            EventKind::Scroll,
            ctx.config.event_throttle(),
            move |_| this.on_scroll(),
        );

        Some(strategy)
    }

    fn on_scroll(self: &Arc<Self>) {
        // Позиция читается после паузы, когда прокрутка успокоилась
        let this = Arc::clone(self);
        self.subscriptions
            .schedule(self.settle_delay, async move { this.check_bottom() });
    }

    fn check_bottom(&self) {
        let metrics = self.subscriptions.page().metrics();
        if metrics.is_at_bottom(self.offset_px) {
            debug_if_enabled!(
                self.debug,
                "Сработал триггер scroll-bottom: {} + {} + {} >= {}",
                metrics.viewport_height,
                metrics.scroll_y,
                self.offset_px,
                metrics.document_height
            );
            self.gate.attempt(Cause::ScrollBottom);
        }
    }
}

impl ExitStrategy for ScrollBottomStrategy {
    fn cause(&self) -> Cause {
        Cause::ScrollBottom
    }

    fn subscriptions(&self) -> &Subscriptions {
        &self.subscriptions
    }
}
