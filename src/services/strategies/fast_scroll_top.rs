use crate::events::{Cause, EventKind, EventTarget};
use crate::services::display_gate::DisplayGate;
use crate::services::subscriptions::Subscriptions;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use super::r#trait::{ExitStrategy, StrategyContext};

/// Позиция прокрутки, которая считается "вверху страницы"
pub const NEAR_TOP_PX: f64 = 100.0;

/// Mobile: быстрый жест из глубины документа обратно к началу
/// (обычно перед переходом к адресной строке или закрытием вкладки).
pub struct FastScrollTopStrategy {
    subscriptions: Subscriptions,
    gate: Arc<DisplayGate>,
    start_depth: f64,
    max_gesture: Duration,
    settle_delay: Duration,
    touch_started_at: Mutex<Option<Instant>>,
    debug: bool,
}

impl FastScrollTopStrategy {
    /// `None`, если документ слишком короткий для этой эвристики
    pub fn register(ctx: &StrategyContext) -> Option<Arc<Self>> {
        let debug = ctx.config.debug;
        let document_height = ctx.page.metrics().document_height;
        let min_height = ctx.config.mobile.min_document_height_px;

        if document_height <= min_height {
            debug_if_enabled!(
                debug,
                "Триггер fast-scroll-top пропущен: высота документа {} <= {}",
                document_height,
                min_height
            );
            return None;
        }

        let strategy = Arc::new(Self {
            subscriptions: ctx.subscriptions("fast-scroll-top"),
            gate: ctx.gate.clone(),
            start_depth: ctx.config.mobile.fast_scroll_top_start_depth,
            max_gesture: ctx.config.fast_scroll_window(),
            settle_delay: ctx.config.settle_delay(),
            touch_started_at: Mutex::new(None),
            debug,
        });

        debug_if_enabled!(debug, "Регистрация триггера fast-scroll-top для mobile");

        // Каждое касание ограничено своим throttle; trailing-вызов гарантирует,
        // что последний touchstart окна всё равно сбросит или поставит отметку.
        let this = Arc::clone(&strategy);
        strategy.subscriptions.listen_throttled(
            EventTarget::Window,
            EventKind::TouchStart,
            ctx.config.event_throttle(),
            move |_| this.on_touch_start(),
        );

        let this = Arc::clone(&strategy);
        strategy.subscriptions.listen_throttled(
            EventTarget::Window,
            EventKind::TouchEnd,
            ctx.config.event_throttle(),
            move |_| this.on_touch_end(),
        );

        Some(strategy)
    }

    /// Отметка времени ставится только для жеста, начатого глубже порога.
    /// Иначе старая отметка сбрасывается, чтобы не засчитать чужой жест.
    fn on_touch_start(&self) {
        let metrics = self.subscriptions.page().metrics();
        let threshold = metrics.document_height * self.start_depth;

        let mut started = self.touch_started_at.lock();
        if metrics.scroll_y > threshold {
            debug_if_enabled!(
                self.debug,
                "touchstart на глубине {} (порог {}), отсчёт жеста начат",
                metrics.scroll_y,
                threshold
            );
            *started = Some(Instant::now());
        } else {
            *started = None;
        }
    }

    /// Длительность жеста фиксируется в момент touchend, позиция читается
    /// после паузы, когда инерционная прокрутка успокоилась.
    fn on_touch_end(self: &Arc<Self>) {
        let ended_at = Instant::now();
        let this = Arc::clone(self);
        self.subscriptions
            .schedule(self.settle_delay, async move { this.check_fast_scroll(ended_at) });
    }

    fn check_fast_scroll(&self, ended_at: Instant) {
        let metrics = self.subscriptions.page().metrics();
        if metrics.scroll_y >= NEAR_TOP_PX {
            return;
        }

        let gesture = {
            let mut started = self.touch_started_at.lock();
            match *started {
                Some(at) if ended_at.saturating_duration_since(at) < self.max_gesture => {
                    *started = None;
                    Some(ended_at.saturating_duration_since(at))
                }
                _ => None,
            }
        };

        if let Some(gesture) = gesture {
            debug_if_enabled!(
                self.debug,
                "Сработал триггер fast-scroll-top: жест за {}мс",
                gesture.as_millis()
            );
            self.gate.attempt(Cause::FastScrollTop);
        }
    }
}

impl ExitStrategy for FastScrollTopStrategy {
    fn cause(&self) -> Cause {
        Cause::FastScrollTop
    }

    fn subscriptions(&self) -> &Subscriptions {
        &self.subscriptions
    }
}
