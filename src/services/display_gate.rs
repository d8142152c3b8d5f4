use crate::config::Config;
use crate::events::Cause;
use crate::services::throttle::{Cancel, Edge, Throttle};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::info;

/// Пользовательский callback: вызывается синхронно с причиной срабатывания
pub type ExitIntentCallback = Arc<dyn Fn(Cause) + Send + Sync>;

type LimitHook = Box<dyn FnOnce() + Send>;

/// Единая точка, через которую проходят все стратегии: лимит показов
/// и пауза между показами.
pub struct DisplayGate {
    counter: Arc<DisplayCounter>,
    throttle: Throttle<Cause>,
}

struct DisplayCounter {
    max_displays: u32,
    displays: AtomicU32,
    closed: AtomicBool,
    callback: ExitIntentCallback,
    on_limit: Mutex<Option<LimitHook>>,
    debug: bool,
}

impl DisplayGate {
    pub fn new(config: &Config, runtime: Handle, callback: ExitIntentCallback) -> Self {
        let counter = Arc::new(DisplayCounter {
            max_displays: config.limits.max_displays,
            displays: AtomicU32::new(0),
            closed: AtomicBool::new(false),
            callback,
            on_limit: Mutex::new(None),
            debug: config.debug,
        });

        // Первый сигнал в окне паузы выигрывает, остальные отбрасываются
        let display = Arc::clone(&counter);
        let throttle = Throttle::new(config.cooldown(), Edge::Leading, runtime, move |cause| {
            display.display(cause)
        });

        Self { counter, throttle }
    }

    /// Действие при достижении лимита показов. Вызывается не более одного раза.
    pub fn set_on_limit<F>(&self, hook: F)
    where
        F: FnOnce() + Send + 'static,
    {
        *self.counter.on_limit.lock() = Some(Box::new(hook));
    }

    /// Попытка показа. `false`, если сигнал поглощён паузой или гейт закрыт.
    pub fn attempt(&self, cause: Cause) -> bool {
        if self.is_closed() {
            debug_if_enabled!(self.counter.debug, "Гейт закрыт, сигнал {} проигнорирован", cause);
            return false;
        }

        let passed = self.throttle.call(cause);
        if !passed {
            debug_if_enabled!(self.counter.debug, "Сигнал {} поглощён паузой между показами", cause);
        }
        passed
    }

    pub fn displays(&self) -> u32 {
        self.counter.displays.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.counter.closed.load(Ordering::SeqCst)
    }

    /// Навсегда закрыть гейт: дальнейшие сигналы игнорируются
    pub fn close(&self) {
        self.counter.closed.store(true, Ordering::SeqCst);
        self.throttle.cancel();
        self.counter.on_limit.lock().take();
    }
}

impl DisplayCounter {
    fn display(&self, cause: Cause) {
        if self.closed.load(Ordering::SeqCst) {
            return;
        }

        let max = self.max_displays;
        let displays = match self
            .displays
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| (n < max).then_some(n + 1))
        {
            Ok(previous) => previous + 1,
            Err(_) => return,
        };

        // Учёт фиксируется до вызова callback: его паника не ломает счётчик
        let reached = displays >= max;
        if reached {
            self.closed.store(true, Ordering::SeqCst);
        }

        debug_if_enabled!(self.debug, "Показ #{} по причине {}", displays, cause);
        (self.callback)(cause);

        if reached {
            info!("Достигнут лимит показов ({}), снимаем все триггеры", max);
            let hook = self.on_limit.lock().take();
            if let Some(hook) = hook {
                hook();
            }
        }
    }
}
