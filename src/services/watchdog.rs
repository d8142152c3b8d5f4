use crate::config::Config;
use crate::events::{Cause, EventKind, EventTarget, DESKTOP_ACTIVITY_EVENTS, MOBILE_ACTIVITY_EVENTS};
use crate::host::Page;
use crate::services::display_gate::DisplayGate;
use crate::services::platform::Platform;
use crate::services::subscriptions::Subscriptions;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::sleep;

/// Таймер бездействия. Два состояния: idle (нет таймера) и armed.
/// Любая активность пользователя перезапускает таймер; по истечении он
/// один раз стучится в гейт и возвращается в idle.
pub struct InactivityWatchdog {
    timeout: Option<Duration>,
    gate: Arc<DisplayGate>,
    runtime: Handle,
    timer: Mutex<Option<JoinHandle<()>>>,
    subscriptions: Subscriptions,
    debug: bool,
}

impl InactivityWatchdog {
    /// Создаёт watchdog и подписывает его на события активности платформы.
    /// Таймер не запускается до первого `restart()`.
    pub fn new(
        config: &Config,
        platform: Platform,
        page: Arc<dyn Page>,
        runtime: Handle,
        gate: Arc<DisplayGate>,
    ) -> Arc<Self> {
        let watchdog = Arc::new(Self {
            timeout: config.inactivity_timeout(platform),
            gate,
            runtime: runtime.clone(),
            timer: Mutex::new(None),
            subscriptions: Subscriptions::new("inactivity", page, runtime, config.debug),
            debug: config.debug,
        });

        if watchdog.timeout.is_some() {
            let (target, triggers) = match platform {
                Platform::Desktop => (EventTarget::Window, &DESKTOP_ACTIVITY_EVENTS),
                Platform::Mobile => (EventTarget::Body, &MOBILE_ACTIVITY_EVENTS),
            };
            watchdog.attach_activity(target, triggers, config.event_throttle());
        } else {
            debug_if_enabled!(
                watchdog.debug,
                "Триггер бездействия отключён для платформы {}",
                platform
            );
        }

        watchdog
    }

    /// Каждое событие получает собственный throttle: всплеск разных событий
    /// может дать несколько `restart()` за интервал, это безопасно.
    /// Слушатели держат watchdog до `dispose()`.
    fn attach_activity(self: &Arc<Self>, target: EventTarget, triggers: &[EventKind], interval: Duration) {
        for &kind in triggers {
            let this = Arc::clone(self);
            self.subscriptions.listen_throttled(target, kind, interval, move |event| {
                debug_if_enabled!(this.debug, "Активность {}: перезапуск таймера бездействия", event.kind);
                this.restart();
            });
        }
    }

    /// Отменить текущий таймер (если есть) и взвести новый
    pub fn restart(&self) {
        let Some(timeout) = self.timeout else {
            debug_if_enabled!(self.debug, "Триггер бездействия отключён, таймер не взводится");
            return;
        };
        if self.subscriptions.is_disposed() {
            return;
        }

        let gate = Arc::clone(&self.gate);
        let debug = self.debug;

        let mut timer = self.timer.lock();
        if let Some(previous) = timer.take() {
            if !previous.is_finished() {
                debug_if_enabled!(self.debug, "Сброс таймера бездействия");
            }
            previous.abort();
        }

        *timer = Some(self.runtime.spawn(async move {
            sleep(timeout).await;
            debug_if_enabled!(debug, "Сработал триггер бездействия через {}мс", timeout.as_millis());
            gate.attempt(Cause::Inactivity);
        }));
    }

    pub fn is_armed(&self) -> bool {
        self.timer
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn listener_count(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn dispose(&self) {
        self.subscriptions.dispose();
        if let Some(timer) = self.timer.lock().take() {
            timer.abort();
        }
    }
}
