use crate::config::Config;
use crate::error::Result;
use crate::exit_intent_error;
use crate::events::Cause;
use crate::host::Page;
use crate::services::display_gate::{DisplayGate, ExitIntentCallback};
use crate::services::platform::Platform;
use crate::services::strategies::{register_strategies, ExitStrategy, StrategyContext};
use crate::services::watchdog::InactivityWatchdog;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::info;

/// Точка входа: собирает гейт, watchdog и стратегии для страницы.
pub struct ExitIntent;

impl ExitIntent {
    /// Запустить детектор. Платформа берётся у страницы, таймеры планируются
    /// на текущем tokio runtime. Конфигурация не валидируется.
    pub fn start<F>(page: Arc<dyn Page>, config: Config, on_exit_intent: F) -> Result<Disposer>
    where
        F: Fn(Cause) + Send + Sync + 'static,
    {
        let runtime = Handle::try_current()
            .map_err(|e| exit_intent_error!(runtime_unavailable, "{}", e))?;
        let platform = page.platform();

        Ok(Self::start_with(
            page,
            platform,
            Arc::new(config),
            runtime,
            Arc::new(on_exit_intent),
        ))
    }

    /// Запуск с явно заданными платформой и runtime
    pub fn start_with(
        page: Arc<dyn Page>,
        platform: Platform,
        config: Arc<Config>,
        runtime: Handle,
        callback: ExitIntentCallback,
    ) -> Disposer {
        let gate = Arc::new(DisplayGate::new(&config, runtime.clone(), callback));
        let watchdog = InactivityWatchdog::new(
            &config,
            platform,
            page.clone(),
            runtime.clone(),
            gate.clone(),
        );

        let ctx = StrategyContext {
            config: config.clone(),
            page: page.clone(),
            runtime: runtime.clone(),
            gate: gate.clone(),
        };
        let strategies = register_strategies(&ctx, platform);

        let session = Arc::new(Session {
            config,
            platform,
            gate,
            watchdog,
            strategies,
            disposed: AtomicBool::new(false),
        });

        // Последний показ снимает всё, что зарегистрировал этот экземпляр.
        // Хук держит сессию живой и без Disposer; цикл разрывается в dispose().
        let owner = Arc::clone(&session);
        session.gate.set_on_limit(move || owner.dispose());
        if session.gate.is_closed() {
            session.dispose();
        }

        info!(
            "Exit intent запущен для {}: стратегий {}, слушателей {}",
            platform,
            session.strategies.len(),
            session.listener_count()
        );

        session.watchdog.restart();

        Disposer { session }
    }
}

/// Состояние одного экземпляра. Ничего не разделяется с другими экземплярами.
struct Session {
    config: Arc<Config>,
    platform: Platform,
    gate: Arc<DisplayGate>,
    watchdog: Arc<InactivityWatchdog>,
    strategies: Vec<Arc<dyn ExitStrategy>>,
    disposed: AtomicBool,
}

impl Session {
    fn listener_count(&self) -> usize {
        self.watchdog.listener_count()
            + self
                .strategies
                .iter()
                .map(|strategy| strategy.listener_count())
                .sum::<usize>()
    }

    fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }

        // Гейт закрывается первым: ни один сигнал в процессе teardown не дойдёт до callback
        self.gate.close();
        self.watchdog.dispose();
        let removed: usize = self.strategies.iter().map(|strategy| strategy.dispose()).sum();

        debug_if_enabled!(
            self.config.debug,
            "Очистка после {} показов, снято слушателей стратегий: {}",
            self.gate.displays(),
            removed
        );
    }
}

/// Снимает все слушатели и таймеры экземпляра. Повторный вызов безопасен.
///
/// Drop не останавливает детектор: слушатели страницы держат его живым до
/// `dispose()` или до исчерпания лимита показов. Отброшенный `Disposer`
/// означает, что остановить детектор можно только лимитом.
#[derive(Clone)]
pub struct Disposer {
    session: Arc<Session>,
}

impl Disposer {
    pub fn dispose(&self) {
        self.session.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.session.disposed.load(Ordering::SeqCst)
    }

    pub fn displays(&self) -> u32 {
        self.session.gate.displays()
    }

    pub fn platform(&self) -> Platform {
        self.session.platform
    }

    /// Активные стратегии в порядке регистрации (без watchdog)
    pub fn strategies(&self) -> Vec<Cause> {
        self.session.strategies.iter().map(|s| s.cause()).collect()
    }

    pub fn listener_count(&self) -> usize {
        self.session.listener_count()
    }

    pub fn is_inactivity_armed(&self) -> bool {
        self.session.watchdog.is_armed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExitIntentError;
    use crate::events::{EventKind, EventTarget, PageMetrics};
    use crate::host::SimulatedPage;
    use parking_lot::Mutex;
    use std::time::Duration;
    use tokio::time::sleep;

    struct Harness {
        page: Arc<SimulatedPage>,
        disposer: Disposer,
        causes: Arc<Mutex<Vec<Cause>>>,
    }

    fn start(page: SimulatedPage, config: Config) -> Harness {
        let page = Arc::new(page);
        let causes = Arc::new(Mutex::new(Vec::new()));
        let sink = causes.clone();
        let disposer = ExitIntent::start(page.clone(), config, move |cause| sink.lock().push(cause))
            .expect("runtime is available in tokio tests");
        Harness { page, disposer, causes }
    }

    fn metrics() -> PageMetrics {
        PageMetrics::new(800.0, 8000.0)
    }

    fn mobile_config() -> Config {
        let mut config = Config::default();
        config.mobile.blur_enabled = true;
        config.mobile.scroll_bottom_enabled = true;
        config.mobile.fast_scroll_top_enabled = true;
        config
    }

    #[test]
    fn start_without_runtime_fails() {
        let page = Arc::new(SimulatedPage::desktop(metrics()));
        let result = ExitIntent::start(page, Config::default(), |_| {});
        assert!(matches!(result, Err(ExitIntentError::RuntimeUnavailable(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn desktop_listener_counts() {
        let h = start(SimulatedPage::desktop(metrics()), mobile_config());

        assert_eq!(h.disposer.platform(), Platform::Desktop);
        assert_eq!(h.disposer.strategies(), vec![Cause::MouseLeave]);
        // scroll + mousemove + wheel + mouseleave
        assert_eq!(h.page.listener_count(), 4);
        assert_eq!(h.disposer.listener_count(), 4);
        assert_eq!(h.page.count(EventTarget::Window, EventKind::Blur), 0);
        assert!(h.disposer.is_inactivity_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn mobile_listener_counts() {
        let h = start(SimulatedPage::mobile(metrics()), mobile_config());

        assert_eq!(
            h.disposer.strategies(),
            vec![Cause::Blur, Cause::ScrollBottom, Cause::FastScrollTop]
        );
        // 3 touch-события watchdog + blur + scroll + touchstart/touchend
        assert_eq!(h.page.listener_count(), 7);
        assert_eq!(h.page.count(EventTarget::Body, EventKind::MouseLeave), 0);
        assert_eq!(h.page.count(EventTarget::Window, EventKind::MouseMove), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn height_gate_above_document_skips_scroll_listener() {
        let mut config = mobile_config();
        config.mobile.blur_enabled = false;
        config.mobile.fast_scroll_top_enabled = false;
        config.mobile.min_document_height_px = 9000.0;
        let h = start(SimulatedPage::mobile(metrics()), config);

        assert!(h.disposer.strategies().is_empty());
        assert_eq!(h.page.count(EventTarget::Window, EventKind::Scroll), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn inactivity_fires_once_at_threshold() {
        let mut config = Config::default();
        config.inactivity.desktop_seconds = 5.0;
        let h = start(SimulatedPage::desktop(metrics()), config);

        sleep(Duration::from_millis(4990)).await;
        assert!(h.causes.lock().is_empty());

        sleep(Duration::from_millis(20)).await;
        assert_eq!(*h.causes.lock(), vec![Cause::Inactivity]);

        sleep(Duration::from_secs(120)).await;
        assert_eq!(h.causes.lock().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cooldown_collapses_signals_from_different_strategies() {
        let mut config = mobile_config();
        config.limits.show_again_after_seconds = 10.0;
        let h = start(SimulatedPage::mobile(metrics()), config);

        h.page.fire(EventTarget::Window, EventKind::Blur);
        h.page.scroll_to(7500.0);
        h.page.fire(EventTarget::Window, EventKind::Scroll);
        sleep(Duration::from_secs(1)).await;
        assert_eq!(*h.causes.lock(), vec![Cause::Blur]);

        sleep(Duration::from_secs(10)).await;
        h.page.fire(EventTarget::Window, EventKind::Scroll);
        sleep(Duration::from_secs(1)).await;
        assert_eq!(*h.causes.lock(), vec![Cause::Blur, Cause::ScrollBottom]);
    }

    #[tokio::test(start_paused = true)]
    async fn single_display_tears_everything_down() {
        let mut config = Config::default();
        config.limits.max_displays = 1;
        config.limits.show_again_after_seconds = 1.0;
        config.inactivity.desktop_seconds = 5.0;
        let h = start(SimulatedPage::desktop(metrics()), config);
        let registered = h.page.listener_count();

        h.page.fire(EventTarget::Body, EventKind::MouseLeave);
        assert_eq!(*h.causes.lock(), vec![Cause::MouseLeave]);
        assert!(h.disposer.is_disposed());
        assert_eq!(h.page.listener_count(), 0);
        assert_eq!(h.page.removals(), registered);
        assert!(!h.disposer.is_inactivity_armed());

        sleep(Duration::from_secs(30)).await;
        h.page.fire(EventTarget::Body, EventKind::MouseLeave);
        sleep(Duration::from_secs(30)).await;
        assert_eq!(h.causes.lock().len(), 1);
        assert_eq!(h.disposer.displays(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn inactivity_reaching_limit_disposes_from_timer() {
        let mut config = Config::default();
        config.limits.max_displays = 1;
        config.inactivity.desktop_seconds = 5.0;
        let h = start(SimulatedPage::desktop(metrics()), config);

        sleep(Duration::from_secs(6)).await;
        assert_eq!(*h.causes.lock(), vec![Cause::Inactivity]);
        assert!(h.disposer.is_disposed());
        assert_eq!(h.page.listener_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn dispose_twice_is_safe() {
        let h = start(SimulatedPage::mobile(metrics()), mobile_config());
        let registered = h.page.listener_count();

        h.disposer.dispose();
        h.disposer.clone().dispose();

        assert!(h.disposer.is_disposed());
        assert_eq!(h.page.listener_count(), 0);
        assert_eq!(h.page.removals(), registered);

        sleep(Duration::from_secs(600)).await;
        assert!(h.causes.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_disposer_keeps_detector_running_until_limit() {
        let mut config = mobile_config();
        config.limits.max_displays = 2;
        config.limits.show_again_after_seconds = 1.0;
        config.mobile.fast_scroll_top_enabled = false;
        let h = start(SimulatedPage::mobile(metrics()), config);
        let registered = h.page.listener_count();
        drop(h.disposer);

        h.page.scroll_to(7500.0);
        h.page.fire(EventTarget::Window, EventKind::Scroll);
        sleep(Duration::from_millis(200)).await;
        assert_eq!(*h.causes.lock(), vec![Cause::ScrollBottom]);
        assert_eq!(h.page.listener_count(), registered);

        sleep(Duration::from_secs(2)).await;
        h.page.fire(EventTarget::Window, EventKind::Blur);
        assert_eq!(*h.causes.lock(), vec![Cause::ScrollBottom, Cause::Blur]);

        // Лимит исчерпан: снято всё, включая слушатели watchdog
        assert_eq!(h.page.listener_count(), 0);
        assert_eq!(h.page.removals(), registered);
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_disposer_keeps_inactivity_rearming() {
        let mut config = Config::default();
        config.inactivity.desktop_seconds = 5.0;
        let h = start(SimulatedPage::desktop(metrics()), config);
        drop(h.disposer);

        sleep(Duration::from_secs(4)).await;
        h.page.fire(EventTarget::Window, EventKind::MouseMove);
        sleep(Duration::from_secs(4)).await;
        assert!(h.causes.lock().is_empty());

        sleep(Duration::from_millis(1100)).await;
        assert_eq!(*h.causes.lock(), vec![Cause::Inactivity]);
    }

    #[tokio::test(start_paused = true)]
    async fn instances_on_one_page_are_independent() {
        let page = Arc::new(SimulatedPage::desktop(metrics()));

        let first = Arc::new(Mutex::new(Vec::new()));
        let sink = first.clone();
        let mut config = Config::default();
        config.limits.max_displays = 1;
        let first_disposer =
            ExitIntent::start(page.clone(), config, move |cause| sink.lock().push(cause)).unwrap();

        let second = Arc::new(Mutex::new(Vec::new()));
        let sink = second.clone();
        let mut config = Config::default();
        config.limits.show_again_after_seconds = 1.0;
        let second_disposer =
            ExitIntent::start(page.clone(), config, move |cause| sink.lock().push(cause)).unwrap();

        page.fire(EventTarget::Body, EventKind::MouseLeave);
        assert!(first_disposer.is_disposed());
        assert!(!second_disposer.is_disposed());
        assert_eq!(page.listener_count(), 4);

        sleep(Duration::from_secs(2)).await;
        page.fire(EventTarget::Body, EventKind::MouseLeave);

        assert_eq!(first.lock().len(), 1);
        assert_eq!(second.lock().len(), 2);
        assert_eq!(first_disposer.displays(), 1);
        assert_eq!(second_disposer.displays(), 2);
    }
}
