use crate::error::{ExitIntentError, Result};
use crate::events::{EventKind, EventOrigin, EventTarget, PageEvent, PageMetrics};
use crate::exit_intent_error;
use crate::host::SimulatedPage;
use crate::services::platform::{Platform, TouchCapabilities};
use anyhow::Context;
use figment::{
    providers::{Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::time::{sleep_until, Instant};
use tracing::info;

/// Записанная последовательность действий пользователя для прогона
/// движка на симулированной странице.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Scenario {
    pub name: String,
    /// `None`: платформа определяется по признакам сенсорного ввода страницы
    pub platform: Option<Platform>,
    pub page: PageSetup,
    /// Сколько ждать после последнего шага, чтобы дать сработать таймерам
    pub tail_ms: u64,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PageSetup {
    pub viewport_height: f64,
    pub document_height: f64,
    pub scroll_y: f64,
    pub touch: TouchCapabilities,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Step {
    /// Смещение от начала прогона, мс
    pub at_ms: u64,
    pub action: Action,
    /// Позиция прокрутки, применяемая перед событием
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Action {
    Scroll,
    MouseMove,
    Wheel,
    MouseLeave,
    /// mouseleave, сгенерированный скриптом, а не указателем
    SyntheticMouseLeave,
    Blur,
    TouchStart,
    TouchMove,
    TouchEnd,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            name: "unnamed".to_string(),
            platform: None,
            page: PageSetup::default(),
            tail_ms: 1000,
            steps: Vec::new(),
        }
    }
}

impl Default for PageSetup {
    fn default() -> Self {
        Self {
            viewport_height: 800.0,
            document_height: 4000.0,
            scroll_y: 0.0,
            touch: TouchCapabilities::none(),
        }
    }
}

impl Action {
    pub fn event(&self) -> (EventTarget, PageEvent) {
        let (target, kind, origin) = match self {
            Action::Scroll => (EventTarget::Window, EventKind::Scroll, EventOrigin::Synthetic),
            Action::MouseMove => (EventTarget::Window, EventKind::MouseMove, EventOrigin::Mouse),
            Action::Wheel => (EventTarget::Window, EventKind::Wheel, EventOrigin::Mouse),
            Action::MouseLeave => (EventTarget::Body, EventKind::MouseLeave, EventOrigin::Mouse),
            Action::SyntheticMouseLeave => {
                (EventTarget::Body, EventKind::MouseLeave, EventOrigin::Synthetic)
            }
            Action::Blur => (EventTarget::Window, EventKind::Blur, EventOrigin::Synthetic),
            Action::TouchStart => (EventTarget::Body, EventKind::TouchStart, EventOrigin::Touch),
            Action::TouchMove => (EventTarget::Body, EventKind::TouchMove, EventOrigin::Touch),
            Action::TouchEnd => (EventTarget::Body, EventKind::TouchEnd, EventOrigin::Touch),
        };
        (target, PageEvent::new(kind, origin))
    }

    fn bubbles(&self) -> bool {
        matches!(self, Action::TouchStart | Action::TouchMove | Action::TouchEnd)
    }
}

impl Scenario {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(exit_intent_error!(scenario, "файл сценария не найден: {:?}", path));
        }

        let scenario: Scenario = Figment::from(Toml::file(path))
            .extract()
            .with_context(|| format!("Не удалось прочитать сценарий {:?}", path))?;
        scenario.validated()
    }

    pub fn from_toml(source: &str) -> Result<Self> {
        let scenario: Scenario = Figment::from(Toml::string(source))
            .extract()
            .context("Не удалось разобрать сценарий")?;
        scenario.validated()
    }

    /// Проверка и упорядочивание шагов по времени (стабильно)
    fn validated(mut self) -> Result<Self> {
        if !(self.page.viewport_height > 0.0 && self.page.document_height > 0.0) {
            return Err(ExitIntentError::Scenario(
                "высота окна и документа должны быть положительными".to_string(),
            ));
        }

        for (index, step) in self.steps.iter().enumerate() {
            if step.action == Action::Scroll && step.y.is_none() {
                return Err(exit_intent_error!(scenario, "шаг #{}: scroll без позиции y", index));
            }
            if step.y.is_some_and(|y| !y.is_finite() || y < 0.0) {
                return Err(exit_intent_error!(scenario, "шаг #{}: некорректная позиция y", index));
            }
        }

        self.steps.sort_by_key(|step| step.at_ms);
        Ok(self)
    }

    /// Платформа сценария: явная или по признакам сенсорного ввода
    pub fn touch_capabilities(&self) -> TouchCapabilities {
        match self.platform {
            Some(Platform::Mobile) => TouchCapabilities::touchscreen(),
            Some(Platform::Desktop) => TouchCapabilities::none(),
            None => self.page.touch,
        }
    }

    pub fn build_page(&self) -> SimulatedPage {
        let metrics = PageMetrics::new(self.page.viewport_height, self.page.document_height)
            .with_scroll(self.page.scroll_y);
        SimulatedPage::new(metrics, self.touch_capabilities())
    }

    /// Общая длительность прогона
    pub fn duration(&self) -> Duration {
        let last = self.steps.last().map_or(0, |step| step.at_ms);
        Duration::from_millis(last + self.tail_ms)
    }

    /// Проиграть шаги на часах tokio. Возвращает число доставленных событий.
    pub async fn replay(&self, page: &SimulatedPage) -> usize {
        let started = Instant::now();
        let mut delivered = 0;

        for step in &self.steps {
            sleep_until(started + Duration::from_millis(step.at_ms)).await;

            if let Some(y) = step.y {
                page.scroll_to(y);
            }

            let (target, event) = step.action.event();
            let listeners = if step.action.bubbles() {
                page.bubble(event)
            } else {
                page.dispatch(target, event)
            };
            trace_if_enabled!("[{}мс] {} -> слушателей: {}", step.at_ms, event, listeners);
            delivered += listeners;
        }

        sleep_until(started + self.duration()).await;
        info!(
            "Сценарий '{}' завершён: шагов {}, доставлено событий {}",
            self.name,
            self.steps.len(),
            delivered
        );
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::events::Cause;
    use crate::host::Page;
    use crate::services::ExitIntent;
    use parking_lot::Mutex;
    use std::sync::Arc;

    const MOBILE_SCENARIO: &str = r#"
        name = "fast-scroll"
        platform = "mobile"
        tail_ms = 500

        [page]
        viewport_height = 800
        document_height = 8000
        scroll_y = 6000

        [[steps]]
        at_ms = 1000
        action = "touch-end"
        y = 50

        [[steps]]
        at_ms = 800
        action = "touch-start"
    "#;

    #[test]
    fn parses_and_orders_steps() {
        let scenario = Scenario::from_toml(MOBILE_SCENARIO).unwrap();

        assert_eq!(scenario.platform, Some(Platform::Mobile));
        assert_eq!(scenario.page.document_height, 8000.0);
        assert_eq!(scenario.steps[0].action, Action::TouchStart);
        assert_eq!(scenario.steps[1].y, Some(50.0));
        assert_eq!(scenario.duration(), Duration::from_millis(1500));
        assert_eq!(scenario.build_page().platform(), Platform::Mobile);
    }

    #[test]
    fn scroll_without_position_is_rejected() {
        let result = Scenario::from_toml(
            r#"
            [[steps]]
            at_ms = 0
            action = "scroll"
            "#,
        );
        assert!(matches!(result, Err(ExitIntentError::Scenario(_))));
    }

    #[test]
    fn unknown_action_is_rejected() {
        let result = Scenario::from_toml(
            r#"
            [[steps]]
            at_ms = 0
            action = "keypress"
            "#,
        );
        assert!(matches!(result, Err(ExitIntentError::Config(_))));
    }

    #[test]
    fn synthetic_mouse_leave_is_not_from_mouse() {
        let (target, event) = Action::SyntheticMouseLeave.event();
        assert_eq!(target, EventTarget::Body);
        assert!(!event.is_from_mouse());
        assert!(Action::MouseLeave.event().1.is_from_mouse());
    }

    #[tokio::test(start_paused = true)]
    async fn replay_drives_engine_on_tokio_clock() {
        let scenario = Scenario::from_toml(MOBILE_SCENARIO).unwrap();
        let page = Arc::new(scenario.build_page());

        let mut config = Config::default();
        config.mobile.fast_scroll_top_enabled = true;
        let causes = Arc::new(Mutex::new(Vec::new()));
        let sink = causes.clone();
        let disposer =
            ExitIntent::start(page.clone(), config, move |cause| sink.lock().push(cause)).unwrap();

        let started = Instant::now();
        let delivered = scenario.replay(&page).await;

        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(1500) && elapsed < Duration::from_millis(1510));
        // touchstart: body (watchdog) + window (стратегия), touchend так же
        assert_eq!(delivered, 4);
        assert_eq!(*causes.lock(), vec![Cause::FastScrollTop]);
        disposer.dispose();
    }
}
