use crate::error::{ExitIntentError, Result};
use anyhow::Context;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment, Provider,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::services::platform::Platform;

/// Конфигурация детектора. Неизменяема после построения экземпляра:
/// стратегии получают её через `Arc` и только читают.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Диагностические сообщения движка (каналы tracing, уровень DEBUG)
    pub debug: bool,
    /// Общий throttle для слушателей активности, мс
    pub event_throttle_ms: u64,
    pub limits: LimitsConfig,
    pub inactivity: InactivityConfig,
    pub desktop: DesktopConfig,
    pub mobile: MobileConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_displays: u32,
    pub show_again_after_seconds: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct InactivityConfig {
    pub desktop_enabled: bool,
    pub desktop_seconds: f64,
    pub mobile_enabled: bool,
    pub mobile_seconds: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DesktopConfig {
    pub mouse_leave_enabled: bool,
    pub mouse_leave_throttle_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MobileConfig {
    pub blur_enabled: bool,
    pub scroll_bottom_enabled: bool,
    pub scroll_bottom_offset_px: f64,
    /// Минимальная высота документа, при которой включаются scroll-стратегии
    pub min_document_height_px: f64,
    pub fast_scroll_top_enabled: bool,
    /// Доля высоты документа, ниже которой должен начаться жест
    pub fast_scroll_top_start_depth: f64,
    pub fast_scroll_top_max_seconds: f64,
    /// Пауза после scroll/touchend перед чтением позиции прокрутки
    pub settle_delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            debug: false,
            event_throttle_ms: 200,
            limits: LimitsConfig::default(),
            inactivity: InactivityConfig::default(),
            desktop: DesktopConfig::default(),
            mobile: MobileConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_displays: 99999,
            show_again_after_seconds: 10.0,
        }
    }
}

impl Default for InactivityConfig {
    fn default() -> Self {
        Self {
            desktop_enabled: true,
            desktop_seconds: 60.0,
            mobile_enabled: true,
            mobile_seconds: 40.0,
        }
    }
}

impl Default for DesktopConfig {
    fn default() -> Self {
        Self {
            mouse_leave_enabled: true,
            mouse_leave_throttle_ms: 200,
        }
    }
}

impl Default for MobileConfig {
    fn default() -> Self {
        Self {
            blur_enabled: false,
            scroll_bottom_enabled: false,
            scroll_bottom_offset_px: 200.0,
            min_document_height_px: 1000.0,
            fast_scroll_top_enabled: false,
            fast_scroll_top_start_depth: 0.5,
            fast_scroll_top_max_seconds: 2.0,
            settle_delay_ms: 100,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "compact".to_string(),
        }
    }
}

impl Config {
    /// Значения по умолчанию ← TOML файл ← переменные окружения `EXIT_INTENT_*`.
    /// Отсутствующий файл не ошибка: остаются значения по умолчанию.
    pub fn load<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let config_path = config_path.as_ref();

        let figment = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_path))
            .merge(Env::prefixed("EXIT_INTENT_").split("__"));

        let config: Config = figment
            .extract()
            .with_context(|| format!("Не удалось загрузить конфигурацию из {:?}", config_path))?;

        config.validate()?;
        Ok(config)
    }

    /// Накладывает переопределения из произвольного провайдера поверх значений
    /// по умолчанию. Неизвестные ключи игнорируются.
    pub fn from_overrides<T: Provider>(overrides: T) -> Result<Self> {
        let config: Config = Figment::from(Serialized::defaults(Config::default()))
            .merge(overrides)
            .extract()
            .context("Не удалось применить переопределения конфигурации")?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => {
                return ExitIntentError::invalid_config(format!(
                    "Неверный уровень логирования: {}",
                    other
                ))
            }
        }

        match self.logging.format.as_str() {
            "compact" | "json" => {}
            other => {
                return ExitIntentError::invalid_config(format!(
                    "Неверный формат логирования: {}",
                    other
                ))
            }
        }

        if self.limits.max_displays == 0 {
            return ExitIntentError::invalid_config("max_displays должно быть больше 0");
        }

        let durations = [
            ("limits.show_again_after_seconds", self.limits.show_again_after_seconds),
            ("inactivity.desktop_seconds", self.inactivity.desktop_seconds),
            ("inactivity.mobile_seconds", self.inactivity.mobile_seconds),
            ("mobile.fast_scroll_top_max_seconds", self.mobile.fast_scroll_top_max_seconds),
        ];
        for (name, value) in durations {
            if !value.is_finite() || value < 0.0 {
                return ExitIntentError::invalid_config(format!(
                    "{} должно быть конечным неотрицательным числом, получено {}",
                    name, value
                ));
            }
        }

        if !self.mobile.scroll_bottom_offset_px.is_finite()
            || !self.mobile.min_document_height_px.is_finite()
        {
            return ExitIntentError::invalid_config("Пиксельные параметры mobile должны быть конечными");
        }

        if !(0.0..=1.0).contains(&self.mobile.fast_scroll_top_start_depth) {
            return ExitIntentError::invalid_config(format!(
                "fast_scroll_top_start_depth должно быть в диапазоне [0, 1], получено {}",
                self.mobile.fast_scroll_top_start_depth
            ));
        }

        Ok(())
    }

    pub fn cooldown(&self) -> Duration {
        secs(self.limits.show_again_after_seconds)
    }

    pub fn event_throttle(&self) -> Duration {
        Duration::from_millis(self.event_throttle_ms)
    }

    pub fn mouse_leave_throttle(&self) -> Duration {
        Duration::from_millis(self.desktop.mouse_leave_throttle_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.mobile.settle_delay_ms)
    }

    pub fn fast_scroll_window(&self) -> Duration {
        secs(self.mobile.fast_scroll_top_max_seconds)
    }

    /// Порог бездействия для платформы. `None` означает, что триггер
    /// отключён: флагом или непозитивным порогом.
    pub fn inactivity_timeout(&self, platform: Platform) -> Option<Duration> {
        let (enabled, seconds) = match platform {
            Platform::Desktop => (self.inactivity.desktop_enabled, self.inactivity.desktop_seconds),
            Platform::Mobile => (self.inactivity.mobile_enabled, self.inactivity.mobile_seconds),
        };

        if enabled && seconds.is_finite() && seconds > 0.0 {
            Some(secs(seconds))
        } else {
            None
        }
    }
}

fn secs(value: f64) -> Duration {
    if value.is_finite() && value > 0.0 {
        Duration::from_secs_f64(value)
    } else {
        Duration::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.cooldown(), Duration::from_secs(10));
        assert_eq!(config.mouse_leave_throttle(), Duration::from_millis(200));
        assert_eq!(config.event_throttle(), Duration::from_millis(200));
    }

    #[test]
    fn test_overrides_merge_onto_defaults() {
        let overrides = Toml::string(
            r#"
            debug = true
            unknown_key = "ignored"

            [limits]
            max_displays = 3

            [mobile]
            blur_enabled = true
            "#,
        );

        let config = Config::from_overrides(overrides).unwrap();

        assert!(config.debug);
        assert_eq!(config.limits.max_displays, 3);
        // Не переопределённые поля остаются по умолчанию
        assert_eq!(config.limits.show_again_after_seconds, 10.0);
        assert!(config.mobile.blur_enabled);
        assert!(!config.mobile.scroll_bottom_enabled);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = Config::default();
        config.limits.max_displays = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.mobile.fast_scroll_top_start_depth = 1.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.inactivity.mobile_seconds = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.logging.format = "xml".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_inactivity_timeout_per_platform() {
        let mut config = Config::default();
        assert_eq!(
            config.inactivity_timeout(Platform::Desktop),
            Some(Duration::from_secs(60))
        );
        assert_eq!(
            config.inactivity_timeout(Platform::Mobile),
            Some(Duration::from_secs(40))
        );

        config.inactivity.mobile_enabled = false;
        assert_eq!(config.inactivity_timeout(Platform::Mobile), None);

        config.inactivity.desktop_seconds = 0.0;
        assert_eq!(config.inactivity_timeout(Platform::Desktop), None);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let config = Config::load("/nonexistent/exit-intent.toml").unwrap();
        assert_eq!(config.limits.max_displays, 99999);
    }
}
