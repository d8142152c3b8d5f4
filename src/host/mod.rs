//! Host: граница между движком и страницей
//!
//! Движок не знает ничего о DOM. Всё, что ему нужно от окружения, описано
//! трейтом [`Page`]: регистрация/снятие слушателей, метрики прокрутки и
//! признаки сенсорного ввода. Таймеры движок планирует сам через tokio.

mod simulated;

pub use simulated::SimulatedPage;

use crate::events::{EventKind, EventTarget, PageEvent, PageMetrics};
use crate::services::platform::{Platform, TouchCapabilities};
use std::fmt;
use std::sync::Arc;

/// Обработчик события. Вызывается синхронно внутри dispatch хоста.
pub type Listener = Arc<dyn Fn(&PageEvent) + Send + Sync>;

/// Идентификатор зарегистрированного слушателя
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

pub trait Page: Send + Sync {
    fn add_listener(&self, target: EventTarget, kind: EventKind, listener: Listener) -> ListenerId;

    /// Возвращает `false`, если слушатель уже снят
    fn remove_listener(&self, target: EventTarget, kind: EventKind, id: ListenerId) -> bool;

    fn metrics(&self) -> PageMetrics;

    fn touch_capabilities(&self) -> TouchCapabilities;

    /// Классификация платформы. Реализации должны вычислять её один раз
    /// и дальше возвращать то же значение.
    fn platform(&self) -> Platform {
        Platform::classify(&self.touch_capabilities())
    }
}
