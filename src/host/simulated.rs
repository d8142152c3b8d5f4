use crate::events::{EventKind, EventTarget, PageEvent, PageMetrics};
use crate::host::{Listener, ListenerId, Page};
use crate::services::platform::{Platform, TouchCapabilities};
use dashmap::DashMap;
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use tracing::debug;

struct Registered {
    target: EventTarget,
    kind: EventKind,
    listener: Listener,
}

/// Страница в памяти: реестр слушателей, синхронный dispatch и метрики,
/// которые выставляет владелец. Используется тестами и CLI-симулятором.
pub struct SimulatedPage {
    listeners: DashMap<ListenerId, Registered>,
    next_id: AtomicU64,
    removals: AtomicUsize,
    metrics: RwLock<PageMetrics>,
    touch: RwLock<TouchCapabilities>,
    platform: OnceCell<Platform>,
}

impl SimulatedPage {
    pub fn new(metrics: PageMetrics, touch: TouchCapabilities) -> Self {
        Self {
            listeners: DashMap::new(),
            next_id: AtomicU64::new(1),
            removals: AtomicUsize::new(0),
            metrics: RwLock::new(metrics),
            touch: RwLock::new(touch),
            platform: OnceCell::new(),
        }
    }

    pub fn desktop(metrics: PageMetrics) -> Self {
        Self::new(metrics, TouchCapabilities::none())
    }

    pub fn mobile(metrics: PageMetrics) -> Self {
        Self::new(metrics, TouchCapabilities::touchscreen())
    }

    /// Доставить событие всем слушателям цели в порядке регистрации.
    /// Слушатель, снятый во время dispatch, уже не вызывается.
    pub fn dispatch(&self, target: EventTarget, event: PageEvent) -> usize {
        let mut matching: Vec<(ListenerId, Listener)> = self
            .listeners
            .iter()
            .filter(|entry| entry.target == target && entry.kind == event.kind)
            .map(|entry| (*entry.key(), entry.listener.clone()))
            .collect();
        matching.sort_by_key(|(id, _)| *id);

        trace_if_enabled!("dispatch {} -> {}: {} слушателей", event, target, matching.len());

        let mut delivered = 0;
        for (id, listener) in matching {
            if !self.listeners.contains_key(&id) {
                continue;
            }
            listener(&event);
            delivered += 1;
        }
        delivered
    }

    /// `dispatch` с источником, естественным для типа события
    pub fn fire(&self, target: EventTarget, kind: EventKind) -> usize {
        self.dispatch(target, PageEvent::natural(kind))
    }

    /// Всплытие события из содержимого страницы: сначала `body`, затем `window`
    pub fn bubble(&self, event: PageEvent) -> usize {
        self.dispatch(EventTarget::Body, event) + self.dispatch(EventTarget::Window, event)
    }

    pub fn set_metrics(&self, metrics: PageMetrics) {
        *self.metrics.write() = metrics;
    }

    pub fn scroll_to(&self, scroll_y: f64) {
        self.metrics.write().scroll_y = scroll_y;
    }

    /// Меняет признаки сенсорного ввода. На уже вычисленную классификацию
    /// платформы не влияет.
    pub fn set_touch_capabilities(&self, touch: TouchCapabilities) {
        *self.touch.write() = touch;
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn count(&self, target: EventTarget, kind: EventKind) -> usize {
        self.listeners
            .iter()
            .filter(|entry| entry.target == target && entry.kind == kind)
            .count()
    }

    /// Сколько раз слушатель был действительно снят
    pub fn removals(&self) -> usize {
        self.removals.load(Ordering::Relaxed)
    }
}

impl Page for SimulatedPage {
    fn add_listener(&self, target: EventTarget, kind: EventKind, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.insert(id, Registered { target, kind, listener });
        debug!("Слушатель {} зарегистрирован: {} на {}", id, kind, target);
        id
    }

    fn remove_listener(&self, target: EventTarget, kind: EventKind, id: ListenerId) -> bool {
        let removed = self
            .listeners
            .remove_if(&id, |_, entry| entry.target == target && entry.kind == kind)
            .is_some();
        if removed {
            self.removals.fetch_add(1, Ordering::Relaxed);
            debug!("Слушатель {} снят: {} на {}", id, kind, target);
        }
        removed
    }

    fn metrics(&self) -> PageMetrics {
        *self.metrics.read()
    }

    fn touch_capabilities(&self) -> TouchCapabilities {
        *self.touch.read()
    }

    fn platform(&self) -> Platform {
        *self
            .platform
            .get_or_init(|| Platform::classify(&self.touch_capabilities()))
    }
}
