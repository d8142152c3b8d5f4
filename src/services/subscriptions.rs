use crate::events::{EventKind, EventTarget, PageEvent};
use crate::host::{ListenerId, Page};
use crate::services::throttle::{Cancel, Edge, Throttle};
use parking_lot::Mutex;
use smallvec::SmallVec;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Запись о регистрации: по ней слушатель снимается ровно один раз
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registration {
    pub target: EventTarget,
    pub kind: EventKind,
    pub id: ListenerId,
}

/// Всё, что компонент зарегистрировал на странице: слушатели, их throttle
/// и отложенные задачи. `dispose()` снимает это целиком и повторно не делает ничего.
pub struct Subscriptions {
    owner: &'static str,
    page: Arc<dyn Page>,
    runtime: Handle,
    debug: bool,
    state: Mutex<SubscriptionState>,
}

#[derive(Default)]
struct SubscriptionState {
    registrations: SmallVec<[Registration; 4]>,
    throttles: Vec<Box<dyn Cancel>>,
    timers: Vec<JoinHandle<()>>,
    disposed: bool,
}

impl Subscriptions {
    pub fn new(owner: &'static str, page: Arc<dyn Page>, runtime: Handle, debug: bool) -> Self {
        Self {
            owner,
            page,
            runtime,
            debug,
            state: Mutex::new(SubscriptionState::default()),
        }
    }

    pub fn page(&self) -> &Arc<dyn Page> {
        &self.page
    }

    /// Подписка без ограничения частоты
    pub fn listen<F>(&self, target: EventTarget, kind: EventKind, handler: F) -> Option<Registration>
    where
        F: Fn(&PageEvent) + Send + Sync + 'static,
    {
        let mut state = self.state.lock();
        if state.disposed {
            return None;
        }

        let id = self.page.add_listener(target, kind, Arc::new(handler));
        let registration = Registration { target, kind, id };
        state.registrations.push(registration);
        debug_if_enabled!(self.debug, "[{}] подписка на {} ({})", self.owner, kind, target);
        Some(registration)
    }

    /// Подписка через собственный throttle (leading + trailing)
    pub fn listen_throttled<F>(
        &self,
        target: EventTarget,
        kind: EventKind,
        interval: Duration,
        handler: F,
    ) -> Option<Registration>
    where
        F: Fn(PageEvent) + Send + Sync + 'static,
    {
        let throttle = Throttle::new(interval, Edge::LeadingAndTrailing, self.runtime.clone(), handler);
        let wrapper = throttle.clone();
        let registration = self.listen(target, kind, move |event| {
            wrapper.call(*event);
        })?;

        self.state.lock().throttles.push(Box::new(throttle));
        Some(registration)
    }

    /// Отложенная задача, которая будет прервана при teardown
    pub fn schedule<Fut>(&self, delay: Duration, task: Fut)
    where
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut state = self.state.lock();
        if state.disposed {
            return;
        }

        state.timers.retain(|handle| !handle.is_finished());
        state.timers.push(self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            task.await;
        }));
    }

    pub fn len(&self) -> usize {
        self.state.lock().registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_disposed(&self) -> bool {
        self.state.lock().disposed
    }

    /// Снять все слушатели, отменить throttle и таймеры.
    /// Возвращает число реально снятых слушателей.
    pub fn dispose(&self) -> usize {
        let (registrations, throttles, timers) = {
            let mut state = self.state.lock();
            if state.disposed {
                return 0;
            }
            state.disposed = true;
            (
                std::mem::take(&mut state.registrations),
                std::mem::take(&mut state.throttles),
                std::mem::take(&mut state.timers),
            )
        };

        for throttle in &throttles {
            throttle.cancel();
        }
        for timer in timers {
            timer.abort();
        }

        let removed = registrations
            .iter()
            .filter(|r| self.page.remove_listener(r.target, r.kind, r.id))
            .count();

        debug_if_enabled!(self.debug, "[{}] снято слушателей: {}", self.owner, removed);
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::PageMetrics;
    use crate::host::SimulatedPage;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::sleep;

    fn setup() -> (Arc<SimulatedPage>, Subscriptions) {
        let page = Arc::new(SimulatedPage::desktop(PageMetrics::new(800.0, 2000.0)));
        let subs = Subscriptions::new("test", page.clone(), Handle::current(), true);
        (page, subs)
    }

    #[tokio::test(start_paused = true)]
    async fn dispose_removes_each_listener_once() {
        let (page, subs) = setup();
        subs.listen(EventTarget::Window, EventKind::Scroll, |_| {});
        subs.listen(EventTarget::Body, EventKind::MouseLeave, |_| {});
        assert_eq!(page.listener_count(), 2);
        assert_eq!(subs.len(), 2);

        assert_eq!(subs.dispose(), 2);
        assert_eq!(subs.dispose(), 0);
        assert_eq!(page.listener_count(), 0);
        assert_eq!(page.removals(), 2);

        // После teardown новые подписки не создаются
        assert!(subs.listen(EventTarget::Window, EventKind::Blur, |_| {}).is_none());
        assert_eq!(page.listener_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn dispose_aborts_scheduled_tasks_and_trailing_calls() {
        let (page, subs) = setup();
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = hits.clone();
        subs.listen_throttled(
            EventTarget::Window,
            EventKind::MouseMove,
            Duration::from_millis(200),
            move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            },
        );
        let counter = hits.clone();
        subs.schedule(Duration::from_millis(100), async move {
            counter.fetch_add(100, Ordering::SeqCst);
        });

        page.fire(EventTarget::Window, EventKind::MouseMove);
        page.fire(EventTarget::Window, EventKind::MouseMove);
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        subs.dispose();
        sleep(Duration::from_secs(1)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
