use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};

/// Какие вызовы внутри окна исполняются
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    /// Только первый вызов окна, остальные отбрасываются
    Leading,
    /// Первый вызов сразу, последний из отброшенных в конце окна
    LeadingAndTrailing,
}

/// Объект, который можно навсегда выключить при teardown
pub trait Cancel: Send + Sync {
    fn cancel(&self);
}

/// Ограничитель частоты: функция исполняется не чаще одного раза за `interval`.
/// Состояние окна у каждого экземпляра своё.
pub struct Throttle<A> {
    inner: Arc<Inner<A>>,
}

struct Inner<A> {
    interval: Duration,
    edge: Edge,
    runtime: Handle,
    func: Box<dyn Fn(A) + Send + Sync>,
    state: Mutex<State<A>>,
}

struct State<A> {
    window_start: Option<Instant>,
    pending: Option<A>,
    trailing: Option<JoinHandle<()>>,
    cancelled: bool,
}

impl<A> Clone for Throttle<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A: Send + 'static> Throttle<A> {
    pub fn new<F>(interval: Duration, edge: Edge, runtime: Handle, func: F) -> Self
    where
        F: Fn(A) + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(Inner {
                interval,
                edge,
                runtime,
                func: Box::new(func),
                state: Mutex::new(State {
                    window_start: None,
                    pending: None,
                    trailing: None,
                    cancelled: false,
                }),
            }),
        }
    }

    /// Возвращает `true`, если функция исполнена прямо сейчас
    pub fn call(&self, arg: A) -> bool {
        let now = Instant::now();
        {
            let mut state = self.inner.state.lock();
            if state.cancelled {
                return false;
            }

            let open_window = state
                .window_start
                .filter(|start| now < *start + self.inner.interval);

            if let Some(start) = open_window {
                if self.inner.edge == Edge::LeadingAndTrailing {
                    state.pending = Some(arg);
                    if state.trailing.is_none() {
                        let deadline = start + self.inner.interval;
                        let weak: Weak<Inner<A>> = Arc::downgrade(&self.inner);
                        state.trailing = Some(self.inner.runtime.spawn(async move {
                            sleep_until(deadline).await;
                            if let Some(inner) = weak.upgrade() {
                                inner.flush();
                            }
                        }));
                    }
                }
                return false;
            }

            state.window_start = Some(now);
        }

        // Функция вызывается без удержания блокировки: она может отменить
        // этот же throttle.
        (self.inner.func)(arg);
        true
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.state.lock().cancelled
    }

    pub fn interval(&self) -> Duration {
        self.inner.interval
    }
}

impl<A> Inner<A> {
    fn flush(&self) {
        let arg = {
            let mut state = self.state.lock();
            state.trailing = None;
            if state.cancelled {
                return;
            }
            match state.pending.take() {
                Some(arg) => {
                    state.window_start = Some(Instant::now());
                    arg
                }
                None => return,
            }
        };
        (self.func)(arg);
    }
}

impl<A: Send + 'static> Cancel for Throttle<A> {
    fn cancel(&self) {
        let mut state = self.inner.state.lock();
        state.cancelled = true;
        state.pending = None;
        if let Some(handle) = state.trailing.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::sleep;

    fn recorder() -> (Arc<Mutex<Vec<u32>>>, impl Fn(u32) + Send + Sync + 'static) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let sink = calls.clone();
        (calls, move |n| sink.lock().push(n))
    }

    #[tokio::test(start_paused = true)]
    async fn leading_only_drops_calls_inside_window() {
        let (calls, func) = recorder();
        let throttle = Throttle::new(Duration::from_millis(100), Edge::Leading, Handle::current(), func);

        assert!(throttle.call(1));
        assert!(!throttle.call(2));
        sleep(Duration::from_millis(50)).await;
        assert!(!throttle.call(3));

        // Отброшенные вызовы не исполняются и позже
        sleep(Duration::from_millis(200)).await;
        assert_eq!(*calls.lock(), vec![1]);

        assert!(throttle.call(4));
        assert_eq!(*calls.lock(), vec![1, 4]);
    }

    #[tokio::test(start_paused = true)]
    async fn trailing_fires_last_call_at_window_end() {
        let (calls, func) = recorder();
        let throttle = Throttle::new(
            Duration::from_millis(100),
            Edge::LeadingAndTrailing,
            Handle::current(),
            func,
        );

        throttle.call(1);
        sleep(Duration::from_millis(30)).await;
        throttle.call(2);
        sleep(Duration::from_millis(30)).await;
        throttle.call(3);
        assert_eq!(*calls.lock(), vec![1]);

        sleep(Duration::from_millis(50)).await;
        assert_eq!(*calls.lock(), vec![1, 3]);

        // Trailing вызов открыл новое окно
        assert!(!throttle.call(4));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_discards_pending_trailing_call() {
        let (calls, func) = recorder();
        let throttle = Throttle::new(
            Duration::from_millis(100),
            Edge::LeadingAndTrailing,
            Handle::current(),
            func,
        );

        throttle.call(1);
        throttle.call(2);
        throttle.cancel();
        assert!(throttle.is_cancelled());

        sleep(Duration::from_millis(500)).await;
        assert!(!throttle.call(3));
        assert_eq!(*calls.lock(), vec![1]);
    }

    #[tokio::test(start_paused = true)]
    async fn instances_do_not_share_windows() {
        let hits = Arc::new(AtomicUsize::new(0));
        let make = || {
            let hits = hits.clone();
            Throttle::new(Duration::from_secs(1), Edge::Leading, Handle::current(), move |_: ()| {
                hits.fetch_add(1, Ordering::Relaxed);
            })
        };
        let first = make();
        let second = make();

        assert!(first.call(()));
        assert!(second.call(()));
        assert!(!first.call(()));
        assert_eq!(hits.load(Ordering::Relaxed), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_interval_never_throttles() {
        let (calls, func) = recorder();
        let throttle = Throttle::new(Duration::ZERO, Edge::Leading, Handle::current(), func);

        for n in 0..5 {
            assert!(throttle.call(n));
        }
        assert_eq!(calls.lock().len(), 5);
    }
}
