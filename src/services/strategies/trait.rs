use crate::config::Config;
use crate::events::Cause;
use crate::host::Page;
use crate::services::display_gate::DisplayGate;
use crate::services::subscriptions::Subscriptions;
use std::sync::Arc;
use tokio::runtime::Handle;

/// Эвристика ухода со страницы. Стратегия владеет только своими
/// подписками и снимает ровно их.
pub trait ExitStrategy: Send + Sync {
    fn cause(&self) -> Cause;

    fn subscriptions(&self) -> &Subscriptions;

    fn listener_count(&self) -> usize {
        self.subscriptions().len()
    }

    fn dispose(&self) -> usize {
        self.subscriptions().dispose()
    }
}

/// Общие зависимости, которые контроллер передаёт каждой стратегии
#[derive(Clone)]
pub struct StrategyContext {
    pub config: Arc<Config>,
    pub page: Arc<dyn Page>,
    pub runtime: Handle,
    pub gate: Arc<DisplayGate>,
}

impl StrategyContext {
    pub fn subscriptions(&self, owner: &'static str) -> Subscriptions {
        Subscriptions::new(owner, self.page.clone(), self.runtime.clone(), self.config.debug)
    }
}
