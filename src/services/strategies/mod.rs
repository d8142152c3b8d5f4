//! Набор стратегий: независимые эвристики, каждая со своими подписками
//! и своим throttle. Набор выбирается по платформе и флагам конфигурации;
//! все стратегии пишут в один [`DisplayGate`](crate::services::DisplayGate).

mod blur;
mod fast_scroll_top;
mod mouse_leave;
mod scroll_bottom;
mod r#trait;

pub use self::blur::BlurStrategy;
pub use self::fast_scroll_top::{FastScrollTopStrategy, NEAR_TOP_PX};
pub use self::mouse_leave::MouseLeaveStrategy;
pub use self::r#trait::{ExitStrategy, StrategyContext};
pub use self::scroll_bottom::ScrollBottomStrategy;

use crate::services::platform::Platform;
use std::sync::Arc;

/// Зарегистрировать стратегии, включённые для платформы.
/// Порядок регистрации определяет порядок dispatch при совпадении событий.
pub fn register_strategies(ctx: &StrategyContext, platform: Platform) -> Vec<Arc<dyn ExitStrategy>> {
    let mut strategies: Vec<Arc<dyn ExitStrategy>> = Vec::new();

    match platform {
        Platform::Desktop => {
            if ctx.config.desktop.mouse_leave_enabled {
                strategies.push(MouseLeaveStrategy::register(ctx));
            }
        }
        Platform::Mobile => {
            let mobile = &ctx.config.mobile;
            if mobile.blur_enabled {
                strategies.push(BlurStrategy::register(ctx));
            }
            if mobile.scroll_bottom_enabled {
                if let Some(strategy) = ScrollBottomStrategy::register(ctx) {
                    strategies.push(strategy);
                }
            }
            if mobile.fast_scroll_top_enabled {
                if let Some(strategy) = FastScrollTopStrategy::register(ctx) {
                    strategies.push(strategy);
                }
            }
        }
    }

    strategies
}
