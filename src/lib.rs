//! Детектор намерения покинуть страницу.
//!
//! Несколько эвристик (уход курсора за окно, бездействие, потеря фокуса,
//! прокрутка до конца, быстрый жест вверх) сводятся в один callback с
//! причиной срабатывания. Все сигналы проходят через общий лимит показов и
//! паузу между показами.
//!
//! ```no_run
//! use std::sync::Arc;
//! use exit_intent::{Config, ExitIntent, PageMetrics, SimulatedPage};
//!
//! # async fn run() -> exit_intent::Result<()> {
//! let page = Arc::new(SimulatedPage::desktop(PageMetrics::new(800.0, 4000.0)));
//! let disposer = ExitIntent::start(page, Config::default(), |cause| {
//!     println!("exit intent: {}", cause);
//! })?;
//! // ...
//! disposer.dispose();
//! # Ok(())
//! # }
//! ```

#[macro_use]
pub mod utils;

pub mod config;
pub mod error;
pub mod events;
pub mod host;
pub mod scenario;
pub mod services;

pub use config::Config;
pub use error::{ExitIntentError, Result};
pub use events::{Cause, EventKind, EventOrigin, EventTarget, PageEvent, PageMetrics};
pub use host::{Listener, ListenerId, Page, SimulatedPage};
pub use scenario::{Action, Scenario, Step};
pub use services::{Disposer, ExitIntent, ExitIntentCallback, Platform, TouchCapabilities};
