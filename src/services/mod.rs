pub mod display_gate;
pub mod exit_intent;
pub mod platform;
pub mod strategies;
pub mod subscriptions;
pub mod throttle;
pub mod watchdog;

pub use display_gate::{DisplayGate, ExitIntentCallback};
pub use exit_intent::{Disposer, ExitIntent};
pub use platform::{Platform, TouchCapabilities};
pub use subscriptions::{Registration, Subscriptions};
pub use throttle::{Cancel, Edge, Throttle};
pub use watchdog::InactivityWatchdog;
