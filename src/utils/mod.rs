// Макросы условного логирования.
//
// Диагностика движка включается флагом `debug` конкретного экземпляра:
// без него сообщения не формируются вовсе, даже при уровне DEBUG.
#[macro_export]
macro_rules! debug_if_enabled {
    ($enabled:expr, $($arg:tt)+) => {
        if $enabled && tracing::enabled!(target: "exit_intent", tracing::Level::DEBUG) {
            tracing::debug!(target: "exit_intent", $($arg)+);
        }
    };
}

#[macro_export]
macro_rules! trace_if_enabled {
    ($($arg:tt)*) => {
        if tracing::enabled!(tracing::Level::TRACE) {
            tracing::trace!($($arg)*);
        }
    };
}
