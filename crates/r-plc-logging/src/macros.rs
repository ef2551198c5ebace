//! ---
//! plc_section: "03-logging"
//! plc_subsection: "module"
//! plc_type: "source"
//! plc_scope: "code"
//! plc_description: "Level macros over LogContext."
//! plc_version: "v0.0.0-prealpha"
//! plc_owner: "tbd"
//! ---
//! `plc_debug!`, `plc_info!` and `plc_warn!` take an optional leading
//! `context = <LogContext>` followed by format arguments.

#[doc(hidden)]
#[macro_export]
macro_rules! __plc_event {
    ($level:expr, context = $ctx:expr, $($arg:tt)+) => {{
        let ctx: $crate::LogContext<'_> = $ctx;
        $crate::__tracing::event!(
            $level,
            site = ctx.site.unwrap_or_default(),
            component = ctx.component.unwrap_or_default(),
            tick = ctx.tick.unwrap_or_default(),
            message = %format_args!($($arg)+)
        );
    }};
    ($level:expr, $($arg:tt)+) => {
        $crate::__plc_event!($level, context = $crate::LogContext::new(), $($arg)+)
    };
}

/// Debug event with plant context.
#[macro_export]
macro_rules! plc_debug {
    ($($arg:tt)+) => {
        $crate::__plc_event!($crate::__tracing::Level::DEBUG, $($arg)+)
    };
}

/// Info event with plant context.
#[macro_export]
macro_rules! plc_info {
    ($($arg:tt)+) => {
        $crate::__plc_event!($crate::__tracing::Level::INFO, $($arg)+)
    };
}

/// Warning with plant context.
#[macro_export]
macro_rules! plc_warn {
    ($($arg:tt)+) => {
        $crate::__plc_event!($crate::__tracing::Level::WARN, $($arg)+)
    };
}
