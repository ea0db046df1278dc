//! Logging host function implementation.
//!
//! The SSR bundle may import `env.log` to report what it is doing (which
//! route matched, which upstream fetch failed). Entries are kept on the
//! render's [`RenderContext`] and mirrored to `tracing`.

use crag_edge_core::store::{LogLevel, RenderContext};
use tracing::{debug, error, info, warn};

/// Host implementation for the logging interface.
pub struct LoggingHost;

impl LoggingHost {
    /// Log a message at the specified level.
    ///
    /// # Arguments
    ///
    /// * `ctx` - The render context to store logs in
    /// * `level` - The log level
    /// * `message` - The log message
    ///
    /// Once the render has hit its entry cap, further messages are only
    /// counted, not traced.
    pub fn log(ctx: &mut RenderContext, level: LogLevel, message: &str) {
        if ctx.logs_full() {
            ctx.log(level, String::new());
            return;
        }

        let request_id = ctx.request_id.as_str();
        match level {
            LogLevel::Debug => debug!(request_id, guest_log = true, "{}", message),
            LogLevel::Info => info!(request_id, guest_log = true, "{}", message),
            LogLevel::Warn => warn!(request_id, guest_log = true, "{}", message),
            LogLevel::Error => error!(request_id, guest_log = true, "{}", message),
        }

        ctx.log(level, message.to_string());
    }
}

/// Convert a numeric log level to [`LogLevel`].
///
/// 0=debug, 1=info, 2=warn, 3=error; anything else is treated as info.
pub fn level_from_i32(level: i32) -> LogLevel {
    match level {
        0 => LogLevel::Debug,
        2 => LogLevel::Warn,
        3 => LogLevel::Error,
        _ => LogLevel::Info,
    }
}
