//! Conditional logging macros gated on a module-level `ENABLE_LOGS` flag.
//!
//! Usage:
//! ```ignore
//! // Declare the flag in the module that logs:
//! const ENABLE_LOGS: bool = true;
//!
//! // The macros live at the crate root:
//! use crate::{log_error, log_info, log_warn};
//!
//! log_info!("Vault opened at {}", path.display());
//! ```
//!
//! `log::debug!` and `log::trace!` are used directly; `RUST_LOG` filters them.

/// Macro for conditional info logging.
/// Reads `ENABLE_LOGS` from the calling module.
///
/// The calling module must declare:
/// ```ignore
/// const ENABLE_LOGS: bool = true; // or false
/// ```
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::info!($($arg)*);
        }
    };
}

/// Macro for conditional warn logging.
/// Reads `ENABLE_LOGS` from the calling module.
///
/// The calling module must declare:
/// ```ignore
/// const ENABLE_LOGS: bool = true; // or false
/// ```
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::warn!($($arg)*);
        }
    };
}

/// Macro for conditional error logging.
/// Reads `ENABLE_LOGS` from the calling module.
///
/// The calling module must declare:
/// ```ignore
/// const ENABLE_LOGS: bool = true; // or false
/// ```
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::error!($($arg)*);
        }
    };
}

#[cfg(test)]
mod tests {
    mod silenced {
        const ENABLE_LOGS: bool = false;

        #[test]
        fn gated_macros_skip_their_arguments() {
            let mut evaluated = false;
            let mut touch = || {
                evaluated = true;
                "vault"
            };
            crate::log_info!("opened {}", touch());
            crate::log_warn!("odd {}", touch());
            crate::log_error!("failed {}", touch());
            assert!(!evaluated);
        }
    }

    mod enabled {
        const ENABLE_LOGS: bool = true;

        #[test]
        fn enabled_macros_format_their_arguments() {
            log::set_max_level(log::LevelFilter::Trace);
            let mut calls = 0;
            let mut touch = || {
                calls += 1;
                calls
            };
            crate::log_info!("opened {}", touch());
            crate::log_warn!("odd {}", touch());
            crate::log_error!("failed {}", touch());
            assert_eq!(calls, 3);
        }
    }
}
