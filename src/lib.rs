#![doc(test(attr(deny(warnings))))]

//! Ekami Auto: the terminal front end over the repair-intake wizard, blog
//! comment threads, the loyalty programme and the trade-in estimator.
//!
//! Business rules live in `ekami-core`; this crate wires them to on-disk
//! storage, configuration and an interactive shell.

pub mod cli;
pub mod utils;

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Installs the tracing subscriber once per process.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::info!(version = env!("CARGO_PKG_VERSION"), "Ekami Auto tracing initialized");
    });
}

#[cfg(test)]
mod tests {
    #[test]
    fn init_can_run_twice() {
        super::init();
        super::init();
    }
}
