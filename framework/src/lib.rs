pub mod config;
pub mod driver;
pub mod driver_guard;
pub mod error;
pub mod head_tracker;
pub mod thor;
pub mod vendor;

use std::sync::Arc;

use log::info;

use crate::{
    config::FrameworkConfig,
    driver::Driver,
    driver_guard::{DriverGuard, ErrorHandler},
    thor::Thor,
    vendor::Vendor,
};

pub use connex_common as common;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Wrap a driver so every response is checked before being used
pub fn guard_driver(driver: Arc<dyn Driver>, on_error: Option<ErrorHandler>) -> Arc<dyn Driver> {
    match on_error {
        Some(handler) => Arc::new(DriverGuard::with_error_handler(driver, handler)),
        None => Arc::new(DriverGuard::new(driver)),
    }
}

/// Entry point: chain queries through `thor`, signing through `vendor`
///
/// Must be created from within a tokio runtime, the head tracker
/// is spawned on it right away.
pub struct Framework {
    thor: Thor,
    vendor: Vendor,
}

impl Framework {
    pub fn new(driver: Arc<dyn Driver>) -> Self {
        Self::with_config(driver, &FrameworkConfig::default())
    }

    pub fn with_config(driver: Arc<dyn Driver>, config: &FrameworkConfig) -> Self {
        let driver = if config.guard_driver {
            guard_driver(driver, None)
        } else {
            driver
        };

        let genesis = driver.genesis();
        info!("Connex framework v{} on chain {}", VERSION, genesis.id);

        Self {
            thor: Thor::new(Arc::clone(&driver), config),
            vendor: Vendor::new(driver),
        }
    }

    pub fn thor(&self) -> &Thor {
        &self.thor
    }

    pub fn vendor(&self) -> &Vendor {
        &self.vendor
    }
}
