/********************************************************************************
 * Copyright (c) 2026 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

//! Registry of named driver constructors resolved from settings.

use crate::transport::driver::{DriverContext, TransportDriver};
use crate::transport::error::DriverError;
use crate::transport::tcp::{TcpDriver, TCP_DRIVER};
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// Constructor for one driver type: `(runtime context, driver settings) -> driver`.
pub type DriverFactory = Arc<
    dyn Fn(&DriverContext, &serde_json::Value) -> Result<Arc<dyn TransportDriver>, DriverError>
        + Send
        + Sync,
>;

///
/// [`DriverRegistry`] maps a configured driver type identifier to its constructor.
/// Resolution failures surface as typed listen errors instead of lookup panics.
///
/// # Examples
///
/// ```
/// use endpoint_remoting::{DriverRegistry, LoopbackNetwork};
///
/// let mut drivers = DriverRegistry::with_defaults();
/// LoopbackNetwork::new().register_driver(&mut drivers);
///
/// assert!(drivers.contains("tcp"));
/// assert!(drivers.contains("loopback"));
/// assert!(!drivers.contains("udp"));
/// ```
#[derive(Clone, Default)]
pub struct DriverRegistry {
    factories: HashMap<String, DriverFactory>,
}

impl DriverRegistry {
    /// Creates a registry with no drivers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the built-in `tcp` driver.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(TCP_DRIVER, |context, config| {
            TcpDriver::from_settings(context, config)
                .map(|driver| Arc::new(driver) as Arc<dyn TransportDriver>)
        });
        registry
    }

    /// Registers or replaces the constructor for `driver`.
    pub fn register<F>(&mut self, driver: &str, factory: F)
    where
        F: Fn(&DriverContext, &serde_json::Value) -> Result<Arc<dyn TransportDriver>, DriverError>
            + Send
            + Sync
            + 'static,
    {
        self.factories.insert(driver.to_string(), Arc::new(factory));
    }

    pub fn contains(&self, driver: &str) -> bool {
        self.factories.contains_key(driver)
    }

    pub(crate) fn resolve(&self, driver: &str) -> Option<DriverFactory> {
        self.factories.get(driver).cloned()
    }
}

impl Debug for DriverRegistry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.factories.keys().collect();
        names.sort();
        f.debug_struct("DriverRegistry")
            .field("drivers", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::DriverRegistry;
    use crate::transport::driver::DriverContext;
    use crate::transport::error::DriverError;

    #[test]
    fn defaults_resolve_tcp_only() {
        let registry = DriverRegistry::with_defaults();

        assert!(registry.resolve("tcp").is_some());
        assert!(registry.resolve("loopback").is_none());
    }

    #[test]
    fn registered_factory_receives_context_and_settings() {
        let mut registry = DriverRegistry::new();
        registry.register("broken", |context, config| {
            Err(DriverError::InvalidSettings {
                driver: format!("broken@{}", context.system_name()),
                reason: config["why"].as_str().unwrap_or_default().to_string(),
            })
        });

        let factory = registry.resolve("broken").expect("factory registered");
        let result = factory(
            &DriverContext::new("orders"),
            &serde_json::json!({ "why": "always" }),
        );

        assert_eq!(
            result.err(),
            Some(DriverError::InvalidSettings {
                driver: "broken@orders".to_string(),
                reason: "always".to_string(),
            })
        );
    }

    #[test]
    fn debug_lists_driver_names_sorted() {
        let mut registry = DriverRegistry::with_defaults();
        registry.register("alpha", |_, _| {
            Err(DriverError::InvalidSettings {
                driver: "alpha".to_string(),
                reason: "unused".to_string(),
            })
        });

        assert_eq!(
            format!("{registry:?}"),
            r#"DriverRegistry { drivers: ["alpha", "tcp"] }"#
        );
    }
}
