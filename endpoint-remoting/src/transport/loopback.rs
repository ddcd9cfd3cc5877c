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

//! In-memory driver for in-process clusters and tests.

use crate::address::Address;
use crate::observability::events;
use crate::transport::driver::{
    Connection, DriverContext, Listener, TransportDriver, INCOMING_BACKLOG,
};
use crate::transport::driver_registry::DriverRegistry;
use crate::transport::error::{DriverError, TransportError};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::info;

pub(crate) const LOOPBACK_DRIVER: &str = "loopback";
const FIRST_EPHEMERAL_PORT: u16 = 20_000;
const COMPONENT: &str = "loopback_driver";

type ListenerKey = (String, u16);

struct LoopbackAcceptor {
    incoming: mpsc::Sender<Box<dyn Connection>>,
    maximum_frame_size: Option<usize>,
}

#[derive(Default)]
struct LoopbackState {
    listeners: HashMap<ListenerKey, LoopbackAcceptor>,
    next_port: u16,
}

impl LoopbackState {
    fn allocate_port(&mut self, host: &str) -> u16 {
        if self.next_port < FIRST_EPHEMERAL_PORT {
            self.next_port = FIRST_EPHEMERAL_PORT;
        }
        while self
            .listeners
            .contains_key(&(host.to_string(), self.next_port))
        {
            self.next_port = self.next_port.wrapping_add(1).max(FIRST_EPHEMERAL_PORT);
        }
        let port = self.next_port;
        self.next_port = self.next_port.wrapping_add(1).max(FIRST_EPHEMERAL_PORT);
        port
    }
}

///
/// [`LoopbackNetwork`] is a shared in-memory "network": loopback drivers created from
/// the same network can reach each other's listeners by `host:port`.
///
/// # Examples
///
/// ```
/// use endpoint_remoting::{DriverRegistry, LoopbackNetwork};
///
/// let network = LoopbackNetwork::new();
/// let mut drivers = DriverRegistry::new();
/// network.register_driver(&mut drivers);
///
/// assert!(drivers.contains("loopback"));
/// ```
#[derive(Clone, Default)]
pub struct LoopbackNetwork {
    state: Arc<Mutex<LoopbackState>>,
}

impl LoopbackNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the `loopback` driver type, bound to this network, in `registry`.
    pub fn register_driver(&self, registry: &mut DriverRegistry) {
        let network = self.clone();
        registry.register(LOOPBACK_DRIVER, move |context, config| {
            LoopbackDriver::from_settings(network.clone(), context, config)
                .map(|driver| Arc::new(driver) as Arc<dyn TransportDriver>)
        });
    }

    /// Returns `true` while some loopback driver listens on `host:port`.
    pub async fn is_bound(&self, host: &str, port: u16) -> bool {
        self.state
            .lock()
            .await
            .listeners
            .contains_key(&(host.to_string(), port))
    }
}

#[derive(Deserialize, Debug, Clone, Eq, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LoopbackDriverSettings {
    pub host: String,
    #[serde(default)]
    pub port: u16,
    /// Largest frame either end accepts; unlimited when absent.
    #[serde(default)]
    pub maximum_frame_size: Option<usize>,
}

pub struct LoopbackDriver {
    network: LoopbackNetwork,
    system_name: String,
    settings: LoopbackDriverSettings,
    bound: Mutex<Option<ListenerKey>>,
}

impl LoopbackDriver {
    pub fn from_settings(
        network: LoopbackNetwork,
        context: &DriverContext,
        config: &serde_json::Value,
    ) -> Result<Self, DriverError> {
        let settings: LoopbackDriverSettings =
            serde_json::from_value(config.clone()).map_err(|err| {
                DriverError::InvalidSettings {
                    driver: LOOPBACK_DRIVER.to_string(),
                    reason: err.to_string(),
                }
            })?;
        Ok(Self {
            network,
            system_name: context.system_name().to_string(),
            settings,
            bound: Mutex::new(None),
        })
    }
}

#[async_trait]
impl TransportDriver for LoopbackDriver {
    fn scheme(&self) -> &str {
        LOOPBACK_DRIVER
    }

    async fn listen(&self) -> Result<Listener, TransportError> {
        let host = self.settings.host.clone();
        let (tx, rx) = mpsc::channel(INCOMING_BACKLOG);

        let port = {
            let mut state = self.network.state.lock().await;
            let port = match self.settings.port {
                0 => state.allocate_port(&host),
                port => port,
            };
            let key = (host.clone(), port);
            if state.listeners.contains_key(&key) {
                return Err(TransportError::BindFailed {
                    address: format!("{host}:{port}"),
                    source: std::io::Error::new(
                        ErrorKind::AddrInUse,
                        "loopback address already bound",
                    ),
                });
            }
            state.listeners.insert(
                key.clone(),
                LoopbackAcceptor {
                    incoming: tx,
                    maximum_frame_size: self.settings.maximum_frame_size,
                },
            );
            *self.bound.lock().await = Some(key);
            port
        };

        let address = Address::new(LOOPBACK_DRIVER, &self.system_name, &host, port);
        info!(
            event = events::DRIVER_BOUND,
            component = COMPONENT,
            local = %address,
            "loopback driver bound"
        );

        Ok(Listener {
            address,
            incoming: rx,
        })
    }

    async fn connect(&self, remote: &Address) -> Result<Box<dyn Connection>, TransportError> {
        let (acceptor, server_limit) = self
            .network
            .state
            .lock()
            .await
            .listeners
            .get(&(remote.host().to_string(), remote.port()))
            .map(|acceptor| (acceptor.incoming.clone(), acceptor.maximum_frame_size))
            .ok_or_else(|| TransportError::ConnectionRefused(remote.to_string()))?;

        let (mut client_end, mut server_end) = LoopbackConnection::pair();
        client_end.maximum_frame_size = self.settings.maximum_frame_size;
        server_end.maximum_frame_size = server_limit;
        acceptor
            .send(Box::new(server_end))
            .await
            .map_err(|_| TransportError::ConnectionRefused(remote.to_string()))?;

        Ok(Box::new(client_end))
    }

    async fn shutdown(&self) {
        if let Some(key) = self.bound.lock().await.take() {
            self.network.state.lock().await.listeners.remove(&key);
            info!(
                event = events::DRIVER_SHUTDOWN,
                component = COMPONENT,
                host = key.0.as_str(),
                port = key.1,
                "loopback driver unbound"
            );
        }
    }
}

/// One end of an in-memory duplex connection.
pub(crate) struct LoopbackConnection {
    outbound: Option<mpsc::UnboundedSender<Vec<u8>>>,
    inbound: mpsc::UnboundedReceiver<Vec<u8>>,
    maximum_frame_size: Option<usize>,
}

impl LoopbackConnection {
    pub(crate) fn pair() -> (Self, Self) {
        let (a_tx, a_rx) = mpsc::unbounded_channel();
        let (b_tx, b_rx) = mpsc::unbounded_channel();
        (
            Self {
                outbound: Some(a_tx),
                inbound: b_rx,
                maximum_frame_size: None,
            },
            Self {
                outbound: Some(b_tx),
                inbound: a_rx,
                maximum_frame_size: None,
            },
        )
    }
}

#[async_trait]
impl Connection for LoopbackConnection {
    async fn write_frame(&mut self, frame: &[u8]) -> Result<(), TransportError> {
        if let Some(limit) = self.maximum_frame_size.filter(|limit| frame.len() > *limit) {
            return Err(TransportError::FrameTooLarge {
                size: frame.len(),
                limit,
            });
        }
        let outbound = self
            .outbound
            .as_ref()
            .ok_or(TransportError::ConnectionClosed)?;
        outbound
            .send(frame.to_vec())
            .map_err(|_| TransportError::ConnectionClosed)
    }

    async fn read_frame(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        Ok(self.inbound.recv().await)
    }

    async fn close(&mut self) {
        self.outbound = None;
        self.inbound.close();
    }
}
