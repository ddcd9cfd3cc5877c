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

//! Raw transport driver contract.

use crate::address::Address;
use crate::transport::error::TransportError;
use async_trait::async_trait;
use tokio::sync::mpsc::Receiver;

/// Number of accepted-but-unclaimed inbound connections a listener buffers.
pub(crate) const INCOMING_BACKLOG: usize = 64;

/// Runtime context handed to every driver constructor.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DriverContext {
    system_name: String,
}

impl DriverContext {
    pub fn new(system_name: &str) -> Self {
        Self {
            system_name: system_name.to_string(),
        }
    }

    pub fn system_name(&self) -> &str {
        &self.system_name
    }
}

/// A bound listener: its bindable address and the stream of accepted connections.
pub struct Listener {
    pub address: Address,
    pub incoming: Receiver<Box<dyn Connection>>,
}

/// One exclusive, frame-oriented, bidirectional connection.
#[async_trait]
pub trait Connection: Send {
    /// Writes one frame. A frame over the connection's size limit fails with
    /// [`TransportError::FrameTooLarge`] before any byte is written, and the
    /// connection stays usable.
    async fn write_frame(&mut self, frame: &[u8]) -> Result<(), TransportError>;

    /// Reads the next frame. `Ok(None)` means the peer closed the connection cleanly.
    ///
    /// Must be cancel safe: dropping the future before it resolves loses no data.
    async fn read_frame(&mut self) -> Result<Option<Vec<u8>>, TransportError>;

    async fn close(&mut self);
}

///
/// A [`TransportDriver`] binds one wire protocol: it listens on a local address and
/// opens outbound connections to remote addresses. Drivers know nothing about
/// handshakes; the protocol wrapper layers those on top.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use endpoint_remoting::{Address, Connection, Listener, TransportDriver, TransportError};
///
/// struct UnreachableDriver;
///
/// #[async_trait]
/// impl TransportDriver for UnreachableDriver {
///     fn scheme(&self) -> &str {
///         "void"
///     }
///
///     async fn listen(&self) -> Result<Listener, TransportError> {
///         Err(TransportError::NotListening)
///     }
///
///     async fn connect(&self, remote: &Address) -> Result<Box<dyn Connection>, TransportError> {
///         Err(TransportError::ConnectionRefused(remote.to_string()))
///     }
///
///     async fn shutdown(&self) {}
/// }
/// ```
#[async_trait]
pub trait TransportDriver: Send + Sync {
    /// Raw scheme of the wire protocol, e.g. `tcp`.
    fn scheme(&self) -> &str;

    async fn listen(&self) -> Result<Listener, TransportError>;

    async fn connect(&self, remote: &Address) -> Result<Box<dyn Connection>, TransportError>;

    async fn shutdown(&self);
}
