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

//! TCP driver with u32 length-prefixed frames.

use crate::address::Address;
use crate::observability::events;
use crate::transport::driver::{
    Connection, DriverContext, Listener, TransportDriver, INCOMING_BACKLOG,
};
use crate::transport::error::{DriverError, TransportError};
use async_trait::async_trait;
use serde::Deserialize;
use std::io::ErrorKind;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub(crate) const TCP_DRIVER: &str = "tcp";
const DEFAULT_MAXIMUM_FRAME_SIZE: usize = 256 * 1024;
const LENGTH_PREFIX: usize = 4;
const ACCEPT_RETRY_BACKOFF: Duration = Duration::from_millis(100);
const COMPONENT: &str = "tcp_driver";

#[derive(Deserialize, Debug, Clone, Eq, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TcpDriverSettings {
    pub hostname: String,
    #[serde(default)]
    pub port: u16,
    #[serde(default = "default_maximum_frame_size")]
    pub maximum_frame_size: usize,
}

fn default_maximum_frame_size() -> usize {
    DEFAULT_MAXIMUM_FRAME_SIZE
}

/// Driver binding a tokio `TcpListener` and dialing peers with `TcpStream`.
pub struct TcpDriver {
    system_name: String,
    settings: TcpDriverSettings,
    accept_task: Mutex<Option<JoinHandle<()>>>,
}

impl TcpDriver {
    pub fn new(context: &DriverContext, settings: TcpDriverSettings) -> Self {
        Self {
            system_name: context.system_name().to_string(),
            settings,
            accept_task: Mutex::new(None),
        }
    }

    pub fn from_settings(
        context: &DriverContext,
        config: &serde_json::Value,
    ) -> Result<Self, DriverError> {
        let settings: TcpDriverSettings =
            serde_json::from_value(config.clone()).map_err(|err| {
                DriverError::InvalidSettings {
                    driver: TCP_DRIVER.to_string(),
                    reason: err.to_string(),
                }
            })?;
        Ok(Self::new(context, settings))
    }

    async fn accept_loop(
        listener: TcpListener,
        incoming: mpsc::Sender<Box<dyn Connection>>,
        maximum_frame_size: usize,
    ) {
        loop {
            match listener.accept().await {
                Ok((stream, peer)) => {
                    if let Err(err) = stream.set_nodelay(true) {
                        debug!(component = COMPONENT, %peer, err = %err, "unable to set TCP_NODELAY");
                    }
                    let connection: Box<dyn Connection> =
                        Box::new(TcpConnection::new(stream, maximum_frame_size));
                    if incoming.send(connection).await.is_err() {
                        debug!(
                            component = COMPONENT,
                            "incoming receiver dropped; stopping accept loop"
                        );
                        break;
                    }
                }
                Err(err) => {
                    warn!(component = COMPONENT, err = %err, "accept failed");
                    tokio::time::sleep(ACCEPT_RETRY_BACKOFF).await;
                }
            }
        }
    }
}

#[async_trait]
impl TransportDriver for TcpDriver {
    fn scheme(&self) -> &str {
        TCP_DRIVER
    }

    async fn listen(&self) -> Result<Listener, TransportError> {
        let bind_to = format!("{}:{}", self.settings.hostname, self.settings.port);
        let listener = TcpListener::bind(&bind_to)
            .await
            .map_err(|source| TransportError::BindFailed {
                address: bind_to.clone(),
                source,
            })?;
        let local = listener.local_addr()?;

        let (tx, rx) = mpsc::channel(INCOMING_BACKLOG);
        let task = tokio::spawn(Self::accept_loop(
            listener,
            tx,
            self.settings.maximum_frame_size,
        ));
        if let Some(previous) = self.accept_task.lock().await.replace(task) {
            previous.abort();
        }

        let address = Address::new(
            TCP_DRIVER,
            &self.system_name,
            &self.settings.hostname,
            local.port(),
        );
        info!(
            event = events::DRIVER_BOUND,
            component = COMPONENT,
            local = %address,
            "tcp driver bound"
        );

        Ok(Listener {
            address,
            incoming: rx,
        })
    }

    async fn connect(&self, remote: &Address) -> Result<Box<dyn Connection>, TransportError> {
        let stream = TcpStream::connect((remote.host(), remote.port()))
            .await
            .map_err(|err| match err.kind() {
                ErrorKind::ConnectionRefused => TransportError::ConnectionRefused(remote.to_string()),
                _ => TransportError::Io(err),
            })?;
        stream.set_nodelay(true)?;

        Ok(Box::new(TcpConnection::new(
            stream,
            self.settings.maximum_frame_size,
        )))
    }

    async fn shutdown(&self) {
        if let Some(task) = self.accept_task.lock().await.take() {
            task.abort();
            info!(
                event = events::DRIVER_SHUTDOWN,
                component = COMPONENT,
                "tcp driver stopped accepting"
            );
        }
    }
}

/// Frame codec over one TCP stream: big-endian u32 length followed by the frame bytes.
///
/// Reads accumulate into `buffered` so a cancelled read resumes where it stopped.
pub(crate) struct TcpConnection {
    stream: TcpStream,
    maximum_frame_size: usize,
    buffered: Vec<u8>,
}

impl TcpConnection {
    pub(crate) fn new(stream: TcpStream, maximum_frame_size: usize) -> Self {
        Self {
            stream,
            maximum_frame_size,
            buffered: Vec::new(),
        }
    }

    fn take_buffered_frame(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        let Some(prefix) = self.buffered.get(..LENGTH_PREFIX) else {
            return Ok(None);
        };
        let len = u32::from_be_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]) as usize;
        if len > self.maximum_frame_size {
            return Err(TransportError::FrameTooLarge {
                size: len,
                limit: self.maximum_frame_size,
            });
        }
        if self.buffered.len() < LENGTH_PREFIX + len {
            self.buffered.reserve(LENGTH_PREFIX + len - self.buffered.len());
            return Ok(None);
        }
        let frame = self.buffered[LENGTH_PREFIX..LENGTH_PREFIX + len].to_vec();
        self.buffered.drain(..LENGTH_PREFIX + len);
        Ok(Some(frame))
    }
}

#[async_trait]
impl Connection for TcpConnection {
    async fn write_frame(&mut self, frame: &[u8]) -> Result<(), TransportError> {
        if frame.len() > self.maximum_frame_size {
            return Err(TransportError::FrameTooLarge {
                size: frame.len(),
                limit: self.maximum_frame_size,
            });
        }
        self.stream.write_u32(frame.len() as u32).await?;
        self.stream.write_all(frame).await?;
        self.stream.flush().await?;
        Ok(())
    }

    async fn read_frame(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        loop {
            if let Some(frame) = self.take_buffered_frame()? {
                return Ok(Some(frame));
            }
            if self.stream.read_buf(&mut self.buffered).await? == 0 {
                if self.buffered.is_empty() {
                    return Ok(None);
                }
                return Err(TransportError::ConnectionClosed);
            }
        }
    }

    async fn close(&mut self) {
        let _ = self.stream.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::{TcpDriver, TcpDriverSettings, TCP_DRIVER};
    use crate::transport::driver::{DriverContext, TransportDriver};
    use crate::transport::error::{DriverError, TransportError};
    use std::time::Duration;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpStream;

    fn loopback_driver(maximum_frame_size: usize) -> TcpDriver {
        TcpDriver::new(
            &DriverContext::new("tcp-test"),
            TcpDriverSettings {
                hostname: "127.0.0.1".to_string(),
                port: 0,
                maximum_frame_size,
            },
        )
    }

    #[test]
    fn from_settings_rejects_missing_hostname() {
        let result = TcpDriver::from_settings(
            &DriverContext::new("sys"),
            &serde_json::json!({ "port": 2552 }),
        );

        assert!(matches!(
            result,
            Err(DriverError::InvalidSettings { driver, .. }) if driver == TCP_DRIVER
        ));
    }

    #[tokio::test]
    async fn frames_cross_a_real_socket_in_order() {
        let driver = loopback_driver(1024);
        let mut listener = driver.listen().await.expect("bind on ephemeral port");

        assert_eq!(listener.address.protocol(), TCP_DRIVER);
        assert_eq!(listener.address.system(), "tcp-test");
        assert_ne!(listener.address.port(), 0);

        let mut outbound = driver
            .connect(&listener.address)
            .await
            .expect("connect to own listener");
        let mut inbound = listener.incoming.recv().await.expect("accepted");

        outbound.write_frame(b"first").await.unwrap();
        outbound.write_frame(b"second").await.unwrap();
        outbound.close().await;

        assert_eq!(inbound.read_frame().await.unwrap(), Some(b"first".to_vec()));
        assert_eq!(
            inbound.read_frame().await.unwrap(),
            Some(b"second".to_vec())
        );
        assert_eq!(inbound.read_frame().await.unwrap(), None);

        driver.shutdown().await;
    }

    #[tokio::test]
    async fn cancelled_read_resumes_mid_frame() {
        let driver = loopback_driver(1024);
        let mut listener = driver.listen().await.unwrap();
        let mut raw = TcpStream::connect(("127.0.0.1", listener.address.port()))
            .await
            .unwrap();
        let mut inbound = listener.incoming.recv().await.expect("accepted");

        raw.write_all(&[0, 0, 0]).await.unwrap();
        let pending = tokio::time::timeout(Duration::from_millis(50), inbound.read_frame()).await;
        assert!(pending.is_err());

        raw.write_all(&[5, b'h', b'e']).await.unwrap();
        let pending = tokio::time::timeout(Duration::from_millis(50), inbound.read_frame()).await;
        assert!(pending.is_err());

        raw.write_all(b"llo").await.unwrap();
        assert_eq!(inbound.read_frame().await.unwrap(), Some(b"hello".to_vec()));

        raw.write_all(&[0, 0, 0, 1]).await.unwrap();
        drop(raw);
        assert!(matches!(
            inbound.read_frame().await,
            Err(TransportError::ConnectionClosed)
        ));
        driver.shutdown().await;
    }

    #[tokio::test]
    async fn oversized_frames_are_rejected_before_writing() {
        let driver = loopback_driver(4);
        let mut listener = driver.listen().await.unwrap();
        let mut outbound = driver.connect(&listener.address).await.unwrap();
        let mut inbound = listener.incoming.recv().await.unwrap();

        let result = outbound.write_frame(b"too large").await;

        assert!(matches!(
            result,
            Err(TransportError::FrameTooLarge { size: 9, limit: 4 })
        ));
        outbound.write_frame(b"fits").await.unwrap();
        assert_eq!(inbound.read_frame().await.unwrap(), Some(b"fits".to_vec()));
        driver.shutdown().await;
    }
}
