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

//! # endpoint-remoting
//!
//! `endpoint-remoting` manages outbound connections from one actor system to remote
//! actor systems. Every remote address gets at most one live endpoint worker, and
//! failing peers are temporarily gated or permanently quarantined.
//!
//! Typical usage is centered on [`EndpointManager`] and the cloneable
//! [`EndpointManagerHandle`] it spawns.
//!
//! ```
//! use endpoint_remoting::{
//!     DriverRegistry, EndpointManager, LoopbackNetwork, RemoteActorRef, RemoteSettings,
//!     TransportSettings,
//! };
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let network = LoopbackNetwork::new();
//! let mut drivers = DriverRegistry::new();
//! network.register_driver(&mut drivers);
//!
//! let spawn = |system: &str| {
//!     let settings = RemoteSettings::new(
//!         system,
//!         vec![TransportSettings::new("loopback", serde_json::json!({ "host": system }))],
//!     );
//!     EndpointManager::new(settings).with_drivers(drivers.clone()).spawn()
//! };
//! let orders = spawn("orders");
//! let billing = spawn("billing");
//!
//! let local = orders.listen().await.unwrap().remove(0).address;
//! let remote = billing.listen().await.unwrap().remove(0).address;
//!
//! orders.tell(RemoteActorRef::new(remote.clone(), "/user/ledger", local), b"hi".to_vec());
//! assert!(orders.policy(&remote).await.is_some_and(|policy| policy.is_pass()));
//!
//! orders.shutdown().await;
//! billing.shutdown().await;
//! # });
//! ```
//!
//! ## Internal architecture map
//!
//! - Manager: mailbox loop, command protocol and the public handle
//! - Control plane: endpoint registry, gate escalation and transport mapping
//! - Data plane: per-peer endpoint workers and the inbound acceptor
//! - Protocol: association handshake layered over raw drivers
//! - Transport: driver contract, driver registry, `tcp` and `loopback` drivers
//! - Runtime: instrumented task spawning
//!
//! ## Observability model
//!
//! The workspace uses `tracing` for logs/events.
//! Library code emits events/spans and does not initialize a global subscriber.
//! Binaries and tests are responsible for one-time `tracing_subscriber`
//! initialization at process boundaries.

mod address;
pub use address::{Address, AddressParseError};

mod envelope;
pub use envelope::{InboundEnvelope, RemoteActorRef, RemoteEnvelope};

mod dead_letters;
pub use dead_letters::{DeadLetter, DeadLetterReason, DeadLetterSink, LoggingDeadLetters};

mod inbound;
pub use inbound::{InboundDispatcher, LoggingInboundDispatcher};

mod settings;
pub use settings::{GateSettings, RemoteSettings, SettingsError, TransportSettings};

mod transport;
pub use transport::driver::{Connection, DriverContext, Listener, TransportDriver};
pub use transport::driver_registry::{DriverFactory, DriverRegistry};
pub use transport::error::{DriverError, TransportError};
pub use transport::loopback::{LoopbackDriver, LoopbackDriverSettings, LoopbackNetwork};
pub use transport::tcp::{TcpDriver, TcpDriverSettings};

mod protocol;
pub use protocol::error::AssociationError;
pub use protocol::protocol_transport::{
    protocol_scheme, Association, ProtocolTransport, ProtocolTransportAddressPair,
};
pub use protocol::wire::WireError;

mod control_plane;
mod data_plane;

mod manager;
pub use manager::endpoint_manager::EndpointManager;
pub use manager::handle::EndpointManagerHandle;
pub use manager::listen_error::ListenError;
pub use manager::snapshot::{PolicySnapshot, RegistrySnapshot};

#[doc(hidden)]
pub mod observability;
mod runtime;
