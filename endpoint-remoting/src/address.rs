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

//! Logical addresses of actor systems reachable over remoting.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

///
/// [`Address`] identifies one actor system instance on the network: protocol scheme,
/// system name, host and port. Equality is structural, so two addresses built from
/// the same parts are the same registry key.
///
/// # Examples
///
/// ```
/// use endpoint_remoting::Address;
///
/// let address: Address = "remote.tcp://orders@10.0.0.7:2552".parse().unwrap();
///
/// assert_eq!(address.protocol(), "remote.tcp");
/// assert_eq!(address.system(), "orders");
/// assert_eq!(address.host(), "10.0.0.7");
/// assert_eq!(address.port(), 2552);
/// assert_eq!(address.to_string(), "remote.tcp://orders@10.0.0.7:2552");
/// ```
#[derive(Clone, Debug, Eq, Hash, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address {
    protocol: String,
    system: String,
    host: String,
    port: u16,
}

impl Address {
    pub fn new(protocol: &str, system: &str, host: &str, port: u16) -> Self {
        Self {
            protocol: protocol.to_string(),
            system: system.to_string(),
            host: host.to_string(),
            port,
        }
    }

    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    pub fn system(&self) -> &str {
        &self.system
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Returns a copy of this address carrying a different protocol scheme.
    pub fn with_protocol(&self, protocol: &str) -> Self {
        Self {
            protocol: protocol.to_string(),
            ..self.clone()
        }
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}://{}@{}:{}",
            self.protocol, self.system, self.host, self.port
        )
    }
}

/// Failures while parsing the `scheme://system@host:port` form.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum AddressParseError {
    MissingScheme(String),
    MissingSystem(String),
    MissingPort(String),
    InvalidPort(String),
    EmptyComponent(String),
}

impl Display for AddressParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            AddressParseError::MissingScheme(raw) => {
                write!(f, "address [{raw}] has no `scheme://` prefix")
            }
            AddressParseError::MissingSystem(raw) => {
                write!(f, "address [{raw}] has no `system@` part")
            }
            AddressParseError::MissingPort(raw) => write!(f, "address [{raw}] has no port"),
            AddressParseError::InvalidPort(raw) => {
                write!(f, "address [{raw}] has an invalid port")
            }
            AddressParseError::EmptyComponent(raw) => {
                write!(f, "address [{raw}] has an empty component")
            }
        }
    }
}

impl Error for AddressParseError {}

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let (protocol, rest) = raw
            .split_once("://")
            .ok_or_else(|| AddressParseError::MissingScheme(raw.to_string()))?;
        let (system, authority) = rest
            .split_once('@')
            .ok_or_else(|| AddressParseError::MissingSystem(raw.to_string()))?;
        let (host, port) = authority
            .rsplit_once(':')
            .ok_or_else(|| AddressParseError::MissingPort(raw.to_string()))?;

        if protocol.is_empty() || system.is_empty() || host.is_empty() {
            return Err(AddressParseError::EmptyComponent(raw.to_string()));
        }

        let port = port
            .parse::<u16>()
            .map_err(|_| AddressParseError::InvalidPort(raw.to_string()))?;

        Ok(Address::new(protocol, system, host, port))
    }
}

#[cfg(test)]
mod tests {
    use super::{Address, AddressParseError};

    #[test]
    fn equality_is_structural() {
        let a = Address::new("remote.tcp", "sys", "localhost", 2552);
        let b: Address = "remote.tcp://sys@localhost:2552".parse().unwrap();

        assert_eq!(a, b);
        assert_ne!(a, Address::new("remote.tcp", "sys", "localhost", 2553));
    }

    #[test]
    fn parse_rejects_missing_parts() {
        assert_eq!(
            "sys@localhost:2552".parse::<Address>(),
            Err(AddressParseError::MissingScheme(
                "sys@localhost:2552".to_string()
            ))
        );
        assert!(matches!(
            "remote.tcp://localhost:2552".parse::<Address>(),
            Err(AddressParseError::MissingSystem(_))
        ));
        assert!(matches!(
            "remote.tcp://sys@localhost".parse::<Address>(),
            Err(AddressParseError::MissingPort(_))
        ));
        assert!(matches!(
            "remote.tcp://sys@localhost:99999".parse::<Address>(),
            Err(AddressParseError::InvalidPort(_))
        ));
        assert!(matches!(
            "remote.tcp://@localhost:1".parse::<Address>(),
            Err(AddressParseError::EmptyComponent(_))
        ));
    }

    #[test]
    fn with_protocol_keeps_location() {
        let address = Address::new("tcp", "sys", "10.1.1.1", 7000);
        let wrapped = address.with_protocol("remote.tcp");

        assert_eq!(wrapped.to_string(), "remote.tcp://sys@10.1.1.1:7000");
        assert_eq!(wrapped.host(), address.host());
    }
}
