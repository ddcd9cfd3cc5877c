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

//! Driver-level failures.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Failures raised by transport drivers and their connections.
#[derive(Debug)]
pub enum TransportError {
    BindFailed { address: String, source: std::io::Error },
    ConnectionRefused(String),
    ConnectionClosed,
    FrameTooLarge { size: usize, limit: usize },
    NotListening,
    Io(std::io::Error),
}

impl Display for TransportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportError::BindFailed { address, source } => {
                write!(f, "unable to bind {address}: {source}")
            }
            TransportError::ConnectionRefused(address) => {
                write!(f, "connection to {address} refused")
            }
            TransportError::ConnectionClosed => write!(f, "connection closed"),
            TransportError::FrameTooLarge { size, limit } => {
                write!(f, "frame of {size} bytes exceeds limit of {limit} bytes")
            }
            TransportError::NotListening => write!(f, "driver is not listening"),
            TransportError::Io(err) => write!(f, "transport i/o failure: {err}"),
        }
    }
}

impl Error for TransportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            TransportError::BindFailed { source, .. } => Some(source),
            TransportError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        TransportError::Io(err)
    }
}

/// Failures while constructing a driver from its settings.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum DriverError {
    InvalidSettings { driver: String, reason: String },
}

impl Display for DriverError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            DriverError::InvalidSettings { driver, reason } => {
                write!(f, "invalid settings for driver [{driver}]: {reason}")
            }
        }
    }
}

impl Error for DriverError {}
