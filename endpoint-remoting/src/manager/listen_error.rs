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

//! `Listen` failures.

use crate::transport::error::{DriverError, TransportError};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Reasons `Listen` failed. Nothing is installed when any of these is returned.
#[derive(Debug)]
pub enum ListenError {
    /// No constructor is registered for the configured driver type.
    UnknownDriver { driver: String },
    DriverConstruction { driver: String, source: DriverError },
    Bind { driver: String, source: TransportError },
    /// The manager mailbox loop is no longer running.
    ManagerUnavailable,
}

impl Display for ListenError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ListenError::UnknownDriver { driver } => {
                write!(f, "no transport driver registered as [{driver}]")
            }
            ListenError::DriverConstruction { driver, source } => {
                write!(f, "unable to construct driver [{driver}]: {source}")
            }
            ListenError::Bind { driver, source } => {
                write!(f, "driver [{driver}] failed to listen: {source}")
            }
            ListenError::ManagerUnavailable => write!(f, "endpoint manager is not running"),
        }
    }
}

impl Error for ListenError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ListenError::DriverConstruction { source, .. } => Some(source),
            ListenError::Bind { source, .. } => Some(source),
            _ => None,
        }
    }
}
