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

//! Association failures.

use crate::protocol::wire::WireError;
use crate::transport::error::TransportError;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

/// Reasons an outbound association attempt did not reach the open state.
#[derive(Debug)]
pub enum AssociationError {
    Transport(TransportError),
    HandshakeTimeout(Duration),
    /// The peer presented an incarnation uid this side refuses to talk to.
    HandshakeRefused { uid: u64 },
    /// The peer answered the handshake with `Disassociate`, e.g. because it
    /// quarantined this incarnation.
    Disassociated(String),
    UnexpectedFrame(&'static str),
    Codec(WireError),
}

impl Display for AssociationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            AssociationError::Transport(err) => write!(f, "association failed: {err}"),
            AssociationError::HandshakeTimeout(timeout) => {
                write!(f, "handshake not completed within {}ms", timeout.as_millis())
            }
            AssociationError::HandshakeRefused { uid } => {
                write!(f, "handshake refused for quarantined incarnation {uid}")
            }
            AssociationError::Disassociated(reason) => {
                write!(f, "peer declined the association: {reason}")
            }
            AssociationError::UnexpectedFrame(kind) => {
                write!(f, "expected associate frame, received {kind}")
            }
            AssociationError::Codec(err) => write!(f, "association failed: {err}"),
        }
    }
}

impl Error for AssociationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            AssociationError::Transport(err) => Some(err),
            AssociationError::Codec(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TransportError> for AssociationError {
    fn from(err: TransportError) -> Self {
        AssociationError::Transport(err)
    }
}

impl From<WireError> for AssociationError {
    fn from(err: WireError) -> Self {
        AssociationError::Codec(err)
    }
}
