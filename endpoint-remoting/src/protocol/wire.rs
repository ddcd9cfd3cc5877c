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

//! Frames exchanged by associated endpoints.
//!
//! Control frames travel as tagged JSON objects. Payload frames use a compact binary
//! layout so message bytes cross the wire unexpanded:
//!
//! ```text
//! 0x01 | recipient length (u32, big endian) | recipient (utf-8) | payload bytes
//! ```

use crate::address::Address;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

const PAYLOAD_TAG: u8 = 0x01;
const LENGTH_PREFIX: usize = 4;

#[derive(Serialize, Deserialize, Debug, Clone, Eq, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum WireFrame {
    /// Handshake: sent first by both sides of a connection.
    Associate { origin: Address, uid: u64 },
    #[serde(skip)]
    Payload { recipient: String, payload: Vec<u8> },
    Disassociate { reason: String },
}

impl WireFrame {
    pub(crate) fn encode(&self) -> Result<Vec<u8>, WireError> {
        match self {
            WireFrame::Payload { recipient, payload } => encode_payload(recipient, payload),
            control => serde_json::to_vec(control).map_err(WireError::Json),
        }
    }

    pub(crate) fn decode(frame: &[u8]) -> Result<Self, WireError> {
        match frame.split_first() {
            Some((&PAYLOAD_TAG, body)) => decode_payload(body),
            _ => serde_json::from_slice(frame).map_err(WireError::Json),
        }
    }

    pub(crate) fn kind(&self) -> &'static str {
        match self {
            WireFrame::Associate { .. } => "associate",
            WireFrame::Payload { .. } => "payload",
            WireFrame::Disassociate { .. } => "disassociate",
        }
    }
}

fn encode_payload(recipient: &str, payload: &[u8]) -> Result<Vec<u8>, WireError> {
    let recipient_len =
        u32::try_from(recipient.len()).map_err(|_| WireError::RecipientTooLong(recipient.len()))?;
    let mut frame = Vec::with_capacity(1 + LENGTH_PREFIX + recipient.len() + payload.len());
    frame.push(PAYLOAD_TAG);
    frame.extend_from_slice(&recipient_len.to_be_bytes());
    frame.extend_from_slice(recipient.as_bytes());
    frame.extend_from_slice(payload);
    Ok(frame)
}

fn decode_payload(body: &[u8]) -> Result<WireFrame, WireError> {
    if body.len() < LENGTH_PREFIX {
        return Err(WireError::Truncated);
    }
    let (prefix, rest) = body.split_at(LENGTH_PREFIX);
    let recipient_len = u32::from_be_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]) as usize;
    if rest.len() < recipient_len {
        return Err(WireError::Truncated);
    }
    let (recipient, payload) = rest.split_at(recipient_len);
    let recipient = std::str::from_utf8(recipient).map_err(|_| WireError::InvalidRecipient)?;
    Ok(WireFrame::Payload {
        recipient: recipient.to_string(),
        payload: payload.to_vec(),
    })
}

/// A frame could not be encoded or decoded.
#[derive(Debug)]
pub enum WireError {
    Json(serde_json::Error),
    Truncated,
    InvalidRecipient,
    RecipientTooLong(usize),
}

impl Display for WireError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            WireError::Json(err) => write!(f, "malformed wire frame: {err}"),
            WireError::Truncated => write!(f, "malformed wire frame: truncated payload frame"),
            WireError::InvalidRecipient => {
                write!(f, "malformed wire frame: recipient path is not utf-8")
            }
            WireError::RecipientTooLong(len) => {
                write!(f, "recipient path of {len} bytes cannot be framed")
            }
        }
    }
}

impl Error for WireError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            WireError::Json(err) => Some(err),
            _ => None,
        }
    }
}
