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

//! Remoting settings, loadable from json5.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::time::Duration;

const DEFAULT_RETRY_GATE_CLOSED_FOR_MS: u64 = 5_000;
const DEFAULT_MAX_GATE_MS: u64 = 60_000;
const DEFAULT_FAILURE_WINDOW_MS: u64 = 10_000;
const DEFAULT_OUTBOUND_QUEUE_CAPACITY: usize = 1_024;
const DEFAULT_HANDSHAKE_TIMEOUT_MS: u64 = 15_000;
const DEFAULT_PRUNE_INTERVAL_MS: u64 = 30_000;

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct RemoteSettings {
    pub system_name: String,
    pub transports: Vec<TransportSettings>,
    #[serde(default)]
    pub gate: GateSettings,
    #[serde(default = "default_outbound_queue_capacity")]
    pub outbound_queue_capacity: usize,
    #[serde(default = "default_handshake_timeout_ms")]
    pub handshake_timeout_ms: u64,
    #[serde(default = "default_prune_interval_ms")]
    pub prune_interval_ms: u64,
}

/// One configured transport: a driver type identifier plus driver-specific settings.
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct TransportSettings {
    pub driver: String,
    #[serde(default)]
    pub config: serde_json::Value,
}

#[derive(Deserialize, Serialize, Debug, Clone, Eq, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct GateSettings {
    #[serde(default = "default_retry_gate_closed_for_ms")]
    pub retry_gate_closed_for_ms: u64,
    #[serde(default = "default_max_gate_ms")]
    pub max_gate_ms: u64,
    #[serde(default = "default_failure_window_ms")]
    pub failure_window_ms: u64,
}

impl Default for GateSettings {
    fn default() -> Self {
        Self {
            retry_gate_closed_for_ms: DEFAULT_RETRY_GATE_CLOSED_FOR_MS,
            max_gate_ms: DEFAULT_MAX_GATE_MS,
            failure_window_ms: DEFAULT_FAILURE_WINDOW_MS,
        }
    }
}

impl GateSettings {
    pub fn gate_duration(&self) -> Duration {
        Duration::from_millis(self.retry_gate_closed_for_ms)
    }

    pub fn max_gate_duration(&self) -> Duration {
        Duration::from_millis(self.max_gate_ms.max(self.retry_gate_closed_for_ms))
    }

    pub fn failure_window(&self) -> Duration {
        Duration::from_millis(self.failure_window_ms)
    }
}

fn default_retry_gate_closed_for_ms() -> u64 {
    DEFAULT_RETRY_GATE_CLOSED_FOR_MS
}

fn default_max_gate_ms() -> u64 {
    DEFAULT_MAX_GATE_MS
}

fn default_failure_window_ms() -> u64 {
    DEFAULT_FAILURE_WINDOW_MS
}

fn default_outbound_queue_capacity() -> usize {
    DEFAULT_OUTBOUND_QUEUE_CAPACITY
}

fn default_handshake_timeout_ms() -> u64 {
    DEFAULT_HANDSHAKE_TIMEOUT_MS
}

fn default_prune_interval_ms() -> u64 {
    DEFAULT_PRUNE_INTERVAL_MS
}

impl RemoteSettings {
    /// Settings with defaults for everything except the system name and transports.
    pub fn new(system_name: &str, transports: Vec<TransportSettings>) -> Self {
        Self {
            system_name: system_name.to_string(),
            transports,
            gate: GateSettings::default(),
            outbound_queue_capacity: DEFAULT_OUTBOUND_QUEUE_CAPACITY,
            handshake_timeout_ms: DEFAULT_HANDSHAKE_TIMEOUT_MS,
            prune_interval_ms: DEFAULT_PRUNE_INTERVAL_MS,
        }
    }

    pub fn from_json5_str(contents: &str) -> Result<Self, SettingsError> {
        json5::from_str(contents).map_err(|err| SettingsError::Parse(err.to_string()))
    }

    pub fn from_json5_file(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|err| SettingsError::Read {
            path: path.display().to_string(),
            source: err,
        })?;
        Self::from_json5_str(&contents)
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }

    pub fn prune_interval(&self) -> Duration {
        Duration::from_millis(self.prune_interval_ms.max(1))
    }
}

impl TransportSettings {
    pub fn new(driver: &str, config: serde_json::Value) -> Self {
        Self {
            driver: driver.to_string(),
            config,
        }
    }
}

/// Failures while loading [`RemoteSettings`].
#[derive(Debug)]
pub enum SettingsError {
    Read {
        path: String,
        source: std::io::Error,
    },
    Parse(String),
}

impl Display for SettingsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SettingsError::Read { path, source } => {
                write!(f, "unable to read settings file {path}: {source}")
            }
            SettingsError::Parse(reason) => write!(f, "unable to parse settings: {reason}"),
        }
    }
}

impl Error for SettingsError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SettingsError::Read { source, .. } => Some(source),
            SettingsError::Parse(_) => None,
        }
    }
}
