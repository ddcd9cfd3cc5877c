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

use clap::Parser;
use endpoint_remoting::{
    Address, EndpointManager, ListenError, RemoteActorRef, RemoteSettings, SettingsError,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

const PING_PATH: &str = "/system/ping";

#[derive(Parser)]
#[command(about = "Runs one remoting endpoint node")]
struct NodeArgs {
    #[arg(short, long, value_name = "FILE")]
    config: String,

    /// Remote address to ping periodically, e.g. remote.tcp://node-b@127.0.0.1:25521
    #[arg(long, value_name = "ADDRESS")]
    ping: Vec<Address>,

    #[arg(long, value_name = "MILLIS", default_value_t = 1_000)]
    ping_interval_ms: u64,

    /// Quarantined incarnations restored at start and saved again on shutdown
    #[arg(long, value_name = "FILE")]
    quarantine_file: Option<PathBuf>,
}

/// One line of the quarantine file.
#[derive(Serialize, Deserialize, Debug, Clone, Eq, PartialEq)]
struct QuarantineRecord {
    address: Address,
    uid: u64,
}

#[derive(Debug)]
enum NodeError {
    Settings(SettingsError),
    Listen(ListenError),
    NoTransports,
    Signal(std::io::Error),
    QuarantineFile { path: PathBuf, source: std::io::Error },
    QuarantineFormat { path: PathBuf, source: serde_json::Error },
}

impl Display for NodeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeError::Settings(err) => write!(f, "{err}"),
            NodeError::Listen(err) => write!(f, "{err}"),
            NodeError::NoTransports => write!(f, "settings configure no transports"),
            NodeError::Signal(err) => write!(f, "unable to wait for ctrl-c: {err}"),
            NodeError::QuarantineFile { path, source } => {
                write!(f, "quarantine file {}: {source}", path.display())
            }
            NodeError::QuarantineFormat { path, source } => {
                write!(f, "quarantine file {} is malformed: {source}", path.display())
            }
        }
    }
}

impl Error for NodeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            NodeError::Settings(err) => Some(err),
            NodeError::Listen(err) => Some(err),
            NodeError::NoTransports => None,
            NodeError::Signal(err) => Some(err),
            NodeError::QuarantineFile { source, .. } => Some(source),
            NodeError::QuarantineFormat { source, .. } => Some(source),
        }
    }
}

/// A missing file means nothing was quarantined yet.
fn load_quarantine(path: &Path) -> Result<Vec<QuarantineRecord>, NodeError> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(NodeError::QuarantineFile {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    serde_json::from_str(&text).map_err(|source| NodeError::QuarantineFormat {
        path: path.to_path_buf(),
        source,
    })
}

fn save_quarantine(path: &Path, quarantined: &BTreeMap<Address, u64>) -> Result<(), NodeError> {
    let records: Vec<QuarantineRecord> = quarantined
        .iter()
        .map(|(address, uid)| QuarantineRecord {
            address: address.clone(),
            uid: *uid,
        })
        .collect();
    let text = serde_json::to_string_pretty(&records).map_err(|source| {
        NodeError::QuarantineFormat {
            path: path.to_path_buf(),
            source,
        }
    })?;
    std::fs::write(path, text).map_err(|source| NodeError::QuarantineFile {
        path: path.to_path_buf(),
        source,
    })
}

#[tokio::main]
async fn main() -> Result<(), NodeError> {
    let _ = tracing_subscriber::fmt::try_init();

    let args = NodeArgs::parse();
    let settings = RemoteSettings::from_json5_file(&args.config).map_err(NodeError::Settings)?;
    info!(
        system = settings.system_name.as_str(),
        transports = settings.transports.len(),
        "starting remoting node"
    );

    let restored = match &args.quarantine_file {
        Some(path) => load_quarantine(path)?,
        None => Vec::new(),
    };
    if !restored.is_empty() {
        info!(quarantined = restored.len(), "restoring quarantined incarnations");
    }
    let manager = EndpointManager::new(settings)
        .with_quarantined(restored.into_iter().map(|record| (record.address, record.uid)))
        .spawn();
    let pairs = manager.listen().await.map_err(NodeError::Listen)?;
    for pair in &pairs {
        info!(local = %pair.address, "listening");
    }
    let local = pairs
        .first()
        .map(|pair| pair.address.clone())
        .ok_or(NodeError::NoTransports)?;

    let mut ticker = tokio::time::interval(Duration::from_millis(args.ping_interval_ms.max(1)));
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let mut sequence: u64 = 0;
    loop {
        tokio::select! {
            signal = &mut shutdown => {
                signal.map_err(NodeError::Signal)?;
                info!("ctrl-c received; shutting down");
                break;
            }
            _ = ticker.tick(), if !args.ping.is_empty() => {
                sequence += 1;
                for remote in &args.ping {
                    let recipient = RemoteActorRef::new(remote.clone(), PING_PATH, local.clone());
                    manager.tell(recipient, format!("ping {sequence}").into_bytes());
                    match manager.policy(remote).await {
                        Some(policy) => info!(remote = %remote, sequence, policy = ?policy, "ping sent"),
                        None => warn!(remote = %remote, sequence, "ping diverted"),
                    }
                }
            }
        }
    }

    if let Some(path) = &args.quarantine_file {
        match manager.snapshot().await {
            Some(snapshot) => save_quarantine(path, &snapshot.quarantined_uids)?,
            None => warn!("manager stopped early; quarantine file left unchanged"),
        }
    }
    manager.shutdown().await;
    Ok(())
}
