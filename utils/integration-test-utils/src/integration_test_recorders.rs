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

use endpoint_remoting::{DeadLetter, DeadLetterSink, InboundDispatcher, InboundEnvelope};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

const RECEIVE_DEADLINE: Duration = Duration::from_secs(5);

/// Dead-letter sink that forwards every diverted envelope into a channel.
pub struct RecordingDeadLetters {
    sender: UnboundedSender<DeadLetter>,
}

impl RecordingDeadLetters {
    pub fn channel() -> (Arc<Self>, UnboundedReceiver<DeadLetter>) {
        let (sender, receiver) = unbounded_channel();
        (Arc::new(Self { sender }), receiver)
    }
}

impl DeadLetterSink for RecordingDeadLetters {
    fn publish(&self, dead_letter: DeadLetter) {
        let _ = self.sender.send(dead_letter);
    }
}

/// Inbound dispatcher that forwards every delivered envelope into a channel.
pub struct RecordingInbound {
    sender: UnboundedSender<InboundEnvelope>,
}

impl RecordingInbound {
    pub fn channel() -> (Arc<Self>, UnboundedReceiver<InboundEnvelope>) {
        let (sender, receiver) = unbounded_channel();
        (Arc::new(Self { sender }), receiver)
    }
}

impl InboundDispatcher for RecordingInbound {
    fn dispatch(&self, envelope: InboundEnvelope) {
        let _ = self.sender.send(envelope);
    }
}

pub async fn next_dead_letter(receiver: &mut UnboundedReceiver<DeadLetter>) -> DeadLetter {
    tokio::time::timeout(RECEIVE_DEADLINE, receiver.recv())
        .await
        .expect("timed out waiting for a dead letter")
        .expect("dead-letter channel closed")
}

pub async fn next_inbound(receiver: &mut UnboundedReceiver<InboundEnvelope>) -> InboundEnvelope {
    tokio::time::timeout(RECEIVE_DEADLINE, receiver.recv())
        .await
        .expect("timed out waiting for an inbound envelope")
        .expect("inbound channel closed")
}

/// Everything already published, without waiting.
pub fn drain_dead_letters(receiver: &mut UnboundedReceiver<DeadLetter>) -> Vec<DeadLetter> {
    let mut drained = Vec::new();
    while let Ok(dead_letter) = receiver.try_recv() {
        drained.push(dead_letter);
    }
    drained
}
