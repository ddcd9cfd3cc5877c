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

//! Gate duration escalation for addresses that keep failing.

use crate::address::Address;
use crate::settings::GateSettings;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Clone, Copy, Debug)]
struct FailureStreak {
    consecutive: u32,
    last_failure: Instant,
}

/// Failures arriving within `failure_window` of the previous one double the gate,
/// up to `max`. A successful association resets the streak.
#[derive(Debug)]
pub(crate) struct GateBackoff {
    base: Duration,
    max: Duration,
    failure_window: Duration,
    streaks: HashMap<Address, FailureStreak>,
}

impl GateBackoff {
    pub(crate) fn new(settings: &GateSettings) -> Self {
        Self {
            base: settings.gate_duration(),
            max: settings.max_gate_duration(),
            failure_window: settings.failure_window(),
            streaks: HashMap::new(),
        }
    }

    /// Records a failure of `address` at `now` and returns how long to gate it.
    pub(crate) fn next_gate(&mut self, address: &Address, now: Instant) -> Duration {
        let consecutive = match self.streaks.get(address) {
            Some(streak)
                if now.saturating_duration_since(streak.last_failure) <= self.failure_window =>
            {
                streak.consecutive.saturating_add(1)
            }
            _ => 1,
        };
        self.streaks.insert(
            address.clone(),
            FailureStreak {
                consecutive,
                last_failure: now,
            },
        );

        let factor = 1u32 << (consecutive - 1).min(31);
        self.base.saturating_mul(factor).min(self.max)
    }

    pub(crate) fn reset(&mut self, address: &Address) {
        self.streaks.remove(address);
    }

    /// Drops streaks whose last failure is outside the window; they can no longer
    /// escalate. Returns how many were dropped.
    pub(crate) fn prune(&mut self, now: Instant) -> usize {
        let before = self.streaks.len();
        let window = self.failure_window;
        self.streaks
            .retain(|_, streak| now.saturating_duration_since(streak.last_failure) <= window);
        before - self.streaks.len()
    }

    #[cfg(test)]
    pub(crate) fn tracked(&self) -> usize {
        self.streaks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::GateBackoff;
    use crate::address::Address;
    use crate::settings::GateSettings;
    use std::time::Duration;
    use tokio::time::Instant;

    fn backoff() -> GateBackoff {
        GateBackoff::new(&GateSettings {
            retry_gate_closed_for_ms: 100,
            max_gate_ms: 350,
            failure_window_ms: 1_000,
        })
    }

    #[test]
    fn rapid_failures_double_up_to_the_cap() {
        let mut backoff = backoff();
        let peer = Address::new("remote.tcp", "sys", "peer", 1);
        let start = Instant::now();

        let gates: Vec<Duration> = (0..4)
            .map(|n| backoff.next_gate(&peer, start + Duration::from_millis(n * 200)))
            .collect();

        assert_eq!(
            gates,
            vec![
                Duration::from_millis(100),
                Duration::from_millis(200),
                Duration::from_millis(350),
                Duration::from_millis(350),
            ]
        );
    }

    #[test]
    fn quiet_period_and_reset_restart_the_streak() {
        let mut backoff = backoff();
        let peer = Address::new("remote.tcp", "sys", "peer", 1);
        let start = Instant::now();

        backoff.next_gate(&peer, start);
        assert_eq!(
            backoff.next_gate(&peer, start + Duration::from_secs(5)),
            Duration::from_millis(100)
        );

        backoff.next_gate(&peer, start + Duration::from_millis(5_100));
        backoff.reset(&peer);
        assert_eq!(
            backoff.next_gate(&peer, start + Duration::from_millis(5_200)),
            Duration::from_millis(100)
        );
    }

    #[test]
    fn prune_forgets_only_streaks_past_the_window() {
        let mut backoff = backoff();
        let start = Instant::now();
        let quiet = Address::new("remote.tcp", "sys", "quiet", 1);
        let flapping = Address::new("remote.tcp", "sys", "flapping", 1);

        backoff.next_gate(&quiet, start);
        backoff.next_gate(&flapping, start + Duration::from_millis(900));
        backoff.next_gate(&flapping, start + Duration::from_millis(1_500));

        assert_eq!(backoff.prune(start + Duration::from_millis(1_200)), 1);
        assert_eq!(backoff.tracked(), 1);
        assert_eq!(
            backoff.next_gate(&flapping, start + Duration::from_millis(1_600)),
            Duration::from_millis(350)
        );

        assert_eq!(backoff.prune(start + Duration::from_secs(60)), 1);
        assert_eq!(backoff.tracked(), 0);
    }

    #[test]
    fn streaks_are_per_address() {
        let mut backoff = backoff();
        let now = Instant::now();
        let a = Address::new("remote.tcp", "sys", "a", 1);
        let b = Address::new("remote.tcp", "sys", "b", 1);

        backoff.next_gate(&a, now);
        backoff.next_gate(&a, now);

        assert_eq!(backoff.next_gate(&b, now), Duration::from_millis(100));
    }
}
