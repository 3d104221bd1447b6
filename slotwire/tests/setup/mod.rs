/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */
#![allow(dead_code)]

use std::sync::{Arc, Once};
use std::time::Duration;

use slotwire::prelude::*;
use tracing::Level;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

// Ensures tracing initialization happens only once across all tests.
static INIT: Once = Once::new();

/// Initializes the global tracing subscriber for tests.
///
/// Logs go to `logs/slotwire_tests.txt` through a non-blocking writer; the
/// filter can be overridden with `RUST_LOG`.
pub fn initialize_tracing() {
    INIT.call_once(|| {
        std::fs::create_dir_all("logs").expect("could not create logs dir");

        let file_appender = RollingFileAppender::new(Rotation::NEVER, "logs", "slotwire_tests.txt");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        // Leak the guard so the non-blocking writer is not dropped before process exit
        Box::leak(Box::new(guard));

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("info")
                .add_directive("slotwire::signal_slotable=trace".parse().unwrap())
                .add_directive("slotwire::common=debug".parse().unwrap())
                .add_directive("tokio=info".parse().unwrap())
        });

        let subscriber = FmtSubscriber::builder()
            .with_span_events(FmtSpan::NONE)
            .with_max_level(Level::TRACE)
            .compact()
            .with_line_number(true)
            .without_time()
            .with_target(true)
            .with_env_filter(filter)
            .with_writer(non_blocking)
            .finish();

        tracing::subscriber::set_global_default(subscriber)
            .expect("setting default subscriber failed");
    });
}

/// Configuration with timeouts short enough for tests.
pub fn test_config() -> SlotwireConfig {
    let mut config = SlotwireConfig::default();
    config.timeouts.request_ms = 1_000;
    config.timeouts.connect_ms = 500;
    config.timeouts.instance_ping_ms = 50;
    config.timeouts.discovery_ms = 150;
    config.timeouts.introspection_ms = 500;
    config.timeouts.shutdown_ms = 1_000;
    config
}

/// Configuration for tests that watch heartbeats.
pub fn tracking_config() -> SlotwireConfig {
    let mut config = test_config();
    config.heartbeat.interval_ms = 100;
    config.heartbeat.missed_beats_tolerance = 2;
    config.heartbeat.tracking_tick_ms = 20;
    config.heartbeat.track_instances = true;
    config
}

pub fn broker() -> Arc<InMemoryBroker> {
    Arc::new(InMemoryBroker::new())
}

/// Builds an instance on `broker` with the test configuration.
pub fn instance(id: &str, broker: &Arc<InMemoryBroker>) -> anyhow::Result<SignalSlotable> {
    instance_with(id, broker, test_config())
}

pub fn instance_with(id: &str, broker: &Arc<InMemoryBroker>, config: SlotwireConfig) -> anyhow::Result<SignalSlotable> {
    let broker: Arc<dyn Broker> = broker.clone();
    Ok(SignalSlotable::builder(id, broker).config(config).build()?)
}

/// Polls `condition` until it holds or `within` elapses.
pub async fn eventually(within: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + within;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}
