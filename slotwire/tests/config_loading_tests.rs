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

use std::fs;

use slotwire::config::SlotwireConfig;
use tempfile::TempDir;

/// Test that partial TOML keeps the defaults for everything it omits
#[test]
fn test_partial_configuration() -> anyhow::Result<()> {
    let config = SlotwireConfig::from_toml(
        r#"
        [timeouts]
        request_ms = 250

        [defaults]
        instance_type = "motor"
    "#,
    )?;

    assert_eq!(config.timeouts.request_ms, 250);
    assert_eq!(config.request_timeout().as_millis(), 250);
    assert_eq!(config.defaults.instance_type, "motor");
    assert_eq!(config.timeouts.connect_ms, SlotwireConfig::default().timeouts.connect_ms);
    assert_eq!(config.heartbeat.interval_ms, 10_000);
    assert!(config.behavior.check_instance_id_unique);
    Ok(())
}

/// Test that values of the wrong type are rejected by the parser
#[test]
fn test_malformed_toml_is_rejected() {
    let parsed = SlotwireConfig::from_toml(
        r#"
        [heartbeat]
        interval_ms = "often"
    "#,
    );
    assert!(parsed.is_err());
}

/// Test XDG loading: defaults without a file, the file's values with one,
/// and defaults again for a malformed file.
///
/// One test owns `XDG_CONFIG_HOME` in this binary so the steps cannot race.
#[test]
fn test_xdg_configuration_loading() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    std::env::set_var("XDG_CONFIG_HOME", temp_dir.path());
    std::env::set_var("XDG_CONFIG_DIRS", temp_dir.path().join("none"));

    let config = SlotwireConfig::load();
    assert_eq!(config.timeouts.request_ms, 5_000);

    let config_dir = temp_dir.path().join("slotwire");
    fs::create_dir_all(&config_dir)?;
    fs::write(
        config_dir.join("config.toml"),
        r"
        [heartbeat]
        interval_ms = 2000
        track_instances = true

        [limits]
        inbox_capacity = 16
    ",
    )?;
    let config = SlotwireConfig::load();
    assert_eq!(config.heartbeat.interval_ms, 2_000);
    assert!(config.heartbeat.track_instances);
    assert_eq!(config.limits.inbox_capacity, 16);
    assert_eq!(config.timeouts.request_ms, 5_000);

    fs::write(config_dir.join("config.toml"), "[timeouts]\nrequest_ms = -1\n")?;
    let config = SlotwireConfig::load();
    assert_eq!(config.timeouts.request_ms, 5_000);

    temp_dir.close()?;
    Ok(())
}
