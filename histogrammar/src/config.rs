/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Configuration for the JSON codec.
//!
//! Values are resolved per key through a small **layered model**:
//! `TestOverride -> Env -> Runtime -> File -> Default`. A layer only
//! carries the keys it sets; anything it leaves unset falls through to
//! the next layer, and finally to [`Config::default`].
//!
//! | key                   | env var                            | default |
//! |-----------------------|------------------------------------|---------|
//! | `strict_keys`         | `HISTOGRAMMAR_STRICT_KEYS`         | `true`  |
//! | `integral_as_integer` | `HISTOGRAMMAR_INTEGRAL_AS_INTEGER` | `true`  |
//!
//! # Testing
//!
//! Tests that depend on a particular configuration take the global
//! lock, which serializes them against each other:
//!
//! ```ignore
//! let config = histogrammar::config::global::lock();
//! let _guard = config.override_config(ConfigLayer {
//!     strict_keys: Some(false),
//!     ..Default::default()
//! });
//! ```

use std::path::Path;

use serde::Deserialize;
use serde::Serialize;

/// Environment variable for [`Config::strict_keys`].
pub const STRICT_KEYS_ENV: &str = "HISTOGRAMMAR_STRICT_KEYS";

/// Environment variable for [`Config::integral_as_integer`].
pub const INTEGRAL_AS_INTEGER_ENV: &str = "HISTOGRAMMAR_INTEGRAL_AS_INTEGER";

/// Fully resolved configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Reject fragments that carry keys the decoder does not know.
    pub strict_keys: bool,
    /// Encode integral, finite floats as JSON integers.
    pub integral_as_integer: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            strict_keys: true,
            integral_as_integer: true,
        }
    }
}

/// A partial configuration contributed by one source.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigLayer {
    /// See [`Config::strict_keys`].
    pub strict_keys: Option<bool>,
    /// See [`Config::integral_as_integer`].
    pub integral_as_integer: Option<bool>,
}

impl ConfigLayer {
    /// Read the keys that have an environment variable set.
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            strict_keys: env_bool(STRICT_KEYS_ENV)?,
            integral_as_integer: env_bool(INTEGRAL_AS_INTEGER_ENV)?,
        })
    }

    /// Read a layer from a YAML document.
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Read a layer from a YAML file.
    pub fn from_yaml(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    /// Keys set in `self` win over keys set in `lower`.
    fn or(self, lower: ConfigLayer) -> ConfigLayer {
        ConfigLayer {
            strict_keys: self.strict_keys.or(lower.strict_keys),
            integral_as_integer: self.integral_as_integer.or(lower.integral_as_integer),
        }
    }

    fn resolve(self) -> Config {
        let default = Config::default();
        Config {
            strict_keys: self.strict_keys.unwrap_or(default.strict_keys),
            integral_as_integer: self
                .integral_as_integer
                .unwrap_or(default.integral_as_integer),
        }
    }
}

fn env_bool(var: &str) -> anyhow::Result<Option<bool>> {
    let Ok(value) = std::env::var(var) else {
        return Ok(None);
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(Some(true)),
        "0" | "false" | "no" | "off" => Ok(Some(false)),
        other => anyhow::bail!("{var}: expected a boolean, got `{other}`"),
    }
}

/// Configuration source layers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Source {
    /// Values loaded from a YAML file.
    File,
    /// Values set programmatically.
    Runtime,
    /// Values read from environment variables.
    Env,
    /// Ephemeral values inserted by tests via
    /// [`global::ConfigLock::override_config`].
    TestOverride,
}

/// Smaller number = higher precedence.
fn priority(source: Source) -> u8 {
    match source {
        Source::TestOverride => 0,
        Source::Env => 1,
        Source::Runtime => 2,
        Source::File => 3,
    }
}

/// The process-wide configuration store.
pub mod global {
    use std::marker::PhantomData;
    use std::path::Path;
    use std::sync::LazyLock;
    use std::sync::Mutex;
    use std::sync::MutexGuard;
    use std::sync::RwLock;

    use super::priority;
    use super::Config;
    use super::ConfigLayer;
    use super::Source;

    /// Installed layers, kept sorted by priority.
    static LAYERS: LazyLock<RwLock<Vec<(Source, ConfigLayer)>>> =
        LazyLock::new(|| RwLock::new(Vec::new()));

    static TEST_LOCK: Mutex<()> = Mutex::new(());

    /// The effective configuration.
    pub fn get() -> Config {
        let layers = LAYERS.read().unwrap_or_else(|e| e.into_inner());
        layers
            .iter()
            .fold(ConfigLayer::default(), |acc, (_, layer)| acc.or(*layer))
            .resolve()
    }

    /// Install (or replace) the layer for `source`.
    pub fn set(source: Source, layer: ConfigLayer) {
        tracing::debug!(?source, ?layer, "installing configuration layer");
        let mut layers = LAYERS.write().unwrap_or_else(|e| e.into_inner());
        layers.retain(|(s, _)| *s != source);
        layers.push((source, layer));
        layers.sort_by_key(|(s, _)| priority(*s));
    }

    /// Remove the layer for `source`, returning it.
    pub fn clear(source: Source) -> Option<ConfigLayer> {
        let mut layers = LAYERS.write().unwrap_or_else(|e| e.into_inner());
        let position = layers.iter().position(|(s, _)| *s == source)?;
        Some(layers.remove(position).1)
    }

    fn layer(source: Source) -> Option<ConfigLayer> {
        let layers = LAYERS.read().unwrap_or_else(|e| e.into_inner());
        layers
            .iter()
            .find(|(s, _)| *s == source)
            .map(|(_, layer)| *layer)
    }

    /// Install the [`Source::Env`] layer from the process environment.
    pub fn init_from_env() -> anyhow::Result<()> {
        set(Source::Env, ConfigLayer::from_env()?);
        Ok(())
    }

    /// Install the [`Source::File`] layer from a YAML file.
    pub fn init_from_yaml(path: &Path) -> anyhow::Result<()> {
        set(Source::File, ConfigLayer::from_yaml(path)?);
        Ok(())
    }

    /// Serialize access to the test override layer.
    pub fn lock() -> ConfigLock {
        ConfigLock {
            _guard: TEST_LOCK.lock().unwrap_or_else(|e| e.into_inner()),
        }
    }

    /// Held while a test manipulates the configuration.
    pub struct ConfigLock {
        _guard: MutexGuard<'static, ()>,
    }

    impl ConfigLock {
        /// Apply `layer` on top of every other source until the
        /// returned guard drops.
        pub fn override_config(&self, layer: ConfigLayer) -> ConfigOverrideGuard<'_> {
            let previous = layer_of_test();
            let merged = match previous {
                Some(previous) => layer.or(previous),
                None => layer,
            };
            set(Source::TestOverride, merged);
            ConfigOverrideGuard {
                previous,
                _lock: PhantomData,
            }
        }
    }

    fn layer_of_test() -> Option<ConfigLayer> {
        layer(Source::TestOverride)
    }

    /// Restores the previous test override when dropped.
    pub struct ConfigOverrideGuard<'a> {
        previous: Option<ConfigLayer>,
        _lock: PhantomData<&'a ConfigLock>,
    }

    impl Drop for ConfigOverrideGuard<'_> {
        fn drop(&mut self) {
            match self.previous {
                Some(previous) => set(Source::TestOverride, previous),
                None => {
                    clear(Source::TestOverride);
                }
            }
        }
    }
}
