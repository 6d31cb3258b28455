//! Adaptive-config controller (spec §4.G "Adaptive configuration"):
//! periodically samples resource pressure and updates
//! `{ max_concurrent_loads, background_loading_enabled,
//! prediction_threshold, model_complexity }`. Fixed low/medium/high
//! thresholds, hysteretic transitions with a cooldown, following the
//! teacher's `workspace::gc` periodic-maintenance idiom: sample →
//! compare against fixed thresholds → act.
//!
//! No process-wide CPU/memory sampler (e.g. `sysinfo`) is in the
//! teacher's dependency stack, so pressure is derived from signals the
//! engine already tracks: the cache's own byte budget for memory
//! pressure, and the Pre-loader's own in-flight background-load count
//! for CPU/concurrency pressure. This is a narrower but still
//! resource-grounded proxy for the two signals spec §4.G names.

use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Hysteresis band: a sample must clear a threshold by this much
/// beyond the last level's cutoff before a transition is allowed, and
/// transitions are further rate-limited by `COOLDOWN` below, so brief
/// blips don't flap the config back and forth (spec §4.G "transitions
/// hysteretic enough not to flap").
const MEDIUM_CUTOFF: f64 = 0.5;
const HIGH_CUTOFF: f64 = 0.8;
const COOLDOWN: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PressureLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelComplexity {
    Low,
    Medium,
    High,
}

/// One resampling input: the two pressure signals the controller acts
/// on, both already normalised to `[0, 1]` by the caller.
#[derive(Debug, Clone, Copy)]
pub struct ResourceSample {
    pub memory_pressure: f64,
    pub cpu_pressure: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdaptiveSettings {
    pub max_concurrent_loads: usize,
    pub background_loading_enabled: bool,
    pub prediction_threshold: f64,
    pub model_complexity: ModelComplexity,
}

impl Default for AdaptiveSettings {
    fn default() -> Self {
        Self {
            max_concurrent_loads: 4,
            background_loading_enabled: true,
            prediction_threshold: 0.5,
            model_complexity: ModelComplexity::Medium,
        }
    }
}

struct State {
    settings: AdaptiveSettings,
    level: PressureLevel,
    last_transition: Instant,
}

/// Runtime-tuned `(max_concurrent_loads, threshold, complexity,
/// enabled)`, driven by resource signals (spec §4.G "Adaptive
/// configuration" / glossary).
pub struct AdaptiveConfig {
    state: RwLock<State>,
}

impl AdaptiveConfig {
    pub fn new(defaults: AdaptiveSettings) -> Self {
        Self {
            state: RwLock::new(State {
                settings: defaults,
                level: PressureLevel::Low,
                last_transition: Instant::now() - COOLDOWN,
            }),
        }
    }

    pub fn settings(&self) -> AdaptiveSettings {
        self.state.read().settings.clone()
    }

    fn level_for(sample: ResourceSample) -> PressureLevel {
        let pressure = sample.memory_pressure.max(sample.cpu_pressure);
        if pressure >= HIGH_CUTOFF {
            PressureLevel::High
        } else if pressure >= MEDIUM_CUTOFF {
            PressureLevel::Medium
        } else {
            PressureLevel::Low
        }
    }

    fn settings_for(level: PressureLevel) -> AdaptiveSettings {
        match level {
            PressureLevel::Low => AdaptiveSettings {
                max_concurrent_loads: 8,
                background_loading_enabled: true,
                prediction_threshold: 0.4,
                model_complexity: ModelComplexity::High,
            },
            PressureLevel::Medium => AdaptiveSettings {
                max_concurrent_loads: 4,
                background_loading_enabled: true,
                prediction_threshold: 0.6,
                model_complexity: ModelComplexity::Medium,
            },
            PressureLevel::High => AdaptiveSettings {
                max_concurrent_loads: 1,
                background_loading_enabled: false,
                prediction_threshold: 0.85,
                model_complexity: ModelComplexity::Low,
            },
        }
    }

    /// Apply a new resource sample. Only actually changes `settings` if
    /// the computed level differs from the current one *and* the
    /// cooldown since the last transition has elapsed.
    pub fn resample(&self, sample: ResourceSample) {
        let new_level = Self::level_for(sample);
        let mut state = self.state.write();
        if new_level == state.level {
            return;
        }
        if state.last_transition.elapsed() < COOLDOWN {
            return;
        }
        tracing::debug!(?new_level, previous = ?state.level, "adaptive config: pressure level transition");
        state.level = new_level;
        state.settings = Self::settings_for(new_level);
        state.last_transition = Instant::now();
    }

    pub fn level(&self) -> PressureLevel {
        self.state.read().level
    }
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        Self::new(AdaptiveSettings::default())
    }
}
