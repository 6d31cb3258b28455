//! Per-candidate feature vector (spec §4.G step 2): thirteen real
//! scalars, each normalised into `[0, 1]`, fed to the configured
//! [`crate::predictor::Predictor`].

use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::access_window::AccessWindow;
use crate::dependency_graph::DependencyGraph;

pub const FEATURE_NAMES: [&str; 13] = [
    "temporal_proximity",
    "spatial_proximity",
    "access_frequency",
    "file_type",
    "directory_depth",
    "dependency_count",
    "mean_dependency_strength",
    "in_degree",
    "entry_point",
    "core_file",
    "workspace_relevance",
    "time_of_day",
    "day_of_week",
];

pub const FEATURE_COUNT: usize = FEATURE_NAMES.len();

/// One candidate file's scored input, normalised so no single feature
/// dominates by scale (spec §4.G step 2).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub temporal_proximity: f64,
    pub spatial_proximity: f64,
    pub access_frequency: f64,
    pub file_type: f64,
    pub directory_depth: f64,
    pub dependency_count: f64,
    pub mean_dependency_strength: f64,
    pub in_degree: f64,
    pub entry_point: f64,
    pub core_file: f64,
    pub workspace_relevance: f64,
    pub time_of_day: f64,
    pub day_of_week: f64,
}

impl FeatureVector {
    pub fn as_array(&self) -> [f64; FEATURE_COUNT] {
        [
            self.temporal_proximity,
            self.spatial_proximity,
            self.access_frequency,
            self.file_type,
            self.directory_depth,
            self.dependency_count,
            self.mean_dependency_strength,
            self.in_degree,
            self.entry_point,
            self.core_file,
            self.workspace_relevance,
            self.time_of_day,
            self.day_of_week,
        ]
    }
}

/// Files whose name marks them as a natural entry point, independent of
/// language (spec §4.G "entry-point flag").
pub(crate) const ENTRY_POINT_NAMES: [&str; 6] =
    ["main.rs", "lib.rs", "index.ts", "index.js", "main.py", "__init__.py"];

/// Directories that usually hold load-bearing, widely-depended-upon
/// code rather than leaves (spec §4.G "core-file flag").
const CORE_DIR_HINTS: [&str; 4] = ["src/core", "src/lib", "lib", "core"];

/// Extract the feature vector for `candidate`, relative to the trigger
/// file `trigger` that started this prediction round.
pub fn extract(
    candidate: &Path,
    trigger: &Path,
    window: &AccessWindow,
    deps: &DependencyGraph,
    now: SystemTime,
) -> FeatureVector {
    let temporal_proximity = window
        .last_access(candidate)
        .and_then(|t| now.duration_since(t).ok())
        .map(exponential_decay)
        .unwrap_or(0.0);

    let spatial_proximity = shared_prefix_ratio(candidate, trigger);

    let access_frequency = normalise_count(window.frequency(candidate), 20);

    let file_type = if extension_of(candidate) == extension_of(trigger) { 1.0 } else { 0.0 };

    let directory_depth = normalise_count(candidate.components().count(), 12);

    let dependency_count = normalise_count(deps.dependencies(candidate).len(), 16);
    let mean_dependency_strength = deps.mean_dependency_strength(candidate).clamp(0.0, 1.0);
    let in_degree = normalise_count(deps.in_degree(candidate), 16);

    let entry_point = if is_entry_point(candidate) { 1.0 } else { 0.0 };
    let core_file = if is_core_file(candidate) { 1.0 } else { 0.0 };

    // A simple composite: a file is "workspace relevant" the more other
    // files depend on it and the more recently it's been touched.
    let workspace_relevance = (in_degree + temporal_proximity) / 2.0;

    let (time_of_day, day_of_week) = time_features(now);

    FeatureVector {
        temporal_proximity,
        spatial_proximity,
        access_frequency,
        file_type,
        directory_depth,
        dependency_count,
        mean_dependency_strength,
        in_degree,
        entry_point,
        core_file,
        workspace_relevance,
        time_of_day,
        day_of_week,
    }
}

/// Exponential decay over elapsed time since last access, halving every
/// five minutes; caps at 1.0 for `age == 0`.
fn exponential_decay(age: Duration) -> f64 {
    const HALF_LIFE_SECS: f64 = 300.0;
    let secs = age.as_secs_f64().max(0.0);
    (-secs * std::f64::consts::LN_2 / HALF_LIFE_SECS).exp()
}

fn shared_prefix_ratio(a: &Path, b: &Path) -> f64 {
    let a_parts: Vec<_> = a.components().collect();
    let b_parts: Vec<_> = b.components().collect();
    let shared = a_parts.iter().zip(b_parts.iter()).take_while(|(x, y)| x == y).count();
    let longest = a_parts.len().max(b_parts.len()).max(1);
    shared as f64 / longest as f64
}

fn normalise_count(count: usize, scale: usize) -> f64 {
    (count as f64 / scale.max(1) as f64).min(1.0)
}

fn extension_of(path: &Path) -> &str {
    path.extension().and_then(|e| e.to_str()).unwrap_or("")
}

fn is_entry_point(path: &Path) -> bool {
    path.file_name().and_then(|n| n.to_str()).map(|n| ENTRY_POINT_NAMES.contains(&n)).unwrap_or(false)
}

fn is_core_file(path: &Path) -> bool {
    let normalised = path.to_string_lossy().replace('\\', "/");
    CORE_DIR_HINTS.iter().any(|hint| normalised.contains(hint))
}

/// `(time_of_day, day_of_week)`, both normalised to `[0, 1]`. Calendar
/// math deliberately avoids pulling in a date/time crate the rest of
/// the corpus doesn't use: seconds-since-epoch modulo a day/week is
/// enough precision for a soft periodic signal, not a scheduling clock.
fn time_features(now: SystemTime) -> (f64, f64) {
    let secs = now.duration_since(UNIX_EPOCH).unwrap_or_default().as_secs();
    const DAY: u64 = 86_400;
    const WEEK: u64 = DAY * 7;
    let time_of_day = (secs % DAY) as f64 / DAY as f64;
    let day_of_week = (secs % WEEK) as f64 / WEEK as f64;
    (time_of_day, day_of_week)
}
