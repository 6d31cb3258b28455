//! # engine-predict
//!
//! The Predictive Pre-loader (spec §4.G): three signal sources (recent
//! access window, workspace dependency graph, optional co-modification
//! history), a per-candidate feature vector, a pluggable [`Predictor`]
//! interface with four reference implementations, an adaptive resource
//! gate, and a configurable ordered list of warming strategies —
//! composed by [`Preloader`], the single [`engine_core::events::AccessEventSink`]
//! the Execution Engine feeds.

pub mod access_window;
pub mod adaptive_config;
pub mod dependency_graph;
pub mod errors;
pub mod features;
pub mod predictor;
pub mod preloader;
pub mod warming;

pub use access_window::{AccessRecord, AccessWindow};
pub use adaptive_config::{AdaptiveConfig, AdaptiveSettings, ModelComplexity, PressureLevel, ResourceSample};
pub use dependency_graph::DependencyGraph;
pub use errors::{PredictError, PredictResult};
pub use features::{FeatureVector, FEATURE_COUNT, FEATURE_NAMES};
pub use predictor::{DecisionTreePredictor, EnsemblePredictor, LinearPredictor, NeuralPredictor, Predictor, TrainingPattern};
pub use preloader::{Preloader, PreloaderConfig};
pub use warming::{default_strategies, WarmingSources, WarmingStrategy, WarmingTrigger};
