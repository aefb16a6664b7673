//! structwin core library.
//!
//! Belief-space maintenance engine for a k-out-of-n structure whose
//! components crack under uncertain stress. Each component can be inspected,
//! monitored by a physical load sensor, or monitored by a digital-twin
//! virtual sensor whose own noise level is uncertain. The binary
//! (`src/main.rs`) is a thin Monte Carlo harness around these components.
//!
//! # Layers
//!
//! - **Model** (`model`, `linalg`): the POMDP artifact (transition and
//!   observation matrices, interval edges, initial beliefs). Loaded from
//!   JSON or built synthetically; validated before use.
//!
//! - **Reliability** (`reliability`): k-out-of-n system failure
//!   probability from per-component failure probabilities.
//!
//! - **Digital twin** (`twin_observation`): virtual-sensor likelihood for a
//!   sampled noise level.
//!
//! - **Belief update** (`belief`): one-step Bayesian filter per component,
//!   dispatching on (action, twin mode).
//!
//! - **Cost** (`cost`): action costs plus failure-risk cost.
//!
//! # Episodes
//!
//! - **StructEnv** (`env`): Gym-style reset / step over all components
//! - **Policy** (`policy`): baseline maintenance policies
//! - **Runner** (`runner`): episode and Monte Carlo loops
//! - **EventSink** (`logging`): JSONL step telemetry

pub mod belief;
pub mod config;
pub mod cost;
pub mod env;
pub mod error;
pub mod linalg;
pub mod logging;
pub mod model;
pub mod policy;
pub mod reliability;
pub mod runner;
pub mod twin_observation;
pub mod types;

// --- Re-exports for ergonomic external use ---------------------------------

pub use belief::{posterior, predictive, sample_observation, BeliefUpdateEngine, ComponentUpdate};
pub use config::{Config, CostConfig, EnvConfig, TwinConfig};
pub use cost::{CostBreakdown, CostModel};
pub use env::{AgentObservation, StepInfo, StepResult, StructEnv};
pub use error::{Result, StructError};
pub use linalg::Matrix;
pub use logging::{EventSink, FileSink, MemorySink, NoopSink, StepRecord};
pub use model::{PomdpModel, SyntheticModelParams};
pub use policy::{
    ConditionBasedPolicy, ConditionThresholds, DoNothingPolicy, PeriodicInspectionPolicy, Policy,
};
pub use reliability::system_failure_probability;
pub use runner::{
    run_episode, run_monte_carlo, AggregateStats, EpisodeConfig, EpisodeSummary,
    MonteCarloSummary, TerminationReason,
};
pub use twin_observation::DigitalTwinObservationModel;
pub use types::{Action, ComponentState, TwinMode, TwinUncertainty};
