// src/logging.rs
//
// Telemetry sinks for structwin.
// - EventSink:  trait used by the episode runner
// - NoopSink:   discards all events
// - FileSink:   writes one JSON object per step (JSONL)
// - MemorySink: keeps records in memory for tests and summaries

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::env::StepInfo;
use crate::types::Action;

/// Telemetry schema version written into every record.
pub const STEP_SCHEMA_VERSION: u32 = 1;

/// One line of step telemetry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub schema_version: u32,
    pub episode_id: u64,
    pub seed: u64,
    pub t: usize,
    pub actions: Vec<Action>,
    pub observation_codes: Vec<usize>,
    pub clocks: Vec<usize>,
    /// Failed-crack probability per component after the step.
    pub pf_components: Vec<f64>,
    pub pf_sys_before: f64,
    pub pf_sys_after: f64,
    pub action_cost: f64,
    pub risk_cost: f64,
    pub campaign_cost: f64,
    pub reward: f64,
    pub discounted_reward: f64,
}

impl StepRecord {
    pub fn from_step(episode_id: u64, seed: u64, info: &StepInfo, discounted_reward: f64) -> Self {
        Self {
            schema_version: STEP_SCHEMA_VERSION,
            episode_id,
            seed,
            t: info.time_step,
            actions: info.actions.clone(),
            observation_codes: info.observation_codes.clone(),
            clocks: info.clocks.clone(),
            pf_components: info.cost.pf_components_after.clone(),
            pf_sys_before: info.cost.pf_sys_before,
            pf_sys_after: info.cost.pf_sys_after,
            action_cost: info.cost.action_cost,
            risk_cost: info.cost.risk_cost,
            campaign_cost: info.cost.campaign_cost,
            reward: info.undiscounted_reward,
            discounted_reward,
        }
    }
}

/// Abstract sink for per-step telemetry.
pub trait EventSink {
    fn log_step(&mut self, record: &StepRecord);

    fn flush(&mut self) {}
}

/// Sink that discards all events.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn log_step(&mut self, _record: &StepRecord) {}
}

/// JSONL file sink.
pub struct FileSink {
    writer: BufWriter<File>,
}

impl FileSink {
    /// Create (truncate) a sink writing to `path`.
    pub fn create<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }
}

impl EventSink for FileSink {
    fn log_step(&mut self, record: &StepRecord) {
        // Telemetry must never abort an episode, so I/O errors are dropped.
        if let Ok(line) = serde_json::to_string(record) {
            let _ = self.writer.write_all(line.as_bytes());
            let _ = self.writer.write_all(b"\n");
        }
    }

    fn flush(&mut self) {
        let _ = self.writer.flush();
    }
}

impl Drop for FileSink {
    fn drop(&mut self) {
        let _ = self.writer.flush();
    }
}

/// Keeps every record.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    pub records: Vec<StepRecord>,
}

impl EventSink for MemorySink {
    fn log_step(&mut self, record: &StepRecord) {
        self.records.push(record.clone());
    }
}
