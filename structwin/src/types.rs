// src/types.rs
//
// Common shared types for the structwin engine: maintenance actions,
// twin operating modes and the per-component state carried between steps.

use serde::{Deserialize, Serialize};

use crate::error::{Result, StructError};

/// Number of digital-twin operating modes.
pub const N_TWIN_MODES: usize = 3;

/// Maintenance / monitoring action for a single component.
///
/// The integer codes are the ones agents emit (`0..=5`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    DoNothing,
    Inspect,
    InstallSensor,
    InspectAndInstall,
    PerfectRepair,
    PerfectRepairWithSensor,
}

/// Which observation channel a non-repair action opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObservationChannel {
    /// No inspection; only the twin (if any) reports.
    Passive,
    /// Visual inspection, fused with whatever the twin reports.
    Inspection,
}

/// How the twin-mode belief evolves under an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TwinTransition {
    /// Repair without sensor: the monitoring setup is lost.
    Repair,
    /// No change to the monitoring setup.
    Passive,
    /// A physical sensor is (re)installed.
    Install,
}

impl Action {
    pub const ALL: [Action; 6] = [
        Action::DoNothing,
        Action::Inspect,
        Action::InstallSensor,
        Action::InspectAndInstall,
        Action::PerfectRepair,
        Action::PerfectRepairWithSensor,
    ];

    pub fn code(self) -> u8 {
        match self {
            Action::DoNothing => 0,
            Action::Inspect => 1,
            Action::InstallSensor => 2,
            Action::InspectAndInstall => 3,
            Action::PerfectRepair => 4,
            Action::PerfectRepairWithSensor => 5,
        }
    }

    pub fn from_code(code: u8) -> Result<Action> {
        match code {
            0 => Ok(Action::DoNothing),
            1 => Ok(Action::Inspect),
            2 => Ok(Action::InstallSensor),
            3 => Ok(Action::InspectAndInstall),
            4 => Ok(Action::PerfectRepair),
            5 => Ok(Action::PerfectRepairWithSensor),
            _ => Err(StructError::InvalidAction { code }),
        }
    }

    /// Perfect repair, with or without a sensor install.
    pub fn is_repair(self) -> bool {
        matches!(self, Action::PerfectRepair | Action::PerfectRepairWithSensor)
    }

    /// Observation channel for the do-nothing family; `None` for repairs.
    pub fn channel(self) -> Option<ObservationChannel> {
        match self {
            Action::DoNothing | Action::InstallSensor => Some(ObservationChannel::Passive),
            Action::Inspect | Action::InspectAndInstall => Some(ObservationChannel::Inspection),
            Action::PerfectRepair | Action::PerfectRepairWithSensor => None,
        }
    }

    pub fn twin_transition(self) -> TwinTransition {
        match self {
            Action::PerfectRepair => TwinTransition::Repair,
            Action::DoNothing | Action::Inspect => TwinTransition::Passive,
            Action::InstallSensor
            | Action::InspectAndInstall
            | Action::PerfectRepairWithSensor => TwinTransition::Install,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Action::DoNothing => "do_nothing",
            Action::Inspect => "inspect",
            Action::InstallSensor => "install_sensor",
            Action::InspectAndInstall => "inspect_and_install",
            Action::PerfectRepair => "perfect_repair",
            Action::PerfectRepairWithSensor => "perfect_repair_with_sensor",
        }
    }
}

/// Digital-twin operating mode of a component.
///
/// Indices follow the model artifact layout: the twin-mode belief and the
/// twin transition matrices are ordered `[Physical, Virtual, NoSensor]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TwinMode {
    /// Physical load sensor installed and reporting.
    Physical,
    /// Sensor retired; a virtual sensor (digital twin) estimates the load.
    Virtual,
    /// No load information.
    NoSensor,
}

impl TwinMode {
    pub fn index(self) -> usize {
        match self {
            TwinMode::Physical => 0,
            TwinMode::Virtual => 1,
            TwinMode::NoSensor => 2,
        }
    }

    pub fn from_index(index: usize) -> Option<TwinMode> {
        match index {
            0 => Some(TwinMode::Physical),
            1 => Some(TwinMode::Virtual),
            2 => Some(TwinMode::NoSensor),
            _ => None,
        }
    }

    /// Resolve the mode from a twin-mode belief.
    ///
    /// The belief must put mass on exactly one mode; anything else is
    /// reported instead of guessing.
    pub fn from_belief(twin_belief: &[f64]) -> Result<TwinMode> {
        if twin_belief.len() != N_TWIN_MODES {
            return Err(StructError::DimensionMismatch {
                what: "twin-mode belief length",
                expected: N_TWIN_MODES,
                actual: twin_belief.len(),
            });
        }
        let mut found = None;
        let mut nonzero = 0;
        for (i, &p) in twin_belief.iter().enumerate() {
            if !p.is_finite() || p < 0.0 {
                return Err(StructError::InvalidBelief {
                    what: "twin-mode",
                    sum: twin_belief.iter().sum(),
                });
            }
            if p > 0.0 {
                nonzero += 1;
                found = TwinMode::from_index(i);
            }
        }
        match (nonzero, found) {
            (1, Some(mode)) => Ok(mode),
            _ => Err(StructError::AmbiguousTwinMode { nonzero }),
        }
    }

    /// One-hot twin-mode belief for this mode.
    pub fn one_hot(self) -> Vec<f64> {
        let mut b = vec![0.0; N_TWIN_MODES];
        b[self.index()] = 1.0;
        b
    }
}

/// Uncertainty of the virtual sensor: `(mean, dispersion ratio)`.
///
/// The noise draw is `Normal(mean, mean * dispersion)`; the drawn value is
/// persisted back into `mean`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TwinUncertainty {
    pub mean: f64,
    pub dispersion: f64,
}

impl TwinUncertainty {
    pub fn new(mean: f64, dispersion: f64) -> Self {
        Self { mean, dispersion }
    }

    pub fn validate(&self) -> Result<()> {
        let ok = self.mean.is_finite()
            && self.dispersion.is_finite()
            && self.mean >= 0.0
            && self.dispersion >= 0.0;
        if ok {
            Ok(())
        } else {
            Err(StructError::InvalidTwinUncertainty {
                mean: self.mean,
                dispersion: self.dispersion,
            })
        }
    }
}

/// Everything the engine tracks for one component between steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentState {
    /// Joint crack/stress belief, crack index outermost.
    pub belief: Vec<f64>,
    /// Belief over twin modes, ordered as `TwinMode::index`.
    pub twin_belief: Vec<f64>,
    pub twin_uncertainty: TwinUncertainty,
    /// Steps since the last perfect repair.
    pub clock: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_codes_round_trip() {
        for a in Action::ALL {
            assert_eq!(Action::from_code(a.code()).unwrap(), a);
        }
        assert_eq!(
            Action::from_code(6),
            Err(StructError::InvalidAction { code: 6 })
        );
    }

    #[test]
    fn repair_actions_have_no_channel() {
        assert_eq!(Action::PerfectRepair.channel(), None);
        assert_eq!(Action::PerfectRepairWithSensor.channel(), None);
        assert_eq!(
            Action::InstallSensor.channel(),
            Some(ObservationChannel::Passive)
        );
        assert_eq!(
            Action::InspectAndInstall.channel(),
            Some(ObservationChannel::Inspection)
        );
    }

    #[test]
    fn repair_with_sensor_installs() {
        assert_eq!(
            Action::PerfectRepairWithSensor.twin_transition(),
            TwinTransition::Install
        );
        assert_eq!(Action::PerfectRepair.twin_transition(), TwinTransition::Repair);
        assert_eq!(Action::Inspect.twin_transition(), TwinTransition::Passive);
    }

    #[test]
    fn twin_mode_from_one_hot() {
        assert_eq!(
            TwinMode::from_belief(&[0.0, 1.0, 0.0]).unwrap(),
            TwinMode::Virtual
        );
        assert_eq!(
            TwinMode::from_belief(&TwinMode::NoSensor.one_hot()).unwrap(),
            TwinMode::NoSensor
        );
    }

    #[test]
    fn mixed_twin_mode_is_flagged() {
        assert_eq!(
            TwinMode::from_belief(&[0.5, 0.5, 0.0]),
            Err(StructError::AmbiguousTwinMode { nonzero: 2 })
        );
        assert_eq!(
            TwinMode::from_belief(&[0.0, 0.0, 0.0]),
            Err(StructError::AmbiguousTwinMode { nonzero: 0 })
        );
    }

    #[test]
    fn negative_twin_uncertainty_rejected() {
        assert!(TwinUncertainty::new(0.1, 0.5).validate().is_ok());
        assert!(TwinUncertainty::new(-0.1, 0.5).validate().is_err());
        assert!(TwinUncertainty::new(0.1, f64::NAN).validate().is_err());
    }
}
