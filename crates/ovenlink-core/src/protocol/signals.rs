//! Signal codes
//!
//! Defines the register families of the TTC B2 UpS controller and the
//! operation vocabulary used by the write commands.

use serde::{Deserialize, Serialize};

/// Register families addressed by a two-character signal code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Signal {
    /// Analog data request ('01')
    AnalogData,
    /// Digital data request ('51')
    DigitalData,
    /// Remaining step count ('80')
    RemainingSteps,
    /// Step settings read-out ('20')
    StepSetting,
    /// Repeat settings read-out ('21')
    RepeatSetting,
    /// Operation settings read-out ('22')
    OperationSetting,
    /// Time signal settings read-out ('24')
    TimeSignalSetting,
    /// Constant value settings read-out ('25')
    ConstValueSetting,
    /// PID zone settings read-out ('28')
    PidZoneSetting,
    /// PID parameter settings read-out ('29')
    PidParameterSetting,
    /// ON/OFF system settings read-out ('2B')
    OnOffSystemSetting,
    /// Step setting write ('10')
    SetStep,
    /// Constant value write ('15')
    SetConstValue,
    /// Run mode write ('12')
    SetRunMode,
    /// Operation write ('53')
    SetOperation,
}

impl Signal {
    /// Every signal, reads first
    pub const ALL: [Signal; 15] = [
        Signal::AnalogData,
        Signal::DigitalData,
        Signal::RemainingSteps,
        Signal::StepSetting,
        Signal::RepeatSetting,
        Signal::OperationSetting,
        Signal::TimeSignalSetting,
        Signal::ConstValueSetting,
        Signal::PidZoneSetting,
        Signal::PidParameterSetting,
        Signal::OnOffSystemSetting,
        Signal::SetStep,
        Signal::SetConstValue,
        Signal::SetRunMode,
        Signal::SetOperation,
    ];

    /// Get the two-character wire code
    pub fn code(&self) -> &'static str {
        match self {
            Signal::AnalogData => "01",
            Signal::DigitalData => "51",
            Signal::RemainingSteps => "80",
            Signal::StepSetting => "20",
            Signal::RepeatSetting => "21",
            Signal::OperationSetting => "22",
            Signal::TimeSignalSetting => "24",
            Signal::ConstValueSetting => "25",
            Signal::PidZoneSetting => "28",
            Signal::PidParameterSetting => "29",
            Signal::OnOffSystemSetting => "2B",
            Signal::SetStep => "10",
            Signal::SetConstValue => "15",
            Signal::SetRunMode => "12",
            Signal::SetOperation => "53",
        }
    }

    /// Look up a signal by its wire code
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.code() == code)
    }

    /// Check if this signal writes to the controller
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            Signal::SetStep | Signal::SetConstValue | Signal::SetRunMode | Signal::SetOperation
        )
    }
}

/// Operation requested with [`Signal::SetOperation`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationMode {
    /// RUN
    Run,
    /// STOP
    Stop,
    /// HOLD
    Hold,
    /// ADVANCE (skip to the next step)
    Advance,
}

impl OperationMode {
    /// Get the two-character mode field
    pub fn code(&self) -> &'static str {
        match self {
            OperationMode::Run => "01",
            OperationMode::Stop => "02",
            OperationMode::Hold => "03",
            OperationMode::Advance => "04",
        }
    }
}

/// Execute flag appended to the operation mode; ignored by the controller while stopped
pub const OPERATION_EXECUTE: char = '1';

/// Operation state reported by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationStatus {
    /// Stopped (0)
    Stop,
    /// Running (1)
    Run,
    /// Ready (3)
    Ready,
    /// Waiting (5)
    Wait,
    /// Held (17)
    Hold,
    /// Program finished (32)
    End,
}

impl OperationStatus {
    /// Map a numeric status code
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(OperationStatus::Stop),
            1 => Some(OperationStatus::Run),
            3 => Some(OperationStatus::Ready),
            5 => Some(OperationStatus::Wait),
            17 => Some(OperationStatus::Hold),
            32 => Some(OperationStatus::End),
            _ => None,
        }
    }

    /// Parse a decimal status field as it appears in a read-out body
    pub fn parse(field: &str) -> Option<Self> {
        field.trim().parse::<u8>().ok().and_then(Self::from_code)
    }

    /// Numeric status code
    pub fn code(&self) -> u8 {
        match self {
            OperationStatus::Stop => 0,
            OperationStatus::Run => 1,
            OperationStatus::Ready => 3,
            OperationStatus::Wait => 5,
            OperationStatus::Hold => 17,
            OperationStatus::End => 32,
        }
    }
}
