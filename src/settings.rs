use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::oscillator::DutyRange;
use crate::pwm::Backend;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepSettings {
    /// BCM GPIO number the servo signal line is connected to
    pub pin: u8,
    /// PWM frequency in Hz. Hobby servos expect 50 Hz.
    pub frequency: f64,
    pub backend: Backend,

    pub duty_min: f64,
    pub duty_center: f64,
    pub duty_max: f64,
    pub duty_step: f64,

    pub tick_interval_ms: u64,
    pub turn_pause_ms: u64,
    pub hold_ms: u64,
    pub settle_ms: u64,
}

impl Default for SweepSettings {
    fn default() -> Self {
        Self {
            pin: 12,
            frequency: 50.0,
            backend: Backend::Software,

            duty_min: 2.1,
            duty_center: 6.0,
            duty_max: 10.9,
            duty_step: -0.1,

            tick_interval_ms: 100,
            turn_pause_ms: 1_000,
            hold_ms: 3_000,
            settle_ms: 1_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SettingsError {
    Frequency(f64),
    Range { min: f64, max: f64 },
    Center { center: f64, min: f64, max: f64 },
    Step { step: f64, span: f64 },
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Frequency(frequency) => write!(f, "invalid PWM frequency {} Hz", frequency),
            Self::Range { min, max } => {
                write!(f, "duty range [{}, {}] must satisfy 0 <= min < max <= 100", min, max)
            }
            Self::Center { center, min, max } => {
                write!(f, "center duty {} lies outside [{}, {}]", center, min, max)
            }
            Self::Step { step, span } => {
                write!(f, "duty step {} must be non-zero and at most half the range ({})", step, span / 2.0)
            }
        }
    }
}

impl std::error::Error for SettingsError {}

impl SweepSettings {
    pub fn range(&self) -> DutyRange {
        DutyRange {
            min: self.duty_min,
            max: self.duty_max,
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn turn_pause(&self) -> Duration {
        Duration::from_millis(self.turn_pause_ms)
    }

    pub fn hold(&self) -> Duration {
        Duration::from_millis(self.hold_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if !self.frequency.is_finite() || self.frequency <= 0.0 {
            return Err(SettingsError::Frequency(self.frequency));
        }

        let (min, max) = (self.duty_min, self.duty_max);
        // Written so that NaN fails every comparison
        if !(0.0 <= min && min < max && max <= 100.0) {
            return Err(SettingsError::Range { min, max });
        }

        if !(min <= self.duty_center && self.duty_center <= max) {
            return Err(SettingsError::Center {
                center: self.duty_center,
                min,
                max,
            });
        }

        let span = max - min;
        let step = self.duty_step;
        if !step.is_finite() || step == 0.0 || 2.0 * step.abs() > span {
            return Err(SettingsError::Step { step, span });
        }

        Ok(())
    }

    pub fn default_path() -> Result<PathBuf, Box<dyn std::error::Error>> {
        let project_dirs = directories::ProjectDirs::from("", "", "servo-sweep")
            .ok_or("no home directory to store settings in")?;
        Ok(project_dirs.config_dir().join("config.json"))
    }

    /// Reads settings from `path`, writing the defaults there first if the
    /// file doesn't exist yet.
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        if !path.exists() {
            Self::default().save(path)?;
        }

        let f = File::open(path)?;
        let settings = serde_json::from_reader(f)?;
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(dir) = path.parent() {
            if !dir.exists() {
                std::fs::create_dir_all(dir)?;
            }
        }

        let f = File::create(path)?;
        serde_json::to_writer_pretty(f, self)?;
        Ok(())
    }
}
