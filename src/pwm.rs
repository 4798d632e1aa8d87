//! PWM output abstraction and the available back ends.

use std::time::Duration;

use log::*;
use serde::{Deserialize, Serialize};

#[cfg(target_os = "linux")]
pub mod hardware;
#[cfg(target_os = "linux")]
pub mod software;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Backend {
    /// Software PWM on any GPIO pin
    Software,
    /// SoC PWM peripheral (BCM 12/18 or 13/19)
    Hardware,
    /// Log duty cycle changes without touching any hardware
    DryRun,
}

/// A running PWM output on a single pin.
pub trait PwmChannel {
    /// Sets the duty cycle, in percent of the period.
    fn set_duty(&mut self, percent: f64) -> Result<(), Box<dyn std::error::Error>>;
    /// Stops PWM output, leaving the line low.
    fn stop(&mut self) -> Result<(), Box<dyn std::error::Error>>;
    /// Gives the pin back to the system.
    fn release(self) -> Result<(), Box<dyn std::error::Error>>
    where
        Self: Sized;
}

pub trait PwmDriver {
    type Channel: PwmChannel;

    /// Configures `pin` as an output and starts PWM at `frequency` Hz with
    /// a duty cycle of `percent`.
    fn start_pwm(
        &mut self,
        pin: u8,
        frequency: f64,
        percent: f64,
    ) -> Result<Self::Channel, Box<dyn std::error::Error>>;
}

/// High time of a single period at the given duty cycle.
pub fn pulse_width(percent: f64, frequency: f64) -> Duration {
    let nanos = percent.clamp(0.0, 100.0) / 100.0 * 1e9 / frequency;
    Duration::from_nanos(nanos.round() as u64)
}

#[derive(Debug, Default)]
pub struct DryRunDriver;

#[derive(Debug)]
pub struct DryRunChannel {
    pin: u8,
    frequency: f64,
    duty: f64,
}

impl PwmDriver for DryRunDriver {
    type Channel = DryRunChannel;

    fn start_pwm(
        &mut self,
        pin: u8,
        frequency: f64,
        percent: f64,
    ) -> Result<Self::Channel, Box<dyn std::error::Error>> {
        info!("[dry-run] GPIO {}: PWM started at {} Hz, {:.2}%", pin, frequency, percent);
        Ok(DryRunChannel {
            pin,
            frequency,
            duty: percent,
        })
    }
}

impl PwmChannel for DryRunChannel {
    fn set_duty(&mut self, percent: f64) -> Result<(), Box<dyn std::error::Error>> {
        self.duty = percent;
        debug!(
            "[dry-run] GPIO {}: duty {:.2}% ({:?} pulse)",
            self.pin,
            percent,
            pulse_width(percent, self.frequency)
        );
        Ok(())
    }

    fn stop(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        info!("[dry-run] GPIO {}: PWM stopped at {:.2}%", self.pin, self.duty);
        Ok(())
    }

    fn release(self) -> Result<(), Box<dyn std::error::Error>> {
        info!("[dry-run] GPIO {}: released", self.pin);
        Ok(())
    }
}
