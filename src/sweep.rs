//! The control loop: center the servo, sweep until interrupted, then park it
//! at the center and release the pin.

use colored::Colorize;
use log::*;

use crate::interrupt::{Interrupt, Interrupted, Signal};
use crate::oscillator::{Oscillator, Turn};
use crate::pwm::{pulse_width, PwmChannel};
use crate::settings::SweepSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepState {
    Sweeping,
    ShuttingDown,
}

/// Why the sweep ended.
#[derive(Debug)]
pub enum Stop {
    Interrupted(Option<Signal>),
    Failed(Box<dyn std::error::Error>),
}

impl From<Interrupted> for Stop {
    fn from(interrupted: Interrupted) -> Self {
        Self::Interrupted(interrupted.0)
    }
}

impl From<Box<dyn std::error::Error>> for Stop {
    fn from(e: Box<dyn std::error::Error>) -> Self {
        Self::Failed(e)
    }
}

/// Owns the PWM channel until [`Sweeper::shutdown`] releases it. After that
/// the sweeper stays in [`SweepState::ShuttingDown`] and further shutdowns
/// do nothing.
pub struct Sweeper<'a, C: PwmChannel> {
    channel: Option<C>,
    oscillator: Oscillator,
    settings: &'a SweepSettings,
    interrupt: &'a Interrupt,
    state: SweepState,
}

impl<'a, C: PwmChannel> Sweeper<'a, C> {
    pub fn new(channel: C, settings: &'a SweepSettings, interrupt: &'a Interrupt) -> Self {
        Self {
            channel: Some(channel),
            oscillator: Oscillator::new(settings.duty_center, settings.duty_step, settings.range()),
            settings,
            interrupt,
            state: SweepState::Sweeping,
        }
    }

    pub fn state(&self) -> SweepState {
        self.state
    }

    pub fn oscillator(&self) -> &Oscillator {
        &self.oscillator
    }

    fn set_duty(&mut self, percent: f64) -> Result<(), Box<dyn std::error::Error>> {
        match self.channel.as_mut() {
            Some(channel) => channel.set_duty(percent),
            None => Err("PWM channel already released".into()),
        }
    }

    /// Moves the servo to the center and holds it there.
    pub fn initialize(&mut self) -> Result<(), Stop> {
        let center = self.settings.duty_center;
        info!(
            "Center ({:.1}%, {:?} pulse)",
            center,
            pulse_width(center, self.settings.frequency)
        );

        self.set_duty(center)?;
        self.oscillator = Oscillator::new(center, self.settings.duty_step, self.settings.range());
        self.interrupt.pause(self.settings.hold())?;
        Ok(())
    }

    /// Writes the current duty cycle, waits one tick, and advances. Rests a
    /// little longer when the sweep turns around.
    pub fn tick(&mut self) -> Result<Option<Turn>, Stop> {
        let duty = self.oscillator.current();
        info!("Duty cycle {:.1}", duty);
        self.set_duty(duty)?;
        self.interrupt.pause(self.settings.tick_interval())?;

        let turn = self.oscillator.advance();
        if let Some(turn) = turn {
            let bound = match turn {
                Turn::Lower => "lower",
                Turn::Upper => "upper",
            };
            info!("{} at {} bound", "Turning".bright_yellow().bold(), bound);
            self.interrupt.pause(self.settings.turn_pause())?;
        }

        Ok(turn)
    }

    /// Ticks until interrupted or the hardware fails.
    pub fn sweep(&mut self) -> Stop {
        loop {
            if let Err(stop) = self.tick() {
                return stop;
            }
        }
    }

    /// Parks the servo at the center, stops PWM and releases the pin. Every
    /// step is attempted even if an earlier one failed; the first error is
    /// returned.
    pub fn shutdown(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let mut channel = match self.channel.take() {
            Some(channel) => channel,
            None => return Ok(()),
        };

        debug!("{:?} -> {:?}", self.state, SweepState::ShuttingDown);
        self.state = SweepState::ShuttingDown;
        info!("Center");

        let centered = channel.set_duty(self.settings.duty_center);
        // Not interruptible, the servo needs time to get there
        std::thread::sleep(self.settings.settle());
        let stopped = channel.stop();
        let released = channel.release();

        centered.and(stopped).and(released)
    }
}

/// Sweeps until a signal arrives, then shuts down.
pub fn run<C: PwmChannel>(
    channel: C,
    settings: &SweepSettings,
    interrupt: &Interrupt,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut sweeper = Sweeper::new(channel, settings, interrupt);

    let stop = match sweeper.initialize() {
        Ok(()) => sweeper.sweep(),
        Err(stop) => stop,
    };

    finish(sweeper, stop)
}

/// Centers the servo, holds it, and shuts down without sweeping.
pub fn center<C: PwmChannel>(
    channel: C,
    settings: &SweepSettings,
    interrupt: &Interrupt,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut sweeper = Sweeper::new(channel, settings, interrupt);

    match sweeper.initialize() {
        Ok(()) => sweeper.shutdown(),
        Err(stop) => finish(sweeper, stop),
    }
}

fn finish<C: PwmChannel>(mut sweeper: Sweeper<'_, C>, stop: Stop) -> Result<(), Box<dyn std::error::Error>> {
    match stop {
        Stop::Interrupted(signal) => {
            match signal {
                Some(signal) => info!("Received {}, shutting down", signal),
                None => warn!("Signal listener went away, shutting down"),
            }
            sweeper.shutdown()
        }
        // The channel is dropped with the sweeper, which resets the pin
        Stop::Failed(e) => Err(e),
    }
}
