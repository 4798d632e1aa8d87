//! Sweeps a hobby servo back and forth between two duty cycle bounds, and
//! parks it at the center when the process is interrupted.

pub mod interrupt;
pub mod oscillator;
pub mod pwm;
pub mod settings;
pub mod sweep;

pub use crate::interrupt::{Interrupt, Signal};
pub use crate::oscillator::{DutyRange, Oscillator, Turn};
pub use crate::pwm::{Backend, PwmChannel, PwmDriver};
pub use crate::settings::{SettingsError, SweepSettings};
pub use crate::sweep::{Stop, SweepState, Sweeper};
