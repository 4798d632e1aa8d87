//! Software PWM through the GPIO character device, usable on any pin.
//!
//! Timing comes from a background thread, so pulses jitter slightly under
//! load. Most hobby servos tolerate this, but expect some twitching.

use rppal::gpio::{Gpio, OutputPin};

use super::{PwmChannel, PwmDriver};

pub struct SoftwarePwmDriver {
    gpio: Gpio,
}

impl SoftwarePwmDriver {
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self { gpio: Gpio::new()? })
    }
}

pub struct SoftwarePwmChannel {
    pin: OutputPin,
    frequency: f64,
}

impl PwmDriver for SoftwarePwmDriver {
    type Channel = SoftwarePwmChannel;

    fn start_pwm(
        &mut self,
        pin: u8,
        frequency: f64,
        percent: f64,
    ) -> Result<Self::Channel, Box<dyn std::error::Error>> {
        let mut pin = self.gpio.get(pin)?.into_output_low();
        pin.set_reset_on_drop(true);
        pin.set_pwm_frequency(frequency, percent / 100.0)?;
        Ok(SoftwarePwmChannel { pin, frequency })
    }
}

impl PwmChannel for SoftwarePwmChannel {
    fn set_duty(&mut self, percent: f64) -> Result<(), Box<dyn std::error::Error>> {
        self.pin.set_pwm_frequency(self.frequency, percent / 100.0)?;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.pin.clear_pwm()?;
        self.pin.set_low();
        Ok(())
    }

    fn release(self) -> Result<(), Box<dyn std::error::Error>> {
        // Dropping the pin restores its original mode
        drop(self.pin);
        Ok(())
    }
}
