//! Hardware PWM through the sysfs PWM interface.
//!
//! Requires the `pwm` or `pwm-2chan` device tree overlay, e.g.
//! `dtoverlay=pwm-2chan,pin=12,func=4,pin2=13,func2=4` in `/boot/config.txt`.

use rppal::pwm::{Channel, Polarity, Pwm};

use super::{PwmChannel, PwmDriver};

/// Maps a BCM GPIO number to the PWM channel it can be routed to.
pub fn channel_for_pin(pin: u8) -> Option<Channel> {
    match pin {
        12 | 18 => Some(Channel::Pwm0),
        13 | 19 => Some(Channel::Pwm1),
        _ => None,
    }
}

#[derive(Debug, Default)]
pub struct HardwarePwmDriver;

pub struct HardwarePwmChannel {
    pwm: Pwm,
}

impl PwmDriver for HardwarePwmDriver {
    type Channel = HardwarePwmChannel;

    fn start_pwm(
        &mut self,
        pin: u8,
        frequency: f64,
        percent: f64,
    ) -> Result<Self::Channel, Box<dyn std::error::Error>> {
        let channel = channel_for_pin(pin)
            .ok_or_else(|| format!("GPIO {} has no hardware PWM channel, use 12, 13, 18 or 19", pin))?;
        let pwm = Pwm::with_frequency(channel, frequency, percent / 100.0, Polarity::Normal, true)?;
        Ok(HardwarePwmChannel { pwm })
    }
}

impl PwmChannel for HardwarePwmChannel {
    fn set_duty(&mut self, percent: f64) -> Result<(), Box<dyn std::error::Error>> {
        self.pwm.set_duty_cycle(percent / 100.0)?;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.pwm.disable()?;
        Ok(())
    }

    fn release(self) -> Result<(), Box<dyn std::error::Error>> {
        // Unexports the channel
        drop(self.pwm);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_map_pins_to_pwm_channels() {
        assert_eq!(channel_for_pin(12), Some(Channel::Pwm0));
        assert_eq!(channel_for_pin(18), Some(Channel::Pwm0));
        assert_eq!(channel_for_pin(13), Some(Channel::Pwm1));
        assert_eq!(channel_for_pin(19), Some(Channel::Pwm1));
        assert_eq!(channel_for_pin(17), None);
    }

    #[test]
    fn should_reject_pins_without_pwm() {
        let err = HardwarePwmDriver.start_pwm(4, 50.0, 6.0).err().unwrap();
        assert!(err.to_string().contains("GPIO 4"));
    }
}
