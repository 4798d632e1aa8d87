use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use log::*;

use servo_sweep::pwm::DryRunDriver;
#[cfg(target_os = "linux")]
use servo_sweep::pwm::{hardware::HardwarePwmDriver, software::SoftwarePwmDriver};
use servo_sweep::{sweep, Backend, Interrupt, PwmDriver, SweepSettings};

#[derive(Debug, Parser)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    #[clap(subcommand)]
    command: Option<CliCommand>,
    /// Settings file to use instead of the one in the user config directory
    #[clap(long = "config", global = true)]
    config_path: Option<PathBuf>,
    #[clap(short = 'v', global = true, help = "Enable debug logging, including dry-run PWM writes")]
    verbose: bool,
    #[clap(flatten)]
    overrides: Overrides,
}

#[derive(Debug, Clone, Subcommand)]
enum CliCommand {
    /// Sweep the servo until interrupted [default]
    Sweep,
    /// Move the servo to the center, then release the pin
    Center,
    /// Print the effective settings
    Config {
        #[clap(long, help = "Write the effective settings to the settings file")]
        save: bool,
    },
}

#[derive(Debug, Args)]
struct Overrides {
    /// BCM GPIO number of the servo signal line
    #[clap(long)]
    pin: Option<u8>,
    /// PWM frequency in Hz
    #[clap(long)]
    frequency: Option<f64>,
    #[clap(long, value_enum)]
    backend: Option<Backend>,
    /// Lower duty cycle bound in percent
    #[clap(long)]
    min: Option<f64>,
    /// Duty cycle in percent the servo starts and ends at
    #[clap(long)]
    center: Option<f64>,
    /// Upper duty cycle bound in percent
    #[clap(long)]
    max: Option<f64>,
    /// Duty cycle change per tick; the sign gives the initial direction
    #[clap(long, allow_hyphen_values = true)]
    step: Option<f64>,
}

impl Overrides {
    fn apply(&self, settings: &mut SweepSettings) {
        if let Some(pin) = self.pin {
            settings.pin = pin;
        }
        if let Some(frequency) = self.frequency {
            settings.frequency = frequency;
        }
        if let Some(backend) = self.backend {
            settings.backend = backend;
        }
        if let Some(min) = self.min {
            settings.duty_min = min;
        }
        if let Some(center) = self.center {
            settings.duty_center = center;
        }
        if let Some(max) = self.max {
            settings.duty_max = max;
        }
        if let Some(step) = self.step {
            settings.duty_step = step;
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Mode {
    Sweep,
    Center,
}

fn load_settings(path: &Option<PathBuf>) -> SweepSettings {
    let path = match path {
        Some(path) => Ok(path.clone()),
        None => SweepSettings::default_path(),
    };

    match path.and_then(|p| SweepSettings::load(&p)) {
        Ok(settings) => settings,
        Err(e) => {
            warn!("Failed to load settings ({}), using defaults", e);
            SweepSettings::default()
        }
    }
}

fn drive<D: PwmDriver>(
    mut driver: D,
    settings: &SweepSettings,
    mode: Mode,
) -> Result<(), Box<dyn std::error::Error>> {
    // Handlers go in before the pin is touched, so an early Ctrl-C still
    // leaves the pin released.
    let interrupt = Interrupt::listen()?;

    info!("Start");
    let channel = driver.start_pwm(settings.pin, settings.frequency, settings.duty_center)?;

    match mode {
        Mode::Sweep => sweep::run(channel, settings, &interrupt),
        Mode::Center => sweep::center(channel, settings, &interrupt),
    }
}

fn run(settings: &SweepSettings, mode: Mode) -> Result<(), Box<dyn std::error::Error>> {
    settings.validate()?;
    info!(
        "Servo on GPIO {} at {} Hz via {:?} PWM, sweeping {:.1}% to {:.1}%",
        settings.pin, settings.frequency, settings.backend, settings.duty_min, settings.duty_max
    );

    match settings.backend {
        Backend::DryRun => drive(DryRunDriver, settings, mode)?,
        #[cfg(target_os = "linux")]
        Backend::Software => drive(SoftwarePwmDriver::new()?, settings, mode)?,
        #[cfg(target_os = "linux")]
        Backend::Hardware => drive(HardwarePwmDriver, settings, mode)?,
        #[cfg(not(target_os = "linux"))]
        backend => return Err(format!("{:?} PWM is only available on Linux, use --backend dry-run", backend).into()),
    }

    println!("{} GPIO {}.", "Released".bright_green().bold(), settings.pin);
    Ok(())
}

fn config(settings: &SweepSettings, path: &Option<PathBuf>, save: bool) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(settings)?);

    if let Err(e) = settings.validate() {
        println!("{} {}", "Invalid:".bright_red().bold(), e);
    }

    if save {
        settings.validate()?;
        let path = match path {
            Some(path) => path.clone(),
            None => SweepSettings::default_path()?,
        };
        settings.save(&path)?;
        println!("{} to {}.", "Saved".bright_green().bold(), path.display());
    }

    Ok(())
}

fn log_level(verbose: bool) -> LevelFilter {
    if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Cli::parse();

    env_logger::Builder::new()
        .filter_level(log_level(args.verbose))
        .parse_default_env()
        .init();

    let mut settings = load_settings(&args.config_path);
    args.overrides.apply(&mut settings);

    match args.command.unwrap_or(CliCommand::Sweep) {
        CliCommand::Sweep => run(&settings, Mode::Sweep),
        CliCommand::Center => run(&settings, Mode::Center),
        CliCommand::Config { save } => config(&settings, &args.config_path, save),
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn should_default_to_sweep() {
        let args = Cli::parse_from(["servo-sweep"]);
        assert!(args.command.is_none());
        assert!(!args.verbose);
    }

    #[test]
    fn should_override_loaded_settings() {
        let args = Cli::parse_from([
            "servo-sweep",
            "--pin",
            "18",
            "--backend",
            "dry-run",
            "--step",
            "-0.25",
            "center",
        ]);
        assert!(matches!(args.command, Some(CliCommand::Center)));

        let mut settings = SweepSettings::default();
        args.overrides.apply(&mut settings);
        assert_eq!(settings.pin, 18);
        assert_eq!(settings.backend, Backend::DryRun);
        assert_eq!(settings.duty_step, -0.25);
        assert_eq!(settings.duty_center, 6.0);
    }

    #[test]
    fn should_describe_verbose_as_debug_logging() {
        let command = Cli::command();
        let verbose = command.get_arguments().find(|a| a.get_id() == "verbose").unwrap();
        assert!(verbose.get_help().unwrap().contains("debug"));

        let args = Cli::parse_from(["servo-sweep", "-v"]);
        assert_eq!(log_level(args.verbose), LevelFilter::Debug);
        assert_eq!(log_level(false), LevelFilter::Info);
    }

    #[test]
    fn should_parse_config_save() {
        let args = Cli::parse_from(["servo-sweep", "config", "--save", "--config", "/tmp/sweep.json"]);
        assert!(matches!(args.command, Some(CliCommand::Config { save: true })));
        assert_eq!(args.config_path, Some(PathBuf::from("/tmp/sweep.json")));
    }
}
