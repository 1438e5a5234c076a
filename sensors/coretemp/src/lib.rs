//! Per-core CPU temperature waiting for waittemp.
//!
//! This crate locates the coretemp hwmon chip, reads one temperature per
//! online logical core, and polls once per second until every readable
//! core has cooled to a target.
//!
//! # Examples
//!
//! ```rust,no_run
//! use waittemp_core::{MonitorConfig, TerminalScreen};
//! use waittemp_coretemp::{CoreTempSensor, Monitor, TargetTemperature};
//!
//! # async fn wait() -> Result<(), waittemp_core::SensorError> {
//! let config = MonitorConfig::default();
//! let sensor = CoreTempSensor::discover(&config)?;
//! let target: TargetTemperature = "50".parse()?;
//!
//! let summary = Monitor::new(sensor, TerminalScreen::default(), target, config.poll_interval)
//!     .run()
//!     .await?;
//! println!("cooled down after {} samples", summary.samples);
//! # Ok(())
//! # }
//! ```

pub mod coretemp;
pub mod monitor;
pub mod target;

pub use coretemp::{CoreTempSensor, CoreTemperatureSet, SensorDirectory, TemperatureSource};
pub use monitor::{wait, Monitor, Summary};
pub use target::TargetTemperature;
