//! Poll loop that samples core temperatures until the target is reached.

use log::{debug, info, warn};
use std::time::Duration;
use tokio::time;
use waittemp_core::{clock, format, MonitorConfig, Result, Screen};

use crate::coretemp::{CoreTempSensor, CoreTemperatureSet, TemperatureSource};
use crate::target::TargetTemperature;

/// Outcome of a completed wait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    /// Number of samples displayed
    pub samples: u64,
    /// Reading that satisfied the target
    pub last: CoreTemperatureSet,
    /// Timestamp taken before the first sample
    pub started: String,
    /// Timestamp taken after the last sample
    pub finished: String,
}

/// Samples a [`TemperatureSource`] onto a [`Screen`] until every available
/// core is at or below the target.
///
/// Each pass reads, clears the screen, shows the header and table, then
/// sleeps for the poll interval before checking the target. Passes never
/// overlap.
#[derive(Debug)]
pub struct Monitor<S, D> {
    source: S,
    screen: D,
    target: TargetTemperature,
    interval: Duration,
    temps: CoreTemperatureSet,
    samples: u64,
}

impl<S: TemperatureSource, D: Screen> Monitor<S, D> {
    #[must_use]
    pub fn new(source: S, screen: D, target: TargetTemperature, interval: Duration) -> Self {
        let temps = CoreTemperatureSet::new(source.core_count());
        if temps.is_empty() {
            warn!("no cores to sample, the target is met immediately");
        }
        Self {
            source,
            screen,
            target,
            interval,
            temps,
            samples: 0,
        }
    }

    /// Run until the target is reached, then print the end time and the
    /// final table.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to the screen fails.
    pub async fn run(mut self) -> Result<Summary> {
        let started = clock::now();
        info!("waiting for all cores to reach {}", self.target);

        loop {
            self.sample(&started)?;
            time::sleep(self.interval).await;

            if self.temps.all_at_or_below(self.target) {
                break;
            }
        }

        let finished = clock::now();
        debug!("target reached after {} samples", self.samples);
        self.screen.show(&format::finished(&finished))?;
        self.screen
            .show(&format::table(self.temps.as_slice(), self.screen.width()))?;

        Ok(Summary {
            samples: self.samples,
            last: self.temps,
            started,
            finished,
        })
    }

    fn sample(&mut self, started: &str) -> Result<()> {
        self.source.read_into(&mut self.temps);
        self.screen.clear()?;
        self.samples += 1;

        let header = format::header(
            self.source.sensor_dir(),
            started,
            self.target.celsius(),
            self.samples,
        );
        self.screen.show(&header)?;
        self.screen
            .show(&format::table(self.temps.as_slice(), self.screen.width()))?;
        Ok(())
    }
}

/// Discover the coretemp sensor described by `config` and wait on it.
///
/// Nothing is written to `screen` unless discovery succeeds.
///
/// # Errors
///
/// Returns [`waittemp_core::SensorError::Unavailable`] if no sensor
/// directory matches, or an I/O error if writing to the screen fails.
pub async fn wait<D: Screen>(
    config: &MonitorConfig,
    screen: D,
    target: TargetTemperature,
) -> Result<Summary> {
    let sensor = CoreTempSensor::discover(config)?;
    Monitor::new(sensor, screen, target, config.poll_interval)
        .run()
        .await
}
