//! # waittemp-core
//!
//! Core library for waittemp providing the pieces shared by the
//! temperature sensor and its poll loop.
//!
//! ## Features
//!
//! - **Error handling** - One error type with context for every failure mode
//! - **Configuration** - Compile-time defaults bundled in [`MonitorConfig`]
//! - **Screen abstraction** - [`Screen`] trait so the poll loop never writes escape codes itself
//! - **Formatting** - Header and multi-column core temperature table
//! - **System helpers** - Terminal width and online CPU count
//!
//! ## Quick Start
//!
//! ```rust
//! use waittemp_core::format;
//!
//! let temps = [Some(45), None, Some(70)];
//! let table = format::table(&temps, 80);
//! assert_eq!(table, "Core  0: 45 °C\tCore  2: 70 °C\t\n");
//! ```

use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

/// Result type for waittemp operations.
pub type Result<T> = std::result::Result<T, SensorError>;

/// Pause between two sampling passes.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Root of the Linux hardware monitoring class.
pub const DEFAULT_HWMON_ROOT: &str = "/sys/class/hwmon";

/// Driver name reported by Intel per-core temperature sensors.
pub const DEFAULT_DRIVER_NAME: &str = "coretemp";

/// Kernel list of online logical CPUs.
pub const DEFAULT_CPU_ONLINE_PATH: &str = "/sys/devices/system/cpu/online";

/// Width assumed when the terminal cannot be queried.
pub const DEFAULT_TERMINAL_WIDTH: usize = 80;

/// Index of the `tempN_input` file that belongs to core 0.
///
/// On coretemp, `temp1` is the package sensor and core sensors start at 2.
pub const DEFAULT_FIRST_CORE_INPUT: usize = 2;

/// Configuration for sensor discovery and the poll loop.
///
/// Nothing here is read from disk or the environment. The defaults describe
/// a stock Linux machine; tests override the paths to point at a fabricated
/// sysfs tree.
///
/// # Examples
///
/// ```rust
/// use waittemp_core::MonitorConfig;
/// use std::time::Duration;
///
/// let config = MonitorConfig::new()
///     .with_hwmon_root("/tmp/hwmon")
///     .with_poll_interval(Duration::from_millis(10));
///
/// assert_eq!(config.driver_identity(), "coretemp\n");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    /// Directory whose symlinked entries are candidate sensor chips
    pub hwmon_root: PathBuf,
    /// Driver name expected in a chip's `name` file
    pub driver_name: String,
    /// `tempN_input` index of core 0
    pub first_core_input: usize,
    /// Pause after each displayed sample
    pub poll_interval: Duration,
    /// File listing the online logical CPUs
    pub cpu_online_path: PathBuf,
    /// Layout width used when `tput cols` fails
    pub default_terminal_width: usize,
}

impl MonitorConfig {
    /// Create a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the hardware monitoring root directory.
    #[must_use]
    pub fn with_hwmon_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.hwmon_root = root.into();
        self
    }

    /// Set the driver name to look for.
    #[must_use]
    pub fn with_driver_name(mut self, name: impl Into<String>) -> Self {
        self.driver_name = name.into();
        self
    }

    /// Set the pause between samples.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the path of the online CPU list.
    #[must_use]
    pub fn with_cpu_online_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.cpu_online_path = path.into();
        self
    }

    /// Expected first line of the chip's `name` file, newline included.
    #[must_use]
    pub fn driver_identity(&self) -> String {
        format!("{}\n", self.driver_name)
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            hwmon_root: PathBuf::from(DEFAULT_HWMON_ROOT),
            driver_name: DEFAULT_DRIVER_NAME.to_owned(),
            first_core_input: DEFAULT_FIRST_CORE_INPUT,
            poll_interval: POLL_INTERVAL,
            cpu_online_path: PathBuf::from(DEFAULT_CPU_ONLINE_PATH),
            default_terminal_width: DEFAULT_TERMINAL_WIDTH,
        }
    }
}

/// Output surface for the poll loop.
///
/// The terminal implementation clears with an escape sequence; other front
/// ends may make [`Screen::clear`] a no-op without touching the loop.
pub trait Screen {
    /// Wipe whatever the previous sample left on screen.
    ///
    /// # Errors
    ///
    /// Returns an error if the output cannot be written.
    fn clear(&mut self) -> Result<()>;

    /// Append text to the output.
    ///
    /// # Errors
    ///
    /// Returns an error if the output cannot be written.
    fn show(&mut self, text: &str) -> Result<()>;

    /// Current layout width in columns.
    fn width(&self) -> usize;
}

/// [`Screen`] backed by the process's standard output.
#[derive(Debug)]
pub struct TerminalScreen {
    out: io::Stdout,
    default_width: usize,
}

impl TerminalScreen {
    /// Full terminal reset, which also clears the scrollback on most emulators.
    pub const CLEAR: &'static str = "\x1bc";

    #[must_use]
    pub fn new(default_width: usize) -> Self {
        Self {
            out: io::stdout(),
            default_width,
        }
    }
}

impl Default for TerminalScreen {
    fn default() -> Self {
        Self::new(DEFAULT_TERMINAL_WIDTH)
    }
}

impl Screen for TerminalScreen {
    fn clear(&mut self) -> Result<()> {
        self.show(Self::CLEAR)
    }

    fn show(&mut self, text: &str) -> Result<()> {
        let mut out = self.out.lock();
        out.write_all(text.as_bytes())?;
        out.flush()?;
        Ok(())
    }

    fn width(&self) -> usize {
        system::terminal_width(self.default_width)
    }
}

/// Utility functions for rendering samples as text.
pub mod format {
    use std::path::Path;

    /// Columns reserved for one `Core NN: TT °C` cell.
    pub const CELL_WIDTH: usize = 16;

    /// Number of cells that fit on one line, never less than one.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use waittemp_core::format;
    ///
    /// assert_eq!(format::cells_per_line(80), 5);
    /// assert_eq!(format::cells_per_line(10), 1);
    /// ```
    #[must_use]
    pub fn cells_per_line(terminal_width: usize) -> usize {
        (terminal_width / CELL_WIDTH).max(1)
    }

    /// Label for one core reading.
    #[must_use]
    pub fn cell(core: usize, celsius: i64) -> String {
        format!("Core {core:2}: {celsius:02} °C\t")
    }

    /// Render per-core readings as a table sized to the terminal.
    ///
    /// Slots holding `None` are skipped and take no cell. A line break
    /// follows every `cells_per_line`-th emitted cell, and the table always
    /// ends with a newline.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use waittemp_core::format;
    ///
    /// let table = format::table(&[Some(40), Some(41), Some(42)], 32);
    /// assert_eq!(table, "Core  0: 40 °C\tCore  1: 41 °C\t\nCore  2: 42 °C\t\n");
    /// ```
    #[must_use]
    pub fn table(temps: &[Option<i64>], terminal_width: usize) -> String {
        let per_line = cells_per_line(terminal_width);
        let mut out = String::new();

        let readings = temps
            .iter()
            .enumerate()
            .filter_map(|(core, temp)| temp.map(|t| (core, t)));

        for (emitted, (core, celsius)) in readings.enumerate() {
            out.push_str(&cell(core, celsius));
            if (emitted + 1) % per_line == 0 {
                out.push('\n');
            }
        }

        out.push('\n');
        out
    }

    /// Lines printed above the table on every sample.
    #[must_use]
    pub fn header(sensor_dir: &Path, started: &str, target: u64, sample: u64) -> String {
        format!(
            "CPU temperature info dir: {}\nTime Begin:\t{}\nTarget temp:\t{:02} °C\n## Time Count: {}\n",
            sensor_dir.display(),
            started,
            target,
            sample
        )
    }

    /// Line printed once the target has been reached.
    #[must_use]
    pub fn finished(ended: &str) -> String {
        format!("Time End:\t{ended}\n")
    }
}

/// Wall-clock timestamps for the header and footer.
pub mod clock {
    use chrono::{Local, NaiveDateTime};

    /// `strftime` pattern used for every displayed timestamp.
    pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    /// Current local time as `YYYY-MM-DD HH:MM:SS`.
    #[must_use]
    pub fn now() -> String {
        format_timestamp(&Local::now().naive_local())
    }

    #[must_use]
    pub fn format_timestamp(at: &NaiveDateTime) -> String {
        at.format(TIMESTAMP_FORMAT).to_string()
    }
}

/// Queries against the running system.
pub mod system {
    use log::debug;
    use std::fs;
    use std::num::NonZeroUsize;
    use std::path::Path;
    use std::process::{Command, Stdio};
    use std::thread;

    /// Terminal width reported by `tput cols`, or `default` when unavailable.
    ///
    /// Best effort: any failure falls back silently.
    #[must_use]
    pub fn terminal_width(default: usize) -> usize {
        let mut tput = Command::new("tput");
        tput.arg("cols")
            .stdin(Stdio::inherit())
            .stderr(Stdio::inherit());
        columns_from(tput, default)
    }

    /// Run `command` and parse its output as a column count.
    #[must_use]
    pub fn columns_from(mut command: Command, default: usize) -> usize {
        match command.output() {
            Ok(output) if output.status.success() => {
                parse_columns(&String::from_utf8_lossy(&output.stdout)).unwrap_or_else(|| {
                    debug!("{command:?} returned unparseable output, using width {default}");
                    default
                })
            }
            Ok(output) => {
                debug!("{command:?} exited with {}, using width {default}", output.status);
                default
            }
            Err(e) => {
                debug!("failed to run {command:?} ({e}), using width {default}");
                default
            }
        }
    }

    /// Parse the column count printed by `tput cols`.
    #[must_use]
    pub fn parse_columns(output: &str) -> Option<usize> {
        output.trim().parse().ok()
    }

    /// Number of online logical CPUs.
    ///
    /// Reads the kernel cpulist at `online_path`, falling back to the
    /// parallelism reported by the standard library and finally to 1.
    #[must_use]
    pub fn online_cpu_count(online_path: &Path) -> usize {
        let from_sysfs = fs::read_to_string(online_path)
            .ok()
            .and_then(|list| parse_cpu_list(&list))
            .filter(|&count| count > 0);

        if let Some(count) = from_sysfs {
            return count;
        }

        debug!(
            "could not read online CPUs from {}, using available parallelism",
            online_path.display()
        );
        thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1)
    }

    /// Count the CPUs in a kernel cpulist such as `0-3,6,8-9`.
    ///
    /// Returns `None` for an empty or malformed list.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use waittemp_core::system;
    ///
    /// assert_eq!(system::parse_cpu_list("0-3,6,8-9\n"), Some(7));
    /// assert_eq!(system::parse_cpu_list("0"), Some(1));
    /// assert_eq!(system::parse_cpu_list("3-1"), None);
    /// ```
    #[must_use]
    pub fn parse_cpu_list(list: &str) -> Option<usize> {
        let list = list.trim();
        if list.is_empty() {
            return None;
        }

        list.split(',').try_fold(0usize, |count, range| {
            let range = range.trim();
            match range.split_once('-') {
                Some((first, last)) => {
                    let first: usize = first.parse().ok()?;
                    let last: usize = last.parse().ok()?;
                    if last < first {
                        return None;
                    }
                    Some(count + last - first + 1)
                }
                None => {
                    range.parse::<usize>().ok()?;
                    Some(count + 1)
                }
            }
        })
    }
}

/// Common error types for sensor operations.
#[derive(Debug, thiserror::Error)]
pub enum SensorError {
    /// I/O error occurred while reading sensor data or writing output.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Sensor is not available on this system.
    #[error("Sensor unavailable: {reason}")]
    Unavailable {
        /// Reason why the sensor is unavailable
        reason: String,
    },

    /// Command line value rejected.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of what is wrong with the value
        message: String,
        /// The rejected value if applicable
        value: Option<String>,
    },
}

impl SensorError {
    /// Create a new unavailable error.
    pub fn unavailable<S: Into<String>>(reason: S) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    /// Create a new invalid argument error carrying the rejected value.
    pub fn invalid_argument<S: Into<String>, V: Into<String>>(message: S, value: V) -> Self {
        Self::InvalidArgument {
            message: message.into(),
            value: Some(value.into()),
        }
    }

    /// Create a new invalid argument error without a value.
    pub fn missing_argument<S: Into<String>>(message: S) -> Self {
        Self::InvalidArgument {
            message: message.into(),
            value: None,
        }
    }
}
