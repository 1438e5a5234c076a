//! Per-core CPU temperature sensor backed by the hwmon sysfs interface.
//!
//! Discovery walks the hwmon class directory for the chip whose `name` file
//! identifies the coretemp driver. Reading then opens one `tempN_input`
//! file per online logical core.

use log::{debug, trace, warn};
use std::fmt;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use waittemp_core::{system, MonitorConfig, Result, SensorError};

use crate::target::TargetTemperature;

/// Directory holding the resolved chip's `tempN_input` files.
///
/// Resolved once at startup and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorDirectory(PathBuf);

impl SensorDirectory {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    #[must_use]
    pub fn as_path(&self) -> &Path {
        &self.0
    }
}

impl Deref for SensorDirectory {
    type Target = Path;

    fn deref(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for SensorDirectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// Latest reading for every online core, in whole degrees Celsius.
///
/// Slot `i` belongs to core `i`. `None` means the core has no readable input
/// file. The length is fixed when the set is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreTemperatureSet {
    slots: Vec<Option<i64>>,
}

impl CoreTemperatureSet {
    /// Create a set for `cores` cores with every slot unavailable.
    #[must_use]
    pub fn new(cores: usize) -> Self {
        Self {
            slots: vec![None; cores],
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Option<i64>] {
        &self.slots
    }

    #[cfg(test)]
    fn get(&self, core: usize) -> Option<i64> {
        self.slots.get(core).copied().flatten()
    }

    /// Number of cores that produced a reading.
    #[must_use]
    pub fn available(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// Whether every available core is at or below `target`.
    ///
    /// Unavailable cores never block, so an all-unavailable set is always
    /// cool enough.
    #[must_use]
    pub fn all_at_or_below(&self, target: TargetTemperature) -> bool {
        self.slots.iter().flatten().all(|&celsius| target.allows(celsius))
    }

    /// Copy `other` into this set slot by slot, keeping the length.
    ///
    /// Slots beyond `other`'s length become unavailable.
    #[cfg(test)]
    pub(crate) fn overwrite(&mut self, other: &[Option<i64>]) {
        for (core, slot) in self.slots.iter_mut().enumerate() {
            *slot = other.get(core).copied().flatten();
        }
    }
}

impl From<Vec<Option<i64>>> for CoreTemperatureSet {
    fn from(slots: Vec<Option<i64>>) -> Self {
        Self { slots }
    }
}

/// Anything the poll loop can sample core temperatures from.
pub trait TemperatureSource {
    /// Directory shown in the display header.
    fn sensor_dir(&self) -> &Path;

    /// Number of slots the loop should allocate.
    fn core_count(&self) -> usize;

    /// Refresh every slot of `temps`.
    ///
    /// Never fails: a core that cannot be read becomes `None`.
    fn read_into(&mut self, temps: &mut CoreTemperatureSet);
}

/// Find the hwmon chip whose `name` file starts with `identity`.
///
/// Only symlinked entries of `root` are considered, matching how the kernel
/// populates `/sys/class/hwmon`. The first line of `name` must equal
/// `identity` exactly, trailing newline included. The first match in
/// directory order wins.
///
/// # Errors
///
/// Returns [`SensorError::Unavailable`] if `root` cannot be listed or no
/// chip matches.
pub fn resolve(root: &Path, identity: &str) -> Result<SensorDirectory> {
    let entries = fs::read_dir(root).map_err(|e| {
        SensorError::unavailable(format!("cannot open {}: {e}", root.display()))
    })?;

    for entry in entries.flatten() {
        let is_link = entry
            .file_type()
            .map(|kind| kind.is_symlink())
            .unwrap_or(false);
        if !is_link {
            continue;
        }

        let chip = entry.path();
        if chip_matches(&chip, identity) {
            debug!("resolved sensor directory {}", chip.display());
            return Ok(SensorDirectory(chip));
        }
    }

    Err(SensorError::unavailable(format!(
        "no hwmon device named '{}' under {}",
        identity.trim_end(),
        root.display()
    )))
}

fn chip_matches(chip: &Path, identity: &str) -> bool {
    let Ok(entries) = fs::read_dir(chip) else {
        debug!("skipping unreadable hwmon entry {}", chip.display());
        return false;
    };

    for entry in entries.flatten() {
        let is_file = entry.file_type().map(|kind| kind.is_file()).unwrap_or(false);
        if !is_file || entry.file_name() != "name" {
            continue;
        }

        match read_first_line(&entry.path()) {
            Ok(line) => {
                trace!("{} reports driver {:?}", chip.display(), line);
                return line == identity;
            }
            Err(e) => {
                warn!("failed to read {}: {e}", entry.path().display());
                return false;
            }
        }
    }

    false
}

fn read_first_line(path: &Path) -> std::io::Result<String> {
    let mut line = String::new();
    BufReader::new(File::open(path)?).read_line(&mut line)?;
    Ok(line)
}

/// Read one `tempN_input` file as whole degrees Celsius.
///
/// The kernel reports millidegrees; the fractional part is truncated.
/// Returns `None` if the file is missing or does not hold an integer.
#[must_use]
pub fn read_core_temperature(path: &Path) -> Option<i64> {
    let content = fs::read_to_string(path).ok()?;
    let millidegrees = content.trim().parse::<i64>().ok()?;
    Some(millidegrees / 1000)
}

/// Per-core temperature sensor for one resolved hwmon chip.
///
/// # Examples
///
/// ```rust,no_run
/// use waittemp_coretemp::CoreTempSensor;
/// use waittemp_core::MonitorConfig;
///
/// let sensor = CoreTempSensor::discover(&MonitorConfig::default())?;
/// let temps = sensor.read_all();
/// println!("{} of {} cores readable", temps.available(), temps.len());
/// # Ok::<(), waittemp_core::SensorError>(())
/// ```
#[derive(Debug, Clone)]
pub struct CoreTempSensor {
    dir: SensorDirectory,
    core_count: usize,
    first_input: usize,
}

impl CoreTempSensor {
    /// Resolve the sensor directory and count online cores.
    ///
    /// # Errors
    ///
    /// Returns [`SensorError::Unavailable`] if no coretemp chip is found.
    pub fn discover(config: &MonitorConfig) -> Result<Self> {
        let dir = resolve(&config.hwmon_root, &config.driver_identity())?;
        let core_count = system::online_cpu_count(&config.cpu_online_path);
        debug!("monitoring {core_count} cores in {dir}");
        Ok(Self::new(dir, core_count, config.first_core_input))
    }

    #[must_use]
    pub fn new(dir: SensorDirectory, core_count: usize, first_input: usize) -> Self {
        Self {
            dir,
            core_count,
            first_input,
        }
    }

    /// Path of the input file for `core`.
    #[must_use]
    pub fn input_path(&self, core: usize) -> PathBuf {
        self.dir.join(format!("temp{}_input", core + self.first_input))
    }

    /// Take a fresh reading of every core.
    #[must_use]
    pub fn read_all(&self) -> CoreTemperatureSet {
        let mut temps = CoreTemperatureSet::new(self.core_count);
        self.fill(&mut temps);
        temps
    }

    fn fill(&self, temps: &mut CoreTemperatureSet) {
        for (core, slot) in temps.slots.iter_mut().enumerate() {
            let path = self.input_path(core);
            *slot = read_core_temperature(&path);
            if slot.is_none() {
                trace!("core {core} unavailable at {}", path.display());
            }
        }
    }
}

impl TemperatureSource for CoreTempSensor {
    fn sensor_dir(&self) -> &Path {
        self.dir.as_path()
    }

    fn core_count(&self) -> usize {
        self.core_count
    }

    fn read_into(&mut self, temps: &mut CoreTemperatureSet) {
        self.fill(temps);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::symlink;
    use tempfile::TempDir;

    /// Build `<tmp>/devices/<chip>` with a `name` file and link it from
    /// `<tmp>/hwmon/<link>`.
    fn add_chip(tmp: &TempDir, link: &str, name: &str) -> PathBuf {
        let device = tmp.path().join("devices").join(link);
        fs::create_dir_all(&device).unwrap();
        fs::write(device.join("name"), name).unwrap();

        let hwmon = tmp.path().join("hwmon");
        fs::create_dir_all(&hwmon).unwrap();
        let linked = hwmon.join(link);
        symlink(&device, &linked).unwrap();
        linked
    }

    #[test]
    fn test_resolve_finds_coretemp() {
        let tmp = tempfile::tempdir().unwrap();
        add_chip(&tmp, "hwmon0", "acpitz\n");
        let expected = add_chip(&tmp, "hwmon1", "coretemp\n");
        add_chip(&tmp, "hwmon2", "nvme\n");

        let dir = resolve(&tmp.path().join("hwmon"), "coretemp\n").unwrap();
        assert_eq!(dir.as_path(), expected);
    }

    #[test]
    fn test_resolve_requires_trailing_newline() {
        let tmp = tempfile::tempdir().unwrap();
        add_chip(&tmp, "hwmon0", "coretemp");

        let err = resolve(&tmp.path().join("hwmon"), "coretemp\n").unwrap_err();
        assert!(matches!(err, SensorError::Unavailable { .. }));
    }

    #[test]
    fn test_resolve_compares_first_line_only() {
        let tmp = tempfile::tempdir().unwrap();
        let expected = add_chip(&tmp, "hwmon0", "coretemp\nsomething else\n");

        let dir = resolve(&tmp.path().join("hwmon"), "coretemp\n").unwrap();
        assert_eq!(dir.as_path(), expected);
    }

    #[test]
    fn test_resolve_rejects_prefix_match() {
        let tmp = tempfile::tempdir().unwrap();
        add_chip(&tmp, "hwmon0", "coretemp2\n");

        assert!(resolve(&tmp.path().join("hwmon"), "coretemp\n").is_err());
    }

    #[test]
    fn test_resolve_ignores_plain_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let hwmon = tmp.path().join("hwmon");
        let plain = hwmon.join("hwmon0");
        fs::create_dir_all(&plain).unwrap();
        fs::write(plain.join("name"), "coretemp\n").unwrap();

        assert!(resolve(&hwmon, "coretemp\n").is_err());
    }

    #[test]
    fn test_resolve_missing_root() {
        let tmp = tempfile::tempdir().unwrap();
        let err = resolve(&tmp.path().join("nope"), "coretemp\n").unwrap_err();
        assert!(matches!(err, SensorError::Unavailable { .. }));
    }

    #[test]
    fn test_resolve_empty_root() {
        let tmp = tempfile::tempdir().unwrap();
        let err = resolve(tmp.path(), "coretemp\n").unwrap_err();
        assert!(err.to_string().contains("coretemp"));
    }

    #[test]
    fn test_read_all_marks_missing_cores() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("temp2_input"), "45000\n").unwrap();
        fs::write(tmp.path().join("temp3_input"), "70000\n").unwrap();

        let sensor = CoreTempSensor::new(SensorDirectory::new(tmp.path()), 3, 2);
        let temps = sensor.read_all();

        assert_eq!(temps.as_slice(), &[Some(45), Some(70), None]);
        assert_eq!(temps.available(), 2);
    }

    #[test]
    fn test_read_truncates_millidegrees() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("temp2_input");
        fs::write(&input, "45999").unwrap();
        assert_eq!(read_core_temperature(&input), Some(45));

        fs::write(&input, "garbage").unwrap();
        assert_eq!(read_core_temperature(&input), None);

        fs::write(&input, "").unwrap();
        assert_eq!(read_core_temperature(&input), None);
    }

    #[test]
    fn test_read_into_overwrites_stale_values() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("temp2_input");
        fs::write(&input, "80000").unwrap();

        let mut sensor = CoreTempSensor::new(SensorDirectory::new(tmp.path()), 1, 2);
        let mut temps = CoreTemperatureSet::new(sensor.core_count());
        sensor.read_into(&mut temps);
        assert_eq!(temps.get(0), Some(80));

        fs::remove_file(&input).unwrap();
        sensor.read_into(&mut temps);
        assert_eq!(temps.get(0), None);
        assert_eq!(temps.len(), 1);
    }

    #[test]
    fn test_discover_with_fabricated_tree() {
        let tmp = tempfile::tempdir().unwrap();
        let chip = add_chip(&tmp, "hwmon4", "coretemp\n");
        fs::write(chip.join("temp2_input"), "38000").unwrap();
        let online = tmp.path().join("online");
        fs::write(&online, "0-1\n").unwrap();

        let config = MonitorConfig::new()
            .with_hwmon_root(tmp.path().join("hwmon"))
            .with_cpu_online_path(&online);
        let sensor = CoreTempSensor::discover(&config).unwrap();

        assert_eq!(sensor.core_count(), 2);
        assert_eq!(sensor.input_path(1), chip.join("temp3_input"));
        assert_eq!(sensor.read_all().as_slice(), &[Some(38), None]);
    }

    #[test]
    fn test_threshold_ignores_unavailable_cores() {
        let target: TargetTemperature = "50".parse().unwrap();

        assert!(CoreTemperatureSet::from(vec![Some(50), None, Some(20)]).all_at_or_below(target));
        assert!(!CoreTemperatureSet::from(vec![Some(51), None]).all_at_or_below(target));
        assert!(CoreTemperatureSet::from(vec![None, None]).all_at_or_below(target));
        assert!(CoreTemperatureSet::new(0).all_at_or_below(target));
    }

    #[test]
    fn test_overwrite_keeps_length() {
        let mut temps = CoreTemperatureSet::new(3);
        temps.overwrite(&[Some(1), Some(2), Some(3), Some(4)]);
        assert_eq!(temps.as_slice(), &[Some(1), Some(2), Some(3)]);

        temps.overwrite(&[Some(9)]);
        assert_eq!(temps.as_slice(), &[Some(9), None, None]);
    }
}
