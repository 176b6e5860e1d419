//! Experiment parameters encoded in run file names.
//!
//! Two naming conventions are produced by the scenario generator:
//!
//! - `<prefix>_dist_<km>km_bw_<bw1>and<bw2>khz_num_device<n>_seed<s>.<ext>`
//! - `<interf|no_interf>_coord_dist_<m>m_off_load_pan1_<l1>_pan2_<l2>_seed<s>.<ext>`

use std::cmp::Ordering;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Compiled patterns for run file names
pub struct RunNamePatterns {
    /// Match: "interference_dist_1.2km_bw_150.0and600.0khz_num_device12_seed0.trace"
    pub bandwidth_sweep: Regex,
    /// Match: "interf_coord_dist_1200m_off_load_pan1_0.1_pan2_0.2_seed2.stat"
    pub offered_load_sweep: Regex,
}

impl RunNamePatterns {
    pub fn new() -> Self {
        Self {
            bandwidth_sweep: Regex::new(
                r"^(?:(.+)_)?dist_([\d.]+)km_bw_([\d.]+?)and([\d.]+)khz_num_device(\d+)_seed(\d+)\.(trace|stat|pos)$"
            ).expect("Invalid bandwidth_sweep regex"),
            offered_load_sweep: Regex::new(
                r"^(interf|no_interf)_coord_dist_([\d.]+)m_off_load_pan1_([\d.]+)_pan2_([\d.]+)_seed(\d+)\.(trace|stat|pos)$"
            ).expect("Invalid offered_load_sweep regex"),
        }
    }
}

impl Default for RunNamePatterns {
    fn default() -> Self {
        Self::new()
    }
}

/// Global patterns instance
pub static PATTERNS: LazyLock<RunNamePatterns> = LazyLock::new(RunNamePatterns::new);

/// A floating point experiment parameter with a total order, usable as a key
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Param(pub f64);

impl PartialEq for Param {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Param {}

impl PartialOrd for Param {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Param {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl std::fmt::Display for Param {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of simulator output a run file holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    Trace,
    Stat,
    Position,
}

impl FileKind {
    fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "trace" => Some(FileKind::Trace),
            "stat" => Some(FileKind::Stat),
            "pos" => Some(FileKind::Position),
            _ => None,
        }
    }
}

/// Parameters of one simulation run, recovered from its file name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunKey {
    /// Scenario prefix, e.g. "interference" or "no_interf"
    pub scenario: String,
    pub distance_km: Param,
    /// Channel bandwidths of PAN-1 and PAN-2 in kHz
    pub bandwidth_khz: Option<(Param, Param)>,
    /// Offered load of PAN-1 and PAN-2
    pub offered_load: Option<(Param, Param)>,
    pub devices_per_pan: Option<usize>,
    pub seed: u32,
    pub kind: FileKind,
}

impl RunKey {
    /// Parse a bare file name (no directory part)
    pub fn parse(file_name: &str) -> Option<RunKey> {
        if let Some(caps) = PATTERNS.bandwidth_sweep.captures(file_name) {
            let scenario = caps.get(1).map(|m| m.as_str().to_string()).unwrap_or_default();
            let distance_km = caps.get(2)?.as_str().parse().ok()?;
            let bw1 = caps.get(3)?.as_str().parse().ok()?;
            let bw2 = caps.get(4)?.as_str().parse().ok()?;
            let devices = caps.get(5)?.as_str().parse().ok()?;
            let seed = caps.get(6)?.as_str().parse().ok()?;
            let kind = FileKind::from_extension(caps.get(7)?.as_str())?;
            return Some(RunKey {
                scenario,
                distance_km: Param(distance_km),
                bandwidth_khz: Some((Param(bw1), Param(bw2))),
                offered_load: None,
                devices_per_pan: Some(devices),
                seed,
                kind,
            });
        }

        let caps = PATTERNS.offered_load_sweep.captures(file_name)?;
        let distance_m: f64 = caps.get(2)?.as_str().parse().ok()?;
        let load1 = caps.get(3)?.as_str().parse().ok()?;
        let load2 = caps.get(4)?.as_str().parse().ok()?;
        let seed = caps.get(5)?.as_str().parse().ok()?;
        let kind = FileKind::from_extension(caps.get(6)?.as_str())?;
        Some(RunKey {
            scenario: caps.get(1)?.as_str().to_string(),
            distance_km: Param(distance_m / 1000.0),
            bandwidth_khz: None,
            offered_load: Some((Param(load1), Param(load2))),
            devices_per_pan: None,
            seed,
            kind,
        })
    }

    /// Parse the file name component of `path`
    pub fn from_path(path: &Path) -> Option<RunKey> {
        RunKey::parse(path.file_name()?.to_str()?)
    }

    /// Key for this run under `group_by`, if the run carries that parameter
    pub fn series_key(&self, group_by: GroupBy) -> Option<SeriesKey> {
        match group_by {
            GroupBy::Distance => Some(SeriesKey::Distance(self.distance_km)),
            GroupBy::OfferedLoad => self.offered_load.map(|(a, b)| SeriesKey::OfferedLoad(a, b)),
            GroupBy::Bandwidth => self.bandwidth_khz.map(|(a, b)| SeriesKey::Bandwidth(a, b)),
            GroupBy::Seed => Some(SeriesKey::Seed(self.seed)),
        }
    }
}

/// Parameter that runs are grouped by before reduction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum GroupBy {
    #[default]
    Distance,
    OfferedLoad,
    Bandwidth,
    Seed,
}

/// Configuration key of an aggregated series entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesKey {
    Distance(Param),
    OfferedLoad(Param, Param),
    Bandwidth(Param, Param),
    Seed(u32),
}

impl std::fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SeriesKey::Distance(d) => write!(f, "{} km", d),
            SeriesKey::OfferedLoad(a, b) => write!(f, "load {}/{}", a, b),
            SeriesKey::Bandwidth(a, b) => write!(f, "{}/{} kHz", a, b),
            SeriesKey::Seed(s) => write!(f, "seed {}", s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bandwidth_sweep_name() {
        let key = RunKey::parse("interference_dist_1.2km_bw_150.0and600.0khz_num_device12_seed3.trace").unwrap();
        assert_eq!(key.scenario, "interference");
        assert_eq!(key.distance_km, Param(1.2));
        assert_eq!(key.bandwidth_khz, Some((Param(150.0), Param(600.0))));
        assert_eq!(key.devices_per_pan, Some(12));
        assert_eq!(key.seed, 3);
        assert_eq!(key.kind, FileKind::Trace);
        assert_eq!(key.offered_load, None);
    }

    #[test]
    fn test_prefix_with_underscores() {
        let key = RunKey::parse("non_interference_dist_0.5km_bw_150.0and150.0khz_num_device4_seed0.pos").unwrap();
        assert_eq!(key.scenario, "non_interference");
        assert_eq!(key.kind, FileKind::Position);
    }

    #[test]
    fn test_offered_load_sweep_name() {
        let key = RunKey::parse("no_interf_coord_dist_1200m_off_load_pan1_0.1_pan2_0.2_seed2.stat").unwrap();
        assert_eq!(key.scenario, "no_interf");
        assert_eq!(key.distance_km, Param(1.2));
        assert_eq!(key.offered_load, Some((Param(0.1), Param(0.2))));
        assert_eq!(key.devices_per_pan, None);
        assert_eq!(key.kind, FileKind::Stat);
        assert_eq!(key.series_key(GroupBy::Bandwidth), None);
        assert_eq!(
            key.series_key(GroupBy::OfferedLoad),
            Some(SeriesKey::OfferedLoad(Param(0.1), Param(0.2)))
        );
    }

    #[test]
    fn test_unknown_names() {
        assert!(RunKey::parse("notes.txt").is_none());
        assert!(RunKey::parse("dist_1km_bw_1and2khz_num_device3_seed1.csv").is_none());
        assert!(RunKey::from_path(Path::new("/tmp/")).is_none());
    }

    #[test]
    fn test_series_keys_order_by_value() {
        let mut keys = vec![
            SeriesKey::Distance(Param(2.0)),
            SeriesKey::Distance(Param(0.25)),
            SeriesKey::Distance(Param(1.0)),
        ];
        keys.sort();
        assert_eq!(keys[0], SeriesKey::Distance(Param(0.25)));
        assert_eq!(keys[2], SeriesKey::Distance(Param(2.0)));
    }
}
