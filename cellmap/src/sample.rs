//! Measurement samples and the read-only sample store.
//!
//! A [`Sample`] is one geolocated signal reading. The [`SampleStore`] owns the
//! full set for one map-generation run and answers nearest-neighbor queries
//! for the interpolation engine; it is never mutated after construction.

use std::fmt;
use std::str::FromStr;

use crate::error::CellmapError;
use crate::geo::{distance_meters, BoundingBox};

/// System-type codes that identify LTE and NR measurements in survey exports.
pub const RSRP_SYSTEM_CODES: [i64; 2] = [4, 7];

/// The signal metric a sample value is expressed in.
///
/// The metric selects the value range for the continuous color ramp and the
/// threshold ladder for grading; RSRP values are never graded with RSSI
/// thresholds or vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    /// Reference Signal Received Power (LTE/NR), dBm.
    Rsrp,
    /// Received Signal Strength Indicator, dBm-equivalent units.
    Rssi,
}

impl MetricKind {
    /// Canonical upper-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Rsrp => "RSRP",
            MetricKind::Rssi => "RSSI",
        }
    }

    /// Reference range `(low, high)` mapped onto the color ramp.
    pub fn value_range(&self) -> (f64, f64) {
        match self {
            MetricKind::Rsrp => (-120.0, -80.0),
            MetricKind::Rssi => (-110.0, -60.0),
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricKind {
    type Err = CellmapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "RSRP" => Ok(MetricKind::Rsrp),
            "RSSI" => Ok(MetricKind::Rssi),
            _ => Err(CellmapError::UnknownMetric {
                value: s.to_string(),
            }),
        }
    }
}

/// Which metric to take from a survey row at ingestion time.
///
/// `Auto` is a selection policy, not a stored kind: it is resolved once per
/// row by [`MetricPreference::resolve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MetricPreference {
    /// RSRP for LTE/NR rows that carry it, RSSI otherwise.
    #[default]
    Auto,
    /// Always RSRP; rows without it are dropped.
    Rsrp,
    /// Always RSSI; rows without it are dropped.
    Rssi,
}

impl MetricPreference {
    /// Pick the metric and value for one row.
    ///
    /// # Arguments
    ///
    /// * `system` - System-type code of the row, if known
    /// * `rsrp` - RSRP reading, if present
    /// * `rssi` - RSSI reading, if present
    ///
    /// # Returns
    ///
    /// The chosen `(metric, value)`, or `None` when the row has no usable value.
    /// A missing RSRP on an LTE/NR row falls back to RSSI; survey ingestion
    /// drops rows whose RSRP or system code is present but unreadable before
    /// calling this.
    ///
    /// # Examples
    ///
    /// ```
    /// use cellmap::{MetricKind, MetricPreference};
    ///
    /// let auto = MetricPreference::Auto;
    /// assert_eq!(auto.resolve(Some(7), Some(-98.0), Some(-70.0)), Some((MetricKind::Rsrp, -98.0)));
    /// assert_eq!(auto.resolve(Some(2), Some(-98.0), Some(-70.0)), Some((MetricKind::Rssi, -70.0)));
    /// assert_eq!(auto.resolve(Some(4), None, None), None);
    /// ```
    pub fn resolve(
        &self,
        system: Option<i64>,
        rsrp: Option<f64>,
        rssi: Option<f64>,
    ) -> Option<(MetricKind, f64)> {
        match self {
            MetricPreference::Rsrp => rsrp.map(|v| (MetricKind::Rsrp, v)),
            MetricPreference::Rssi => rssi.map(|v| (MetricKind::Rssi, v)),
            MetricPreference::Auto => {
                let lte_or_nr = system.is_some_and(|s| RSRP_SYSTEM_CODES.contains(&s));
                match rsrp {
                    Some(v) if lte_or_nr => Some((MetricKind::Rsrp, v)),
                    _ => rssi.map(|v| (MetricKind::Rssi, v)),
                }
            }
        }
    }

    /// Name as accepted by [`FromStr`].
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricPreference::Auto => "auto",
            MetricPreference::Rsrp => "RSRP",
            MetricPreference::Rssi => "RSSI",
        }
    }
}

impl fmt::Display for MetricPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricPreference {
    type Err = CellmapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("auto") {
            return Ok(MetricPreference::Auto);
        }
        match s.parse::<MetricKind>()? {
            MetricKind::Rsrp => Ok(MetricPreference::Rsrp),
            MetricKind::Rssi => Ok(MetricPreference::Rssi),
        }
    }
}

/// Serving-cell identity recorded with a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CellIdentity {
    /// Cell/sector identity (eNB/gNB id as exported by the survey tool).
    pub cell_id: Option<u64>,
    /// Physical cell identity (PCI, PSC or BSIC).
    pub physical_cell_id: Option<u32>,
}

impl CellIdentity {
    /// True when both sides know the cell id and it matches, or both know the
    /// physical cell id and it matches.
    pub fn shares_serving_cell(&self, other: &CellIdentity) -> bool {
        let same_cell = matches!((self.cell_id, other.cell_id), (Some(a), Some(b)) if a == b);
        let same_pci = matches!(
            (self.physical_cell_id, other.physical_cell_id),
            (Some(a), Some(b)) if a == b
        );
        same_cell || same_pci
    }
}

/// A single geolocated signal measurement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Latitude in decimal degrees.
    pub lat: f64,
    /// Longitude in decimal degrees.
    pub lon: f64,
    /// Signal value in the units of `metric`.
    pub value: f64,
    /// Metric the value is expressed in.
    pub metric: MetricKind,
    /// Serving-cell identity, when the survey recorded it.
    pub identity: CellIdentity,
}

impl Sample {
    /// Create a sample without serving-cell identity.
    pub fn new(lat: f64, lon: f64, value: f64, metric: MetricKind) -> Self {
        Self {
            lat,
            lon,
            value,
            metric,
            identity: CellIdentity::default(),
        }
    }

    /// Attach a cell/sector identity.
    pub fn with_cell_id(mut self, cell_id: u64) -> Self {
        self.identity.cell_id = Some(cell_id);
        self
    }

    /// Attach a physical cell identity.
    pub fn with_physical_cell_id(mut self, pci: u32) -> Self {
        self.identity.physical_cell_id = Some(pci);
        self
    }

    /// Replace the whole identity record.
    pub fn with_identity(mut self, identity: CellIdentity) -> Self {
        self.identity = identity;
        self
    }
}

/// A sample selected by a nearest-neighbor query.
#[derive(Debug, Clone, Copy)]
pub struct Neighbor<'a> {
    /// The neighboring sample.
    pub sample: &'a Sample,
    /// Great-circle distance to the query point, in meters.
    pub distance_m: f64,
}

/// Immutable collection of the samples for one run.
///
/// Queries scan every sample; survey-scale inputs (thousands of rows) keep
/// this cheap relative to the per-cell interpolation cost.
///
/// # Example
///
/// ```
/// use cellmap::{MetricKind, Sample, SampleStore};
///
/// let store: SampleStore = vec![
///     Sample::new(32.100, 35.190, -95.0, MetricKind::Rsrp),
///     Sample::new(32.101, 35.191, -101.0, MetricKind::Rsrp),
/// ]
/// .into_iter()
/// .collect();
///
/// let nearest = store.nearest(32.1001, 35.1901, 1);
/// assert_eq!(nearest[0].sample.value, -95.0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct SampleStore {
    samples: Vec<Sample>,
}

impl SampleStore {
    /// Take ownership of a sample set.
    pub fn new(samples: Vec<Sample>) -> Self {
        Self { samples }
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True when the store holds no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// All samples in insertion order.
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Iterate over samples in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, Sample> {
        self.samples.iter()
    }

    /// Tight bounding box around all samples, or `None` when empty.
    pub fn bounds(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(self.samples.iter().map(|s| (s.lat, s.lon)))
    }

    /// Number of samples expressed in `metric`.
    pub fn count_metric(&self, metric: MetricKind) -> usize {
        self.samples.iter().filter(|s| s.metric == metric).count()
    }

    /// The `k` samples closest to `(lat, lon)`, nearest first.
    ///
    /// Samples at equal distance keep their insertion order. When `k` exceeds
    /// the number of samples, every sample is returned.
    pub fn nearest(&self, lat: f64, lon: f64, k: usize) -> Vec<Neighbor<'_>> {
        if k == 0 || self.samples.is_empty() {
            return Vec::new();
        }

        let mut ranked: Vec<(f64, usize)> = self
            .samples
            .iter()
            .enumerate()
            .map(|(i, s)| (distance_meters(lat, lon, s.lat, s.lon), i))
            .collect();

        // Ordering on (distance, index) is total, so partial selection followed
        // by a sort yields the same prefix as a stable full sort.
        let by_rank = |a: &(f64, usize), b: &(f64, usize)| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1));
        if k < ranked.len() {
            ranked.select_nth_unstable_by(k - 1, by_rank);
            ranked.truncate(k);
        }
        ranked.sort_unstable_by(by_rank);

        ranked
            .into_iter()
            .map(|(distance_m, i)| Neighbor {
                sample: &self.samples[i],
                distance_m,
            })
            .collect()
    }
}

impl FromIterator<Sample> for SampleStore {
    fn from_iter<I: IntoIterator<Item = Sample>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a SampleStore {
    type Item = &'a Sample;
    type IntoIter = std::slice::Iter<'a, Sample>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.iter()
    }
}
