//! Inverse-distance-weighted signal prediction.
//!
//! [`predict`] estimates the signal at an arbitrary point from the nearest
//! samples in a [`SampleStore`]:
//!
//! 1. The `k` nearest samples are selected (ties keep insertion order).
//! 2. If the nearest is closer than [`SNAP_DISTANCE_M`], its value is returned
//!    verbatim.
//! 3. If the nearest is farther than [`MAX_NEIGHBOR_DISTANCE_M`], there is no
//!    prediction: the engine never extrapolates into areas without evidence.
//! 4. Otherwise each neighbor gets weight `1 / (d + ε)^power`, optionally
//!    boosted when it shares the nearest sample's serving cell and penalised
//!    when it does not, and the weighted mean is returned.
//!
//! The prediction carries the nearest sample's metric so that the caller
//! colors it with the right value range.

use crate::error::{CellmapError, Result};
use crate::sample::{MetricKind, SampleStore};

/// Below this distance (meters) the nearest sample is returned unblended.
pub const SNAP_DISTANCE_M: f64 = 5.0;

/// Beyond this distance (meters) to the nearest sample, nothing is predicted.
pub const MAX_NEIGHBOR_DISTANCE_M: f64 = 2000.0;

/// Added to every distance before weighting to avoid division by zero.
pub const DISTANCE_EPSILON: f64 = 1e-6;

/// Default number of neighbors blended per prediction.
pub const DEFAULT_NEIGHBORS: usize = 12;

/// Default inverse-distance exponent.
pub const DEFAULT_POWER: f64 = 2.0;

/// Default weight multiplier for neighbors on the nearest sample's cell.
pub const DEFAULT_SAME_CELL_BOOST: f64 = 2.0;

/// Default weight multiplier for neighbors on a different (or unknown) cell.
pub const DEFAULT_MISMATCH_PENALTY: f64 = 0.6;

/// Serving-cell aware weight adjustment.
///
/// The nearest neighbor's identity stands in for the serving cell at the
/// query point. Neighbors served by the same cell (matching cell id or
/// physical cell id) have their weight multiplied by `same_cell_boost`; all
/// others by `mismatch_penalty`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IdentityWeighting {
    /// Multiplier for neighbors sharing the reference identity.
    pub same_cell_boost: f64,
    /// Multiplier for every other neighbor.
    pub mismatch_penalty: f64,
}

impl Default for IdentityWeighting {
    fn default() -> Self {
        Self {
            same_cell_boost: DEFAULT_SAME_CELL_BOOST,
            mismatch_penalty: DEFAULT_MISMATCH_PENALTY,
        }
    }
}

/// Per-call interpolation parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IdwParams {
    /// Number of nearest samples to blend (at least 1).
    pub neighbors: usize,
    /// Inverse-distance exponent (finite, non-negative).
    pub power: f64,
    /// Identity-aware weighting; `None` for plain IDW.
    pub identity: Option<IdentityWeighting>,
}

impl Default for IdwParams {
    fn default() -> Self {
        Self {
            neighbors: DEFAULT_NEIGHBORS,
            power: DEFAULT_POWER,
            identity: Some(IdentityWeighting::default()),
        }
    }
}

impl IdwParams {
    /// Plain inverse-distance weighting with default neighbor count and power.
    pub fn unweighted() -> Self {
        Self {
            identity: None,
            ..Self::default()
        }
    }

    /// Check that the parameters describe a supported configuration.
    ///
    /// # Errors
    ///
    /// Returns [`CellmapError::InvalidConfig`] when `neighbors` is zero, the
    /// power is negative or not finite, or an identity multiplier is not a
    /// positive finite number.
    pub fn validate(&self) -> Result<()> {
        if self.neighbors == 0 {
            return Err(CellmapError::InvalidConfig {
                field: "neighbor_count",
                message: "must be at least 1".to_string(),
            });
        }
        if !self.power.is_finite() || self.power < 0.0 {
            return Err(CellmapError::InvalidConfig {
                field: "idw_power",
                message: format!("must be a finite non-negative number (got {})", self.power),
            });
        }
        if let Some(w) = self.identity {
            if !w.same_cell_boost.is_finite() || w.same_cell_boost <= 0.0 {
                return Err(CellmapError::InvalidConfig {
                    field: "same_cell_boost",
                    message: format!(
                        "must be a positive finite number (got {})",
                        w.same_cell_boost
                    ),
                });
            }
            if !w.mismatch_penalty.is_finite() || w.mismatch_penalty <= 0.0 {
                return Err(CellmapError::InvalidConfig {
                    field: "mismatch_penalty",
                    message: format!(
                        "must be a positive finite number (got {})",
                        w.mismatch_penalty
                    ),
                });
            }
        }
        Ok(())
    }
}

/// A predicted signal value at a query point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    /// Predicted value.
    pub value: f64,
    /// Metric of the nearest sample; selects the color range.
    pub metric: MetricKind,
}

/// Why no prediction exists at a query point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NoPrediction {
    /// The sample store is empty.
    NoData,
    /// The nearest sample is beyond [`MAX_NEIGHBOR_DISTANCE_M`].
    OutOfRange {
        /// Distance to the nearest sample, in meters.
        nearest_m: f64,
    },
    /// The neighbor weights sum to zero.
    DegenerateWeights,
}

impl std::fmt::Display for NoPrediction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NoPrediction::NoData => write!(f, "no samples loaded"),
            NoPrediction::OutOfRange { nearest_m } => write!(
                f,
                "nearest sample is {:.0} m away (limit {:.0} m)",
                nearest_m, MAX_NEIGHBOR_DISTANCE_M
            ),
            NoPrediction::DegenerateWeights => write!(f, "neighbor weights sum to zero"),
        }
    }
}

/// Predict the signal at `(lat, lon)`.
///
/// Returns `None` when the store is empty, the nearest sample is out of
/// range, or the weights degenerate. Use [`try_predict`] to learn which.
///
/// # Example
///
/// ```
/// use cellmap::{predict, IdwParams, MetricKind, Sample, SampleStore};
///
/// let store = SampleStore::new(vec![
///     Sample::new(0.0, -0.001, -100.0, MetricKind::Rsrp),
///     Sample::new(0.0, 0.001, -90.0, MetricKind::Rsrp),
/// ]);
///
/// let p = predict(&store, 0.0, 0.0, &IdwParams::unweighted()).unwrap();
/// assert!((p.value - -95.0).abs() < 1e-9);
/// assert_eq!(p.metric, MetricKind::Rsrp);
///
/// // Far away from every sample
/// assert!(predict(&store, 1.0, 1.0, &IdwParams::default()).is_none());
/// ```
pub fn predict(store: &SampleStore, lat: f64, lon: f64, params: &IdwParams) -> Option<Prediction> {
    try_predict(store, lat, lon, params).ok()
}

/// Predict the signal at `(lat, lon)`, reporting why when there is no value.
///
/// `params` are assumed valid (see [`IdwParams::validate`]); a zero neighbor
/// count behaves like an empty store.
pub fn try_predict(
    store: &SampleStore,
    lat: f64,
    lon: f64,
    params: &IdwParams,
) -> std::result::Result<Prediction, NoPrediction> {
    let neighbors = store.nearest(lat, lon, params.neighbors);
    let nearest = neighbors.first().ok_or(NoPrediction::NoData)?;

    if nearest.distance_m < SNAP_DISTANCE_M {
        return Ok(Prediction {
            value: nearest.sample.value,
            metric: nearest.sample.metric,
        });
    }

    if nearest.distance_m > MAX_NEIGHBOR_DISTANCE_M {
        return Err(NoPrediction::OutOfRange {
            nearest_m: nearest.distance_m,
        });
    }

    let reference = nearest.sample.identity;
    let mut weighted_sum = 0.0;
    let mut weight_total = 0.0;

    for n in &neighbors {
        let mut w = 1.0 / (n.distance_m + DISTANCE_EPSILON).powf(params.power);
        if let Some(identity) = params.identity {
            w *= if n.sample.identity.shares_serving_cell(&reference) {
                identity.same_cell_boost
            } else {
                identity.mismatch_penalty
            };
        }
        weighted_sum += w * n.sample.value;
        weight_total += w;
    }

    if weight_total > 0.0 {
        Ok(Prediction {
            value: weighted_sum / weight_total,
            metric: nearest.sample.metric,
        })
    } else {
        Err(NoPrediction::DegenerateWeights)
    }
}
