//! Signal grading and color ramps.
//!
//! Two independent mappings from a `(metric, value)` pair:
//!
//! - [`SignalGrade`]: six discrete quality buckets used for measurement
//!   markers. The legend follows the usual drive-test tool convention, so the
//!   buckets keep the familiar `rxl*` style ids.
//! - [`continuous_color`]: a red → yellow → green ramp over a metric-specific
//!   range, used for the interpolated surface so adjacent tiles don't band.

use std::fmt;

use crate::sample::{MetricKind, Sample};

/// Inclusive upper bounds of the first five RSRP buckets, in dBm.
const RSRP_THRESHOLDS: [f64; 5] = [-115.0, -105.0, -95.0, -90.0, -85.0];

/// Inclusive upper bounds of the first five RSSI buckets.
const RSSI_THRESHOLDS: [f64; 5] = [-110.0, -100.0, -90.0, -80.0, -70.0];

/// An 8-bit RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    /// Create a color from its channels.
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Fully opaque color.
    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    /// KML color notation: `aabbggrr`, lower-case hex.
    ///
    /// ```
    /// use cellmap::Rgba;
    ///
    /// assert_eq!(Rgba::new(255, 128, 0, 160).to_kml_hex(), "a00080ff");
    /// ```
    pub fn to_kml_hex(&self) -> String {
        format!("{:02x}{:02x}{:02x}{:02x}", self.a, self.b, self.g, self.r)
    }

    /// CSS notation without alpha: `#rrggbb`.
    pub fn to_css_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Alpha as a fraction in `[0, 1]`.
    pub fn opacity(&self) -> f64 {
        f64::from(self.a) / 255.0
    }
}

/// Discrete signal-quality bucket, worst first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SignalGrade {
    VeryPoor,
    Poor,
    Fair,
    Good,
    VeryGood,
    Excellent,
}

impl SignalGrade {
    /// All grades, worst first.
    pub const ALL: [SignalGrade; 6] = [
        SignalGrade::VeryPoor,
        SignalGrade::Poor,
        SignalGrade::Fair,
        SignalGrade::Good,
        SignalGrade::VeryGood,
        SignalGrade::Excellent,
    ];

    /// Grade a value against its metric's threshold ladder.
    ///
    /// Each threshold is an inclusive upper bound: RSRP `-115.0` is
    /// [`SignalGrade::VeryPoor`], `-114.999` is [`SignalGrade::Poor`].
    ///
    /// ```
    /// use cellmap::{MetricKind, SignalGrade};
    ///
    /// assert_eq!(SignalGrade::from_value(MetricKind::Rsrp, -115.0), SignalGrade::VeryPoor);
    /// assert_eq!(SignalGrade::from_value(MetricKind::Rsrp, -114.999), SignalGrade::Poor);
    /// assert_eq!(SignalGrade::from_value(MetricKind::Rssi, -65.0), SignalGrade::Excellent);
    /// ```
    pub fn from_value(metric: MetricKind, value: f64) -> Self {
        let thresholds = match metric {
            MetricKind::Rsrp => &RSRP_THRESHOLDS,
            MetricKind::Rssi => &RSSI_THRESHOLDS,
        };
        thresholds
            .iter()
            .position(|&upper| value <= upper)
            .map(|i| Self::ALL[i])
            .unwrap_or(SignalGrade::Excellent)
    }

    /// Grade a sample with its own metric.
    pub fn of_sample(sample: &Sample) -> Self {
        Self::from_value(sample.metric, sample.value)
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            SignalGrade::VeryPoor => "very poor",
            SignalGrade::Poor => "poor",
            SignalGrade::Fair => "fair",
            SignalGrade::Good => "good",
            SignalGrade::VeryGood => "very good",
            SignalGrade::Excellent => "excellent",
        }
    }

    /// Marker style id shared with drive-test tool exports.
    pub fn style_id(&self) -> &'static str {
        match self {
            SignalGrade::VeryPoor => "rxl113",
            SignalGrade::Poor => "rxl105",
            SignalGrade::Fair => "rxl80",
            SignalGrade::Good => "rxl76",
            SignalGrade::VeryGood => "rxl69",
            SignalGrade::Excellent => "rxl92",
        }
    }

    /// Fixed marker color for the legend.
    pub fn marker_color(&self) -> Rgba {
        match self {
            SignalGrade::VeryPoor => Rgba::opaque(0, 0, 0),
            SignalGrade::Poor => Rgba::opaque(255, 0, 0),
            SignalGrade::Fair => Rgba::opaque(0, 255, 255),
            SignalGrade::Good => Rgba::opaque(255, 165, 0),
            SignalGrade::VeryGood => Rgba::opaque(0, 0, 255),
            SignalGrade::Excellent => Rgba::opaque(0, 255, 0),
        }
    }
}

impl fmt::Display for SignalGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Shorthand for [`SignalGrade::from_value`].
pub fn grade(metric: MetricKind, value: f64) -> SignalGrade {
    SignalGrade::from_value(metric, value)
}

/// Position of `value` on the metric's color ramp, clamped to `[0, 1]`.
pub fn ramp_position(metric: MetricKind, value: f64) -> f64 {
    let (lo, hi) = metric.value_range();
    ((value - lo) / (hi - lo)).clamp(0.0, 1.0)
}

/// Continuous red → yellow → green color for a value.
///
/// `t < 0.5` blends red into yellow, `t >= 0.5` blends yellow into green, so
/// the midpoint is pure yellow and the top of the range pure green. Channels
/// truncate toward zero. `alpha` is passed through unchanged.
///
/// ```
/// use cellmap::{continuous_color, MetricKind, Rgba};
///
/// assert_eq!(continuous_color(MetricKind::Rsrp, -120.0, 160), Rgba::new(255, 0, 0, 160));
/// assert_eq!(continuous_color(MetricKind::Rsrp, -100.0, 160), Rgba::new(255, 255, 0, 160));
/// assert_eq!(continuous_color(MetricKind::Rsrp, -80.0, 160), Rgba::new(0, 255, 0, 160));
/// ```
pub fn continuous_color(metric: MetricKind, value: f64, alpha: u8) -> Rgba {
    let t = ramp_position(metric, value);
    if t < 0.5 {
        let frac = t / 0.5;
        Rgba::new(255, (255.0 * frac) as u8, 0, alpha)
    } else {
        let frac = (t - 0.5) / 0.5;
        Rgba::new((255.0 * (1.0 - frac)) as u8, 255, 0, alpha)
    }
}
