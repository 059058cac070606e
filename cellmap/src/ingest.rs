//! Survey CSV ingestion.
//!
//! Enable the `csv` feature to use this module.
//!
//! Survey exports come from several drive-test tools and disagree on column
//! names and delimiters. Headers are normalised (trimmed, lower-cased, spaces,
//! underscores and dashes removed) and mapped onto canonical survey columns;
//! the delimiter is sniffed from the header line.
//!
//! # Example
//!
//! ```
//! use cellmap::ingest::{parse_measurements, IngestOptions};
//! use cellmap::MetricKind;
//!
//! let csv = "Latitude;Longitude;SYSTEM;RSRP/RSCP;RSSI\n\
//!            32.10;35.19;7;-97;-70\n\
//!            32.11;35.20;2;;-75\n";
//!
//! let ingested = parse_measurements(csv, &IngestOptions::default()).unwrap();
//! assert_eq!(ingested.measurements.len(), 2);
//! assert_eq!(ingested.measurements[0].sample.metric, MetricKind::Rsrp);
//! assert_eq!(ingested.measurements[1].sample.metric, MetricKind::Rssi);
//! ```

use std::collections::HashMap;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};

use crate::error::{CellmapError, Result};
use crate::geo::{distance_km, BoundingBox};
use crate::sample::{CellIdentity, MetricPreference, Sample, SampleStore, RSRP_SYSTEM_CODES};

/// Delimiters tried when sniffing, in tie-break order.
const DELIMITERS: [u8; 4] = [b',', b';', b'\t', b'|'];

/// Default name for antenna sites without one.
const DEFAULT_ANTENNA_NAME: &str = "Antenna";

/// Canonical survey columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Lat,
    Lon,
    Rsrp,
    Rsrq,
    Rssi,
    System,
    Plmn,
    NodeId,
    LocalCellId,
    PhysicalCellId,
    Arfcn,
    Band,
    Snr,
    Date,
    Time,
    Speed,
}

impl Column {
    /// Columns carried into marker descriptions, in display order.
    pub const DESCRIBED: [Column; 13] = [
        Column::System,
        Column::Plmn,
        Column::NodeId,
        Column::LocalCellId,
        Column::PhysicalCellId,
        Column::Arfcn,
        Column::Band,
        Column::Rssi,
        Column::Rsrp,
        Column::Rsrq,
        Column::Snr,
        Column::Date,
        Column::Time,
    ];

    /// Canonical column name as written by survey tools.
    pub fn name(&self) -> &'static str {
        match self {
            Column::Lat => "LAT",
            Column::Lon => "LON",
            Column::Rsrp => "RSRP/RSCP",
            Column::Rsrq => "RSRQ/ECIO",
            Column::Rssi => "RSSI",
            Column::System => "SYSTEM",
            Column::Plmn => "PLMN",
            Column::NodeId => "xNBID",
            Column::LocalCellId => "LOCAL_CID",
            Column::PhysicalCellId => "PCI/PSC/BSIC",
            Column::Arfcn => "ARFCN",
            Column::Band => "BAND",
            Column::Snr => "SNR",
            Column::Date => "DATE",
            Column::Time => "TIME",
            Column::Speed => "SPEED",
        }
    }

    /// Map a raw header onto a canonical column.
    ///
    /// # Examples
    ///
    /// ```
    /// use cellmap::ingest::Column;
    ///
    /// assert_eq!(Column::from_header(" GPS_Lat "), Some(Column::Lat));
    /// assert_eq!(Column::from_header("LTE-RSRP"), Some(Column::Rsrp));
    /// assert_eq!(Column::from_header("operator"), None);
    /// ```
    pub fn from_header(header: &str) -> Option<Column> {
        let key: String = header
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
            .collect();

        let column = match key.as_str() {
            "lat" | "latitude" | "gpslat" | "y" | "latdd" => Column::Lat,
            "lon" | "long" | "longitude" | "lng" | "gpslon" | "x" | "londd" => Column::Lon,
            "rsrp" | "rsrp/rscp" | "rsrprscp" | "ltersrp" => Column::Rsrp,
            "rsrq" | "ecio" | "rsrq/ecio" | "rsrqecio" | "ltersrq" => Column::Rsrq,
            "rssi" | "signal" | "gsmrssi" | "lterssi" => Column::Rssi,
            "system" => Column::System,
            "plmn" => Column::Plmn,
            "xnbid" => Column::NodeId,
            "localcid" => Column::LocalCellId,
            "pci/psc/bsic" | "pcipscbsic" | "pci" | "psc" | "bsic" => Column::PhysicalCellId,
            "arfcn" => Column::Arfcn,
            "band" => Column::Band,
            "snr" => Column::Snr,
            "date" => Column::Date,
            "time" => Column::Time,
            "speed" => Column::Speed,
            _ => return None,
        };
        Some(column)
    }
}

/// Keep only rows within `radius_km` of a centre point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadiusFilter {
    pub center_lat: f64,
    pub center_lon: f64,
    pub radius_km: f64,
}

impl RadiusFilter {
    pub fn new(center_lat: f64, center_lon: f64, radius_km: f64) -> Self {
        Self {
            center_lat,
            center_lon,
            radius_km,
        }
    }

    /// Whether a point lies inside the circle (boundary included).
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        BoundingBox::around(self.center_lat, self.center_lon, self.radius_km).contains(lat, lon)
            && distance_km(self.center_lat, self.center_lon, lat, lon) <= self.radius_km
    }
}

/// Row selection applied while reading a survey.
///
/// Every filter is optional and only takes effect when its column exists;
/// while a filter is active, rows without the filtered value are dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestOptions {
    pub metric: MetricPreference,
    /// Exact operator code (`PLMN`).
    pub plmn: Option<String>,
    /// Maximum `SPEED`, inclusive.
    pub max_speed: Option<f64>,
    /// Lower `DATE` bound, compared as text.
    pub date_from: Option<String>,
    /// Upper `DATE` bound, compared as text.
    pub date_to: Option<String>,
    pub radius: Option<RadiusFilter>,
}

/// Row accounting for one ingestion run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    /// Data rows read (header excluded).
    pub rows: usize,
    /// Rows turned into measurements.
    pub kept: usize,
    /// Rows with a missing or non-numeric coordinate.
    pub bad_coordinates: usize,
    /// Rows removed by a filter.
    pub filtered: usize,
    /// Rows with no value for the selected metric.
    pub no_metric: usize,
}

impl IngestStats {
    /// Total rows not kept.
    pub fn skipped(&self) -> usize {
        self.bad_coordinates + self.filtered + self.no_metric
    }
}

/// One kept survey row.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub sample: Sample,
    /// Zero-based data row index.
    pub row: usize,
    /// Marker name: `"<xNBID>-<LOCAL_CID>"` when known, else `"Meas <row>"`.
    pub name: String,
    /// Raw survey attributes present in the file, keyed by canonical name.
    pub attributes: Vec<(&'static str, String)>,
}

/// Result of reading a survey.
#[derive(Debug, Clone, Default)]
pub struct Ingested {
    pub measurements: Vec<Measurement>,
    pub stats: IngestStats,
}

impl Ingested {
    /// Build a sample store from the kept rows, in file order.
    pub fn store(&self) -> SampleStore {
        self.measurements.iter().map(|m| m.sample).collect()
    }
}

/// Pick the delimiter that occurs most often in the header line.
///
/// Falls back to a comma when none occurs.
pub fn sniff_delimiter(text: &str) -> u8 {
    let header = text.lines().next().unwrap_or_default();
    let mut best = (b',', 0);
    for delimiter in DELIMITERS {
        let count = header.bytes().filter(|&b| b == delimiter).count();
        if count > best.1 {
            best = (delimiter, count);
        }
    }
    best.0
}

fn reader(text: &str) -> csv::Reader<&[u8]> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    ReaderBuilder::new()
        .delimiter(sniff_delimiter(text))
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes())
}

fn field<'r>(record: &'r StringRecord, index: Option<usize>) -> Option<&'r str> {
    index
        .and_then(|i| record.get(i))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn parse_f64(raw: Option<&str>) -> Option<f64> {
    raw.and_then(|s| s.parse::<f64>().ok()).filter(|v| v.is_finite())
}

/// Parse an integer, accepting integral float spellings such as `1234.0`.
fn parse_integral(raw: Option<&str>) -> Option<i64> {
    let raw = raw?;
    if let Ok(v) = raw.parse::<i64>() {
        return Some(v);
    }
    let v = raw.parse::<f64>().ok()?;
    (v.is_finite() && v.fract() == 0.0 && v.abs() < i64::MAX as f64).then_some(v as i64)
}

fn same_code(raw: &str, wanted: &str) -> bool {
    let wanted = wanted.trim();
    raw == wanted
        || matches!(
            (parse_integral(Some(raw)), parse_integral(Some(wanted))),
            (Some(a), Some(b)) if a == b
        )
}

/// Parse survey measurements from CSV text.
///
/// # Errors
///
/// Returns [`CellmapError::MissingColumn`] if no column maps to `LAT` or
/// `LON`, and [`CellmapError::Csv`] for malformed CSV.
pub fn parse_measurements(text: &str, options: &IngestOptions) -> Result<Ingested> {
    let mut rdr = reader(text);

    let mut columns: HashMap<Column, usize> = HashMap::new();
    for (i, header) in rdr.headers()?.iter().enumerate() {
        if let Some(column) = Column::from_header(header) {
            columns.entry(column).or_insert(i);
        }
    }
    for required in [Column::Lat, Column::Lon] {
        if !columns.contains_key(&required) {
            return Err(CellmapError::MissingColumn {
                column: required.name().to_string(),
            });
        }
    }
    let col = |c: Column| columns.get(&c).copied();

    let mut ingested = Ingested::default();
    for (row, result) in rdr.records().enumerate() {
        let record = result?;
        ingested.stats.rows += 1;

        let (Some(lat), Some(lon)) = (
            parse_f64(field(&record, col(Column::Lat))),
            parse_f64(field(&record, col(Column::Lon))),
        ) else {
            ingested.stats.bad_coordinates += 1;
            continue;
        };

        if !passes_filters(&record, &col, options, lat, lon) {
            ingested.stats.filtered += 1;
            continue;
        }

        let system_raw = field(&record, col(Column::System));
        let rsrp_raw = field(&record, col(Column::Rsrp));
        let system = parse_integral(system_raw);
        let rsrp = parse_f64(rsrp_raw);
        let rssi = parse_f64(field(&record, col(Column::Rssi)));
        // Under auto, a garbled system code or LTE/NR RSRP drops the row
        // instead of falling back to RSSI.
        let garbled = options.metric == MetricPreference::Auto
            && ((system_raw.is_some() && system.is_none())
                || (system.is_some_and(|s| RSRP_SYSTEM_CODES.contains(&s))
                    && rsrp_raw.is_some()
                    && rsrp.is_none()));
        let resolved = if garbled {
            None
        } else {
            options.metric.resolve(system, rsrp, rssi)
        };
        let Some((metric, value)) = resolved else {
            ingested.stats.no_metric += 1;
            continue;
        };

        let node_id = parse_integral(field(&record, col(Column::NodeId)));
        let local_cid = parse_integral(field(&record, col(Column::LocalCellId)));
        let identity = CellIdentity {
            cell_id: node_id.and_then(|v| u64::try_from(v).ok()),
            physical_cell_id: parse_integral(field(&record, col(Column::PhysicalCellId)))
                .and_then(|v| u32::try_from(v).ok()),
        };

        let name_parts: Vec<String> = [node_id, local_cid]
            .iter()
            .flatten()
            .map(|v| v.to_string())
            .collect();
        let name = if name_parts.is_empty() {
            format!("Meas {}", row)
        } else {
            name_parts.join("-")
        };

        let attributes = Column::DESCRIBED
            .iter()
            .filter_map(|&c| {
                let i = col(c)?;
                Some((c.name(), record.get(i).unwrap_or_default().to_string()))
            })
            .collect();

        ingested.measurements.push(Measurement {
            sample: Sample::new(lat, lon, value, metric).with_identity(identity),
            row,
            name,
            attributes,
        });
        ingested.stats.kept += 1;
    }

    tracing::debug!(
        rows = ingested.stats.rows,
        kept = ingested.stats.kept,
        bad_coordinates = ingested.stats.bad_coordinates,
        filtered = ingested.stats.filtered,
        no_metric = ingested.stats.no_metric,
        metric = %options.metric,
        "Ingested survey"
    );

    Ok(ingested)
}

fn passes_filters<F>(
    record: &StringRecord,
    col: &F,
    options: &IngestOptions,
    lat: f64,
    lon: f64,
) -> bool
where
    F: Fn(Column) -> Option<usize>,
{
    if let (Some(wanted), Some(i)) = (&options.plmn, col(Column::Plmn)) {
        match field(record, Some(i)) {
            Some(raw) if same_code(raw, wanted) => {}
            _ => return false,
        }
    }

    if let (Some(max), Some(i)) = (options.max_speed, col(Column::Speed)) {
        match parse_f64(field(record, Some(i))) {
            Some(speed) if speed <= max => {}
            _ => return false,
        }
    }

    if options.date_from.is_some() || options.date_to.is_some() {
        if let Some(i) = col(Column::Date) {
            let Some(date) = field(record, Some(i)) else {
                return false;
            };
            if options.date_from.as_deref().is_some_and(|from| date < from)
                || options.date_to.as_deref().is_some_and(|to| date > to)
            {
                return false;
            }
        }
    }

    options.radius.map_or(true, |r| r.contains(lat, lon))
}

/// Read survey measurements from a CSV file.
///
/// # Errors
///
/// As [`parse_measurements`], plus [`CellmapError::Io`] if the file cannot
/// be read.
pub fn read_measurements<P: AsRef<Path>>(path: P, options: &IngestOptions) -> Result<Ingested> {
    let text = std::fs::read_to_string(path)?;
    parse_measurements(&text, options)
}

/// An antenna site marker.
#[derive(Debug, Clone, PartialEq)]
pub struct Antenna {
    pub lat: f64,
    pub lon: f64,
    pub name: String,
    pub id: Option<String>,
}

/// Parse antenna sites from CSV text.
///
/// Columns `lat`, `lon`, `name` and `id` are matched case-insensitively.
/// Rows with unparseable coordinates are skipped; a file without `lat` and
/// `lon` columns yields no sites.
pub fn parse_antennas(text: &str) -> Result<Vec<Antenna>> {
    let mut rdr = reader(text);

    let mut columns: HashMap<String, usize> = HashMap::new();
    for (i, header) in rdr.headers()?.iter().enumerate() {
        columns.entry(header.trim().to_lowercase()).or_insert(i);
    }
    let (Some(&lat_col), Some(&lon_col)) = (columns.get("lat"), columns.get("lon")) else {
        return Ok(Vec::new());
    };
    let name_col = columns.get("name").copied();
    let id_col = columns.get("id").copied();

    let mut antennas = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let (Some(lat), Some(lon)) = (
            parse_f64(field(&record, Some(lat_col))),
            parse_f64(field(&record, Some(lon_col))),
        ) else {
            continue;
        };
        antennas.push(Antenna {
            lat,
            lon,
            name: field(&record, name_col)
                .unwrap_or(DEFAULT_ANTENNA_NAME)
                .to_string(),
            id: field(&record, id_col).map(str::to_string),
        });
    }

    tracing::debug!(antennas = antennas.len(), "Parsed antenna sites");
    Ok(antennas)
}

/// Read antenna sites from a CSV file.
pub fn read_antennas<P: AsRef<Path>>(path: P) -> Result<Vec<Antenna>> {
    let text = std::fs::read_to_string(path)?;
    parse_antennas(&text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::MetricKind;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SURVEY: &str = "\
SYSTEM,PLMN,xNBID,LOCAL_CID,PCI/PSC/BSIC,RSSI,RSRP/RSCP,DATE,SPEED,LAT,LON
7,42501,1234.0,3,301,-60,-95,2024-05-01,10,32.1000,35.1900
2,42501,,,,-72,,2024-05-02,80,32.1010,35.1910
4,42502,1240,1,17,-65,-101,2024-05-03,,32.1020,35.1920
7,42501,1234,3,301,,,2024-05-04,5,32.1030,35.1930
7,42501,1234,3,301,-61,-97,2024-05-05,5,,35.1940
";

    #[test]
    fn test_sniff_delimiter() {
        assert_eq!(sniff_delimiter("lat,lon,rsrp"), b',');
        assert_eq!(sniff_delimiter("lat;lon;rsrp\n1,2;3;4"), b';');
        assert_eq!(sniff_delimiter("lat\tlon\trsrp"), b'\t');
        assert_eq!(sniff_delimiter("lat|lon|rsrp"), b'|');
        assert_eq!(sniff_delimiter("lat"), b',');
        assert_eq!(sniff_delimiter(""), b',');
    }

    #[test]
    fn test_header_normalisation() {
        assert_eq!(Column::from_header("Latitude"), Some(Column::Lat));
        assert_eq!(Column::from_header("GPS Lon"), Some(Column::Lon));
        assert_eq!(Column::from_header("x"), Some(Column::Lon));
        assert_eq!(Column::from_header("RSRP/RSCP"), Some(Column::Rsrp));
        assert_eq!(Column::from_header("lte_rssi"), Some(Column::Rssi));
        assert_eq!(Column::from_header("RSRQ/ECIO"), Some(Column::Rsrq));
        assert_eq!(Column::from_header("LOCAL_CID"), Some(Column::LocalCellId));
        assert_eq!(Column::from_header("PCI/PSC/BSIC"), Some(Column::PhysicalCellId));
        assert_eq!(Column::from_header("xNBID"), Some(Column::NodeId));
        assert_eq!(Column::from_header("heading"), None);
    }

    #[test]
    fn test_auto_metric_drops_garbled_rsrp() {
        let csv = "\
SYSTEM,RSSI,RSRP/RSCP,LAT,LON
7,-60,n/a,32.1000,35.1900
4,-61,-99,32.1010,35.1910
LTE,-62,-98,32.1020,35.1920
2,-63,n/a,32.1030,35.1930
";
        let ingested = parse_measurements(csv, &IngestOptions::default()).unwrap();
        let m = &ingested.measurements;

        assert_eq!(m.len(), 2);
        assert_eq!(m[0].sample.metric, MetricKind::Rsrp);
        assert_eq!(m[0].sample.value, -99.0);
        assert_eq!(m[1].sample.metric, MetricKind::Rssi);
        assert_eq!(m[1].sample.value, -63.0);
        assert_eq!(ingested.stats.no_metric, 2);

        // An explicit preference only needs its own column
        let rssi = IngestOptions {
            metric: MetricPreference::Rssi,
            ..Default::default()
        };
        assert_eq!(parse_measurements(csv, &rssi).unwrap().stats.kept, 4);
    }

    #[test]
    fn test_parse_measurements_auto_metric() {
        let ingested = parse_measurements(SURVEY, &IngestOptions::default()).unwrap();
        let m = &ingested.measurements;

        assert_eq!(m.len(), 3);
        assert_eq!(m[0].sample.metric, MetricKind::Rsrp);
        assert_eq!(m[0].sample.value, -95.0);
        assert_eq!(m[1].sample.metric, MetricKind::Rssi);
        assert_eq!(m[1].sample.value, -72.0);
        assert_eq!(m[2].sample.metric, MetricKind::Rsrp);

        assert_eq!(
            ingested.stats,
            IngestStats {
                rows: 5,
                kept: 3,
                bad_coordinates: 1,
                filtered: 0,
                no_metric: 1,
            }
        );
        assert_eq!(ingested.stats.skipped(), 2);
    }

    #[test]
    fn test_identity_and_names() {
        let ingested = parse_measurements(SURVEY, &IngestOptions::default()).unwrap();
        let m = &ingested.measurements;

        assert_eq!(m[0].sample.identity.cell_id, Some(1234));
        assert_eq!(m[0].sample.identity.physical_cell_id, Some(301));
        assert_eq!(m[0].name, "1234-3");
        assert_eq!(m[0].row, 0);

        assert_eq!(m[1].sample.identity, CellIdentity::default());
        assert_eq!(m[1].name, "Meas 1");
    }

    #[test]
    fn test_attributes_in_display_order() {
        let ingested = parse_measurements(SURVEY, &IngestOptions::default()).unwrap();
        let names: Vec<&str> = ingested.measurements[0]
            .attributes
            .iter()
            .map(|(k, _)| *k)
            .collect();
        assert_eq!(
            names,
            vec![
                "SYSTEM",
                "PLMN",
                "xNBID",
                "LOCAL_CID",
                "PCI/PSC/BSIC",
                "RSSI",
                "RSRP/RSCP",
                "DATE",
            ]
        );
        assert_eq!(ingested.measurements[0].attributes[2].1, "1234.0");
    }

    #[test]
    fn test_forced_metric() {
        let options = IngestOptions {
            metric: MetricPreference::Rssi,
            ..Default::default()
        };
        let ingested = parse_measurements(SURVEY, &options).unwrap();
        assert_eq!(ingested.measurements.len(), 3);
        assert!(ingested
            .measurements
            .iter()
            .all(|m| m.sample.metric == MetricKind::Rssi));

        let options = IngestOptions {
            metric: MetricPreference::Rsrp,
            ..Default::default()
        };
        let ingested = parse_measurements(SURVEY, &options).unwrap();
        assert_eq!(ingested.measurements.len(), 2);
    }

    #[test]
    fn test_plmn_and_speed_filters() {
        let options = IngestOptions {
            plmn: Some("42501".to_string()),
            ..Default::default()
        };
        let ingested = parse_measurements(SURVEY, &options).unwrap();
        assert_eq!(ingested.measurements.len(), 2);
        assert_eq!(ingested.stats.filtered, 1);

        // The third row has no SPEED and is dropped while the filter is on
        let options = IngestOptions {
            max_speed: Some(50.0),
            ..Default::default()
        };
        let ingested = parse_measurements(SURVEY, &options).unwrap();
        assert_eq!(ingested.measurements.len(), 1);
        assert_eq!(ingested.measurements[0].row, 0);
    }

    #[test]
    fn test_date_filter() {
        let options = IngestOptions {
            date_from: Some("2024-05-02".to_string()),
            date_to: Some("2024-05-03".to_string()),
            ..Default::default()
        };
        let ingested = parse_measurements(SURVEY, &options).unwrap();
        let rows: Vec<usize> = ingested.measurements.iter().map(|m| m.row).collect();
        assert_eq!(rows, vec![1, 2]);
    }

    #[test]
    fn test_filter_ignored_without_column() {
        let csv = "lat,lon,rssi\n32.1,35.19,-70\n";
        let options = IngestOptions {
            plmn: Some("42501".to_string()),
            max_speed: Some(1.0),
            date_from: Some("2030".to_string()),
            ..Default::default()
        };
        let ingested = parse_measurements(csv, &options).unwrap();
        assert_eq!(ingested.measurements.len(), 1);
    }

    #[test]
    fn test_radius_filter() {
        let options = IngestOptions {
            radius: Some(RadiusFilter::new(32.1000, 35.1900, 0.2)),
            ..Default::default()
        };
        let ingested = parse_measurements(SURVEY, &options).unwrap();
        // Second row is ~146 m away, third ~290 m
        let rows: Vec<usize> = ingested.measurements.iter().map(|m| m.row).collect();
        assert_eq!(rows, vec![0, 1]);

        let filter = RadiusFilter::new(0.0, 0.0, 1.0);
        assert!(filter.contains(0.0, 0.0));
        assert!(!filter.contains(0.0, 0.02));
    }

    #[test]
    fn test_missing_coordinate_column() {
        let result = parse_measurements("lat,rssi\n32.1,-70\n", &IngestOptions::default());
        assert!(matches!(
            result,
            Err(CellmapError::MissingColumn { column }) if column == "LON"
        ));
    }

    #[test]
    fn test_semicolon_survey_with_bom() {
        let csv = "\u{feff}Latitude;Longitude;Signal\n32,1;35,2;-70\n32.1;35.2;-71\n";
        let ingested = parse_measurements(csv, &IngestOptions::default()).unwrap();
        assert_eq!(ingested.measurements.len(), 1);
        assert_eq!(ingested.measurements[0].sample.value, -71.0);
        assert_eq!(ingested.stats.bad_coordinates, 1);
    }

    #[test]
    fn test_store_keeps_file_order() {
        let ingested = parse_measurements(SURVEY, &IngestOptions::default()).unwrap();
        let store = ingested.store();
        assert_eq!(store.len(), 3);
        assert_eq!(store.samples()[2].value, -101.0);
    }

    #[test]
    fn test_read_measurements_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(SURVEY.as_bytes()).unwrap();

        let ingested = read_measurements(file.path(), &IngestOptions::default()).unwrap();
        assert_eq!(ingested.measurements.len(), 3);

        let missing = read_measurements("/nonexistent/survey.csv", &IngestOptions::default());
        assert!(matches!(missing, Err(CellmapError::Io(_))));
    }

    #[test]
    fn test_parse_antennas() {
        let csv = "Name,LAT,Lon,ID\nNorth,32.2,35.3,A1\n,32.3,35.4,\nbad,x,35.5,A3\n";
        let antennas = parse_antennas(csv).unwrap();

        assert_eq!(antennas.len(), 2);
        assert_eq!(antennas[0].name, "North");
        assert_eq!(antennas[0].id.as_deref(), Some("A1"));
        assert_eq!(antennas[1].name, "Antenna");
        assert_eq!(antennas[1].id, None);
    }

    #[test]
    fn test_antennas_without_coordinates() {
        assert!(parse_antennas("name,site\nA,1\n").unwrap().is_empty());
    }

    #[test]
    fn test_read_antennas_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "lat,lon,name").unwrap();
        writeln!(file, "32.2,35.3,Tower").unwrap();

        let antennas = read_antennas(file.path()).unwrap();
        assert_eq!(antennas.len(), 1);
        assert_eq!(antennas[0].name, "Tower");
    }
}
