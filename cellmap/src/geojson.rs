//! GeoJSON rendering of coverage surfaces and survey markers.
//!
//! Enable the `geojson` feature to use this module. Output follows the
//! simplestyle conventions (`fill`, `fill-opacity`, `marker-color`) so the
//! collections render colored in common web map viewers.
//!
//! # Example
//!
//! ```
//! use cellmap::geojson::tiles_to_collection;
//! use cellmap::{build_surface, MapConfig, MetricKind, Sample, SampleStore};
//!
//! let store = SampleStore::new(vec![Sample::new(32.1, 35.2, -92.0, MetricKind::Rsrp)]);
//! let tiles = build_surface(&store, &MapConfig::default()).unwrap();
//!
//! let collection = tiles_to_collection(tiles);
//! assert!(!collection.features.is_empty());
//! ```

use geojson::{Feature, FeatureCollection, Geometry, JsonObject, JsonValue, Value as GeoJsonValue};

use crate::error::{CellmapError, Result};
use crate::grade::SignalGrade;
use crate::interpolate::{predict, IdwParams};
use crate::sample::{Sample, SampleStore};
use crate::surface::Tile;

fn feature(value: GeoJsonValue, properties: JsonObject) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(value)),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

/// Convert a tile into an outline-less Polygon feature.
///
/// The ring is closed and uses GeoJSON `[lon, lat]` order.
pub fn tile_to_feature(tile: &Tile) -> Feature {
    let ring = vec![
        vec![tile.lon_min, tile.lat_min],
        vec![tile.lon_max, tile.lat_min],
        vec![tile.lon_max, tile.lat_max],
        vec![tile.lon_min, tile.lat_max],
        vec![tile.lon_min, tile.lat_min],
    ];

    let mut props = JsonObject::new();
    props.insert("fill".into(), JsonValue::from(tile.color.to_css_hex()));
    props.insert("fill-opacity".into(), JsonValue::from(tile.color.opacity()));
    props.insert("stroke-width".into(), JsonValue::from(0));
    props.insert("value".into(), JsonValue::from(tile.value));
    props.insert("metric".into(), JsonValue::from(tile.metric.as_str()));

    feature(GeoJsonValue::Polygon(vec![ring]), props)
}

/// Convert a survey sample into a graded Point marker.
pub fn sample_to_feature(sample: &Sample) -> Feature {
    let grade = SignalGrade::of_sample(sample);

    let mut props = JsonObject::new();
    props.insert("value".into(), JsonValue::from(sample.value));
    props.insert("metric".into(), JsonValue::from(sample.metric.as_str()));
    props.insert("grade".into(), JsonValue::from(grade.label()));
    props.insert("style".into(), JsonValue::from(grade.style_id()));
    props.insert(
        "marker-color".into(),
        JsonValue::from(grade.marker_color().to_css_hex()),
    );
    if let Some(cell_id) = sample.identity.cell_id {
        props.insert("cell_id".into(), JsonValue::from(cell_id));
    }
    if let Some(pci) = sample.identity.physical_cell_id {
        props.insert("pci".into(), JsonValue::from(pci));
    }

    feature(GeoJsonValue::Point(vec![sample.lon, sample.lat]), props)
}

/// Collect tiles into a FeatureCollection, preserving their order.
pub fn tiles_to_collection<I>(tiles: I) -> FeatureCollection
where
    I: IntoIterator<Item = Tile>,
{
    FeatureCollection {
        bbox: None,
        features: tiles.into_iter().map(|t| tile_to_feature(&t)).collect(),
        foreign_members: None,
    }
}

/// Markers for every sample in the store, in insertion order.
pub fn samples_to_collection(store: &SampleStore) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features: store.iter().map(sample_to_feature).collect(),
        foreign_members: None,
    }
}

/// Predict the signal at every position of a GeoJSON geometry.
///
/// Traverses Point, MultiPoint, LineString, MultiLineString, Polygon,
/// MultiPolygon and GeometryCollection values in document order and returns
/// one Point feature per position. Positions without a prediction carry
/// `null` for `signal`, `metric` and `grade`.
///
/// # Errors
///
/// Returns [`CellmapError::InvalidCoordinate`] if a position has fewer than
/// two elements.
pub fn predict_along_geometry(
    store: &SampleStore,
    geometry: &Geometry,
    params: &IdwParams,
) -> Result<FeatureCollection> {
    let mut positions = Vec::new();
    collect_positions(&geometry.value, &mut positions)?;

    let features = positions
        .into_iter()
        .map(|(lat, lon)| prediction_feature(store, lat, lon, params))
        .collect();

    Ok(FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    })
}

fn collect_positions(value: &GeoJsonValue, out: &mut Vec<(f64, f64)>) -> Result<()> {
    match value {
        GeoJsonValue::Point(coord) => push_position(coord, out),
        GeoJsonValue::MultiPoint(coords) | GeoJsonValue::LineString(coords) => {
            push_positions(coords, out)
        }
        GeoJsonValue::MultiLineString(lines) | GeoJsonValue::Polygon(lines) => lines
            .iter()
            .try_for_each(|line| push_positions(line, out)),
        GeoJsonValue::MultiPolygon(polygons) => polygons
            .iter()
            .flatten()
            .try_for_each(|ring| push_positions(ring, out)),
        GeoJsonValue::GeometryCollection(geometries) => geometries
            .iter()
            .try_for_each(|g| collect_positions(&g.value, out)),
    }
}

fn push_positions(coords: &[Vec<f64>], out: &mut Vec<(f64, f64)>) -> Result<()> {
    coords.iter().try_for_each(|coord| push_position(coord, out))
}

fn push_position(coord: &[f64], out: &mut Vec<(f64, f64)>) -> Result<()> {
    match coord {
        [lon, lat, ..] => {
            out.push((*lat, *lon));
            Ok(())
        }
        _ => Err(CellmapError::InvalidCoordinate {
            message: "Coordinate must have at least 2 elements (lon, lat)".to_string(),
        }),
    }
}

fn prediction_feature(store: &SampleStore, lat: f64, lon: f64, params: &IdwParams) -> Feature {
    let mut props = JsonObject::new();
    match predict(store, lat, lon, params) {
        Some(p) => {
            props.insert("signal".into(), JsonValue::from(p.value));
            props.insert("metric".into(), JsonValue::from(p.metric.as_str()));
            props.insert(
                "grade".into(),
                JsonValue::from(SignalGrade::from_value(p.metric, p.value).label()),
            );
        }
        None => {
            props.insert("signal".into(), JsonValue::Null);
            props.insert("metric".into(), JsonValue::Null);
            props.insert("grade".into(), JsonValue::Null);
        }
    }
    feature(GeoJsonValue::Point(vec![lon, lat]), props)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grade::Rgba;
    use crate::sample::MetricKind;

    fn store() -> SampleStore {
        SampleStore::new(vec![
            Sample::new(35.50, 138.50, -90.0, MetricKind::Rsrp).with_cell_id(7),
            Sample::new(35.501, 138.501, -100.0, MetricKind::Rsrp).with_cell_id(7),
        ])
    }

    static NULL: JsonValue = JsonValue::Null;

    fn prop<'a>(feature: &'a Feature, key: &str) -> &'a JsonValue {
        feature
            .properties
            .as_ref()
            .and_then(|p| p.get(key))
            .unwrap_or(&NULL)
    }

    #[test]
    fn test_tile_to_feature() {
        let tile = Tile {
            lat_min: 1.0,
            lon_min: 2.0,
            lat_max: 1.5,
            lon_max: 2.5,
            value: -93.0,
            metric: MetricKind::Rsrp,
            color: Rgba::new(255, 200, 0, 255),
        };
        let feature = tile_to_feature(&tile);

        match &feature.geometry.as_ref().unwrap().value {
            GeoJsonValue::Polygon(rings) => {
                assert_eq!(rings.len(), 1);
                assert_eq!(rings[0].len(), 5);
                assert_eq!(rings[0][0], vec![2.0, 1.0]);
                assert_eq!(rings[0][2], vec![2.5, 1.5]);
                assert_eq!(rings[0][0], rings[0][4]);
            }
            other => panic!("Expected Polygon, got {:?}", other),
        }
        assert_eq!(prop(&feature, "fill").as_str(), Some("#ffc800"));
        assert_eq!(prop(&feature, "fill-opacity").as_f64(), Some(1.0));
        assert_eq!(prop(&feature, "stroke-width").as_u64(), Some(0));
        assert_eq!(prop(&feature, "metric").as_str(), Some("RSRP"));
    }

    #[test]
    fn test_sample_to_feature() {
        let sample = Sample::new(35.5, 138.5, -112.0, MetricKind::Rsrp)
            .with_cell_id(42)
            .with_physical_cell_id(301);
        let feature = sample_to_feature(&sample);

        match &feature.geometry.as_ref().unwrap().value {
            GeoJsonValue::Point(coord) => assert_eq!(coord, &vec![138.5, 35.5]),
            other => panic!("Expected Point, got {:?}", other),
        }
        assert_eq!(prop(&feature, "style").as_str(), Some("rxl105"));
        assert_eq!(prop(&feature, "marker-color").as_str(), Some("#ff0000"));
        assert_eq!(prop(&feature, "cell_id").as_u64(), Some(42));
        assert_eq!(prop(&feature, "pci").as_u64(), Some(301));
    }

    #[test]
    fn test_samples_to_collection_keeps_order() {
        let collection = samples_to_collection(&store());
        assert_eq!(collection.features.len(), 2);
        assert_eq!(prop(&collection.features[0], "value").as_f64(), Some(-90.0));
        assert_eq!(prop(&collection.features[1], "value").as_f64(), Some(-100.0));
    }

    #[test]
    fn test_predict_along_point() {
        let geometry = Geometry::new(GeoJsonValue::Point(vec![138.5, 35.5]));
        let result = predict_along_geometry(&store(), &geometry, &IdwParams::default()).unwrap();

        assert_eq!(result.features.len(), 1);
        // Snapped onto the first sample
        assert_eq!(prop(&result.features[0], "signal").as_f64(), Some(-90.0));
        assert_eq!(prop(&result.features[0], "grade").as_str(), Some("good"));
    }

    #[test]
    fn test_predict_along_linestring_with_gap() {
        let geometry = Geometry::new(GeoJsonValue::LineString(vec![
            vec![138.5, 35.5],
            vec![139.5, 35.5],
        ]));
        let result = predict_along_geometry(&store(), &geometry, &IdwParams::default()).unwrap();

        assert_eq!(result.features.len(), 2);
        assert!(prop(&result.features[0], "signal").is_number());
        assert!(prop(&result.features[1], "signal").is_null());
        assert!(prop(&result.features[1], "grade").is_null());
    }

    #[test]
    fn test_predict_along_polygon_and_collection() {
        let polygon = Geometry::new(GeoJsonValue::Polygon(vec![vec![
            vec![138.5, 35.5],
            vec![138.501, 35.5],
            vec![138.5005, 35.501],
            vec![138.5, 35.5],
        ]]));
        let collection = Geometry::new(GeoJsonValue::GeometryCollection(vec![
            Geometry::new(GeoJsonValue::Point(vec![138.5, 35.5])),
            polygon,
        ]));
        let result = predict_along_geometry(&store(), &collection, &IdwParams::default()).unwrap();

        assert_eq!(result.features.len(), 5);
        assert!(result
            .features
            .iter()
            .all(|f| prop(f, "signal").is_number()));
    }

    #[test]
    fn test_predict_along_invalid_coordinate() {
        let geometry = Geometry::new(GeoJsonValue::MultiPoint(vec![
            vec![138.5, 35.5],
            vec![138.5],
        ]));
        let result = predict_along_geometry(&store(), &geometry, &IdwParams::default());
        assert!(matches!(result, Err(CellmapError::InvalidCoordinate { .. })));
    }
}
