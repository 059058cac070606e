//! Output formats for generated coverage maps.

pub mod kml;
