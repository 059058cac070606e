//! Streaming KML writer.
//!
//! Produces a single document with one shared icon style per signal grade,
//! an antenna style, and folders of placemarks. Tiles are written as they are
//! produced so large surfaces never sit in memory as text.

use cellmap::ingest::{Antenna, Measurement};
use cellmap::{Rgba, SignalGrade, Tile};
use std::io::{self, Write};

const KML_NS: &str = "http://www.opengis.net/kml/2.2";
const GRADE_ICON: &str = "https://sites.google.com/site/pynetmony/home/iconrxl.png";
const ANTENNA_ICON: &str = "http://maps.google.com/mapfiles/kml/shapes/placemark_circle.png";
const ANTENNA_STYLE: &str = "antenna";
const ANTENNA_COLOR: Rgba = Rgba::opaque(255, 255, 0);

/// Escape text for use in XML element content.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Wrap text in a CDATA section, splitting any embedded terminator.
pub fn cdata(text: &str) -> String {
    format!("<![CDATA[{}]]>", text.replace("]]>", "]]]]><![CDATA[>"))
}

/// HTML description of a survey row: `<b>KEY</b>: value` lines.
pub fn describe(measurement: &Measurement) -> String {
    measurement
        .attributes
        .iter()
        .map(|(key, value)| format!("<b>{}</b>: {}", key, value))
        .collect::<Vec<_>>()
        .join("<br/>")
}

pub struct KmlWriter<W: Write> {
    out: W,
}

impl<W: Write> KmlWriter<W> {
    /// Write the document header and shared styles.
    pub fn start(mut out: W, name: &str) -> io::Result<Self> {
        writeln!(out, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
        writeln!(out, r#"<kml xmlns="{}">"#, KML_NS)?;
        writeln!(out, "  <Document>")?;
        writeln!(out, "    <name>{}</name>", escape(name))?;
        for grade in SignalGrade::ALL {
            icon_style(&mut out, grade.style_id(), grade.marker_color(), 0.5, GRADE_ICON)?;
        }
        icon_style(&mut out, ANTENNA_STYLE, ANTENNA_COLOR, 1.0, ANTENNA_ICON)?;
        Ok(Self { out })
    }

    pub fn begin_folder(&mut self, name: &str, visible: bool) -> io::Result<()> {
        writeln!(self.out, "    <Folder><name>{}</name>", escape(name))?;
        if !visible {
            writeln!(self.out, "    <visibility>0</visibility>")?;
        }
        Ok(())
    }

    pub fn end_folder(&mut self) -> io::Result<()> {
        writeln!(self.out, "    </Folder>")
    }

    /// An outline-less filled polygon.
    pub fn tile(&mut self, tile: &Tile) -> io::Result<()> {
        let corners = [
            (tile.lon_min, tile.lat_min),
            (tile.lon_max, tile.lat_min),
            (tile.lon_max, tile.lat_max),
            (tile.lon_min, tile.lat_max),
            (tile.lon_min, tile.lat_min),
        ];

        writeln!(self.out, "    <Placemark>")?;
        writeln!(self.out, "      <Style>")?;
        writeln!(self.out, "        <PolyStyle>")?;
        writeln!(self.out, "          <color>{}</color>", tile.color.to_kml_hex())?;
        writeln!(self.out, "          <outline>0</outline>")?;
        writeln!(self.out, "        </PolyStyle>")?;
        writeln!(self.out, "      </Style>")?;
        writeln!(self.out, "      <Polygon>")?;
        writeln!(self.out, "        <outerBoundaryIs>")?;
        writeln!(self.out, "          <LinearRing>")?;
        writeln!(self.out, "            <coordinates>")?;
        for (lon, lat) in corners {
            writeln!(self.out, "              {:.6},{:.6},0", lon, lat)?;
        }
        writeln!(self.out, "            </coordinates>")?;
        writeln!(self.out, "          </LinearRing>")?;
        writeln!(self.out, "        </outerBoundaryIs>")?;
        writeln!(self.out, "      </Polygon>")?;
        writeln!(self.out, "    </Placemark>")
    }

    /// A graded survey marker.
    pub fn measurement(&mut self, measurement: &Measurement) -> io::Result<()> {
        let sample = &measurement.sample;
        self.point(
            &measurement.name,
            sample.lat,
            sample.lon,
            &describe(measurement),
            SignalGrade::of_sample(sample).style_id(),
        )
    }

    pub fn antenna(&mut self, antenna: &Antenna) -> io::Result<()> {
        let description = antenna
            .id
            .as_ref()
            .map(|id| format!("ID: {}", id))
            .unwrap_or_default();
        self.point(&antenna.name, antenna.lat, antenna.lon, &description, ANTENNA_STYLE)
    }

    fn point(
        &mut self,
        name: &str,
        lat: f64,
        lon: f64,
        description: &str,
        style: &str,
    ) -> io::Result<()> {
        writeln!(self.out, "    <Placemark>")?;
        writeln!(self.out, "      <name>{}</name>", escape(name))?;
        writeln!(self.out, "      <description>{}</description>", cdata(description))?;
        writeln!(self.out, "      <styleUrl>#{}</styleUrl>", style)?;
        writeln!(
            self.out,
            "      <Point><coordinates>{:.6},{:.6},0</coordinates></Point>",
            lon, lat
        )?;
        writeln!(self.out, "    </Placemark>")
    }

    /// Close the document and hand back the sink.
    pub fn finish(mut self) -> io::Result<W> {
        writeln!(self.out, "  </Document>")?;
        writeln!(self.out, "</kml>")?;
        self.out.flush()?;
        Ok(self.out)
    }
}

fn icon_style<W: Write>(
    out: &mut W,
    id: &str,
    color: Rgba,
    scale: f64,
    icon: &str,
) -> io::Result<()> {
    writeln!(out, r#"    <Style id="{}">"#, id)?;
    writeln!(out, "      <IconStyle>")?;
    writeln!(out, "        <color>{}</color>", color.to_kml_hex())?;
    writeln!(out, "        <scale>{:.1}</scale>", scale)?;
    writeln!(out, "        <Icon><href>{}</href></Icon>", icon)?;
    writeln!(out, "      </IconStyle>")?;
    writeln!(out, "    </Style>")
}

#[cfg(test)]
mod tests {
    use super::*;
    use cellmap::{MetricKind, Sample};

    fn render<F>(body: F) -> String
    where
        F: FnOnce(&mut KmlWriter<Vec<u8>>) -> io::Result<()>,
    {
        let mut writer = KmlWriter::start(Vec::new(), "Coverage & more").unwrap();
        body(&mut writer).unwrap();
        String::from_utf8(writer.finish().unwrap()).unwrap()
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape("a<b>&\"c'"), "a&lt;b&gt;&amp;&quot;c&apos;");
        assert_eq!(escape("plain"), "plain");
    }

    #[test]
    fn test_cdata_splits_terminator() {
        assert_eq!(cdata("x"), "<![CDATA[x]]>");
        assert_eq!(cdata("a]]>b"), "<![CDATA[a]]]]><![CDATA[>b]]>");
    }

    #[test]
    fn test_document_styles() {
        let kml = render(|_| Ok(()));

        assert!(kml.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(kml.contains("<name>Coverage &amp; more</name>"));
        for id in ["rxl113", "rxl105", "rxl80", "rxl76", "rxl69", "rxl92", "antenna"] {
            assert!(kml.contains(&format!(r#"<Style id="{}">"#, id)), "missing style {}", id);
        }
        // Orange marker for "good" in aabbggrr
        assert!(kml.contains("<color>ff00a5ff</color>"));
        assert!(kml.contains("<color>ff00ffff</color>"));
        assert_eq!(kml.matches("<scale>0.5</scale>").count(), 6);
        assert!(kml.trim_end().ends_with("</kml>"));
    }

    #[test]
    fn test_tile_polygon() {
        let tile = Tile {
            lat_min: 32.1,
            lon_min: 35.19,
            lat_max: 32.1005,
            lon_max: 35.1905,
            value: -100.0,
            metric: MetricKind::Rsrp,
            color: Rgba::new(255, 127, 0, 160),
        };
        let kml = render(|w| {
            w.begin_folder("Prediction (IDW tiles)", true)?;
            w.tile(&tile)?;
            w.end_folder()
        });

        assert!(kml.contains("<Folder><name>Prediction (IDW tiles)</name>"));
        assert!(kml.contains("<color>a0007fff</color>"));
        assert!(kml.contains("<outline>0</outline>"));
        assert!(kml.contains("35.190000,32.100000,0"));
        assert!(kml.contains("35.190500,32.100500,0"));
        assert_eq!(kml.matches("35.190000,32.100000,0").count(), 2);
    }

    #[test]
    fn test_hidden_measurement_folder() {
        let measurement = Measurement {
            sample: Sample::new(32.1, 35.19, -112.0, MetricKind::Rsrp),
            row: 4,
            name: "1234-<3>".to_string(),
            attributes: vec![("PLMN", "42501".to_string()), ("RSRP/RSCP", "-112".to_string())],
        };
        let kml = render(|w| {
            w.begin_folder("Measurements", false)?;
            w.measurement(&measurement)?;
            w.end_folder()
        });

        assert!(kml.contains("<visibility>0</visibility>"));
        assert!(kml.contains("<name>1234-&lt;3&gt;</name>"));
        assert!(kml.contains("<styleUrl>#rxl105</styleUrl>"));
        assert!(kml.contains(
            "<description><![CDATA[<b>PLMN</b>: 42501<br/><b>RSRP/RSCP</b>: -112]]></description>"
        ));
        assert!(kml.contains("<Point><coordinates>35.190000,32.100000,0</coordinates></Point>"));
    }

    #[test]
    fn test_antenna_placemark() {
        let antennas = [
            Antenna {
                lat: 32.2,
                lon: 35.3,
                name: "North".to_string(),
                id: Some("A1".to_string()),
            },
            Antenna {
                lat: 32.3,
                lon: 35.4,
                name: "Antenna".to_string(),
                id: None,
            },
        ];
        let kml = render(|w| {
            w.begin_folder("Antennas", true)?;
            for antenna in &antennas {
                w.antenna(antenna)?;
            }
            w.end_folder()
        });

        assert_eq!(kml.matches("<styleUrl>#antenna</styleUrl>").count(), 2);
        assert!(kml.contains("<![CDATA[ID: A1]]>"));
        assert!(kml.contains("<description><![CDATA[]]></description>"));
        assert!(!kml.contains("<visibility>0</visibility>"));
    }
}
