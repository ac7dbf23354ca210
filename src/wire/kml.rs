use crate::types::Sample;

/// KML track document for viewing a synthesized route in mapping tools
#[derive(Debug, Clone)]
pub struct KmlTrack {
    pub name: String,
    pub points: Vec<KmlPoint>,
}

#[derive(Debug, Clone, Copy)]
pub struct KmlPoint {
    pub lon: f64,
    pub lat: f64,
    pub alt: f64,
}

impl From<&Sample> for KmlPoint {
    fn from(sample: &Sample) -> Self {
        KmlPoint {
            lon: sample.position.lon(),
            lat: sample.position.lat(),
            alt: sample.altitude,
        }
    }
}

impl KmlTrack {
    pub fn new(name: &str) -> Self {
        KmlTrack {
            name: name.to_string(),
            points: Vec::new(),
        }
    }

    pub fn push(&mut self, sample: &Sample) {
        self.points.push(KmlPoint::from(sample));
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Generate KML document XML string
    pub fn to_kml_xml(&self) -> String {
        let mut xml = String::new();
        xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        xml.push_str("<kml xmlns=\"http://www.opengis.net/kml/2.2\" xmlns:gx=\"http://www.google.com/kml/ext/2.2\">\n");
        xml.push_str("  <Document>\n");
        xml.push_str(&format!("    <name>{}</name>\n", escape_xml(&self.name)));
        xml.push_str("    <Placemark>\n");
        xml.push_str("      <name>Trajectory</name>\n");
        xml.push_str("      <LineString>\n");
        xml.push_str("        <tessellate>1</tessellate>\n");
        xml.push_str("        <altitudeMode>absolute</altitudeMode>\n");
        xml.push_str("        <coordinates>\n");

        for point in &self.points {
            xml.push_str(&format!(
                "          {:.8},{:.8},{:.3}\n",
                point.lon, point.lat, point.alt
            ));
        }

        xml.push_str("        </coordinates>\n");
        xml.push_str("      </LineString>\n");
        xml.push_str("    </Placemark>\n");
        xml.push_str("  </Document>\n");
        xml.push_str("</kml>\n");

        xml
    }
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
