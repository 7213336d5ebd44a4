use super::Range;
use layerkit_expression::FeatureContext;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Feature geometry in GeoJSON wire shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Point(Vec<f64>),
    LineString(Vec<Vec<f64>>),
    Polygon(Vec<Vec<Vec<f64>>>),
}

/// One record produced by a fetcher. Identity is `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Geometry>,
    #[serde(default)]
    pub properties: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<Range>,
}

impl Feature {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            geometry: None,
            properties: Map::new(),
            range: None,
        }
    }

    pub fn with_geometry(mut self, geometry: Geometry) -> Self {
        self.geometry = Some(geometry);
        self
    }

    /// Sets the properties from a JSON object; other values are ignored.
    pub fn with_properties(mut self, properties: Value) -> Self {
        if let Value::Object(map) = properties {
            self.properties = map;
        }
        self
    }

    pub fn with_range(mut self, range: Range) -> Self {
        self.range = Some(range);
        self
    }
}

impl FeatureContext for Feature {
    fn id(&self) -> Option<&str> {
        Some(&self.id)
    }

    fn properties(&self) -> Option<&Map<String, Value>> {
        Some(&self.properties)
    }

    fn document(&self) -> Value {
        json!({
            "type": "Feature",
            "id": self.id,
            "geometry": serde_json::to_value(&self.geometry).unwrap_or(Value::Null),
            "properties": self.properties,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometry_wire_shape() {
        let g = Geometry::Point(vec![1.0, 2.0]);
        assert_eq!(
            serde_json::to_value(&g).unwrap(),
            json!({"type": "Point", "coordinates": [1.0, 2.0]})
        );
        let back: Geometry =
            serde_json::from_value(json!({"type": "LineString", "coordinates": [[0, 0], [1, 1]]}))
                .unwrap();
        assert_eq!(
            back,
            Geometry::LineString(vec![vec![0.0, 0.0], vec![1.0, 1.0]])
        );
    }

    #[test]
    fn test_document_exposes_the_whole_feature() {
        let f = Feature::new("a").with_properties(json!({"h": 3}));
        let doc = f.document();
        assert_eq!(doc["id"], "a");
        assert_eq!(doc["properties"]["h"], 3);
        assert_eq!(doc["geometry"], Value::Null);
    }
}
