use super::Data;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Fields of one appearance category. Each value is either a literal or an
/// expression container, see [`crate::style::StyleValue`].
pub type Appearance = Map<String, Value>;

/// The closed set of appearance categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AppearanceCategory {
    Marker,
    Polyline,
    Polygon,
    Model,
    Tileset,
    Ellipsoid,
    Box,
    PhotoOverlay,
    Resource,
    Raster,
}

impl AppearanceCategory {
    pub const ALL: [AppearanceCategory; 10] = [
        AppearanceCategory::Marker,
        AppearanceCategory::Polyline,
        AppearanceCategory::Polygon,
        AppearanceCategory::Model,
        AppearanceCategory::Tileset,
        AppearanceCategory::Ellipsoid,
        AppearanceCategory::Box,
        AppearanceCategory::PhotoOverlay,
        AppearanceCategory::Resource,
        AppearanceCategory::Raster,
    ];

    /// Key used in layer JSON.
    pub fn as_str(&self) -> &'static str {
        match self {
            AppearanceCategory::Marker => "marker",
            AppearanceCategory::Polyline => "polyline",
            AppearanceCategory::Polygon => "polygon",
            AppearanceCategory::Model => "model",
            AppearanceCategory::Tileset => "3dtiles",
            AppearanceCategory::Ellipsoid => "ellipsoid",
            AppearanceCategory::Box => "box",
            AppearanceCategory::PhotoOverlay => "photooverlay",
            AppearanceCategory::Resource => "resource",
            AppearanceCategory::Raster => "raster",
        }
    }
}

impl FromStr for AppearanceCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AppearanceCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown appearance category \"{s}\""))
    }
}

impl fmt::Display for AppearanceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One optional [`Appearance`] per category.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Appearances {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker: Option<Appearance>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub polyline: Option<Appearance>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub polygon: Option<Appearance>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<Appearance>,
    #[serde(rename = "3dtiles", default, skip_serializing_if = "Option::is_none")]
    pub tileset: Option<Appearance>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ellipsoid: Option<Appearance>,
    #[serde(rename = "box", default, skip_serializing_if = "Option::is_none")]
    pub box_: Option<Appearance>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photooverlay: Option<Appearance>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<Appearance>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raster: Option<Appearance>,
}

impl Appearances {
    pub fn get(&self, category: AppearanceCategory) -> Option<&Appearance> {
        self.slot(category).as_ref()
    }

    pub fn set(&mut self, category: AppearanceCategory, appearance: Option<Appearance>) {
        *self.slot_mut(category) = appearance;
    }

    /// Declared categories in [`AppearanceCategory::ALL`] order.
    pub fn iter(&self) -> impl Iterator<Item = (AppearanceCategory, &Appearance)> {
        AppearanceCategory::ALL
            .into_iter()
            .filter_map(move |c| self.get(c).map(|a| (c, a)))
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    /// Builds appearances from an untyped override map, dropping keys that
    /// are not appearance categories and values that are not objects.
    pub fn from_map(map: &Map<String, Value>) -> Self {
        let mut out = Appearances::default();
        for (key, value) in map {
            let (Ok(category), Value::Object(fields)) = (key.parse::<AppearanceCategory>(), value) else {
                tracing::debug!(key = %key, "dropping unrecognized override key");
                continue;
            };
            out.set(category, Some(fields.clone()));
        }
        out
    }

    fn slot(&self, category: AppearanceCategory) -> &Option<Appearance> {
        match category {
            AppearanceCategory::Marker => &self.marker,
            AppearanceCategory::Polyline => &self.polyline,
            AppearanceCategory::Polygon => &self.polygon,
            AppearanceCategory::Model => &self.model,
            AppearanceCategory::Tileset => &self.tileset,
            AppearanceCategory::Ellipsoid => &self.ellipsoid,
            AppearanceCategory::Box => &self.box_,
            AppearanceCategory::PhotoOverlay => &self.photooverlay,
            AppearanceCategory::Resource => &self.resource,
            AppearanceCategory::Raster => &self.raster,
        }
    }

    fn slot_mut(&mut self, category: AppearanceCategory) -> &mut Option<Appearance> {
        match category {
            AppearanceCategory::Marker => &mut self.marker,
            AppearanceCategory::Polyline => &mut self.polyline,
            AppearanceCategory::Polygon => &mut self.polygon,
            AppearanceCategory::Model => &mut self.model,
            AppearanceCategory::Tileset => &mut self.tileset,
            AppearanceCategory::Ellipsoid => &mut self.ellipsoid,
            AppearanceCategory::Box => &mut self.box_,
            AppearanceCategory::PhotoOverlay => &mut self.photooverlay,
            AppearanceCategory::Resource => &mut self.resource,
            AppearanceCategory::Raster => &mut self.raster,
        }
    }
}

fn default_visible() -> bool {
    true
}

fn is_true(v: &bool) -> bool {
    *v
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimpleLayer {
    pub id: String,
    #[serde(default = "default_visible", skip_serializing_if = "is_true")]
    pub visible: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Data>,
    #[serde(flatten)]
    pub appearances: Appearances,
}

impl SimpleLayer {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            visible: true,
            title: None,
            tags: Vec::new(),
            data: None,
            appearances: Appearances::default(),
        }
    }

    pub fn with_data(mut self, data: Data) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_appearance(mut self, category: AppearanceCategory, appearance: Value) -> Self {
        if let Value::Object(fields) = appearance {
            self.appearances.set(category, Some(fields));
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupLayer {
    pub id: String,
    #[serde(default = "default_visible", skip_serializing_if = "is_true")]
    pub visible: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub children: Vec<Layer>,
}

/// A declarative layer: `{"type": "simple", ...}` or `{"type": "group", ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Layer {
    Simple(SimpleLayer),
    Group(GroupLayer),
}

impl Layer {
    pub fn id(&self) -> &str {
        match self {
            Layer::Simple(l) => &l.id,
            Layer::Group(l) => &l.id,
        }
    }

    pub fn visible(&self) -> bool {
        match self {
            Layer::Simple(l) => l.visible,
            Layer::Group(l) => l.visible,
        }
    }

    pub fn data(&self) -> Option<&Data> {
        match self {
            Layer::Simple(l) => l.data.as_ref(),
            Layer::Group(_) => None,
        }
    }

    /// Declared appearances; groups have none.
    pub fn appearances(&self) -> Option<&Appearances> {
        match self {
            Layer::Simple(l) => Some(&l.appearances),
            Layer::Group(_) => None,
        }
    }
}

impl From<SimpleLayer> for Layer {
    fn from(l: SimpleLayer) -> Self {
        Layer::Simple(l)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_category_keys() {
        for c in AppearanceCategory::ALL {
            assert_eq!(c.as_str().parse::<AppearanceCategory>(), Ok(c));
        }
        assert!("label".parse::<AppearanceCategory>().is_err());
    }

    #[test]
    fn test_deserialize_simple_layer() {
        let layer: Layer = serde_json::from_value(json!({
            "type": "simple",
            "id": "l1",
            "data": {"type": "geojson", "url": "https://e/x.geojson"},
            "marker": {"pointColor": "red"},
            "3dtiles": {"color": {"expression": "color('blue')"}}
        }))
        .unwrap();
        assert_eq!(layer.id(), "l1");
        assert!(layer.visible());
        let appearances = layer.appearances().unwrap();
        assert_eq!(
            appearances.get(AppearanceCategory::Marker).unwrap()["pointColor"],
            "red"
        );
        assert!(appearances.get(AppearanceCategory::Tileset).is_some());
        assert_eq!(
            appearances.iter().map(|(c, _)| c).collect::<Vec<_>>(),
            vec![AppearanceCategory::Marker, AppearanceCategory::Tileset]
        );
    }

    #[test]
    fn test_group_layer() {
        let layer: Layer = serde_json::from_value(json!({
            "type": "group",
            "id": "g",
            "visible": false,
            "children": [{"type": "simple", "id": "c"}]
        }))
        .unwrap();
        assert!(!layer.visible());
        assert!(layer.data().is_none());
        assert!(layer.appearances().is_none());
    }

    #[test]
    fn test_from_map_filters_unknown_keys() {
        let map = json!({"marker": {"pointColor": "red"}, "label": {"x": 1}, "polygon": 3});
        let appearances = Appearances::from_map(map.as_object().unwrap());
        assert_eq!(
            appearances.iter().map(|(c, _)| c).collect::<Vec<_>>(),
            vec![AppearanceCategory::Marker]
        );
    }
}
