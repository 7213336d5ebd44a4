use serde::{Deserialize, Serialize};
use std::fmt;

/// Data source format tag. Unknown tags are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DataType {
    GeoJson,
    Csv,
    Czml,
    Kml,
    Shapefile,
    Gpx,
    Gtfs,
    GeoRss,
    Gml,
    Wms,
    Mvt,
    Tiles3d,
    OsmBuildings,
    /// Resolved from the URL's file extension at fetch time.
    Auto,
    Other(String),
}

impl DataType {
    pub fn as_str(&self) -> &str {
        match self {
            DataType::GeoJson => "geojson",
            DataType::Csv => "csv",
            DataType::Czml => "czml",
            DataType::Kml => "kml",
            DataType::Shapefile => "shapefile",
            DataType::Gpx => "gpx",
            DataType::Gtfs => "gtfs",
            DataType::GeoRss => "georss",
            DataType::Gml => "gml",
            DataType::Wms => "wms",
            DataType::Mvt => "mvt",
            DataType::Tiles3d => "3dtiles",
            DataType::OsmBuildings => "osm-buildings",
            DataType::Auto => "auto",
            DataType::Other(tag) => tag,
        }
    }

    /// Infers a type from a URL's file extension, ignoring any query string
    /// or fragment.
    pub fn from_url(url: &str) -> Option<DataType> {
        let path = url.split(['?', '#']).next().unwrap_or(url);
        let file = path.rsplit('/').next().unwrap_or(path);
        let (_, ext) = file.rsplit_once('.')?;
        Some(match ext.to_ascii_lowercase().as_str() {
            "geojson" | "json" => DataType::GeoJson,
            "csv" => DataType::Csv,
            "czml" => DataType::Czml,
            "kml" | "kmz" => DataType::Kml,
            "shp" | "zip" => DataType::Shapefile,
            "gpx" => DataType::Gpx,
            "gml" => DataType::Gml,
            "rss" | "georss" => DataType::GeoRss,
            "mvt" | "pbf" => DataType::Mvt,
            _ => return None,
        })
    }
}

impl From<&str> for DataType {
    fn from(tag: &str) -> Self {
        match tag {
            "geojson" => DataType::GeoJson,
            "csv" => DataType::Csv,
            "czml" => DataType::Czml,
            "kml" => DataType::Kml,
            "shapefile" => DataType::Shapefile,
            "gpx" => DataType::Gpx,
            "gtfs" => DataType::Gtfs,
            "georss" => DataType::GeoRss,
            "gml" => DataType::Gml,
            "wms" => DataType::Wms,
            "mvt" => DataType::Mvt,
            "3dtiles" => DataType::Tiles3d,
            "osm-buildings" => DataType::OsmBuildings,
            "auto" => DataType::Auto,
            other => DataType::Other(other.to_string()),
        }
    }
}

impl From<String> for DataType {
    fn from(tag: String) -> Self {
        DataType::from(tag.as_str())
    }
}

impl From<DataType> for String {
    fn from(t: DataType) -> Self {
        t.as_str().to_string()
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A CSV column, by header name or by zero-based index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnRef {
    Index(usize),
    Name(String),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CsvOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_column: Option<ColumnRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lat_column: Option<ColumnRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lng_column: Option<ColumnRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height_column: Option<ColumnRef>,
    /// The first row is data; columns are addressed by index.
    pub no_header: bool,
    /// Keep every cell as a string.
    pub disable_type_conversion: bool,
}

/// A data source: where features come from and in which format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Data {
    #[serde(rename = "type")]
    pub data_type: DataType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub csv: Option<CsvOptions>,
}

impl Data {
    pub fn from_url(data_type: DataType, url: impl Into<String>) -> Self {
        Self {
            data_type,
            url: Some(url.into()),
            value: None,
            csv: None,
        }
    }

    pub fn inline(data_type: DataType, value: serde_json::Value) -> Self {
        Self {
            data_type,
            url: None,
            value: Some(value),
            csv: None,
        }
    }

    /// A URL with no inline value identifies the content, so fetched
    /// features can be shared between layers.
    pub fn is_content_addressed(&self) -> bool {
        self.url.is_some() && self.value.is_none()
    }

    pub fn has_source(&self) -> bool {
        self.url.is_some() || self.value.is_some()
    }
}
