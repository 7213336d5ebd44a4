//! GeoJSON fetcher.
//!
//! Accepts a `FeatureCollection`, a single `Feature`, a bare geometry, or an
//! array of any of those. `Multi*` geometries and geometry collections are
//! split into one feature per part, with ids suffixed `_<n>`.

use super::{load_source, HttpClient, Source};
use crate::error::FetchError;
use crate::fetch::DataFetcher;
use crate::model::{Data, Feature, Geometry, Range};
use futures::future::BoxFuture;
use layerkit_util::random_id;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::warn;

pub struct GeoJsonFetcher {
    http: Arc<dyn HttpClient>,
}

impl GeoJsonFetcher {
    pub fn new(http: Arc<dyn HttpClient>) -> Self {
        Self { http }
    }
}

impl DataFetcher for GeoJsonFetcher {
    fn fetch<'a>(
        &'a self,
        data: &'a Data,
        range: Option<&'a Range>,
    ) -> BoxFuture<'a, Result<Vec<Feature>, FetchError>> {
        Box::pin(async move {
            let doc = match load_source(self.http.as_ref(), data).await? {
                Source::Inline(value) => value,
                Source::Body(bytes) => serde_json::from_slice(&bytes)
                    .map_err(|e| FetchError::parse("GeoJSON", e))?,
            };
            Ok(features_from_geojson(&doc, range))
        })
    }
}

/// Converts a GeoJSON document into features tagged with `range`.
pub fn features_from_geojson(doc: &Value, range: Option<&Range>) -> Vec<Feature> {
    let mut out = Vec::new();
    collect(doc, &mut out);
    if let Some(range) = range {
        for feature in &mut out {
            feature.range = Some(*range);
        }
    }
    out
}

fn collect(doc: &Value, out: &mut Vec<Feature>) {
    match doc {
        Value::Array(items) => items.iter().for_each(|item| collect(item, out)),
        Value::Object(obj) => match obj.get("type").and_then(Value::as_str) {
            Some("FeatureCollection") => {
                if let Some(features) = obj.get("features").and_then(Value::as_array) {
                    features.iter().for_each(|f| collect(f, out));
                }
            }
            Some("Feature") => push_feature(obj, out),
            Some(_) if obj.contains_key("coordinates") || obj.contains_key("geometries") => {
                push_parts(random_id(), Map::new(), geometry_parts(doc), out)
            }
            other => warn!(kind = ?other, "skipping unrecognized GeoJSON object"),
        },
        other => warn!(value = %other, "skipping non-object GeoJSON value"),
    }
}

fn push_feature(obj: &Map<String, Value>, out: &mut Vec<Feature>) {
    let id = match obj.get("id") {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => random_id(),
    };
    let properties = obj
        .get("properties")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    let parts = obj.get("geometry").map(geometry_parts).unwrap_or_default();
    push_parts(id, properties, parts, out);
}

fn push_parts(
    id: String,
    properties: Map<String, Value>,
    parts: Vec<Geometry>,
    out: &mut Vec<Feature>,
) {
    match parts.len() {
        0 => out.push(Feature {
            id,
            geometry: None,
            properties,
            range: None,
        }),
        1 => out.push(Feature {
            id,
            geometry: parts.into_iter().next(),
            properties,
            range: None,
        }),
        _ => {
            for (n, geometry) in parts.into_iter().enumerate() {
                out.push(Feature {
                    id: format!("{id}_{n}"),
                    geometry: Some(geometry),
                    properties: properties.clone(),
                    range: None,
                });
            }
        }
    }
}

fn coordinates<T: DeserializeOwned>(geometry: &Value) -> Option<T> {
    geometry
        .get("coordinates")
        .and_then(|c| serde_json::from_value(c.clone()).ok())
}

/// Single-part geometries of a GeoJSON geometry object. Anything that cannot
/// be read yields no parts.
fn geometry_parts(geometry: &Value) -> Vec<Geometry> {
    let kind = geometry.get("type").and_then(Value::as_str);
    let parts = match kind {
        Some("Point") => coordinates(geometry).map(|c| vec![Geometry::Point(c)]),
        Some("LineString") => coordinates(geometry).map(|c| vec![Geometry::LineString(c)]),
        Some("Polygon") => coordinates(geometry).map(|c| vec![Geometry::Polygon(c)]),
        Some("MultiPoint") => coordinates::<Vec<Vec<f64>>>(geometry)
            .map(|c| c.into_iter().map(Geometry::Point).collect()),
        Some("MultiLineString") => coordinates::<Vec<Vec<Vec<f64>>>>(geometry)
            .map(|c| c.into_iter().map(Geometry::LineString).collect()),
        Some("MultiPolygon") => coordinates::<Vec<Vec<Vec<Vec<f64>>>>>(geometry)
            .map(|c| c.into_iter().map(Geometry::Polygon).collect()),
        Some("GeometryCollection") => geometry
            .get("geometries")
            .and_then(Value::as_array)
            .map(|gs| gs.iter().flat_map(geometry_parts).collect()),
        _ => None,
    };
    parts.unwrap_or_default()
}
