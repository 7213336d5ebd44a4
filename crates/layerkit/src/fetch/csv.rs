//! CSV fetcher. Each row becomes a point feature when its latitude and
//! longitude columns parse as numbers.

use super::{load_source, HttpClient, Source};
use crate::error::FetchError;
use crate::fetch::DataFetcher;
use crate::model::{ColumnRef, CsvOptions, Data, Feature, Geometry, Range};
use futures::future::BoxFuture;
use layerkit_util::random_id;
use serde_json::{Map, Number, Value};
use std::sync::Arc;

const LAT_COLUMNS: &[&str] = &["lat", "latitude"];
const LNG_COLUMNS: &[&str] = &["lng", "lon", "longitude"];
const HEIGHT_COLUMNS: &[&str] = &["height", "alt", "altitude"];

pub struct CsvFetcher {
    http: Arc<dyn HttpClient>,
}

impl CsvFetcher {
    pub fn new(http: Arc<dyn HttpClient>) -> Self {
        Self { http }
    }
}

impl DataFetcher for CsvFetcher {
    fn fetch<'a>(
        &'a self,
        data: &'a Data,
        range: Option<&'a Range>,
    ) -> BoxFuture<'a, Result<Vec<Feature>, FetchError>> {
        Box::pin(async move {
            let text = match load_source(self.http.as_ref(), data).await? {
                Source::Inline(Value::String(text)) => text,
                Source::Inline(other) => {
                    return Err(FetchError::parse(
                        "CSV",
                        format!("inline value must be a string, got {other}"),
                    ))
                }
                Source::Body(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            };
            let options = data.csv.clone().unwrap_or_default();
            features_from_csv(&text, &options, range)
        })
    }
}

/// Resolved column positions for one document.
struct Columns {
    id: Option<usize>,
    lat: Option<usize>,
    lng: Option<usize>,
    height: Option<usize>,
}

impl Columns {
    fn resolve(names: &[String], options: &CsvOptions) -> Self {
        let find = |configured: &Option<ColumnRef>, defaults: &[&str]| match configured {
            Some(ColumnRef::Index(i)) => Some(*i),
            Some(ColumnRef::Name(name)) => names.iter().position(|n| n == name),
            None => names
                .iter()
                .position(|n| defaults.iter().any(|d| n.eq_ignore_ascii_case(d))),
        };
        Self {
            id: find(&options.id_column, &["id"]),
            lat: find(&options.lat_column, LAT_COLUMNS),
            lng: find(&options.lng_column, LNG_COLUMNS),
            height: find(&options.height_column, HEIGHT_COLUMNS),
        }
    }
}

/// Parses CSV text into features tagged with `range`.
pub fn features_from_csv(
    text: &str,
    options: &CsvOptions,
    range: Option<&Range>,
) -> Result<Vec<Feature>, FetchError> {
    let mut reader = ::csv::ReaderBuilder::new()
        .has_headers(!options.no_header)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut names: Vec<String> = if options.no_header {
        Vec::new()
    } else {
        reader
            .headers()
            .map_err(|e| FetchError::parse("CSV", e))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect()
    };

    let mut features = Vec::new();
    let mut columns = None;
    for record in reader.records() {
        let record = record.map_err(|e| FetchError::parse("CSV", e))?;
        while names.len() < record.len() {
            names.push(names.len().to_string());
        }
        let cols = columns.get_or_insert_with(|| Columns::resolve(&names, options));

        let mut properties = Map::new();
        for (name, cell) in names.iter().zip(record.iter()) {
            let value = if options.disable_type_conversion {
                Value::String(cell.to_string())
            } else {
                convert_cell(cell)
            };
            properties.insert(name.clone(), value);
        }

        let cell = |idx: Option<usize>| idx.and_then(|i| record.get(i)).map(str::trim);
        let id = match cell(cols.id) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => random_id(),
        };
        let coord = |idx| cell(idx).and_then(|c| c.parse::<f64>().ok());
        let geometry = match (coord(cols.lng), coord(cols.lat)) {
            (Some(lng), Some(lat)) => {
                let mut position = vec![lng, lat];
                position.extend(coord(cols.height));
                Some(Geometry::Point(position))
            }
            _ => None,
        };

        features.push(Feature {
            id,
            geometry,
            properties,
            range: range.copied(),
        });
    }
    Ok(features)
}

/// Booleans and numbers become JSON values; everything else stays a string.
fn convert_cell(cell: &str) -> Value {
    let trimmed = cell.trim();
    match trimmed {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }
    if let Ok(i) = trimmed.parse::<i64>() {
        return Value::Number(i.into());
    }
    if let Some(n) = trimmed.parse::<f64>().ok().and_then(Number::from_f64) {
        return Value::Number(n);
    }
    Value::String(cell.to_string())
}
