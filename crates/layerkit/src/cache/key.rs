use crate::model::Data;

/// Outer cache key of a data source.
///
/// Content-addressed sources are keyed `"<type>:<url>"` and shared by every
/// layer that points at them. Inline or URL-less data is scoped to its layer
/// as `"layer:<layerId>"`.
pub fn source_key(data: &Data, layer_id: &str) -> String {
    match &data.url {
        Some(url) if data.is_content_addressed() => format!("{}:{}", data.data_type, url),
        _ => format!("layer:{layer_id}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DataType;
    use serde_json::json;

    #[test]
    fn test_url_sources_are_shared() {
        let data = Data::from_url(DataType::GeoJson, "https://e/x.geojson");
        assert_eq!(source_key(&data, "a"), "geojson:https://e/x.geojson");
        assert_eq!(source_key(&data, "b"), source_key(&data, "a"));
    }

    #[test]
    fn test_inline_sources_are_layer_scoped() {
        let data = Data::inline(DataType::GeoJson, json!({"type": "FeatureCollection"}));
        assert_eq!(source_key(&data, "a"), "layer:a");
        let mut both = Data::from_url(DataType::Csv, "https://e/x.csv");
        both.value = Some(json!("id\n1"));
        assert_eq!(source_key(&both, "b"), "layer:b");
    }
}
