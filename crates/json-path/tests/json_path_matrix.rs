use layerkit_json_path::{parse, query};
use serde_json::{json, Value};

fn select(path: &str, doc: &Value) -> Vec<Value> {
    let parsed = parse(path).unwrap_or_else(|e| panic!("{path}: {e}"));
    parsed.select(doc).into_iter().cloned().collect()
}

fn building() -> Value {
    json!({
        "type": "Feature",
        "id": "building-1",
        "geometry": {"type": "Point", "coordinates": [139.7, 35.6, 10.0]},
        "properties": {
            "name": "Tower",
            "floors": [{"height": 4.0, "use": "shop"}, {"height": 3.0, "use": "office"}],
            "address": {"city": "Tokyo", "ward": "Minato"}
        }
    })
}

#[test]
fn root_selects_the_document() {
    let doc = building();
    assert_eq!(select("$", &doc), vec![doc.clone()]);
}

#[test]
fn dot_and_bracket_names_agree() {
    let doc = building();
    assert_eq!(select("$.properties.address.city", &doc), vec![json!("Tokyo")]);
    assert_eq!(
        select("$['properties'][\"address\"]['city']", &doc),
        vec![json!("Tokyo")]
    );
}

#[test]
fn coordinates_by_index() {
    let doc = building();
    assert_eq!(select("$.geometry.coordinates[2]", &doc), vec![json!(10.0)]);
    assert_eq!(select("$.geometry.coordinates[-3]", &doc), vec![json!(139.7)]);
}

#[test]
fn unions_keep_selector_order_and_duplicates() {
    let doc = json!(["a", "b", "c", "d"]);
    assert_eq!(select("$[3, 0]", &doc), vec![json!("d"), json!("a")]);
    assert_eq!(select("$[0,0]", &doc), vec![json!("a"), json!("a")]);
}

#[test]
fn descendants_at_every_depth() {
    let doc = building();
    assert_eq!(select("$..height", &doc), vec![json!(4.0), json!(3.0)]);
    assert_eq!(
        select("$.properties..['use']", &doc),
        vec![json!("shop"), json!("office")]
    );
}

#[test]
fn wildcards() {
    assert_eq!(
        select("$.properties.floors[*].use", &building()),
        vec![json!("shop"), json!("office")]
    );
    assert!(select("$[*]", &json!([])).is_empty());
    assert!(select("$.*", &json!("scalar")).is_empty());
}

#[test]
fn null_is_a_match() {
    assert_eq!(select("$.a", &json!({"a": null})), vec![Value::Null]);
}

#[test]
fn query_reports_parse_errors() {
    assert!(query("properties.name", &building()).is_err());
}
