use serde_json::{Map, Value};

/// Read access to the feature an expression is evaluated against.
///
/// Bare identifiers and `${name}` read from [`property`](Self::property),
/// `id` reads [`id`](Self::id), and `${$.path}` queries run over
/// [`document`](Self::document).
pub trait FeatureContext {
    fn id(&self) -> Option<&str>;

    fn properties(&self) -> Option<&Map<String, Value>>;

    fn property(&self, name: &str) -> Option<&Value> {
        self.properties().and_then(|props| props.get(name))
    }

    /// The whole feature as a JSON document.
    fn document(&self) -> Value;
}

/// A GeoJSON-shaped feature: `{ "id": ..., "properties": { ... } }`.
impl FeatureContext for Value {
    fn id(&self) -> Option<&str> {
        self.get("id").and_then(Value::as_str)
    }

    fn properties(&self) -> Option<&Map<String, Value>> {
        self.get("properties").and_then(Value::as_object)
    }

    fn document(&self) -> Value {
        self.clone()
    }
}
