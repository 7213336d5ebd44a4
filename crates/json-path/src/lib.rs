//! layerkit-json-path - the JSONPath subset behind `${$.path}` references.
//!
//! Style expressions may reach into the whole feature document, not only
//! its properties, with placeholders such as `${$.geometry.coordinates[2]}`.
//! Supported: the root `$`, dot and bracket member names, array indices
//! (negative ones count from the end), wildcards, unions like `[0, 2]` and
//! recursive descent `..name`. Filters and slices are rejected.
//!
//! ```
//! use serde_json::json;
//!
//! let doc = json!({
//!     "id": "b1",
//!     "properties": {"floors": [{"height": 3.5}, {"height": 3.0}]}
//! });
//! let path = layerkit_json_path::parse("$.properties.floors[0].height").unwrap();
//! assert_eq!(path.select(&doc), vec![&json!(3.5)]);
//! ```

mod parser;
mod path;

pub use parser::{parse, ParseError};
pub use path::{Path, Selector, Step};

/// Parses `path` and selects from `doc` in one go.
pub fn query<'a>(
    path: &str,
    doc: &'a serde_json::Value,
) -> Result<Vec<&'a serde_json::Value>, ParseError> {
    Ok(parse(path)?.select(doc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_root_only() {
        assert_eq!(parse("$"), Ok(Path::default()));
        assert_eq!(parse("  $  "), Ok(Path::default()));
    }

    #[test]
    fn test_steps() {
        let path = parse("$.properties['the name'][0, -1]..h").unwrap();
        assert_eq!(
            path.steps,
            vec![
                Step::Child(vec![Selector::Name("properties".into())]),
                Step::Child(vec![Selector::Name("the name".into())]),
                Step::Child(vec![Selector::Index(0), Selector::Index(-1)]),
                Step::Descendant(vec![Selector::Name("h".into())]),
            ]
        );
    }

    #[test]
    fn test_wildcard_may_match_once() {
        let doc = json!({"a": {"only": 1}, "b": [1, 2]});
        assert_eq!(query("$.a.*", &doc).unwrap(), vec![&json!(1)]);
        assert_eq!(query("$.b[*]", &doc).unwrap().len(), 2);
    }

    #[test]
    fn test_errors() {
        assert_eq!(parse(""), Err(ParseError::MissingRoot));
        assert_eq!(parse("a.b"), Err(ParseError::MissingRoot));
        assert_eq!(parse("$."), Err(ParseError::UnexpectedEnd));
        assert_eq!(parse("$["), Err(ParseError::UnexpectedEnd));
        assert_eq!(parse("$['a"), Err(ParseError::UnterminatedString(2)));
        assert_eq!(
            parse("$.a b"),
            Err(ParseError::Unexpected { found: 'b', pos: 4 })
        );
        assert_eq!(
            parse("$[?(@.a)]"),
            Err(ParseError::Unexpected { found: '?', pos: 2 })
        );
        assert_eq!(parse("$['\\q']"), Err(ParseError::BadEscape('q')));
    }

    #[test]
    fn test_indices() {
        let doc = json!({"list": [1, 2, 3]});
        assert_eq!(query("$.list[-1]", &doc).unwrap(), vec![&json!(3)]);
        assert!(query("$.list[-4]", &doc).unwrap().is_empty());
        assert!(query("$.list[3]", &doc).unwrap().is_empty());
    }

    #[test]
    fn test_missing_members() {
        let doc = json!({"a": 1});
        assert!(query("$.b", &doc).unwrap().is_empty());
        assert!(query("$.a.b", &doc).unwrap().is_empty());
        assert!(query("$.a[0]", &doc).unwrap().is_empty());
    }
}
