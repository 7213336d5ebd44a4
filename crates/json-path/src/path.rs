use serde_json::Value;

/// One way of picking children out of a node.
#[derive(Debug, Clone, PartialEq)]
pub enum Selector {
    /// `.name` or `['name']`
    Name(String),
    /// `[3]`; negative indices count from the end.
    Index(i64),
    /// `.*` or `[*]`
    Wildcard,
}

/// A step of a path. A bracketed union such as `[0, 2]` is one step with
/// two selectors.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Child(Vec<Selector>),
    /// `..`: apply the selectors at every depth below the current node.
    Descendant(Vec<Selector>),
}

/// A parsed path, rooted at `$`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Path {
    pub steps: Vec<Step>,
}

impl Path {
    /// Matching nodes of `doc`, in document order.
    pub fn select<'a>(&self, doc: &'a Value) -> Vec<&'a Value> {
        self.steps.iter().fold(vec![doc], |nodes, step| {
            let mut out = Vec::new();
            for node in nodes {
                match step {
                    Step::Child(selectors) => apply(node, selectors, &mut out),
                    Step::Descendant(selectors) => descend(node, selectors, &mut out),
                }
            }
            out
        })
    }
}

fn descend<'a>(node: &'a Value, selectors: &[Selector], out: &mut Vec<&'a Value>) {
    apply(node, selectors, out);
    for child in children(node) {
        descend(child, selectors, out);
    }
}

fn apply<'a>(node: &'a Value, selectors: &[Selector], out: &mut Vec<&'a Value>) {
    for selector in selectors {
        match (selector, node) {
            (Selector::Name(name), Value::Object(map)) => out.extend(map.get(name)),
            (Selector::Index(i), Value::Array(items)) => {
                let len = items.len() as i64;
                let at = if *i < 0 { len + i } else { *i };
                if (0..len).contains(&at) {
                    out.push(&items[at as usize]);
                }
            }
            (Selector::Wildcard, _) => out.extend(children(node)),
            _ => {}
        }
    }
}

fn children(node: &Value) -> Box<dyn Iterator<Item = &Value> + '_> {
    match node {
        Value::Object(map) => Box::new(map.values()),
        Value::Array(items) => Box::new(items.iter()),
        _ => Box::new(std::iter::empty()),
    }
}
