//! Depth-first key search over a JSON document.

use serde_json::{map, Value};

/// Lazily yield every value stored under `key`, anywhere in `root`.
///
/// Traversal is pre-order and follows document order: object entries in
/// insertion order, arrays by index. Matched values are searched too, so a key
/// nested inside another match is also yielded (after its parent). A scalar
/// root yields nothing.
///
/// ```
/// use reportflow_common::search_key;
/// use serde_json::json;
///
/// let doc = json!({"a": {"reportToken": "x1", "b": [{"reportToken": "x2"}]}});
/// let found: Vec<_> = search_key(&doc, "reportToken").collect();
/// assert_eq!(found, vec![&json!("x1"), &json!("x2")]);
/// ```
pub fn search_key<'a>(root: &'a Value, key: &'a str) -> KeySearch<'a> {
    let mut stack = Vec::new();
    if let Some(frame) = Frame::of(root) {
        stack.push(frame);
    }
    KeySearch { key, stack }
}

/// Iterator returned by [`search_key`].
#[derive(Debug)]
pub struct KeySearch<'a> {
    key: &'a str,
    stack: Vec<Frame<'a>>,
}

#[derive(Debug)]
enum Frame<'a> {
    Map(map::Iter<'a>),
    Seq(std::slice::Iter<'a, Value>),
}

impl<'a> Frame<'a> {
    fn of(value: &'a Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self::Map(map.iter())),
            Value::Array(items) => Some(Self::Seq(items.iter())),
            _ => None,
        }
    }
}

impl<'a> Iterator for KeySearch<'a> {
    type Item = &'a Value;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let frame = self.stack.last_mut()?;
            match frame {
                Frame::Map(entries) => match entries.next() {
                    Some((name, value)) => {
                        if let Some(child) = Frame::of(value) {
                            self.stack.push(child);
                        }
                        if name == self.key {
                            return Some(value);
                        }
                    }
                    None => {
                        self.stack.pop();
                    }
                },
                Frame::Seq(items) => match items.next() {
                    Some(value) => {
                        if let Some(child) = Frame::of(value) {
                            self.stack.push(child);
                        }
                    }
                    None => {
                        self.stack.pop();
                    }
                },
            }
        }
    }
}
