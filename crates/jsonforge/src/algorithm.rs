//! Whole-tree transforms and visitors.
use crate::{
    path::{Path, PathElement},
    value::Value,
};

/// Rebuilds `tree`, replacing every scalar leaf with `f(leaf)`. Arrays and
/// objects keep their shape; the input is left untouched.
///
/// ```
/// use jsonforge::{Value, map};
///
/// let v: Value = "[1, {\"a\": 2}]".parse().unwrap();
/// let doubled = map(|x| Value::from(x.as_integer().unwrap() * 2), &v);
/// assert_eq!(doubled.to_string(), r#"[2,{"a":4}]"#);
/// ```
pub fn map<F>(mut f: F, tree: &Value) -> Value
where
    F: FnMut(&Value) -> Value,
{
    fn go<F: FnMut(&Value) -> Value>(f: &mut F, tree: &Value) -> Value {
        match tree {
            Value::Array(items) => Value::Array(items.iter().map(|v| go(f, v)).collect()),
            Value::Object(entries) => Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), go(f, v)))
                    .collect(),
            ),
            leaf => f(leaf),
        }
    }
    go(&mut f, tree)
}

/// Like [`map`], but consumes the tree so leaves are moved into `f`.
pub fn map_into<F>(mut f: F, tree: Value) -> Value
where
    F: FnMut(Value) -> Value,
{
    fn go<F: FnMut(Value) -> Value>(f: &mut F, tree: Value) -> Value {
        match tree {
            Value::Array(items) => Value::Array(items.into_iter().map(|v| go(f, v)).collect()),
            Value::Object(entries) => {
                Value::Object(entries.into_iter().map(|(k, v)| (k, go(f, v))).collect())
            }
            leaf => f(leaf),
        }
    }
    go(&mut f, tree)
}

/// Visits every node of `tree` in pre-order together with its path from the
/// root.
///
/// With `leaves_only`, containers are skipped unless they are empty.
pub fn traverse<F>(tree: &Value, f: F, leaves_only: bool)
where
    F: FnMut(&Path, &Value),
{
    traverse_from(&Path::root(), tree, f, leaves_only);
}

/// [`traverse`] with every reported path prefixed by `base`.
pub fn traverse_from<F>(base: &Path, tree: &Value, mut f: F, leaves_only: bool)
where
    F: FnMut(&Path, &Value),
{
    fn go<F: FnMut(&Path, &Value)>(path: &mut Path, tree: &Value, f: &mut F, leaves_only: bool) {
        let is_container_with_children = match tree {
            Value::Array(items) => !items.is_empty(),
            Value::Object(entries) => !entries.is_empty(),
            _ => false,
        };
        if !leaves_only || !is_container_with_children {
            f(path, tree);
        }
        match tree {
            Value::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    path.push(PathElement::Index(i));
                    go(path, item, f, leaves_only);
                    path.pop();
                }
            }
            Value::Object(entries) => {
                for (k, v) in entries {
                    path.push(PathElement::Key(k.clone()));
                    go(path, v, f, leaves_only);
                    path.pop();
                }
            }
            _ => {}
        }
    }
    let mut path = base.clone();
    go(&mut path, tree, &mut f, leaves_only);
}
