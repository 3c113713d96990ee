use crate::atomize::{AtomizeMode, atomize_single};
use crate::error::Error;
use crate::node::XdmNode;
use crate::types::{AtomicValue, XdmItem, XdmMap, XdmValue};

fn map_arg<'s, 'a, N: XdmNode<'a>>(
    function: &str,
    value: &'s XdmValue<N>,
) -> Result<&'s XdmMap<N>, Error> {
    match value.single() {
        Some(XdmItem::Map(map)) => Ok(map),
        _ => Err(Error::function(function, "expected a single map")),
    }
}

fn key_arg<'a, N: XdmNode<'a> + 'a>(value: &XdmValue<N>) -> Result<AtomicValue, Error> {
    atomize_single(value, AtomizeMode::Lenient)
}

pub fn map_size<'a, N: XdmNode<'a> + 'a>(args: Vec<XdmValue<N>>) -> Result<XdmValue<N>, Error> {
    let [map] = args.as_slice() else {
        return Err(Error::function("map:size", "expected 1 argument"));
    };
    Ok(XdmValue::from_integer(map_arg("map:size", map)?.size() as i64))
}

pub fn map_keys<'a, N: XdmNode<'a> + 'a>(args: Vec<XdmValue<N>>) -> Result<XdmValue<N>, Error> {
    let [map] = args.as_slice() else {
        return Err(Error::function("map:keys", "expected 1 argument"));
    };
    let map = map_arg("map:keys", map)?;
    Ok(XdmValue::from_items(
        map.keys().cloned().map(XdmItem::Atomic).collect(),
    ))
}

pub fn map_contains<'a, N: XdmNode<'a> + 'a>(
    args: Vec<XdmValue<N>>,
) -> Result<XdmValue<N>, Error> {
    let [map, key] = args.as_slice() else {
        return Err(Error::function("map:contains", "expected 2 arguments"));
    };
    let map = map_arg("map:contains", map)?;
    Ok(XdmValue::from_bool(map.contains_key(&key_arg(key)?)))
}

/// A missing key is the empty sequence, not an error.
pub fn map_get<'a, N: XdmNode<'a> + 'a>(args: Vec<XdmValue<N>>) -> Result<XdmValue<N>, Error> {
    let [map, key] = args.as_slice() else {
        return Err(Error::function("map:get", "expected 2 arguments"));
    };
    let map = map_arg("map:get", map)?;
    Ok(map
        .get(&key_arg(key)?)
        .cloned()
        .unwrap_or_else(XdmValue::empty))
}

pub fn map_put<'a, N: XdmNode<'a> + 'a>(args: Vec<XdmValue<N>>) -> Result<XdmValue<N>, Error> {
    let [map, key, value] = args.as_slice() else {
        return Err(Error::function("map:put", "expected 3 arguments"));
    };
    let map = map_arg("map:put", map)?;
    Ok(XdmValue::from_map(map.put(key_arg(key)?, value.clone())))
}

pub fn map_remove<'a, N: XdmNode<'a> + 'a>(args: Vec<XdmValue<N>>) -> Result<XdmValue<N>, Error> {
    let [map, keys] = args.as_slice() else {
        return Err(Error::function("map:remove", "expected 2 arguments"));
    };
    let mut result = map_arg("map:remove", map)?.clone();
    for key in keys.items() {
        let XdmItem::Atomic(key) = key else {
            return Err(Error::function("map:remove", "keys must be atomic"));
        };
        result = result.remove(key);
    }
    Ok(XdmValue::from_map(result))
}

pub fn map_entry<'a, N: XdmNode<'a> + 'a>(args: Vec<XdmValue<N>>) -> Result<XdmValue<N>, Error> {
    let [key, value] = args.as_slice() else {
        return Err(Error::function("map:entry", "expected 2 arguments"));
    };
    Ok(XdmValue::from_map(XdmMap::from_entries(vec![(
        key_arg(key)?,
        value.clone(),
    )])))
}

/// Duplicate policy for `map:merge`, selected through the options map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Duplicates {
    UseFirst,
    UseLast,
    Reject,
}

/// Merges a sequence of maps. The default duplicate policy is last-wins,
/// consistent with map construction; `use-first` and `reject` are
/// explicit opt-ins via `map { 'duplicates': ... }`.
pub fn map_merge<'a, N: XdmNode<'a> + 'a>(args: Vec<XdmValue<N>>) -> Result<XdmValue<N>, Error> {
    if args.is_empty() || args.len() > 2 {
        return Err(Error::function("map:merge", "expected 1 or 2 arguments"));
    }

    let duplicates = match args.get(1) {
        None => Duplicates::UseLast,
        Some(options) => {
            let options = map_arg("map:merge", options)?;
            match options.get(&AtomicValue::String("duplicates".to_string())) {
                None => Duplicates::UseLast,
                Some(policy) => match policy.to_string_value().as_str() {
                    "use-first" => Duplicates::UseFirst,
                    "use-last" => Duplicates::UseLast,
                    "reject" => Duplicates::Reject,
                    other => {
                        return Err(Error::function(
                            "map:merge",
                            format!("unknown duplicates policy '{}'", other),
                        ));
                    }
                },
            }
        }
    };

    let mut merged: XdmMap<N> = XdmMap::new();
    for item in args[0].items() {
        let XdmItem::Map(map) = item else {
            return Err(Error::function("map:merge", "expected a sequence of maps"));
        };
        for (key, value) in map.entries() {
            match duplicates {
                Duplicates::UseLast => {
                    merged = merged.put(key.clone(), value.clone());
                }
                Duplicates::UseFirst => {
                    if !merged.contains_key(key) {
                        merged = merged.put(key.clone(), value.clone());
                    }
                }
                Duplicates::Reject => {
                    if merged.contains_key(key) {
                        return Err(Error::dynamic(format!(
                            "map:merge: duplicate key '{}'",
                            key
                        )));
                    }
                    merged = merged.put(key.clone(), value.clone());
                }
            }
        }
    }
    Ok(XdmValue::from_map(merged))
}

#[cfg(test)]
mod tests {
    use super::*;

    type Value = XdmValue<crate::node::tests::MockNode<'static>>;
    type Map = XdmMap<crate::node::tests::MockNode<'static>>;

    fn entry(key: &str, value: i64) -> (AtomicValue, Value) {
        (AtomicValue::String(key.to_string()), Value::from_integer(value))
    }

    fn map_value(entries: Vec<(AtomicValue, Value)>) -> Value {
        Value::from_map(Map::from_entries(entries))
    }

    #[test]
    fn test_size_keys_contains() {
        let m = map_value(vec![entry("a", 1), entry("b", 2)]);
        assert_eq!(map_size(vec![m.clone()]).unwrap(), Value::from_integer(2));
        assert_eq!(map_keys(vec![m.clone()]).unwrap().len(), 2);
        assert!(
            map_contains(vec![m.clone(), Value::from_string("a")])
                .unwrap()
                .effective_boolean_value()
        );
        assert!(
            !map_contains(vec![m, Value::from_string("z")])
                .unwrap()
                .effective_boolean_value()
        );
    }

    #[test]
    fn test_get_missing_is_empty() {
        let m = map_value(vec![entry("a", 1)]);
        assert!(map_get(vec![m, Value::from_string("z")]).unwrap().is_empty());
    }

    #[test]
    fn test_put_and_remove_are_persistent() {
        let m = map_value(vec![entry("a", 1)]);
        let updated = map_put(vec![
            m.clone(),
            Value::from_string("b"),
            Value::from_integer(2),
        ])
        .unwrap();
        assert_eq!(map_size(vec![updated]).unwrap(), Value::from_integer(2));
        // The original is untouched.
        assert_eq!(map_size(vec![m.clone()]).unwrap(), Value::from_integer(1));

        let removed = map_remove(vec![m, Value::from_string("a")]).unwrap();
        assert_eq!(map_size(vec![removed]).unwrap(), Value::from_integer(0));
    }

    #[test]
    fn test_merge_default_is_last_wins() {
        let seq = Value::from_items(vec![
            XdmItem::Map(Map::from_entries(vec![entry("k", 1)])),
            XdmItem::Map(Map::from_entries(vec![entry("k", 2)])),
        ]);
        let merged = map_merge(vec![seq]).unwrap();
        assert_eq!(
            map_get(vec![merged, Value::from_string("k")]).unwrap(),
            Value::from_integer(2)
        );
    }

    #[test]
    fn test_merge_option_policies() {
        let seq = || {
            Value::from_items(vec![
                XdmItem::Map(Map::from_entries(vec![entry("k", 1)])),
                XdmItem::Map(Map::from_entries(vec![entry("k", 2)])),
            ])
        };
        let options = |policy: &str| {
            map_value(vec![(
                AtomicValue::String("duplicates".to_string()),
                Value::from_string(policy),
            )])
        };

        let merged = map_merge(vec![seq(), options("use-first")]).unwrap();
        assert_eq!(
            map_get(vec![merged, Value::from_string("k")]).unwrap(),
            Value::from_integer(1)
        );

        assert!(map_merge(vec![seq(), options("reject")]).is_err());
        assert!(map_merge(vec![seq(), options("bogus")]).is_err());
    }
}
