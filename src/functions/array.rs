use crate::atomize::{AtomizeMode, atomize_single};
use crate::error::Error;
use crate::node::XdmNode;
use crate::types::{XdmArray, XdmItem, XdmValue};

fn array_arg<'s, 'a, N: XdmNode<'a>>(
    function: &str,
    value: &'s XdmValue<N>,
) -> Result<&'s XdmArray<N>, Error> {
    match value.single() {
        Some(XdmItem::Array(array)) => Ok(array),
        _ => Err(Error::function(function, "expected a single array")),
    }
}

fn index_arg<'a, N: XdmNode<'a> + 'a>(value: &XdmValue<N>) -> Result<i64, Error> {
    atomize_single(value, AtomizeMode::Lenient)?
        .to_integer()
        .ok_or_else(|| Error::type_error("array index must be an integer"))
}

fn out_of_bounds(index: i64, size: usize) -> Error {
    Error::ArrayIndexOutOfBounds { index, size }
}

pub fn array_size<'a, N: XdmNode<'a> + 'a>(args: Vec<XdmValue<N>>) -> Result<XdmValue<N>, Error> {
    let [array] = args.as_slice() else {
        return Err(Error::function("array:size", "expected 1 argument"));
    };
    Ok(XdmValue::from_integer(
        array_arg("array:size", array)?.size() as i64,
    ))
}

pub fn array_get<'a, N: XdmNode<'a> + 'a>(args: Vec<XdmValue<N>>) -> Result<XdmValue<N>, Error> {
    let [array, index] = args.as_slice() else {
        return Err(Error::function("array:get", "expected 2 arguments"));
    };
    let array = array_arg("array:get", array)?;
    let index = index_arg(index)?;
    usize::try_from(index)
        .ok()
        .and_then(|i| array.get(i))
        .cloned()
        .ok_or_else(|| out_of_bounds(index, array.size()))
}

pub fn array_put<'a, N: XdmNode<'a> + 'a>(args: Vec<XdmValue<N>>) -> Result<XdmValue<N>, Error> {
    let [array, index, value] = args.as_slice() else {
        return Err(Error::function("array:put", "expected 3 arguments"));
    };
    let array = array_arg("array:put", array)?;
    let index = index_arg(index)?;
    usize::try_from(index)
        .ok()
        .and_then(|i| array.put(i, value.clone()))
        .map(XdmValue::from_array)
        .ok_or_else(|| out_of_bounds(index, array.size()))
}

pub fn array_append<'a, N: XdmNode<'a> + 'a>(
    args: Vec<XdmValue<N>>,
) -> Result<XdmValue<N>, Error> {
    let [array, value] = args.as_slice() else {
        return Err(Error::function("array:append", "expected 2 arguments"));
    };
    let array = array_arg("array:append", array)?;
    Ok(XdmValue::from_array(array.append(value.clone())))
}

pub fn array_subarray<'a, N: XdmNode<'a> + 'a>(
    args: Vec<XdmValue<N>>,
) -> Result<XdmValue<N>, Error> {
    if args.len() != 2 && args.len() != 3 {
        return Err(Error::function("array:subarray", "expected 2 or 3 arguments"));
    }
    let array = array_arg("array:subarray", &args[0])?;
    let start = index_arg(&args[1])?;
    let length = match args.get(2) {
        Some(len) => {
            let len = index_arg(len)?;
            if len < 0 {
                return Err(Error::function("array:subarray", "length must not be negative"));
            }
            len as usize
        }
        None => array.size().saturating_sub(start.max(1) as usize - 1),
    };
    usize::try_from(start)
        .ok()
        .and_then(|s| array.subarray(s, length))
        .map(XdmValue::from_array)
        .ok_or_else(|| out_of_bounds(start, array.size()))
}

pub fn array_remove<'a, N: XdmNode<'a> + 'a>(
    args: Vec<XdmValue<N>>,
) -> Result<XdmValue<N>, Error> {
    let [array, positions] = args.as_slice() else {
        return Err(Error::function("array:remove", "expected 2 arguments"));
    };
    let array = array_arg("array:remove", array)?;
    // Remove from the highest position down so earlier removals do not
    // shift later ones.
    let mut indexes = Vec::with_capacity(positions.len());
    for position in positions.items() {
        let index = XdmValue::from_item(position.clone());
        indexes.push(index_arg(&index)?);
    }
    indexes.sort_unstable();
    indexes.dedup();
    let mut result = array.clone();
    for &index in indexes.iter().rev() {
        result = usize::try_from(index)
            .ok()
            .and_then(|i| result.remove(i))
            .ok_or_else(|| out_of_bounds(index, array.size()))?;
    }
    Ok(XdmValue::from_array(result))
}

pub fn array_insert_before<'a, N: XdmNode<'a> + 'a>(
    args: Vec<XdmValue<N>>,
) -> Result<XdmValue<N>, Error> {
    let [array, index, value] = args.as_slice() else {
        return Err(Error::function("array:insert-before", "expected 3 arguments"));
    };
    let array = array_arg("array:insert-before", array)?;
    let index = index_arg(index)?;
    usize::try_from(index)
        .ok()
        .and_then(|i| array.insert_before(i, value.clone()))
        .map(XdmValue::from_array)
        .ok_or_else(|| out_of_bounds(index, array.size()))
}

pub fn array_head<'a, N: XdmNode<'a> + 'a>(args: Vec<XdmValue<N>>) -> Result<XdmValue<N>, Error> {
    let [array] = args.as_slice() else {
        return Err(Error::function("array:head", "expected 1 argument"));
    };
    let array = array_arg("array:head", array)?;
    array
        .head()
        .cloned()
        .ok_or_else(|| out_of_bounds(1, 0))
}

pub fn array_tail<'a, N: XdmNode<'a> + 'a>(args: Vec<XdmValue<N>>) -> Result<XdmValue<N>, Error> {
    let [array] = args.as_slice() else {
        return Err(Error::function("array:tail", "expected 1 argument"));
    };
    let array = array_arg("array:tail", array)?;
    array
        .tail()
        .map(XdmValue::from_array)
        .ok_or_else(|| out_of_bounds(1, 0))
}

pub fn array_reverse<'a, N: XdmNode<'a> + 'a>(
    args: Vec<XdmValue<N>>,
) -> Result<XdmValue<N>, Error> {
    let [array] = args.as_slice() else {
        return Err(Error::function("array:reverse", "expected 1 argument"));
    };
    Ok(XdmValue::from_array(
        array_arg("array:reverse", array)?.reverse(),
    ))
}

pub fn array_join<'a, N: XdmNode<'a> + 'a>(args: Vec<XdmValue<N>>) -> Result<XdmValue<N>, Error> {
    let [arrays] = args.as_slice() else {
        return Err(Error::function("array:join", "expected 1 argument"));
    };
    let mut parts = Vec::with_capacity(arrays.len());
    for item in arrays.items() {
        let XdmItem::Array(array) = item else {
            return Err(Error::function("array:join", "expected a sequence of arrays"));
        };
        parts.push(array.clone());
    }
    Ok(XdmValue::from_array(XdmArray::join(&parts)))
}

/// Flattens arrays anywhere in the argument sequence, recursively;
/// non-array items pass through.
pub fn array_flatten<'a, N: XdmNode<'a> + 'a>(
    args: Vec<XdmValue<N>>,
) -> Result<XdmValue<N>, Error> {
    let [value] = args.as_slice() else {
        return Err(Error::function("array:flatten", "expected 1 argument"));
    };
    let mut items = Vec::new();
    for item in value.items() {
        match item {
            XdmItem::Array(array) => items.extend(array.flatten()),
            other => items.push(other.clone()),
        }
    }
    Ok(XdmValue::from_items(items))
}

#[cfg(test)]
mod tests {
    use super::*;

    type Value = XdmValue<crate::node::tests::MockNode<'static>>;
    type Array = XdmArray<crate::node::tests::MockNode<'static>>;

    fn arr(values: &[i64]) -> Value {
        Value::from_array(Array::from_members(
            values.iter().map(|&i| Value::from_integer(i)).collect(),
        ))
    }

    #[test]
    fn test_get_is_one_based() {
        assert_eq!(
            array_get(vec![arr(&[10, 20]), Value::from_integer(2)]).unwrap(),
            Value::from_integer(20)
        );
        assert!(matches!(
            array_get(vec![arr(&[10, 20]), Value::from_integer(0)]),
            Err(Error::ArrayIndexOutOfBounds { index: 0, size: 2 })
        ));
        assert!(matches!(
            array_get(vec![arr(&[10, 20]), Value::from_integer(3)]),
            Err(Error::ArrayIndexOutOfBounds { index: 3, size: 2 })
        ));
    }

    #[test]
    fn test_put_append_insert() {
        let updated = array_put(vec![arr(&[1, 2]), Value::from_integer(1), Value::from_integer(9)])
            .unwrap();
        assert_eq!(
            array_get(vec![updated, Value::from_integer(1)]).unwrap(),
            Value::from_integer(9)
        );

        let appended = array_append(vec![arr(&[1]), Value::from_integer(2)]).unwrap();
        assert_eq!(array_size(vec![appended]).unwrap(), Value::from_integer(2));

        let inserted = array_insert_before(vec![
            arr(&[1, 3]),
            Value::from_integer(2),
            Value::from_integer(2),
        ])
        .unwrap();
        assert_eq!(
            array_get(vec![inserted, Value::from_integer(2)]).unwrap(),
            Value::from_integer(2)
        );
    }

    #[test]
    fn test_remove_multiple_positions() {
        let result = array_remove(vec![
            arr(&[1, 2, 3, 4]),
            Value::from_items(vec![
                crate::types::XdmItem::Atomic(crate::types::AtomicValue::Integer(1)),
                crate::types::XdmItem::Atomic(crate::types::AtomicValue::Integer(3)),
            ]),
        ])
        .unwrap();
        assert_eq!(
            array_flatten(vec![result]).unwrap(),
            Value::from_items(vec![
                crate::types::XdmItem::Atomic(crate::types::AtomicValue::Integer(2)),
                crate::types::XdmItem::Atomic(crate::types::AtomicValue::Integer(4)),
            ])
        );
    }

    #[test]
    fn test_head_and_tail_of_empty_fail() {
        let empty = Value::from_array(Array::new());
        assert!(array_head(vec![empty.clone()]).is_err());
        assert!(array_tail(vec![empty]).is_err());
        assert_eq!(
            array_head(vec![arr(&[7, 8])]).unwrap(),
            Value::from_integer(7)
        );
    }

    #[test]
    fn test_subarray() {
        let result = array_subarray(vec![
            arr(&[1, 2, 3, 4, 5]),
            Value::from_integer(2),
            Value::from_integer(3),
        ])
        .unwrap();
        assert_eq!(array_size(vec![result]).unwrap(), Value::from_integer(3));
        let result = array_subarray(vec![arr(&[1, 2, 3]), Value::from_integer(2)]).unwrap();
        assert_eq!(array_size(vec![result]).unwrap(), Value::from_integer(2));
    }

    #[test]
    fn test_join_and_flatten() {
        let joined = array_join(vec![Value::from_items(vec![
            crate::types::XdmItem::Array(Array::from_members(vec![Value::from_integer(1)])),
            crate::types::XdmItem::Array(Array::from_members(vec![Value::from_integer(2)])),
        ])])
        .unwrap();
        assert_eq!(array_size(vec![joined]).unwrap(), Value::from_integer(2));

        let nested = Value::from_array(Array::from_members(vec![
            Value::from_integer(1),
            Value::from_array(Array::from_members(vec![Value::from_integer(2)])),
        ]));
        assert_eq!(array_flatten(vec![nested]).unwrap().len(), 2);
    }
}
