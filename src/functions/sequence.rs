use crate::atomize::{AtomizeMode, atomize_value};
use crate::engine::EvaluationContext;
use crate::error::Error;
use crate::node::XdmNode;
use crate::types::{AtomicValue, XdmItem, XdmValue};

fn one_arg<N: Clone>(function: &str, mut args: Vec<XdmValue<N>>) -> Result<XdmValue<N>, Error> {
    if args.len() != 1 {
        return Err(Error::function(function, "expected 1 argument"));
    }
    Ok(args.remove(0))
}

pub fn fn_count<N: Clone>(args: Vec<XdmValue<N>>) -> Result<XdmValue<N>, Error> {
    let value = one_arg("count", args)?;
    Ok(XdmValue::from_integer(value.len() as i64))
}

pub fn fn_empty<N: Clone>(args: Vec<XdmValue<N>>) -> Result<XdmValue<N>, Error> {
    let value = one_arg("empty", args)?;
    Ok(XdmValue::from_bool(value.is_empty()))
}

pub fn fn_exists<N: Clone>(args: Vec<XdmValue<N>>) -> Result<XdmValue<N>, Error> {
    let value = one_arg("exists", args)?;
    Ok(XdmValue::from_bool(!value.is_empty()))
}

pub fn fn_head<N: Clone>(args: Vec<XdmValue<N>>) -> Result<XdmValue<N>, Error> {
    let value = one_arg("head", args)?;
    Ok(match value.first() {
        Some(item) => XdmValue::from_item(item.clone()),
        None => XdmValue::empty(),
    })
}

pub fn fn_tail<N: Clone>(args: Vec<XdmValue<N>>) -> Result<XdmValue<N>, Error> {
    let value = one_arg("tail", args)?;
    let mut items = value.into_items();
    if items.is_empty() {
        return Ok(XdmValue::empty());
    }
    items.remove(0);
    Ok(XdmValue::from_items(items))
}

pub fn fn_reverse<N: Clone>(args: Vec<XdmValue<N>>) -> Result<XdmValue<N>, Error> {
    let value = one_arg("reverse", args)?;
    let mut items = value.into_items();
    items.reverse();
    Ok(XdmValue::from_items(items))
}

/// 1-based, with the same position rounding as `substring`; a NaN bound
/// selects nothing.
pub fn fn_subsequence<'a, N: XdmNode<'a> + 'a>(
    args: Vec<XdmValue<N>>,
) -> Result<XdmValue<N>, Error> {
    if args.len() != 2 && args.len() != 3 {
        return Err(Error::function("subsequence", "expected 2 or 3 arguments"));
    }
    let start = double_arg(&args[1])?;
    let end = match args.get(2) {
        Some(len) => round_half_up(start) + round_half_up(double_arg(len)?),
        None => f64::INFINITY,
    };
    let start = round_half_up(start);
    if start.is_nan() || end.is_nan() {
        return Ok(XdmValue::empty());
    }

    let items: Vec<XdmItem<N>> = args[0]
        .items()
        .iter()
        .enumerate()
        .filter(|(i, _)| {
            let position = (i + 1) as f64;
            position >= start && position < end
        })
        .map(|(_, item)| item.clone())
        .collect();
    Ok(XdmValue::from_items(items))
}

fn double_arg<'a, N: XdmNode<'a> + 'a>(value: &XdmValue<N>) -> Result<f64, Error> {
    let atoms = atomize_value(value, AtomizeMode::Lenient)?;
    Ok(atoms.first().map(AtomicValue::to_double).unwrap_or(f64::NAN))
}

fn round_half_up(d: f64) -> f64 {
    if d.is_finite() { (d + 0.5).floor() } else { d }
}

pub fn fn_distinct_values<'a, N: XdmNode<'a> + 'a>(
    args: Vec<XdmValue<N>>,
) -> Result<XdmValue<N>, Error> {
    let value = one_arg("distinct-values", args)?;
    let atoms = atomize_value(&value, AtomizeMode::Lenient)?;
    let mut distinct: Vec<AtomicValue> = Vec::new();
    for atom in atoms {
        if !distinct.contains(&atom) {
            distinct.push(atom);
        }
    }
    Ok(XdmValue::from_items(
        distinct.into_iter().map(XdmItem::Atomic).collect(),
    ))
}

pub fn fn_position<'a, N: XdmNode<'a> + 'a>(
    args: Vec<XdmValue<N>>,
    ctx: &EvaluationContext<'a, '_, N>,
) -> Result<XdmValue<N>, Error> {
    if !args.is_empty() {
        return Err(Error::function("position", "expected 0 arguments"));
    }
    Ok(XdmValue::from_integer(ctx.context_position as i64))
}

pub fn fn_last<'a, N: XdmNode<'a> + 'a>(
    args: Vec<XdmValue<N>>,
    ctx: &EvaluationContext<'a, '_, N>,
) -> Result<XdmValue<N>, Error> {
    if !args.is_empty() {
        return Err(Error::function("last", "expected 0 arguments"));
    }
    Ok(XdmValue::from_integer(ctx.context_size as i64))
}

pub fn fn_exactly_one<N: Clone>(args: Vec<XdmValue<N>>) -> Result<XdmValue<N>, Error> {
    let value = one_arg("exactly-one", args)?;
    if value.len() != 1 {
        return Err(Error::Cardinality {
            expected: "exactly one item".to_string(),
            actual: value.len(),
        });
    }
    Ok(value)
}

pub fn fn_zero_or_one<N: Clone>(args: Vec<XdmValue<N>>) -> Result<XdmValue<N>, Error> {
    let value = one_arg("zero-or-one", args)?;
    if value.len() > 1 {
        return Err(Error::Cardinality {
            expected: "at most one item".to_string(),
            actual: value.len(),
        });
    }
    Ok(value)
}

pub fn fn_one_or_more<N: Clone>(args: Vec<XdmValue<N>>) -> Result<XdmValue<N>, Error> {
    let value = one_arg("one-or-more", args)?;
    if value.is_empty() {
        return Err(Error::Cardinality {
            expected: "at least one item".to_string(),
            actual: 0,
        });
    }
    Ok(value)
}

/// `data()`: atomization as a function. With no argument it atomizes the
/// context item.
pub fn fn_data<'a, N: XdmNode<'a> + 'a>(
    args: Vec<XdmValue<N>>,
    ctx: &EvaluationContext<'a, '_, N>,
) -> Result<XdmValue<N>, Error> {
    let value = match args.as_slice() {
        [] => match &ctx.context_item {
            Some(item) => XdmValue::from_item(item.clone()),
            None => return Err(Error::NoContextItem),
        },
        [value] => value.clone(),
        _ => return Err(Error::function("data", "expected 0 or 1 arguments")),
    };
    let atoms = atomize_value(&value, AtomizeMode::Lenient)?;
    Ok(XdmValue::from_items(
        atoms.into_iter().map(XdmItem::Atomic).collect(),
    ))
}
