//! Built-in function dispatch and the extension registry.
//!
//! One match resolves a (prefix, local-name) pair to its implementation;
//! names that miss the built-in table fall through to the context's
//! extension registry before becoming an unknown-function error.

mod array;
mod boolean;
pub mod extensions;
mod map;
mod numeric;
mod sequence;
mod string;

use std::collections::HashMap;

use crate::ast::QName;
use crate::atomize::{AtomizeMode, atomize_value};
use crate::engine::{EvaluationContext, evaluate};
use crate::error::Error;
use crate::node::XdmNode;
use crate::types::{XdmFunction, XdmItem, XdmValue};

pub use extensions::{ExtensionFunction, ExtensionImpl, ExtensionRegistry};

pub fn call_function<'a, N: XdmNode<'a> + 'a>(
    name: &QName,
    args: Vec<XdmValue<N>>,
    ctx: &EvaluationContext<'a, '_, N>,
    local_vars: &HashMap<String, XdmValue<N>>,
) -> Result<XdmValue<N>, Error> {
    let prefix = name.prefix.as_deref();
    let local = name.local_part.as_str();

    match (prefix, local) {
        (Some("fn") | None, "true") => boolean::fn_true(args),
        (Some("fn") | None, "false") => boolean::fn_false(args),
        (Some("fn") | None, "not") => boolean::fn_not(args),
        (Some("fn") | None, "boolean") => boolean::fn_boolean(args),

        (Some("fn") | None, "number") => numeric::fn_number(args, ctx),
        (Some("fn") | None, "abs") => numeric::fn_abs(args),
        (Some("fn") | None, "floor") => numeric::fn_floor(args),
        (Some("fn") | None, "ceiling") => numeric::fn_ceiling(args),
        (Some("fn") | None, "round") => numeric::fn_round(args),

        (Some("fn") | None, "string") => string::fn_string(args, ctx),
        (Some("fn") | None, "concat") => string::fn_concat(args),
        (Some("fn") | None, "string-length") => string::fn_string_length(args, ctx),
        (Some("fn") | None, "substring") => string::fn_substring(args),
        (Some("fn") | None, "contains") => string::fn_contains(args),
        (Some("fn") | None, "starts-with") => string::fn_starts_with(args),
        (Some("fn") | None, "ends-with") => string::fn_ends_with(args),
        (Some("fn") | None, "upper-case") => string::fn_upper_case(args),
        (Some("fn") | None, "lower-case") => string::fn_lower_case(args),
        (Some("fn") | None, "normalize-space") => string::fn_normalize_space(args, ctx),
        (Some("fn") | None, "string-join") => string::fn_string_join(args),

        (Some("fn") | None, "count") => sequence::fn_count(args),
        (Some("fn") | None, "empty") => sequence::fn_empty(args),
        (Some("fn") | None, "exists") => sequence::fn_exists(args),
        (Some("fn") | None, "head") => sequence::fn_head(args),
        (Some("fn") | None, "tail") => sequence::fn_tail(args),
        (Some("fn") | None, "reverse") => sequence::fn_reverse(args),
        (Some("fn") | None, "subsequence") => sequence::fn_subsequence(args),
        (Some("fn") | None, "distinct-values") => sequence::fn_distinct_values(args),
        (Some("fn") | None, "position") => sequence::fn_position(args, ctx),
        (Some("fn") | None, "last") => sequence::fn_last(args, ctx),
        (Some("fn") | None, "exactly-one") => sequence::fn_exactly_one(args),
        (Some("fn") | None, "zero-or-one") => sequence::fn_zero_or_one(args),
        (Some("fn") | None, "one-or-more") => sequence::fn_one_or_more(args),
        (Some("fn") | None, "data") => sequence::fn_data(args, ctx),

        (Some("map"), "size") => map::map_size(args),
        (Some("map"), "keys") => map::map_keys(args),
        (Some("map"), "contains") => map::map_contains(args),
        (Some("map"), "get") => map::map_get(args),
        (Some("map"), "put") => map::map_put(args),
        (Some("map"), "remove") => map::map_remove(args),
        (Some("map"), "entry") => map::map_entry(args),
        (Some("map"), "merge") => map::map_merge(args),

        (Some("array"), "size") => array::array_size(args),
        (Some("array"), "get") => array::array_get(args),
        (Some("array"), "put") => array::array_put(args),
        (Some("array"), "append") => array::array_append(args),
        (Some("array"), "subarray") => array::array_subarray(args),
        (Some("array"), "remove") => array::array_remove(args),
        (Some("array"), "insert-before") => array::array_insert_before(args),
        (Some("array"), "head") => array::array_head(args),
        (Some("array"), "tail") => array::array_tail(args),
        (Some("array"), "reverse") => array::array_reverse(args),
        (Some("array"), "join") => array::array_join(args),
        (Some("array"), "flatten") => array::array_flatten(args),

        (Some("fn") | None, "doc") => fn_doc(args, ctx),
        (Some("fn") | None, "collection") => fn_collection(args, ctx),

        _ => call_extension(name, args, ctx),
    }
}

/// Calls a function item: a named reference resolves back through the
/// dispatch table, an inline function binds its parameters over the
/// captured environment, a partial application fills its holes.
pub fn call_xdm_function<'a, N: XdmNode<'a> + 'a>(
    func: &XdmFunction<N>,
    args: Vec<XdmValue<N>>,
    ctx: &EvaluationContext<'a, '_, N>,
    local_vars: &HashMap<String, XdmValue<N>>,
) -> Result<XdmValue<N>, Error> {
    match func {
        XdmFunction::Builtin { name, arity } => {
            check_call_arity(name, *arity, args.len())?;
            call_function(&QName::new(name.clone()), args, ctx, local_vars)
        }
        XdmFunction::NamedRef {
            prefix,
            local_name,
            arity,
        } => {
            check_call_arity(local_name, *arity, args.len())?;
            let name = QName {
                prefix: prefix.clone(),
                local_part: local_name.clone(),
            };
            call_function(&name, args, ctx, local_vars)
        }
        XdmFunction::Inline {
            params,
            body,
            captured_variables,
        } => {
            if args.len() != params.len() {
                return Err(Error::type_error(format!(
                    "inline function expects {} arguments, got {}",
                    params.len(),
                    args.len()
                )));
            }
            let mut new_vars = local_vars.clone();
            for (name, value) in captured_variables {
                new_vars.insert(name.clone(), value.clone());
            }
            for (param, arg) in params.iter().zip(args) {
                new_vars.insert(param.name.clone(), arg);
            }
            evaluate(body, ctx, &new_vars)
        }
        XdmFunction::Partial { base, bound_args } => {
            let mut full_args = Vec::with_capacity(bound_args.len());
            let mut supplied = args.into_iter();
            for bound in bound_args {
                match bound {
                    Some(value) => full_args.push(value.clone()),
                    None => full_args.push(supplied.next().ok_or_else(|| {
                        Error::type_error("too few arguments for partial application")
                    })?),
                }
            }
            full_args.extend(supplied);
            call_xdm_function(base, full_args, ctx, local_vars)
        }
    }
}

fn check_call_arity(name: &str, arity: usize, supplied: usize) -> Result<(), Error> {
    if arity == supplied {
        Ok(())
    } else {
        Err(Error::type_error(format!(
            "function {}#{} called with {} arguments",
            name, arity, supplied
        )))
    }
}

/// Extension functions exchange atomized values: node arguments are
/// atomized on the way in, results wrapped on the way out.
fn call_extension<'a, N: XdmNode<'a> + 'a>(
    name: &QName,
    args: Vec<XdmValue<N>>,
    ctx: &EvaluationContext<'a, '_, N>,
) -> Result<XdmValue<N>, Error> {
    let full_name = name.to_string();
    let Some(ext) = ctx.extensions.get(&full_name) else {
        return Err(Error::UnknownFunction {
            name: full_name,
            arity: args.len(),
        });
    };
    if args.len() < ext.min_args || args.len() > ext.max_args {
        return Err(Error::function(
            full_name,
            format!(
                "expected {} to {} arguments, got {}",
                ext.min_args,
                ext.max_args,
                args.len()
            ),
        ));
    }
    let mut atomized = Vec::with_capacity(args.len());
    for arg in &args {
        atomized.push(atomize_value(arg, AtomizeMode::Lenient)?);
    }
    let result = (ext.implementation)(&atomized)?;
    Ok(XdmValue::from_items(
        result.into_iter().map(XdmItem::Atomic).collect(),
    ))
}

/// `doc()` reads the context's injected document map; a missing entry is
/// an empty sequence, never a fatal error.
fn fn_doc<'a, N: XdmNode<'a> + 'a>(
    args: Vec<XdmValue<N>>,
    ctx: &EvaluationContext<'a, '_, N>,
) -> Result<XdmValue<N>, Error> {
    if args.len() != 1 {
        return Err(Error::function("doc", "expected 1 argument"));
    }
    if args[0].is_empty() {
        return Ok(XdmValue::empty());
    }
    let uri = args[0].to_xpath_string();
    Ok(match ctx.documents.get(&uri) {
        Some(node) => XdmValue::from_node(*node),
        None => XdmValue::empty(),
    })
}

fn fn_collection<'a, N: XdmNode<'a> + 'a>(
    args: Vec<XdmValue<N>>,
    ctx: &EvaluationContext<'a, '_, N>,
) -> Result<XdmValue<N>, Error> {
    if args.len() > 1 {
        return Err(Error::function("collection", "expected 0 or 1 arguments"));
    }
    let Some(uri_arg) = args.first() else {
        return Ok(XdmValue::empty());
    };
    let uri = uri_arg.to_xpath_string();
    Ok(match ctx.collections.get(&uri) {
        Some(nodes) => XdmValue::from_nodes(nodes.clone()),
        None => XdmValue::empty(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::tests::MockNode;
    use std::sync::Arc;

    type Value = XdmValue<MockNode<'static>>;

    #[test]
    fn test_unknown_function() {
        let variables = HashMap::new();
        let ctx: EvaluationContext<'_, '_, MockNode<'_>> =
            EvaluationContext::new(None, None, &variables);
        let err = call_function(
            &QName::new("no-such-function"),
            vec![],
            &ctx,
            &HashMap::new(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::UnknownFunction { .. }));
    }

    #[test]
    fn test_extension_dispatch_and_arity() {
        let double = ExtensionFunction::new(
            "double",
            1,
            1,
            Arc::new(|args| {
                let input = args[0]
                    .first()
                    .map(|a| a.to_double())
                    .unwrap_or(f64::NAN);
                Ok(vec![crate::types::AtomicValue::Double(input * 2.0)])
            }),
            "doubles a number",
        );
        let registry = Arc::new(ExtensionRegistry::from_functions(&[double]).unwrap());

        let variables = HashMap::new();
        let mut ctx: EvaluationContext<'_, '_, MockNode<'_>> =
            EvaluationContext::new(None, None, &variables);
        ctx.extensions = registry;

        let result = call_function(
            &QName::new("double"),
            vec![Value::from_integer(21)],
            &ctx,
            &HashMap::new(),
        )
        .unwrap();
        assert_eq!(result, Value::from_double(42.0));

        let err = call_function(&QName::new("double"), vec![], &ctx, &HashMap::new())
            .unwrap_err();
        assert!(matches!(err, Error::Function { .. }));
    }

    #[test]
    fn test_named_ref_arity_mismatch() {
        let variables = HashMap::new();
        let ctx: EvaluationContext<'_, '_, MockNode<'_>> =
            EvaluationContext::new(None, None, &variables);
        let func: XdmFunction<MockNode<'static>> = XdmFunction::named_ref(None, "not", 1);
        assert!(call_xdm_function(&func, vec![], &ctx, &HashMap::new()).is_err());
    }
}
