//! Expression evaluation.
//!
//! Entry point: [`evaluate`] with an [`EvaluationContext`], or the
//! [`CompiledXPath::evaluate`] convenience which carries the compiled
//! expression's extension registry and version into the context. The
//! engine never mutates a caller's context; derived contexts are
//! copy-and-update.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::ast::*;
use crate::atomize::{AtomizeMode, atomize_optional, atomize_single};
use crate::error::Error;
use crate::functions::{self, ExtensionRegistry};
use crate::node::XdmNode;
use crate::operators;
use crate::parser::{CompiledXPath, XPathVersion};
use crate::promote::{PromotionContext, promote};
use crate::types::matching::{SequenceType, matches_sequence_type};
use crate::types::{AtomicValue, XdmArray, XdmFunction, XdmItem, XdmMap, XdmValue};

/// Everything an expression can observe while it evaluates.
///
/// Variables are borrowed from the caller; the rest is owned so a derived
/// context is a plain copy. Nodes are `Copy`, which keeps the document
/// and collection maps cheap to carry.
#[derive(Clone)]
pub struct EvaluationContext<'a, 'd, N: XdmNode<'a>> {
    pub context_item: Option<XdmItem<N>>,
    pub context_position: usize,
    pub context_size: usize,
    pub variables: &'d HashMap<String, XdmValue<N>>,
    pub root_node: Option<N>,
    pub namespaces: HashMap<String, String>,
    pub version: XPathVersion,
    /// XPath 1.0 compatibility mode: first-item extraction and NaN
    /// coercion in the operator layer.
    pub compatibility_mode: bool,
    pub default_collation: Option<String>,
    pub base_uri: Option<String>,
    pub implicit_timezone: Option<String>,
    pub current_datetime: Option<String>,
    pub documents: HashMap<String, N>,
    pub collections: HashMap<String, Vec<N>>,
    pub extensions: Arc<ExtensionRegistry>,
    _marker: PhantomData<&'a ()>,
}

impl<'a, 'd, N: XdmNode<'a> + 'a> EvaluationContext<'a, 'd, N> {
    pub fn new(
        context_item: Option<XdmItem<N>>,
        root_node: Option<N>,
        variables: &'d HashMap<String, XdmValue<N>>,
    ) -> Self {
        Self {
            context_item,
            context_position: 1,
            context_size: 1,
            variables,
            root_node,
            namespaces: HashMap::new(),
            version: XPathVersion::default(),
            compatibility_mode: false,
            default_collation: None,
            base_uri: None,
            implicit_timezone: None,
            current_datetime: None,
            documents: HashMap::new(),
            collections: HashMap::new(),
            extensions: Arc::new(ExtensionRegistry::default()),
            _marker: PhantomData,
        }
    }

    pub fn with_compatibility_mode(mut self, enabled: bool) -> Self {
        self.compatibility_mode = enabled;
        self
    }

    pub fn with_documents(mut self, documents: HashMap<String, N>) -> Self {
        self.documents = documents;
        self
    }

    pub fn with_collections(mut self, collections: HashMap<String, Vec<N>>) -> Self {
        self.collections = collections;
        self
    }

    pub fn with_context_item(&self, item: XdmItem<N>) -> Self {
        let mut derived = self.clone();
        derived.context_item = Some(item);
        derived
    }

    pub fn with_position(&self, position: usize, size: usize) -> Self {
        let mut derived = self.clone();
        derived.context_position = position;
        derived.context_size = size;
        derived
    }
}

impl CompiledXPath {
    /// Evaluates the compiled expression against a context. The context's
    /// version and extension registry are taken from the compilation.
    pub fn evaluate<'a, N: XdmNode<'a> + 'a>(
        &self,
        ctx: &EvaluationContext<'a, '_, N>,
    ) -> Result<XdmValue<N>, Error> {
        let mut ctx = ctx.clone();
        ctx.version = self.version();
        ctx.extensions = self.extensions().clone();
        evaluate(self.root(), &ctx, &HashMap::new())
    }
}

pub fn evaluate<'a, N>(
    expr: &Expression,
    ctx: &EvaluationContext<'a, '_, N>,
    local_vars: &HashMap<String, XdmValue<N>>,
) -> Result<XdmValue<N>, Error>
where
    N: XdmNode<'a> + 'a,
{
    match expr {
        Expression::Literal(lit) => evaluate_literal(lit),
        Expression::Variable(name) => evaluate_variable(name, ctx, local_vars),
        Expression::ContextItem => match &ctx.context_item {
            Some(item) => Ok(XdmValue::from_item(item.clone())),
            None => Err(Error::NoContextItem),
        },

        Expression::Path(path) => evaluate_path(path, ctx, local_vars),
        Expression::FilterExpr { base, predicates } => {
            evaluate_filter_expr(base, predicates, ctx, local_vars)
        }

        Expression::BinaryOp { left, op, right } => {
            let l = evaluate(left, ctx, local_vars)?;
            let r = evaluate(right, ctx, local_vars)?;
            operators::evaluate_binary(*op, l, r, ctx.compatibility_mode)
        }
        Expression::UnaryOp { op, expr } => {
            let value = evaluate(expr, ctx, local_vars)?;
            operators::evaluate_unary(*op, value, ctx.compatibility_mode)
        }

        Expression::IfExpr {
            condition,
            then_expr,
            else_expr,
        } => {
            let cond = evaluate(condition, ctx, local_vars)?;
            if cond.effective_boolean_value() {
                evaluate(then_expr, ctx, local_vars)
            } else {
                evaluate(else_expr, ctx, local_vars)
            }
        }
        Expression::ForExpr {
            bindings,
            return_expr,
        } => evaluate_for(bindings, return_expr, ctx, local_vars),
        Expression::LetExpr {
            bindings,
            return_expr,
        } => {
            let mut new_vars = local_vars.clone();
            for (name, value_expr) in bindings {
                let value = evaluate(value_expr, ctx, &new_vars)?;
                new_vars.insert(name.clone(), value);
            }
            evaluate(return_expr, ctx, &new_vars)
        }
        Expression::QuantifiedExpr {
            quantifier,
            bindings,
            satisfies,
        } => evaluate_quantified(*quantifier, bindings, satisfies, ctx, local_vars),

        Expression::StringConcat { left, right } => {
            let l = string_operand(&evaluate(left, ctx, local_vars)?)?;
            let r = string_operand(&evaluate(right, ctx, local_vars)?)?;
            Ok(XdmValue::from_string(format!("{}{}", l, r)))
        }
        Expression::RangeExpr { start, end } => evaluate_range(start, end, ctx, local_vars),
        Expression::SimpleMapExpr { base, mapping } => {
            evaluate_simple_map(base, mapping, ctx, local_vars)
        }
        Expression::ArrowExpr { base, steps } => {
            let mut current = evaluate(base, ctx, local_vars)?;
            for step in steps {
                let mut args = vec![current];
                for arg in &step.args {
                    args.push(evaluate(arg, ctx, local_vars)?);
                }
                current = functions::call_function(&step.function_name, args, ctx, local_vars)?;
            }
            Ok(current)
        }

        Expression::MapConstructor(entries) => evaluate_map_constructor(entries, ctx, local_vars),
        Expression::ArrayConstructor(kind) => evaluate_array_constructor(kind, ctx, local_vars),
        Expression::LookupExpr { base, key } => {
            let base_value = evaluate(base, ctx, local_vars)?;
            evaluate_lookup(&base_value, key, ctx, local_vars)
        }
        Expression::UnaryLookup(key) => match &ctx.context_item {
            Some(item) => evaluate_lookup(
                &XdmValue::from_item(item.clone()),
                key,
                ctx,
                local_vars,
            ),
            None => Err(Error::NoContextItem),
        },

        Expression::FunctionCall { name, args } => {
            evaluate_function_call(name, args, ctx, local_vars)
        }
        Expression::DynamicFunctionCall {
            function_expr,
            args,
        } => evaluate_dynamic_function_call(function_expr, args, ctx, local_vars),
        Expression::InlineFunction { params, body, .. } => {
            let captured = local_vars
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            Ok(XdmValue::from_function(XdmFunction::inline(
                params.clone(),
                (**body).clone(),
                captured,
            )))
        }
        Expression::NamedFunctionRef { name, arity } => Ok(XdmValue::from_function(
            XdmFunction::named_ref(name.prefix.clone(), name.local_part.clone(), *arity),
        )),
        Expression::ArgumentPlaceholder => Err(Error::type_error(
            "argument placeholder '?' is only allowed in a function call argument list",
        )),

        Expression::InstanceOf {
            expr,
            sequence_type,
        } => {
            let value = evaluate(expr, ctx, local_vars)?;
            Ok(XdmValue::from_bool(
                matches_sequence_type(value.items(), sequence_type).matches,
            ))
        }
        Expression::TreatAs {
            expr,
            sequence_type,
        } => evaluate_treat_as(expr, sequence_type, ctx, local_vars),
        Expression::CastAs { expr, single_type } => {
            evaluate_cast_as(expr, single_type, ctx, local_vars)
        }
        Expression::CastableAs { expr, single_type } => {
            evaluate_castable_as(expr, single_type, ctx, local_vars)
        }

        Expression::Sequence(exprs) => {
            let mut items = Vec::new();
            for e in exprs {
                items.extend(evaluate(e, ctx, local_vars)?.into_items());
            }
            Ok(XdmValue::from_items(items))
        }
    }
}

fn evaluate_literal<N: Clone>(lit: &Literal) -> Result<XdmValue<N>, Error> {
    Ok(match lit {
        Literal::String(s) => XdmValue::from_string(s.clone()),
        Literal::Integer(i) => XdmValue::from_integer(*i),
        Literal::Decimal(d) => XdmValue::from_atomic(AtomicValue::Decimal(*d)),
        Literal::Double(d) => XdmValue::from_double(*d),
    })
}

fn evaluate_variable<'a, N: XdmNode<'a> + 'a>(
    name: &str,
    ctx: &EvaluationContext<'a, '_, N>,
    local_vars: &HashMap<String, XdmValue<N>>,
) -> Result<XdmValue<N>, Error> {
    if let Some(value) = local_vars.get(name) {
        return Ok(value.clone());
    }
    if let Some(value) = ctx.variables.get(name) {
        return Ok(value.clone());
    }
    Err(Error::UnknownVariable(name.to_string()))
}

// ----- paths -----

fn evaluate_path<'a, N: XdmNode<'a> + 'a>(
    path: &LocationPath,
    ctx: &EvaluationContext<'a, '_, N>,
    local_vars: &HashMap<String, XdmValue<N>>,
) -> Result<XdmValue<N>, Error> {
    let initial: Vec<XdmItem<N>> = match &path.start {
        PathStart::Context => match &ctx.context_item {
            Some(item) => vec![item.clone()],
            None => return Ok(XdmValue::empty()),
        },
        PathStart::Root => match ctx.root_node {
            Some(root) => vec![XdmItem::Node(root)],
            None => return Ok(XdmValue::empty()),
        },
        PathStart::Expression(expr) => evaluate(expr, ctx, local_vars)?.into_items(),
    };

    if path.steps.is_empty() {
        return Ok(XdmValue::from_items(initial));
    }

    let mut nodes = Vec::with_capacity(initial.len());
    for item in initial {
        match item {
            XdmItem::Node(n) => nodes.push(n),
            other => {
                return Err(Error::type_error(format!(
                    "path steps require nodes, got {}",
                    other.type_name()
                )));
            }
        }
    }

    for step in &path.steps {
        nodes = evaluate_step(step, &nodes, ctx, local_vars)?;
    }
    Ok(XdmValue::from_nodes(nodes))
}

/// One step over a set of context nodes. Axis nodes are visited in axis
/// order (reverse axes nearest-first) so positional predicates count
/// correctly; the merged result is sorted back into document order with
/// duplicates dropped.
fn evaluate_step<'a, N: XdmNode<'a> + 'a>(
    step: &Step,
    context_nodes: &[N],
    ctx: &EvaluationContext<'a, '_, N>,
    local_vars: &HashMap<String, XdmValue<N>>,
) -> Result<Vec<N>, Error> {
    let mut result: Vec<N> = Vec::new();
    for &node in context_nodes {
        let mut matched: Vec<N> = collect_axis(step.axis, node)
            .into_iter()
            .filter(|n| node_test_matches(&step.node_test, n, step.axis))
            .collect();
        for predicate in &step.predicates {
            matched = filter_nodes(predicate, matched, ctx, local_vars)?;
        }
        result.extend(matched);
    }
    result.sort();
    result.dedup();
    Ok(result)
}

fn filter_nodes<'a, N: XdmNode<'a> + 'a>(
    predicate: &Expression,
    nodes: Vec<N>,
    ctx: &EvaluationContext<'a, '_, N>,
    local_vars: &HashMap<String, XdmValue<N>>,
) -> Result<Vec<N>, Error> {
    let size = nodes.len();
    let mut kept = Vec::new();
    for (index, node) in nodes.into_iter().enumerate() {
        let pred_ctx = ctx
            .with_context_item(XdmItem::Node(node))
            .with_position(index + 1, size);
        if predicate_holds(predicate, index + 1, &pred_ctx, local_vars)? {
            kept.push(node);
        }
    }
    Ok(kept)
}

/// A numeric predicate is a position test; anything else is its
/// effective boolean value.
fn predicate_holds<'a, N: XdmNode<'a> + 'a>(
    predicate: &Expression,
    position: usize,
    ctx: &EvaluationContext<'a, '_, N>,
    local_vars: &HashMap<String, XdmValue<N>>,
) -> Result<bool, Error> {
    let value = evaluate(predicate, ctx, local_vars)?;
    match value.single() {
        Some(XdmItem::Atomic(a)) if a.is_numeric() => Ok(a.to_double() == position as f64),
        _ => Ok(value.effective_boolean_value()),
    }
}

fn node_test_matches<'a, N: XdmNode<'a>>(test: &NodeTest, node: &N, axis: Axis) -> bool {
    use crate::node::NodeKind;
    let principal = if axis == Axis::Attribute {
        NodeKind::Attribute
    } else {
        NodeKind::Element
    };
    match test {
        NodeTest::Kind(kind) => kind.matches_node(node),
        NodeTest::Wildcard => node.node_kind() == principal,
        NodeTest::Name(q) => {
            node.node_kind() == principal
                && node.name().is_some_and(|n| {
                    n.local_part == q.local_part && n.prefix.map(str::to_string) == q.prefix
                })
        }
        NodeTest::NamespaceWildcard(prefix) => {
            node.node_kind() == principal
                && node.name().is_some_and(|n| n.prefix == Some(prefix.as_str()))
        }
        NodeTest::LocalWildcard(local) => {
            node.node_kind() == principal
                && node.name().is_some_and(|n| n.local_part == local.as_str())
        }
    }
}

fn collect_axis<'a, N: XdmNode<'a>>(axis: Axis, node: N) -> Vec<N> {
    match axis {
        Axis::Child => node.children().collect(),
        Axis::Attribute => node.attributes().collect(),
        Axis::SelfAxis => vec![node],
        Axis::Parent => node.parent().into_iter().collect(),
        Axis::Descendant => collect_descendants(node),
        Axis::DescendantOrSelf => {
            let mut nodes = vec![node];
            nodes.extend(collect_descendants(node));
            nodes
        }
        Axis::Ancestor => collect_ancestors(node),
        Axis::AncestorOrSelf => {
            let mut nodes = vec![node];
            nodes.extend(collect_ancestors(node));
            nodes
        }
        Axis::FollowingSibling => collect_following_siblings(node),
        Axis::PrecedingSibling => {
            let mut nodes = collect_preceding_siblings(node);
            nodes.reverse();
            nodes
        }
        Axis::Following => collect_following(node),
        Axis::Preceding => collect_preceding(node),
    }
}

fn collect_descendants<'a, N: XdmNode<'a>>(node: N) -> Vec<N> {
    let mut result = Vec::new();
    for child in node.children() {
        result.push(child);
        result.extend(collect_descendants(child));
    }
    result
}

/// Nearest ancestor first.
fn collect_ancestors<'a, N: XdmNode<'a>>(node: N) -> Vec<N> {
    let mut result = Vec::new();
    let mut current = node.parent();
    while let Some(parent) = current {
        result.push(parent);
        current = parent.parent();
    }
    result
}

fn collect_following_siblings<'a, N: XdmNode<'a>>(node: N) -> Vec<N> {
    let Some(parent) = node.parent() else {
        return Vec::new();
    };
    parent
        .children()
        .skip_while(|n| *n != node)
        .skip(1)
        .collect()
}

/// In document order; the caller reverses for the axis direction.
fn collect_preceding_siblings<'a, N: XdmNode<'a>>(node: N) -> Vec<N> {
    let Some(parent) = node.parent() else {
        return Vec::new();
    };
    parent.children().take_while(|n| *n != node).collect()
}

fn collect_following<'a, N: XdmNode<'a>>(node: N) -> Vec<N> {
    let mut result = Vec::new();
    for sibling in collect_following_siblings(node) {
        result.push(sibling);
        result.extend(collect_descendants(sibling));
    }
    if let Some(parent) = node.parent() {
        result.extend(collect_following(parent));
    }
    result
}

/// Reverse document order (nearest first), ancestors excluded.
fn collect_preceding<'a, N: XdmNode<'a>>(node: N) -> Vec<N> {
    let mut result = Vec::new();
    let mut siblings = collect_preceding_siblings(node);
    siblings.reverse();
    for sibling in siblings {
        let mut subtree = collect_descendants(sibling);
        subtree.reverse();
        result.extend(subtree);
        result.push(sibling);
    }
    if let Some(parent) = node.parent() {
        result.extend(collect_preceding(parent));
    }
    result
}

// ----- composite expressions -----

fn evaluate_filter_expr<'a, N: XdmNode<'a> + 'a>(
    base: &Expression,
    predicates: &[Expression],
    ctx: &EvaluationContext<'a, '_, N>,
    local_vars: &HashMap<String, XdmValue<N>>,
) -> Result<XdmValue<N>, Error> {
    let mut items = evaluate(base, ctx, local_vars)?.into_items();
    for predicate in predicates {
        let size = items.len();
        let mut kept = Vec::new();
        for (index, item) in items.into_iter().enumerate() {
            let pred_ctx = ctx
                .with_context_item(item.clone())
                .with_position(index + 1, size);
            if predicate_holds(predicate, index + 1, &pred_ctx, local_vars)? {
                kept.push(item);
            }
        }
        items = kept;
    }
    Ok(XdmValue::from_items(items))
}

fn evaluate_for<'a, N: XdmNode<'a> + 'a>(
    bindings: &[(String, Box<Expression>)],
    return_expr: &Expression,
    ctx: &EvaluationContext<'a, '_, N>,
    local_vars: &HashMap<String, XdmValue<N>>,
) -> Result<XdmValue<N>, Error> {
    fn iterate<'a, N: XdmNode<'a> + 'a>(
        bindings: &[(String, Box<Expression>)],
        binding_idx: usize,
        return_expr: &Expression,
        ctx: &EvaluationContext<'a, '_, N>,
        local_vars: &HashMap<String, XdmValue<N>>,
    ) -> Result<Vec<XdmItem<N>>, Error> {
        if binding_idx >= bindings.len() {
            return Ok(evaluate(return_expr, ctx, local_vars)?.into_items());
        }
        let (name, expr) = &bindings[binding_idx];
        let sequence = evaluate(expr, ctx, local_vars)?;
        let mut results = Vec::new();
        for item in sequence.items() {
            let mut new_vars = local_vars.clone();
            new_vars.insert(name.clone(), XdmValue::from_item(item.clone()));
            results.extend(iterate(
                bindings,
                binding_idx + 1,
                return_expr,
                ctx,
                &new_vars,
            )?);
        }
        Ok(results)
    }

    let items = iterate(bindings, 0, return_expr, ctx, local_vars)?;
    Ok(XdmValue::from_items(items))
}

fn evaluate_quantified<'a, N: XdmNode<'a> + 'a>(
    quantifier: Quantifier,
    bindings: &[(String, Box<Expression>)],
    satisfies: &Expression,
    ctx: &EvaluationContext<'a, '_, N>,
    local_vars: &HashMap<String, XdmValue<N>>,
) -> Result<XdmValue<N>, Error> {
    fn check<'a, N: XdmNode<'a> + 'a>(
        quantifier: Quantifier,
        bindings: &[(String, Box<Expression>)],
        binding_idx: usize,
        satisfies: &Expression,
        ctx: &EvaluationContext<'a, '_, N>,
        local_vars: &HashMap<String, XdmValue<N>>,
    ) -> Result<bool, Error> {
        if binding_idx >= bindings.len() {
            return Ok(evaluate(satisfies, ctx, local_vars)?.effective_boolean_value());
        }
        let (name, expr) = &bindings[binding_idx];
        let sequence = evaluate(expr, ctx, local_vars)?;
        for item in sequence.items() {
            let mut new_vars = local_vars.clone();
            new_vars.insert(name.clone(), XdmValue::from_item(item.clone()));
            let holds = check(
                quantifier,
                bindings,
                binding_idx + 1,
                satisfies,
                ctx,
                &new_vars,
            )?;
            match quantifier {
                Quantifier::Some if holds => return Ok(true),
                Quantifier::Every if !holds => return Ok(false),
                _ => {}
            }
        }
        // Vacuous: some over nothing is false, every over nothing true.
        Ok(quantifier == Quantifier::Every)
    }

    let result = check(quantifier, bindings, 0, satisfies, ctx, local_vars)?;
    Ok(XdmValue::from_bool(result))
}

fn string_operand<'a, N: XdmNode<'a> + 'a>(value: &XdmValue<N>) -> Result<String, Error> {
    match atomize_optional(value, AtomizeMode::Lenient)? {
        None => Ok(String::new()),
        Some(atom) => {
            Ok(promote(&atom, PromotionContext::StringContext, None)?.to_string_value())
        }
    }
}

fn evaluate_range<'a, N: XdmNode<'a> + 'a>(
    start: &Expression,
    end: &Expression,
    ctx: &EvaluationContext<'a, '_, N>,
    local_vars: &HashMap<String, XdmValue<N>>,
) -> Result<XdmValue<N>, Error> {
    let start_value = evaluate(start, ctx, local_vars)?;
    let end_value = evaluate(end, ctx, local_vars)?;
    let (Some(start_atom), Some(end_atom)) = (
        atomize_optional(&start_value, AtomizeMode::Lenient)?,
        atomize_optional(&end_value, AtomizeMode::Lenient)?,
    ) else {
        return Ok(XdmValue::empty());
    };
    let (Some(s), Some(e)) = (start_atom.to_integer(), end_atom.to_integer()) else {
        return Err(Error::type_error("range bounds must be integers"));
    };
    if s > e {
        return Ok(XdmValue::empty());
    }
    let items = (s..=e)
        .map(|i| XdmItem::Atomic(AtomicValue::Integer(i)))
        .collect();
    Ok(XdmValue::from_items(items))
}

fn evaluate_simple_map<'a, N: XdmNode<'a> + 'a>(
    base: &Expression,
    mapping: &Expression,
    ctx: &EvaluationContext<'a, '_, N>,
    local_vars: &HashMap<String, XdmValue<N>>,
) -> Result<XdmValue<N>, Error> {
    let base_value = evaluate(base, ctx, local_vars)?;
    let size = base_value.len();
    let mut results = Vec::new();
    for (index, item) in base_value.items().iter().enumerate() {
        let step_ctx = ctx
            .with_context_item(item.clone())
            .with_position(index + 1, size);
        results.extend(evaluate(mapping, &step_ctx, local_vars)?.into_items());
    }
    Ok(XdmValue::from_items(results))
}

fn evaluate_map_constructor<'a, N: XdmNode<'a> + 'a>(
    entries: &[MapEntry],
    ctx: &EvaluationContext<'a, '_, N>,
    local_vars: &HashMap<String, XdmValue<N>>,
) -> Result<XdmValue<N>, Error> {
    let mut map = XdmMap::new();
    for entry in entries {
        let key_value = evaluate(&entry.key, ctx, local_vars)?;
        let key = atomize_single(&key_value, AtomizeMode::Lenient)?;
        let value = evaluate(&entry.value, ctx, local_vars)?;
        // Duplicate keys: last entry wins.
        map = map.put(key, value);
    }
    Ok(XdmValue::from_map(map))
}

fn evaluate_array_constructor<'a, N: XdmNode<'a> + 'a>(
    kind: &ArrayConstructorKind,
    ctx: &EvaluationContext<'a, '_, N>,
    local_vars: &HashMap<String, XdmValue<N>>,
) -> Result<XdmValue<N>, Error> {
    match kind {
        ArrayConstructorKind::Square(members) => {
            let mut array_members = Vec::with_capacity(members.len());
            for member in members {
                array_members.push(evaluate(member, ctx, local_vars)?);
            }
            Ok(XdmValue::from_array(XdmArray::from_members(array_members)))
        }
        // `array { expr }` makes one member per item of the sequence.
        ArrayConstructorKind::Curly(expr) => {
            let value = evaluate(expr, ctx, local_vars)?;
            let members = value
                .into_items()
                .into_iter()
                .map(XdmValue::from_item)
                .collect();
            Ok(XdmValue::from_array(XdmArray::from_members(members)))
        }
    }
}

/// Postfix and unary lookup, applied to every item of the base sequence.
fn evaluate_lookup<'a, N: XdmNode<'a> + 'a>(
    base: &XdmValue<N>,
    key: &LookupKey,
    ctx: &EvaluationContext<'a, '_, N>,
    local_vars: &HashMap<String, XdmValue<N>>,
) -> Result<XdmValue<N>, Error> {
    let mut results = Vec::new();
    for item in base.items() {
        let found = match item {
            XdmItem::Map(map) => lookup_in_map(map, key, ctx, local_vars)?,
            XdmItem::Array(array) => lookup_in_array(array, key, ctx, local_vars)?,
            other => {
                return Err(Error::type_error(format!(
                    "lookup requires a map or array, got {}",
                    other.type_name()
                )));
            }
        };
        results.extend(found.into_items());
    }
    Ok(XdmValue::from_items(results))
}

fn lookup_in_map<'a, N: XdmNode<'a> + 'a>(
    map: &XdmMap<N>,
    key: &LookupKey,
    ctx: &EvaluationContext<'a, '_, N>,
    local_vars: &HashMap<String, XdmValue<N>>,
) -> Result<XdmValue<N>, Error> {
    let atomic_key = match key {
        LookupKey::Wildcard => {
            let mut items = Vec::new();
            for value in map.values() {
                items.extend(value.clone().into_items());
            }
            return Ok(XdmValue::from_items(items));
        }
        LookupKey::Name(name) => AtomicValue::String(name.clone()),
        LookupKey::Integer(i) => AtomicValue::Integer(*i),
        LookupKey::Parenthesized(expr) => {
            let key_value = evaluate(expr, ctx, local_vars)?;
            atomize_single(&key_value, AtomizeMode::Lenient)?
        }
    };
    Ok(map.get(&atomic_key).cloned().unwrap_or_else(XdmValue::empty))
}

fn lookup_in_array<'a, N: XdmNode<'a> + 'a>(
    array: &XdmArray<N>,
    key: &LookupKey,
    ctx: &EvaluationContext<'a, '_, N>,
    local_vars: &HashMap<String, XdmValue<N>>,
) -> Result<XdmValue<N>, Error> {
    let index = match key {
        LookupKey::Wildcard => {
            let mut items = Vec::new();
            for member in array.members() {
                items.extend(member.clone().into_items());
            }
            return Ok(XdmValue::from_items(items));
        }
        LookupKey::Integer(i) => *i,
        LookupKey::Parenthesized(expr) => {
            let key_value = evaluate(expr, ctx, local_vars)?;
            let atom = atomize_single(&key_value, AtomizeMode::Lenient)?;
            atom.to_integer()
                .ok_or_else(|| Error::type_error("array lookup requires an integer key"))?
        }
        LookupKey::Name(name) => {
            return Err(Error::type_error(format!(
                "cannot look up '{}' in an array",
                name
            )));
        }
    };
    if index < 1 {
        return Err(Error::ArrayIndexOutOfBounds {
            index,
            size: array.size(),
        });
    }
    match array.get(index as usize) {
        Some(member) => Ok(member.clone()),
        None => Err(Error::ArrayIndexOutOfBounds {
            index,
            size: array.size(),
        }),
    }
}

fn evaluate_function_call<'a, N: XdmNode<'a> + 'a>(
    name: &QName,
    args: &[Expression],
    ctx: &EvaluationContext<'a, '_, N>,
    local_vars: &HashMap<String, XdmValue<N>>,
) -> Result<XdmValue<N>, Error> {
    let has_placeholder = args
        .iter()
        .any(|a| matches!(a, Expression::ArgumentPlaceholder));

    if has_placeholder {
        // Partial application: bind the evaluated arguments, leave holes
        // for the placeholders.
        let mut bound_args = Vec::with_capacity(args.len());
        for arg in args {
            if matches!(arg, Expression::ArgumentPlaceholder) {
                bound_args.push(None);
            } else {
                bound_args.push(Some(evaluate(arg, ctx, local_vars)?));
            }
        }
        let base =
            XdmFunction::named_ref(name.prefix.clone(), name.local_part.clone(), args.len());
        return Ok(XdmValue::from_function(XdmFunction::Partial {
            base: Box::new(base),
            bound_args,
        }));
    }

    let mut evaluated = Vec::with_capacity(args.len());
    for arg in args {
        evaluated.push(evaluate(arg, ctx, local_vars)?);
    }
    functions::call_function(name, evaluated, ctx, local_vars)
}

fn evaluate_dynamic_function_call<'a, N: XdmNode<'a> + 'a>(
    function_expr: &Expression,
    args: &[Expression],
    ctx: &EvaluationContext<'a, '_, N>,
    local_vars: &HashMap<String, XdmValue<N>>,
) -> Result<XdmValue<N>, Error> {
    let function_value = evaluate(function_expr, ctx, local_vars)?;
    let mut evaluated = Vec::with_capacity(args.len());
    for arg in args {
        evaluated.push(evaluate(arg, ctx, local_vars)?);
    }

    match function_value.single() {
        // Maps and arrays are functions of their keys.
        Some(XdmItem::Map(map)) => {
            let [key] = evaluated.as_slice() else {
                return Err(Error::type_error("a map call takes exactly one argument"));
            };
            let key = atomize_single(key, AtomizeMode::Lenient)?;
            Ok(map.get(&key).cloned().unwrap_or_else(XdmValue::empty))
        }
        Some(XdmItem::Array(array)) => {
            let [key] = evaluated.as_slice() else {
                return Err(Error::type_error("an array call takes exactly one argument"));
            };
            let atom = atomize_single(key, AtomizeMode::Lenient)?;
            let index = atom
                .to_integer()
                .ok_or_else(|| Error::type_error("array index must be an integer"))?;
            match array.get(index.max(0) as usize) {
                Some(member) if index >= 1 => Ok(member.clone()),
                _ => Err(Error::ArrayIndexOutOfBounds {
                    index,
                    size: array.size(),
                }),
            }
        }
        Some(XdmItem::Function(func)) => {
            functions::call_xdm_function(func, evaluated, ctx, local_vars)
        }
        _ => Err(Error::type_error(
            "dynamic call requires a single function, map or array",
        )),
    }
}

fn evaluate_treat_as<'a, N: XdmNode<'a> + 'a>(
    expr: &Expression,
    sequence_type: &SequenceType,
    ctx: &EvaluationContext<'a, '_, N>,
    local_vars: &HashMap<String, XdmValue<N>>,
) -> Result<XdmValue<N>, Error> {
    let value = evaluate(expr, ctx, local_vars)?;
    let outcome = matches_sequence_type(value.items(), sequence_type);
    if outcome.matches {
        Ok(value)
    } else {
        Err(Error::type_error(format!(
            "treat as {}: {}",
            sequence_type.name(),
            outcome.reason.unwrap_or_default()
        )))
    }
}

fn evaluate_cast_as<'a, N: XdmNode<'a> + 'a>(
    expr: &Expression,
    single_type: &SingleType,
    ctx: &EvaluationContext<'a, '_, N>,
    local_vars: &HashMap<String, XdmValue<N>>,
) -> Result<XdmValue<N>, Error> {
    let value = evaluate(expr, ctx, local_vars)?;
    if value.is_empty() {
        return if single_type.optional {
            Ok(XdmValue::empty())
        } else {
            Err(Error::type_error(
                "cannot cast an empty sequence to a non-optional type",
            ))
        };
    }
    let atom = atomize_single(&value, AtomizeMode::Lenient)?;
    Ok(XdmValue::from_atomic(single_type.target.cast(&atom)?))
}

/// `castable as` converts the underlying cast error to `false` rather
/// than propagating it.
fn evaluate_castable_as<'a, N: XdmNode<'a> + 'a>(
    expr: &Expression,
    single_type: &SingleType,
    ctx: &EvaluationContext<'a, '_, N>,
    local_vars: &HashMap<String, XdmValue<N>>,
) -> Result<XdmValue<N>, Error> {
    let value = evaluate(expr, ctx, local_vars)?;
    if value.is_empty() {
        return Ok(XdmValue::from_bool(single_type.optional));
    }
    let castable = match atomize_single(&value, AtomizeMode::Lenient) {
        Ok(atom) => single_type.target.cast(&atom).is_ok(),
        Err(_) => false,
    };
    Ok(XdmValue::from_bool(castable))
}
