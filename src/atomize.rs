//! Atomization: extracting atomic values from arbitrary items per the
//! data model rules.

use crate::error::Error;
use crate::node::{NodeKind, XdmNode};
use crate::types::registry::AtomicType;
use crate::types::{AtomicValue, XdmItem, XdmValue};

/// How node content that cannot be meaningfully atomized is handled.
/// Strict callers get an error for element-only content; lenient callers
/// fall back to the concatenated string value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AtomizeMode {
    #[default]
    Lenient,
    Strict,
}

/// Atomizes a whole sequence. The first failing member fails the whole
/// operation; no partial results are returned.
pub fn atomize_value<'a, N: XdmNode<'a>>(
    value: &XdmValue<N>,
    mode: AtomizeMode,
) -> Result<Vec<AtomicValue>, Error> {
    let mut out = Vec::with_capacity(value.len());
    for item in value.items() {
        out.extend(atomize_item(item, mode)?);
    }
    Ok(out)
}

/// Atomizes one item. Arrays flatten member-wise; maps and function items
/// cannot be atomized.
pub fn atomize_item<'a, N: XdmNode<'a>>(
    item: &XdmItem<N>,
    mode: AtomizeMode,
) -> Result<Vec<AtomicValue>, Error> {
    match item {
        XdmItem::Atomic(a) => Ok(vec![a.clone()]),
        XdmItem::Node(n) => atomize_node(n, mode).map(|v| vec![v]),
        XdmItem::Array(arr) => {
            let mut out = Vec::new();
            for member in arr.members() {
                out.extend(atomize_value(member, mode)?);
            }
            Ok(out)
        }
        XdmItem::Map(_) | XdmItem::Function(_) => Err(Error::Atomization(format!(
            "function item {}",
            item.type_name()
        ))),
    }
}

/// Atomizes to exactly one value; zero or several atomized members is a
/// cardinality error.
pub fn atomize_single<'a, N: XdmNode<'a>>(
    value: &XdmValue<N>,
    mode: AtomizeMode,
) -> Result<AtomicValue, Error> {
    let mut values = atomize_value(value, mode)?;
    if values.len() != 1 {
        return Err(Error::Cardinality {
            expected: "exactly one atomic value".to_string(),
            actual: values.len(),
        });
    }
    Ok(values.remove(0))
}

/// Atomizes to at most one value; the empty sequence is allowed and maps
/// to `None`.
pub fn atomize_optional<'a, N: XdmNode<'a>>(
    value: &XdmValue<N>,
    mode: AtomizeMode,
) -> Result<Option<AtomicValue>, Error> {
    let mut values = atomize_value(value, mode)?;
    match values.len() {
        0 => Ok(None),
        1 => Ok(Some(values.remove(0))),
        n => Err(Error::Cardinality {
            expected: "at most one atomic value".to_string(),
            actual: n,
        }),
    }
}

fn atomize_node<'a, N: XdmNode<'a>>(node: &N, mode: AtomizeMode) -> Result<AtomicValue, Error> {
    // Schema-validated nodes supply their typed value directly, or a
    // declared type name to cast the string value through.
    if let Some(typed) = node.typed_value() {
        return Ok(typed);
    }
    if let Some(type_name) = node.type_name() {
        let local = type_name.strip_prefix("xs:").unwrap_or(type_name);
        if let Some(atomic_type) = AtomicType::by_name(local) {
            return atomic_type.cast(&AtomicValue::UntypedAtomic(node.string_value()));
        }
        return Err(Error::UnknownType(type_name.to_string()));
    }

    if mode == AtomizeMode::Strict
        && matches!(node.node_kind(), NodeKind::Element | NodeKind::Root)
        && has_element_only_content(node)
    {
        return Err(Error::Atomization("element-only content".to_string()));
    }

    Ok(AtomicValue::UntypedAtomic(node.string_value()))
}

/// True when the node has children but no text node among them.
fn has_element_only_content<'a, N: XdmNode<'a>>(node: &N) -> bool {
    let mut has_children = false;
    for child in node.children() {
        has_children = true;
        if child.node_kind() == NodeKind::Text {
            return false;
        }
    }
    has_children
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::tests::sample_tree;
    use crate::types::{XdmArray, XdmMap};

    #[test]
    fn test_atomic_passthrough() {
        let value: XdmValue<crate::node::tests::MockNode<'_>> =
            XdmValue::from_items(vec![
                XdmItem::Atomic(AtomicValue::Integer(1)),
                XdmItem::Atomic(AtomicValue::String("x".into())),
            ]);
        let atoms = atomize_value(&value, AtomizeMode::Lenient).unwrap();
        assert_eq!(atoms.len(), 2);
        assert_eq!(atoms[0], AtomicValue::Integer(1));
    }

    #[test]
    fn test_node_atomizes_to_untyped() {
        let tree = sample_tree();
        let item = XdmItem::Node(tree.node(1));
        let atoms = atomize_item(&item, AtomizeMode::Lenient).unwrap();
        assert_eq!(atoms, vec![AtomicValue::UntypedAtomic("one".into())]);
    }

    #[test]
    fn test_element_only_content_strict() {
        let tree = sample_tree();
        // <wrap><inner/></wrap>: children but no text.
        let wrap = XdmItem::Node(tree.node(6));
        let err = atomize_item(&wrap, AtomizeMode::Strict).unwrap_err();
        assert!(matches!(err, Error::Atomization(ref m) if m.contains("element-only")));

        // Lenient callers get the concatenated (empty) string value.
        let atoms = atomize_item(&wrap, AtomizeMode::Lenient).unwrap();
        assert_eq!(atoms, vec![AtomicValue::UntypedAtomic(String::new())]);
    }

    #[test]
    fn test_strict_allows_text_content() {
        let tree = sample_tree();
        let item = XdmItem::Node(tree.node(1));
        assert!(atomize_item(&item, AtomizeMode::Strict).is_ok());
        // A childless element is not element-only content.
        let empty = XdmItem::Node(tree.node(5));
        assert!(atomize_item(&empty, AtomizeMode::Strict).is_ok());
    }

    #[test]
    fn test_array_flattens() {
        let arr: XdmArray<crate::node::tests::MockNode<'_>> = XdmArray::from_members(vec![
            XdmValue::from_integer(1),
            XdmValue::from_items(vec![
                XdmItem::Atomic(AtomicValue::Integer(2)),
                XdmItem::Atomic(AtomicValue::Integer(3)),
            ]),
        ]);
        let atoms = atomize_item(&XdmItem::Array(arr), AtomizeMode::Lenient).unwrap();
        assert_eq!(atoms.len(), 3);
    }

    #[test]
    fn test_map_fails() {
        let map: XdmMap<crate::node::tests::MockNode<'_>> = XdmMap::new();
        assert!(atomize_item(&XdmItem::Map(map), AtomizeMode::Lenient).is_err());
    }

    #[test]
    fn test_single_contract() {
        let empty: XdmValue<crate::node::tests::MockNode<'_>> = XdmValue::empty();
        assert!(atomize_single(&empty, AtomizeMode::Lenient).is_err());
        assert_eq!(atomize_optional(&empty, AtomizeMode::Lenient), Ok(None));

        let two: XdmValue<crate::node::tests::MockNode<'_>> = XdmValue::from_items(vec![
            XdmItem::Atomic(AtomicValue::Integer(1)),
            XdmItem::Atomic(AtomicValue::Integer(2)),
        ]);
        assert!(atomize_single(&two, AtomizeMode::Lenient).is_err());
    }

    #[test]
    fn test_first_failure_wins() {
        let map: XdmMap<crate::node::tests::MockNode<'_>> = XdmMap::new();
        let mixed = XdmValue::from_items(vec![
            XdmItem::Atomic(AtomicValue::Integer(1)),
            XdmItem::Map(map),
        ]);
        assert!(atomize_value(&mixed, AtomizeMode::Lenient).is_err());
    }
}
