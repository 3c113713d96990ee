//! SequenceType and ItemType descriptors and the conformance algorithm.
//!
//! Matching never fails with an error: it returns a [`TypeMatch`] and the
//! caller decides whether a mismatch is a boolean (`instance of`) or a
//! typed dynamic error (`treat as`).

use std::fmt;

use crate::ast::QName;
use crate::error::Error;
use crate::node::{NodeKind, XdmNode};
use crate::types::registry::AtomicType;
use crate::types::{AtomicValue, XdmItem};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Occurrence {
    ExactlyOne,
    ZeroOrOne,
    ZeroOrMore,
    OneOrMore,
}

impl Occurrence {
    pub fn indicator(self) -> &'static str {
        match self {
            Occurrence::ExactlyOne => "",
            Occurrence::ZeroOrOne => "?",
            Occurrence::ZeroOrMore => "*",
            Occurrence::OneOrMore => "+",
        }
    }

    pub fn allows_empty(self) -> bool {
        matches!(self, Occurrence::ZeroOrOne | Occurrence::ZeroOrMore)
    }

    pub fn accepts(self, count: usize) -> bool {
        match self {
            Occurrence::ExactlyOne => count == 1,
            Occurrence::ZeroOrOne => count <= 1,
            Occurrence::ZeroOrMore => true,
            Occurrence::OneOrMore => count >= 1,
        }
    }
}

/// A node-kind test usable both in steps and in ItemType position.
#[derive(Debug, Clone, PartialEq)]
pub enum KindTest {
    AnyKind,
    Document,
    Element(Option<QName>),
    Attribute(Option<QName>),
    Text,
    Comment,
    ProcessingInstruction(Option<String>),
}

impl KindTest {
    pub fn matches_node<'a, N: XdmNode<'a>>(&self, node: &N) -> bool {
        match self {
            KindTest::AnyKind => true,
            KindTest::Document => node.node_kind() == NodeKind::Root,
            KindTest::Element(name) => {
                node.node_kind() == NodeKind::Element && name_test_matches(name.as_ref(), node)
            }
            KindTest::Attribute(name) => {
                node.node_kind() == NodeKind::Attribute && name_test_matches(name.as_ref(), node)
            }
            KindTest::Text => node.node_kind() == NodeKind::Text,
            KindTest::Comment => node.node_kind() == NodeKind::Comment,
            KindTest::ProcessingInstruction(target) => {
                node.node_kind() == NodeKind::ProcessingInstruction
                    && target.as_ref().is_none_or(|t| {
                        node.name().is_some_and(|n| n.local_part == t.as_str())
                    })
            }
        }
    }

    fn name(&self) -> String {
        match self {
            KindTest::AnyKind => "node()".to_string(),
            KindTest::Document => "document-node()".to_string(),
            KindTest::Element(None) => "element()".to_string(),
            KindTest::Element(Some(q)) => format!("element({})", q),
            KindTest::Attribute(None) => "attribute()".to_string(),
            KindTest::Attribute(Some(q)) => format!("attribute({})", q),
            KindTest::Text => "text()".to_string(),
            KindTest::Comment => "comment()".to_string(),
            KindTest::ProcessingInstruction(None) => "processing-instruction()".to_string(),
            KindTest::ProcessingInstruction(Some(t)) => {
                format!("processing-instruction({})", t)
            }
        }
    }
}

fn name_test_matches<'a, N: XdmNode<'a>>(expected: Option<&QName>, node: &N) -> bool {
    match expected {
        None => true,
        Some(q) => node.name().is_some_and(|n| {
            n.local_part == q.local_part && n.prefix.map(str::to_string) == q.prefix
        }),
    }
}

/// Key and value types of a `map(K, V)` test.
#[derive(Debug, Clone, PartialEq)]
pub struct MapTypeArgs {
    pub key: SequenceType,
    pub value: SequenceType,
}

/// The shape test for a single sequence item.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemType {
    /// `item()` — anything.
    Item,
    Atomic(AtomicType),
    Kind(KindTest),
    /// `function(*)` when `params` is `None`, else a typed function test.
    Function {
        params: Option<Vec<SequenceType>>,
        ret: Option<Box<SequenceType>>,
    },
    /// `map(*)` when `None`, else `map(K, V)`.
    Map(Option<Box<MapTypeArgs>>),
    /// `array(*)` when `None`, else `array(M)`.
    Array(Option<Box<SequenceType>>),
    Union(Vec<ItemType>),
}

impl ItemType {
    /// Builds a union type from its members. Nested unions are flattened
    /// and duplicate member types (by name) removed; fewer than two
    /// distinct members is a construction error, so callers must not wrap
    /// a single type.
    pub fn union(members: Vec<ItemType>) -> Result<ItemType, Error> {
        let mut flat: Vec<ItemType> = Vec::new();
        let mut seen: Vec<String> = Vec::new();
        let mut queue: Vec<ItemType> = members;
        queue.reverse();
        while let Some(member) = queue.pop() {
            match member {
                ItemType::Union(inner) => {
                    for m in inner.into_iter().rev() {
                        queue.push(m);
                    }
                }
                other => {
                    let name = other.name();
                    if !seen.contains(&name) {
                        seen.push(name);
                        flat.push(other);
                    }
                }
            }
        }
        if flat.len() < 2 {
            return Err(Error::type_error(
                "a union type requires at least two distinct member types",
            ));
        }
        Ok(ItemType::Union(flat))
    }

    /// A rendered name for diagnostics.
    pub fn name(&self) -> String {
        match self {
            ItemType::Item => "item()".to_string(),
            ItemType::Atomic(t) => t.qualified_name().to_string(),
            ItemType::Kind(k) => k.name(),
            ItemType::Function { params: None, .. } => "function(*)".to_string(),
            ItemType::Function {
                params: Some(params),
                ret,
            } => {
                let params = params.iter().map(|p| p.name()).collect::<Vec<_>>().join(", ");
                match ret {
                    Some(r) => format!("function({}) as {}", params, r.name()),
                    None => format!("function({})", params),
                }
            }
            ItemType::Map(None) => "map(*)".to_string(),
            ItemType::Map(Some(args)) => {
                format!("map({}, {})", args.key.name(), args.value.name())
            }
            ItemType::Array(None) => "array(*)".to_string(),
            ItemType::Array(Some(member)) => format!("array({})", member.name()),
            ItemType::Union(members) => {
                let names = members.iter().map(ItemType::name).collect::<Vec<_>>();
                format!("({})", names.join(" | "))
            }
        }
    }

    /// Whether one item conforms to this type.
    ///
    /// `map(*)` and `array(*)` are deliberately not universal wildcards:
    /// the item must still be a map / an array.
    pub fn matches<'a, N: XdmNode<'a>>(&self, item: &XdmItem<N>) -> bool {
        match self {
            ItemType::Item => true,
            ItemType::Atomic(target) => match item {
                XdmItem::Atomic(a) => atomic_matches(a, *target),
                _ => false,
            },
            ItemType::Kind(kind) => match item {
                XdmItem::Node(n) => kind.matches_node(n),
                _ => false,
            },
            ItemType::Function { params, .. } => match item {
                XdmItem::Function(f) => {
                    params.as_ref().is_none_or(|p| f.arity() == p.len())
                }
                _ => false,
            },
            ItemType::Map(args) => match item {
                XdmItem::Map(map) => match args {
                    None => true,
                    Some(args) => map.entries().all(|(key, value)| {
                        let key_item = [XdmItem::Atomic(key.clone())];
                        matches_sequence_type::<N>(&key_item, &args.key).matches
                            && matches_sequence_type(value.items(), &args.value).matches
                    }),
                },
                _ => false,
            },
            ItemType::Array(member_type) => match item {
                XdmItem::Array(array) => match member_type {
                    None => true,
                    Some(member_type) => array
                        .members()
                        .iter()
                        .all(|m| matches_sequence_type(m.items(), member_type).matches),
                },
                _ => false,
            },
            ItemType::Union(members) => members.iter().any(|m| m.matches(item)),
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Atomic conformance: nominal derivation first, then the structural
/// check for derived restrictions the runtime value model cannot tag
/// (bounded integers, derived strings).
fn atomic_matches(value: &AtomicValue, target: AtomicType) -> bool {
    if target == AtomicType::AnyAtomicType {
        return true;
    }
    let dynamic = value.atomic_type();
    if dynamic.derives_from(target) {
        return true;
    }
    target.derives_from(dynamic.primitive()) && target.validate(&value.to_string_value())
}

/// The type of a whole sequence: either the empty-sequence marker, or an
/// item type with a cardinality. The marker carries no occurrence, so the
/// invariant "empty-sequence implies exactly the empty sequence" cannot be
/// violated by construction.
#[derive(Debug, Clone, PartialEq)]
pub enum SequenceType {
    Empty,
    Of {
        item_type: ItemType,
        occurrence: Occurrence,
    },
}

impl SequenceType {
    pub fn one(item_type: ItemType) -> Self {
        Self::Of {
            item_type,
            occurrence: Occurrence::ExactlyOne,
        }
    }

    pub fn zero_or_one(item_type: ItemType) -> Self {
        Self::Of {
            item_type,
            occurrence: Occurrence::ZeroOrOne,
        }
    }

    pub fn zero_or_more(item_type: ItemType) -> Self {
        Self::Of {
            item_type,
            occurrence: Occurrence::ZeroOrMore,
        }
    }

    pub fn one_or_more(item_type: ItemType) -> Self {
        Self::Of {
            item_type,
            occurrence: Occurrence::OneOrMore,
        }
    }

    pub fn name(&self) -> String {
        match self {
            SequenceType::Empty => "empty-sequence()".to_string(),
            SequenceType::Of {
                item_type,
                occurrence,
            } => format!("{}{}", item_type.name(), occurrence.indicator()),
        }
    }
}

impl fmt::Display for SequenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// The outcome of a conformance check.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeMatch {
    pub matches: bool,
    pub reason: Option<String>,
    pub item_count: usize,
}

impl TypeMatch {
    fn ok(item_count: usize) -> Self {
        Self {
            matches: true,
            reason: None,
            item_count,
        }
    }

    fn fail(reason: String, item_count: usize) -> Self {
        Self {
            matches: false,
            reason: Some(reason),
            item_count,
        }
    }
}

/// Tests a sequence against a SequenceType: empty-sequence handling
/// first, then every item against the ItemType (first failure reported
/// with its index), then cardinality.
pub fn matches_sequence_type<'a, N: XdmNode<'a>>(
    items: &[XdmItem<N>],
    sequence_type: &SequenceType,
) -> TypeMatch {
    let count = items.len();
    let (item_type, occurrence) = match sequence_type {
        SequenceType::Empty => {
            return if count == 0 {
                TypeMatch::ok(0)
            } else {
                TypeMatch::fail(
                    format!("expected empty-sequence(), got {} items", count),
                    count,
                )
            };
        }
        SequenceType::Of {
            item_type,
            occurrence,
        } => (item_type, *occurrence),
    };

    if count == 0 {
        return if occurrence.allows_empty() {
            TypeMatch::ok(0)
        } else {
            TypeMatch::fail(
                format!("empty sequence not allowed for {}", sequence_type.name()),
                0,
            )
        };
    }

    for (index, item) in items.iter().enumerate() {
        if !item_type.matches(item) {
            return TypeMatch::fail(
                format!(
                    "item {} ({}) does not match {}",
                    index + 1,
                    render_item(item),
                    item_type.name()
                ),
                count,
            );
        }
    }

    if !occurrence.accepts(count) {
        return TypeMatch::fail(
            format!(
                "cardinality {} does not fit {}{}",
                count,
                item_type.name(),
                occurrence.indicator()
            ),
            count,
        );
    }

    TypeMatch::ok(count)
}

fn render_item<'a, N: XdmNode<'a>>(item: &XdmItem<N>) -> String {
    match item {
        XdmItem::Atomic(a) => format!("{}: '{}'", a.type_name(), a.to_string_value()),
        other => other.type_name().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{XdmArray, XdmMap, XdmValue};

    type Item = XdmItem<crate::node::tests::MockNode<'static>>;

    fn int(i: i64) -> Item {
        XdmItem::Atomic(AtomicValue::Integer(i))
    }

    fn string(s: &str) -> Item {
        XdmItem::Atomic(AtomicValue::String(s.into()))
    }

    fn integer_seq(occurrence: Occurrence) -> SequenceType {
        SequenceType::Of {
            item_type: ItemType::Atomic(AtomicType::Integer),
            occurrence,
        }
    }

    #[test]
    fn test_cardinality_rules() {
        let items = [int(1), int(2)];
        assert!(!matches_sequence_type(&items, &integer_seq(Occurrence::ExactlyOne)).matches);
        assert!(!matches_sequence_type(&items, &integer_seq(Occurrence::ZeroOrOne)).matches);
        assert!(matches_sequence_type(&items, &integer_seq(Occurrence::ZeroOrMore)).matches);
        assert!(matches_sequence_type(&items, &integer_seq(Occurrence::OneOrMore)).matches);

        let empty: [Item; 0] = [];
        assert!(!matches_sequence_type(&empty, &integer_seq(Occurrence::ExactlyOne)).matches);
        assert!(matches_sequence_type(&empty, &integer_seq(Occurrence::ZeroOrOne)).matches);
        assert!(matches_sequence_type(&empty, &integer_seq(Occurrence::ZeroOrMore)).matches);
        assert!(!matches_sequence_type(&empty, &integer_seq(Occurrence::OneOrMore)).matches);
    }

    #[test]
    fn test_match_is_item_conjunction_and_cardinality() {
        // matches == (every item matches) && (length fits occurrence),
        // swept over occurrence x length x item-validity.
        let occurrences = [
            Occurrence::ExactlyOne,
            Occurrence::ZeroOrOne,
            Occurrence::ZeroOrMore,
            Occurrence::OneOrMore,
        ];
        for occurrence in occurrences {
            for len in 0..5usize {
                let all_ints: Vec<Item> = (0..len as i64).map(int).collect();
                let result = matches_sequence_type(&all_ints, &integer_seq(occurrence));
                assert_eq!(result.matches, occurrence.accepts(len));
                assert_eq!(result.item_count, len);

                if len > 0 {
                    let mut tainted = all_ints;
                    tainted[len - 1] = string("x");
                    assert!(!matches_sequence_type(&tainted, &integer_seq(occurrence)).matches);
                }
            }
        }
    }

    #[test]
    fn test_empty_sequence_marker() {
        let empty: [Item; 0] = [];
        assert!(matches_sequence_type(&empty, &SequenceType::Empty).matches);
        let result = matches_sequence_type(&[int(1)], &SequenceType::Empty);
        assert!(!result.matches);
        assert_eq!(result.item_count, 1);
        assert!(result.reason.is_some());
    }

    #[test]
    fn test_failure_reports_index() {
        let items = [int(1), string("x"), int(3)];
        let result = matches_sequence_type(&items, &integer_seq(Occurrence::ZeroOrMore));
        assert!(!result.matches);
        let reason = result.reason.unwrap();
        assert!(reason.contains("item 2"), "reason was: {}", reason);
        assert!(reason.contains("xs:integer"), "reason was: {}", reason);
    }

    #[test]
    fn test_item_wildcard_matches_everything() {
        let st = SequenceType::zero_or_more(ItemType::Item);
        let map: Item = XdmItem::Map(XdmMap::new());
        let array: Item = XdmItem::Array(XdmArray::new());
        assert!(matches_sequence_type(&[int(1), string("a"), map, array], &st).matches);
    }

    #[test]
    fn test_map_wildcard_requires_map() {
        let st = SequenceType::one(ItemType::Map(None));
        let map: Item = XdmItem::Map(XdmMap::new());
        let array: Item = XdmItem::Array(XdmArray::new());
        assert!(matches_sequence_type(&[map], &st).matches);
        assert!(!matches_sequence_type(&[array], &st).matches);
        assert!(!matches_sequence_type(&[string("x")], &st).matches);
    }

    #[test]
    fn test_array_wildcard_requires_array() {
        let st = SequenceType::one(ItemType::Array(None));
        let map: Item = XdmItem::Map(XdmMap::new());
        let array: Item = XdmItem::Array(XdmArray::new());
        assert!(matches_sequence_type(&[array], &st).matches);
        assert!(!matches_sequence_type(&[map], &st).matches);
        assert!(!matches_sequence_type(&[int(1)], &st).matches);
    }

    #[test]
    fn test_typed_map_checks_keys_and_values() {
        let typed = ItemType::Map(Some(Box::new(MapTypeArgs {
            key: SequenceType::one(ItemType::Atomic(AtomicType::String)),
            value: SequenceType::one(ItemType::Atomic(AtomicType::Integer)),
        })));

        let good: Item = XdmItem::Map(XdmMap::from_entries(vec![
            (AtomicValue::String("a".into()), XdmValue::from_integer(1)),
            (AtomicValue::String("b".into()), XdmValue::from_integer(2)),
        ]));
        assert!(typed.matches(&good));

        let bad_value: Item = XdmItem::Map(XdmMap::from_entries(vec![(
            AtomicValue::String("a".into()),
            XdmValue::from_string("not-an-int"),
        )]));
        assert!(!typed.matches(&bad_value));

        let bad_key: Item = XdmItem::Map(XdmMap::from_entries(vec![(
            AtomicValue::Boolean(true),
            XdmValue::from_integer(1),
        )]));
        assert!(!typed.matches(&bad_key));

        // Vacuous truth: an empty map matches any map(K, V).
        let empty: Item = XdmItem::Map(XdmMap::new());
        assert!(typed.matches(&empty));
    }

    #[test]
    fn test_typed_array_checks_members() {
        let typed = ItemType::Array(Some(Box::new(SequenceType::one(ItemType::Atomic(
            AtomicType::Integer,
        )))));

        let good: Item = XdmItem::Array(XdmArray::from_members(vec![
            XdmValue::from_integer(1),
            XdmValue::from_integer(2),
        ]));
        assert!(typed.matches(&good));

        let bad: Item = XdmItem::Array(XdmArray::from_members(vec![
            XdmValue::from_string("a"),
        ]));
        assert!(!typed.matches(&bad));

        // Vacuous truth: an empty array matches any array(M).
        let empty: Item = XdmItem::Array(XdmArray::new());
        assert!(typed.matches(&empty));
    }

    #[test]
    fn test_union_is_member_disjunction() {
        let union = ItemType::union(vec![
            ItemType::Atomic(AtomicType::Integer),
            ItemType::Atomic(AtomicType::String),
        ])
        .unwrap();

        for value in [int(1), string("x")] {
            let a = ItemType::Atomic(AtomicType::Integer).matches(&value);
            let b = ItemType::Atomic(AtomicType::String).matches(&value);
            assert_eq!(union.matches(&value), a || b);
        }
        let boolean: Item = XdmItem::Atomic(AtomicValue::Boolean(true));
        assert!(!union.matches(&boolean));
    }

    #[test]
    fn test_union_construction_rules() {
        assert!(ItemType::union(vec![]).is_err());
        assert!(ItemType::union(vec![ItemType::Atomic(AtomicType::Integer)]).is_err());
        // Duplicates collapse, leaving a single member: also an error.
        assert!(
            ItemType::union(vec![
                ItemType::Atomic(AtomicType::Integer),
                ItemType::Atomic(AtomicType::Integer),
            ])
            .is_err()
        );
    }

    #[test]
    fn test_union_flattens_nested_members() {
        let inner = ItemType::union(vec![
            ItemType::Atomic(AtomicType::Integer),
            ItemType::Atomic(AtomicType::String),
        ])
        .unwrap();
        let outer = ItemType::union(vec![inner, ItemType::Atomic(AtomicType::Boolean)]).unwrap();
        match outer {
            ItemType::Union(members) => {
                assert_eq!(members.len(), 3);
                assert!(members.iter().all(|m| !matches!(m, ItemType::Union(_))));
            }
            other => panic!("expected a union, got {}", other.name()),
        }
    }

    #[test]
    fn test_derived_atomic_matching() {
        assert!(ItemType::Atomic(AtomicType::Decimal).matches(&int(5)));
        assert!(ItemType::Atomic(AtomicType::Byte).matches(&int(100)));
        assert!(!ItemType::Atomic(AtomicType::Byte).matches(&int(300)));
        let untyped: Item = XdmItem::Atomic(AtomicValue::UntypedAtomic("x".into()));
        assert!(!ItemType::Atomic(AtomicType::String).matches(&untyped));
    }
}
