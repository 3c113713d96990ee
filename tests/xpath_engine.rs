//! End-to-end tests: tokenize, parse under a selected grammar version,
//! evaluate against a roxmltree document.

mod common;

use std::collections::HashMap;
use std::sync::Arc;

use common::{XmlDocument, XmlNode};
use oxipath::{
    AtomicValue, Error, EvaluationContext, ExtensionFunction, Parser, ParserOptions,
    XPathVersion, XdmItem, XdmNode, XdmValue,
};

const CATALOG: &str = r#"<catalog>
  <book id="b1" lang="en">
    <title>The Art of XPath</title>
    <price>29.99</price>
  </book>
  <book id="b2" lang="de">
    <title>Sequenzen und Typen</title>
    <price>35.50</price>
  </book>
  <book id="b3" lang="en">
    <title>Maps and Arrays</title>
    <price>19.00</price>
  </book>
</catalog>"#;

fn eval_version<'a>(
    input: &str,
    doc: &'a XmlDocument<'a>,
    version: XPathVersion,
) -> Result<XdmValue<XmlNode<'a, 'a>>, Error> {
    let options = ParserOptions::new().with_version(version);
    let compiled = Parser::new(options)?.parse(input)?;
    let variables = HashMap::new();
    let root = doc.root_node();
    let ctx = EvaluationContext::new(Some(XdmItem::Node(root)), Some(root), &variables);
    compiled.evaluate(&ctx)
}

fn eval<'a>(input: &str, doc: &'a XmlDocument<'a>) -> XdmValue<XmlNode<'a, 'a>> {
    eval_version(input, doc, XPathVersion::V3_1).unwrap()
}

#[test]
fn arithmetic_under_the_10_grammar() {
    let doc = XmlDocument::parse("<x/>").unwrap();
    let result = eval_version("2 + 3 * 4", &doc, XPathVersion::V1_0).unwrap();
    assert_eq!(result, XdmValue::from_integer(14));
    let result = eval_version("10 - 3 - 2", &doc, XPathVersion::V1_0).unwrap();
    assert_eq!(result, XdmValue::from_integer(5));
}

#[test]
fn conditional_under_the_20_grammar() {
    let doc = XmlDocument::parse("<x/>").unwrap();
    let result = eval_version("if (1 < 2) then 'yes' else 'no'", &doc, XPathVersion::V2_0)
        .unwrap();
    assert_eq!(result, XdmValue::from_string("yes"));
}

#[test]
fn quantifiers_under_the_20_grammar() {
    let doc = XmlDocument::parse("<x/>").unwrap();
    let t = |input: &str| {
        eval_version(input, &doc, XPathVersion::V2_0)
            .unwrap()
            .effective_boolean_value()
    };
    assert!(t("some $x in (1,2,3) satisfies $x > 2"));
    assert!(t("every $x in (1,2,3) satisfies $x > 0"));
    assert!(!t("some $x in () satisfies $x > 2"));
    assert!(t("every $x in () satisfies $x > 2"));
}

#[test]
fn typed_collection_tests_under_the_31_grammar() {
    let doc = XmlDocument::parse("<x/>").unwrap();
    let t = |input: &str| eval(input, &doc).effective_boolean_value();
    assert!(t("map { 'key': 1, 'other': 2 } instance of map(*)"));
    assert!(!t("'string' instance of map(*)"));
    assert!(t("[1,2,3] instance of array(xs:integer)"));
    assert!(!t("['a','b'] instance of array(xs:integer)"));
    assert!(t("[] instance of array(xs:integer)"));
    assert!(!t("[1,2,3] instance of map(*)"));
    assert!(!t("map { 1: 2 } instance of array(*)"));
}

#[test]
fn casting_special_literals() {
    let doc = XmlDocument::parse("<x/>").unwrap();
    assert_eq!(
        eval("'INF' cast as xs:double", &doc),
        XdmValue::from_double(f64::INFINITY)
    );
    let err = eval_version("'not-a-number' cast as xs:integer", &doc, XPathVersion::V3_1)
        .unwrap_err();
    assert!(matches!(err, Error::Cast { .. }));
}

#[test]
fn version_gating_is_a_construction_error() {
    let options = ParserOptions::new().with_version(XPathVersion::V2_0);
    assert!(matches!(Parser::xpath10(options), Err(Error::Config(_))));

    let options = ParserOptions::new()
        .with_version(XPathVersion::V2_0)
        .with_strict(false);
    assert!(Parser::xpath10(options).is_ok());
}

#[test]
fn child_steps_and_predicates() {
    let doc = XmlDocument::parse(CATALOG).unwrap();
    assert_eq!(eval("count(catalog/book)", &doc), XdmValue::from_integer(3));
    assert_eq!(
        eval("catalog/book[@lang = 'en']", &doc).len(),
        2
    );
    assert_eq!(
        eval("string(catalog/book[2]/title)", &doc),
        XdmValue::from_string("Sequenzen und Typen")
    );
    assert_eq!(
        eval("string(catalog/book[@id = 'b3']/price)", &doc),
        XdmValue::from_string("19.00")
    );
}

#[test]
fn descendant_axis_and_positional_last() {
    let doc = XmlDocument::parse(CATALOG).unwrap();
    assert_eq!(eval("count(//title)", &doc), XdmValue::from_integer(3));
    assert_eq!(
        eval("string(//book[last()]/title)", &doc),
        XdmValue::from_string("Maps and Arrays")
    );
    assert_eq!(
        eval("string((//price)[1])", &doc),
        XdmValue::from_string("29.99")
    );
}

#[test]
fn attribute_axis_and_comparisons() {
    let doc = XmlDocument::parse(CATALOG).unwrap();
    assert_eq!(eval("count(//book/@id)", &doc), XdmValue::from_integer(3));
    // Untyped attribute content compares numerically against numbers.
    assert_eq!(
        eval("count(//book[price > 20])", &doc),
        XdmValue::from_integer(2)
    );
}

#[test]
fn union_yields_document_order_without_duplicates() {
    let doc = XmlDocument::parse(CATALOG).unwrap();
    let result = eval("//price | //title | //title", &doc);
    assert_eq!(result.len(), 6);
    let names: Vec<String> = result
        .items()
        .iter()
        .filter_map(|item| item.as_node())
        .filter_map(|n| n.name())
        .map(|n| n.local_part.to_string())
        .collect();
    assert_eq!(
        names,
        ["title", "price", "title", "price", "title", "price"]
    );
}

#[test]
fn reverse_axes() {
    let doc = XmlDocument::parse(CATALOG).unwrap();
    assert_eq!(
        eval("string(//book[2]/preceding-sibling::book/title)", &doc),
        XdmValue::from_string("The Art of XPath")
    );
    assert_eq!(
        eval("count(//price/ancestor::*)", &doc),
        // catalog plus the three book elements.
        XdmValue::from_integer(4)
    );
}

#[test]
fn for_over_nodes_with_atomization() {
    let doc = XmlDocument::parse(CATALOG).unwrap();
    let result = eval(
        "for $p in //price return number($p) * 2",
        &doc,
    );
    assert_eq!(result.len(), 3);
    assert_eq!(
        result.items()[0],
        XdmItem::Atomic(AtomicValue::Double(59.98))
    );
}

#[test]
fn sequence_functions_over_node_content() {
    let doc = XmlDocument::parse(CATALOG).unwrap();
    assert_eq!(
        eval("string-join(//book/@lang, ',')", &doc),
        XdmValue::from_string("en,de,en")
    );
    assert_eq!(
        eval("count(distinct-values(//book/@lang))", &doc),
        XdmValue::from_integer(2)
    );
}

#[test]
fn map_built_from_document_content() {
    let doc = XmlDocument::parse(CATALOG).unwrap();
    let result = eval(
        "let $m := map:merge(for $b in //book return map { string($b/@id): string($b/title) }) \
         return $m?b2",
        &doc,
    );
    assert_eq!(result, XdmValue::from_string("Sequenzen und Typen"));
}

#[test]
fn document_lookup_reads_injected_documents() {
    let main = XmlDocument::parse("<x/>").unwrap();
    let other = XmlDocument::parse("<other><v>42</v></other>").unwrap();

    let options = ParserOptions::new().with_version(XPathVersion::V3_1);
    let compiled = Parser::new(options)
        .unwrap()
        .parse("string(doc('other.xml')//v)")
        .unwrap();

    let variables = HashMap::new();
    let root = main.root_node();
    let mut documents = HashMap::new();
    documents.insert("other.xml".to_string(), other.root_node());
    let ctx = EvaluationContext::new(Some(XdmItem::Node(root)), Some(root), &variables)
        .with_documents(documents);

    assert_eq!(compiled.evaluate(&ctx).unwrap(), XdmValue::from_string("42"));

    // A missing document is the empty sequence, not an error.
    let compiled = Parser::new(ParserOptions::new().with_version(XPathVersion::V3_1))
        .unwrap()
        .parse("doc('absent.xml')")
        .unwrap();
    assert!(compiled.evaluate(&ctx).unwrap().is_empty());
}

#[test]
fn extension_functions_through_the_full_pipeline() {
    let shout = ExtensionFunction::new(
        "shout",
        1,
        1,
        Arc::new(|args| {
            let text = args[0]
                .first()
                .map(|a| a.to_string_value())
                .unwrap_or_default();
            Ok(vec![AtomicValue::String(format!("{}!", text.to_uppercase()))])
        }),
        "uppercases and emphasizes its argument",
    );

    let doc = XmlDocument::parse(CATALOG).unwrap();
    let options = ParserOptions::new()
        .with_version(XPathVersion::V3_1)
        .with_extensions(vec![shout]);
    let compiled = Parser::new(options)
        .unwrap()
        .parse("shout(//book[1]/title)")
        .unwrap();

    let variables = HashMap::new();
    let root = doc.root_node();
    let ctx = EvaluationContext::new(Some(XdmItem::Node(root)), Some(root), &variables);
    assert_eq!(
        compiled.evaluate(&ctx).unwrap(),
        XdmValue::from_string("THE ART OF XPATH!")
    );
}

#[test]
fn treat_as_raises_where_instance_of_reports() {
    let doc = XmlDocument::parse(CATALOG).unwrap();
    assert!(!eval("//book instance of element()", &doc).effective_boolean_value());
    assert!(eval("//book instance of element()+", &doc).effective_boolean_value());
    let err = eval_version("//book treat as element()", &doc, XPathVersion::V3_1).unwrap_err();
    assert!(matches!(err, Error::Type(_)));
}

#[test]
fn higher_order_pipeline() {
    let doc = XmlDocument::parse(CATALOG).unwrap();
    let result = eval(
        "let $titles := function($lang) { //book[@lang = $lang]/title } \
         return count($titles('en'))",
        &doc,
    );
    assert_eq!(result, XdmValue::from_integer(2));
}
