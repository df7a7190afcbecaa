use std::collections::HashMap;

use markup_extract::builder::{write_skeleton, SkeletonBuffer, SkeletonPart};
use markup_extract::codec::generic;
use markup_extract::tokens::{StartTag, Token, TokenKind};
use markup_extract::{Event, ExtractedUnit, MarkupExtractor, RuleConfig};

const CONFIG: &str = r#"
exclude_by_default: false
preserve_whitespace: false
elements:
  p: { kind: text_unit }
  h1: { kind: text_unit }
  b: { kind: inline }
  i: { kind: inline }
  img: { kind: inline }
  script: { kind: excluded }
  excluded_tag: { kind: excluded }
  included_tag: { kind: included }
  table: { kind: group }
preserve_whitespace_elements: [pre]
"#;

fn extractor() -> MarkupExtractor {
    MarkupExtractor::new(RuleConfig::from_yaml_str(CONFIG).unwrap())
}

fn start(name: &str, raw: &str) -> Token {
    Token::new(TokenKind::StartTag(StartTag::named(name, raw, false)))
}

fn empty(name: &str, raw: &str) -> Token {
    Token::new(TokenKind::StartTag(StartTag::named(name, raw, true)))
}

fn end(name: &str, raw: &str) -> Token {
    Token::new(TokenKind::EndTag {
        name: name.to_string(),
        raw: raw.to_string(),
    })
}

fn text(content: &str) -> Token {
    Token::new(TokenKind::Text(content.to_string()))
}

fn units(events: &[Event]) -> Vec<&ExtractedUnit> {
    events
        .iter()
        .filter_map(|event| match event {
            Event::TextUnit(unit) => Some(unit),
            _ => None,
        })
        .collect()
}

#[test]
fn document_splits_into_units_and_skeleton() {
    let mut extractor = extractor();
    let events = extractor
        .extract(vec![
            Token::new(TokenKind::DocType("<!DOCTYPE html>".to_string())),
            start("h1", "<h1>"),
            text("Title"),
            end("h1", "</h1>"),
            text("\n"),
            start("p", "<p>"),
            text("Body with "),
            start("b", "<b>"),
            text("bold"),
            end("b", "</b>"),
            text(" text."),
            end("p", "</p>"),
        ])
        .unwrap();

    let units = units(&events);
    assert_eq!(units.len(), 2);
    assert_eq!(units[0].fragment.plain_text(), "Title");
    assert_eq!(
        generic::encode(&units[1].fragment),
        "Body with <1>bold</1> text."
    );

    let mut skeleton = SkeletonBuffer::new();
    write_skeleton(&events, &mut skeleton);
    assert_eq!(
        skeleton.parts(),
        &[
            SkeletonPart::Literal("<!DOCTYPE html><h1>".to_string()),
            SkeletonPart::Placeholder(0),
            SkeletonPart::Literal("</h1>\n<p>".to_string()),
            SkeletonPart::Placeholder(1),
            SkeletonPart::Literal("</p>".to_string()),
        ]
    );
}

#[test]
fn included_overrides_enclosing_excluded() {
    let mut extractor = extractor();
    let events = extractor
        .extract(vec![
            start("excluded_tag", "<excluded_tag>"),
            start("included_tag", "<included_tag>"),
            text("text"),
            end("included_tag", "</included_tag>"),
            end("excluded_tag", "</excluded_tag>"),
        ])
        .unwrap();

    let units = units(&events);
    assert_eq!(units.len(), 1);
    assert_eq!(units[0].fragment.plain_text(), "text");
}

#[test]
fn excluded_script_replays_byte_for_byte() {
    let mut extractor = extractor();
    let events = extractor
        .extract(vec![
            start("script", "<script>"),
            text("if (a < b) { run(); }"),
            end("script", "</script>"),
        ])
        .unwrap();

    assert!(units(&events).is_empty());
    let mut skeleton = SkeletonBuffer::new();
    write_skeleton(&events, &mut skeleton);
    assert_eq!(
        skeleton.parts(),
        &[SkeletonPart::Literal(
            "<script>if (a < b) { run(); }</script>".to_string()
        )]
    );
}

#[test]
fn mid_unit_excluded_element_splits_the_unit() {
    let mut extractor = extractor();
    let events = extractor
        .extract(vec![
            start("p", "<p>"),
            text("one"),
            start("script", "<script>"),
            text("var x;"),
            end("script", "</script>"),
            text("two"),
            end("p", "</p>"),
        ])
        .unwrap();

    let units = units(&events);
    assert_eq!(units.len(), 2);
    assert_eq!(units[0].fragment.plain_text(), "one");
    assert_eq!(units[1].fragment.plain_text(), "two");

    // The script keeps its position between the two halves of the paragraph.
    let mut skeleton = SkeletonBuffer::new();
    write_skeleton(&events, &mut skeleton);
    assert_eq!(
        skeleton.parts(),
        &[
            SkeletonPart::Literal("<p>".to_string()),
            SkeletonPart::Placeholder(0),
            SkeletonPart::Literal("<script>var x;</script>".to_string()),
            SkeletonPart::Placeholder(1),
            SkeletonPart::Literal("</p>".to_string()),
        ]
    );
}

#[test]
fn groups_nest_around_units() {
    let mut extractor = extractor();
    let events = extractor
        .extract(vec![
            start("table", "<table>"),
            start("p", "<p>"),
            text("cell"),
            end("p", "</p>"),
            end("table", "</table>"),
        ])
        .unwrap();

    let shape: Vec<&str> = events
        .iter()
        .map(|event| match event {
            Event::TextUnit(_) => "unit",
            Event::DocumentPart(_) => "part",
            Event::StartGroup { .. } => "start-group",
            Event::EndGroup { .. } => "end-group",
        })
        .collect();
    assert_eq!(
        shape,
        ["part", "start-group", "part", "unit", "part", "end-group"]
    );
}

#[test]
fn self_closing_inline_becomes_placeholder_code() {
    let mut extractor = extractor();
    let events = extractor
        .extract(vec![
            start("p", "<p>"),
            text("see "),
            empty("img", "<img src=\"x.png\"/>"),
            text(" here"),
            end("p", "</p>"),
        ])
        .unwrap();

    let units = units(&events);
    let fragment = &units[0].fragment;
    assert_eq!(generic::encode(fragment), "see <1/> here");
    assert_eq!(fragment.codes()[0].data, "<img src=\"x.png\"/>");
}

#[test]
fn unit_name_comes_from_id_attribute() {
    let mut tag = StartTag::named("p", "<p id=\"intro\">", false);
    tag.attributes.insert("id".to_string(), "intro".to_string());
    let mut extractor = extractor();
    let events = extractor
        .extract(vec![
            Token::new(TokenKind::StartTag(tag)),
            text("first"),
            end("p", "</p>"),
        ])
        .unwrap();

    let units = units(&events);
    assert_eq!(units[0].name.as_deref(), Some("intro"));
    assert_eq!(units[0].unit_type.as_deref(), Some("p"));
}

#[test]
fn xml_space_preserve_suppresses_normalization() {
    let mut tag = StartTag::named("p", "<p xml:space=\"preserve\">", false);
    tag.attributes
        .insert("xml:space".to_string(), "preserve".to_string());
    let mut extractor = extractor();
    let events = extractor
        .extract(vec![
            Token::new(TokenKind::StartTag(tag)),
            text("  keep\nthis  "),
            end("p", "</p>"),
        ])
        .unwrap();

    let units = units(&events);
    assert!(units[0].preserve_whitespace);
    assert_eq!(units[0].fragment.plain_text(), "  keep\nthis  ");
}

#[test]
fn reset_allows_a_second_document() {
    let mut extractor = extractor();
    extractor
        .extract(vec![start("p", "<p>"), text("one"), end("p", "</p>")])
        .unwrap();

    extractor.reset();
    let events = extractor
        .extract(vec![start("p", "<p>"), text("two"), end("p", "</p>")])
        .unwrap();

    let units = units(&events);
    assert_eq!(units.len(), 1);
    assert_eq!(units[0].id, 0);
    assert_eq!(units[0].fragment.plain_text(), "two");
}

#[test]
fn cdata_outside_a_unit_is_its_own_unit() {
    let mut extractor = extractor();
    let events = extractor
        .extract(vec![Token::new(TokenKind::Cdata {
            content: "raw text".to_string(),
            raw: "<![CDATA[raw text]]>".to_string(),
        })])
        .unwrap();

    let units = units(&events);
    assert_eq!(units.len(), 1);
    assert_eq!(units[0].fragment.plain_text(), "raw text");
    assert_eq!(units[0].unit_type.as_deref(), Some("cdata"));

    let mut skeleton = SkeletonBuffer::new();
    write_skeleton(&events, &mut skeleton);
    assert_eq!(
        skeleton.parts(),
        &[
            SkeletonPart::Literal("<![CDATA[".to_string()),
            SkeletonPart::Placeholder(0),
            SkeletonPart::Literal("]]>".to_string()),
        ]
    );
}

#[test]
fn attribute_conditions_read_the_start_tag() {
    let config = RuleConfig::from_yaml_str(
        r#"
elements:
  p: { kind: text_unit }
  span:
    kind: inline
    conditions:
      - { attribute: class, compare: equals, values: [code] }
"#,
    )
    .unwrap();

    let mut attributes = HashMap::new();
    attributes.insert("class".to_string(), "code".to_string());
    let mut tag = StartTag::named("span", "<span class=\"code\">", false);
    tag.attributes = attributes;

    let mut extractor = MarkupExtractor::new(config);
    let events = extractor
        .extract(vec![
            start("p", "<p>"),
            text("a "),
            Token::new(TokenKind::StartTag(tag)),
            text("x"),
            end("span", "</span>"),
            end("p", "</p>"),
        ])
        .unwrap();

    let units = units(&events);
    assert_eq!(generic::encode(&units[0].fragment), "a <1>x</1>");
}
