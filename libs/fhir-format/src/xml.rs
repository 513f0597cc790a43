//! FHIR XML format
//!
//! Mapping rules:
//! - Root element uses the resource type name in the FHIR namespace.
//! - Primitive values are encoded with the `value` attribute, primitive ids
//!   with an `id` attribute and extensions as child elements.
//! - Attribute-represented fields (`Element.id`, `Extension.url`) are written
//!   as attributes of their element.
//! - Contained resources are wrapped: `<contained><Encounter>...</Encounter></contained>`.
//! - XHTML is embedded as-is.

use crate::error::{FormatError, Result};
use crate::format::Format;
use crate::tree::{Scalar, Shape, TreeElement, TreeNode, TreePrimitive, TreeProperty};
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::name::QName;
use quick_xml::Writer;
use roxmltree::{Document, Node};
use std::borrow::Cow;
use std::io::Cursor;

const FHIR_NS: &str = "http://hl7.org/fhir";
const XHTML_NS: &str = "http://www.w3.org/1999/xhtml";

type XmlWriter = Writer<Cursor<Vec<u8>>>;

/// XML format over XML text
#[derive(Debug, Clone, Copy)]
pub struct XmlFormat {
    indent: Option<usize>,
}

impl Default for XmlFormat {
    fn default() -> Self {
        Self { indent: Some(2) }
    }
}

impl XmlFormat {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-line output
    pub fn compact() -> Self {
        Self { indent: None }
    }

    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = Some(indent);
        self
    }

    /// Parse XML text into the neutral tree
    pub fn read_str(&self, input: &str) -> Result<TreeElement> {
        let doc = Document::parse(input)?;
        let root = doc.root_element();
        let mut element = read_element(input, &root)?;
        element.resource_type = Some(root.tag_name().name().to_string());
        Ok(element)
    }
}

impl Format for XmlFormat {
    type Document = String;

    fn write(&self, tree: &TreeElement) -> Result<String> {
        let resource_type = tree
            .resource_type
            .as_deref()
            .ok_or(FormatError::MissingResourceType)?;

        let mut writer = match self.indent {
            Some(indent) => Writer::new_with_indent(Cursor::new(Vec::new()), b' ', indent),
            None => Writer::new(Cursor::new(Vec::new())),
        };
        write_element(&mut writer, resource_type, tree, Some(FHIR_NS))?;

        let bytes = writer.into_inner().into_inner();
        Ok(String::from_utf8(bytes)?)
    }

    fn read(&self, document: &String) -> Result<TreeElement> {
        self.read_str(document)
    }
}

fn write_element(
    writer: &mut XmlWriter,
    name: &str,
    element: &TreeElement,
    namespace: Option<&str>,
) -> Result<()> {
    let mut start = BytesStart::new(name);
    if let Some(ns) = namespace {
        start.push_attribute(("xmlns", ns));
    }

    for property in element.properties.iter().filter(|p| p.xml_attr) {
        let value = property
            .values
            .first()
            .and_then(TreeNode::as_primitive)
            .and_then(|p| p.value.as_ref());
        if let Some(value) = value {
            start.push_attribute(attribute(&property.name, value.text()));
        }
    }

    let children: Vec<&TreeProperty> = element.properties.iter().filter(|p| !p.xml_attr).collect();
    if children.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    writer.write_event(Event::Start(start))?;
    for property in children {
        for node in &property.values {
            write_node(writer, &property.name, node)?;
        }
    }
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn write_node(writer: &mut XmlWriter, name: &str, node: &TreeNode) -> Result<()> {
    match node {
        TreeNode::Primitive(primitive) => write_primitive(writer, name, primitive),
        TreeNode::Element(element) => match &element.resource_type {
            Some(resource_type) => {
                writer.write_event(Event::Start(BytesStart::new(name)))?;
                write_element(writer, resource_type, element, None)?;
                writer.write_event(Event::End(BytesEnd::new(name)))?;
                Ok(())
            }
            None => write_element(writer, name, element, None),
        },
        TreeNode::Xhtml(source) => {
            writer.write_event(Event::Text(BytesText::from_escaped(source.as_str())))?;
            Ok(())
        }
    }
}

fn write_primitive(writer: &mut XmlWriter, name: &str, primitive: &TreePrimitive) -> Result<()> {
    let mut elem = BytesStart::new(name);
    if let Some(id) = &primitive.id {
        elem.push_attribute(attribute("id", id));
    }
    if let Some(value) = &primitive.value {
        elem.push_attribute(attribute("value", value.text()));
    }

    if primitive.extension.is_empty() {
        writer.write_event(Event::Empty(elem))?;
        return Ok(());
    }

    writer.write_event(Event::Start(elem))?;
    for extension in &primitive.extension {
        write_element(writer, "extension", extension, None)?;
    }
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

/// Attribute with whitespace written as character references, which
/// attribute-value normalization leaves alone on the way back in
fn attribute<'a>(name: &'a str, value: &str) -> Attribute<'a> {
    let mut escaped = String::with_capacity(value.len());
    for c in quick_xml::escape::escape(value).chars() {
        match c {
            '\n' => escaped.push_str("&#10;"),
            '\r' => escaped.push_str("&#13;"),
            '\t' => escaped.push_str("&#9;"),
            c => escaped.push(c),
        }
    }
    Attribute {
        key: QName(name.as_bytes()),
        value: Cow::Owned(escaped.into_bytes()),
    }
}

fn read_element(source: &str, node: &Node) -> Result<TreeElement> {
    let mut element = TreeElement::default();

    for attribute in node.attributes() {
        if attribute.namespace().is_some() {
            continue;
        }
        let mut property = TreeProperty::new(
            attribute.name(),
            Shape::Single,
            vec![TreeNode::Primitive(TreePrimitive::new(Scalar::Lexical(
                attribute.value().to_string(),
            )))],
        );
        property.xml_attr = true;
        element.properties.push(property);
    }

    for child in node.children().filter(|c| c.is_element()) {
        let name = child.tag_name().name();
        let value = read_node(source, &child)?;
        element.push_node(name, value);
    }

    Ok(element)
}

fn read_node(source: &str, node: &Node) -> Result<TreeNode> {
    if node.tag_name().namespace() == Some(XHTML_NS) {
        let snippet = &source[node.range()];
        return Ok(TreeNode::Xhtml(snippet.to_string()));
    }

    // Anything beyond value/id attributes and extension children stays an
    // element so the decoder can apply its unknown-field policy
    if let Some(value) = node.attribute("value") {
        let plain_attributes = node
            .attributes()
            .all(|a| a.namespace().is_some() || matches!(a.name(), "value" | "id"));
        let plain_children = node
            .children()
            .filter(|c| c.is_element())
            .all(|c| c.tag_name().name() == "extension");

        if plain_attributes && plain_children {
            let mut primitive = TreePrimitive::new(Scalar::Lexical(value.to_string()));
            primitive.id = node.attribute("id").map(String::from);
            for child in node.children().filter(|c| c.is_element()) {
                primitive.extension.push(read_element(source, &child)?);
            }
            return Ok(TreeNode::Primitive(primitive));
        }
        return Ok(TreeNode::Element(read_element(source, node)?));
    }

    // A single child named like a type is a resource wrapper (`contained`)
    let mut elements = node.children().filter(|c| c.is_element());
    if let (Some(only), None) = (elements.next(), elements.next()) {
        let is_type_name = only
            .tag_name()
            .name()
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_uppercase());
        if is_type_name && node.attributes().len() == 0 {
            let mut resource = read_element(source, &only)?;
            resource.resource_type = Some(only.tag_name().name().to_string());
            return Ok(TreeNode::Element(resource));
        }
    }

    Ok(TreeNode::Element(read_element(source, node)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_values_ids_and_wrappers() {
        let mut coding = TreeElement::default();
        let mut id = TreeProperty::new(
            "id",
            Shape::Single,
            vec![TreeNode::Primitive(TreePrimitive::new(Scalar::String("c1".into())))],
        );
        id.xml_attr = true;
        coding.properties.push(id);
        coding.properties.push(TreeProperty::new(
            "code",
            Shape::Single,
            vec![TreeNode::Primitive(TreePrimitive::new(Scalar::String("C".into())))],
        ));

        let mut contained = TreeElement::resource("Encounter");
        contained.properties.push(TreeProperty::new(
            "status",
            Shape::Single,
            vec![TreeNode::Primitive(TreePrimitive::new(Scalar::String("planned".into())))],
        ));

        let mut root = TreeElement::resource("AuditEvent");
        root.properties.push(TreeProperty::new("contained", Shape::Array, vec![TreeNode::Element(contained)]));
        root.properties.push(TreeProperty::new("type", Shape::Single, vec![TreeNode::Element(coding)]));

        let xml = XmlFormat::compact().write(&root).unwrap();
        assert!(xml.starts_with(r#"<AuditEvent xmlns="http://hl7.org/fhir">"#));
        assert!(xml.contains(r#"<contained><Encounter><status value="planned"/></Encounter></contained>"#));
        assert!(xml.contains(r#"<type id="c1"><code value="C"/></type>"#));

        let back = XmlFormat::new().read_str(&xml).unwrap();
        assert_eq!(back.resource_type.as_deref(), Some("AuditEvent"));
        let contained = back.property("contained").unwrap().values[0].as_element().unwrap();
        assert_eq!(contained.resource_type.as_deref(), Some("Encounter"));
        let coding = back.property("type").unwrap().values[0].as_element().unwrap();
        assert!(coding.property("id").unwrap().xml_attr);
    }

    #[test]
    fn attribute_whitespace_survives_a_round_trip() {
        let mut root = TreeElement::resource("CodeSystem");
        root.properties.push(TreeProperty::new(
            "description",
            Shape::Single,
            vec![TreeNode::Primitive(TreePrimitive::new(Scalar::String(
                "line one\nline two\ttab\r\n\"quoted\" & <b>".into(),
            )))],
        ));

        let xml = XmlFormat::compact().write(&root).unwrap();
        assert!(xml.contains("line one&#10;line two&#9;tab&#13;&#10;"));

        let back = XmlFormat::new().read_str(&xml).unwrap();
        let description = back.property("description").unwrap().values[0]
            .as_primitive()
            .unwrap();
        assert_eq!(
            description.value.as_ref().unwrap().text(),
            "line one\nline two\ttab\r\n\"quoted\" & <b>"
        );
    }

    #[test]
    fn primitive_with_unknown_children_stays_an_element() {
        let xml = r#"<Goal xmlns="http://hl7.org/fhir"><lifecycleStatus value="active"><bogus value="1"/></lifecycleStatus></Goal>"#;
        let tree = XmlFormat::new().read_str(xml).unwrap();
        let status = tree.property("lifecycleStatus").unwrap().values[0]
            .as_element()
            .unwrap();
        assert!(status.property("value").unwrap().xml_attr);
        assert!(status.property("bogus").is_some());
    }

    #[test]
    fn xhtml_is_kept_verbatim() {
        let xml = r#"<CodeSystem xmlns="http://hl7.org/fhir"><text><status value="generated"/><div xmlns="http://www.w3.org/1999/xhtml"><p>Hi <b>there</b></p></div></text></CodeSystem>"#;
        let tree = XmlFormat::new().read_str(xml).unwrap();
        let text = tree.property("text").unwrap().values[0].as_element().unwrap();
        match &text.property("div").unwrap().values[0] {
            TreeNode::Xhtml(source) => {
                assert_eq!(source, r#"<div xmlns="http://www.w3.org/1999/xhtml"><p>Hi <b>there</b></p></div>"#)
            }
            other => panic!("expected xhtml, got {:?}", other),
        }
    }
}
