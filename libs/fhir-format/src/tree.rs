//! Format-neutral element tree
//!
//! Every format reads into and writes from this tree. Property order is
//! preserved, primitives keep their id/extension metadata and scalars keep
//! their source text (`1.50` stays `1.50`).

/// How a property was (or must be) laid out on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Single,
    Array,
    /// Formats without array markers (XML): repeated elements only
    Unknown,
}

/// Scalar payload of a primitive
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Bool(bool),
    /// Number with its exact source text
    Number(String),
    String(String),
    /// Untyped text (XML attributes)
    Lexical(String),
}

impl Scalar {
    /// Text form of the scalar
    pub fn text(&self) -> &str {
        match self {
            Self::Bool(true) => "true",
            Self::Bool(false) => "false",
            Self::Number(s) | Self::String(s) | Self::Lexical(s) => s,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Lexical(_) => "text",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TreePrimitive {
    pub value: Option<Scalar>,
    pub id: Option<String>,
    pub extension: Vec<TreeElement>,
}

impl TreePrimitive {
    pub fn new(value: Scalar) -> Self {
        Self {
            value: Some(value),
            ..Default::default()
        }
    }

    pub fn has_metadata(&self) -> bool {
        self.id.is_some() || !self.extension.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TreeNode {
    Primitive(TreePrimitive),
    Element(TreeElement),
    /// Serialized XHTML fragment (`Narrative.div`)
    Xhtml(String),
}

impl TreeNode {
    pub fn as_element(&self) -> Option<&TreeElement> {
        match self {
            Self::Element(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_primitive(&self) -> Option<&TreePrimitive> {
        match self {
            Self::Primitive(p) => Some(p),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TreeProperty {
    pub name: String,
    pub shape: Shape,
    /// Written as an XML attribute
    pub xml_attr: bool,
    pub values: Vec<TreeNode>,
}

impl TreeProperty {
    pub fn new(name: impl Into<String>, shape: Shape, values: Vec<TreeNode>) -> Self {
        Self {
            name: name.into(),
            shape,
            xml_attr: false,
            values,
        }
    }

    /// Whether the property is written as an array
    pub fn is_array(&self) -> bool {
        match self.shape {
            Shape::Single => false,
            Shape::Array => true,
            Shape::Unknown => self.values.len() > 1,
        }
    }
}

/// A complex element or resource
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TreeElement {
    /// Set for resources (root or contained)
    pub resource_type: Option<String>,
    pub properties: Vec<TreeProperty>,
}

impl TreeElement {
    pub fn resource(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: Some(resource_type.into()),
            properties: Vec::new(),
        }
    }

    pub fn property(&self, name: &str) -> Option<&TreeProperty> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Append a node, merging with an existing property of the same name
    pub fn push_node(&mut self, name: &str, node: TreeNode) {
        match self.properties.iter_mut().find(|p| p.name == name) {
            Some(property) => property.values.push(node),
            None => self
                .properties
                .push(TreeProperty::new(name, Shape::Unknown, vec![node])),
        }
    }
}
