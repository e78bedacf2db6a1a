//! Stream schemas and the resolver that derives them from definition text.
//!
//! A stream has no life of its own in a plan: it is a name shared between
//! the components that write it and the components that read it. The only
//! structure the graph builder ever needs from a stream is its id and the
//! ordered attribute names, which [`SchemaResolver`] extracts from the
//! declared definition.

use crate::error::{CoreError, CoreResult};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

static STREAM_DEFINITION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?is)^\s*(?:@[A-Za-z_][\w.]*\s*(?:\([^)]*\))?\s*)*define\s+stream\s+([A-Za-z_][A-Za-z0-9_]*)\s*\((.*)\)\s*;?\s*$",
    )
    .expect("stream definition pattern is valid")
});

static ATTRIBUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*)\s+([A-Za-z]+)$").expect("attribute pattern is valid")
});

/// Attribute value type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeType {
    /// UTF-8 string
    String,
    /// 32-bit integer
    Int,
    /// 64-bit integer
    Long,
    /// 32-bit float
    Float,
    /// 64-bit float
    Double,
    /// Boolean
    Bool,
    /// Opaque object
    Object,
}

impl AttributeType {
    /// Parse a type keyword, ignoring case
    #[must_use]
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword.to_ascii_lowercase().as_str() {
            "string" => Some(Self::String),
            "int" => Some(Self::Int),
            "long" => Some(Self::Long),
            "float" => Some(Self::Float),
            "double" => Some(Self::Double),
            "bool" => Some(Self::Bool),
            "object" => Some(Self::Object),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keyword = match self {
            Self::String => "string",
            Self::Int => "int",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
            Self::Bool => "bool",
            Self::Object => "object",
        };
        f.write_str(keyword)
    }
}

/// A named, typed stream attribute
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Attribute {
    /// Attribute name
    pub name: String,
    /// Attribute type
    #[serde(rename = "type")]
    pub attribute_type: AttributeType,
}

/// Resolved schema of one stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamSchema {
    /// Stream id
    pub id: String,
    /// Attributes in declaration order
    pub attributes: Vec<Attribute>,
}

impl StreamSchema {
    /// Attribute names in declaration order
    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.iter().map(|a| a.name.as_str())
    }

    /// Check whether the stream carries an attribute
    #[must_use]
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.iter().any(|a| a.name == name)
    }
}

/// Turns a stream's textual definition into its schema.
///
/// Implementations must be pure: the same text always resolves to the same
/// schema.
pub trait SchemaResolver {
    /// Resolve a definition
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidStreamDefinition`] if the text is not a
    /// stream definition this resolver understands
    fn resolve(&self, definition: &str) -> CoreResult<StreamSchema>;
}

/// Default resolver for `define stream <Id> (<attr> <type>, ...);` text.
///
/// Leading annotations such as `@Import('Stock:1.0.0')` are skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamDefinitionParser;

impl StreamDefinitionParser {
    /// Create a new parser
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl SchemaResolver for StreamDefinitionParser {
    fn resolve(&self, definition: &str) -> CoreResult<StreamSchema> {
        let invalid = |reason: String| CoreError::InvalidStreamDefinition {
            definition: definition.trim().to_string(),
            reason,
        };

        let captures = STREAM_DEFINITION
            .captures(definition)
            .ok_or_else(|| invalid("expected 'define stream <id> (<attributes>)'".to_string()))?;
        let id = captures[1].to_string();

        let mut attributes: Vec<Attribute> = Vec::new();
        for raw in captures[2].split(',') {
            let raw = raw.trim();
            let parts = ATTRIBUTE
                .captures(raw)
                .ok_or_else(|| invalid(format!("malformed attribute {:?}", raw)))?;
            let name = parts[1].to_string();
            let attribute_type = AttributeType::from_keyword(&parts[2])
                .ok_or_else(|| invalid(format!("unknown type {:?} for attribute {}", &parts[2], name)))?;
            if attributes.iter().any(|a| a.name == name) {
                return Err(invalid(format!("attribute {} declared twice", name)));
            }
            attributes.push(Attribute {
                name,
                attribute_type,
            });
        }

        Ok(StreamSchema { id, attributes })
    }
}
