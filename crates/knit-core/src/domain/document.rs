//! Declarative application documents (JSON).
//!
//! Attribute values are kept as strings (or numbers) the way a markup document
//! carries them, and validated while mapping onto the `Application` model:
//!
//! ```json
//! {
//!   "id": "demo",
//!   "constants": [ { "id": "23", "factory": "int", "value": "45" } ],
//!   "blocks": [
//!     { "id": "1", "factory": "demo.Greeter", "method": "new",
//!       "params": [ { "name": "name", "ref": "23" } ] }
//!   ],
//!   "links": [
//!     { "source": { "block": "1" }, "target": { "block": "2", "spot": "greeter" } }
//!   ]
//! }
//! ```
//!
//! Block `params` become argument links into the enclosing block, top-level
//! `links` become value links.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::application::{Application, Block, Connector, Constant, Link, Method, Spot};
use super::ids::BlockId;

/// Resolver settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolveOptions {
    /// Longest chain of argument dependencies the walk follows.
    pub max_depth: usize,
    /// Upper bound (exclusive) on element indexes of vector parameters.
    pub max_vector_len: usize,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            max_depth: 1024,
            max_vector_len: 4096,
        }
    }
}

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("malformed document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{field}: invalid id {literal:?} (expected a non-negative integer)")]
    InvalidId { field: String, literal: String },

    #[error("{field}: invalid index {literal:?} (expected -1 or a non-negative integer)")]
    InvalidIndex { field: String, literal: String },
}

/// An attribute that may be written as a string or a bare number.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Attr {
    Int(i64),
    Text(String),
}

impl Attr {
    fn literal(&self) -> String {
        match self {
            Attr::Int(n) => n.to_string(),
            Attr::Text(s) => s.clone(),
        }
    }

    fn as_i64(&self) -> Option<i64> {
        match self {
            Attr::Int(n) => Some(*n),
            Attr::Text(s) => s.trim().parse().ok(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawDocument {
    id: String,
    #[serde(default)]
    options: ResolveOptions,
    #[serde(default)]
    constants: Vec<RawConstant>,
    #[serde(default)]
    blocks: Vec<RawBlock>,
    #[serde(default)]
    links: Vec<RawLink>,
}

#[derive(Debug, Deserialize)]
struct RawConstant {
    id: Attr,
    factory: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct RawBlock {
    id: Attr,
    factory: String,
    method: Option<String>,
    #[serde(default)]
    params: Vec<RawParam>,
}

/// `<param>`: wires `ref` (optionally one of its spots) into parameter `name`.
#[derive(Debug, Deserialize)]
struct RawParam {
    name: String,
    index: Option<Attr>,
    #[serde(rename = "ref")]
    source: Attr,
    spot: Option<String>,
    #[serde(rename = "ref_index")]
    source_index: Option<Attr>,
}

#[derive(Debug, Deserialize)]
struct RawConnector {
    block: Attr,
    spot: Option<String>,
    index: Option<Attr>,
}

#[derive(Debug, Deserialize)]
struct RawLink {
    source: RawConnector,
    target: RawConnector,
}

/// A validated document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub application: Application,
    pub options: ResolveOptions,
}

impl Document {
    pub fn parse(text: &str) -> Result<Self, DocumentError> {
        let raw: RawDocument = serde_json::from_str(text)?;
        raw.validate()
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| DocumentError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&text)
    }
}

fn parse_id(attr: &Attr, field: impl FnOnce() -> String) -> Result<BlockId, DocumentError> {
    attr.as_i64()
        .and_then(|n| u32::try_from(n).ok())
        .map(BlockId::new)
        .ok_or_else(|| DocumentError::InvalidId {
            field: field(),
            literal: attr.literal(),
        })
}

fn parse_index(
    attr: Option<&Attr>,
    field: impl FnOnce() -> String,
) -> Result<Option<usize>, DocumentError> {
    let Some(attr) = attr else {
        return Ok(None);
    };
    match attr.as_i64() {
        Some(-1) => Ok(None),
        Some(n) if n >= 0 => Ok(usize::try_from(n).ok()),
        _ => Err(DocumentError::InvalidIndex {
            field: field(),
            literal: attr.literal(),
        }),
    }
}

fn spot_of(raw: Option<&str>) -> Spot {
    raw.map(Spot::parse).unwrap_or(Spot::Whole)
}

impl RawConnector {
    fn validate(&self, field: &str) -> Result<Connector, DocumentError> {
        Ok(Connector {
            block: parse_id(&self.block, || format!("{field}.block"))?,
            spot: spot_of(self.spot.as_deref()),
            index: parse_index(self.index.as_ref(), || format!("{field}.index"))?,
        })
    }
}

impl RawDocument {
    fn validate(self) -> Result<Document, DocumentError> {
        let mut app = Application::new(self.id);

        for (i, c) in self.constants.iter().enumerate() {
            let id = parse_id(&c.id, || format!("constants[{i}].id"))?;
            app = app.with_constant(Constant::new(id, c.factory.clone(), c.value.clone()));
        }

        let mut arguments = Vec::new();
        for (i, b) in self.blocks.iter().enumerate() {
            let id = parse_id(&b.id, || format!("blocks[{i}].id"))?;
            let method = b
                .method
                .as_deref()
                .map(Method::parse)
                .unwrap_or(Method::Constructor);
            app = app.with_block(Block::new(id, b.factory.clone(), method));

            for (j, p) in b.params.iter().enumerate() {
                let field = || format!("blocks[{i}].params[{j}]");
                let source = Connector {
                    block: parse_id(&p.source, || format!("{}.ref", field()))?,
                    spot: spot_of(p.spot.as_deref()),
                    index: parse_index(p.source_index.as_ref(), || format!("{}.ref_index", field()))?,
                };
                let target = Connector {
                    block: id,
                    spot: Spot::parse(&p.name),
                    index: parse_index(p.index.as_ref(), || format!("{}.index", field()))?,
                };
                arguments.push(Link::argument(source, target));
            }
        }
        for link in arguments {
            app = app.with_link(link);
        }

        for (i, l) in self.links.iter().enumerate() {
            let source = l.source.validate(&format!("links[{i}].source"))?;
            let target = l.target.validate(&format!("links[{i}].target"))?;
            app = app.with_link(Link::value(source, target));
        }

        Ok(Document {
            application: app,
            options: self.options,
        })
    }
}
