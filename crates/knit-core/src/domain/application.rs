//! Application model: the static description of a graph to build.
//!
//! An `Application` is a value. It is assembled once (programmatically or by
//! `document::Document`) and then only read by the resolver.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::BlockId;

/// Leaf node: a literal parsed according to `factory`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constant {
    pub id: BlockId,
    /// Literal type name, e.g. `int`, `uri`, `decimal`.
    pub factory: String,
    /// Raw literal text.
    pub value: String,
}

impl Constant {
    pub fn new(id: impl Into<BlockId>, factory: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            factory: factory.into(),
            value: value.into(),
        }
    }
}

/// Which callable of a factory type produces the block's value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Method {
    Constructor,
    Named(String),
}

impl Method {
    /// Literal used for `Method::Constructor` in documents.
    pub const CONSTRUCTOR: &'static str = "new";

    pub fn parse(raw: &str) -> Self {
        if raw == Self::CONSTRUCTOR {
            Method::Constructor
        } else {
            Method::Named(raw.to_string())
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Constructor => f.write_str(Self::CONSTRUCTOR),
            Method::Named(name) => f.write_str(name),
        }
    }
}

/// Graph node that produces one value through a registered factory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub id: BlockId,
    pub factory: String,
    pub method: Method,
}

impl Block {
    pub fn new(id: impl Into<BlockId>, factory: impl Into<String>, method: Method) -> Self {
        Self {
            id: id.into(),
            factory: factory.into(),
            method,
        }
    }

    pub fn constructor(id: impl Into<BlockId>, factory: impl Into<String>) -> Self {
        Self::new(id, factory, Method::Constructor)
    }
}

/// Slot name on a connector. `Whole` (`*`) addresses the produced value itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Spot {
    Whole,
    Named(String),
}

impl Spot {
    pub const WHOLE: &'static str = "*";

    pub fn parse(raw: &str) -> Self {
        if raw == Self::WHOLE {
            Spot::Whole
        } else {
            Spot::Named(raw.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Spot::Whole => Self::WHOLE,
            Spot::Named(name) => name,
        }
    }
}

impl fmt::Display for Spot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Address of one input/output slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Connector {
    pub block: BlockId,
    pub spot: Spot,
    /// `None` for a non-vector slot, `Some(i)` for position `i` of a vector slot.
    pub index: Option<usize>,
}

impl Connector {
    /// The whole value produced by `block`.
    pub fn whole(block: impl Into<BlockId>) -> Self {
        Self {
            block: block.into(),
            spot: Spot::Whole,
            index: None,
        }
    }

    /// A named, non-vector slot.
    pub fn spot(block: impl Into<BlockId>, spot: impl AsRef<str>) -> Self {
        Self {
            block: block.into(),
            spot: Spot::parse(spot.as_ref()),
            index: None,
        }
    }

    pub fn at(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }
}

impl fmt::Display for Connector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(i) => write!(f, "{}.{}[{}]", self.block, self.spot, i),
            None => write!(f, "{}.{}", self.block, self.spot),
        }
    }
}

/// Edge kind. Cycles are only forbidden among `Argument` edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinkKind {
    /// Feeds a factory argument; the source is built before the target.
    Argument,
    /// Feeds an already constructed object.
    Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub source: Connector,
    pub target: Connector,
    pub kind: LinkKind,
}

impl Link {
    pub fn argument(source: Connector, target: Connector) -> Self {
        Self {
            source,
            target,
            kind: LinkKind::Argument,
        }
    }

    pub fn value(source: Connector, target: Connector) -> Self {
        Self {
            source,
            target,
            kind: LinkKind::Value,
        }
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let arrow = match self.kind {
            LinkKind::Argument => "=>",
            LinkKind::Value => "->",
        };
        write!(f, "{} {} {}", self.source, arrow, self.target)
    }
}

/// Description of the graph to build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    id: String,
    constants: Vec<Constant>,
    blocks: Vec<Block>,
    links: Vec<Link>,
}

impl Application {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn with_constant(mut self, constant: Constant) -> Self {
        self.constants.push(constant);
        self
    }

    pub fn with_block(mut self, block: Block) -> Self {
        self.blocks.push(block);
        self
    }

    pub fn with_link(mut self, link: Link) -> Self {
        self.links.push(link);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn constants(&self) -> &[Constant] {
        &self.constants
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// Largest id used by any constant or block.
    pub fn max_id(&self) -> Option<BlockId> {
        self.constants
            .iter()
            .map(|c| c.id)
            .chain(self.blocks.iter().map(|b| b.id))
            .max()
    }

    /// Links of one kind, in declaration order.
    pub fn links_of(&self, kind: LinkKind) -> impl Iterator<Item = &Link> {
        self.links.iter().filter(move |l| l.kind == kind)
    }
}
