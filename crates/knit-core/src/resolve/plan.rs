//! Resolution plan and dependency walk.
//!
//! `Plan::build` does every structural check up front (ids, link endpoints,
//! factory lookups, parameter names), so nothing is constructed for an
//! application that can never resolve.
//!
//! `Walk` is the depth-first traversal over argument edges:
//! - a node is marked in-progress while its argument sources are visited
//! - reaching an in-progress node again means an argument cycle
//! - finished nodes are marked `Resolved` (or `Failed`) and never visited twice
//!
//! Nodes are handed to the caller in post-order, i.e. creation order.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use super::assemble::param_position;
use super::conns::{Conn, Conns};
use super::object::ObjectState;
use super::resolvables::Resolvables;
use crate::domain::{
    Application, Block, BlockId, Constant, Link, LinkKind, ResolveError, ResolveErrorKind, Spot,
    Step, ValueType,
};
use crate::typed::{DynFactory, FactoryKey, FactoryRegistry};

pub enum NodeKind<'a> {
    Constant {
        constant: &'a Constant,
        ty: ValueType,
    },
    Block {
        block: &'a Block,
        factory: Arc<dyn DynFactory>,
        /// Argument links into this block, in declaration order.
        arguments: Vec<&'a Link>,
    },
}

pub struct PlanNode<'a> {
    pub kind: NodeKind<'a>,
    /// Value edges leaving this node, indexed by dependent.
    pub conns: Conns,
    /// Value edges arriving at this node.
    pub inbound: Vec<Conn>,
}

pub struct Plan<'a> {
    nodes: Resolvables<PlanNode<'a>>,
    order: Vec<BlockId>,
}

fn plan_error(block: BlockId, kind: ResolveErrorKind) -> ResolveError {
    ResolveError::at(Step::Plan, block, kind)
}

impl<'a> Plan<'a> {
    pub fn build(app: &'a Application, registry: &FactoryRegistry) -> Result<Self, ResolveError> {
        let capacity = app.max_id().map(|id| id.index() + 1).unwrap_or(0);
        let mut nodes = Resolvables::with_capacity(capacity);
        let mut order = Vec::with_capacity(app.constants().len() + app.blocks().len());

        for constant in app.constants() {
            let ty = ValueType::from_literal_name(&constant.factory).ok_or_else(|| {
                plan_error(
                    constant.id,
                    ResolveErrorKind::UnknownLiteralType {
                        id: constant.id,
                        factory: constant.factory.clone(),
                    },
                )
            })?;
            let node = PlanNode::new(NodeKind::Constant { constant, ty });
            if nodes.put(constant.id, node).is_some() {
                return Err(plan_error(constant.id, ResolveErrorKind::DuplicateId(constant.id)));
            }
            order.push(constant.id);
        }

        // One registry lookup per distinct (factory, method) pair.
        let mut thunks: HashMap<FactoryKey, Arc<dyn DynFactory>> = HashMap::new();
        for block in app.blocks() {
            let key = FactoryKey::new(block.factory.clone(), block.method.clone());
            let factory = match thunks.entry(key) {
                Entry::Occupied(e) => Arc::clone(e.get()),
                Entry::Vacant(e) => {
                    let factory = registry.get(e.key()).ok_or_else(|| {
                        plan_error(block.id, ResolveErrorKind::UnknownFactory(e.key().clone()))
                    })?;
                    Arc::clone(e.insert(factory))
                }
            };
            let node = PlanNode::new(NodeKind::Block {
                block,
                factory,
                arguments: Vec::new(),
            });
            if nodes.put(block.id, node).is_some() {
                return Err(plan_error(block.id, ResolveErrorKind::DuplicateId(block.id)));
            }
            order.push(block.id);
        }

        for link in app.links() {
            Self::check_endpoints(&nodes, link)?;
            match link.kind {
                LinkKind::Argument => Self::add_argument(&mut nodes, link)?,
                LinkKind::Value => {
                    let conn = Conn::from_link(link);
                    if let Some(target) = nodes.get_mut(link.target.block) {
                        target.inbound.push(conn.clone());
                    }
                    if let Some(source) = nodes.get_mut(link.source.block) {
                        source.conns.add(conn.dependent.index(), conn);
                    }
                }
            }
        }

        Ok(Self { nodes, order })
    }

    fn check_endpoints(nodes: &Resolvables<PlanNode<'a>>, link: &Link) -> Result<(), ResolveError> {
        for endpoint in [&link.source, &link.target] {
            if !nodes.contains(endpoint.block) {
                return Err(plan_error(
                    endpoint.block,
                    ResolveErrorKind::DanglingReference {
                        id: endpoint.block,
                        link: link.to_string(),
                    },
                ));
            }
        }
        if let Some(PlanNode {
            kind: NodeKind::Constant { .. },
            ..
        }) = nodes.get(link.target.block)
        {
            return Err(plan_error(
                link.target.block,
                ResolveErrorKind::ConstantTarget {
                    id: link.target.block,
                    link: link.to_string(),
                },
            ));
        }
        Ok(())
    }

    fn add_argument(nodes: &mut Resolvables<PlanNode<'a>>, link: &'a Link) -> Result<(), ResolveError> {
        let id = link.target.block;
        let Some(PlanNode {
            kind:
                NodeKind::Block {
                    factory, arguments, ..
                },
            ..
        }) = nodes.get_mut(id)
        else {
            return Ok(());
        };
        if link.target.spot == Spot::Whole {
            return Err(plan_error(
                id,
                ResolveErrorKind::WholeTarget {
                    link: link.to_string(),
                },
            ));
        }
        if param_position(factory.params(), &link.target.spot).is_none() {
            return Err(plan_error(
                id,
                ResolveErrorKind::UnknownParameter {
                    factory: factory.key().clone(),
                    spot: link.target.spot.to_string(),
                },
            ));
        }
        arguments.push(link);
        Ok(())
    }

    pub fn node(&self, id: BlockId) -> Option<&PlanNode<'a>> {
        self.nodes.get(id)
    }

    /// Declaration order: constants, then blocks.
    pub fn order(&self) -> &[BlockId] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }
}

impl<'a> PlanNode<'a> {
    fn new(kind: NodeKind<'a>) -> Self {
        Self {
            kind,
            conns: Conns::new(),
            inbound: Vec::new(),
        }
    }
}

pub struct Walk<'p, 'a> {
    plan: &'p Plan<'a>,
    /// Walk-time state per node; absent means `Unresolved`.
    marks: Resolvables<ObjectState>,
    path: Vec<BlockId>,
    max_depth: usize,
}

impl<'p, 'a> Walk<'p, 'a> {
    pub fn new(plan: &'p Plan<'a>, max_depth: usize) -> Self {
        Self {
            plan,
            marks: Resolvables::new(),
            path: Vec::new(),
            max_depth,
        }
    }

    /// Visit every node in declaration order.
    pub fn run(
        &mut self,
        on_ready: &mut dyn FnMut(BlockId, &PlanNode<'a>) -> Result<(), ResolveError>,
    ) -> Result<(), ResolveError> {
        let plan = self.plan;
        for &id in plan.order() {
            self.visit(id, on_ready)?;
        }
        Ok(())
    }

    /// Visit `id` after all of its argument sources.
    pub fn visit(
        &mut self,
        id: BlockId,
        on_ready: &mut dyn FnMut(BlockId, &PlanNode<'a>) -> Result<(), ResolveError>,
    ) -> Result<(), ResolveError> {
        match self.state(id) {
            ObjectState::Unresolved => {}
            ObjectState::InProgress => return Err(self.cycle_at(id)),
            _ => return Ok(()),
        }
        if self.path.len() >= self.max_depth {
            return Err(ResolveError::at(
                Step::Resolve,
                id,
                ResolveErrorKind::DepthExceeded(self.max_depth),
            ));
        }
        let plan = self.plan;
        let node = plan.node(id).ok_or_else(|| {
            ResolveError::at(
                Step::Resolve,
                id,
                ResolveErrorKind::DanglingReference {
                    id,
                    link: format!("dependency of {:?}", self.path.last()),
                },
            )
        })?;

        self.marks.put(id, ObjectState::InProgress);
        self.path.push(id);
        if let NodeKind::Block { arguments, .. } = &node.kind {
            for link in arguments {
                self.visit(link.source.block, on_ready)?;
            }
        }
        self.path.pop();

        if let Err(err) = on_ready(id, node) {
            self.marks.put(id, ObjectState::Failed);
            return Err(err);
        }
        self.marks.put(id, ObjectState::Resolved);
        Ok(())
    }

    pub fn state(&self, id: BlockId) -> ObjectState {
        self.marks.get(id).copied().unwrap_or(ObjectState::Unresolved)
    }

    fn cycle_at(&self, id: BlockId) -> ResolveError {
        let start = self.path.iter().position(|&p| p == id).unwrap_or(0);
        let mut cycle: Vec<BlockId> = self.path[start..].to_vec();
        cycle.push(id);
        ResolveError::at(Step::Resolve, id, ResolveErrorKind::Cycle(cycle))
    }
}
