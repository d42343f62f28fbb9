//! Data model for the feature graph: entity references, relations, ways.

use std::collections::HashMap;

/// Per-entity free-form key/value tags.
pub type TagStore = HashMap<String, String>;

/// A typed reference to a node, way, or relation.
///
/// The legacy storage layer addresses "the relation representing an area"
/// by negating a way-sized ID slot. `from_area_id` / `signed_id` convert
/// between that convention and the explicit form used everywhere else in
/// this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityRef {
    Node(i64),
    Way(i64),
    Relation(i64),
}

impl EntityRef {
    /// Interpret a signed area ID: positive denotes a way, negative the
    /// relation with the negated ID.
    pub fn from_area_id(id: i64) -> EntityRef {
        if id < 0 {
            EntityRef::Relation(-id)
        } else {
            EntityRef::Way(id)
        }
    }

    /// The legacy signed form: relation IDs come back negated.
    pub fn signed_id(&self) -> i64 {
        match self {
            EntityRef::Node(id) | EntityRef::Way(id) => *id,
            EntityRef::Relation(id) => -id,
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            EntityRef::Node(id) | EntityRef::Way(id) | EntityRef::Relation(id) => *id,
        }
    }

    pub fn member_kind(&self) -> MemberKind {
        match self {
            EntityRef::Node(_) => MemberKind::Node,
            EntityRef::Way(_) => MemberKind::Way,
            EntityRef::Relation(_) => MemberKind::Relation,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            EntityRef::Node(_) => "node",
            EntityRef::Way(_) => "way",
            EntityRef::Relation(_) => "relation",
        }
    }
}

/// Which member partition of a relation to address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberKind {
    Node,
    Way,
    Relation,
}

/// A relation snapshot: three ordered member partitions plus tags.
///
/// Member order is insertion order from the source data; it carries no
/// semantic weight, only determinism for first-match operations.
#[derive(Debug, Clone, Default)]
pub struct Relation {
    pub id: i64,
    pub node_members: Vec<i64>,
    pub way_members: Vec<i64>,
    pub relation_members: Vec<i64>,
    pub tags: TagStore,
}

impl Relation {
    pub fn new(id: i64, tags: TagStore) -> Self {
        Relation {
            id,
            tags,
            ..Default::default()
        }
    }

    pub fn push_member(&mut self, kind: MemberKind, id: i64) {
        match kind {
            MemberKind::Node => self.node_members.push(id),
            MemberKind::Way => self.way_members.push(id),
            MemberKind::Relation => self.relation_members.push(id),
        }
    }

    pub fn members(&self, kind: MemberKind) -> &[i64] {
        match kind {
            MemberKind::Node => &self.node_members,
            MemberKind::Way => &self.way_members,
            MemberKind::Relation => &self.relation_members,
        }
    }
}

/// A way snapshot: ordered node refs plus tags.
#[derive(Debug, Clone)]
pub struct Way {
    pub id: i64,
    pub node_refs: Vec<i64>,
    pub tags: TagStore,
}

impl Way {
    pub fn new(id: i64, node_refs: Vec<i64>, tags: TagStore) -> Self {
        Way { id, node_refs, tags }
    }
}
