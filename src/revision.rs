//! Append-only history for time-varying values.
//!
//! Nodes live in an arena and point at their predecessor by index. A node can
//! only ever reference a node appended before it, so the chain cannot form a
//! cycle and `at` is a bounded walk from head to root.

use serde::de::Error as _;
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::{LedgerError, Result};
use crate::types::Timestamp;

/// stable index of a node inside its chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// one revision of a value
#[derive(Debug, Clone, PartialEq)]
pub struct RevisionNode<T> {
    value: T,
    entry_timestamp: Timestamp,
    previous: Option<NodeId>,
}

impl<T> RevisionNode<T> {
    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn entry_timestamp(&self) -> Timestamp {
        self.entry_timestamp
    }

    pub fn previous(&self) -> Option<NodeId> {
        self.previous
    }
}

/// append-only chain of revisions; never empty
#[derive(Debug, Clone, PartialEq)]
pub struct RevisionChain<T> {
    nodes: Vec<RevisionNode<T>>,
    head: NodeId,
}

impl<T> RevisionChain<T> {
    /// create a chain with its root revision
    pub fn new(value: T, entry_timestamp: Timestamp) -> Self {
        Self {
            nodes: vec![RevisionNode {
                value,
                entry_timestamp,
                previous: None,
            }],
            head: NodeId(0),
        }
    }

    /// rebuild from revisions ordered root first, re-checking ordering
    pub fn from_revisions<I>(revisions: I) -> Result<Self>
    where
        I: IntoIterator<Item = (T, Timestamp)>,
    {
        let mut revisions = revisions.into_iter();
        let (value, ts) = revisions.next().ok_or_else(|| LedgerError::NotFound {
            what: "root revision".to_string(),
        })?;

        let mut chain = Self::new(value, ts);
        for (value, ts) in revisions {
            chain.append(value, ts)?;
        }
        Ok(chain)
    }

    /// append a revision; the timestamp must be strictly after the head's
    pub fn append(&mut self, value: T, entry_timestamp: Timestamp) -> Result<&RevisionNode<T>> {
        let head_ts = self.head().entry_timestamp;
        if entry_timestamp <= head_ts {
            return Err(LedgerError::OutOfOrderRevision {
                head: head_ts,
                attempted: entry_timestamp,
            });
        }

        let id = NodeId(self.nodes.len());
        self.nodes.push(RevisionNode {
            value,
            entry_timestamp,
            previous: Some(self.head),
        });
        self.head = id;

        Ok(&self.nodes[id.0])
    }

    pub fn head(&self) -> &RevisionNode<T> {
        &self.nodes[self.head.0]
    }

    pub fn root(&self) -> &RevisionNode<T> {
        &self.nodes[0]
    }

    pub fn node(&self, id: NodeId) -> Option<&RevisionNode<T>> {
        self.nodes.get(id.0)
    }

    /// currently effective value
    pub fn current(&self) -> &T {
        &self.head().value
    }

    /// changes whenever the head moves; used to key derived caches
    pub fn version(&self) -> u64 {
        self.nodes.len() as u64
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// revisions from head back to root; call again to restart
    pub fn history(&self) -> History<'_, T> {
        History {
            chain: self,
            next: Some(self.head),
        }
    }

    /// value of the latest revision entered at or before `timestamp`
    pub fn at(&self, timestamp: Timestamp) -> Result<&T> {
        self.node_at(timestamp).map(|node| &node.value)
    }

    pub fn node_at(&self, timestamp: Timestamp) -> Result<&RevisionNode<T>> {
        let mut cursor = Some(self.head);
        while let Some(id) = cursor {
            let node = &self.nodes[id.0];
            if node.entry_timestamp <= timestamp {
                return Ok(node);
            }
            cursor = node.previous;
        }

        Err(LedgerError::NotFound {
            what: format!("revision at {}", timestamp),
        })
    }

    /// timestamps where the effective value changes strictly inside (from, to)
    pub fn change_points(&self, from: Timestamp, to: Timestamp) -> Vec<Timestamp> {
        let mut points: Vec<Timestamp> = self
            .history()
            .map(|(_, ts)| ts)
            .filter(|ts| *ts > from && *ts < to)
            .collect();
        points.reverse();
        points
    }
}

/// lazy head-to-root walk over a chain
#[derive(Debug, Clone)]
pub struct History<'a, T> {
    chain: &'a RevisionChain<T>,
    next: Option<NodeId>,
}

impl<'a, T> Iterator for History<'a, T> {
    type Item = (&'a T, Timestamp);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next?;
        let node = &self.chain.nodes[id.0];
        self.next = node.previous;
        Some((&node.value, node.entry_timestamp))
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Revision<T> {
    value: T,
    entry_timestamp: Timestamp,
}

// persisted root first as plain (value, entryTimestamp) pairs; links are
// rebuilt on load so a stored chain cannot smuggle in a cycle
impl<T: Serialize> Serialize for RevisionChain<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.nodes.len()))?;
        for node in &self.nodes {
            seq.serialize_element(&Revision {
                value: &node.value,
                entry_timestamp: node.entry_timestamp,
            })?;
        }
        seq.end()
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for RevisionChain<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let revisions = Vec::<Revision<T>>::deserialize(deserializer)?;
        RevisionChain::from_revisions(
            revisions
                .into_iter()
                .map(|revision| (revision.value, revision.entry_timestamp)),
        )
        .map_err(D::Error::custom)
    }
}
