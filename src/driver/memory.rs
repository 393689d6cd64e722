//! Memory Driver Module
//!
//! Per-instance store shaped as a tree of key segments. A subtree can be
//! detached in one step, so clearing a path never scans.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::DriverOptions;
use crate::driver::{
    Clock, Driver, DriverKind, ExpirationPolicy, KeyBuilder, KeyPath, StoredRecord, Timestamp,
};
use crate::error::Result;

// == Tree ==
#[derive(Debug, Clone)]
struct Slot {
    record: StoredRecord,
    /// Native deadline, `now + life` at store time
    deadline: Timestamp,
}

impl Slot {
    fn is_live(&self, now: Timestamp) -> bool {
        self.deadline > now && self.record.is_valid_at(now)
    }
}

#[derive(Debug, Default)]
struct Node {
    slot: Option<Slot>,
    children: HashMap<String, Node>,
}

impl Node {
    fn find(&self, parts: &[&str]) -> Option<&Node> {
        parts
            .iter()
            .try_fold(self, |node, part| node.children.get(*part))
    }

    fn find_mut(&mut self, parts: &[&str]) -> Option<&mut Node> {
        parts
            .iter()
            .try_fold(self, |node, part| node.children.get_mut(*part))
    }

    fn find_or_create(&mut self, parts: &[&str]) -> &mut Node {
        parts.iter().fold(self, |node, part| {
            node.children.entry(part.to_string()).or_default()
        })
    }

    /// Removes the child at the end of `parts`, pruning parents left empty.
    fn detach(&mut self, parts: &[&str]) -> Option<Node> {
        let (first, rest) = parts.split_first()?;
        if rest.is_empty() {
            return self.children.remove(*first);
        }
        let child = self.children.get_mut(*first)?;
        let detached = child.detach(rest);
        if child.is_empty() {
            self.children.remove(*first);
        }
        detached
    }

    /// Drops the slot at the end of `parts`.
    fn take_slot(&mut self, parts: &[&str]) -> Option<Slot> {
        let (first, rest) = match parts.split_first() {
            Some(split) => split,
            None => return self.slot.take(),
        };
        let child = self.children.get_mut(*first)?;
        let slot = child.take_slot(rest);
        if child.is_empty() {
            self.children.remove(*first);
        }
        slot
    }

    fn detach_if_empty(&mut self, parts: &[&str]) {
        if self.find(parts).is_some_and(Node::is_empty) {
            self.detach(parts);
        }
    }

    fn is_empty(&self) -> bool {
        self.slot.is_none() && self.children.is_empty()
    }

    fn count(&self) -> usize {
        usize::from(self.slot.is_some()) + self.children.values().map(Node::count).sum::<usize>()
    }

    /// Removes every slot not live at `now`, returning how many were dropped.
    fn retain_live(&mut self, now: Timestamp) -> usize {
        let mut removed = 0;
        if self.slot.as_ref().is_some_and(|slot| !slot.is_live(now)) {
            self.slot = None;
            removed += 1;
        }
        self.children.retain(|_, child| {
            removed += child.retain_live(now);
            !child.is_empty()
        });
        removed
    }
}

#[derive(Debug, Default)]
struct Tree {
    root: Node,
    len: usize,
}

// == Memory Driver ==
/// In-process driver with structural subtree deletion.
///
/// Entries are private to the instance. A store of a new key while at
/// `max_entries` first drops expired entries and then fails.
pub struct MemoryDriver {
    keys: KeyBuilder,
    policy: ExpirationPolicy,
    clock: Arc<dyn Clock>,
    max_entries: usize,
    tree: RwLock<Tree>,
}

impl MemoryDriver {
    // == Constructor ==
    pub fn new(options: &DriverOptions, clock: Arc<dyn Clock>) -> Result<Self> {
        options.validate()?;

        Ok(Self {
            keys: KeyBuilder::new(&options.install_id, DriverKind::Memory.tag(), options.namespace()),
            policy: ExpirationPolicy::new(options.ttl),
            clock,
            max_entries: options.max_entries,
            tree: RwLock::new(Tree::default()),
        })
    }

    /// Number of entries held, live or not.
    pub fn len(&self) -> usize {
        self.tree.read().len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn keys(&self) -> &KeyBuilder {
        &self.keys
    }

    fn parts<'a>(&'a self, path: &'a KeyPath) -> Vec<&'a str> {
        self.keys.components(path).collect()
    }
}

impl Driver for MemoryDriver {
    fn get_data(&self, path: &KeyPath) -> Option<StoredRecord> {
        let now = self.clock.now();
        let parts = self.parts(path);
        let tree = self.tree.read();

        match tree.root.find(&parts).and_then(|node| node.slot.as_ref()) {
            Some(slot) if slot.is_live(now) => Some(slot.record.clone()),
            Some(_) => {
                debug!("memory: expired entry at {}", path);
                None
            }
            None => None,
        }
    }

    fn store_data(&self, path: &KeyPath, data: Value, expiration: Timestamp) -> bool {
        let now = self.clock.now();
        let parts = self.parts(path);
        let mut tree = self.tree.write();

        let deadline = match self.policy.deadline(expiration, now) {
            Some(deadline) => deadline,
            None => {
                if tree.root.take_slot(&parts).is_some() {
                    tree.len -= 1;
                }
                debug!("memory: expiration already passed for {}, nothing stored", path);
                return true;
            }
        };

        let exists = tree
            .root
            .find(&parts)
            .is_some_and(|node| node.slot.is_some());

        if !exists && tree.len >= self.max_entries {
            let reaped = tree.root.retain_live(now);
            tree.len -= reaped;
            if tree.len >= self.max_entries {
                warn!(
                    "memory: capacity of {} entries reached, rejecting {}",
                    self.max_entries, path
                );
                return false;
            }
        }

        let node = tree.root.find_or_create(&parts);
        node.slot = Some(Slot {
            record: StoredRecord::new(data, expiration),
            deadline,
        });
        if !exists {
            tree.len += 1;
        }
        true
    }

    fn clear(&self, path: Option<&KeyPath>) -> bool {
        let root = KeyPath::root();
        let path = path.unwrap_or(&root);
        let parts = self.parts(path);
        let mut tree = self.tree.write();

        if let Some(detached) = tree.root.detach(&parts) {
            let removed = detached.count();
            tree.len -= removed;
            debug!("memory: cleared {} entries under {}", removed, path);
        }
        true
    }

    fn purge(&self) -> bool {
        let now = self.clock.now();
        let root = KeyPath::root();
        let parts = self.parts(&root);
        let mut tree = self.tree.write();

        let Tree { root: node, len } = &mut *tree;
        if let Some(namespace) = node.find_mut(&parts) {
            let removed = namespace.retain_live(now);
            *len -= removed;
            debug!("memory: purged {} expired entries", removed);
        }
        tree.root.detach_if_empty(&parts);
        true
    }

    fn kind(&self) -> DriverKind {
        DriverKind::Memory
    }

    fn is_available() -> bool {
        true
    }
}
