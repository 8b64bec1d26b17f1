//! # Object Modification Descriptors
//!
//! Records how an object was modified so a log-replay mechanism can undo the
//! change against a local store. This crate only describes the operations;
//! the store-side undo is supplied by whoever implements
//! [`RollbackVisitor`].

use std::collections::BTreeMap;

/// Attribute updates captured before a `setattrs`: `None` means the
/// attribute did not exist and must be removed on rollback.
pub type AttrSnapshot = BTreeMap<String, Option<Vec<u8>>>;

/// Capability set a backend exposes to undo logged operations.
pub trait RollbackVisitor {
    /// Truncate the object back to `old_size`.
    fn append(&mut self, old_size: u64);
    /// Restore the captured attribute values.
    fn setattrs(&mut self, attrs: &AttrSnapshot);
    /// Restore the object stashed at `old_version`.
    fn rmobject(&mut self, old_version: u64);
    /// Remove an object the operation created.
    fn create(&mut self);
}

/// A single undoable operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModOp {
    Append { old_size: u64 },
    SetAttrs(AttrSnapshot),
    RmObject { old_version: u64 },
    Create,
}

/// Ordered log of undoable operations on one object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectModDesc {
    ops: Vec<ModOp>,
    can_rollback: bool,
}

impl Default for ObjectModDesc {
    fn default() -> Self {
        Self {
            ops: Vec::new(),
            can_rollback: true,
        }
    }
}

impl ObjectModDesc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, old_size: u64) {
        self.push(ModOp::Append { old_size });
    }

    pub fn setattrs(&mut self, attrs: AttrSnapshot) {
        self.push(ModOp::SetAttrs(attrs));
    }

    pub fn rmobject(&mut self, old_version: u64) {
        self.push(ModOp::RmObject { old_version });
    }

    pub fn create(&mut self) {
        self.push(ModOp::Create);
    }

    /// Give up on rollback for this object; recorded ops are discarded.
    pub fn mark_unrollbackable(&mut self) {
        self.can_rollback = false;
        self.ops.clear();
    }

    pub fn can_rollback(&self) -> bool {
        self.can_rollback
    }

    pub fn ops(&self) -> &[ModOp] {
        &self.ops
    }

    fn push(&mut self, op: ModOp) {
        if self.can_rollback {
            self.ops.push(op);
        }
    }

    /// Replay the recorded operations, in order, against `visitor`.
    ///
    /// # Panics
    /// Panics if the descriptor was marked unrollbackable.
    pub fn visit(&self, visitor: &mut dyn RollbackVisitor) {
        assert!(self.can_rollback, "visit on an unrollbackable ObjectModDesc");
        for op in &self.ops {
            match op {
                ModOp::Append { old_size } => visitor.append(*old_size),
                ModOp::SetAttrs(attrs) => visitor.setattrs(attrs),
                ModOp::RmObject { old_version } => visitor.rmobject(*old_version),
                ModOp::Create => visitor.create(),
            }
        }
    }
}
