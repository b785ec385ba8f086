//! The unit of work the hooks act on.

use std::fmt;
use std::sync::Arc;

use crate::replication::Node;

/// Read operations may be moved to a reader; writes stay on the writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Read,
    Write,
}

/// An opaque query bound to one node's connection.
///
/// The execution engine runs the query on [`connection`](Self::connection)
/// and reports a failure with [`fail`](Self::fail) before the after-hook runs.
pub struct Operation<C> {
    kind: OperationKind,
    node: Arc<Node<C>>,
    transaction: bool,
    error: Option<String>,
}

impl<C> Operation<C> {
    pub(crate) fn new(kind: OperationKind, node: Arc<Node<C>>) -> Self {
        Self {
            kind,
            node,
            transaction: false,
            error: None,
        }
    }

    pub(crate) fn in_transaction(kind: OperationKind, node: Arc<Node<C>>) -> Self {
        Self {
            transaction: true,
            ..Self::new(kind, node)
        }
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn is_transaction(&self) -> bool {
        self.transaction
    }

    /// The node whose connection this operation is bound to.
    pub fn node(&self) -> &Arc<Node<C>> {
        &self.node
    }

    pub fn connection(&self) -> &Arc<C> {
        self.node.connection()
    }

    pub(crate) fn rebind(&mut self, node: Arc<Node<C>>) {
        self.node = node;
    }

    /// Record the outcome reported by the execution engine.
    pub fn fail(&mut self, error: impl fmt::Display) {
        self.error = Some(error.to_string());
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

impl<C> fmt::Debug for Operation<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("kind", &self.kind)
            .field("node", &self.node.name())
            .field("transaction", &self.transaction)
            .field("error", &self.error)
            .finish()
    }
}
