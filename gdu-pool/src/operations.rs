// SPDX-License-Identifier: GPL-3.0-only

//! Asynchronous mutation requests

use futures::future::BoxFuture;
use gdu_types::{Operation, OperationOutput};

use crate::error::OperationError;

pub type OperationResult = Result<OperationOutput, OperationError>;

/// Write side of the storage daemon.
///
/// The pool never waits for the device events an operation causes; those
/// arrive through the regular event stream.
pub trait OperationBackend: Send + Sync {
    fn execute(&self, operation: Operation) -> BoxFuture<'_, OperationResult>;
}
