use async_trait::async_trait;

use crate::collaborators::ExecutionContext;
use crate::error::CollaboratorError;
use crate::job::ItemResult;

/// Per-kind unit of work run by the [`WorkerPool`](crate::worker::WorkerPool).
///
/// `process` never returns an error: collaborator failures become failed
/// records. Anything that still escapes (a panic) is turned into a record
/// through [`ItemProcessor::escaped`].
#[async_trait]
pub trait ItemProcessor: Send + Sync + 'static {
    type Item: Send + Sync + 'static;

    /// Stable reference to the item, used in logs, errors and retries.
    fn item_ref(&self, item: &Self::Item) -> String;

    async fn process(&self, item: &Self::Item, context: &ExecutionContext) -> ItemResult;

    /// Builds the failed record for an item whose processing escaped.
    fn escaped(&self, item: &Self::Item, error: &CollaboratorError) -> ItemResult;
}
