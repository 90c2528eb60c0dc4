//! Where raw motion samples come from
//!
//! Decouples the detection pipeline from where samples come from (synthetic
//! generator, recorded CSV, live transport).

use std::sync::Arc;

use crate::SampleBatch;

/// Batch callback type
///
/// Sources hand every produced batch to this callback. Uses `Arc` so the
/// callback can be shared with the source's worker thread.
pub type SampleBatchCallback = Arc<dyn Fn(SampleBatch) + Send + Sync>;

/// Sample source trait
///
/// # Example
///
/// ```ignore
/// let source: Box<dyn SampleSource> = make_source();
/// source.listen(Arc::new(|batch| {
///     println!("{} samples for {}", batch.len(), batch.session_id);
/// }));
/// // ...
/// source.stop();
/// ```
pub trait SampleSource: Send + Sync {
    /// Source identifier (used for logging)
    fn source_id(&self) -> &str;

    /// Session the produced batches belong to
    fn session_id(&self) -> &str;

    /// Register batch callback and start producing
    ///
    /// Repeated calls while listening are ignored.
    fn listen(&self, callback: SampleBatchCallback);

    /// Stop producing
    fn stop(&self);

    /// Check if currently producing
    fn is_listening(&self) -> bool;
}
