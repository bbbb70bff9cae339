use crate::data::Dataset;
use std::sync::Arc;
use tracing::debug;

/// Holds the dataset a session is currently working with.
///
/// Replacing it drops the previous one; there is no history.
#[derive(Debug, Default, Clone)]
pub struct DatasetStore {
    current: Option<Arc<Dataset>>,
}

impl DatasetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, dataset: Dataset) -> Arc<Dataset> {
        let dataset = Arc::new(dataset);
        if let Some(previous) = self.current.replace(Arc::clone(&dataset)) {
            debug!(previous = previous.source(), next = dataset.source(), "replacing dataset");
        }
        dataset
    }

    pub fn get(&self) -> Option<Arc<Dataset>> {
        self.current.clone()
    }

    pub fn clear(&mut self) {
        self.current = None;
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_none()
    }
}
