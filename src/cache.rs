use crate::model::{CohortFilter, StudentRecord};
use std::collections::HashMap;
use std::rc::Rc;

/// Read-through cache of fetched cohort snapshots, keyed by filter.
///
/// Only raw records are cached; summaries are recomputed from the snapshot on
/// every request. Any write must call `invalidate`.
#[derive(Debug, Default)]
pub struct CohortCache {
    snapshots: HashMap<CohortFilter, Rc<Vec<StudentRecord>>>,
}

impl CohortCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_load<F>(
        &mut self,
        filter: &CohortFilter,
        load: F,
    ) -> anyhow::Result<Rc<Vec<StudentRecord>>>
    where
        F: FnOnce(&CohortFilter) -> anyhow::Result<Vec<StudentRecord>>,
    {
        if let Some(hit) = self.snapshots.get(filter) {
            return Ok(Rc::clone(hit));
        }
        let fresh = Rc::new(load(filter)?);
        self.snapshots.insert(filter.clone(), Rc::clone(&fresh));
        Ok(fresh)
    }

    pub fn invalidate(&mut self) {
        if !self.snapshots.is_empty() {
            log::debug!("dropping {} cached cohort snapshot(s)", self.snapshots.len());
        }
        self.snapshots.clear();
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }
}
