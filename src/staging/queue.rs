//! Insertion-ordered staging queue shared between ingestion, the UI and
//! the progress tracker.

use super::types::StagedItem;
use crate::error::{Result, UploaderError};
use crate::logging::log_debug;
use indexmap::IndexMap;
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
pub struct StagingQueue {
    items: Arc<Mutex<IndexMap<String, StagedItem>>>,
}

impl std::fmt::Debug for StagingQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StagingQueue")
            .field("items", &"<staged items>")
            .finish()
    }
}

impl StagingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one item; ids are unique for the session
    pub fn enqueue(&self, item: StagedItem) -> Result<()> {
        let mut items = self.items.lock()?;
        if items.contains_key(item.id()) {
            return Err(UploaderError::Validation(format!(
                "Item {} is already staged",
                item.id()
            )));
        }
        items.insert(item.id().to_string(), item);
        Ok(())
    }

    /// Append a batch under one lock so its order is kept intact.
    /// Items whose id is already staged are skipped. Returns how many were added.
    pub fn enqueue_batch(&self, batch: Vec<StagedItem>) -> Result<usize> {
        let mut skipped = Vec::new();
        let added = {
            let mut items = self.items.lock()?;
            let mut added = 0;
            for item in batch {
                if items.contains_key(item.id()) {
                    skipped.push(item.remote_filename().to_string());
                    continue;
                }
                items.insert(item.id().to_string(), item);
                added += 1;
            }
            added
        };

        for name in skipped {
            log_debug("staging", &format!("Skipping already staged item {}", name))
                .unwrap_or_default();
        }
        Ok(added)
    }

    pub fn dequeue(&self, id: &str) -> Result<Option<StagedItem>> {
        Ok(self.items.lock()?.shift_remove(id))
    }

    /// Remove everything; returns how many items were dropped
    pub fn clear_all(&self) -> Result<usize> {
        let mut items = self.items.lock()?;
        let count = items.len();
        items.clear();
        Ok(count)
    }

    pub fn list(&self) -> Result<Vec<StagedItem>> {
        Ok(self.items.lock()?.values().cloned().collect())
    }

    pub fn get(&self, id: &str) -> Result<Option<StagedItem>> {
        Ok(self.items.lock()?.get(id).cloned())
    }

    pub fn len(&self) -> usize {
        self.items.lock().map(|items| items.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Change the destination name of an item; `prefix` is left alone when `None`
    pub fn rename(&self, id: &str, remote_filename: &str, prefix: Option<&str>) -> Result<()> {
        self.update(id, |item| {
            item.set_remote_filename(remote_filename);
            if let Some(prefix) = prefix {
                item.set_remote_filename_prefix(prefix);
            }
        })
    }

    /// Apply one prefix to every staged item
    pub fn set_prefix_all(&self, prefix: &str) -> Result<()> {
        let mut items = self.items.lock()?;
        for item in items.values_mut() {
            item.set_remote_filename_prefix(prefix);
        }
        Ok(())
    }

    pub fn set_selected(&self, id: &str, selected: bool) -> Result<()> {
        self.update(id, |item| item.set_selected(selected))
    }

    pub fn select_all(&self, selected: bool) -> Result<()> {
        let mut items = self.items.lock()?;
        for item in items.values_mut() {
            item.set_selected(selected);
        }
        Ok(())
    }

    pub fn selected(&self) -> Result<Vec<StagedItem>> {
        Ok(self
            .items
            .lock()?
            .values()
            .filter(|item| item.is_selected())
            .cloned()
            .collect())
    }

    pub fn remove_selected(&self) -> Result<usize> {
        let mut items = self.items.lock()?;
        let before = items.len();
        items.retain(|_, item| !item.is_selected());
        Ok(before - items.len())
    }

    fn update<F>(&self, id: &str, f: F) -> Result<()>
    where
        F: FnOnce(&mut StagedItem),
    {
        let mut items = self.items.lock()?;
        let item = items
            .get_mut(id)
            .ok_or_else(|| UploaderError::NotFound(format!("staged item {}", id)))?;
        f(item);
        Ok(())
    }
}
