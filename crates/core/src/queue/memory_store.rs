//! In-memory queue store for fast unit tests that don't need real sqlite IO.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::Utc;

use super::state_machine::{is_valid_transition, stamps_completed_at, stamps_started_at};
use super::store::{QueueStore, QueueStoreError, Result};
use super::types::{EnqueueRequest, QueueFilter, QueueItem, QueueItemUpdate, Status};

#[derive(Default)]
pub struct MemoryQueueStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    items: HashMap<i64, QueueItem>,
    next_id: i64,
}

impl MemoryQueueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl QueueStore for MemoryQueueStore {
    fn enqueue(&self, request: EnqueueRequest) -> Result<QueueItem> {
        let mut inner = self.inner.lock().unwrap();

        if inner
            .items
            .values()
            .any(|i| i.catalog_id == request.catalog_id && i.status.is_active())
        {
            return Err(QueueStoreError::DuplicateActiveCatalogId(request.catalog_id));
        }

        inner.next_id += 1;
        let id = inner.next_id;
        let now = Utc::now();
        let item = QueueItem {
            id,
            catalog_id: request.catalog_id,
            status: Status::Queued,
            priority: QueueItem::clamp_priority(request.priority),
            kind: request.kind,
            title: request.title,
            author: request.author,
            pre_selected_source: request.pre_selected_source,
            source_url: None,
            source_info_hash: None,
            client_name: None,
            client_id: None,
            temp_path: None,
            voucher_path: None,
            converted_path: None,
            final_path: None,
            format: None,
            progress: None,
            eta_seconds: None,
            retry_count: 0,
            next_retry_at: None,
            last_error: None,
            queued_at: now,
            started_at: None,
            completed_at: None,
            updated_at: now,
            seeding_ratio: None,
            seeding_time_seconds: None,
        };
        inner.items.insert(id, item.clone());
        Ok(item)
    }

    fn get(&self, id: i64) -> Result<QueueItem> {
        self.inner
            .lock()
            .unwrap()
            .items
            .get(&id)
            .cloned()
            .ok_or(QueueStoreError::NotFound(id))
    }

    fn get_by_catalog_id(&self, catalog_id: &str) -> Result<Option<QueueItem>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .items
            .values()
            .filter(|i| i.catalog_id == catalog_id)
            .max_by_key(|i| i.queued_at)
            .cloned())
    }

    fn list(&self, filter: QueueFilter) -> Result<Vec<QueueItem>> {
        let inner = self.inner.lock().unwrap();
        let mut items: Vec<QueueItem> = inner
            .items
            .values()
            .filter(|i| {
                filter
                    .statuses
                    .as_ref()
                    .map(|s| s.contains(&i.status))
                    .unwrap_or(true)
            })
            .filter(|i| filter.kind.map(|k| k == i.kind).unwrap_or(true))
            .cloned()
            .collect();

        items.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.queued_at.cmp(&b.queued_at)));

        let offset = filter.offset.max(0) as usize;
        let items = items.into_iter().skip(offset);
        Ok(match filter.limit {
            Some(limit) => items.take(limit.max(0) as usize).collect(),
            None => items.collect(),
        })
    }

    fn update(&self, id: i64, update: QueueItemUpdate) -> Result<QueueItem> {
        let mut inner = self.inner.lock().unwrap();
        let current = inner.items.get(&id).cloned().ok_or(QueueStoreError::NotFound(id))?;
        let mut next = current.clone();
        let now = Utc::now();

        if let Some(new_status) = update.status {
            if !is_valid_transition(current.status, new_status) {
                return Err(QueueStoreError::InvalidTransition {
                    id,
                    from: current.status,
                    to: new_status,
                });
            }
            if stamps_started_at(current.status, new_status) {
                next.started_at = Some(now);
            }
            if stamps_completed_at(new_status) {
                next.completed_at = Some(now);
            }
            next.status = new_status;
        }

        macro_rules! apply {
            ($field:ident) => {
                if let Some(v) = update.$field {
                    next.$field = v;
                }
            };
        }
        apply!(source_url);
        apply!(source_info_hash);
        apply!(client_name);
        apply!(client_id);
        apply!(temp_path);
        apply!(voucher_path);
        apply!(converted_path);
        apply!(final_path);
        apply!(format);
        apply!(progress);
        apply!(eta_seconds);
        apply!(retry_count);
        apply!(next_retry_at);
        apply!(last_error);
        apply!(started_at);
        apply!(completed_at);
        apply!(seeding_ratio);
        apply!(seeding_time_seconds);

        next.updated_at = now;
        inner.items.insert(id, next.clone());
        Ok(next)
    }

    fn delete(&self, id: i64) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.items.remove(&id).ok_or(QueueStoreError::NotFound(id))?;
        Ok(())
    }

    fn due_for_retry(&self) -> Result<Vec<QueueItem>> {
        let now = Utc::now();
        let inner = self.inner.lock().unwrap();
        let mut items: Vec<QueueItem> = inner
            .items
            .values()
            .filter(|i| i.next_retry_at.map(|t| t <= now).unwrap_or(false))
            .cloned()
            .collect();
        items.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.queued_at.cmp(&b.queued_at)));
        Ok(items)
    }

    fn statistics(&self) -> Result<Vec<(Status, i64)>> {
        let inner = self.inner.lock().unwrap();
        let mut counts: HashMap<Status, i64> = HashMap::new();
        for item in inner.items.values() {
            *counts.entry(item.status).or_insert(0) += 1;
        }
        Ok(counts.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::types::ItemKind;

    fn request(catalog_id: &str) -> EnqueueRequest {
        EnqueueRequest {
            catalog_id: catalog_id.to_string(),
            priority: 5,
            kind: ItemKind::Torrent,
            title: "Title".to_string(),
            author: "Author".to_string(),
            pre_selected_source: None,
        }
    }

    #[test]
    fn enqueue_assigns_sequential_ids() {
        let store = MemoryQueueStore::new();
        let a = store.enqueue(request("a")).unwrap();
        let b = store.enqueue(request("b")).unwrap();
        assert_eq!(b.id, a.id + 1);
    }

    #[test]
    fn duplicate_active_catalog_id_rejected() {
        let store = MemoryQueueStore::new();
        store.enqueue(request("a")).unwrap();
        assert!(matches!(
            store.enqueue(request("a")),
            Err(QueueStoreError::DuplicateActiveCatalogId(_))
        ));
    }

    #[test]
    fn delete_then_get_not_found() {
        let store = MemoryQueueStore::new();
        let item = store.enqueue(request("a")).unwrap();
        store.delete(item.id).unwrap();
        assert!(matches!(store.get(item.id), Err(QueueStoreError::NotFound(_))));
    }
}
