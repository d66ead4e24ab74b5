use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use domain::models::Event;

use crate::store::{EventStore, StoreError};

#[derive(Default)]
pub struct InMemoryEventStore {
    events: RwLock<HashMap<Uuid, Event>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn insert(&self, event: &Event) -> Result<(), StoreError> {
        self.events.write().await.insert(event.id, event.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Event>, StoreError> {
        Ok(self.events.read().await.get(&id).cloned())
    }
}
