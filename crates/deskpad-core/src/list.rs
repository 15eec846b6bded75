use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::dashboard::Services;
use crate::events::Event;
use crate::ids::new_id;
use crate::store::StoreKey;
use crate::surface::{Confirmed, Frame};

pub const DEFAULT_EMPTY_MESSAGE: &str = "No items yet. Add one to get started!";
pub const FILTER_ALL: &str = "all";

/// A persisted entity. `id` and `created_at` are fixed at creation; only
/// `data` is reachable mutably.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record<T> {
    id: String,
    created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub data: T,
}

impl<T> Record<T> {
    pub(crate) fn new(data: T, created_at: DateTime<Utc>) -> Self {
        Self {
            id: new_id(),
            created_at,
            data,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InsertAt {
    #[default]
    Back,
    Front,
}

pub type FilterFn<T> = Box<dyn for<'a> Fn(&'a [Record<T>], &str) -> Vec<&'a Record<T>>>;
pub type RenderItemFn<T> = Box<dyn Fn(&Record<T>) -> String>;
pub type CommitHook<T> = Box<dyn Fn(&[Record<T>])>;

pub fn keep_all<'a, T>(items: &'a [Record<T>], _filter: &str) -> Vec<&'a Record<T>> {
    items.iter().collect()
}

/// CRUD over one persisted collection plus the rendering of its region.
///
/// Each mutation saves the whole collection, redraws, runs the commit hooks,
/// then publishes [`Event::DataChanged`], in that order. Widgets specialise the manager
/// with a filter function and an item renderer instead of subclassing it.
pub struct ListManager<T> {
    key: StoreKey,
    services: Services,
    items: Vec<Record<T>>,
    current_filter: String,
    empty_message: String,
    insert_at: InsertAt,
    filter: FilterFn<T>,
    render_item: RenderItemFn<T>,
    hooks: Vec<CommitHook<T>>,
}

impl<T> std::fmt::Debug for ListManager<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListManager")
            .field("key", &self.key)
            .field("items", &self.items.len())
            .field("current_filter", &self.current_filter)
            .field("insert_at", &self.insert_at)
            .field("hooks", &self.hooks.len())
            .finish()
    }
}

impl<T> ListManager<T>
where
    T: Serialize + DeserializeOwned + 'static,
{
    /// Loads the collection stored under `key`; a missing or unreadable
    /// snapshot starts empty.
    #[instrument(skip(services))]
    pub fn new(key: StoreKey, services: Services) -> Self {
        let items: Vec<Record<T>> = services.store.load(key, Vec::new());
        debug!(count = items.len(), "loaded collection");
        Self {
            key,
            services,
            items,
            current_filter: FILTER_ALL.to_string(),
            empty_message: DEFAULT_EMPTY_MESSAGE.to_string(),
            insert_at: InsertAt::Back,
            filter: Box::new(keep_all),
            render_item: Box::new(|record: &Record<T>| record.id().to_string()),
            hooks: Vec::new(),
        }
    }

    pub fn empty_message(mut self, message: &str) -> Self {
        self.empty_message = message.to_string();
        self
    }

    pub fn insert_at(mut self, at: InsertAt) -> Self {
        self.insert_at = at;
        self
    }

    pub fn filter_with<F>(mut self, filter: F) -> Self
    where
        F: for<'a> Fn(&'a [Record<T>], &str) -> Vec<&'a Record<T>> + 'static,
    {
        self.filter = Box::new(filter);
        self
    }

    pub fn render_with<F>(mut self, render_item: F) -> Self
    where
        F: Fn(&Record<T>) -> String + 'static,
    {
        self.render_item = Box::new(render_item);
        self
    }

    /// Calls `hook` with the current records now and after every commit,
    /// whether or not the save succeeded.
    pub fn observe<F>(&mut self, hook: F)
    where
        F: Fn(&[Record<T>]) + 'static,
    {
        hook(&self.items);
        self.hooks.push(Box::new(hook));
    }

    pub fn key(&self) -> StoreKey {
        self.key
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    pub fn items(&self) -> &[Record<T>] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Record<T>> {
        self.items.iter().find(|item| item.id() == id)
    }

    /// Full id of the single record whose id starts with `prefix`.
    pub fn resolve_prefix(&self, prefix: &str) -> Option<String> {
        if prefix.is_empty() {
            return None;
        }
        if self.get(prefix).is_some() {
            return Some(prefix.to_string());
        }
        let mut matches = self
            .items
            .iter()
            .filter(|item| item.id().starts_with(prefix));
        let first = matches.next()?;
        if matches.next().is_some() {
            None
        } else {
            Some(first.id().to_string())
        }
    }

    pub fn set_filter(&mut self, filter: &str) -> Frame {
        self.current_filter = filter.to_string();
        self.render()
    }

    /// Stores `data` as a new record. Callers validate beforehand.
    #[instrument(skip(self, data), fields(key = %self.key))]
    pub fn add(&mut self, data: T) -> String {
        let record = Record::new(data, self.services.clock.now());
        let id = record.id().to_string();
        match self.insert_at {
            InsertAt::Back => self.items.push(record),
            InsertAt::Front => self.items.insert(0, record),
        }
        debug!(id = %id, count = self.items.len(), "added record");
        self.commit();
        id
    }

    /// Applies `mutate` to the record's fields. Unknown ids are ignored.
    #[instrument(skip(self, mutate), fields(key = %self.key))]
    pub fn update<F>(&mut self, id: &str, mutate: F) -> bool
    where
        F: FnOnce(&mut T),
    {
        let Some(record) = self.items.iter_mut().find(|item| item.id() == id) else {
            debug!("update target not found; ignoring");
            return false;
        };
        mutate(&mut record.data);
        self.commit();
        true
    }

    #[instrument(skip(self, _confirmed), fields(key = %self.key))]
    pub fn delete(&mut self, id: &str, _confirmed: Confirmed) -> bool {
        let Some(idx) = self.items.iter().position(|item| item.id() == id) else {
            debug!("delete target not found; ignoring");
            return false;
        };
        self.items.remove(idx);
        self.commit();
        true
    }

    #[instrument(skip(self, _confirmed), fields(key = %self.key))]
    pub fn clear(&mut self, _confirmed: Confirmed) -> usize {
        let removed = self.items.len();
        self.items.clear();
        self.commit();
        removed
    }

    pub fn visible(&self) -> Vec<&Record<T>> {
        (self.filter)(&self.items, &self.current_filter)
    }

    /// Draws the filtered records into this collection's region.
    pub fn render(&self) -> Frame {
        let visible = self.visible();
        let frame = if visible.is_empty() {
            Frame::Empty(self.empty_message.clone())
        } else {
            Frame::Lines(visible.into_iter().map(|item| (self.render_item)(item)).collect())
        };
        self.services.view.draw(self.key.as_str(), &frame);
        frame
    }

    pub fn persist(&self) {
        self.services.store.save(self.key, &self.items);
    }

    fn commit(&self) {
        self.persist();
        self.render();
        for hook in &self.hooks {
            hook(&self.items);
        }
        self.services.bus.publish(&Event::DataChanged { key: self.key });
    }
}
