use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::error::EngineError;
use crate::index::{CollectionIndex, Slot};
use crate::key::IndexKey;

/// Name of the implicit identifier index every collection carries.
pub const DEFAULT_INDEX_NAME: &str = "_id";

/// A named ordered set of document tables with named indices.
///
/// Items live in a slot arena; the insertion-order list and every index
/// reference items by slot, so documents never move for the lifetime of
/// their entries. Read-only collections reject mutation and never become
/// dirty; writable collections set `changed` on every successful mutation.
#[derive(Debug)]
pub struct Collection {
    name: String,
    read_only: bool,
    changed: bool,
    docs: Vec<Option<Value>>,
    order: Vec<Slot>,
    indices: BTreeMap<String, CollectionIndex>,
    crypts: Option<Value>,
    next_id: i64,
}

impl Collection {
    /// Build a collection from an options table:
    /// `{name, indices?, crypts?, items?}`.
    ///
    /// `indices` is an array of `{name}` tables or a single such table; the
    /// implicit `_id` index is always added. `crypts` is retained opaque.
    /// Items get an auto-assigned `_id` when they arrive without one.
    pub fn from_options(options: &Value, read_only: bool) -> Result<Collection, EngineError> {
        let table = options
            .as_object()
            .ok_or_else(|| EngineError::InvalidOptions("options must be a table".into()))?;

        let name = match table.get("name") {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            _ => {
                return Err(EngineError::InvalidOptions(
                    "'name' must be a non-empty string".into(),
                ));
            }
        };

        let mut indices = BTreeMap::new();
        indices.insert(
            DEFAULT_INDEX_NAME.to_string(),
            CollectionIndex::new(DEFAULT_INDEX_NAME),
        );
        for field in declared_indices(table.get("indices"))? {
            indices
                .entry(field.clone())
                .or_insert_with(|| CollectionIndex::new(field));
        }

        let mut collection = Collection {
            name,
            read_only,
            changed: false,
            docs: Vec::new(),
            order: Vec::new(),
            indices,
            crypts: table.get("crypts").cloned(),
            next_id: 0,
        };

        if let Some(items) = table.get("items") {
            let items = items.as_array().ok_or_else(|| {
                EngineError::InvalidOptions("'items' must be an array of tables".into())
            })?;
            for item in items {
                let map = item.as_object().cloned().ok_or_else(|| {
                    EngineError::InvalidOptions("'items' must be an array of tables".into())
                })?;
                collection.insert_unchecked(map)?;
            }
        }

        Ok(collection)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn is_changed(&self) -> bool {
        self.changed
    }

    pub fn reset_changes(&mut self) {
        self.changed = false;
    }

    pub fn crypts(&self) -> Option<&Value> {
        self.crypts.as_ref()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// The named index, or the `_id` index for an empty name.
    pub fn index(&self, name: &str) -> Option<&CollectionIndex> {
        let name = if name.is_empty() { DEFAULT_INDEX_NAME } else { name };
        self.indices.get(name)
    }

    pub fn index_names(&self) -> impl Iterator<Item = &str> {
        self.indices.keys().map(String::as_str)
    }

    pub fn doc(&self, slot: Slot) -> Option<&Value> {
        self.docs.get(slot).and_then(Option::as_ref)
    }

    /// Items in insertion order.
    pub fn items(&self) -> impl Iterator<Item = &Value> {
        self.order.iter().filter_map(|slot| self.doc(*slot))
    }

    /// The item sequence as a JSON array, for dump and save.
    pub fn items_value(&self) -> Value {
        Value::Array(self.items().cloned().collect())
    }

    // ── Mutation ────────────────────────────────────────────────

    pub fn insert_item(&mut self, item: Value) -> Result<(), EngineError> {
        if self.read_only {
            return Err(EngineError::ReadOnly(self.name.clone()));
        }
        let map = match item {
            Value::Object(map) => map,
            other => return Err(EngineError::NotATable(other.to_string())),
        };
        self.insert_unchecked(map)?;
        self.changed = true;
        Ok(())
    }

    /// Shallow-merge `patch` onto the item with the given `_id`. The `_id`
    /// field itself cannot be patched. Only indices whose field value
    /// actually changed are re-indexed.
    pub fn update_item(
        &mut self,
        id: &Value,
        patch: &Map<String, Value>,
    ) -> Result<(), EngineError> {
        if self.read_only {
            return Err(EngineError::ReadOnly(self.name.clone()));
        }
        let slot = self
            .slot_of_id(id)
            .ok_or_else(|| EngineError::ItemNotFound(id.to_string()))?;

        // Key every index against the current and the patched field value
        // before touching the document.
        let mut reindex: Vec<(String, IndexKey, IndexKey)> = Vec::new();
        {
            let doc = self
                .doc(slot)
                .and_then(Value::as_object)
                .ok_or_else(|| EngineError::ItemNotFound(id.to_string()))?;
            for (name, index) in &self.indices {
                let field = index.field();
                let old = doc.get(field).unwrap_or(&Value::Null);
                let new = if field != DEFAULT_INDEX_NAME {
                    patch.get(field).unwrap_or(old)
                } else {
                    old
                };
                let old_key = IndexKey::new(old)?;
                let new_key = IndexKey::new(new)?;
                if old_key != new_key {
                    reindex.push((name.clone(), old_key, new_key));
                }
            }
        }

        let doc = self
            .docs
            .get_mut(slot)
            .and_then(Option::as_mut)
            .and_then(Value::as_object_mut)
            .ok_or_else(|| EngineError::ItemNotFound(id.to_string()))?;
        for (field, value) in patch {
            if field != DEFAULT_INDEX_NAME {
                doc.insert(field.clone(), value.clone());
            }
        }

        for (name, old_key, new_key) in reindex {
            if let Some(index) = self.indices.get_mut(&name) {
                index.remove(&old_key, slot);
                index.insert(new_key, slot);
            }
        }
        self.changed = true;
        Ok(())
    }

    pub fn delete_item(&mut self, id: &Value) -> Result<(), EngineError> {
        if self.read_only {
            return Err(EngineError::ReadOnly(self.name.clone()));
        }
        let slot = self
            .slot_of_id(id)
            .ok_or_else(|| EngineError::ItemNotFound(id.to_string()))?;

        let mut keys: Vec<(String, IndexKey)> = Vec::new();
        {
            let doc = self
                .doc(slot)
                .and_then(Value::as_object)
                .ok_or_else(|| EngineError::ItemNotFound(id.to_string()))?;
            for (name, index) in &self.indices {
                let value = doc.get(index.field()).unwrap_or(&Value::Null);
                keys.push((name.clone(), IndexKey::new(value)?));
            }
        }

        for (name, key) in keys {
            if let Some(index) = self.indices.get_mut(&name) {
                index.remove(&key, slot);
            }
        }
        self.order.retain(|s| *s != slot);
        self.docs[slot] = None;
        self.changed = true;
        Ok(())
    }

    /// Empty the item list and every index.
    pub fn delete_all(&mut self) {
        self.docs.clear();
        self.order.clear();
        for index in self.indices.values_mut() {
            index.clear();
        }
        if !self.read_only {
            self.changed = true;
        }
    }

    /// Merge another read-only shard into this collection: items are
    /// appended and indices extended.
    pub fn append(&mut self, other: Collection) -> Result<(), EngineError> {
        if !self.read_only {
            return Err(EngineError::MergeIntoWritable(self.name.clone()));
        }
        let Collection {
            mut docs, order, ..
        } = other;
        for slot in order {
            let Some(doc) = docs.get_mut(slot).and_then(Option::take) else {
                continue;
            };
            let map = match doc {
                Value::Object(map) => map,
                other => return Err(EngineError::NotATable(other.to_string())),
            };
            self.insert_unchecked(map)?;
        }
        Ok(())
    }

    // ── Internals ───────────────────────────────────────────────

    fn slot_of_id(&self, id: &Value) -> Option<Slot> {
        let key = IndexKey::new(id).ok()?;
        self.indices.get(DEFAULT_INDEX_NAME)?.find(&key).next()
    }

    /// Arena insertion without the read-only / dirty bookkeeping. Used by
    /// options population, load, and read-only merge.
    fn insert_unchecked(&mut self, mut item: Map<String, Value>) -> Result<(), EngineError> {
        // `next_id` stays past every integer id ever seen, so a fresh
        // assignment can never collide with a live item.
        let assign_fresh = match item.get(DEFAULT_INDEX_NAME) {
            None => true,
            Some(id) => self.slot_of_id(id).is_some(),
        };
        if assign_fresh {
            item.insert(DEFAULT_INDEX_NAME.to_string(), Value::from(self.next_id));
            self.next_id += 1;
        } else if let Some(id) = item.get(DEFAULT_INDEX_NAME).and_then(Value::as_i64) {
            self.next_id = self.next_id.max(id + 1);
        }

        // Validate every index key before mutating anything.
        let mut keys: Vec<(String, IndexKey)> = Vec::with_capacity(self.indices.len());
        for (name, index) in &self.indices {
            let value = item.get(index.field()).unwrap_or(&Value::Null);
            keys.push((name.clone(), IndexKey::new(value)?));
        }

        let slot = self.docs.len();
        self.docs.push(Some(Value::Object(item)));
        self.order.push(slot);
        for (name, key) in keys {
            if let Some(index) = self.indices.get_mut(&name) {
                index.insert(key, slot);
            }
        }
        Ok(())
    }
}

/// Declared index fields from the `indices` option: an array of `{name}`
/// tables, or a single such table as shorthand.
fn declared_indices(indices: Option<&Value>) -> Result<Vec<String>, EngineError> {
    let mut fields = Vec::new();
    match indices {
        None | Some(Value::Null) => {}
        Some(Value::Object(table)) => fields.push(index_name(table)?),
        Some(Value::Array(entries)) => {
            for entry in entries {
                let table = entry.as_object().ok_or_else(|| {
                    EngineError::InvalidOptions("'indices' entries must be tables".into())
                })?;
                fields.push(index_name(table)?);
            }
        }
        Some(_) => {
            return Err(EngineError::InvalidOptions(
                "'indices' must be a table or an array of tables".into(),
            ));
        }
    }
    Ok(fields)
}

fn index_name(table: &Map<String, Value>) -> Result<String, EngineError> {
    match table.get("name") {
        Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        _ => Err(EngineError::InvalidOptions(
            "an index needs a non-empty 'name'".into(),
        )),
    }
}
