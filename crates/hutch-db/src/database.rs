use std::collections::BTreeMap;
use std::path::Path;

use serde_json::{Map, Value, json};

use hutch_engine::Collection;
use hutch_store::{BlobStore, read_collection_file};

use crate::bridge::{DbEvent, Mediator, NullMediator};
use crate::config::DatabaseOptions;
use crate::context::QueryContext;
use crate::error::DbError;
use crate::query::Query;
use crate::result::QueryResult;

/// Writable bookkeeping collection every database carries.
const SYSTEM_COLLECTION: &str = "hutch/db";

/// Registry of collections plus the persistence and lifecycle machinery.
///
/// One instance per host; the host wires a mediator for outbound events and
/// forwards its heartbeat / save-state messages to the handler methods.
/// Everything runs synchronously inside the host's tick.
pub struct Database<S: BlobStore> {
    collections: BTreeMap<String, Collection>,
    store: S,
    mediator: Box<dyn Mediator>,
    is_corrupted: bool,
    is_ready: bool,
    next_temporary: u64,
    readonly_options: DatabaseOptions,
    readonly_files: Vec<String>,
}

impl<S: BlobStore> std::fmt::Debug for Database<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("collections", &self.collections)
            .field("is_corrupted", &self.is_corrupted)
            .field("is_ready", &self.is_ready)
            .field("next_temporary", &self.next_temporary)
            .field("readonly_options", &self.readonly_options)
            .field("readonly_files", &self.readonly_files)
            .finish()
    }
}

impl<S: BlobStore> Database<S> {
    /// Build a database from an options table:
    /// `{directory, collections, writable_collections}`.
    ///
    /// Writable collections (and the system collection) exist immediately;
    /// stored items and read-only files load on the first heartbeat.
    pub fn new(store: S, options: &Value) -> Result<Self, DbError> {
        let options = DatabaseOptions::from_value(options)?;
        let mut db = Database {
            collections: BTreeMap::new(),
            store,
            mediator: Box::new(NullMediator),
            is_corrupted: false,
            is_ready: false,
            next_temporary: 0,
            readonly_options: options.clone(),
            readonly_files: Vec::new(),
        };

        db.create_writable_collection(&json!({
            "name": SYSTEM_COLLECTION,
            "indices": { "name": "name" },
            "items": []
        }))
        .map_err(|e| DbError::Config(e.to_string()))?;

        for collection_options in &options.writable_collections {
            db.create_writable_collection(collection_options)
                .map_err(|e| DbError::Config(format!("invalid writable collection: {e}")))?;
        }
        Ok(db)
    }

    /// Install the host's mediator adapter. Events before this point go
    /// nowhere.
    pub fn set_mediator(&mut self, mediator: Box<dyn Mediator>) {
        self.mediator = mediator;
    }

    pub fn is_ready(&self) -> bool {
        self.is_ready
    }

    pub fn is_corrupted(&self) -> bool {
        self.is_corrupted
    }

    /// Clear the corruption flag. Lost data is not restored.
    pub fn repair(&mut self) {
        self.is_corrupted = false;
    }

    pub fn collection(&self, name: &str) -> Option<&Collection> {
        self.collections.get(name)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn collection_names(&self) -> impl Iterator<Item = &str> {
        self.collections.keys().map(String::as_str)
    }

    pub(crate) fn collection_mut(&mut self, name: &str) -> Option<&mut Collection> {
        self.collections.get_mut(name)
    }

    pub(crate) fn emit_collection_updated(&self, name: &str) {
        self.mediator.publish(DbEvent::CollectionUpdated {
            collection: name.to_string(),
        });
    }

    // ── Query entry points ──────────────────────────────────────

    pub fn execute_query(&mut self, query: &Value) -> QueryResult {
        let mut ctx = QueryContext::new();
        self.execute_internal(query, &mut ctx)
    }

    /// Execute a query arriving as serialized JSON.
    pub fn execute_query_str(&mut self, query: &str) -> QueryResult {
        match serde_json::from_str::<Value>(query) {
            Ok(value) => self.execute_query(&value),
            Err(e) => QueryResult::failed(format!("query is not valid JSON: {e}")),
        }
    }

    /// Run queries in array order; later queries observe earlier effects.
    /// The flag is true iff no query errored; earlier successful effects
    /// stay in place when a later query fails.
    pub fn execute_query_array(&mut self, queries: &[Value]) -> (bool, Vec<QueryResult>) {
        let mut ok = true;
        let mut results = Vec::with_capacity(queries.len());
        for query in queries {
            let result = self.execute_query(query);
            ok &= !result.has_errors();
            results.push(result);
        }
        (ok, results)
    }

    fn execute_internal(&mut self, query: &Value, ctx: &mut QueryContext) -> QueryResult {
        let result = Query::new(self, ctx).execute(query);
        if ctx.errors().is_empty() {
            QueryResult::ok(result)
        } else {
            let serialized = serde_json::to_string(query).unwrap_or_default();
            ctx.add_error(format!("In query: {serialized}"));
            QueryResult::failed(ctx.errors().combined())
        }
    }

    // ── Dump / restore ──────────────────────────────────────────

    /// Build a replayable dump: one insert query per
    /// `{collection_name: renamed_collection}` entry, carrying the source
    /// collection's items. Unknown collections and non-string renames are
    /// skipped.
    pub fn create_dump(&self, dump_table: &Map<String, Value>) -> Vec<Value> {
        let mut queries = Vec::new();
        for (name, renamed) in dump_table {
            let (Some(collection), Some(renamed)) = (self.collection(name), renamed.as_str())
            else {
                continue;
            };
            queries.push(json!({
                "query": "insert",
                "collection": renamed,
                "value": collection.items_value()
            }));
        }
        queries
    }

    /// Replay a dump; stops at the first failing query.
    pub fn apply_dump(&mut self, queries: &[Value]) -> bool {
        for query in queries {
            if self.execute_query(query).has_errors() {
                return false;
            }
        }
        true
    }

    // ── Collection creation ─────────────────────────────────────

    /// Create a writable collection from an options table. An existing
    /// collection of the same name is left untouched.
    pub fn create_writable_collection(&mut self, options: &Value) -> Result<String, DbError> {
        let collection = Collection::from_options(options, false)?;
        let name = collection.name().to_string();
        self.collections.entry(name.clone()).or_insert(collection);
        Ok(name)
    }

    /// Create a writable collection under a generated `temp%020d` name.
    pub fn create_temporary_collection(&mut self, options: &Value) -> Result<String, DbError> {
        let name = format!("temp{:020}", self.next_temporary);
        self.next_temporary += 1;
        let mut options = options
            .as_object()
            .cloned()
            .ok_or_else(|| DbError::Config("collection options must be a table".into()))?;
        options.insert("name".into(), Value::String(name));
        self.create_writable_collection(&Value::Object(options))
    }

    /// Create a read-only collection, or merge it into an existing
    /// read-only collection of the same name.
    fn create_readonly_collection(&mut self, options: &Value) -> Result<String, DbError> {
        let shard = Collection::from_options(options, true)?;
        let name = shard.name().to_string();
        match self.collections.get_mut(&name) {
            None => {
                self.collections.insert(name.clone(), shard);
            }
            Some(existing) if existing.is_read_only() => existing.append(shard)?,
            Some(_) => {
                tracing::warn!(
                    collection = %name,
                    "read-only shard shadows a writable collection; skipped"
                );
            }
        }
        Ok(name)
    }

    // ── Read-only registration ──────────────────────────────────

    /// Register additional read-only collection files (full path stems).
    /// Stems are deduplicated; if anything new arrived, all read-only
    /// collections are dropped and re-read from the registered files.
    pub fn register_readonly_collections(&mut self, stems: &[Value]) -> Result<(), DbError> {
        let mut incoming = Vec::with_capacity(stems.len());
        for stem in stems {
            let stem = stem.as_str().ok_or_else(|| {
                DbError::Config("read-only collections must be an array of strings".into())
            })?;
            incoming.push(stem);
        }

        let mut added = false;
        for stem in incoming {
            if !self.readonly_files.iter().any(|known| known == stem) {
                self.readonly_files.push(stem.to_string());
                added = true;
            }
        }
        if added {
            self.reload_readonly_collections();
        }
        Ok(())
    }

    /// Seed the registered file list from the construction options
    /// (directory prefix + stem per entry).
    fn register_base_readonly_collections(&mut self) {
        let directory = self.readonly_options.directory.clone();
        for stem in &self.readonly_options.collections {
            let path = format!("{directory}{stem}");
            if !self.readonly_files.contains(&path) {
                self.readonly_files.push(path);
            }
        }
    }

    fn load_readonly_collections(&mut self) {
        for registered in self.readonly_files.clone() {
            // A stem registered with an explicit .dat extension selects the
            // checksummed layout; everything else reads {stem}.json.
            let (stem, encoded) = match registered.strip_suffix(".dat") {
                Some(stripped) => (stripped, true),
                None => (registered.as_str(), false),
            };
            let body = match read_collection_file(Path::new(stem), encoded) {
                Ok(body) => body,
                Err(e) => {
                    tracing::warn!(file = %registered, error = %e, "skipping unreadable read-only collection file");
                    continue;
                }
            };
            let options = match serde_json::from_str::<Value>(&body) {
                Ok(options) => options,
                Err(e) => {
                    tracing::warn!(file = %registered, error = %e, "skipping unparseable read-only collection file");
                    continue;
                }
            };
            if let Err(e) = self.create_readonly_collection(&options) {
                tracing::warn!(file = %registered, error = %e, "skipping invalid read-only collection");
            }
        }
    }

    fn reload_readonly_collections(&mut self) {
        self.collections
            .retain(|_, collection| !collection.is_read_only());
        self.load_readonly_collections();
    }

    // ── Persistence ─────────────────────────────────────────────

    /// Load stored items into the writable collections, collect-then-apply:
    /// every blob is read and validated first, and collections are only
    /// cleared and repopulated when all of them parse as arrays of tables.
    fn load_writable_collections(&mut self) -> bool {
        let mut staged: Vec<(String, Vec<Map<String, Value>>)> = Vec::new();
        for (name, collection) in &self.collections {
            if collection.is_read_only() || !self.store.data_exists(name) {
                continue;
            }
            let body = match self.store.read_data(name) {
                Ok(body) => body,
                Err(_) => return false,
            };
            let Ok(Value::Array(values)) = serde_json::from_str::<Value>(&body) else {
                return false;
            };
            let mut items = Vec::with_capacity(values.len());
            for value in values {
                match value {
                    Value::Object(item) => items.push(item),
                    _ => return false,
                }
            }
            staged.push((name.clone(), items));
        }

        let mut ok = true;
        for (name, items) in staged {
            let Some(collection) = self.collections.get_mut(&name) else {
                continue;
            };
            collection.delete_all();
            for item in items {
                if let Err(e) = collection.insert_item(Value::Object(item)) {
                    tracing::warn!(collection = %name, error = %e, "stored item rejected on load");
                    ok = false;
                }
            }
            collection.reset_changes();
        }
        ok
    }

    /// Persist every dirty writable collection as a JSON item array under
    /// its name; the dirty flag clears only when the write succeeded.
    pub fn save_writable_collections(&mut self) {
        let dirty: Vec<String> = self
            .collections
            .iter()
            .filter(|(_, collection)| collection.is_changed())
            .map(|(name, _)| name.clone())
            .collect();

        for name in dirty {
            let Some(collection) = self.collections.get(&name) else {
                continue;
            };
            let body = match serde_json::to_string(&collection.items_value()) {
                Ok(body) => body,
                Err(e) => {
                    tracing::warn!(collection = %name, error = %e, "failed to serialize collection");
                    continue;
                }
            };
            match self.store.write_data(&name, &body) {
                Ok(()) => {
                    if let Some(collection) = self.collections.get_mut(&name) {
                        collection.reset_changes();
                    }
                }
                Err(e) => {
                    tracing::warn!(collection = %name, error = %e, "failed to persist collection");
                }
            }
        }
    }

    // ── Lifecycle ───────────────────────────────────────────────

    /// Full load pass: writable items from the blob store, then read-only
    /// collections from files. A writable load failure sets the corruption
    /// flag and skips read-only loading; readiness is reached either way.
    pub fn load(&mut self) {
        if self.load_writable_collections() {
            self.register_base_readonly_collections();
            self.load_readonly_collections();
        } else {
            self.is_corrupted = true;
        }
        self.complete_loading();
    }

    fn complete_loading(&mut self) {
        if !self.is_ready {
            self.is_ready = true;
            tracing::debug!("database ready");
            self.mediator.publish(DbEvent::Ready);
        }
    }

    /// Host heartbeat: the first one triggers the load.
    pub fn handle_heartbeat(&mut self) {
        if !self.is_ready {
            self.load();
        }
    }

    /// Host save-state command.
    pub fn handle_save_state(&mut self) {
        self.save_writable_collections();
    }
}
