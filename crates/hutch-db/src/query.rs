use serde_json::{Map, Value};

use hutch_engine::IndexKey;
use hutch_query::{
    CreateStatement, Criteria, DeleteStatement, FindStatement, InsertStatement, Statement,
    UpdateStatement, is_query_table, parse_statement,
};
use hutch_store::BlobStore;

use crate::context::QueryContext;
use crate::database::Database;
use crate::expr;

/// One query execution against a database.
///
/// Selection materializes matched rows (snapshots including `_id`) before
/// any projection or mutation runs, so sub-queries evaluated inside a
/// projection never observe a half-applied verb and the borrow of the
/// target collection ends before its mutation begins.
pub(crate) struct Query<'a, S: BlobStore> {
    db: &'a mut Database<S>,
    ctx: &'a mut QueryContext,
}

/// Criteria with its operand expressions already evaluated to index keys.
enum ResolvedCriteria {
    All,
    Like(IndexKey),
    Range(IndexKey, IndexKey),
    In(Vec<IndexKey>),
}

impl<'a, S: BlobStore> Query<'a, S> {
    pub fn new(db: &'a mut Database<S>, ctx: &'a mut QueryContext) -> Self {
        Self { db, ctx }
    }

    pub fn execute(&mut self, query: &Value) -> Value {
        let statement = match parse_statement(query) {
            Ok(statement) => statement,
            Err(e) => {
                self.ctx.add_error(e.to_string());
                return Value::Null;
            }
        };
        if !self.resolve(&statement) {
            return Value::Null;
        }
        match statement {
            Statement::Find(find) => self.exec_find(&find),
            Statement::Insert(insert) => self.exec_insert(&insert),
            Statement::Update(update) => self.exec_update(&update),
            Statement::Delete(delete) => self.exec_delete(&delete),
            Statement::Create(create) => self.exec_create(&create),
        }
    }

    /// Resolve the statement against the database: the collection must
    /// exist (create verbs aside), the index must be declared, and a
    /// writable verb must not target a read-only collection.
    fn resolve(&mut self, statement: &Statement<'_>) -> bool {
        if matches!(statement, Statement::Create(_)) {
            return true;
        }
        let name = statement.collection();
        let Some(collection) = self.db.collection(name) else {
            self.ctx.add_error(format!("unknown collection: {name}"));
            return false;
        };

        let index = match statement {
            Statement::Find(f) => Some(f.index),
            Statement::Update(u) => Some(u.index),
            Statement::Delete(d) => Some(d.index),
            _ => None,
        };
        if let Some(index) = index {
            if collection.index(index).is_none() {
                self.ctx
                    .add_error(format!("unknown index '{index}' on collection: {name}"));
                return false;
            }
        }

        if !matches!(statement, Statement::Find(_)) && collection.is_read_only() {
            self.ctx.add_error(format!("collection is read-only: {name}"));
            return false;
        }
        true
    }

    // ── Verbs ───────────────────────────────────────────────────

    fn exec_find(&mut self, find: &FindStatement<'_>) -> Value {
        let limit = if find.all { usize::MAX } else { 1 };
        let items = self.find_items(find.collection, find.index, find.criteria, limit);

        let mut results = Vec::with_capacity(items.len());
        for item in &items {
            results.push(self.find_result(find, item));
        }
        if find.all {
            Value::Array(results)
        } else {
            results.into_iter().next().unwrap_or(Value::Null)
        }
    }

    /// Project one selected row: bind it (bare fields + alias), evaluate
    /// the `result` expression, unbind on every path. An absent `result`
    /// projects the row itself.
    fn find_result(&mut self, find: &FindStatement<'_>, item: &Value) -> Value {
        self.ctx.push_row(item.clone());
        let named = self.ctx.push_named(find.alias, item.clone());
        let value = match find.result {
            Some(expression) => self.calculate_value(expression, true),
            None => item.clone(),
        };
        if named {
            self.ctx.pop();
        }
        self.ctx.pop();
        value
    }

    fn exec_insert(&mut self, insert: &InsertStatement<'_>) -> Value {
        let values: Vec<&Value> = match insert.value {
            Value::Array(items) => items.iter().collect(),
            single => vec![single],
        };
        for value in values {
            let item = self.calculate_value(value, false);
            if let Some(collection) = self.db.collection_mut(insert.collection) {
                if let Err(e) = collection.insert_item(item) {
                    self.ctx.add_error(e.to_string());
                }
            }
        }
        self.db.emit_collection_updated(insert.collection);
        Value::from(1)
    }

    fn exec_update(&mut self, update: &UpdateStatement<'_>) -> Value {
        let limit = if update.all { usize::MAX } else { 1 };
        let items = self.find_items(update.collection, update.index, update.criteria, limit);
        let set_expression = Value::Object(update.set.clone());

        for item in &items {
            self.ctx.push_row(item.clone());
            let named = self.ctx.push_named(update.alias, item.clone());
            let patch = self.calculate_value(&set_expression, false);
            if named {
                self.ctx.pop();
            }
            self.ctx.pop();

            match patch {
                Value::Object(patch) => {
                    let id = item.get("_id").cloned().unwrap_or(Value::Null);
                    if let Some(collection) = self.db.collection_mut(update.collection) {
                        if let Err(e) = collection.update_item(&id, &patch) {
                            self.ctx.add_error(e.to_string());
                        }
                    }
                }
                other => {
                    self.ctx
                        .add_error(format!("'set' must evaluate to a table, got {other}"));
                }
            }
        }
        self.db.emit_collection_updated(update.collection);
        Value::from(items.len() as i64)
    }

    fn exec_delete(&mut self, delete: &DeleteStatement<'_>) -> Value {
        let limit = if delete.all { usize::MAX } else { 1 };
        let items = self.find_items(delete.collection, delete.index, delete.criteria, limit);

        for item in &items {
            let id = item.get("_id").cloned().unwrap_or(Value::Null);
            if let Some(collection) = self.db.collection_mut(delete.collection) {
                if let Err(e) = collection.delete_item(&id) {
                    self.ctx.add_error(e.to_string());
                }
            }
        }
        self.db.emit_collection_updated(delete.collection);
        Value::from(items.len() as i64)
    }

    fn exec_create(&mut self, create: &CreateStatement<'_>) -> Value {
        if create.if_not_exists && self.db.collection(create.collection).is_some() {
            return Value::Bool(true);
        }
        let mut options = Map::new();
        options.insert("name".into(), Value::String(create.collection.to_string()));
        if let Some(indices) = create.indices {
            options.insert("indices".into(), indices.clone());
        }
        if let Some(crypts) = create.crypts {
            options.insert("crypts".into(), crypts.clone());
        }
        if let Some(items) = create.items {
            options.insert("items".into(), items.clone());
        }
        if let Err(e) = self.db.create_writable_collection(&Value::Object(options)) {
            self.ctx.add_error(e.to_string());
            return Value::Null;
        }
        Value::Bool(true)
    }

    // ── Selection ───────────────────────────────────────────────

    /// Select up to `limit` rows from the named index per the criteria and
    /// snapshot them. Criteria operand expressions are evaluated first, so
    /// the collection borrow starts only once evaluation is done.
    fn find_items(
        &mut self,
        collection: &str,
        index: &str,
        criteria: Option<&Map<String, Value>>,
        limit: usize,
    ) -> Vec<Value> {
        let criteria = match criteria {
            None => None,
            Some(table) => match Criteria::from_table(table) {
                Ok(criteria) => Some(criteria),
                Err(e) => {
                    self.ctx.add_error(e.to_string());
                    return Vec::new();
                }
            },
        };

        let Some(resolved) = self.resolve_criteria(criteria) else {
            return Vec::new();
        };

        let Some(collection) = self.db.collection(collection) else {
            return Vec::new();
        };
        let Some(index) = collection.index(index) else {
            return Vec::new();
        };

        let slots: Vec<_> = match resolved {
            ResolvedCriteria::All => index.iter().map(|(_, slot)| slot).take(limit).collect(),
            ResolvedCriteria::Like(key) => index.find(&key).take(limit).collect(),
            ResolvedCriteria::Range(min, max) => index.range(&min, &max).take(limit).collect(),
            ResolvedCriteria::In(keys) => {
                let mut slots = Vec::new();
                for key in &keys {
                    if slots.len() >= limit {
                        break;
                    }
                    if let Some(slot) = index.find(key).next() {
                        slots.push(slot);
                    }
                }
                slots
            }
        };

        slots
            .into_iter()
            .filter_map(|slot| collection.doc(slot).cloned())
            .collect()
    }

    fn resolve_criteria(&mut self, criteria: Option<Criteria<'_>>) -> Option<ResolvedCriteria> {
        match criteria {
            None => Some(ResolvedCriteria::All),
            Some(Criteria::Like(expression)) => {
                let value = self.calculate_value(expression, true);
                Some(ResolvedCriteria::Like(self.index_key(&value)?))
            }
            Some(Criteria::Range { min, max }) => {
                let min = self.calculate_value(min, true);
                let max = self.calculate_value(max, true);
                Some(ResolvedCriteria::Range(
                    self.index_key(&min)?,
                    self.index_key(&max)?,
                ))
            }
            Some(Criteria::ExistsIn(expression)) => {
                let elements = match expression {
                    Value::Array(elements) => elements.clone(),
                    other => match self.calculate_value(other, true) {
                        Value::Array(elements) => elements,
                        _ => {
                            self.ctx
                                .add_error("'exists_in' must resolve to an array".to_string());
                            return None;
                        }
                    },
                };
                let mut keys = Vec::with_capacity(elements.len());
                for element in &elements {
                    keys.push(self.index_key(element)?);
                }
                Some(ResolvedCriteria::In(keys))
            }
        }
    }

    fn index_key(&mut self, value: &Value) -> Option<IndexKey> {
        match IndexKey::new(value) {
            Ok(key) => Some(key),
            Err(e) => {
                self.ctx.add_error(e.to_string());
                None
            }
        }
    }

    // ── Expression evaluation ───────────────────────────────────

    /// Recursively evaluate an expression tree.
    ///
    /// - `$`-prefixed strings resolve through the context scope stack
    /// - a table carrying a `query` field runs as a sub-query, unless
    ///   `allow_subquery` is false (the outermost level of `set` and
    ///   `insert` values, where the table is the literal result)
    /// - a single-key `$op` table applies an arithmetic/string operator
    /// - other tables evaluate field-by-field, arrays element-wise
    /// - remaining literals pass through
    pub(crate) fn calculate_value(&mut self, expression: &Value, allow_subquery: bool) -> Value {
        match expression {
            Value::String(s) if s.starts_with('$') => match self.ctx.resolve(&s[1..]) {
                Some(value) => value,
                None => {
                    self.ctx.add_error(format!("cannot resolve reference: {s}"));
                    Value::Null
                }
            },
            Value::Object(table) => {
                if allow_subquery && is_query_table(expression) {
                    return self.exec_subquery(expression);
                }
                if table.len() == 1 {
                    if let Some((key, operand)) = table.iter().next() {
                        if expr::is_operator(key) {
                            return self.apply_operator(key, operand);
                        }
                        if key.starts_with('$') {
                            self.ctx.add_error(format!("unknown operator: {key}"));
                            return Value::Null;
                        }
                    }
                }
                let mut out = Map::new();
                for (field, value) in table {
                    out.insert(field.clone(), self.calculate_value(value, true));
                }
                Value::Object(out)
            }
            Value::Array(elements) => Value::Array(
                elements
                    .iter()
                    .map(|element| self.calculate_value(element, true))
                    .collect(),
            ),
            literal => literal.clone(),
        }
    }

    fn apply_operator(&mut self, op: &str, operand: &Value) -> Value {
        let operands: Vec<Value> = match operand {
            Value::Array(elements) => elements
                .iter()
                .map(|element| self.calculate_value(element, true))
                .collect(),
            single => vec![self.calculate_value(single, true)],
        };
        match expr::apply_operator(op, &operands) {
            Ok(value) => value,
            Err(e) => {
                self.ctx.add_error(e);
                Value::Null
            }
        }
    }

    /// Run a nested query with its own context (named bindings carry over)
    /// and fold its errors back into this execution.
    fn exec_subquery(&mut self, expression: &Value) -> Value {
        if self.ctx.at_depth_limit() {
            self.ctx.add_error("sub-query recursion depth exceeded");
            return Value::Null;
        }
        let mut inner = self.ctx.subquery_context();
        let result = Query::new(&mut *self.db, &mut inner).execute(expression);
        let errors = std::mem::take(inner.errors_mut());
        self.ctx.errors_mut().merge(errors);
        result
    }
}
