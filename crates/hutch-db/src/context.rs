use serde_json::Value;

/// Sub-query recursion bound; a projection expression deeper than this is
/// treated as runaway and fails the query.
pub(crate) const SUBQUERY_DEPTH_LIMIT: usize = 32;

/// Accumulated error messages for one query execution. Errors never abort:
/// they collect here and surface in the final [`QueryResult`](crate::QueryResult).
#[derive(Debug, Default)]
pub struct ErrorStorage {
    messages: Vec<String>,
}

impl ErrorStorage {
    pub fn add(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn merge(&mut self, other: ErrorStorage) {
        self.messages.extend(other.messages);
    }

    pub fn combined(&self) -> String {
        self.messages.join("\n")
    }
}

/// Per-query evaluation environment: a stack of bindings plus the error
/// accumulator.
///
/// An unnamed binding exposes its fields bare (`$age`); a named binding
/// exposes the bound row under its alias (`$p`, `$p.age`). Resolution walks
/// the stack top-down. Sub-query executions get a fresh context seeded with
/// the named bindings only, so row scopes never leak across query
/// boundaries.
#[derive(Debug, Default)]
pub struct QueryContext {
    scopes: Vec<Scope>,
    errors: ErrorStorage,
    depth: usize,
}

#[derive(Debug, Clone)]
enum Scope {
    Row(Value),
    Named(String, Value),
}

impl QueryContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context for a nested sub-query: named bindings carry over, unnamed
    /// row bindings do not, depth increases.
    pub(crate) fn subquery_context(&self) -> QueryContext {
        QueryContext {
            scopes: self
                .scopes
                .iter()
                .filter(|scope| matches!(scope, Scope::Named(..)))
                .cloned()
                .collect(),
            errors: ErrorStorage::default(),
            depth: self.depth + 1,
        }
    }

    pub(crate) fn at_depth_limit(&self) -> bool {
        self.depth >= SUBQUERY_DEPTH_LIMIT
    }

    pub fn push_row(&mut self, row: Value) {
        self.scopes.push(Scope::Row(row));
    }

    /// Push a named binding; an empty alias pushes nothing and reports so.
    pub fn push_named(&mut self, name: &str, value: Value) -> bool {
        if name.is_empty() {
            return false;
        }
        self.scopes.push(Scope::Named(name.to_string(), value));
        true
    }

    pub fn pop(&mut self) {
        self.scopes.pop();
    }

    /// Resolve a `$`-stripped dotted path against the scope stack.
    pub fn resolve(&self, path: &str) -> Option<Value> {
        let segments: Vec<&str> = path.split('.').collect();
        let (first, rest) = segments.split_first()?;
        if first.is_empty() {
            return None;
        }
        for scope in self.scopes.iter().rev() {
            let base = match scope {
                Scope::Named(name, value) if name == first => Some(value),
                Scope::Row(row) => row.get(first),
                Scope::Named(..) => None,
            };
            if let Some(base) = base {
                let mut current = base;
                for segment in rest {
                    current = current.get(segment)?;
                }
                return Some(current.clone());
            }
        }
        None
    }

    pub fn errors(&self) -> &ErrorStorage {
        &self.errors
    }

    pub fn errors_mut(&mut self) -> &mut ErrorStorage {
        &mut self.errors
    }

    pub fn add_error(&mut self, message: impl Into<String>) {
        self.errors.add(message);
    }
}
