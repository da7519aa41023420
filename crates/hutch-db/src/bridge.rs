use serde_json::{Value, json};

use hutch_store::BlobStore;

use crate::database::Database;

/// Lifecycle messages the database publishes through the host's mediator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbEvent {
    /// Fired exactly once, after the first completed load.
    Ready,
    /// Fired synchronously after every mutating verb commits.
    CollectionUpdated { collection: String },
}

/// Outbound seam to the host's pub/sub mediator. Wiring is an explicit
/// step: hosts install their adapter with
/// [`Database::set_mediator`](crate::Database::set_mediator); the default
/// discards events.
pub trait Mediator {
    fn publish(&self, event: DbEvent);
}

#[derive(Debug, Default)]
pub struct NullMediator;

impl Mediator for NullMediator {
    fn publish(&self, _event: DbEvent) {}
}

/// Script-registry entry point for `db_execute_query`.
///
/// Returns `{status: 1, result}` on success and `{status: 0, errors}` on
/// failure, mirroring what the scripting layer expects.
pub fn script_execute_query<S: BlobStore>(db: &mut Database<S>, args: &[Value]) -> Value {
    let Some(query) = args.first() else {
        return json!({ "status": 0, "errors": "db_execute_query needs a query table argument" });
    };
    let result = db.execute_query(query);
    match result.errors() {
        None => json!({ "status": 1, "result": result.result() }),
        Some(errors) => {
            tracing::error!(%errors, "script query failed");
            json!({ "status": 0, "errors": errors })
        }
    }
}

/// Script-registry entry point for `db_register_readonly_collections`.
pub fn script_register_readonly_collections<S: BlobStore>(
    db: &mut Database<S>,
    args: &[Value],
) -> Value {
    match args.first() {
        Some(Value::Array(stems)) => {
            if let Err(e) = db.register_readonly_collections(stems) {
                tracing::error!(error = %e, "read-only collection registration failed");
            }
        }
        _ => {
            tracing::error!("db_register_readonly_collections needs an array argument");
        }
    }
    Value::Null
}
