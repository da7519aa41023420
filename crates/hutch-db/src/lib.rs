mod bridge;
mod config;
mod context;
mod database;
mod error;
mod expr;
mod query;
mod result;


pub use bridge::{
    DbEvent, Mediator, NullMediator, script_execute_query, script_register_readonly_collections,
};
pub use config::DatabaseOptions;
pub use context::{ErrorStorage, QueryContext};
pub use database::Database;
pub use error::DbError;
pub use result::QueryResult;
