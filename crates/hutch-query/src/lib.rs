mod criteria;
mod statement;
mod verb;

pub use criteria::Criteria;
pub use statement::{
    CreateStatement, DeleteStatement, FindStatement, InsertStatement, QueryParseError, Statement,
    UpdateStatement, is_query_table, parse_statement,
};
pub use verb::Verb;
