pub mod executor;
pub mod parser;
pub mod prepared;
pub mod result;
pub mod statement;
pub mod where_clause;
