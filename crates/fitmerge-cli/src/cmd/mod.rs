pub mod completions;
pub mod consolidate;
pub mod decisions;
pub mod to_csv;
pub mod to_sqlite;
pub mod validate;
