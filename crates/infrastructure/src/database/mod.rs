pub mod manager;
pub mod postgres;
pub mod sqlite;

pub use manager::{DatabaseManager, DatabasePool, DatabaseType};
pub use postgres::PostgresAssignmentRepository;
pub use sqlite::SqliteAssignmentRepository;
