pub mod sqlite_assignment_repository;

pub use sqlite_assignment_repository::SqliteAssignmentRepository;
