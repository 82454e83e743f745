pub mod postgres_assignment_repository;

pub use postgres_assignment_repository::PostgresAssignmentRepository;
