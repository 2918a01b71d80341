// Repositories module - data access layer

pub mod cart_repository;
pub mod catalog_repository;
pub mod schema_manager;
pub mod user_repository;


pub use cart_repository::{CartRepository, PgCartRepository};
pub use catalog_repository::{CatalogRepository, PgCatalogRepository};
pub use schema_manager::{init_pool, CleanupSummary, SchemaManager, SeedSummary};
pub use user_repository::{PgUserRepository, UserRepository};

/// Client span for a single statement or transaction against PostgreSQL
pub(crate) fn postgres_span(operation: &str, table: &str) -> tracing::Span {
    tracing::info_span!(
        "PostgreSQL",
        "db.system" = "postgresql",
        "db.operation" = operation,
        "db.sql.table" = table,
        "otel.kind" = "client",
        "otel.name" = format!("{} {}", operation, table),
        "component" = "sqlx",
    )
}
