//! Sea-ORM migrations for huddle-store database schema

pub use sea_orm_migration::prelude::*;

mod m20250301_000001_create_users_table;
mod m20250301_000002_create_sessions_table;
mod m20250301_000003_create_participants_table;
mod m20250301_000004_create_messages_table;
mod m20250301_000005_create_attachments_table;
mod m20250301_000006_create_read_status_table;
mod m20250301_000007_create_ai_messages_table;
mod m20250301_000008_create_notifications_table;
mod m20250301_000009_create_relationships_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_users_table::Migration),
            Box::new(m20250301_000002_create_sessions_table::Migration),
            Box::new(m20250301_000003_create_participants_table::Migration),
            Box::new(m20250301_000004_create_messages_table::Migration),
            Box::new(m20250301_000005_create_attachments_table::Migration),
            Box::new(m20250301_000006_create_read_status_table::Migration),
            Box::new(m20250301_000007_create_ai_messages_table::Migration),
            Box::new(m20250301_000008_create_notifications_table::Migration),
            Box::new(m20250301_000009_create_relationships_table::Migration),
        ]
    }
}
