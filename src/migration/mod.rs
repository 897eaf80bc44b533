pub use sea_orm_migration::prelude::*;

mod m20241012_000001_create_user_table;
mod m20241012_000002_create_profile_table;
mod m20241012_000003_create_apartment_table;
mod m20241012_000004_create_issue_table;
mod m20241012_000005_create_content_view_table;
mod m20241012_000006_create_report_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20241012_000001_create_user_table::Migration),
            Box::new(m20241012_000002_create_profile_table::Migration),
            Box::new(m20241012_000003_create_apartment_table::Migration),
            Box::new(m20241012_000004_create_issue_table::Migration),
            Box::new(m20241012_000005_create_content_view_table::Migration),
            Box::new(m20241012_000006_create_report_table::Migration),
        ]
    }
}
