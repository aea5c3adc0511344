//! Embedded schema migrations, run via `sqlx::migrate!` against the
//! `migrations/` directory at the crate root (resolved relative to
//! `CARGO_MANIFEST_DIR`, not this file).

use sqlx::SqlitePool;

pub async fn run(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("migrations").run(pool).await
}
