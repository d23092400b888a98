use diesel::r2d2::{ConnectionManager, Pool};
use diesel::sqlite::SqliteConnection;

pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;

pub fn create_pool(database_url: &str) -> DbPool {
    let manager = ConnectionManager::<SqliteConnection>::new(database_url);
    // The dispatch loop is single-threaded; the pool exists for the
    // r2d2 checkout/health machinery, not for concurrency.
    let pool = Pool::builder()
        .max_size(2)
        .test_on_check_out(true)
        .build(manager)
        .expect("failed to create database pool");

    tracing::info!("database connection pool created");
    pool
}
