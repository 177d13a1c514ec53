//! Database bootstrap and the single-writer actor.
//!
//! Reads run on pooled connections; every mutation goes through the writer
//! actor, which owns one connection and wraps each job in an immediate
//! transaction. This serializes all ledger writes and guarantees that a
//! failed job leaves no partial state behind.

use std::any::Any;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use diesel::connection::SimpleConnection;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool, PooledConnection};
use diesel::sqlite::SqliteConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use tokio::sync::{mpsc, oneshot};

use crate::errors::{Error, Result};
use crate::ledger::LedgerError;

pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;
pub type DbConnection = PooledConnection<ConnectionManager<SqliteConnection>>;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

#[derive(Debug)]
struct ConnectionOptions;

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for ConnectionOptions {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> std::result::Result<(), diesel::r2d2::Error> {
        conn.batch_execute(
            "PRAGMA busy_timeout = 5000;
             PRAGMA journal_mode = WAL;
             PRAGMA foreign_keys = ON;",
        )
        .map_err(diesel::r2d2::Error::QueryError)
    }
}

/// Creates the database file if needed, runs pending migrations and returns
/// a ready connection pool.
pub fn init(db_path: &str) -> Result<Arc<DbPool>> {
    if !Path::new(db_path).exists() {
        create_db_file(db_path)?;
    }

    let pool = create_pool(db_path)?;
    run_migrations(&pool)?;
    Ok(pool)
}

/// Builds the r2d2 pool for the given SQLite file.
pub fn create_pool(db_path: &str) -> Result<Arc<DbPool>> {
    let manager = ConnectionManager::<SqliteConnection>::new(db_path);
    let pool = Pool::builder()
        .connection_customizer(Box::new(ConnectionOptions))
        .build(manager)
        .map_err(|e| Error::Database(format!("Failed to create database pool: {}", e)))?;
    Ok(Arc::new(pool))
}

/// Fetches a pooled connection for read queries.
pub fn get_connection(pool: &DbPool) -> Result<DbConnection> {
    pool.get()
        .map_err(|e| Error::Database(format!("Failed to get connection from pool: {}", e)))
}

pub fn run_migrations(pool: &DbPool) -> Result<()> {
    let mut conn = get_connection(pool)?;
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|e| Error::Database(format!("Database migration failed: {}", e)))?;
    Ok(())
}

fn create_db_file(db_path: &str) -> Result<()> {
    let db_dir = Path::new(db_path).parent().ok_or_else(|| {
        Error::Database(format!("Invalid database path: {}", db_path))
    })?;

    if !db_dir.as_os_str().is_empty() && !db_dir.exists() {
        fs::create_dir_all(db_dir)
            .map_err(|e| Error::Database(format!("Failed to create database directory: {}", e)))?;
    }

    fs::File::create(db_path)
        .map_err(|e| Error::Database(format!("Failed to create database file: {}", e)))?;
    Ok(())
}

// Type alias for the job to be executed by the writer actor.
type Job<T> = Box<dyn FnOnce(&mut SqliteConnection) -> Result<T> + Send + 'static>;

/// Handle for sending jobs to the writer actor.
#[derive(Clone)]
pub struct WriteHandle {
    #[allow(clippy::type_complexity)]
    tx: mpsc::Sender<(
        Job<Box<dyn Any + Send + 'static>>,
        oneshot::Sender<Result<Box<dyn Any + Send + 'static>>>,
    )>,
}

impl WriteHandle {
    /// Executes a database job on the writer actor's dedicated connection.
    ///
    /// The job runs inside an immediate transaction: it either fully applies
    /// or the ledger is untouched.
    pub async fn exec<F, T>(&self, job: F) -> Result<T>
    where
        F: FnOnce(&mut SqliteConnection) -> Result<T> + Send + 'static,
        T: Send + 'static + Any,
    {
        let (ret_tx, ret_rx) = oneshot::channel();

        self.tx
            .send((
                Box::new(move |c| job(c).map(|v| Box::new(v) as Box<dyn Any + Send>)),
                ret_tx,
            ))
            .await
            .map_err(|_| Error::Database("Writer actor channel is closed".to_string()))?;

        ret_rx
            .await
            .map_err(|_| Error::Database("Writer actor dropped the reply sender".to_string()))?
            .map(|boxed: Box<dyn Any + Send + 'static>| {
                *boxed
                    .downcast::<T>()
                    .unwrap_or_else(|_| panic!("Failed to downcast writer actor result."))
            })
    }
}

/// Spawns a background Tokio task that acts as the single writer to the
/// database. The actor owns one connection from the pool and processes write
/// jobs serially.
pub fn spawn_writer(pool: Arc<DbPool>) -> WriteHandle {
    #[allow(clippy::type_complexity)]
    let (tx, mut rx) = mpsc::channel::<(
        Job<Box<dyn Any + Send + 'static>>,
        oneshot::Sender<Result<Box<dyn Any + Send + 'static>>>,
    )>(1024);

    tokio::spawn(async move {
        let mut conn = pool
            .get()
            .expect("Failed to get a connection from the DB pool for the writer actor.");

        while let Some((job, reply_tx)) = rx.recv().await {
            let result: Result<Box<dyn Any + Send + 'static>> =
                conn.immediate_transaction::<_, Error, _>(|c| job(c));

            // Ignore error if the receiver has dropped.
            let _ = reply_tx.send(result);
        }
        // rx.recv() returned None: the last WriteHandle was dropped.
    });

    WriteHandle { tx }
}

impl From<diesel::result::Error> for Error {
    fn from(err: diesel::result::Error) -> Self {
        Error::Ledger(LedgerError::from(err))
    }
}
