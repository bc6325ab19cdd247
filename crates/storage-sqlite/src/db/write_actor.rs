use super::{get_connection, DbPool};
use crate::errors::StorageError;
use diesel::SqliteConnection;
use log::{debug, error};
use papertrade_core::errors::{DatabaseError, Error, Result};
use std::any::Any;
use tokio::sync::{mpsc, oneshot};

/// Jobs run against the writer's connection and report through core errors.
type Job<T> = Box<dyn FnOnce(&mut SqliteConnection) -> Result<T> + Send + 'static>;

type ErasedJob = Job<Box<dyn Any + Send + 'static>>;
type ErasedReply = oneshot::Sender<Result<Box<dyn Any + Send + 'static>>>;

/// Handle for sending jobs to the writer actor.
#[derive(Clone)]
pub struct WriteHandle {
    tx: mpsc::Sender<(ErasedJob, ErasedReply)>,
}

impl WriteHandle {
    /// Run `job` on the writer's connection inside an `IMMEDIATE` transaction.
    ///
    /// The job is rolled back when it returns an error.
    pub async fn exec<F, T>(&self, job: F) -> Result<T>
    where
        F: FnOnce(&mut SqliteConnection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (ret_tx, ret_rx) = oneshot::channel();

        self.tx
            .send((
                Box::new(move |c| job(c).map(|v| Box::new(v) as Box<dyn Any + Send>)),
                ret_tx,
            ))
            .await
            .map_err(|_| writer_gone("writer actor stopped"))?;

        let boxed = ret_rx
            .await
            .map_err(|_| writer_gone("writer actor dropped the reply"))??;

        boxed
            .downcast::<T>()
            .map(|v| *v)
            .map_err(|_| Error::Database(DatabaseError::Internal("writer result type mismatch".into())))
    }
}

fn writer_gone(message: &str) -> Error {
    Error::Database(DatabaseError::ConnectionFailed(message.to_string()))
}

/// Start the single writer for this process.
///
/// The writer owns one pooled connection for its whole life and runs jobs
/// one at a time on a dedicated thread, so a busy database never stalls the
/// async runtime. It stops once every [`WriteHandle`] is dropped.
pub fn spawn_writer(pool: &DbPool) -> Result<WriteHandle> {
    let mut conn = get_connection(pool)?;
    let (tx, mut rx) = mpsc::channel::<(ErasedJob, ErasedReply)>(1024);

    std::thread::Builder::new()
        .name("sqlite-writer".into())
        .spawn(move || {
            debug!("SQLite writer started");
            while let Some((job, reply_tx)) = rx.blocking_recv() {
                let result: Result<Box<dyn Any + Send + 'static>> = conn
                    .immediate_transaction::<_, StorageError, _>(|c| {
                        job(c).map_err(StorageError::from)
                    })
                    .map_err(Error::from);

                if let Err(e) = &result {
                    error!("Write job failed: {}", e);
                }
                // The requester may have timed out; the write still happened.
                let _ = reply_tx.send(result);
            }
            debug!("SQLite writer stopped");
        })
        .map_err(|e| Error::Database(DatabaseError::Internal(e.to_string())))?;

    Ok(WriteHandle { tx })
}
