use log::debug;
use sea_orm::{
    ConnectionTrait, DatabaseTransaction, DbBackend, Statement, TransactionTrait, Value,
};

use crate::config::AdvisoryLockStrategy;
use crate::error::NestedSetError;

/// A transaction that optionally holds a PostgreSQL advisory lock for one tree.
///
/// The lock is transaction-scoped (`pg_advisory_xact_lock`): PostgreSQL
/// releases it when the outermost transaction ends. Opened on a
/// `DatabaseTransaction`, the inner transaction is a savepoint of the caller's
/// transaction and the lock stays held until the caller commits or rolls back.
pub struct LockedTransaction {
    txn: DatabaseTransaction,
}

impl LockedTransaction {
    pub async fn acquire<C>(
        strategy: &AdvisoryLockStrategy,
        db: &C,
        scope: Option<&str>,
    ) -> Result<Self, NestedSetError>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        let key = match strategy {
            AdvisoryLockStrategy::Disabled => None,
            AdvisoryLockStrategy::Namespaced(key) => Some(key.scoped(scope)),
        };

        let key = match key {
            Some(key) if db.get_database_backend() != DbBackend::Postgres => {
                debug!("advisory lock `{key}` skipped: backend has no advisory locks");
                None
            }
            key => key,
        };

        let txn = db.begin().await?;

        if let Some(ref key) = key {
            if let Err(err) = acquire_lock(&txn, key).await {
                let _ = txn.rollback().await;
                return Err(err);
            }
            debug!("advisory lock `{key}` acquired");
        }

        Ok(Self { txn })
    }

    pub fn connection(&self) -> &DatabaseTransaction {
        &self.txn
    }

    pub async fn commit(self) -> Result<(), NestedSetError> {
        self.txn.commit().await?;
        Ok(())
    }

    pub async fn rollback(self) -> Result<(), NestedSetError> {
        self.txn.rollback().await?;
        Ok(())
    }

    /// Commit on success, roll back on failure and hand the first error back.
    pub async fn finish<T>(self, result: Result<T, NestedSetError>) -> Result<T, NestedSetError> {
        match result {
            Ok(value) => {
                self.commit().await?;
                Ok(value)
            }
            Err(err) => {
                debug!("rolling back nested set transaction: {err}");
                let _ = self.rollback().await;
                Err(err)
            }
        }
    }
}

async fn acquire_lock(txn: &DatabaseTransaction, key: &str) -> Result<(), NestedSetError> {
    txn.execute(Statement::from_sql_and_values(
        DbBackend::Postgres,
        "SELECT pg_advisory_xact_lock(hashtext($1), 0)",
        vec![Value::from(key)],
    ))
    .await?;
    Ok(())
}
