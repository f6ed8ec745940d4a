//! Per-request transaction scope
//!
//! Mutating handlers run their service call through [`with_transaction`].
//! The outcome decides the transaction's fate:
//!
//! | handler outcome             | transaction |
//! |-----------------------------|-------------|
//! | `Ok`, 2xx response          | commit      |
//! | `Ok`, any other status      | rollback    |
//! | `Err(ApiError)`             | rollback    |
//! | panic                       | rollback, panic resumed |

use std::future::Future;
use std::panic::{resume_unwind, AssertUnwindSafe};

use axum::response::{IntoResponse, Response};
use futures::FutureExt;

use super::error::ApiError;
use crate::db::Transactional;

/// Open a transaction, hand it to `handler`, then commit or roll back.
///
/// The handler owns the transaction while it runs and returns it alongside
/// its result. A failed `begin` or `commit` renders the 500 envelope.
pub async fn with_transaction<D, F, Fut, R>(store: &D, handler: F) -> Response
where
    D: Transactional,
    F: FnOnce(D::Tx) -> Fut,
    Fut: Future<Output = (D::Tx, Result<R, ApiError>)>,
    R: IntoResponse,
{
    let tx = match store.begin().await {
        Ok(tx) => tx,
        Err(e) => {
            tracing::error!(error = %e, "failed to begin transaction");
            return ApiError::from(e).into_response();
        }
    };

    let (tx, result) = match AssertUnwindSafe(async move { handler(tx).await })
        .catch_unwind()
        .await
    {
        Ok(outcome) => outcome,
        Err(panic) => {
            // The handler's future, and the transaction inside it, are already dropped.
            tracing::error!("handler panicked, transaction rolled back");
            resume_unwind(panic);
        }
    };

    let response = match result {
        Ok(body) => body.into_response(),
        Err(err) => {
            rollback(store, tx).await;
            return err.into_response();
        }
    };

    let status = response.status();
    if !status.is_success() {
        rollback(store, tx).await;
        return response;
    }

    match store.commit(tx).await {
        Ok(()) => {
            tracing::debug!(%status, "transaction committed");
            response
        }
        Err(e) => {
            tracing::error!(error = %e, "commit failed");
            ApiError::from(e).into_response()
        }
    }
}

async fn rollback<D: Transactional>(store: &D, tx: D::Tx) {
    match store.rollback(tx).await {
        Ok(()) => tracing::debug!("transaction rolled back"),
        Err(e) => tracing::warn!(error = %e, "rollback failed"),
    }
}
