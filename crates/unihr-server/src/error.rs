//! Startup errors.

use thiserror::Error;
use unihr_core::error::UniHrError;
use unihr_db::DbError;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Db(#[from] DbError),

    #[error(transparent)]
    Domain(#[from] UniHrError),
}
