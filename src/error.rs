use actix_web::ResponseError;
use anyhow::Error as AnyhowError;
use bigdecimal::ParseBigDecimalError;
use reqwest::Error as ReqwestError;
use serde_json::Error as JsonError;
use sqlx::error::Error as SqlError;
use std::{
    env::VarError, io::Error as IoError, num::ParseIntError,
    str::ParseBoolError,
};
use thiserror::Error;
use tokio::task::JoinError;
use tokio::time::error::Elapsed;
use tracing::subscriber::SetGlobalDefaultError;
use url::ParseError as UrlError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Io(#[from] IoError),

    #[error("{0}")]
    Url(#[from] UrlError),

    #[error("{0}")]
    Int(#[from] ParseIntError),

    #[error("{0}")]
    Sql(#[from] SqlError),

    #[error("{0}")]
    Var(#[from] VarError),

    #[error("{0}")]
    TokioJoinError(#[from] JoinError),

    #[error("{0}")]
    TokioElapsedError(#[from] Elapsed),

    #[error("{0}")]
    BigDecimalError(#[from] ParseBigDecimalError),

    #[error("{0}")]
    JsonError(#[from] JsonError),

    #[error("{0}")]
    HttpError(#[from] ReqwestError),

    #[error("{0}")]
    ParseBoolError(#[from] ParseBoolError),

    #[error("Tracing error: {0}")]
    SetGlobalDefaultError(#[from] SetGlobalDefaultError),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Server end with error: {0}")]
    ServerError(String),

    #[error("Upstream fetch error: {0}")]
    UpstreamFetch(String),

    #[error("{0}")]
    AnyhowError(#[from] AnyhowError),
}

impl ResponseError for Error {}
