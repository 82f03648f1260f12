//! Error taxonomy for the driver.
//!
//! Server errors are classified by errno into the DB-API kinds; client-side
//! failures use the `CR_*` codes from [`crate::consts::cr`]. Conditions the
//! server reports as warnings are surfaced through `tracing` and
//! `Connection::show_warnings`, not as errors.

use crate::consts::{cr, er};

pub type Result<T> = std::result::Result<T, Error>;

/// A decoded server ERR packet (or a client-generated error in the same
/// shape).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerError {
    pub code: u16,
    pub sql_state: Option<String>,
    pub message: String,
}

impl std::fmt::Display for ServerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.sql_state {
            Some(state) => write!(f, "({}, {}): {}", self.code, state, self.message),
            None => write!(f, "({}): {}", self.code, self.message),
        }
    }
}

/// Driver errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Client-side API misuse: command on a closed connection, pool misuse,
    /// invalid options.
    #[error("interface error: {0}")]
    Interface(String),

    /// Problems with the processed data: truncation, out of range, bad cast.
    #[error("data error {0}")]
    Data(ServerError),

    /// Errors related to the database's operation: lost connection, access
    /// denied, deadlock, timeouts.
    #[error("operational error {0}")]
    Operational(ServerError),

    /// Relational-integrity violations: duplicate keys, foreign keys.
    #[error("integrity error {0}")]
    Integrity(ServerError),

    /// The database or the protocol exchange is in an invalid state.
    #[error("internal error {0}")]
    Internal(ServerError),

    /// SQL errors the caller is responsible for: syntax, unknown tables.
    #[error("programming error {0}")]
    Programming(ServerError),

    /// A feature the server refuses to perform.
    #[error("not supported {0}")]
    NotSupported(ServerError),
}

impl Error {
    pub(crate) fn operational(code: u16, message: impl Into<String>) -> Self {
        Error::Operational(ServerError {
            code,
            sql_state: None,
            message: message.into(),
        })
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        Error::Internal(ServerError {
            code: 0,
            sql_state: None,
            message: message.into(),
        })
    }

    pub(crate) fn programming(message: impl Into<String>) -> Self {
        Error::Programming(ServerError {
            code: 0,
            sql_state: None,
            message: message.into(),
        })
    }

    /// The connection is unusable after this error.
    pub(crate) fn server_lost(context: &str) -> Self {
        Error::operational(
            cr::CR_SERVER_LOST,
            format!("Lost connection to MySQL server {context}"),
        )
    }

    /// Classify a server ERR packet into the taxonomy.
    pub(crate) fn from_server(code: u16, sql_state: Option<String>, message: String) -> Self {
        let err = ServerError {
            code,
            sql_state,
            message,
        };
        match code {
            er::WARN_DATA_TRUNCATED
            | er::WARN_DATA_OUT_OF_RANGE
            | er::NO_DEFAULT
            | er::PRIMARY_CANT_HAVE_NULL
            | er::OUT_OF_SORTMEMORY
            | er::TRUNCATED_WRONG_VALUE_FOR_FIELD
            | er::ILLEGAL_VALUE_FOR_TYPE => Error::Data(err),
            er::DUP_ENTRY
            | er::BAD_NULL_ERROR
            | er::NO_REFERENCED_ROW
            | er::NO_REFERENCED_ROW_2
            | er::ROW_IS_REFERENCED
            | er::ROW_IS_REFERENCED_2
            | er::CANNOT_ADD_FOREIGN
            | er::CONSTRAINT_FAILED => Error::Integrity(err),
            er::DB_CREATE_EXISTS
            | er::SYNTAX_ERROR
            | er::PARSE_ERROR
            | er::NO_SUCH_TABLE
            | er::BAD_FIELD_ERROR
            | er::WRONG_DB_NAME
            | er::WRONG_TABLE_NAME
            | er::WRONG_COLUMN_NAME
            | er::FIELD_SPECIFIED_TWICE
            | er::INVALID_GROUP_FUNC_USE
            | er::UNSUPPORTED_EXTENSION
            | er::TABLE_MUST_HAVE_COLUMNS
            | er::CANT_DO_THIS_DURING_AN_TRANSACTION => Error::Programming(err),
            er::NOT_SUPPORTED_YET
            | er::FEATURE_DISABLED
            | er::UNKNOWN_STORAGE_ENGINE
            | er::UNKNOWN_PROCEDURE => Error::NotSupported(err),
            er::FILE_NOT_FOUND
            | er::CON_COUNT_ERROR
            | er::OUT_OF_RESOURCES
            | er::BAD_HOST_ERROR
            | er::HANDSHAKE_ERROR
            | er::DBACCESS_DENIED_ERROR
            | er::ACCESS_DENIED_ERROR
            | er::BAD_DB_ERROR
            | er::LOCK_WAIT_TIMEOUT
            | er::LOCK_DEADLOCK => Error::Operational(err),
            // Unknown errnos: server-internal range below 1000, operational
            // otherwise.
            code if code < 1000 => Error::Internal(err),
            _ => Error::Operational(err),
        }
    }

    /// The server error payload, when this error originated from one.
    pub fn server_error(&self) -> Option<&ServerError> {
        match self {
            Error::Interface(_) => None,
            Error::Data(e)
            | Error::Operational(e)
            | Error::Integrity(e)
            | Error::Internal(e)
            | Error::Programming(e)
            | Error::NotSupported(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::operational(
            cr::CR_SERVER_LOST,
            format!("Lost connection to MySQL server ({e})"),
        )
    }
}
