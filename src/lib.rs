//! Asynchronous MySQL/MariaDB client driver for Tokio.
//!
//! Speaks the text protocol over TCP, Unix sockets or TLS: handshake and
//! plug-in authentication, queries with buffered or streaming result sets,
//! multi-statement responses, LOAD LOCAL, and a connection pool.
//!
//! ```no_run
//! use minerva::{ConnectOpts, Connection};
//!
//! # async fn demo() -> minerva::Result<()> {
//! let opts = ConnectOpts::new()
//!     .host("127.0.0.1")
//!     .user("root")
//!     .password("secret")
//!     .database("test");
//! let mut conn = Connection::connect(opts).await?;
//!
//! let mut cursor = conn.cursor();
//! cursor.execute("SELECT id, name FROM users").await?;
//! while let Some(row) = cursor.fetch_one().await? {
//!     println!("{row:?}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod connection;
pub mod consts;
pub mod cursor;
pub mod error;
pub mod opts;
pub mod pool;
pub mod protocol;
pub mod resultset;
pub mod value;

#[cfg(test)]
pub(crate) mod test_util;

pub use connection::Connection;
pub use cursor::Cursor;
pub use error::{Error, Result, ServerError};
pub use opts::{ConnectOpts, PoolOpts};
pub use pool::{Pool, PooledConn};
pub use resultset::{FieldDescriptor, ResultSet, Row};
pub use value::Value;

/// Establish a single connection.
pub async fn connect(opts: ConnectOpts) -> Result<Connection> {
    Connection::connect(opts).await
}

/// Create a pool and fill it to its configured `minsize`.
pub async fn create_pool(conn_opts: ConnectOpts, pool_opts: PoolOpts) -> Result<Pool> {
    Pool::connect(conn_opts, pool_opts).await
}
