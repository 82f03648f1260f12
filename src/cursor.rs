//! Thin cursors over a session: buffered paging and row-at-a-time
//! streaming.

use tracing::debug;

use crate::connection::Connection;
use crate::error::Result;
use crate::resultset::{FieldDescriptor, Row};

/// Tracks the position inside one query's results. Buffered cursors take
/// ownership of the materialized rows; streaming cursors pull rows through
/// the session one frame at a time and pin it until drained.
pub struct Cursor<'a> {
    conn: &'a mut Connection,
    unbuffered: bool,
    description: Vec<FieldDescriptor>,
    rows: Vec<Row>,
    rowcount: u64,
    rownumber: usize,
    lastrowid: u64,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(conn: &'a mut Connection, unbuffered: bool) -> Self {
        Self {
            conn,
            unbuffered,
            description: Vec::new(),
            rows: Vec::new(),
            rowcount: 0,
            rownumber: 0,
            lastrowid: 0,
        }
    }

    /// Execute a query and position the cursor at its first result set.
    pub async fn execute(&mut self, sql: &str) -> Result<u64> {
        self.rowcount = self.conn.query(sql, self.unbuffered).await?;
        self.load_result();
        Ok(self.rowcount)
    }

    fn load_result(&mut self) {
        self.rownumber = 0;
        self.rows.clear();
        if let Some(result) = self.conn.result_mut() {
            self.description = result.fields.clone();
            self.lastrowid = result.insert_id;
            if !result.unbuffered_active {
                self.rows = std::mem::take(&mut result.rows);
            }
        } else {
            self.description.clear();
            self.lastrowid = 0;
        }
    }

    /// Column descriptors of the current result set.
    pub fn description(&self) -> &[FieldDescriptor] {
        &self.description
    }

    /// Row count of the current result set; `u64::MAX` while a streaming
    /// result is undrained.
    pub fn rowcount(&self) -> u64 {
        self.rowcount
    }

    pub fn rownumber(&self) -> usize {
        self.rownumber
    }

    pub fn lastrowid(&self) -> u64 {
        self.lastrowid
    }

    pub async fn fetch_one(&mut self) -> Result<Option<Row>> {
        if self.unbuffered {
            let row = self.conn.read_next_row().await?;
            if row.is_some() {
                self.rownumber += 1;
            }
            return Ok(row);
        }
        if self.rownumber >= self.rows.len() {
            return Ok(None);
        }
        let row = self.rows[self.rownumber].clone();
        self.rownumber += 1;
        Ok(Some(row))
    }

    pub async fn fetch_many(&mut self, size: usize) -> Result<Vec<Row>> {
        let mut out = Vec::with_capacity(size);
        for _ in 0..size {
            match self.fetch_one().await? {
                Some(row) => out.push(row),
                None => break,
            }
        }
        Ok(out)
    }

    pub async fn fetch_all(&mut self) -> Result<Vec<Row>> {
        if self.unbuffered {
            let mut out = Vec::new();
            while let Some(row) = self.conn.read_next_row().await? {
                self.rownumber += 1;
                out.push(row);
            }
            return Ok(out);
        }
        let out = self.rows.split_off(self.rownumber.min(self.rows.len()));
        self.rownumber = self.rows.len() + out.len();
        Ok(out)
    }

    /// Advance to the next result set of a multi-statement response.
    /// Returns false when there are no more.
    pub async fn next_result(&mut self) -> Result<bool> {
        if self.unbuffered {
            // the current stream must be drained before the terminator
            while self.conn.read_next_row().await?.is_some() {}
        }
        if !self.conn.has_next() {
            return Ok(false);
        }
        self.rowcount = self.conn.next_result(self.unbuffered).await?;
        self.load_result();
        Ok(true)
    }

    /// Exhaust any remaining results so the session can be reused.
    pub async fn close(mut self) -> Result<()> {
        if self.unbuffered {
            let mut drained = 0u64;
            while self.conn.read_next_row().await?.is_some() {
                drained += 1;
            }
            if drained > 0 {
                debug!(rows = drained, "discarded rows on streaming cursor close");
            }
        }
        while self.next_result().await? {}
        Ok(())
    }
}
