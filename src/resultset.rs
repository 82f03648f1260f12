//! Result-set structures: field descriptors, row decoding, and the state a
//! query response leaves on the connection.

use crate::consts::{field_flags, field_types, BINARY_CHARSET_ID};
use crate::error::{Error, Result};
use crate::protocol::Packet;
use crate::value::{decode_text, Value};

/// One decoded row.
pub type Row = Vec<Value>;

/// Column metadata from the field-descriptor packet.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    pub catalog: String,
    pub db: String,
    pub table: String,
    pub org_table: String,
    pub name: String,
    pub org_name: String,
    pub charsetnr: u16,
    pub length: u32,
    pub type_code: u8,
    pub flags: u16,
    pub scale: u8,
}

impl FieldDescriptor {
    pub fn parse(packet: &mut Packet) -> Result<Self> {
        let mut string_field = |what: &str| -> Result<String> {
            let raw = packet
                .read_lenenc_str()?
                .ok_or_else(|| Error::internal(format!("Malformed field descriptor: {what}")))?;
            Ok(String::from_utf8_lossy(&raw).into_owned())
        };

        let catalog = string_field("catalog")?;
        let db = string_field("db")?;
        let table = string_field("table")?;
        let org_table = string_field("org_table")?;
        let name = string_field("name")?;
        let org_name = string_field("org_name")?;

        packet.advance(1); // filler
        let charsetnr = packet.read_u16()?;
        let length = packet.read_u32()?;
        let type_code = packet.read_u8()?;
        let flags = packet.read_u16()?;
        let scale = packet.read_u8()?;
        // two trailing filler bytes

        Ok(Self {
            catalog,
            db,
            table,
            org_table,
            name,
            org_name,
            charsetnr,
            length,
            type_code,
            flags,
            scale,
        })
    }

    pub fn is_nullable(&self) -> bool {
        self.flags & field_flags::NOT_NULL == 0
    }

    /// Whether this column's bytes should be decoded to text. Fixed once at
    /// field-list time.
    pub(crate) fn decode_as_text(&self, use_unicode: bool) -> bool {
        use field_types::*;
        if !use_unicode {
            return false;
        }
        match self.type_code {
            // server-side JSON is binary but CAST output carries the
            // connection charset; decoding by connection encoding covers both
            JSON => true,
            BIT | BLOB | TINY_BLOB | MEDIUM_BLOB | LONG_BLOB | STRING | VAR_STRING | VARCHAR
            | GEOMETRY | ENUM | SET => self.charsetnr != BINARY_CHARSET_ID,
            // numeric and temporal columns are ASCII
            _ => true,
        }
    }
}

/// Decode one text-protocol row frame: a length-coded string per column,
/// NULL signalled by the NULL length marker.
pub fn decode_row(packet: &mut Packet, fields: &[FieldDescriptor], plans: &[bool]) -> Result<Row> {
    let mut row = Vec::with_capacity(fields.len());
    for (field, &as_text) in fields.iter().zip(plans) {
        match packet.read_lenenc_str()? {
            None => row.push(Value::Null),
            Some(data) => row.push(decode_text(field.type_code, as_text, &data)),
        }
    }
    Ok(row)
}

/// The outcome of one server response: descriptors plus either materialized
/// rows or a live unbuffered reader position.
#[derive(Debug, Default)]
pub struct ResultSet {
    pub fields: Vec<FieldDescriptor>,
    pub rows: Vec<Row>,
    pub affected_rows: u64,
    pub insert_id: u64,
    pub server_status: u16,
    pub warning_count: u16,
    pub message: Option<String>,
    pub has_next: bool,
    /// Row frames are still pending on the wire.
    pub(crate) unbuffered_active: bool,
    /// Per-column text-decode plan, parallel to `fields`.
    pub(crate) plans: Vec<bool>,
}

impl ResultSet {
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }
}
