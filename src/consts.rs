//! Protocol constants: capability flags, command opcodes, server status
//! bits, column types and error codes.

/// MySQL packet header size: 3 bytes length + 1 byte sequence
pub const PACKET_HEADER_SIZE: usize = 4;
/// Maximum packet payload size (16MB - 1)
pub const MAX_PACKET_SIZE: usize = 0xFF_FF_FF;
/// Client-side default for `max_allowed_packet` (16MB)
pub const DEFAULT_MAX_ALLOWED_PACKET: usize = 16 * 1024 * 1024;
/// Length of the handshake scramble
pub const SCRAMBLE_LENGTH: usize = 20;

/// MySQL capability flags
pub mod capabilities {
    pub const CLIENT_LONG_PASSWORD: u32 = 1;
    pub const CLIENT_FOUND_ROWS: u32 = 1 << 1;
    pub const CLIENT_LONG_FLAG: u32 = 1 << 2;
    pub const CLIENT_CONNECT_WITH_DB: u32 = 1 << 3;
    pub const CLIENT_NO_SCHEMA: u32 = 1 << 4;
    pub const CLIENT_COMPRESS: u32 = 1 << 5;
    pub const CLIENT_ODBC: u32 = 1 << 6;
    pub const CLIENT_LOCAL_FILES: u32 = 1 << 7;
    pub const CLIENT_IGNORE_SPACE: u32 = 1 << 8;
    pub const CLIENT_PROTOCOL_41: u32 = 1 << 9;
    pub const CLIENT_INTERACTIVE: u32 = 1 << 10;
    pub const CLIENT_SSL: u32 = 1 << 11;
    pub const CLIENT_IGNORE_SIGPIPE: u32 = 1 << 13;
    pub const CLIENT_TRANSACTIONS: u32 = 1 << 14;
    pub const CLIENT_SECURE_CONNECTION: u32 = 1 << 15;
    pub const CLIENT_MULTI_STATEMENTS: u32 = 1 << 16;
    pub const CLIENT_MULTI_RESULTS: u32 = 1 << 17;
    pub const CLIENT_PS_MULTI_RESULTS: u32 = 1 << 18;
    pub const CLIENT_PLUGIN_AUTH: u32 = 1 << 19;
    pub const CLIENT_CONNECT_ATTRS: u32 = 1 << 20;
    pub const CLIENT_PLUGIN_AUTH_LENENC_CLIENT_DATA: u32 = 1 << 21;
    pub const CLIENT_DEPRECATE_EOF: u32 = 1 << 24;

    /// Base capabilities sent by every connection.
    ///
    /// Note: CLIENT_DEPRECATE_EOF is intentionally NOT included; the result
    /// reader speaks the classic field-list-EOF / row-EOF dialect, which
    /// every server still accepts.
    pub const DEFAULT_CAPABILITIES: u32 = CLIENT_LONG_PASSWORD
        | CLIENT_LONG_FLAG
        | CLIENT_PROTOCOL_41
        | CLIENT_TRANSACTIONS
        | CLIENT_SECURE_CONNECTION
        | CLIENT_PLUGIN_AUTH
        | CLIENT_PLUGIN_AUTH_LENENC_CLIENT_DATA
        | CLIENT_CONNECT_ATTRS;
}

/// Command opcodes the driver sends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Command {
    Quit = 0x01,
    InitDb = 0x02,
    Query = 0x03,
    ProcessKill = 0x0c,
    Ping = 0x0e,
}

/// Server status bits carried in OK/EOF packets
pub mod status {
    pub const SERVER_STATUS_IN_TRANS: u16 = 1;
    pub const SERVER_STATUS_AUTOCOMMIT: u16 = 1 << 1;
    pub const SERVER_MORE_RESULTS_EXISTS: u16 = 1 << 3;
    pub const SERVER_QUERY_NO_GOOD_INDEX_USED: u16 = 1 << 4;
    pub const SERVER_QUERY_NO_INDEX_USED: u16 = 1 << 5;
    pub const SERVER_STATUS_CURSOR_EXISTS: u16 = 1 << 6;
    pub const SERVER_STATUS_LAST_ROW_SENT: u16 = 1 << 7;
    pub const SERVER_STATUS_DB_DROPPED: u16 = 1 << 8;
    pub const SERVER_STATUS_NO_BACKSLASH_ESCAPES: u16 = 1 << 9;
    pub const SERVER_STATUS_METADATA_CHANGED: u16 = 1 << 10;
}

/// Column type codes from the field descriptor
pub mod field_types {
    pub const DECIMAL: u8 = 0;
    pub const TINY: u8 = 1;
    pub const SHORT: u8 = 2;
    pub const LONG: u8 = 3;
    pub const FLOAT: u8 = 4;
    pub const DOUBLE: u8 = 5;
    pub const NULL: u8 = 6;
    pub const TIMESTAMP: u8 = 7;
    pub const LONGLONG: u8 = 8;
    pub const INT24: u8 = 9;
    pub const DATE: u8 = 10;
    pub const TIME: u8 = 11;
    pub const DATETIME: u8 = 12;
    pub const YEAR: u8 = 13;
    pub const NEWDATE: u8 = 14;
    pub const VARCHAR: u8 = 15;
    pub const BIT: u8 = 16;
    pub const JSON: u8 = 245;
    pub const NEWDECIMAL: u8 = 246;
    pub const ENUM: u8 = 247;
    pub const SET: u8 = 248;
    pub const TINY_BLOB: u8 = 249;
    pub const MEDIUM_BLOB: u8 = 250;
    pub const LONG_BLOB: u8 = 251;
    pub const BLOB: u8 = 252;
    pub const VAR_STRING: u8 = 253;
    pub const STRING: u8 = 254;
    pub const GEOMETRY: u8 = 255;
}

/// Column flag bits
pub mod field_flags {
    pub const NOT_NULL: u16 = 1;
    pub const PRIMARY_KEY: u16 = 2;
    pub const UNIQUE_KEY: u16 = 4;
    pub const MULTIPLE_KEY: u16 = 8;
    pub const BLOB: u16 = 16;
    pub const UNSIGNED: u16 = 32;
    pub const ZEROFILL: u16 = 64;
    pub const BINARY: u16 = 128;
}

/// The character-set id marking a binary (no text decode) column
pub const BINARY_CHARSET_ID: u16 = 63;

/// Map a charset name to its collation id for the handshake.
///
/// Only the charsets a client can reasonably ask for are listed; the wire
/// accepts a single byte, so the >255 utf8mb4 collations are represented by
/// the classic utf8mb4_general_ci id.
pub fn charset_id(name: &str) -> Option<u8> {
    let id = match name {
        "big5" => 1,
        "latin1" => 8,
        "latin2" => 9,
        "ascii" => 11,
        "sjis" => 13,
        "hebrew" => 16,
        "euckr" => 19,
        "gb2312" => 24,
        "greek" => 25,
        "cp1250" => 26,
        "gbk" => 28,
        "utf8" | "utf8mb3" => 33,
        "ucs2" => 35,
        "cp866" => 36,
        "macroman" => 39,
        "cp1251" => 51,
        "utf16" => 54,
        "cp1256" => 57,
        "cp1257" => 59,
        "utf32" => 60,
        "binary" => 63,
        "cp932" => 95,
        "eucjpms" => 97,
        "utf8mb4" => 45,
        _ => return None,
    };
    Some(id)
}

/// Server error codes the driver maps or raises itself
pub mod er {
    pub const DB_CREATE_EXISTS: u16 = 1007;
    pub const FILE_NOT_FOUND: u16 = 1017;
    pub const OUT_OF_SORTMEMORY: u16 = 1038;
    pub const CON_COUNT_ERROR: u16 = 1040;
    pub const OUT_OF_RESOURCES: u16 = 1041;
    pub const BAD_HOST_ERROR: u16 = 1042;
    pub const HANDSHAKE_ERROR: u16 = 1043;
    pub const DBACCESS_DENIED_ERROR: u16 = 1044;
    pub const ACCESS_DENIED_ERROR: u16 = 1045;
    pub const BAD_NULL_ERROR: u16 = 1048;
    pub const BAD_DB_ERROR: u16 = 1049;
    pub const BAD_FIELD_ERROR: u16 = 1054;
    pub const DUP_ENTRY: u16 = 1062;
    pub const PARSE_ERROR: u16 = 1064;
    pub const WRONG_DB_NAME: u16 = 1102;
    pub const WRONG_TABLE_NAME: u16 = 1103;
    pub const UNKNOWN_PROCEDURE: u16 = 1106;
    pub const FIELD_SPECIFIED_TWICE: u16 = 1110;
    pub const INVALID_GROUP_FUNC_USE: u16 = 1111;
    pub const UNSUPPORTED_EXTENSION: u16 = 1112;
    pub const TABLE_MUST_HAVE_COLUMNS: u16 = 1113;
    pub const NO_SUCH_TABLE: u16 = 1146;
    pub const SYNTAX_ERROR: u16 = 1149;
    pub const PRIMARY_CANT_HAVE_NULL: u16 = 1171;
    pub const CANT_DO_THIS_DURING_AN_TRANSACTION: u16 = 1179;
    pub const WRONG_COLUMN_NAME: u16 = 1166;
    pub const LOCK_WAIT_TIMEOUT: u16 = 1205;
    pub const LOCK_DEADLOCK: u16 = 1213;
    pub const CANNOT_ADD_FOREIGN: u16 = 1215;
    pub const NO_REFERENCED_ROW: u16 = 1216;
    pub const ROW_IS_REFERENCED: u16 = 1217;
    pub const NO_DEFAULT: u16 = 1230;
    pub const NOT_SUPPORTED_YET: u16 = 1235;
    pub const WARN_DATA_OUT_OF_RANGE: u16 = 1264;
    pub const WARN_DATA_TRUNCATED: u16 = 1265;
    pub const FEATURE_DISABLED: u16 = 1289;
    pub const UNKNOWN_STORAGE_ENGINE: u16 = 1286;
    pub const TRUNCATED_WRONG_VALUE_FOR_FIELD: u16 = 1366;
    pub const ILLEGAL_VALUE_FOR_TYPE: u16 = 1367;
    pub const ROW_IS_REFERENCED_2: u16 = 1451;
    pub const NO_REFERENCED_ROW_2: u16 = 1452;
    pub const CONSTRAINT_FAILED: u16 = 4025;
}

/// Client-side (CR_) error codes
pub mod cr {
    pub const CR_CONNECTION_ERROR: u16 = 2003;
    pub const CR_SERVER_GONE_ERROR: u16 = 2006;
    pub const CR_SERVER_LOST: u16 = 2013;
    pub const CR_COMMANDS_OUT_OF_SYNC: u16 = 2014;
    pub const CR_AUTH_PLUGIN_ERR: u16 = 2061;
}
