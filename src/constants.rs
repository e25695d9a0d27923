pub const DEFAULT_INTERVAL_SECS: u64 = 5;

pub const DEFAULT_MODBUS_PORT: u16 = 502;
pub const DEFAULT_UNIT_ID: u8 = 1;
pub const DEFAULT_TIMEOUT_MS: u64 = 3_000;

pub const DEFAULT_CONNECT_ATTEMPTS: u32 = 5;
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 1_000;
pub const MAX_RETRY_BACKOFF_MS: u64 = 30_000;

pub const DEFAULT_LOG_RETENTION_DAYS: u32 = 7;
pub const LOG_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const LOG_FILE_PREFIX: &str = "modstar-";

pub const UNKNOWN: &str = "Unknown";

pub const FC_READ_HOLDING_REGISTERS: u8 = 3;
pub const FC_READ_INPUT_REGISTERS: u8 = 4;
