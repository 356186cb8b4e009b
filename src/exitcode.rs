//! Standard exit codes (BSD sysexits.h compatible)

/// Successful termination
pub const OK: i32 = 0;

/// Command line usage error
pub const USAGE: i32 = 64;

/// Data format error (invalid input, corrupt data file)
pub const DATAERR: i32 = 65;

/// Cannot open input (unknown connection, missing credentials or token)
pub const NOINPUT: i32 = 66;

/// Service unavailable (Plaid failure, authorization timeout)
pub const UNAVAILABLE: i32 = 69;

/// Can't create output (connection name taken)
pub const CANTCREAT: i32 = 73;

/// Input/output error
pub const IOERR: i32 = 74;

/// Configuration error
pub const CONFIG: i32 = 78;
