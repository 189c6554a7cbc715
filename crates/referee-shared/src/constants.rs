/// Offset applied when a list request omits one or sends a negative value
pub const DEFAULT_OFFSET: i64 = 0;

/// Page size applied when a list request omits one or sends a non-positive value
pub const DEFAULT_LIMIT: i64 = 10;

/// Upper bound on a single page
pub const MAX_LIMIT: i64 = 100;

/// Default HTTP API port (server)
pub const DEFAULT_HTTP_PORT: u16 = 8080;
