use std::time::Duration;

// Largest integer a JSON number can carry without losing precision (2^53 - 1)
// Caller supplied numbers above it are rejected as they may have been rounded
pub const MAX_SAFE_INTEGER: u64 = 9_007_199_254_740_991;

// Maximum number of logs a single filter request may ask the driver for
pub const MAX_FILTER_LIMIT: u32 = 256;
// Default page used by a filter until `apply` is called
pub const DEFAULT_FILTER_LIMIT: u32 = 10;
// Default upper bound of a filter range (full uint32 block range)
pub const DEFAULT_FILTER_RANGE_TO: u64 = u32::MAX as u64;

// A head younger than this is considered fully synced
pub const HEAD_FRESHNESS_WINDOW_MILLIS: u64 = 30 * 1000;

// Delay between two pulls when the driver doesn't support long polling
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
// Delay before retrying after a transient polling failure
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

// Size in bytes of a signature produced by the signing service
pub const SIGNATURE_SIZE: usize = 65;
// Size in bytes of an account address
pub const ADDRESS_SIZE: usize = 20;
// Size in bytes of a block/transaction hash
pub const HASH_SIZE: usize = 32;

// Prefix of every warning emitted for a malformed driver response
pub const MALFORMED_RESPONSE_PREFIX: &str = "Connex-Driver[MALFORMED RESPONSE]";
