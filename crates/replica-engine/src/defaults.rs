//! Default constants for engine configuration.

/// Default number of heap slots reserved up front.
pub const DEFAULT_HEAP_CAPACITY: usize = 0;

/// Default initial capacity of a copy's identity table.
pub const DEFAULT_TABLE_CAPACITY: usize = 16;

/// Largest heap preallocation accepted from options (slots).
pub const MAX_HEAP_CAPACITY: usize = 1 << 24;

/// Largest identity table capacity hint accepted from options.
pub const MAX_TABLE_CAPACITY: usize = 1 << 20;
