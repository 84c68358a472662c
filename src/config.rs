//! Compile-time constants shared by the compiler and the VM.

/// Number of cells on the tape. Fixed at compile time; no dynamic growth.
pub const TAPE_LEN: usize = 32768;

/// Maximum nesting depth of unmatched `[` brackets during compilation.
pub const BRACKET_STACK_DEPTH: usize = 1023;

/// Largest short-jump distance that fits in the 12-bit distance field.
pub const MAX_SHORT_JUMP_DIST: u32 = (1 << 12) - 1;

/// Largest long-jump distance representable across the 28-bit split field.
pub const MAX_LONG_JUMP_DIST: u32 = (1 << 28) - 1;

/// Largest argument an argumented extended opcode can carry.
pub const MAX_EXT_ARG: u32 = 0xFF;

/// Largest displacement or multiplier the combined cyclic-moveadd
/// encoding can carry in its 4-bit sub-fields (bits 7..4 and 3..0 of
/// the argument byte).
pub const MAX_CYCLIC_COMBINED_FIELD: i32 = 0xF;

/// Inclusive bounds of the signed 14-bit accumulator used by run-length coalescing.
pub const S14_MIN: i32 = -8192;
pub const S14_MAX: i32 = 8191;

/// Character that introduces a breakpoint instruction when enabled.
pub const BREAKPOINT_CHAR: u8 = b'@';

/// Initial capacity of a freshly created instruction buffer.
pub const INSTR_BUF_INITIAL_CAPACITY: usize = 64;

/// Geometric growth factor applied when the instruction buffer needs more room.
pub const INSTR_BUF_GROWTH_FACTOR: f64 = 1.5;
