//! The error taxonomy shared by the compiler and the VM.
//!
//! Every fatal outcome below is mutually exclusive; `BREAKPOINT` is not an
//! error in the ordinary sense (it is a cooperative suspension), but it
//! shares this enum because `execute` needs a single return channel for
//! "stopped, here's why".

use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum BfError {
    #[error("breakpoint in code")]
    Breakpoint,

    #[error("return from unreachable point")]
    Unreachable,

    #[error("null pointer passed")]
    NullPointer,

    #[error("there is no memory to allocate")]
    NoMemory,

    #[error("the maximum stack depth for brackets has been reached")]
    StackOverflow,

    #[error("unbalanced brackets")]
    UnbalancedBrackets,

    #[error("the relative jump is too long")]
    VeryLongJump,

    #[error("invalid values in environment")]
    InvalidEnv,

    #[error("unknown instruction")]
    UnknownInstr,

    #[error("memory corruption")]
    MemoryCorruption,
}

/// `strerror`-equivalent free function, kept for parity with the
/// language-neutral core API of spec.md §6. `BfError`'s `Display`
/// (derived by `thiserror`) already produces the same text; this just
/// gives callers who prefer a function a named one.
pub fn strerror(error: BfError) -> &'static str {
    match error {
        BfError::Breakpoint => "breakpoint in code",
        BfError::Unreachable => "return from unreachable point",
        BfError::NullPointer => "null pointer passed",
        BfError::NoMemory => "there is no memory to allocate",
        BfError::StackOverflow => "the maximum stack depth for brackets has been reached",
        BfError::UnbalancedBrackets => "unbalanced brackets",
        BfError::VeryLongJump => "the relative jump is too long",
        BfError::InvalidEnv => "invalid values in environment",
        BfError::UnknownInstr => "unknown instruction",
        BfError::MemoryCorruption => "memory corruption",
    }
}
