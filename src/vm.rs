//! The bytecode interpreter: a tight fetch-decode-dispatch loop over a
//! packed instruction stream, a tape, and a caller-supplied I/O
//! environment. Grounded in `bfa_execute` /
//! `examples/original_source/src/bfexecute.c`, reworked into owned
//! Rust values instead of raw pointers -- the ownership-transfer-on-
//! breakpoint dance the C needs an explicit `free`/no-`free` branch for
//! falls straight out of returning `ctx` by value.

use crate::config;
use crate::error::BfError;
use crate::instr::{self, Decoded};

/// Execution state: program counter, memory cursor, and the tape
/// itself. Round-trips through a breakpoint suspend/resume pair.
#[derive(Debug, PartialEq, Eq)]
pub struct Context {
    pub pc: usize,
    pub mc: usize,
    pub tape: Vec<u8>,
}

impl Context {
    pub fn new() -> Self {
        Self { pc: 0, mc: 0, tape: vec![0u8; config::TAPE_LEN] }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

/// The caller-supplied I/O environment. `read`/`write` stand in for
/// the C API's opaque-handle-plus-function-pointer pair: a Rust
/// closure's captures already are the handle.
pub struct Env<'a> {
    read: Option<Box<dyn FnMut() -> u8 + 'a>>,
    write: Option<Box<dyn FnMut(u8) + 'a>>,
}

impl<'a> Env<'a> {
    pub fn new(read: impl FnMut() -> u8 + 'a, write: impl FnMut(u8) + 'a) -> Self {
        Self { read: Some(Box::new(read)), write: Some(Box::new(write)) }
    }

    /// An environment missing one or both callbacks; `execute` rejects
    /// it with `INVALID_ENV` before doing any work.
    pub fn missing() -> Self {
        Self { read: None, write: None }
    }

    fn is_complete(&self) -> bool {
        self.read.is_some() && self.write.is_some()
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ExecOutcome {
    Halted,
    Breakpoint(Context),
}

/// Executes `program` against `env`, optionally resuming from `ctx`
/// (the breakpoint snapshot of a prior `execute` call). A fresh
/// zeroed tape is allocated when `ctx` is `None`.
///
/// Whether a context was *supplied* (`Some(..)`, even a freshly
/// constructed empty one) or omitted (`None`) changes what a
/// `BREAKPOINT` instruction does: with a supplied context, it suspends
/// execution and hands the context back so the caller can resume; with
/// none, there is nowhere to hand state to, so it is a no-op and
/// execution runs on to `HALT`.
pub fn execute(program: &[u16], env: &mut Env, ctx: Option<Context>) -> Result<ExecOutcome, BfError> {
    if !env.is_complete() {
        return Err(BfError::InvalidEnv);
    }

    let context_supplied = ctx.is_some();
    let mut ctx = ctx.unwrap_or_default();

    loop {
        if ctx.mc >= config::TAPE_LEN {
            return Err(BfError::MemoryCorruption);
        }
        let Some(&word) = program.get(ctx.pc) else {
            return Err(BfError::Unreachable);
        };
        ctx.pc += 1;

        match instr::decode(word) {
            Decoded::CellDelta(v) => {
                let cell = ctx.tape[ctx.mc] as i32 + v;
                ctx.tape[ctx.mc] = cell.rem_euclid(256) as u8;
            }
            Decoded::CursorMove(v) => {
                let next = ctx.mc as isize + v as isize;
                if next < 0 || next as usize >= config::TAPE_LEN {
                    return Err(BfError::MemoryCorruption);
                }
                ctx.mc = next as usize;
            }
            Decoded::Jump { jump_if_nonzero, long, dist12 } => {
                let dist = if long {
                    let Some(&lo) = program.get(ctx.pc) else {
                        return Err(BfError::Unreachable);
                    };
                    ctx.pc += 1;
                    instr::combine_long_jump(dist12, lo as u32)
                } else {
                    dist12
                };

                let nonzero = ctx.tape[ctx.mc] != 0;
                if nonzero == jump_if_nonzero {
                    if jump_if_nonzero {
                        ctx.pc -= dist as usize;
                    } else {
                        ctx.pc += dist as usize;
                    }
                }
            }
            Decoded::Halt => return Ok(ExecOutcome::Halted),
            Decoded::Input => {
                let byte = env.read.as_mut().expect("checked complete above")();
                ctx.tape[ctx.mc] = byte;
            }
            Decoded::MemsetZero => ctx.tape[ctx.mc] = 0,
            Decoded::ScanRightToZero => {
                let found = memchr::memchr(0, &ctx.tape[ctx.mc..]).ok_or(BfError::MemoryCorruption)?;
                ctx.mc += found;
            }
            Decoded::ScanLeftToZero => {
                let found =
                    memchr::memrchr(0, &ctx.tape[..=ctx.mc]).ok_or(BfError::MemoryCorruption)?;
                ctx.mc = found;
            }
            Decoded::Breakpoint => {
                if context_supplied {
                    return Ok(ExecOutcome::Breakpoint(ctx));
                }
                // no context to suspend into: treat as OK and keep running.
            }
            Decoded::OutputNTimes(n) => {
                let byte = ctx.tape[ctx.mc];
                let writer = env.write.as_mut().expect("checked complete above");
                for _ in 0..=n {
                    writer(byte);
                }
            }
            Decoded::CyclicAdd { offset, mult } => cyclic_copy_mul(&mut ctx, offset, mult)?,
            Decoded::CyclicMove { offset } => cyclic_copy_mul(&mut ctx, offset, 1)?,
            Decoded::CyclicMoveAdd { offset, mult } => cyclic_copy_mul(&mut ctx, offset, mult)?,
            Decoded::UnknownImmediate(_) | Decoded::UnknownArgumented(_) => {
                return Err(BfError::UnknownInstr);
            }
        }
    }
}

fn cyclic_copy_mul(ctx: &mut Context, offset: i32, mult: u8) -> Result<(), BfError> {
    if ctx.tape[ctx.mc] == 0 {
        return Ok(());
    }
    let target = ctx.mc as isize + offset as isize;
    if target < 0 || target as usize >= config::TAPE_LEN {
        return Err(BfError::MemoryCorruption);
    }
    let target = target as usize;
    let src = ctx.tape[ctx.mc];
    ctx.tape[target] = ctx.tape[target].wrapping_add(src.wrapping_mul(mult));
    ctx.tape[ctx.mc] = 0;
    Ok(())
}
