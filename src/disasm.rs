//! Human-readable dumps of compiled programs and tape state. Grounded
//! in `bfd_print_instr` / `bfd_instrs_dump_txt` / `bfd_memory_dump_txt`
//! / `bfd_memory_dump_bin` / `bfd_memory_dump_loc` in
//! `examples/original_source/src/bfdebug.c`. Out of scope for the
//! compiler/VM's own correctness per spec.md, so this module is kept
//! thin: formatting only, no decisions that feed back into compilation
//! or execution.

use std::fmt::Write as _;

use crate::instr::{self, Decoded};

/// Describes one instruction. Returns the description and the number
/// of program words it occupies (2 for a long jump, 1 otherwise).
fn describe(word: u16, next: u16) -> (String, usize) {
    match instr::decode(word) {
        Decoded::CellDelta(v) if v >= 0 => (format!("increment by {v}"), 1),
        Decoded::CellDelta(v) => (format!("decrement by {}", -v), 1),
        Decoded::CursorMove(v) if v >= 0 => (format!("move right by {v}"), 1),
        Decoded::CursorMove(v) => (format!("move left by {}", -v), 1),
        Decoded::Jump { jump_if_nonzero, long, dist12 } => {
            let verb = if jump_if_nonzero { "jump back" } else { "jump ahead" };
            if long {
                let dist = instr::combine_long_jump(dist12, next);
                (format!("{verb} by {dist}"), 2)
            } else {
                (format!("{verb} by {dist12}"), 1)
            }
        }
        Decoded::Halt => ("halt".to_string(), 1),
        Decoded::Input => ("input character".to_string(), 1),
        Decoded::MemsetZero => ("set zero value".to_string(), 1),
        Decoded::ScanRightToZero => ("move right until zero".to_string(), 1),
        Decoded::ScanLeftToZero => ("move left until zero".to_string(), 1),
        Decoded::Breakpoint => ("breakpoint".to_string(), 1),
        Decoded::OutputNTimes(0) => ("output character".to_string(), 1),
        Decoded::OutputNTimes(n) => (format!("output character {} times", n as u32 + 1), 1),
        Decoded::CyclicAdd { offset, mult } => {
            let dir = if offset > 0 { "right" } else { "left" };
            (format!("add to {dir} cell value mul by {mult}"), 1)
        }
        Decoded::CyclicMove { offset } => {
            let dir = if offset > 0 { "right" } else { "left" };
            (format!("move value to {dir} by {}", offset.unsigned_abs()), 1)
        }
        Decoded::CyclicMoveAdd { offset, mult } => {
            let dir = if offset > 0 { "right" } else { "left" };
            (format!("move and add to {dir} by {} mul {mult}", offset.unsigned_abs()), 1)
        }
        Decoded::UnknownImmediate(_) | Decoded::UnknownArgumented(_) => ("unknown instruction".to_string(), 1),
    }
}

/// A full textual disassembly, one line per instruction, stopping at
/// the halt sentinel.
pub fn dump_instructions(program: &[u16]) -> String {
    let addr_width = program.len().saturating_sub(2).to_string().len().max(1);
    let mut out = String::new();
    let mut i = 0;
    while i < program.len() {
        let word = program[i];
        if word == instr::HALT {
            break;
        }
        let next = program.get(i + 1).copied().unwrap_or(0);
        let (text, consumed) = describe(word, next);
        let _ = writeln!(out, "[{i:>addr_width$}]: {word:04x} {text}");
        i += consumed;
    }
    out
}

/// Hex text dump of `tape`, 32 bytes per line grouped in columns of 8.
pub fn dump_tape_text(tape: &[u8]) -> String {
    let mut out = String::new();
    for chunk in tape.chunks(32) {
        for (i, byte) in chunk.iter().enumerate() {
            let sep = if (i + 1) % 8 == 0 { "  " } else { " " };
            let _ = write!(out, "{byte:02x}{sep}");
        }
        out.push('\n');
    }
    out
}

/// Raw binary dump of `tape`, for piping straight to a file or pipe.
pub fn dump_tape_binary(tape: &[u8]) -> Vec<u8> {
    tape.to_vec()
}

/// A 19-cell window (`mc - 9 ..= mc + 9`) around the cursor, with
/// offsets on the header line and `--` for any cell outside the tape.
pub fn dump_tape_window(tape: &[u8], mc: usize) -> String {
    let mut header = String::new();
    let mut values = String::new();
    for offset in -9i32..=9 {
        let _ = write!(header, "{offset:+width$} ", width = 2);
        let cell = mc as i64 + offset as i64;
        if cell >= 0 && (cell as usize) < tape.len() {
            let _ = write!(values, "{:02x} ", tape[cell as usize]);
        } else {
            values.push_str("-- ");
        }
    }
    format!("{header}\n{values}\n")
}
