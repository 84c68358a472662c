//! The single-pass compiler: scans the operator stream once, coalesces
//! runs of `+-`/`><`, recognizes bracket-body idioms and cyclic copy
//! loops, backpatches jumps, and strips dead leading loops. Grounded
//! instruction-for-instruction on `bfa_compile` in
//! `examples/original_source/src/bfcompile.c`.

use crate::bracket_stack::BracketStack;
use crate::config;
use crate::error::BfError;
use crate::instr::{self, Decoded};
use crate::instr_buf::InstrBuf;
use crate::scanner::Scanner;

/// Verifies bracket balance ahead of a full compile, the way
/// `bfa_compile`'s caller (`bfi.c`) pre-checks via `ir::verify` before
/// committing to a compile pass. Not required for correctness (the
/// compiler itself detects unbalanced brackets), but lets a CLI fail
/// fast with a clean message before allocating anything.
pub fn verify(source: &[u8]) -> Result<(), BfError> {
    let mut depth: i64 = 0;
    for &b in source {
        if b == b'[' {
            depth += 1;
        } else if b == b']' {
            depth -= 1;
            if depth < 0 {
                return Err(BfError::UnbalancedBrackets);
            }
        }
    }
    if depth != 0 {
        return Err(BfError::UnbalancedBrackets);
    }
    Ok(())
}

/// Compiles a source byte stream into a packed, HALT-terminated
/// instruction word sequence.
pub fn compile(source: &[u8], breakpoints_enabled: bool) -> Result<Vec<u16>, BfError> {
    eprintln!("* compiling {} source bytes", source.len());

    let scanner = Scanner::new(source, breakpoints_enabled);
    let mut code = InstrBuf::new();
    let mut brackets = BracketStack::new();

    let mut pos = scanner.next_operator(0);
    while pos < scanner.len() {
        match scanner.byte_at(pos) {
            config::BREAKPOINT_CHAR if breakpoints_enabled => {
                code.push(instr::IMM_BREAKPOINT)?;
                pos = scanner.next_operator(pos + 1);
            }
            b',' => {
                code.push(instr::IMM_INPUT)?;
                pos = scanner.next_operator(pos + 1);
            }
            b'.' => {
                pos = compile_output(&scanner, &mut code, pos)?;
            }
            b'+' | b'-' => {
                pos = compile_run(&scanner, &mut code, pos, b'+', b'-', true)?;
            }
            b'>' | b'<' => {
                pos = compile_run(&scanner, &mut code, pos, b'>', b'<', false)?;
            }
            b'[' => {
                pos = compile_open_bracket(&scanner, &mut code, &mut brackets, pos)?;
            }
            b']' => {
                close_bracket(&mut code, &mut brackets)?;
                pos = scanner.next_operator(pos + 1);
            }
            other => unreachable!("scanner only stops at operators, got {other:?}"),
        }
    }

    if !brackets.is_empty() {
        return Err(BfError::UnbalancedBrackets);
    }
    code.push(instr::HALT)?;

    let before = code.len();
    remove_dead_prefix(&mut code);
    eprintln!("* pruned {} dead leading instruction(s)", before - code.len());
    code.shrink_to_fit();

    eprintln!("* success, {} words emitted", code.len());
    Ok(code.into_words())
}

/// `.` lookahead: count up to 255 further `.` operators and fold them
/// into a single OUTPUT_N_TIMES.
fn compile_output(scanner: &Scanner, code: &mut InstrBuf, pos: usize) -> Result<usize, BfError> {
    let mut count: u32 = 0;
    let mut next = scanner.next_operator(pos + 1);
    while next < scanner.len() && scanner.byte_at(next) == b'.' && count < config::MAX_EXT_ARG {
        count += 1;
        next = scanner.next_operator(next + 1);
    }
    code.push(instr::pack_output_n_times(count as u8))?;
    Ok(next)
}

/// Run-length coalescing for `+`/`-` or `>`/`<`, including the
/// collapse-into-previous-instruction rule.
fn compile_run(
    scanner: &Scanner,
    code: &mut InstrBuf,
    pos: usize,
    inc_ch: u8,
    dec_ch: u8,
    is_cell: bool,
) -> Result<usize, BfError> {
    let mut acc: i32 = if scanner.byte_at(pos) == inc_ch { 1 } else { -1 };
    let mut next = scanner.next_operator(pos + 1);

    while next < scanner.len() {
        let ch = scanner.byte_at(next);
        if ch == inc_ch && acc < config::S14_MAX {
            acc += 1;
        } else if ch == dec_ch && acc > config::S14_MIN {
            acc -= 1;
        } else {
            break;
        }
        next = scanner.next_operator(next + 1);
    }

    emit_coalesced(code, is_cell, acc)?;
    Ok(next)
}

fn pack(is_cell: bool, value: i32) -> u16 {
    if is_cell { instr::pack_cell_delta(value) } else { instr::pack_cursor_move(value) }
}

fn same_kind(code: &InstrBuf, is_cell: bool) -> bool {
    if code.is_empty() {
        return false;
    }
    let want = if is_cell { instr::pack_cell_delta(0) } else { instr::pack_cursor_move(0) };
    // Compare kind tags only: both words masked down to their top two bits.
    (code[code.len() - 1] & 0xC000) == (want & 0xC000)
}

fn emit_coalesced(code: &mut InstrBuf, is_cell: bool, acc: i32) -> Result<(), BfError> {
    if acc == 0 {
        return Ok(());
    }

    if !same_kind(code, is_cell) {
        code.push(pack(is_cell, acc))?;
        return Ok(());
    }

    let last_idx = code.len() - 1;
    let prev = decode_delta(code[last_idx]);

    let opposite_sign = (prev < 0 && acc > 0) || (prev > 0 && acc < 0);
    if opposite_sign {
        let sum = prev + acc;
        if sum == 0 {
            code.erase_range(last_idx, 1);
        } else {
            code[last_idx] = pack(is_cell, sum);
        }
        return Ok(());
    }

    // same sign: saturate and spill the residue into a second instruction
    let sum = prev + acc;
    if sum >= config::S14_MIN && sum <= config::S14_MAX {
        code[last_idx] = pack(is_cell, sum);
    } else {
        let extreme = if sum > 0 { config::S14_MAX } else { config::S14_MIN };
        code[last_idx] = pack(is_cell, extreme);
        code.push(pack(is_cell, sum - extreme))?;
    }
    Ok(())
}

fn decode_delta(word: u16) -> i32 {
    instr::sign_extend_14(word)
}

/// `[` handling: recognize `[-]`/`[+]`/`[>]`/`[<]` idioms before
/// falling back to a placeholder jump.
fn compile_open_bracket(
    scanner: &Scanner,
    code: &mut InstrBuf,
    brackets: &mut BracketStack,
    pos: usize,
) -> Result<usize, BfError> {
    let after = pos + 1;
    if scanner.has_pattern(after, b"-]") || scanner.has_pattern(after, b"+]") {
        code.push(instr::IMM_MEMSET_ZERO)?;
        return Ok(scanner.skip_n_operators(after, 2));
    }
    if scanner.has_pattern(after, b">]") {
        code.push(instr::IMM_SCAN_RIGHT_TO_ZERO)?;
        return Ok(scanner.skip_n_operators(after, 2));
    }
    if scanner.has_pattern(after, b"<]") {
        code.push(instr::IMM_SCAN_LEFT_TO_ZERO)?;
        return Ok(scanner.skip_n_operators(after, 2));
    }

    brackets.push(code.len())?;
    code.push(0)?; // placeholder JUMP_IF_ZERO, backpatched on the matching `]`
    Ok(scanner.next_operator(after))
}

/// `]` handling: backpatch the matching `[`, choosing short or long
/// jump form, and attempt cyclic-pattern recognition on 5-word bodies.
fn close_bracket(code: &mut InstrBuf, brackets: &mut BracketStack) -> Result<(), BfError> {
    let p = brackets.pop().ok_or(BfError::UnbalancedBrackets)?;
    let dist = (code.len() - p) as u64;

    if dist > config::MAX_LONG_JUMP_DIST as u64 {
        return Err(BfError::VeryLongJump);
    }

    if dist > config::MAX_SHORT_JUMP_DIST as u64 {
        let dist = dist as u32;
        code[p] = instr::pack_jump_long_hi(false, dist);
        code.insert(p + 1, instr::pack_jump_long_lo(dist))?;
        code.push(instr::pack_jump_long_hi(true, dist))?;
        code.push(instr::pack_jump_long_lo(dist))?;
        return Ok(());
    }

    let dist = dist as u32;
    if dist == 5 && try_cyclic_pattern(code, p) {
        return Ok(());
    }

    code[p] = instr::pack_jump_short(false, dist);
    code.push(instr::pack_jump_short(true, dist))?;
    Ok(())
}

fn as_cell_delta(word: u16) -> Option<i32> {
    match instr::decode(word) {
        Decoded::CellDelta(v) => Some(v),
        _ => None,
    }
}

fn as_cursor_move(word: u16) -> Option<i32> {
    match instr::decode(word) {
        Decoded::CursorMove(v) => Some(v),
        _ => None,
    }
}

/// Recognizes the two accepted cyclic-copy shapes over the 4 body
/// words at `p+1..=p+4` and, on success, collapses them plus the
/// placeholder at `p` into a single argumented instruction.
fn try_cyclic_pattern(code: &mut InstrBuf, p: usize) -> bool {
    let i1 = code[p + 1];
    let i2 = code[p + 2];
    let i3 = code[p + 3];
    let i4 = code[p + 4];

    let shape = match (as_cell_delta(i1), as_cursor_move(i2), as_cell_delta(i3), as_cursor_move(i4)) {
        (Some(-1), Some(movn), Some(addn), Some(neg_movn)) if addn >= 0 && neg_movn == -movn => {
            Some((movn, addn))
        }
        _ => match (as_cursor_move(i1), as_cell_delta(i2), as_cursor_move(i3), as_cell_delta(i4)) {
            (Some(movn), Some(addn), Some(neg_movn), Some(-1)) if addn >= 0 && neg_movn == -movn => {
                Some((movn, addn))
            }
            _ => None,
        },
    };

    let Some((movn, addn)) = shape else { return false };

    let encoded = if movn.abs() == 1 && addn <= config::MAX_EXT_ARG as i32 {
        Some(instr::pack_cyclic_add(movn > 0, addn as u8))
    } else if addn == 1 && movn.abs() <= config::MAX_EXT_ARG as i32 {
        Some(instr::pack_cyclic_move(movn > 0, movn.unsigned_abs() as u8))
    } else if addn <= config::MAX_CYCLIC_COMBINED_FIELD && movn.abs() <= config::MAX_CYCLIC_COMBINED_FIELD {
        Some(instr::pack_cyclic_moveadd(movn > 0, movn.unsigned_abs() as u8, addn as u8))
    } else {
        None
    };

    match encoded {
        Some(word) => {
            code[p] = word;
            code.erase_range(p + 1, 4);
            true
        }
        None => false,
    }
}

/// Strips leading `JUMP_IF_ZERO` blocks: the tape starts zeroed, so a
/// `[` at the very front of the program is always taken and everything
/// it jumps over (including its own matching `]`) is unreachable.
fn remove_dead_prefix(code: &mut InstrBuf) {
    loop {
        if code.is_empty() {
            break;
        }
        let header = code[0];
        if !instr::is_jump_if_zero(header) {
            break;
        }
        let Decoded::Jump { long, dist12, .. } = instr::decode(header) else {
            unreachable!("is_jump_if_zero implies a Jump decode")
        };
        let total = if long {
            let lo = code[1] as u32;
            let raw_dist = (dist12 << 16) | lo;
            raw_dist + 3
        } else {
            dist12 + 1
        };
        code.erase_range(0, total as usize);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile_ok(src: &str) -> Vec<u16> {
        compile(src.as_bytes(), true).unwrap()
    }

    #[test]
    fn comments_are_ignored_entirely() {
        let a = compile_ok("+++++");
        let b = compile_ok("h+e+l+l+o+");
        assert_eq!(a, b);
    }

    #[test]
    fn run_length_coalescing() {
        let prog = compile_ok("+++++");
        assert_eq!(prog, vec![instr::pack_cell_delta(5), instr::HALT]);

        let prog = compile_ok("+-+-+-");
        assert_eq!(prog, vec![instr::HALT]);

        let prog = compile_ok("++-");
        assert_eq!(prog, vec![instr::pack_cell_delta(1), instr::HALT]);
    }

    #[test]
    fn saturates_14_bit_payload() {
        let src = "+".repeat(8193);
        let prog = compile_ok(&src);
        assert_eq!(prog.len(), 3); // two deltas + halt
        let sum: i32 = prog[..2].iter().map(|&w| instr::sign_extend_14(w)).sum();
        assert_eq!(sum, 8193);
        for &w in &prog[..2] {
            let v = instr::sign_extend_14(w);
            assert!((config::S14_MIN..=config::S14_MAX).contains(&v));
        }
    }

    #[test]
    fn idiom_lowering() {
        assert_eq!(compile_ok("[-]"), vec![instr::IMM_MEMSET_ZERO, instr::HALT]);
        assert_eq!(compile_ok("[+]"), vec![instr::IMM_MEMSET_ZERO, instr::HALT]);
        assert_eq!(compile_ok("[>]"), vec![instr::IMM_SCAN_RIGHT_TO_ZERO, instr::HALT]);
        assert_eq!(compile_ok("[<]"), vec![instr::IMM_SCAN_LEFT_TO_ZERO, instr::HALT]);
    }

    #[test]
    fn cyclic_copy_recognized() {
        let prog = compile_ok("[->+<]");
        assert_eq!(prog.len(), 2);
        assert_eq!(instr::decode(prog[0]), Decoded::CyclicAdd { offset: 1, mult: 1 });
    }

    #[test]
    fn cyclic_moveadd_recognized_within_4bit_fields() {
        // movn=3, addn=3: both fit the 4-bit sub-fields, so this collapses.
        let prog = compile_ok("[->>>++<<<]");
        assert_eq!(prog.len(), 2);
        assert_eq!(instr::decode(prog[0]), Decoded::CyclicMoveAdd { offset: 3, mult: 3 });
    }

    #[test]
    fn cyclic_moveadd_with_oversized_displacement_does_not_collapse() {
        // movn=16 overflows the 4-bit displacement field (max 15), so
        // this must NOT be recognized as a combined cyclic instruction
        // -- it must stay an ordinary loop instead of silently
        // truncating the displacement and computing the wrong cell.
        let prog = compile_ok("[->>>>>>>>>>>>>>>>++<<<<<<<<<<<<<<<<]");
        assert!(matches!(instr::decode(prog[0]), Decoded::Jump { .. }));
    }

    #[test]
    fn dead_prefix_is_removed() {
        let prog = compile_ok("[+++]hello");
        assert_eq!(prog, vec![instr::HALT]);
    }

    #[test]
    fn trailing_comments_do_not_change_the_program() {
        let a = compile_ok("[+++]");
        let b = compile_ok("[+++]hello world");
        assert_eq!(a, b);
    }

    #[test]
    fn long_jump_round_trip_widths() {
        // ",." pairs never coalesce with their neighbors, so this
        // forces a body wide enough to need the long jump form. The
        // leading `+` keeps the loop from being a dead leading prefix.
        let mut src = String::from("+[");
        src.push_str(&",.".repeat(2100));
        src.push(']');
        let prog = compile(src.as_bytes(), true).unwrap();
        let Decoded::Jump { long, .. } = instr::decode(prog[1]) else {
            panic!("expected a jump")
        };
        assert!(long);
    }

    #[test]
    fn unbalanced_brackets_detected() {
        assert_eq!(compile(b"[[[", true), Err(BfError::UnbalancedBrackets));
        assert_eq!(compile(b"]", true), Err(BfError::UnbalancedBrackets));
    }

    #[test]
    fn bracket_stack_overflow_detected() {
        let src = "[".repeat(config::BRACKET_STACK_DEPTH + 1);
        assert_eq!(compile(src.as_bytes(), true), Err(BfError::StackOverflow));
    }
}
