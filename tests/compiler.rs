use bfpack::compiler::compile;
use bfpack::error::BfError;
use bfpack::instr::{self, Decoded};

#[test]
fn run_length_coalesces_across_the_whole_source() {
    let program = compile("+".repeat(100).as_bytes(), true).unwrap();
    assert_eq!(program.len(), 2); // one CELL-DELTA word, then HALT
    assert_eq!(program[1], instr::HALT);
}

#[test]
fn idioms_collapse_bracket_bodies_to_single_words() {
    for (src, expect_len) in [("[-]", 2), ("[+]", 2), ("[>]", 2), ("[<]", 2)] {
        let program = compile(src.as_bytes(), true).unwrap();
        assert_eq!(program.len(), expect_len, "source {src:?}");
    }
}

#[test]
fn cyclic_copy_loop_collapses_to_one_instruction() {
    let program = compile(b"[->+<]", true).unwrap();
    assert_eq!(program.len(), 2);
    assert_eq!(
        instr::decode(program[0]),
        Decoded::CyclicAdd { offset: 1, mult: 1 }
    );
}

#[test]
fn long_jump_loop_round_trips_through_two_words() {
    // alternating INPUT/OUTPUT bodies never coalesce with each other,
    // so this is guaranteed to exceed the 12-bit short jump range.
    let src = format!("+[{}]", ",.".repeat(2100));
    let program = compile(src.as_bytes(), true).unwrap();
    match instr::decode(program[1]) {
        Decoded::Jump { long, .. } => assert!(long),
        other => panic!("expected a jump, got {other:?}"),
    }
}

#[test]
fn dead_loop_at_program_start_is_removed_entirely() {
    let program = compile(b"[+++]", true).unwrap();
    assert_eq!(program, vec![instr::HALT]);
}

#[test]
fn unbalanced_brackets_are_rejected() {
    assert_eq!(compile(b"[+", true), Err(BfError::UnbalancedBrackets));
    assert_eq!(compile(b"+]", true), Err(BfError::UnbalancedBrackets));
}

#[test]
fn breakpoint_operator_is_ignored_when_disabled() {
    let program = compile(b"+@+", false).unwrap();
    assert!(program.iter().all(|&w| w != instr::IMM_BREAKPOINT));
}

#[test]
fn output_repeat_count_is_packed_into_one_instruction() {
    let program = compile(&b".".repeat(5), true).unwrap();
    assert_eq!(
        instr::decode(program[0]),
        Decoded::OutputNTimes(4)
    );
}
