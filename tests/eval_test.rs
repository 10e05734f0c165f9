mod common;
use common::*;
use mm15::mach::{Interp, Val};

#[test]
fn test_rpn_arithmetic() {
    let mut i = Interp::new();
    assert_eq!(eval(&mut i, "3 4 +"), "0: 7.0000\n");
    assert_eq!(eval(&mut i, "2 *"), "0: 14.0000\n");
    assert_eq!(eval(&mut i, "4 / 1 -"), "0: 2.5000\n");
}

#[test]
fn test_display_modes() {
    let mut i = Interp::new();
    eval(&mut i, "2 setprec");
    assert_eq!(eval(&mut i, "pi"), "0: 3.14\n");
    eval(&mut i, "sfs");
    assert_eq!(render(&i), "0: 3.14e0\n");
    eval(&mut i, "sfs");
    assert_eq!(render(&i), "0: 3.14\n");
}

#[test]
fn test_complex_arithmetic() {
    let mut i = Interp::new();
    assert_eq!(eval(&mut i, "(0,1) (0,1) *"), "0: (-1.0000,0.0000)\n");
    eval(&mut i, "clst");
    assert_eq!(eval(&mut i, "(3,4) abs"), "0: 5.0000\n");
}

#[test]
fn test_stack_display_order() {
    let mut i = Interp::new();
    assert_eq!(eval(&mut i, "1 2 3"), "2: 1.0000\n1: 2.0000\n0: 3.0000\n");
    assert_eq!(eval(&mut i, "swap"), "2: 1.0000\n1: 3.0000\n0: 2.0000\n");
}

#[test]
fn test_errors_leave_stack_alone() {
    let mut i = Interp::new();
    eval(&mut i, "1 2");
    assert_eq!(eval(&mut i, "frobnicate"), "unknown word; frobnicate\n");
    assert_eq!(render(&i), "1: 1.0000\n0: 2.0000\n");

    // tokens before the failing one stay committed
    assert_eq!(
        eval(&mut i, "\"s\" +"),
        "type mismatch; '+' cannot combine a real and a string\n"
    );
    assert_eq!(render(&i), "2: 1.0000\n1: 2.0000\n0: \"s\"\n");
}

#[test]
fn test_user_words_compose() {
    let mut i = Interp::new();
    eval(&mut i, ": square dup * ;");
    eval(&mut i, ": quad square square ;");
    assert_eq!(eval(&mut i, "2 quad"), "0: 16.0000\n");
}

#[test]
fn test_word_shadowing_is_rejected() {
    let mut i = Interp::new();
    assert!(i.evaluate_line(": dup 0 ;").is_err());
    assert!(i.words.is_empty());
}

#[test]
fn test_matrix_pipeline() {
    let mut i = Interp::new();
    eval(&mut i, "[2 2 $ 1 2 3 4] dup +");
    match i.stack.pop().unwrap() {
        Val::MatrixReal(m) => assert_eq!(m.data(), &[2.0, 4.0, 6.0, 8.0]),
        other => panic!("unexpected {:?}", other),
    }

    eval(&mut i, "[2 2 $ 1 2 3 4] [2 2 $ 1 2 3 4] .*");
    match i.stack.pop().unwrap() {
        Val::MatrixReal(m) => assert_eq!(m.data(), &[1.0, 4.0, 9.0, 16.0]),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_matrix_element_access() {
    let mut i = Interp::new();
    assert_eq!(eval(&mut i, "[2 2 $ 1 2 3 4] 2 1 get_aij"), "0: 3.0000\n");
    eval(&mut i, "clst");
    eval(&mut i, "2 eye 1 2 5 set_aij 1 2 get_aij");
    assert_eq!(i.stack.pop().unwrap(), Val::Real(5.0));
}

#[test]
fn test_date_words() {
    let mut i = Interp::new();
    assert_eq!(
        eval(&mut i, "\"01.01.2024\" 31 dateplus"),
        "0: \"01.02.2024\"\n"
    );
    eval(&mut i, "clst");
    assert_eq!(
        eval(&mut i, "\"01.01.2023\" \"11.01.2023\" ddays"),
        "0: 10.0000\n"
    );
}

#[test]
fn test_string_pipeline() {
    let mut i = Interp::new();
    assert_eq!(
        eval(&mut i, "\"mm-15\" s2u dup srev scon"),
        "0: \"MM-1551-MM\"\n"
    );
}

#[test]
fn test_eval_builds_input() {
    let mut i = Interp::new();
    eval(&mut i, ": run_sum \"1 2 3 + +\" eval ;");
    assert_eq!(eval(&mut i, "run_sum"), "0: 6.0000\n");
}

#[test]
fn test_registers_hold_any_value() {
    let mut i = Interp::new();
    eval(&mut i, "(1,2) 5 sto");
    assert!(i.stack.is_empty());
    assert_eq!(eval(&mut i, "5 rcl"), "0: (1.0000,2.0000)\n");
    assert_eq!(eval(&mut i, "ffr"), "1: (1.0000,2.0000)\n0: 0.0000\n");
}
