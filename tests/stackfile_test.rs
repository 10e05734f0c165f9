mod common;
use common::*;
use mm15::mach::{Interp, Val};

#[test]
fn test_save_and_load_words() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stack.bin");
    let path = path.to_str().unwrap();

    let mut i = Interp::new();
    eval(&mut i, "1.5 (2,-3) \"a string\" [2 2 $ 1 2 3 4]");
    eval(&mut i, &format!("\"{}\" savestack", path));
    // savestack consumed only the filename
    assert_eq!(i.stack.len(), 4);

    let mut fresh = Interp::new();
    fresh.evaluate_line("999").unwrap();
    fresh
        .evaluate_line(&format!("\"{}\" loadstack", path))
        .unwrap();
    assert_eq!(fresh.stack.len(), 4);
    assert_eq!(fresh.stack.peek(3), Some(&Val::Real(1.5)));
    assert_eq!(fresh.stack.peek(2), Some(&Val::Complex(2.0, -3.0)));
    assert_eq!(fresh.stack.peek(1), Some(&Val::Str("a string".to_string())));
    match fresh.stack.peek(0) {
        Some(Val::MatrixReal(m)) => assert_eq!(m.data(), &[1.0, 2.0, 3.0, 4.0]),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_load_of_garbage_reports_and_clears() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("junk.bin");
    std::fs::write(&path, b"this is not a stack file at all").unwrap();

    let mut i = Interp::new();
    eval(&mut i, "1 2 3");
    let msg = eval(&mut i, &format!("\"{}\" loadstack", path.to_str().unwrap()));
    assert!(msg.starts_with("stack file format error"), "got {:?}", msg);
    assert!(i.stack.is_empty());
}

#[test]
fn test_failed_save_restores_filename() {
    let mut i = Interp::new();
    eval(&mut i, "7");
    let msg = eval(&mut i, "\"/nonexistent/dir/stack.bin\" savestack");
    assert!(msg.starts_with("i/o error"), "got {:?}", msg);
    // the word backs out, leaving both operands
    assert_eq!(i.stack.len(), 2);
    assert_eq!(
        i.stack.peek(0),
        Some(&Val::Str("/nonexistent/dir/stack.bin".to_string()))
    );
}

#[test]
fn test_round_trip_preserves_values_bit_for_bit() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bits.bin");
    let path = path.to_str().unwrap();

    let mut i = Interp::new();
    i.stack.push(Val::Real(0.1 + 0.2)).unwrap();
    i.stack.push(Val::Real(f64::MIN_POSITIVE)).unwrap();
    i.evaluate_line(&format!("\"{}\" savestack clst \"{}\" loadstack", path, path))
        .unwrap();

    match (i.stack.peek(1), i.stack.peek(0)) {
        (Some(Val::Real(a)), Some(Val::Real(b))) => {
            assert_eq!(a.to_bits(), (0.1f64 + 0.2).to_bits());
            assert_eq!(b.to_bits(), f64::MIN_POSITIVE.to_bits());
        }
        other => panic!("unexpected {:?}", other),
    }
}
