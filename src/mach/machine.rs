use std::collections::HashMap;

use super::{Address, Interp, Val};
use crate::error;
use crate::lang::{Error, ErrorCode};

type Result<T> = std::result::Result<T, Error>;

pub const MAX_PROGRAM: usize = 1000;
pub const MAX_LABELS: usize = 100;
pub const MAX_LABEL_LEN: usize = 31;

/// Size of the condition counter bank.
pub const MAX_COUNTERS: usize = 32;

/// One line of a stored program.
#[derive(Debug, Clone, PartialEq)]
pub enum Instr {
    /// Anything that is not control flow; fed to the evaluator verbatim.
    Word(String),
    Label(String),
    Goto(String),
    Gosub(String),
    Rtn,
    /// A predicate name. True executes the next instruction, false skips
    /// exactly one.
    Test(String),
    End,
}

impl std::fmt::Display for Instr {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        use Instr::*;
        match self {
            Word(text) => write!(f, "WORD   {}", text),
            Label(name) => write!(f, "LBL    {}", name),
            Goto(name) => write!(f, "GOTO   {}", name),
            Gosub(name) => write!(f, "GOSUB  {}", name),
            Rtn => write!(f, "RTN"),
            Test(name) => write!(f, "TEST   {}", name),
            End => write!(f, "END"),
        }
    }
}

/// ## Stored programs
///
/// An ordered instruction list plus a label table resolved in a single
/// pass at load time. Immutable once loaded; running it mutates only the
/// interpreter it is handed.
#[derive(Debug, Clone, Default)]
pub struct Program {
    instrs: Vec<Instr>,
    labels: HashMap<String, Address>,
}

/// Parses a program from text, one instruction per line. Empty lines are
/// skipped. A duplicate label keeps its first definition.
pub fn load_program(text: &str) -> Result<Program> {
    let mut prog = Program::default();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if prog.instrs.len() >= MAX_PROGRAM {
            return Err(error!(ProgramLoadError;
                format!("too many instructions (max {})", MAX_PROGRAM)));
        }
        let instr = if let Some(name) = line.strip_prefix("LBL ") {
            let name = name.trim();
            if name.len() > MAX_LABEL_LEN {
                return Err(error!(ProgramLoadError;
                    format!("label '{}' too long (max {} bytes)", name, MAX_LABEL_LEN)));
            }
            if !prog.labels.contains_key(name) {
                if prog.labels.len() >= MAX_LABELS {
                    return Err(error!(ProgramLoadError;
                        format!("too many labels (max {})", MAX_LABELS)));
                }
                prog.labels.insert(name.to_string(), prog.instrs.len());
            }
            Instr::Label(name.to_string())
        } else if let Some(name) = line.strip_prefix("GOTO ") {
            Instr::Goto(name.trim().to_string())
        } else if let Some(name) = line.strip_prefix("GOSUB ") {
            Instr::Gosub(name.trim().to_string())
        } else if line == "RTN" {
            Instr::Rtn
        } else if line == "END" {
            Instr::End
        } else if line.contains('?') {
            Instr::Test(line.to_string())
        } else {
            Instr::Word(line.to_string())
        };
        prog.instrs.push(instr);
    }
    Ok(prog)
}

pub fn load_program_from_file(path: &str) -> Result<Program> {
    let text = std::fs::read_to_string(path)?;
    load_program(&text)
}

impl Program {
    pub fn len(&self) -> usize {
        self.instrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instrs.is_empty()
    }

    pub fn listing(&self) -> String {
        let mut out = String::from("--- Program Listing ---\n");
        for (pc, instr) in self.instrs.iter().enumerate() {
            out.push_str(&format!("{:3}: {}\n", pc, instr));
        }
        out
    }

    fn label(&self, name: &str) -> Result<Address> {
        match self.labels.get(name) {
            Some(pc) => Ok(*pc),
            None => Err(error!(InvalidLabel; name)),
        }
    }

    /// Runs to END, or off the end of the instruction list (implicit END).
    /// A bad label or an empty return stack aborts the script; a failing
    /// word is reported and execution continues with the next instruction.
    pub fn run(&self, interp: &mut Interp) -> Result<()> {
        let mut pc: Address = 0;
        let mut returns: Vec<Address> = Vec::new();
        loop {
            interp.check_interrupt()?;
            let instr = match self.instrs.get(pc) {
                Some(instr) => instr,
                None => return Ok(()),
            };
            match instr {
                Instr::End => return Ok(()),
                Instr::Label(_) => pc += 1,
                Instr::Word(text) => {
                    if let Err(e) = interp.evaluate_line(text) {
                        if e.code() == ErrorCode::Interrupted {
                            return Err(e);
                        }
                        eprintln!("{}", e);
                    }
                    pc += 1;
                }
                Instr::Goto(name) => pc = self.label(name)?,
                Instr::Gosub(name) => {
                    // bounded by program length, like the instruction list
                    if returns.len() >= self.instrs.len() {
                        return Err(error!(StackOverflow; "return stack full"));
                    }
                    returns.push(pc + 1);
                    pc = self.label(name)?;
                }
                Instr::Rtn => match returns.pop() {
                    Some(addr) => pc = addr,
                    None => return Err(error!(ReturnStackUnderflow)),
                },
                Instr::Test(name) => {
                    pc += if test_predicate(interp, name) { 1 } else { 2 };
                }
            }
        }
    }
}

/// Evaluates a TEST predicate. Everything that is not a well-formed
/// comparison answers false rather than erroring; programs lean on that
/// to take the skip branch by default.
fn test_predicate(interp: &mut Interp, name: &str) -> bool {
    match name {
        "top_eq0?" => top_against_zero(interp, |x| x == 0.0),
        "top_neq0?" => top_against_zero(interp, |x| x != 0.0),
        "top_gt0?" => top_against_zero(interp, |x| x > 0.0),
        "top_lt0?" => top_against_zero(interp, |x| x < 0.0),
        "top_gte0?" => top_against_zero(interp, |x| x >= 0.0),
        "top_lte0?" => top_against_zero(interp, |x| x <= 0.0),
        "top_eq?" => top_pair(interp, |a, b| a == b),
        "top_neq?" => top_pair(interp, |a, b| a != b),
        "top_gt?" => top_pair(interp, |a, b| a > b),
        "top_lt?" => top_pair(interp, |a, b| a < b),
        "top_gte?" => top_pair(interp, |a, b| a >= b),
        "top_lte?" => top_pair(interp, |a, b| a <= b),
        "ctr_eq0?" => counter_against_zero(interp, |c| c == 0),
        "ctr_neq0?" => counter_against_zero(interp, |c| c != 0),
        "ctr_gt0?" => counter_against_zero(interp, |c| c > 0),
        "ctr_lt0?" => counter_against_zero(interp, |c| c < 0),
        "ctr_gte0?" => counter_against_zero(interp, |c| c >= 0),
        "ctr_lte0?" => counter_against_zero(interp, |c| c <= 0),
        _ => {
            eprintln!("unknown condition: {}", name);
            false
        }
    }
}

/// Top of stack must be a real; the stack is not touched.
fn top_against_zero(interp: &Interp, f: fn(f64) -> bool) -> bool {
    match interp.stack.peek(0) {
        Some(Val::Real(x)) => f(*x),
        _ => false,
    }
}

/// Compares the second element against the top, `f(second, top)`. Both
/// must be reals; the stack is not touched.
fn top_pair(interp: &Interp, f: fn(f64, f64) -> bool) -> bool {
    match (interp.stack.peek(1), interp.stack.peek(0)) {
        (Some(Val::Real(a)), Some(Val::Real(b))) => f(*a, *b),
        _ => false,
    }
}

/// Pops a real counter index off the stack and compares that counter
/// against zero. A non-real top is left in place; a popped index outside
/// the bank answers false.
fn counter_against_zero(interp: &mut Interp, f: fn(i64) -> bool) -> bool {
    let x = match interp.stack.peek(0) {
        Some(Val::Real(x)) => *x,
        _ => return false,
    };
    let _ = interp.stack.pop();
    let index = x as i64;
    if index < 0 || index as usize >= MAX_COUNTERS {
        return false;
    }
    f(interp.counters[index as usize])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(script: &str, interp: &mut Interp) -> Result<()> {
        load_program(script)?.run(interp)
    }

    #[test]
    fn test_load_classifies_lines() {
        let prog = load_program("LBL start\n3 4 +\ntop_gt0?\nGOTO start\nRTN\nEND\n").unwrap();
        assert_eq!(prog.len(), 6);
        assert_eq!(prog.label("start").unwrap(), 0);
        assert!(prog.label("missing").is_err());
    }

    #[test]
    fn test_duplicate_label_keeps_first() {
        let prog = load_program("LBL a\n1\nLBL a\n2\n").unwrap();
        assert_eq!(prog.label("a").unwrap(), 0);
    }

    #[test]
    fn test_straight_line_and_implicit_end() {
        let mut interp = Interp::new();
        run("3\n4\n+\n", &mut interp).unwrap();
        assert_eq!(interp.stack.pop().unwrap(), Val::Real(7.0));
    }

    #[test]
    fn test_test_true_executes_next() {
        let mut interp = Interp::new();
        run("1\ntop_gt0?\n100\n200\nEND\n", &mut interp).unwrap();
        // true: both following instructions run
        assert_eq!(interp.stack.len(), 3);
        assert_eq!(interp.stack.peek(0), Some(&Val::Real(200.0)));
        assert_eq!(interp.stack.peek(1), Some(&Val::Real(100.0)));
    }

    #[test]
    fn test_test_false_skips_exactly_one() {
        let mut interp = Interp::new();
        run("-1\ntop_gt0?\n100\n200\nEND\n", &mut interp).unwrap();
        assert_eq!(interp.stack.len(), 2);
        assert_eq!(interp.stack.peek(0), Some(&Val::Real(200.0)));
        assert_eq!(interp.stack.peek(1), Some(&Val::Real(-1.0)));
    }

    #[test]
    fn test_countdown_loop() {
        let mut interp = Interp::new();
        let script = "\
3 0 ctr_set
LBL loop
0 ctr_decr
0
ctr_gt0?
GOTO loop
END
";
        run(script, &mut interp).unwrap();
        assert_eq!(interp.counters[0], 0);
    }

    #[test]
    fn test_gosub_and_rtn_resume() {
        let mut interp = Interp::new();
        let script = "\
1
GOSUB sub
4
END
LBL sub
2
3
RTN
";
        run(script, &mut interp).unwrap();
        let got: Vec<&Val> = interp.stack.iter().collect();
        assert_eq!(
            got,
            vec![&Val::Real(1.0), &Val::Real(2.0), &Val::Real(3.0), &Val::Real(4.0)]
        );
    }

    #[test]
    fn test_rtn_without_gosub() {
        let mut interp = Interp::new();
        let e = run("RTN\n", &mut interp).unwrap_err();
        assert_eq!(e.code(), ErrorCode::ReturnStackUnderflow);
    }

    #[test]
    fn test_goto_missing_label() {
        let mut interp = Interp::new();
        let e = run("GOTO nowhere\n", &mut interp).unwrap_err();
        assert_eq!(e.code(), ErrorCode::InvalidLabel);
    }

    #[test]
    fn test_word_error_does_not_halt() {
        let mut interp = Interp::new();
        run("drop\n7\nEND\n", &mut interp).unwrap();
        assert_eq!(interp.stack.pop().unwrap(), Val::Real(7.0));
    }

    #[test]
    fn test_counter_predicate_pops_index() {
        let mut interp = Interp::new();
        interp.counters[2] = 5;
        run("2\nctr_gt0?\n100\n200\nEND\n", &mut interp).unwrap();
        // the index is consumed, both branch instructions run
        assert_eq!(interp.stack.len(), 2);
        assert_eq!(interp.stack.peek(1), Some(&Val::Real(100.0)));
    }

    #[test]
    fn test_predicates_fail_quiet() {
        let mut interp = Interp::new();
        // empty stack: false, skip one
        run("top_eq0?\n100\n200\nEND\n", &mut interp).unwrap();
        assert_eq!(interp.stack.len(), 1);
        assert_eq!(interp.stack.peek(0), Some(&Val::Real(200.0)));

        // out-of-range counter index: popped, still false
        let mut interp = Interp::new();
        run("99\nctr_eq0?\n100\n200\nEND\n", &mut interp).unwrap();
        assert_eq!(interp.stack.len(), 1);

        // non-real top: false, left in place
        let mut interp = Interp::new();
        run("\"x\"\nctr_eq0?\n100\n200\nEND\n", &mut interp).unwrap();
        assert_eq!(interp.stack.len(), 2);
        assert_eq!(interp.stack.peek(1), Some(&Val::Str("x".to_string())));
    }

    #[test]
    fn test_program_caps() {
        let mut big = String::new();
        for _ in 0..(MAX_PROGRAM + 1) {
            big.push_str("1\n");
        }
        let e = load_program(&big).unwrap_err();
        assert_eq!(e.code(), ErrorCode::ProgramLoadError);

        let long_label = format!("LBL {}\n", "x".repeat(MAX_LABEL_LEN + 1));
        let e = load_program(&long_label).unwrap_err();
        assert_eq!(e.code(), ErrorCode::ProgramLoadError);
    }
}
