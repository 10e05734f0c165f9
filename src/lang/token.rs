use std::collections::HashSet;

/// Token text is clipped to this many characters, matching the fixed
/// buffers of classic calculator firmware. Overlong input is silently
/// truncated.
pub const MAX_TOKEN_LEN: usize = 256;

/// Every named builtin the dispatcher knows. The lexer classifies an
/// identifier as a FUNCTION token when it appears here; the shell uses the
/// same list for tab completion. `mach::builtin` must provide an operation
/// for each entry (enforced by test).
pub const BUILTIN_NAMES: &[&str] = &[
    // stack manipulation
    "drop", "dup", "swap", "over", "nip", "tuck", "roll", "clst", "depth",
    // arithmetic and powers
    "pow", "chs", "inv", "pct", "pctchg",
    // transcendentals
    "ln", "log", "exp", "sqrt", "abs", "sin", "cos", "tan", "asin", "acos",
    "atan", "sinh", "cosh", "tanh", "asinh", "acosh", "atanh", "npdf", "ncdf",
    // comparison and logic
    "eq", "neq", "lt", "gt", "leq", "geq", "and", "or", "not",
    // complex numbers
    "re", "im", "arg", "conj", "j2r", "re2c", "split_c",
    // constants and random
    "pi", "e", "gravity", "inf", "nan", "rand",
    // matrices
    "eye", "ones", "tran", "get_aij", "set_aij", "pm",
    // registers
    "sto", "rcl", "pr", "ffr",
    // condition counters
    "ctr_set", "ctr_add", "ctr_incr", "ctr_decr", "ctr_clr", "ctr_clall",
    // strings
    "scon", "substr", "s2u", "s2l", "slen", "srev", "int2str", "eval",
    // dates
    "today", "dateplus", "ddays", "dow",
    // display control
    "setprec", "sfs",
    // stack persistence
    "savestack", "loadstack",
    // stored programs
    "loadprog", "listprog", "runprog", "batch",
    // help
    "help", "listfcns", "listwords",
];

thread_local!(
    static BUILTIN_SET: HashSet<&'static str> = BUILTIN_NAMES.iter().copied().collect();
);

pub fn is_builtin_name(s: &str) -> bool {
    BUILTIN_SET.with(|set| set.contains(s))
}

#[derive(Debug, PartialEq, Clone)]
pub enum Token {
    Eof,
    Number(String),
    Complex(String),
    Str(String),
    MatrixFile(String),
    MatrixInlineReal(String),
    MatrixInlineComplex(String),
    MatrixInlineMixed(String),
    Identifier(String),
    Function(String),
    Operator(Operator),
    Colon,
    Semicolon,
    Unknown(String),
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        use Token::*;
        match self {
            Eof => Ok(()),
            Number(s) => write!(f, "{}", s),
            Complex(s) => write!(f, "{}", s),
            Str(s) => write!(f, "\"{}\"", s),
            MatrixFile(s) => write!(f, "{}", s),
            MatrixInlineReal(s) => write!(f, "[{}]", s),
            MatrixInlineComplex(s) => write!(f, "[{}]", s),
            MatrixInlineMixed(s) => write!(f, "[{}]", s),
            Identifier(s) => write!(f, "{}", s),
            Function(s) => write!(f, "{}", s),
            Operator(op) => write!(f, "{}", op),
            Colon => write!(f, ":"),
            Semicolon => write!(f, ";"),
            Unknown(s) => write!(f, "{}", s),
        }
    }
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum Operator {
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    DotStar,
    DotSlash,
    DotCaret,
    Bra,
    Ket,
    Vertical,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        use Operator::*;
        match self {
            Plus => "+",
            Minus => "-",
            Star => "*",
            Slash => "/",
            Caret => "^",
            DotStar => ".*",
            DotSlash => "./",
            DotCaret => ".^",
            Bra => "<",
            Ket => ">",
            Vertical => "|",
        }
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
