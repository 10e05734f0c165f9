use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::machine::MAX_COUNTERS;
use super::{builtin, Matrix, Program, Stack, Val};
use crate::error;
use crate::lang::{lex, Error, Token};

type Result<T> = std::result::Result<T, Error>;

/// Number of storage registers addressable by `sto` and `rcl`.
pub const MAX_REG: usize = 100;

/// User words may call other user words, but not forever.
const MAX_EXPANSION_DEPTH: usize = 64;

/// ## The interpreter
///
/// Owns everything a line of input can touch: the value stack, the
/// condition counters, the storage registers, the user word dictionary
/// and the loaded program. Tokens flow in through [`Interp::evaluate_line`]
/// and are dispatched one at a time; a token that fails leaves all of
/// this state as the previous token left it.
pub struct Interp {
    pub stack: Stack,
    pub counters: [i64; MAX_COUNTERS],
    registers: Vec<Option<Val>>,
    pub words: HashMap<String, String>,
    pub program: Option<Program>,
    /// Set by words that produce their own output so the shell skips the
    /// automatic stack display for this line.
    pub suppress_print: bool,
    pub precision: usize,
    pub fixed_point: bool,
    interrupted: Arc<AtomicBool>,
    depth: usize,
}

impl Default for Interp {
    fn default() -> Interp {
        Interp::new()
    }
}

impl Interp {
    pub fn new() -> Interp {
        Interp {
            stack: Stack::new(),
            counters: [0; MAX_COUNTERS],
            registers: vec![None; MAX_REG],
            words: HashMap::new(),
            program: None,
            suppress_print: false,
            // FIX 4 on power-up
            precision: 4,
            fixed_point: true,
            interrupted: Arc::new(AtomicBool::new(false)),
            depth: 0,
        }
    }

    /// Handle for the Ctrl-C handler to set.
    pub fn interrupt_flag(&self) -> Arc<AtomicBool> {
        self.interrupted.clone()
    }

    /// Consumes a pending interrupt, if any.
    pub fn check_interrupt(&self) -> Result<()> {
        if self.interrupted.swap(false, Ordering::SeqCst) {
            Err(error!(Interrupted))
        } else {
            Ok(())
        }
    }

    pub fn reg_store(&mut self, index: usize, val: Val) -> Result<()> {
        if index >= MAX_REG {
            return Err(error!(TypeMismatch; format!("register {} out of range", index)));
        }
        self.registers[index] = Some(val);
        Ok(())
    }

    pub fn reg_recall(&self, index: usize) -> Result<Val> {
        if index >= MAX_REG {
            return Err(error!(TypeMismatch; format!("register {} out of range", index)));
        }
        match &self.registers[index] {
            Some(v) => Ok(v.clone()),
            None => Err(error!(TypeMismatch; format!("register {} is empty", index))),
        }
    }

    pub fn reg_get(&self, index: usize) -> Option<&Val> {
        self.registers.get(index).and_then(|r| r.as_ref())
    }

    /// Lowest register index not currently holding a value.
    pub fn first_free_register(&self) -> Option<usize> {
        self.registers.iter().position(|r| r.is_none())
    }

    pub fn evaluate_line(&mut self, line: &str) -> Result<()> {
        let tokens = lex(line);
        self.evaluate_tokens(&tokens)
    }

    /// Walks a token list, peeling off `: name body ;` word definitions
    /// and dispatching everything else.
    pub fn evaluate_tokens(&mut self, tokens: &[Token]) -> Result<()> {
        let mut i = 0;
        while i < tokens.len() {
            self.check_interrupt()?;
            if tokens[i] == Token::Colon {
                i = self.define_word(tokens, i + 1)?;
            } else {
                self.evaluate_token(&tokens[i])?;
                i += 1;
            }
        }
        Ok(())
    }

    /// `start` indexes the token after the colon. Returns the index after
    /// the closing semicolon.
    fn define_word(&mut self, tokens: &[Token], start: usize) -> Result<usize> {
        let name = match tokens.get(start) {
            Some(Token::Identifier(name)) => name.clone(),
            Some(Token::Function(name)) => {
                return Err(error!(LexError; format!("cannot redefine builtin '{}'", name)));
            }
            _ => return Err(error!(LexError; "expected a word name after ':'")),
        };
        let mut body = String::new();
        let mut i = start + 1;
        loop {
            match tokens.get(i) {
                None => return Err(error!(LexError; format!("definition of '{}' has no ';'", name))),
                Some(Token::Semicolon) => break,
                Some(token) => {
                    if !body.is_empty() {
                        body.push(' ');
                    }
                    body.push_str(&token.to_string());
                }
            }
            i += 1;
        }
        self.words.insert(name, body);
        Ok(i + 1)
    }

    fn evaluate_token(&mut self, token: &Token) -> Result<()> {
        use Token::*;
        match token {
            Eof => Ok(()),
            Number(s) => self.stack.push(Val::parse_number(s)?),
            Complex(s) => self.stack.push(Val::parse_complex(s)?),
            Str(s) => self.stack.push(Val::Str(s.clone())),
            MatrixInlineReal(s) | MatrixInlineComplex(s) | MatrixInlineMixed(s) => {
                self.stack.push(Val::parse_matrix(s)?)
            }
            MatrixFile(s) => {
                let val = Interp::load_matrix_literal(s)?;
                self.stack.push(val)
            }
            Function(name) | Identifier(name) => self.run_word(name),
            Operator(op) => self.run_word(op.as_str()),
            Colon => Err(error!(LexError; "unexpected ':'")),
            Semicolon => Err(error!(LexError; "unexpected ';'")),
            Unknown(s) => Err(error!(LexError; format!("unexpected '{}'", s))),
        }
    }

    /// Evaluates text produced at runtime (the `eval` word). Shares the
    /// nesting limit with user word expansion.
    pub fn eval_nested(&mut self, text: &str) -> Result<()> {
        if self.depth >= MAX_EXPANSION_DEPTH {
            return Err(error!(StackOverflow; "eval nests too deeply"));
        }
        self.depth += 1;
        let result = self.evaluate_line(text);
        self.depth -= 1;
        result
    }

    /// Builtins shadow user words; anything else is unknown.
    pub fn run_word(&mut self, name: &str) -> Result<()> {
        if let Some(def) = builtin::lookup(name) {
            return (def.exec)(self);
        }
        if let Some(body) = self.words.get(name).cloned() {
            if self.depth >= MAX_EXPANSION_DEPTH {
                return Err(error!(StackOverflow; format!("word '{}' nests too deeply", name)));
            }
            self.depth += 1;
            let result = self.evaluate_tokens(&lex(&body));
            self.depth -= 1;
            return result;
        }
        Err(error!(UnknownWord; name))
    }

    /// `[rows,cols,"filename"]`. The file holds whitespace-separated real
    /// numbers, exactly `rows * cols` of them.
    fn load_matrix_literal(text: &str) -> Result<Val> {
        let inner = text
            .strip_prefix('[')
            .and_then(|s| s.strip_suffix(']'))
            .ok_or_else(|| error!(LexError; format!("bad matrix literal '{}'", text)))?;
        let mut parts = inner.splitn(3, ',');
        let rows = parts.next().and_then(|s| s.trim().parse::<usize>().ok());
        let cols = parts.next().and_then(|s| s.trim().parse::<usize>().ok());
        let name = parts.next().map(|s| s.trim().trim_matches('"').to_string());
        let (rows, cols, name) = match (rows, cols, name) {
            (Some(r), Some(c), Some(n)) if r > 0 && c > 0 => (r, c, n),
            _ => return Err(error!(LexError; format!("bad matrix literal '{}'", text))),
        };

        let contents = std::fs::read_to_string(&name)?;
        let mut data = Vec::with_capacity(rows * cols);
        for elem in contents.split_whitespace() {
            let x = elem.parse::<f64>().map_err(
                |_| error!(FormatError; format!("bad element '{}' in {}", elem, name)),
            )?;
            data.push(x);
        }
        if data.len() != rows * cols {
            return Err(error!(FormatError;
                format!("{} holds {} elements, expected {}", name, data.len(), rows * cols)));
        }
        Ok(Val::MatrixReal(Matrix::new(rows, cols, data)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::ErrorCode;

    #[test]
    fn test_literals_push() {
        let mut interp = Interp::new();
        interp.evaluate_line("1.5 (1,2) \"hi\" [2 2 $ 1 2 3 4]").unwrap();
        assert_eq!(interp.stack.len(), 4);
        assert_eq!(interp.stack.peek(3), Some(&Val::Real(1.5)));
        assert_eq!(interp.stack.peek(2), Some(&Val::Complex(1.0, 2.0)));
        assert_eq!(interp.stack.peek(1), Some(&Val::Str("hi".to_string())));
    }

    #[test]
    fn test_define_and_run_word() {
        let mut interp = Interp::new();
        interp.evaluate_line(": double 2 * ;").unwrap();
        interp.evaluate_line("21 double").unwrap();
        assert_eq!(interp.stack.pop().unwrap(), Val::Real(42.0));
    }

    #[test]
    fn test_cannot_redefine_builtin() {
        let mut interp = Interp::new();
        let e = interp.evaluate_line(": sin 0 ;").unwrap_err();
        assert_eq!(e.code(), ErrorCode::LexError);
    }

    #[test]
    fn test_unknown_word() {
        let mut interp = Interp::new();
        let e = interp.evaluate_line("frobnicate").unwrap_err();
        assert_eq!(e.code(), ErrorCode::UnknownWord);
    }

    #[test]
    fn test_runaway_expansion_stops() {
        let mut interp = Interp::new();
        interp.evaluate_line(": loop_a loop_a ;").unwrap();
        let e = interp.evaluate_line("loop_a").unwrap_err();
        assert_eq!(e.code(), ErrorCode::StackOverflow);
    }

    #[test]
    fn test_registers() {
        let mut interp = Interp::new();
        assert_eq!(interp.first_free_register(), Some(0));
        interp.reg_store(7, Val::Real(3.5)).unwrap();
        assert_eq!(interp.reg_recall(7).unwrap(), Val::Real(3.5));
        assert!(interp.reg_recall(8).is_err());
        assert!(interp.reg_store(MAX_REG, Val::Real(0.0)).is_err());
    }
}
