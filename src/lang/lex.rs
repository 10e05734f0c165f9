use super::token::*;

/// Lex an entire line. The trailing `Eof` token is dropped.
pub fn lex(s: &str) -> Vec<Token> {
    let mut lexer = Lexer::new(s);
    let mut tokens: Vec<Token> = Vec::new();
    loop {
        match lexer.next_token() {
            Token::Eof => return tokens,
            token => tokens.push(token),
        }
    }
}

fn bounded(s: &str) -> String {
    s.chars().take(MAX_TOKEN_LEN - 1).collect()
}

/// Scanner over a single line of input. `next_token` hands out one token
/// at a time; failed multi-character forms rewind and fall back to an
/// `Unknown` token so the caller decides what to do with the stray byte.
pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Lexer {
        Lexer {
            chars: input.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, pos: usize) -> Option<char> {
        self.chars.get(pos).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn is_digit_at(&self, pos: usize) -> bool {
        match self.peek_at(pos) {
            Some(ch) => ch.is_ascii_digit(),
            None => false,
        }
    }

    /// A numeric literal begins here: `12`, `.9`, `-12`, `+.3` and the like.
    fn starts_number_at(&self, pos: usize) -> bool {
        match self.peek_at(pos) {
            None => false,
            Some(c0) => {
                if c0.is_ascii_digit() {
                    return true;
                }
                if c0 == '.' {
                    return self.is_digit_at(pos + 1);
                }
                if c0 == '+' || c0 == '-' {
                    if self.is_digit_at(pos + 1) {
                        return true;
                    }
                    if self.peek_at(pos + 1) == Some('.') {
                        return self.is_digit_at(pos + 2);
                    }
                }
                false
            }
        }
    }

    fn starts_number(&self) -> bool {
        self.starts_number_at(self.pos)
    }

    /// Accepts `[+-]?(\d+(\.\d*)?|\.\d+)([eE][+-]?\d+)?`. The caller has
    /// already checked `starts_number`.
    fn lex_number(&mut self) -> Token {
        let start = self.pos;

        if self.peek() == Some('-') || self.peek() == Some('+') {
            self.advance();
        }
        while self.is_digit_at(self.pos) {
            self.advance();
        }
        if self.peek() == Some('.') {
            self.advance();
            while self.is_digit_at(self.pos) {
                self.advance();
            }
        }
        if self.peek() == Some('e') || self.peek() == Some('E') {
            // consume the exponent only when digits actually follow
            let mut ahead = self.pos + 1;
            if self.peek_at(ahead) == Some('+') || self.peek_at(ahead) == Some('-') {
                ahead += 1;
            }
            if self.is_digit_at(ahead) {
                self.pos = ahead;
                while self.is_digit_at(self.pos) {
                    self.advance();
                }
            }
        }

        let text: String = self.chars[start..self.pos].iter().collect();
        Token::Number(bounded(&text))
    }

    fn lex_identifier(&mut self) -> Token {
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                self.advance();
            } else {
                break;
            }
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        let text = bounded(&text);
        if is_builtin_name(&text) {
            Token::Function(text)
        } else {
            Token::Identifier(text)
        }
    }

    /// Opaque content up to the closing quote or end of input, unescaped.
    fn lex_string(&mut self) -> Token {
        self.advance();
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if ch == '"' {
                break;
            }
            self.advance();
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        self.match_char('"');
        Token::Str(bounded(&text))
    }

    /// `(real,imag)`. Anything short of the full pattern gives up the `(`
    /// as an `Unknown` token and rewinds to just after it, so the rest of
    /// the line is re-lexed on its own.
    fn lex_complex(&mut self) -> Token {
        if !self.match_char('(') {
            return Token::Unknown("(".to_string());
        }
        let start_pos = self.pos;

        if !self.starts_number() {
            return Token::Unknown("(".to_string());
        }
        let real = self.lex_number();
        if !self.match_char(',') {
            self.pos = start_pos;
            return Token::Unknown("(".to_string());
        }
        if !self.starts_number() {
            self.pos = start_pos;
            return Token::Unknown("(".to_string());
        }
        let imag = self.lex_number();
        if !self.match_char(')') {
            self.pos = start_pos;
            return Token::Unknown("(".to_string());
        }

        Token::Complex(bounded(&format!("({},{})", real, imag)))
    }

    /// Like [`Lexer::lex_complex`], but a failed match rewinds all the way
    /// back over the `(` so an enclosing matrix literal can give up cleanly.
    fn try_complex(&mut self) -> Option<Token> {
        let before = self.pos;
        match self.lex_complex() {
            token @ Token::Complex(_) => Some(token),
            _ => {
                self.pos = before;
                None
            }
        }
    }

    /// `[rows,cols,"filename"]`, with the `[` already consumed.
    fn lex_matrix_file(&mut self) -> Token {
        let start_pos = self.pos;

        let rows = self.lex_number();
        if !self.match_char(',') {
            self.pos = start_pos;
            return Token::Unknown("[".to_string());
        }
        let cols = self.lex_number();
        if !self.match_char(',') {
            self.pos = start_pos;
            return Token::Unknown("[".to_string());
        }
        if self.peek() != Some('"') {
            self.pos = start_pos;
            return Token::Unknown("[".to_string());
        }
        let name = self.lex_string();
        if !self.match_char(']') {
            self.pos = start_pos;
            return Token::Unknown("[".to_string());
        }

        Token::MatrixFile(bounded(&format!("[{},{},{}]", rows, cols, name)))
    }

    /// Inline J-style `[rows cols $ v1 v2 ...]`, with the `[` already
    /// consumed. Elements may mix real and complex literals; the tag
    /// records which kinds were seen.
    fn lex_matrix_inline(&mut self) -> Token {
        let start_pos = self.pos;

        if !self.starts_number() {
            self.pos = start_pos;
            return Token::Unknown("[".to_string());
        }
        let rows = self.lex_number();
        self.skip_whitespace();
        if !self.starts_number() {
            self.pos = start_pos;
            return Token::Unknown("[".to_string());
        }
        let cols = self.lex_number();
        self.skip_whitespace();
        if !self.match_char('$') {
            self.pos = start_pos;
            return Token::Unknown("[".to_string());
        }

        let mut text = format!("{} {} $", rows, cols);
        let mut has_real = false;
        let mut has_complex = false;

        loop {
            self.skip_whitespace();
            match self.peek() {
                None | Some(']') => break,
                Some('(') => match self.try_complex() {
                    Some(Token::Complex(s)) => {
                        has_complex = true;
                        text.push(' ');
                        text.push_str(&s);
                    }
                    _ => break,
                },
                Some(_) => {
                    if !self.starts_number() {
                        break;
                    }
                    if let Token::Number(s) = self.lex_number() {
                        has_real = true;
                        text.push(' ');
                        text.push_str(&s);
                    }
                }
            }
        }

        if !self.match_char(']') {
            self.pos = start_pos;
            return Token::Unknown("[".to_string());
        }

        let text = bounded(&text);
        if has_complex && has_real {
            Token::MatrixInlineMixed(text)
        } else if has_complex {
            Token::MatrixInlineComplex(text)
        } else {
            Token::MatrixInlineReal(text)
        }
    }

    /// A `[` opens either the matrix-from-file form or an inline matrix.
    /// `[<number>,` means a file; anything else is inline.
    fn lex_bracket(&mut self) -> Token {
        let mut ahead = self.pos + 1;
        while let Some(ch) = self.peek_at(ahead) {
            if ch.is_whitespace() {
                ahead += 1;
            } else {
                break;
            }
        }
        if self.starts_number_at(ahead) {
            while let Some(ch) = self.peek_at(ahead) {
                if ch.is_ascii_digit()
                    || ch == '.'
                    || ch == '-'
                    || ch == '+'
                    || ch == 'e'
                    || ch == 'E'
                {
                    ahead += 1;
                } else {
                    break;
                }
            }
            while let Some(ch) = self.peek_at(ahead) {
                if ch.is_whitespace() {
                    ahead += 1;
                } else {
                    break;
                }
            }
            if self.peek_at(ahead) == Some(',') {
                self.advance();
                return self.lex_matrix_file();
            }
        }
        self.advance();
        self.lex_matrix_inline()
    }

    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        let c = match self.peek() {
            Some(c) => c,
            None => return Token::Eof,
        };

        if self.starts_number() {
            return self.lex_number();
        }
        if c == '(' {
            return self.lex_complex();
        }
        if c == '[' {
            return self.lex_bracket();
        }
        if c.is_ascii_alphabetic() || c == '_' {
            return self.lex_identifier();
        }
        if c == '"' {
            return self.lex_string();
        }

        if c == '.' {
            match self.peek_at(self.pos + 1) {
                Some('*') => {
                    self.pos += 2;
                    return Token::Operator(Operator::DotStar);
                }
                Some('/') => {
                    self.pos += 2;
                    return Token::Operator(Operator::DotSlash);
                }
                Some('^') => {
                    self.pos += 2;
                    return Token::Operator(Operator::DotCaret);
                }
                _ => {}
            }
        }

        match c {
            '+' => {
                self.advance();
                Token::Operator(Operator::Plus)
            }
            '-' => {
                self.advance();
                Token::Operator(Operator::Minus)
            }
            '*' => {
                self.advance();
                Token::Operator(Operator::Star)
            }
            '/' => {
                self.advance();
                Token::Operator(Operator::Slash)
            }
            '^' => {
                self.advance();
                Token::Operator(Operator::Caret)
            }
            '<' => {
                self.advance();
                Token::Operator(Operator::Bra)
            }
            '>' => {
                self.advance();
                Token::Operator(Operator::Ket)
            }
            '|' => {
                self.advance();
                Token::Operator(Operator::Vertical)
            }
            ':' => {
                self.advance();
                Token::Colon
            }
            ';' => {
                self.advance();
                Token::Semicolon
            }
            '\'' => {
                self.advance();
                Token::Function("'".to_string())
            }
            _ => {
                self.advance();
                Token::Unknown(c.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_forms() {
        for s in &["12", "-12.5", "1.2e-3", ".9E3", "+.3", "0.5"] {
            let v = lex(s);
            assert_eq!(v, vec![Token::Number(s.to_string())], "lexing {}", s);
        }
    }

    #[test]
    fn test_exponent_needs_digits() {
        let v = lex("1e");
        assert_eq!(
            v,
            vec![
                Token::Number("1".to_string()),
                Token::Function("e".to_string()) // the constant word, not an exponent
            ]
        );
    }

    #[test]
    fn test_complex_rewind() {
        let v = lex("(1,2)");
        assert_eq!(v, vec![Token::Complex("(1,2)".to_string())]);
        // a failed form gives up the paren and re-lexes the rest
        let v = lex("(1 2)");
        assert_eq!(
            v,
            vec![
                Token::Unknown("(".to_string()),
                Token::Number("1".to_string()),
                Token::Number("2".to_string()),
                Token::Unknown(")".to_string()),
            ]
        );
    }

    #[test]
    fn test_bracket_lookahead() {
        let v = lex("[2,3,\"m.txt\"]");
        assert_eq!(v, vec![Token::MatrixFile("[2,3,\"m.txt\"]".to_string())]);
        let v = lex("[2 2 $ -1 2 5 1]");
        assert_eq!(
            v,
            vec![Token::MatrixInlineReal("2 2 $ -1 2 5 1".to_string())]
        );
    }

    #[test]
    fn test_function_vs_identifier() {
        let v = lex("sin frobnicate");
        assert_eq!(
            v,
            vec![
                Token::Function("sin".to_string()),
                Token::Identifier("frobnicate".to_string())
            ]
        );
    }

    #[test]
    fn test_dot_operators() {
        let v = lex(".* ./ .^ .");
        assert_eq!(
            v,
            vec![
                Token::Operator(Operator::DotStar),
                Token::Operator(Operator::DotSlash),
                Token::Operator(Operator::DotCaret),
                Token::Unknown(".".to_string()),
            ]
        );
    }

    #[test]
    fn test_truncation_is_silent() {
        let long: String = "a".repeat(MAX_TOKEN_LEN * 2);
        let v = lex(&long);
        match &v[0] {
            Token::Identifier(s) => assert_eq!(s.len(), MAX_TOKEN_LEN - 1),
            other => panic!("unexpected token {:?}", other),
        }
    }
}
