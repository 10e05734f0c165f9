use crate::error;
use crate::lang::Error;

type Result<T> = std::result::Result<T, Error>;

/// Row-major owned matrix payload. Cloning clones the buffer; two stack
/// slots never alias the same data.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix<T> {
    rows: usize,
    cols: usize,
    data: Vec<T>,
}

impl<T: Clone> Matrix<T> {
    pub fn new(rows: usize, cols: usize, data: Vec<T>) -> Result<Matrix<T>> {
        if rows == 0 || cols == 0 || data.len() != rows * cols {
            return Err(error!(TypeMismatch; "bad matrix dimensions"));
        }
        Ok(Matrix { rows, cols, data })
    }

    pub fn fill(rows: usize, cols: usize, value: T) -> Result<Matrix<T>> {
        Matrix::new(rows, cols, vec![value; rows * cols])
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&T> {
        if row < self.rows && col < self.cols {
            self.data.get(row * self.cols + col)
        } else {
            None
        }
    }

    pub fn set(&mut self, row: usize, col: usize, value: T) -> bool {
        if row < self.rows && col < self.cols {
            self.data[row * self.cols + col] = value;
            true
        } else {
            false
        }
    }

    pub fn map<U, F: FnMut(&T) -> U>(&self, f: F) -> Matrix<U> {
        Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(f).collect(),
        }
    }

    pub fn transpose(&self) -> Matrix<T> {
        let mut data = Vec::with_capacity(self.data.len());
        for c in 0..self.cols {
            for r in 0..self.rows {
                data.push(self.data[r * self.cols + c].clone());
            }
        }
        Matrix {
            rows: self.cols,
            cols: self.rows,
            data,
        }
    }
}

/// A tagged stack value. Exactly one variant is active and the slot owns
/// its heap payload; duplication words deep-clone.
#[derive(Debug, Clone, PartialEq)]
pub enum Val {
    Real(f64),
    Complex(f64, f64),
    Str(String),
    MatrixReal(Matrix<f64>),
    MatrixComplex(Matrix<(f64, f64)>),
}

impl Val {
    pub fn kind_name(&self) -> &'static str {
        use Val::*;
        match self {
            Real(_) => "real",
            Complex(..) => "complex",
            Str(_) => "string",
            MatrixReal(_) => "real matrix",
            MatrixComplex(_) => "complex matrix",
        }
    }

    pub fn as_real(&self) -> Option<f64> {
        match self {
            Val::Real(x) => Some(*x),
            _ => None,
        }
    }

    pub fn parse_number(text: &str) -> Result<Val> {
        match text.parse::<f64>() {
            Ok(x) => Ok(Val::Real(x)),
            Err(_) => Err(error!(LexError; format!("bad number '{}'", text))),
        }
    }

    /// Canonical complex literal text `(re,im)` as emitted by the lexer.
    pub fn parse_complex(text: &str) -> Result<Val> {
        let inner = text
            .strip_prefix('(')
            .and_then(|s| s.strip_suffix(')'))
            .ok_or_else(|| error!(LexError; format!("bad complex '{}'", text)))?;
        let mut parts = inner.splitn(2, ',');
        let re = parts.next().and_then(|s| s.trim().parse::<f64>().ok());
        let im = parts.next().and_then(|s| s.trim().parse::<f64>().ok());
        match (re, im) {
            (Some(re), Some(im)) => Ok(Val::Complex(re, im)),
            _ => Err(error!(LexError; format!("bad complex '{}'", text))),
        }
    }

    /// Canonical inline-matrix text `rows cols $ e1 e2 ...`. Real elements
    /// build a real matrix; any complex element promotes the whole matrix
    /// to complex.
    pub fn parse_matrix(text: &str) -> Result<Val> {
        let mut halves = text.splitn(2, '$');
        let header = halves
            .next()
            .ok_or_else(|| error!(LexError; "bad matrix literal"))?;
        let body = halves
            .next()
            .ok_or_else(|| error!(LexError; "bad matrix literal"))?;

        let mut dims = header.split_whitespace();
        let rows = dims.next().and_then(|s| s.parse::<usize>().ok());
        let cols = dims.next().and_then(|s| s.parse::<usize>().ok());
        let (rows, cols) = match (rows, cols) {
            (Some(r), Some(c)) if dims.next().is_none() => (r, c),
            _ => return Err(error!(LexError; "bad matrix dimensions")),
        };

        let mut reals: Vec<f64> = Vec::new();
        let mut pairs: Vec<(f64, f64)> = Vec::new();
        let mut complex = false;
        for elem in body.split_whitespace() {
            if elem.starts_with('(') {
                match Val::parse_complex(elem)? {
                    Val::Complex(re, im) => {
                        if !complex {
                            complex = true;
                            pairs = reals.iter().map(|x| (*x, 0.0)).collect();
                        }
                        pairs.push((re, im));
                    }
                    _ => unreachable!(),
                }
            } else {
                let x = elem
                    .parse::<f64>()
                    .map_err(|_| error!(LexError; format!("bad matrix element '{}'", elem)))?;
                if complex {
                    pairs.push((x, 0.0));
                } else {
                    reals.push(x);
                }
            }
        }

        let count = if complex { pairs.len() } else { reals.len() };
        if count != rows * cols {
            return Err(error!(LexError;
                format!("matrix element count mismatch: expected {}, got {}", rows * cols, count)));
        }
        if complex {
            Ok(Val::MatrixComplex(Matrix::new(rows, cols, pairs)?))
        } else {
            Ok(Val::MatrixReal(Matrix::new(rows, cols, reals)?))
        }
    }

    fn fmt_real(x: f64, precision: usize, fixed: bool) -> String {
        if fixed {
            format!("{:.*}", precision, x)
        } else {
            format!("{:.*e}", precision, x)
        }
    }

    /// One-line rendering for the automatic stack display. Matrices show a
    /// shape summary; `pm` prints them in full via [`Val::render_full`].
    pub fn render(&self, precision: usize, fixed: bool) -> String {
        use Val::*;
        match self {
            Real(x) => Val::fmt_real(*x, precision, fixed),
            Complex(re, im) => format!(
                "({},{})",
                Val::fmt_real(*re, precision, fixed),
                Val::fmt_real(*im, precision, fixed)
            ),
            Str(s) => format!("\"{}\"", s),
            MatrixReal(m) => format!("[{}x{} matrix]", m.rows(), m.cols()),
            MatrixComplex(m) => format!("[{}x{} complex matrix]", m.rows(), m.cols()),
        }
    }

    pub fn render_full(&self, precision: usize, fixed: bool) -> String {
        use Val::*;
        match self {
            MatrixReal(m) => {
                let mut out = String::new();
                for r in 0..m.rows() {
                    let row: Vec<String> = (0..m.cols())
                        .map(|c| Val::fmt_real(*m.get(r, c).unwrap(), precision, fixed))
                        .collect();
                    out.push_str(&row.join("  "));
                    out.push('\n');
                }
                out
            }
            MatrixComplex(m) => {
                let mut out = String::new();
                for r in 0..m.rows() {
                    let row: Vec<String> = (0..m.cols())
                        .map(|c| {
                            let (re, im) = *m.get(r, c).unwrap();
                            format!(
                                "({},{})",
                                Val::fmt_real(re, precision, fixed),
                                Val::fmt_real(im, precision, fixed)
                            )
                        })
                        .collect();
                    out.push_str(&row.join("  "));
                    out.push('\n');
                }
                out
            }
            _ => self.render(precision, fixed),
        }
    }
}
