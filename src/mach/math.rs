use super::{Matrix, Val};
use crate::error;
use crate::lang::Error;

type Result<T> = std::result::Result<T, Error>;

fn c_add(l: (f64, f64), r: (f64, f64)) -> (f64, f64) {
    (l.0 + r.0, l.1 + r.1)
}

fn c_sub(l: (f64, f64), r: (f64, f64)) -> (f64, f64) {
    (l.0 - r.0, l.1 - r.1)
}

fn c_mul(l: (f64, f64), r: (f64, f64)) -> (f64, f64) {
    (l.0 * r.0 - l.1 * r.1, l.0 * r.1 + l.1 * r.0)
}

fn c_div(l: (f64, f64), r: (f64, f64)) -> (f64, f64) {
    let d = r.0 * r.0 + r.1 * r.1;
    ((l.0 * r.0 + l.1 * r.1) / d, (l.1 * r.0 - l.0 * r.1) / d)
}

fn c_abs(z: (f64, f64)) -> f64 {
    z.0.hypot(z.1)
}

/// Numeric bodies for the dispatcher. Every function takes its operands
/// by value and returns a fresh value; the caller restores the stack if
/// the operation fails.
pub struct Operation {}

impl Operation {
    pub fn add(lhs: Val, rhs: Val) -> Result<Val> {
        use Val::*;
        match (lhs, rhs) {
            (Real(l), Real(r)) => Ok(Real(l + r)),
            (Real(l), Complex(re, im)) => Ok(Complex(l + re, im)),
            (Complex(re, im), Real(r)) => Ok(Complex(re + r, im)),
            (Complex(a, b), Complex(c, d)) => {
                let z = c_add((a, b), (c, d));
                Ok(Complex(z.0, z.1))
            }
            (MatrixReal(l), MatrixReal(r)) => Operation::zip(l, r, |a, b| a + b),
            (MatrixReal(m), Real(x)) | (Real(x), MatrixReal(m)) => {
                Ok(MatrixReal(m.map(|v| v + x)))
            }
            (MatrixComplex(l), MatrixComplex(r)) => Operation::zip_c(l, r, c_add),
            (l, r) => Err(Operation::mismatch("+", &l, &r)),
        }
    }

    pub fn subtract(lhs: Val, rhs: Val) -> Result<Val> {
        use Val::*;
        match (lhs, rhs) {
            (Real(l), Real(r)) => Ok(Real(l - r)),
            (Real(l), Complex(re, im)) => Ok(Complex(l - re, -im)),
            (Complex(re, im), Real(r)) => Ok(Complex(re - r, im)),
            (Complex(a, b), Complex(c, d)) => {
                let z = c_sub((a, b), (c, d));
                Ok(Complex(z.0, z.1))
            }
            (MatrixReal(l), MatrixReal(r)) => Operation::zip(l, r, |a, b| a - b),
            (MatrixReal(m), Real(x)) => Ok(MatrixReal(m.map(|v| v - x))),
            (MatrixComplex(l), MatrixComplex(r)) => Operation::zip_c(l, r, c_sub),
            (l, r) => Err(Operation::mismatch("-", &l, &r)),
        }
    }

    /// `*` is the matrix product when both operands are matrices.
    pub fn multiply(lhs: Val, rhs: Val) -> Result<Val> {
        use Val::*;
        match (lhs, rhs) {
            (Real(l), Real(r)) => Ok(Real(l * r)),
            (Real(l), Complex(re, im)) | (Complex(re, im), Real(l)) => {
                Ok(Complex(l * re, l * im))
            }
            (Complex(a, b), Complex(c, d)) => {
                let z = c_mul((a, b), (c, d));
                Ok(Complex(z.0, z.1))
            }
            (MatrixReal(m), Real(x)) | (Real(x), MatrixReal(m)) => {
                Ok(MatrixReal(m.map(|v| v * x)))
            }
            (MatrixReal(l), MatrixReal(r)) => Operation::matmul(l, r),
            (MatrixComplex(l), MatrixComplex(r)) => Operation::matmul_c(l, r),
            (l, r) => Err(Operation::mismatch("*", &l, &r)),
        }
    }

    pub fn divide(lhs: Val, rhs: Val) -> Result<Val> {
        use Val::*;
        match (lhs, rhs) {
            (Real(l), Real(r)) => Ok(Real(l / r)),
            (Real(l), Complex(c, d)) => {
                let z = c_div((l, 0.0), (c, d));
                Ok(Complex(z.0, z.1))
            }
            (Complex(a, b), Real(r)) => Ok(Complex(a / r, b / r)),
            (Complex(a, b), Complex(c, d)) => {
                let z = c_div((a, b), (c, d));
                Ok(Complex(z.0, z.1))
            }
            (MatrixReal(m), Real(x)) => Ok(MatrixReal(m.map(|v| v / x))),
            (l, r) => Err(Operation::mismatch("/", &l, &r)),
        }
    }

    pub fn power(lhs: Val, rhs: Val) -> Result<Val> {
        use Val::*;
        match (lhs, rhs) {
            (Real(l), Real(r)) => Ok(Real(l.powf(r))),
            (Complex(a, b), Real(r)) => {
                // de Moivre with a real exponent
                let rho = c_abs((a, b)).powf(r);
                let theta = b.atan2(a) * r;
                Ok(Complex(rho * theta.cos(), rho * theta.sin()))
            }
            (l, r) => Err(Operation::mismatch("^", &l, &r)),
        }
    }

    pub fn dot_multiply(lhs: Val, rhs: Val) -> Result<Val> {
        Operation::elementwise(".*", lhs, rhs, |a, b| a * b)
    }

    pub fn dot_divide(lhs: Val, rhs: Val) -> Result<Val> {
        Operation::elementwise("./", lhs, rhs, |a, b| a / b)
    }

    pub fn dot_power(lhs: Val, rhs: Val) -> Result<Val> {
        Operation::elementwise(".^", lhs, rhs, |a, b| a.powf(b))
    }

    pub fn negate(val: Val) -> Result<Val> {
        use Val::*;
        match val {
            Real(x) => Ok(Real(-x)),
            Complex(re, im) => Ok(Complex(-re, -im)),
            MatrixReal(m) => Ok(MatrixReal(m.map(|v| -v))),
            MatrixComplex(m) => Ok(MatrixComplex(m.map(|z| (-z.0, -z.1)))),
            v => Err(Operation::mismatch_unary("chs", &v)),
        }
    }

    pub fn invert(val: Val) -> Result<Val> {
        use Val::*;
        match val {
            Real(x) => Ok(Real(1.0 / x)),
            Complex(re, im) => {
                let z = c_div((1.0, 0.0), (re, im));
                Ok(Complex(z.0, z.1))
            }
            v => Err(Operation::mismatch_unary("inv", &v)),
        }
    }

    pub fn abs(val: Val) -> Result<Val> {
        use Val::*;
        match val {
            Real(x) => Ok(Real(x.abs())),
            Complex(re, im) => Ok(Real(c_abs((re, im)))),
            MatrixReal(m) => Ok(MatrixReal(m.map(|v| v.abs()))),
            v => Err(Operation::mismatch_unary("abs", &v)),
        }
    }

    /// `x y -- x*y/100`
    pub fn percent(lhs: Val, rhs: Val) -> Result<Val> {
        use Val::*;
        match (lhs, rhs) {
            (Real(l), Real(r)) => Ok(Real(l * r / 100.0)),
            (l, r) => Err(Operation::mismatch("pct", &l, &r)),
        }
    }

    /// `x y -- (y-x)/x*100`
    pub fn percent_change(lhs: Val, rhs: Val) -> Result<Val> {
        use Val::*;
        match (lhs, rhs) {
            (Real(l), Real(r)) => Ok(Real((r - l) / l * 100.0)),
            (l, r) => Err(Operation::mismatch("pctchg", &l, &r)),
        }
    }

    /// Applies a real function to a real scalar, or element-wise over a
    /// real matrix.
    pub fn apply_real(name: &'static str, val: Val, f: fn(f64) -> f64) -> Result<Val> {
        use Val::*;
        match val {
            Real(x) => Ok(Real(f(x))),
            MatrixReal(m) => Ok(MatrixReal(m.map(|v| f(*v)))),
            v => Err(Operation::mismatch_unary(name, &v)),
        }
    }

    pub fn compare(name: &'static str, lhs: Val, rhs: Val) -> Result<Val> {
        use Val::*;
        let (l, r) = match (&lhs, &rhs) {
            (Real(l), Real(r)) => (*l, *r),
            _ => return Err(Operation::mismatch(name, &lhs, &rhs)),
        };
        let truth = match name {
            "eq" => l == r,
            "neq" => l != r,
            "lt" => l < r,
            "gt" => l > r,
            "leq" => l <= r,
            "geq" => l >= r,
            "and" => l != 0.0 && r != 0.0,
            "or" => l != 0.0 || r != 0.0,
            _ => return Err(error!(UnknownWord; name)),
        };
        Ok(Real(if truth { 1.0 } else { 0.0 }))
    }

    pub fn not(val: Val) -> Result<Val> {
        use Val::*;
        match val {
            Real(x) => Ok(Real(if x == 0.0 { 1.0 } else { 0.0 })),
            v => Err(Operation::mismatch_unary("not", &v)),
        }
    }

    pub fn normal_pdf(x: f64) -> f64 {
        (-x * x / 2.0).exp() / (2.0 * std::f64::consts::PI).sqrt()
    }

    pub fn normal_cdf(x: f64) -> f64 {
        0.5 * (1.0 + erf(x / std::f64::consts::SQRT_2))
    }

    fn zip(l: Matrix<f64>, r: Matrix<f64>, f: fn(f64, f64) -> f64) -> Result<Val> {
        if l.rows() != r.rows() || l.cols() != r.cols() {
            return Err(error!(TypeMismatch;
                format!("matrix dimensions differ: {}x{} vs {}x{}",
                    l.rows(), l.cols(), r.rows(), r.cols())));
        }
        let data = l
            .data()
            .iter()
            .zip(r.data().iter())
            .map(|(a, b)| f(*a, *b))
            .collect();
        Ok(Val::MatrixReal(Matrix::new(l.rows(), l.cols(), data)?))
    }

    fn zip_c(
        l: Matrix<(f64, f64)>,
        r: Matrix<(f64, f64)>,
        f: fn((f64, f64), (f64, f64)) -> (f64, f64),
    ) -> Result<Val> {
        if l.rows() != r.rows() || l.cols() != r.cols() {
            return Err(error!(TypeMismatch;
                format!("matrix dimensions differ: {}x{} vs {}x{}",
                    l.rows(), l.cols(), r.rows(), r.cols())));
        }
        let data = l
            .data()
            .iter()
            .zip(r.data().iter())
            .map(|(a, b)| f(*a, *b))
            .collect();
        Ok(Val::MatrixComplex(Matrix::new(l.rows(), l.cols(), data)?))
    }

    fn elementwise(
        name: &'static str,
        lhs: Val,
        rhs: Val,
        f: fn(f64, f64) -> f64,
    ) -> Result<Val> {
        use Val::*;
        match (lhs, rhs) {
            (MatrixReal(l), MatrixReal(r)) => Operation::zip(l, r, f),
            (MatrixReal(m), Real(x)) => Ok(MatrixReal(m.map(|v| f(*v, x)))),
            (Real(x), MatrixReal(m)) => Ok(MatrixReal(m.map(|v| f(x, *v)))),
            (Real(l), Real(r)) => Ok(Real(f(l, r))),
            (l, r) => Err(Operation::mismatch(name, &l, &r)),
        }
    }

    fn matmul(l: Matrix<f64>, r: Matrix<f64>) -> Result<Val> {
        if l.cols() != r.rows() {
            return Err(error!(TypeMismatch;
                format!("cannot multiply {}x{} by {}x{}", l.rows(), l.cols(), r.rows(), r.cols())));
        }
        let mut data = vec![0.0; l.rows() * r.cols()];
        for i in 0..l.rows() {
            for k in 0..l.cols() {
                let a = *l.get(i, k).unwrap();
                for j in 0..r.cols() {
                    data[i * r.cols() + j] += a * r.get(k, j).unwrap();
                }
            }
        }
        Ok(Val::MatrixReal(Matrix::new(l.rows(), r.cols(), data)?))
    }

    fn matmul_c(l: Matrix<(f64, f64)>, r: Matrix<(f64, f64)>) -> Result<Val> {
        if l.cols() != r.rows() {
            return Err(error!(TypeMismatch;
                format!("cannot multiply {}x{} by {}x{}", l.rows(), l.cols(), r.rows(), r.cols())));
        }
        let mut data = vec![(0.0, 0.0); l.rows() * r.cols()];
        for i in 0..l.rows() {
            for k in 0..l.cols() {
                let a = *l.get(i, k).unwrap();
                for j in 0..r.cols() {
                    let p = c_mul(a, *r.get(k, j).unwrap());
                    let acc = &mut data[i * r.cols() + j];
                    *acc = c_add(*acc, p);
                }
            }
        }
        Ok(Val::MatrixComplex(Matrix::new(l.rows(), r.cols(), data)?))
    }

    fn mismatch(name: &str, lhs: &Val, rhs: &Val) -> Error {
        error!(TypeMismatch;
            format!("'{}' cannot combine a {} and a {}", name, lhs.kind_name(), rhs.kind_name()))
    }

    fn mismatch_unary(name: &str, val: &Val) -> Error {
        error!(TypeMismatch; format!("'{}' cannot take a {}", name, val.kind_name()))
    }
}

/// Abramowitz & Stegun 7.1.26, good to ~1.5e-7.
fn erf(x: f64) -> f64 {
    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();
    let t = 1.0 / (1.0 + 0.3275911 * x);
    let y = 1.0
        - (((((1.061405429 * t - 1.453152027) * t) + 1.421413741) * t - 0.284496736) * t
            + 0.254829592)
            * t
            * (-x * x).exp();
    sign * y
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_arithmetic() {
        assert_eq!(
            Operation::add(Val::Real(3.0), Val::Real(4.0)).unwrap(),
            Val::Real(7.0)
        );
        assert_eq!(
            Operation::multiply(Val::Complex(0.0, 1.0), Val::Complex(0.0, 1.0)).unwrap(),
            Val::Complex(-1.0, 0.0)
        );
    }

    #[test]
    fn test_matmul() {
        let a = Matrix::new(2, 2, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let b = Matrix::new(2, 1, vec![1.0, 1.0]).unwrap();
        let v = Operation::multiply(Val::MatrixReal(a), Val::MatrixReal(b)).unwrap();
        assert_eq!(
            v,
            Val::MatrixReal(Matrix::new(2, 1, vec![3.0, 7.0]).unwrap())
        );
    }

    #[test]
    fn test_elementwise_needs_matching_dims() {
        let a = Matrix::new(2, 2, vec![1.0; 4]).unwrap();
        let b = Matrix::new(1, 2, vec![1.0; 2]).unwrap();
        assert!(
            Operation::dot_multiply(Val::MatrixReal(a), Val::MatrixReal(b)).is_err()
        );
    }

    #[test]
    fn test_type_mismatch() {
        let e = Operation::add(Val::Real(1.0), Val::Str("x".to_string())).unwrap_err();
        assert_eq!(e.code(), crate::lang::ErrorCode::TypeMismatch);
    }

    #[test]
    fn test_normal_cdf() {
        assert!((Operation::normal_cdf(0.0) - 0.5).abs() < 1e-9);
        assert!((Operation::normal_cdf(1.96) - 0.975).abs() < 1e-3);
    }
}
