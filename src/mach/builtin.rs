use super::machine::{self, MAX_COUNTERS};
use super::math::Operation;
use super::stackfile::{load_stack_from_file, save_stack_to_file, MAX_MATRIX_DIM};
use super::strings;
use super::{Interp, Matrix, Val, MAX_REG, STACK_SIZE};
use crate::error;
use crate::lang::{Error, ErrorCode, BUILTIN_NAMES};

type Result<T> = std::result::Result<T, Error>;

/// One dispatch table entry. `effect` is the stack picture shown by
/// `help`, in the usual `before -- after` notation.
pub struct BuiltinDef {
    pub name: &'static str,
    pub effect: &'static str,
    pub help: &'static str,
    pub exec: fn(&mut Interp) -> Result<()>,
}

/// The table is scanned linearly; it is small enough that a map buys
/// nothing, and a plain slice keeps the entries greppable.
pub fn lookup(name: &str) -> Option<&'static BuiltinDef> {
    BUILTINS.iter().find(|def| def.name == name)
}

// ---------------------------------------------------------------------
// helpers

/// Pop one value, apply, push the result. The operand goes back if the
/// operation fails.
fn unary(interp: &mut Interp, f: fn(Val) -> Result<Val>) -> Result<()> {
    let val = interp.stack.pop()?;
    match f(val.clone()) {
        Ok(v) => interp.stack.push(v),
        Err(e) => {
            interp.stack.push(val)?;
            Err(e)
        }
    }
}

/// Pop two values, apply, push the result. Both operands go back in
/// order if the operation fails.
fn binary(interp: &mut Interp, f: fn(Val, Val) -> Result<Val>) -> Result<()> {
    let (one, two) = interp.stack.pop2()?;
    match f(one.clone(), two.clone()) {
        Ok(v) => interp.stack.push(v),
        Err(e) => {
            interp.stack.push(one)?;
            interp.stack.push(two)?;
            Err(e)
        }
    }
}

fn pop_real(interp: &mut Interp) -> Result<f64> {
    let x = interp.stack.peek_real(0)?;
    interp.stack.pop()?;
    Ok(x)
}

fn peek_str(interp: &Interp, depth: usize) -> Result<&str> {
    match interp.stack.peek(depth) {
        None => Err(error!(StackUnderflow)),
        Some(Val::Str(s)) => Ok(s),
        Some(v) => Err(error!(TypeMismatch; format!("need a string, have a {}", v.kind_name()))),
    }
}

fn pop_str(interp: &mut Interp) -> Result<String> {
    peek_str(interp, 0)?;
    match interp.stack.pop()? {
        Val::Str(s) => Ok(s),
        _ => unreachable!(),
    }
}

fn push_real(interp: &mut Interp, x: f64) -> Result<()> {
    interp.stack.push(Val::Real(x))
}

/// A whole number in `0..limit`.
fn index_arg(x: f64, limit: usize, what: &str) -> Result<usize> {
    if x.fract() != 0.0 || x < 0.0 || (x as usize) >= limit {
        return Err(error!(TypeMismatch; format!("bad {} index {}", what, x)));
    }
    Ok(x as usize)
}

/// A whole number usable as a matrix dimension.
fn dim_arg(x: f64) -> Result<usize> {
    if x.fract() != 0.0 || x < 1.0 || (x as usize) > MAX_MATRIX_DIM {
        return Err(error!(TypeMismatch; format!("bad matrix dimension {}", x)));
    }
    Ok(x as usize)
}

/// 1-based element coordinates against a matrix shape.
fn matrix_index(i: f64, j: f64, rows: usize, cols: usize) -> Result<(usize, usize)> {
    if i.fract() != 0.0 || j.fract() != 0.0 || i < 1.0 || j < 1.0 {
        return Err(error!(TypeMismatch; "element indices are 1-based whole numbers"));
    }
    let (r, c) = (i as usize - 1, j as usize - 1);
    if r >= rows || c >= cols {
        return Err(error!(TypeMismatch;
            format!("element ({},{}) outside a {}x{} matrix", i, j, rows, cols)));
    }
    Ok((r, c))
}

// ---------------------------------------------------------------------
// stack manipulation

fn w_drop(interp: &mut Interp) -> Result<()> {
    interp.stack.pop()?;
    Ok(())
}

fn w_dup(interp: &mut Interp) -> Result<()> {
    let v = match interp.stack.peek(0) {
        Some(v) => v.clone(),
        None => return Err(error!(StackUnderflow)),
    };
    interp.stack.push(v)
}

fn w_swap(interp: &mut Interp) -> Result<()> {
    let (one, two) = interp.stack.pop2()?;
    interp.stack.push(two)?;
    interp.stack.push(one)
}

fn w_over(interp: &mut Interp) -> Result<()> {
    let v = match interp.stack.peek(1) {
        Some(v) => v.clone(),
        None => return Err(error!(StackUnderflow)),
    };
    interp.stack.push(v)
}

fn w_nip(interp: &mut Interp) -> Result<()> {
    interp.stack.require(2)?;
    interp.stack.remove(1)?;
    Ok(())
}

fn w_tuck(interp: &mut Interp) -> Result<()> {
    interp.stack.require(2)?;
    let v = match interp.stack.peek(0) {
        Some(v) => v.clone(),
        None => return Err(error!(StackUnderflow)),
    };
    interp.stack.insert(2, v)
}

fn w_roll(interp: &mut Interp) -> Result<()> {
    let n = interp.stack.peek_real(0)?;
    if n.fract() != 0.0 || n < 0.0 {
        return Err(error!(TypeMismatch; "roll needs a whole number depth"));
    }
    let n = n as usize;
    interp.stack.require(n + 2)?;
    interp.stack.pop()?;
    let v = interp.stack.remove(n)?;
    interp.stack.push(v)
}

fn w_clst(interp: &mut Interp) -> Result<()> {
    interp.stack.clear();
    Ok(())
}

fn w_depth(interp: &mut Interp) -> Result<()> {
    let d = interp.stack.len();
    push_real(interp, d as f64)
}

// ---------------------------------------------------------------------
// arithmetic

fn w_add(interp: &mut Interp) -> Result<()> {
    binary(interp, Operation::add)
}

fn w_sub(interp: &mut Interp) -> Result<()> {
    binary(interp, Operation::subtract)
}

fn w_mul(interp: &mut Interp) -> Result<()> {
    binary(interp, Operation::multiply)
}

fn w_div(interp: &mut Interp) -> Result<()> {
    binary(interp, Operation::divide)
}

fn w_pow(interp: &mut Interp) -> Result<()> {
    binary(interp, Operation::power)
}

fn w_dot_mul(interp: &mut Interp) -> Result<()> {
    binary(interp, Operation::dot_multiply)
}

fn w_dot_div(interp: &mut Interp) -> Result<()> {
    binary(interp, Operation::dot_divide)
}

fn w_dot_pow(interp: &mut Interp) -> Result<()> {
    binary(interp, Operation::dot_power)
}

fn w_chs(interp: &mut Interp) -> Result<()> {
    unary(interp, Operation::negate)
}

fn w_inv(interp: &mut Interp) -> Result<()> {
    unary(interp, Operation::invert)
}

fn w_pct(interp: &mut Interp) -> Result<()> {
    binary(interp, Operation::percent)
}

fn w_pctchg(interp: &mut Interp) -> Result<()> {
    binary(interp, Operation::percent_change)
}

// ---------------------------------------------------------------------
// transcendentals

fn w_ln(interp: &mut Interp) -> Result<()> {
    unary(interp, |v| Operation::apply_real("ln", v, f64::ln))
}

fn w_log(interp: &mut Interp) -> Result<()> {
    unary(interp, |v| Operation::apply_real("log", v, f64::log10))
}

fn w_exp(interp: &mut Interp) -> Result<()> {
    unary(interp, |v| Operation::apply_real("exp", v, f64::exp))
}

fn sqrt_val(val: Val) -> Result<Val> {
    use Val::*;
    match val {
        Real(x) if x >= 0.0 => Ok(Real(x.sqrt())),
        // negative reals take the principal complex root
        Real(x) => Ok(Complex(0.0, (-x).sqrt())),
        Complex(re, im) => {
            let rho = re.hypot(im).sqrt();
            let theta = im.atan2(re) / 2.0;
            Ok(Complex(rho * theta.cos(), rho * theta.sin()))
        }
        MatrixReal(m) => Ok(MatrixReal(m.map(|v| v.sqrt()))),
        v => Err(error!(TypeMismatch; format!("'sqrt' cannot take a {}", v.kind_name()))),
    }
}

fn w_sqrt(interp: &mut Interp) -> Result<()> {
    unary(interp, sqrt_val)
}

fn w_abs(interp: &mut Interp) -> Result<()> {
    unary(interp, Operation::abs)
}

fn w_sin(interp: &mut Interp) -> Result<()> {
    unary(interp, |v| Operation::apply_real("sin", v, f64::sin))
}

fn w_cos(interp: &mut Interp) -> Result<()> {
    unary(interp, |v| Operation::apply_real("cos", v, f64::cos))
}

fn w_tan(interp: &mut Interp) -> Result<()> {
    unary(interp, |v| Operation::apply_real("tan", v, f64::tan))
}

fn w_asin(interp: &mut Interp) -> Result<()> {
    unary(interp, |v| Operation::apply_real("asin", v, f64::asin))
}

fn w_acos(interp: &mut Interp) -> Result<()> {
    unary(interp, |v| Operation::apply_real("acos", v, f64::acos))
}

fn w_atan(interp: &mut Interp) -> Result<()> {
    unary(interp, |v| Operation::apply_real("atan", v, f64::atan))
}

fn w_sinh(interp: &mut Interp) -> Result<()> {
    unary(interp, |v| Operation::apply_real("sinh", v, f64::sinh))
}

fn w_cosh(interp: &mut Interp) -> Result<()> {
    unary(interp, |v| Operation::apply_real("cosh", v, f64::cosh))
}

fn w_tanh(interp: &mut Interp) -> Result<()> {
    unary(interp, |v| Operation::apply_real("tanh", v, f64::tanh))
}

fn w_asinh(interp: &mut Interp) -> Result<()> {
    unary(interp, |v| Operation::apply_real("asinh", v, f64::asinh))
}

fn w_acosh(interp: &mut Interp) -> Result<()> {
    unary(interp, |v| Operation::apply_real("acosh", v, f64::acosh))
}

fn w_atanh(interp: &mut Interp) -> Result<()> {
    unary(interp, |v| Operation::apply_real("atanh", v, f64::atanh))
}

fn w_npdf(interp: &mut Interp) -> Result<()> {
    unary(interp, |v| Operation::apply_real("npdf", v, Operation::normal_pdf))
}

fn w_ncdf(interp: &mut Interp) -> Result<()> {
    unary(interp, |v| Operation::apply_real("ncdf", v, Operation::normal_cdf))
}

// ---------------------------------------------------------------------
// comparison and logic

fn w_eq(interp: &mut Interp) -> Result<()> {
    binary(interp, |l, r| Operation::compare("eq", l, r))
}

fn w_neq(interp: &mut Interp) -> Result<()> {
    binary(interp, |l, r| Operation::compare("neq", l, r))
}

fn w_lt(interp: &mut Interp) -> Result<()> {
    binary(interp, |l, r| Operation::compare("lt", l, r))
}

fn w_gt(interp: &mut Interp) -> Result<()> {
    binary(interp, |l, r| Operation::compare("gt", l, r))
}

fn w_leq(interp: &mut Interp) -> Result<()> {
    binary(interp, |l, r| Operation::compare("leq", l, r))
}

fn w_geq(interp: &mut Interp) -> Result<()> {
    binary(interp, |l, r| Operation::compare("geq", l, r))
}

fn w_and(interp: &mut Interp) -> Result<()> {
    binary(interp, |l, r| Operation::compare("and", l, r))
}

fn w_or(interp: &mut Interp) -> Result<()> {
    binary(interp, |l, r| Operation::compare("or", l, r))
}

fn w_not(interp: &mut Interp) -> Result<()> {
    unary(interp, Operation::not)
}

// ---------------------------------------------------------------------
// complex numbers

fn w_re(interp: &mut Interp) -> Result<()> {
    unary(interp, |v| match v {
        Val::Real(x) => Ok(Val::Real(x)),
        Val::Complex(re, _) => Ok(Val::Real(re)),
        v => Err(error!(TypeMismatch; format!("'re' cannot take a {}", v.kind_name()))),
    })
}

fn w_im(interp: &mut Interp) -> Result<()> {
    unary(interp, |v| match v {
        Val::Real(_) => Ok(Val::Real(0.0)),
        Val::Complex(_, im) => Ok(Val::Real(im)),
        v => Err(error!(TypeMismatch; format!("'im' cannot take a {}", v.kind_name()))),
    })
}

fn w_arg(interp: &mut Interp) -> Result<()> {
    unary(interp, |v| match v {
        Val::Real(x) => Ok(Val::Real(0.0_f64.atan2(x))),
        Val::Complex(re, im) => Ok(Val::Real(im.atan2(re))),
        v => Err(error!(TypeMismatch; format!("'arg' cannot take a {}", v.kind_name()))),
    })
}

fn w_conj(interp: &mut Interp) -> Result<()> {
    unary(interp, |v| match v {
        Val::Real(x) => Ok(Val::Real(x)),
        Val::Complex(re, im) => Ok(Val::Complex(re, -im)),
        Val::MatrixComplex(m) => Ok(Val::MatrixComplex(m.map(|z| (z.0, -z.1)))),
        v => Err(error!(TypeMismatch; format!("'conj' cannot take a {}", v.kind_name()))),
    })
}

fn w_j2r(interp: &mut Interp) -> Result<()> {
    let re = interp.stack.peek_real(0)?;
    let im = interp.stack.peek_real(1)?;
    interp.stack.pop2()?;
    interp.stack.push(Val::Complex(re, im))
}

fn w_re2c(interp: &mut Interp) -> Result<()> {
    unary(interp, |v| match v {
        Val::Real(x) => Ok(Val::Complex(x, 0.0)),
        v => Err(error!(TypeMismatch; format!("'re2c' cannot take a {}", v.kind_name()))),
    })
}

fn w_split_c(interp: &mut Interp) -> Result<()> {
    let (re, im) = match interp.stack.peek(0) {
        None => return Err(error!(StackUnderflow)),
        Some(Val::Complex(re, im)) => (*re, *im),
        Some(v) => {
            return Err(error!(TypeMismatch;
                format!("'split_c' cannot take a {}", v.kind_name())))
        }
    };
    // the net effect grows the stack by one
    if interp.stack.len() >= STACK_SIZE {
        return Err(error!(StackOverflow));
    }
    interp.stack.pop()?;
    interp.stack.push(Val::Real(re))?;
    interp.stack.push(Val::Real(im))
}

// ---------------------------------------------------------------------
// constants and random

fn w_pi(interp: &mut Interp) -> Result<()> {
    push_real(interp, std::f64::consts::PI)
}

fn w_e(interp: &mut Interp) -> Result<()> {
    push_real(interp, std::f64::consts::E)
}

fn w_gravity(interp: &mut Interp) -> Result<()> {
    push_real(interp, 9.80665)
}

fn w_inf(interp: &mut Interp) -> Result<()> {
    push_real(interp, f64::INFINITY)
}

fn w_nan(interp: &mut Interp) -> Result<()> {
    push_real(interp, f64::NAN)
}

fn w_rand(interp: &mut Interp) -> Result<()> {
    push_real(interp, rand::random::<f64>())
}

// ---------------------------------------------------------------------
// matrices

fn w_eye(interp: &mut Interp) -> Result<()> {
    let n = dim_arg(interp.stack.peek_real(0)?)?;
    let mut m = Matrix::fill(n, n, 0.0)?;
    for i in 0..n {
        m.set(i, i, 1.0);
    }
    interp.stack.pop()?;
    interp.stack.push(Val::MatrixReal(m))
}

fn w_ones(interp: &mut Interp) -> Result<()> {
    let cols = dim_arg(interp.stack.peek_real(0)?)?;
    let rows = dim_arg(interp.stack.peek_real(1)?)?;
    let m = Matrix::fill(rows, cols, 1.0)?;
    interp.stack.pop2()?;
    interp.stack.push(Val::MatrixReal(m))
}

fn w_tran(interp: &mut Interp) -> Result<()> {
    unary(interp, |v| match v {
        Val::MatrixReal(m) => Ok(Val::MatrixReal(m.transpose())),
        Val::MatrixComplex(m) => Ok(Val::MatrixComplex(m.transpose())),
        v => Err(error!(TypeMismatch; format!("'tran' cannot take a {}", v.kind_name()))),
    })
}

fn w_get_aij(interp: &mut Interp) -> Result<()> {
    let j = interp.stack.peek_real(0)?;
    let i = interp.stack.peek_real(1)?;
    let elem = match interp.stack.peek(2) {
        None => return Err(error!(StackUnderflow)),
        Some(Val::MatrixReal(m)) => {
            let (r, c) = matrix_index(i, j, m.rows(), m.cols())?;
            Val::Real(*m.get(r, c).ok_or_else(|| error!(TypeMismatch; "index out of range"))?)
        }
        Some(Val::MatrixComplex(m)) => {
            let (r, c) = matrix_index(i, j, m.rows(), m.cols())?;
            let (re, im) =
                *m.get(r, c).ok_or_else(|| error!(TypeMismatch; "index out of range"))?;
            Val::Complex(re, im)
        }
        Some(v) => {
            return Err(error!(TypeMismatch;
                format!("'get_aij' needs a matrix, have a {}", v.kind_name())))
        }
    };
    interp.stack.pop2()?;
    interp.stack.pop()?;
    interp.stack.push(elem)
}

fn w_set_aij(interp: &mut Interp) -> Result<()> {
    interp.stack.require(4)?;
    let x = match interp.stack.peek(0) {
        Some(v) => v.clone(),
        None => return Err(error!(StackUnderflow)),
    };
    let j = interp.stack.peek_real(1)?;
    let i = interp.stack.peek_real(2)?;
    let updated = match (interp.stack.peek(3), &x) {
        (Some(Val::MatrixReal(m)), Val::Real(x)) => {
            let (r, c) = matrix_index(i, j, m.rows(), m.cols())?;
            let mut m = m.clone();
            m.set(r, c, *x);
            Val::MatrixReal(m)
        }
        (Some(Val::MatrixComplex(m)), Val::Real(x)) => {
            let (r, c) = matrix_index(i, j, m.rows(), m.cols())?;
            let mut m = m.clone();
            m.set(r, c, (*x, 0.0));
            Val::MatrixComplex(m)
        }
        (Some(Val::MatrixComplex(m)), Val::Complex(re, im)) => {
            let (r, c) = matrix_index(i, j, m.rows(), m.cols())?;
            let mut m = m.clone();
            m.set(r, c, (*re, *im));
            Val::MatrixComplex(m)
        }
        (Some(m), x) => {
            return Err(error!(TypeMismatch;
                format!("'set_aij' cannot put a {} into a {}", x.kind_name(), m.kind_name())))
        }
        (None, _) => return Err(error!(StackUnderflow)),
    };
    interp.stack.pop2()?;
    interp.stack.pop2()?;
    interp.stack.push(updated)
}

fn w_pm(interp: &mut Interp) -> Result<()> {
    match interp.stack.peek(0) {
        None => return Err(error!(StackUnderflow)),
        Some(v @ Val::MatrixReal(_)) | Some(v @ Val::MatrixComplex(_)) => {
            print!("{}", v.render_full(interp.precision, interp.fixed_point));
        }
        Some(v) => {
            return Err(error!(TypeMismatch;
                format!("'pm' needs a matrix, have a {}", v.kind_name())))
        }
    }
    interp.suppress_print = true;
    Ok(())
}

// ---------------------------------------------------------------------
// registers

fn w_sto(interp: &mut Interp) -> Result<()> {
    let n = index_arg(interp.stack.peek_real(0)?, MAX_REG, "register")?;
    let (value, _) = interp.stack.pop2()?;
    interp.reg_store(n, value)
}

fn w_rcl(interp: &mut Interp) -> Result<()> {
    let n = index_arg(interp.stack.peek_real(0)?, MAX_REG, "register")?;
    let value = interp.reg_recall(n)?;
    interp.stack.pop()?;
    interp.stack.push(value)
}

fn w_pr(interp: &mut Interp) -> Result<()> {
    let n = index_arg(interp.stack.peek_real(0)?, MAX_REG, "register")?;
    interp.stack.pop()?;
    match interp.reg_get(n) {
        Some(v) => println!("R{:02}: {}", n, v.render(interp.precision, interp.fixed_point)),
        None => println!("R{:02}: empty", n),
    }
    interp.suppress_print = true;
    Ok(())
}

fn w_ffr(interp: &mut Interp) -> Result<()> {
    let n = match interp.first_free_register() {
        Some(n) => n as f64,
        None => -1.0,
    };
    push_real(interp, n)
}

// ---------------------------------------------------------------------
// condition counters

fn counter_arg(x: f64) -> Result<usize> {
    index_arg(x, MAX_COUNTERS, "counter")
}

fn counter_value(x: f64) -> Result<i64> {
    if x.fract() != 0.0 {
        return Err(error!(TypeMismatch; "counters hold whole numbers"));
    }
    Ok(x as i64)
}

fn w_ctr_set(interp: &mut Interp) -> Result<()> {
    let i = counter_arg(interp.stack.peek_real(0)?)?;
    let n = counter_value(interp.stack.peek_real(1)?)?;
    interp.stack.pop2()?;
    interp.counters[i] = n;
    Ok(())
}

fn w_ctr_add(interp: &mut Interp) -> Result<()> {
    let i = counter_arg(interp.stack.peek_real(0)?)?;
    let n = counter_value(interp.stack.peek_real(1)?)?;
    interp.stack.pop2()?;
    interp.counters[i] += n;
    Ok(())
}

fn w_ctr_incr(interp: &mut Interp) -> Result<()> {
    let i = counter_arg(interp.stack.peek_real(0)?)?;
    interp.stack.pop()?;
    interp.counters[i] += 1;
    Ok(())
}

fn w_ctr_decr(interp: &mut Interp) -> Result<()> {
    let i = counter_arg(interp.stack.peek_real(0)?)?;
    interp.stack.pop()?;
    interp.counters[i] -= 1;
    Ok(())
}

fn w_ctr_clr(interp: &mut Interp) -> Result<()> {
    let i = counter_arg(interp.stack.peek_real(0)?)?;
    interp.stack.pop()?;
    interp.counters[i] = 0;
    Ok(())
}

fn w_ctr_clall(interp: &mut Interp) -> Result<()> {
    interp.counters = [0; MAX_COUNTERS];
    Ok(())
}

// ---------------------------------------------------------------------
// strings

fn w_scon(interp: &mut Interp) -> Result<()> {
    peek_str(interp, 0)?;
    peek_str(interp, 1)?;
    let (one, two) = interp.stack.pop2()?;
    match (one, two) {
        (Val::Str(mut a), Val::Str(b)) => {
            a.push_str(&b);
            interp.stack.push(Val::Str(a))
        }
        _ => unreachable!(),
    }
}

fn w_substr(interp: &mut Interp) -> Result<()> {
    let len = interp.stack.peek_real(0)?;
    let start = interp.stack.peek_real(1)?;
    let sub = strings::substring(peek_str(interp, 2)?, start, len)?;
    interp.stack.pop2()?;
    interp.stack.pop()?;
    interp.stack.push(Val::Str(sub))
}

fn w_s2u(interp: &mut Interp) -> Result<()> {
    let s = peek_str(interp, 0)?.to_uppercase();
    interp.stack.pop()?;
    interp.stack.push(Val::Str(s))
}

fn w_s2l(interp: &mut Interp) -> Result<()> {
    let s = peek_str(interp, 0)?.to_lowercase();
    interp.stack.pop()?;
    interp.stack.push(Val::Str(s))
}

fn w_slen(interp: &mut Interp) -> Result<()> {
    let n = peek_str(interp, 0)?.chars().count();
    interp.stack.pop()?;
    push_real(interp, n as f64)
}

fn w_srev(interp: &mut Interp) -> Result<()> {
    let s = strings::reverse(peek_str(interp, 0)?);
    interp.stack.pop()?;
    interp.stack.push(Val::Str(s))
}

fn w_int2str(interp: &mut Interp) -> Result<()> {
    let x = pop_real(interp)?;
    interp.stack.push(Val::Str(strings::int_to_string(x)))
}

fn w_eval(interp: &mut Interp) -> Result<()> {
    let text = pop_str(interp)?;
    interp.eval_nested(&text)
}

// ---------------------------------------------------------------------
// dates

fn w_today(interp: &mut Interp) -> Result<()> {
    interp.stack.push(Val::Str(strings::today()))
}

fn w_dateplus(interp: &mut Interp) -> Result<()> {
    let days = interp.stack.peek_real(0)?;
    let shifted = strings::date_plus(peek_str(interp, 1)?, days)?;
    interp.stack.pop2()?;
    interp.stack.push(Val::Str(shifted))
}

fn w_ddays(interp: &mut Interp) -> Result<()> {
    let to = peek_str(interp, 0)?;
    let from = peek_str(interp, 1)?;
    let days = strings::days_between(from, to)?;
    interp.stack.pop2()?;
    push_real(interp, days)
}

fn w_dow(interp: &mut Interp) -> Result<()> {
    let name = strings::day_of_week(peek_str(interp, 0)?)?;
    interp.stack.pop()?;
    interp.stack.push(Val::Str(name))
}

// ---------------------------------------------------------------------
// display control

fn w_setprec(interp: &mut Interp) -> Result<()> {
    let n = index_arg(interp.stack.peek_real(0)?, 18, "precision")?;
    interp.stack.pop()?;
    interp.precision = n;
    Ok(())
}

fn w_sfs(interp: &mut Interp) -> Result<()> {
    interp.fixed_point = !interp.fixed_point;
    Ok(())
}

// ---------------------------------------------------------------------
// stack persistence

fn w_savestack(interp: &mut Interp) -> Result<()> {
    let name = pop_str(interp)?;
    match save_stack_to_file(&interp.stack, &name) {
        Ok(()) => Ok(()),
        Err(e) => {
            interp.stack.push(Val::Str(name))?;
            Err(e)
        }
    }
}

fn w_loadstack(interp: &mut Interp) -> Result<()> {
    let name = pop_str(interp)?;
    load_stack_from_file(&mut interp.stack, &name)
}

// ---------------------------------------------------------------------
// stored programs

fn w_loadprog(interp: &mut Interp) -> Result<()> {
    let name = pop_str(interp)?;
    match machine::load_program_from_file(&name) {
        Ok(prog) => {
            interp.program = Some(prog);
            Ok(())
        }
        Err(e) => {
            interp.stack.push(Val::Str(name))?;
            Err(e)
        }
    }
}

fn w_listprog(interp: &mut Interp) -> Result<()> {
    match &interp.program {
        Some(prog) => print!("{}", prog.listing()),
        None => println!("no program loaded"),
    }
    interp.suppress_print = true;
    Ok(())
}

fn w_runprog(interp: &mut Interp) -> Result<()> {
    match interp.program.take() {
        Some(prog) => {
            let result = prog.run(interp);
            interp.program = Some(prog);
            result
        }
        None => Err(error!(ProgramLoadError; "no program loaded")),
    }
}

fn w_batch(interp: &mut Interp) -> Result<()> {
    let name = pop_str(interp)?;
    let text = match std::fs::read_to_string(&name) {
        Ok(text) => text,
        Err(e) => {
            interp.stack.push(Val::Str(name))?;
            return Err(e.into());
        }
    };
    println!("Running batch: {}", name);
    for line in text.lines() {
        if let Err(e) = interp.evaluate_line(line) {
            // a batch keeps going past bad lines, but not past Ctrl-C
            if e.code() == ErrorCode::Interrupted {
                return Err(e);
            }
            eprintln!("{}", e);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------
// help

fn w_help(interp: &mut Interp) -> Result<()> {
    if let Some(Val::Str(_)) = interp.stack.peek(0) {
        let name = pop_str(interp)?;
        match lookup(&name) {
            Some(def) => {
                println!("{:<10} {}", def.name, def.effect);
                println!("    {}", def.help);
            }
            None => println!("no help for '{}'", name),
        }
    } else {
        println!("MM-15 word groups:");
        println!("  stack      drop, dup, swap, over, nip, tuck, roll, clst, depth");
        println!("  arithmetic + - * / ^ .* ./ .^ pow, chs, inv, pct, pctchg");
        println!("  functions  ln, log, exp, sqrt, abs, trig/hyperbolic, npdf, ncdf");
        println!("  logic      eq, neq, lt, gt, leq, geq, and, or, not");
        println!("  complex    re, im, arg, conj, j2r, re2c, split_c");
        println!("  constants  pi, e, gravity, inf, nan, rand");
        println!("  matrices   eye, ones, tran, ', get_aij, set_aij, pm");
        println!("  registers  sto, rcl, pr, ffr");
        println!("  counters   ctr_set, ctr_add, ctr_incr, ctr_decr, ctr_clr, ctr_clall");
        println!("  strings    scon, substr, s2u, s2l, slen, srev, int2str, eval");
        println!("  dates      today, dateplus, ddays, dow");
        println!("  display    setprec, sfs");
        println!("  files      savestack, loadstack, loadprog, listprog, runprog, batch");
        println!("  words      : name body ;  defines, listwords lists");
        println!("\"name\" help shows one word in detail.");
    }
    interp.suppress_print = true;
    Ok(())
}

fn w_listfcns(interp: &mut Interp) -> Result<()> {
    for chunk in BUILTIN_NAMES.chunks(8) {
        let row: Vec<String> = chunk.iter().map(|n| format!("{:<9}", n)).collect();
        println!("{}", row.join(" "));
    }
    interp.suppress_print = true;
    Ok(())
}

fn w_listwords(interp: &mut Interp) -> Result<()> {
    if interp.words.is_empty() {
        println!("no user words defined");
    } else {
        let mut names: Vec<&String> = interp.words.keys().collect();
        names.sort();
        for name in names {
            println!(": {} {} ;", name, interp.words[name]);
        }
    }
    interp.suppress_print = true;
    Ok(())
}

// ---------------------------------------------------------------------

pub static BUILTINS: &[BuiltinDef] = &[
    // stack manipulation
    BuiltinDef { name: "drop", effect: "x --", help: "Drop the top stack element.", exec: w_drop },
    BuiltinDef { name: "dup", effect: "x -- x x", help: "Duplicate top of stack.", exec: w_dup },
    BuiltinDef { name: "swap", effect: "a b -- b a", help: "Swap top two elements.", exec: w_swap },
    BuiltinDef { name: "over", effect: "a b -- a b a", help: "Copy second item to top.", exec: w_over },
    BuiltinDef { name: "nip", effect: "a b -- b", help: "Drop second-from-top element.", exec: w_nip },
    BuiltinDef { name: "tuck", effect: "a b -- b a b", help: "Duplicate top and tuck it below the second item.", exec: w_tuck },
    BuiltinDef { name: "roll", effect: "... x_n ... x_0 n -- ... x_0 x_n ... x_1", help: "Roll the nth item (0 = top) to the top.", exec: w_roll },
    BuiltinDef { name: "clst", effect: "--", help: "Clear the entire stack.", exec: w_clst },
    BuiltinDef { name: "depth", effect: "-- n", help: "Push the number of stack elements.", exec: w_depth },
    // arithmetic
    BuiltinDef { name: "+", effect: "a b -- a+b", help: "Add. Matrices add element-wise.", exec: w_add },
    BuiltinDef { name: "-", effect: "a b -- a-b", help: "Subtract. Matrices subtract element-wise.", exec: w_sub },
    BuiltinDef { name: "*", effect: "a b -- a*b", help: "Multiply. Two matrices form the matrix product.", exec: w_mul },
    BuiltinDef { name: "/", effect: "a b -- a/b", help: "Divide.", exec: w_div },
    BuiltinDef { name: "^", effect: "x y -- x^y", help: "Raise x to the power y.", exec: w_pow },
    BuiltinDef { name: "pow", effect: "x y -- x^y", help: "Raise x to the power y.", exec: w_pow },
    BuiltinDef { name: ".*", effect: "A B -- C", help: "Element-wise (Hadamard) product.", exec: w_dot_mul },
    BuiltinDef { name: "./", effect: "A B -- C", help: "Element-wise division.", exec: w_dot_div },
    BuiltinDef { name: ".^", effect: "A B -- C", help: "Element-wise exponentiation.", exec: w_dot_pow },
    BuiltinDef { name: "chs", effect: "x -- -x", help: "Change sign.", exec: w_chs },
    BuiltinDef { name: "inv", effect: "x -- 1/x", help: "Multiplicative inverse.", exec: w_inv },
    BuiltinDef { name: "pct", effect: "x y -- x*y/100", help: "y percent of x.", exec: w_pct },
    BuiltinDef { name: "pctchg", effect: "x y -- (y-x)/x*100", help: "Percent change from x to y.", exec: w_pctchg },
    // transcendentals
    BuiltinDef { name: "ln", effect: "x -- ln(x)", help: "Natural logarithm.", exec: w_ln },
    BuiltinDef { name: "log", effect: "x -- log10(x)", help: "Base-10 logarithm.", exec: w_log },
    BuiltinDef { name: "exp", effect: "x -- e^x", help: "Exponential function.", exec: w_exp },
    BuiltinDef { name: "sqrt", effect: "x -- sqrt(x)", help: "Square root; negative reals give a complex root.", exec: w_sqrt },
    BuiltinDef { name: "abs", effect: "z -- |z|", help: "Absolute value (magnitude for complex).", exec: w_abs },
    BuiltinDef { name: "sin", effect: "x -- sin(x)", help: "Sine (radians).", exec: w_sin },
    BuiltinDef { name: "cos", effect: "x -- cos(x)", help: "Cosine (radians).", exec: w_cos },
    BuiltinDef { name: "tan", effect: "x -- tan(x)", help: "Tangent (radians).", exec: w_tan },
    BuiltinDef { name: "asin", effect: "x -- asin(x)", help: "Inverse sine.", exec: w_asin },
    BuiltinDef { name: "acos", effect: "x -- acos(x)", help: "Inverse cosine.", exec: w_acos },
    BuiltinDef { name: "atan", effect: "x -- atan(x)", help: "Inverse tangent.", exec: w_atan },
    BuiltinDef { name: "sinh", effect: "x -- sinh(x)", help: "Hyperbolic sine.", exec: w_sinh },
    BuiltinDef { name: "cosh", effect: "x -- cosh(x)", help: "Hyperbolic cosine.", exec: w_cosh },
    BuiltinDef { name: "tanh", effect: "x -- tanh(x)", help: "Hyperbolic tangent.", exec: w_tanh },
    BuiltinDef { name: "asinh", effect: "x -- asinh(x)", help: "Inverse hyperbolic sine.", exec: w_asinh },
    BuiltinDef { name: "acosh", effect: "x -- acosh(x)", help: "Inverse hyperbolic cosine.", exec: w_acosh },
    BuiltinDef { name: "atanh", effect: "x -- atanh(x)", help: "Inverse hyperbolic tangent.", exec: w_atanh },
    BuiltinDef { name: "npdf", effect: "x -- phi(x)", help: "Standard normal PDF.", exec: w_npdf },
    BuiltinDef { name: "ncdf", effect: "x -- Phi(x)", help: "Standard normal CDF.", exec: w_ncdf },
    // comparison and logic
    BuiltinDef { name: "eq", effect: "a b -- a==b", help: "1 if equal, else 0.", exec: w_eq },
    BuiltinDef { name: "neq", effect: "a b -- a!=b", help: "1 if not equal, else 0.", exec: w_neq },
    BuiltinDef { name: "lt", effect: "a b -- a<b", help: "1 if a < b, else 0.", exec: w_lt },
    BuiltinDef { name: "gt", effect: "a b -- a>b", help: "1 if a > b, else 0.", exec: w_gt },
    BuiltinDef { name: "leq", effect: "a b -- a<=b", help: "1 if a <= b, else 0.", exec: w_leq },
    BuiltinDef { name: "geq", effect: "a b -- a>=b", help: "1 if a >= b, else 0.", exec: w_geq },
    BuiltinDef { name: "and", effect: "a b -- a&&b", help: "Logical and of two truth values.", exec: w_and },
    BuiltinDef { name: "or", effect: "a b -- a||b", help: "Logical or of two truth values.", exec: w_or },
    BuiltinDef { name: "not", effect: "a -- !a", help: "Logical negation.", exec: w_not },
    // complex numbers
    BuiltinDef { name: "re", effect: "z -- Re(z)", help: "Real part of a complex number.", exec: w_re },
    BuiltinDef { name: "im", effect: "z -- Im(z)", help: "Imaginary part of a complex number.", exec: w_im },
    BuiltinDef { name: "arg", effect: "z -- arg(z)", help: "Complex argument (phase) in radians.", exec: w_arg },
    BuiltinDef { name: "conj", effect: "z -- conj(z)", help: "Complex conjugate.", exec: w_conj },
    BuiltinDef { name: "j2r", effect: "Im Re -- z", help: "Join two reals into a complex, imaginary pushed first.", exec: w_j2r },
    BuiltinDef { name: "re2c", effect: "x -- x+0i", help: "Promote a real to complex.", exec: w_re2c },
    BuiltinDef { name: "split_c", effect: "z -- Re(z) Im(z)", help: "Split a complex into real and imaginary parts.", exec: w_split_c },
    // constants and random
    BuiltinDef { name: "pi", effect: "-- pi", help: "Push pi.", exec: w_pi },
    BuiltinDef { name: "e", effect: "-- e", help: "Push Euler's number.", exec: w_e },
    BuiltinDef { name: "gravity", effect: "-- g", help: "Push standard gravitational acceleration (m/s^2).", exec: w_gravity },
    BuiltinDef { name: "inf", effect: "-- +inf", help: "Push positive infinity.", exec: w_inf },
    BuiltinDef { name: "nan", effect: "-- NaN", help: "Push a NaN.", exec: w_nan },
    BuiltinDef { name: "rand", effect: "-- x", help: "Push a uniform random number in [0,1).", exec: w_rand },
    // matrices
    BuiltinDef { name: "eye", effect: "n -- I_n", help: "Identity matrix of size n x n.", exec: w_eye },
    BuiltinDef { name: "ones", effect: "rows cols -- A", help: "Matrix filled with ones.", exec: w_ones },
    BuiltinDef { name: "tran", effect: "A -- A^T", help: "Matrix transpose.", exec: w_tran },
    BuiltinDef { name: "'", effect: "A -- A^T", help: "Matrix transpose (short form).", exec: w_tran },
    BuiltinDef { name: "get_aij", effect: "A i j -- a_ij", help: "Get matrix element, 1-based.", exec: w_get_aij },
    BuiltinDef { name: "set_aij", effect: "A i j x -- A'", help: "Set matrix element to x, 1-based.", exec: w_set_aij },
    BuiltinDef { name: "pm", effect: "A -- A", help: "Print a matrix in full.", exec: w_pm },
    // registers
    BuiltinDef { name: "sto", effect: "value n --", help: "Store value into register n.", exec: w_sto },
    BuiltinDef { name: "rcl", effect: "n -- value", help: "Recall value from register n.", exec: w_rcl },
    BuiltinDef { name: "pr", effect: "n --", help: "Print contents of register n.", exec: w_pr },
    BuiltinDef { name: "ffr", effect: "-- n", help: "Push the first free register index, -1 if none.", exec: w_ffr },
    // condition counters
    BuiltinDef { name: "ctr_set", effect: "n i --", help: "Set counter i to n.", exec: w_ctr_set },
    BuiltinDef { name: "ctr_add", effect: "n i --", help: "Add n to counter i.", exec: w_ctr_add },
    BuiltinDef { name: "ctr_incr", effect: "i --", help: "Increment counter i.", exec: w_ctr_incr },
    BuiltinDef { name: "ctr_decr", effect: "i --", help: "Decrement counter i.", exec: w_ctr_decr },
    BuiltinDef { name: "ctr_clr", effect: "i --", help: "Clear counter i.", exec: w_ctr_clr },
    BuiltinDef { name: "ctr_clall", effect: "--", help: "Clear every counter.", exec: w_ctr_clall },
    // strings
    BuiltinDef { name: "scon", effect: "s1 s2 -- s1s2", help: "String concatenation.", exec: w_scon },
    BuiltinDef { name: "substr", effect: "s start len -- sub", help: "Substring, 0-based start.", exec: w_substr },
    BuiltinDef { name: "s2u", effect: "s -- S", help: "Convert string to uppercase.", exec: w_s2u },
    BuiltinDef { name: "s2l", effect: "S -- s", help: "Convert string to lowercase.", exec: w_s2l },
    BuiltinDef { name: "slen", effect: "s -- n", help: "Length of string in characters.", exec: w_slen },
    BuiltinDef { name: "srev", effect: "s -- rev", help: "Reverse string.", exec: w_srev },
    BuiltinDef { name: "int2str", effect: "x -- s", help: "Integer part of x as a string.", exec: w_int2str },
    BuiltinDef { name: "eval", effect: "s --", help: "Evaluate a string as calculator input.", exec: w_eval },
    // dates
    BuiltinDef { name: "today", effect: "-- date", help: "Push today's date as DD.MM.YYYY.", exec: w_today },
    BuiltinDef { name: "dateplus", effect: "date n -- date'", help: "Shift a date by n days.", exec: w_dateplus },
    BuiltinDef { name: "ddays", effect: "d1 d2 -- n", help: "Signed days from d1 to d2.", exec: w_ddays },
    BuiltinDef { name: "dow", effect: "date -- name", help: "Weekday name of a date.", exec: w_dow },
    // display control
    BuiltinDef { name: "setprec", effect: "n --", help: "Set the number of printed digits.", exec: w_setprec },
    BuiltinDef { name: "sfs", effect: "--", help: "Toggle between fixed and scientific display.", exec: w_sfs },
    // stack persistence
    BuiltinDef { name: "savestack", effect: "filename --", help: "Save the whole stack to a binary file.", exec: w_savestack },
    BuiltinDef { name: "loadstack", effect: "filename --", help: "Replace the stack with a saved one.", exec: w_loadstack },
    // stored programs
    BuiltinDef { name: "loadprog", effect: "filename --", help: "Load a program file.", exec: w_loadprog },
    BuiltinDef { name: "listprog", effect: "--", help: "List the loaded program.", exec: w_listprog },
    BuiltinDef { name: "runprog", effect: "--", help: "Run the loaded program.", exec: w_runprog },
    BuiltinDef { name: "batch", effect: "filename --", help: "Evaluate a file line by line.", exec: w_batch },
    // help
    BuiltinDef { name: "help", effect: "[name] --", help: "Help for one word, or an overview.", exec: w_help },
    BuiltinDef { name: "listfcns", effect: "--", help: "List all builtin word names.", exec: w_listfcns },
    BuiltinDef { name: "listwords", effect: "--", help: "List all user word definitions.", exec: w_listwords },
];

#[cfg(test)]
mod tests {
    use super::*;

    // the lexer's FUNCTION classification and this table must agree
    #[test]
    fn test_every_builtin_name_dispatches() {
        for name in BUILTIN_NAMES {
            assert!(lookup(name).is_some(), "no operation for '{}'", name);
        }
    }

    #[test]
    fn test_operators_dispatch() {
        for name in &["+", "-", "*", "/", "^", ".*", "./", ".^", "'"] {
            assert!(lookup(name).is_some(), "no operation for '{}'", name);
        }
    }

    #[test]
    fn test_stack_words() {
        let mut interp = Interp::new();
        interp.evaluate_line("1 2 3 2 roll").unwrap();
        assert_eq!(interp.stack.peek(0), Some(&Val::Real(1.0)));
        assert_eq!(interp.stack.peek(1), Some(&Val::Real(3.0)));
        assert_eq!(interp.stack.peek(2), Some(&Val::Real(2.0)));

        let mut interp = Interp::new();
        interp.evaluate_line("1 2 tuck").unwrap();
        assert_eq!(interp.stack.peek(0), Some(&Val::Real(2.0)));
        assert_eq!(interp.stack.peek(1), Some(&Val::Real(1.0)));
        assert_eq!(interp.stack.peek(2), Some(&Val::Real(2.0)));
    }

    #[test]
    fn test_failed_word_leaves_stack_alone() {
        let mut interp = Interp::new();
        interp.evaluate_line("1 \"x\"").unwrap();
        assert!(interp.evaluate_line("+").is_err());
        assert_eq!(interp.stack.peek(0), Some(&Val::Str("x".to_string())));
        assert_eq!(interp.stack.peek(1), Some(&Val::Real(1.0)));
    }

    #[test]
    fn test_dup_is_deep() {
        let mut interp = Interp::new();
        interp.evaluate_line("[2 2 $ 1 2 3 4] dup 1 1 99 set_aij").unwrap();
        let (one, two) = interp.stack.pop2().unwrap();
        match (one, two) {
            (Val::MatrixReal(orig), Val::MatrixReal(set)) => {
                assert_eq!(orig.get(0, 0), Some(&1.0));
                assert_eq!(set.get(0, 0), Some(&99.0));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_registers_and_counters() {
        let mut interp = Interp::new();
        interp.evaluate_line("42 0 sto 0 rcl").unwrap();
        assert_eq!(interp.stack.pop().unwrap(), Val::Real(42.0));

        interp.evaluate_line("5 3 ctr_set 3 ctr_incr").unwrap();
        assert_eq!(interp.counters[3], 6);
        interp.evaluate_line("ctr_clall").unwrap();
        assert_eq!(interp.counters[3], 0);
    }

    #[test]
    fn test_string_words() {
        let mut interp = Interp::new();
        interp.evaluate_line("\"foo\" \"bar\" scon s2u").unwrap();
        assert_eq!(interp.stack.pop().unwrap(), Val::Str("FOOBAR".to_string()));

        interp.evaluate_line("\"abcdef\" 1 3 substr").unwrap();
        assert_eq!(interp.stack.pop().unwrap(), Val::Str("bcd".to_string()));
    }

    #[test]
    fn test_eval_word() {
        let mut interp = Interp::new();
        interp.evaluate_line("\"3 4 +\" eval").unwrap();
        assert_eq!(interp.stack.pop().unwrap(), Val::Real(7.0));
    }

    #[test]
    fn test_complex_words() {
        let mut interp = Interp::new();
        interp.evaluate_line("1 2 j2r").unwrap();
        assert_eq!(interp.stack.pop().unwrap(), Val::Complex(2.0, 1.0));

        interp.evaluate_line("(1,2) split_c").unwrap();
        assert_eq!(interp.stack.pop().unwrap(), Val::Real(2.0));
        assert_eq!(interp.stack.pop().unwrap(), Val::Real(1.0));
    }

    #[test]
    fn test_matrix_words() {
        let mut interp = Interp::new();
        interp.evaluate_line("2 eye [2 2 $ 1 2 3 4] *").unwrap();
        match interp.stack.pop().unwrap() {
            Val::MatrixReal(m) => assert_eq!(m.data(), &[1.0, 2.0, 3.0, 4.0]),
            other => panic!("unexpected {:?}", other),
        }

        interp.evaluate_line("[2 3 $ 1 2 3 4 5 6] ' ").unwrap();
        match interp.stack.pop().unwrap() {
            Val::MatrixReal(m) => {
                assert_eq!(m.rows(), 3);
                assert_eq!(m.get(0, 1), Some(&4.0));
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
