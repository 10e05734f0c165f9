//! # MM-15
//!
//! An HP-41 style programmable RPN calculator for real and complex
//! scalars and matrices.
//!
//! Start the executable in a terminal and you get a prompt:
//! ```text
//! MM_RPN>> 3 4 +
//! 0: 7.0000
//! ```
//!
//! Values are pushed in reverse-Polish order. Complex numbers are entered
//! as `(1,3)`, inline matrices J-style as `[2 2 $ -1 2 5 1]`, and matrices
//! from a file as `[2,2,"data.txt"]`. Programs are plain text files with
//! one instruction per line (`LBL`, `GOTO`, `GOSUB`, `RTN`, `END`, tests
//! ending in `?`, or any calculator line) loaded with `loadprog` and
//! started with `runprog`.

pub mod lang;
pub mod mach;
pub mod term;
