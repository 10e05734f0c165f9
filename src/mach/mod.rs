/*!
## Machine Module

The calculator machine: the tagged value stack, the word dispatcher, the
label/control-flow program runner, and the binary stack persistence format.

*/

/// Program counter / label target.
pub type Address = usize;

mod builtin;
mod interp;
mod machine;
mod math;
mod stack;
mod stackfile;
mod strings;
mod val;

pub use builtin::lookup;
pub use builtin::BuiltinDef;
pub use builtin::BUILTINS;
pub use interp::Interp;
pub use interp::MAX_REG;
pub use machine::load_program;
pub use machine::load_program_from_file;
pub use machine::Instr;
pub use machine::Program;
pub use machine::MAX_COUNTERS;
pub use stack::Stack;
pub use stack::STACK_SIZE;
pub use stackfile::load_stack_from_file;
pub use stackfile::save_stack_to_file;
pub use val::Matrix;
pub use val::Val;
