use super::Val;
use crate::error;
use crate::lang::Error;

type Result<T> = std::result::Result<T, Error>;

/// Fixed capacity of the value stack.
pub const STACK_SIZE: usize = 128;

/// ## The value stack
///
/// A bounded stack of [`Val`]. Every failing operation leaves the stack
/// exactly as it found it: a push at capacity and a pop on empty are
/// rejected before anything moves, and multi-value operations validate
/// depth and types with [`Stack::peek`] before committing.

#[derive(Debug, Clone, Default)]
pub struct Stack {
    items: Vec<Val>,
}

impl Stack {
    pub fn new() -> Stack {
        Stack { items: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Val> {
        self.items.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Val> {
        self.items.get(index)
    }

    pub fn push(&mut self, val: Val) -> Result<()> {
        if self.items.len() >= STACK_SIZE {
            return Err(error!(StackOverflow));
        }
        self.items.push(val);
        Ok(())
    }

    pub fn pop(&mut self) -> Result<Val> {
        match self.items.pop() {
            Some(v) => Ok(v),
            None => Err(error!(StackUnderflow)),
        }
    }

    /// Pops `( one two -- )` returning `(one, two)` with `two` the old
    /// top. Depth is validated before either value moves.
    pub fn pop2(&mut self) -> Result<(Val, Val)> {
        self.require(2)?;
        let two = self.items.pop().unwrap();
        let one = self.items.pop().unwrap();
        Ok((one, two))
    }

    pub fn require(&self, depth: usize) -> Result<()> {
        if self.items.len() < depth {
            Err(error!(StackUnderflow))
        } else {
            Ok(())
        }
    }

    /// Borrow the value `depth` slots below the top; 0 is the top itself.
    pub fn peek(&self, depth: usize) -> Option<&Val> {
        let len = self.items.len();
        if depth < len {
            self.items.get(len - 1 - depth)
        } else {
            None
        }
    }

    pub fn peek_mut(&mut self, depth: usize) -> Option<&mut Val> {
        let len = self.items.len();
        if depth < len {
            self.items.get_mut(len - 1 - depth)
        } else {
            None
        }
    }

    /// Validates that the value `depth` slots below the top is a Real and
    /// returns it, without mutating anything.
    pub fn peek_real(&self, depth: usize) -> Result<f64> {
        match self.peek(depth) {
            None => Err(error!(StackUnderflow)),
            Some(Val::Real(x)) => Ok(*x),
            Some(v) => Err(error!(TypeMismatch; format!("need a real, have a {}", v.kind_name()))),
        }
    }

    /// Removes the value `depth` slots below the top. The caller must have
    /// validated depth beforehand.
    pub fn remove(&mut self, depth: usize) -> Result<Val> {
        let len = self.items.len();
        if depth < len {
            Ok(self.items.remove(len - 1 - depth))
        } else {
            Err(error!(StackUnderflow))
        }
    }

    /// Inserts a value `depth` slots below the current top.
    pub fn insert(&mut self, depth: usize, val: Val) -> Result<()> {
        if self.items.len() >= STACK_SIZE {
            return Err(error!(StackOverflow));
        }
        let len = self.items.len();
        if depth > len {
            return Err(error!(StackUnderflow));
        }
        self.items.insert(len - depth, val);
        Ok(())
    }
}
