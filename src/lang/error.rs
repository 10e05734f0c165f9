pub struct Error {
    code: ErrorCode,
    message: String,
}

#[doc(hidden)]
#[macro_export]
macro_rules! error {
    ($err:ident) => {
        $crate::lang::Error::new($crate::lang::ErrorCode::$err)
    };
    ($err:ident; $msg:expr) => {
        $crate::lang::Error::new($crate::lang::ErrorCode::$err).message($msg)
    };
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ErrorCode {
    LexError,
    StackUnderflow,
    StackOverflow,
    TypeMismatch,
    UnknownWord,
    InvalidLabel,
    ReturnStackUnderflow,
    ProgramLoadError,
    FormatError,
    IoError,
    Interrupted,
}

impl Error {
    pub fn new(code: ErrorCode) -> Error {
        Error {
            code,
            message: String::new(),
        }
    }

    pub fn message<S: Into<String>>(mut self, message: S) -> Error {
        self.message = message.into();
        self
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Error {
        Error::new(ErrorCode::IoError).message(error.to_string())
    }
}

impl std::fmt::Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Error {{ {} }}", self)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        use ErrorCode::*;
        let code_str = match self.code {
            LexError => "lex error",
            StackUnderflow => "stack underflow",
            StackOverflow => "stack overflow",
            TypeMismatch => "type mismatch",
            UnknownWord => "unknown word",
            InvalidLabel => "invalid label",
            ReturnStackUnderflow => "return stack underflow",
            ProgramLoadError => "program load error",
            FormatError => "stack file format error",
            IoError => "i/o error",
            Interrupted => "interrupted",
        };
        if self.message.is_empty() {
            write!(f, "{}", code_str)
        } else {
            write!(f, "{}; {}", code_str, self.message)
        }
    }
}
