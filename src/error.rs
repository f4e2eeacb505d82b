use thiserror::Error;

use crate::callbacks::DispatchError;
use crate::eval::EvalError;
use crate::parser::ParseError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("Eval error: {0}")]
    Eval(#[from] EvalError),
    #[error("Config error: {0}")]
    Config(String),
}

impl From<DispatchError> for Error {
    fn from(err: DispatchError) -> Self {
        Error::Eval(EvalError::Dispatch(err))
    }
}

pub type ExprResult<T> = Result<T, Error>;

impl Error {
    pub fn config<S: Into<String>>(message: S) -> Self {
        Error::Config(message.into())
    }
}
