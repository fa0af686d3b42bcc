//! CLI Error Types

use derive_more::{Display, Error};
use std::path::PathBuf;

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("could not load configuration")]
    Config,
    #[display("could not open {}", _0.display())]
    Storage(#[error(not(source))] PathBuf),
    #[display("learning profile operation failed")]
    Profile,
    #[display("could not read from the terminal")]
    Input,
}
