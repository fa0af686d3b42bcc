use derive_more::{Display, Error};

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Text that does not contain a disc serial (`SLUS-20917`, `SLUS_209.17`, ...).
    #[display("not a disc serial: {_0}")]
    InvalidSerial(#[error(not(source))] String),
}

impl ErrorKind {
    pub fn is_retryable(&self) -> bool {
        false
    }
}
