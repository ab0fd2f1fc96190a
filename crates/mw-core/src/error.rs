use thiserror::Error;

pub type MwResult<T> = Result<T, MwError>;

#[derive(Error, Debug)]
pub enum MwError {
    #[error("Non-finite numeric value for {what}: {value}")]
    NonFinite { what: &'static str, value: f64 },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: String },

    #[error("Invariant violated: {what}")]
    Invariant { what: String },
}
