//! Application error type.
//!
//! Every fallible step returns `Result<_, AppError>`. The error carries the
//! process exit code alongside a human-readable message so `main` can report
//! and exit without inspecting the failure.
//!
//! Exit codes:
//! - `2` bad input (file, columns, dates, options)
//! - `3` no usable data
//! - `4` fit / predict failure
//! - `5` rendering or writing outputs

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub const INPUT: u8 = 2;
    pub const NO_DATA: u8 = 3;
    pub const FIT: u8 = 4;
    pub const OUTPUT: u8 = 5;

    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn input(message: impl Into<String>) -> Self {
        Self::new(Self::INPUT, message)
    }

    pub fn no_data(message: impl Into<String>) -> Self {
        Self::new(Self::NO_DATA, message)
    }

    pub fn fit(message: impl Into<String>) -> Self {
        Self::new(Self::FIT, message)
    }

    pub fn output(message: impl Into<String>) -> Self {
        Self::new(Self::OUTPUT, message)
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
