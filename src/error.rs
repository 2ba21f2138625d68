use thiserror::Error;

/// Exit status for a successful run.
pub const SUCCESS_EXIT_CODE: i32 = 0;
/// Exit status for any failure that is not a usage error.
pub const ERROR_EXIT_CODE: i32 = 1;
/// Exit status for bad flags, unknown subcommands and bare invocations.
pub const USAGE_EXIT_CODE: i32 = 2;

#[derive(Error, Debug)]
pub enum RpmGetError {
    #[error("{0}")]
    Usage(String),

    #[error("rpm-get must be run as root!")]
    NotRoot,

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("API rate limit exceeded for {0}")]
    RateLimited(String),

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Failed to parse JSONPath: {0}")]
    JsonPath(String),

    #[error("Failed to evaluate XPath: {0}")]
    XPath(String),

    #[error("Failed to parse XML: {0}")]
    Xml(String),

    #[error("Invalid CSS selector: {0}")]
    Selector(String),

    #[error("Failed to parse regex: {0}")]
    Regex(#[from] regex::Error),

    #[error("{expr} did not return a string value (found {found})")]
    NotAString { expr: String, found: String },

    #[error("{expr} did not match anything")]
    NothingSelected { expr: String },

    #[error("Pattern {pattern} did not match '{value}'")]
    PatternMismatch { pattern: String, value: String },

    #[error("Command `{command}` failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("Required executable not found in PATH: {0}")]
    MissingExecutable(String),

    #[error("Package not found: {0}")]
    PackageNotFound(String),

    #[error("No repository registered for {0}")]
    RepoNotRegistered(String),

    #[error("{package} is not available for {arch}")]
    UnsupportedArch { package: String, arch: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl RpmGetError {
    /// Process exit status for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            RpmGetError::Usage(_) => USAGE_EXIT_CODE,
            _ => ERROR_EXIT_CODE,
        }
    }
}

pub type Result<T> = std::result::Result<T, RpmGetError>;
