/// Error types for the I/O boundary.
///
/// The editing core itself is total: invalid placements return `false`
/// and malformed codes decode best-effort. Only strict parsing and
/// persistence report errors.

/// Strict level-code parsing errors (textual code or byte image).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodeError {
    /// Textual code has the wrong number of symbols
    Length { expected: usize, found: usize },
    /// Symbol outside the level-code alphabet
    Symbol { index: usize, ch: char },
    /// Byte image shorter than the layout requires
    Truncated { expected: usize, found: usize },
    /// Byte image does not start with the magic marker
    BadMagic(u16),
    /// Stored checksum does not match the image contents
    BadChecksum { stored: u8, computed: u8 },
}

impl std::fmt::Display for CodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodeError::Length { expected, found } => {
                write!(f, "level code must be {} symbols, got {}", expected, found)
            }
            CodeError::Symbol { index, ch } => {
                write!(f, "invalid symbol {:?} at position {}", ch, index)
            }
            CodeError::Truncated { expected, found } => {
                write!(f, "image truncated: expected {} bytes, got {}", expected, found)
            }
            CodeError::BadMagic(m) => write!(f, "bad image magic: {:#06x}", m),
            CodeError::BadChecksum { stored, computed } => {
                write!(f, "checksum mismatch: stored {:#04x}, computed {:#04x}", stored, computed)
            }
        }
    }
}

impl std::error::Error for CodeError {}

/// Persistence errors.
#[derive(Debug)]
pub enum SaveError {
    /// File system error
    Io(std::io::Error),
    /// Stored level code failed to parse
    Code(CodeError),
    /// Save file is missing a required key
    MissingKey(&'static str),
    /// Save file has a malformed value
    InvalidValue { key: String, value: String },
}

impl std::fmt::Display for SaveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SaveError::Io(e) => write!(f, "IO error: {}", e),
            SaveError::Code(e) => write!(f, "level code error: {}", e),
            SaveError::MissingKey(k) => write!(f, "save file missing `{}`", k),
            SaveError::InvalidValue { key, value } => {
                write!(f, "invalid value for `{}`: {:?}", key, value)
            }
        }
    }
}

impl std::error::Error for SaveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SaveError::Io(e) => Some(e),
            SaveError::Code(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for SaveError {
    fn from(e: std::io::Error) -> Self {
        SaveError::Io(e)
    }
}

impl From<CodeError> for SaveError {
    fn from(e: CodeError) -> Self {
        SaveError::Code(e)
    }
}

/// Result type for persistence operations.
pub type SaveResult<T> = Result<T, SaveError>;
