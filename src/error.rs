use thiserror::Error;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

macro_rules! out_of_bounds_error {
    () => {
        crate::Error::OutOfBounds {
            file: file!(),
            line: line!(),
        }
    };
}

macro_rules! decompression_error {
    ($msg:expr) => {
        crate::Error::Decompression($msg.to_string())
    };

    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Decompression(format!($fmt, $($arg)*))
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Every operation reports failures synchronously to its caller. Nothing is retried: decoding
/// the same bytes twice cannot change the outcome, so errors are local and loud rather than
/// papered over with best-effort results.
///
/// # Error Categories
///
/// ## Identification Errors
/// - [`Error::NotSupported`] - Bad magic, unknown class or data encoding
/// - [`Error::Empty`] - Empty input provided
///
/// ## Structural Errors
/// - [`Error::OutOfBounds`] - A declared size, count or offset runs past the end of the data
/// - [`Error::Malformed`] - Corrupted or invalid structure (overlong varint, invalid UTF-8, ...)
/// - [`Error::UnresolvedLink`] - A section references a linked section of the wrong kind
/// - [`Error::LimitExceeded`] - A configured allocation bound was exceeded
///
/// ## Debug Information Errors
/// - [`Error::Decompression`] - A compressed debug section failed its integrity checks
///
/// ## I/O and External Errors
/// - [`Error::FileError`] - Filesystem I/O errors
/// - [`Error::GoblinErr`] - Header parsing errors from the goblin crate
///
/// # Examples
///
/// ```rust,no_run
/// use binscope::{BinaryFile, Error, Object};
/// use std::path::Path;
///
/// match Object::from_file(Path::new("module.wasm")) {
///     Ok(object) => println!("Loaded {}", object.machine_arch()),
///     Err(Error::NotSupported) => eprintln!("Not an ELF or wasm file"),
///     Err(Error::Malformed { message, file, line }) => {
///         eprintln!("Malformed file: {} ({}:{})", message, file, line);
///     }
///     Err(e) => eprintln!("Other error: {}", e),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The file is damaged and could not be parsed.
    ///
    /// The error includes the source location where the malformation was detected.
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// An out of bound access was attempted while parsing the file.
    ///
    /// A declared size, count or offset exceeds the bytes that are actually available.
    /// This is fatal for the table or section being read, but other tables remain usable.
    #[error("Out of Bound read would have occurred - {file}:{line}")]
    OutOfBounds {
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// This file type is not supported.
    ///
    /// Raised when the magic prologue matches neither an ELF nor a wasm container, or
    /// when a feature of a recognised container is not implemented.
    #[error("This file type is not supported")]
    NotSupported,

    /// Provided input was empty.
    #[error("Provided input was empty")]
    Empty,

    /// A section's linked index does not resolve to a section of the expected kind.
    #[error("Section {section} links to section {link}, which cannot be resolved")]
    UnresolvedLink {
        /// Index of the section carrying the link
        section: usize,
        /// The linked index that failed to resolve
        link: usize,
    },

    /// A compressed debug section failed its integrity checks.
    ///
    /// Covers a too-short envelope, an unknown compression tag, a corrupt deflate
    /// stream and a mismatch between declared and actual uncompressed size. No partial
    /// output is ever returned alongside this error.
    #[error("Decompression failed - {0}")]
    Decompression(String),

    /// A configured allocation bound was exceeded.
    #[error("{what} of {size} bytes exceeds the limit of {limit} bytes")]
    LimitExceeded {
        /// What was being sized
        what: &'static str,
        /// The requested size
        size: u64,
        /// The configured limit
        limit: u64,
    },

    /// File I/O error.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// Generic error for miscellaneous failures.
    #[error("{0}")]
    Error(String),

    /// Error from the goblin crate during ELF header parsing.
    #[error("{0}")]
    GoblinErr(#[from] goblin::error::Error),
}
