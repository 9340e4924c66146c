use core::fmt;

use crate::config::{Location, Setting};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ErrorKind {
    /// Required setting or section is missing
    NotFound,
    /// Wrong type or out of range value
    BadValue,
    /// Valid but unsupported value
    NotSupported,
    /// An image buffer could not be allocated
    NoMemory,
    /// Endpoint descriptor before any interface descriptor
    Ordering,
    /// Structural inconsistency
    Other,

    /// Two languages with the same code
    DuplicateLanguage,
    /// Languages with different numbers of strings
    InconsistentStringCount,
    /// Descriptor format other than `v1` / `v2`
    UnsupportedFormat,
    /// `type` other than `INTERFACE_DESC` / `EP_NO_AUDIO_DESC`
    UnsupportedDescriptorType,
}

impl ErrorKind {
    /// Maps the specialized kinds onto the basic ones
    pub fn category(self) -> ErrorKind {
        match self {
            ErrorKind::DuplicateLanguage | ErrorKind::InconsistentStringCount => ErrorKind::Other,
            ErrorKind::UnsupportedFormat | ErrorKind::UnsupportedDescriptorType => {
                ErrorKind::NotSupported
            }
            kind => kind,
        }
    }
}

impl From<&functionfs::Error> for ErrorKind {
    fn from(e: &functionfs::Error) -> Self {
        use functionfs::Error as E;

        match e {
            E::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            E::SpeedNotSupported { .. } => ErrorKind::NotSupported,
            E::EndpointBeforeInterface => ErrorKind::Ordering,
            E::TooManyInterfaces | E::TooManyEndpoints { .. } | E::NulInString { .. } => {
                ErrorKind::BadValue
            }
            E::DuplicateLanguage { .. } => ErrorKind::DuplicateLanguage,
            E::InconsistentStringCount { .. } => ErrorKind::InconsistentStringCount,
            E::NoMemory => ErrorKind::NoMemory,
            E::NoDescriptors
            | E::TooLarge
            | E::Truncated
            | E::BadMagic(_)
            | E::LengthMismatch { .. } => ErrorKind::Other,
        }
    }
}

/// A validation error, tagged with the setting it was found at
#[derive(Clone, Debug, PartialEq)]
pub struct Error {
    kind: ErrorKind,
    location: Location,
    name: String,
    message: String,
}

impl Error {
    pub fn new(node: &Setting, kind: ErrorKind, message: impl Into<String>) -> Self {
        Error {
            kind,
            location: node.location.clone(),
            name: node.name().to_owned(),
            message: message.into(),
        }
    }

    /// Wraps an image encoding error, reporting it at `node`
    pub fn encoding(node: &Setting, e: functionfs::Error) -> Self {
        Error::new(node, ErrorKind::from(&e), e.to_string())
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.location, self.name, self.message)
    }
}

impl std::error::Error for Error {}
