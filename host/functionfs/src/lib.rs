//! FunctionFS descriptor and string images
//!
//! The Linux FunctionFS gadget driver expects two blobs to be written to `ep0` before the function
//! can be bound: a descriptor image (per-speed interface and endpoint descriptors) and a string
//! image (localized strings referenced by index from the descriptors). This crate produces both.
//!
//! # References
//!
//! - Universal Serial Bus Specification Revision 2.0
//! - `include/uapi/linux/usb/functionfs.h` (Linux kernel)

use core::{fmt, str::FromStr};

pub mod consts;
pub mod descs;
pub mod ep;
pub mod iface;
pub mod strs;

/// Magic number of the legacy (v1) descriptor image
pub const DESCRIPTORS_MAGIC: u32 = 1;
/// Magic number of the string image
pub const STRINGS_MAGIC: u32 = 2;
/// Magic number of the flags based (v2) descriptor image
pub const DESCRIPTORS_MAGIC_V2: u32 = 3;

#[allow(non_camel_case_types)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DescriptorType {
    INTERFACE = 4,
    ENDPOINT = 5,
}

/// Endpoint direction
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Direction {
    /// Host-to-Device
    OUT = 0,

    /// Device-to-Host
    IN = 1,
}

/// Bus speed a descriptor set applies to
///
/// The declaration order is the order in which per-speed descriptors appear in the image
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Speed {
    /// Full speed (12 Mb/s)
    Full,
    /// High speed (480 Mb/s)
    High,
    /// Super speed (5 Gb/s)
    Super,
}

impl Speed {
    /// All speeds, in image order
    pub const ALL: [Speed; 3] = [Speed::Full, Speed::High, Speed::Super];

    /// The `FUNCTIONFS_HAS_*_DESC` bit of this speed
    pub fn flag(self) -> u32 {
        match self {
            Speed::Full => 1 << 0,
            Speed::High => 1 << 1,
            Speed::Super => 1 << 2,
        }
    }

    /// Name of the configuration key that holds the descriptors of this speed
    pub fn key(self) -> &'static str {
        match self {
            Speed::Full => "fs_desc",
            Speed::High => "hs_desc",
            Speed::Super => "ss_desc",
        }
    }
}

impl fmt::Display for Speed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Speed::Full => "full-speed",
            Speed::High => "high-speed",
            Speed::Super => "super-speed",
        })
    }
}

/// Layout of the descriptor image header
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Format {
    /// `usb_functionfs_descs_head`: fixed full-speed and high-speed counts
    V1,
    /// `usb_functionfs_descs_head_v2`: speed flags plus one count per present speed
    V2,
}

impl Format {
    /// All supported formats, oldest first
    pub const ALL: [Format; 2] = [Format::V1, Format::V2];

    pub fn name(self) -> &'static str {
        match self {
            Format::V1 => "v1",
            Format::V2 => "v2",
        }
    }

    /// Whether descriptors for `speed` can be expressed in this format
    pub fn supports(self, speed: Speed) -> bool {
        match self {
            Format::V1 => speed != Speed::Super,
            Format::V2 => true,
        }
    }
}

/// The newest format
impl Default for Format {
    fn default() -> Self {
        Format::V2
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Format {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        Format::ALL
            .iter()
            .copied()
            .find(|format| format.name() == s)
            .ok_or_else(|| Error::UnsupportedFormat(s.to_owned()))
    }
}

/// A single descriptor of a per-speed list
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Descriptor {
    /// Interface descriptor
    Interface(iface::Desc),
    /// Endpoint descriptor (no audio extension)
    Endpoint(ep::Desc),
}

impl Descriptor {
    /// The size of this descriptor on the wire
    pub fn size(&self) -> usize {
        match self {
            Descriptor::Interface(_) => usize::from(iface::Desc::SIZE),
            Descriptor::Endpoint(_) => usize::from(ep::Desc::SIZE),
        }
    }

    /// Appends the wire representation of this descriptor to `buf`
    pub fn write(&self, buf: &mut Vec<u8>) {
        match self {
            Descriptor::Interface(desc) => buf.extend_from_slice(&desc.bytes()),
            Descriptor::Endpoint(desc) => buf.extend_from_slice(&desc.bytes()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum State {
    BeforeInterface,
    // index (into `descs`) of the interface the next endpoints belong to
    InInterface { index: usize },
}

/// Descriptors of one speed, in declaration order
///
/// Interface numbers are assigned and endpoint counts accumulated as descriptors are pushed so
/// the stored descriptors are always ready to be serialized
#[derive(Clone, Debug, PartialEq)]
pub struct Stream {
    descs: Vec<Descriptor>,
    interfaces: usize,
    state: State,
}

impl Stream {
    pub fn new() -> Self {
        Self {
            descs: vec![],
            interfaces: 0,
            state: State::BeforeInterface,
        }
    }

    /// Appends a descriptor
    ///
    /// An interface gets the next free interface number and its endpoint count reset to zero; an
    /// endpoint is counted against the last pushed interface.
    pub fn push(&mut self, desc: Descriptor) -> Result<(), Error> {
        match desc {
            Descriptor::Interface(mut iface) => {
                if self.interfaces > usize::from(u8::max_value()) {
                    return Err(Error::TooManyInterfaces);
                }

                iface.bInterfaceNumber = self.interfaces as u8;
                iface.bNumEndpoints = 0;
                self.interfaces += 1;

                self.state = State::InInterface {
                    index: self.descs.len(),
                };
                self.descs.push(Descriptor::Interface(iface));
            }

            Descriptor::Endpoint(ep) => {
                let index = match self.state {
                    State::BeforeInterface => return Err(Error::EndpointBeforeInterface),
                    State::InInterface { index } => index,
                };

                if let Descriptor::Interface(iface) = &mut self.descs[index] {
                    iface.bNumEndpoints = iface
                        .bNumEndpoints
                        .checked_add(1)
                        .ok_or(Error::TooManyEndpoints {
                            interface: iface.bInterfaceNumber,
                        })?;
                }

                self.descs.push(Descriptor::Endpoint(ep));
            }
        }

        Ok(())
    }

    /// Whether an endpoint descriptor may be pushed next
    pub fn accepts_endpoint(&self) -> bool {
        self.state != State::BeforeInterface
    }

    /// Number of descriptors (interfaces and endpoints)
    pub fn count(&self) -> usize {
        self.descs.len()
    }

    /// Size of the serialized descriptors in bytes
    pub fn size(&self) -> usize {
        self.descs.iter().map(Descriptor::size).sum()
    }

    pub fn descriptors(&self) -> &[Descriptor] {
        &self.descs
    }

    /// Appends the wire representation of all descriptors to `buf`
    pub fn write(&self, buf: &mut Vec<u8>) {
        for desc in &self.descs {
            desc.write(buf);
        }
    }
}

impl Default for Stream {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors produced while building or decoding images
#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    /// Format name other than `v1` or `v2`
    UnsupportedFormat(String),
    /// Descriptors for a speed the selected format cannot express
    SpeedNotSupported { speed: Speed, format: Format },
    /// Endpoint descriptor pushed before any interface descriptor
    EndpointBeforeInterface,
    /// More than 256 interfaces in one speed
    TooManyInterfaces,
    /// More than 255 endpoints in one interface
    TooManyEndpoints { interface: u8 },
    /// No speed has descriptors
    NoDescriptors,
    /// Language code at position `index` was already used by an earlier language
    DuplicateLanguage { index: usize, code: u16 },
    /// Language at position `index` doesn't have as many strings as the first one
    InconsistentStringCount {
        index: usize,
        expected: usize,
        found: usize,
    },
    /// String contains a NUL byte
    NulInString { lang: usize, index: usize },
    /// Image larger than what the 32-bit length field can describe
    TooLarge,
    /// The image buffer could not be allocated
    NoMemory,
    /// Image shorter than its header or its length field
    Truncated,
    /// Unexpected magic number
    BadMagic(u32),
    /// Length field doesn't match the size of the image
    LengthMismatch { header: u32, actual: usize },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UnsupportedFormat(name) => write!(f, "format `{}` not supported", name),
            Error::SpeedNotSupported { speed, format } => write!(
                f,
                "{} descriptors can't be expressed in the {} format",
                speed, format
            ),
            Error::EndpointBeforeInterface => {
                f.write_str("endpoint descriptor defined before any interface descriptor")
            }
            Error::TooManyInterfaces => f.write_str("too many interface descriptors"),
            Error::TooManyEndpoints { interface } => {
                write!(f, "too many endpoints in interface {}", interface)
            }
            Error::NoDescriptors => f.write_str("no descriptors defined"),
            Error::DuplicateLanguage { code, .. } => {
                write!(f, "lang {:#06x} defined more than once", code)
            }
            Error::InconsistentStringCount {
                expected, found, ..
            } => write!(
                f,
                "number of strings must be the same for each lang (expected {}, found {})",
                expected, found
            ),
            Error::NulInString { lang, index } => write!(
                f,
                "string {} of lang #{} contains a NUL byte",
                index + 1,
                lang
            ),
            Error::TooLarge => f.write_str("image exceeds 4 GiB"),
            Error::NoMemory => f.write_str("error allocating memory"),
            Error::Truncated => f.write_str("image is truncated"),
            Error::BadMagic(magic) => write!(f, "bad magic number {:#010x}", magic),
            Error::LengthMismatch { header, actual } => write!(
                f,
                "length field says {} bytes but the image has {} bytes",
                header, actual
            ),
        }
    }
}

impl std::error::Error for Error {}

/// Allocates a buffer for an image of exactly `size` bytes
pub(crate) fn alloc(size: usize) -> Result<Vec<u8>, Error> {
    if size > u32::max_value() as usize {
        return Err(Error::TooLarge);
    }

    let mut buf = Vec::new();
    buf.try_reserve_exact(size).map_err(|_| Error::NoMemory)?;
    Ok(buf)
}

pub(crate) fn push_u32(buf: &mut Vec<u8>, word: u32) {
    buf.extend_from_slice(&word.to_le_bytes());
}
