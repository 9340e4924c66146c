//! `descriptors` section
//!
//! ``` text
//! descriptors = {
//!     fs_desc = (
//!         { type = "INTERFACE_DESC"; bInterfaceClass = "USB_CLASS_VENDOR_SPEC"; iInterface = 1; },
//!         { type = "EP_NO_AUDIO_DESC"; address = 1; direction = "in";
//!           bmAttributes = "USB_ENDPOINT_XFER_BULK"; wMaxPacketSize = 64; },
//!     );
//!     hs_desc = ( .. );
//!     ss_desc = ( .. );   // v2 only
//! };
//! ```

use core::convert::TryFrom;
use std::collections::BTreeMap;

use functionfs::{consts, ep, iface, Descriptor, Direction, Format, Speed, Stream};
use log::debug;

use crate::{
    config::Setting,
    error::{Error, ErrorKind},
    flags,
};

/// Descriptor entry types
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Kind {
    /// `INTERFACE_DESC`
    Interface,
    /// `EP_NO_AUDIO_DESC`
    EndpointNoAudio,
}

impl Kind {
    pub fn from_name(name: &str) -> Option<Kind> {
        match name {
            "INTERFACE_DESC" => Some(Kind::Interface),
            "EP_NO_AUDIO_DESC" => Some(Kind::EndpointNoAudio),
            _ => None,
        }
    }

    /// The size of descriptors of this kind on the wire
    pub fn size(self) -> usize {
        match self {
            Kind::Interface => usize::from(iface::Desc::SIZE),
            Kind::EndpointNoAudio => usize::from(ep::Desc::SIZE),
        }
    }
}

/// Encodes the `descriptors` section of `root` into a descriptor image
///
/// `str_count` is the number of strings per language; `iInterface` may not exceed it
pub fn parse(root: &Setting, str_count: usize, format: Format) -> Result<Vec<u8>, Error> {
    let group = root
        .member("descriptors")
        .ok_or_else(|| Error::new(root, ErrorKind::NotFound, "descriptors not defined"))?;

    if !group.is_group() {
        return Err(Error::new(
            group,
            ErrorKind::BadValue,
            "descriptors must be group",
        ));
    }

    let mut streams = BTreeMap::new();
    for speed in Speed::ALL.iter().copied() {
        let list = match group.member(speed.key()) {
            Some(list) => list,
            None => continue,
        };

        if !format.supports(speed) {
            return Err(Error::new(
                list,
                ErrorKind::NotSupported,
                format!("{} descriptors require a newer format than {}", speed, format),
            ));
        }

        streams.insert(speed, stream(list, str_count)?);
    }

    if streams.is_empty() {
        return Err(Error::new(
            group,
            ErrorKind::Other,
            "no descriptors defined",
        ));
    }

    functionfs::descs::encode(&streams, format).map_err(|e| Error::encoding(group, e))
}

/// Parses one per-speed list of descriptors
pub fn stream(list: &Setting, str_count: usize) -> Result<Stream, Error> {
    if !list.is_list() {
        return Err(Error::new(
            list,
            ErrorKind::BadValue,
            format!("expected list, found {}", list.type_name()),
        ));
    }

    // all entry types are validated before any field is
    let mut kinds = Vec::with_capacity(list.len());
    let mut size = 0;
    for group in list.elems() {
        let kind = kind(group)?;
        size += kind.size();
        kinds.push(kind);
    }
    debug!(
        "{}: {} descriptors, {} bytes",
        list.location,
        kinds.len(),
        size
    );

    let mut stream = Stream::new();
    for (group, kind) in list.elems().iter().zip(kinds) {
        let desc = match kind {
            Kind::Interface => Descriptor::Interface(interface(group, str_count)?),
            Kind::EndpointNoAudio => {
                // ordering is checked before any endpoint field
                if !stream.accepts_endpoint() {
                    return Err(Error::encoding(
                        group,
                        functionfs::Error::EndpointBeforeInterface,
                    ));
                }

                Descriptor::Endpoint(endpoint(group)?)
            }
        };

        stream.push(desc).map_err(|e| Error::encoding(group, e))?;
    }

    Ok(stream)
}

fn kind(group: &Setting) -> Result<Kind, Error> {
    if !group.is_group() {
        return Err(Error::new(
            group,
            ErrorKind::BadValue,
            format!("expected group, found {}", group.type_name()),
        ));
    }

    let node = group.member("type").ok_or_else(|| {
        Error::new(group, ErrorKind::NotFound, "descriptor type not defined")
    })?;
    let name = node.get_string()?;

    Kind::from_name(name).ok_or_else(|| {
        Error::new(
            node,
            ErrorKind::UnsupportedDescriptorType,
            format!("{} descriptor type unsupported", name),
        )
    })
}

/// Parses an `INTERFACE_DESC` entry
///
/// `bInterfaceNumber` and `bNumEndpoints` are left at 0; `Stream::push` fills them in
pub fn interface(group: &Setting, str_count: usize) -> Result<iface::Desc, Error> {
    let class = interface_class(group)?;
    let subclass = interface_subclass(group)?;

    let node = required(group, "iInterface")?;
    let index = byte(node)?;
    if usize::from(index) > str_count {
        return Err(Error::new(
            node,
            ErrorKind::BadValue,
            "String of this index does not exist",
        ));
    }

    Ok(iface::Desc {
        bInterfaceNumber: 0,
        bAlternateSetting: optional(group, "bAlternateSetting", byte)?.unwrap_or(0),
        bNumEndpoints: 0,
        bInterfaceClass: class,
        bInterfaceSubClass: subclass,
        bInterfaceProtocol: optional(group, "bInterfaceProtocol", byte)?.unwrap_or(0),
        iInterface: index,
    })
}

fn interface_class(group: &Setting) -> Result<u8, Error> {
    let node = group.member("bInterfaceClass").ok_or_else(|| {
        Error::new(group, ErrorKind::NotFound, "Interface class not defined")
    })?;

    if node.as_int().is_some() {
        byte(node)
    } else if let Some(name) = node.as_str() {
        let class = consts::lookup(consts::INTERFACE_CLASSES, name).ok_or_else(|| {
            Error::new(
                node,
                ErrorKind::BadValue,
                format!("Unknown interface class {}", name),
            )
        })?;

        u8::try_from(class).map_err(|_| Error::new(node, ErrorKind::BadValue, "out of range"))
    } else {
        Err(Error::new(
            node,
            ErrorKind::BadValue,
            "expected string or number",
        ))
    }
}

fn interface_subclass(group: &Setting) -> Result<u8, Error> {
    let node = match group.member("bInterfaceSubClass") {
        Some(node) => node,
        None => return Ok(0),
    };

    if node.as_int().is_some() {
        byte(node)
    } else if node.as_str().is_some() {
        // TODO resolve class specific subclass names (e.g. CDC's `USB_CDC_SUBCLASS_ACM`)
        Err(Error::new(
            node,
            ErrorKind::NotSupported,
            "strings not supported in subclass",
        ))
    } else {
        Err(Error::new(
            node,
            ErrorKind::BadValue,
            "Interface subclass must be string or number",
        ))
    }
}

/// Parses an `EP_NO_AUDIO_DESC` entry
pub fn endpoint(group: &Setting) -> Result<ep::Desc, Error> {
    let node = required(group, "address")?;
    let number = node.get_int()?;
    if number < 0 || number > 0x7f {
        return Err(Error::new(
            node,
            ErrorKind::BadValue,
            "address out of range",
        ));
    }

    let attributes = attributes(group)?;

    let node = required(group, "direction")?;
    let direction = match node.get_string()? {
        "in" => Direction::IN,
        "out" => Direction::OUT,
        _ => {
            return Err(Error::new(
                node,
                ErrorKind::BadValue,
                "Invalid direction value",
            ))
        }
    };

    Ok(ep::Desc {
        bEndpointAddress: ep::Address {
            number: number as u8,
            direction,
        },
        bmAttributes: attributes,
        wMaxPacketSize: optional(group, "wMaxPacketSize", word)?.unwrap_or(0),
        bInterval: optional(group, "bInterval", byte)?.unwrap_or(0),
    })
}

fn attributes(group: &Setting) -> Result<u8, Error> {
    let node = required(group, "bmAttributes")?;

    let bits = if let Some(int) = node.as_int() {
        int
    } else if let Some(s) = node.as_str() {
        flags::parse(s, consts::ENDPOINT_ATTRIBUTES)
            .map(i64::from)
            .map_err(|flags::UnknownFlag(name)| {
                Error::new(
                    node,
                    ErrorKind::BadValue,
                    format!("Unknown attribute flag: {}", name),
                )
            })?
    } else {
        return Err(Error::new(
            node,
            ErrorKind::BadValue,
            "must be string or number",
        ));
    };

    u8::try_from(bits).map_err(|_| Error::new(node, ErrorKind::BadValue, "out of range"))
}

fn required<'c>(group: &'c Setting, name: &str) -> Result<&'c Setting, Error> {
    group.member(name).ok_or_else(|| {
        Error::new(
            group,
            ErrorKind::NotFound,
            format!("{} not defined", name),
        )
    })
}

fn optional<T>(
    group: &Setting,
    name: &str,
    f: impl FnOnce(&Setting) -> Result<T, Error>,
) -> Result<Option<T>, Error> {
    group.member(name).map(f).transpose()
}

fn byte(node: &Setting) -> Result<u8, Error> {
    u8::try_from(node.get_int()?).map_err(|_| Error::new(node, ErrorKind::BadValue, "out of range"))
}

fn word(node: &Setting) -> Result<u16, Error> {
    u16::try_from(node.get_int()?).map_err(|_| Error::new(node, ErrorKind::BadValue, "out of range"))
}

#[cfg(test)]
mod tests {
    use functionfs::{descs::Head, Format, Speed};

    use super::parse;
    use crate::{config::Config, error::ErrorKind};

    fn config(descriptors: &str) -> Config {
        Config::parse(&format!("descriptors = {{ {} }};", descriptors), "test.cfg").unwrap()
    }

    fn kind(descriptors: &str, str_count: usize) -> ErrorKind {
        parse(config(descriptors).root(), str_count, Format::V2)
            .unwrap_err()
            .kind()
    }

    const IFACE_AND_EP: &str = r#"(
        { type = "INTERFACE_DESC"; bInterfaceClass = "USB_CLASS_VENDOR_SPEC"; iInterface = 1; },
        { type = "EP_NO_AUDIO_DESC"; address = 1; direction = "in";
          bmAttributes = "USB_ENDPOINT_XFER_BULK"; }
    )"#;

    #[test]
    fn v1_full_speed() {
        let config = config(&format!("fs_desc = {};", IFACE_AND_EP));
        let image = parse(config.root(), 2, Format::V1).unwrap();

        let head = Head::parse(&image).unwrap();
        assert_eq!(head.format, Format::V1);
        assert_eq!(head.length as usize, image.len());
        assert_eq!(head.count(Speed::Full), Some(2));
        assert_eq!(head.count(Speed::High), Some(0));

        let iface = &image[16..25];
        assert_eq!(iface, [9, 4, 0, 0, 1, 0xff, 0, 0, 1]);

        let ep = &image[25..];
        assert_eq!(ep, [7, 5, 0x81, 0x02, 0, 0, 0]);
    }

    #[test]
    fn v2_speeds_follow_image_order() {
        // `hs_desc` is declared first but full-speed descriptors come first in the image
        let hs = IFACE_AND_EP.replace("USB_CLASS_VENDOR_SPEC", "USB_CLASS_HID");
        let config = config(&format!("hs_desc = {}; fs_desc = {};", hs, IFACE_AND_EP));
        let image = parse(config.root(), 1, Format::V2).unwrap();

        let head = Head::parse(&image).unwrap();
        assert_eq!(head.flags, Some(0b011));
        assert_eq!(head.counts, [(Speed::Full, 2), (Speed::High, 2)]);
        assert_eq!(image.len(), 20 + 2 * 16);

        assert_eq!(image[20 + 5], 0xff);
        assert_eq!(image[20 + 16 + 5], 0x03);
    }

    #[test]
    fn v2_super_speed() {
        let config = config(&format!("ss_desc = {};", IFACE_AND_EP));
        let head = Head::parse(&parse(config.root(), 1, Format::V2).unwrap()).unwrap();
        assert_eq!(head.flags, Some(0b100));
        assert_eq!(head.counts, [(Speed::Super, 2)]);
    }

    #[test]
    fn v1_super_speed() {
        let config = config(&format!("fs_desc = {0}; ss_desc = {0};", IFACE_AND_EP));
        let err = parse(config.root(), 1, Format::V1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotSupported);
        assert!(err.to_string().contains("ss_desc"));
    }

    #[test]
    fn endpoints_are_counted_per_interface() {
        let config = config(
            r#"fs_desc = (
                { type = "INTERFACE_DESC"; bInterfaceClass = 0xff; iInterface = 0; },
                { type = "EP_NO_AUDIO_DESC"; address = 1; direction = "in"; bmAttributes = 2; },
                { type = "EP_NO_AUDIO_DESC"; address = 2; direction = "out"; bmAttributes = 2; },
                { type = "INTERFACE_DESC"; bInterfaceClass = 0xff; bInterfaceSubClass = 7;
                  bInterfaceProtocol = 1; bAlternateSetting = 0; iInterface = 0; },
                { type = "EP_NO_AUDIO_DESC"; address = 3; direction = "in";
                  bmAttributes = "USB_ENDPOINT_XFER_INT"; wMaxPacketSize = 0x200; bInterval = 4; }
            );"#,
        );
        let image = parse(config.root(), 0, Format::V2).unwrap();
        let descs = &image[16..];

        assert_eq!(descs[..9], [9, 4, 0, 0, 2, 0xff, 0, 0, 0]);
        assert_eq!(descs[9..16], [7, 5, 0x81, 2, 0, 0, 0]);
        assert_eq!(descs[16..23], [7, 5, 0x02, 2, 0, 0, 0]);
        assert_eq!(descs[23..32], [9, 4, 1, 0, 1, 0xff, 7, 1, 0]);
        assert_eq!(descs[32..], [7, 5, 0x83, 3, 0x00, 0x02, 4]);
    }

    #[test]
    fn attribute_flags() {
        let config = config(
            r#"fs_desc = (
                { type = "INTERFACE_DESC"; bInterfaceClass = 0; iInterface = 0; },
                { type = "EP_NO_AUDIO_DESC"; address = 1; direction = "out";
                  bmAttributes = "USB_ENDPOINT_XFER_BULK | USB_ENDPOINT_MAX_ADJUSTABLE"; }
            );"#,
        );
        let image = parse(config.root(), 0, Format::V2).unwrap();
        assert_eq!(image[16 + 9 + 3], 0x82);
    }

    #[test]
    fn endpoint_before_interface() {
        let descriptors = r#"fs_desc = (
            { type = "EP_NO_AUDIO_DESC"; address = 1; direction = "in"; bmAttributes = 2; },
            { type = "INTERFACE_DESC"; bInterfaceClass = 0; iInterface = 0; }
        );"#;
        assert_eq!(kind(descriptors, 0), ErrorKind::Ordering);

        // even when the endpoint itself is incomplete
        let descriptors = r#"fs_desc = (
            { type = "EP_NO_AUDIO_DESC"; address = 1; direction = "in"; },
            { type = "INTERFACE_DESC"; bInterfaceClass = 0; iInterface = 0; }
        );"#;
        assert_eq!(kind(descriptors, 0), ErrorKind::Ordering);
    }

    #[test]
    fn string_index_out_of_range() {
        let descriptors = r#"fs_desc = (
            { type = "INTERFACE_DESC"; bInterfaceClass = 0; iInterface = 3; }
        );"#;
        assert_eq!(kind(descriptors, 2), ErrorKind::BadValue);

        // the last string is fine
        let config = config(&descriptors.replace("iInterface = 3", "iInterface = 2"));
        assert!(parse(config.root(), 2, Format::V2).is_ok());
    }

    #[test]
    fn missing_descriptors() {
        let config = Config::parse("strings = ();", "test.cfg").unwrap();
        let err = parse(config.root(), 0, Format::V2).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let config = Config::parse("descriptors = ();", "test.cfg").unwrap();
        let err = parse(config.root(), 0, Format::V2).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadValue);

        assert_eq!(kind("", 0), ErrorKind::Other);
    }

    #[test]
    fn bad_entries() {
        let entry = |fields: &str| format!("fs_desc = ({{ {} }});", fields);

        // entry types
        assert_eq!(kind("fs_desc = { };", 0), ErrorKind::BadValue);
        assert_eq!(kind("fs_desc = (1);", 0), ErrorKind::BadValue);
        assert_eq!(kind(&entry("bInterfaceClass = 0;"), 0), ErrorKind::NotFound);
        assert_eq!(
            kind(&entry("type = \"CONFIG_DESC\";"), 0),
            ErrorKind::UnsupportedDescriptorType
        );
        assert_eq!(kind(&entry("type = 4;"), 0), ErrorKind::BadValue);

        // interface fields
        let iface = |fields: &str| entry(&format!("type = \"INTERFACE_DESC\"; {}", fields));
        assert_eq!(kind(&iface("iInterface = 0;"), 0), ErrorKind::NotFound);
        assert_eq!(
            kind(&iface("bInterfaceClass = \"USB_CLASS_BOGUS\"; iInterface = 0;"), 0),
            ErrorKind::BadValue
        );
        assert_eq!(
            kind(&iface("bInterfaceClass = 256; iInterface = 0;"), 0),
            ErrorKind::BadValue
        );
        assert_eq!(
            kind(&iface("bInterfaceClass = 1.5; iInterface = 0;"), 0),
            ErrorKind::BadValue
        );
        assert_eq!(
            kind(
                &iface("bInterfaceClass = 2; bInterfaceSubClass = \"ACM\"; iInterface = 0;"),
                0
            ),
            ErrorKind::NotSupported
        );
        assert_eq!(
            kind(&iface("bInterfaceClass = 2; bInterfaceSubClass = -1; iInterface = 0;"), 0),
            ErrorKind::BadValue
        );
        assert_eq!(kind(&iface("bInterfaceClass = 2;"), 0), ErrorKind::NotFound);
        assert_eq!(
            kind(&iface("bInterfaceClass = 2; iInterface = \"1\";"), 1),
            ErrorKind::BadValue
        );

        // endpoint fields
        let ep = |fields: &str| {
            format!(
                "fs_desc = ({{ type = \"INTERFACE_DESC\"; bInterfaceClass = 0; iInterface = 0; }}, \
                 {{ type = \"EP_NO_AUDIO_DESC\"; {} }});",
                fields
            )
        };
        assert_eq!(
            kind(&ep("direction = \"in\"; bmAttributes = 2;"), 0),
            ErrorKind::NotFound
        );
        assert_eq!(
            kind(&ep("address = 128; direction = \"in\"; bmAttributes = 2;"), 0),
            ErrorKind::BadValue
        );
        assert_eq!(
            kind(&ep("address = 1; direction = \"up\"; bmAttributes = 2;"), 0),
            ErrorKind::BadValue
        );
        assert_eq!(
            kind(&ep("address = 1; bmAttributes = 2;"), 0),
            ErrorKind::NotFound
        );
        assert_eq!(
            kind(&ep("address = 1; direction = \"in\";"), 0),
            ErrorKind::NotFound
        );
        assert_eq!(
            kind(&ep("address = 1; direction = \"in\"; bmAttributes = 256;"), 0),
            ErrorKind::BadValue
        );
        assert_eq!(
            kind(&ep("address = 1; direction = \"in\"; bmAttributes = \"BULK\";"), 0),
            ErrorKind::BadValue
        );
        assert_eq!(
            kind(&ep("address = 1; direction = \"in\"; bmAttributes = true;"), 0),
            ErrorKind::BadValue
        );
        assert_eq!(
            kind(
                &ep("address = 1; direction = \"in\"; bmAttributes = 2; wMaxPacketSize = 65536;"),
                0
            ),
            ErrorKind::BadValue
        );
    }

    #[test]
    fn error_location() {
        let config = Config::parse(
            "descriptors = {\n\
               fs_desc = (\n\
                 { type = \"INTERFACE_DESC\";\n\
                   bInterfaceClass = 0;\n\
                   iInterface = 9; }\n\
               );\n\
             };\n",
            "ffs.cfg",
        )
        .unwrap();

        let err = parse(config.root(), 1, Format::V2).unwrap_err();
        assert_eq!(
            err.to_string(),
            "ffs.cfg:5: iInterface: String of this index does not exist"
        );
    }
}
