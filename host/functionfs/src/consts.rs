//! Symbolic names of descriptor field values, as spelled in `linux/usb/ch9.h`

macro_rules! named_consts {
    ($table:ident { $($ident:ident = $expr:expr,)+ }) => {
        $(pub const $ident: u32 = $expr;)+

        /// Name to value table
        pub const $table: &[(&str, u32)] = &[$((stringify!($ident), $ident),)+];
    }
}

named_consts!(INTERFACE_CLASSES {
    USB_CLASS_PER_INTERFACE = 0,
    USB_CLASS_AUDIO = 1,
    USB_CLASS_COMM = 2,
    USB_CLASS_HID = 3,
    USB_CLASS_PHYSICAL = 5,
    USB_CLASS_STILL_IMAGE = 6,
    USB_CLASS_PRINTER = 7,
    USB_CLASS_MASS_STORAGE = 8,
    USB_CLASS_HUB = 9,
    USB_CLASS_CDC_DATA = 0x0a,
    USB_CLASS_CSCID = 0x0b,
    USB_CLASS_CONTENT_SEC = 0x0d,
    USB_CLASS_VIDEO = 0x0e,
    USB_CLASS_WIRELESS_CONTROLLER = 0xe0,
    USB_CLASS_MISC = 0xef,
    USB_CLASS_APP_SPEC = 0xfe,
    USB_CLASS_VENDOR_SPEC = 0xff,
});

named_consts!(ENDPOINT_ATTRIBUTES {
    USB_ENDPOINT_XFER_ISOC = 1,
    USB_ENDPOINT_XFER_BULK = 2,
    USB_ENDPOINT_XFER_INT = 3,
    USB_ENDPOINT_MAX_ADJUSTABLE = 0x80,
});

/// Looks up `name` in `table`
///
/// Names are matched in full and case-sensitively
pub fn lookup(table: &[(&str, u32)], name: &str) -> Option<u32> {
    table
        .iter()
        .find(|(key, _)| *key == name)
        .map(|(_, value)| *value)
}

#[cfg(test)]
mod tests {
    use super::{lookup, ENDPOINT_ATTRIBUTES, INTERFACE_CLASSES};

    #[test]
    fn exact_match() {
        assert_eq!(lookup(INTERFACE_CLASSES, "USB_CLASS_HID"), Some(3));
        assert_eq!(
            lookup(INTERFACE_CLASSES, "USB_CLASS_VENDOR_SPEC"),
            Some(0xff)
        );
        assert_eq!(
            lookup(ENDPOINT_ATTRIBUTES, "USB_ENDPOINT_MAX_ADJUSTABLE"),
            Some(0x80)
        );

        // prefixes, extensions and other cases don't match
        assert_eq!(lookup(INTERFACE_CLASSES, "USB_CLASS_HI"), None);
        assert_eq!(lookup(INTERFACE_CLASSES, "USB_CLASS_HIDX"), None);
        assert_eq!(lookup(INTERFACE_CLASSES, "usb_class_hid"), None);
        assert_eq!(lookup(ENDPOINT_ATTRIBUTES, "USB_CLASS_HID"), None);
    }
}
