//! Interface descriptors

use crate::DescriptorType;

/// Interface Descriptor
#[allow(non_snake_case)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Desc {
    // pub bLength: u8,
    // pub bDescriptorType: u8,
    /// Interface number; assigned by `Stream::push`
    pub bInterfaceNumber: u8,
    /// Alternate setting
    pub bAlternateSetting: u8,
    /// Number of endpoints; accumulated by `Stream::push`
    pub bNumEndpoints: u8,
    /// Interface class
    pub bInterfaceClass: u8,
    /// Interface subclass
    pub bInterfaceSubClass: u8,
    /// Interface protocol
    pub bInterfaceProtocol: u8,
    /// Interface string descriptor index
    pub iInterface: u8,
}

impl Desc {
    /// The size of this descriptor in bytes
    pub const SIZE: u8 = 9;

    /// Returns the byte representation of this descriptor
    pub fn bytes(&self) -> [u8; Self::SIZE as usize] {
        [
            Self::SIZE,
            DescriptorType::INTERFACE as u8,
            self.bInterfaceNumber,
            self.bAlternateSetting,
            self.bNumEndpoints,
            self.bInterfaceClass,
            self.bInterfaceSubClass,
            self.bInterfaceProtocol,
            self.iInterface,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::Desc;

    #[test]
    fn bytes() {
        let desc = Desc {
            bInterfaceNumber: 1,
            bAlternateSetting: 0,
            bNumEndpoints: 2,
            bInterfaceClass: 0xff,
            bInterfaceSubClass: 0x42,
            bInterfaceProtocol: 1,
            iInterface: 3,
        };

        assert_eq!(desc.bytes(), [9, 4, 1, 0, 2, 0xff, 0x42, 1, 3]);
    }
}
