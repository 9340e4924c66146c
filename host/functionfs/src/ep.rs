//! Endpoints

use crate::{DescriptorType, Direction};

/// Endpoint Descriptor, without the audio extension (`bRefresh`, `bSynchAddress`)
#[allow(non_snake_case)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Desc {
    // pub bLength: u8,
    // pub bDescriptorType: u8,
    /// Endpoint address
    pub bEndpointAddress: Address,
    /// Attributes: transfer type plus `USB_ENDPOINT_MAX_ADJUSTABLE`
    pub bmAttributes: u8,
    /// Maximum packet size
    pub wMaxPacketSize: u16,
    /// Polling interval
    pub bInterval: u8,
}

impl Desc {
    /// The size of this descriptor on the wire
    pub const SIZE: u8 = 7;

    /// Returns the wire representation of this descriptor
    pub fn bytes(&self) -> [u8; Self::SIZE as usize] {
        [
            Self::SIZE,
            DescriptorType::ENDPOINT as u8,
            self.bEndpointAddress.byte(),
            self.bmAttributes,
            self.wMaxPacketSize as u8,
            (self.wMaxPacketSize >> 8) as u8,
            self.bInterval,
        ]
    }
}

/// Endpoint address
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Address {
    /// Endpoint number; must be less than `1 << 7`
    pub number: u8,
    /// Endpoint direction
    pub direction: Direction,
}

impl Address {
    pub fn byte(&self) -> u8 {
        (self.number & 0x7f) | (self.direction as u8) << 7
    }
}

impl Default for Address {
    fn default() -> Self {
        Address {
            number: 0,
            direction: Direction::OUT,
        }
    }
}
