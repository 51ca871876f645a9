//! CRC-16/USB adapter.
//!
//! Wraps the `crc` crate's catalog entry for CRC-16/USB (poly 0x8005, init
//! 0xFFFF, reflected in/out, final XOR 0xFFFF) so the rest of the crate never
//! has to know the parameter set.

use crc::{Crc, CRC_16_USB};

const USB: Crc<u16> = Crc::<u16>::new(&CRC_16_USB);

/// Computes CRC-16/USB over `bytes`.
#[inline]
pub fn crc16_usb(bytes: &[u8]) -> u16 {
    USB.checksum(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_vector() {
        // "123456789" is the standard CRC catalog check string.
        assert_eq!(crc16_usb(b"123456789"), 0xB4C8);
    }

    #[test]
    fn empty_input() {
        // init 0xFFFF, final XOR 0xFFFF -> 0x0000 for zero bytes consumed.
        assert_eq!(crc16_usb(b""), 0x0000);
    }
}
