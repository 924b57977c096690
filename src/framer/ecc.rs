/*
    FluxFox
    https://github.com/dbalsom/fluxfox

    Copyright 2024 Daniel Balsom

    Permission is hereby granted, free of charge, to any person obtaining a
    copy of this software and associated documentation files (the “Software”),
    to deal in the Software without restriction, including without limitation
    the rights to use, copy, modify, merge, publish, distribute, sublicense,
    and/or sell copies of the Software, and to permit persons to whom the
    Software is furnished to do so, subject to the following conditions:

    The above copyright notice and this permission notice shall be included in
    all copies or substantial portions of the Software.

    THE SOFTWARE IS PROVIDED “AS IS”, WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
    IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
    FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
    AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
    LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
    FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
    DEALINGS IN THE SOFTWARE.

    --------------------------------------------------------------------------

    src/framer/ecc.rs

    Block ECC calculation.
*/

const CRC24_INIT: u32 = 0x00B7_04CE;
const CRC24_POLY: u32 = 0x0086_4CFB;

/// Calculate a CRC-24 (OpenPGP polynomial) over `data`.
/// A previous result may be passed as `start` to continue a running calculation.
pub fn crc24(data: &[u8], start: Option<u32>) -> u32 {
    let mut crc = start.unwrap_or(CRC24_INIT);
    for &byte in data {
        crc ^= (byte as u32) << 16;
        for _ in 0..8 {
            crc <<= 1;
            if crc & 0x0100_0000 != 0 {
                crc ^= CRC24_POLY;
            }
        }
    }
    crc & 0x00FF_FFFF
}

/// Return the 3 ECC bytes recorded after a block payload, most significant byte first.
pub fn block_ecc(payload: &[u8]) -> [u8; 3] {
    let crc = crc24(payload, None);
    [(crc >> 16) as u8, (crc >> 8) as u8, crc as u8]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc24_check_value() {
        assert_eq!(crc24(b"123456789", None), 0x21CF02);
    }

    #[test]
    fn test_crc24_continuation() {
        let whole = crc24(b"123456789", None);
        let partial = crc24(b"1234", None);
        assert_eq!(crc24(b"56789", Some(partial)), whole);
    }

    #[test]
    fn test_block_ecc_byte_order() {
        assert_eq!(block_ecc(b"123456789"), [0x21, 0xCF, 0x02]);
    }
}
