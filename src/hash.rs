//! Command transforms for sensors that checksum their command bytes.
//!
//! Sensirion parts (SGP30, SCD30, SHT3x, ...) protect every 16-bit word on
//! the wire with a CRC-8 (polynomial 0x31, initial value 0xFF).

const CRC8_POLYNOMIAL: u8 = 0x31;
const CRC8_INIT: u8 = 0xff;

/// Sensirion CRC-8 over `data`.
#[must_use]
pub fn crc8(data: &[u8]) -> u8 {
    data.iter().fold(CRC8_INIT, |crc, &byte| {
        (0..8).fold(crc ^ byte, |crc, _| {
            if crc & 0x80 != 0 {
                (crc << 1) ^ CRC8_POLYNOMIAL
            } else {
                crc << 1
            }
        })
    })
}

/// Appends a single CRC-8 of the whole payload.
pub fn append_crc8(command: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(command.len() + 1);
    out.extend_from_slice(command);
    out.push(crc8(command));
    out
}

/// Frames a command with arguments: the leading 16-bit command word is sent
/// as-is, and each following 16-bit argument word is followed by its CRC-8.
///
/// A trailing odd byte is sent without a checksum.
pub fn sensirion_args(command: &[u8]) -> Vec<u8> {
    let split = command.len().min(2);
    let (opcode, args) = command.split_at(split);

    let mut out = Vec::with_capacity(command.len() + args.len() / 2);
    out.extend_from_slice(opcode);
    for word in args.chunks(2) {
        out.extend_from_slice(word);
        if word.len() == 2 {
            out.push(crc8(word));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crc8_check_value() {
        // from the SGP30 and SCD30 datasheets
        assert_eq!(crc8(&[0xbe, 0xef]), 0x92);
        assert_eq!(crc8(&[]), 0xff);
    }

    #[test]
    fn append() {
        assert_eq!(append_crc8(&[0xbe, 0xef]), vec![0xbe, 0xef, 0x92]);
    }

    #[test]
    fn args_are_checksummed_per_word() {
        // SGP30 "set humidity" with a 0xBEEF argument
        assert_eq!(
            sensirion_args(&[0x20, 0x61, 0xbe, 0xef]),
            vec![0x20, 0x61, 0xbe, 0xef, 0x92]
        );
        // no arguments: unchanged
        assert_eq!(sensirion_args(&[0x20, 0x08]), vec![0x20, 0x08]);
    }
}
