//! GTP-U (GPRS Tunnelling Protocol, user plane, version 1) header encoding.
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |  Ver  |PT |(*)|E|S|PN|  Message Type  |        Length         |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                              TEID                             |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |    Sequence Number (opt)      |  N-PDU (opt)  | Next Ext (opt)|
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! The length field counts every byte after the first 8, optional fields included.

/// Standard UDP port of GTP-U
pub const GTPU_PORT: u16 = 2152;
pub const GTPU_MANDATORY_SIZE: usize = 8;
pub const GTPU_OPTIONAL_SIZE: usize = 4;

const FLAG_PROTOCOL_TYPE: u8 = 0b0001_0000;
const FLAG_SEQUENCE: u8 = 0b0000_0010;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GtpuHeader {
    pub version: u8,
    pub protocol_type: bool, // true: GTP, false: GTP'
    pub message_type: u8,
    pub sequence_number_flag: bool,
    pub teid: u32,
    pub sequence_number: u16,
    pub message_length: u16,
}

impl Default for GtpuHeader {
    fn default() -> Self {
        GtpuHeader {
            version: 1,
            protocol_type: true,
            message_type: 1,
            sequence_number_flag: true,
            teid: 0,
            sequence_number: 0xAAAA,
            message_length: 4,
        }
    }
}

impl GtpuHeader {
    pub fn header_len(&self) -> usize {
        if self.sequence_number_flag {
            GTPU_MANDATORY_SIZE + GTPU_OPTIONAL_SIZE
        } else {
            GTPU_MANDATORY_SIZE
        }
    }

    /// Value of the length field for a header followed by `payload_len` bytes.
    pub fn derived_length(&self, payload_len: usize) -> usize {
        self.header_len() - GTPU_MANDATORY_SIZE + payload_len
    }

    fn first_octet(&self) -> u8 {
        let mut octet = (self.version & 0b111) << 5;
        if self.protocol_type {
            octet |= FLAG_PROTOCOL_TYPE;
        }
        if self.sequence_number_flag {
            octet |= FLAG_SEQUENCE;
        }
        octet
    }

    /// Writes the header at the start of `buf`, which must be at least `header_len()` long,
    /// with `length` in the length field.
    pub fn write_to(&self, buf: &mut [u8], length: u16) {
        buf[0] = self.first_octet();
        buf[1] = self.message_type;
        buf[2..4].copy_from_slice(&length.to_be_bytes());
        buf[4..8].copy_from_slice(&self.teid.to_be_bytes());
        if self.sequence_number_flag {
            buf[8..10].copy_from_slice(&self.sequence_number.to_be_bytes());
            buf[10] = 0; // N-PDU number
            buf[11] = 0; // no extension header
        }
    }
}
