use crate::types::TcpFlag;

/// Length of the packed simplified header, options excluded.
pub const SIMPLIFIED_HEADER_LEN: usize = 20;

/// A TCP header with a single flags byte and no data offset.
///
/// The layout lines up with a real TCP header byte for byte, except that
/// byte 12 (data offset and reserved bits) is always zero. Options are
/// appended unaligned, so a receiving stack cannot locate the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimplifiedTcpHeader {
    /// Source port (16 bits)
    pub source_port: u16,
    /// Destination port (16 bits)
    pub destination_port: u16,
    /// Sequence number (32 bits)
    pub sequence_number: u32,
    /// Acknowledgment number (32 bits)
    pub ack_number: u32,
    /// Control flags, bit i = flag ordinal i
    pub flags: u8,
    /// Window size (16 bits)
    pub window: u16,
    /// Caller-supplied checksum, written as is
    pub checksum_override: u16,
    /// Urgent pointer (16 bits)
    pub urgent_pointer: u16,
}

impl SimplifiedTcpHeader {
    pub fn pack(&self) -> [u8; SIMPLIFIED_HEADER_LEN] {
        let mut buffer = [0u8; SIMPLIFIED_HEADER_LEN];

        buffer[0..2].copy_from_slice(&self.source_port.to_be_bytes());
        buffer[2..4].copy_from_slice(&self.destination_port.to_be_bytes());
        buffer[4..8].copy_from_slice(&self.sequence_number.to_be_bytes());
        buffer[8..12].copy_from_slice(&self.ack_number.to_be_bytes());
        // buffer[12] stays zero: no data offset.
        buffer[13] = self.flags;
        buffer[14..16].copy_from_slice(&self.window.to_be_bytes());
        buffer[16..18].copy_from_slice(&self.checksum_override.to_be_bytes());
        buffer[18..20].copy_from_slice(&self.urgent_pointer.to_be_bytes());

        buffer
    }
}

/// Folds flag names into a flags byte. Names outside the vocabulary are
/// ignored.
pub fn build_flags<S: AsRef<str>>(flags: &[S]) -> u8 {
    flags
        .iter()
        .filter_map(|name| TcpFlag::from_name(name.as_ref()))
        .fold(0u8, |acc, flag| acc | flag.bit())
}

/// Inverse of [`build_flags`]: the flags present in `byte`, in ordinal order.
pub fn decode_flags(byte: u8) -> Vec<TcpFlag> {
    crate::types::FLAG_TABLE
        .iter()
        .copied()
        .filter(|flag| byte & flag.bit() != 0)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FLAG_TABLE;
    use pnet_packet::tcp::TcpPacket;

    #[test]
    fn syn_ack_is_0x12() {
        assert_eq!(build_flags(&["SYN", "ACK"]), 0x12);
        assert_eq!(build_flags(&["ACK", "SYN", "SYN"]), 0x12);
    }

    #[test]
    fn unknown_flags_set_no_bits() {
        assert_eq!(build_flags(&["NS", "syn", ""]), 0);
        assert_eq!(build_flags(&["BOGUS", "FIN"]), 0x01);
        assert_eq!(build_flags::<&str>(&[]), 0);
    }

    #[test]
    fn every_flag_subset_decodes_back() {
        for mask in 0u16..256 {
            let subset: Vec<&str> = FLAG_TABLE
                .iter()
                .filter(|f| mask & (1 << f.ordinal()) != 0)
                .map(|f| f.name())
                .collect();
            let byte = build_flags(&subset);
            assert_eq!(byte as u16, mask);
            let decoded: Vec<&str> = decode_flags(byte).iter().map(|f| f.name()).collect();
            assert_eq!(decoded, subset);
        }
    }

    #[test]
    fn pack_places_fields_at_tcp_offsets() {
        let header = SimplifiedTcpHeader {
            source_port: 53066,
            destination_port: 9229,
            sequence_number: 0x0c08a8b4,
            ack_number: 0,
            flags: 0x02,
            window: 65535,
            checksum_override: 0xfe34,
            urgent_pointer: 0,
        };

        let expected: [u8; SIMPLIFIED_HEADER_LEN] = [
            0xcf, 0x4a, // Source Port (53066)
            0x24, 0x0d, // Destination Port (9229)
            0x0c, 0x08, 0xa8, 0xb4, // Sequence Number
            0x00, 0x00, 0x00, 0x00, // Ack Number
            0x00, // no data offset
            0x02, // Flags: SYN only
            0xff, 0xff, // Window (65535)
            0xfe, 0x34, // Checksum
            0x00, 0x00, // Urgent Pointer
        ];
        let packed = header.pack();
        assert_eq!(packed, expected);

        let tcp = TcpPacket::new(&packed).expect("20 bytes is a full tcp header");
        assert_eq!(tcp.get_source(), 53066);
        assert_eq!(tcp.get_destination(), 9229);
        assert_eq!(tcp.get_sequence(), 0x0c08a8b4);
        assert_eq!(tcp.get_acknowledgement(), 0);
        assert_eq!(tcp.get_data_offset(), 0);
        assert_eq!(tcp.get_flags() as u8, 0x02);
        assert_eq!(tcp.get_window(), 65535);
        assert_eq!(tcp.get_checksum(), 0xfe34);
        assert_eq!(tcp.get_urgent_ptr(), 0);
    }
}
