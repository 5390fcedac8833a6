use pnet_packet::tcp::{TcpFlags, TcpOptionNumbers};
use std::fmt;

/// TCP control bits, in ordinal order. The ordinal is the bit index in the
/// encoded flags byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TcpFlag {
    Fin, // Finish
    Syn, // Synchronize
    Rst, // Reset
    Psh, // Push
    Ack, // Acknowledgment
    Urg, // Urgent
    Ece, // ECN-Echo
    Cwr, // Congestion Window Reduced
}

/// Fixed flag vocabulary, indexed by ordinal.
pub const FLAG_TABLE: [TcpFlag; 8] = [
    TcpFlag::Fin,
    TcpFlag::Syn,
    TcpFlag::Rst,
    TcpFlag::Psh,
    TcpFlag::Ack,
    TcpFlag::Urg,
    TcpFlag::Ece,
    TcpFlag::Cwr,
];

impl TcpFlag {
    pub fn name(self) -> &'static str {
        match self {
            TcpFlag::Fin => "FIN",
            TcpFlag::Syn => "SYN",
            TcpFlag::Rst => "RST",
            TcpFlag::Psh => "PSH",
            TcpFlag::Ack => "ACK",
            TcpFlag::Urg => "URG",
            TcpFlag::Ece => "ECE",
            TcpFlag::Cwr => "CWR",
        }
    }

    /// Looks up a flag by its exact upper-case name.
    pub fn from_name(name: &str) -> Option<TcpFlag> {
        FLAG_TABLE.iter().copied().find(|f| f.name() == name)
    }

    pub fn ordinal(self) -> usize {
        self as usize
    }

    /// Bit for this flag in the flags byte (`1 << ordinal`).
    pub fn bit(self) -> u8 {
        let bit = match self {
            TcpFlag::Fin => TcpFlags::FIN,
            TcpFlag::Syn => TcpFlags::SYN,
            TcpFlag::Rst => TcpFlags::RST,
            TcpFlag::Psh => TcpFlags::PSH,
            TcpFlag::Ack => TcpFlags::ACK,
            TcpFlag::Urg => TcpFlags::URG,
            TcpFlag::Ece => TcpFlags::ECE,
            TcpFlag::Cwr => TcpFlags::CWR,
        };
        bit as u8
    }
}

impl fmt::Display for TcpFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// TCP options this tool knows how to encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TcpOptionKind {
    /// Maximum segment size, always advertised as [`DEFAULT_MSS`].
    Mss,
    /// No-operation, a single kind byte.
    Nop,
    /// Window scale, always advertised with [`DEFAULT_WINDOW_SHIFT`].
    WindowScale,
}

pub const DEFAULT_MSS: u16 = 1460;
pub const DEFAULT_WINDOW_SHIFT: u8 = 7;

impl TcpOptionKind {
    pub fn from_name(name: &str) -> Option<TcpOptionKind> {
        match name {
            "MSS" => Some(TcpOptionKind::Mss),
            "NOP" => Some(TcpOptionKind::Nop),
            "WS" => Some(TcpOptionKind::WindowScale),
            _ => None,
        }
    }

    pub fn kind(self) -> u8 {
        match self {
            TcpOptionKind::Mss => TcpOptionNumbers::MSS.0,
            TcpOptionKind::Nop => TcpOptionNumbers::NOP.0,
            TcpOptionKind::WindowScale => TcpOptionNumbers::WSCALE.0,
        }
    }

    /// Encoded length in bytes, kind byte included.
    pub fn encoded_len(self) -> usize {
        match self {
            TcpOptionKind::Mss => 4,
            TcpOptionKind::Nop => 1,
            TcpOptionKind::WindowScale => 3,
        }
    }
}
