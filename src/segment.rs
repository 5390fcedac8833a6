//! The per-session segment model.
//!
//! A [`Segment`] stores header fields as the user entered them. Flags and
//! options are kept by name, so names outside the vocabulary survive editing
//! and display but have no effect on the encoded bytes.

use crate::error::{Error, Result};
use crate::net::options::build_tcp_options;
use crate::net::tcp::{build_flags, SimplifiedTcpHeader, SIMPLIFIED_HEADER_LEN};
use crate::types::{TcpFlag, FLAG_TABLE};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;

pub const DEFAULT_WINDOW_SIZE: u16 = 8192;
pub const DEFAULT_FLAG: &str = "SYN";
const LOWEST_SOURCE_PORT: u16 = 1024;
const MAX_RANDOM_TTL: u8 = 128;

/// Constructor input. Anything left `None` gets a random default.
#[derive(Debug, Clone, Default)]
pub struct SegmentParams {
    pub session_id: u32,
    pub destination_addresses: Vec<String>,
    pub source_address: Option<String>,
    pub source_link_address: Option<String>,
    pub source_port: Option<u16>,
    pub destination_port: Option<u16>,
    pub flags: Option<Vec<String>>,
    pub payload: Option<String>,
}

impl SegmentParams {
    pub fn new(session_id: u32, destination_addresses: Vec<String>) -> Self {
        SegmentParams {
            session_id,
            destination_addresses,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    session_id: u32,
    destination_addresses: Vec<String>,
    source_address: String,
    source_link_address: String,
    source_port: u16,
    destination_port: u16,
    flags: Vec<String>,
    payload: Option<String>,
    ttl: u8,
    window_size: u16,
    checksum_override: u16,
    options: Vec<String>,
}

pub fn generate_random_ip() -> String {
    let mut rng = rand::thread_rng();
    let octets: [u8; 4] = rng.gen();
    octets
        .iter()
        .map(|o| o.to_string())
        .collect::<Vec<_>>()
        .join(".")
}

pub fn generate_random_mac() -> String {
    let mut rng = rand::thread_rng();
    let octets: [u8; 6] = rng.gen();
    octets
        .iter()
        .map(|o| format!("{:02x}", o))
        .collect::<Vec<_>>()
        .join(":")
}

/// Keeps the first occurrence of each name, in order.
fn dedup_names(names: Vec<String>) -> Vec<String> {
    let mut seen = Vec::with_capacity(names.len());
    for name in names {
        if !seen.contains(&name) {
            seen.push(name);
        }
    }
    seen
}

impl Segment {
    /// Builds a segment. Empty strings and zero ports count as unset.
    pub fn new(params: SegmentParams) -> Self {
        let mut rng = rand::thread_rng();

        let source_address = params
            .source_address
            .filter(|s| !s.is_empty())
            .unwrap_or_else(generate_random_ip);
        let source_link_address = params
            .source_link_address
            .filter(|s| !s.is_empty())
            .unwrap_or_else(generate_random_mac);
        let source_port = params
            .source_port
            .filter(|&p| p != 0)
            .unwrap_or_else(|| rng.gen_range(LOWEST_SOURCE_PORT..=u16::MAX));
        let destination_port = params
            .destination_port
            .filter(|&p| p != 0)
            .unwrap_or_else(|| rng.gen_range(0..=u16::MAX));
        let flags = params
            .flags
            .map(dedup_names)
            .unwrap_or_else(|| vec![DEFAULT_FLAG.to_string()]);

        Segment {
            session_id: params.session_id,
            destination_addresses: params.destination_addresses,
            source_address,
            source_link_address,
            source_port,
            destination_port,
            flags,
            payload: params.payload,
            ttl: rng.gen_range(1..=MAX_RANDOM_TTL),
            window_size: DEFAULT_WINDOW_SIZE,
            checksum_override: 0,
            options: Vec::new(),
        }
    }

    pub fn session_id(&self) -> u32 {
        self.session_id
    }

    pub fn destination_addresses(&self) -> &[String] {
        &self.destination_addresses
    }

    /// The address `connect` dials.
    pub fn target(&self) -> Option<&str> {
        self.destination_addresses.first().map(String::as_str)
    }

    pub fn source_address(&self) -> &str {
        &self.source_address
    }

    pub fn source_link_address(&self) -> &str {
        &self.source_link_address
    }

    pub fn source_port(&self) -> u16 {
        self.source_port
    }

    pub fn destination_port(&self) -> u16 {
        self.destination_port
    }

    pub fn flags(&self) -> &[String] {
        &self.flags
    }

    pub fn payload(&self) -> Option<&str> {
        self.payload.as_deref()
    }

    pub fn ttl(&self) -> u8 {
        self.ttl
    }

    pub fn window_size(&self) -> u16 {
        self.window_size
    }

    pub fn checksum_override(&self) -> u16 {
        self.checksum_override
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn set_source_address(&mut self, source_address: String) {
        self.source_address = source_address;
    }

    pub fn set_source_link_address(&mut self, source_link_address: String) {
        self.source_link_address = source_link_address;
    }

    pub fn set_source_port(&mut self, source_port: u16) {
        self.source_port = source_port;
    }

    pub fn set_destination_port(&mut self, destination_port: u16) {
        self.destination_port = destination_port;
    }

    pub fn set_flags(&mut self, flags: Vec<String>) {
        self.flags = dedup_names(flags);
    }

    pub fn set_payload(&mut self, payload: String) {
        self.payload = Some(payload);
    }

    pub fn clear_payload(&mut self) {
        self.payload = None;
    }

    pub fn set_ttl(&mut self, ttl: u8) {
        self.ttl = ttl;
    }

    pub fn set_window_size(&mut self, window_size: u16) {
        self.window_size = window_size;
    }

    pub fn set_checksum(&mut self, checksum: u16) {
        self.checksum_override = checksum;
    }

    pub fn set_options(&mut self, options: Vec<String>) {
        self.options = options;
    }

    pub fn apply(&mut self, update: FieldUpdate) {
        match update {
            FieldUpdate::SetSourceAddress(v) => self.set_source_address(v),
            FieldUpdate::SetSourceLinkAddress(v) => self.set_source_link_address(v),
            FieldUpdate::SetSourcePort(v) => self.set_source_port(v),
            FieldUpdate::SetDestinationPort(v) => self.set_destination_port(v),
            FieldUpdate::SetFlags(v) => self.set_flags(v),
            FieldUpdate::SetPayload(v) => self.set_payload(v),
            FieldUpdate::SetTtl(v) => self.set_ttl(v),
            FieldUpdate::SetWindowSize(v) => self.set_window_size(v),
            FieldUpdate::SetChecksum(v) => self.set_checksum(v),
            FieldUpdate::SetOptions(v) => self.set_options(v),
        }
    }

    pub fn flags_byte(&self) -> u8 {
        build_flags(&self.flags)
    }

    pub fn encoded_options(&self) -> Vec<u8> {
        build_tcp_options(&self.options)
    }

    pub fn header(&self, sequence_number: u32) -> SimplifiedTcpHeader {
        SimplifiedTcpHeader {
            source_port: self.source_port,
            destination_port: self.destination_port,
            sequence_number,
            ack_number: 0,
            flags: self.flags_byte(),
            window: self.window_size,
            checksum_override: self.checksum_override,
            urgent_pointer: 0,
        }
    }

    /// Header, then options, then payload.
    pub fn encode_with_sequence(&self, sequence_number: u32) -> Result<Vec<u8>> {
        let payload = self.payload.as_deref().ok_or(Error::MissingPayload)?;
        let options = self.encoded_options();

        let mut buffer =
            Vec::with_capacity(SIMPLIFIED_HEADER_LEN + options.len() + payload.len());
        buffer.extend_from_slice(&self.header(sequence_number).pack());
        buffer.extend_from_slice(&options);
        buffer.extend_from_slice(payload.as_bytes());
        Ok(buffer)
    }

    /// Encodes with a fresh random sequence number.
    pub fn encode(&self) -> Result<Vec<u8>> {
        self.encode_with_sequence(rand::thread_rng().gen())
    }

    /// Encodes and writes the segment to `conn` in one call. Returns the
    /// number of bytes written. Nothing is written when encoding fails.
    pub fn encode_and_send<W: Write>(&self, conn: &mut W) -> Result<usize> {
        let segment = self.encode()?;
        conn.write_all(&segment)?;
        conn.flush()?;
        Ok(segment.len())
    }
}

/// The fixed flag table, ordinal to flag.
pub fn flag_table() -> &'static [TcpFlag; 8] {
    &FLAG_TABLE
}

/// Flag table as shown in menus, numbered from 1.
pub fn format_flag_table() -> String {
    flag_table()
        .iter()
        .enumerate()
        .map(|(i, flag)| format!("{} - {}\n", i + 1, flag))
        .collect()
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "TCP Packet:")?;
        writeln!(f, "Session ID: {}", self.session_id)?;
        writeln!(f, "Source IP: {}", self.source_address)?;
        writeln!(f, "Destination IPs: {}", self.destination_addresses.join(", "))?;
        writeln!(f, "Source MAC: {}", self.source_link_address)?;
        writeln!(f, "Source Port: {}", self.source_port)?;
        writeln!(f, "Destination Port: {}", self.destination_port)?;
        writeln!(f, "Flags: [{}]", self.flags.join(", "))?;
        match &self.payload {
            Some(payload) => writeln!(f, "Data: {}", payload)?,
            None => writeln!(f, "Data: None")?,
        }
        writeln!(f, "TTL: {}", self.ttl)?;
        writeln!(f, "Window Size: {}", self.window_size)?;
        writeln!(f, "Checksum: {}", self.checksum_override)?;
        write!(f, "TCP Options: [{}]", self.options.join(", "))
    }
}

/// Menu fields an interactive edit can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    SourceAddress,
    SourceLinkAddress,
    SourcePort,
    DestinationPort,
    Flags,
    Payload,
    Ttl,
    WindowSize,
    Checksum,
    Options,
}

impl Field {
    pub const ALL: [Field; 10] = [
        Field::SourceAddress,
        Field::SourceLinkAddress,
        Field::SourcePort,
        Field::DestinationPort,
        Field::Flags,
        Field::Payload,
        Field::Ttl,
        Field::WindowSize,
        Field::Checksum,
        Field::Options,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Field::SourceAddress => "Source IP",
            Field::SourceLinkAddress => "Source MAC",
            Field::SourcePort => "Source Port",
            Field::DestinationPort => "Destination Port",
            Field::Flags => "Flags",
            Field::Payload => "Data",
            Field::Ttl => "TTL",
            Field::WindowSize => "Window Size",
            Field::Checksum => "Checksum",
            Field::Options => "TCP Options",
        }
    }

    /// Field for a 1-based menu number.
    pub fn from_menu(choice: usize) -> Option<Field> {
        choice.checked_sub(1).and_then(|i| Field::ALL.get(i).copied())
    }

    fn key(self) -> &'static str {
        match self {
            Field::SourceAddress => "source_address",
            Field::SourceLinkAddress => "source_link_address",
            Field::SourcePort => "source_port",
            Field::DestinationPort => "destination_port",
            Field::Flags => "flags",
            Field::Payload => "payload",
            Field::Ttl => "ttl",
            Field::WindowSize => "window_size",
            Field::Checksum => "checksum",
            Field::Options => "options",
        }
    }
}

/// A validated change to one segment field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldUpdate {
    SetSourceAddress(String),
    SetSourceLinkAddress(String),
    SetSourcePort(u16),
    SetDestinationPort(u16),
    SetFlags(Vec<String>),
    SetPayload(String),
    SetTtl(u8),
    SetWindowSize(u16),
    SetChecksum(u16),
    SetOptions(Vec<String>),
}

fn parse_number<T: std::str::FromStr>(field: Field, raw: &str) -> Result<T> {
    raw.trim().parse().map_err(|_| Error::InvalidFieldValue {
        field: field.key(),
        value: raw.to_string(),
    })
}

fn split_names(raw: &str) -> Vec<String> {
    raw.split_whitespace().map(str::to_string).collect()
}

impl FieldUpdate {
    /// Parses raw menu input for `field`. Numbers must fit the field's width.
    pub fn parse(field: Field, raw: &str) -> Result<FieldUpdate> {
        let update = match field {
            Field::SourceAddress => FieldUpdate::SetSourceAddress(raw.trim().to_string()),
            Field::SourceLinkAddress => {
                FieldUpdate::SetSourceLinkAddress(raw.trim().to_string())
            }
            Field::SourcePort => FieldUpdate::SetSourcePort(parse_number(field, raw)?),
            Field::DestinationPort => {
                FieldUpdate::SetDestinationPort(parse_number(field, raw)?)
            }
            Field::Flags => FieldUpdate::SetFlags(split_names(raw)),
            Field::Payload => FieldUpdate::SetPayload(raw.to_string()),
            Field::Ttl => FieldUpdate::SetTtl(parse_number(field, raw)?),
            Field::WindowSize => FieldUpdate::SetWindowSize(parse_number(field, raw)?),
            Field::Checksum => FieldUpdate::SetChecksum(parse_number(field, raw)?),
            Field::Options => FieldUpdate::SetOptions(split_names(raw)),
        };
        Ok(update)
    }
}
