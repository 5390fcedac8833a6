//! Command handlers behind the CLI.
//!
//! Each handler works on an explicitly passed registry and writes its user
//! facing output to `out`. An unknown session prints
//! `Session {id} does not exist.` and counts as handled.

use std::io::{BufRead, Write};
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::ConnectConfig;
use crate::error::{Error, Result};
use crate::hextools::format_segment_dump;
use crate::net::connect::exchange;
use crate::net::tcp::SIMPLIFIED_HEADER_LEN;
use crate::registry::SessionRegistry;
use crate::segment::{format_flag_table, Field, FieldUpdate, Segment, SegmentParams};

const EXIT_CHOICE: usize = Field::ALL.len() + 1;

/// Repetition settings shared by `send` and `test`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayLoop {
    pub num_packets: u32,
    pub delay: Duration,
}

impl Default for DisplayLoop {
    fn default() -> Self {
        DisplayLoop {
            num_packets: 1,
            delay: Duration::from_secs(1),
        }
    }
}

/// Turns a session miss into the user-facing message.
fn report_missing<W: Write>(result: Result<()>, out: &mut W) -> Result<()> {
    match result {
        Err(Error::SessionNotFound(id)) => {
            writeln!(out, "Session {} does not exist.", id)?;
            Ok(())
        }
        other => other,
    }
}

pub fn create<W: Write>(
    registry: &mut SessionRegistry,
    session_id: u32,
    targets: Vec<String>,
    out: &mut W,
) -> Result<()> {
    let segment = registry.create(SegmentParams::new(session_id, targets));
    writeln!(out, "{}", segment)?;
    Ok(())
}

fn print_menu<W: Write>(out: &mut W) -> Result<()> {
    writeln!(out, "\nWhat would you like to modify?")?;
    for (i, field) in Field::ALL.iter().enumerate() {
        writeln!(out, "{} - {}", i + 1, field.label())?;
    }
    writeln!(out, "{} - Exit", EXIT_CHOICE)?;
    Ok(())
}

/// Reads one line without its line ending. `None` at end of input.
fn prompt<R: BufRead, W: Write>(input: &mut R, out: &mut W, text: &str) -> Result<Option<String>> {
    write!(out, "{}", text)?;
    out.flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    let trimmed = line.trim_end_matches(['\r', '\n']).len();
    line.truncate(trimmed);
    Ok(Some(line))
}

fn prompt_text(field: Field) -> &'static str {
    match field {
        Field::SourceAddress => "Enter the new source IP: ",
        Field::SourceLinkAddress => "Enter the new source MAC: ",
        Field::SourcePort => "Enter the new source port: ",
        Field::DestinationPort => "Enter the new destination port: ",
        Field::Flags => "Enter the new flags (separated by space): ",
        Field::Payload => "Enter the new data: ",
        Field::Ttl => "Enter the new TTL value: ",
        Field::WindowSize => "Enter the new window size: ",
        Field::Checksum => "Enter the new checksum: ",
        Field::Options => "Enter the new TCP options (separated by space): ",
    }
}

/// Interactive edit loop over one segment. Ends on the exit choice or at
/// end of input.
pub fn edit_segment<R: BufRead, W: Write>(
    segment: &mut Segment,
    input: &mut R,
    out: &mut W,
) -> Result<()> {
    print_menu(out)?;

    while let Some(choice) = prompt(input, out, "Enter your choice: ")? {
        let field = match choice.trim().parse::<usize>() {
            Ok(EXIT_CHOICE) => break,
            Ok(n) => Field::from_menu(n),
            Err(_) => None,
        };
        let Some(field) = field else {
            writeln!(out, "Invalid choice. Please try again.")?;
            continue;
        };

        if field == Field::Flags {
            writeln!(out, "Available flags:")?;
            write!(out, "{}", format_flag_table())?;
        }
        let Some(raw) = prompt(input, out, prompt_text(field))? else {
            break;
        };

        match FieldUpdate::parse(field, &raw) {
            Ok(update) => {
                debug!(?update, "applying field update");
                segment.apply(update);
                writeln!(out, "{}", segment)?;
            }
            Err(err @ Error::InvalidFieldValue { .. }) => {
                writeln!(out, "{}. Please try again.", err)?;
            }
            Err(err) => return Err(err),
        }
    }
    Ok(())
}

pub fn modify<R: BufRead, W: Write>(
    registry: &mut SessionRegistry,
    session_id: u32,
    input: &mut R,
    out: &mut W,
) -> Result<()> {
    let result = registry
        .get_mut(session_id)
        .and_then(|segment| edit_segment(segment, input, out));
    report_missing(result, out)
}

/// Prints the segment, plus a hexdump of one encoding when it has a payload.
fn display_segment<W: Write>(segment: &Segment, out: &mut W) -> Result<()> {
    writeln!(out, "{}", segment)?;
    match segment.encode() {
        Ok(bytes) => {
            let options_len = segment.encoded_options().len();
            write!(
                out,
                "{}",
                format_segment_dump(&bytes, SIMPLIFIED_HEADER_LEN, options_len)
            )?;
        }
        Err(Error::MissingPayload) => debug!("no payload, skipping hexdump"),
        Err(err) => return Err(err),
    }
    Ok(())
}

fn display_loop<W: Write>(
    registry: &SessionRegistry,
    session_id: u32,
    settings: DisplayLoop,
    verb: (&str, &str),
    out: &mut W,
) -> Result<()> {
    let result = registry.get(session_id).and_then(|segment| {
        writeln!(out, "\n{} {} packets:", verb.0, settings.num_packets)?;
        for round in 0..settings.num_packets {
            display_segment(segment, out)?;
            if round + 1 < settings.num_packets {
                thread::sleep(settings.delay);
            }
        }
        writeln!(out, "\n{}", verb.1)?;
        Ok(())
    });
    report_missing(result, out)
}

/// Display-only: shows the segment `num_packets` times without touching the
/// network.
pub fn send<W: Write>(
    registry: &SessionRegistry,
    session_id: u32,
    settings: DisplayLoop,
    out: &mut W,
) -> Result<()> {
    display_loop(
        registry,
        session_id,
        settings,
        ("Sending", "Packets sent successfully!"),
        out,
    )
}

/// Same display loop as [`send`].
pub fn test<W: Write>(
    registry: &SessionRegistry,
    session_id: u32,
    settings: DisplayLoop,
    out: &mut W,
) -> Result<()> {
    display_loop(
        registry,
        session_id,
        settings,
        ("Testing", "Testing completed!"),
        out,
    )
}

/// Sends the segment to its first destination and prints the reply.
pub fn connect<W: Write>(
    registry: &SessionRegistry,
    session_id: u32,
    config: &ConnectConfig,
    out: &mut W,
) -> Result<()> {
    let result = registry.get(session_id).and_then(|segment| {
        writeln!(out, "\nCreating a connection...")?;
        let response = exchange(segment, config)?;
        let target = segment.target().unwrap_or_default();
        if response.is_empty() {
            warn!(peer = target, "peer sent no response");
        }
        writeln!(
            out,
            "\nReceived response from {}:\n{}",
            target,
            String::from_utf8_lossy(&response)
        )?;
        writeln!(out, "\nConnection established!")?;
        Ok(())
    });
    report_missing(result, out)
}

pub fn list<W: Write>(registry: &SessionRegistry, out: &mut W) -> Result<()> {
    if registry.is_empty() {
        writeln!(out, "No sessions.")?;
        return Ok(());
    }
    for segment in registry.iter() {
        writeln!(
            out,
            "{}\t{}:{}\t[{}]",
            segment.session_id(),
            segment.destination_addresses().join(","),
            segment.destination_port(),
            segment.flags().join(" ")
        )?;
    }
    Ok(())
}

pub fn show<W: Write>(registry: &SessionRegistry, session_id: u32, out: &mut W) -> Result<()> {
    let result = registry
        .get(session_id)
        .and_then(|segment| Ok(writeln!(out, "{}", segment)?));
    report_missing(result, out)
}

pub fn flags<W: Write>(out: &mut W) -> Result<()> {
    write!(out, "{}", format_flag_table())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn registry_with(id: u32) -> SessionRegistry {
        let mut registry = SessionRegistry::new("unused.bin");
        registry.create(SegmentParams::new(id, vec!["10.0.0.5".into()]));
        registry
    }

    fn output(buf: Vec<u8>) -> String {
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn create_prints_segment() {
        let mut registry = SessionRegistry::new("unused.bin");
        let mut out = Vec::new();
        create(&mut registry, 3, vec!["10.0.0.9".into()], &mut out).unwrap();
        assert!(registry.contains(3));
        assert!(output(out).contains("Session ID: 3"));
    }

    #[test]
    fn unknown_session_is_reported_not_failed() {
        let mut registry = registry_with(1);
        let mut out = Vec::new();
        show(&registry, 9, &mut out).unwrap();
        send(&registry, 9, DisplayLoop::default(), &mut out).unwrap();
        test(&registry, 9, DisplayLoop::default(), &mut out).unwrap();
        connect(&registry, 9, &ConnectConfig::default(), &mut out).unwrap();
        modify(&mut registry, 9, &mut Cursor::new(""), &mut out).unwrap();
        let text = output(out);
        assert_eq!(text.matches("Session 9 does not exist.").count(), 5);
    }

    #[test]
    fn modify_applies_updates_and_rejects_bad_input() {
        let mut registry = registry_with(1);
        let script = "5\nSYN ACK\n3\n70000\n3\n4242\n6\nhello world\n10\nNOP MSS\n42\nx\n11\n";
        let mut out = Vec::new();
        modify(&mut registry, 1, &mut Cursor::new(script), &mut out).unwrap();

        let segment = registry.get(1).unwrap();
        assert_eq!(segment.flags(), ["SYN", "ACK"]);
        assert_eq!(segment.source_port(), 4242);
        assert_eq!(segment.payload(), Some("hello world"));
        assert_eq!(segment.options(), ["NOP", "MSS"]);
        assert_eq!(segment.flags_byte(), 0x12);

        let text = output(out);
        assert!(text.contains("1 - FIN"));
        assert!(text.contains("invalid value \"70000\" for source_port"));
        assert_eq!(text.matches("Invalid choice. Please try again.").count(), 2);
    }

    #[test]
    fn modify_stops_at_end_of_input() {
        let mut registry = registry_with(1);
        let mut out = Vec::new();
        modify(&mut registry, 1, &mut Cursor::new("7\n"), &mut out).unwrap();
        assert!(output(out).contains("Enter the new TTL value: "));
    }

    #[test]
    fn send_displays_each_round() {
        let mut registry = registry_with(1);
        registry.get_mut(1).unwrap().set_payload("abc".into());
        let settings = DisplayLoop {
            num_packets: 3,
            delay: Duration::ZERO,
        };
        let mut out = Vec::new();
        send(&registry, 1, settings, &mut out).unwrap();
        let text = output(out);
        assert!(text.contains("Sending 3 packets:"));
        assert_eq!(text.matches("TCP Packet:").count(), 3);
        assert_eq!(
            text.matches("header 20 bytes, options 0 bytes, payload 3 bytes")
                .count(),
            3
        );
        assert!(text.ends_with("Packets sent successfully!\n"));
    }

    #[test]
    fn test_without_payload_only_displays() {
        let registry = registry_with(1);
        let mut out = Vec::new();
        test(&registry, 1, DisplayLoop { num_packets: 1, delay: Duration::ZERO }, &mut out)
            .unwrap();
        let text = output(out);
        assert!(text.contains("Testing 1 packets:"));
        assert!(!text.contains("header 20 bytes"));
        assert!(text.ends_with("Testing completed!\n"));
    }

    #[test]
    fn list_and_flags() {
        let mut registry = registry_with(2);
        registry.create(SegmentParams::new(1, vec!["192.0.2.1".into()]));
        let mut out = Vec::new();
        list(&registry, &mut out).unwrap();
        let text = output(out);
        let ids: Vec<&str> = text
            .lines()
            .map(|l| l.split('\t').next().unwrap())
            .collect();
        assert_eq!(ids, ["1", "2"]);

        let mut out = Vec::new();
        flags(&mut out).unwrap();
        assert_eq!(output(out).lines().count(), 8);
    }
}
