const BYTES_PER_LINE: usize = 16;

/// Renders `data` as offset / hex / ascii columns, 16 bytes per line.
pub fn format_hexdump(data: &[u8]) -> String {
    let mut result = String::new();

    for (i, chunk) in data.chunks(BYTES_PER_LINE).enumerate() {
        result.push_str(&format!("0x{:04x}:  ", i * BYTES_PER_LINE));

        for (j, byte) in chunk.iter().enumerate() {
            result.push_str(&format!("{:02x}", byte));
            // extra gap after the eighth byte
            if j < chunk.len() - 1 {
                result.push(' ');
                if j == 7 {
                    result.push(' ');
                }
            }
        }

        // pad short lines so the ascii column stays aligned
        if chunk.len() < BYTES_PER_LINE {
            let padding =
                (BYTES_PER_LINE - chunk.len()) * 3 + usize::from(chunk.len() <= 8);
            result.push_str(&" ".repeat(padding));
        }

        result.push_str("  ");
        result.extend(chunk.iter().map(|&b| {
            if b.is_ascii_graphic() {
                b as char
            } else {
                '.'
            }
        }));
        result.push('\n');
    }

    result
}

/// Hexdump of an encoded segment, preceded by a line giving the size of
/// each section.
pub fn format_segment_dump(segment: &[u8], header_len: usize, options_len: usize) -> String {
    let payload_len = segment.len().saturating_sub(header_len + options_len);
    format!(
        "header {} bytes, options {} bytes, payload {} bytes\n{}",
        header_len,
        options_len,
        payload_len,
        format_hexdump(segment)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_line() {
        let data: Vec<u8> = (0x41..0x51).collect();
        assert_eq!(
            format_hexdump(&data),
            "0x0000:  41 42 43 44 45 46 47 48  49 4a 4b 4c 4d 4e 4f 50  ABCDEFGHIJKLMNOP\n"
        );
    }

    #[test]
    fn short_line_is_padded() {
        let dump = format_hexdump(&[0x00, 0x68, 0x69]);
        assert!(dump.starts_with("0x0000:  00 68 69"));
        assert!(dump.ends_with("  .hi\n"));
        // ascii column starts where it does on a full line
        let full = format_hexdump(&[0x2e; 16]);
        assert_eq!(dump.find("  .hi"), full.find("  ................"));
    }

    #[test]
    fn second_line_offset() {
        let dump = format_hexdump(&[0u8; 20]);
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].starts_with("0x0010:  "));
    }

    #[test]
    fn segment_dump_reports_sections() {
        let dump = format_segment_dump(&[0u8; 27], 20, 5);
        assert!(dump.starts_with("header 20 bytes, options 5 bytes, payload 2 bytes\n"));
    }
}
