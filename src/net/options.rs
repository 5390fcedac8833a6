use crate::types::{TcpOptionKind, DEFAULT_MSS, DEFAULT_WINDOW_SHIFT};

/// Encodes one option to its fixed byte pattern.
fn encode_option(kind: TcpOptionKind, buffer: &mut Vec<u8>) {
    match kind {
        TcpOptionKind::Mss => {
            buffer.push(kind.kind());
            buffer.push(kind.encoded_len() as u8);
            buffer.extend_from_slice(&DEFAULT_MSS.to_be_bytes());
        }
        TcpOptionKind::Nop => buffer.push(kind.kind()),
        TcpOptionKind::WindowScale => {
            buffer.push(kind.kind());
            buffer.push(kind.encoded_len() as u8);
            buffer.push(DEFAULT_WINDOW_SHIFT);
        }
    }
}

/// Concatenates the encodings of `options` in list order. Unknown names
/// contribute nothing; no alignment padding is added.
pub fn build_tcp_options<S: AsRef<str>>(options: &[S]) -> Vec<u8> {
    let kinds: Vec<TcpOptionKind> = options
        .iter()
        .filter_map(|name| TcpOptionKind::from_name(name.as_ref()))
        .collect();

    let mut buffer = Vec::with_capacity(kinds.iter().map(|k| k.encoded_len()).sum());
    for kind in kinds {
        encode_option(kind, &mut buffer);
    }
    buffer
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nop_then_mss() {
        assert_eq!(
            build_tcp_options(&["NOP", "MSS"]),
            vec![0x01, 0x02, 0x04, 0x05, 0xb4]
        );
    }

    #[test]
    fn window_scale_pattern() {
        assert_eq!(build_tcp_options(&["WS"]), vec![0x03, 0x03, 0x07]);
    }

    #[test]
    fn unknown_options_are_skipped() {
        assert!(build_tcp_options(&["SACK", "TS"]).is_empty());
        assert_eq!(build_tcp_options(&["SACK", "NOP"]), vec![0x01]);
    }

    #[test]
    fn length_is_sum_of_fixed_patterns() {
        let names = ["MSS", "NOP", "WS"];
        // every sequence of length 0..=4 over the three known options
        let mut sequences: Vec<Vec<&str>> = Vec::new();
        for len in 0..=4u32 {
            for mut idx in 0..3usize.pow(len) {
                let mut seq = Vec::with_capacity(len as usize);
                for _ in 0..len {
                    seq.push(names[idx % 3]);
                    idx /= 3;
                }
                sequences.push(seq);
            }
        }

        for seq in sequences {
            let encoded = build_tcp_options(&seq);
            let expected: Vec<u8> = seq
                .iter()
                .flat_map(|n| match *n {
                    "MSS" => vec![0x02, 0x04, 0x05, 0xb4],
                    "NOP" => vec![0x01],
                    _ => vec![0x03, 0x03, 0x07],
                })
                .collect();
            let mss = seq.iter().filter(|n| **n == "MSS").count();
            let nop = seq.iter().filter(|n| **n == "NOP").count();
            let ws = seq.iter().filter(|n| **n == "WS").count();
            assert_eq!(encoded.len(), 4 * mss + nop + 3 * ws);
            assert_eq!(encoded, expected, "sequence {:?}", seq);
        }
    }
}
