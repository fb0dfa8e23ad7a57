// ABOUTME: Decoder for the container engine's multiplexed stdout/stderr log framing
// ABOUTME: Merges framed records into a single transcript in emission order

/// Size of the per-record header: tag, three reserved bytes, big-endian length
pub const HEADER_LEN: usize = 8;

/// Stream tag carried in the first header byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamType {
    Stdin,
    Stdout,
    Stderr,
}

impl StreamType {
    pub fn tag(self) -> u8 {
        match self {
            StreamType::Stdin => 0,
            StreamType::Stdout => 1,
            StreamType::Stderr => 2,
        }
    }
}

/// Frame one record the way the engine does on a non-TTY log stream.
pub fn encode_frame(stream: StreamType, payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(HEADER_LEN + payload.len());
    frame.push(stream.tag());
    frame.extend_from_slice(&[0, 0, 0]);
    frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    frame.extend_from_slice(payload);
    frame
}

/// Decode a multiplexed buffer into one transcript.
///
/// Both streams are merged. Payload bytes are joined before UTF-8 decoding so
/// characters split across records survive. An incomplete trailing header
/// ends the stream; a short final payload contributes what is present.
pub fn demultiplex(buf: &[u8]) -> String {
    let mut payload = Vec::with_capacity(buf.len());
    let mut offset = 0;

    while buf.len() - offset >= HEADER_LEN {
        let header = &buf[offset..offset + HEADER_LEN];
        let len = u32::from_be_bytes([header[4], header[5], header[6], header[7]]) as usize;
        let start = offset + HEADER_LEN;
        let end = start.saturating_add(len).min(buf.len());
        payload.extend_from_slice(&buf[start..end]);
        offset = end;
    }

    String::from_utf8_lossy(&payload).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn encode_all(records: &[(StreamType, &str)]) -> Vec<u8> {
        records
            .iter()
            .flat_map(|(stream, text)| encode_frame(*stream, text.as_bytes()))
            .collect()
    }

    #[test]
    fn test_empty_buffer() {
        assert_eq!(demultiplex(&[]), "");
    }

    #[test]
    fn test_single_record() {
        let buf = encode_all(&[(StreamType::Stdout, "hello\n")]);
        assert_eq!(buf.len(), HEADER_LEN + 6);
        assert_eq!(demultiplex(&buf), "hello\n");
    }

    #[test]
    fn test_many_records_preserve_order_across_streams() {
        let records = [
            (StreamType::Stdout, "> vite build\n"),
            (StreamType::Stderr, "warn: "),
            (StreamType::Stdout, ""),
            (StreamType::Stderr, "chunk size\n"),
            (StreamType::Stdout, "done"),
        ];
        let expected: String = records.iter().map(|(_, text)| *text).collect();
        assert_eq!(demultiplex(&encode_all(&records)), expected);
    }

    #[test]
    fn test_zero_length_payload_only() {
        let buf = encode_all(&[(StreamType::Stdout, "")]);
        assert_eq!(buf.len(), HEADER_LEN);
        assert_eq!(demultiplex(&buf), "");
    }

    #[test]
    fn test_records_need_not_align_with_lines() {
        let buf = encode_all(&[
            (StreamType::Stdout, "line one\nline "),
            (StreamType::Stdout, "two\n"),
        ]);
        assert_eq!(demultiplex(&buf), "line one\nline two\n");
    }

    #[test]
    fn test_multibyte_char_split_across_records() {
        let bytes = "héllo".as_bytes();
        let mut buf = encode_frame(StreamType::Stdout, &bytes[..2]);
        buf.extend(encode_frame(StreamType::Stdout, &bytes[2..]));
        assert_eq!(demultiplex(&buf), "héllo");
    }

    #[test]
    fn test_incomplete_trailing_header_is_end_of_stream() {
        let mut buf = encode_all(&[(StreamType::Stdout, "ok")]);
        buf.extend_from_slice(&[1, 0, 0]);
        assert_eq!(demultiplex(&buf), "ok");
    }

    #[test]
    fn test_truncated_payload_keeps_available_bytes() {
        let mut buf = encode_frame(StreamType::Stderr, b"abcdef");
        buf.truncate(HEADER_LEN + 3);
        assert_eq!(demultiplex(&buf), "abc");
    }
}
