// ABOUTME: Byte-level line splitting for streamed HTTP bodies. Lines are decoded
// ABOUTME: only once complete, so a character split across chunks survives.

/// Buffers raw body bytes and hands out complete lines.
#[derive(Debug, Default)]
pub(crate) struct LineBuffer {
    bytes: Vec<u8>,
}

impl LineBuffer {
    /// Append a chunk and return every line it completes, without `\n` or `\r\n`.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.bytes.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(pos) = self.bytes.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.bytes.drain(..=pos).collect();
            lines.push(decode(&line[..pos]));
        }
        lines
    }

    /// Bytes after the last newline.
    pub fn take_rest(&mut self) -> String {
        decode(&std::mem::take(&mut self.bytes))
    }
}

fn decode(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_end_matches('\r')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multibyte_char_split_between_chunks() {
        let bytes = "data: café\n".as_bytes();
        let split = bytes.iter().position(|b| *b == 0xC3).unwrap() + 1;

        let mut lines = LineBuffer::default();
        assert!(lines.push(&bytes[..split]).is_empty());
        assert_eq!(lines.push(&bytes[split..]), vec!["data: café"]);
    }

    #[test]
    fn test_crlf_and_rest() {
        let mut lines = LineBuffer::default();
        assert_eq!(lines.push(b"one\r\ntwo\nthr"), vec!["one", "two"]);
        assert_eq!(lines.take_rest(), "thr");
        assert_eq!(lines.take_rest(), "");
    }
}
