use std::collections::VecDeque;
use std::io::{self, BufReader, Bytes, Read};

/// Stream id that follows the start code of an MPEG video sequence header
pub const SEQUENCE_HEADER_CODE: u8 = 0xB3;

/// Byte pattern the scanner looks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Marker(&'static [u8]);

impl Marker {
    /// MPEG start code prefix `00 00 01`
    pub const START_CODE: Marker = match Marker::new(&[0x00, 0x00, 0x01]) {
        Some(marker) => marker,
        None => panic!("start code prefix is empty"),
    };

    /// Returns `None` for an empty pattern
    pub const fn new(bytes: &'static [u8]) -> Option<Self> {
        if bytes.is_empty() {
            None
        } else {
            Some(Marker(bytes))
        }
    }

    pub fn bytes(&self) -> &'static [u8] {
        self.0
    }
}

/// A marker occurrence and the byte right after it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    /// Stream position immediately after the marker, where `following_byte` was read
    pub offset: u64,
    pub following_byte: u8,
}

impl Candidate {
    /// Position of the first byte after `following_byte`
    pub fn payload_offset(&self) -> u64 {
        self.offset + 1
    }
}

enum Attempt {
    Matched(u8),
    /// `matched` marker bytes after the first agreed before `byte` did not
    Mismatch { matched: usize, byte: u8 },
    EndOfStream,
}

/// Lazy, single-pass search for a marker in a byte stream.
///
/// Bytes read during a failed match attempt are held back locally and
/// re-scanned, so the source never needs to support seeking.
pub struct StartCodeScanner<R> {
    bytes: Bytes<BufReader<R>>,
    marker: Marker,
    position: u64,
    held_back: VecDeque<u8>,
    prefetched: Option<Option<Candidate>>,
    finished: bool,
}

impl<R: Read> StartCodeScanner<R> {
    pub fn new(source: R) -> Self {
        Self::with_marker(source, Marker::START_CODE)
    }

    pub fn with_marker(source: R, marker: Marker) -> Self {
        Self {
            bytes: BufReader::new(source).bytes(),
            marker,
            position: 0,
            held_back: VecDeque::with_capacity(marker.bytes().len()),
            prefetched: None,
            finished: false,
        }
    }

    /// Look at the next candidate without consuming it
    #[cfg_attr(not(test), allow(dead_code))]
    pub fn peek(&mut self) -> io::Result<Option<&Candidate>> {
        if self.prefetched.is_none() {
            let next = self.fetch_next()?;
            self.prefetched = Some(next);
        }
        Ok(self.prefetched.as_ref().and_then(Option::as_ref))
    }

    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        let byte = match self.held_back.pop_front() {
            Some(b) => Some(b),
            None => self.bytes.next().transpose()?,
        };
        if byte.is_some() {
            self.position += 1;
        }
        Ok(byte)
    }

    fn fetch_next(&mut self) -> io::Result<Option<Candidate>> {
        if self.finished {
            return Ok(None);
        }

        let result = self.scan();
        if !matches!(result, Ok(Some(_))) {
            self.finished = true;
        }
        result
    }

    fn scan(&mut self) -> io::Result<Option<Candidate>> {
        let first = self.marker.bytes()[0];

        while let Some(byte) = self.read_byte()? {
            if byte != first {
                continue;
            }

            let checkpoint = self.position;
            match self.try_match()? {
                Attempt::Matched(following_byte) => {
                    return Ok(Some(Candidate {
                        offset: self.position - 1,
                        following_byte,
                    }));
                }
                Attempt::Mismatch { matched, byte } => {
                    // Resume right after the byte that matched marker[0]
                    self.held_back.push_front(byte);
                    for &b in self.marker.bytes()[1..=matched].iter().rev() {
                        self.held_back.push_front(b);
                    }
                    self.position = checkpoint;
                }
                Attempt::EndOfStream => return Ok(None),
            }
        }

        Ok(None)
    }

    fn try_match(&mut self) -> io::Result<Attempt> {
        let rest = &self.marker.bytes()[1..];
        for (matched, &expected) in rest.iter().enumerate() {
            let Some(byte) = self.read_byte()? else {
                return Ok(Attempt::EndOfStream);
            };
            if byte != expected {
                return Ok(Attempt::Mismatch { matched, byte });
            }
        }

        match self.read_byte()? {
            Some(following) => Ok(Attempt::Matched(following)),
            None => Ok(Attempt::EndOfStream),
        }
    }
}

impl<R: Read> Iterator for StartCodeScanner<R> {
    type Item = io::Result<Candidate>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(cached) = self.prefetched.take() {
            return cached.map(Ok);
        }

        match self.fetch_next() {
            Ok(next) => next.map(Ok),
            Err(e) => Some(Err(e)),
        }
    }
}

/// Collect the payload offsets of every sequence header in the stream
pub fn find_sequence_headers<R: Read>(source: R) -> io::Result<Vec<u64>> {
    let mut offsets = Vec::new();
    for candidate in StartCodeScanner::new(source) {
        let candidate = candidate?;
        if candidate.following_byte == SEQUENCE_HEADER_CODE {
            offsets.push(candidate.payload_offset());
        }
    }
    Ok(offsets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn scan_all(data: &[u8]) -> Vec<Candidate> {
        StartCodeScanner::new(Cursor::new(data.to_vec()))
            .collect::<io::Result<Vec<_>>>()
            .unwrap()
    }

    /// Reader that fails after yielding its data
    struct FailingReader {
        data: Cursor<Vec<u8>>,
    }

    impl Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.data.read(buf)?;
            if n == 0 {
                return Err(io::Error::new(io::ErrorKind::Other, "disk on fire"));
            }
            Ok(n)
        }
    }

    #[test]
    fn test_marker_rejects_empty() {
        assert!(Marker::new(&[]).is_none());
        assert_eq!(Marker::new(&[0x00, 0x00, 0x01]), Some(Marker::START_CODE));
    }

    #[test]
    fn test_finds_sequence_header() {
        let mut data = vec![0xff, 0xee, 0x00, 0x00, 0x01, 0xb3];
        data.extend_from_slice(&[0x2d, 0x02, 0x40, 0x23, 0x00, 0x00, 0x00]);

        let candidates = scan_all(&data);
        assert_eq!(
            candidates,
            vec![Candidate {
                offset: 5,
                following_byte: 0xb3
            }]
        );
        assert_eq!(candidates[0].payload_offset(), 6);
    }

    #[test]
    fn test_overlapping_zero_prefix_yields_one() {
        let data = [0x00, 0x00, 0x00, 0x01, 0xb3, 0x10, 0x20];
        let candidates = scan_all(&data);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].offset, 4);
        assert_eq!(candidates[0].following_byte, 0xb3);
    }

    #[test]
    fn test_long_zero_run() {
        let data = [0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0xb8];
        let candidates = scan_all(&data);
        assert_eq!(
            candidates,
            vec![Candidate {
                offset: 6,
                following_byte: 0xb8
            }]
        );
    }

    #[test]
    fn test_multiple_start_codes_in_order() {
        let data = [
            0x00, 0x00, 0x01, 0xb3, 0xaa, // sequence header
            0x00, 0x00, 0x01, 0xb8, 0xbb, // GOP
            0x00, 0x00, 0x01, 0x00, 0xcc, // picture
        ];
        let candidates = scan_all(&data);
        let found: Vec<_> = candidates
            .iter()
            .map(|c| (c.offset, c.following_byte))
            .collect();
        assert_eq!(found, vec![(3, 0xb3), (8, 0xb8), (13, 0x00)]);
    }

    #[test]
    fn test_partial_matches_are_rescanned() {
        // 00 00 02 fails on the last byte; the scan resumes inside it
        let data = [0x00, 0x00, 0x02, 0x00, 0x00, 0x00, 0x01, 0xb3];
        assert_eq!(
            scan_all(&data),
            vec![Candidate {
                offset: 7,
                following_byte: 0xb3
            }]
        );

        let mut data = [0x00u8, 0x00, 0x00, 0x02].repeat(10_000);
        data.extend_from_slice(&[0x00, 0x00, 0x01, 0xb5]);
        let candidates = scan_all(&data);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].offset, 40_003);
        assert_eq!(candidates[0].following_byte, 0xb5);
    }

    #[test]
    fn test_custom_marker_mismatch_after_partial() {
        let marker = Marker::new(b"ABC").unwrap();
        let source = Cursor::new(b"ABABCx".to_vec());
        let scanner = StartCodeScanner::with_marker(source, marker);
        let found: Vec<_> = scanner.map(|c| c.unwrap()).collect();
        assert_eq!(
            found,
            vec![Candidate {
                offset: 5,
                following_byte: b'x'
            }]
        );
    }

    #[test]
    fn test_no_marker() {
        assert!(scan_all(b"no start codes in this buffer").is_empty());
        assert!(scan_all(&[]).is_empty());
    }

    #[test]
    fn test_truncated_marker() {
        assert!(scan_all(&[0x12, 0x00, 0x00]).is_empty());
    }

    #[test]
    fn test_marker_at_end_without_following_byte() {
        assert!(scan_all(&[0x00, 0x00, 0x01]).is_empty());
    }

    #[test]
    fn test_custom_marker() {
        let marker = Marker::new(b"AB").unwrap();
        let scanner = StartCodeScanner::with_marker(Cursor::new(b"xAAByAB".to_vec()), marker);
        let candidates: Vec<_> = scanner.map(|c| c.unwrap()).collect();
        assert_eq!(
            candidates,
            vec![Candidate {
                offset: 4,
                following_byte: b'y'
            }]
        );
    }

    #[test]
    fn test_single_byte_marker() {
        let marker = Marker::new(&[0x47]).unwrap();
        let source = Cursor::new(vec![0x47, 0x01, 0x47, 0x02]);
        let scanner = StartCodeScanner::with_marker(source, marker);
        let found: Vec<_> = scanner.map(|c| c.unwrap().following_byte).collect();
        assert_eq!(found, vec![0x01, 0x02]);
    }

    #[test]
    fn test_peek_does_not_consume() {
        let data = [0x00, 0x00, 0x01, 0xb3, 0x00, 0x00, 0x01, 0xb5];
        let mut scanner = StartCodeScanner::new(Cursor::new(data.to_vec()));

        let first = *scanner.peek().unwrap().unwrap();
        assert_eq!(first.offset, 3);
        assert_eq!(scanner.peek().unwrap(), Some(&first));

        assert_eq!(scanner.next().unwrap().unwrap(), first);
        assert_eq!(scanner.peek().unwrap().map(|c| c.following_byte), Some(0xb5));
        assert_eq!(scanner.next().unwrap().unwrap().offset, 7);

        assert_eq!(scanner.peek().unwrap(), None);
        assert!(scanner.next().is_none());
        assert!(scanner.next().is_none());
    }

    #[test]
    fn test_read_error_is_surfaced() {
        let reader = FailingReader {
            data: Cursor::new(vec![0x00, 0x00, 0x01, 0xb3, 0x01]),
        };
        let mut scanner = StartCodeScanner::new(reader);

        assert_eq!(scanner.next().unwrap().unwrap().following_byte, 0xb3);
        assert!(scanner.next().unwrap().is_err());
        assert!(scanner.next().is_none());
    }

    #[test]
    fn test_find_sequence_headers_filters() {
        let mut data = vec![0x00, 0x00, 0x01, 0xb8, 0x00];
        data.extend_from_slice(&[0x00, 0x00, 0x01, 0xb3]);
        data.extend_from_slice(&[0x2d, 0x02, 0x40, 0x23, 0xff, 0xff, 0xe0]);

        let offsets = find_sequence_headers(Cursor::new(data)).unwrap();
        assert_eq!(offsets, vec![9]);
    }

    #[test]
    fn test_find_sequence_headers_propagates_errors() {
        let reader = FailingReader {
            data: Cursor::new(vec![0x00, 0x00, 0x01, 0xb3, 0x01]),
        };
        assert!(find_sequence_headers(reader).is_err());
    }

    #[test]
    fn test_large_stream() {
        let mut data = vec![0xabu8; 100_000];
        data.extend_from_slice(&[0x00, 0x00, 0x01, 0xb3]);
        data.extend_from_slice(&[0u8; 7]);

        let offsets = find_sequence_headers(Cursor::new(data)).unwrap();
        assert_eq!(offsets, vec![100_004]);
    }
}
