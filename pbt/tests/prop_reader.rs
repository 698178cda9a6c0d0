//! ChunkedReader のプロパティテスト (reader.rs)

use pbt::{FragmentSource, encode_styled, fragment_sizes, payload_chunks, trailer_fields, wire_style};
use proptest::prelude::*;
use shiguredo_chunked::{ChunkedReader, ConnectionOwner, DecoderLimits, Error};

type Trailers = Vec<(String, String)>;

#[derive(Debug, Default)]
struct Counter {
    completed: usize,
    discarded: usize,
}

impl ConnectionOwner for Counter {
    fn on_complete(&mut self, _leftover: &[u8]) {
        self.completed += 1;
    }

    fn on_discard(&mut self) {
        self.discarded += 1;
    }
}

fn read_all<O: ConnectionOwner>(
    reader: &mut ChunkedReader<FragmentSource, Trailers, O>,
    read_size: usize,
) -> Result<Vec<u8>, Error> {
    let mut body = Vec::new();
    let mut buf = vec![0u8; read_size];
    loop {
        let n = reader.read_into(&mut buf)?;
        if n == 0 {
            return Ok(body);
        }
        body.extend_from_slice(&buf[..n]);
    }
}

proptest! {
    #[test]
    fn prop_fragmented_source_roundtrip(
        chunks in payload_chunks(),
        trailers in trailer_fields(),
        style in wire_style(),
        sizes in fragment_sizes(),
        read_size in 1usize..512,
    ) {
        let encoded = encode_styled(&chunks, &trailers, style);
        let mut reader = ChunkedReader::new(
            FragmentSource::new(encoded, sizes),
            Trailers::new(),
            (),
        );
        let body = read_all(&mut reader, read_size).unwrap();

        prop_assert_eq!(body, chunks.concat());
        prop_assert!(reader.is_done());
        prop_assert_eq!(reader.trailers(), &trailers);
    }

    #[test]
    fn prop_byte_reads_match_buffer_reads(
        chunks in payload_chunks(),
        sizes in fragment_sizes(),
    ) {
        let encoded = shiguredo_chunked::encode_chunks(
            &chunks.iter().map(|c| c.as_slice()).collect::<Vec<_>>(),
        );
        let mut reader = ChunkedReader::new(
            FragmentSource::new(encoded, sizes),
            Trailers::new(),
            (),
        );
        let mut body = Vec::new();
        while let Some(b) = reader.read_one().unwrap() {
            body.push(b);
        }
        prop_assert_eq!(body, chunks.concat());
        prop_assert_eq!(reader.read_one(), Ok(None));
    }

    #[test]
    fn prop_direct_reads_match_buffered_reads(
        chunks in payload_chunks(),
        sizes in fragment_sizes(),
        read_buffer_size in 1usize..32,
        read_size in 1usize..1024,
    ) {
        let encoded = shiguredo_chunked::encode_chunks(
            &chunks.iter().map(|c| c.as_slice()).collect::<Vec<_>>(),
        );

        // 小さい read_buffer_size ではチャンクデータの大半を呼び出し元のバッファへ直接読む
        let limits = DecoderLimits {
            read_buffer_size,
            ..DecoderLimits::default()
        };
        let mut direct = ChunkedReader::with_limits(
            FragmentSource::new(encoded.clone(), sizes.clone()),
            Trailers::new(),
            (),
            limits,
        );
        let mut buffered = ChunkedReader::new(
            FragmentSource::new(encoded, sizes),
            Trailers::new(),
            (),
        );

        let direct_body = read_all(&mut direct, read_size).unwrap();
        let buffered_body = read_all(&mut buffered, read_size).unwrap();
        prop_assert_eq!(&direct_body, &buffered_body);
        prop_assert_eq!(direct_body, chunks.concat());
    }

    #[test]
    fn prop_close_reuses_fully_available_body(
        chunks in payload_chunks(),
        trailers in trailer_fields(),
        sizes in fragment_sizes(),
        read_first in 0usize..64,
    ) {
        let encoded = encode_styled(&chunks, &trailers, pbt::WireStyle {
            upper_hex: false,
            extension: false,
            bare_lf: false,
        });
        let mut owner = Counter::default();
        {
            let mut reader = ChunkedReader::new(
                FragmentSource::new(encoded, sizes),
                Trailers::new(),
                &mut owner,
            );
            if read_first > 0 {
                let mut buf = vec![0u8; read_first];
                reader.read_into(&mut buf).unwrap();
            }
            reader.close();
            prop_assert!(reader.is_done());
            prop_assert_eq!(reader.trailers(), &trailers);
        }
        prop_assert_eq!(owner.completed, 1);
        prop_assert_eq!(owner.discarded, 0);
    }

    #[test]
    fn prop_truncated_body_is_discarded(
        chunks in payload_chunks(),
        sizes in fragment_sizes(),
        cut in any::<prop::sample::Index>(),
    ) {
        let encoded = shiguredo_chunked::encode_chunks(
            &chunks.iter().map(|c| c.as_slice()).collect::<Vec<_>>(),
        );
        let cut = cut.index(encoded.len());
        let truncated = encoded[..cut].to_vec();

        let mut owner = Counter::default();
        {
            let mut reader = ChunkedReader::new(
                FragmentSource::new(truncated, sizes),
                Trailers::new(),
                &mut owner,
            );
            prop_assert_eq!(read_all(&mut reader, 64), Err(Error::PrematureEof));
            prop_assert!(!reader.hurry());
        }
        prop_assert_eq!(owner.completed, 0);
        prop_assert_eq!(owner.discarded, 1);
    }
}
