//! ChunkedDecoder のプロパティテスト (decoder.rs)

use pbt::{encode_styled, payload_chunks, trailer_fields, wire_style};
use proptest::prelude::*;
use shiguredo_chunked::{ChunkedDecoder, DecoderLimits, Error, FrameState};

type Trailers = Vec<(String, String)>;

/// `encoded` を `split` バイトずつ投入し、読み出したペイロードを返す
fn decode_split(
    decoder: &mut ChunkedDecoder<Trailers>,
    encoded: &[u8],
    split: usize,
    read_size: usize,
) -> Result<Vec<u8>, Error> {
    let mut body = Vec::new();
    let mut buf = vec![0u8; read_size];
    for part in encoded.chunks(split) {
        decoder.feed(part)?;
        loop {
            let n = decoder.read(&mut buf)?;
            if n == 0 {
                break;
            }
            body.extend_from_slice(&buf[..n]);
        }
    }
    Ok(body)
}

proptest! {
    // ========================================
    // 分割に依存しない
    // ========================================

    #[test]
    fn prop_split_feed_roundtrip(
        chunks in payload_chunks(),
        trailers in trailer_fields(),
        style in wire_style(),
        split in 1usize..64,
        read_size in 1usize..128,
    ) {
        let encoded = encode_styled(&chunks, &trailers, style);
        let mut decoder = ChunkedDecoder::new(Trailers::new());
        let body = decode_split(&mut decoder, &encoded, split, read_size).unwrap();

        prop_assert_eq!(body, chunks.concat());
        prop_assert!(decoder.is_done());
        prop_assert_eq!(decoder.state(), FrameState::Done);
        prop_assert_eq!(decoder.leftover(), &[][..]);
        prop_assert_eq!(decoder.mark_eof(), Ok(()));
        prop_assert_eq!(decoder.into_sink(), trailers);
    }

    #[test]
    fn prop_leftover_is_preserved(
        chunks in payload_chunks(),
        next in proptest::collection::vec(any::<u8>(), 0..64),
        split in 1usize..64,
    ) {
        let mut encoded = encode_styled(&chunks, &[], pbt::WireStyle {
            upper_hex: false,
            extension: false,
            bare_lf: false,
        });
        encoded.extend_from_slice(&next);

        let mut decoder = ChunkedDecoder::new(Trailers::new());
        let body = decode_split(&mut decoder, &encoded, split, 64).unwrap();
        prop_assert_eq!(body, chunks.concat());
        prop_assert!(decoder.is_done());
        prop_assert_eq!(decoder.leftover(), &next[..]);
    }

    // ========================================
    // エラー
    // ========================================

    #[test]
    fn prop_truncated_body_is_premature_eof(
        chunks in payload_chunks(),
        cut in any::<prop::sample::Index>(),
    ) {
        let encoded = shiguredo_chunked::encode_chunks(
            &chunks.iter().map(|c| c.as_slice()).collect::<Vec<_>>(),
        );
        let cut = cut.index(encoded.len());

        let mut decoder = ChunkedDecoder::new(Trailers::new());
        decoder.feed(&encoded[..cut]).unwrap();
        prop_assert!(!decoder.is_done());
        prop_assert_eq!(decoder.mark_eof(), Err(Error::PrematureEof));
        prop_assert_eq!(decoder.error(), Some(&Error::PrematureEof));
    }

    #[test]
    fn prop_missing_terminator_is_rejected(
        chunk in proptest::collection::vec(any::<u8>(), 1..64),
        junk in proptest::collection::vec(any::<u8>(), 1..8),
        split in 1usize..16,
    ) {
        prop_assume!(junk[0] != b'\r');
        let mut encoded = format!("{:x}\r\n", chunk.len()).into_bytes();
        encoded.extend_from_slice(&chunk);
        encoded.extend_from_slice(&junk);

        let mut decoder = ChunkedDecoder::new(Trailers::new());
        let result = decode_split(&mut decoder, &encoded, split, 32);
        prop_assert_eq!(result, Err(Error::MissingChunkTerminator));
    }

    #[test]
    fn prop_error_is_sticky(
        data in proptest::collection::vec(any::<u8>(), 0..256),
        more in proptest::collection::vec(any::<u8>(), 0..32),
    ) {
        let mut decoder = ChunkedDecoder::with_limits(Trailers::new(), DecoderLimits {
            max_chunk_line_size: 16,
            max_trailer_line_size: 32,
            max_trailers_count: 2,
            ..DecoderLimits::default()
        });
        let Err(first) = decoder.feed(&data) else {
            return Ok(());
        };

        prop_assert_eq!(decoder.error(), Some(&first));
        prop_assert_eq!(decoder.feed(&more), Err(first.clone()));
        let mut buf = [0u8; 8];
        prop_assert_eq!(decoder.read(&mut buf), Err(first.clone()));
        prop_assert_eq!(decoder.mark_eof(), Err(first.clone()));
        prop_assert_eq!(decoder.error(), Some(&first));
    }

    #[test]
    fn prop_arbitrary_input_does_not_panic(
        data in proptest::collection::vec(any::<u8>(), 0..512),
        split in 1usize..32,
    ) {
        let mut decoder = ChunkedDecoder::new(Trailers::new());
        let _ = decode_split(&mut decoder, &data, split, 17);
        let _ = decoder.mark_eof();
    }

    // ========================================
    // 制限
    // ========================================

    #[test]
    fn prop_body_limit(
        chunks in payload_chunks(),
        limit in 0usize..1024,
    ) {
        let total: usize = chunks.iter().map(|c| c.len()).sum();
        let encoded = shiguredo_chunked::encode_chunks(
            &chunks.iter().map(|c| c.as_slice()).collect::<Vec<_>>(),
        );
        let mut decoder = ChunkedDecoder::with_limits(Trailers::new(), DecoderLimits {
            max_body_size: limit,
            ..DecoderLimits::default()
        });
        let result = decode_split(&mut decoder, &encoded, 7, 64);

        if total <= limit {
            prop_assert_eq!(result, Ok(chunks.concat()));
        } else {
            let is_body_too_large = matches!(result, Err(Error::BodyTooLarge { .. }));
            prop_assert!(is_body_too_large);
        }
    }
}
