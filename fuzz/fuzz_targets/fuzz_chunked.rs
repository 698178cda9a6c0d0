#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use shiguredo_chunked::{ChunkedDecoder, encode_chunk, encode_chunks};

#[derive(Arbitrary, Debug)]
struct FuzzChunked {
    chunks: Vec<Vec<u8>>,
    split_hint: u8,
    read_hint: u8,
    /// エンコード済みデータの代わりに使う任意の入力
    raw: Option<Vec<u8>>,
}

fn normalize_chunks(mut chunks: Vec<Vec<u8>>) -> Vec<Vec<u8>> {
    chunks.retain(|chunk| !chunk.is_empty());
    if chunks.len() > 64 {
        chunks.truncate(64);
    }
    chunks
}

fn decode(encoded: &[u8], split_size: usize, read_size: usize) -> Option<Vec<u8>> {
    let mut decoder = ChunkedDecoder::new(Vec::<(String, String)>::new());
    let mut body = Vec::new();
    let mut buf = vec![0u8; read_size];
    for part in encoded.chunks(split_size) {
        if decoder.feed(part).is_err() {
            return None;
        }
        loop {
            match decoder.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => body.extend_from_slice(&buf[..n]),
                Err(_) => return None,
            }
        }
    }
    decoder.mark_eof().ok()?;
    Some(body)
}

fuzz_target!(|input: FuzzChunked| {
    let split_size = (input.split_hint as usize % 32) + 1;
    let read_size = (input.read_hint as usize % 64) + 1;

    if let Some(raw) = input.raw {
        // 任意の入力でも panic しない
        let _ = decode(&raw, split_size, read_size);
        return;
    }

    let chunks = normalize_chunks(input.chunks);
    let expected = chunks.concat();

    let chunk_refs: Vec<&[u8]> = chunks.iter().map(|chunk| chunk.as_slice()).collect();
    let body_from_chunks = encode_chunks(&chunk_refs);

    let mut body_from_single = Vec::new();
    for chunk in &chunks {
        body_from_single.extend_from_slice(&encode_chunk(chunk));
    }
    body_from_single.extend_from_slice(&encode_chunk(&[]));

    assert_eq!(body_from_chunks, body_from_single);
    assert_eq!(
        decode(&body_from_chunks, split_size, read_size).as_deref(),
        Some(&expected[..])
    );
});
