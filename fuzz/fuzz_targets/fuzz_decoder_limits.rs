#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use shiguredo_chunked::{ChunkedDecoder, DecoderLimits};

#[derive(Arbitrary, Debug)]
struct FuzzLimits {
    max_chunk_line_size: u16,
    max_trailer_line_size: u16,
    max_trailers_count: u8,
    max_body_size: u32,
    data: Vec<u8>,
}

fn build_limits(input: &FuzzLimits) -> DecoderLimits {
    DecoderLimits {
        max_chunk_line_size: input.max_chunk_line_size as usize,
        max_trailer_line_size: input.max_trailer_line_size as usize,
        max_trailers_count: input.max_trailers_count as usize,
        max_body_size: input.max_body_size as usize,
        ..DecoderLimits::default()
    }
}

fuzz_target!(|input: FuzzLimits| {
    let limits = build_limits(&input);

    let mut decoder = ChunkedDecoder::with_limits(Vec::<(String, String)>::new(), limits.clone());
    let mut decoded = 0usize;
    if decoder.feed(&input.data).is_ok() {
        let mut buf = [0u8; 256];
        while let Ok(n) = decoder.read(&mut buf) {
            if n == 0 {
                break;
            }
            decoded += n;
        }
    }

    // 宣言サイズの合計で判定するので、読めたペイロードは上限を超えない
    assert!(decoded <= limits.max_body_size);
    assert!(decoder.sink().len() <= limits.max_trailers_count);
});
