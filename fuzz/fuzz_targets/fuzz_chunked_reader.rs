#![no_main]

use std::io;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use shiguredo_chunked::{ByteSource, ChunkedReader, ConnectionOwner, DecoderLimits};

#[derive(Arbitrary, Debug)]
struct FuzzReader {
    data: Vec<u8>,
    read_sizes: Vec<u8>,
    read_buffer_size: u8,
    buf_size: u8,
    hurry_first: bool,
}

struct ScriptedSource {
    data: Vec<u8>,
    pos: usize,
    sizes: Vec<usize>,
    index: usize,
}

impl ScriptedSource {
    fn next_size(&self) -> usize {
        if self.sizes.is_empty() {
            usize::MAX
        } else {
            self.sizes[self.index % self.sizes.len()]
        }
    }
}

impl ByteSource for ScriptedSource {
    fn read_blocking(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = (self.data.len() - self.pos)
            .min(buf.len())
            .min(self.next_size());
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        self.index += 1;
        Ok(n)
    }

    fn bytes_available_nonblocking(&mut self) -> io::Result<usize> {
        Ok((self.data.len() - self.pos).min(self.next_size()))
    }
}

#[derive(Default)]
struct Notified {
    count: usize,
}

impl ConnectionOwner for Notified {
    fn on_complete(&mut self, _leftover: &[u8]) {
        self.count += 1;
    }

    fn on_discard(&mut self) {
        self.count += 1;
    }
}

fuzz_target!(|input: FuzzReader| {
    let source = ScriptedSource {
        data: input.data,
        pos: 0,
        sizes: input
            .read_sizes
            .iter()
            .map(|&size| size as usize + 1)
            .collect(),
        index: 0,
    };
    let limits = DecoderLimits {
        read_buffer_size: input.read_buffer_size as usize + 1,
        ..DecoderLimits::default()
    };

    let mut owner = Notified::default();
    {
        let mut reader =
            ChunkedReader::with_limits(source, Vec::<(String, String)>::new(), &mut owner, limits);
        if input.hurry_first {
            let _ = reader.hurry();
        }

        let mut buf = vec![0u8; input.buf_size as usize + 1];
        loop {
            match reader.read_into(&mut buf) {
                Ok(0) => {
                    assert!(reader.is_done());
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    // エラーは以降も同じものが返る
                    assert_eq!(reader.read_into(&mut buf), Err(e));
                    break;
                }
            }
        }
        reader.close();
        reader.close();
    }
    // 通知はちょうど 1 回
    assert_eq!(owner.count, 1);
});
