//! PBT テスト共通ユーティリティ

use std::io;

use proptest::prelude::*;
use shiguredo_chunked::ByteSource;

// ========================================
// ペイロード・トレーラー生成
// ========================================

/// 空でないチャンクの列
pub fn payload_chunks() -> impl Strategy<Value = Vec<Vec<u8>>> {
    proptest::collection::vec(proptest::collection::vec(any::<u8>(), 1..300), 0..8)
}

fn token_string(max_len: usize) -> impl Strategy<Value = String> {
    proptest::collection::vec(
        prop_oneof![
            prop::char::range('a', 'z'),
            prop::char::range('A', 'Z'),
            prop::char::range('0', '9'),
            Just('-'),
        ],
        1..=max_len,
    )
    .prop_map(|chars| chars.into_iter().collect())
}

/// 前後に空白を持たない `name: value`
pub fn trailer_fields() -> impl Strategy<Value = Vec<(String, String)>> {
    proptest::collection::vec(
        (token_string(16), "[!-~]([ -~]{0,30}[!-~])?".prop_map(|s| s)),
        0..4,
    )
}

/// 読み取り 1 回あたりのバイト数の列
pub fn fragment_sizes() -> impl Strategy<Value = Vec<usize>> {
    proptest::collection::vec(1usize..64, 1..16)
}

// ========================================
// エンコード
// ========================================

/// チャンクサイズ行の書き方
#[derive(Debug, Clone, Copy)]
pub struct WireStyle {
    /// 16 進数を大文字で書く
    pub upper_hex: bool,
    /// チャンク拡張を付ける
    pub extension: bool,
    /// サイズ行とトレーラー行を `\n` 単独で終える
    pub bare_lf: bool,
}

pub fn wire_style() -> impl Strategy<Value = WireStyle> {
    (any::<bool>(), any::<bool>(), any::<bool>()).prop_map(|(upper_hex, extension, bare_lf)| {
        WireStyle {
            upper_hex,
            extension,
            bare_lf,
        }
    })
}

/// チャンクとトレーラーを `style` に従ってエンコード
///
/// チャンクデータ直後の行終端は常に `\r\n`。
pub fn encode_styled(
    chunks: &[Vec<u8>],
    trailers: &[(String, String)],
    style: WireStyle,
) -> Vec<u8> {
    let eol: &[u8] = if style.bare_lf { b"\n" } else { b"\r\n" };
    let mut buf = Vec::new();

    for chunk in chunks {
        let size = if style.upper_hex {
            format!("{:X}", chunk.len())
        } else {
            format!("{:x}", chunk.len())
        };
        buf.extend_from_slice(size.as_bytes());
        if style.extension {
            buf.extend_from_slice(b";ext=\"v\"");
        }
        buf.extend_from_slice(eol);
        buf.extend_from_slice(chunk);
        buf.extend_from_slice(b"\r\n");
    }

    buf.extend_from_slice(b"0");
    buf.extend_from_slice(eol);
    for (name, value) in trailers {
        buf.extend_from_slice(format!("{}: {}", name, value).as_bytes());
        buf.extend_from_slice(eol);
    }
    buf.extend_from_slice(eol);
    buf
}

// ========================================
// テスト用ソース
// ========================================

/// 読み取り単位を `sizes` の順に繰り返すソース
pub struct FragmentSource {
    data: Vec<u8>,
    pos: usize,
    sizes: Vec<usize>,
    index: usize,
}

impl FragmentSource {
    pub fn new(data: Vec<u8>, sizes: Vec<usize>) -> Self {
        Self {
            data,
            pos: 0,
            sizes,
            index: 0,
        }
    }

    fn next_size(&self) -> usize {
        if self.sizes.is_empty() {
            usize::MAX
        } else {
            self.sizes[self.index % self.sizes.len()].max(1)
        }
    }
}

impl ByteSource for FragmentSource {
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
