//! チャンクフレーミングの状態機械
//!
//! raw バッファに溜まったバイトを分類し、チャンクデータは decoded バッファ
//! (または呼び出し元のバッファ) へ、トレーラー行は [`TrailerSink`] へ送る。
//! バイトが足りなくて進めない場合はエラーにせずに戻る。

use crate::buffer::ByteBuffer;
use crate::error::Error;
use crate::limits::DecoderLimits;
use crate::trailer::{TrailerCollector, TrailerSink};

/// 読み取り中のチャンクの位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkCursor {
    /// チャンクサイズ行で宣言されたサイズ
    pub declared_size: usize,
    /// このチャンクで消費済みのバイト数
    pub consumed: usize,
}

impl ChunkCursor {
    /// このチャンクの残りバイト数
    pub fn remaining(&self) -> usize {
        self.declared_size - self.consumed
    }
}

/// フレーミング状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    /// チャンクサイズ行待ち
    AwaitingChunkHeader,
    /// チャンクデータ読み取り中
    ReadingChunk(ChunkCursor),
    /// チャンクデータ後の CRLF 待ち
    AwaitingChunkEol,
    /// 終端チャンク後のトレーラー待ち
    AwaitingTrailers,
    /// 完了
    Done,
}

/// 行終端を探した結果
struct Line {
    /// 行終端 (`\r\n` または `\n`) を除いた長さ
    len: usize,
    /// 行終端を含む長さ
    consumed: usize,
}

#[derive(Debug)]
pub(crate) struct FrameParser {
    state: FrameState,
    limits: DecoderLimits,
    /// 宣言されたチャンクサイズの合計
    body_size: usize,
    trailers: TrailerCollector,
}

impl FrameParser {
    pub fn new(limits: DecoderLimits) -> Self {
        let trailers = TrailerCollector::new(&limits);
        Self {
            state: FrameState::AwaitingChunkHeader,
            limits,
            body_size: 0,
            trailers,
        }
    }

    pub fn state(&self) -> FrameState {
        self.state
    }

    pub fn limits(&self) -> &DecoderLimits {
        &self.limits
    }

    pub fn is_done(&self) -> bool {
        self.state == FrameState::Done
    }

    /// 今の raw で進められるところまで状態を進める
    pub fn advance<T: TrailerSink + ?Sized>(
        &mut self,
        raw: &mut ByteBuffer,
        decoded: &mut ByteBuffer,
        sink: &mut T,
    ) -> Result<(), Error> {
        loop {
            match self.state {
                FrameState::AwaitingChunkHeader => {
                    let Some(line) = find_line(raw, self.limits.max_chunk_line_size, |size, limit| {
                        Error::ChunkLineTooLong { size, limit }
                    })?
                    else {
                        return Ok(());
                    };
                    let size = parse_chunk_size(&raw.as_slice()[..line.len])?;
                    raw.consume(line.consumed);
                    self.start_chunk(size)?;
                }
                FrameState::ReadingChunk(cursor) => {
                    let n = cursor.remaining().min(raw.len());
                    if n == 0 {
                        return Ok(());
                    }
                    decoded.extend_from_slice(&raw.as_slice()[..n]);
                    raw.consume(n);
                    self.record_chunk_data(n);
                    if matches!(self.state, FrameState::ReadingChunk(_)) {
                        return Ok(());
                    }
                }
                FrameState::AwaitingChunkEol => {
                    let staged = raw.as_slice();
                    if staged.first().is_some_and(|&b| b != b'\r') {
                        return Err(Error::MissingChunkTerminator);
                    }
                    if staged.len() < 2 {
                        return Ok(());
                    }
                    if staged[1] != b'\n' {
                        return Err(Error::MissingChunkTerminator);
                    }
                    raw.consume(2);
                    self.state = FrameState::AwaitingChunkHeader;
                }
                FrameState::AwaitingTrailers => {
                    let Some(line) =
                        find_line(raw, self.limits.max_trailer_line_size, |size, limit| {
                            Error::TrailerLineTooLong { size, limit }
                        })?
                    else {
                        return Ok(());
                    };
                    if line.len == 0 {
                        raw.consume(line.consumed);
                        self.state = FrameState::Done;
                        log::debug!(
                            "chunked body complete: body_size={} trailers={}",
                            self.body_size,
                            self.trailers.count()
                        );
                        return Ok(());
                    }
                    self.trailers.collect(&raw.as_slice()[..line.len], sink)?;
                    raw.consume(line.consumed);
                }
                FrameState::Done => return Ok(()),
            }
        }
    }

    /// チャンクデータを `n` バイト消費したことを記録
    pub fn record_chunk_data(&mut self, n: usize) {
        if let FrameState::ReadingChunk(mut cursor) = self.state {
            debug_assert!(n <= cursor.remaining());
            cursor.consumed += n.min(cursor.remaining());
            self.state = if cursor.remaining() == 0 {
                FrameState::AwaitingChunkEol
            } else {
                FrameState::ReadingChunk(cursor)
            };
        }
    }

    fn start_chunk(&mut self, size: usize) -> Result<(), Error> {
        if size == 0 {
            // 終端チャンク: サイズ行の終端は読み終えているので CRLF 待ちは挟まない
            log::trace!("last chunk");
            self.state = FrameState::AwaitingTrailers;
            return Ok(());
        }

        let new_size = self
            .body_size
            .checked_add(size)
            .ok_or(Error::BodyTooLarge {
                size: usize::MAX,
                limit: self.limits.max_body_size,
            })?;
        if new_size > self.limits.max_body_size {
            return Err(Error::BodyTooLarge {
                size: new_size,
                limit: self.limits.max_body_size,
            });
        }
        self.body_size = new_size;

        log::trace!("chunk header: size={}", size);
        self.state = FrameState::ReadingChunk(ChunkCursor {
            declared_size: size,
            consumed: 0,
        });
        Ok(())
    }
}

/// raw の先頭から行を探す
///
/// 行終端は `\n`。直前に `\r` があればそれも終端に含める。
/// 終端が見つからないまま `limit` を超えた場合はその時点でエラーにする。
fn find_line(
    raw: &ByteBuffer,
    limit: usize,
    too_long: fn(usize, usize) -> Error,
) -> Result<Option<Line>, Error> {
    let staged = raw.as_slice();
    match raw.find(b'\n') {
        Some(pos) => {
            let len = if pos > 0 && staged[pos - 1] == b'\r' {
                pos - 1
            } else {
                pos
            };
            if len > limit {
                return Err(too_long(len, limit));
            }
            Ok(Some(Line {
                len,
                consumed: pos + 1,
            }))
        }
        // 末尾の \r は行終端の一部かもしれないので 1 バイト猶予を持たせる
        None if staged.len() > limit.saturating_add(1) => Err(too_long(staged.len(), limit)),
        None => Ok(None),
    }
}

/// チャンクサイズ行の先頭の 16 進数をパース
///
/// 16 進数の後ろ (チャンク拡張など) は無視する。
pub(crate) fn parse_chunk_size(line: &[u8]) -> Result<usize, Error> {
    let malformed = || Error::MalformedChunkSize(String::from_utf8_lossy(line).into_owned());

    let digits = line.iter().take_while(|b| b.is_ascii_hexdigit()).count();
    if digits == 0 {
        return Err(malformed());
    }

    let mut size = 0usize;
    for &b in &line[..digits] {
        size = size
            .checked_mul(16)
            .and_then(|s| s.checked_add(hex_value(b)))
            .ok_or_else(malformed)?;
    }
    Ok(size)
}

fn hex_value(b: u8) -> usize {
    match b {
        b'0'..=b'9' => (b - b'0') as usize,
        b'a'..=b'f' => (b - b'a' + 10) as usize,
        b'A'..=b'F' => (b - b'A' + 10) as usize,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Outcome = (Result<(), Error>, Vec<u8>, Vec<(String, String)>);

    fn run(parser: &mut FrameParser, input: &[u8]) -> Outcome {
        let mut raw = ByteBuffer::new();
        let mut decoded = ByteBuffer::new();
        let mut trailers = Vec::new();
        raw.extend_from_slice(input);
        let result = parser.advance(&mut raw, &mut decoded, &mut trailers);
        (result, decoded.as_slice().to_vec(), trailers)
    }

    #[test]
    fn chunk_size_plain() {
        assert_eq!(parse_chunk_size(b"1F").unwrap(), 0x1f);
        assert_eq!(parse_chunk_size(b"0").unwrap(), 0);
        assert_eq!(parse_chunk_size(b"00a").unwrap(), 10);
    }

    #[test]
    fn chunk_size_ignores_extension() {
        assert_eq!(parse_chunk_size(b"5;name=value").unwrap(), 5);
        assert_eq!(parse_chunk_size(b"5 ; ieof").unwrap(), 5);
    }

    #[test]
    fn chunk_size_without_digits() {
        assert!(matches!(
            parse_chunk_size(b"zz"),
            Err(Error::MalformedChunkSize(ref line)) if line == "zz"
        ));
        assert!(parse_chunk_size(b"").is_err());
        assert!(parse_chunk_size(b" 5").is_err());
    }

    #[test]
    fn chunk_size_overflow() {
        assert!(matches!(
            parse_chunk_size(b"fffffffffffffffffffff"),
            Err(Error::MalformedChunkSize(_))
        ));
    }

    #[test]
    fn single_chunk_with_trailer() {
        let mut parser = FrameParser::new(DecoderLimits::default());
        let (result, body, trailers) = run(&mut parser, b"5\r\nhello\r\n0\r\nX-Test: v\r\n\r\n");
        result.unwrap();
        assert_eq!(body, b"hello");
        assert_eq!(trailers, vec![("X-Test".to_string(), "v".to_string())]);
        assert!(parser.is_done());
    }

    #[test]
    fn bare_lf_line_endings() {
        let mut parser = FrameParser::new(DecoderLimits::default());
        let (result, body, trailers) = run(&mut parser, b"3\nabc\r\n0\nA: b\n\n");
        result.unwrap();
        assert_eq!(body, b"abc");
        assert_eq!(trailers.len(), 1);
        assert!(parser.is_done());
    }

    #[test]
    fn data_terminator_must_be_crlf() {
        let mut parser = FrameParser::new(DecoderLimits::default());
        let (result, body, _) = run(&mut parser, b"3\r\nabc\n0\r\n\r\n");
        assert_eq!(result, Err(Error::MissingChunkTerminator));
        assert_eq!(body, b"abc");
    }

    #[test]
    fn terminator_checked_byte_by_byte() {
        let mut parser = FrameParser::new(DecoderLimits::default());
        let (result, _, _) = run(&mut parser, b"2\r\nabX");
        assert_eq!(result, Err(Error::MissingChunkTerminator));

        let mut parser = FrameParser::new(DecoderLimits::default());
        let (result, _, _) = run(&mut parser, b"2\r\nab\r");
        result.unwrap();
        assert_eq!(parser.state(), FrameState::AwaitingChunkEol);
    }

    #[test]
    fn stops_mid_chunk() {
        let mut parser = FrameParser::new(DecoderLimits::default());
        let (result, body, _) = run(&mut parser, b"a\r\n0123");
        result.unwrap();
        assert_eq!(body, b"0123");
        assert_eq!(
            parser.state(),
            FrameState::ReadingChunk(ChunkCursor {
                declared_size: 10,
                consumed: 4
            })
        );
    }

    #[test]
    fn done_is_terminal() {
        let mut parser = FrameParser::new(DecoderLimits::default());
        let mut raw = ByteBuffer::new();
        let mut decoded = ByteBuffer::new();
        let mut trailers = Vec::new();
        raw.extend_from_slice(b"0\r\n\r\n5\r\nhello\r\n");
        parser.advance(&mut raw, &mut decoded, &mut trailers).unwrap();
        assert!(parser.is_done());
        parser.advance(&mut raw, &mut decoded, &mut trailers).unwrap();
        assert!(decoded.is_empty());
        assert_eq!(raw.as_slice(), b"5\r\nhello\r\n");
    }

    #[test]
    fn chunk_line_too_long_without_newline() {
        let limits = DecoderLimits {
            max_chunk_line_size: 8,
            ..DecoderLimits::default()
        };
        let mut parser = FrameParser::new(limits);
        let (result, _, _) = run(&mut parser, b"5;aaaaaaaaaaaa");
        assert!(matches!(result, Err(Error::ChunkLineTooLong { limit: 8, .. })));
    }

    #[test]
    fn trailer_line_too_long() {
        let limits = DecoderLimits {
            max_trailer_line_size: 4,
            ..DecoderLimits::default()
        };
        let mut parser = FrameParser::new(limits);
        let (result, _, _) = run(&mut parser, b"0\r\nLong-Name: value\r\n\r\n");
        assert_eq!(
            result,
            Err(Error::TrailerLineTooLong { size: 16, limit: 4 })
        );
    }

    #[test]
    fn body_size_limit() {
        let limits = DecoderLimits {
            max_body_size: 4,
            ..DecoderLimits::default()
        };
        let mut parser = FrameParser::new(limits);
        let (result, _, _) = run(&mut parser, b"3\r\nabc\r\n2\r\nde\r\n");
        assert_eq!(result, Err(Error::BodyTooLarge { size: 5, limit: 4 }));
    }
}
