//! Sans I/O の chunked デコーダー
//!
//! I/O を持たず、受信したバイト列を `feed()` で投入し、デコード済みのペイロードを
//! `read()` で取り出す。ブロッキング版の [`ChunkedReader`](crate::ChunkedReader) と
//! tokio 版はどちらもこのデコーダーの上に実装されている。
//!
//! ```rust
//! use shiguredo_chunked::ChunkedDecoder;
//!
//! let mut decoder = ChunkedDecoder::new(Vec::new());
//! decoder.feed(b"5\r\nhello\r\n0\r\nX-Test: v\r\n\r\n").unwrap();
//!
//! let mut buf = [0u8; 16];
//! let n = decoder.read(&mut buf).unwrap();
//! assert_eq!(&buf[..n], b"hello");
//! assert!(decoder.is_done());
//! assert_eq!(decoder.sink(), &vec![("X-Test".to_string(), "v".to_string())]);
//! ```

use std::io;

use crate::buffer::ByteBuffer;
use crate::error::Error;
use crate::limits::DecoderLimits;
use crate::parser::{FrameParser, FrameState};
use crate::trailer::TrailerSink;

/// chunked デコーダー
///
/// 一度エラーになると、以降の操作はすべて同じエラーを返す。
#[derive(Debug)]
pub struct ChunkedDecoder<T> {
    /// 未分類の受信データ
    raw: ByteBuffer,
    /// デコード済みペイロード
    decoded: ByteBuffer,
    parser: FrameParser,
    sink: T,
    error: Option<Error>,
    /// 直前の `spare_capacity()` で確保したバイト数
    reserved: usize,
}

impl<T: TrailerSink> ChunkedDecoder<T> {
    /// 新しいデコーダーを作成
    pub fn new(sink: T) -> Self {
        Self::with_limits(sink, DecoderLimits::default())
    }

    /// 制限設定を指定してデコーダーを作成
    pub fn with_limits(sink: T, limits: DecoderLimits) -> Self {
        Self {
            raw: ByteBuffer::new(),
            decoded: ByteBuffer::new(),
            parser: FrameParser::new(limits),
            sink,
            error: None,
            reserved: 0,
        }
    }

    /// 制限設定を取得
    pub fn limits(&self) -> &DecoderLimits {
        self.parser.limits()
    }

    /// 現在のフレーミング状態
    pub fn state(&self) -> FrameState {
        self.parser.state()
    }

    /// 終端チャンクとトレーラーを読み終えたか
    pub fn is_done(&self) -> bool {
        self.parser.is_done()
    }

    /// 記録されているエラー
    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    /// エラーを記録して返す
    ///
    /// 既にエラーが記録されている場合は最初のエラーを残す。
    pub fn fail(&mut self, e: Error) -> Error {
        if self.error.is_none() {
            log::debug!("chunked decoder failed: {}", e);
            self.error = Some(e.clone());
        }
        e
    }

    pub(crate) fn check(&self) -> Result<(), Error> {
        match &self.error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    /// 受信データを投入してデコードを進める
    pub fn feed(&mut self, data: &[u8]) -> Result<(), Error> {
        self.check()?;
        self.raw.extend_from_slice(data);
        self.decode()
    }

    /// raw バッファに `n` バイトの書き込み領域を確保して返す
    ///
    /// 書き込んだバイト数は `commit()` で確定する。
    pub fn spare_capacity(&mut self, n: usize) -> &mut [u8] {
        self.raw.reserve(n);
        self.reserved = n;
        &mut self.raw.spare_mut()[..n]
    }

    /// `spare_capacity()` に書き込んだ `n` バイトを確定してデコードを進める
    ///
    /// `n` が確保したバイト数を超える場合は何もせずエラーを返す。このエラーは記録しない。
    pub fn commit(&mut self, n: usize) -> Result<(), Error> {
        self.check()?;
        let reserved = std::mem::take(&mut self.reserved);
        if n > reserved {
            return Err(Error::Io {
                kind: io::ErrorKind::InvalidInput,
                message: format!("commit of {} bytes exceeds reserved {} bytes", n, reserved),
            });
        }
        self.raw.commit(n);
        self.decode()
    }

    /// raw バッファにあるバイトで進められるところまでデコードする
    pub fn decode(&mut self) -> Result<(), Error> {
        self.check()?;
        let result = self
            .parser
            .advance(&mut self.raw, &mut self.decoded, &mut self.sink);
        result.map_err(|e| self.fail(e))
    }

    /// デコード済みのペイロードを `buf` に読み出す
    ///
    /// 0 を返した場合、ボディが完了しているか (`is_done()`)、追加の受信データが必要。
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        self.check()?;
        if buf.is_empty() {
            return Ok(0);
        }
        if self.decoded.is_empty() {
            self.decode()?;
        }
        Ok(self.decoded.copy_to(buf))
    }

    /// 追加の受信なしで読み出せるペイロードのバイト数
    pub fn available(&self) -> usize {
        self.decoded.len()
    }

    /// 下位ストリームから呼び出し元のバッファへ直接読み込んでよいバイト数
    ///
    /// バッファが両方とも空でチャンクデータの途中にいるときだけ `Some` を返す。
    pub fn direct_read_limit(&self) -> Option<usize> {
        if self.error.is_some() || !self.decoded.is_empty() || !self.raw.is_empty() {
            return None;
        }
        match self.parser.state() {
            FrameState::ReadingChunk(cursor) => Some(cursor.remaining()),
            _ => None,
        }
    }

    /// 呼び出し元のバッファへ直接読み込んだ `n` バイトを記録
    ///
    /// チャンクは自分の長さを宣言しているので、途中で 0 バイトが返るのは切断扱い。
    pub fn commit_direct(&mut self, n: usize) -> Result<(), Error> {
        self.check()?;
        if n == 0 {
            return Err(self.fail(Error::PrematureEof));
        }
        let limit = self.direct_read_limit().unwrap_or(0);
        if n > limit {
            return Err(Error::Io {
                kind: io::ErrorKind::InvalidInput,
                message: format!("direct read of {} bytes exceeds limit {} bytes", n, limit),
            });
        }
        self.parser.record_chunk_data(n);
        Ok(())
    }

    /// 下位ストリームが終了したことを通知
    ///
    /// 完了前であれば PrematureEof になる。
    pub fn mark_eof(&mut self) -> Result<(), Error> {
        self.check()?;
        self.decode()?;
        if self.is_done() {
            Ok(())
        } else {
            Err(self.fail(Error::PrematureEof))
        }
    }

    /// ボディ完了後に残っている受信データ
    ///
    /// パイプライン化された次のメッセージの先頭などが入る。
    pub fn leftover(&self) -> &[u8] {
        if self.is_done() {
            self.raw.as_slice()
        } else {
            &[]
        }
    }

    /// デコード済みで未読のペイロードを捨てる
    pub fn discard_payload(&mut self) {
        self.decoded.clear();
    }

    /// バッファを解放する
    ///
    /// 完了後に残っている受信データ (`leftover()`) は解放しない。
    pub(crate) fn release(&mut self) {
        if !self.is_done() {
            self.raw.release();
        }
        self.decoded.release();
    }

    /// トレーラーの受け取り先
    pub fn sink(&self) -> &T {
        &self.sink
    }

    /// トレーラーの受け取り先 (可変)
    pub fn sink_mut(&mut self) -> &mut T {
        &mut self.sink
    }

    /// デコーダーを消費してトレーラーの受け取り先を返す
    pub fn into_sink(self) -> T {
        self.sink
    }
}
