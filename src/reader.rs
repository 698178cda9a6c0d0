//! ブロッキング I/O 用の chunked ボディリーダー
//!
//! [`ByteSource`] から読み込んだデータを [`ChunkedDecoder`] に投入し、
//! デコード済みのペイロードを返す。読み終えたら (または読むのをやめたら) `close()` で
//! [`ConnectionOwner`] に接続を再利用できるかどうかを通知する。
//!
//! ```rust
//! use std::io::Cursor;
//! use shiguredo_chunked::ChunkedReader;
//!
//! let mut trailers: Vec<(String, String)> = Vec::new();
//! let source = Cursor::new(b"5\r\nhello\r\n0\r\nX-Test: v\r\n\r\n".to_vec());
//! let mut reader = ChunkedReader::new(source, &mut trailers, ());
//!
//! let body = reader.read_body().unwrap();
//! assert_eq!(body, b"hello");
//! reader.close();
//! drop(reader);
//!
//! assert_eq!(trailers, vec![("X-Test".to_string(), "v".to_string())]);
//! ```

use std::io;

use crate::decoder::ChunkedDecoder;
use crate::error::Error;
use crate::limits::DecoderLimits;
use crate::owner::ConnectionOwner;
use crate::parser::FrameState;
use crate::source::ByteSource;
use crate::trailer::TrailerSink;

/// chunked ボディリーダー
///
/// 複数スレッドから使う場合は呼び出し側で排他すること。
/// `close()` を呼ばずに drop した場合は drop 時に `close()` する。
pub struct ChunkedReader<S: ByteSource, T: TrailerSink, O: ConnectionOwner> {
    source: S,
    decoder: ChunkedDecoder<T>,
    owner: O,
    closed: bool,
}

impl<S: ByteSource, T: TrailerSink, O: ConnectionOwner> ChunkedReader<S, T, O> {
    /// 新しいリーダーを作成
    pub fn new(source: S, sink: T, owner: O) -> Self {
        Self::with_limits(source, sink, owner, DecoderLimits::default())
    }

    /// 制限設定を指定してリーダーを作成
    pub fn with_limits(source: S, sink: T, owner: O, limits: DecoderLimits) -> Self {
        Self {
            source,
            decoder: ChunkedDecoder::with_limits(sink, limits),
            owner,
            closed: false,
        }
    }

    /// 現在のフレーミング状態
    pub fn state(&self) -> FrameState {
        self.decoder.state()
    }

    /// ボディを最後まで読み終えたか
    pub fn is_done(&self) -> bool {
        self.decoder.is_done()
    }

    /// `close()` 済みか
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// 記録されているエラー
    pub fn error(&self) -> Option<&Error> {
        self.decoder.error()
    }

    /// トレーラーの受け取り先
    pub fn trailers(&self) -> &T {
        self.decoder.sink()
    }

    /// ボディの後ろに読み込んでしまったデータ
    ///
    /// `close()` 後も参照できる。
    pub fn leftover(&self) -> &[u8] {
        self.decoder.leftover()
    }

    /// 1 バイト読み込む
    ///
    /// ボディの終端では `None` を返す。
    pub fn read_one(&mut self) -> Result<Option<u8>, Error> {
        self.ensure_readable()?;
        if self.decoder.available() == 0 && !self.decoder.is_done() {
            self.read_ahead_blocking()?;
        }

        let mut byte = [0u8; 1];
        match self.decoder.read(&mut byte)? {
            0 => Ok(None),
            _ => Ok(Some(byte[0])),
        }
    }

    /// `buf` に読み込み、読み込んだバイト数を返す
    ///
    /// `buf` が空でないのに 0 を返した場合はボディの終端。
    /// チャンクデータの途中でバッファが空の場合は下位ストリームから `buf` へ直接読み込む。
    pub fn read_into(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        self.ensure_readable()?;
        if buf.is_empty() {
            return Ok(0);
        }

        loop {
            let n = self.decoder.read(buf)?;
            if n > 0 || self.decoder.is_done() {
                return Ok(n);
            }

            if let Some(limit) = self.decoder.direct_read_limit() {
                let len = limit.min(buf.len());
                let n = self.read_source(|source| source.read_blocking(&mut buf[..len]))?;
                self.decoder.commit_direct(n)?;
                return Ok(n);
            }

            self.fill_blocking()?;
        }
    }

    /// ボディの残りをすべて読み込む
    pub fn read_body(&mut self) -> Result<Vec<u8>, Error> {
        let mut body = Vec::new();
        let mut buf = vec![0u8; self.decoder.limits().read_buffer_size.max(1)];
        loop {
            let n = self.read_into(&mut buf)?;
            if n == 0 {
                return Ok(body);
            }
            body.extend_from_slice(&buf[..n]);
        }
    }

    /// ブロックせずに読めるペイロードのバイト数
    ///
    /// デコード済みのデータがなければ、ブロックせずに読める分だけ下位ストリームから読み込む。
    pub fn available_nonblocking(&mut self) -> Result<usize, Error> {
        self.ensure_readable()?;
        let available = self.decoder.available();
        if available > 0 || self.decoder.is_done() {
            return Ok(available);
        }
        self.fill_nonblocking()?;
        Ok(self.decoder.available())
    }

    /// ブロックせずにボディを最後まで読み進める
    ///
    /// 完了できた場合は true を返す。デコード済みのペイロードは捨てずに残す。
    pub fn hurry(&mut self) -> bool {
        if self.closed {
            return self.decoder.error().is_none() && self.decoder.is_done();
        }
        self.drain_nonblocking(false)
    }

    /// ストリームを閉じ、接続の扱いを [`ConnectionOwner`] に通知する
    ///
    /// 何度呼んでもよい。ブロックはしない。
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        let reusable = match self.decoder.error() {
            Some(e) => {
                if e.is_framing_error() {
                    log::warn!("discarding connection after malformed chunked body: {}", e);
                }
                false
            }
            None => self.decoder.is_done() || self.drain_nonblocking(true),
        };

        if reusable {
            log::debug!(
                "chunked body closed: connection reusable, leftover={}",
                self.decoder.leftover().len()
            );
            self.owner.on_complete(self.decoder.leftover());
        } else {
            log::debug!("chunked body closed: discarding connection");
            self.owner.on_discard();
        }
        self.decoder.release();
    }

    fn ensure_readable(&self) -> Result<(), Error> {
        if self.closed {
            return Err(Error::Closed);
        }
        self.decoder.check()
    }

    /// ペイロードが読めるようになるか完了するまでブロッキングで読み込む
    fn read_ahead_blocking(&mut self) -> Result<(), Error> {
        loop {
            self.decoder.decode()?;
            if self.decoder.available() > 0 || self.decoder.is_done() {
                return Ok(());
            }
            self.fill_blocking()?;
        }
    }

    /// 下位ストリームから 1 回だけブロッキングで読み込む
    fn fill_blocking(&mut self) -> Result<usize, Error> {
        let size = self.decoder.limits().read_buffer_size.max(1);
        self.stage(size)
    }

    /// ブロックせずに読める分だけ読み込んでデコードを進める
    fn fill_nonblocking(&mut self) -> Result<usize, Error> {
        let available = self.read_source(|source| source.bytes_available_nonblocking())?;
        if available == 0 {
            self.decoder.decode()?;
            return Ok(0);
        }
        self.stage(available)
    }

    /// 最大 `size` バイトを raw バッファに読み込んでデコードを進める
    fn stage(&mut self, size: usize) -> Result<usize, Error> {
        let Self {
            source, decoder, ..
        } = self;
        let n = loop {
            match source.read_blocking(decoder.spare_capacity(size)) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(decoder.fail(e.into())),
            }
        };

        if n == 0 {
            // 終端チャンク前の EOF は PrematureEof
            self.decoder.mark_eof()?;
            return Ok(0);
        }
        self.decoder.commit(n)?;
        Ok(n)
    }

    /// ブロックせずに読めるだけ読み進め、完了したかを返す
    fn drain_nonblocking(&mut self, discard_payload: bool) -> bool {
        if self.decoder.error().is_some() {
            return false;
        }

        loop {
            if discard_payload {
                self.decoder.discard_payload();
            }
            if self.decoder.is_done() {
                log::debug!("hurry: chunked body complete");
                return true;
            }
            match self.fill_nonblocking() {
                Ok(0) => {
                    let done = self.decoder.is_done();
                    log::debug!("hurry: no more data available, done={}", done);
                    return done;
                }
                Ok(_) => {}
                Err(e) => {
                    log::debug!("hurry failed: {}", e);
                    return false;
                }
            }
        }
    }

    fn read_source<R>(
        &mut self,
        mut f: impl FnMut(&mut S) -> io::Result<R>,
    ) -> Result<R, Error> {
        loop {
            match f(&mut self.source) {
                Ok(r) => return Ok(r),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(self.decoder.fail(e.into())),
            }
        }
    }
}

impl<S: ByteSource, T: TrailerSink, O: ConnectionOwner> io::Read for ChunkedReader<S, T, O> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read_into(buf).map_err(io::Error::from)
    }
}

impl<S: ByteSource, T: TrailerSink, O: ConnectionOwner> Drop for ChunkedReader<S, T, O> {
    fn drop(&mut self) {
        self.close();
    }
}
