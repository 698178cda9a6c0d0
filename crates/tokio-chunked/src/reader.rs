//! 非同期 chunked ボディリーダー
//!
//! 読み込みは `ChunkedDecoder::spare_capacity()` へ直接行い、読めたバイト数を `commit()` する。
//! タイムアウトで読み込みが打ち切られても commit 前なのでデコーダーの状態は壊れない。

use std::io;
use std::time::Duration;

use shiguredo_chunked::{ChunkedDecoder, DecoderLimits, FrameState, TrailerSink};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::{Error, Result};

/// `tokio::io::AsyncRead` 用の chunked ボディリーダー
pub struct AsyncChunkedReader<R, T> {
    inner: R,
    decoder: ChunkedDecoder<T>,
    read_timeout: Duration,
}

impl<R: AsyncRead + Unpin, T: TrailerSink> AsyncChunkedReader<R, T> {
    /// 新しいリーダーを作成
    pub fn new(inner: R, sink: T) -> Self {
        Self::with_limits(inner, sink, DecoderLimits::default())
    }

    /// 制限設定を指定してリーダーを作成
    pub fn with_limits(inner: R, sink: T, limits: DecoderLimits) -> Self {
        Self {
            inner,
            decoder: ChunkedDecoder::with_limits(sink, limits),
            read_timeout: Duration::from_secs(60),
        }
    }

    /// 読み取りタイムアウトを設定
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// 現在のフレーミング状態
    pub fn state(&self) -> FrameState {
        self.decoder.state()
    }

    /// ボディを最後まで読み終えたか
    pub fn is_done(&self) -> bool {
        self.decoder.is_done()
    }

    /// 記録されているエラー
    pub fn error(&self) -> Option<&shiguredo_chunked::Error> {
        self.decoder.error()
    }

    /// トレーラーの受け取り先
    pub fn trailers(&self) -> &T {
        self.decoder.sink()
    }

    /// `buf` に読み込み、読み込んだバイト数を返す
    ///
    /// `buf` が空でないのに 0 を返した場合はボディの終端。
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.check()?;
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
                let read_result =
                    tokio::time::timeout(self.read_timeout, self.inner.read(&mut buf[..len]))
                        .await?;
                let n = read_result.map_err(|e| self.io_failed(e))?;
                self.decoder.commit_direct(n)?;
                return Ok(n);
            }

            self.fill().await?;
        }
    }

    /// ボディの残りをすべて読み込む
    pub async fn read_body(&mut self) -> Result<Vec<u8>> {
        let mut body = Vec::new();
        let mut buf = vec![0u8; self.decoder.limits().read_buffer_size.max(1)];
        loop {
            let n = self.read(&mut buf).await?;
            if n == 0 {
                return Ok(body);
            }
            body.extend_from_slice(&buf[..n]);
        }
    }

    /// `budget` の時間内にボディの残りを読み捨てる
    ///
    /// 終端まで読み切れた場合は true を返す。false の場合は接続を再利用してはならない。
    pub async fn drain(&mut self, budget: Duration) -> bool {
        if self.decoder.error().is_some() {
            return false;
        }

        match tokio::time::timeout(budget, self.drain_to_end()).await {
            Ok(Ok(())) => {
                log::debug!("drain: chunked body complete");
                true
            }
            Ok(Err(e)) => {
                log::debug!("drain failed: {}", e);
                false
            }
            Err(_) => {
                log::debug!("drain timed out after {:?}", budget);
                false
            }
        }
    }

    /// リーダーを分解して下位ストリーム、ボディの後ろに読み込んだデータ、トレーラーの受け取り先を返す
    pub fn into_parts(self) -> (R, Vec<u8>, T) {
        let leftover = self.decoder.leftover().to_vec();
        (self.inner, leftover, self.decoder.into_sink())
    }

    fn check(&self) -> Result<()> {
        match self.decoder.error() {
            Some(e) => Err(Error::Chunked(e.clone())),
            None => Ok(()),
        }
    }

    async fn drain_to_end(&mut self) -> Result<()> {
        loop {
            self.decoder.discard_payload();
            if self.decoder.is_done() {
                return Ok(());
            }
            self.fill().await?;
        }
    }

    /// 下位ストリームから 1 回読み込んでデコードを進める
    async fn fill(&mut self) -> Result<usize> {
        let size = self.decoder.limits().read_buffer_size.max(1);
        let read_result = {
            let dst = self.decoder.spare_capacity(size);
            tokio::time::timeout(self.read_timeout, self.inner.read(dst)).await?
        };
        let n = read_result.map_err(|e| self.io_failed(e))?;

        if n == 0 {
            // 終端チャンク前の EOF は PrematureEof
            self.decoder.mark_eof()?;
            return Ok(0);
        }
        self.decoder.commit(n)?;
        Ok(n)
    }

    /// I/O エラーをデコーダーに記録する
    fn io_failed(&mut self, e: io::Error) -> Error {
        self.decoder.fail(shiguredo_chunked::Error::Io {
            kind: e.kind(),
            message: e.to_string(),
        });
        Error::Io(e)
    }
}
