//! 読み書きカーソル付きの伸長可能なバイトバッファ
//!
//! 未分類の受信データ (raw) とデコード済みペイロード (decoded) の両方に使う。
//! `[read_pos, write_pos)` が未読データ。

use memchr::memchr;

#[derive(Debug, Default)]
pub(crate) struct ByteBuffer {
    bytes: Vec<u8>,
    read_pos: usize,
    write_pos: usize,
}

impl ByteBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 未読バイト数
    pub fn len(&self) -> usize {
        self.write_pos - self.read_pos
    }

    pub fn is_empty(&self) -> bool {
        self.read_pos == self.write_pos
    }

    /// 未読データ
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes[self.read_pos..self.write_pos]
    }

    /// 未読データ中の最初の `byte` の位置
    pub fn find(&self, byte: u8) -> Option<usize> {
        memchr(byte, self.as_slice())
    }

    /// 先頭 `n` バイトを読み捨てる
    ///
    /// 読み切った場合はカーソルを先頭に戻す。
    pub fn consume(&mut self, n: usize) {
        debug_assert!(n <= self.len());
        self.read_pos += n;
        if self.read_pos == self.write_pos {
            self.read_pos = 0;
            self.write_pos = 0;
        }
    }

    /// 末尾に少なくとも `additional` バイトの空きを確保する
    ///
    /// 未読データを先頭に詰めれば足りる場合は詰めるだけにし、
    /// 足りない場合は `未読 + additional` の長さに伸長する。
    pub fn reserve(&mut self, additional: usize) {
        if self.bytes.len() - self.write_pos >= additional {
            return;
        }

        let used = self.len();
        if self.read_pos > 0 {
            self.bytes.copy_within(self.read_pos..self.write_pos, 0);
            self.read_pos = 0;
            self.write_pos = used;
        }
        if self.bytes.len() - used < additional {
            self.bytes.resize(used + additional, 0);
        }
    }

    /// 書き込み可能な領域
    pub fn spare_mut(&mut self) -> &mut [u8] {
        &mut self.bytes[self.write_pos..]
    }

    /// `spare_mut()` に書き込んだ `n` バイトを確定する
    ///
    /// 確保済みの領域を超える分は切り捨てる。
    pub fn commit(&mut self, n: usize) {
        self.write_pos = (self.write_pos + n).min(self.bytes.len());
    }

    pub fn extend_from_slice(&mut self, data: &[u8]) {
        if data.is_empty() {
            return;
        }
        self.reserve(data.len());
        self.spare_mut()[..data.len()].copy_from_slice(data);
        self.commit(data.len());
    }

    /// 未読データを `dst` にコピーして消費し、コピーしたバイト数を返す
    pub fn copy_to(&mut self, dst: &mut [u8]) -> usize {
        let n = self.len().min(dst.len());
        dst[..n].copy_from_slice(&self.as_slice()[..n]);
        self.consume(n);
        n
    }

    /// 未読データを捨てる (確保済みの領域は残す)
    pub fn clear(&mut self) {
        self.read_pos = 0;
        self.write_pos = 0;
    }

    /// 確保済みの領域ごと解放する
    pub fn release(&mut self) {
        self.bytes = Vec::new();
        self.clear();
    }

    #[cfg(test)]
    fn capacity(&self) -> usize {
        self.bytes.len()
    }
}
