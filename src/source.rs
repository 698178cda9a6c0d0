//! 下位の接続を表すバイトソース

use std::io::{self, Cursor, Read};
use std::net::TcpStream;

/// chunked ボディを読み出す下位の接続
pub trait ByteSource {
    /// 最大 `buf.len()` バイトを読み込む
    ///
    /// 読めるデータがなければブロックする。`Ok(0)` はストリームの終端。
    fn read_blocking(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// ブロックせずに今すぐ読めるバイト数
    fn bytes_available_nonblocking(&mut self) -> io::Result<usize>;
}

impl<S: ByteSource + ?Sized> ByteSource for &mut S {
    fn read_blocking(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read_blocking(buf)
    }

    fn bytes_available_nonblocking(&mut self) -> io::Result<usize> {
        (**self).bytes_available_nonblocking()
    }
}

/// メモリ上のデータ
///
/// 残りのデータはすべてブロックせずに読める。
impl<B: AsRef<[u8]>> ByteSource for Cursor<B> {
    fn read_blocking(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read(buf)
    }

    fn bytes_available_nonblocking(&mut self) -> io::Result<usize> {
        let len = self.get_ref().as_ref().len() as u64;
        Ok(len.saturating_sub(self.position()) as usize)
    }
}

/// 空き状況の確認で覗くバイト数の上限
const PEEK_SIZE: usize = 16 * 1024;

/// TCP 接続
///
/// ブロッキングモードのストリームで使うこと。
/// 読めるバイト数はノンブロッキングの `peek` で確認し、確認後はブロッキングモードに戻す。
/// `set_nonblocking(true)` 済みのストリームを渡した場合もブロッキングモードになる。
/// `peek` はスタック上の一時領域に覗くだけで、ヒープは確保しない。
impl ByteSource for TcpStream {
    fn read_blocking(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read(buf)
    }

    fn bytes_available_nonblocking(&mut self) -> io::Result<usize> {
        let mut probe = [0u8; PEEK_SIZE];
        self.set_nonblocking(true)?;
        let result = self.peek(&mut probe);
        self.set_nonblocking(false)?;
        match result {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(0),
            Err(e) => Err(e),
        }
    }
}
