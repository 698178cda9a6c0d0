//! # shiguredo_chunked
//!
//! HTTP/1.1 chunked 転送コーディング (RFC 9112 Section 7.1) のデコーダー
//!
//! ## 特徴
//!
//! - **Sans I/O コア**: [`ChunkedDecoder`] は I/O を持たず、任意に分割された入力を逐次処理する
//! - **ブロッキングリーダー**: [`ChunkedReader`] は [`ByteSource`] から読み込み、`std::io::Read` を実装する
//! - **接続の再利用**: `hurry()` / `close()` でブロックせずにボディを読み切り、
//!   接続を再利用できるかを [`ConnectionOwner`] に通知する
//! - **トレーラー**: 終端チャンク後のトレーラーを [`TrailerSink`] に順番通り渡す
//!
//! ## 使い方
//!
//! ```rust
//! use std::io::Cursor;
//! use shiguredo_chunked::{ChunkedReader, ConnectionOwner, encode_chunks};
//!
//! struct Pool {
//!     reusable: Option<bool>,
//! }
//!
//! impl ConnectionOwner for Pool {
//!     fn on_complete(&mut self, _leftover: &[u8]) {
//!         self.reusable = Some(true);
//!     }
//!     fn on_discard(&mut self) {
//!         self.reusable = Some(false);
//!     }
//! }
//!
//! let encoded = encode_chunks(&[&b"Hello, "[..], &b"World!"[..]]);
//! let mut pool = Pool { reusable: None };
//! let mut trailers: Vec<(String, String)> = Vec::new();
//!
//! let mut reader = ChunkedReader::new(Cursor::new(encoded), &mut trailers, &mut pool);
//! let mut buf = [0u8; 5];
//! let n = reader.read_into(&mut buf).unwrap();
//! assert_eq!(&buf[..n], b"Hello");
//!
//! // 読み残しがあっても、ブロックせずに読み切れれば再利用できる
//! reader.close();
//! drop(reader);
//! assert_eq!(pool.reusable, Some(true));
//! ```
//!
//! ## 行終端
//!
//! チャンクサイズ行とトレーラー行は `\n` 単独の行終端も受け付けるが、
//! チャンクデータ直後の行終端は `\r\n` でなければならない。

mod buffer;
mod decoder;
mod encoder;
mod error;
mod limits;
mod owner;
mod parser;
mod reader;
mod source;
mod trailer;

pub use decoder::ChunkedDecoder;
pub use encoder::{encode_chunk, encode_chunks, encode_last_chunk};
pub use error::Error;
pub use limits::DecoderLimits;
pub use owner::ConnectionOwner;
pub use parser::{ChunkCursor, FrameState};
pub use reader::ChunkedReader;
pub use source::ByteSource;
pub use trailer::TrailerSink;
