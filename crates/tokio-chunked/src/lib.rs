//! tokio_chunked - Tokio integration for shiguredo_chunked
//!
//! `tokio::io::AsyncRead` から HTTP/1.1 chunked ボディを読み込む非同期リーダー。
//!
//! ## 特徴
//!
//! - **shiguredo_chunked ベース**: Sans I/O の [`ChunkedDecoder`] をそのまま使う
//! - **読み込みタイムアウト**: 1 回の読み込みごとに `read_timeout` を適用する
//! - **接続の再利用**: `drain()` で時間を区切ってボディを読み切り、再利用できるかを判断する
//!
//! ## 使い方
//!
//! ```ignore
//! use std::time::Duration;
//! use tokio_chunked::AsyncChunkedReader;
//!
//! let mut reader = AsyncChunkedReader::new(stream, Vec::new())
//!     .read_timeout(Duration::from_secs(10));
//! let body = reader.read_body().await?;
//!
//! if reader.drain(Duration::from_millis(100)).await {
//!     let (stream, leftover, trailers) = reader.into_parts();
//!     // stream を次のリクエストに使う
//! }
//! ```

pub mod error;
pub mod reader;

pub use error::{Error, Result};
pub use reader::AsyncChunkedReader;

// shiguredo_chunked の型を re-export
pub use shiguredo_chunked::{ChunkedDecoder, DecoderLimits, FrameState, TrailerSink};
