use std::fmt;
use std::io;

/// chunked デコードエラー
///
/// いずれのエラーも一度発生するとデコーダーに記録され、以降の読み取りは同じエラーを返す。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// チャンクサイズ行に 16 進数がない、またはパースできない
    MalformedChunkSize(String),
    /// チャンクデータの直後が CRLF ではない
    MissingChunkTerminator,
    /// トレーラー行にコロンがない、または不正
    MalformedTrailer(String),
    /// 終端チャンク到達前にストリームが終了した
    PrematureEof,
    /// 下位ストリームの I/O エラー
    Io { kind: io::ErrorKind, message: String },
    /// チャンクサイズ行が長すぎる
    ChunkLineTooLong { size: usize, limit: usize },
    /// トレーラー行が長すぎる
    TrailerLineTooLong { size: usize, limit: usize },
    /// トレーラー数超過
    TooManyTrailers { count: usize, limit: usize },
    /// ボディサイズ超過
    BodyTooLarge { size: usize, limit: usize },
    /// close() 済みのストリームを読もうとした
    Closed,
}

impl Error {
    /// フレーミング違反かどうか (I/O 由来ではない)
    pub fn is_framing_error(&self) -> bool {
        !matches!(self, Error::Io { .. } | Error::PrematureEof | Error::Closed)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::MalformedChunkSize(line) => write!(f, "malformed chunk size: {:?}", line),
            Error::MissingChunkTerminator => write!(f, "missing CRLF after chunk data"),
            Error::MalformedTrailer(line) => write!(f, "malformed trailer: {:?}", line),
            Error::PrematureEof => write!(f, "premature end of chunked body"),
            Error::Io { kind, message } => write!(f, "I/O error ({:?}): {}", kind, message),
            Error::ChunkLineTooLong { size, limit } => {
                write!(f, "chunk line too long: {} > {}", size, limit)
            }
            Error::TrailerLineTooLong { size, limit } => {
                write!(f, "trailer line too long: {} > {}", size, limit)
            }
            Error::TooManyTrailers { count, limit } => {
                write!(f, "too many trailers: {} > {}", count, limit)
            }
            Error::BodyTooLarge { size, limit } => {
                write!(f, "body too large: {} > {}", size, limit)
            }
            Error::Closed => write!(f, "stream is closed"),
        }
    }
}

impl std::error::Error for Error {}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            return Error::PrematureEof;
        }
        Error::Io {
            kind: e.kind(),
            message: e.to_string(),
        }
    }
}

impl From<Error> for io::Error {
    fn from(e: Error) -> Self {
        let kind = match &e {
            Error::Io { kind, .. } => *kind,
            Error::PrematureEof => io::ErrorKind::UnexpectedEof,
            Error::Closed => io::ErrorKind::NotConnected,
            _ => io::ErrorKind::InvalidData,
        };
        io::Error::new(kind, e)
    }
}
