//! トレーラーフィールドの収集 (RFC 9112 Section 7.1.2)
//!
//! 終端チャンクの後に続く `name: value` 行をパースし、外部の [`TrailerSink`] に渡す。
//! 重複した名前もそのまま順番通りに渡す。どれを採用するかは受け取る側が決める。

use crate::error::Error;
use crate::limits::DecoderLimits;

/// トレーラーの受け取り先
///
/// 通常はメッセージのヘッダーテーブル。
pub trait TrailerSink {
    /// トレーラーを 1 件追加
    fn add(&mut self, name: String, value: String);
}

impl TrailerSink for Vec<(String, String)> {
    fn add(&mut self, name: String, value: String) {
        self.push((name, value));
    }
}

impl<T: TrailerSink + ?Sized> TrailerSink for &mut T {
    fn add(&mut self, name: String, value: String) {
        (**self).add(name, value);
    }
}

/// トレーラー行をパースして [`TrailerSink`] に渡す
#[derive(Debug)]
pub(crate) struct TrailerCollector {
    count: usize,
    max_count: usize,
}

impl TrailerCollector {
    pub fn new(limits: &DecoderLimits) -> Self {
        Self {
            count: 0,
            max_count: limits.max_trailers_count,
        }
    }

    /// 収集済みのトレーラー数
    pub fn count(&self) -> usize {
        self.count
    }

    /// 行終端を除いたトレーラー行を 1 行処理
    pub fn collect<T: TrailerSink + ?Sized>(
        &mut self,
        line: &[u8],
        sink: &mut T,
    ) -> Result<(), Error> {
        if self.count >= self.max_count {
            return Err(Error::TooManyTrailers {
                count: self.count + 1,
                limit: self.max_count,
            });
        }

        let (name, value) = parse_trailer_line(line)?;
        log::trace!("chunked trailer: {}: {}", name, value);
        sink.add(name, value);
        self.count += 1;
        Ok(())
    }
}

/// `name: value` 形式のトレーラー行をパース
///
/// 名前と値の前後の空白は取り除く。
pub(crate) fn parse_trailer_line(line: &[u8]) -> Result<(String, String), Error> {
    let line = std::str::from_utf8(line)
        .map_err(|_| Error::MalformedTrailer(String::from_utf8_lossy(line).into_owned()))?;
    let (name, value) = line
        .split_once(':')
        .ok_or_else(|| Error::MalformedTrailer(line.to_string()))?;
    Ok((name.trim().to_string(), value.trim().to_string()))
}
