/// データを 1 つのチャンクとしてエンコード
///
/// 空のデータは終端チャンク (`0\r\n\r\n`) になる。
pub fn encode_chunk(data: &[u8]) -> Vec<u8> {
    if data.is_empty() {
        return encode_last_chunk(&[]);
    }
    let mut buf = format!("{:x}\r\n", data.len()).into_bytes();
    buf.reserve(data.len() + 2);
    buf.extend_from_slice(data);
    buf.extend_from_slice(b"\r\n");
    buf
}

/// 複数のデータをチャンク列としてエンコードし、終端チャンクで閉じる
///
/// 空のデータは終端チャンクと区別できないため読み飛ばす。
pub fn encode_chunks(chunks: &[&[u8]]) -> Vec<u8> {
    let mut buf: Vec<u8> = chunks
        .iter()
        .filter(|chunk| !chunk.is_empty())
        .flat_map(|chunk| encode_chunk(chunk))
        .collect();
    buf.extend_from_slice(&encode_last_chunk(&[]));
    buf
}

/// トレーラー付きの終端チャンクをエンコード
///
/// `0\r\n` の後にトレーラー行を並べ、空行で終わる。
pub fn encode_last_chunk(trailers: &[(&str, &str)]) -> Vec<u8> {
    let mut buf = Vec::new();

    buf.extend_from_slice(b"0\r\n");
    for (name, value) in trailers {
        buf.extend_from_slice(name.as_bytes());
        buf.extend_from_slice(b": ");
        buf.extend_from_slice(value.as_bytes());
        buf.extend_from_slice(b"\r\n");
    }
    buf.extend_from_slice(b"\r\n");

    buf
}
