/// デコーダーの制限設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoderLimits {
    /// 最大チャンクサイズ行長 (デフォルト: 1KB)
    ///
    /// チャンク拡張を含む行全体の長さ。拡張は読み飛ばすが、行が終わるまでは
    /// バッファに保持する必要があるため上限を設ける。
    pub max_chunk_line_size: usize,
    /// 最大トレーラー行長 (デフォルト: 8KB)
    pub max_trailer_line_size: usize,
    /// 最大トレーラー数 (デフォルト: 100)
    pub max_trailers_count: usize,
    /// 最大ボディサイズ (デフォルト: 無制限)
    ///
    /// 宣言されたチャンクサイズの合計で判定する。
    pub max_body_size: usize,
    /// 1 回のブロッキング読み取りで要求するバイト数 (デフォルト: 8KB)
    pub read_buffer_size: usize,
}

impl Default for DecoderLimits {
    fn default() -> Self {
        Self {
            max_chunk_line_size: 1024,
            max_trailer_line_size: 8 * 1024, // 8KB
            max_trailers_count: 100,
            max_body_size: usize::MAX,
            read_buffer_size: 8 * 1024, // 8KB
        }
    }
}

impl DecoderLimits {
    /// 制限なしの設定を作成
    ///
    /// read_buffer_size はデフォルトのまま。
    pub fn unlimited() -> Self {
        Self {
            max_chunk_line_size: usize::MAX,
            max_trailer_line_size: usize::MAX,
            max_trailers_count: usize::MAX,
            max_body_size: usize::MAX,
            ..Self::default()
        }
    }
}
