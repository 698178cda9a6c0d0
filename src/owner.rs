/// ボディを読み終えた接続の持ち主
///
/// [`ChunkedReader`](crate::ChunkedReader) はどちらか一方を一度だけ呼ぶ。
pub trait ConnectionOwner {
    /// ボディを最後まで読み終えた。接続は再利用できる
    ///
    /// `leftover` はボディの後ろまで読み込んでしまったデータ (パイプライン化された次のメッセージなど)。
    /// 接続を再利用する場合は、下位ストリームより先にこのデータを読む必要がある。
    fn on_complete(&mut self, leftover: &[u8]);

    /// ボディを読み終えられなかった。接続は閉じる必要がある
    fn on_discard(&mut self);
}

impl<O: ConnectionOwner + ?Sized> ConnectionOwner for &mut O {
    fn on_complete(&mut self, leftover: &[u8]) {
        (**self).on_complete(leftover);
    }

    fn on_discard(&mut self) {
        (**self).on_discard();
    }
}

/// 接続を管理しない場合
impl ConnectionOwner for () {
    fn on_complete(&mut self, _leftover: &[u8]) {}

    fn on_discard(&mut self) {}
}
