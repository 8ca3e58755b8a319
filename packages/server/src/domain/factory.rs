//! Factory: ID の生成

use uuid::Uuid;

use super::{RoomId, ValueObjectError};

/// ルーム ID の Factory
pub struct RoomIdFactory;

impl RoomIdFactory {
    /// ランダムな 3 バイトを英大文字の 16 進数 6 文字にした ID を生成
    ///
    /// 一意性は保証しない。現存ルームとの衝突チェックは Room Store が行う。
    pub fn generate() -> Result<RoomId, ValueObjectError> {
        let bytes = Uuid::new_v4().into_bytes();
        RoomId::new(format!("{:02X}{:02X}{:02X}", bytes[0], bytes[1], bytes[2]))
    }
}
