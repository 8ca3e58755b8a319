//! UseCase: 共同画像生成（Generation Coordinator）
//!
//! 1. ルームの存在確認（存在しなければ何もしない）
//! 2. ルーム全体に `loading` を通知
//! 3. Image Generation Service を呼ぶ（失敗・タイムアウトは `error` を通知して終了）
//! 4. Blob Storage Service にアップロード（失敗は 3 と同じ扱い、リトライしない）
//! 5. 履歴の先頭に追加（容量超過で追い出されたエントリの画像は削除する）
//! 6. ルーム全体に画像 → 履歴一覧 → `success` の順で通知
//!
//! 外部呼び出し（3, 4）はルームのロックの外で行うため、同じルームで重なった生成は
//! 終わった順に履歴に追加される。
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - GenerationCoordinator::execute() メソッド
//! - 成功時の通知順、失敗時の通知と履歴の不変、履歴の追い出しと画像削除、孤立した画像の削除
//!
//! ### なぜこのテストが必要か
//! - 外部サービスの失敗がルームを `loading` のまま放置しないことを保証する
//! - 追い出された画像がストレージに残り続けないことを保証する
//!
//! ### どのような状況を想定しているか
//! - 正常系：生成成功、21 件目の生成による追い出し
//! - 異常系：生成失敗、アップロード失敗、タイムアウト
//! - エッジケース：生成中にルームが削除された、不正なプロンプト

use std::{future::Future, sync::Arc, time::Duration};

use tsudoi_shared::time::Clock;

use crate::domain::{
    BlobStorage, DisplayName, GenerationError, HistoryEntry, ImageGenerator, Prompt,
    RepositoryError, RoomEvent, RoomId, RoomRepository, StorageError, StorageHandle, Timestamp,
};

use super::{RoomBroadcaster, error::GenerateError};

/// 外部サービス呼び出しのデフォルトのタイムアウト
pub const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(60);

pub struct GenerationCoordinator {
    rooms: Arc<dyn RoomRepository>,
    broadcaster: Arc<RoomBroadcaster>,
    generator: Arc<dyn ImageGenerator>,
    storage: Arc<dyn BlobStorage>,
    clock: Arc<dyn Clock>,
    timeout: Duration,
}

impl GenerationCoordinator {
    pub fn new(
        rooms: Arc<dyn RoomRepository>,
        broadcaster: Arc<RoomBroadcaster>,
        generator: Arc<dyn ImageGenerator>,
        storage: Arc<dyn BlobStorage>,
        clock: Arc<dyn Clock>,
        timeout: Duration,
    ) -> Self {
        Self {
            rooms,
            broadcaster,
            generator,
            storage,
            clock,
            timeout,
        }
    }

    /// 画像を生成してルームの履歴に追加する
    ///
    /// # Arguments
    ///
    /// * `room` - クライアントが指定したルーム ID
    /// * `prompt` - プロンプト（前後の空白は除去する）
    /// * `author` - 生成を依頼した参加者の表示名
    ///
    /// # Returns
    ///
    /// * `Ok(HistoryEntry)` - 追加した履歴エントリ
    /// * `Err(GenerateError)` - 失敗（`GenerationFailed` / `StorageFailed` はルームに通知済み）
    pub async fn execute(
        &self,
        room: &str,
        prompt: String,
        author: DisplayName,
    ) -> Result<HistoryEntry, GenerateError> {
        let room_id = RoomId::new(room.to_string())
            .map_err(|_| GenerateError::RoomNotFound(room.to_string()))?;
        let prompt = Prompt::new(prompt).map_err(GenerateError::InvalidPrompt)?;

        // 1. 存在確認
        self.rooms.get_room(&room_id).await.map_err(|e| match e {
            RepositoryError::RoomNotFound(id) => GenerateError::RoomNotFound(id),
            other => GenerateError::Repository(other),
        })?;

        // 2. loading
        self.broadcaster
            .to_room(&room_id, &RoomEvent::generation_loading(author.clone()))
            .await;
        tracing::info!("Generating image for room '{}' by '{}'", room_id, author);

        // 3. 生成
        let image = match self
            .with_timeout(self.generator.generate(&prompt), GenerationError::TimedOut)
            .await
        {
            Ok(image) => image,
            Err(e) => {
                tracing::error!("Image generation failed in room '{}': {}", room_id, e);
                self.announce_failure(&room_id, &author).await;
                return Err(GenerateError::GenerationFailed(e));
            }
        };

        // 4. アップロード
        let stored = match self
            .with_timeout(self.storage.upload(image), StorageError::TimedOut)
            .await
        {
            Ok(stored) => stored,
            Err(e) => {
                tracing::error!("Image upload failed in room '{}': {}", room_id, e);
                self.announce_failure(&room_id, &author).await;
                return Err(GenerateError::StorageFailed(e));
            }
        };

        // 5. 履歴に追加（ルームは引き直す）
        let entry = HistoryEntry {
            created_at: Timestamp::new(self.clock.now_millis()),
            image_url: stored.url,
            storage_handle: stored.handle,
            prompt,
            author,
        };
        let update = match self.rooms.push_history(&room_id, entry.clone()).await {
            Ok(update) => update,
            Err(RepositoryError::RoomNotFound(id)) => {
                tracing::info!(
                    "Room '{}' was deleted during generation, discarding result",
                    id
                );
                self.delete_images(&room_id, vec![entry.storage_handle.clone()])
                    .await;
                return Err(GenerateError::RoomNotFound(id));
            }
            Err(e) => return Err(GenerateError::Repository(e)),
        };

        // 6. 画像 → 履歴一覧 → success
        self.broadcaster
            .to_room(
                &room_id,
                &RoomEvent::SharedImage {
                    image_url: entry.image_url.clone(),
                    prompt: entry.prompt.as_str().to_string(),
                    author: entry.author.as_str().to_string(),
                },
            )
            .await;
        self.broadcaster
            .to_room(
                &room_id,
                &RoomEvent::HistoryChanged {
                    history: update.history,
                },
            )
            .await;
        self.broadcaster
            .to_room(
                &room_id,
                &RoomEvent::generation_success(entry.author.clone()),
            )
            .await;
        tracing::info!("Image generated for room '{}'", room_id);

        if let Some(evicted) = update.evicted {
            tracing::debug!(
                "History of room '{}' is full, evicting '{}'",
                room_id,
                evicted.storage_handle
            );
            self.delete_images(&room_id, vec![evicted.storage_handle])
                .await;
        }

        Ok(entry)
    }

    async fn with_timeout<T, E>(
        &self,
        call: impl Future<Output = Result<T, E>>,
        on_timeout: impl FnOnce(Duration) -> E,
    ) -> Result<T, E> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(on_timeout(self.timeout)),
        }
    }

    async fn announce_failure(&self, room_id: &RoomId, author: &DisplayName) {
        self.broadcaster
            .to_room(room_id, &RoomEvent::generation_error(author.clone()))
            .await;
    }

    async fn delete_images(&self, room_id: &RoomId, handles: Vec<StorageHandle>) {
        if let Err(e) = self.storage.delete_many(handles).await {
            tracing::error!("Failed to delete images of room '{}': {}", room_id, e);
        }
    }
}
