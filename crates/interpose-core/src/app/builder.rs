//! DispatcherBuilder - Dispatcher の構築とワイヤリング
//!
//! # 学習ポイント
//! - Builder パターンの実装
//! - 起動時検証（Fail-fast 設計）
//! - 対応表の登録とコンストラクタの登録を一か所で行う

use std::sync::Arc;

use crate::app::config::ConfigurationBuilder;
use crate::app::dispatcher::Dispatcher;
use crate::app::settings::Settings;
use crate::domain::{BehaviorType, Marker, MarkerKind};
use crate::error::{BuildError, RegistryError};
use crate::ports::{IdGenerator, OrderingStrategy};
use crate::typed::{Behavior, BehaviorRegistry, Interceptor, TypedBehavior};

/// DispatcherBuilder は Dispatcher を構築
///
/// # 使用例
/// ```ignore
/// let dispatcher = DispatcherBuilder::new()
///     .intercept::<Transactable, _, _>(move || TransactionInterceptor::new(ledger.clone()))?
///     .intercept::<Logged, _, _>(|| LoggingInterceptor)?
///     .ordering(Pyramid)
///     .expect_markers(&[MarkerKind::of::<Transactable>(), MarkerKind::of::<Logged>()])
///     .build()?;
/// ```
///
/// # Fail-fast 設計
/// - expect_markers() で期待される marker kind を登録
/// - build() 時に「期待集合 ⊆ 対応表のキー」をチェック
/// - 不足があれば BuildError を返す
pub struct DispatcherBuilder {
    config: ConfigurationBuilder,
    registry: BehaviorRegistry,
    ids: Option<Arc<dyn IdGenerator>>,
}

impl DispatcherBuilder {
    pub fn new() -> Self {
        Self {
            config: ConfigurationBuilder::new(),
            registry: BehaviorRegistry::new(),
            ids: None,
        }
    }

    /// Interceptor を marker `M` に束縛して登録
    ///
    /// 対応表には常に追記する。同じ behavior 型のコンストラクタが
    /// 既にあれば最初のものを使い続ける。
    ///
    /// # Example
    /// ```ignore
    /// builder.intercept::<Logged, _, _>(|| LoggingInterceptor)?;
    /// ```
    pub fn intercept<M, I, F>(mut self, ctor: F) -> Result<Self, RegistryError>
    where
        M: Marker,
        I: Interceptor<M>,
        F: Fn() -> I + Send + Sync + 'static,
    {
        let behavior_type = TypedBehavior::<M, I>::behavior_type();
        if !self.registry.contains(&behavior_type) {
            self.registry.register_interceptor::<M, I, F>(ctor)?;
        }
        Ok(self.append_mapping(MarkerKind::of::<M>(), behavior_type))
    }

    /// 型なしの Behavior を marker `M` に束縛して登録
    ///
    /// 一つの behavior を複数の marker kind に束縛できる。
    pub fn behavior<M, B, F>(mut self, ctor: F) -> Result<Self, RegistryError>
    where
        M: Marker,
        B: Behavior + 'static,
        F: Fn() -> B + Send + Sync + 'static,
    {
        let behavior_type = BehaviorType::of::<B>();
        if !self.registry.contains(&behavior_type) {
            self.registry.register::<B, F>(ctor)?;
        }
        Ok(self.append_mapping(MarkerKind::of::<M>(), behavior_type))
    }

    fn append_mapping(mut self, marker: MarkerKind, behavior: BehaviorType) -> Self {
        self.config = self.config.register_mapping(marker, behavior);
        self
    }

    pub fn ignore_unmapped(mut self, ignore: bool) -> Self {
        self.config = self.config.set_ignore_unmapped(ignore);
        self
    }

    pub fn ordering(mut self, strategy: impl OrderingStrategy + 'static) -> Self {
        self.config = self.config.set_ordering_strategy(strategy);
        self
    }

    pub fn settings(mut self, settings: &Settings) -> Self {
        self.config = self.config.apply_settings(settings);
        self
    }

    pub fn expect_markers(mut self, markers: &[MarkerKind]) -> Self {
        self.config = self.config.expect_markers(markers);
        self
    }

    pub fn id_generator(mut self, ids: impl IdGenerator + 'static) -> Self {
        self.ids = Some(Arc::new(ids));
        self
    }

    /// DispatcherBuilder を構築して Dispatcher を生成
    ///
    /// # 検証
    /// - expect_markers() で設定された marker kind が全て対応付けられているかチェック
    /// - 不足があれば BuildError::MissingMappings を返す
    pub fn build(self) -> Result<Dispatcher, BuildError> {
        let config = self.config.build()?;
        let dispatcher = Dispatcher::new(Arc::new(config), Arc::new(self.registry));
        Ok(match self.ids {
            Some(ids) => dispatcher.with_id_generator(ids),
            None => dispatcher,
        })
    }
}

impl Default for DispatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}
