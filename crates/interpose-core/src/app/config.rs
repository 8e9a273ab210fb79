//! Configuration - marker → behavior の対応表と dispatch の方針
//!
//! 起動時に一度だけ組み立て、以降は読み取り専用。
//! `Arc<Configuration>` として並行する dispatch から同期なしで共有する。

use std::fmt;

use crate::app::settings::Settings;
use crate::domain::{BehaviorType, Marker, MarkerKind};
use crate::error::BuildError;
use crate::impls::Pyramid;
use crate::ports::OrderingStrategy;
use crate::typed::Behavior;

/// (marker kind, behavior type) の組
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mapping {
    pub marker: MarkerKind,
    pub behavior: BehaviorType,
}

pub struct Configuration {
    mappings: Vec<Mapping>,
    ordering: Box<dyn OrderingStrategy>,
    ignore_unmapped: bool,
}

impl Configuration {
    pub fn builder() -> ConfigurationBuilder {
        ConfigurationBuilder::new()
    }

    pub fn mappings(&self) -> &[Mapping] {
        &self.mappings
    }

    /// First registered mapping for `marker` wins.
    pub fn behavior_for(&self, marker: &MarkerKind) -> Option<BehaviorType> {
        self.mappings
            .iter()
            .find(|m| m.marker == *marker)
            .map(|m| m.behavior)
    }

    pub fn ordering(&self) -> &dyn OrderingStrategy {
        self.ordering.as_ref()
    }

    pub fn ignore_unmapped(&self) -> bool {
        self.ignore_unmapped
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            mappings: Vec::new(),
            ordering: Box::new(Pyramid),
            ignore_unmapped: false,
        }
    }
}

impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configuration")
            .field("mappings", &self.mappings)
            .field("ordering", &self.ordering.name())
            .field("ignore_unmapped", &self.ignore_unmapped)
            .finish()
    }
}

/// ConfigurationBuilder は Configuration を組み立てる
///
/// # 使用例
/// ```ignore
/// let config = Configuration::builder()
///     .map::<Transactable, TransactionBehavior>()
///     .set_ordering_strategy(Sequential)
///     .expect_markers(&[MarkerKind::of::<Transactable>()])
///     .build()?;
/// ```
///
/// # Fail-fast 設計
/// - expect_markers() で期待される marker kind を登録
/// - build() 時に「期待集合 ⊆ 対応表のキー」をチェック
/// - 不足があれば BuildError を返す
pub struct ConfigurationBuilder {
    mappings: Vec<Mapping>,
    ordering: Box<dyn OrderingStrategy>,
    ignore_unmapped: bool,
    expected_markers: Option<Vec<MarkerKind>>,
}

impl ConfigurationBuilder {
    pub fn new() -> Self {
        Self {
            mappings: Vec::new(),
            ordering: Box::new(Pyramid),
            ignore_unmapped: false,
            expected_markers: None,
        }
    }

    /// Appends a mapping. Duplicates are kept; resolution uses the first.
    pub fn register_mapping(mut self, marker: MarkerKind, behavior: BehaviorType) -> Self {
        self.mappings.push(Mapping { marker, behavior });
        self
    }

    pub fn map<M: Marker, B: Behavior + 'static>(self) -> Self {
        self.register_mapping(MarkerKind::of::<M>(), BehaviorType::of::<B>())
    }

    pub fn set_ignore_unmapped(mut self, ignore: bool) -> Self {
        self.ignore_unmapped = ignore;
        self
    }

    pub fn set_ordering_strategy(mut self, strategy: impl OrderingStrategy + 'static) -> Self {
        self.ordering = Box::new(strategy);
        self
    }

    pub fn apply_settings(mut self, settings: &Settings) -> Self {
        self.ordering = settings.ordering.strategy();
        self.ignore_unmapped = settings.ignore_unmapped;
        self
    }

    pub fn expect_markers(mut self, markers: &[MarkerKind]) -> Self {
        self.expected_markers = Some(markers.to_vec());
        self
    }

    pub fn build(self) -> Result<Configuration, BuildError> {
        if let Some(expected) = &self.expected_markers {
            let missing: Vec<&'static str> = expected
                .iter()
                .filter(|kind| !self.mappings.iter().any(|m| m.marker == **kind))
                .map(MarkerKind::name)
                .collect();
            if !missing.is_empty() {
                return Err(BuildError::MissingMappings(missing));
            }
        }
        Ok(Configuration {
            mappings: self.mappings,
            ordering: self.ordering,
            ignore_unmapped: self.ignore_unmapped,
        })
    }
}

impl Default for ConfigurationBuilder {
    fn default() -> Self {
        Self::new()
    }
}
