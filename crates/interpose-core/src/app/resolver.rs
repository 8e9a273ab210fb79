//! Resolver - marker 列から context 列を作る
//!
//! # 手順
//! 1. 宣言順に marker を走査
//! 2. Configuration で behavior 型を引く（最初の登録が勝つ）
//! 3. BehaviorFactory で呼び出し専用のインスタンスを作る
//!
//! 対応のない marker は `ignore_unmapped` なら飛ばし、そうでなければ
//! `ConfigurationError::UnmappedMarker` で解決全体を失敗させる。
//! 飛ばした marker は宣言順の番号を消費しない。

use std::sync::Arc;

use tracing::trace;

use crate::app::config::Configuration;
use crate::domain::{ContextState, Marker, MethodInfo};
use crate::error::ConfigurationError;
use crate::ports::BehaviorFactory;
use crate::typed::Behavior;

/// A matched marker with the behavior instance built for it.
pub struct ResolvedContext {
    state: ContextState,
    behavior: Box<dyn Behavior>,
}

impl ResolvedContext {
    pub fn state(&self) -> &ContextState {
        &self.state
    }

    pub fn behavior_name(&self) -> &'static str {
        self.behavior.name()
    }

    pub(crate) fn state_mut(&mut self) -> &mut ContextState {
        &mut self.state
    }

    pub(crate) fn parts_mut(&mut self) -> (&mut dyn Behavior, &mut ContextState) {
        (self.behavior.as_mut(), &mut self.state)
    }
}

impl std::fmt::Debug for ResolvedContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedContext")
            .field("state", &self.state)
            .field("behavior", &self.behavior.name())
            .finish()
    }
}

pub struct Resolver<'a> {
    config: &'a Configuration,
    factory: &'a dyn BehaviorFactory,
}

impl<'a> Resolver<'a> {
    pub fn new(config: &'a Configuration, factory: &'a dyn BehaviorFactory) -> Self {
        Self { config, factory }
    }

    pub fn resolve(
        &self,
        method: &MethodInfo,
        markers: &[Arc<dyn Marker>],
    ) -> Result<Vec<ResolvedContext>, ConfigurationError> {
        let mut contexts = Vec::with_capacity(markers.len());

        for marker in markers {
            let kind = marker.kind();
            let Some(behavior_type) = self.config.behavior_for(&kind) else {
                if self.config.ignore_unmapped() {
                    trace!(marker = %kind, "skipping unmapped marker");
                    continue;
                }
                return Err(ConfigurationError::UnmappedMarker {
                    marker: kind.name(),
                    method: method.to_string(),
                });
            };

            let behavior = self.factory.create(&behavior_type).map_err(|source| {
                ConfigurationError::BehaviorUnavailable {
                    behavior: behavior_type.name(),
                    source,
                }
            })?;

            let order = contexts.len();
            trace!(marker = %kind, behavior = %behavior_type, order, "resolved");
            contexts.push(ResolvedContext {
                state: ContextState::new(Arc::clone(marker), order),
                behavior,
            });
        }

        Ok(contexts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BehaviorType;
    use crate::error::BoxError;
    use crate::typed::BehaviorRegistry;
    use async_trait::async_trait;

    #[derive(Debug)]
    struct Transactable;
    impl Marker for Transactable {}

    #[derive(Debug)]
    struct Logged;
    impl Marker for Logged {}

    #[derive(Debug)]
    struct Cached;
    impl Marker for Cached {}

    struct TxBehavior;
    #[async_trait]
    impl Behavior for TxBehavior {}

    struct LogBehavior;
    #[async_trait]
    impl Behavior for LogBehavior {}

    struct Unbuildable;
    #[async_trait]
    impl Behavior for Unbuildable {}

    struct RefusingFactory;
    impl BehaviorFactory for RefusingFactory {
        fn create(&self, _behavior_type: &BehaviorType) -> Result<Box<dyn Behavior>, BoxError> {
            Err("container is closed".into())
        }
    }

    fn registry() -> BehaviorRegistry {
        let mut registry = BehaviorRegistry::new();
        registry.register(|| TxBehavior).unwrap();
        registry.register(|| LogBehavior).unwrap();
        registry
    }

    fn method() -> MethodInfo {
        MethodInfo::sync::<u32>("shop::Sales", "create")
    }

    fn markers() -> Vec<Arc<dyn Marker>> {
        vec![Arc::new(Transactable), Arc::new(Cached), Arc::new(Logged)]
    }

    #[test]
    fn unmapped_marker_fails_resolution() {
        let config = Configuration::builder()
            .map::<Transactable, TxBehavior>()
            .map::<Logged, LogBehavior>()
            .build()
            .unwrap();
        let registry = registry();

        let err = Resolver::new(&config, &registry)
            .resolve(&method(), &markers())
            .unwrap_err();
        match err {
            ConfigurationError::UnmappedMarker { marker, method } => {
                assert!(marker.ends_with("Cached"));
                assert_eq!(method, "shop::Sales::create");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn ignored_markers_do_not_consume_an_order() {
        let config = Configuration::builder()
            .map::<Transactable, TxBehavior>()
            .map::<Logged, LogBehavior>()
            .set_ignore_unmapped(true)
            .build()
            .unwrap();
        let registry = registry();

        let contexts = Resolver::new(&config, &registry)
            .resolve(&method(), &markers())
            .unwrap();

        assert_eq!(contexts.len(), 2);
        assert!(contexts[0].state().marker().is::<Transactable>());
        assert_eq!(contexts[0].state().declaration_order(), 0);
        assert!(contexts[1].state().marker().is::<Logged>());
        assert_eq!(contexts[1].state().declaration_order(), 1);
        assert!(contexts[1].behavior_name().ends_with("LogBehavior"));
        assert!(contexts.iter().all(|c| !c.state().is_errored()));
    }

    #[test]
    fn repeated_markers_get_their_own_instances() {
        let config = Configuration::builder()
            .map::<Transactable, TxBehavior>()
            .build()
            .unwrap();
        let registry = registry();
        let markers: Vec<Arc<dyn Marker>> = vec![Arc::new(Transactable), Arc::new(Transactable)];

        let contexts = Resolver::new(&config, &registry)
            .resolve(&method(), &markers)
            .unwrap();
        assert_eq!(contexts.len(), 2);
        assert_eq!(contexts[1].state().declaration_order(), 1);
    }

    #[test]
    fn factory_failure_is_behavior_unavailable() {
        let config = Configuration::builder()
            .map::<Transactable, Unbuildable>()
            .build()
            .unwrap();

        let err = Resolver::new(&config, &RefusingFactory)
            .resolve(&method(), &[Arc::new(Transactable) as Arc<dyn Marker>])
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::BehaviorUnavailable { behavior, .. } if behavior.ends_with("Unbuildable")
        ));
    }

    #[test]
    fn no_markers_resolve_to_nothing() {
        let config = Configuration::default();
        let registry = registry();
        let contexts = Resolver::new(&config, &registry).resolve(&method(), &[]).unwrap();
        assert!(contexts.is_empty());
    }
}
