//! BehaviorRegistry - behavior のコンストラクタ登録と生成
//!
//! `BehaviorFactory` の標準実装。behavior 型ごとにコンストラクタを持ち、
//! 呼び出しのたびに新しいインスタンスを作る。
//!
//! # 学習ポイント
//! - HashMap での型消去されたコンストラクタの管理
//! - Generic methods での登録と型安全性
//! - Arc による共有所有権（Registry 自体は並行 dispatch から共有される）

use std::collections::HashMap;
use std::sync::Arc;

use super::behavior::{Behavior, Interceptor, TypedBehavior};
use crate::domain::{BehaviorType, Marker};
use crate::error::{BoxError, RegistryError};
use crate::ports::BehaviorFactory;

type Constructor = Arc<dyn Fn() -> Box<dyn Behavior> + Send + Sync>;

/// BehaviorRegistry は behavior 型とコンストラクタを対応付ける
///
/// # 使用例
/// ```ignore
/// let mut registry = BehaviorRegistry::new();
/// let ty = registry.register_interceptor::<Transactable, _>({
///     let ledger = ledger.clone();
///     move || TransactionInterceptor::new(ledger.clone())
/// })?;
///
/// let behavior = registry.create(&ty)?;
/// ```
///
/// コンストラクタはクロージャなので、behavior の依存（DB ハンドルなど）は
/// 登録時にキャプチャして渡す。
#[derive(Default)]
pub struct BehaviorRegistry {
    constructors: HashMap<BehaviorType, Constructor>,
}

impl BehaviorRegistry {
    pub fn new() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    pub fn register<B, F>(&mut self, ctor: F) -> Result<BehaviorType, RegistryError>
    where
        B: Behavior + 'static,
        F: Fn() -> B + Send + Sync + 'static,
    {
        let behavior_type = BehaviorType::of::<B>();
        self.insert(behavior_type, Arc::new(move || Box::new(ctor()) as Box<dyn Behavior>))?;
        Ok(behavior_type)
    }

    pub fn register_interceptor<M, I, F>(&mut self, ctor: F) -> Result<BehaviorType, RegistryError>
    where
        M: Marker,
        I: Interceptor<M>,
        F: Fn() -> I + Send + Sync + 'static,
    {
        let behavior_type = TypedBehavior::<M, I>::behavior_type();
        self.insert(
            behavior_type,
            Arc::new(move || Box::new(TypedBehavior::<M, I>::new(ctor())) as Box<dyn Behavior>),
        )?;
        Ok(behavior_type)
    }

    pub fn contains(&self, behavior_type: &BehaviorType) -> bool {
        self.constructors.contains_key(behavior_type)
    }

    pub fn registered_types(&self) -> Vec<BehaviorType> {
        self.constructors.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.constructors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }

    fn insert(&mut self, behavior_type: BehaviorType, ctor: Constructor) -> Result<(), RegistryError> {
        if self.constructors.contains_key(&behavior_type) {
            return Err(RegistryError::AlreadyRegistered(behavior_type.name()));
        }
        self.constructors.insert(behavior_type, ctor);
        Ok(())
    }
}

impl BehaviorFactory for BehaviorRegistry {
    fn create(&self, behavior_type: &BehaviorType) -> Result<Box<dyn Behavior>, BoxError> {
        let ctor = self
            .constructors
            .get(behavior_type)
            .ok_or(RegistryError::NotRegistered(behavior_type.name()))?;
        Ok(ctor())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::InvocationContext;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct Audited;
    impl Marker for Audited {}

    #[derive(Debug)]
    struct Traced;
    impl Marker for Traced {}

    struct Noop;

    #[async_trait]
    impl Behavior for Noop {}

    struct Audit;

    #[async_trait]
    impl Interceptor<Audited> for Audit {}

    #[async_trait]
    impl Interceptor<Traced> for Audit {
        async fn before(
            &mut self,
            _marker: &Traced,
            _cx: &mut InvocationContext<'_>,
        ) -> Result<(), BoxError> {
            Ok(())
        }
    }

    #[test]
    fn test_register_and_create() {
        let mut registry = BehaviorRegistry::new();
        let ty = registry.register(|| Noop).unwrap();

        assert!(registry.contains(&ty));
        let behavior = registry.create(&ty).unwrap();
        assert!(behavior.name().ends_with("Noop"));
    }

    #[test]
    fn test_double_registration() {
        let mut registry = BehaviorRegistry::new();
        registry.register(|| Noop).unwrap();
        let result = registry.register(|| Noop);
        assert!(matches!(result, Err(RegistryError::AlreadyRegistered(_))));
    }

    #[test]
    fn test_unregistered_type_fails() {
        let registry = BehaviorRegistry::new();
        let err = registry.create(&BehaviorType::of::<Noop>()).err().unwrap();
        assert!(err.to_string().contains("not registered"));
    }

    #[test]
    fn test_one_interceptor_bound_to_two_markers() {
        let mut registry = BehaviorRegistry::new();
        let audited = registry.register_interceptor::<Audited, _, _>(|| Audit).unwrap();
        let traced = registry.register_interceptor::<Traced, _, _>(|| Audit).unwrap();

        assert_ne!(audited, traced);
        assert_eq!(audited.name(), traced.name());
        assert_eq!(registry.len(), 2);
        assert!(registry.create(&audited).unwrap().name().ends_with("Audit"));
    }

    #[test]
    fn test_each_create_builds_a_fresh_instance() {
        let built = Arc::new(AtomicUsize::new(0));
        let mut registry = BehaviorRegistry::new();
        let ty = {
            let built = built.clone();
            registry
                .register(move || {
                    built.fetch_add(1, Ordering::SeqCst);
                    Noop
                })
                .unwrap()
        };

        registry.create(&ty).unwrap();
        registry.create(&ty).unwrap();
        assert_eq!(built.load(Ordering::SeqCst), 2);
    }
}
