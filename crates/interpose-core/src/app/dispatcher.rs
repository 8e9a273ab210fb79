//! Dispatcher - 1 回の呼び出しを behavior で包んで実行する
//!
//! # 処理フロー
//! 1. resolve: marker → (behavior, context)。失敗したら hook も本体も走らない
//! 2. before: OrderBefore 順に before_invoke。失敗したら即終了（after なし）
//! 3. proceed: bypass されていなければ本体を実行し、非同期なら settle まで待つ
//! 4. after: OrderAfter 順に after_invoke を各 context ちょうど一度
//! 5. 結果を返す
//!
//! # after の失敗
//! after hook は一つが失敗しても残りを全部実行する。呼び出し側に返るのは
//! 最後に起きた失敗で、上書きされた失敗の数は `DispatchError::Hook::suppressed`
//! に入る。本体の失敗も後続の after の失敗で上書きされる。

use std::sync::Arc;

use tracing::{Instrument, debug, debug_span, trace, warn};

use crate::app::config::Configuration;
use crate::app::resolver::{ResolvedContext, Resolver};
use crate::domain::{
    Arguments, ContextState, DispatchPhase, InvocationContext, InvocationId, Marker, MethodInfo,
    ReturnSlot, ReturnValue, Scratch,
};
use crate::domain::context::SlotAccess;
use crate::error::{ConfigurationError, DispatchError};
use crate::ports::{
    BehaviorFactory, CallResult, IdGenerator, Proceed, SystemClock, UlidGenerator, is_permutation,
};

/// Dispatcher は Configuration と BehaviorFactory を束ねる
///
/// `Send + Sync`。同じ Dispatcher を並行する呼び出しから共有してよい。
/// 呼び出しごとの状態（context, scratch, 戻り値スロット）は
/// `dispatch` のローカルにしか存在しない。
pub struct Dispatcher {
    config: Arc<Configuration>,
    factory: Arc<dyn BehaviorFactory>,
    ids: Arc<dyn IdGenerator>,
}

impl Dispatcher {
    pub fn new(config: Arc<Configuration>, factory: Arc<dyn BehaviorFactory>) -> Self {
        Self {
            config,
            factory,
            ids: Arc::new(UlidGenerator::new(SystemClock)),
        }
    }

    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn configuration(&self) -> &Configuration {
        &self.config
    }

    /// Runs `proceed` wrapped by the behaviors bound to `markers`.
    ///
    /// Returns once the call has settled and every After hook has run.
    pub async fn dispatch(
        &self,
        method: &MethodInfo,
        markers: &[Arc<dyn Marker>],
        arguments: Arguments,
        proceed: Box<dyn Proceed + '_>,
    ) -> Result<Option<ReturnValue>, DispatchError> {
        let invocation_id = self.ids.generate_invocation_id();
        let span = debug_span!(
            "interpose.dispatch",
            invocation = %invocation_id,
            method = %method
        );
        self.run(invocation_id, method, markers, arguments, proceed)
            .instrument(span)
            .await
    }

    async fn run(
        &self,
        invocation_id: InvocationId,
        method: &MethodInfo,
        markers: &[Arc<dyn Marker>],
        mut arguments: Arguments,
        proceed: Box<dyn Proceed + '_>,
    ) -> Result<Option<ReturnValue>, DispatchError> {
        trace!(phase = %DispatchPhase::Idle, method = %method);
        trace!(phase = %DispatchPhase::Resolving, markers = markers.len());
        let mut contexts = Resolver::new(&self.config, self.factory.as_ref()).resolve(method, markers)?;

        if contexts.is_empty() {
            trace!("no behaviors matched, calling through");
            let settled = proceed.proceed(&mut arguments).settle().await;
            return Self::normalize(method, settled).map_err(|source| DispatchError::Invocation {
                method: method.to_string(),
                source,
            });
        }

        let (before, after) = self.traversal(&contexts)?;
        debug!(
            contexts = contexts.len(),
            ordering = self.config.ordering().name(),
            "resolved behaviors"
        );

        let scratch = Scratch::new();
        let mut slot = ReturnSlot::new();

        trace!(phase = %DispatchPhase::Before);
        for &index in &before {
            let (behavior, state) = contexts[index].parts_mut();
            let name = behavior.name();
            trace!(behavior = name, order = state.declaration_order(), "before_invoke");
            let mut cx = InvocationContext::new(
                invocation_id,
                method,
                markers,
                state,
                &scratch,
                &mut arguments,
                SlotAccess::Open(&mut slot),
            );
            behavior
                .before_invoke(&mut cx)
                .await
                .map_err(|source| DispatchError::Hook {
                    phase: DispatchPhase::Before,
                    behavior: name,
                    suppressed: 0,
                    source,
                })?;
        }

        let mut failure: Option<DispatchError> = None;
        let bypassed = contexts.iter().any(|c| c.state().is_bypassed());

        if bypassed && !method.is_async() {
            debug!("underlying call bypassed");
        } else {
            if bypassed {
                warn!("bypass requested on an asynchronous call, ignoring it");
            }
            trace!(phase = %DispatchPhase::Proceeding);
            let settled = proceed.proceed(&mut arguments).settle().await;
            match Self::normalize(method, settled) {
                Ok(value) => slot.complete(value),
                Err(source) => {
                    debug!(error = %source, "invocation failed");
                    for &index in &after {
                        contexts[index].state_mut().mark_errored();
                    }
                    failure = Some(DispatchError::Invocation {
                        method: method.to_string(),
                        source,
                    });
                }
            }
        }

        trace!(phase = %DispatchPhase::After);
        let mut suppressed = 0;
        for &index in &after {
            let (behavior, state) = contexts[index].parts_mut();
            let name = behavior.name();
            let result = if state.is_errored() { None } else { slot.value() };
            trace!(behavior = name, order = state.declaration_order(), "after_invoke");
            let mut cx = InvocationContext::new(
                invocation_id,
                method,
                markers,
                state,
                &scratch,
                &mut arguments,
                SlotAccess::Sealed(result),
            );
            if let Err(source) = behavior.after_invoke(&mut cx, result).await {
                if let Some(previous) = failure.take() {
                    warn!(error = %previous, "failure overwritten by a later after hook");
                    suppressed += 1;
                }
                failure = Some(DispatchError::Hook {
                    phase: DispatchPhase::After,
                    behavior: name,
                    suppressed,
                    source,
                });
            }
        }

        trace!(phase = %DispatchPhase::Done);
        match failure {
            Some(err) => Err(err),
            None => Ok(slot.take()),
        }
    }

    /// Validated before/after traversal orders for `contexts`.
    fn traversal(
        &self,
        contexts: &[ResolvedContext],
    ) -> Result<(Vec<usize>, Vec<usize>), ConfigurationError> {
        let strategy = self.config.ordering();
        let states: Vec<&ContextState> = contexts.iter().map(ResolvedContext::state).collect();

        let before = strategy.order_before(&states);
        if !is_permutation(&before, states.len()) {
            return Err(ConfigurationError::InvalidOrdering {
                strategy: strategy.name(),
                phase: DispatchPhase::Before,
            });
        }
        let after = strategy.order_after(&states);
        if !is_permutation(&after, states.len()) {
            return Err(ConfigurationError::InvalidOrdering {
                strategy: strategy.name(),
                phase: DispatchPhase::After,
            });
        }
        Ok((before, after))
    }

    /// An asynchronous call declared as `()` completes without a value.
    fn normalize(method: &MethodInfo, settled: CallResult) -> CallResult {
        settled.map(|value| {
            if method.is_async() && method.returns().is_unit() {
                None
            } else {
                value
            }
        })
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
