//! Domain model (markers, arguments, return slot, invocation context, ...).
//!
//! dispatch パイプラインが扱う値の型をまとめる。
//! 振る舞い（hook）や協調者（factory, proceed）は ports / typed 側に置く。

pub mod arguments;
pub mod call;
pub mod context;
pub mod ids;
pub mod marker;
pub mod state;

pub use self::arguments::Arguments;
pub use self::call::{CallShape, MethodInfo, ReturnSlot, ReturnType, ReturnValue};
pub use self::context::{ContextState, InvocationContext, Scratch};
pub use self::ids::{IdPrefix, InvocationId};
pub use self::marker::{BehaviorType, Marker, MarkerKind};
pub use self::state::DispatchPhase;
