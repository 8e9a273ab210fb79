//! App - アプリケーション層
//!
//! ports と typed を組み合わせて dispatch パイプラインを実装する。
//!
//! # 主要コンポーネント
//! - **Configuration**: marker → behavior の対応表と走査順
//! - **Resolver**: marker 列から context 列を作る
//! - **Dispatcher**: before → proceed → after の実行
//! - **DispatcherBuilder**: ワイヤリングと起動時検証
//! - **Proxy**: 対象オブジェクトへの呼び出しを Dispatcher 経由にする
//! - **Settings**: TOML からの設定読み込み

pub mod builder;
pub mod config;
pub mod dispatcher;
pub mod proxy;
pub mod resolver;
pub mod settings;

// 主要な型を再エクスポート
pub use self::builder::DispatcherBuilder;
pub use self::config::{Configuration, ConfigurationBuilder, Mapping};
pub use self::dispatcher::Dispatcher;
pub use self::proxy::Proxy;
pub use self::resolver::{ResolvedContext, Resolver};
pub use self::settings::{OrderingKind, Settings};
