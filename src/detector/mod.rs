//! 外部検出サービス連携
//!
//! - registry: カテゴリ → サービスURL の静的マップ
//! - client: 1カテゴリ分の呼び出しと結果の正規化

mod client;
mod registry;

pub use client::DetectorClient;
pub use registry::DetectorRegistry;
