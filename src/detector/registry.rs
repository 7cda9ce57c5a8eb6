use crate::config::Config;
use lesion_vision_common::LesionCategory;
use std::collections::BTreeMap;

/// カテゴリ → 検出サービスURL
///
/// 未設定のカテゴリは `resolve` が None を返し、呼び出し側で即失敗扱いになる。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectorRegistry {
    addresses: BTreeMap<LesionCategory, String>,
}

impl DetectorRegistry {
    pub fn new(addresses: BTreeMap<LesionCategory, String>) -> Self {
        let addresses = addresses
            .into_iter()
            .map(|(category, url)| (category, url.trim().to_string()))
            .filter(|(_, url)| !url.is_empty())
            .collect();
        Self { addresses }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.detectors.clone())
    }

    pub fn resolve(&self, category: LesionCategory) -> Option<&str> {
        self.addresses.get(&category).map(String::as_str)
    }

    /// URLが設定されているカテゴリ数
    pub fn configured_count(&self) -> usize {
        self.addresses.len()
    }
}
