//! フィルタ定義
//!
//! 抽出対象を絞り込むためのフィルタ（固定の列挙）と、
//! ユーザーが選択中のフィルタ集合

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::Result;

/// 選択可能なフィルタ
///
/// シリアライズ時はサーバーが期待するラベル文字列になる
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FilterOption {
    #[serde(rename = "Cabin Air Filter")]
    CabinAirFilter,
    #[serde(rename = "Engine Air Filter")]
    EngineAirFilter,
    #[serde(rename = "Oil Capacity")]
    OilCapacity,
    #[serde(rename = "Oil Filters")]
    OilFilters,
    #[serde(rename = "Oil Types")]
    OilTypes,
}

impl FilterOption {
    /// 表示順の全フィルタ
    pub const ALL: [FilterOption; 5] = [
        FilterOption::CabinAirFilter,
        FilterOption::EngineAirFilter,
        FilterOption::OilCapacity,
        FilterOption::OilFilters,
        FilterOption::OilTypes,
    ];

    /// サーバーへ送るラベル
    pub fn label(&self) -> &'static str {
        match self {
            FilterOption::CabinAirFilter => "Cabin Air Filter",
            FilterOption::EngineAirFilter => "Engine Air Filter",
            FilterOption::OilCapacity => "Oil Capacity",
            FilterOption::OilFilters => "Oil Filters",
            FilterOption::OilTypes => "Oil Types",
        }
    }

    /// CLI引数用のID (kebab-case)
    pub fn id(&self) -> &'static str {
        match self {
            FilterOption::CabinAirFilter => "cabin-air-filter",
            FilterOption::EngineAirFilter => "engine-air-filter",
            FilterOption::OilCapacity => "oil-capacity",
            FilterOption::OilFilters => "oil-filters",
            FilterOption::OilTypes => "oil-types",
        }
    }
}

impl fmt::Display for FilterOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for FilterOption {
    type Err = String;

    /// ラベル・IDどちらでも受け付ける（大文字小文字は区別しない）
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let needle = s.trim();
        FilterOption::ALL
            .iter()
            .copied()
            .find(|f| f.label().eq_ignore_ascii_case(needle) || f.id().eq_ignore_ascii_case(needle))
            .ok_or_else(|| {
                let ids: Vec<&str> = FilterOption::ALL.iter().map(|f| f.id()).collect();
                format!("Unknown filter: {}. Use one of {}", s, ids.join(", "))
            })
    }
}

/// 選択中のフィルタ集合
///
/// 順序に意味はない。JSON化するとラベル文字列の配列になる
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SelectedFilters(BTreeSet<FilterOption>);

impl SelectedFilters {
    pub const fn new() -> Self {
        Self(BTreeSet::new())
    }

    /// 未選択なら追加、選択済みなら削除
    ///
    /// 戻り値はトグル後に選択状態かどうか
    pub fn toggle(&mut self, option: FilterOption) -> bool {
        if self.0.remove(&option) {
            false
        } else {
            self.0.insert(option);
            true
        }
    }

    pub fn contains(&self, option: FilterOption) -> bool {
        self.0.contains(&option)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = FilterOption> + '_ {
        self.0.iter().copied()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn labels(&self) -> Vec<&'static str> {
        self.0.iter().map(|f| f.label()).collect()
    }

    /// multipartの `filters` パートに載せるJSON配列
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.0)?)
    }
}

impl FromIterator<FilterOption> for SelectedFilters {
    fn from_iter<I: IntoIterator<Item = FilterOption>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
