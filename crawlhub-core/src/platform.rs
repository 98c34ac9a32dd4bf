//! Supported content platforms
//!
//! The set of platforms is closed and fixed at build time. Tokens are
//! case-sensitive and match the values accepted on the command line.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::CrawlError;

/// A supported content platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    #[serde(rename = "xhs")]
    XiaoHongShu,
    #[serde(rename = "dy")]
    DouYin,
    #[serde(rename = "ks")]
    Kuaishou,
    #[serde(rename = "bili")]
    Bilibili,
    #[serde(rename = "wb")]
    Weibo,
    #[serde(rename = "tieba")]
    Tieba,
    #[serde(rename = "zhihu")]
    Zhihu,
}

impl Platform {
    /// Every platform, in registry order
    pub const ALL: [Platform; 7] = [
        Platform::XiaoHongShu,
        Platform::DouYin,
        Platform::Kuaishou,
        Platform::Bilibili,
        Platform::Weibo,
        Platform::Tieba,
        Platform::Zhihu,
    ];

    /// Identifier token used in configuration
    pub fn token(&self) -> &'static str {
        match self {
            Platform::XiaoHongShu => "xhs",
            Platform::DouYin => "dy",
            Platform::Kuaishou => "ks",
            Platform::Bilibili => "bili",
            Platform::Weibo => "wb",
            Platform::Tieba => "tieba",
            Platform::Zhihu => "zhihu",
        }
    }

    /// Human readable platform name
    pub fn display_name(&self) -> &'static str {
        match self {
            Platform::XiaoHongShu => "XiaoHongShu",
            Platform::DouYin => "DouYin",
            Platform::Kuaishou => "Kuaishou",
            Platform::Bilibili => "Bilibili",
            Platform::Weibo => "Weibo",
            Platform::Tieba => "Baidu Tieba",
            Platform::Zhihu => "Zhihu",
        }
    }

    /// Comma separated list of every valid token
    pub fn valid_tokens() -> String {
        Self::ALL
            .iter()
            .map(Platform::token)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for Platform {
    type Err = CrawlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.token() == s)
            .ok_or_else(|| CrawlError::InvalidPlatform {
                token: s.to_string(),
                valid: Self::valid_tokens(),
            })
    }
}
