/*!
Platform registry: token → backend constructor.

The built-in registry is created once on first use and never mutated.
Adding a platform means adding a [`Platform`] variant, a backend, and one
`register` call in [`PlatformRegistry::with_builtin_platforms`].
*/

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::backend::CrawlerBackend;
use crate::config::CrawlerConfig;
use crate::platform::Platform;
use crate::platforms::{
    BilibiliCrawler, DouYinCrawler, KuaishouCrawler, TieBaCrawler, WeiboCrawler,
    XiaoHongShuCrawler, ZhihuCrawler,
};
use crate::{CrawlError, Result};

/// Builds a fresh backend for one run
pub type BackendConstructor =
    Arc<dyn Fn(Arc<CrawlerConfig>) -> Box<dyn CrawlerBackend> + Send + Sync>;

static BUILTIN: Lazy<PlatformRegistry> = Lazy::new(PlatformRegistry::with_builtin_platforms);

/// A registered platform
#[derive(Clone)]
pub struct RegistryEntry {
    platform: Platform,
    constructor: BackendConstructor,
}

impl RegistryEntry {
    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Construct a new backend instance
    pub fn construct(&self, config: Arc<CrawlerConfig>) -> Box<dyn CrawlerBackend> {
        (self.constructor)(config)
    }
}

impl fmt::Debug for RegistryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryEntry")
            .field("platform", &self.platform)
            .finish_non_exhaustive()
    }
}

/// Mapping from platform token to backend constructor
#[derive(Clone, Default, Debug)]
pub struct PlatformRegistry {
    entries: HashMap<&'static str, RegistryEntry>,
    order: Vec<Platform>,
}

impl PlatformRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry of built-in platforms
    pub fn builtin() -> &'static PlatformRegistry {
        &BUILTIN
    }

    /// A registry containing every built-in platform backend
    pub fn with_builtin_platforms() -> Self {
        let mut registry = Self::new();
        registry.register(Platform::XiaoHongShu, |config| {
            Box::new(XiaoHongShuCrawler::new(config))
        });
        registry.register(Platform::DouYin, |config| Box::new(DouYinCrawler::new(config)));
        registry.register(Platform::Kuaishou, |config| {
            Box::new(KuaishouCrawler::new(config))
        });
        registry.register(Platform::Bilibili, |config| {
            Box::new(BilibiliCrawler::new(config))
        });
        registry.register(Platform::Weibo, |config| Box::new(WeiboCrawler::new(config)));
        registry.register(Platform::Tieba, |config| Box::new(TieBaCrawler::new(config)));
        registry.register(Platform::Zhihu, |config| Box::new(ZhihuCrawler::new(config)));
        registry
    }

    /// Register (or replace) the constructor for a platform
    pub fn register<F>(&mut self, platform: Platform, constructor: F) -> &mut Self
    where
        F: Fn(Arc<CrawlerConfig>) -> Box<dyn CrawlerBackend> + Send + Sync + 'static,
    {
        let entry = RegistryEntry {
            platform,
            constructor: Arc::new(constructor),
        };
        if self.entries.insert(platform.token(), entry).is_none() {
            self.order.push(platform);
        }
        self
    }

    /// Find the entry for a token without constructing anything
    pub fn lookup(&self, token: &str) -> Result<&RegistryEntry> {
        self.entries
            .get(token)
            .ok_or_else(|| CrawlError::InvalidPlatform {
                token: token.to_string(),
                valid: self.valid_tokens(),
            })
    }

    /// Construct a fresh backend for a token
    pub fn resolve(&self, token: &str, config: Arc<CrawlerConfig>) -> Result<Box<dyn CrawlerBackend>> {
        self.lookup(token).map(|entry| entry.construct(config))
    }

    /// Registered platforms, in registration order
    pub fn platforms(&self) -> &[Platform] {
        &self.order
    }

    pub fn contains(&self, token: &str) -> bool {
        self.entries.contains_key(token)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn valid_tokens(&self) -> String {
        self.order
            .iter()
            .map(Platform::token)
            .collect::<Vec<_>>()
            .join(", ")
    }
}
