//! Kuaishou backend

use async_trait::async_trait;
use std::sync::Arc;

use super::common::{execute_plan, PlatformProfile, RunStats};
use crate::backend::{CrawlerBackend, RunContext};
use crate::config::CrawlerConfig;
use crate::platform::Platform;
use crate::Result;

/// Photo and user ids are short lowercase alphanumeric strings, e.g. `3xf8enb8dbj6uig`
fn is_ks_id(id: &str) -> bool {
    (8..=32).contains(&id.len())
        && id
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_')
}

pub const PROFILE: PlatformProfile = PlatformProfile {
    platform: Platform::Kuaishou,
    index_url: "https://www.kuaishou.com",
    search_page_size: 20,
    is_valid_post_id: is_ks_id,
    is_valid_creator_id: is_ks_id,
};

pub struct KuaishouCrawler {
    config: Arc<CrawlerConfig>,
    last_run: Option<RunStats>,
}

impl KuaishouCrawler {
    pub fn new(config: Arc<CrawlerConfig>) -> Self {
        Self {
            config,
            last_run: None,
        }
    }

    pub fn last_run(&self) -> Option<&RunStats> {
        self.last_run.as_ref()
    }
}

#[async_trait]
impl CrawlerBackend for KuaishouCrawler {
    fn platform(&self) -> Platform {
        Platform::Kuaishou
    }

    async fn run(&mut self, ctx: RunContext<'_>) -> Result<()> {
        let stats = execute_plan(&PROFILE, &self.config, &ctx).await?;
        self.last_run = Some(stats);
        Ok(())
    }
}
