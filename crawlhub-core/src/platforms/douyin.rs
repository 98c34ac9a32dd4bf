//! DouYin backend

use async_trait::async_trait;
use std::sync::Arc;

use super::common::{execute_plan, is_digits, is_url_token, PlatformProfile, RunStats};
use crate::backend::{CrawlerBackend, RunContext};
use crate::config::CrawlerConfig;
use crate::platform::Platform;
use crate::Result;

/// Aweme ids are 19-digit snowflakes; older ones are shorter
fn is_aweme_id(id: &str) -> bool {
    is_digits(id, 15, 20)
}

/// Creators are addressed by `sec_user_id`, e.g. `MS4wLjABAAAA...`
fn is_sec_user_id(id: &str) -> bool {
    id.starts_with("MS4wLjABAAAA") && is_url_token(id, 20, 128)
}

pub const PROFILE: PlatformProfile = PlatformProfile {
    platform: Platform::DouYin,
    index_url: "https://www.douyin.com",
    search_page_size: 10,
    is_valid_post_id: is_aweme_id,
    is_valid_creator_id: is_sec_user_id,
};

pub struct DouYinCrawler {
    config: Arc<CrawlerConfig>,
    last_run: Option<RunStats>,
}

impl DouYinCrawler {
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
impl CrawlerBackend for DouYinCrawler {
    fn platform(&self) -> Platform {
        Platform::DouYin
    }

    async fn run(&mut self, ctx: RunContext<'_>) -> Result<()> {
        let stats = execute_plan(&PROFILE, &self.config, &ctx).await?;
        self.last_run = Some(stats);
        Ok(())
    }
}
