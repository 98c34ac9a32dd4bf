//! Zhihu backend

use async_trait::async_trait;
use std::sync::Arc;

use super::common::{execute_plan, is_digits, is_url_token, PlatformProfile, RunStats};
use crate::backend::{CrawlerBackend, RunContext};
use crate::config::CrawlerConfig;
use crate::platform::Platform;
use crate::Result;

/// Answers, articles and videos all use numeric ids
fn is_content_id(id: &str) -> bool {
    is_digits(id, 6, 20)
}

/// Creators are addressed by their profile url token
fn is_url_token_id(id: &str) -> bool {
    is_url_token(id, 2, 64)
}

pub const PROFILE: PlatformProfile = PlatformProfile {
    platform: Platform::Zhihu,
    index_url: "https://www.zhihu.com",
    search_page_size: 20,
    is_valid_post_id: is_content_id,
    is_valid_creator_id: is_url_token_id,
};

pub struct ZhihuCrawler {
    config: Arc<CrawlerConfig>,
    last_run: Option<RunStats>,
}

impl ZhihuCrawler {
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
impl CrawlerBackend for ZhihuCrawler {
    fn platform(&self) -> Platform {
        Platform::Zhihu
    }

    async fn run(&mut self, ctx: RunContext<'_>) -> Result<()> {
        let stats = execute_plan(&PROFILE, &self.config, &ctx).await?;
        self.last_run = Some(stats);
        Ok(())
    }
}
