//! Weibo backend (mobile site)

use async_trait::async_trait;
use std::sync::Arc;

use super::common::{execute_plan, is_digits, PlatformProfile, RunStats};
use crate::backend::{CrawlerBackend, RunContext};
use crate::config::CrawlerConfig;
use crate::platform::Platform;
use crate::Result;

fn is_mid(id: &str) -> bool {
    is_digits(id, 16, 16)
}

fn is_uid(id: &str) -> bool {
    is_digits(id, 5, 12)
}

pub const PROFILE: PlatformProfile = PlatformProfile {
    platform: Platform::Weibo,
    index_url: "https://m.weibo.cn",
    search_page_size: 10,
    is_valid_post_id: is_mid,
    is_valid_creator_id: is_uid,
};

pub struct WeiboCrawler {
    config: Arc<CrawlerConfig>,
    last_run: Option<RunStats>,
}

impl WeiboCrawler {
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
impl CrawlerBackend for WeiboCrawler {
    fn platform(&self) -> Platform {
        Platform::Weibo
    }

    async fn run(&mut self, ctx: RunContext<'_>) -> Result<()> {
        let stats = execute_plan(&PROFILE, &self.config, &ctx).await?;
        self.last_run = Some(stats);
        Ok(())
    }
}
