//! XiaoHongShu (RED) backend

use async_trait::async_trait;
use std::sync::Arc;

use super::common::{execute_plan, is_hex, PlatformProfile, RunStats};
use crate::backend::{CrawlerBackend, RunContext};
use crate::config::CrawlerConfig;
use crate::platform::Platform;
use crate::Result;

/// Note and user ids are 24-character hex object ids
fn is_object_id(id: &str) -> bool {
    is_hex(id, 24)
}

pub const PROFILE: PlatformProfile = PlatformProfile {
    platform: Platform::XiaoHongShu,
    index_url: "https://www.xiaohongshu.com",
    search_page_size: 20,
    is_valid_post_id: is_object_id,
    is_valid_creator_id: is_object_id,
};

pub struct XiaoHongShuCrawler {
    config: Arc<CrawlerConfig>,
    last_run: Option<RunStats>,
}

impl XiaoHongShuCrawler {
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
impl CrawlerBackend for XiaoHongShuCrawler {
    fn platform(&self) -> Platform {
        Platform::XiaoHongShu
    }

    async fn run(&mut self, ctx: RunContext<'_>) -> Result<()> {
        let stats = execute_plan(&PROFILE, &self.config, &ctx).await?;
        self.last_run = Some(stats);
        Ok(())
    }
}
