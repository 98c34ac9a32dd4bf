//! Bilibili backend

use async_trait::async_trait;
use std::sync::Arc;

use super::common::{execute_plan, is_digits, PlatformProfile, RunStats};
use crate::backend::{CrawlerBackend, RunContext};
use crate::config::CrawlerConfig;
use crate::platform::Platform;
use crate::Result;

/// Videos are addressed by BV id (`BV` + 10 base58 chars) or legacy `av` number
fn is_video_id(id: &str) -> bool {
    if let Some(rest) = id.strip_prefix("BV") {
        return rest.len() == 10 && rest.bytes().all(|b| b.is_ascii_alphanumeric());
    }
    id.strip_prefix("av")
        .is_some_and(|rest| is_digits(rest, 1, 12))
}

/// Creators are numeric `mid`s
fn is_mid(id: &str) -> bool {
    is_digits(id, 1, 20)
}

pub const PROFILE: PlatformProfile = PlatformProfile {
    platform: Platform::Bilibili,
    index_url: "https://www.bilibili.com",
    search_page_size: 20,
    is_valid_post_id: is_video_id,
    is_valid_creator_id: is_mid,
};

pub struct BilibiliCrawler {
    config: Arc<CrawlerConfig>,
    last_run: Option<RunStats>,
}

impl BilibiliCrawler {
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
impl CrawlerBackend for BilibiliCrawler {
    fn platform(&self) -> Platform {
        Platform::Bilibili
    }

    async fn run(&mut self, ctx: RunContext<'_>) -> Result<()> {
        let stats = execute_plan(&PROFILE, &self.config, &ctx).await?;
        self.last_run = Some(stats);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_id_shapes() {
        assert!(is_video_id("BV1d54y1g7db"));
        assert!(is_video_id("av170001"));
        assert!(!is_video_id("BV1d54"));
        assert!(!is_video_id("170001"));
    }

    #[test]
    fn test_mid_shape() {
        assert!(is_mid("434377496"));
        assert!(!is_mid("abc"));
    }
}
