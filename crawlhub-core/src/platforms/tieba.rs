//! Baidu Tieba backend

use async_trait::async_trait;
use std::sync::Arc;

use super::common::{execute_plan, is_digits, is_url_token, PlatformProfile, RunStats};
use crate::backend::{CrawlerBackend, RunContext};
use crate::config::CrawlerConfig;
use crate::platform::Platform;
use crate::Result;

fn is_thread_id(id: &str) -> bool {
    is_digits(id, 6, 12)
}

/// Users are addressed by portrait token, e.g. `tb.1.7f262ae1.5_dXBbuUHLMh8TVmVeRr1w`
fn is_portrait(id: &str) -> bool {
    id.starts_with("tb.1.") && is_url_token(id, 10, 96)
}

pub const PROFILE: PlatformProfile = PlatformProfile {
    platform: Platform::Tieba,
    index_url: "https://tieba.baidu.com",
    search_page_size: 10,
    is_valid_post_id: is_thread_id,
    is_valid_creator_id: is_portrait,
};

pub struct TieBaCrawler {
    config: Arc<CrawlerConfig>,
    last_run: Option<RunStats>,
}

impl TieBaCrawler {
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
impl CrawlerBackend for TieBaCrawler {
    fn platform(&self) -> Platform {
        Platform::Tieba
    }

    async fn run(&mut self, ctx: RunContext<'_>) -> Result<()> {
        let stats = execute_plan(&PROFILE, &self.config, &ctx).await?;
        self.last_run = Some(stats);
        Ok(())
    }
}
