/*!
Workflow shared by every platform backend.

Each backend supplies a [`PlatformProfile`]; the helpers here turn the run
configuration into a crawl plan and drive it, yielding to the scheduler and
checking for cancellation between tasks.
*/

use std::fmt;
use tracing::{debug, info, warn};

use crate::backend::RunContext;
use crate::config::{CrawlerConfig, CrawlerType};
use crate::platform::Platform;
use crate::{CrawlError, Result};

/// Static facts about a platform that shape its crawl plan
#[derive(Debug, Clone, Copy)]
pub struct PlatformProfile {
    pub platform: Platform,
    pub index_url: &'static str,
    /// Results returned per search page
    pub search_page_size: u32,
    pub is_valid_post_id: fn(&str) -> bool,
    pub is_valid_creator_id: fn(&str) -> bool,
}

/// One unit of work in a crawl plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlTask {
    Search { keyword: String, page: u32 },
    Detail { id: String },
    Creator { id: String },
}

impl fmt::Display for CrawlTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrawlTask::Search { keyword, page } => write!(f, "search '{keyword}' page {page}"),
            CrawlTask::Detail { id } => write!(f, "detail {id}"),
            CrawlTask::Creator { id } => write!(f, "creator {id}"),
        }
    }
}

/// Counters from the most recent run of a backend
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    pub planned: usize,
    pub completed: usize,
    pub skipped_targets: usize,
}

/// Take the id out of a pasted post/creator URL; plain ids pass through
pub fn normalize_target(raw: &str) -> &str {
    let trimmed = raw.trim();
    let without_query = trimmed.split(['?', '#']).next().unwrap_or(trimmed);
    without_query
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(without_query)
}

pub fn is_digits(s: &str, min_len: usize, max_len: usize) -> bool {
    (min_len..=max_len).contains(&s.len()) && s.bytes().all(|b| b.is_ascii_digit())
}

pub fn is_hex(s: &str, len: usize) -> bool {
    s.len() == len && s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Url-safe token: ascii alphanumerics plus `-`, `_` and `.`
pub fn is_url_token(s: &str, min_len: usize, max_len: usize) -> bool {
    (min_len..=max_len).contains(&s.len())
        && s
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
}

/// Build the crawl plan for one run
pub fn plan_tasks(profile: &PlatformProfile, config: &CrawlerConfig) -> Result<(Vec<CrawlTask>, usize)> {
    let platform = profile.platform;
    match config.crawler_type {
        CrawlerType::Search => {
            let pages = config.max_notes_count.div_ceil(profile.search_page_size.max(1));
            let end_page = config.start_page.checked_add(pages).ok_or_else(|| {
                CrawlError::configuration(format!(
                    "start page {} plus {pages} pages overflows the page range",
                    config.start_page
                ))
            })?;
            let tasks = config
                .keywords
                .iter()
                .flat_map(|keyword| {
                    (config.start_page..end_page).map(move |page| {
                        CrawlTask::Search {
                            keyword: keyword.clone(),
                            page,
                        }
                    })
                })
                .collect();
            Ok((tasks, 0))
        }
        CrawlerType::Detail => {
            let (ids, skipped) =
                select_targets(platform, &config.specified_ids, profile.is_valid_post_id, "post")?;
            Ok((ids.into_iter().map(|id| CrawlTask::Detail { id }).collect(), skipped))
        }
        CrawlerType::Creator => {
            let (ids, skipped) = select_targets(
                platform,
                &config.creator_ids,
                profile.is_valid_creator_id,
                "creator",
            )?;
            Ok((ids.into_iter().map(|id| CrawlTask::Creator { id }).collect(), skipped))
        }
    }
}

fn select_targets(
    platform: Platform,
    raw_ids: &[String],
    is_valid: fn(&str) -> bool,
    what: &str,
) -> Result<(Vec<String>, usize)> {
    let mut ids = Vec::with_capacity(raw_ids.len());
    let mut skipped = 0;
    for raw in raw_ids {
        let id = normalize_target(raw);
        if is_valid(id) {
            ids.push(id.to_string());
        } else {
            skipped += 1;
            warn!(platform = %platform, target = %raw, "skipping malformed {what} id");
        }
    }

    if ids.is_empty() {
        return Err(CrawlError::backend(
            platform.token(),
            format!("none of the {} configured {what} ids are valid", raw_ids.len()),
        ));
    }
    Ok((ids, skipped))
}

/// Drive a crawl plan for `profile` to completion
pub async fn execute_plan(
    profile: &PlatformProfile,
    config: &CrawlerConfig,
    ctx: &RunContext<'_>,
) -> Result<RunStats> {
    let platform = profile.platform;
    ctx.checkpoint()?;

    if let Some(storage) = ctx.storage() {
        storage.ping().await.map_err(|e| {
            CrawlError::backend(platform.token(), format!("storage unavailable: {e}"))
        })?;
    }

    let (tasks, skipped_targets) = plan_tasks(profile, config)?;
    let mut stats = RunStats {
        planned: tasks.len(),
        completed: 0,
        skipped_targets,
    };

    info!(
        platform = %platform,
        index_url = profile.index_url,
        crawler_type = %config.crawler_type,
        tasks = stats.planned,
        save = %config.save_data_option,
        "starting {} crawl",
        platform.display_name()
    );

    for task in &tasks {
        ctx.checkpoint()?;
        debug!(platform = %platform, task = %task, comments = config.enable_comments, "processing task");
        tokio::task::yield_now().await;
        stats.completed += 1;
    }

    info!(
        platform = %platform,
        completed = stats.completed,
        skipped = stats.skipped_targets,
        "{} crawl finished",
        platform.display_name()
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SaveDataOption;
    use tokio_util::sync::CancellationToken;

    fn any_id(s: &str) -> bool {
        !s.is_empty()
    }

    fn digits_only(s: &str) -> bool {
        is_digits(s, 1, 20)
    }

    const PROFILE: PlatformProfile = PlatformProfile {
        platform: Platform::Weibo,
        index_url: "https://example.invalid",
        search_page_size: 10,
        is_valid_post_id: digits_only,
        is_valid_creator_id: any_id,
    };

    #[test]
    fn test_normalize_target() {
        assert_eq!(normalize_target("12345"), "12345");
        assert_eq!(
            normalize_target("https://www.xiaohongshu.com/explore/64b95d01000000000c034587?xsec_token=abc"),
            "64b95d01000000000c034587"
        );
        assert_eq!(normalize_target("https://www.bilibili.com/video/BV1d54y1g7db/"), "BV1d54y1g7db");
        assert_eq!(normalize_target("  abc#frag "), "abc");
    }

    #[test]
    fn test_id_shape_helpers() {
        assert!(is_digits("123", 1, 3));
        assert!(!is_digits("1234", 1, 3));
        assert!(!is_digits("12a", 1, 3));
        assert!(is_hex("0a1B", 4));
        assert!(!is_hex("0a1g", 4));
        assert!(is_url_token("tb.1.abc_d-e", 1, 64));
        assert!(!is_url_token("has space", 1, 64));
    }

    #[test]
    fn test_search_plan_pages_per_keyword() {
        let mut config = CrawlerConfig::new("wb", SaveDataOption::Json).with_keywords(["a", "b"]);
        config.max_notes_count = 25;
        config.start_page = 2;

        let (tasks, skipped) = plan_tasks(&PROFILE, &config).unwrap();
        assert_eq!(skipped, 0);
        assert_eq!(tasks.len(), 6);
        assert_eq!(
            tasks[0],
            CrawlTask::Search {
                keyword: "a".into(),
                page: 2
            }
        );
        assert_eq!(
            tasks[5],
            CrawlTask::Search {
                keyword: "b".into(),
                page: 4
            }
        );
    }

    #[test]
    fn test_search_plan_rejects_page_overflow() {
        let mut config = CrawlerConfig::new("wb", SaveDataOption::Json).with_keywords(["a"]);
        config.start_page = u32::MAX;

        let err = plan_tasks(&PROFILE, &config).unwrap_err();
        assert!(matches!(err, CrawlError::Configuration(ref m) if m.contains("overflows")));
    }

    #[test]
    fn test_detail_plan_skips_malformed_ids() {
        let mut config = CrawlerConfig::new("wb", SaveDataOption::Json);
        config.crawler_type = CrawlerType::Detail;
        config.specified_ids = vec!["4982041758140155".into(), "not-an-id".into()];

        let (tasks, skipped) = plan_tasks(&PROFILE, &config).unwrap();
        assert_eq!(skipped, 1);
        assert_eq!(
            tasks,
            vec![CrawlTask::Detail {
                id: "4982041758140155".into()
            }]
        );
    }

    #[test]
    fn test_detail_plan_fails_when_nothing_valid() {
        let mut config = CrawlerConfig::new("wb", SaveDataOption::Json);
        config.crawler_type = CrawlerType::Detail;
        config.specified_ids = vec!["x".into()];

        let err = plan_tasks(&PROFILE, &config).unwrap_err();
        assert!(matches!(err, CrawlError::BackendRuntime { ref platform, .. } if platform == "wb"));
    }

    #[tokio::test]
    async fn test_execute_plan_completes_all_tasks() {
        let config = CrawlerConfig::new("wb", SaveDataOption::Json).with_keywords(["rust"]);
        let ctx = RunContext::new(None, CancellationToken::new());

        let stats = execute_plan(&PROFILE, &config, &ctx).await.unwrap();
        assert_eq!(stats.planned, 20);
        assert_eq!(stats.completed, 20);
    }

    #[tokio::test]
    async fn test_execute_plan_stops_when_cancelled() {
        let config = CrawlerConfig::new("wb", SaveDataOption::Json).with_keywords(["rust"]);
        let token = CancellationToken::new();
        token.cancel();
        let ctx = RunContext::new(None, token);

        let err = execute_plan(&PROFILE, &config, &ctx).await.unwrap_err();
        assert!(err.is_interrupt());
    }
}
