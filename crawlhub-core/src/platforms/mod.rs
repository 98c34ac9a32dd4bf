/*!
Platform backends.

One backend per supported platform. The backends share the crawl workflow in
[`common`]; what differs is the platform profile (entry URL, page size and
the id shapes it accepts).
*/

pub mod bilibili;
pub mod common;
pub mod douyin;
pub mod kuaishou;
pub mod tieba;
pub mod weibo;
pub mod xhs;
pub mod zhihu;

pub use bilibili::BilibiliCrawler;
pub use common::{CrawlTask, PlatformProfile, RunStats};
pub use douyin::DouYinCrawler;
pub use kuaishou::KuaishouCrawler;
pub use tieba::TieBaCrawler;
pub use weibo::WeiboCrawler;
pub use xhs::XiaoHongShuCrawler;
pub use zhihu::ZhihuCrawler;

use crate::platform::Platform;

/// Profile for a platform
pub fn profile(platform: Platform) -> &'static PlatformProfile {
    match platform {
        Platform::XiaoHongShu => &xhs::PROFILE,
        Platform::DouYin => &douyin::PROFILE,
        Platform::Kuaishou => &kuaishou::PROFILE,
        Platform::Bilibili => &bilibili::PROFILE,
        Platform::Weibo => &weibo::PROFILE,
        Platform::Tieba => &tieba::PROFILE,
        Platform::Zhihu => &zhihu::PROFILE,
    }
}
