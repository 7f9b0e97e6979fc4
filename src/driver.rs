use std::fmt;

use anyhow::Result;
use fs_err::tokio as fs;
use futures::stream::{self, StreamExt};
use log::debug;
use tokio::sync::Semaphore;

use crate::{
    candidate::{candidates_for, Member},
    config::Config,
    fetcher::{AssetFetcher, FetchOutcome},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberSummary {
    pub member: Member,
    pub new_downloads: usize,
    pub new_failures: usize,
}

impl MemberSummary {
    fn new(member: Member) -> Self {
        Self {
            member,
            new_downloads: 0,
            new_failures: 0,
        }
    }

    fn tally(&mut self, outcome: FetchOutcome) {
        if outcome.is_new_download() {
            self.new_downloads += 1;
        }

        if outcome.is_new_failure() {
            self.new_failures += 1;
        }
    }
}

impl fmt::Display for MemberSummary {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(
            formatter,
            "Member {} ({}) downloaded {} new assets, with {} failed attempts.",
            self.member.id, self.member.name, self.new_downloads, self.new_failures
        )
    }
}

/// Tries every candidate of `member`. At most `config.max_in_flight` fetches
/// run at once across every caller sharing `limiter`.
pub async fn fetch_member(
    fetcher: &AssetFetcher,
    config: &Config,
    member: &Member,
    limiter: &Semaphore,
) -> Result<MemberSummary> {
    let member_dir = config.output_dir.join(member.folder_name());
    fs::create_dir_all(&member_dir).await?;

    let candidates = candidates_for(config, member);
    debug!("member {} has {} candidates", member.id, candidates.len());

    let member_dir = &member_dir;
    let mut outcomes = stream::iter(candidates)
        .map(|candidate| async move {
            let url = candidate.url(&config.base_url);
            let destination = member_dir.join(candidate.file_name());

            let _permit = limiter.acquire().await?;
            let outcome = fetcher.fetch(&url, &destination).await?;
            Ok::<_, anyhow::Error>(outcome)
        })
        .buffer_unordered(config.max_in_flight);

    let mut summary = MemberSummary::new(member.clone());
    while let Some(outcome) = outcomes.next().await {
        summary.tally(outcome?);
    }

    Ok(summary)
}

#[cfg(test)]
mod test {
    use super::*;

    use fs_err as sync_fs;
    use wiremock::{
        matchers::{method, path},
        Mock, MockServer, ResponseTemplate,
    };

    use crate::{
        candidate::AssetKind,
        config::CardNumbers,
        extractor::test::FakeBehavior,
        fetcher::test::{fetcher, SMALL},
    };

    fn small_config(base_url: String, output_dir: &std::path::Path) -> Config {
        Config {
            base_url,
            members: vec![Member::new("01", "秋元真夏")],
            card_numbers: CardNumbers {
                start: 6,
                end: 9,
                width: 4,
            },
            star_levels: vec!["001".to_owned()],
            output_dir: output_dir.to_owned(),
            target_size: SMALL,
            max_in_flight: 2,
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn counts_downloads_and_failures() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/card/card_4100070001001.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"bundle".to_vec()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let config = small_config(server.uri(), dir.path());
        let fetcher = fetcher(dir.path(), FakeBehavior::Empty);
        let limiter = Semaphore::new(config.max_in_flight);

        let summary = fetch_member(&fetcher, &config, &config.members[0], &limiter)
            .await
            .unwrap();

        // 3 card numbers x 2 kinds, one of which exists.
        assert_eq!(summary.new_downloads, 1);
        assert_eq!(summary.new_failures, 5);
        assert_eq!(
            summary.to_string(),
            "Member 01 (秋元真夏) downloaded 1 new assets, with 5 failed attempts."
        );

        let stored = dir
            .path()
            .join("member_01_秋元真夏")
            .join("card_4100070001001.png");
        assert_eq!(sync_fs::read(stored).unwrap(), b"bundle");
        assert_eq!(fetcher.ledger().len(), 5);
    }

    #[tokio::test]
    async fn second_run_is_a_no_op() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/photo/photo_4100080001001.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"photo".to_vec()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let config = small_config(server.uri(), dir.path());
        let limiter = Semaphore::new(config.max_in_flight);

        let first = fetcher(dir.path(), FakeBehavior::Texture);
        let summary = fetch_member(&first, &config, &config.members[0], &limiter)
            .await
            .unwrap();
        assert_eq!(summary.new_downloads, 1);
        assert_eq!(summary.new_failures, 5);

        let requests_after_first = server.received_requests().await.unwrap().len();
        assert_eq!(requests_after_first, 6);

        // A fresh fetcher reloads the ledger from disk, like a new process.
        let second = fetcher(dir.path(), FakeBehavior::Texture);
        let summary = fetch_member(&second, &config, &config.members[0], &limiter)
            .await
            .unwrap();

        assert_eq!(summary.new_downloads, 0);
        assert_eq!(summary.new_failures, 0);
        assert_eq!(
            server.received_requests().await.unwrap().len(),
            requests_after_first
        );
    }

    #[tokio::test]
    async fn only_configured_kinds_are_requested() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/photo/photo_4100060001001.png"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let mut config = small_config(server.uri(), dir.path());
        config.asset_kinds = vec![AssetKind::Card];
        let fetcher = fetcher(dir.path(), FakeBehavior::Empty);
        let limiter = Semaphore::new(1);

        let summary = fetch_member(&fetcher, &config, &config.members[0], &limiter)
            .await
            .unwrap();

        assert_eq!(summary.new_downloads, 0);
        assert_eq!(summary.new_failures, 3);
    }
}
