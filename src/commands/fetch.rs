use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use futures::future::try_join_all;
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use reqwest::Client;
use tokio::sync::Semaphore;

use crate::{
    candidate::total_candidates,
    config::Config,
    driver::{fetch_member, MemberSummary},
    extractor::{CommandExtractor, TextureExtractor},
    fetcher::AssetFetcher,
    ledger::FailureLedger,
    logging,
    options::Global,
};

#[derive(Debug, Default, Args)]
pub struct FetchOptions {
    /// The directory to create the per-member folders in.
    #[clap(long)]
    pub output: Option<PathBuf>,

    /// The file that records URLs known to be missing.
    #[clap(long)]
    pub ledger: Option<PathBuf>,

    /// The maximum number of downloads in flight at once.
    #[clap(long)]
    pub concurrency: Option<usize>,
}

impl FetchOptions {
    fn apply(self, config: &mut Config) {
        if let Some(output) = self.output {
            config.output_dir = output;
        }

        if let Some(ledger) = self.ledger {
            config.ledger_path = ledger;
        }

        if let Some(concurrency) = self.concurrency {
            config.max_in_flight = concurrency;
        }
    }
}

pub async fn fetch(global: Global, options: FetchOptions) -> Result<()> {
    let mut config = Config::load(global.config.as_deref())?;
    options.apply(&mut config);
    config.validate()?;

    let progress = logging::progress().add(ProgressBar::new(0));
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} | {msg}")?
            .progress_chars("=>-"),
    );

    let extractor = Box::new(CommandExtractor::new(&config.extractor));
    let summaries = fetch_all(&config, extractor, progress).await?;

    for summary in summaries {
        println!("{}", summary);
    }

    Ok(())
}

/// Fetches every member concurrently through one shared client and returns
/// a summary per member, in configuration order. `progress` is sized to the
/// number of candidates and cleared when the run ends.
pub async fn fetch_all(
    config: &Config,
    extractor: Box<dyn TextureExtractor>,
    progress: ProgressBar,
) -> Result<Vec<MemberSummary>> {
    let ledger = FailureLedger::load(&config.ledger_path)?;
    if !ledger.is_empty() {
        info!(
            "skipping {} URLs listed in {}",
            ledger.len(),
            ledger.path().display()
        );
    }

    progress.set_length(total_candidates(config) as u64);

    let fetcher = AssetFetcher::new(
        Client::builder().build()?,
        ledger,
        extractor,
        progress.clone(),
        config.target_size,
    );

    let limiter = Semaphore::new(config.max_in_flight);

    let summaries = try_join_all(
        config
            .members
            .iter()
            .map(|member| fetch_member(&fetcher, config, member, &limiter)),
    )
    .await;

    progress.finish_and_clear();
    summaries
}

#[cfg(test)]
mod test {
    use super::*;

    use fs_err as fs;
    use wiremock::{
        matchers::{method, path},
        Mock, MockServer, ResponseTemplate,
    };

    use crate::{
        candidate::Member,
        config::CardNumbers,
        extractor::test::{FakeBehavior, FakeExtractor},
        fetcher::test::SMALL,
    };

    #[tokio::test]
    async fn fetches_every_member_into_its_own_folder() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/card/card_4100060001001.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"card".to_vec()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/photo/photo_4100070020001.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"photo".to_vec()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let ledger_path = dir.path().join("failed_downloads.txt");
        let config = Config {
            base_url: server.uri(),
            members: vec![Member::new("01", "a"), Member::new("20", "b")],
            card_numbers: CardNumbers {
                start: 6,
                end: 8,
                width: 4,
            },
            star_levels: vec!["001".to_owned()],
            output_dir: dir.path().to_owned(),
            ledger_path: ledger_path.clone(),
            target_size: SMALL,
            max_in_flight: 3,
            ..Config::default()
        };

        let progress = ProgressBar::hidden();
        let summaries = fetch_all(
            &config,
            Box::new(FakeExtractor::new(FakeBehavior::Texture)),
            progress.clone(),
        )
        .await
        .unwrap();

        let lines: Vec<_> = summaries.iter().map(ToString::to_string).collect();
        assert_eq!(
            lines,
            vec![
                "Member 01 (a) downloaded 1 new assets, with 3 failed attempts.",
                "Member 20 (b) downloaded 1 new assets, with 3 failed attempts.",
            ]
        );

        // 2 members x 2 card numbers x 2 kinds, every one requested once.
        assert_eq!(progress.length(), Some(8));
        assert_eq!(progress.position(), 8);
        assert_eq!(server.received_requests().await.unwrap().len(), 8);

        let ledger = fs::read_to_string(&ledger_path).unwrap();
        assert_eq!(ledger.lines().count(), 6);

        let first = dir.path().join("member_01_a");
        assert_eq!(fs::read(first.join("card_4100060001001.png")).unwrap(), b"card");
        assert!(first.join("card_4100060001001_extracted.png").is_file());

        let second = dir.path().join("member_20_b");
        assert_eq!(fs::read(second.join("photo_4100070020001.png")).unwrap(), b"photo");
        assert!(second.join("photo_4100070020001_extracted.png").is_file());
    }

    #[tokio::test]
    async fn known_failures_are_not_requested_again() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            base_url: server.uri(),
            members: vec![Member::new("01", "a"), Member::new("20", "b")],
            card_numbers: CardNumbers {
                start: 0,
                end: 1,
                width: 4,
            },
            star_levels: vec!["001".to_owned()],
            output_dir: dir.path().to_owned(),
            ledger_path: dir.path().join("failed_downloads.txt"),
            target_size: SMALL,
            ..Config::default()
        };

        for _ in 0..2 {
            fetch_all(
                &config,
                Box::new(FakeExtractor::new(FakeBehavior::Texture)),
                ProgressBar::hidden(),
            )
            .await
            .unwrap();
        }

        assert_eq!(server.received_requests().await.unwrap().len(), 4);
        let ledger = fs::read_to_string(&config.ledger_path).unwrap();
        assert_eq!(ledger.lines().count(), 4);
    }
}
