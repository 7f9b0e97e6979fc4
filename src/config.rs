//! Run configuration. The defaults are the values the tool has always shipped
//! with, so running without a config file needs no setup at all.

use std::path::{Path, PathBuf};

use anyhow::Context;
use fs_err as fs;
use serde::Deserialize;
use thiserror::Error;

use crate::candidate::{AssetKind, Member};

pub const DEFAULT_BASE_URL: &str = "https://res.nogizaka46-always.emtg.jp/asset/1.1.424/Android/card";
pub const DEFAULT_LEDGER_FILE: &str = "failed_downloads.txt";
pub const DEFAULT_TARGET_SIZE: TargetSize = TargetSize {
    width: 900,
    height: 1200,
};
pub const DEFAULT_MAX_IN_FLIGHT: usize = 32;

/// The bundled extractor script, located through the source tree so it does
/// not depend on the directory the tool is run from.
pub const DEFAULT_EXTRACTOR_SCRIPT: &str =
    concat!(env!("CARGO_MANIFEST_DIR"), "/scripts/extract-texture.py");

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub base_url: String,
    pub members: Vec<Member>,
    pub star_ranks: Vec<String>,
    pub card_numbers: CardNumbers,
    pub star_levels: Vec<String>,
    pub asset_kinds: Vec<AssetKind>,

    /// Directory the `member_*` folders are created in.
    pub output_dir: PathBuf,
    pub ledger_path: PathBuf,
    pub target_size: TargetSize,

    /// Upper bound on fetches in flight across all members.
    pub max_in_flight: usize,
    pub extractor: ExtractorCommand,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            members: vec![
                Member::new("01", "秋元真夏"),
                Member::new("12", "齋藤飛鳥"),
                Member::new("20", "鈴木絢音"),
            ],
            star_ranks: vec!["41".to_owned()],
            card_numbers: CardNumbers::default(),
            star_levels: vec!["001".to_owned(), "002".to_owned()],
            asset_kinds: vec![AssetKind::Card, AssetKind::Photo],
            output_dir: PathBuf::from("."),
            ledger_path: PathBuf::from(DEFAULT_LEDGER_FILE),
            target_size: DEFAULT_TARGET_SIZE,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            extractor: ExtractorCommand::default(),
        }
    }
}

/// A half-open range of card numbers, zero-padded to `width` digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CardNumbers {
    pub start: u32,
    pub end: u32,
    pub width: usize,
}

impl Default for CardNumbers {
    fn default() -> Self {
        Self {
            start: 0,
            end: 100,
            width: 4,
        }
    }
}

impl CardNumbers {
    pub fn iter(&self) -> impl Iterator<Item = String> {
        let width = self.width;
        (self.start..self.end).map(move |number| format!("{:0width$}", number, width = width))
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetSize {
    pub width: u32,
    pub height: u32,
}

/// The external program used to pull a texture out of an asset container.
/// It is invoked as `<program> <args...> <asset path> <output png path>`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExtractorCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl ExtractorCommand {
    /// The first `.py` argument that does not point at a file. Checked up
    /// front so a bad path fails the run once instead of every extraction.
    fn missing_script(&self) -> Option<PathBuf> {
        self.args
            .iter()
            .map(Path::new)
            .find(|arg| arg.extension().map_or(false, |ext| ext == "py") && !arg.is_file())
            .map(Path::to_path_buf)
    }
}

impl Default for ExtractorCommand {
    fn default() -> Self {
        Self {
            program: "python3".to_owned(),
            args: vec![DEFAULT_EXTRACTOR_SCRIPT.to_owned()],
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no members are configured")]
    NoMembers,

    #[error("`{field}` must not be empty")]
    EmptyField { field: &'static str },

    #[error("member id {id:?} must be made of ASCII digits")]
    InvalidMemberId { id: String },

    #[error("max_in_flight must be at least 1")]
    ZeroConcurrency,

    #[error("target size {width}x{height} has a zero dimension")]
    ZeroTargetSize { width: u32, height: u32 },

    #[error("extractor script {} does not exist", .path.display())]
    MissingExtractorScript { path: PathBuf },
}

impl Config {
    /// Reads the config file if one was given, falling back to defaults for
    /// anything it does not set.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let config = match path {
            Some(path) => {
                let contents = fs::read_to_string(path)?;
                let config: Config = toml::from_str(&contents)
                    .with_context(|| format!("invalid config file {}", path.display()))?;
                log::debug!("loaded config from {}", path.display());
                config
            }
            None => Config::default(),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.members.is_empty() {
            return Err(ConfigError::NoMembers);
        }

        if let Some(member) = self
            .members
            .iter()
            .find(|member| member.id.is_empty() || !member.id.bytes().all(|b| b.is_ascii_digit()))
        {
            return Err(ConfigError::InvalidMemberId {
                id: member.id.clone(),
            });
        }

        let empty_field = if self.star_ranks.is_empty() {
            Some("star_ranks")
        } else if self.card_numbers.is_empty() {
            Some("card_numbers")
        } else if self.star_levels.is_empty() {
            Some("star_levels")
        } else if self.asset_kinds.is_empty() {
            Some("asset_kinds")
        } else if self.extractor.program.is_empty() {
            Some("extractor.program")
        } else {
            None
        };

        if let Some(field) = empty_field {
            return Err(ConfigError::EmptyField { field });
        }

        if self.max_in_flight == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }

        let TargetSize { width, height } = self.target_size;
        if width == 0 || height == 0 {
            return Err(ConfigError::ZeroTargetSize { width, height });
        }

        if let Some(path) = self.extractor.missing_script() {
            return Err(ConfigError::MissingExtractorScript { path });
        }

        Ok(())
    }
}
