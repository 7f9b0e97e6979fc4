//! Naming conventions that turn a member and a handful of identifiers into a
//! CDN URL and a local file name.

use std::fmt;

use serde::Deserialize;

use crate::config::Config;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Member {
    /// Two-digit member code, e.g. `01`.
    pub id: String,

    /// Display name, only used for the folder name and summaries.
    pub name: String,
}

impl Member {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    /// The folder downloads for this member are stored in.
    pub fn folder_name(&self) -> String {
        format!("member_{}_{}", self.id, self.name)
    }
}

/// Which asset family a candidate belongs to. The name doubles as the URL
/// directory and as the file name prefix, which keeps the two kinds from
/// colliding on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Card,
    Photo,
}

impl AssetKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AssetKind::Card => "card",
            AssetKind::Photo => "photo",
        }
    }

    pub fn prefix(self) -> String {
        format!("{}_", self.as_str())
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub member_id: String,
    pub star_rank: String,
    pub card_number: String,
    pub star_level: String,
    pub kind: AssetKind,
}

impl Candidate {
    /// The numeric asset identifier shared by the URL and the file name. The
    /// member code occupies a four digit field.
    pub fn asset_id(&self) -> String {
        format!(
            "{}{}{:0>4}{}",
            self.star_rank, self.card_number, self.member_id, self.star_level
        )
    }

    pub fn url(&self, base_url: &str) -> String {
        format!(
            "{}/{kind}/{kind}_{}.png",
            base_url.trim_end_matches('/'),
            self.asset_id(),
            kind = self.kind,
        )
    }

    pub fn file_name(&self) -> String {
        format!("{}{}.png", self.kind.prefix(), self.asset_id())
    }
}

/// Every candidate for one member, in rank, card, level, kind order.
pub fn candidates_for(config: &Config, member: &Member) -> Vec<Candidate> {
    let mut candidates = Vec::with_capacity(candidates_per_member(config));

    for star_rank in &config.star_ranks {
        for card_number in config.card_numbers.iter() {
            for star_level in &config.star_levels {
                for &kind in &config.asset_kinds {
                    candidates.push(Candidate {
                        member_id: member.id.clone(),
                        star_rank: star_rank.clone(),
                        card_number: card_number.clone(),
                        star_level: star_level.clone(),
                        kind,
                    });
                }
            }
        }
    }

    candidates
}

pub fn candidates_per_member(config: &Config) -> usize {
    config.star_ranks.len()
        * config.card_numbers.len()
        * config.star_levels.len()
        * config.asset_kinds.len()
}

/// Size of the whole run, used to size the progress bar.
pub fn total_candidates(config: &Config) -> usize {
    config.members.len() * candidates_per_member(config)
}
