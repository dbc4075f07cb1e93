//! Resale-channel registry.
//!
//! Every channel panel on the dashboard (StubHub, Facebook) is driven by one
//! `ChannelSpec` entry: display label plus the sale-type spellings that count
//! as membership. Detection is case-insensitive exact match against the
//! alias set, which covers the capitalization drift seen in real sheets
//! ("StubHub", "Stubhub", "stub hub", "facebook", ...).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelKind {
    StubHub,
    Facebook,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelSpec {
    pub kind: ChannelKind,
    pub label: &'static str,
    pub aliases: &'static [&'static str],
}

pub const ALL_CHANNELS: [ChannelSpec; 2] = [
    ChannelSpec {
        kind: ChannelKind::StubHub,
        label: "StubHub",
        aliases: &["stubhub", "stub hub"],
    },
    ChannelSpec {
        kind: ChannelKind::Facebook,
        label: "Facebook",
        aliases: &["facebook", "fb marketplace"],
    },
];

impl ChannelSpec {
    pub fn matches(&self, sale_type: &str) -> bool {
        let normalized = sale_type.trim().to_ascii_lowercase();
        self.aliases.iter().any(|alias| *alias == normalized)
    }
}

pub fn channel_spec(kind: ChannelKind) -> ChannelSpec {
    match kind {
        ChannelKind::StubHub => ALL_CHANNELS[0],
        ChannelKind::Facebook => ALL_CHANNELS[1],
    }
}

/// Maps a free-text sale type to the channel it belongs to, if any.
pub fn detect_channel(sale_type: &str) -> Option<ChannelKind> {
    ALL_CHANNELS
        .iter()
        .find(|spec| spec.matches(sale_type))
        .map(|spec| spec.kind)
}

pub fn channel_label(kind: ChannelKind) -> &'static str {
    channel_spec(kind).label
}
