//! Logical channel identifiers of the p2p transport.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A logical stream multiplexed onto the peer-to-peer transport.
///
/// The integer values are wire-stable and known to every peer; messages on
/// different channels are independent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum ChannelId {
    /// Block headers.
    Header = 1,
    /// Full blocks and block inventory.
    Block = 2,
    /// Consensus proposals.
    Proposal = 3,
    /// Commit certificates.
    CC = 4,
    /// Consensus votes.
    Vote = 5,
}

/// Error converting a wire integer into a [`ChannelId`].
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown channel id {0}")]
pub struct InvalidChannelId(pub u8);

impl From<ChannelId> for u8 {
    fn from(channel: ChannelId) -> u8 {
        channel as u8
    }
}

impl TryFrom<u8> for ChannelId {
    type Error = InvalidChannelId;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Header),
            2 => Ok(Self::Block),
            3 => Ok(Self::Proposal),
            4 => Ok(Self::CC),
            5 => Ok(Self::Vote),
            other => Err(InvalidChannelId(other)),
        }
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Header => "header",
            Self::Block => "block",
            Self::Proposal => "proposal",
            Self::CC => "cc",
            Self::Vote => "vote",
        };
        write!(f, "{}", name)
    }
}
