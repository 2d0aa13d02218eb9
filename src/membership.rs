use crate::errors::StreamError;
use crate::provider::RemoteProvider;

use std::collections::BTreeSet;
use std::fmt;

/// Which membership set an operation touches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Member {
    /// Item symbols.
    Item,
    /// Topic names.
    Topic,
}

impl Member {
    /// The other set.
    pub fn other(self) -> Member {
        match self {
            Member::Item => Member::Topic,
            Member::Topic => Member::Item,
        }
    }
}

impl fmt::Display for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Member::Item => f.write_str("items"),
            Member::Topic => f.write_str("topics"),
        }
    }
}

/// Locally cached item and topic sets of one block.
///
/// Only items/topics with live streams are cached: while one set is empty
/// the engine keeps the other in its pre-cache and reports it empty too.
#[derive(Debug, Default)]
pub struct Membership {
    items: BTreeSet<String>,
    topics: BTreeSet<String>,
}

impl Membership {
    /// Empty caches.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached set.
    pub fn get(&self, member: Member) -> &BTreeSet<String> {
        match member {
            Member::Item => &self.items,
            Member::Topic => &self.topics,
        }
    }

    fn get_mut(&mut self, member: Member) -> &mut BTreeSet<String> {
        match member {
            Member::Item => &mut self.items,
            Member::Topic => &mut self.topics,
        }
    }

    /// Replaces a cached set with the engine's.
    pub fn refresh<P: RemoteProvider + ?Sized>(
        &mut self,
        provider: &P,
        block: &str,
        member: Member,
    ) -> Result<(), StreamError> {
        let remote = fetch(provider, block, member)?;
        log::debug!("Refreshed {} of block {}: {:?}", member, block, remote);
        *self.get_mut(member) = remote;
        Ok(())
    }

    /// Checks `name` is a member, refreshing an empty cache first.
    pub fn validate<P: RemoteProvider + ?Sized>(
        &mut self,
        provider: &P,
        block: &str,
        member: Member,
        name: &str,
    ) -> Result<(), StreamError> {
        if self.get(member).is_empty() {
            self.refresh(provider, block, member)?;
        }
        if self.get(member).contains(name) {
            return Ok(());
        }
        Err(match member {
            Member::Item => StreamError::UnknownItem(name.to_string()),
            Member::Topic => StreamError::UnknownTopic(name.to_string()),
        })
    }

    /// Fails if the cached set no longer matches the engine's.
    pub fn verify<P: RemoteProvider + ?Sized>(
        &self,
        provider: &P,
        block: &str,
        member: Member,
    ) -> Result<(), StreamError> {
        let remote = fetch(provider, block, member)?;
        let cached = self.get(member);
        if &remote != cached {
            log::error!(
                "Cached {} of block {} diverged: cached {:?}, engine {:?}",
                member,
                block,
                cached,
                remote
            );
            return Err(StreamError::InternalInconsistency(format!(
                "cached {} {:?} differ from engine {:?}",
                member, cached, remote
            )));
        }
        Ok(())
    }

    /// Re-reads caches after `member` was mutated.
    ///
    /// `either_was_empty` is the state before the mutation. When a set was
    /// empty, or the mutated set became empty, entries may have moved in or
    /// out of the engine's pre-cache, so both sets are re-read.
    pub fn after_mutation<P: RemoteProvider + ?Sized>(
        &mut self,
        provider: &P,
        block: &str,
        member: Member,
        either_was_empty: bool,
    ) -> Result<(), StreamError> {
        self.refresh(provider, block, member)?;
        if either_was_empty || self.get(member).is_empty() {
            self.refresh(provider, block, member.other())?;
        }
        Ok(())
    }

    /// Whether either cached set is empty.
    pub fn either_empty(&self) -> bool {
        self.items.is_empty() || self.topics.is_empty()
    }
}

fn fetch<P: RemoteProvider + ?Sized>(
    provider: &P,
    block: &str,
    member: Member,
) -> Result<BTreeSet<String>, StreamError> {
    let set = match member {
        Member::Item => provider.items(block)?,
        Member::Topic => provider.topics(block)?,
    };
    Ok(set)
}
