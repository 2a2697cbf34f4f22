//! In-memory ledger of incidents, votes and profiles, with staged writes

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::{
    Incident, IncidentId, Tally, UserId, UserProfile, VerificationVote,
};

/// Current on-disk ledger format
pub const LEDGER_VERSION: u32 = 1;

fn default_version() -> u32 {
    LEDGER_VERSION
}

/// All records the engine owns.
///
/// Votes are keyed by incident then voter, so a second vote from the same
/// user on the same incident can only ever replace the first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ledger {
    #[serde(default = "default_version")]
    pub version: u32,
    /// Number of commits applied so far
    #[serde(default)]
    revision: u64,
    #[serde(default)]
    incidents: BTreeMap<IncidentId, Incident>,
    #[serde(default)]
    votes: BTreeMap<IncidentId, BTreeMap<UserId, VerificationVote>>,
    #[serde(default)]
    profiles: BTreeMap<UserId, UserProfile>,
}

impl Ledger {
    pub fn new() -> Self {
        Self {
            version: LEDGER_VERSION,
            ..Default::default()
        }
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn incident(&self, id: &IncidentId) -> Option<&Incident> {
        self.incidents.get(id)
    }

    pub fn incidents(&self) -> impl Iterator<Item = &Incident> {
        self.incidents.values()
    }

    pub fn incident_count(&self) -> usize {
        self.incidents.len()
    }

    /// Incidents filed by `author`, anonymous or not
    pub fn authored_by<'a>(&'a self, author: &'a UserId) -> impl Iterator<Item = &'a Incident> + 'a {
        self.incidents.values().filter(move |i| &i.author == author)
    }

    pub fn profile(&self, user: &UserId) -> Option<&UserProfile> {
        self.profiles.get(user)
    }

    pub fn profiles(&self) -> impl Iterator<Item = &UserProfile> {
        self.profiles.values()
    }

    pub fn vote(&self, incident: &IncidentId, voter: &UserId) -> Option<&VerificationVote> {
        self.votes.get(incident).and_then(|votes| votes.get(voter))
    }

    pub fn votes_for(&self, incident: &IncidentId) -> impl Iterator<Item = &VerificationVote> {
        self.votes.get(incident).into_iter().flat_map(|votes| votes.values())
    }

    pub fn tally(&self, incident: &IncidentId) -> Tally {
        Tally::from_votes(self.votes_for(incident))
    }

    /// Tally as it would be with `vote` replacing any earlier vote by the same voter
    pub fn tally_with(&self, vote: &VerificationVote) -> Tally {
        let others = self
            .votes_for(&vote.incident)
            .filter(|existing| existing.voter != vote.voter);
        Tally::from_votes(others.chain(std::iter::once(vote)))
    }

    /// Apply every staged record at once, returning what is needed to undo it
    pub fn commit(&mut self, txn: LedgerTxn) -> Undo {
        let mut undo = Undo {
            revision: self.revision,
            ..Default::default()
        };
        self.revision += 1;

        for incident in txn.incidents {
            let previous = self.incidents.insert(incident.id, incident.clone());
            undo.incidents.push((incident.id, previous));
        }
        for vote in txn.votes {
            let previous = self
                .votes
                .entry(vote.incident)
                .or_default()
                .insert(vote.voter, vote.clone());
            undo.votes.push((vote.incident, vote.voter, previous));
        }
        for profile in txn.profiles {
            let previous = self.profiles.insert(profile.user_id, profile.clone());
            undo.profiles.push((profile.user_id, previous));
        }

        undo
    }

    /// Restore the records replaced by a commit
    pub fn rollback(&mut self, undo: Undo) {
        self.revision = undo.revision;
        for (id, previous) in undo.incidents.into_iter().rev() {
            match previous {
                Some(incident) => {
                    self.incidents.insert(id, incident);
                }
                None => {
                    self.incidents.remove(&id);
                }
            }
        }
        for (incident, voter, previous) in undo.votes.into_iter().rev() {
            let votes = self.votes.entry(incident).or_default();
            match previous {
                Some(vote) => {
                    votes.insert(voter, vote);
                }
                None => {
                    votes.remove(&voter);
                }
            }
            if votes.is_empty() {
                self.votes.remove(&incident);
            }
        }
        for (user, previous) in undo.profiles.into_iter().rev() {
            match previous {
                Some(profile) => {
                    self.profiles.insert(user, profile);
                }
                None => {
                    self.profiles.remove(&user);
                }
            }
        }
    }
}

/// Records staged by one engine operation
#[derive(Debug, Default)]
pub struct LedgerTxn {
    incidents: Vec<Incident>,
    votes: Vec<VerificationVote>,
    profiles: Vec<UserProfile>,
}

impl LedgerTxn {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_incident(&mut self, incident: Incident) -> &mut Self {
        self.incidents.push(incident);
        self
    }

    pub fn put_vote(&mut self, vote: VerificationVote) -> &mut Self {
        self.votes.push(vote);
        self
    }

    pub fn put_profile(&mut self, profile: UserProfile) -> &mut Self {
        self.profiles.push(profile);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.incidents.is_empty() && self.votes.is_empty() && self.profiles.is_empty()
    }
}

/// Previous values displaced by a commit
#[derive(Debug, Default)]
pub struct Undo {
    revision: u64,
    incidents: Vec<(IncidentId, Option<Incident>)>,
    votes: Vec<(IncidentId, UserId, Option<VerificationVote>)>,
    profiles: Vec<(UserId, Option<UserProfile>)>,
}
