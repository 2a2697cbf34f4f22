//! Ledger records: incidents, verification votes and reporter profiles

pub mod ids;
pub mod incident;
pub mod profile;
pub mod vote;

pub use ids::{IncidentId, UserId};
pub use incident::{
    Category, GeoPoint, Incident, IncidentDraft, Removal, Severity, VerificationState,
};
pub use profile::{NewProfile, UserProfile};
pub use vote::{Tally, VerificationVote, VoteDirection};
