use serde::{Deserialize, Serialize};
use std::str::FromStr;
use validator::Validate;

use crate::api::error::ServiceError;
use crate::api::validation::{description_bytes, proposal_bytes, url_bytes};
use crate::chain::accounts::{JobRecord, JobStatus};
use crate::chain::pubkey::{base58, Pubkey};

/// Which client's jobs to return
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClientFilter {
    #[default]
    All,
    /// The caller's own identity
    Mine,
    Identity(Pubkey),
}

impl FromStr for ClientFilter {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("all") {
            Ok(ClientFilter::All)
        } else if s.eq_ignore_ascii_case("my") || s.eq_ignore_ascii_case("mine") {
            Ok(ClientFilter::Mine)
        } else {
            parse_identity("client", s).map(ClientFilter::Identity)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FreelancerFilter {
    #[default]
    All,
    Identity(Pubkey),
}

impl FromStr for FreelancerFilter {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("all") {
            Ok(FreelancerFilter::All)
        } else {
            parse_identity("freelancer", s).map(FreelancerFilter::Identity)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Only(JobStatus),
}

impl FromStr for StatusFilter {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("all") {
            return Ok(StatusFilter::All);
        }
        JobStatus::from_tag(s)
            .map(StatusFilter::Only)
            .ok_or_else(|| ServiceError::InvalidCriteria(format!("unknown status '{}'", s)))
    }
}

fn parse_identity(field: &str, s: &str) -> Result<Pubkey, ServiceError> {
    s.parse::<Pubkey>()
        .map_err(|e| ServiceError::InvalidCriteria(format!("{} '{}': {}", field, s, e)))
}

/// Criteria for a single job query. Built per call, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FilterCriteria {
    pub client: ClientFilter,
    pub freelancer: FreelancerFilter,
    pub status: StatusFilter,
    pub limit: Option<i64>,
}

impl FilterCriteria {
    /// Non-positive limits mean "no limit".
    pub fn effective_limit(&self) -> Option<usize> {
        self.limit
            .filter(|limit| *limit > 0)
            .map(|limit| usize::try_from(limit).unwrap_or(usize::MAX))
    }
}

/// Query string accepted by `GET /jobs`
#[derive(Debug, Default, Deserialize, Validate)]
pub struct JobQuery {
    pub client: Option<String>,
    pub freelancer: Option<String>,
    pub status: Option<String>,
    pub limit: Option<i64>,
}

impl JobQuery {
    pub fn into_criteria(self) -> Result<FilterCriteria, ServiceError> {
        Ok(FilterCriteria {
            client: self.client.as_deref().map(str::parse::<ClientFilter>).transpose()?.unwrap_or_default(),
            freelancer: self.freelancer.as_deref().map(str::parse::<FreelancerFilter>).transpose()?.unwrap_or_default(),
            status: self.status.as_deref().map(str::parse::<StatusFilter>).transpose()?.unwrap_or_default(),
            limit: self.limit,
        })
    }
}

/// Query string carrying only a status filter
#[derive(Debug, Default, Deserialize, Validate)]
pub struct StatusQuery {
    pub status: Option<String>,
}

impl StatusQuery {
    pub fn status_filter(&self) -> Result<StatusFilter, ServiceError> {
        Ok(self.status.as_deref().map(str::parse::<StatusFilter>).transpose()?.unwrap_or_default())
    }
}

/// A job account together with its address
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobEntry {
    #[serde(with = "base58")]
    pub address: Pubkey,
    pub account: JobRecord,
}

/// Proposal for an open job
#[derive(Deserialize, Serialize, Debug, Validate)]
pub struct BidRequest {
    #[validate(range(min = 1, message = "Bid amount must be greater than zero"))]
    pub amount: u64,

    #[validate(custom(function = "proposal_bytes"))]
    pub proposal: String,
}

/// Completed work for an assigned job
#[derive(Deserialize, Serialize, Debug, Validate)]
pub struct WorkSubmission {
    #[validate(
        url(message = "Submission URL must be a valid URL"),
        custom(function = "url_bytes")
    )]
    pub url: String,

    #[validate(custom(function = "description_bytes"))]
    pub description: String,
}
