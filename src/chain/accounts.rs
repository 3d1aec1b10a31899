//! Account types owned by the freelancing program.
//!
//! Every account starts with an 8-byte discriminator (`sha256("account:<Name>")[..8]`)
//! followed by its Borsh-encoded fields. The job layout keeps both identities in fixed
//! 32-byte slots right after the discriminator so they can be matched remotely:
//!
//! ```text
//! 0        8         40            72
//! | disc   | client  | freelancer  | job_id | title | description | budget | deadline | status | created_at | updated_at | bids |
//! ```

use borsh::{BorshDeserialize, BorshSerialize};
use serde::de::{self, Deserializer, IgnoredAny, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::pubkey::{base58, Pubkey};

pub const DISCRIMINATOR_LEN: usize = 8;
const PUBKEY_LEN: usize = 32;

/// Offset of `JobRecord::client` inside job account data.
pub const CLIENT_OFFSET: usize = DISCRIMINATOR_LEN;

/// Offset of `JobRecord::freelancer` inside job account data.
pub const FREELANCER_OFFSET: usize = DISCRIMINATOR_LEN + PUBKEY_LEN;

pub const MAX_TITLE_LEN: usize = 100;
pub const MAX_DESCRIPTION_LEN: usize = 1000;
pub const MAX_NAME_LEN: usize = 100;
pub const MAX_PROPOSAL_LEN: usize = 1000;
pub const MAX_URL_LEN: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    #[error("discriminator does not match a {0} account")]
    WrongDiscriminator(&'static str),

    #[error("undecodable {schema} account: {reason}")]
    Decode { schema: &'static str, reason: String },

    #[error("field {field} is {len} bytes, limit is {max}")]
    FieldTooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },
}

/// Account types the gateway knows how to fetch and decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountSchema {
    Job,
    User,
}

impl AccountSchema {
    pub const fn discriminator(self) -> [u8; DISCRIMINATOR_LEN] {
        match self {
            // sha256("account:Job")[..8]
            AccountSchema::Job => [75, 124, 80, 203, 161, 180, 202, 80],
            // sha256("account:User")[..8]
            AccountSchema::User => [159, 117, 95, 227, 239, 151, 58, 236],
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            AccountSchema::Job => "job",
            AccountSchema::User => "user",
        }
    }

    pub fn matches(self, data: &[u8]) -> bool {
        data.len() >= DISCRIMINATOR_LEN && data[..DISCRIMINATOR_LEN] == self.discriminator()
    }

    /// Borsh body after the discriminator. Trailing bytes (unused account space) are ignored.
    fn deserialize<T: BorshDeserialize>(self, data: &[u8]) -> Result<T, LayoutError> {
        if !self.matches(data) {
            return Err(LayoutError::WrongDiscriminator(self.name()));
        }
        let mut body = &data[DISCRIMINATOR_LEN..];
        T::deserialize(&mut body).map_err(|e| LayoutError::Decode {
            schema: self.name(),
            reason: e.to_string(),
        })
    }

    #[cfg(test)]
    fn serialize<T: BorshSerialize>(self, body: &T) -> Vec<u8> {
        let mut data = self.discriminator().to_vec();
        body.serialize(&mut data).unwrap();
        data
    }
}

fn check_len(field: &'static str, value: &str, max: usize) -> Result<(), LayoutError> {
    if value.len() > max {
        return Err(LayoutError::FieldTooLong {
            field,
            len: value.len(),
            max,
        });
    }
    Ok(())
}

/// Lifecycle of a job. Transitions belong to the program; the gateway only reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize)]
pub enum JobStatus {
    Open,
    InProgress,
    Completed,
    Cancelled,
    Disputed,
}

impl JobStatus {
    pub const ALL: [JobStatus; 5] = [
        JobStatus::Open,
        JobStatus::InProgress,
        JobStatus::Completed,
        JobStatus::Cancelled,
        JobStatus::Disputed,
    ];

    pub const fn tag(self) -> &'static str {
        match self {
            JobStatus::Open => "open",
            JobStatus::InProgress => "inProgress",
            JobStatus::Completed => "completed",
            JobStatus::Cancelled => "cancelled",
            JobStatus::Disputed => "disputed",
        }
    }

    /// Tags are recognized regardless of case: `Completed` and `completed` are the same status.
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|status| status.tag().eq_ignore_ascii_case(tag))
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_tag(s).ok_or_else(|| format!("unknown job status: {}", s))
    }
}

// JSON form is a single-key map, e.g. `{"inProgress": {}}`.
impl Serialize for JobStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(self.tag(), &serde_json::Map::new())?;
        map.end()
    }
}

impl<'de> Deserialize<'de> for JobStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TaggedStatus;

        impl<'de> Visitor<'de> for TaggedStatus {
            type Value = JobStatus;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map with exactly one job status key")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<JobStatus, A::Error> {
                let tag: String = map
                    .next_key()?
                    .ok_or_else(|| de::Error::invalid_length(0, &self))?;
                map.next_value::<IgnoredAny>()?;

                if map.next_key::<IgnoredAny>()?.is_some() {
                    return Err(de::Error::custom("job status has more than one tag set"));
                }

                JobStatus::from_tag(&tag)
                    .ok_or_else(|| de::Error::unknown_variant(&tag, &["open", "inProgress", "completed", "cancelled", "disputed"]))
            }
        }

        deserializer.deserialize_map(TaggedStatus)
    }
}

/// A freelancer's standing offer on a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bid {
    #[serde(with = "base58")]
    pub freelancer: Pubkey,
    pub amount: u64,
}

/// One posted job as stored by the program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    #[serde(with = "base58")]
    pub client: Pubkey,
    #[serde(with = "base58::option")]
    pub freelancer: Option<Pubkey>,
    pub job_id: u64,
    pub title: String,
    pub description: String,
    pub budget: u64,
    pub deadline: i64,
    pub status: JobStatus,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(default)]
    pub bids: Vec<Bid>,
}

/// Job account body. An unassigned freelancer is the all-zero key.
#[derive(BorshSerialize, BorshDeserialize)]
struct JobAccount {
    client: Pubkey,
    freelancer: Pubkey,
    job_id: u64,
    title: String,
    description: String,
    budget: u64,
    deadline: i64,
    status: JobStatus,
    created_at: i64,
    updated_at: i64,
    bids: Vec<Bid>,
}

impl JobRecord {
    pub fn decode(data: &[u8]) -> Result<Self, LayoutError> {
        let account: JobAccount = AccountSchema::Job.deserialize(data)?;
        check_len("title", &account.title, MAX_TITLE_LEN)?;
        check_len("description", &account.description, MAX_DESCRIPTION_LEN)?;

        Ok(JobRecord {
            client: account.client,
            freelancer: Some(account.freelancer).filter(|key| *key != Pubkey::default()),
            job_id: account.job_id,
            title: account.title,
            description: account.description,
            budget: account.budget,
            deadline: account.deadline,
            status: account.status,
            created_at: account.created_at,
            updated_at: account.updated_at,
            bids: account.bids,
        })
    }

    /// Assigned to `freelancer` or carrying one of their bids.
    pub fn involves(&self, freelancer: &Pubkey) -> bool {
        self.freelancer.as_ref() == Some(freelancer) || self.bids.iter().any(|bid| bid.freelancer == *freelancer)
    }

    #[cfg(test)]
    pub fn encode(&self) -> Vec<u8> {
        AccountSchema::Job.serialize(&JobAccount {
            client: self.client,
            freelancer: self.freelancer.unwrap_or_default(),
            job_id: self.job_id,
            title: self.title.clone(),
            description: self.description.clone(),
            budget: self.budget,
            deadline: self.deadline,
            status: self.status,
            created_at: self.created_at,
            updated_at: self.updated_at,
            bids: self.bids.clone(),
        })
    }
}

/// Head of a user profile account. Resume data and counters after
/// `created_at` are not decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(with = "base58")]
    pub authority: Pubkey,
    pub name: String,
    pub is_client: bool,
    pub is_freelancer: bool,
    pub reputation: u64,
    pub completed_jobs: u64,
    pub created_at: i64,
}

impl UserProfile {
    pub fn decode(data: &[u8]) -> Result<Self, LayoutError> {
        let profile: UserProfile = AccountSchema::User.deserialize(data)?;
        check_len("name", &profile.name, MAX_NAME_LEN)?;
        Ok(profile)
    }

    #[cfg(test)]
    pub fn encode(&self) -> Vec<u8> {
        let mut data = AccountSchema::User.serialize(self);
        // resume: None, then seven trailing counters
        data.push(0);
        data.extend_from_slice(&[0u8; 7 * 8]);
        data
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use serde_json::json;
    use solana_sha256_hasher::hash;

    fn key(n: u8) -> Pubkey {
        Pubkey::new_from_array([n; 32])
    }

    #[test]
    fn discriminators_are_account_name_hashes() {
        for (schema, name) in [(AccountSchema::Job, "Job"), (AccountSchema::User, "User")] {
            let digest = hash(format!("account:{}", name).as_bytes()).to_bytes();
            assert_eq!(schema.discriminator(), digest[..8]);
        }
    }

    #[test]
    fn identity_fields_sit_at_constraint_offsets() {
        let (client, freelancer) = (key(1), key(2));
        let data = job(client, Some(freelancer), JobStatus::Open).encode();

        assert_eq!(&data[CLIENT_OFFSET..CLIENT_OFFSET + 32], client.as_ref());
        assert_eq!(&data[FREELANCER_OFFSET..FREELANCER_OFFSET + 32], freelancer.as_ref());
    }

    #[test]
    fn job_decodes_from_account_data() {
        let mut record = job(key(1), None, JobStatus::Disputed);
        record.bids.push(Bid {
            freelancer: key(5),
            amount: 250,
        });

        let decoded = JobRecord::decode(&record.encode()).unwrap();
        assert_eq!(decoded, record);
        assert_eq!(decoded.freelancer, None);
    }

    #[test]
    fn unused_account_space_is_ignored() {
        let record = job(key(1), None, JobStatus::Open);
        let mut data = record.encode();
        data.extend_from_slice(&[0u8; 64]);
        assert_eq!(JobRecord::decode(&data).unwrap(), record);
    }

    #[test]
    fn job_with_wrong_discriminator_is_rejected() {
        let profile = user(key(1));
        assert_eq!(
            JobRecord::decode(&profile.encode()),
            Err(LayoutError::WrongDiscriminator("job"))
        );
    }

    #[test]
    fn truncated_job_is_rejected() {
        let data = job(key(1), None, JobStatus::Open).encode();
        assert!(matches!(
            JobRecord::decode(&data[..data.len() - 8]),
            Err(LayoutError::Decode { schema: "job", .. })
        ));
    }

    #[test]
    fn unknown_status_byte_is_rejected() {
        let mut data = job(key(1), None, JobStatus::Open).encode();
        // status, two timestamps, then the empty bid vector's length prefix
        let status_at = data.len() - 4 - 16 - 1;
        data[status_at] = 9;
        assert!(matches!(JobRecord::decode(&data), Err(LayoutError::Decode { .. })));
    }

    #[test]
    fn oversized_title_is_rejected() {
        let mut record = job(key(1), None, JobStatus::Open);
        record.title = "é".repeat(60);
        assert_eq!(
            JobRecord::decode(&record.encode()),
            Err(LayoutError::FieldTooLong {
                field: "title",
                len: 120,
                max: MAX_TITLE_LEN
            })
        );
    }

    #[test]
    fn user_profile_ignores_trailing_resume() {
        let profile = user(key(4));
        assert_eq!(UserProfile::decode(&profile.encode()).unwrap(), profile);
    }

    #[test]
    fn involvement_covers_assignment_and_bids() {
        let freelancer = key(5);
        let assigned = job(key(1), Some(freelancer), JobStatus::InProgress);
        assert!(assigned.involves(&freelancer));

        let mut bidding = job(key(1), None, JobStatus::Open);
        assert!(!bidding.involves(&freelancer));
        bidding.bids.push(Bid { freelancer, amount: 10 });
        assert!(bidding.involves(&freelancer));
        assert!(!bidding.involves(&key(6)));
    }

    #[test]
    fn status_json_is_single_key_map() {
        assert_eq!(serde_json::to_value(JobStatus::InProgress).unwrap(), json!({"inProgress": {}}));

        let parsed: JobStatus = serde_json::from_value(json!({"Completed": {}})).unwrap();
        assert_eq!(parsed, JobStatus::Completed);

        let parsed: JobStatus = serde_json::from_value(json!({"INPROGRESS": {}})).unwrap();
        assert_eq!(parsed, JobStatus::InProgress);
    }

    #[test]
    fn status_json_with_zero_or_many_tags_is_rejected() {
        assert!(serde_json::from_value::<JobStatus>(json!({})).is_err());
        assert!(serde_json::from_value::<JobStatus>(json!({"open": {}, "disputed": {}})).is_err());
        assert!(serde_json::from_value::<JobStatus>(json!({"archived": {}})).is_err());
        assert!(serde_json::from_value::<JobStatus>(json!("open")).is_err());
    }

    #[test]
    fn job_record_json_matches_client_library_shape() {
        let record = job(key(1), None, JobStatus::Open);
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["client"], json!(key(1).to_string()));
        assert_eq!(value["status"], json!({"open": {}}));
        assert_eq!(value["freelancer"], json!(null));
        assert_eq!(value["jobId"], json!(1));
        assert_eq!(value["bids"], json!([]));

        let back: JobRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back, record);
    }
}
