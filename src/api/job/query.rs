use std::sync::Arc;
use tracing::{debug, error, info};

use crate::api::error::ServiceError;
use crate::chain::accounts::{AccountSchema, JobRecord, CLIENT_OFFSET, FREELANCER_OFFSET};
use crate::chain::pubkey::Pubkey;
use crate::chain::store::{KeyedAccount, MemcmpConstraint, RemoteAccountStore};
use crate::wallet::Caller;

use super::models::{ClientFilter, FilterCriteria, FreelancerFilter, JobEntry, StatusFilter};

/// Answers job queries against the remote account store.
///
/// Identity filters are pushed to the store as byte constraints; the status
/// filter and the limit are applied locally. Each call is independent and
/// performs at most one remote fetch.
pub struct JobQueryEngine {
    store: Arc<dyn RemoteAccountStore>,
}

impl JobQueryEngine {
    pub fn new(store: Arc<dyn RemoteAccountStore>) -> Self {
        Self { store }
    }

    /// Jobs matching `criteria`, in the order the store returned them.
    ///
    /// # Returns
    /// - `Err(ServiceError::Unauthenticated)` - caller has no identity; nothing was fetched
    /// - `Err(ServiceError::RemoteFetch)` - store failed or returned undecodable data
    pub async fn query_jobs(
        &self,
        caller: &Caller,
        criteria: &FilterCriteria,
    ) -> Result<Vec<JobEntry>, ServiceError> {
        let identity = caller.identity().ok_or(ServiceError::Unauthenticated)?;

        let constraints = remote_constraints(&identity, criteria);
        debug!(
            constraints = constraints.len(),
            status = ?criteria.status,
            limit = ?criteria.limit,
            "Querying jobs"
        );

        let accounts = self
            .store
            .fetch_all(AccountSchema::Job, &constraints)
            .await
            .map_err(|e| {
                error!("Error fetching jobs: {}", e);
                ServiceError::RemoteFetch(e.to_string())
            })?;

        let mut jobs = decode_jobs(accounts)?;

        if let StatusFilter::Only(status) = criteria.status {
            jobs.retain(|job| job.account.status == status);
        }

        if let Some(limit) = criteria.effective_limit() {
            jobs.truncate(limit);
        }

        info!("Query returned {} jobs", jobs.len());
        Ok(jobs)
    }

    /// A single job by its account address.
    pub async fn fetch_job(&self, caller: &Caller, address: &Pubkey) -> Result<Option<JobEntry>, ServiceError> {
        caller.identity().ok_or(ServiceError::Unauthenticated)?;

        let account = self
            .store
            .fetch_one(AccountSchema::Job, address)
            .await
            .map_err(|e| {
                error!("Error fetching job {}: {}", address, e);
                ServiceError::RemoteFetch(e.to_string())
            })?;

        account.map(decode_job).transpose()
    }

    pub async fn fetch_my_jobs(&self, caller: &Caller, status: StatusFilter) -> Result<Vec<JobEntry>, ServiceError> {
        let criteria = FilterCriteria {
            client: ClientFilter::Mine,
            status,
            ..Default::default()
        };
        self.query_jobs(caller, &criteria).await
    }

    pub async fn fetch_jobs_by_client(
        &self,
        caller: &Caller,
        client: Pubkey,
        status: StatusFilter,
    ) -> Result<Vec<JobEntry>, ServiceError> {
        let criteria = FilterCriteria {
            client: ClientFilter::Identity(client),
            status,
            ..Default::default()
        };
        self.query_jobs(caller, &criteria).await
    }

    pub async fn fetch_jobs_by_freelancer(
        &self,
        caller: &Caller,
        freelancer: Pubkey,
        status: StatusFilter,
    ) -> Result<Vec<JobEntry>, ServiceError> {
        let criteria = FilterCriteria {
            freelancer: FreelancerFilter::Identity(freelancer),
            status,
            ..Default::default()
        };
        self.query_jobs(caller, &criteria).await
    }

    /// Jobs `freelancer` has bid on or is assigned to.
    ///
    /// Bids sit behind variable-length fields, so no byte constraint can select
    /// them: every job is fetched and matched locally.
    pub async fn fetch_jobs_with_freelancer_bids(
        &self,
        caller: &Caller,
        freelancer: Pubkey,
        status: StatusFilter,
    ) -> Result<Vec<JobEntry>, ServiceError> {
        caller.identity().ok_or(ServiceError::Unauthenticated)?;

        let accounts = self
            .store
            .fetch_all(AccountSchema::Job, &[])
            .await
            .map_err(|e| {
                error!("Error fetching jobs for bids of {}: {}", freelancer, e);
                ServiceError::RemoteFetch(e.to_string())
            })?;

        let mut jobs = decode_jobs(accounts)?;
        jobs.retain(|job| job.account.involves(&freelancer));
        if let StatusFilter::Only(status) = status {
            jobs.retain(|job| job.account.status == status);
        }

        info!(%freelancer, "Found {} jobs with bids or assignments", jobs.len());
        Ok(jobs)
    }
}

/// Constraints the store evaluates itself. All of them must hold for a record to be returned.
fn remote_constraints(caller: &Pubkey, criteria: &FilterCriteria) -> Vec<MemcmpConstraint> {
    let mut constraints = Vec::with_capacity(2);

    let client = match criteria.client {
        ClientFilter::All => None,
        ClientFilter::Mine => Some(*caller),
        ClientFilter::Identity(key) => Some(key),
    };
    if let Some(client) = client {
        constraints.push(MemcmpConstraint::identity(CLIENT_OFFSET, &client));
    }

    if let FreelancerFilter::Identity(freelancer) = criteria.freelancer {
        constraints.push(MemcmpConstraint::identity(FREELANCER_OFFSET, &freelancer));
    }

    constraints
}

fn decode_job(account: KeyedAccount) -> Result<JobEntry, ServiceError> {
    JobRecord::decode(&account.data)
        .map(|record| JobEntry {
            address: account.address,
            account: record,
        })
        .map_err(|e| {
            error!("Malformed job account {}: {}", account.address, e);
            ServiceError::RemoteFetch(format!("job account {}: {}", account.address, e))
        })
}

fn decode_jobs(accounts: Vec<KeyedAccount>) -> Result<Vec<JobEntry>, ServiceError> {
    accounts.into_iter().map(decode_job).collect()
}
