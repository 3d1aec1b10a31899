use solana_sdk::instruction::Instruction;
use solana_sdk::signer::Signer;
use std::sync::Arc;
use tracing::{info, warn};
use validator::Validate;

use crate::api::error::ServiceError;
use crate::api::validation::describe_errors;
use crate::chain::instruction;
use crate::chain::pubkey::Pubkey;
use crate::chain::transaction::{TransactionError, TransactionSubmitter, WalletSigner};
use crate::wallet::Caller;

use super::dto::TransactionResponse;
use super::models::{BidRequest, JobEntry, WorkSubmission};
use super::query::JobQueryEngine;

/// Job service containing the state-changing job operations
pub struct JobService {
    engine: Arc<JobQueryEngine>,
    submitter: Arc<dyn TransactionSubmitter>,
    program_id: Pubkey,
}

impl JobService {
    pub fn new(engine: Arc<JobQueryEngine>, submitter: Arc<dyn TransactionSubmitter>, program_id: Pubkey) -> Self {
        Self {
            engine,
            submitter,
            program_id,
        }
    }

    /// Accepts either a job account address or the numeric id the job was posted with.
    pub fn resolve_address(&self, raw: &str) -> Result<Pubkey, ServiceError> {
        if let Ok(job_id) = raw.parse::<u64>() {
            return Ok(instruction::job_address(&self.program_id, job_id));
        }
        raw.parse::<Pubkey>()
            .map_err(|e| ServiceError::InvalidCriteria(format!("job '{}': {}", raw, e)))
    }

    /// Submit a proposal for an open job
    ///
    /// # Business Logic
    /// - Validates the proposal before touching the network
    /// - Resolves the job's numeric id from its account
    /// - Signs and submits `submit_bid` with the connected wallet
    pub async fn submit_bid(
        &self,
        caller: &Caller,
        job_address: &Pubkey,
        bid: &BidRequest,
    ) -> Result<TransactionResponse, ServiceError> {
        validate(bid)?;
        let signer = caller.signer().ok_or(ServiceError::Unauthenticated)?;
        let job = self.load_job(caller, job_address).await?;

        info!("Service: Submitting bid of {} on job {}", bid.amount, job.account.job_id);

        let ix = instruction::submit_bid(
            &self.program_id,
            job_address,
            job.account.job_id,
            &signer.pubkey(),
            bid.amount,
            &bid.proposal,
        )
        .map_err(TransactionError::from)?;

        self.send("Bid submitted", ix, signer).await
    }

    /// Submit completed work for an assigned job
    pub async fn submit_work(
        &self,
        caller: &Caller,
        job_address: &Pubkey,
        work: &WorkSubmission,
    ) -> Result<TransactionResponse, ServiceError> {
        validate(work)?;
        let signer = caller.signer().ok_or(ServiceError::Unauthenticated)?;
        let job = self.load_job(caller, job_address).await?;

        info!("Service: Submitting work for job {}", job.account.job_id);

        let ix = instruction::submit_work(
            &self.program_id,
            job_address,
            job.account.job_id,
            &signer.pubkey(),
            &work.url,
            &work.description,
        )
        .map_err(TransactionError::from)?;

        self.send("Work submitted", ix, signer).await
    }

    async fn load_job(&self, caller: &Caller, address: &Pubkey) -> Result<JobEntry, ServiceError> {
        self.engine
            .fetch_job(caller, address)
            .await?
            .ok_or(ServiceError::NotFound(*address))
    }

    async fn send(&self, message: &str, ix: Instruction, signer: &WalletSigner) -> Result<TransactionResponse, ServiceError> {
        let signature = self.submitter.submit(ix, signer).await?;
        info!("Service: {} with signature={}", message, signature);

        Ok(TransactionResponse {
            message: format!("{} successfully", message),
            signature,
        })
    }
}

fn validate<T: Validate>(request: &T) -> Result<(), ServiceError> {
    request.validate().map_err(|errors| {
        let message = describe_errors(&errors);
        warn!("Service: Validation failed: {}", message);
        ServiceError::ValidationError(message)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::accounts::fixtures::job;
    use crate::chain::accounts::JobStatus;
    use crate::chain::instruction::sighash;
    use crate::chain::store::fake::FakeAccountStore;
    use crate::chain::transaction::fake::RecordingSubmitter;
    use crate::wallet::fixtures::keypair;

    const PROGRAM: Pubkey = Pubkey::new_from_array([11u8; 32]);

    fn key(n: u8) -> Pubkey {
        Pubkey::new_from_array([n; 32])
    }

    struct Harness {
        service: JobService,
        store: Arc<FakeAccountStore>,
        submitter: Arc<RecordingSubmitter>,
        caller: Caller,
    }

    fn harness() -> Harness {
        let store = Arc::new(FakeAccountStore::new());
        let submitter = Arc::new(RecordingSubmitter::default());
        let engine = Arc::new(JobQueryEngine::new(store.clone()));
        let service = JobService::new(engine, submitter.clone(), PROGRAM);
        let caller = Caller::with_signer(Arc::new(keypair(7)));

        Harness {
            service,
            store,
            submitter,
            caller,
        }
    }

    fn work() -> WorkSubmission {
        WorkSubmission {
            url: "https://github.com/acme/site/pull/4".to_string(),
            description: "Implemented the hero section".to_string(),
        }
    }

    #[tokio::test]
    async fn submit_work_sends_instruction_for_job_id() {
        let h = harness();
        let address = key(50);
        let mut record = job(key(1), h.caller.identity(), JobStatus::InProgress);
        record.job_id = 42;
        h.store.insert(address, record.encode());

        let response = h.service.submit_work(&h.caller, &address, &work()).await.unwrap();
        assert_eq!(response.signature, "5igna7ure");

        let submitted = h.submitter.submitted.lock().unwrap();
        let (ix, signer) = &submitted[0];
        assert_eq!(Some(*signer), h.caller.identity());
        assert_eq!(&ix.data[..8], &sighash("submit_work"));
        assert_eq!(&ix.data[8..16], &42u64.to_le_bytes());
        assert_eq!(ix.accounts[0].pubkey, address);
    }

    #[tokio::test]
    async fn invalid_submission_never_reaches_network() {
        let h = harness();
        let bad = WorkSubmission {
            url: "not a url".to_string(),
            description: "x".to_string(),
        };

        let err = h.service.submit_work(&h.caller, &key(50), &bad).await.unwrap_err();
        assert!(matches!(err, ServiceError::ValidationError(_)));
        assert_eq!(h.store.calls(), 0);
        assert!(h.submitter.submitted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn read_only_caller_cannot_submit() {
        let h = harness();
        let caller = Caller::read_only(key(3));
        let bid = BidRequest {
            amount: 10,
            proposal: "I can do it".to_string(),
        };

        let err = h.service.submit_bid(&caller, &key(50), &bid).await.unwrap_err();
        assert!(matches!(err, ServiceError::Unauthenticated));
    }

    #[tokio::test]
    async fn bid_on_missing_job_is_not_found() {
        let h = harness();
        let bid = BidRequest {
            amount: 10,
            proposal: "I can do it".to_string(),
        };

        let err = h.service.submit_bid(&h.caller, &key(50), &bid).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[test]
    fn resolve_address_accepts_key_or_job_id() {
        let h = harness();
        let address = key(50);
        assert_eq!(h.service.resolve_address(&address.to_string()).unwrap(), address);

        let derived = instruction::job_address(&PROGRAM, 7);
        assert_eq!(h.service.resolve_address("7").unwrap(), derived);

        assert!(matches!(
            h.service.resolve_address("nope"),
            Err(ServiceError::InvalidCriteria(_))
        ));
    }

    #[tokio::test]
    async fn rejected_transaction_is_reported() {
        let h = harness();
        let address = key(50);
        h.store.insert(address, job(key(1), None, JobStatus::Open).encode());
        *h.submitter.fail.lock().unwrap() = true;

        let bid = BidRequest {
            amount: 10,
            proposal: "I can do it".to_string(),
        };
        let err = h.service.submit_bid(&h.caller, &address, &bid).await.unwrap_err();
        assert!(matches!(err, ServiceError::Transaction(_)));
    }
}
