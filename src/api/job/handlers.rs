use actix_web::{
    HttpResponse, get, post,
    web::{Data, Path, ServiceConfig, scope},
};
use actix_web_validator::{Json, Query};
use tracing::info;

use crate::api::error::ServiceError;
use crate::chain::pubkey::Pubkey;
use crate::wallet::{IdentityProvider, WalletSession};

use super::dto::JobListResponse;
use super::models::{BidRequest, JobQuery, StatusQuery, WorkSubmission};
use super::query::JobQueryEngine;
use super::service::JobService;

#[get("")]
async fn list_jobs(
    engine: Data<JobQueryEngine>,
    wallet: Data<WalletSession>,
    query: Query<JobQuery>,
) -> Result<HttpResponse, ServiceError> {
    let criteria = query.into_inner().into_criteria()?;
    let jobs = engine.query_jobs(&wallet.caller(), &criteria).await?;
    Ok(HttpResponse::Ok().json(JobListResponse::from(jobs)))
}

#[get("/mine")]
async fn my_jobs(
    engine: Data<JobQueryEngine>,
    wallet: Data<WalletSession>,
    query: Query<StatusQuery>,
) -> Result<HttpResponse, ServiceError> {
    let jobs = engine.fetch_my_jobs(&wallet.caller(), query.status_filter()?).await?;
    Ok(HttpResponse::Ok().json(JobListResponse::from(jobs)))
}

#[get("/{address}")]
async fn get_job(
    engine: Data<JobQueryEngine>,
    service: Data<JobService>,
    wallet: Data<WalletSession>,
    address: Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let address = service.resolve_address(&address)?;
    let job = engine
        .fetch_job(&wallet.caller(), &address)
        .await?
        .ok_or(ServiceError::NotFound(address))?;
    Ok(HttpResponse::Ok().json(job))
}

#[post("/{address}/bids")]
async fn submit_bid(
    service: Data<JobService>,
    wallet: Data<WalletSession>,
    address: Path<String>,
    bid: Json<BidRequest>,
) -> Result<HttpResponse, ServiceError> {
    let address = service.resolve_address(&address)?;
    info!("Handler: Bid received for job {}", address);
    let response = service.submit_bid(&wallet.caller(), &address, &bid).await?;
    Ok(HttpResponse::Created().json(response))
}

#[post("/{address}/work")]
async fn submit_work(
    service: Data<JobService>,
    wallet: Data<WalletSession>,
    address: Path<String>,
    work: Json<WorkSubmission>,
) -> Result<HttpResponse, ServiceError> {
    let address = service.resolve_address(&address)?;
    info!("Handler: Work submission received for job {}", address);
    let response = service.submit_work(&wallet.caller(), &address, &work).await?;
    Ok(HttpResponse::Created().json(response))
}

#[get("/{address}/jobs")]
async fn jobs_by_client(
    engine: Data<JobQueryEngine>,
    wallet: Data<WalletSession>,
    client: Path<String>,
    query: Query<StatusQuery>,
) -> Result<HttpResponse, ServiceError> {
    let client = client
        .parse::<Pubkey>()
        .map_err(|e| ServiceError::InvalidCriteria(format!("client '{}': {}", client, e)))?;
    let jobs = engine
        .fetch_jobs_by_client(&wallet.caller(), client, query.status_filter()?)
        .await?;
    Ok(HttpResponse::Ok().json(JobListResponse::from(jobs)))
}

#[get("/{address}/jobs")]
async fn jobs_by_freelancer(
    engine: Data<JobQueryEngine>,
    wallet: Data<WalletSession>,
    freelancer: Path<String>,
    query: Query<StatusQuery>,
) -> Result<HttpResponse, ServiceError> {
    let freelancer = freelancer
        .parse::<Pubkey>()
        .map_err(|e| ServiceError::InvalidCriteria(format!("freelancer '{}': {}", freelancer, e)))?;
    let jobs = engine
        .fetch_jobs_by_freelancer(&wallet.caller(), freelancer, query.status_filter()?)
        .await?;
    Ok(HttpResponse::Ok().json(JobListResponse::from(jobs)))
}

#[get("/{address}/bids")]
async fn bids_by_freelancer(
    engine: Data<JobQueryEngine>,
    wallet: Data<WalletSession>,
    freelancer: Path<String>,
    query: Query<StatusQuery>,
) -> Result<HttpResponse, ServiceError> {
    let freelancer = freelancer
        .parse::<Pubkey>()
        .map_err(|e| ServiceError::InvalidCriteria(format!("freelancer '{}': {}", freelancer, e)))?;
    let jobs = engine
        .fetch_jobs_with_freelancer_bids(&wallet.caller(), freelancer, query.status_filter()?)
        .await?;
    Ok(HttpResponse::Ok().json(JobListResponse::from(jobs)))
}

pub fn job_config(config: &mut ServiceConfig) {
    // `/mine` must be registered ahead of `/{address}`
    config
        .service(
            scope("jobs")
                .service(list_jobs)
                .service(my_jobs)
                .service(get_job)
                .service(submit_bid)
                .service(submit_work),
        )
        .service(scope("clients").service(jobs_by_client))
        .service(
            scope("freelancers")
                .service(jobs_by_freelancer)
                .service(bids_by_freelancer),
        );
}
