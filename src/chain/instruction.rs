//! Instruction builders for the program's state-changing entry points.

use borsh::BorshSerialize;
use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::system_program;
use solana_sha256_hasher::hashv;

use super::pubkey::Pubkey;

/// First 8 bytes of `sha256("global:<name>")`, prefixed to every instruction's data.
pub fn sighash(name: &str) -> [u8; 8] {
    let digest = hashv(&[b"global:", name.as_bytes()]).to_bytes();
    let mut out = [0u8; 8];
    out.copy_from_slice(&digest[..8]);
    out
}

/// Profile account of `authority`: seeds `["user", authority]`.
pub fn user_address(program_id: &Pubkey, authority: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(&[b"user", authority.as_ref()], program_id).0
}

/// Job account: seeds `["job", job_id as little-endian u64]`.
pub fn job_address(program_id: &Pubkey, job_id: u64) -> Pubkey {
    Pubkey::find_program_address(&[b"job", &job_id.to_le_bytes()], program_id).0
}

fn instruction_data<T: BorshSerialize>(name: &str, args: &T) -> std::io::Result<Vec<u8>> {
    let mut data = sighash(name).to_vec();
    args.serialize(&mut data)?;
    Ok(data)
}

#[derive(BorshSerialize)]
struct RegisterUserArgs<'a> {
    name: &'a str,
    is_client: bool,
    is_freelancer: bool,
}

#[derive(BorshSerialize)]
struct SubmitBidArgs<'a> {
    job_id: u64,
    amount: u64,
    proposal: &'a str,
}

#[derive(BorshSerialize)]
struct SubmitWorkArgs<'a> {
    job_id: u64,
    url: &'a str,
    description: &'a str,
}

pub fn register_user(
    program_id: &Pubkey,
    authority: &Pubkey,
    name: &str,
    is_client: bool,
    is_freelancer: bool,
) -> std::io::Result<Instruction> {
    let data = instruction_data(
        "register_user",
        &RegisterUserArgs {
            name,
            is_client,
            is_freelancer,
        },
    )?;

    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(user_address(program_id, authority), false),
            AccountMeta::new(*authority, true),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data,
    })
}

pub fn submit_bid(
    program_id: &Pubkey,
    job: &Pubkey,
    job_id: u64,
    freelancer: &Pubkey,
    amount: u64,
    proposal: &str,
) -> std::io::Result<Instruction> {
    let data = instruction_data(
        "submit_bid",
        &SubmitBidArgs {
            job_id,
            amount,
            proposal,
        },
    )?;

    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*job, false),
            AccountMeta::new_readonly(user_address(program_id, freelancer), false),
            AccountMeta::new(*freelancer, true),
        ],
        data,
    })
}

pub fn submit_work(
    program_id: &Pubkey,
    job: &Pubkey,
    job_id: u64,
    freelancer: &Pubkey,
    url: &str,
    description: &str,
) -> std::io::Result<Instruction> {
    let data = instruction_data(
        "submit_work",
        &SubmitWorkArgs {
            job_id,
            url,
            description,
        },
    )?;

    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*job, false),
            AccountMeta::new(user_address(program_id, freelancer), false),
            AccountMeta::new(*freelancer, true),
        ],
        data,
    })
}
