use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use log::*;

mod client;
mod formatting;
mod signing;

use client::{AdminProfile, ReferralServerClient};
use referral_engine::db_types::ReferralType;

use crate::{
    formatting::{format_events, format_payout, format_referral, format_referrals, format_verification},
    signing::{print_mail_signature, print_meeting_signature, send_mail_webhook},
};

#[derive(Parser, Debug)]
#[command(version = "0.1.0", about = "Command-line tools for the referral payout server")]
pub struct Arguments {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    #[clap(name = "sign-mail", about = "Sign a payload the way the mail provider signs its webhook calls")]
    SignMail(SignParams),
    #[clap(name = "sign-meeting", about = "Sign a payload the way the meeting provider signs its webhook calls")]
    SignMeeting(SignParams),
    #[clap(name = "send-mail", about = "Send a signed mail webhook call to the server")]
    SendMail(SendMailParams),
    #[command(flatten)]
    Admin(AdminCommand),
}

/// Commands that call the admin API. They need `RPS_SERVER_URL`, `RPS_ADMIN_ID` and `RPS_ADMIN_API_KEY`.
#[derive(Debug, Subcommand)]
pub enum AdminCommand {
    #[clap(name = "create", about = "Record a referral reported by a professional")]
    Create(CreateParams),
    #[clap(name = "show", about = "Show a referral and its audit trail")]
    Show { id: i64 },
    #[clap(name = "list", about = "List referrals")]
    List(ListParams),
    #[clap(name = "verify", about = "Verify a referral and pay it out if the professional is eligible")]
    Verify { id: i64 },
    #[clap(name = "payout", about = "Retry the payout of a verified referral")]
    Payout { id: i64 },
    #[clap(name = "reject", about = "Reject a referral")]
    Reject {
        id: i64,
        /// Why the referral was rejected. Required.
        #[arg(short = 'r', long = "reason")]
        reason: String,
    },
}

#[derive(Debug, Args)]
pub struct SignParams {
    /// The webhook signing secret
    #[arg(short = 's', long = "secret", env = "RPS_WEBHOOK_SECRET")]
    secret: String,
    /// The file containing the request body
    #[arg(short = 'f', long = "file")]
    file: PathBuf,
    /// Unix timestamp to sign with. Defaults to now.
    #[arg(short = 't', long = "timestamp")]
    timestamp: Option<i64>,
    /// The per-request token (mail provider only)
    #[arg(short = 'k', long = "token", default_value = "referral-tools")]
    token: String,
}

#[derive(Debug, Args)]
pub struct SendMailParams {
    #[command(flatten)]
    sign: SignParams,
    /// The referral server's base url
    #[arg(short = 'u', long = "url", env = "RPS_SERVER_URL", default_value = "http://127.0.0.1:8370")]
    server: String,
}

#[derive(Debug, Args)]
pub struct CreateParams {
    /// The professional who made the referral
    #[arg(short = 'p', long = "professional")]
    professional_id: i64,
    /// The candidate's email address
    #[arg(short = 'c', long = "candidate")]
    candidate_email: String,
    /// email, link or other
    #[arg(short = 't', long = "type", default_value = "other")]
    referral_type: ReferralType,
}

#[derive(Debug, Args)]
pub struct ListParams {
    /// Only list the referrals made by this professional
    #[arg(short = 'p', long = "professional", conflicts_with = "candidate_id")]
    professional_id: Option<i64>,
    /// Only list the referrals of this candidate
    #[arg(short = 'c', long = "candidate")]
    candidate_id: Option<i64>,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    env_logger::init();
    let cli = Arguments::parse();
    let result = match cli.command {
        Command::SignMail(params) => print_mail_signature(params),
        Command::SignMeeting(params) => print_meeting_signature(params),
        Command::SendMail(params) => send_mail_webhook(params).await,
        Command::Admin(command) => run_admin_command(command).await,
    };
    if let Err(e) = result {
        error!("{e:#}");
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run_admin_command(command: AdminCommand) -> anyhow::Result<()> {
    let profile = AdminProfile::from_env()?;
    let client = ReferralServerClient::new(profile)?;
    let output = match command {
        AdminCommand::Create(params) => {
            let referral =
                client.create_referral(params.professional_id, &params.candidate_email, params.referral_type).await?;
            format_referral(&referral)?
        },
        AdminCommand::Show { id } => {
            let referral = client.referral(id).await?;
            let events = client.referral_events(id).await?;
            format!("{}\n{}", format_referral(&referral)?, format_events(&events))
        },
        AdminCommand::List(params) => {
            let referrals = match (params.professional_id, params.candidate_id) {
                (Some(id), _) => client.referrals_for_professional(id).await?,
                (None, Some(id)) => client.referrals_for_candidate(id).await?,
                (None, None) => client.unpaid_referrals().await?,
            };
            format_referrals(&referrals)
        },
        AdminCommand::Verify { id } => format_verification(&client.verify(id).await?)?,
        AdminCommand::Payout { id } => format_payout(&client.payout(id).await?),
        AdminCommand::Reject { id, reason } => format_referral(&client.reject(id, &reason).await?)?,
    };
    println!("{output}");
    Ok(())
}
