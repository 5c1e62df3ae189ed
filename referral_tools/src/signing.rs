use std::fs;

use anyhow::{Context, Result};
use chrono::Utc;
use log::*;
use referral_server::signatures::SignatureScheme;

use crate::{SendMailParams, SignParams};

struct SignedRequest {
    body: Vec<u8>,
    timestamp: String,
    signature: String,
}

fn sign(scheme: SignatureScheme, params: &SignParams) -> Result<SignedRequest> {
    let body = fs::read(&params.file).with_context(|| format!("Could not read {}", params.file.display()))?;
    let timestamp = params.timestamp.unwrap_or_else(|| Utc::now().timestamp()).to_string();
    let signature = scheme.sign(&params.secret, &timestamp, &params.token, &body)?;
    Ok(SignedRequest { body, timestamp, signature })
}

fn print_headers(scheme: SignatureScheme, params: &SignParams, signed: &SignedRequest) {
    println!("----------------------------- {scheme} webhook signature -----------------------------");
    println!("{}: {}", scheme.signature_header(), signed.signature);
    println!("{}: {}", scheme.timestamp_header(), signed.timestamp);
    if let Some(header) = scheme.token_header() {
        println!("{header}: {}", params.token);
    }
    println!("--------------------------------------------------------------------------------------");
}

pub fn print_mail_signature(params: SignParams) -> Result<()> {
    let signed = sign(SignatureScheme::Mail, &params)?;
    print_headers(SignatureScheme::Mail, &params, &signed);
    Ok(())
}

pub fn print_meeting_signature(params: SignParams) -> Result<()> {
    let signed = sign(SignatureScheme::Meeting, &params)?;
    print_headers(SignatureScheme::Meeting, &params, &signed);
    Ok(())
}

/// Posts the file to the server's mail webhook, signed as the mail provider would sign it.
pub async fn send_mail_webhook(params: SendMailParams) -> Result<()> {
    let scheme = SignatureScheme::Mail;
    let signed = sign(scheme, &params.sign)?;
    let url = url::Url::parse(&params.server)?.join("/webhook/mail")?;
    info!("📧️ Sending signed mail event to {url}");
    let mut req = reqwest::Client::new()
        .post(url)
        .header("Content-Type", "application/json")
        .header(scheme.signature_header(), signed.signature)
        .header(scheme.timestamp_header(), signed.timestamp);
    if let Some(header) = scheme.token_header() {
        req = req.header(header, params.sign.token.as_str());
    }
    let res = req.body(signed.body).send().await?;
    let status = res.status();
    let text = res.text().await?;
    println!("{status}\n{text}");
    Ok(())
}
