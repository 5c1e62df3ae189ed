use std::fmt::Write;

use anyhow::Result;
use prettytable::{
    format::{LinePosition, LineSeparator, TableFormat},
    row,
    Table,
};
use referral_engine::{
    db_types::{Referral, ReferralEvent},
    PayoutOutcome,
    VerificationOutcome,
};

fn markdown_format() -> TableFormat {
    prettytable::format::FormatBuilder::new()
        .column_separator('|')
        .borders('|')
        .separator(LinePosition::Title, LineSeparator::new('-', '|', '|', '|'))
        .padding(1, 1)
        .build()
}

fn or_dash<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

pub fn format_referral(referral: &Referral) -> Result<String> {
    let mut f = String::new();
    writeln!(f, "===============================================================================")?;
    writeln!(f, "Referral #{} ({})", referral.id, referral.referral_type)?;
    writeln!(f, "===============================================================================")?;
    writeln!(f, "Professional     : #{}", referral.professional_id)?;
    writeln!(f, "Candidate        : #{}", referral.candidate_id)?;
    writeln!(f, "Status           : {}", referral.status)?;
    writeln!(f, "Domains verified : {}", referral.email_domain_verified)?;
    if let Some(email) = &referral.email_details {
        writeln!(f, "Email            : {} -> {} ({})", email.sender_email, email.recipient_email, email.referral_email_id)?;
    }
    if let Some(v) = &referral.verification_details {
        let by = v.verified_by.as_deref().unwrap_or("system");
        writeln!(f, "Verified         : {} by {by} ({})", v.verified_at, v.verification_method)?;
    }
    if let Some(reason) = &referral.rejection_reason {
        writeln!(f, "Rejected         : {reason}")?;
    }
    writeln!(f, "Payment          : {} {}", referral.payment_status, or_dash(referral.payment_id.as_deref()))?;
    writeln!(f, "Reward           : {}", or_dash(referral.reward_amount))?;
    writeln!(f, "Paid on          : {}", or_dash(referral.payout_date))?;
    writeln!(f, "Created          : {}", referral.created_at)?;
    writeln!(f, "Updated          : {}", referral.updated_at)?;
    Ok(f)
}

pub fn format_referrals(referrals: &[Referral]) -> String {
    if referrals.is_empty() {
        return "No referrals".to_string();
    }
    let mut table = Table::new();
    table.set_titles(row!["ID", "Professional", "Candidate", "Type", "Status", "Payment", "Reward", "Created"]);
    referrals.iter().for_each(|r| {
        table.add_row(row![
            r.id,
            r.professional_id,
            r.candidate_id,
            r.referral_type,
            r.status,
            r.payment_status,
            or_dash(r.reward_amount),
            r.created_at.format("%Y-%m-%d %H:%M")
        ]);
    });
    table.set_format(markdown_format());
    table.to_string()
}

pub fn format_events(events: &[ReferralEvent]) -> String {
    if events.is_empty() {
        return "No events".to_string();
    }
    let mut table = Table::new();
    table.set_titles(row!["ID", "Event", "Time"]);
    events.iter().for_each(|e| {
        table.add_row(row![e.id, e.event_type, e.created_at]);
    });
    table.set_format(markdown_format());
    table.to_string()
}

pub fn format_payout(outcome: &PayoutOutcome) -> String {
    match outcome {
        PayoutOutcome::Paid(p) if p.already_paid => {
            format!("Already paid: {} in transfer {} on {}", p.amount, p.transfer_id, p.payout_date)
        },
        PayoutOutcome::Paid(p) => format!("Paid {} in transfer {}", p.amount, p.transfer_id),
        PayoutOutcome::Ineligible { reason } => format!("Not paid. {reason}"),
    }
}

pub fn format_verification(outcome: &VerificationOutcome) -> Result<String> {
    let mut f = format_referral(&outcome.referral)?;
    writeln!(f, "{}", format_payout(&outcome.payout))?;
    Ok(f)
}
