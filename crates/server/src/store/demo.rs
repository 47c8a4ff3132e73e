// Fixed records served while the store is unreachable, and the demo seed.

use chrono::{DateTime, NaiveDate, Utc};
use gpulaw_common::types::{Case, CaseCategory, CaseStatus, DocumentStatus, DocumentSummary};

pub const DEMO_CASE_ID: &str = "demo-case";
pub const PLACEHOLDER_CASE_TITLE: &str = "Demo Case";
pub const PLACEHOLDER_CLIENT_NAME: &str = "Demo Client";

fn midnight_utc(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .unwrap_or_default()
}

/// The two cases listed in place of real data during an outage, attributed to
/// the requesting owner.
pub fn fallback_cases(owner_id: &str) -> Vec<Case> {
    vec![
        Case {
            id: "demo-1".to_string(),
            title: "Crypto Exchange ABC Compliance Review".to_string(),
            client_name: "ABC Crypto Exchange".to_string(),
            category: CaseCategory::CryptoExchangeCompliance,
            description: "Comprehensive compliance review for a major cryptocurrency exchange \
                          operating in multiple jurisdictions."
                .to_string(),
            status: CaseStatus::InProgress,
            owner_id: owner_id.to_string(),
            created_at: midnight_utc(2024, 12, 1),
            updated_at: midnight_utc(2024, 12, 10),
            documents: vec![DocumentSummary {
                id: "doc-1".to_string(),
                title: "AML Compliance Report".to_string(),
                status: DocumentStatus::UnderReview,
            }],
        },
        Case {
            id: "demo-2".to_string(),
            title: "Token Classification Analysis".to_string(),
            client_name: "XYZ Blockchain Corp".to_string(),
            category: CaseCategory::TokenClassification,
            description: "Legal opinion on token classification under securities law.".to_string(),
            status: CaseStatus::Draft,
            owner_id: owner_id.to_string(),
            created_at: midnight_utc(2024, 11, 25),
            updated_at: midnight_utc(2024, 12, 8),
            documents: Vec::new(),
        },
    ]
}

/// Cases upserted at startup when demo seeding is enabled.
pub fn seed_cases(owner_id: &str) -> Vec<Case> {
    let now = Utc::now();
    let case = |id: &str,
                title: &str,
                client: &str,
                category: CaseCategory,
                description: &str,
                status: CaseStatus| Case {
        id: id.to_string(),
        title: title.to_string(),
        client_name: client.to_string(),
        category,
        description: description.to_string(),
        status,
        owner_id: owner_id.to_string(),
        created_at: now,
        updated_at: now,
        documents: Vec::new(),
    };

    vec![
        case(
            DEMO_CASE_ID,
            "Demo Case - Crypto Exchange Compliance",
            PLACEHOLDER_CLIENT_NAME,
            CaseCategory::CryptoExchangeCompliance,
            "This is a demo case for testing the AI legal assistant",
            CaseStatus::InProgress,
        ),
        case(
            "demo-case-ico-review",
            "TokenCo ICO Legal Review",
            "TokenCo Ltd.",
            CaseCategory::IcoLegalOpinion,
            "Initial Coin Offering legal opinion and compliance review",
            CaseStatus::Draft,
        ),
        case(
            "demo-case-defi-aml",
            "DeFi Platform AML Compliance",
            "DeFi Protocol Inc.",
            CaseCategory::AmlCompliance,
            "Anti-Money Laundering compliance assessment",
            CaseStatus::InProgress,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_cases_are_deterministic() {
        let first = fallback_cases("demo-user");
        assert_eq!(first, fallback_cases("demo-user"));
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].created_at.to_rfc3339(), "2024-12-01T00:00:00+00:00");
        assert_eq!(first[1].documents.len(), 0);
    }

    #[test]
    fn seed_cases_belong_to_owner() {
        let cases = seed_cases("owner-7");
        assert_eq!(cases[0].id, DEMO_CASE_ID);
        assert!(cases.iter().all(|case| case.owner_id == "owner-7"));
    }
}
