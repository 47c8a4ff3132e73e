// Core domain types shared across all GPULaw crates.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Returned when a stored or submitted value is not part of a closed enum.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown {kind} value '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Declares a closed string enum with its exact wire literals.
///
/// Every variant serializes to (and parses from) exactly one literal; any
/// other input is rejected rather than mapped to a default.
macro_rules! literal_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal {
            $($variant:ident => $literal:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $literal)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub const fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $literal),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value {
                    $($literal => Ok($name::$variant),)+
                    other => Err(UnknownVariant { kind: $kind, value: other.to_string() }),
                }
            }
        }
    };
}

literal_enum! {
    /// Practice area a case belongs to.
    CaseCategory, "case category" {
        CryptoExchangeCompliance => "CRYPTO_EXCHANGE_COMPLIANCE",
        IcoLegalOpinion => "ICO_LEGAL_OPINION",
        AmlCompliance => "AML_COMPLIANCE",
        UserAgreement => "USER_AGREEMENT",
        RegulatoryFiling => "REGULATORY_FILING",
        Licensing => "LICENSING",
        TokenClassification => "TOKEN_CLASSIFICATION",
        SmartContractAudit => "SMART_CONTRACT_AUDIT",
    }
}

literal_enum! {
    CaseStatus, "case status" {
        Draft => "DRAFT",
        InProgress => "IN_PROGRESS",
        Review => "REVIEW",
        Completed => "COMPLETED",
        Archived => "ARCHIVED",
    }
}

literal_enum! {
    DocumentType, "document type" {
        LegalOpinion => "LEGAL_OPINION",
        ComplianceReport => "COMPLIANCE_REPORT",
        UserAgreement => "USER_AGREEMENT",
        PrivacyPolicy => "PRIVACY_POLICY",
        RegulatoryFiling => "REGULATORY_FILING",
        LicenseApplication => "LICENSE_APPLICATION",
    }
}

literal_enum! {
    DocumentStatus, "document status" {
        Draft => "DRAFT",
        AiGenerated => "AI_GENERATED",
        UnderReview => "UNDER_REVIEW",
        Approved => "APPROVED",
        Finalized => "FINALIZED",
    }
}

literal_enum! {
    /// Output language of a document.
    Language, "language" {
        En => "en",
        ZhTw => "zh-TW",
        ZhCn => "zh-CN",
    }
}

impl Default for CaseStatus {
    fn default() -> Self {
        Self::Draft
    }
}

impl Default for DocumentStatus {
    fn default() -> Self {
        Self::AiGenerated
    }
}

impl Default for Language {
    fn default() -> Self {
        Self::En
    }
}

impl Language {
    /// Resolve a generation language code. Unsupported codes fall back to English.
    pub fn from_code_lossy(code: &str) -> Self {
        code.trim().parse().unwrap_or_default()
    }
}

impl DocumentType {
    /// The document type produced when generating for a case category.
    pub const fn for_category(category: CaseCategory) -> Self {
        match category {
            CaseCategory::CryptoExchangeCompliance => Self::ComplianceReport,
            CaseCategory::IcoLegalOpinion => Self::LegalOpinion,
            CaseCategory::AmlCompliance => Self::ComplianceReport,
            CaseCategory::UserAgreement => Self::UserAgreement,
            CaseCategory::RegulatoryFiling => Self::RegulatoryFiling,
            CaseCategory::Licensing => Self::LicenseApplication,
            CaseCategory::TokenClassification => Self::LegalOpinion,
            CaseCategory::SmartContractAudit => Self::ComplianceReport,
        }
    }
}

/// A client engagement that documents are generated against.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Case {
    pub id: String,
    pub title: String,
    pub client_name: String,
    pub category: CaseCategory,
    pub description: String,
    pub status: CaseStatus,
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Populated by listings; empty for point lookups and creates.
    #[serde(default)]
    pub documents: Vec<DocumentSummary>,
}

/// Minimal document view nested inside case listings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSummary {
    pub id: String,
    pub title: String,
    pub status: DocumentStatus,
}

/// Case fields attached to a document view.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CaseSummary {
    pub title: String,
    pub category: CaseCategory,
    pub client_name: String,
}

/// Template fields attached to a document view.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSummary {
    pub name: String,
}

/// A generated or hand-edited markdown artifact tied to a case.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub title: String,
    pub content: String,
    #[serde(rename = "type")]
    pub doc_type: DocumentType,
    pub status: DocumentStatus,
    pub language: Language,
    pub case_id: String,
    pub template_id: Option<String>,
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(rename = "case", skip_serializing_if = "Option::is_none", default)]
    pub case_summary: Option<CaseSummary>,
    #[serde(rename = "template", skip_serializing_if = "Option::is_none", default)]
    pub template_summary: Option<TemplateSummary>,
}

/// Reusable markdown skeleton optionally supplied to generation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub id: String,
    pub name: String,
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enums_round_trip_exact_literals() {
        for category in CaseCategory::ALL {
            assert_eq!(category.as_str().parse::<CaseCategory>().unwrap(), *category);
        }
        assert_eq!(CaseCategory::ALL.len(), 8);
        assert_eq!(CaseStatus::ALL.len(), 5);
        assert_eq!(DocumentType::ALL.len(), 6);
        assert_eq!(DocumentStatus::ALL.len(), 5);
        assert_eq!(Language::ALL.len(), 3);
    }

    #[test]
    fn unknown_literals_are_rejected() {
        let error = "REVIEWED".parse::<DocumentStatus>().unwrap_err();
        assert_eq!(error.kind, "document status");
        assert_eq!(error.value, "REVIEWED");
        assert!("draft".parse::<CaseStatus>().is_err(), "literals are case-sensitive");
        assert!(serde_json::from_str::<CaseCategory>("\"NFT_LAUNCH\"").is_err());
    }

    #[test]
    fn language_serializes_with_region_casing() {
        assert_eq!(serde_json::to_string(&Language::ZhTw).unwrap(), "\"zh-TW\"");
        assert_eq!(serde_json::from_str::<Language>("\"zh-CN\"").unwrap(), Language::ZhCn);
        assert!(serde_json::from_str::<Language>("\"zh-tw\"").is_err());
    }

    #[test]
    fn lossy_language_falls_back_to_english() {
        assert_eq!(Language::from_code_lossy("zh-TW"), Language::ZhTw);
        assert_eq!(Language::from_code_lossy(" zh-CN "), Language::ZhCn);
        assert_eq!(Language::from_code_lossy("fr"), Language::En);
        assert_eq!(Language::from_code_lossy(""), Language::En);
    }

    #[test]
    fn every_category_maps_to_a_document_type() {
        assert_eq!(
            DocumentType::for_category(CaseCategory::Licensing),
            DocumentType::LicenseApplication
        );
        assert_eq!(
            DocumentType::for_category(CaseCategory::AmlCompliance),
            DocumentType::ComplianceReport
        );
    }

    #[test]
    fn document_serializes_type_and_nested_case() {
        let now = Utc::now();
        let document = Document {
            id: "doc-1".into(),
            title: "Opinion".into(),
            content: "# Opinion".into(),
            doc_type: DocumentType::LegalOpinion,
            status: DocumentStatus::AiGenerated,
            language: Language::En,
            case_id: "case-1".into(),
            template_id: None,
            owner_id: "demo-user".into(),
            created_at: now,
            updated_at: now,
            case_summary: Some(CaseSummary {
                title: "Case".into(),
                category: CaseCategory::Licensing,
                client_name: "Client".into(),
            }),
            template_summary: None,
        };

        let json = serde_json::to_value(&document).unwrap();
        assert_eq!(json["type"], "LEGAL_OPINION");
        assert_eq!(json["caseId"], "case-1");
        assert_eq!(json["case"]["clientName"], "Client");
        assert!(json.get("template").is_none());
    }
}
