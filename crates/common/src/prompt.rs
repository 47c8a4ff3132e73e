// Generation request composition.
//
// Builds the system/user instruction pair sent to the text-generation
// capability for drafting and for document Q&A, plus the static document
// returned when interactive drafting cannot reach the capability.

use chrono::NaiveDate;
use thiserror::Error;

use crate::types::{CaseCategory, Language};

/// Role instructions for drafting. A language directive is appended.
pub const DRAFTING_SYSTEM_PROMPT: &str = "\
You are an expert legal assistant specializing in cryptocurrency and blockchain law. \
Your role is to help lawyers draft professional legal documents with precision and accuracy.\n\
\n\
Key responsibilities:\n\
- Draft clear, professional legal documents\n\
- Follow legal writing conventions and formatting\n\
- Include appropriate legal disclaimers\n\
- Ensure compliance with cryptocurrency regulations\n\
- Use proper legal terminology";

/// Role instructions for answering questions about a stored document.
pub const ANALYST_SYSTEM_PROMPT: &str = "\
You are an expert legal analyst specializing in cryptocurrency law. \
Provide clear, accurate analysis of legal documents.";

const DRAFTING_CHECKLIST: &str = "\
Please generate a complete, professional legal document that addresses the requirements above. Include:\n\
1. Proper document title\n\
2. Date and parties (if applicable)\n\
3. Clear sections and subsections\n\
4. Professional legal language\n\
5. Relevant clauses and provisions\n\
6. Appropriate disclaimers\n\
\n\
Format the document in markdown for easy reading and editing.\n";

/// The instruction pair sent to the text-generation capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub system_instructions: String,
    pub user_instructions: String,
}

/// Inputs for drafting a document.
#[derive(Debug, Clone, Copy)]
pub struct DraftInput<'a> {
    pub category: CaseCategory,
    pub template: Option<&'a str>,
    pub user_prompt: &'a str,
    pub additional_context: Option<&'a str>,
    pub client_name: Option<&'a str>,
    /// Raw language code; unsupported codes draft in English.
    pub language: &'a str,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ComposeError {
    #[error("user prompt is required")]
    EmptyUserPrompt,
    #[error("question is required")]
    EmptyQuestion,
}

/// The literal output-language directive for a language.
pub const fn language_directive(language: Language) -> &'static str {
    match language {
        Language::En => "Generate the document in English.",
        Language::ZhTw => "Generate the document in Traditional Chinese (繁體中文).",
        Language::ZhCn => "Generate the document in Simplified Chinese (简体中文).",
    }
}

/// Compose the drafting request.
///
/// Fails only when the user prompt is empty; optional inputs that are
/// empty strings are treated as absent.
pub fn compose_draft_request(input: &DraftInput<'_>) -> Result<GenerationRequest, ComposeError> {
    if input.user_prompt.trim().is_empty() {
        return Err(ComposeError::EmptyUserPrompt);
    }

    let directive = language_directive(Language::from_code_lossy(input.language));
    let system_instructions = format!("{DRAFTING_SYSTEM_PROMPT}\n\n{directive}");

    let mut user = String::from("Please generate a legal document with the following details:\n\n");
    user.push_str(&format!("Case Category: {}\n", input.category));
    if let Some(client_name) = present(input.client_name) {
        user.push_str(&format!("Client Name: {client_name}\n"));
    }
    user.push_str(&format!("\nUser Request: {}\n\n", input.user_prompt));

    if let Some(template) = present(input.template) {
        user.push_str(&format!("Template to follow:\n{template}\n\n"));
    }
    if let Some(context) = present(input.additional_context) {
        user.push_str(&format!("Additional Context:\n{context}\n\n"));
    }

    user.push_str(DRAFTING_CHECKLIST);

    Ok(GenerationRequest { system_instructions, user_instructions: user })
}

/// Compose the single-exchange question request for a stored document.
///
/// The whole document is embedded; no truncation is applied here.
pub fn compose_question_request(
    document_content: &str,
    question: &str,
) -> Result<GenerationRequest, ComposeError> {
    if question.trim().is_empty() {
        return Err(ComposeError::EmptyQuestion);
    }

    Ok(GenerationRequest {
        system_instructions: ANALYST_SYSTEM_PROMPT.to_string(),
        user_instructions: format!(
            "Please analyze the following legal document and answer this question: {question}\n\nDocument:\n{document_content}"
        ),
    })
}

/// Title given to a persisted generated document.
pub fn generated_document_title(category: CaseCategory, date: NaiveDate) -> String {
    format!("{category} - {}", date.format("%Y-%m-%d"))
}

/// Static legal-opinion skeleton substituted when interactive drafting fails.
pub fn fallback_document(
    category: CaseCategory,
    client_name: Option<&str>,
    user_prompt: &str,
    date: NaiveDate,
) -> String {
    let client_name = present(client_name).unwrap_or("N/A");
    let date = date.format("%Y-%m-%d");

    format!(
        "# Legal Opinion - {category}

## Client Information
**Client Name:** {client_name}
**Date:** {date}
**Category:** {category}

## Executive Summary
This legal opinion addresses the following matter: {user_prompt}

## Analysis
Based on current cryptocurrency regulations and compliance requirements, we provide the following analysis:

### Regulatory Framework
The applicable regulatory framework includes...

### Compliance Requirements
Key compliance requirements for this matter include:
1. Know Your Customer (KYC) procedures
2. Anti-Money Laundering (AML) protocols
3. Transaction monitoring systems
4. Regulatory reporting obligations

### Risk Assessment
The following risks have been identified:
- Regulatory compliance risks
- Operational risks
- Legal jurisdiction considerations

## Recommendations
Based on our analysis, we recommend the following actions:
1. Implement robust KYC/AML procedures
2. Establish compliance monitoring systems
3. Maintain regular regulatory reporting
4. Consult with local regulatory authorities

## Conclusion
This opinion is provided based on the information available and current regulatory framework. Ongoing monitoring of regulatory developments is recommended.

---
*This document was generated with AI assistance and should be reviewed by qualified legal counsel.*
"
    )
}

fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input<'a>(language: &'a str) -> DraftInput<'a> {
        DraftInput {
            category: CaseCategory::AmlCompliance,
            template: None,
            user_prompt: "Draft an AML policy opinion",
            additional_context: None,
            client_name: None,
            language,
        }
    }

    fn directive_count(system: &str) -> usize {
        Language::ALL
            .iter()
            .filter(|language| system.contains(language_directive(**language)))
            .count()
    }

    #[test]
    fn traditional_chinese_directive_is_the_only_directive() {
        let request = compose_draft_request(&input("zh-TW")).unwrap();
        assert!(request.system_instructions.contains(language_directive(Language::ZhTw)));
        assert_eq!(directive_count(&request.system_instructions), 1);
    }

    #[test]
    fn unsupported_language_uses_english_directive() {
        let request = compose_draft_request(&input("fr")).unwrap();
        assert!(request.system_instructions.ends_with("Generate the document in English."));
        assert_eq!(directive_count(&request.system_instructions), 1);
    }

    #[test]
    fn system_instructions_fix_the_role() {
        let request = compose_draft_request(&input("en")).unwrap();
        assert!(request.system_instructions.starts_with(DRAFTING_SYSTEM_PROMPT));
    }

    #[test]
    fn empty_prompt_is_rejected() {
        let mut draft = input("en");
        draft.user_prompt = "   ";
        assert_eq!(compose_draft_request(&draft), Err(ComposeError::EmptyUserPrompt));
    }

    #[test]
    fn user_instructions_embed_all_present_inputs() {
        let draft = DraftInput {
            category: CaseCategory::TokenClassification,
            template: Some("# Opinion Template\n## Facts"),
            user_prompt: "Is the XYZ token a security?",
            additional_context: Some("Utility token sold to retail buyers."),
            client_name: Some("XYZ Blockchain Corp"),
            language: "en",
        };

        let user = compose_draft_request(&draft).unwrap().user_instructions;

        assert!(user.contains("Case Category: TOKEN_CLASSIFICATION"));
        assert!(user.contains("Client Name: XYZ Blockchain Corp"));
        assert!(user.contains("User Request: Is the XYZ token a security?"));
        assert!(user.contains("Template to follow:\n# Opinion Template\n## Facts"));
        assert!(user.contains("Additional Context:\nUtility token sold to retail buyers."));
        assert!(user.contains("6. Appropriate disclaimers"));
        assert!(user.ends_with("Format the document in markdown for easy reading and editing.\n"));
    }

    #[test]
    fn absent_inputs_are_omitted() {
        let mut draft = input("en");
        draft.client_name = Some("");
        let user = compose_draft_request(&draft).unwrap().user_instructions;

        assert!(!user.contains("Client Name:"));
        assert!(!user.contains("Template to follow:"));
        assert!(!user.contains("Additional Context:"));
    }

    #[test]
    fn composition_is_deterministic() {
        let first = compose_draft_request(&input("zh-CN")).unwrap();
        let second = compose_draft_request(&input("zh-CN")).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn question_request_embeds_full_document() {
        let content = "# Agreement\n".repeat(500);
        let request = compose_question_request(&content, "Who are the parties?").unwrap();

        assert_eq!(request.system_instructions, ANALYST_SYSTEM_PROMPT);
        assert!(request.user_instructions.contains("answer this question: Who are the parties?"));
        assert!(request.user_instructions.ends_with(&content));
    }

    #[test]
    fn empty_question_is_rejected() {
        assert_eq!(compose_question_request("doc", "\n"), Err(ComposeError::EmptyQuestion));
    }

    #[test]
    fn fallback_document_fills_in_request_details() {
        let date = NaiveDate::from_ymd_opt(2024, 12, 10).unwrap();
        let document =
            fallback_document(CaseCategory::Licensing, None, "Apply for a VASP license", date);

        assert!(document.starts_with("# Legal Opinion - LICENSING\n"));
        assert!(document.contains("**Client Name:** N/A"));
        assert!(document.contains("**Date:** 2024-12-10"));
        assert!(document.contains("following matter: Apply for a VASP license"));
    }

    #[test]
    fn generated_title_uses_category_and_date() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();
        assert_eq!(
            generated_document_title(CaseCategory::IcoLegalOpinion, date),
            "ICO_LEGAL_OPINION - 2025-01-02"
        );
    }
}
