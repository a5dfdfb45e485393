use std::sync::Arc;

use serde::Serialize;

use crate::DomainResult;
use crate::error::DomainError;
use crate::ports::research::{ResearchPrompt, ThreatResearch};

const SCAM_ANALYST_ROLE: &str = "You are a cybersecurity expert specializing in crypto scam detection. \
Analyze content for deepfake giveaway scams, fake airdrops, and crypto fraud. \
Provide concise, factual analysis with risk scores.";
const WALLET_ANALYST_ROLE: &str = "You are a blockchain forensics expert. Research wallet addresses \
for scam activity and provide factual, evidence-based assessments.";
const FACT_CHECKER_ROLE: &str = "You are a fact-checker specializing in crypto scam detection. \
Verify celebrity endorsement claims using reputable sources only.";
const TEXT_ANALYST_ROLE: &str = "You are an NLP expert specializing in scam detection. \
Identify manipulation tactics and fraud patterns in text.";

const MAX_FIELD_LENGTH: usize = 10_000;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResearchQuery {
    AnalyzeUrl {
        url: String,
        description: Option<String>,
        additional_context: Option<String>,
    },
    Wallet {
        address: String,
    },
    Endorsement {
        celebrity_name: String,
        crypto_project: String,
        claim: Option<String>,
    },
    Text {
        text: String,
    },
}

impl ResearchQuery {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AnalyzeUrl { .. } => "analyze_url",
            Self::Wallet { .. } => "wallet",
            Self::Endorsement { .. } => "endorsement",
            Self::Text { .. } => "text",
        }
    }

    fn validate(&self) -> DomainResult<()> {
        let required: Vec<(&str, &str)> = match self {
            Self::AnalyzeUrl { url, .. } => vec![("url", url.as_str())],
            Self::Wallet { address } => vec![("address", address.as_str())],
            Self::Endorsement {
                celebrity_name,
                crypto_project,
                ..
            } => vec![
                ("celebrity_name", celebrity_name.as_str()),
                ("crypto_project", crypto_project.as_str()),
            ],
            Self::Text { text } => vec![("text", text.as_str())],
        };
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(DomainError::Validation(format!("{field} is required")));
            }
            if value.len() > MAX_FIELD_LENGTH {
                return Err(DomainError::Validation(format!("{field} is too long")));
            }
        }
        Ok(())
    }

    pub fn prompt(&self) -> ResearchPrompt {
        match self {
            Self::AnalyzeUrl {
                url,
                description,
                additional_context,
            } => {
                let mut user = format!("Analyze this URL for crypto scam indicators:\n\nURL: {url}");
                if let Some(description) = description.as_deref().filter(|value| !value.is_empty())
                {
                    user.push_str(&format!("\n\nDescription/Content: {description}"));
                }
                if let Some(context) = additional_context
                    .as_deref()
                    .filter(|value| !value.is_empty())
                {
                    user.push_str(&format!("\n\nAdditional Context: {context}"));
                }
                user.push_str(
                    "\n\nSearch for:\n\
1. Known scam reports or warnings about this URL\n\
2. Domain registration age and history\n\
3. Similar scam patterns or phishing attempts\n\
4. Celebrity impersonation or deepfake usage\n\
5. Fake giveaway or airdrop claims\n\
6. Reports from scam databases or security researchers\n\n\
Provide:\n\
- Risk level (low/medium/high)\n\
- Key red flags identified\n\
- Evidence from web sources\n\
- Recommended action (safe/caution/block)",
                );
                ResearchPrompt {
                    system: SCAM_ANALYST_ROLE.to_string(),
                    user,
                }
            }
            Self::Wallet { address } => ResearchPrompt {
                system: WALLET_ANALYST_ROLE.to_string(),
                user: format!(
                    "Research this cryptocurrency wallet address for scam history and reputation:\n\n\
Address: {address}\n\n\
Search for:\n\
1. Known scam reports or warnings\n\
2. Transaction patterns indicating fraud\n\
3. Association with crypto giveaway scams\n\
4. Reports on blockchain explorers or scam databases\n\n\
Provide a concise summary of findings and risk level (low/medium/high)."
                ),
            },
            Self::Endorsement {
                celebrity_name,
                crypto_project,
                claim,
            } => {
                let claim_text = claim
                    .as_deref()
                    .filter(|value| !value.is_empty())
                    .map(|value| format!(" Specific claim: {value}"))
                    .unwrap_or_default();
                ResearchPrompt {
                    system: FACT_CHECKER_ROLE.to_string(),
                    user: format!(
                        "Verify this celebrity endorsement claim:\n\n\
Celebrity: {celebrity_name}\n\
Crypto Project: {crypto_project}{claim_text}\n\n\
Search for:\n\
1. Official announcements or statements from the celebrity\n\
2. Verified social media posts\n\
3. News articles from reputable sources\n\
4. Scam warnings about fake endorsements\n\n\
Determine if this is likely legitimate, fake, or uncertain. Cite sources."
                    ),
                }
            }
            Self::Text { text } => ResearchPrompt {
                system: TEXT_ANALYST_ROLE.to_string(),
                user: format!(
                    "Analyze this text for crypto scam indicators:\n\n\
Text: {text}\n\n\
Identify:\n\
1. Urgency tactics (limited time, act now, etc.)\n\
2. Promises of guaranteed returns or free crypto\n\
3. Impersonation language\n\
4. Giveaway/airdrop claims\n\
5. Request for wallet addresses or private keys\n\
6. Suspicious links or instructions\n\n\
Rate the scam risk as low/medium/high and explain key red flags."
                ),
            },
        }
    }

    fn subject(&self) -> ResearchSubject {
        match self {
            Self::AnalyzeUrl { url, .. } => ResearchSubject::Url { url: url.clone() },
            Self::Wallet { address } => ResearchSubject::Wallet {
                address: address.clone(),
            },
            Self::Endorsement {
                celebrity_name,
                crypto_project,
                ..
            } => ResearchSubject::Endorsement {
                celebrity: celebrity_name.clone(),
                project: crypto_project.clone(),
            },
            Self::Text { text } => ResearchSubject::Text {
                text_length: text.chars().count(),
            },
        }
    }
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ResearchSubject {
    Url { url: String },
    Wallet { address: String },
    Endorsement { celebrity: String, project: String },
    Text { text_length: usize },
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct ResearchReport {
    pub success: bool,
    pub analysis: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(flatten)]
    pub subject: ResearchSubject,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Front for the optional LLM research backend.
#[derive(Clone, Default)]
pub struct ResearchService {
    backend: Option<Arc<dyn ThreatResearch>>,
}

impl ResearchService {
    pub fn new(backend: Option<Arc<dyn ThreatResearch>>) -> Self {
        Self { backend }
    }

    pub fn is_configured(&self) -> bool {
        self.backend.is_some()
    }

    /// Errors only for invalid input or a missing backend. Backend failures
    /// come back as a report with `success = false`.
    pub async fn run(&self, query: ResearchQuery) -> DomainResult<ResearchReport> {
        let backend = self.backend.as_ref().ok_or_else(|| {
            DomainError::Unavailable(
                "research service not configured; set RESEARCH_API_KEY".into(),
            )
        })?;
        query.validate()?;

        let subject = query.subject();
        match backend.complete(&query.prompt()).await {
            Ok(completion) => Ok(ResearchReport {
                success: true,
                analysis: Some(completion.content),
                model: Some(completion.model),
                subject,
                error: None,
            }),
            Err(err) => {
                tracing::error!(kind = query.kind(), error = %err, "research request failed");
                Ok(ResearchReport {
                    success: false,
                    analysis: None,
                    model: None,
                    subject,
                    error: Some(err.to_string()),
                })
            }
        }
    }
}
