use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::{Application, Status};

/// Shown when no credential is configured. Not an error state.
pub const DISABLED_MESSAGE: &str =
    "AI features are disabled. Configure an API key with GEMINI_API_KEY or 'apptrack summary --set-key'.";
const EMPTY_MESSAGE: &str = "No application data to summarize. Add some applications first!";

pub trait AiProvider {
    fn complete(&self, prompt: &str) -> Result<String>;
}

/// Generate a short coaching summary of the collection. Only company,
/// position, applied date, and status leave the machine; notes and links
/// never do.
pub fn generate_summary(provider: &dyn AiProvider, apps: &[Application]) -> Result<String> {
    if apps.is_empty() {
        return Ok(EMPTY_MESSAGE.to_string());
    }
    let prompt = build_prompt(apps)?;
    provider.complete(&prompt)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SummaryRecord<'a> {
    company: &'a str,
    position: &'a str,
    applied_date: NaiveDate,
    status: Status,
}

fn build_prompt(apps: &[Application]) -> Result<String> {
    let simplified: Vec<SummaryRecord> = apps
        .iter()
        .map(|app| SummaryRecord {
            company: &app.company,
            position: &app.position,
            applied_date: app.applied_date,
            status: app.status,
        })
        .collect();
    let data = serde_json::to_string(&simplified).context("failed to serialize applications")?;

    Ok(format!(
        "You are an expert career coach assistant. Analyze the following list of job applications \
         and provide a concise, encouraging, and insightful summary for the user.\n\
         The summary should be 2-4 sentences long.\n\
         - Start with a positive and encouraging tone.\n\
         - Mention the total number of applications.\n\
         - Highlight key stats like the number of interviews or offers, if any.\n\
         - If there are many applications with no response, suggest following up.\n\
         - End with a motivational sentence.\n\n\
         Here is the job application data in JSON format:\n{data}"
    ))
}

// --- Gemini provider ---

const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const GEMINI_MODEL: &str = "gemini-2.5-flash";

#[derive(Debug, Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GeminiResponseContent {
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: GeminiResponseContent,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    candidates: Vec<GeminiCandidate>,
}

pub struct GeminiProvider {
    api_key: String,
    client: reqwest::blocking::Client,
}

impl GeminiProvider {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            client: reqwest::blocking::Client::new(),
        }
    }
}

impl AiProvider for GeminiProvider {
    fn complete(&self, prompt: &str) -> Result<String> {
        let request = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: prompt.to_string(),
                }],
            }],
        };

        let response = self
            .client
            .post(format!("{GEMINI_API_URL}/{GEMINI_MODEL}:generateContent"))
            .query(&[("key", self.api_key.as_str())])
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .context("Failed to send request to Gemini API")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().unwrap_or_default();
            return Err(anyhow!(
                "Gemini API request failed with status {}: {}",
                status,
                error_text
            ));
        }

        let api_response: GeminiResponse = response
            .json()
            .context("Failed to parse Gemini API response")?;

        api_response
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|part| part.text.trim().to_string())
            .ok_or_else(|| anyhow!("No content in Gemini API response"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoProvider;

    impl AiProvider for EchoProvider {
        fn complete(&self, prompt: &str) -> Result<String> {
            Ok(prompt.to_string())
        }
    }

    fn app(company: &str, notes: Option<&str>) -> Application {
        Application {
            id: "1".to_string(),
            company: company.to_string(),
            position: "Engineer".to_string(),
            applied_date: "2024-01-01".parse().unwrap(),
            status: Status::Applied,
            source: None,
            job_link: Some("https://secret.example/req/42".to_string()),
            notes: notes.map(str::to_string),
            reminder_date: None,
            reminder_note: None,
        }
    }

    #[test]
    fn test_empty_collection_has_fixed_message() {
        let summary = generate_summary(&EchoProvider, &[]).unwrap();
        assert_eq!(summary, EMPTY_MESSAGE);
    }

    #[test]
    fn test_prompt_includes_only_reduced_fields() {
        let apps = vec![app("Acme", Some("salary expectations: high"))];
        let prompt = generate_summary(&EchoProvider, &apps).unwrap();
        assert!(prompt.contains("\"company\":\"Acme\""));
        assert!(prompt.contains("\"appliedDate\":\"2024-01-01\""));
        // Notes and links are deliberately withheld.
        assert!(!prompt.contains("salary expectations"));
        assert!(!prompt.contains("secret.example"));
    }
}
