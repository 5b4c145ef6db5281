//! Linguistic Dispatcher (C6)
//!
//! Computes the linguistic register from phase and retention, assembles a
//! prompt, and routes it to an external text-completion collaborator
//! through the [`LinguisticClient`] trait. Never raises: any collaborator
//! failure — network, quota, timeout — falls through to a deterministic
//! band-keyed template.

use rand::Rng;

use crate::model::{ConfidenceBand, Phase};

/// Linguistic register, selected deterministically from phase + retention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Register {
    /// `R < 0.30`: vague, no specifics.
    GistOnly,
    /// `phase = Slow` or `R < 0.40`: hedged, speculative.
    Reconstructive,
    /// Otherwise: precise, certain.
    DirectRecall,
}

impl Register {
    pub fn style_guide(self) -> &'static str {
        match self {
            Register::GistOnly => {
                "Use gist-only language. Do not provide specific details. Sound vague and focus only on the general idea."
            }
            Register::Reconstructive => {
                "Use reconstructive language. Sound uncertain and speculative. Use fillers like 'I think', 'maybe', 'if I recall correctly'."
            }
            Register::DirectRecall => {
                "Use direct recall language. Sound clear, precise, and certain about the facts."
            }
        }
    }
}

/// Select a linguistic register: gist below the reconstruction threshold,
/// reconstructive in the slow phase or below the transition threshold,
/// direct recall otherwise.
pub fn select_register(phase: Phase, retention: f64) -> Register {
    if retention < 0.30 {
        Register::GistOnly
    } else if phase == Phase::Slow || retention < 0.40 {
        Register::Reconstructive
    } else {
        Register::DirectRecall
    }
}

/// Assemble the prompt sent to the external collaborator. The agent is
/// instructed never to reveal the numeric retention/confidence, and to keep
/// the response to one or two sentences.
pub fn build_prompt(base_memory: &str, confidence_band: ConfidenceBand, phase: Phase, retention: f64) -> String {
    let register = select_register(phase, retention);
    let retention_pct = retention.min(1.0) * 100.0;

    format!(
        "You are an AI NPC in a high-fidelity simulation.\n\
         Your current cognitive state is:\n\
         - Memory Retention: {retention_pct:.1}%\n\
         - Confidence Level: {confidence_band}\n\
         - Decay Phase: {phase}\n\n\
         Style Guide: {style}\n\n\
         Memory to recall: \"{base_memory}\"\n\n\
         Response requirements:\n\
         1. Stay in character as a futuristic NPC.\n\
         2. Do NOT mention your retention percentage or confidence level explicitly in the spoken text.\n\
         3. Reflect the required linguistic style perfectly based on the Style Guide.\n\
         4. Keep the response concise (1-2 sentences).\n\n\
         NPC Response:",
        style = register.style_guide(),
    )
}

#[derive(Debug, thiserror::Error)]
pub enum LinguisticError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("quota exceeded")]
    QuotaExceeded,
    #[error("no credential configured")]
    NoCredential,
}

/// Contract with the external text-completion collaborator.
#[async_trait::async_trait]
pub trait LinguisticClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, LinguisticError>;
}

/// Candidate Gemini models, tried in order; a quota-class response stops the
/// walk early rather than exhausting the whole list.
pub const CANDIDATE_MODELS: &[&str] = &[
    "gemini-1.5-flash",
    "gemini-1.5-flash-latest",
    "gemini-1.5-flash-lite-latest",
    "gemini-2.0-flash-lite",
    "gemini-2.0-flash",
];

/// Calls Google's Generative Language API directly over HTTP, mirroring the
/// model-candidate walk and 429 early-exit.
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
        }
    }

    fn endpoint(&self, model: &str) -> String {
        format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{model}:generateContent?key={}",
            self.api_key
        )
    }
}

#[async_trait::async_trait]
impl LinguisticClient for GeminiClient {
    async fn complete(&self, prompt: &str) -> Result<String, LinguisticError> {
        let body = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        for model in CANDIDATE_MODELS {
            let response = self.http.post(self.endpoint(model)).json(&body).send().await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    if e.status() == Some(reqwest::StatusCode::TOO_MANY_REQUESTS) {
                        return Err(LinguisticError::QuotaExceeded);
                    }
                    continue;
                }
            };

            if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
                return Err(LinguisticError::QuotaExceeded);
            }
            if !response.status().is_success() {
                continue;
            }

            let parsed: serde_json::Value = match response.json().await {
                Ok(v) => v,
                Err(_) => continue,
            };

            if let Some(text) = parsed["candidates"][0]["content"]["parts"][0]["text"].as_str() {
                return Ok(text.trim().replace('"', ""));
            }
        }

        Err(LinguisticError::Request("all candidate models failed".to_string()))
    }
}

/// Always errors, forcing fallback-only mode — used when no credential is
/// configured.
pub struct NullClient;

#[async_trait::async_trait]
impl LinguisticClient for NullClient {
    async fn complete(&self, _prompt: &str) -> Result<String, LinguisticError> {
        Err(LinguisticError::NoCredential)
    }
}

fn fallback_templates(band: ConfidenceBand, base_memory: &str) -> Vec<String> {
    match band {
        ConfidenceBand::High => vec![
            format!("The data for {base_memory} is perfectly synced. I can confirm all parameters are nominal."),
            format!("Accessing archived record: {base_memory}. Integrity is 100%. What do you need to know?"),
            format!("My primary memory core has {base_memory} fully cached and ready for retrieval."),
        ],
        ConfidenceBand::Medium => vec![
            format!("Scanning neural pathways... {base_memory} is present, but I'm detecting minor trace interference."),
            format!("I recall the general framework of {base_memory}, though some specific nodes are currently obscured."),
            format!("Uplink unstable, but {base_memory} seems to be part of my recent task sequence."),
        ],
        ConfidenceBand::Low => vec![
            format!("The record for {base_memory} is highly fragmented. I... I can't quite see the full picture."),
            format!("Neural unbinding detected. {base_memory} is fading into my deep archives. It feels distant."),
            format!("Warning: data corruption in sector seven. {base_memory} is missing critical metadata."),
        ],
        ConfidenceBand::VeryLow => vec![
            format!("I'm searching... but there's only noise where {base_memory} should be. It's almost gone."),
            format!("The memory of {base_memory} has lost its anchor. I can only retrieve ghost signals."),
            format!("Everything is shifting. {base_memory}? I... I don't think I have that anymore."),
        ],
        ConfidenceBand::Confused => vec![
            format!("Who... what was {base_memory}? My cognitive sync is failing."),
            format!("Error: null reference. {base_memory} is no longer part of my active consciousness."),
            format!("I am in standby mode. Memory for {base_memory} is indistinguishable from noise."),
        ],
    }
}

/// Draw a fallback utterance from the band-keyed template table.
pub fn fallback(base_memory: &str, band: ConfidenceBand, rng: &mut impl Rng) -> String {
    let templates = fallback_templates(band, base_memory);
    let idx = rng.gen_range(0..templates.len());
    templates[idx].clone()
}

/// Produce an in-character utterance: try the collaborator, fall back to a
/// template on any error. Never returns an `Err`.
pub async fn utter(
    client: &dyn LinguisticClient,
    base_memory: &str,
    confidence_band: ConfidenceBand,
    phase: Phase,
    retention: f64,
    rng: &mut impl Rng,
) -> String {
    let prompt = build_prompt(base_memory, confidence_band, phase, retention);
    match client.complete(&prompt).await {
        Ok(text) => text,
        Err(_) => fallback(base_memory, confidence_band, rng),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn register_selection_respects_threshold_boundaries() {
        assert_eq!(select_register(Phase::Fast, 0.29), Register::GistOnly);
        assert_eq!(select_register(Phase::Fast, 0.35), Register::Reconstructive);
        assert_eq!(select_register(Phase::Slow, 0.80), Register::Reconstructive);
        assert_eq!(select_register(Phase::Fast, 0.80), Register::DirectRecall);
    }

    #[test]
    fn prompt_never_reveals_numeric_retention() {
        let prompt = build_prompt("a secret event", ConfidenceBand::High, Phase::Fast, 0.9);
        assert!(prompt.contains("Do NOT mention"));
        assert!(prompt.contains("a secret event"));
    }

    #[tokio::test]
    async fn null_client_always_falls_through_to_template() {
        let mut rng = StdRng::seed_from_u64(7);
        let text = utter(&NullClient, "the signal", ConfidenceBand::Confused, Phase::Slow, 0.1, &mut rng).await;
        assert!(text.contains("the signal"));
    }

    #[test]
    fn fallback_is_deterministic_given_a_seeded_rng() {
        let mut rng = StdRng::seed_from_u64(1);
        let a = fallback("x", ConfidenceBand::Low, &mut rng);
        let mut rng2 = StdRng::seed_from_u64(1);
        let b = fallback("x", ConfidenceBand::Low, &mut rng2);
        assert_eq!(a, b);
    }

    #[test]
    fn every_band_has_a_template_table() {
        for band in [
            ConfidenceBand::High,
            ConfidenceBand::Medium,
            ConfidenceBand::Low,
            ConfidenceBand::VeryLow,
            ConfidenceBand::Confused,
        ] {
            assert_eq!(fallback_templates(band, "m").len(), 3);
        }
    }
}
