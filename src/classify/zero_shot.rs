//! Zero-shot classification over HTTP.
//!
//! Talks to an inference endpoint with the Hugging Face zero-shot request
//! shape:
//!
//! ```json
//! {"inputs": "text", "parameters": {"candidate_labels": ["a", "b"]}}
//! ```
//!
//! Both response shapes the API has used are accepted: parallel
//! `labels`/`scores` arrays, or a list of `{label, score}` objects.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::ClassifierConfig;
use crate::error_handling::ClassificationError;

use super::{Classification, Classifier};

#[derive(Serialize)]
struct Request<'a> {
    inputs: &'a str,
    parameters: Parameters<'a>,
}

#[derive(Serialize)]
struct Parameters<'a> {
    candidate_labels: &'a [String],
}

#[derive(Deserialize)]
struct LabelScore {
    label: String,
    score: f64,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Response {
    Parallel { labels: Vec<String>, scores: Vec<f64> },
    Pairs(Vec<LabelScore>),
}

/// Classifier backed by a remote zero-shot model.
pub struct ZeroShotClassifier {
    client: reqwest::Client,
    endpoint: String,
    api_token: Option<String>,
}

impl ZeroShotClassifier {
    pub fn new(client: reqwest::Client, config: &ClassifierConfig) -> Self {
        ZeroShotClassifier {
            client,
            endpoint: config.endpoint.clone(),
            api_token: config.api_token.clone(),
        }
    }
}

#[async_trait]
impl Classifier for ZeroShotClassifier {
    async fn classify(
        &self,
        text: &str,
        labels: &[String],
    ) -> Result<Classification, ClassificationError> {
        if labels.is_empty() {
            return Err(ClassificationError::NoLabels);
        }

        let mut request = self.client.post(&self.endpoint).json(&Request {
            inputs: text,
            parameters: Parameters {
                candidate_labels: labels,
            },
        });
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ClassificationError::Status {
                status: status.as_u16(),
                body,
            });
        }
        best_label(&body, labels)
    }
}

/// Parses a zero-shot response and picks the highest-scoring candidate label.
fn best_label(body: &str, labels: &[String]) -> Result<Classification, ClassificationError> {
    let parsed: Response = serde_json::from_str(body)
        .map_err(|e| ClassificationError::MalformedResponse(e.to_string()))?;

    let pairs: Vec<(String, f64)> = match parsed {
        Response::Parallel { labels, scores } => {
            if labels.len() != scores.len() {
                return Err(ClassificationError::MalformedResponse(format!(
                    "{} labels but {} scores",
                    labels.len(),
                    scores.len()
                )));
            }
            labels.into_iter().zip(scores).collect()
        }
        Response::Pairs(pairs) => pairs.into_iter().map(|p| (p.label, p.score)).collect(),
    };

    let (label, score) = pairs
        .into_iter()
        .filter(|(_, score)| score.is_finite())
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .ok_or_else(|| ClassificationError::MalformedResponse("no scored labels".into()))?;

    if !labels.contains(&label) {
        return Err(ClassificationError::MalformedResponse(format!(
            "label '{label}' is not a candidate"
        )));
    }
    if !(0.0..=1.0).contains(&score) {
        return Err(ClassificationError::MalformedResponse(format!(
            "score {score} outside 0..=1"
        )));
    }

    Ok(Classification {
        category: label.clone(),
        raw_label: label,
        confidence: score,
    })
}
