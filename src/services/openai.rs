use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::info;

use crate::core::config::Settings;
use crate::services::generation::{GeneratedQuestions, GenerationInputs, QuestionGenerator};
use crate::services::viva::VivaCapability;

const GENERATION_SYSTEM_PROMPT: &str = r#"You are an expert academic examiner. Generate tailored Viva Voce questions for a student based on their specific assignment content.

# Guidelines
- **Context-Specific:** Ensure each question relates directly to the student's submitted assignment.
- **Seed Alignment:** Use the provided seed questions as inspiration.
- **Quantity:** Generate exactly the same number of questions as provided in the seed input.
- **Tone:** Use intermediate spoken language suitable for a verbal assessment.

# Steps
1. Analyze the seed questions for style and scope.
2. Review the assignment content to find relevant arguments or data.
3. Generate questions that explicitly reference the student's work.
4. Output strictly in the JSON format below.

# Output Format
Return ONLY raw JSON.

{
"questions": ["Question 1", "Question 2"],
"reference": ["Reference for Q1", "Reference for Q2"]
}
"#;

const REGENERATION_SYSTEM_PROMPT: &str = r#"You are an expert academic examiner. The user has read the question and made some comments to refine the question.
Regenerate the question based on user feedback.

# Guidelines
- **Incorporate Feedback:** Modify the current question based on the user's comment.
- **Clarity and Relevance:** Ensure the regenerated question is clear and relevant to the assignment context.
- **Tone:** Use intermediate spoken language suitable for a verbal assessment.

# Output Format
Return ONLY raw JSON.

{
"regenerated_question": "Regenerated Question",
"explanation": "Explanation of changes made"
}
"#;

const VIVA_GRADING_SYSTEM_PROMPT: &str = "You are an examiner grading viva answers using only the provided document text. \
Given the viva questions and the student's answers, provide concise feedback grounded in the text and a score out of 10. \
If the text does not support an answer, call that out. \
Output:\n\n\
### FEEDBACK\n\
- Overall score: <int>/10\n\
- Summary: <one short sentence>\n\
- Per question: Q1 <feedback>; Q2 <feedback>; Q3 <feedback>\n\n\
### SOURCES\n\
<one source per line, with text from the document and the specific line it comes from>\n";

const CLARIFY_SYSTEM_PROMPT: &str = "You are a friendly examiner. Clarify the current viva question using the document text. \
Keep it brief and stay focused on what the question is asking.";

#[derive(Debug, Clone)]
pub(crate) struct OpenAiService {
    client: Client,
    api_key: String,
    base_url: String,
    generation_model: String,
    viva_model: String,
    max_tokens: u32,
}

impl OpenAiService {
    pub(crate) fn from_settings(settings: &Settings) -> Result<Self> {
        let timeout = Duration::from_secs(settings.ai().ai_request_timeout);
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            api_key: settings.ai().openai_api_key.clone(),
            base_url: settings.ai().openai_base_url.trim_end_matches('/').to_string(),
            generation_model: settings.ai().generation_model.clone(),
            viva_model: settings.ai().viva_model.clone(),
            max_tokens: settings.ai().ai_max_tokens,
        })
    }

    async fn chat(
        &self,
        model: &str,
        system_prompt: &str,
        user_prompt: &str,
        json_response: bool,
    ) -> Result<String> {
        let mut payload = json!({
            "model": model,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": user_prompt}
            ],
            "max_completion_tokens": self.max_tokens,
        });
        if json_response {
            payload["response_format"] = json!({"type": "json_object"});
        }

        let url = format!("{}/chat/completions", self.base_url);
        let mut last_error = None;
        let mut body = Value::Null;

        for attempt in 0..=3 {
            let response =
                self.client.post(&url).bearer_auth(&self.api_key).json(&payload).send().await;

            match response {
                Ok(resp) => {
                    let status = resp.status();
                    body = resp.json().await.unwrap_or(Value::Null);
                    if status.is_success() {
                        last_error = None;
                        break;
                    }
                    last_error = Some(anyhow::anyhow!("OpenAI API error ({status}): {body}"));
                    // A bad key or malformed request will not get better;
                    // only 429 among the 4xx family is worth waiting out.
                    if !retryable_status(status) {
                        break;
                    }
                }
                Err(err) => {
                    last_error = Some(anyhow::anyhow!(err).context("Failed to call OpenAI API"));
                }
            }

            if attempt < 3 {
                tokio::time::sleep(Duration::from_secs(2_u64.pow(attempt as u32))).await;
            }
        }

        if let Some(err) = last_error {
            metrics::counter!("openai_requests_total", "outcome" => "error").increment(1);
            return Err(err);
        }
        metrics::counter!("openai_requests_total", "outcome" => "ok").increment(1);

        let content = body
            .get("choices")
            .and_then(|choices| choices.get(0))
            .and_then(|choice| choice.get("message"))
            .and_then(|message| message.get("content"))
            .and_then(|value| value.as_str())
            .context("Missing OpenAI response content")?;

        Ok(content.trim().to_string())
    }
}

fn retryable_status(status: reqwest::StatusCode) -> bool {
    status == reqwest::StatusCode::TOO_MANY_REQUESTS || !status.is_client_error()
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl QuestionGenerator for OpenAiService {
    async fn generate(&self, inputs: &GenerationInputs) -> Result<GeneratedQuestions> {
        let user_prompt = format!(
            "CONTEXT:\nAssignment: {}\n\nAssessment brief: {}\n\nRubric: {}\n\nSeed questions:\n{}",
            inputs.submission_text,
            inputs.brief_text,
            inputs.rubric_text,
            inputs.seed_questions_text.as_deref().unwrap_or("(none provided)"),
        );

        info!(student_id = %inputs.student_id, "Requesting question generation");
        let content =
            self.chat(&self.generation_model, GENERATION_SYSTEM_PROMPT, &user_prompt, true).await?;
        let parsed: Value =
            serde_json::from_str(&content).context("Failed to parse generation JSON")?;

        let questions = string_list(parsed.get("questions"));
        let references = string_list(parsed.get("reference"));
        if questions.is_empty() {
            anyhow::bail!("Model returned no questions");
        }

        Ok(GeneratedQuestions { questions, references })
    }

    async fn regenerate(&self, current_question: &str, comment: &str) -> Result<String> {
        let user_prompt =
            format!("CURRENT QUESTION:\n{current_question}\n\nUSER COMMENT:\n{comment}");

        let content = self
            .chat(&self.generation_model, REGENERATION_SYSTEM_PROMPT, &user_prompt, true)
            .await?;
        let parsed: Value =
            serde_json::from_str(&content).context("Failed to parse regeneration JSON")?;

        parsed
            .get("regenerated_question")
            .and_then(Value::as_str)
            .map(str::to_string)
            .context("Model returned no regenerated question")
    }
}

#[async_trait]
impl VivaCapability for OpenAiService {
    async fn clarify(
        &self,
        document_text: &str,
        question: &str,
        user_message: &str,
    ) -> Result<String> {
        let user_prompt = format!(
            "Document:\n{document_text}\n\nCurrent question: {question}\nStudent request: {user_message}"
        );
        self.chat(&self.viva_model, CLARIFY_SYSTEM_PROMPT, &user_prompt, false).await
    }

    async fn grade(
        &self,
        document_text: &str,
        questions: &[String],
        answers: &[String],
    ) -> Result<String> {
        let qa_text = questions
            .iter()
            .zip(answers)
            .enumerate()
            .map(|(i, (question, answer))| {
                format!("Q{n}: {question}\nA{n}: {answer}", n = i + 1)
            })
            .collect::<Vec<_>>()
            .join("\n");
        let user_prompt = format!("Document:\n{document_text}\n\nQuestions and Answers:\n{qa_text}");
        self.chat(&self.viva_model, VIVA_GRADING_SYSTEM_PROMPT, &user_prompt, false).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn client_errors_other_than_rate_limits_are_not_retried() {
        assert!(!retryable_status(StatusCode::BAD_REQUEST));
        assert!(!retryable_status(StatusCode::UNAUTHORIZED));
        assert!(!retryable_status(StatusCode::NOT_FOUND));
        assert!(retryable_status(StatusCode::TOO_MANY_REQUESTS));
    }

    #[test]
    fn server_errors_are_retried() {
        assert!(retryable_status(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(retryable_status(StatusCode::BAD_GATEWAY));
        assert!(retryable_status(StatusCode::SERVICE_UNAVAILABLE));
    }
}
