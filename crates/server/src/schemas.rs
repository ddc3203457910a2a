//! External request/response shapes, decoupled from the persisted entities.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use models::task;

pub const MIN_PROMPT_CHARS: usize = 3;
pub const MAX_PROMPT_CHARS: usize = 1000;
pub const MIN_DIMENSION: i32 = 256;
pub const MAX_DIMENSION: i32 = 1024;
pub const MAX_BATCH_PROMPTS: usize = 10;

fn default_dimension() -> i32 {
    512
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateRequest {
    pub prompt: String,
    #[serde(default = "default_dimension")]
    pub width: i32,
    #[serde(default = "default_dimension")]
    pub height: i32,
    #[serde(default)]
    pub style: Option<String>,
    #[serde(default)]
    pub model_config_id: Option<Uuid>,
}

fn validate_prompt(prompt: &str) -> Result<String, String> {
    let trimmed = prompt.trim();
    let chars = trimmed.chars().count();
    if chars < MIN_PROMPT_CHARS {
        return Err(format!("prompt too short (>= {MIN_PROMPT_CHARS} chars)"));
    }
    if chars > MAX_PROMPT_CHARS {
        return Err(format!("prompt too long (<= {MAX_PROMPT_CHARS} chars)"));
    }
    Ok(trimmed.to_string())
}

fn validate_dimension(name: &str, value: i32) -> Result<(), String> {
    if !(MIN_DIMENSION..=MAX_DIMENSION).contains(&value) {
        return Err(format!("{name} must be in {MIN_DIMENSION}..={MAX_DIMENSION}"));
    }
    Ok(())
}

impl GenerateRequest {
    /// Normalize (trim prompt) and validate; errors become 400 responses.
    pub fn validated(mut self) -> Result<Self, String> {
        self.prompt = validate_prompt(&self.prompt)?;
        validate_dimension("width", self.width)?;
        validate_dimension("height", self.height)?;
        Ok(self)
    }
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub task_id: Uuid,
    pub prompt: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_time: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl GenerateResponse {
    pub fn accepted(t: &task::Model) -> Self {
        Self {
            task_id: t.id,
            prompt: t.prompt.clone(),
            status: t.status.clone(),
            estimated_time: Some(20),
            image_url: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BatchGenerateRequest {
    pub prompts: Vec<String>,
    #[serde(default = "default_dimension")]
    pub width: i32,
    #[serde(default = "default_dimension")]
    pub height: i32,
}

impl BatchGenerateRequest {
    pub fn validated(mut self) -> Result<Self, String> {
        if self.prompts.is_empty() {
            return Err("prompts must not be empty".into());
        }
        if self.prompts.len() > MAX_BATCH_PROMPTS {
            return Err(format!("at most {MAX_BATCH_PROMPTS} prompts per batch"));
        }
        validate_dimension("width", self.width)?;
        validate_dimension("height", self.height)?;
        self.prompts = self
            .prompts
            .iter()
            .map(|p| validate_prompt(p))
            .collect::<Result<_, _>>()?;
        Ok(self)
    }
}

#[derive(Debug, Serialize)]
pub struct BatchGenerateResponse {
    pub total: usize,
    pub tasks: Vec<GenerateResponse>,
}

#[derive(Debug, Serialize)]
pub struct TaskResponse {
    pub id: Uuid,
    pub prompt: String,
    pub status: String,
    pub width: i32,
    pub height: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
}

impl From<task::Model> for TaskResponse {
    fn from(t: task::Model) -> Self {
        Self {
            id: t.id,
            prompt: t.prompt,
            status: t.status,
            width: t.width,
            height: t.height,
            style: t.style,
            image_url: t.image_url,
            error_message: t.error_message,
            created_at: t.created_at,
            updated_at: t.updated_at,
        }
    }
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    20
}

#[derive(Debug, Deserialize)]
pub struct TaskListQuery {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
    /// Admin-only filter; ignored for regular callers.
    #[serde(default)]
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct TaskListResponse {
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub pages: u64,
    pub tasks: Vec<TaskResponse>,
}

impl TaskListResponse {
    pub fn new(total: u64, page: u32, limit: u32, tasks: Vec<TaskResponse>) -> Self {
        let limit = limit.clamp(1, 100);
        let pages = total.div_ceil(limit as u64);
        Self { total, page, limit, pages, tasks }
    }
}

// ---- auth ----

#[derive(Debug, Serialize)]
pub struct RegisterOutput {
    pub user_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct MeOutput {
    pub user_id: Uuid,
    pub email: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiKeyRequest {
    #[serde(default = "default_api_key_label")]
    pub label: String,
}

fn default_api_key_label() -> String {
    "default".into()
}

#[derive(Debug, Serialize)]
pub struct ApiKeyCreated {
    pub id: Uuid,
    /// Plaintext key, returned exactly once.
    pub key: String,
    pub label: String,
}

// ---- model configs ----

#[derive(Debug, Deserialize)]
pub struct ModelConfigInput {
    pub name: String,
    pub api_base_url: String,
    #[serde(default)]
    pub api_key: String,
    pub model: String,
    #[serde(default = "default_dimension")]
    pub default_width: i32,
    #[serde(default = "default_dimension")]
    pub default_height: i32,
    #[serde(default)]
    pub is_active: Option<bool>,
}

/// api_key is write-only: it never appears in responses.
#[derive(Debug, Serialize)]
pub struct ModelConfigResponse {
    pub id: Uuid,
    pub name: String,
    pub api_base_url: String,
    pub model: String,
    pub default_width: i32,
    pub default_height: i32,
    pub is_active: bool,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
}

impl From<models::model_config::Model> for ModelConfigResponse {
    fn from(m: models::model_config::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            api_base_url: m.api_base_url,
            model: m.model,
            default_width: m.default_width,
            default_height: m.default_height,
            is_active: m.is_active,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(prompt: &str) -> GenerateRequest {
        GenerateRequest {
            prompt: prompt.into(),
            width: 512,
            height: 512,
            style: None,
            model_config_id: None,
        }
    }

    #[test]
    fn prompt_is_trimmed() {
        let v = request("  a cat in a garden  ").validated().expect("valid");
        assert_eq!(v.prompt, "a cat in a garden");
    }

    #[test]
    fn short_and_long_prompts_are_rejected() {
        assert!(request("ab").validated().is_err());
        assert!(request("   a   ").validated().is_err());
        let long = "x".repeat(1001);
        assert!(request(&long).validated().is_err());
        let max = "x".repeat(1000);
        assert!(request(&max).validated().is_ok());
    }

    #[test]
    fn dimensions_are_bounded() {
        let mut r = request("a valid prompt");
        r.width = 2000;
        assert!(r.validated().is_err());
        let mut r = request("a valid prompt");
        r.height = 128;
        assert!(r.validated().is_err());
        let mut r = request("a valid prompt");
        r.width = 256;
        r.height = 1024;
        assert!(r.validated().is_ok());
    }

    #[test]
    fn batch_size_is_bounded() {
        let batch = BatchGenerateRequest { prompts: vec![], width: 512, height: 512 };
        assert!(batch.validated().is_err());

        let batch = BatchGenerateRequest {
            prompts: vec!["a cat".into(); 11],
            width: 512,
            height: 512,
        };
        assert!(batch.validated().is_err());

        let batch = BatchGenerateRequest {
            prompts: vec!["  a cat  ".into(), "a dog".into()],
            width: 512,
            height: 512,
        };
        let v = batch.validated().expect("valid");
        assert_eq!(v.prompts[0], "a cat");
    }

    #[test]
    fn list_response_computes_pages() {
        let r = TaskListResponse::new(41, 1, 20, vec![]);
        assert_eq!(r.pages, 3);
        let r = TaskListResponse::new(0, 1, 20, vec![]);
        assert_eq!(r.pages, 0);
        // limit is clamped the same way the query is
        let r = TaskListResponse::new(10, 1, 0, vec![]);
        assert_eq!(r.limit, 1);
    }
}
