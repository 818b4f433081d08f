//! Boundary between the prospectus core and whatever produces spoken or written narration.
//!
//! The core only assembles a [`NarrationRequest`]; generation happens behind the [`Narrator`]
//! trait. [`NarrationService`] bounds every call with a timeout and falls back to a fixed
//! sentence, so narration can never hold up or change visibility.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::personalisation::{FamilyProfile, ModuleContent, ModuleId, Pronouns};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(8);

/// Family details a narrator may weave into its copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FamilyContext {
    pub child_name: String,
    pub pronouns: Pronouns,
    pub entry_point: Option<String>,
    pub interests: Vec<String>,
    pub primary_career: Option<String>,
}

impl FamilyContext {
    pub fn from_profile(profile: &FamilyProfile) -> Self {
        Self {
            child_name: profile.child.first_name.clone(),
            pronouns: profile.child.gender.pronouns(),
            entry_point: Some(profile.entry.point.to_string()),
            interests: profile
                .interests
                .all()
                .into_iter()
                .map(str::to_string)
                .collect(),
            primary_career: profile
                .futures
                .as_ref()
                .and_then(|futures| futures.primary_career())
                .map(str::to_string),
        }
    }

    /// Context for visitors who have not submitted a profile.
    pub fn anonymous() -> Self {
        Self {
            child_name: "your child".to_string(),
            pronouns: crate::personalisation::Gender::Unspecified.pronouns(),
            entry_point: None,
            interests: Vec::new(),
            primary_career: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NarrationRequest {
    pub school_name: String,
    pub module_id: ModuleId,
    pub content: ModuleContent,
    pub context: FamilyContext,
}

impl NarrationRequest {
    /// Plain-text brief handed to text generators.
    pub fn prompt(&self) -> String {
        let mut brief = format!(
            "Narrate the '{}' section of the {} prospectus for the family of {}.",
            self.content.title, self.school_name, self.context.child_name
        );
        if let Some(entry_point) = &self.context.entry_point {
            brief.push_str(&format!(" Entry point: {entry_point}."));
        }
        if !self.context.interests.is_empty() {
            brief.push_str(&format!(" Interests: {}.", self.context.interests.join(", ")));
        }
        if let Some(career) = &self.context.primary_career {
            brief.push_str(&format!(" Career interest: {career}."));
        }
        brief.push_str(&format!(
            " Refer to the child as {}/{}.",
            self.context.pronouns.subject, self.context.pronouns.object
        ));
        for paragraph in &self.content.paragraphs {
            brief.push('\n');
            brief.push_str(paragraph);
        }
        for highlight in &self.content.highlights {
            brief.push_str("\n- ");
            brief.push_str(highlight);
        }
        brief
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NarrationError {
    #[error("narrator unavailable: {0}")]
    Unavailable(String),
    #[error("narrator rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("narrator returned an unusable response: {0}")]
    Malformed(String),
    #[error("narrator did not answer within {0:?}")]
    TimedOut(Duration),
}

#[async_trait]
pub trait Narrator: Send + Sync {
    async fn narrate(&self, request: &NarrationRequest) -> Result<String, NarrationError>;
}

/// Narrator backed by a plain function; handy for tests and offline runs.
pub struct FnNarrator<F> {
    render: F,
}

impl<F> FnNarrator<F>
where
    F: Fn(&NarrationRequest) -> Result<String, NarrationError> + Send + Sync,
{
    pub fn new(render: F) -> Self {
        Self { render }
    }
}

#[async_trait]
impl<F> Narrator for FnNarrator<F>
where
    F: Fn(&NarrationRequest) -> Result<String, NarrationError> + Send + Sync,
{
    async fn narrate(&self, request: &NarrationRequest) -> Result<String, NarrationError> {
        (self.render)(request)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NarrationSource {
    Generated,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Narration {
    pub text: String,
    pub source: NarrationSource,
}

pub fn fallback_narration(title: &str, school_name: &str) -> String {
    format!(
        "Information about {title} at {school_name}. Please see the prospectus for full details."
    )
}

#[derive(Clone)]
pub struct NarrationService {
    narrator: Arc<dyn Narrator>,
    timeout: Duration,
}

impl NarrationService {
    pub fn new(narrator: Arc<dyn Narrator>, timeout: Duration) -> Self {
        Self { narrator, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn narrate(&self, request: &NarrationRequest) -> Narration {
        let outcome = match tokio::time::timeout(self.timeout, self.narrator.narrate(request)).await
        {
            Ok(Ok(text)) if !text.trim().is_empty() => Ok(text),
            Ok(Ok(_)) => Err(NarrationError::Malformed("empty narration".to_string())),
            Ok(Err(err)) => Err(err),
            Err(_) => Err(NarrationError::TimedOut(self.timeout)),
        };

        match outcome {
            Ok(text) => Narration {
                text,
                source: NarrationSource::Generated,
            },
            Err(err) => {
                warn!(
                    module = %request.module_id,
                    school = %request.school_name,
                    error = %err,
                    "narration failed; using fallback text"
                );
                Narration {
                    text: fallback_narration(&request.content.title, &request.school_name),
                    source: NarrationSource::Fallback,
                }
            }
        }
    }
}

impl std::fmt::Debug for NarrationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NarrationService")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
