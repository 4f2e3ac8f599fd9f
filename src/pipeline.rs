//! Pipeline lifecycle client for the orchestration service.
//!
//! Three remote operations: existence check, clone (fetch template, inject
//! credential and branch, create) and destroy. No local retry; calls are
//! sequential and not transactional relative to each other.

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{HandlerError, Result};

/// Configuration key for the source-control credential in the source action.
pub const OAUTH_TOKEN_KEY: &str = "OAuthToken";

/// Configuration key for the tracked branch in the source action.
pub const BRANCH_KEY: &str = "Branch";

/// A pipeline as the orchestration service declares it. Role, artifact store
/// and stages are copied structurally on clone; the artifact store is carried
/// as raw JSON since this service never looks inside it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDeclaration {
    pub name: String,
    pub role_arn: String,
    pub artifact_store: serde_json::Value,
    pub stages: Vec<Stage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stage {
    pub name: String,
    #[serde(default)]
    pub actions: Vec<StageAction>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageAction {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration: Option<BTreeMap<String, String>>,
}

/// HTTP client for the pipeline orchestration API.
#[derive(Debug, Clone)]
pub struct PipelineClient {
    base_url: String,
    client: Client,
}

impl PipelineClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch a pipeline declaration by name. A 404 is a clean "absent";
    /// any other failure propagates so that transport or permission problems
    /// are never mistaken for a missing pipeline.
    async fn get_declaration(&self, name: &str) -> Result<Option<PipelineDeclaration>> {
        let url = format!("{}/api/pipelines/{}", self.base_url, name);
        let response = self.client.get(&url).send().await.map_err(|e| {
            HandlerError::LookupFailed(format!("request for pipeline '{}' failed: {}", name, e))
        })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(HandlerError::LookupFailed(format!(
                "lookup of pipeline '{}' returned status {}: {}",
                name,
                status.as_u16(),
                body
            )));
        }

        let declaration = response.json().await.map_err(|e| {
            HandlerError::LookupFailed(format!(
                "could not decode declaration of pipeline '{}': {}",
                name, e
            ))
        })?;
        Ok(Some(declaration))
    }

    /// Whether a pipeline with the given name currently exists.
    pub async fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.get_declaration(name).await?.is_some())
    }

    /// Clone the source pipeline into `target`, wiring its source action to
    /// `branch` and authorizing it with `oauth_token`.
    pub async fn clone_from_template(
        &self,
        source: &str,
        target: &str,
        branch: &str,
        oauth_token: &str,
    ) -> Result<()> {
        let template = self
            .get_declaration(source)
            .await?
            .ok_or_else(|| HandlerError::SourcePipelineNotFound(source.to_string()))?;

        let declaration = build_clone_declaration(template, target, branch, oauth_token)?;

        let url = format!("{}/api/pipelines", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&declaration)
            .send()
            .await
            .map_err(|e| {
                HandlerError::CreateFailed(format!(
                    "create request for pipeline '{}' failed: {}",
                    target, e
                ))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(HandlerError::CreateFailed(format!(
                "service returned status {} for pipeline '{}': {}",
                status.as_u16(),
                target,
                body
            )));
        }
        Ok(())
    }

    /// Delete a pipeline by name.
    pub async fn destroy(&self, name: &str) -> Result<()> {
        let url = format!("{}/api/pipelines/{}", self.base_url, name);
        let response = self.client.delete(&url).send().await.map_err(|e| {
            HandlerError::DeleteFailed(format!(
                "delete request for pipeline '{}' failed: {}",
                name, e
            ))
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(HandlerError::DeleteFailed(format!(
                "service returned status {} for pipeline '{}': {}",
                status.as_u16(),
                name,
                body
            )));
        }
        Ok(())
    }
}

/// Build the declaration for a PR pipeline from its template.
///
/// The template contract is explicit: the first action of the first stage
/// must carry a configuration map, into which the credential and branch are
/// injected. A template that does not match fails with a diagnostic naming
/// what was missing instead of an out-of-range fault.
pub fn build_clone_declaration(
    template: PipelineDeclaration,
    target: &str,
    branch: &str,
    oauth_token: &str,
) -> Result<PipelineDeclaration> {
    let mut declaration = PipelineDeclaration {
        name: target.to_string(),
        role_arn: template.role_arn,
        artifact_store: template.artifact_store,
        stages: template.stages,
    };

    let stage = declaration
        .stages
        .first_mut()
        .ok_or_else(|| HandlerError::MalformedTemplate("template has no stages".to_string()))?;
    let stage_name = stage.name.clone();

    let action = stage.actions.first_mut().ok_or_else(|| {
        HandlerError::MalformedTemplate(format!("first stage '{}' has no actions", stage_name))
    })?;
    let action_name = action.name.clone();

    let configuration = action.configuration.as_mut().ok_or_else(|| {
        HandlerError::MalformedTemplate(format!(
            "source action '{}' has no configuration map",
            action_name
        ))
    })?;

    configuration.insert(OAUTH_TOKEN_KEY.to_string(), oauth_token.to_string());
    configuration.insert(BRANCH_KEY.to_string(), branch.to_string());

    Ok(declaration)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn template() -> PipelineDeclaration {
        serde_json::from_value(json!({
            "name": "web-app",
            "role_arn": "arn:aws:iam::123456789012:role/pipeline",
            "artifact_store": {"type": "S3", "location": "build-artifacts"},
            "stages": [
                {
                    "name": "Source",
                    "actions": [
                        {
                            "name": "GitHub",
                            "configuration": {
                                "Owner": "acme",
                                "Repo": "web",
                                "Branch": "main"
                            }
                        }
                    ]
                },
                {
                    "name": "Build",
                    "actions": [{"name": "Compile"}]
                }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn client_trims_trailing_slash() {
        let client = PipelineClient::new("http://localhost:9000/");
        assert_eq!(client.base_url(), "http://localhost:9000");
    }

    #[test]
    fn clone_injects_token_and_branch() {
        let declaration =
            build_clone_declaration(template(), "pr-42", "feature-x", "s3cr3t").unwrap();
        assert_eq!(declaration.name, "pr-42");
        assert_eq!(
            declaration.role_arn,
            "arn:aws:iam::123456789012:role/pipeline"
        );

        let configuration = declaration.stages[0].actions[0]
            .configuration
            .as_ref()
            .unwrap();
        assert_eq!(configuration.get(OAUTH_TOKEN_KEY).unwrap(), "s3cr3t");
        assert_eq!(configuration.get(BRANCH_KEY).unwrap(), "feature-x");
        // Unrelated configuration survives the copy.
        assert_eq!(configuration.get("Owner").unwrap(), "acme");
    }

    #[test]
    fn clone_preserves_later_stages() {
        let declaration =
            build_clone_declaration(template(), "pr-42", "feature-x", "s3cr3t").unwrap();
        assert_eq!(declaration.stages.len(), 2);
        assert_eq!(declaration.stages[1].name, "Build");
    }

    #[test]
    fn template_without_stages_is_rejected() {
        let mut bare = template();
        bare.stages.clear();
        let err = build_clone_declaration(bare, "pr-1", "main", "tok").unwrap_err();
        assert!(matches!(err, HandlerError::MalformedTemplate(_)));
        assert!(err.to_string().contains("no stages"));
    }

    #[test]
    fn stage_without_actions_is_rejected() {
        let mut bare = template();
        bare.stages[0].actions.clear();
        let err = build_clone_declaration(bare, "pr-1", "main", "tok").unwrap_err();
        assert!(err.to_string().contains("'Source' has no actions"));
    }

    #[test]
    fn action_without_configuration_is_rejected() {
        let mut bare = template();
        bare.stages[0].actions[0].configuration = None;
        let err = build_clone_declaration(bare, "pr-1", "main", "tok").unwrap_err();
        assert!(err.to_string().contains("no configuration map"));
    }
}
