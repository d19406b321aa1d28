//! Deepwoken build planner integration.
//!
//! This module provides functions for interacting with the deepwoken.co
//! planner API to retrieve shared builds by id.

use crate::error::{DeepdexError, Result};
use serde::Deserialize;
use url::Url;

/// Marker every shared builder link contains.
pub const BUILDER_LINK_MARKER: &str = "https://deepwoken.co/builder?id=";

/// A shared build fetched from the planner.
#[derive(Debug, Clone)]
pub struct Build {
    pub id: String,
    pub name: String,
    pub author: String,
    pub power: u32,
    pub traits: Traits,
    /// Talent names exactly as the planner spells them.
    pub talents: Vec<String>,
}

impl Build {
    /// The build's name, falling back to its id for unnamed builds.
    pub fn display_name(&self) -> String {
        if self.name.trim().is_empty() {
            format!("Build {}", self.id)
        } else {
            self.name.clone()
        }
    }

    /// Link back to the planner page for this build.
    pub fn builder_url(&self) -> String {
        format!("{}{}", BUILDER_LINK_MARKER, self.id)
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct Traits {
    #[serde(rename = "Vitality", default)]
    pub vitality: u32,
    #[serde(rename = "Erudition", default)]
    pub erudition: u32,
    #[serde(rename = "Proficiency", default)]
    pub proficiency: u32,
    #[serde(rename = "Songchant", default)]
    pub songchant: u32,
}

#[derive(Deserialize)]
struct ApiEnvelope {
    content: BuildContent,
}

#[derive(Deserialize)]
struct BuildContent {
    stats: BuildStats,
    #[serde(default)]
    talents: Vec<String>,
}

#[derive(Deserialize)]
struct BuildStats {
    #[serde(rename = "buildName", default)]
    build_name: String,
    #[serde(rename = "buildAuthor", default)]
    build_author: String,
    #[serde(default)]
    power: u32,
    #[serde(default)]
    traits: Traits,
}

/// Extract a build id from either a bare id or a full builder link.
///
/// Returns `None` for anything that is neither, including links to other
/// sites and ids with characters the planner never issues.
pub fn extract_build_id(input: &str) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    if let Ok(url) = Url::parse(input) {
        if !url.domain().is_some_and(|d| d.ends_with("deepwoken.co")) {
            return None;
        }
        return url
            .query_pairs()
            .find(|(key, _)| key == "id")
            .map(|(_, value)| value.into_owned())
            .filter(|id| is_plausible_id(id));
    }
    is_plausible_id(input).then(|| input.to_string())
}

/// Find the first builder link inside a message and extract its build id.
pub fn find_build_link(content: &str) -> Option<String> {
    let start = content.find(BUILDER_LINK_MARKER)?;
    let link = content[start..].split_whitespace().next()?;
    extract_build_id(link)
}

fn is_plausible_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Fetch a shared build from the planner API.
///
/// Returns `Some(build)` if the build exists, `None` if the planner does not
/// know the id.
///
/// # Errors
///
/// Returns an error if the request fails or the API returns an unexpected
/// status code.
pub async fn fetch_build(
    client: &reqwest::Client,
    base_url: &str,
    id: &str,
) -> Result<Option<Build>> {
    let url = format!("{}/build?id={}", base_url.trim_end_matches('/'), id);
    let resp = client
        .get(&url)
        .send()
        .await
        .map_err(|e| DeepdexError::Api(format!("Request failed: {}", e)))?;

    if resp.status().is_success() {
        let envelope = resp
            .json::<ApiEnvelope>()
            .await
            .map_err(|e| DeepdexError::Api(format!("Invalid response: {}", e)))?;
        let content = envelope.content;
        Ok(Some(Build {
            id: id.to_string(),
            name: content.stats.build_name,
            author: content.stats.build_author,
            power: content.stats.power,
            traits: content.stats.traits,
            talents: content.talents,
        }))
    } else if resp.status().as_u16() == 404 {
        Ok(None)
    } else {
        Err(DeepdexError::Api(format!(
            "API returned error: {}",
            resp.status()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[test]
    fn test_extract_build_id_accepts_bare_ids_and_links() {
        assert_eq!(extract_build_id("AbC123").as_deref(), Some("AbC123"));
        assert_eq!(extract_build_id("  AbC123  ").as_deref(), Some("AbC123"));
        assert_eq!(
            extract_build_id("https://deepwoken.co/builder?id=AbC123").as_deref(),
            Some("AbC123")
        );
        assert_eq!(
            extract_build_id("https://deepwoken.co/builder?tab=talents&id=AbC123").as_deref(),
            Some("AbC123")
        );
    }

    #[test]
    fn test_extract_build_id_rejects_garbage() {
        assert_eq!(extract_build_id(""), None);
        assert_eq!(extract_build_id("not a build id"), None);
        assert_eq!(extract_build_id("https://example.com/builder?id=AbC123"), None);
        assert_eq!(extract_build_id("https://deepwoken.co/builder"), None);
        assert_eq!(extract_build_id("https://deepwoken.co/builder?id=../../etc"), None);
    }

    #[test]
    fn test_find_build_link_in_message() {
        let content = "check this out https://deepwoken.co/builder?id=AbC123 pretty strong";
        assert_eq!(find_build_link(content).as_deref(), Some("AbC123"));
        assert_eq!(find_build_link("no links here"), None);
    }

    fn build_json() -> &'static str {
        r#"{
            "content": {
                "stats": {
                    "buildName": "Cloudway Duelist",
                    "buildAuthor": "rovaa",
                    "power": 20,
                    "traits": {
                        "Vitality": 5,
                        "Erudition": 0,
                        "Proficiency": 2,
                        "Songchant": 0
                    }
                },
                "talents": ["Exoskeleton", "Ghost", "Conditioned Runner"]
            }
        }"#
    }

    #[tokio::test]
    async fn test_fetch_build_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/build")
            .match_query(Matcher::UrlEncoded("id".into(), "AbC123".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(build_json())
            .create_async()
            .await;

        let client = reqwest::Client::new();
        let build = fetch_build(&client, &server.url(), "AbC123")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(build.name, "Cloudway Duelist");
        assert_eq!(build.author, "rovaa");
        assert_eq!(build.power, 20);
        assert_eq!(build.traits.vitality, 5);
        assert_eq!(build.talents.len(), 3);
        assert_eq!(build.builder_url(), "https://deepwoken.co/builder?id=AbC123");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_build_not_found() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/build")
            .match_query(Matcher::UrlEncoded("id".into(), "missing".into()))
            .with_status(404)
            .create_async()
            .await;

        let client = reqwest::Client::new();
        let build = fetch_build(&client, &server.url(), "missing").await.unwrap();
        assert!(build.is_none());
    }

    #[tokio::test]
    async fn test_fetch_build_server_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/build")
            .match_query(Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        let client = reqwest::Client::new();
        let result = fetch_build(&client, &server.url(), "AbC123").await;
        assert!(matches!(result, Err(DeepdexError::Api(_))));
    }

    #[test]
    fn test_display_name_falls_back_to_id() {
        let build = Build {
            id: "AbC123".to_string(),
            name: "  ".to_string(),
            author: String::new(),
            power: 1,
            traits: Traits::default(),
            talents: Vec::new(),
        };
        assert_eq!(build.display_name(), "Build AbC123");
    }
}
