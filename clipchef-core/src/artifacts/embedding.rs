//! Embedding generation for semantic search.

use std::time::Duration;

use super::ArtifactError;
use crate::ai::ContentService;
use crate::types::RecipeDraft;

/// Text embedded for a recipe: title, description, auxiliary description and
/// ingredient names, one per line, skipping empty parts.
pub fn embedding_fingerprint(draft: &RecipeDraft, auxiliary: Option<&str>) -> String {
    let mut parts: Vec<&str> = vec![draft.title.as_str(), draft.description.as_str()];
    parts.extend(auxiliary);
    parts.extend(draft.ingredients.iter().map(|i| i.name.as_str()));

    parts
        .into_iter()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Embed the recipe fingerprint. Any failure, including an empty vector, is an error.
pub async fn generate_embedding(
    service: &dyn ContentService,
    draft: &RecipeDraft,
    auxiliary: Option<&str>,
    timeout: Duration,
) -> Result<Vec<f32>, ArtifactError> {
    let text = embedding_fingerprint(draft, auxiliary);
    let embedding = tokio::time::timeout(timeout, service.embed(&text))
        .await
        .map_err(|_| ArtifactError::TimedOut("embedding", timeout.as_secs()))??;

    if embedding.is_empty() {
        return Err(ArtifactError::EmptyEmbedding);
    }
    Ok(embedding)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{FakeCall, FakeContentService};

    #[test]
    fn test_fingerprint_skips_empty_parts() {
        let mut draft = FakeContentService::sample_draft();
        draft.description = "  ".to_string();

        assert_eq!(
            embedding_fingerprint(&draft, Some("from the caption")),
            "Pasta v1\nfrom the caption\nspaghetti\ntomato"
        );
        assert_eq!(
            embedding_fingerprint(&draft, None),
            "Pasta v1\nspaghetti\ntomato"
        );
    }

    #[tokio::test]
    async fn test_embeds_fingerprint() {
        let service = FakeContentService::default();
        let draft = FakeContentService::sample_draft();

        let embedding = generate_embedding(&service, &draft, None, Duration::from_secs(5))
            .await
            .unwrap();
        assert!(!embedding.is_empty());
        assert_eq!(
            service.calls(),
            vec![FakeCall::Embed(embedding_fingerprint(&draft, None))]
        );
    }

    #[tokio::test]
    async fn test_failure_and_empty_are_errors() {
        let draft = FakeContentService::sample_draft();

        let err = generate_embedding(
            &FakeContentService::default().fail_embedding(),
            &draft,
            None,
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ArtifactError::Ai(_)));

        let err = generate_embedding(
            &FakeContentService::default().empty_embedding(),
            &draft,
            None,
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ArtifactError::EmptyEmbedding));
    }
}
