//! Named filter presets, persisted through the backend.

use std::sync::Arc;

use domains::{ActiveFilters, AppError, NewSavedFilter, Result, SavedFilter, SavedFilterApi};

pub struct SavedFilterService {
    api: Arc<dyn SavedFilterApi>,
}

impl SavedFilterService {
    pub fn new(api: Arc<dyn SavedFilterApi>) -> Self {
        Self { api }
    }

    /// Persists a snapshot under `name`. A name the user already used comes
    /// back as [`AppError::Conflict`].
    pub async fn save(&self, user_id: &str, name: &str, filters: &ActiveFilters) -> Result<SavedFilter> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("filter name must not be empty".into()));
        }
        filters.validate()?;

        let request = NewSavedFilter {
            user_id: user_id.to_string(),
            name: name.to_string(),
            filters: filters.clone(),
        };
        match self.api.save_filter(request).await {
            Ok(saved) => {
                tracing::info!(user_id, name, id = %saved.id, "saved filter");
                Ok(saved)
            }
            Err(err @ AppError::Conflict(_)) => {
                tracing::info!(user_id, name, "saved filter name already taken");
                Err(err)
            }
            Err(err) => {
                tracing::error!(user_id, name, error = %err, "failed to save filter");
                Err(err)
            }
        }
    }

    pub async fn list(&self, user_id: &str) -> Result<Vec<SavedFilter>> {
        self.api.list_filters(user_id).await
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.api.delete_filter(id).await?;
        tracing::info!(id, "deleted saved filter");
        Ok(())
    }

    /// Looks up one of the user's presets. The returned filters replace the
    /// panel state wholesale (see `FilterPanel::load_saved`).
    pub async fn load(&self, user_id: &str, id: &str) -> Result<ActiveFilters> {
        let saved = self
            .api
            .list_filters(user_id)
            .await?
            .into_iter()
            .find(|f| f.id == id)
            .ok_or_else(|| AppError::NotFound("saved filter".into(), id.to_string()))?;
        saved.filters.validate()?;
        Ok(saved.filters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::MockSavedFilterApi;
    use mockall::predicate::always;

    fn saved(id: &str, name: &str) -> SavedFilter {
        SavedFilter {
            id: id.into(),
            user_id: "u1".into(),
            name: name.into(),
            filters: ActiveFilters {
                domain_type: "aged".into(),
                ..ActiveFilters::default()
            },
            created_at: None,
        }
    }

    #[tokio::test]
    async fn second_save_with_same_name_is_conflict() {
        let mut api = MockSavedFilterApi::new();
        let mut seq = mockall::Sequence::new();
        api.expect_save_filter()
            .with(always())
            .times(1)
            .in_sequence(&mut seq)
            .returning(|req| Ok(saved("f1", &req.name)));
        api.expect_save_filter()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(AppError::Conflict("Filter name already exists".into())));

        let service = SavedFilterService::new(Arc::new(api));
        let filters = ActiveFilters::default();
        assert!(service.save("u1", "Test", &filters).await.is_ok());

        let err = service.save("u1", "Test", &filters).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(err.notice().title, "Name Already Exists");
    }

    #[tokio::test]
    async fn blank_name_never_reaches_the_api() {
        let api = MockSavedFilterApi::new();
        let service = SavedFilterService::new(Arc::new(api));
        let err = service.save("u1", "   ", &ActiveFilters::default()).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn load_returns_the_snapshot_or_not_found() {
        let mut api = MockSavedFilterApi::new();
        api.expect_list_filters()
            .returning(|_| Ok(vec![saved("f1", "Aged"), saved("f2", "Other")]));
        let service = SavedFilterService::new(Arc::new(api));

        let filters = service.load("u1", "f1").await.unwrap();
        assert_eq!(filters.domain_type, "aged");

        let err = service.load("u1", "missing").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(..)));
    }
}
