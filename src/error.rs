use thiserror::Error;

#[derive(Debug, Error)]
pub enum TagError {
    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("Image has no pixels")]
    EmptyImage,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Catalog lock poisoned")]
    Poisoned,

    #[error("Item not found: {0}")]
    NotFound(String),
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("At least one tag must be provided")]
    EmptyQuery,

    #[error("Limit must be positive")]
    InvalidLimit,

    #[error("Tagging error: {0}")]
    Tag(#[from] TagError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_error_messages() {
        assert_eq!(ServiceError::EmptyQuery.to_string(), "At least one tag must be provided");
        assert_eq!(ServiceError::InvalidLimit.to_string(), "Limit must be positive");
    }

    #[test]
    fn test_catalog_error_not_found() {
        let error = CatalogError::NotFound("item-7".to_string());
        assert_eq!(error.to_string(), "Item not found: item-7");
    }

    #[test]
    fn test_service_error_from_tag_error() {
        let error: ServiceError = TagError::EmptyImage.into();

        match error {
            ServiceError::Tag(TagError::EmptyImage) => {}
            _ => panic!("Expected Tag variant"),
        }
        assert_eq!(
            ServiceError::from(TagError::EmptyImage).to_string(),
            "Tagging error: Image has no pixels"
        );
    }
}
