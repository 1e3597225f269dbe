use crate::{
    catalog::{CatalogStore, Item, ItemId},
    error::ServiceError,
    renormalize::{Adjustment, Renormalizer},
    search::{self, TagQuery},
    tagger::{ImageTags, Tagger},
};
use tracing::info;

/// The operations offered to clients, with input validation in front of the core.
pub struct CatalogService<S> {
    store: S,
    tagger: Tagger,
    renormalizer: Renormalizer,
}

impl<S> CatalogService<S>
where
    S: CatalogStore,
{
    pub fn new(store: S, tagger: Tagger) -> Self {
        Self {
            store,
            tagger,
            renormalizer: Renormalizer::default(),
        }
    }

    pub fn renormalizer(self, renormalizer: Renormalizer) -> Self {
        Self { renormalizer, ..self }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Items matching the query. Tags are trimmed and blank ones dropped; nothing left is rejected.
    pub fn search(&self, query: &TagQuery) -> Result<Vec<Item>, ServiceError> {
        let tags: Vec<String> = query
            .tags
            .iter()
            .map(|tag| tag.trim())
            .filter(|tag| !tag.is_empty())
            .map(str::to_string)
            .collect();

        if tags.is_empty() {
            return Err(ServiceError::EmptyQuery);
        }

        let query = TagQuery { tags, ..query.clone() };
        Ok(search::search(&self.store, &query)?)
    }

    /// Items ranked by color similarity to `id`, without their distances.
    pub fn similar_by_color(&self, id: &ItemId, limit: usize, same_brand: bool) -> Result<Vec<Item>, ServiceError> {
        Ok(self
            .similar_by_color_scored(id, limit, same_brand)?
            .into_iter()
            .map(|(item, _)| item)
            .collect())
    }

    pub fn similar_by_color_scored(
        &self,
        id: &ItemId,
        limit: usize,
        same_brand: bool,
    ) -> Result<Vec<(Item, f64)>, ServiceError> {
        if limit == 0 {
            return Err(ServiceError::InvalidLimit);
        }

        Ok(search::similar_by_color(&self.store, id, limit, same_brand)?)
    }

    /// Tags for an encoded image. Nothing is stored.
    pub fn tag_image(&self, bytes: &[u8], brand_tags: &[String]) -> Result<ImageTags, ServiceError> {
        Ok(self.tagger.tag_image(bytes, brand_tags)?)
    }

    /// Tag an image and store the result under `id`, replacing any previous record.
    pub fn tag_and_store(&self, id: ItemId, bytes: &[u8], brand_tags: &[String]) -> Result<Item, ServiceError> {
        let item = self.tag_image(bytes, brand_tags)?.into_item(id);
        self.store.upsert(item.clone())?;

        info!(item = %item.id, tags = item.tags.len(), "stored tagged item");
        Ok(item)
    }

    pub fn adjust_colors(&self, target_colors: &[String]) -> Result<Adjustment, ServiceError> {
        Ok(self.renormalizer.adjust(&self.store, target_colors)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{tests::item, InMemoryCatalog};
    use crate::search::DEFAULT_SIMILAR_LIMIT;

    fn service() -> CatalogService<InMemoryCatalog> {
        CatalogService::new(
            InMemoryCatalog::from_items([
                item("a", &["type_tee", "color_red"], &[("red", 100.0)]),
                item("b", &["type_tee", "color_blue"], &[("blue", 100.0)]),
            ]),
            Tagger::default(),
        )
    }

    #[test]
    fn empty_queries_are_rejected() {
        let service = service();

        assert!(matches!(service.search(&TagQuery::default()), Err(ServiceError::EmptyQuery)));
        assert!(matches!(service.search(&TagQuery::new(["", " "])), Err(ServiceError::EmptyQuery)));
    }

    #[test]
    fn blank_tags_are_dropped_before_searching() {
        let results = service().search(&TagQuery::new(["color_red", " ", ""])).unwrap();
        assert_eq!(results.iter().map(|i| i.id.as_str()).collect::<Vec<_>>(), vec!["a"]);

        let padded = service().search(&TagQuery::new([" type_tee ", "\tcolor_blue"])).unwrap();
        assert_eq!(padded.iter().map(|i| i.id.as_str()).collect::<Vec<_>>(), vec!["b"]);
    }

    #[test]
    fn zero_limit_is_rejected() {
        assert!(matches!(
            service().similar_by_color(&ItemId::new("a"), 0, false),
            Err(ServiceError::InvalidLimit)
        ));
    }

    #[test]
    fn similar_items_drop_their_distance() {
        let results = service()
            .similar_by_color(&ItemId::new("a"), DEFAULT_SIMILAR_LIMIT, false)
            .unwrap();

        assert_eq!(results.iter().map(|i| i.id.as_str()).collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn bad_images_surface_as_errors() {
        assert!(matches!(service().tag_image(&[0, 1, 2, 3], &[]), Err(ServiceError::Tag(_))));
    }

    #[test]
    fn adjust_on_absent_color_is_a_no_op() {
        let adjustment = service().adjust_colors(&["grey".to_string()]).unwrap();

        assert_eq!(adjustment.items_updated, 0);
    }
}
