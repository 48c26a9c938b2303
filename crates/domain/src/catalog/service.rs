//! Catalog operations.

use std::collections::HashSet;

use chrono::Utc;
use common::{ProductId, UserId};
use document_store::{DocumentStore, StoreError, WriteBatch};

use crate::error::{DomainError, Result};
use crate::repository::{Entity, Repository, Stored, query_for};

use super::sku::SkuClaim;
use super::{NewProduct, Product, ProductFilter, ProductPatch, Review, Variant};

/// Service for browsing and curating the product catalog.
pub struct CatalogService<S: DocumentStore> {
    repo: Repository<S>,
}

impl<S: DocumentStore> CatalogService<S> {
    /// Creates a new catalog service over the given store.
    pub fn new(store: S) -> Self {
        Self {
            repo: Repository::new(store),
        }
    }

    /// Lists active products matching `filter`, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>> {
        let mut query = query_for::<Product>()
            .where_eq("is_active", true)
            .newest_first();
        if let Some(category) = filter.category {
            query = query.where_eq("category", category.as_str());
        }
        if let Some(ref brand) = filter.brand {
            query = query.where_eq("brand", brand.as_str());
        }

        let products = self.repo.find::<Product>(query).await?;
        Ok(products
            .into_iter()
            .map(Stored::into_inner)
            .filter(|product| filter.matches(product))
            .collect())
    }

    /// Returns a product by ID, including soft-deleted ones.
    #[tracing::instrument(skip(self))]
    pub async fn get_product(&self, id: ProductId) -> Result<Product> {
        Ok(self.load(id).await?.into_inner())
    }

    /// Creates a product and claims its SKUs in one batch.
    #[tracing::instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_product(&self, input: NewProduct) -> Result<Product> {
        let errors = input.validate();
        if !errors.is_empty() {
            return Err(DomainError::Validation(errors));
        }

        let product = Product::from_new(input);
        let mut batch = WriteBatch::new().insert(product.to_new_document()?);
        for variant in &product.variants {
            batch = batch.insert(SkuClaim::new(&variant.sku, product.id).to_new_document()?);
        }
        self.commit_with_skus(batch).await?;

        tracing::info!(product_id = %product.id, "Product created");
        Ok(product)
    }

    /// Applies a partial update.
    ///
    /// Replacing the variants releases SKUs the product no longer uses and
    /// claims new ones in the same batch as the product write.
    #[tracing::instrument(skip(self, patch))]
    pub async fn update_product(&self, id: ProductId, patch: ProductPatch) -> Result<Product> {
        let errors = patch.validate();
        if !errors.is_empty() {
            return Err(DomainError::Validation(errors));
        }

        let mut product = self.load(id).await?;
        let mut batch = WriteBatch::new();
        if let Some(ref variants) = patch.variants {
            batch = self.reassign_skus(batch, id, variants).await?;
        }
        product.apply_patch(patch);
        batch = batch.replace(product.to_replacement()?);
        self.commit_with_skus(batch).await?;

        Ok(product.into_inner())
    }

    /// Soft delete: the product stays readable by ID but leaves listings.
    #[tracing::instrument(skip(self))]
    pub async fn delete_product(&self, id: ProductId) -> Result<()> {
        let mut product = self.load(id).await?;
        product.is_active = false;
        product.updated_at = Utc::now();
        self.repo.save(product).await?;
        tracing::info!(product_id = %id, "Product deactivated");
        Ok(())
    }

    /// Appends a review and recomputes the product rating.
    #[tracing::instrument(skip(self, comment))]
    pub async fn add_review(
        &self,
        id: ProductId,
        user: UserId,
        rating: u8,
        comment: Option<String>,
    ) -> Result<Product> {
        if !(1..=5).contains(&rating) {
            return Err(DomainError::invalid(
                "rating",
                "Rating must be between 1 and 5",
            ));
        }

        let mut product = self.load(id).await?;
        product.add_review(Review {
            user,
            rating,
            comment: comment.filter(|c| !c.trim().is_empty()),
            created_at: Utc::now(),
        });
        Ok(self.repo.save(product).await?.into_inner())
    }

    async fn load(&self, id: ProductId) -> Result<Stored<Product>> {
        self.repo
            .get::<Product>(id)
            .await?
            .ok_or(DomainError::ProductNotFound(id))
    }

    /// Adds the claim changes that move product `id` onto the SKUs of `variants`.
    ///
    /// Releases come first so a batch never holds the same key twice.
    async fn reassign_skus(
        &self,
        mut batch: WriteBatch,
        id: ProductId,
        variants: &[Variant],
    ) -> Result<WriteBatch> {
        let wanted: HashSet<&str> = variants.iter().map(|v| v.sku.as_str()).collect();
        let held = self
            .repo
            .find::<SkuClaim>(query_for::<SkuClaim>().where_eq("product", id.to_string()))
            .await?;
        let held_skus: HashSet<String> = held.iter().map(|claim| claim.sku.clone()).collect();

        for mut claim in held {
            if !wanted.contains(claim.sku.as_str()) {
                claim.release();
                batch = batch.replace(claim.to_replacement()?);
            }
        }
        for sku in wanted.into_iter().filter(|sku| !held_skus.contains(*sku)) {
            batch = batch.insert(SkuClaim::new(sku, id).to_new_document()?);
        }
        Ok(batch)
    }

    async fn commit_with_skus(&self, batch: WriteBatch) -> Result<()> {
        match self.repo.commit(batch).await {
            Ok(_) => Ok(()),
            Err(DomainError::Store(StoreError::DuplicateKey { collection, key }))
                if collection == SkuClaim::COLLECTION =>
            {
                Err(DomainError::Conflict(format!("SKU {key} is already in use")))
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use document_store::InMemoryDocumentStore;

    use super::*;
    use crate::catalog::fixtures::{new_product, variant};
    use crate::catalog::Category;
    use crate::money::Money;

    fn service() -> CatalogService<InMemoryDocumentStore> {
        CatalogService::new(InMemoryDocumentStore::new())
    }

    #[tokio::test]
    async fn create_and_get_product() {
        let catalog = service();
        let created = catalog
            .create_product(new_product("Switch", vec![variant("red", "std", 5, 29999)]))
            .await
            .unwrap();

        let loaded = catalog.get_product(created.id).await.unwrap();
        assert_eq!(loaded, created);
        assert!(loaded.is_active);
        assert_eq!(loaded.rating, 0.0);
    }

    #[tokio::test]
    async fn missing_product_is_not_found() {
        let result = service().get_product(ProductId::new()).await;
        assert!(matches!(result, Err(DomainError::ProductNotFound(_))));
    }

    #[tokio::test]
    async fn invalid_product_is_rejected() {
        let result = service().create_product(new_product("", vec![])).await;
        assert!(matches!(result, Err(DomainError::Validation(ref e)) if e.len() == 2));
    }

    #[tokio::test]
    async fn sku_must_be_unique_across_products() {
        let catalog = service();
        catalog
            .create_product(new_product("Switch", vec![variant("red", "std", 1, 100)]))
            .await
            .unwrap();

        let result = catalog
            .create_product(new_product("Switch 2", vec![variant("red", "std", 1, 100)]))
            .await;
        assert!(matches!(result, Err(DomainError::Conflict(_))));
    }

    #[tokio::test]
    async fn updating_own_variants_keeps_their_skus() {
        let catalog = service();
        let product = catalog
            .create_product(new_product("Switch", vec![variant("red", "std", 1, 100)]))
            .await
            .unwrap();

        let patch = ProductPatch {
            variants: Some(vec![variant("red", "std", 10, 120)]),
            name: Some("Switch Lite".to_string()),
            ..Default::default()
        };
        let updated = catalog.update_product(product.id, patch).await.unwrap();

        assert_eq!(updated.name, "Switch Lite");
        assert_eq!(updated.variants[0].stock, 10);
        assert_eq!(updated.brand, product.brand);
    }

    #[tokio::test]
    async fn replaced_skus_are_released_for_other_products() {
        let catalog = service();
        let product = catalog
            .create_product(new_product("Switch", vec![variant("red", "std", 1, 100)]))
            .await
            .unwrap();

        let patch = ProductPatch {
            variants: Some(vec![variant("blue", "std", 1, 100)]),
            ..Default::default()
        };
        catalog.update_product(product.id, patch).await.unwrap();

        catalog
            .create_product(new_product("Switch 2", vec![variant("red", "std", 1, 100)]))
            .await
            .unwrap();
        let taken = catalog
            .create_product(new_product("Switch 3", vec![variant("blue", "std", 1, 100)]))
            .await;
        assert!(matches!(taken, Err(DomainError::Conflict(_))));
    }

    #[tokio::test]
    async fn update_cannot_take_another_products_sku() {
        let catalog = service();
        catalog
            .create_product(new_product("Switch", vec![variant("red", "std", 1, 100)]))
            .await
            .unwrap();
        let other = catalog
            .create_product(new_product("Switch 2", vec![variant("blue", "std", 1, 100)]))
            .await
            .unwrap();

        let patch = ProductPatch {
            variants: Some(vec![variant("red", "std", 1, 100)]),
            ..Default::default()
        };
        let result = catalog.update_product(other.id, patch).await;

        assert!(matches!(result, Err(DomainError::Conflict(_))));
        let unchanged = catalog.get_product(other.id).await.unwrap();
        assert_eq!(unchanged.variants[0].sku, "SKU-BLUE-STD");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_creates_claim_a_sku_once() {
        let catalog = Arc::new(service());

        let mut handles = Vec::new();
        for n in 0..8 {
            let catalog = Arc::clone(&catalog);
            handles.push(tokio::spawn(async move {
                catalog
                    .create_product(new_product(
                        &format!("Switch {n}"),
                        vec![variant("red", "std", 1, 100)],
                    ))
                    .await
            }));
        }

        let mut created = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => created += 1,
                Err(DomainError::Conflict(_)) => {}
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert_eq!(created, 1);
        let listed = catalog.list_products(&ProductFilter::default()).await.unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    async fn listing_filters_and_orders_newest_first() {
        let catalog = service();
        let mut game = new_product("Zelda", vec![variant("none", "std", 1, 6999)]);
        game.category = Category::Game;
        catalog.create_product(game).await.unwrap();
        catalog
            .create_product(new_product("Switch", vec![variant("red", "std", 1, 29999)]))
            .await
            .unwrap();
        let hidden = catalog
            .create_product(new_product("Old", vec![variant("grey", "std", 1, 100)]))
            .await
            .unwrap();
        catalog.delete_product(hidden.id).await.unwrap();

        let all = catalog.list_products(&ProductFilter::default()).await.unwrap();
        let names: Vec<_> = all.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Switch", "Zelda"]);

        let games = catalog
            .list_products(&ProductFilter {
                category: Some(Category::Game),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(games.len(), 1);
        assert_eq!(games[0].name, "Zelda");

        let cheap = catalog
            .list_products(&ProductFilter {
                max_price: Some(Money::from_cents(10000)),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(cheap.len(), 1);
        assert_eq!(cheap[0].name, "Zelda");
    }

    #[tokio::test]
    async fn soft_deleted_product_is_still_readable() {
        let catalog = service();
        let product = catalog
            .create_product(new_product("Switch", vec![variant("red", "std", 1, 100)]))
            .await
            .unwrap();
        catalog.delete_product(product.id).await.unwrap();

        let loaded = catalog.get_product(product.id).await.unwrap();
        assert!(!loaded.is_active);
    }

    #[tokio::test]
    async fn reviews_update_rating() {
        let catalog = service();
        let product = catalog
            .create_product(new_product("Switch", vec![variant("red", "std", 1, 100)]))
            .await
            .unwrap();

        let after_first = catalog
            .add_review(product.id, UserId::new(), 5, Some("Great".to_string()))
            .await
            .unwrap();
        assert_eq!(after_first.rating, 5.0);

        let after_second = catalog
            .add_review(product.id, UserId::new(), 3, None)
            .await
            .unwrap();
        assert_eq!(after_second.rating, 4.0);
        assert_eq!(after_second.reviews.len(), 2);
    }

    #[tokio::test]
    async fn review_rating_out_of_range_is_rejected() {
        let catalog = service();
        let product = catalog
            .create_product(new_product("Switch", vec![variant("red", "std", 1, 100)]))
            .await
            .unwrap();

        for rating in [0, 6] {
            let result = catalog.add_review(product.id, UserId::new(), rating, None).await;
            assert!(matches!(result, Err(DomainError::Validation(_))));
        }
    }
}
