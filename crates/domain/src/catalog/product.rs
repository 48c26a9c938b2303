//! Products, variants and reviews.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use common::{DocumentId, ProductId, UserId};
use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::repository::Entity;
use crate::validation::{FieldError, is_required};

/// Product category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Console,
    Accessory,
    Game,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Console => "console",
            Category::Accessory => "accessory",
            Category::Game => "game",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A purchasable color/size configuration of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub color: String,
    pub size: String,
    pub stock: u32,
    #[serde(rename = "price_cents")]
    pub price: Money,
    pub sku: String,
}

impl Variant {
    /// Returns true if this variant is the `(color, size)` combination.
    pub fn is(&self, color: &str, size: &str) -> bool {
        self.color == color && self.size == size
    }

    pub fn in_stock(&self) -> bool {
        self.stock > 0
    }
}

/// A customer review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub user: UserId,
    /// 1 to 5 inclusive.
    pub rating: u8,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A catalog product with its variants and reviews.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub category: Category,
    pub brand: String,
    pub images: Vec<String>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub specifications: BTreeMap<String, String>,
    pub variants: Vec<Variant>,
    /// Mean of review ratings; 0 without reviews.
    pub rating: f64,
    #[serde(default)]
    pub reviews: Vec<Review>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Product {
    const COLLECTION: &'static str = "products";

    fn document_id(&self) -> DocumentId {
        self.id.document_id()
    }
}

impl Product {
    /// Creates an active product with no reviews from validated input.
    pub fn from_new(input: NewProduct) -> Self {
        let now = Utc::now();
        Self {
            id: ProductId::new(),
            name: input.name.trim().to_string(),
            description: input.description.trim().to_string(),
            category: input.category,
            brand: input.brand.trim().to_string(),
            images: input.images,
            features: input.features,
            specifications: input.specifications,
            variants: input.variants,
            rating: 0.0,
            reviews: Vec::new(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Finds the variant with the given color and size.
    pub fn variant(&self, color: &str, size: &str) -> Option<&Variant> {
        self.variants.iter().find(|v| v.is(color, size))
    }

    pub fn variant_mut(&mut self, color: &str, size: &str) -> Option<&mut Variant> {
        self.variants.iter_mut().find(|v| v.is(color, size))
    }

    pub fn is_variant_in_stock(&self, color: &str, size: &str) -> bool {
        self.variant(color, size).is_some_and(Variant::in_stock)
    }

    pub fn available_variants(&self) -> impl Iterator<Item = &Variant> {
        self.variants.iter().filter(|v| v.in_stock())
    }

    /// Appends a review and recomputes the rating.
    pub fn add_review(&mut self, review: Review) {
        self.reviews.push(review);
        self.rating = average_rating(&self.reviews);
    }

    /// Applies a validated partial update.
    pub fn apply_patch(&mut self, patch: ProductPatch) {
        if let Some(name) = patch.name {
            self.name = name.trim().to_string();
        }
        if let Some(description) = patch.description {
            self.description = description.trim().to_string();
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(brand) = patch.brand {
            self.brand = brand.trim().to_string();
        }
        if let Some(images) = patch.images {
            self.images = images;
        }
        if let Some(features) = patch.features {
            self.features = features;
        }
        if let Some(specifications) = patch.specifications {
            self.specifications = specifications;
        }
        if let Some(variants) = patch.variants {
            self.variants = variants;
        }
        if let Some(is_active) = patch.is_active {
            self.is_active = is_active;
        }
        self.updated_at = Utc::now();
    }
}

/// Mean review rating, folded over the review list.
pub fn average_rating(reviews: &[Review]) -> f64 {
    if reviews.is_empty() {
        return 0.0;
    }
    let total: u32 = reviews.iter().map(|r| u32::from(r.rating)).sum();
    f64::from(total) / reviews.len() as f64
}

/// Input for creating a product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub category: Category,
    pub brand: String,
    pub images: Vec<String>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub specifications: BTreeMap<String, String>,
    pub variants: Vec<Variant>,
}

impl NewProduct {
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        for (field, value) in [
            ("name", &self.name),
            ("description", &self.description),
            ("brand", &self.brand),
        ] {
            if !is_required(value) {
                errors.push(FieldError::new(field, format!("{field} is required")));
            }
        }
        validate_images(&self.images, &mut errors);
        validate_variants(&self.variants, &mut errors);
        errors
    }
}

/// Partial product update; absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<Category>,
    pub brand: Option<String>,
    pub images: Option<Vec<String>>,
    pub features: Option<Vec<String>>,
    pub specifications: Option<BTreeMap<String, String>>,
    pub variants: Option<Vec<Variant>>,
    pub is_active: Option<bool>,
}

impl ProductPatch {
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        for (field, value) in [
            ("name", &self.name),
            ("description", &self.description),
            ("brand", &self.brand),
        ] {
            if value.as_deref().is_some_and(|v| !is_required(v)) {
                errors.push(FieldError::new(field, format!("{field} must not be blank")));
            }
        }
        if let Some(ref images) = self.images {
            validate_images(images, &mut errors);
        }
        if let Some(ref variants) = self.variants {
            validate_variants(variants, &mut errors);
        }
        errors
    }
}

fn validate_images(images: &[String], errors: &mut Vec<FieldError>) {
    if images.is_empty() {
        errors.push(FieldError::new("images", "At least one image is required"));
    } else if images.iter().any(|image| !is_required(image)) {
        errors.push(FieldError::new("images", "Image URLs must not be blank"));
    }
}

fn validate_variants(variants: &[Variant], errors: &mut Vec<FieldError>) {
    if variants.is_empty() {
        errors.push(FieldError::new("variants", "At least one variant is required"));
        return;
    }

    let mut combinations = HashSet::new();
    let mut skus = HashSet::new();
    for (i, variant) in variants.iter().enumerate() {
        if !is_required(&variant.color) {
            errors.push(FieldError::new(format!("variants[{i}].color"), "Color is required"));
        }
        if !is_required(&variant.size) {
            errors.push(FieldError::new(format!("variants[{i}].size"), "Size is required"));
        }
        if !is_required(&variant.sku) {
            errors.push(FieldError::new(format!("variants[{i}].sku"), "SKU is required"));
        }
        if variant.price.is_negative() {
            errors.push(FieldError::new(
                format!("variants[{i}].price_cents"),
                "Price must not be negative",
            ));
        }
        if !combinations.insert((variant.color.as_str(), variant.size.as_str())) {
            errors.push(FieldError::new(
                format!("variants[{i}]"),
                "Duplicate color and size combination",
            ));
        }
        if !skus.insert(variant.sku.as_str()) {
            errors.push(FieldError::new(format!("variants[{i}].sku"), "Duplicate SKU"));
        }
    }
}

/// Listing filter; every present criterion must hold.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductFilter {
    pub category: Option<Category>,
    pub brand: Option<String>,
    pub min_price: Option<Money>,
    pub max_price: Option<Money>,
    pub color: Option<String>,
    pub size: Option<String>,
}

impl ProductFilter {
    pub fn matches(&self, product: &Product) -> bool {
        if !product.is_active {
            return false;
        }
        if self.category.is_some_and(|c| c != product.category) {
            return false;
        }
        if self.brand.as_deref().is_some_and(|b| b != product.brand) {
            return false;
        }
        if let Some(ref color) = self.color
            && !product.variants.iter().any(|v| &v.color == color)
        {
            return false;
        }
        if let Some(ref size) = self.size
            && !product.variants.iter().any(|v| &v.size == size)
        {
            return false;
        }
        if self.min_price.is_some() || self.max_price.is_some() {
            let in_range = product.variants.iter().any(|v| {
                self.min_price.is_none_or(|min| v.price >= min)
                    && self.max_price.is_none_or(|max| v.price <= max)
            });
            if !in_range {
                return false;
            }
        }
        true
    }
}
