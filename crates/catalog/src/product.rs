use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use craftmart_auth::{Action, OwnedResource, Role};
use craftmart_core::{DomainError, DomainResult, Entity, ProductId, UserId};

use crate::{photo::DEFAULT_PHOTO, slug::slugify};

pub const MAX_NAME_LEN: usize = 50;
pub const MAX_DESCRIPTION_LEN: usize = 500;

const EDITOR_ROLES: &[Role] = &[Role::Owner, Role::Admin];
const ANY_ROLE: &[Role] = &[Role::Standard, Role::Owner, Role::Admin];

/// Product category (fixed set).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Statue,
    Clothes,
    Shoes,
    Handicraft,
    Others,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Statue,
        Category::Clothes,
        Category::Shoes,
        Category::Handicraft,
        Category::Others,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Statue => "Statue",
            Category::Clothes => "Clothes",
            Category::Shoes => "Shoes",
            Category::Handicraft => "Handicraft",
            Category::Others => "Others",
        }
    }
}

impl FromStr for Category {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s.trim())
            .ok_or_else(|| {
                DomainError::validation(format!(
                    "'{s}' is not a valid category (expected one of Statue, Clothes, Shoes, Handicraft, Others)"
                ))
            })
    }
}

/// A JSON field that accepts either a single value or a list of values.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(v) => vec![v],
            OneOrMany::Many(v) => v,
        }
    }
}

/// A catalog product.
///
/// # Invariants
/// - exactly one owner (`user`), fixed at creation
/// - `name` is trimmed, 1..=50 chars, and `slug` is always derived from it
/// - `category` is non-empty and free of duplicates
/// - `cost`, when present, is finite and non-negative
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub images: String,
    pub category: Vec<Category>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_rating: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    pub available: bool,
    pub created_at: DateTime<Utc>,
    pub user: UserId,
}

impl Product {
    pub fn validate(&self) -> DomainResult<()> {
        let mut problems = Vec::new();

        let name_len = self.name.trim().chars().count();
        if name_len == 0 {
            problems.push("Please add a name".to_string());
        } else if name_len > MAX_NAME_LEN {
            problems.push(format!("Name cannot be more than {MAX_NAME_LEN} characters"));
        }

        let description_len = self.description.trim().chars().count();
        if description_len == 0 {
            problems.push("Please add a description".to_string());
        } else if description_len > MAX_DESCRIPTION_LEN {
            problems.push(format!(
                "Description cannot be more than {MAX_DESCRIPTION_LEN} characters"
            ));
        }

        if self.category.is_empty() {
            problems.push("Please choose a category".to_string());
        }

        if let Some(cost) = self.cost {
            if !cost.is_finite() || cost < 0.0 {
                problems.push("Cost must be a non-negative number".to_string());
            }
        }

        if let Some(rating) = self.average_rating {
            if !(1.0..=10.0).contains(&rating) {
                problems.push("Average rating must be between 1 and 10".to_string());
            }
        }

        DomainError::check(problems)
    }
}

impl Entity for Product {
    type Id = ProductId;
    const KIND: &'static str = "product";

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl OwnedResource for Product {
    fn resource_kind(&self) -> &'static str {
        Self::KIND
    }

    fn resource_id(&self) -> String {
        self.id.to_string()
    }

    fn owner_id(&self) -> UserId {
        self.user
    }

    fn permitted_roles(&self, action: Action) -> &'static [Role] {
        match action {
            Action::Read => ANY_ROLE,
            Action::Write | Action::Delete => EDITOR_ROLES,
        }
    }
}

/// Request body for creating a product.
///
/// `user`, `slug`, `images` and `averageRating` are never taken from input.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: Option<OneOrMany<String>>,
    pub cost: Option<f64>,
    pub available: Option<bool>,
}

impl NewProduct {
    pub fn into_product(
        self,
        id: ProductId,
        owner: UserId,
        created_at: DateTime<Utc>,
    ) -> DomainResult<Product> {
        let name = self.name.trim().to_string();
        let product = Product {
            id,
            slug: slugify(&name),
            name,
            description: self.description.trim().to_string(),
            images: DEFAULT_PHOTO.to_string(),
            category: parse_categories(self.category)?,
            average_rating: None,
            cost: self.cost,
            available: self.available.unwrap_or(false),
            created_at,
            user: owner,
        };
        product.validate()?;
        Ok(product)
    }
}

/// Request body for updating a product. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<OneOrMany<String>>,
    pub cost: Option<f64>,
    pub available: Option<bool>,
}

impl ProductPatch {
    /// Return the updated product; the original is untouched on failure.
    pub fn apply(self, product: &Product) -> DomainResult<Product> {
        let mut next = product.clone();

        if let Some(name) = self.name {
            next.name = name.trim().to_string();
            next.slug = slugify(&next.name);
        }
        if let Some(description) = self.description {
            next.description = description.trim().to_string();
        }
        if self.category.is_some() {
            next.category = parse_categories(self.category)?;
        }
        if let Some(cost) = self.cost {
            next.cost = Some(cost);
        }
        if let Some(available) = self.available {
            next.available = available;
        }

        next.validate()?;
        Ok(next)
    }
}

fn parse_categories(input: Option<OneOrMany<String>>) -> DomainResult<Vec<Category>> {
    let raw = input.map(OneOrMany::into_vec).unwrap_or_default();
    let mut out: Vec<Category> = Vec::with_capacity(raw.len());
    for name in raw {
        let category = name.parse::<Category>()?;
        if !out.contains(&category) {
            out.push(category);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use craftmart_auth::{Decision, Identity, authorize};

    fn vase() -> NewProduct {
        NewProduct {
            name: "  Vase ".to_string(),
            description: "A hand-thrown vase".to_string(),
            category: Some(OneOrMany::Many(vec!["Statue".to_string()])),
            cost: Some(10.0),
            available: None,
        }
    }

    fn create(input: NewProduct) -> DomainResult<Product> {
        input.into_product(ProductId::new(), UserId::new(), Utc::now())
    }

    #[test]
    fn create_fills_derived_fields() {
        let product = create(vase()).unwrap();
        assert_eq!(product.name, "Vase");
        assert_eq!(product.slug, "vase");
        assert_eq!(product.images, DEFAULT_PHOTO);
        assert_eq!(product.category, vec![Category::Statue]);
        assert!(!product.available);
        assert_eq!(product.average_rating, None);
    }

    #[test]
    fn create_accepts_single_category_string() {
        let input = NewProduct {
            category: Some(OneOrMany::One("Shoes".to_string())),
            ..vase()
        };
        assert_eq!(create(input).unwrap().category, vec![Category::Shoes]);
    }

    #[test]
    fn create_rejects_unknown_category() {
        let input = NewProduct {
            category: Some(OneOrMany::Many(vec!["Furniture".to_string()])),
            ..vase()
        };
        match create(input).unwrap_err() {
            DomainError::Validation(msg) => assert!(msg.contains("Furniture")),
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn create_requires_name_description_and_category() {
        let input = NewProduct {
            name: String::new(),
            description: " ".to_string(),
            category: None,
            cost: None,
            available: None,
        };
        let msg = create(input).unwrap_err().to_string();
        assert!(msg.contains("Please add a name"));
        assert!(msg.contains("Please add a description"));
        assert!(msg.contains("Please choose a category"));
    }

    #[test]
    fn create_rejects_long_name_and_negative_cost() {
        let input = NewProduct {
            name: "x".repeat(MAX_NAME_LEN + 1),
            cost: Some(-1.0),
            ..vase()
        };
        let msg = create(input).unwrap_err().to_string();
        assert!(msg.contains("Name cannot be more than 50"));
        assert!(msg.contains("Cost must be"));
    }

    #[test]
    fn duplicate_categories_collapse() {
        let input = NewProduct {
            category: Some(OneOrMany::Many(vec![
                "Statue".to_string(),
                "Others".to_string(),
                "Statue".to_string(),
            ])),
            ..vase()
        };
        assert_eq!(
            create(input).unwrap().category,
            vec![Category::Statue, Category::Others]
        );
    }

    #[test]
    fn patch_renames_and_reslugs() {
        let product = create(vase()).unwrap();
        let patch = ProductPatch {
            name: Some("Tall Vase".to_string()),
            ..ProductPatch::default()
        };
        let updated = patch.apply(&product).unwrap();
        assert_eq!(updated.slug, "tall-vase");
        assert_eq!(updated.user, product.user);
        assert_eq!(updated.id, product.id);
    }

    #[test]
    fn invalid_patch_leaves_product_untouched() {
        let product = create(vase()).unwrap();
        let patch = ProductPatch {
            description: Some(String::new()),
            ..ProductPatch::default()
        };
        assert!(patch.apply(&product).is_err());
        assert_eq!(product.description, "A hand-thrown vase");
    }

    #[test]
    fn serializes_with_original_field_names() {
        let product = create(vase()).unwrap();
        let json = serde_json::to_value(&product).unwrap();
        assert_eq!(json["user"], product.user.to_string());
        assert_eq!(json["category"][0], "Statue");
        assert!(json.get("createdAt").is_some());
        assert!(json.get("averageRating").is_none());
    }

    #[test]
    fn only_owner_role_owners_and_admins_may_edit() {
        let owner = Identity::new(UserId::new(), Role::Owner);
        let product = vase()
            .into_product(ProductId::new(), owner.user_id, Utc::now())
            .unwrap();

        assert_eq!(authorize(Some(&owner), &product, Action::Write), Decision::Allow);

        let stranger = Identity::new(UserId::new(), Role::Owner);
        assert!(!authorize(Some(&stranger), &product, Action::Delete).is_allowed());

        let admin = Identity::new(UserId::new(), Role::Admin);
        assert!(authorize(Some(&admin), &product, Action::Delete).is_allowed());
    }
}
