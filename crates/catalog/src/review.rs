use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use craftmart_auth::{Action, OwnedResource, Role};
use craftmart_core::{DomainError, DomainResult, Entity, ProductId, ReviewId, UserId};

pub const MAX_TITLE_LEN: usize = 100;
pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;

const AUTHOR_ROLES: &[Role] = &[Role::Standard, Role::Admin];
const ANY_ROLE: &[Role] = &[Role::Standard, Role::Owner, Role::Admin];

/// A product review.
///
/// # Invariants
/// - references exactly one product and one author, both fixed at creation
/// - `rating` is within `MIN_RATING..=MAX_RATING`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: ReviewId,
    pub title: String,
    pub text: String,
    pub rating: u8,
    pub created_at: DateTime<Utc>,
    pub product: ProductId,
    pub user: UserId,
}

impl Review {
    pub fn validate(&self) -> DomainResult<()> {
        let mut problems = Vec::new();

        let title_len = self.title.trim().chars().count();
        if title_len == 0 {
            problems.push("Please add a title for the review".to_string());
        } else if title_len > MAX_TITLE_LEN {
            problems.push(format!("Title cannot be more than {MAX_TITLE_LEN} characters"));
        }

        if self.text.trim().is_empty() {
            problems.push("Please add some comments".to_string());
        }

        if !(MIN_RATING..=MAX_RATING).contains(&self.rating) {
            problems.push(rating_message());
        }

        DomainError::check(problems)
    }
}

impl Entity for Review {
    type Id = ReviewId;
    const KIND: &'static str = "review";

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl OwnedResource for Review {
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
            Action::Write | Action::Delete => AUTHOR_ROLES,
        }
    }
}

/// Request body for creating a review.
///
/// `product` and `user` come from the route and the caller.
#[derive(Debug, Clone, Deserialize)]
pub struct NewReview {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub text: String,
    pub rating: Option<f64>,
}

impl NewReview {
    pub fn into_review(
        self,
        id: ReviewId,
        product: ProductId,
        author: UserId,
        created_at: DateTime<Utc>,
    ) -> DomainResult<Review> {
        let Some(rating) = self.rating else {
            return Err(DomainError::validation(rating_message()));
        };
        let review = Review {
            id,
            title: self.title.trim().to_string(),
            text: self.text.trim().to_string(),
            rating: parse_rating(rating)?,
            created_at,
            product,
            user: author,
        };
        review.validate()?;
        Ok(review)
    }
}

/// Request body for updating a review. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewPatch {
    pub title: Option<String>,
    pub text: Option<String>,
    pub rating: Option<f64>,
}

impl ReviewPatch {
    /// Return the updated review; the original is untouched on failure.
    pub fn apply(self, review: &Review) -> DomainResult<Review> {
        let mut next = review.clone();
        if let Some(title) = self.title {
            next.title = title.trim().to_string();
        }
        if let Some(text) = self.text {
            next.text = text.trim().to_string();
        }
        if let Some(rating) = self.rating {
            next.rating = parse_rating(rating)?;
        }
        next.validate()?;
        Ok(next)
    }
}

fn parse_rating(raw: f64) -> DomainResult<u8> {
    let in_range = raw.fract() == 0.0 && (f64::from(MIN_RATING)..=f64::from(MAX_RATING)).contains(&raw);
    if in_range {
        Ok(raw as u8)
    } else {
        Err(DomainError::validation(rating_message()))
    }
}

fn rating_message() -> String {
    format!("Please add a rating between {MIN_RATING} and {MAX_RATING}")
}
