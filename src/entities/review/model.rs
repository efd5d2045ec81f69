//! Guest reviews of a completed stay

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Per-aspect scores, each 1 to 5
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
pub struct Ratings {
    #[validate(range(min = 1, max = 5))]
    pub overall: u8,
    #[validate(range(min = 1, max = 5))]
    pub cleanliness: u8,
    #[validate(range(min = 1, max = 5))]
    pub service: u8,
    #[validate(range(min = 1, max = 5))]
    pub location: u8,
    #[validate(range(min = 1, max = 5))]
    pub value: u8,
}

impl Ratings {
    pub fn average(&self) -> f64 {
        let sum = self.overall as f64
            + self.cleanliness as f64
            + self.service as f64
            + self.location as f64
            + self.value as f64;
        sum / 5.0
    }
}

pub const PUBLISHED: &str = "published";

// `name` holds a short headline taken from the comment
crate::impl_data_entity!(Review, "review", "reviews", tenant: hotel_id, ["hotel_id", "user_id", "booking_id"], {
    user_id: Uuid,
    booking_id: Uuid,
    hotel_id: Uuid,
    ratings: Ratings,
    comment: String,
    #[serde(default)]
    images: Vec<String>,
    #[serde(default)]
    helpful_count: u32,
    #[serde(default)]
    is_verified: bool,
    admin_response: Option<String>,
});

/// First words of a comment, used as the review headline
pub fn headline(comment: &str) -> String {
    const MAX: usize = 80;
    let trimmed = comment.trim();
    match trimmed.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", trimmed[..idx].trim_end()),
        None => trimmed.to_string(),
    }
}

/// Average overall rating and count over the given reviews
pub fn hotel_rating<'a>(reviews: impl IntoIterator<Item = &'a Review>) -> (f64, u32) {
    let (sum, count) = reviews
        .into_iter()
        .filter(|r| r.deleted_at.is_none())
        .fold((0.0, 0u32), |(sum, count), r| (sum + r.ratings.average(), count + 1));
    if count == 0 {
        return (0.0, 0);
    }
    ((sum / count as f64 * 10.0).round() / 10.0, count)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ratings(score: u8) -> Ratings {
        Ratings {
            overall: score,
            cleanliness: score,
            service: score,
            location: score,
            value: score,
        }
    }

    fn review(score: u8) -> Review {
        Review::new(
            "Lovely".to_string(),
            PUBLISHED.to_string(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            ratings(score),
            "Lovely".to_string(),
            Vec::new(),
            0,
            true,
            None,
        )
    }

    #[test]
    fn test_hotel_rating() {
        let reviews = vec![review(5), review(4), review(4)];
        assert_eq!(hotel_rating(&reviews), (4.3, 3));
        assert_eq!(hotel_rating(&Vec::<Review>::new()), (0.0, 0));
    }

    #[test]
    fn test_ratings_are_bounded() {
        assert!(ratings(0).validate().is_err());
        assert!(ratings(6).validate().is_err());
        assert!(ratings(3).validate().is_ok());
    }

    #[test]
    fn test_headline_truncates_long_comments() {
        assert_eq!(headline("  Great stay  "), "Great stay");
        let long = "a".repeat(200);
        assert_eq!(headline(&long).len(), 83);
    }
}
