//! Per-category tag vocabularies.
//!
//! Every forum gets one of two fixed tag sets depending on which category
//! it lives under: publisher-style categories use a small quality/format
//! vocabulary, everything else gets the full garment-type vocabulary.

use crate::remote::ForumTag;

/// Categories that take the publisher vocabulary.
const PUBLISHER_CATEGORIES: &[&str] = &["Publisher", "Yarn Houses and Brands"];

/// Vocabulary for publisher-style categories.
const PUBLISHER_TAGS: &[&str] = &["eBook", "High Quality", "Magazine", "Single Pattern"];

/// Vocabulary for designer categories (the default).
const DESIGNER_TAGS: &[&str] = &[
    "Accessory",
    "Baby/Child",
    "Book",
    "Cardigan/Jacket",
    "Dress/Skirt",
    "Hat",
    "Home",
    "Man",
    "Neckwear",
    "Other",
    "Socks",
    "Sweater/Jumper",
    "Top/Tank/Blouse",
    "Toys",
    "Vest/Slipover",
];

/// Resolve the tag vocabulary for a category.
///
/// Total: every category name maps to exactly one vocabulary.
pub fn tags_for(category_name: &str) -> Vec<ForumTag> {
    let names = if PUBLISHER_CATEGORIES.contains(&category_name) {
        PUBLISHER_TAGS
    } else {
        DESIGNER_TAGS
    };
    names.iter().map(|n| ForumTag::new(*n)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publisher_categories_get_publisher_tags() {
        assert_eq!(tags_for("Publisher").len(), 4);
        assert_eq!(tags_for("Yarn Houses and Brands").len(), 4);
        assert!(tags_for("Publisher").iter().any(|t| t.name == "Magazine"));
    }

    #[test]
    fn everything_else_gets_designer_tags() {
        let tags = tags_for("Independent Designers");
        assert_eq!(tags.len(), 15);
        assert!(tags.iter().any(|t| t.name == "Socks"));
    }

    #[test]
    fn match_is_exact_not_normalized() {
        // Vocabulary selection is a literal lookup, unlike channel matching.
        assert_eq!(tags_for("publisher").len(), 15);
    }
}
