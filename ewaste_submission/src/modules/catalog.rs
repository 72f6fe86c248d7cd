use serde::{Deserialize, Serialize};

// A single recyclable category with the points it is worth
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    // Identifier the wizard stores in the draft, e.g. "batteries"
    pub id: String,
    // Display label
    pub label: String,
    // Base point value
    pub points: u32,
}

impl Category {
    pub fn new(id: &str, label: &str, points: u32) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            points,
        }
    }
}

// Built-in category table used when the configuration does not list any
pub fn default_categories() -> Vec<Category> {
    vec![
        Category::new("smartphones", "Smartphones & Tablets", 50),
        Category::new("laptops", "Laptops & Computers", 100),
        Category::new("batteries", "Batteries", 25),
        Category::new("cables", "Cables & Chargers", 15),
        Category::new("monitors", "Monitors & TVs", 150),
        Category::new("other", "Other Electronics", 30),
    ]
}

pub const DEFAULT_SCAN_BONUS: u32 = 10;

// Immutable lookup of categories, shared by every wizard opened in a session
#[derive(Debug, Clone)]
pub struct CategoryCatalog {
    categories: Vec<Category>,
    scan_bonus: u32,
}

impl CategoryCatalog {
    pub fn new(categories: Vec<Category>, scan_bonus: u32) -> Self {
        Self { categories, scan_bonus }
    }

    pub fn get(&self, id: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Category> {
        self.categories.iter()
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn scan_bonus(&self) -> u32 {
        self.scan_bonus
    }

    // Non-authoritative estimate shown on the review step
    // An unknown or missing category counts as zero
    pub fn estimate(&self, category: Option<&str>, code_scanned: bool) -> u32 {
        let base = category.and_then(|id| self.get(id)).map(|c| c.points).unwrap_or(0);
        if code_scanned {
            base.saturating_add(self.scan_bonus)
        } else {
            base
        }
    }
}

impl Default for CategoryCatalog {
    fn default() -> Self {
        Self::new(default_categories(), DEFAULT_SCAN_BONUS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_matches_point_values() {
        let catalog = CategoryCatalog::default();
        assert_eq!(catalog.len(), 6);
        assert_eq!(catalog.get("laptops").map(|c| c.points), Some(100));
        assert_eq!(catalog.get("cables").map(|c| c.label.as_str()), Some("Cables & Chargers"));
        assert!(catalog.get("toasters").is_none());
    }

    #[test]
    fn estimate_adds_bonus_only_when_scanned() {
        let catalog = CategoryCatalog::default();
        assert_eq!(catalog.estimate(Some("monitors"), true), 160);
        assert_eq!(catalog.estimate(Some("monitors"), false), 150);
    }

    #[test]
    fn estimate_saturates_on_large_configured_values() {
        let catalog = CategoryCatalog::new(vec![Category::new("mainframes", "Mainframes", u32::MAX)], 10);
        assert_eq!(catalog.estimate(Some("mainframes"), true), u32::MAX);
    }

    #[test]
    fn estimate_without_category_is_bonus_or_zero() {
        let catalog = CategoryCatalog::new(default_categories(), 25);
        assert_eq!(catalog.estimate(None, false), 0);
        assert_eq!(catalog.estimate(None, true), 25);
        assert_eq!(catalog.estimate(Some("unknown"), false), 0);
    }
}
