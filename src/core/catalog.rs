use crate::domain::model::{Category, FilterCriteria, ServiceListing, MAX_RATING};
use crate::utils::error::{Result, WaqtiError};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

/// Keep every listing that satisfies all active criteria, in source order.
pub fn filter_listings<'a>(
    listings: &'a [ServiceListing],
    criteria: &FilterCriteria,
) -> Vec<&'a ServiceListing> {
    listings
        .iter()
        .filter(|listing| criteria.matches(listing))
        .collect()
}

/// 服務目錄：整個 session 期間不可變，複製只會增加參考計數
#[derive(Debug, Clone)]
pub struct Catalog {
    listings: Arc<[ServiceListing]>,
}

impl Catalog {
    pub fn new(listings: Vec<ServiceListing>) -> Result<Self> {
        validate_listings(&listings)?;
        Ok(Self {
            listings: listings.into(),
        })
    }

    pub fn builtin() -> Self {
        Self {
            listings: crate::data::builtin_listings().into(),
        }
    }

    /// 從 JSON 檔案載入目錄（陣列格式，欄位為 camelCase）
    pub async fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let listings: Vec<ServiceListing> = serde_json::from_str(content)?;
        Self::new(listings)
    }

    pub fn listings(&self) -> &[ServiceListing] {
        &self.listings
    }

    pub fn len(&self) -> usize {
        self.listings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&ServiceListing> {
        self.listings.iter().find(|listing| listing.id == id)
    }

    pub fn filter(&self, criteria: &FilterCriteria) -> Vec<&ServiceListing> {
        filter_listings(&self.listings, criteria)
    }

    pub fn categories(&self) -> &'static [Category] {
        &Category::ALL
    }

    /// Distinct locations in first-seen order.
    pub fn locations(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.listings
            .iter()
            .map(|listing| listing.location.as_str())
            .filter(|location| seen.insert(*location))
            .collect()
    }

    /// 評分最高的前 `limit` 筆；同分保持原順序
    pub fn popular(&self, limit: usize) -> Vec<&ServiceListing> {
        let mut ranked: Vec<&ServiceListing> = self.listings.iter().collect();
        ranked.sort_by(|a, b| b.rating.cmp(&a.rating));
        ranked.truncate(limit);
        ranked
    }
}

fn validate_listings(listings: &[ServiceListing]) -> Result<()> {
    let mut ids = HashSet::new();

    for listing in listings {
        if !ids.insert(listing.id.as_str()) {
            return Err(WaqtiError::CatalogError {
                message: format!("duplicate listing id '{}'", listing.id),
            });
        }
        if listing.rating > MAX_RATING {
            return Err(WaqtiError::CatalogError {
                message: format!(
                    "listing '{}' has rating {} outside 0..={}",
                    listing.id, listing.rating, MAX_RATING
                ),
            });
        }
        if listing.hourly_rate == 0 {
            return Err(WaqtiError::CatalogError {
                message: format!("listing '{}' must have a positive hourly rate", listing.id),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::ProviderRef;

    fn listing(id: &str, rating: u8, hourly_rate: u32, location: &str) -> ServiceListing {
        ServiceListing {
            id: id.to_string(),
            title: format!("Service {}", id),
            description: "Something useful".to_string(),
            category: Category::Other,
            hourly_rate,
            provider: ProviderRef {
                name: "Provider".to_string(),
                avatar: None,
            },
            rating,
            reviews: 0,
            location: location.to_string(),
            image: String::new(),
        }
    }

    #[test]
    fn test_min_rating_keeps_source_order() {
        let catalog = Catalog::new(vec![
            listing("a", 5, 1, "Riyadh"),
            listing("b", 3, 1, "Riyadh"),
            listing("c", 4, 1, "Riyadh"),
        ])
        .unwrap();

        let criteria = FilterCriteria {
            min_rating: 4,
            ..Default::default()
        };
        let ids: Vec<&str> = catalog.filter(&criteria).iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn test_empty_criteria_returns_everything() {
        let catalog = Catalog::builtin();
        let all = catalog.filter(&FilterCriteria::default());
        assert_eq!(all.len(), catalog.len());
        assert!(all.iter().zip(catalog.listings()).all(|(a, b)| std::ptr::eq(*a, b)));
    }

    #[test]
    fn test_locations_are_distinct_in_first_seen_order() {
        let catalog = Catalog::new(vec![
            listing("a", 1, 1, "Jeddah"),
            listing("b", 1, 1, "Riyadh"),
            listing("c", 1, 1, "Jeddah"),
        ])
        .unwrap();
        assert_eq!(catalog.locations(), vec!["Jeddah", "Riyadh"]);
    }

    #[test]
    fn test_popular_is_stable_for_ties() {
        let catalog = Catalog::new(vec![
            listing("a", 4, 1, "x"),
            listing("b", 5, 1, "x"),
            listing("c", 4, 1, "x"),
            listing("d", 5, 1, "x"),
        ])
        .unwrap();
        let ids: Vec<&str> = catalog.popular(3).iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "d", "a"]);
    }

    #[test]
    fn test_invalid_catalogs_are_rejected() {
        assert!(Catalog::new(vec![listing("a", 6, 1, "x")]).is_err());
        assert!(Catalog::new(vec![listing("a", 3, 0, "x")]).is_err());
        assert!(Catalog::new(vec![listing("a", 3, 1, "x"), listing("a", 3, 1, "y")]).is_err());
    }

    #[test]
    fn test_builtin_catalog_is_valid() {
        let catalog = Catalog::builtin();
        assert!(validate_listings(catalog.listings()).is_ok());
        assert!(catalog.get("1").is_some());
        assert!(catalog.get("missing").is_none());
    }

    #[test]
    fn test_from_json_str() {
        let json = r#"[{
            "id": "x1",
            "title": "Guitar Lessons",
            "description": "Acoustic guitar for beginners",
            "category": "music",
            "hourlyRate": 2,
            "provider": {"name": "Ali"},
            "rating": 4,
            "reviews": 3,
            "location": "Abha",
            "image": "guitar.jpg"
        }]"#;

        let catalog = Catalog::from_json_str(json).unwrap();
        let item = catalog.get("x1").unwrap();
        assert_eq!(item.category, Category::Music);
        assert_eq!(item.hourly_rate, 2);
        assert!(item.provider.avatar.is_none());
    }

    #[tokio::test]
    async fn test_from_json_file_reads_and_validates() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("catalog.json");
        tokio::fs::write(&path, r#"[{
            "id": "x1", "title": "Calligraphy", "description": "Naskh script",
            "category": "design", "hourlyRate": 1, "provider": {"name": "Huda"},
            "rating": 5, "reviews": 1, "location": "Taif", "image": ""
        }]"#)
        .await
        .unwrap();

        let catalog = Catalog::from_json_file(&path).await.unwrap();
        assert_eq!(catalog.len(), 1);

        let missing = Catalog::from_json_file(temp_dir.path().join("missing.json")).await;
        assert!(matches!(missing, Err(WaqtiError::IoError(_))));
    }
}
