use crate::core::Catalog;
use crate::domain::model::{
    Category, FilterCriteria, ServiceListing, MAX_HOURLY_RATE_BOUND, MAX_RATING,
};

/// 服務列表頁的狀態：每次條件變動都重新篩選
#[derive(Debug, Clone)]
pub struct ServicesView {
    catalog: Catalog,
    criteria: FilterCriteria,
    matches: Vec<usize>,
}

impl ServicesView {
    pub fn new(catalog: Catalog) -> Self {
        let mut view = Self {
            catalog,
            criteria: FilterCriteria::default(),
            matches: Vec::new(),
        };
        view.recompute();
        view
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn results(&self) -> Vec<&ServiceListing> {
        let listings = self.catalog.listings();
        self.matches.iter().map(|&i| &listings[i]).collect()
    }

    /// The page shows its "no services found" message in this case.
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn has_active_filters(&self) -> bool {
        self.criteria.is_active()
    }

    pub fn locations(&self) -> Vec<&str> {
        self.catalog.locations()
    }

    pub fn categories(&self) -> &'static [Category] {
        self.catalog.categories()
    }

    pub fn set_search(&mut self, search: impl Into<String>) {
        self.criteria.search = search.into();
        self.recompute();
    }

    pub fn set_category(&mut self, category: Option<Category>) {
        self.criteria.category = category;
        self.recompute();
    }

    pub fn set_location(&mut self, location: Option<String>) {
        self.criteria.location = location.filter(|l| !l.is_empty());
        self.recompute();
    }

    pub fn set_min_rating(&mut self, rating: u8) {
        self.criteria.min_rating = rating.min(MAX_RATING);
        self.recompute();
    }

    pub fn set_max_hourly_rate(&mut self, hours: u32) {
        self.criteria.max_hourly_rate = hours.clamp(1, MAX_HOURLY_RATE_BOUND);
        self.recompute();
    }

    pub fn set_criteria(&mut self, criteria: FilterCriteria) {
        self.criteria = criteria;
        self.recompute();
    }

    pub fn clear_filters(&mut self) {
        self.criteria.clear();
        self.recompute();
    }

    fn recompute(&mut self) {
        let criteria = &self.criteria;
        self.matches = self
            .catalog
            .listings()
            .iter()
            .enumerate()
            .filter(|(_, listing)| criteria.matches(listing))
            .map(|(i, _)| i)
            .collect();
        tracing::debug!(
            "Filter matched {} of {} services",
            self.matches.len(),
            self.catalog.len()
        );
    }
}
