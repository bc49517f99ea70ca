//! # Filter panel state
//!
//! Owns the [`ActiveFilters`] the listing is derived from, and arbitrates
//! between the three writers: URL parameters (first mount only), prop-driven
//! updates from the parent view, and explicit user edits.
//!
//! A field seeded from the URL keeps its value across prop updates until the
//! user edits that field or clears the panel.

use domains::{ActiveFilters, Availability, Bounds, ALL};

/// Which fields currently hold a value taken from the URL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UrlSeeded {
    pub domain_type: bool,
    pub is_hot: bool,
}

impl UrlSeeded {
    pub fn any(&self) -> bool {
        self.domain_type || self.is_hot
    }
}

/// A single explicit edit made in the panel.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterChange {
    Price(Bounds),
    DomainRank(Bounds),
    DomainAuthority(Bounds),
    Score(Bounds),
    TrustFlow(Bounds),
    CitationFlow(Bounds),
    MinAge(Option<f64>),
    MinReferringDomains(Option<f64>),
    MinAuthorityLinks(Option<f64>),
    MinMonthlyTraffic(Option<f64>),
    Availability(Availability),
    Type(String),
    ToggleTld(String),
    ToggleTag(String),
    Hot(bool),
}

#[derive(Debug, Clone, Default)]
pub struct FilterPanel {
    filters: ActiveFilters,
    open: bool,
    mounted: bool,
    seeded: UrlSeeded,
}

impl FilterPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filters(&self) -> &ActiveFilters {
        &self.filters
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn url_seeded(&self) -> UrlSeeded {
        self.seeded
    }

    pub fn toggle_open(&mut self) {
        self.open = !self.open;
    }

    /// Applies `?aged=true`, `?traffic=true` and `?isHot=true` on first mount.
    ///
    /// `aged` takes precedence over `traffic` since both target the type
    /// filter. Any recognized parameter opens the panel. Calls after the first
    /// are ignored; returns whether anything was seeded.
    pub fn bootstrap(&mut self, query: &str) -> bool {
        if self.mounted {
            return false;
        }
        self.mounted = true;

        let query = query.trim_start_matches('?');
        let flag = |name: &str| {
            url::form_urlencoded::parse(query.as_bytes())
                .any(|(k, v)| k == name && v.eq_ignore_ascii_case("true"))
        };

        if flag("aged") {
            self.filters.domain_type = "aged".into();
            self.seeded.domain_type = true;
        } else if flag("traffic") {
            self.filters.domain_type = "traffic".into();
            self.seeded.domain_type = true;
        }
        if flag("isHot") {
            self.filters.is_hot = true;
            self.seeded.is_hot = true;
        }

        if self.seeded.any() {
            self.open = true;
            tracing::debug!(seeded = ?self.seeded, "filters seeded from url");
        }
        self.seeded.any()
    }

    /// Accepts filters pushed down by the parent view without clobbering
    /// fields the URL set.
    pub fn sync_from_props(&mut self, incoming: ActiveFilters) {
        let mut next = incoming;
        if self.seeded.domain_type {
            next.domain_type = self.filters.domain_type.clone();
        }
        if self.seeded.is_hot {
            next.is_hot = self.filters.is_hot;
        }
        self.filters = next;
    }

    /// An explicit user edit. Clears the URL flag of the field it touches.
    pub fn apply(&mut self, change: FilterChange) {
        let f = &mut self.filters;
        match change {
            FilterChange::Price(b) => f.price_range = Some(b),
            FilterChange::DomainRank(b) => f.domain_rank = b,
            FilterChange::DomainAuthority(b) => f.domain_authority = b,
            FilterChange::Score(b) => f.score = b,
            FilterChange::TrustFlow(b) => f.trust_flow = b,
            FilterChange::CitationFlow(b) => f.citation_flow = b,
            FilterChange::MinAge(v) => f.min_age = v,
            FilterChange::MinReferringDomains(v) => f.min_referring_domains = v,
            FilterChange::MinAuthorityLinks(v) => f.min_authority_links = v,
            FilterChange::MinMonthlyTraffic(v) => f.min_monthly_traffic = v,
            FilterChange::Availability(a) => f.availability = a,
            FilterChange::Type(t) => {
                f.domain_type = if t.trim().is_empty() { ALL.into() } else { t };
                self.seeded.domain_type = false;
            }
            FilterChange::ToggleTld(tld) => toggle(&mut f.tlds, tld),
            FilterChange::ToggleTag(tag) => toggle(&mut f.tags, tag),
            FilterChange::Hot(hot) => {
                f.is_hot = hot;
                self.seeded.is_hot = false;
            }
        }
    }

    /// Restores defaults and forgets where any value came from.
    pub fn clear_filters(&mut self) {
        self.filters = ActiveFilters::default();
        self.seeded = UrlSeeded::default();
    }

    /// Installs a saved snapshot wholesale; nothing is merged.
    pub fn load_saved(&mut self, filters: ActiveFilters) {
        self.filters = filters;
        self.seeded = UrlSeeded::default();
    }
}

fn toggle(list: &mut Vec<String>, value: String) {
    if let Some(idx) = list.iter().position(|v| *v == value) {
        list.remove(idx);
    } else {
        list.push(value);
    }
}
