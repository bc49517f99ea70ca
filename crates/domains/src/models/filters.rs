use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::Metric;

/// An inclusive `[min, max]` range. Serialized as a two-element array.
///
/// Construction and deserialization both reject `min > max` and NaN bounds,
/// so a `Bounds` value always satisfies `min <= max`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "(f64, f64)", into = "(f64, f64)")]
pub struct Bounds {
    min: f64,
    max: f64,
}

impl Bounds {
    pub fn new(min: f64, max: f64) -> Result<Self, AppError> {
        if min.is_nan() || max.is_nan() {
            return Err(AppError::Validation("range bounds must be numbers".into()));
        }
        if min > max {
            return Err(AppError::Validation(format!(
                "range lower bound {min} exceeds upper bound {max}"
            )));
        }
        Ok(Self { min, max })
    }

    /// Builds a range from two slider handles in either order.
    pub fn ordered(a: f64, b: f64) -> Self {
        if a <= b {
            Self { min: a, max: b }
        } else {
            Self { min: b, max: a }
        }
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

impl TryFrom<(f64, f64)> for Bounds {
    type Error = AppError;

    fn try_from((min, max): (f64, f64)) -> Result<Self, Self::Error> {
        Bounds::new(min, max)
    }
}

impl From<Bounds> for (f64, f64) {
    fn from(b: Bounds) -> Self {
        (b.min, b.max)
    }
}

pub const DEFAULT_SCORE_RANGE: Bounds = Bounds { min: 0.0, max: 100.0 };

/// The value the type and availability filters use to mean "no constraint".
pub const ALL: &str = "all";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Availability {
    #[default]
    All,
    Available,
    Sold,
}

/// The full filter specification applied to the domain listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ActiveFilters {
    /// `None` means any price; listings have no fixed upper bound.
    pub price_range: Option<Bounds>,
    pub domain_rank: Bounds,
    pub domain_authority: Bounds,
    pub score: Bounds,
    pub trust_flow: Bounds,
    pub citation_flow: Bounds,
    /// `None` means unconstrained, never zero.
    pub min_age: Option<f64>,
    pub min_referring_domains: Option<f64>,
    pub min_authority_links: Option<f64>,
    pub min_monthly_traffic: Option<f64>,
    pub availability: Availability,
    #[serde(rename = "type")]
    pub domain_type: String,
    pub tlds: Vec<String>,
    pub tags: Vec<String>,
    pub is_hot: bool,
}

impl Default for ActiveFilters {
    fn default() -> Self {
        Self {
            price_range: None,
            domain_rank: DEFAULT_SCORE_RANGE,
            domain_authority: DEFAULT_SCORE_RANGE,
            score: DEFAULT_SCORE_RANGE,
            trust_flow: DEFAULT_SCORE_RANGE,
            citation_flow: DEFAULT_SCORE_RANGE,
            min_age: None,
            min_referring_domains: None,
            min_authority_links: None,
            min_monthly_traffic: None,
            availability: Availability::All,
            domain_type: ALL.to_string(),
            tlds: Vec::new(),
            tags: Vec::new(),
            is_hot: false,
        }
    }
}

impl ActiveFilters {
    /// The metric ranges, paired with the metric each one constrains.
    pub fn metric_ranges(&self) -> [(Metric, Bounds); 5] {
        [
            (Metric::DomainRank, self.domain_rank),
            (Metric::DomainAuthority, self.domain_authority),
            (Metric::Score, self.score),
            (Metric::TrustFlow, self.trust_flow),
            (Metric::CitationFlow, self.citation_flow),
        ]
    }

    /// The minimum thresholds that are set, paired with their metric.
    pub fn thresholds(&self) -> impl Iterator<Item = (Metric, f64)> {
        [
            (Metric::Age, self.min_age),
            (Metric::ReferringDomains, self.min_referring_domains),
            (Metric::AuthorityLinks, self.min_authority_links),
            (Metric::MonthlyTraffic, self.min_monthly_traffic),
        ]
        .into_iter()
        .filter_map(|(metric, min)| min.map(|m| (metric, m)))
    }

    /// Checks the invariants a deserialized or hand-built value must hold.
    pub fn validate(&self) -> Result<(), AppError> {
        let ranges = self.price_range.into_iter().chain(self.metric_ranges().map(|(_, b)| b));
        for range in ranges {
            Bounds::new(range.min(), range.max())?;
        }
        for (metric, min) in self.thresholds() {
            if min.is_nan() || min < 0.0 {
                return Err(AppError::Validation(format!(
                    "minimum for {metric:?} must be a non-negative number"
                )));
            }
        }
        if self.domain_type.trim().is_empty() {
            return Err(AppError::Validation("type filter must not be empty".into()));
        }
        Ok(())
    }
}

/// The sort keys offered by the listing page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortOption {
    PriceAsc,
    PriceDesc,
    #[default]
    Newest,
    Oldest,
    DomainRankDesc,
    DomainAuthorityDesc,
    ScoreDesc,
    TrustFlowDesc,
    CitationFlowDesc,
    ReferringDomainsDesc,
    AuthorityLinksDesc,
    MonthlyTrafficDesc,
}

impl SortOption {
    pub const ALL: [SortOption; 12] = [
        SortOption::PriceAsc,
        SortOption::PriceDesc,
        SortOption::Newest,
        SortOption::Oldest,
        SortOption::DomainRankDesc,
        SortOption::DomainAuthorityDesc,
        SortOption::ScoreDesc,
        SortOption::TrustFlowDesc,
        SortOption::CitationFlowDesc,
        SortOption::ReferringDomainsDesc,
        SortOption::AuthorityLinksDesc,
        SortOption::MonthlyTrafficDesc,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortOption::PriceAsc => "price-asc",
            SortOption::PriceDesc => "price-desc",
            SortOption::Newest => "newest",
            SortOption::Oldest => "oldest",
            SortOption::DomainRankDesc => "domain-rank-desc",
            SortOption::DomainAuthorityDesc => "domain-authority-desc",
            SortOption::ScoreDesc => "score-desc",
            SortOption::TrustFlowDesc => "trust-flow-desc",
            SortOption::CitationFlowDesc => "citation-flow-desc",
            SortOption::ReferringDomainsDesc => "referring-domains-desc",
            SortOption::AuthorityLinksDesc => "authority-links-desc",
            SortOption::MonthlyTrafficDesc => "monthly-traffic-desc",
        }
    }

    /// The metric a "metric-desc" key orders by.
    pub fn metric(&self) -> Option<Metric> {
        match self {
            SortOption::DomainRankDesc => Some(Metric::DomainRank),
            SortOption::DomainAuthorityDesc => Some(Metric::DomainAuthority),
            SortOption::ScoreDesc => Some(Metric::Score),
            SortOption::TrustFlowDesc => Some(Metric::TrustFlow),
            SortOption::CitationFlowDesc => Some(Metric::CitationFlow),
            SortOption::ReferringDomainsDesc => Some(Metric::ReferringDomains),
            SortOption::AuthorityLinksDesc => Some(Metric::AuthorityLinks),
            SortOption::MonthlyTrafficDesc => Some(Metric::MonthlyTraffic),
            _ => None,
        }
    }
}

impl fmt::Display for SortOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOption {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SortOption::ALL
            .into_iter()
            .find(|opt| opt.as_str() == s)
            .ok_or_else(|| AppError::Validation(format!("unknown sort option '{s}'")))
    }
}

/// Everything needed to derive one listing view from the fetched collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DomainQuery {
    pub filters: ActiveFilters,
    pub search: String,
    pub sort: SortOption,
}

/// A named, persisted snapshot of [`ActiveFilters`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedFilter {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub filters: ActiveFilters,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSavedFilter {
    pub user_id: String,
    pub name: String,
    pub filters: ActiveFilters,
}
