use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A domain name listed for sale. Read-only from the client's perspective.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Domain {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub registrar: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Image URLs (Cloudinary in production)
    #[serde(default)]
    pub image: Vec<String>,
    pub price: f64,
    /// The pre-discount price shown struck through
    #[serde(rename = "Actualprice", default)]
    pub actual_price: Option<f64>,
    #[serde(default)]
    pub is_available: bool,
    #[serde(default)]
    pub is_sold: bool,
    #[serde(default)]
    pub is_hot: bool,
    #[serde(default)]
    pub featured: bool,
    /// Listing category, e.g. "aged" or "traffic"
    #[serde(rename = "type", default)]
    pub domain_type: Option<String>,
    #[serde(default)]
    pub metrics: DomainMetrics,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Domain {
    /// The TLD including its leading dot, lowercased (`"Example.COM"` -> `".com"`).
    pub fn tld(&self) -> Option<String> {
        self.name.rfind('.').map(|idx| self.name[idx..].to_lowercase())
    }
}

/// SEO metrics attached to a domain. Any field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainMetrics {
    pub domain_rank: Option<f64>,
    pub referring_domains: Option<f64>,
    pub authority_links_count: Option<f64>,
    pub domain_authority: Option<f64>,
    pub score: Option<f64>,
    pub trust_flow: Option<f64>,
    pub citation_flow: Option<f64>,
    /// `null` on the wire when the backend has no traffic data
    pub monthly_traffic: Option<f64>,
    pub age: Option<f64>,
    pub year: Option<i32>,
    pub language: Option<String>,
}

/// The numeric metrics a filter or sort key can address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    DomainRank,
    ReferringDomains,
    AuthorityLinks,
    DomainAuthority,
    Score,
    TrustFlow,
    CitationFlow,
    MonthlyTraffic,
    Age,
}

impl DomainMetrics {
    pub fn get(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::DomainRank => self.domain_rank,
            Metric::ReferringDomains => self.referring_domains,
            Metric::AuthorityLinks => self.authority_links_count,
            Metric::DomainAuthority => self.domain_authority,
            Metric::Score => self.score,
            Metric::TrustFlow => self.trust_flow,
            Metric::CitationFlow => self.citation_flow,
            Metric::MonthlyTraffic => self.monthly_traffic,
            Metric::Age => self.age,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_backend_document() {
        let json = serde_json::json!({
            "_id": "665f1c",
            "name": "OldSite.COM",
            "description": "Aged domain with backlinks",
            "tags": ["tech"],
            "price": 250.0,
            "Actualprice": 400.0,
            "isAvailable": true,
            "isSold": false,
            "isHot": true,
            "type": "aged",
            "metrics": { "domainRank": 41.0, "monthlyTraffic": null, "year": 2009 },
            "createdAt": "2024-03-01T10:00:00Z"
        });
        let domain: Domain = serde_json::from_value(json).unwrap();
        assert_eq!(domain.id, "665f1c");
        assert_eq!(domain.actual_price, Some(400.0));
        assert_eq!(domain.domain_type.as_deref(), Some("aged"));
        assert_eq!(domain.metrics.get(Metric::DomainRank), Some(41.0));
        assert_eq!(domain.metrics.get(Metric::MonthlyTraffic), None);
        assert_eq!(domain.metrics.year, Some(2009));
        assert_eq!(domain.tld().as_deref(), Some(".com"));
        assert!(domain.image.is_empty());
    }
}
