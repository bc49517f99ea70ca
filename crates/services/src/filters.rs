//! # Filter/Sort Engine
//!
//! Derives the listing view from the domain collection fetched at page load.
//! The source collection is never mutated: [`apply`] returns a new vector.
//!
//! Every predicate is independent and the result is their conjunction. A
//! domain that lacks a metric passes every range and threshold on that
//! metric; missing data is never grounds for exclusion.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use domains::{ActiveFilters, AppError, Availability, Bounds, Domain, DomainMetrics, DomainQuery, SortOption, ALL};

/// Filters then sorts a copy of `domains`.
pub fn apply(domains: &[Domain], query: &DomainQuery) -> Vec<Domain> {
    let mut view: Vec<Domain> = domains
        .iter()
        .filter(|d| matches(d, &query.filters, &query.search))
        .cloned()
        .collect();
    sort_domains(&mut view, query.sort);
    tracing::debug!(
        total = domains.len(),
        shown = view.len(),
        sort = %query.sort,
        "applied domain filters"
    );
    view
}

pub fn matches(domain: &Domain, filters: &ActiveFilters, search: &str) -> bool {
    matches_search(domain, search)
        && filters.price_range.map_or(true, |range| range.contains(domain.price))
        && matches_tld(domain, &filters.tlds)
        && matches_availability(domain, filters.availability)
        && matches_type(domain, &filters.domain_type)
        && matches_tags(domain, &filters.tags)
        && (!filters.is_hot || domain.is_hot)
        && matches_metrics(&domain.metrics, filters)
}

fn matches_search(domain: &Domain, search: &str) -> bool {
    let needle = search.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    domain.name.to_lowercase().contains(&needle) || domain.description.to_lowercase().contains(&needle)
}

fn matches_tld(domain: &Domain, tlds: &[String]) -> bool {
    if tlds.is_empty() {
        return true;
    }
    let name = domain.name.to_lowercase();
    tlds.iter().any(|tld| name.ends_with(&normalize_tld(tld)))
}

/// `"COM"` and `".com"` both select `.com`.
pub fn normalize_tld(tld: &str) -> String {
    let tld = tld.trim().to_lowercase();
    if tld.starts_with('.') {
        tld
    } else {
        format!(".{tld}")
    }
}

fn matches_availability(domain: &Domain, availability: Availability) -> bool {
    match availability {
        Availability::All => true,
        Availability::Available => domain.is_available && !domain.is_sold,
        Availability::Sold => domain.is_sold,
    }
}

fn matches_type(domain: &Domain, domain_type: &str) -> bool {
    domain_type == ALL || domain.domain_type.as_deref() == Some(domain_type)
}

fn matches_tags(domain: &Domain, tags: &[String]) -> bool {
    tags.is_empty() || domain.tags.iter().any(|t| tags.contains(t))
}

fn matches_metrics(metrics: &DomainMetrics, filters: &ActiveFilters) -> bool {
    let ranges_ok = filters
        .metric_ranges()
        .iter()
        .all(|(metric, bounds)| metrics.get(*metric).map_or(true, |v| bounds.contains(v)));
    ranges_ok
        && filters
            .thresholds()
            .all(|(metric, min)| metrics.get(metric).map_or(true, |v| v >= min))
}

/// Sorts in place. Ties on the chosen key fall back to `_id` ascending, so the
/// order is fully deterministic.
pub fn sort_domains(domains: &mut [Domain], sort: SortOption) {
    domains.sort_by(|a, b| compare(a, b, sort).then_with(|| a.id.cmp(&b.id)));
}

fn compare(a: &Domain, b: &Domain, sort: SortOption) -> Ordering {
    match sort {
        SortOption::PriceAsc => a.price.total_cmp(&b.price),
        SortOption::PriceDesc => b.price.total_cmp(&a.price),
        SortOption::Newest => match (a.created_at, b.created_at) {
            (Some(x), Some(y)) => y.cmp(&x),
            (x, y) => missing_last(x.is_some(), y.is_some()),
        },
        SortOption::Oldest => match (a.created_at, b.created_at) {
            (Some(x), Some(y)) => x.cmp(&y),
            (x, y) => missing_last(x.is_some(), y.is_some()),
        },
        metric_key => match metric_key.metric() {
            Some(metric) => {
                let av = a.metrics.get(metric).unwrap_or(0.0);
                let bv = b.metrics.get(metric).unwrap_or(0.0);
                bv.total_cmp(&av)
            }
            None => Ordering::Equal,
        },
    }
}

fn missing_last(a_present: bool, b_present: bool) -> Ordering {
    b_present.cmp(&a_present)
}

/// Every tag used in the collection, sorted and deduplicated.
pub fn available_tags(domains: &[Domain]) -> Vec<String> {
    domains
        .iter()
        .flat_map(|d| d.tags.iter().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Upper end for the price slider: the most expensive listing, or 0 when empty.
pub fn price_ceiling(domains: &[Domain]) -> f64 {
    domains.iter().map(|d| d.price).fold(0.0, f64::max)
}

/// Builds the price range from optional slider ends. A missing upper end
/// follows `ceiling`, never dropping below the chosen lower end.
pub fn price_bounds(min: Option<f64>, max: Option<f64>, ceiling: f64) -> Result<Option<Bounds>, AppError> {
    if min.is_none() && max.is_none() {
        return Ok(None);
    }
    let min = min.unwrap_or(0.0);
    let max = max.unwrap_or_else(|| ceiling.max(min));
    Bounds::new(min, max).map(Some)
}
