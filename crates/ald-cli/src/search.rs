//! One-shot search: the same pipeline a browser session runs, printed as
//! JSON.

use ald_core::{AppConfig, GeoPoint};
use ald_search::{submit_query, FilterState, SearchSession};
use ald_store::FacilityStore;
use tokio::sync::Mutex;

use crate::{build_backend, build_geocoder, print_json};

#[derive(Debug)]
pub(crate) struct SearchArgs {
    pub query: Option<String>,
    pub radius: u32,
    pub medicaid: bool,
    pub sals: bool,
    pub pages: usize,
    pub location: Option<(f64, f64)>,
}

impl SearchArgs {
    fn filters(&self) -> FilterState {
        FilterState {
            radius_miles: self.radius,
            medicaid_certified: self.medicaid,
            sals_certified: self.sals,
        }
    }

    fn reference_point(&self) -> anyhow::Result<Option<GeoPoint>> {
        let Some((lat, lng)) = self.location else {
            return Ok(None);
        };
        GeoPoint::checked(lat, lng).map(Some).ok_or_else(|| {
            anyhow::anyhow!("--lat must be within [-90, 90] and --lng within [-180, 180]")
        })
    }
}

pub(crate) async fn run_search(config: &AppConfig, args: &SearchArgs) -> anyhow::Result<()> {
    let reference = args.reference_point()?;
    let backend = build_backend(config)?;
    let geocoder = build_geocoder(config)?;

    let facilities = backend.list_facilities().await?;
    tracing::info!(count = facilities.len(), "search: loaded facilities");

    let mut session = SearchSession::with_page_size(facilities, config.search_page_size);
    session.set_filters(args.filters());
    let session = Mutex::new(session);

    if let Some(query) = args.query.as_deref() {
        submit_query(&session, &geocoder, query).await;
    }

    let mut session = session.into_inner();
    // An explicit location wins over whatever the query geocoded to.
    if let Some(point) = reference {
        session.set_user_location(point);
    }
    for _ in 1..args.pages {
        if !session.load_more() {
            break;
        }
    }

    let view = session.view();
    if let Some(notice) = view.notice.as_deref() {
        tracing::warn!(notice, "search: distance filtering unavailable");
    }
    print_json(&view)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(location: Option<(f64, f64)>) -> SearchArgs {
        SearchArgs {
            query: None,
            radius: 5,
            medicaid: true,
            sals: false,
            pages: 1,
            location,
        }
    }

    #[test]
    fn filters_follow_flags() {
        let filters = args(None).filters();
        assert_eq!(filters.radius_miles, 5);
        assert!(filters.medicaid_certified);
        assert!(!filters.sals_certified);
    }

    #[test]
    fn reference_point_is_validated() {
        assert_eq!(args(None).reference_point().expect("none"), None);
        assert_eq!(
            args(Some((39.0, -76.5))).reference_point().expect("valid"),
            Some(GeoPoint::new(39.0, -76.5))
        );
        assert!(args(Some((91.0, 0.0))).reference_point().is_err());
    }
}
