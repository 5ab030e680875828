use ald_core::{Facility, GeoPoint, DEFAULT_MAP_CENTER};

use super::*;

const ANNAPOLIS: GeoPoint = GeoPoint {
    lat: 38.978_4,
    lng: -76.492_2,
};

fn facility(id: &str, city: &str, county: &str, zip: &str) -> Facility {
    let mut f = Facility::new(id);
    f.city = Some(city.to_owned());
    f.county = Some(county.to_owned());
    f.zip = Some(zip.to_owned());
    f
}

fn at(mut f: Facility, point: GeoPoint) -> Facility {
    f.lat = Some(point.lat);
    f.lng = Some(point.lng);
    f
}

fn ids(result: &[&Facility]) -> Vec<String> {
    result.iter().map(|f| f.id.clone()).collect()
}

fn sample() -> Vec<Facility> {
    let mut towson = facility("towson", "Towson", "Baltimore County", "21204");
    towson.medicaid_certified = Some("yes".to_owned());
    towson.sals_certified = Some("no".to_owned());

    let mut annapolis = at(
        facility("annapolis", "Annapolis", "Anne Arundel", "21401"),
        ANNAPOLIS,
    );
    annapolis.sals_certified = Some(" YES ".to_owned());

    let mut city = at(
        facility("city", "Baltimore", "Baltimore City", "21201"),
        DEFAULT_MAP_CENTER,
    );
    city.medicaid_certified = Some("Yes".to_owned());
    city.sals_certified = Some("yes".to_owned());

    vec![towson, annapolis, city]
}

#[test]
fn empty_query_passes_everything() {
    let facilities = sample();
    let result = filter_facilities(&facilities, "", &FilterState::default(), None);
    assert_eq!(ids(&result), ["towson", "annapolis", "city"]);

    let result = filter_facilities(&facilities, "   ", &FilterState::default(), None);
    assert_eq!(result.len(), 3);
}

#[test]
fn query_matches_city_county_or_zip_case_insensitively() {
    let facilities = sample();
    let filters = FilterState::default();

    assert_eq!(
        ids(&filter_facilities(&facilities, "ANNAP", &filters, None)),
        ["annapolis"]
    );
    assert_eq!(
        ids(&filter_facilities(&facilities, "baltimore", &filters, None)),
        ["towson", "city"]
    );
    assert_eq!(
        ids(&filter_facilities(&facilities, "2140", &filters, None)),
        ["annapolis"]
    );
    assert!(filter_facilities(&facilities, "Frederick", &filters, None).is_empty());
}

#[test]
fn query_ignores_surrounding_whitespace() {
    let facilities = sample();
    let result = filter_facilities(&facilities, "  towson ", &FilterState::default(), None);
    assert_eq!(ids(&result), ["towson"]);
}

#[test]
fn missing_text_fields_do_not_match_but_do_not_panic() {
    let facilities = vec![Facility::new("bare")];
    assert!(filter_facilities(&facilities, "x", &FilterState::default(), None).is_empty());
    assert_eq!(
        filter_facilities(&facilities, "", &FilterState::default(), None).len(),
        1
    );
}

#[test]
fn certification_flags_filter_independently() {
    let facilities = sample();

    let medicaid = FilterState {
        medicaid_certified: true,
        ..FilterState::default()
    };
    assert_eq!(
        ids(&filter_facilities(&facilities, "", &medicaid, None)),
        ["towson", "city"]
    );

    let sals = FilterState {
        sals_certified: true,
        ..FilterState::default()
    };
    assert_eq!(
        ids(&filter_facilities(&facilities, "", &sals, None)),
        ["annapolis", "city"]
    );

    let both = FilterState {
        medicaid_certified: true,
        sals_certified: true,
        ..FilterState::default()
    };
    assert_eq!(ids(&filter_facilities(&facilities, "", &both, None)), ["city"]);
}

#[test]
fn zero_radius_ignores_reference_point() {
    let facilities = sample();
    let filters = FilterState::default();

    let without = filter_facilities(&facilities, "", &filters, None);
    let baltimore = filter_facilities(&facilities, "", &filters, Some(DEFAULT_MAP_CENTER));
    let far_away = filter_facilities(
        &facilities,
        "",
        &filters,
        Some(GeoPoint::new(-33.87, 151.21)),
    );

    assert_eq!(ids(&without), ids(&baltimore));
    assert_eq!(ids(&without), ids(&far_away));
}

#[test]
fn radius_drops_facilities_without_coordinates() {
    let facilities = sample();
    let filters = FilterState {
        radius_miles: 500,
        ..FilterState::default()
    };

    let result = filter_facilities(&facilities, "", &filters, Some(DEFAULT_MAP_CENTER));
    assert_eq!(ids(&result), ["annapolis", "city"]);
}

#[test]
fn junk_coordinates_count_as_missing() {
    let mut junk = facility("junk", "Baltimore", "Baltimore City", "21201");
    junk.lat = Some(f64::NAN);
    junk.lng = Some(-76.6);
    let mut half = facility("half", "Baltimore", "Baltimore City", "21201");
    half.lat = Some(39.29);
    let facilities = vec![junk, half];

    let radius = FilterState {
        radius_miles: 10,
        ..FilterState::default()
    };
    assert!(filter_facilities(&facilities, "", &radius, Some(DEFAULT_MAP_CENTER)).is_empty());
    assert_eq!(
        filter_facilities(&facilities, "", &FilterState::default(), Some(DEFAULT_MAP_CENTER))
            .len(),
        2
    );
}

#[test]
fn radius_keeps_only_facilities_inside_distance() {
    let facilities = sample();
    // Baltimore to Annapolis is roughly 22 miles.
    let near = FilterState {
        radius_miles: 10,
        ..FilterState::default()
    };
    let wide = FilterState {
        radius_miles: 30,
        ..FilterState::default()
    };

    assert_eq!(
        ids(&filter_facilities(&facilities, "", &near, Some(DEFAULT_MAP_CENTER))),
        ["city"]
    );
    assert_eq!(
        ids(&filter_facilities(&facilities, "", &wide, Some(DEFAULT_MAP_CENTER))),
        ["annapolis", "city"]
    );
}

#[test]
fn facility_at_reference_point_passes_any_radius() {
    let facilities = vec![at(Facility::new("here"), DEFAULT_MAP_CENTER)];
    for radius_miles in [0, 1, 25, 500] {
        let filters = FilterState {
            radius_miles,
            ..FilterState::default()
        };
        assert_eq!(
            filter_facilities(&facilities, "", &filters, Some(DEFAULT_MAP_CENTER)).len(),
            1,
            "radius {radius_miles}"
        );
    }
}

#[test]
fn radius_without_reference_point_is_not_applied() {
    let facilities = sample();
    let filters = FilterState {
        radius_miles: 1,
        ..FilterState::default()
    };
    assert_eq!(filter_facilities(&facilities, "", &filters, None).len(), 3);
}

#[test]
fn filtering_is_idempotent() {
    let facilities = sample();
    let filters = FilterState {
        radius_miles: 40,
        sals_certified: true,
        ..FilterState::default()
    };
    let first = ids(&filter_facilities(
        &facilities,
        "an",
        &filters,
        Some(DEFAULT_MAP_CENTER),
    ));
    let second = ids(&filter_facilities(
        &facilities,
        "an",
        &filters,
        Some(DEFAULT_MAP_CENTER),
    ));
    assert_eq!(first, second);
}

#[test]
fn filter_state_deserializes_partial_json() {
    let filters: FilterState =
        serde_json::from_str(r#"{ "radius_miles": 15 }"#).expect("filters");
    assert_eq!(
        filters,
        FilterState {
            radius_miles: 15,
            medicaid_certified: false,
            sals_certified: false,
        }
    );
}
