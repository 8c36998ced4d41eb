//! Behavioural tests for the HTTP adapters.
//!
//! Each scenario points an adapter at a local listener serving a canned
//! response, so no external service is contacted.

mod support;

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use std::cell::RefCell;
use std::time::Duration;
use support::{Canned, CannedServer};
use tokio::runtime::Runtime;
use tripfare_core::{
    Coordinate, GeocodeQuery, GeocodingProvider, Place, ProviderError, RawRoute, RoutingProvider,
};
use tripfare_data::{
    NominatimGeocodingProvider, NominatimGeocodingProviderConfig, OsrmRoutingProvider,
    OsrmRoutingProviderConfig, PeliasGeocodingProvider, PeliasGeocodingProviderConfig,
};

const OSRM_ROUTE: &str = r#"{
    "code": "Ok",
    "routes": [{
        "distance": 12345.6,
        "duration": 3725.0,
        "geometry": {"type": "LineString", "coordinates": [[73.8567, 18.5204], [73.8743, 18.5286]]}
    }],
    "waypoints": []
}"#;

const OSRM_NO_ROUTE: &str = r#"{"code": "NoRoute", "message": "Impossible route between points"}"#;

const NOMINATIM_RESULTS: &str = r#"[
    {"lat": "18.5204", "lon": "73.8567", "name": "MG Road", "display_name": "MG Road, Camp, Pune"},
    {"lat": "18.5300", "lon": "73.8700", "name": "MG Road Metro", "display_name": "MG Road Metro, Pune"}
]"#;

const PELIAS_FEATURES: &str = r#"{
    "type": "FeatureCollection",
    "features": [{
        "type": "Feature",
        "geometry": {"type": "Point", "coordinates": [73.8567, 18.5204]},
        "properties": {"name": "MG Road", "label": "MG Road, Pune, MH, India"}
    }]
}"#;

/// State shared by the steps of one scenario.
struct AdapterWorld {
    server: RefCell<Option<CannedServer>>,
    route: RefCell<Option<Result<RawRoute, ProviderError>>>,
    places: RefCell<Option<Result<Vec<Place>, ProviderError>>>,
    runtime: Runtime,
}

impl AdapterWorld {
    fn serve(&self, canned: Canned) {
        *self.server.borrow_mut() = Some(CannedServer::start(&self.runtime, canned));
    }

    fn base_url(&self) -> String {
        self.server
            .borrow()
            .as_ref()
            .expect("server must be started")
            .base_url()
            .to_owned()
    }

    fn request_lines(&self) -> Vec<String> {
        self.server
            .borrow()
            .as_ref()
            .expect("server must be started")
            .request_lines()
    }

    fn search(&self, provider: &dyn GeocodingProvider) {
        let query = GeocodeQuery::new("MG Road", 5).with_country(Some("in".to_owned()));
        let places = self.runtime.block_on(provider.search(&query));
        *self.places.borrow_mut() = Some(places);
    }

    fn route_error(&self) -> ProviderError {
        self.route
            .borrow()
            .clone()
            .expect("a route must be requested")
            .expect_err("expected an error")
    }

    fn places_ok(&self) -> Vec<Place> {
        self.places
            .borrow()
            .clone()
            .expect("a search must be made")
            .expect("expected places")
    }
}

#[fixture]
fn world() -> AdapterWorld {
    AdapterWorld {
        server: RefCell::new(None),
        route: RefCell::new(None),
        places: RefCell::new(None),
        runtime: support::runtime(),
    }
}

fn coordinate(latitude: f64, longitude: f64) -> Coordinate {
    Coordinate::new(latitude, longitude).expect("valid coordinate")
}

// --- Given steps ---

#[given("an OSRM server returning one route")]
fn osrm_route(#[from(world)] world: &AdapterWorld) {
    world.serve(Canned::ok(OSRM_ROUTE));
}

#[given("an OSRM server answering NoRoute")]
fn osrm_no_route(#[from(world)] world: &AdapterWorld) {
    world.serve(Canned::ok(OSRM_NO_ROUTE));
}

#[given("an OSRM server that answers too slowly")]
fn osrm_slow(#[from(world)] world: &AdapterWorld) {
    world.serve(Canned::ok(OSRM_ROUTE).delayed(Duration::from_secs(5)));
}

#[given("a Nominatim server returning two results")]
fn nominatim_results(#[from(world)] world: &AdapterWorld) {
    world.serve(Canned::ok(NOMINATIM_RESULTS));
}

#[given("a Nominatim server answering 503")]
fn nominatim_outage(#[from(world)] world: &AdapterWorld) {
    world.serve(Canned::status(503, r#"{"error": "overloaded"}"#));
}

#[given("a Pelias server returning one feature")]
fn pelias_features(#[from(world)] world: &AdapterWorld) {
    world.serve(Canned::ok(PELIAS_FEATURES));
}

// --- When steps ---

#[when("I request a driving route")]
fn request_route(#[from(world)] world: &AdapterWorld) {
    let config = OsrmRoutingProviderConfig::new(world.base_url())
        .with_timeout(Duration::from_millis(300));
    let provider = OsrmRoutingProvider::with_config(config).expect("provider should build");
    let route = world.runtime.block_on(
        provider.route(coordinate(18.5204, 73.8567), coordinate(18.5286, 73.8743)),
    );
    *world.route.borrow_mut() = Some(route);
}

#[when("I search Nominatim for MG Road")]
fn search_nominatim(#[from(world)] world: &AdapterWorld) {
    let provider = NominatimGeocodingProvider::with_config(NominatimGeocodingProviderConfig::new(
        world.base_url(),
    ))
    .expect("provider should build");
    world.search(&provider);
}

#[when("I search Pelias for MG Road")]
fn search_pelias(#[from(world)] world: &AdapterWorld) {
    let provider = PeliasGeocodingProvider::with_config(
        PeliasGeocodingProviderConfig::new("test-key").with_base_url(world.base_url()),
    )
    .expect("provider should build");
    world.search(&provider);
}

// --- Then steps ---

#[then("the route is 12345.6 metres long with a two-point path")]
fn route_mapped(#[from(world)] world: &AdapterWorld) {
    let route = world
        .route
        .borrow()
        .clone()
        .expect("a route must be requested")
        .expect("expected a route");
    assert_eq!(route.distance_meters, 12345.6);
    assert_eq!(route.duration_seconds, 3725.0);
    assert_eq!(route.path.len(), 2);
}

#[then("the server saw a driving route request")]
fn saw_route_request(#[from(world)] world: &AdapterWorld) {
    let lines = world.request_lines();
    let line = lines.first().expect("one request");
    assert!(
        line.starts_with("GET /route/v1/driving/73.8567,18.5204;73.8743,18.5286?"),
        "unexpected request line {line}"
    );
    assert!(line.contains("geometries=geojson"));
}

#[then("a service error is returned")]
fn service_error(#[from(world)] world: &AdapterWorld) {
    let err = world.route_error();
    assert!(
        matches!(&err, ProviderError::ServiceError { code, .. } if code == "NoRoute"),
        "expected NoRoute service error, got {err:?}"
    );
}

#[then("a timeout error is returned")]
fn timeout_error(#[from(world)] world: &AdapterWorld) {
    let err = world.route_error();
    assert!(
        matches!(err, ProviderError::Timeout { .. }),
        "expected timeout, got {err:?}"
    );
}

#[then("two places are returned")]
fn two_places(#[from(world)] world: &AdapterWorld) {
    let places = world.places_ok();
    assert_eq!(places.len(), 2);
    assert_eq!(places[0].name, "MG Road");
}

#[then("one place is returned")]
fn one_place(#[from(world)] world: &AdapterWorld) {
    let places = world.places_ok();
    assert_eq!(places.len(), 1);
    assert_eq!(places[0].formatted_address, "MG Road, Pune, MH, India");
}

#[then("the server saw a jsonv2 search restricted to India")]
fn saw_nominatim_request(#[from(world)] world: &AdapterWorld) {
    let lines = world.request_lines();
    let line = lines.first().expect("one request");
    assert!(line.starts_with("GET /search?"), "unexpected request line {line}");
    assert!(line.contains("format=jsonv2"));
    assert!(line.contains("countrycodes=in"));
}

#[then("the server saw a Pelias search with the API key")]
fn saw_pelias_request(#[from(world)] world: &AdapterWorld) {
    let lines = world.request_lines();
    let line = lines.first().expect("one request");
    assert!(line.starts_with("GET /geocode/search?"), "unexpected request line {line}");
    assert!(line.contains("api_key=test-key"));
    assert!(line.contains("boundary.country=IN"));
}

#[then("an HTTP 503 error is returned")]
fn http_error(#[from(world)] world: &AdapterWorld) {
    let err = world
        .places
        .borrow()
        .clone()
        .expect("a search must be made")
        .expect_err("expected an error");
    assert!(
        matches!(err, ProviderError::HttpError { status: 503, .. }),
        "expected HTTP 503, got {err:?}"
    );
}

// --- Scenario registrations ---

macro_rules! register_scenario {
    ($fn_name:ident, $title:literal) => {
        #[scenario(path = "tests/features/http_adapters.feature", name = $title)]
        fn $fn_name(world: AdapterWorld) {
            let _ = world;
        }
    };
}

register_scenario!(
    osrm_route_is_mapped,
    "an OSRM route response is mapped onto a raw route"
);
register_scenario!(
    osrm_no_route_is_service_error,
    "an OSRM NoRoute answer is a service error"
);
register_scenario!(slow_osrm_times_out, "a slow OSRM server times out");
register_scenario!(
    nominatim_results_are_mapped,
    "Nominatim results are mapped onto places"
);
register_scenario!(
    nominatim_outage_is_http_error,
    "a Nominatim outage is an HTTP error"
);
register_scenario!(pelias_features_are_mapped, "Pelias features are mapped onto places");
