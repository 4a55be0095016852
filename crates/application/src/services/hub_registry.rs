//! Hub registry
//!
//! Static catalog of named transit hubs plus the geographic relevance filter
//! that turns them into meeting-point candidates for a pair of locations.

use domain::{Candidate, Coordinate, Hub, ImportanceTier};
use tracing::debug;

/// Default number of hub candidates evaluated per resolution
pub const DEFAULT_MAX_HUB_CANDIDATES: usize = 5;

/// A hub is relevant only if it is closer to each party than this fraction
/// of the distance between the parties
pub const RELEVANCE_FACTOR: f64 = 0.8;

/// (name, latitude, longitude, tier)
type HubEntry = (&'static str, f64, f64, ImportanceTier);

const BUILTIN_HUBS: &[HubEntry] = &[
    // New York
    ("34 St-Herald Sq", 40.7496, -73.9877, ImportanceTier::Major),
    ("Penn Station", 40.7506, -73.9935, ImportanceTier::Major),
    ("Grand Central-42 St", 40.7527, -73.9772, ImportanceTier::Major),
    ("Times Sq-42 St", 40.7553, -73.9869, ImportanceTier::Major),
    ("Fulton St", 40.7102, -74.0079, ImportanceTier::Major),
    ("Atlantic Av-Barclays Ctr", 40.6843, -73.9778, ImportanceTier::Major),
    ("59 St-Columbus Circle", 40.7681, -73.9819, ImportanceTier::Major),
    ("Jackson Hts-Roosevelt Av", 40.7466, -73.8912, ImportanceTier::Major),
    ("14 St-Union Sq", 40.7359, -73.9906, ImportanceTier::Major),
    ("23 St-Broadway", 40.7410, -73.9894, ImportanceTier::Secondary),
    ("23 St-Sixth Av", 40.7429, -73.9928, ImportanceTier::Secondary),
    ("42 St-Port Authority", 40.7570, -73.9903, ImportanceTier::Secondary),
    ("Lexington Av/59 St", 40.7625, -73.9676, ImportanceTier::Secondary),
    ("14 St-Eighth Av", 40.7403, -74.0021, ImportanceTier::Secondary),
    ("28 St-Broadway", 40.7454, -73.9880, ImportanceTier::Local),
    ("28 St-Seventh Av", 40.7475, -73.9936, ImportanceTier::Local),
    ("42 St-Bryant Park", 40.7542, -73.9845, ImportanceTier::Local),
    // Berlin
    ("Berlin Hauptbahnhof", 52.5251, 13.3694, ImportanceTier::Major),
    ("Alexanderplatz", 52.5219, 13.4132, ImportanceTier::Major),
    ("Friedrichstraße", 52.5203, 13.3865, ImportanceTier::Major),
    ("Zoologischer Garten", 52.5069, 13.3323, ImportanceTier::Major),
    ("Südkreuz", 52.4753, 13.3655, ImportanceTier::Major),
    ("Ostkreuz", 52.5030, 13.4691, ImportanceTier::Major),
    ("Gesundbrunnen", 52.5486, 13.3886, ImportanceTier::Major),
    ("Potsdamer Platz", 52.5096, 13.3760, ImportanceTier::Secondary),
    ("Hermannplatz", 52.4866, 13.4247, ImportanceTier::Secondary),
    ("Warschauer Straße", 52.5056, 13.4497, ImportanceTier::Secondary),
    ("Westkreuz", 52.5011, 13.2834, ImportanceTier::Secondary),
    ("Kottbusser Tor", 52.4991, 13.4180, ImportanceTier::Local),
    // London
    ("King's Cross St Pancras", 51.5308, -0.1238, ImportanceTier::Major),
    ("Waterloo", 51.5031, -0.1132, ImportanceTier::Major),
    ("London Bridge", 51.5050, -0.0865, ImportanceTier::Major),
    ("Liverpool Street", 51.5178, -0.0823, ImportanceTier::Major),
    ("Bank", 51.5133, -0.0886, ImportanceTier::Major),
    ("Victoria", 51.4965, -0.1447, ImportanceTier::Major),
    ("Paddington", 51.5154, -0.1755, ImportanceTier::Major),
    ("Stratford", 51.5416, -0.0033, ImportanceTier::Major),
    ("Oxford Circus", 51.5152, -0.1419, ImportanceTier::Secondary),
    ("Green Park", 51.5067, -0.1428, ImportanceTier::Secondary),
    ("Farringdon", 51.5203, -0.1053, ImportanceTier::Secondary),
    ("Leicester Square", 51.5113, -0.1281, ImportanceTier::Local),
];

/// Catalog of known hubs
#[derive(Debug, Clone, Default)]
pub struct HubRegistry {
    hubs: Vec<Hub>,
}

impl HubRegistry {
    /// Create a registry from an explicit hub list
    #[must_use]
    pub const fn new(hubs: Vec<Hub>) -> Self {
        Self { hubs }
    }

    /// Registry populated with the built-in New York, Berlin and London hubs
    #[must_use]
    pub fn builtin() -> Self {
        let hubs = BUILTIN_HUBS
            .iter()
            .map(|&(name, lat, lon, tier)| Hub::new(name, Coordinate::new_unchecked(lat, lon), tier))
            .collect();
        Self { hubs }
    }

    /// Add further hubs (e.g. from configuration)
    #[must_use]
    pub fn with_hubs(mut self, extra: impl IntoIterator<Item = Hub>) -> Self {
        self.hubs.extend(extra);
        self
    }

    /// All hubs in catalog order
    #[must_use]
    pub fn hubs(&self) -> &[Hub] {
        &self.hubs
    }

    /// Number of hubs
    #[must_use]
    pub fn len(&self) -> usize {
        self.hubs.len()
    }

    /// Whether the catalog is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hubs.is_empty()
    }

    /// Hubs lying between `a` and `b`, best first, at most `max` entries
    #[must_use]
    pub fn filter_relevant(&self, a: Coordinate, b: Coordinate, max: usize) -> Vec<Candidate> {
        filter_relevant(&self.hubs, a, b, max)
    }
}

/// Select the hubs that lie between two parties
///
/// A hub is kept when it is closer than [`RELEVANCE_FACTOR`] times the
/// party distance to both parties. Survivors are ordered by tier
/// (most important first), then by combined distance to both parties, then
/// by name so the order is deterministic. An empty result is valid.
#[must_use]
pub fn filter_relevant(hubs: &[Hub], a: Coordinate, b: Coordinate, max: usize) -> Vec<Candidate> {
    let limit = RELEVANCE_FACTOR * a.distance_meters(&b);

    let mut relevant: Vec<(&Hub, f64)> = hubs
        .iter()
        .filter_map(|hub| {
            let da = a.distance_meters(&hub.coordinate);
            let db = b.distance_meters(&hub.coordinate);
            (da < limit && db < limit).then_some((hub, da + db))
        })
        .collect();

    relevant.sort_by(|(h1, d1), (h2, d2)| {
        h2.tier
            .cmp(&h1.tier)
            .then_with(|| d1.total_cmp(d2))
            .then_with(|| h1.name.cmp(&h2.name))
    });
    relevant.truncate(max);

    debug!(
        relevant = relevant.len(),
        catalog = hubs.len(),
        "Filtered hub candidates"
    );

    relevant.into_iter().map(|(hub, _)| hub.to_candidate()).collect()
}
