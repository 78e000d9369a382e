//! Proximity between two countries, as a great-circle distance in km
//! between their shape centroids. The session engine treats this as an
//! opaque pure function.

use atlas_types::Country;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Scalar proximity between a guessed country and the answer. Zero when the
/// two are the same country, non-negative otherwise.
pub fn proximity(guess: &Country, answer: &Country) -> f64 {
    if guess.id == answer.id {
        return 0.0;
    }
    haversine_km(centroid(guess), centroid(answer))
}

/// Mean of all shape vertices. Coarse, but stable and cheap; country shapes
/// are simplified to begin with.
pub fn centroid(country: &Country) -> [f64; 2] {
    let mut lon = 0.0;
    let mut lat = 0.0;
    let mut count = 0usize;
    for ring in &country.shape {
        for point in ring {
            lon += point[0];
            lat += point[1];
            count += 1;
        }
    }
    if count == 0 {
        return [0.0, 0.0];
    }
    [lon / count as f64, lat / count as f64]
}

fn haversine_km(a: [f64; 2], b: [f64; 2]) -> f64 {
    let (lon_a, lat_a) = (a[0].to_radians(), a[1].to_radians());
    let (lon_b, lat_b) = (b[0].to_radians(), b[1].to_radians());
    let d_lat = lat_b - lat_a;
    let d_lon = lon_b - lon_a;
    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}
