//! Vincenty's inverse formula on the WGS-84 ellipsoid.

use tracing::trace;

use super::haversine::haversine_km;

/// WGS-84 semi-major axis in metres.
const WGS84_A: f64 = 6_378_137.0;

/// WGS-84 flattening.
const WGS84_F: f64 = 1.0 / 298.257_223_563;

/// WGS-84 semi-minor axis in metres.
const WGS84_B: f64 = (1.0 - WGS84_F) * WGS84_A;

/// Convergence threshold on successive longitude-on-sphere estimates (radians).
const TOLERANCE: f64 = 1e-12;

/// Iteration cap. Nearly antipodal inputs converge slowly or not at all.
const MAX_ITERATIONS: usize = 200;

/// Ellipsoidal surface distance in kilometres, accurate to well under a metre.
///
/// Coordinate-identical inputs return exactly zero. If the iteration does
/// not converge within the cap, the last estimate is used; if that estimate
/// is not finite the spherical distance is returned instead.
///
/// # Example
///
/// ```
/// use route_server::geodesic::vincenty_km;
///
/// // Flinders Peak to Buninyong, the classic test pair.
/// let d = vincenty_km(-37.951_033_42, 144.424_867_89, -37.652_821_14, 143.926_495_28);
/// assert!((d - 54.972_271).abs() < 1e-3);
/// ```
pub fn vincenty_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    if lat1 == lat2 && lng1 == lng2 {
        return 0.0;
    }

    let l = (lng2 - lng1).to_radians();
    let u1 = ((1.0 - WGS84_F) * lat1.to_radians().tan()).atan();
    let u2 = ((1.0 - WGS84_F) * lat2.to_radians().tan()).atan();
    let (sin_u1, cos_u1) = u1.sin_cos();
    let (sin_u2, cos_u2) = u2.sin_cos();

    let mut lambda = l;
    let mut sin_sigma = 0.0;
    let mut cos_sigma = 0.0;
    let mut sigma = 0.0;
    let mut cos_sq_alpha = 0.0;
    let mut cos_2sigma_m = 0.0;
    let mut converged = false;

    for _ in 0..MAX_ITERATIONS {
        let (sin_lambda, cos_lambda) = lambda.sin_cos();
        let t1 = cos_u2 * sin_lambda;
        let t2 = cos_u1 * sin_u2 - sin_u1 * cos_u2 * cos_lambda;
        sin_sigma = (t1 * t1 + t2 * t2).sqrt();

        if sin_sigma == 0.0 {
            // Points coincide on the auxiliary sphere.
            return 0.0;
        }

        cos_sigma = sin_u1 * sin_u2 + cos_u1 * cos_u2 * cos_lambda;
        sigma = sin_sigma.atan2(cos_sigma);
        let sin_alpha = cos_u1 * cos_u2 * sin_lambda / sin_sigma;
        cos_sq_alpha = 1.0 - sin_alpha * sin_alpha;

        // Equatorial lines have cos²α = 0.
        cos_2sigma_m = if cos_sq_alpha != 0.0 {
            cos_sigma - 2.0 * sin_u1 * sin_u2 / cos_sq_alpha
        } else {
            0.0
        };

        let c = WGS84_F / 16.0 * cos_sq_alpha * (4.0 + WGS84_F * (4.0 - 3.0 * cos_sq_alpha));
        let previous = lambda;
        lambda = l
            + (1.0 - c)
                * WGS84_F
                * sin_alpha
                * (sigma
                    + c * sin_sigma
                        * (cos_2sigma_m
                            + c * cos_sigma * (-1.0 + 2.0 * cos_2sigma_m * cos_2sigma_m)));

        if (lambda - previous).abs() < TOLERANCE {
            converged = true;
            break;
        }
    }

    if !converged {
        trace!(lat1, lng1, lat2, lng2, "vincenty did not converge, using last estimate");
    }

    let u_sq = cos_sq_alpha * (WGS84_A * WGS84_A - WGS84_B * WGS84_B) / (WGS84_B * WGS84_B);
    let a = 1.0 + u_sq / 16384.0 * (4096.0 + u_sq * (-768.0 + u_sq * (320.0 - 175.0 * u_sq)));
    let b = u_sq / 1024.0 * (256.0 + u_sq * (-128.0 + u_sq * (74.0 - 47.0 * u_sq)));
    let delta_sigma = b
        * sin_sigma
        * (cos_2sigma_m
            + b / 4.0
                * (cos_sigma * (-1.0 + 2.0 * cos_2sigma_m * cos_2sigma_m)
                    - b / 6.0
                        * cos_2sigma_m
                        * (-3.0 + 4.0 * sin_sigma * sin_sigma)
                        * (-3.0 + 4.0 * cos_2sigma_m * cos_2sigma_m)));

    let metres = WGS84_B * a * (sigma - delta_sigma);
    if !metres.is_finite() {
        return haversine_km(lat1, lng1, lat2, lng2);
    }
    (metres / 1000.0).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coincident_points_are_zero() {
        assert_eq!(vincenty_km(16.8833, 99.125, 16.8833, 99.125), 0.0);
        assert_eq!(vincenty_km(90.0, 0.0, 90.0, 0.0), 0.0);
    }

    #[test]
    fn known_geodesic() {
        // Flinders Peak to Buninyong: 54 972.271 m.
        let d = vincenty_km(-37.951_033_42, 144.424_867_89, -37.652_821_14, 143.926_495_28);
        assert!((d - 54.972_271).abs() < 1e-3, "got {d}");
    }

    #[test]
    fn short_distance_close_to_spherical() {
        let v = vincenty_km(16.8833, 99.125, 16.90, 99.14);
        let h = haversine_km(16.8833, 99.125, 16.90, 99.14);
        assert!(v > 2.0 && v < 3.0, "got {v}");
        assert!((v - h).abs() / h < 0.01);
    }

    #[test]
    fn antipodal_inputs_terminate_with_finite_result() {
        let d = vincenty_km(0.0, 0.0, 0.5, 179.7);
        assert!(d.is_finite());
        assert!(d > 19_000.0 && d < 20_100.0, "got {d}");

        let d = vincenty_km(0.0, 0.0, 0.0, 180.0);
        assert!(d.is_finite());
        assert!(d > 19_000.0);
    }

    #[test]
    fn equatorial_line() {
        // One degree of longitude on the equator: 111.319 km.
        let d = vincenty_km(0.0, 0.0, 0.0, 1.0);
        assert!((d - 111.319).abs() < 0.01, "got {d}");
    }
}
