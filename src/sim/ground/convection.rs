//! Surface heat transfer coefficients for foundation surfaces.
//!
//! - **TARP** (interior): natural convection from Walton (1983), dependent
//!   on the surface-to-air temperature difference and on the surface
//!   orientation.
//! - **DOE-2** (exterior): TARP natural convection combined with a
//!   wind-driven forced term for rough surfaces.
//! - Longwave exchange is linearised around the current surface
//!   temperature so it can be folded into a single film coefficient.

/// Stefan-Boltzmann constant [W/(m²·K⁴)].
pub const STEFAN_BOLTZMANN: f64 = 5.670_374_419e-8;

/// Floor on natural convection when surface and air temperatures coincide.
const H_MIN_NATURAL: f64 = 0.1;

/// DOE-2 wind-driven forced convection coefficients for rough surfaces.
const DOE2_A_ROUGH: f64 = 3.26;
const DOE2_B_ROUGH: f64 = 3.89;

/// TARP natural convection coefficient [W/(m²·K)].
///
/// - `dt`: surface temperature minus air temperature [K].
/// - `normal_z`: vertical component of the outward surface normal (from the
///   solid into the air). `+1` for a slab seen from the room, `0` for walls.
///
/// Buoyant flow is unstable (enhanced) when a warm surface faces up or a
/// cool surface faces down, i.e. when `dt * normal_z > 0`.
pub fn tarp_natural_h(dt: f64, normal_z: f64) -> f64 {
    let abs_dt = dt.abs();
    if abs_dt < 1e-15 {
        return H_MIN_NATURAL;
    }
    let dt_third = abs_dt.cbrt();
    let abs_cos = normal_z.abs();

    let h = if abs_cos < 0.707 {
        1.31 * dt_third
    } else if dt * normal_z > 0.0 {
        9.482 * dt_third / (7.238 - abs_cos)
    } else {
        1.810 * dt_third / (1.382 + abs_cos)
    };
    h.max(H_MIN_NATURAL)
}

/// DOE-2 exterior convection coefficient [W/(m²·K)]:
/// `sqrt(h_natural² + (a + b V)²)`.
pub fn doe2_exterior_h(dt: f64, normal_z: f64, wind_speed: f64) -> f64 {
    let h_natural = tarp_natural_h(dt, normal_z);
    let h_forced = DOE2_A_ROUGH + DOE2_B_ROUGH * wind_speed.max(0.0);
    h_natural.hypot(h_forced)
}

/// Linearised radiative coefficient `ε σ (Ts² + Tr²)(Ts + Tr)` [W/(m²·K)].
///
/// Temperatures are absolute (K).
pub fn radiative_h(emissivity: f64, t_surface: f64, t_radiant: f64) -> f64 {
    if emissivity <= 0.0 {
        return 0.0;
    }
    emissivity
        * STEFAN_BOLTZMANN
        * (t_surface * t_surface + t_radiant * t_radiant)
        * (t_surface + t_radiant)
}

/// Sky view factor of a surface from its outward normal.
pub fn sky_view_factor(normal_z: f64) -> f64 {
    0.5 * (1.0 + normal_z.clamp(-1.0, 1.0))
}

/// Combine convection to `t_air` and radiation to `t_radiant` into one film
/// coefficient and matching environment temperature.
///
/// Returns `(h_conv + h_rad, (h_conv t_air + h_rad t_radiant) / (h_conv + h_rad))`.
pub fn combine_film(h_conv: f64, t_air: f64, h_rad: f64, t_radiant: f64) -> (f64, f64) {
    if h_rad <= 0.0 {
        return (h_conv.max(0.0), t_air);
    }
    let h = h_conv + h_rad;
    (h, (h_conv * t_air + h_rad * t_radiant) / h)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tarp_orientation() {
        // Warm floor (slab warmer than the room): unstable, stronger.
        let warm_up = tarp_natural_h(5.0, 1.0);
        let cool_up = tarp_natural_h(-5.0, 1.0);
        assert!(warm_up > cool_up);
        let expected = 9.482 * 5.0_f64.cbrt() / (7.238 - 1.0);
        assert!((warm_up - expected).abs() < 1e-12);
        // Vertical
        assert!((tarp_natural_h(8.0, 0.0) - 1.31 * 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_tarp_floor_at_equilibrium() {
        assert_eq!(tarp_natural_h(0.0, 1.0), H_MIN_NATURAL);
    }

    #[test]
    fn test_doe2_grows_with_wind() {
        let calm = doe2_exterior_h(2.0, 1.0, 0.0);
        let windy = doe2_exterior_h(2.0, 1.0, 5.0);
        assert!(windy > calm);
        assert!(calm >= DOE2_A_ROUGH);
        // Negative wind is treated as calm.
        assert_eq!(doe2_exterior_h(2.0, 1.0, -3.0), calm);
    }

    #[test]
    fn test_radiative_h_near_room_temperature() {
        // 4 ε σ T³ at 293 K is about 5.7 W/m²K for ε = 1
        let h = radiative_h(1.0, 293.15, 293.15);
        let expected = 4.0 * STEFAN_BOLTZMANN * 293.15_f64.powi(3);
        assert!((h - expected).abs() < 1e-9);
        assert!(h > 5.0 && h < 6.5);
        assert_eq!(radiative_h(0.0, 293.15, 250.0), 0.0);
    }

    #[test]
    fn test_combine_film() {
        let (h, t) = combine_film(3.0, 290.0, 1.0, 250.0);
        assert_eq!(h, 4.0);
        assert!((t - 280.0).abs() < 1e-12);
        assert_eq!(combine_film(0.0, 290.0, 0.0, 250.0), (0.0, 290.0));
        assert_eq!(combine_film(7.95, 303.15, 0.0, 250.0), (7.95, 303.15));
    }

    #[test]
    fn test_sky_view_factor() {
        assert_eq!(sky_view_factor(1.0), 1.0);
        assert_eq!(sky_view_factor(0.0), 0.5);
    }
}
