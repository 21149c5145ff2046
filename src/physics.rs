// Photon kinematics on the Cherenkov cone
use nalgebra::Vector3;

/// Rotate `axis` onto a cone of half-angle θ (cos θ = `mu`) at azimuth `phi`.
pub fn cone_direction(axis: &Vector3<f64>, mu: f64, phi: f64) -> Vector3<f64> {
    let sin_theta = (1.0 - mu * mu).max(0.0).sqrt();

    // any vector perpendicular to the axis
    let perp = if axis.x.abs() < 0.99 {
        Vector3::new(1.0, 0.0, 0.0).cross(axis).normalize()
    } else {
        Vector3::new(0.0, 1.0, 0.0).cross(axis).normalize()
    };
    let ortho = axis.cross(&perp);

    mu * axis + sin_theta * phi.cos() * perp + sin_theta * phi.sin() * ortho
}

/// Linear polarisation of a Cherenkov photon.
///
/// Lies in the plane spanned by the particle and photon directions and is
/// perpendicular to the photon.
pub fn cherenkov_polarization(axis: &Vector3<f64>, photon: &Vector3<f64>, mu: f64) -> Vector3<f64> {
    let p = mu * photon - axis;
    let norm = p.norm();
    if norm < 1e-12 {
        // photon along the axis: any transverse vector will do
        return cone_direction(photon, 0.0, 0.0);
    }
    p / norm
}

/// Cosine of the Cherenkov angle, cos θ = 1/(n β).
#[inline]
pub fn cherenkov_cos_theta(beta: f64, n: f64) -> f64 {
    1.0 / (n * beta)
}
