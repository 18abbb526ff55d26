use na::Vector2;

/// Unit vector pointing along angle `theta`.
pub fn unit(theta: f64) -> Vector2<f64> {
    Vector2::new(theta.cos(), theta.sin())
}

/// Counter-clockwise perpendicular, i.e. the derivative of `unit(theta)`.
pub fn perp(v: &Vector2<f64>) -> Vector2<f64> {
    Vector2::new(-v.y, v.x)
}

/// Scalar (z) component of the 2D cross product.
pub fn cross(a: &Vector2<f64>, b: &Vector2<f64>) -> f64 {
    a.x * b.y - a.y * b.x
}

/// Normalises `v`, falling back to +x for a zero vector.
pub fn normalize_or_x(v: &Vector2<f64>) -> Vector2<f64> {
    let norm = v.norm();
    if norm > 0.0 {
        v / norm
    } else {
        Vector2::x()
    }
}

/// Angle at `vertex` formed by the arms towards `a` and `b`, in [0, π].
pub fn bond_angle(a: &Vector2<f64>, b: &Vector2<f64>) -> f64 {
    let cos = a.dot(b) / (a.norm() * b.norm());
    cos.clamp(-1.0, 1.0).acos()
}
