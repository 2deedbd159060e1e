// Quaternion and vector helpers for the control cascade
// Copyright © 2026 The cascade_control authors
//
// Permission is hereby granted, free of charge, to any person obtaining
// a copy of this software and associated documentation files (the "Software"),
// to deal in the Software without restriction, including without limitation
// the rights to use, copy, modify, merge, publish, distribute, sublicense,
// and/or sell copies of the Software, and to permit persons to whom the
// Software is furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included
// in all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND,
// EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES
// OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT.
// IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM,
// DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT,
// TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE
// OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

use nalgebra::{Matrix3, Quaternion, Rotation3, UnitQuaternion, Vector3};

/// Norm below which a vector is treated as degenerate and replaced by a
/// fallback direction instead of being normalized.
pub const MIN_NORM: f64 = 1e-9;

/// Normalizes `v`, or returns `fallback` when `v` is too short to define a
/// direction. The cascade uses this so a vanishing thrust vector yields a
/// defined default orientation rather than NaNs.
pub fn normalize_or(v: &Vector3<f64>, fallback: Vector3<f64>) -> Vector3<f64> {
    let norm = v.norm();
    if norm > MIN_NORM {
        v / norm
    } else {
        fallback
    }
}

/// Normalizes a quaternion, or returns identity when it is degenerate
/// (e.g. the shortest-arc construction between two anti-parallel axes).
pub fn normalize_quat_or_identity(q: Quaternion<f64>) -> Quaternion<f64> {
    let norm = q.norm();
    if norm > MIN_NORM {
        q / norm
    } else {
        Quaternion::identity()
    }
}

/// Converts an orthonormal rotation matrix to a unit quaternion with a
/// non-negative scalar part.
pub fn quat_from_rotation(r: &Matrix3<f64>) -> Quaternion<f64> {
    let q = UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(*r))
        .into_inner();
    canonicalize(q)
}

/// Flips a quaternion's sign so its scalar part is non-negative, picking one
/// representative of the rotation's double cover.
pub fn canonicalize(q: Quaternion<f64>) -> Quaternion<f64> {
    Quaternion::from(q.coords * q.coords.w.signum())
}

/// Inverse of a unit quaternion. Callers guarantee unit norm; for unit
/// quaternions the inverse is the conjugate.
pub fn quat_inverse(q: &Quaternion<f64>) -> Quaternion<f64> {
    q.conjugate()
}

/// Clamps each component of `v` to `[-limits, limits]`.
pub fn clamp_abs(v: &Vector3<f64>, limits: &Vector3<f64>) -> Vector3<f64> {
    Vector3::new(
        v.x.clamp(-limits.x, limits.x),
        v.y.clamp(-limits.y, limits.y),
        v.z.clamp(-limits.z, limits.z),
    )
}
