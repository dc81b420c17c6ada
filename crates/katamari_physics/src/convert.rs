//! Conversions between workspace math types and nalgebra

use katamari_math::{Quat, Transform, Vec3};
use rapier3d::na::{Quaternion, UnitQuaternion};
use rapier3d::prelude as rapier;

pub(crate) fn vector(v: Vec3) -> rapier::Vector<f32> {
    rapier::Vector::new(v.x, v.y, v.z)
}

pub(crate) fn point(v: Vec3) -> rapier::Point<f32> {
    rapier::Point::new(v.x, v.y, v.z)
}

pub(crate) fn from_vector(v: &rapier::Vector<f32>) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

pub(crate) fn from_point(p: &rapier::Point<f32>) -> Vec3 {
    Vec3::new(p.x, p.y, p.z)
}

pub(crate) fn rotation(q: Quat) -> UnitQuaternion<f32> {
    UnitQuaternion::from_quaternion(Quaternion::new(q.w, q.x, q.y, q.z))
}

pub(crate) fn from_rotation(q: &UnitQuaternion<f32>) -> Quat {
    Quat::new(q.i, q.j, q.k, q.w)
}

pub(crate) fn isometry(t: &Transform) -> rapier::Isometry<f32> {
    rapier::Isometry::from_parts(
        rapier::Translation::new(t.position.x, t.position.y, t.position.z),
        rotation(t.rotation),
    )
}

pub(crate) fn from_isometry(iso: &rapier::Isometry<f32>) -> Transform {
    Transform::new(
        from_vector(&iso.translation.vector),
        from_rotation(&iso.rotation),
    )
}
