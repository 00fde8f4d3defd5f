#![allow(clippy::float_cmp)]

use super::*;

// =============================================================
// Rect
// =============================================================

#[test]
fn rect_edges_and_center() {
    let r = Rect::new(10.0, 20.0, 100.0, 50.0);
    assert_eq!(r.right(), 110.0);
    assert_eq!(r.bottom(), 70.0);
    assert_eq!(r.center(), (60.0, 45.0));
    assert_eq!(r.area(), 5000.0);
}

#[test]
fn rect_from_center_round_trips_center() {
    let r = Rect::from_center(100.0, 100.0, 40.0, 20.0);
    assert_eq!(r, Rect::new(80.0, 90.0, 40.0, 20.0));
    assert_eq!(r.center(), (100.0, 100.0));
}

#[test]
fn rect_inset_never_goes_negative() {
    let r = Rect::new(0.0, 0.0, 30.0, 30.0);
    let inner = r.inset(20.0, 20.0, 20.0, 20.0);
    assert_eq!(inner.width, 0.0);
    assert_eq!(inner.height, 0.0);
    assert_eq!(inner.left, 20.0);
}

#[test]
fn rect_intersects_ignores_touching_edges() {
    let a = Rect::new(0.0, 0.0, 10.0, 10.0);
    let b = Rect::new(10.0, 0.0, 10.0, 10.0);
    let c = Rect::new(9.0, 9.0, 10.0, 10.0);
    assert!(!a.intersects(&b));
    assert!(a.intersects(&c));
    assert!(c.intersects(&a));
}

#[test]
fn rect_contains() {
    let outer = Rect::new(0.0, 0.0, 100.0, 100.0);
    assert!(outer.contains(&Rect::new(10.0, 10.0, 20.0, 20.0)));
    assert!(outer.contains(&outer));
    assert!(!outer.contains(&Rect::new(90.0, 90.0, 20.0, 20.0)));
}

#[test]
fn rect_shifted_inside_moves_without_resizing() {
    let bounds = Rect::new(0.0, 0.0, 100.0, 100.0);
    let r = Rect::new(90.0, -5.0, 20.0, 20.0).shifted_inside(&bounds);
    assert_eq!(r, Rect::new(80.0, 0.0, 20.0, 20.0));
}

#[test]
fn rect_union_all() {
    assert_eq!(Rect::union_all(&[]), None);
    let u = Rect::union_all(&[Rect::new(0.0, 0.0, 10.0, 10.0), Rect::new(20.0, 5.0, 5.0, 30.0)]).unwrap();
    assert_eq!(u, Rect::new(0.0, 0.0, 25.0, 35.0));
}

// =============================================================
// Scalar helpers
// =============================================================

#[test]
fn clamp_handles_nan() {
    assert_eq!(clamp(f64::NAN, 0.0, 1.0), 0.0);
    assert_eq!(clamp(2.0, 0.0, 1.0), 1.0);
    assert_eq!(clamp(-2.0, 0.0, 1.0), 0.0);
}

#[test]
fn ease_out_cubic_endpoints_and_clamping() {
    assert_eq!(ease_out_cubic(0.0), 0.0);
    assert_eq!(ease_out_cubic(1.0), 1.0);
    assert_eq!(ease_out_cubic(-3.0), 0.0);
    assert_eq!(ease_out_cubic(7.0), 1.0);
    assert!((ease_out_cubic(0.5) - 0.875).abs() < 1e-12);
}

#[test]
fn ease_out_cubic_decelerates() {
    let first_step = ease_out_cubic(0.2) - ease_out_cubic(0.0);
    let last_step = ease_out_cubic(1.0) - ease_out_cubic(0.8);
    assert!(first_step > last_step);
}

#[test]
fn interpolate_linear() {
    assert_eq!(interpolate(10.0, 20.0, 0.0), 10.0);
    assert_eq!(interpolate(10.0, 20.0, 0.5), 15.0);
    assert_eq!(interpolate(10.0, 20.0, 1.0), 20.0);
}
