#![forbid(unsafe_code)]

pub type Unit = euclid::UnknownUnit;

pub type Rect = euclid::Rect<f64, Unit>;
pub type Box2D = euclid::Box2D<f64, Unit>;

pub fn rect(x: f64, y: f64, width: f64, height: f64) -> Rect {
    euclid::rect(x, y, width, height)
}

/// Smallest box containing every rect, or `None` for an empty iterator.
pub fn union_rects(rects: impl IntoIterator<Item = Rect>) -> Option<Box2D> {
    let mut it = rects.into_iter();
    let first = it.next()?.to_box2d();
    Some(it.fold(first, |acc, r| acc.union(&r.to_box2d())))
}
