use super::*;
use crate::geometry::Size;
use crate::memory::MemoryDeck;

fn deck() -> (MemoryDeck, String) {
    let deck = MemoryDeck::with_pages(Size::default(), 1);
    let page = deck.pages()[0].clone();
    (deck, page)
}

#[test]
fn supported_kind_is_used_directly() {
    let (mut deck, page) = deck();
    let resolver = ShapeKindResolver::new();
    let (_, used) = resolver.create(&mut deck, &page, ShapeKind::RoundRectangle, Rect::default()).unwrap();
    assert_eq!(used, ShapeKind::RoundRectangle);
    assert_eq!(resolver.resolved(ShapeKind::RoundRectangle), Some(ShapeKind::RoundRectangle));
}

#[test]
fn unsupported_kind_falls_back_and_is_memoized() {
    let (mut deck, page) = deck();
    deck.set_unsupported(ShapeKind::RoundRectangle);
    let resolver = ShapeKindResolver::new();

    let (id, used) = resolver.create(&mut deck, &page, ShapeKind::RoundRectangle, Rect::default()).unwrap();
    assert_eq!(used, ShapeKind::Rectangle);
    assert_eq!(deck.shape(&page, &id).unwrap().kind, ShapeKind::Rectangle);
    assert_eq!(resolver.resolved(ShapeKind::RoundRectangle), Some(ShapeKind::Rectangle));

    let (_, again) = resolver.create(&mut deck, &page, ShapeKind::RoundRectangle, Rect::default()).unwrap();
    assert_eq!(again, ShapeKind::Rectangle);
}

#[test]
fn exhausted_chain_reports_unsupported() {
    let (mut deck, page) = deck();
    deck.set_unsupported(ShapeKind::Group);
    let resolver = ShapeKindResolver::new();
    let err = resolver.create(&mut deck, &page, ShapeKind::Group, Rect::default()).unwrap_err();
    assert!(matches!(err, HostError::UnsupportedShapeKind(ShapeKind::Group)));
    assert_eq!(resolver.resolved(ShapeKind::Group), None);
}

#[test]
fn other_errors_do_not_advance_the_chain() {
    let (mut deck, page) = deck();
    deck.poison_page(&page);
    let resolver = ShapeKindResolver::new();
    let err = resolver.create(&mut deck, &page, ShapeKind::RoundRectangle, Rect::default()).unwrap_err();
    assert!(matches!(err, HostError::Rejected(_)));
    assert_eq!(resolver.resolved(ShapeKind::RoundRectangle), None);
}
