//! Property-based tests for mode selection.

use controller_core::{
    ActivationBinding, Button, Buttons, HoldPolicy, ModeSelector, ModeTarget,
};
use proptest::collection::vec;
use proptest::prelude::*;

fn combo() -> impl Strategy<Value = Buttons> {
    // Small universe so that subsets and ties actually happen.
    proptest::sample::subsequence(Button::ALL[..8].to_vec(), 1..4).prop_map(|b| Buttons::of(&b))
}

fn bindings() -> impl Strategy<Value = Vec<ActivationBinding>> {
    vec(combo(), 1..12).prop_map(|combos| {
        combos
            .into_iter()
            .enumerate()
            .map(|(i, held)| ActivationBinding::new(held, ModeTarget::Game(i as u8)))
            .collect()
    })
}

/// Reference: the most specific matching binding, earliest on ties.
fn expected(bindings: &[ActivationBinding], held: Buttons) -> Option<ModeTarget> {
    let mut best: Option<&ActivationBinding> = None;
    for b in bindings.iter().filter(|b| held.contains(b.held)) {
        match best {
            Some(cur) if cur.held.count() >= b.held.count() => {}
            _ => best = Some(b),
        }
    }
    best.map(|b| b.target)
}

proptest! {
    #[test]
    fn selection_is_deterministic(bindings in bindings(), held in combo()) {
        let selector = ModeSelector::new(bindings.iter().copied(), HoldPolicy::Latch, 0);
        let first = selector.matching(held);
        prop_assert_eq!(first, expected(&bindings, held));
        prop_assert_eq!(selector.matching(held), first);
    }

    #[test]
    fn two_selectors_agree(bindings in bindings(), held in combo()) {
        let mut a = ModeSelector::new(bindings.iter().copied(), HoldPolicy::Latch, 0);
        let mut b = ModeSelector::new(bindings.iter().copied(), HoldPolicy::Latch, 0);
        a.select(Buttons::NONE);
        b.select(Buttons::NONE);
        prop_assert_eq!(a.select(held), b.select(held));
        prop_assert_eq!(a.current(), b.current());
    }
}

#[test]
fn superset_combo_beats_subset() {
    let a = Button::MB1;
    let b = Button::LT1;
    let bindings = [
        ActivationBinding::new(Buttons::of(&[a, b]), ModeTarget::Game(0)),
        ActivationBinding::new(Buttons::of(&[a]), ModeTarget::Game(1)),
    ];
    let selector = ModeSelector::new(bindings, HoldPolicy::Latch, 0);
    assert_eq!(selector.matching(Buttons::of(&[a, b])), Some(ModeTarget::Game(0)));
}
