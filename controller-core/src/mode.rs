//! Mode selection from held-button activation combos.

use heapless::Vec;
use serde::{Deserialize, Serialize};

use crate::types::Buttons;

/// Upper bound on activation bindings (game plus keyboard modes).
pub const MAX_BINDINGS: usize = 16;

/// Game-specific controller layouts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GameModeId {
    Melee,
    ProjectM,
    Ultimate,
    Fgc,
    Rivals,
}

/// What an activation combo switches to. Indices refer to the config's
/// game mode and keyboard mode lists.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ModeTarget {
    Game(u8),
    Keyboard(u8),
}

/// Held-button set that selects a mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ActivationBinding {
    pub held: Buttons,
    pub target: ModeTarget,
}

impl ActivationBinding {
    pub const fn new(held: Buttons, target: ModeTarget) -> Self {
        Self { held, target }
    }

    #[inline]
    pub const fn matches(&self, held: Buttons) -> bool {
        held.contains(self.held)
    }
}

/// Whether a selected mode outlives its activation combo.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HoldPolicy {
    /// The mode stays selected after the combo is released.
    #[default]
    Latch,
    /// Releasing every combo returns to the default game mode.
    RequireHold,
}

/// The currently selected game mode and optional keyboard mode.
///
/// `keyboard: None` is the "no secondary mode" state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ActiveMode {
    pub game: u8,
    pub keyboard: Option<u8>,
}

/// Edge-triggered mode state machine.
///
/// Bindings are checked most specific first (larger held sets before
/// smaller ones); equal sizes keep declaration order. A matching combo
/// commits only while armed; committing disarms, and any pass where no
/// combo matches re-arms. Holding a combo therefore commits once.
///
/// Specificity only decides between combos that become held on the same
/// pass. With `{A}` and `{A, B}` bound, pressing A a pass before B commits
/// `{A}` and disarms; `{A, B}` is then reached only after a release.
pub struct ModeSelector {
    bindings: Vec<ActivationBinding, MAX_BINDINGS>,
    policy: HoldPolicy,
    default_game: u8,
    current: ActiveMode,
    armed: bool,
}

impl ModeSelector {
    pub fn new(
        bindings: impl IntoIterator<Item = ActivationBinding>,
        policy: HoldPolicy,
        default_game: u8,
    ) -> Self {
        let mut list: Vec<ActivationBinding, MAX_BINDINGS> = Vec::new();
        for binding in bindings {
            if list.push(binding).is_err() {
                warn!("more than {} activation bindings, rest ignored", MAX_BINDINGS);
                break;
            }
        }
        sort_by_specificity(&mut list);

        Self {
            bindings: list,
            policy,
            default_game,
            current: ActiveMode {
                game: default_game,
                keyboard: None,
            },
            // A combo held through boot must be released before it applies.
            armed: false,
        }
    }

    /// Bindings in evaluation order.
    pub fn bindings(&self) -> &[ActivationBinding] {
        &self.bindings
    }

    pub fn current(&self) -> ActiveMode {
        self.current
    }

    /// First binding in evaluation order whose combo is held.
    pub fn matching(&self, held: Buttons) -> Option<ModeTarget> {
        self.bindings
            .iter()
            .find(|b| b.matches(held))
            .map(|b| b.target)
    }

    /// Run one activation check. Returns the new mode when it changed.
    pub fn select(&mut self, held: Buttons) -> Option<ActiveMode> {
        match self.matching(held) {
            Some(target) => {
                if !self.armed {
                    return None;
                }
                self.armed = false;
                let next = match target {
                    ModeTarget::Game(game) => ActiveMode {
                        game,
                        keyboard: None,
                    },
                    ModeTarget::Keyboard(kb) => ActiveMode {
                        game: self.current.game,
                        keyboard: Some(kb),
                    },
                };
                self.commit(next)
            }
            None => {
                self.armed = true;
                match self.policy {
                    HoldPolicy::Latch => None,
                    HoldPolicy::RequireHold => self.commit(ActiveMode {
                        game: self.default_game,
                        keyboard: None,
                    }),
                }
            }
        }
    }

    fn commit(&mut self, next: ActiveMode) -> Option<ActiveMode> {
        if next == self.current {
            return None;
        }
        info!("mode change: {:?} -> {:?}", self.current, next);
        self.current = next;
        Some(next)
    }
}

/// Stable insertion sort, descending by held-set size.
fn sort_by_specificity(list: &mut [ActivationBinding]) {
    for i in 1..list.len() {
        let mut j = i;
        while j > 0 && list[j - 1].held.count() < list[j].held.count() {
            list.swap(j - 1, j);
            j -= 1;
        }
    }
}
