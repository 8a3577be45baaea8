// Copyright 2025 ZETA RETICULA INC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! A transition: activation, destination and inhibitor arcs plus guard
//! predicates. Decides enabledness and performs the token transit.

use std::collections::HashSet;
use std::sync::{Arc, Weak};

use log::warn;
use parking_lot::RwLock;

use crate::error::{PetriNetError, Result};
use crate::place::Place;
use crate::properties::{ArcKind, ArcProperties, ConditionFn, TransitionProperties};

/// An arc resolved against the net: a non-owning place reference plus a
/// weight. Places outlive these references for the lifetime of the net;
/// failing to upgrade one is an invariant violation.
pub(crate) struct TransArc {
    pub place: Weak<Place>,
    pub weight: usize,
}

struct TransitionInner {
    activation_arcs: Vec<TransArc>,
    destination_arcs: Vec<TransArc>,
    inhibitor_arcs: Vec<TransArc>,
    conditions: Vec<(String, ConditionFn)>,
}

pub(crate) struct Transition {
    name: String,
    require_no_actions_in_execution: bool,
    inner: RwLock<TransitionInner>,
}

impl Transition {
    pub fn new(
        name: String,
        activation_arcs: Vec<TransArc>,
        destination_arcs: Vec<TransArc>,
        inhibitor_arcs: Vec<TransArc>,
        conditions: Vec<(String, ConditionFn)>,
        require_no_actions_in_execution: bool,
    ) -> Result<Self> {
        for arcs in [&activation_arcs, &destination_arcs, &inhibitor_arcs] {
            detect_repeated_places(&name, arcs)?;
            validate_weights(&name, arcs)?;
        }
        Ok(Transition {
            name,
            require_no_actions_in_execution,
            inner: RwLock::new(TransitionInner {
                activation_arcs,
                destination_arcs,
                inhibitor_arcs,
                conditions,
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the inhibitor and activation checks pass. Inhibitor weights
    /// are stored and exported but the firing rule is "any token blocks",
    /// matching the behavior nets in the wild rely on.
    pub fn is_enabled(&self) -> Result<bool> {
        let inner = self.inner.read();
        self.is_enabled_locked(&inner)
    }

    /// Evaluates the activation places and transits the tokens if possible.
    /// Returns `Ok(true)` when the transition fired.
    pub fn fire(&self) -> Result<bool> {
        let inner = self.inner.write();

        if !self.require_no_actions_in_execution {
            return self.fire_locked(&inner);
        }

        let outcome = match self.set_block_on_activation_places(&inner, true) {
            Ok(()) => self.fire_locked(&inner),
            Err(e) => Err(e),
        };
        // The block must clear even on a failed transit or a partial set;
        // places that still upgrade get unblocked regardless.
        if let Err(e) = self.clear_block_on_activation_places(&inner) {
            warn!("transition {}: failed to clear block flags: {e}", self.name);
        }
        outcome
    }

    /// Attaches a new arc. `Bidirectional` expands to one activation plus
    /// one destination arc.
    pub fn add_arc(&self, place: &Arc<Place>, kind: ArcKind, weight: usize) -> Result<()> {
        if weight == 0 {
            return Err(PetriNetError::ZeroWeight(place.name().to_string()));
        }
        let mut inner = self.inner.write();
        match kind {
            ArcKind::Activation => add_arc_to(&mut inner.activation_arcs, place, weight),
            ArcKind::Destination => add_arc_to(&mut inner.destination_arcs, place, weight),
            ArcKind::Inhibitor => add_arc_to(&mut inner.inhibitor_arcs, place, weight),
            ArcKind::Bidirectional => {
                if contains_place(&inner.activation_arcs, place.name())
                    || contains_place(&inner.destination_arcs, place.name())
                {
                    return Err(PetriNetError::invalid_arc_op(format!(
                        "arc between {} and {} already exists",
                        place.name(),
                        self.name
                    )));
                }
                add_arc_to(&mut inner.activation_arcs, place, weight)?;
                add_arc_to(&mut inner.destination_arcs, place, weight)
            }
        }
    }

    pub fn remove_arc(&self, place_name: &str, kind: ArcKind) -> Result<()> {
        let mut inner = self.inner.write();
        match kind {
            ArcKind::Activation => remove_arc_from(&mut inner.activation_arcs, place_name),
            ArcKind::Destination => remove_arc_from(&mut inner.destination_arcs, place_name),
            ArcKind::Inhibitor => remove_arc_from(&mut inner.inhibitor_arcs, place_name),
            ArcKind::Bidirectional => {
                if !contains_place(&inner.activation_arcs, place_name)
                    || !contains_place(&inner.destination_arcs, place_name)
                {
                    return Err(PetriNetError::invalid_arc_op(format!(
                        "no bidirectional arc between {place_name} and {}",
                        self.name
                    )));
                }
                remove_arc_from(&mut inner.activation_arcs, place_name)?;
                remove_arc_from(&mut inner.destination_arcs, place_name)
            }
        }
    }

    /// Point-in-time snapshot used by export and inspection. Only named
    /// guards appear in `condition_names`; anonymous guards are exported as
    /// bare callables and cannot round-trip through a registry.
    pub fn properties(&self) -> Result<TransitionProperties> {
        let inner = self.inner.read();
        Ok(TransitionProperties {
            name: self.name.clone(),
            activation_arcs: self.arc_properties(&inner.activation_arcs, ArcKind::Activation)?,
            destination_arcs: self.arc_properties(&inner.destination_arcs, ArcKind::Destination)?,
            inhibitor_arcs: self.arc_properties(&inner.inhibitor_arcs, ArcKind::Inhibitor)?,
            condition_names: inner
                .conditions
                .iter()
                .filter(|(name, _)| !name.is_empty())
                .map(|(name, _)| name.clone())
                .collect(),
            conditions: inner
                .conditions
                .iter()
                .filter(|(name, _)| name.is_empty())
                .map(|(_, condition)| Arc::clone(condition))
                .collect(),
            require_no_actions_in_execution: self.require_no_actions_in_execution,
        })
    }

    fn fire_locked(&self, inner: &TransitionInner) -> Result<bool> {
        if !self.is_active_locked(inner)? {
            return Ok(false);
        }
        self.perform_transit(inner)?;
        Ok(true)
    }

    fn is_enabled_locked(&self, inner: &TransitionInner) -> Result<bool> {
        for arc in &inner.inhibitor_arcs {
            if self.upgrade(&arc.place)?.token_count() > 0 {
                return Ok(false);
            }
        }
        for arc in &inner.activation_arcs {
            if self.upgrade(&arc.place)?.token_count() < arc.weight {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn is_active_locked(&self, inner: &TransitionInner) -> Result<bool> {
        if !self.is_enabled_locked(inner)? {
            return Ok(false);
        }
        if self.require_no_actions_in_execution && !self.no_actions_in_execution(inner)? {
            return Ok(false);
        }
        Ok(inner.conditions.iter().all(|(_, condition)| condition()))
    }

    fn no_actions_in_execution(&self, inner: &TransitionInner) -> Result<bool> {
        for arc in &inner.activation_arcs {
            if self.upgrade(&arc.place)?.is_on_enter_in_execution() {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Moves the tokens from the activation places to the destination
    /// places, all or nothing. Destination capacity is validated up front;
    /// if a credit fails regardless (an external deposit racing the transit
    /// can close the overflow window), every token moved so far is put back
    /// through the raw, callback-free ops.
    fn perform_transit(&self, inner: &TransitionInner) -> Result<()> {
        for arc in &inner.destination_arcs {
            self.upgrade(&arc.place)?.can_accept(arc.weight)?;
        }

        let mut debited: Vec<(Arc<Place>, usize)> = Vec::new();
        for arc in &inner.activation_arcs {
            let result = self
                .upgrade(&arc.place)
                .and_then(|place| place.exit_place(arc.weight).map(|()| place));
            match result {
                Ok(place) => debited.push((place, arc.weight)),
                Err(e) => {
                    self.roll_back(&debited, &[]);
                    return Err(e);
                }
            }
        }

        let mut credited: Vec<(Arc<Place>, usize)> = Vec::new();
        for arc in &inner.destination_arcs {
            let result = self
                .upgrade(&arc.place)
                .and_then(|place| place.enter_place_from_transit(arc.weight).map(|()| place));
            match result {
                Ok(place) => credited.push((place, arc.weight)),
                Err(e) => {
                    self.roll_back(&debited, &credited);
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    fn roll_back(&self, debited: &[(Arc<Place>, usize)], credited: &[(Arc<Place>, usize)]) {
        warn!(
            "transition {}: transit failed, compensating {} debit(s) and {} credit(s); \
             on-exit callbacks already dispatched cannot be undone",
            self.name,
            debited.len(),
            credited.len()
        );
        for (place, weight) in credited {
            place.remove_tokens_raw(*weight);
        }
        for (place, weight) in debited {
            place.add_tokens_raw(*weight);
        }
    }

    fn set_block_on_activation_places(&self, inner: &TransitionInner, value: bool) -> Result<()> {
        for arc in &inner.activation_arcs {
            self.upgrade(&arc.place)?
                .block_starting_on_enter_actions(value);
        }
        Ok(())
    }

    /// Unblocks every activation place that can still be reached, reporting
    /// the first expired reference afterwards.
    fn clear_block_on_activation_places(&self, inner: &TransitionInner) -> Result<()> {
        let mut first_error = None;
        for arc in &inner.activation_arcs {
            match self.upgrade(&arc.place) {
                Ok(place) => place.block_starting_on_enter_actions(false),
                Err(e) => first_error = first_error.or(Some(e)),
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn arc_properties(&self, arcs: &[TransArc], kind: ArcKind) -> Result<Vec<ArcProperties>> {
        arcs.iter()
            .map(|arc| {
                Ok(ArcProperties {
                    weight: arc.weight,
                    place_name: self.upgrade(&arc.place)?.name().to_string(),
                    transition_name: self.name.clone(),
                    kind,
                })
            })
            .collect()
    }

    fn upgrade(&self, place: &Weak<Place>) -> Result<Arc<Place>> {
        place
            .upgrade()
            .ok_or_else(|| PetriNetError::ExpiredReference(self.name.clone()))
    }
}

fn detect_repeated_places(transition_name: &str, arcs: &[TransArc]) -> Result<()> {
    let mut seen = HashSet::new();
    for arc in arcs {
        let place = arc
            .place
            .upgrade()
            .ok_or_else(|| PetriNetError::ExpiredReference(transition_name.to_string()))?;
        if !seen.insert(place.name().to_string()) {
            return Err(PetriNetError::RepeatedPlaceInArcList(
                place.name().to_string(),
            ));
        }
    }
    Ok(())
}

fn validate_weights(transition_name: &str, arcs: &[TransArc]) -> Result<()> {
    for arc in arcs {
        if arc.weight == 0 {
            let place = arc
                .place
                .upgrade()
                .ok_or_else(|| PetriNetError::ExpiredReference(transition_name.to_string()))?;
            return Err(PetriNetError::ZeroWeight(place.name().to_string()));
        }
    }
    Ok(())
}

fn contains_place(arcs: &[TransArc], place_name: &str) -> bool {
    arcs.iter().any(|arc| {
        arc.place
            .upgrade()
            .is_some_and(|place| place.name() == place_name)
    })
}

fn add_arc_to(arcs: &mut Vec<TransArc>, place: &Arc<Place>, weight: usize) -> Result<()> {
    if contains_place(arcs, place.name()) {
        return Err(PetriNetError::invalid_arc_op(format!(
            "arc to place {} already exists",
            place.name()
        )));
    }
    arcs.push(TransArc {
        place: Arc::downgrade(place),
        weight,
    });
    Ok(())
}

fn remove_arc_from(arcs: &mut Vec<TransArc>, place_name: &str) -> Result<()> {
    let position = arcs.iter().position(|arc| {
        arc.place
            .upgrade()
            .is_some_and(|place| place.name() == place_name)
    });
    match position {
        Some(index) => {
            arcs.remove(index);
            Ok(())
        }
        None => Err(PetriNetError::invalid_arc_op(format!(
            "cannot remove arc to place {place_name}: no such arc"
        ))),
    }
}
