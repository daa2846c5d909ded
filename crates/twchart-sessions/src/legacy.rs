//! The older fixed-stage bread record and its gap-filling pass.
//!
//! Before stages were an open list, a bake had exactly four phases stored
//! in named fields, any of which could be partially known. [`fill_gaps`]
//! infers the missing bounds; [`Session::from`] migrates a record to the
//! list model.

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::types::{duration_secs, Event, Probe, ProbePosition, Session, Stage, ThermoworksData};

/// A stage whose bounds may each be unknown.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageSlot {
    #[serde(default)]
    pub name: String,
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
    #[serde(default, with = "duration_secs")]
    pub duration: Option<Duration>,
}

impl StageSlot {
    pub fn starting(name: impl Into<String>, start: NaiveDateTime) -> Self {
        Self {
            name: name.into(),
            start: Some(start),
            ..Self::default()
        }
    }

    pub fn finish(&mut self, end: NaiveDateTime) {
        self.end = Some(end);
        self.duration = self.start.map(|start| end - start);
    }

    pub fn is_empty(&self) -> bool {
        self.start.is_none() && self.end.is_none() && self.duration.is_none()
    }

    fn known_duration(&self) -> Option<Duration> {
        self.duration.filter(|d| *d > Duration::zero())
    }

    /// The start, or when only the end is known, the end minus the duration.
    /// A slot with an end and no usable duration starts at its end.
    fn resolved_start(&self) -> Option<NaiveDateTime> {
        self.start.or_else(|| {
            let end = self.end?;
            match self.known_duration() {
                Some(duration) => end.checked_sub_signed(duration),
                None => Some(end),
            }
        })
    }
}

/// Fill unknown stage bounds from their neighbours, in order.
///
/// Per stage: start from the previous end, end from start + duration, end
/// from the next start. Then every stage with both bounds and no duration
/// gets one. Stages that start out empty are left empty. Running it again
/// changes nothing.
pub fn fill_gaps(slots: &mut [StageSlot]) {
    let absent: Vec<bool> = slots.iter().map(StageSlot::is_empty).collect();

    for i in 0..slots.len() {
        if absent[i] {
            continue;
        }

        if i > 0 && slots[i].start.is_none() {
            slots[i].start = slots[i - 1].end;
        }

        let slot = &mut slots[i];
        if slot.end.is_none() {
            if let (Some(start), Some(duration)) = (slot.start, slot.known_duration()) {
                slot.end = start.checked_add_signed(duration);
            }
        }

        if slots[i].end.is_none() {
            if let Some(next) = slots.get(i + 1) {
                slots[i].end = next.start;
            }
        }
    }

    for (slot, absent) in slots.iter_mut().zip(absent) {
        if !absent && slot.known_duration().is_none() {
            if let (Some(start), Some(end)) = (slot.start, slot.end) {
                slot.duration = Some(end - start);
            }
        }
    }
}

/// Fixed four-phase bread record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BreadData {
    pub name: String,
    #[serde(default)]
    pub preferment: StageSlot,
    #[serde(default)]
    pub bulk_ferment: StageSlot,
    #[serde(default)]
    pub final_proof: StageSlot,
    #[serde(default)]
    pub bake: StageSlot,

    #[serde(default)]
    pub events: Vec<Event>,
    #[serde(default)]
    pub data: Vec<ThermoworksData>,

    #[serde(default)]
    pub ambient_probe_position: ProbePosition,
    #[serde(default)]
    pub oven_probe_position: ProbePosition,
    #[serde(default)]
    pub dough_probe_position: ProbePosition,
    #[serde(default)]
    pub other_probe_position: ProbePosition,
}

impl BreadData {
    pub const STAGE_NAMES: [&'static str; 4] =
        ["Preferment", "Bulk Fermentation", "Final Proof", "Bake"];

    pub fn start_preferment(&mut self, t: NaiveDateTime) {
        self.preferment = StageSlot::starting(Self::STAGE_NAMES[0], t);
    }

    pub fn start_bulk_ferment(&mut self, t: NaiveDateTime) {
        self.bulk_ferment = StageSlot::starting(Self::STAGE_NAMES[1], t);
        self.preferment.finish(t);
    }

    pub fn start_final_proof(&mut self, t: NaiveDateTime) {
        self.final_proof = StageSlot::starting(Self::STAGE_NAMES[2], t);
        self.bulk_ferment.finish(t);
    }

    pub fn start_bake(&mut self, t: NaiveDateTime) {
        self.bake = StageSlot::starting(Self::STAGE_NAMES[3], t);
        self.final_proof.finish(t);
    }

    pub fn end_bake(&mut self, t: NaiveDateTime) {
        self.bake.finish(t);
    }

    pub fn fill_gaps(&mut self) {
        let mut slots = self.take_slots();
        fill_gaps(&mut slots);
        self.put_slots(slots);
    }

    fn take_slots(&mut self) -> [StageSlot; 4] {
        [
            std::mem::take(&mut self.preferment),
            std::mem::take(&mut self.bulk_ferment),
            std::mem::take(&mut self.final_proof),
            std::mem::take(&mut self.bake),
        ]
    }

    fn put_slots(&mut self, [preferment, bulk_ferment, final_proof, bake]: [StageSlot; 4]) {
        self.preferment = preferment;
        self.bulk_ferment = bulk_ferment;
        self.final_proof = final_proof;
        self.bake = bake;
    }

    fn probes(&self) -> Vec<Probe> {
        [
            ("Ambient", self.ambient_probe_position),
            ("Oven", self.oven_probe_position),
            ("Dough", self.dough_probe_position),
            ("Other", self.other_probe_position),
        ]
        .into_iter()
        .filter(|(_, position)| !position.is_none())
        .map(|(name, position)| Probe {
            name: name.to_string(),
            position,
        })
        .collect()
    }
}

impl From<BreadData> for Session {
    fn from(mut bread: BreadData) -> Self {
        bread.fill_gaps();
        let probes = bread.probes();

        let stages: Vec<Stage> = bread
            .take_slots()
            .into_iter()
            .zip(BreadData::STAGE_NAMES)
            .filter(|(slot, _)| !slot.is_empty())
            .filter_map(|(slot, default_name)| {
                let Some(start) = slot.resolved_start() else {
                    tracing::warn!(stage = default_name, "Dropping stage with no start or end");
                    return None;
                };
                let name = if slot.name.is_empty() {
                    default_name.to_string()
                } else {
                    slot.name
                };
                let duration = slot.duration.or_else(|| slot.end.map(|end| end - start));
                Some(Stage {
                    name,
                    start,
                    end: slot.end,
                    duration,
                })
            })
            .collect();

        let start_time = stages
            .iter()
            .map(|s| s.start)
            .chain(bread.events.iter().map(|e| e.time))
            .min();

        Session {
            name: bread.name,
            date: start_time.map(|t| t.date()),
            start_time,
            probes,
            stages,
            events: bread.events,
            data: bread.data,
        }
    }
}
