use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use strum::IntoEnumIterator;

use super::settings::{GenerationMode, KeyRange, PhaseWeights};
use crate::calendar::{AcademicPhase, PatternTable, DAYS_PER_YEAR};
use crate::errors::ServiceError;

/// A day of year together with the simulated years whose key for that day is in range.
#[derive(Debug, Clone, Copy)]
struct DaySlot {
    day: u32,
    first_year: u32,
    years: u32,
}

impl DaySlot {
    fn key(&self, year_offset: u32) -> u32 {
        (self.first_year + year_offset) * DAYS_PER_YEAR + self.day
    }
}

#[derive(Debug, Clone)]
struct PhaseDays {
    phase: AcademicPhase,
    slots: Vec<DaySlot>,
}

/// Draws `(date_key, phase)` pairs according to a [`GenerationMode`].
#[derive(Debug, Clone)]
pub struct DateSampler {
    table: &'static PatternTable,
    range: KeyRange,
    phases: Vec<PhaseDays>,
    weights: Option<WeightedIndex<f64>>,
}

impl DateSampler {
    pub fn new(
        mode: GenerationMode,
        table: &'static PatternTable,
        range: KeyRange,
        weights: &PhaseWeights,
    ) -> Result<Self, ServiceError> {
        if range.is_empty() || range.start == 0 {
            return Err(ServiceError::InvalidInput(format!(
                "date key range {}..={} is empty or not 1-based",
                range.start, range.end
            )));
        }

        let mut sampler = Self {
            table,
            range,
            phases: Vec::new(),
            weights: None,
        };

        if mode == GenerationMode::WeightedPhase {
            let phases: Vec<PhaseDays> = AcademicPhase::iter()
                .map(|phase| PhaseDays {
                    phase,
                    slots: table
                        .days_of(phase)
                        .into_iter()
                        .filter_map(|day| slot_for_day(day, range))
                        .collect(),
                })
                .collect();

            let phase_weights = phases.iter().map(|p| {
                if p.slots.is_empty() {
                    0.0
                } else {
                    weights.weight(p.phase)
                }
            });
            let index = WeightedIndex::new(phase_weights).map_err(|e| {
                ServiceError::InvalidInput(format!(
                    "no phase with positive weight has a date key in range: {e}"
                ))
            })?;

            sampler.phases = phases;
            sampler.weights = Some(index);
        }

        Ok(sampler)
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> (u32, AcademicPhase) {
        match &self.weights {
            Some(index) => {
                let days = &self.phases[index.sample(rng)];
                let slot = days.slots[rng.gen_range(0..days.slots.len())];
                let key = slot.key(rng.gen_range(0..slot.years));
                (key, days.phase)
            }
            None => {
                let key = rng.gen_range(self.range.keys());
                (key, self.table.classify(key))
            }
        }
    }
}

/// Years `y` with `start <= y * 365 + day <= end`, or `None` when there are none.
fn slot_for_day(day: u32, range: KeyRange) -> Option<DaySlot> {
    let year_len = i64::from(DAYS_PER_YEAR);
    let day_i = i64::from(day);
    let lowest = -(-(i64::from(range.start) - day_i)).div_euclid(year_len);
    let first = lowest.max(0);
    let last = (i64::from(range.end) - day_i).div_euclid(year_len);
    if last < first {
        return None;
    }
    Some(DaySlot {
        day,
        first_year: first as u32,
        years: (last - first + 1) as u32,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn slots_cover_only_keys_in_range() {
        let slot = slot_for_day(15, KeyRange::new(1, 3650)).unwrap();
        assert_eq!((slot.first_year, slot.years), (0, 10));

        let slot = slot_for_day(15, KeyRange::new(400, 800)).unwrap();
        assert_eq!((slot.first_year, slot.years), (2, 1));
        assert_eq!(slot.key(0), 745);
        assert!(slot_for_day(15, KeyRange::new(20, 300)).is_none());
    }

    #[test]
    fn weighted_keys_match_their_phase() {
        let range = KeyRange::new(1, 3650);
        let sampler = DateSampler::new(
            GenerationMode::WeightedPhase,
            &PatternTable::PRIMARY,
            range,
            &PhaseWeights::default(),
        )
        .unwrap();
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..2_000 {
            let (key, phase) = sampler.sample(&mut rng);
            assert!(range.contains(key), "key {key} out of range");
            assert_eq!(PatternTable::PRIMARY.classify(key), phase);
        }
    }

    #[test]
    fn weighted_mode_skips_phases_without_keys() {
        // Days 1..=9 are all `normal` in the primary table.
        let weights = PhaseWeights {
            normal: 0.0,
            ..PhaseWeights::default()
        };
        let err = DateSampler::new(
            GenerationMode::WeightedPhase,
            &PatternTable::PRIMARY,
            KeyRange::new(1, 9),
            &weights,
        );
        assert!(err.is_err());
    }

    #[test]
    fn uniform_keys_stay_in_range() {
        let range = KeyRange::new(100, 120);
        let sampler = DateSampler::new(
            GenerationMode::UniformDate,
            &PatternTable::TEN_YEAR,
            range,
            &PhaseWeights::default(),
        )
        .unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..500 {
            let (key, phase) = sampler.sample(&mut rng);
            assert!(range.contains(key));
            assert_eq!(PatternTable::TEN_YEAR.classify(key), phase);
        }
    }
}
