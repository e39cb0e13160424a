use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::path::PathBuf;
use validator::{Validate, ValidationError};

use super::records::FactKind;
use crate::calendar::{AcademicPhase, PatternKind};

const DEFAULT_OUTPUT_DIR: &str = ".";
const DEFAULT_ID_WIDTH: usize = 5;
const DEFAULT_POPULAR_BOOKS: usize = 500;
const DEFAULT_RESERVATION_DAYS: u32 = 7;
const DEFAULT_PROGRESS_EVERY: usize = 25_000;

/// Inclusive surrogate-key range of a dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRange {
    pub start: u32,
    pub end: u32,
}

impl KeyRange {
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }

    pub fn len(&self) -> u32 {
        if self.is_empty() {
            0
        } else {
            self.end - self.start + 1
        }
    }

    pub fn contains(&self, key: u32) -> bool {
        (self.start..=self.end).contains(&key)
    }

    pub fn keys(&self) -> RangeInclusive<u32> {
        self.start..=self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DimensionRanges {
    pub date_keys: KeyRange,
    pub book_keys: KeyRange,
    pub member_keys: KeyRange,
    pub staff_keys: KeyRange,
    pub supplier_keys: KeyRange,
}

impl Default for DimensionRanges {
    fn default() -> Self {
        Self {
            // Ten simulated years of 365 days.
            date_keys: KeyRange::new(1, 3650),
            book_keys: KeyRange::new(1000, 10_999),
            member_keys: KeyRange::new(1000, 10_999),
            staff_keys: KeyRange::new(1000, 1020),
            supplier_keys: KeyRange::new(1000, 1010),
        }
    }
}

impl DimensionRanges {
    fn named(&self) -> [(&'static str, &KeyRange); 5] {
        [
            ("date_keys", &self.date_keys),
            ("book_keys", &self.book_keys),
            ("member_keys", &self.member_keys),
            ("staff_keys", &self.staff_keys),
            ("supplier_keys", &self.supplier_keys),
        ]
    }
}

/// Rows to generate per fact table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetVolumes {
    pub loan: usize,
    pub sale: usize,
    pub purchase: usize,
    pub reservation: usize,
}

impl Default for TargetVolumes {
    fn default() -> Self {
        Self {
            loan: 150_000,
            sale: 120_000,
            purchase: 100_000,
            reservation: 200_000,
        }
    }
}

impl TargetVolumes {
    pub fn for_kind(&self, kind: FactKind) -> usize {
        match kind {
            FactKind::Loan => self.loan,
            FactKind::Sale => self.sale,
            FactKind::Purchase => self.purchase,
            FactKind::Reservation => self.reservation,
        }
    }
}

/// How a record's date key is chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMode {
    /// Uniform date key, then classify it.
    #[default]
    UniformDate,
    /// Phase drawn from [`PhaseWeights`] first, then a date inside that phase.
    WeightedPhase,
}

/// Categorical phase distribution for [`GenerationMode::WeightedPhase`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseWeights {
    pub study_period: f64,
    pub exam_period: f64,
    pub semester_start: f64,
    pub holiday_break: f64,
    pub normal: f64,
}

impl Default for PhaseWeights {
    fn default() -> Self {
        Self {
            study_period: 0.15,
            exam_period: 0.20,
            semester_start: 0.25,
            holiday_break: 0.10,
            normal: 0.30,
        }
    }
}

impl PhaseWeights {
    pub fn weight(&self, phase: AcademicPhase) -> f64 {
        match phase {
            AcademicPhase::StudyPeriod => self.study_period,
            AcademicPhase::ExamPeriod => self.exam_period,
            AcademicPhase::SemesterStart => self.semester_start,
            AcademicPhase::HolidayBreak => self.holiday_break,
            AcademicPhase::Normal => self.normal,
        }
    }

    fn all(&self) -> [f64; 5] {
        [
            self.study_period,
            self.exam_period,
            self.semester_start,
            self.holiday_break,
            self.normal,
        ]
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdStyle {
    /// Monotonic sequence, zero padded, widening past the configured width.
    #[default]
    Sequential,
    /// Sequence taken modulo 99 999; ids repeat past that many rows.
    LegacyWrap,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatusMode {
    #[default]
    Uniform,
    /// Status follows the request's position in its book's queue.
    QueuePosition,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Directory receiving one CSV per fact table
    pub output_dir: PathBuf,

    /// Seed for reproducible output; entropy-seeded when absent
    pub seed: Option<u64>,

    pub mode: GenerationMode,

    pub pattern: PatternKind,

    pub volumes: TargetVolumes,

    #[validate(custom = "validate_dimension_ranges")]
    pub ranges: DimensionRanges,

    #[validate(custom = "validate_phase_weights")]
    pub phase_weights: PhaseWeights,

    pub id_style: IdStyle,

    #[validate(range(min = 1, max = 18))]
    pub id_width: usize,

    pub id_offset: u64,

    /// Size of the popular-book subset reservations cluster on
    pub popular_books: usize,

    /// Probability that a reservation targets a popular book
    #[validate(range(min = 0.0, max = 1.0))]
    pub popular_book_share: f64,

    pub reservation_status: ReservationStatusMode,

    /// Reservation window length in days; windows never exceed a week
    #[validate(range(max = 7))]
    pub reservation_days: u32,

    #[validate(range(min = 1))]
    pub progress_every: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            seed: None,
            mode: GenerationMode::default(),
            pattern: PatternKind::default(),
            volumes: TargetVolumes::default(),
            ranges: DimensionRanges::default(),
            phase_weights: PhaseWeights::default(),
            id_style: IdStyle::default(),
            id_width: DEFAULT_ID_WIDTH,
            id_offset: 0,
            popular_books: DEFAULT_POPULAR_BOOKS,
            popular_book_share: 1.0,
            reservation_status: ReservationStatusMode::default(),
            reservation_days: DEFAULT_RESERVATION_DAYS,
            progress_every: DEFAULT_PROGRESS_EVERY,
        }
    }
}

fn validate_dimension_ranges(ranges: &DimensionRanges) -> Result<(), ValidationError> {
    for (name, range) in ranges.named() {
        if range.is_empty() {
            let mut err = ValidationError::new("empty_key_range");
            err.message = Some(format!("{name} must satisfy start <= end").into());
            return Err(err);
        }
    }
    if ranges.date_keys.start == 0 {
        let mut err = ValidationError::new("date_keys");
        err.message = Some("date keys are 1-based".into());
        return Err(err);
    }
    Ok(())
}

fn validate_phase_weights(weights: &PhaseWeights) -> Result<(), ValidationError> {
    let all = weights.all();
    if all.iter().any(|w| !w.is_finite() || *w < 0.0) {
        let mut err = ValidationError::new("phase_weights");
        err.message = Some("phase weights must be finite and non-negative".into());
        return Err(err);
    }
    if all.iter().sum::<f64>() <= 0.0 {
        let mut err = ValidationError::new("phase_weights");
        err.message = Some("at least one phase weight must be positive".into());
        return Err(err);
    }
    Ok(())
}
