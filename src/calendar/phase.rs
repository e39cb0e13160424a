//! Academic-cycle classification of date keys.
//!
//! A date key is a 1-based day offset. Every simulated year is treated as exactly 365 days, so
//! the phase of a key depends only on its day of year and repeats every 365 keys. Leap days are
//! not modelled.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// Length of every simulated year.
pub const DAYS_PER_YEAR: u32 = 365;

/// Inclusive day-of-year range.
pub type DayRange = (u32, u32);

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AcademicPhase {
    StudyPeriod,
    ExamPeriod,
    SemesterStart,
    HolidayBreak,
    Normal,
}

impl AcademicPhase {
    /// Phases backed by explicit ranges, in matching priority order.
    pub const RANGED: [AcademicPhase; 4] = [
        AcademicPhase::StudyPeriod,
        AcademicPhase::ExamPeriod,
        AcademicPhase::SemesterStart,
        AcademicPhase::HolidayBreak,
    ];

    /// Study and exam weeks, where borrowing is short and heavy.
    pub fn is_assessment(self) -> bool {
        matches!(self, AcademicPhase::StudyPeriod | AcademicPhase::ExamPeriod)
    }
}

/// Day-of-year for a date key: `((key - 1) mod 365) + 1`.
pub fn day_of_year(date_key: u32) -> u32 {
    let offset = (i64::from(date_key) - 1).rem_euclid(i64::from(DAYS_PER_YEAR));
    offset as u32 + 1
}

/// Hard-coded ranges for one academic year.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternTable {
    pub study_period: &'static [DayRange],
    pub exam_period: &'static [DayRange],
    pub semester_start: &'static [DayRange],
    pub holiday_break: &'static [DayRange],
}

impl PatternTable {
    pub const PRIMARY: PatternTable = PatternTable {
        study_period: &[(10, 24), (130, 144), (270, 284)],
        exam_period: &[(25, 38), (145, 158), (285, 298)],
        semester_start: &[(39, 60), (244, 269)],
        holiday_break: &[(159, 243), (340, 365)],
    };

    /// Ranges used by the ten-year generator. Exam weeks overlap the start of semester on
    /// days 20-21; priority gives them to the exam period.
    pub const TEN_YEAR: PatternTable = PatternTable {
        study_period: &[(6, 12), (139, 145), (272, 278)],
        exam_period: &[(13, 21), (146, 159), (279, 292)],
        semester_start: &[(20, 50), (244, 270)],
        holiday_break: &[(160, 243), (355, 365)],
    };

    pub fn ranges(&self, phase: AcademicPhase) -> &'static [DayRange] {
        match phase {
            AcademicPhase::StudyPeriod => self.study_period,
            AcademicPhase::ExamPeriod => self.exam_period,
            AcademicPhase::SemesterStart => self.semester_start,
            AcademicPhase::HolidayBreak => self.holiday_break,
            AcademicPhase::Normal => &[],
        }
    }

    pub fn classify_day(&self, day_of_year: u32) -> AcademicPhase {
        AcademicPhase::RANGED
            .into_iter()
            .find(|phase| {
                self.ranges(*phase)
                    .iter()
                    .any(|(start, end)| (*start..=*end).contains(&day_of_year))
            })
            .unwrap_or(AcademicPhase::Normal)
    }

    pub fn classify(&self, date_key: u32) -> AcademicPhase {
        self.classify_day(day_of_year(date_key))
    }

    /// Every day of year that resolves to `phase` once priority is applied.
    pub fn days_of(&self, phase: AcademicPhase) -> Vec<u32> {
        (1..=DAYS_PER_YEAR)
            .filter(|day| self.classify_day(*day) == phase)
            .collect()
    }
}

/// Configuration-facing selector for a [`PatternTable`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    #[default]
    Primary,
    TenYear,
}

impl PatternKind {
    pub fn table(self) -> &'static PatternTable {
        match self {
            PatternKind::Primary => &PatternTable::PRIMARY,
            PatternKind::TenYear => &PatternTable::TEN_YEAR,
        }
    }
}

/// Classifies a date key against the primary pattern table.
pub fn classify(date_key: u32) -> AcademicPhase {
    PatternTable::PRIMARY.classify(date_key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[rstest]
    #[case(15, AcademicPhase::StudyPeriod)]
    #[case(200, AcademicPhase::HolidayBreak)]
    #[case(100, AcademicPhase::Normal)]
    #[case(30, AcademicPhase::ExamPeriod)]
    #[case(250, AcademicPhase::SemesterStart)]
    #[case(365, AcademicPhase::HolidayBreak)]
    fn primary_table_scenarios(#[case] day: u32, #[case] expected: AcademicPhase) {
        assert_eq!(classify(day), expected);
    }

    #[rstest]
    #[case(8, AcademicPhase::StudyPeriod)]
    #[case(15, AcademicPhase::ExamPeriod)]
    #[case(21, AcademicPhase::ExamPeriod)]
    #[case(22, AcademicPhase::SemesterStart)]
    #[case(200, AcademicPhase::HolidayBreak)]
    #[case(300, AcademicPhase::Normal)]
    fn ten_year_table_scenarios(#[case] day: u32, #[case] expected: AcademicPhase) {
        assert_eq!(PatternTable::TEN_YEAR.classify(day), expected);
    }

    #[test]
    fn day_of_year_wraps_every_365_keys() {
        assert_eq!(day_of_year(1), 1);
        assert_eq!(day_of_year(365), 365);
        assert_eq!(day_of_year(366), 1);
        assert_eq!(day_of_year(3650), 365);
        assert_eq!(day_of_year(0), 365);
    }

    #[test]
    fn no_leap_day_adjustment() {
        // Key 366 is 1 January of the second simulated year even if the first was a leap year.
        assert_eq!(classify(366 + 14), classify(15));
    }

    #[test]
    fn day_lists_partition_the_year() {
        for table in [PatternTable::PRIMARY, PatternTable::TEN_YEAR] {
            let total: usize = AcademicPhase::iter().map(|p| table.days_of(p).len()).sum();
            assert_eq!(total, DAYS_PER_YEAR as usize);
        }
        assert!(!PatternTable::TEN_YEAR
            .days_of(AcademicPhase::SemesterStart)
            .contains(&20));
    }

    #[test]
    fn phase_names_are_snake_case() {
        assert_eq!(AcademicPhase::HolidayBreak.to_string(), "holiday_break");
        assert_eq!(
            AcademicPhase::from_str("semester_start").unwrap(),
            AcademicPhase::SemesterStart
        );
    }
}
