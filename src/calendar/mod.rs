//! Calendar knowledge: academic phases of date keys and public holidays.

pub mod holidays;
pub mod phase;

pub use holidays::{
    calendar_from_config, ExtraHolidays, HolidayCalendar, HolidayMap, LayeredCalendar,
    MalaysiaCalendar, Subdivision,
};
pub use phase::{classify, day_of_year, AcademicPhase, PatternKind, PatternTable, DAYS_PER_YEAR};
