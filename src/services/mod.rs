pub mod bulk_loader;
pub mod calendar_seed;
pub mod holiday_update;
