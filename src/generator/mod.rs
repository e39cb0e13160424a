//! Pattern-aware synthetic fact generation.
//!
//! Every record draws a date key through a [`DateSampler`], and the academic phase of that key
//! shapes its measures: short, fine-prone loans around exams, bulk sales at semester start,
//! restocking purchases over the holidays.

pub mod dates;
pub mod ids;
pub mod output;
pub mod records;
pub mod settings;

use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use strum::IntoEnumIterator;
use tracing::{debug, info};
use validator::Validate;

use crate::calendar::AcademicPhase;
use crate::errors::ServiceError;

pub use dates::DateSampler;
pub use ids::IdFormatter;
pub use output::write_records;
pub use records::{
    FactKind, FactRow, LoanRecord, LoanStatus, PurchaseRecord, ReservationRecord,
    ReservationStatus, SaleRecord,
};
pub use settings::{
    DimensionRanges, GenerationMode, GeneratorConfig, IdStyle, KeyRange, PhaseWeights,
    ReservationStatusMode, TargetVolumes,
};

const RESERVATION_STATUSES: [ReservationStatus; 4] = [
    ReservationStatus::Fulfilled,
    ReservationStatus::Expired,
    ReservationStatus::Active,
    ReservationStatus::Cancelled,
];

/// A CSV file written by [`generate_all`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    pub kind: FactKind,
    pub path: PathBuf,
    pub rows: usize,
}

pub struct FactGenerator<R = StdRng> {
    config: GeneratorConfig,
    sampler: DateSampler,
    popular_books: Vec<u32>,
    sequences: HashMap<FactKind, u64>,
    queue_lengths: HashMap<u32, u32>,
    rng: R,
}

impl FactGenerator<StdRng> {
    /// Seeded from `config.seed` when present, otherwise from OS entropy.
    pub fn new(config: &GeneratorConfig) -> Result<Self, ServiceError> {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_rng(config, rng)
    }
}

impl<R: Rng> FactGenerator<R> {
    pub fn with_rng(config: &GeneratorConfig, mut rng: R) -> Result<Self, ServiceError> {
        config.validate()?;

        let sampler = DateSampler::new(
            config.mode,
            config.pattern.table(),
            config.ranges.date_keys,
            &config.phase_weights,
        )?;

        let books = config.ranges.book_keys;
        let amount = config.popular_books.min(books.len() as usize);
        let popular_books = index::sample(&mut rng, books.len() as usize, amount)
            .into_iter()
            .map(|offset| books.start + offset as u32)
            .collect();

        Ok(Self {
            config: config.clone(),
            sampler,
            popular_books,
            sequences: HashMap::new(),
            queue_lengths: HashMap::new(),
            rng,
        })
    }

    pub fn popular_books(&self) -> &[u32] {
        &self.popular_books
    }

    pub fn loans(&mut self, n: usize) -> Vec<LoanRecord> {
        let ids = self.id_formatter(FactKind::Loan);
        let mut records = Vec::with_capacity(n);

        for _ in 0..n {
            let (date_key, phase) = self.sampler.sample(&mut self.rng);

            let (loan_duration, overdue_days) = if phase.is_assessment() {
                let overdue = self.maybe(0.3, 0..=5);
                (self.rng.gen_range(7..=21), overdue)
            } else {
                let overdue = self.maybe(0.2, 0..=10);
                (self.rng.gen_range(14..=30), overdue)
            };

            let total_fine = if overdue_days > 0 {
                let per_day = Decimal::new(self.rng.gen_range(5_000..=20_000), 4);
                (Decimal::from(overdue_days) * per_day).round_dp(2)
            } else {
                Decimal::new(0, 2)
            };
            let fine_paid_flag = !total_fine.is_zero() && self.rng.gen_bool(0.7);

            let loan_status = if self.rng.gen_bool(0.5) {
                LoanStatus::Active
            } else {
                LoanStatus::Returned
            };

            records.push(LoanRecord {
                member_key: self.key(self.config.ranges.member_keys),
                book_key: self.key(self.config.ranges.book_keys),
                staff_key: self.key(self.config.ranges.staff_keys),
                date_key,
                loan_id: ids.format(self.next_sequence(FactKind::Loan)),
                loan_duration,
                overdue_days,
                loan_status,
                total_fine,
                fine_paid_flag,
            });
            self.log_progress(FactKind::Loan, records.len(), n);
        }

        records
    }

    pub fn sales(&mut self, n: usize) -> Vec<SaleRecord> {
        let ids = self.id_formatter(FactKind::Sale);
        let mut records = Vec::with_capacity(n);

        for _ in 0..n {
            let (date_key, phase) = self.sampler.sample(&mut self.rng);

            let (order_qty, cents) = match phase {
                AcademicPhase::SemesterStart => {
                    (self.rng.gen_range(1..=5), self.rng.gen_range(3_000..=8_000))
                }
                p if p.is_assessment() => {
                    (self.rng.gen_range(1..=3), self.rng.gen_range(1_500..=4_500))
                }
                _ => (1, self.rng.gen_range(2_000..=5_000)),
            };
            let order_unit_price = Decimal::new(cents, 2);

            records.push(SaleRecord {
                date_key,
                member_key: self.key(self.config.ranges.member_keys),
                book_key: self.key(self.config.ranges.book_keys),
                staff_key: self.key(self.config.ranges.staff_keys),
                order_id: ids.format(self.next_sequence(FactKind::Sale)),
                order_qty,
                order_unit_price,
                order_total_price: line_total(order_qty, order_unit_price),
            });
            self.log_progress(FactKind::Sale, records.len(), n);
        }

        records
    }

    pub fn purchases(&mut self, n: usize) -> Vec<PurchaseRecord> {
        let ids = self.id_formatter(FactKind::Purchase);
        let mut records = Vec::with_capacity(n);

        for _ in 0..n {
            let (date_key, phase) = self.sampler.sample(&mut self.rng);

            let (purchase_quantity, cents) = match phase {
                AcademicPhase::HolidayBreak | AcademicPhase::SemesterStart => {
                    (self.rng.gen_range(10..=40), self.rng.gen_range(1_800..=3_500))
                }
                _ => (self.rng.gen_range(1..=10), self.rng.gen_range(1_500..=3_000)),
            };
            let purchase_unit_cost = Decimal::new(cents, 2);

            records.push(PurchaseRecord {
                date_key,
                book_key: self.key(self.config.ranges.book_keys),
                staff_key: self.key(self.config.ranges.staff_keys),
                supplier_key: self.key(self.config.ranges.supplier_keys),
                purchase_id: ids.format(self.next_sequence(FactKind::Purchase)),
                purchase_quantity,
                purchase_unit_cost,
                purchase_total_cost: line_total(purchase_quantity, purchase_unit_cost),
            });
            self.log_progress(FactKind::Purchase, records.len(), n);
        }

        records
    }

    pub fn reservations(&mut self, n: usize) -> Vec<ReservationRecord> {
        let ids = self.id_formatter(FactKind::Reservation);
        let max_date_key = self.config.ranges.date_keys.end;
        let mut records = Vec::with_capacity(n);

        for _ in 0..n {
            let (reserve_start_date_key, _) = self.sampler.sample(&mut self.rng);
            let reserve_end_date_key = reserve_start_date_key
                .saturating_add(self.config.reservation_days)
                .min(max_date_key);

            let book_key = self.reservation_book();
            let reservation_status = match self.config.reservation_status {
                ReservationStatusMode::Uniform => {
                    RESERVATION_STATUSES[self.rng.gen_range(0..RESERVATION_STATUSES.len())]
                }
                ReservationStatusMode::QueuePosition => self.queued_status(book_key),
            };

            records.push(ReservationRecord {
                member_key: self.key(self.config.ranges.member_keys),
                book_key,
                staff_key: self.key(self.config.ranges.staff_keys),
                reserve_start_date_key,
                reserve_end_date_key,
                reserve_id: ids.format(self.next_sequence(FactKind::Reservation)),
                reservation_status,
                reservation_duration: reserve_end_date_key - reserve_start_date_key,
            });
            self.log_progress(FactKind::Reservation, records.len(), n);
        }

        records
    }

    /// Generates `n` rows of `kind` and writes them to `dir/<table>.csv`.
    pub fn generate_kind(
        &mut self,
        kind: FactKind,
        n: usize,
        dir: &Path,
    ) -> Result<GeneratedFile, ServiceError> {
        let path = dir.join(kind.file_name());
        info!("Generating {} {} records", n, kind);

        match kind {
            FactKind::Loan => write_records(&path, &self.loans(n))?,
            FactKind::Sale => write_records(&path, &self.sales(n))?,
            FactKind::Purchase => write_records(&path, &self.purchases(n))?,
            FactKind::Reservation => write_records(&path, &self.reservations(n))?,
        }

        Ok(GeneratedFile {
            kind,
            path,
            rows: n,
        })
    }

    fn id_formatter(&self, kind: FactKind) -> IdFormatter {
        IdFormatter::new(
            kind.id_prefix(),
            self.config.id_style,
            self.config.id_width,
            self.config.id_offset,
        )
    }

    fn next_sequence(&mut self, kind: FactKind) -> u64 {
        let next = self.sequences.entry(kind).or_insert(0);
        let current = *next;
        *next += 1;
        current
    }

    fn key(&mut self, range: KeyRange) -> u32 {
        self.rng.gen_range(range.keys())
    }

    /// `range` with probability `p`, otherwise zero.
    fn maybe(&mut self, p: f64, range: std::ops::RangeInclusive<u32>) -> u32 {
        if self.rng.gen_bool(p) {
            self.rng.gen_range(range)
        } else {
            0
        }
    }

    fn reservation_book(&mut self) -> u32 {
        if !self.popular_books.is_empty() && self.rng.gen_bool(self.config.popular_book_share) {
            self.popular_books[self.rng.gen_range(0..self.popular_books.len())]
        } else {
            self.key(self.config.ranges.book_keys)
        }
    }

    fn queued_status(&mut self, book_key: u32) -> ReservationStatus {
        let position = self.queue_lengths.entry(book_key).or_insert(0);
        let current = *position;
        *position += 1;

        match current {
            0..=2 => ReservationStatus::Fulfilled,
            3..=4 => ReservationStatus::Expired,
            _ if self.rng.gen_bool(0.7) => ReservationStatus::Active,
            _ => ReservationStatus::Cancelled,
        }
    }

    fn log_progress(&self, kind: FactKind, done: usize, total: usize) {
        if done % self.config.progress_every == 0 {
            info!("Generated {}/{} {} records", done, total, kind);
        }
    }
}

fn line_total(quantity: u32, unit: Decimal) -> Decimal {
    (Decimal::from(quantity) * unit).round_dp(2)
}

/// Generates the configured volume of every fact kind into `config.output_dir`.
pub fn generate_all(config: &GeneratorConfig) -> Result<Vec<GeneratedFile>, ServiceError> {
    fs::create_dir_all(&config.output_dir)?;

    let mut generator = FactGenerator::new(config)?;
    debug!(
        "Generator ready: mode={:?}, pattern={:?}, {} popular books",
        config.mode,
        config.pattern,
        generator.popular_books().len()
    );

    let mut files = Vec::new();
    for kind in FactKind::iter() {
        let rows = config.volumes.for_kind(kind);
        files.push(generator.generate_kind(kind, rows, &config.output_dir)?);
    }

    let total: usize = files.iter().map(|f| f.rows).sum();
    info!(
        "Generated {} records across {} files in {}",
        total,
        files.len(),
        config.output_dir.display()
    );
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::PatternKind;
    use std::collections::HashSet;

    fn seeded(config: &GeneratorConfig) -> FactGenerator<StdRng> {
        FactGenerator::with_rng(config, StdRng::seed_from_u64(42)).unwrap()
    }

    #[test]
    fn same_seed_same_records() {
        let config = GeneratorConfig {
            seed: Some(11),
            ..GeneratorConfig::default()
        };
        let first = FactGenerator::new(&config).unwrap().sales(200);
        let second = FactGenerator::new(&config).unwrap().sales(200);
        assert_eq!(first, second);
    }

    #[test]
    fn loans_follow_phase_rules() {
        let config = GeneratorConfig::default();
        let table = config.pattern.table();
        let mut generator = seeded(&config);

        for loan in generator.loans(3_000) {
            let phase = table.classify(loan.date_key);
            if phase.is_assessment() {
                assert!((7..=21).contains(&loan.loan_duration));
                assert!(loan.overdue_days <= 5);
            } else {
                assert!((14..=30).contains(&loan.loan_duration));
                assert!(loan.overdue_days <= 10);
            }
            if loan.overdue_days == 0 {
                assert!(loan.total_fine.is_zero());
                assert!(!loan.fine_paid_flag);
            } else {
                let min = Decimal::from(loan.overdue_days) * Decimal::new(50, 2);
                let max = Decimal::from(loan.overdue_days) * Decimal::new(200, 2);
                assert!(loan.total_fine >= min && loan.total_fine <= max);
            }
            assert_eq!(loan.total_fine.scale(), 2);
        }
    }

    #[test]
    fn semester_start_sales_are_bulk() {
        let config = GeneratorConfig {
            mode: GenerationMode::WeightedPhase,
            phase_weights: PhaseWeights {
                study_period: 0.0,
                exam_period: 0.0,
                semester_start: 1.0,
                holiday_break: 0.0,
                normal: 0.0,
            },
            ..GeneratorConfig::default()
        };
        let mut generator = seeded(&config);

        for sale in generator.sales(1_000) {
            assert_eq!(
                PatternKind::Primary.table().classify(sale.date_key),
                AcademicPhase::SemesterStart
            );
            assert!((1..=5).contains(&sale.order_qty));
            assert!(sale.order_unit_price >= Decimal::new(3_000, 2));
            assert!(sale.order_unit_price <= Decimal::new(8_000, 2));
        }
    }

    #[test]
    fn holiday_purchases_restock() {
        let config = GeneratorConfig {
            mode: GenerationMode::WeightedPhase,
            phase_weights: PhaseWeights {
                study_period: 0.0,
                exam_period: 0.0,
                semester_start: 0.0,
                holiday_break: 1.0,
                normal: 0.0,
            },
            ..GeneratorConfig::default()
        };
        let mut generator = seeded(&config);

        for purchase in generator.purchases(500) {
            assert!((10..=40).contains(&purchase.purchase_quantity));
            assert_eq!(
                purchase.purchase_total_cost,
                line_total(purchase.purchase_quantity, purchase.purchase_unit_cost)
            );
        }
    }

    #[test]
    fn reservations_cluster_on_popular_books() {
        let config = GeneratorConfig {
            popular_books: 20,
            ..GeneratorConfig::default()
        };
        let mut generator = seeded(&config);
        let popular: HashSet<u32> = generator.popular_books().iter().copied().collect();
        assert_eq!(popular.len(), 20);

        for reservation in generator.reservations(2_000) {
            assert!(popular.contains(&reservation.book_key));
            assert!(reservation.reservation_duration <= 7);
            assert!(reservation.reserve_end_date_key <= 3650);
        }
    }

    #[test]
    fn reservations_clamp_at_last_date_key() {
        let mut config = GeneratorConfig::default();
        config.ranges.date_keys = KeyRange::new(3645, 3650);
        let mut generator = seeded(&config);

        for reservation in generator.reservations(200) {
            assert_eq!(
                reservation.reserve_end_date_key,
                (reservation.reserve_start_date_key + 7).min(3650)
            );
        }
    }

    #[test]
    fn queue_position_statuses() {
        let mut config = GeneratorConfig {
            popular_books: 1,
            reservation_status: ReservationStatusMode::QueuePosition,
            ..GeneratorConfig::default()
        };
        config.ranges.book_keys = KeyRange::new(1000, 1000);
        let mut generator = seeded(&config);

        let statuses: Vec<ReservationStatus> = generator
            .reservations(40)
            .into_iter()
            .map(|r| r.reservation_status)
            .collect();

        assert_eq!(&statuses[..3], &[ReservationStatus::Fulfilled; 3]);
        assert_eq!(&statuses[3..5], &[ReservationStatus::Expired; 2]);
        assert!(statuses[5..].iter().all(|s| matches!(
            s,
            ReservationStatus::Active | ReservationStatus::Cancelled
        )));
    }

    #[test]
    fn ids_continue_across_calls() {
        let config = GeneratorConfig::default();
        let mut generator = seeded(&config);
        let first = generator.sales(2);
        let second = generator.sales(1);
        assert_eq!(first[0].order_id, "S00000");
        assert_eq!(first[1].order_id, "S00001");
        assert_eq!(second[0].order_id, "S00002");
    }

    #[test]
    fn popular_books_clamped_to_book_range() {
        let mut config = GeneratorConfig::default();
        config.ranges.book_keys = KeyRange::new(1000, 1009);
        let generator = seeded(&config);
        assert_eq!(generator.popular_books().len(), 10);
    }

    #[test]
    fn generate_all_writes_four_files() {
        let dir = tempfile::tempdir().unwrap();
        let config = GeneratorConfig {
            output_dir: dir.path().join("out"),
            seed: Some(3),
            volumes: TargetVolumes {
                loan: 30,
                sale: 20,
                purchase: 10,
                reservation: 40,
            },
            ..GeneratorConfig::default()
        };

        let files = generate_all(&config).unwrap();
        assert_eq!(files.len(), 4);
        for file in &files {
            let mut reader = csv::Reader::from_path(&file.path).unwrap();
            assert_eq!(reader.records().count(), file.rows);
            assert_eq!(file.rows, config.volumes.for_kind(file.kind));
        }
        assert!(dir.path().join("out/reservation_fact.csv").exists());
    }
}
