//! Property-based tests for the classifier and the record generator.
//!
//! These use proptest to check invariants across seeds, key ranges and date keys.

use library_dw::calendar::{classify, PatternTable, DAYS_PER_YEAR};
use library_dw::generator::{
    DateSampler, FactGenerator, GenerationMode, GeneratorConfig, KeyRange, PhaseWeights,
};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rust_decimal::Decimal;

fn generator_for(config: &GeneratorConfig, seed: u64) -> FactGenerator<StdRng> {
    FactGenerator::with_rng(config, StdRng::seed_from_u64(seed)).unwrap()
}

fn weights_strategy() -> impl Strategy<Value = PhaseWeights> {
    (0.0f64..1.0, 0.0f64..1.0, 0.0f64..1.0, 0.0f64..1.0, 0.01f64..1.0).prop_map(
        |(study_period, exam_period, semester_start, holiday_break, normal)| PhaseWeights {
            study_period,
            exam_period,
            semester_start,
            holiday_break,
            normal,
        },
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    #[test]
    fn phase_repeats_every_365_keys(key in 1u32..1_000_000, years in 0u32..50) {
        prop_assert_eq!(classify(key), classify(key + DAYS_PER_YEAR * years));
        prop_assert_eq!(
            PatternTable::TEN_YEAR.classify(key),
            PatternTable::TEN_YEAR.classify(key + DAYS_PER_YEAR * years)
        );
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn sale_and_purchase_totals_are_rounded_products(seed in any::<u64>()) {
        let mut generator = generator_for(&GeneratorConfig::default(), seed);

        for sale in generator.sales(200) {
            prop_assert_eq!(
                sale.order_total_price,
                (Decimal::from(sale.order_qty) * sale.order_unit_price).round_dp(2)
            );
        }
        for purchase in generator.purchases(200) {
            prop_assert_eq!(
                purchase.purchase_total_cost,
                (Decimal::from(purchase.purchase_quantity) * purchase.purchase_unit_cost).round_dp(2)
            );
        }
    }

    #[test]
    fn loans_without_overdue_carry_no_fine(seed in any::<u64>()) {
        let mut generator = generator_for(&GeneratorConfig::default(), seed);

        for loan in generator.loans(300) {
            if loan.overdue_days == 0 {
                prop_assert!(loan.total_fine.is_zero());
                prop_assert!(!loan.fine_paid_flag);
            }
            if loan.fine_paid_flag {
                prop_assert!(!loan.total_fine.is_zero());
            }
        }
    }

    #[test]
    fn reservations_stay_within_window(
        seed in any::<u64>(),
        start in 1u32..3_000,
        span in 0u32..400,
    ) {
        let mut config = GeneratorConfig::default();
        config.ranges.date_keys = KeyRange::new(start, start + span);
        let mut generator = generator_for(&config, seed);

        for reservation in generator.reservations(200) {
            prop_assert!(reservation.reserve_end_date_key >= reservation.reserve_start_date_key);
            prop_assert!(reservation.reserve_end_date_key - reservation.reserve_start_date_key <= 7);
            prop_assert!(reservation.reserve_end_date_key <= start + span);
            prop_assert_eq!(
                reservation.reservation_duration,
                reservation.reserve_end_date_key - reservation.reserve_start_date_key
            );
        }
    }

    #[test]
    fn weighted_mode_keys_match_their_phase(
        seed in any::<u64>(),
        weights in weights_strategy(),
        start in 1u32..2_000,
        span in 400u32..2_000,
    ) {
        let range = KeyRange::new(start, start + span);
        let sampler = DateSampler::new(
            GenerationMode::WeightedPhase,
            &PatternTable::PRIMARY,
            range,
            &weights,
        )
        .unwrap();
        let mut rng = StdRng::seed_from_u64(seed);

        for _ in 0..200 {
            let (key, phase) = sampler.sample(&mut rng);
            prop_assert!(range.contains(key));
            prop_assert_eq!(PatternTable::PRIMARY.classify(key), phase);
        }

        let mut config = GeneratorConfig {
            mode: GenerationMode::WeightedPhase,
            phase_weights: weights,
            ..GeneratorConfig::default()
        };
        config.ranges.date_keys = range;
        for sale in generator_for(&config, seed).sales(50) {
            prop_assert!(range.contains(sale.date_key));
        }
    }
}
