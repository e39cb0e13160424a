use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::info;

use crate::errors::ServiceError;
use crate::generator::records::FactRow;

/// Writes `records` as CSV with a header row of field names, even when there are no rows.
pub fn write_records<T: FactRow>(path: &Path, records: &[T]) -> Result<(), ServiceError> {
    let file = File::create(path)?;
    write_records_to(file, records)?;
    info!("Wrote {} rows to {}", records.len(), path.display());
    Ok(())
}

pub fn write_records_to<W: Write, T: FactRow>(
    writer: W,
    records: &[T],
) -> Result<(), ServiceError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    // serde only emits the header alongside the first row
    if records.is_empty() {
        csv_writer.write_record(T::COLUMNS)?;
    }
    for record in records {
        csv_writer.serialize(record)?;
    }
    csv_writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::records::{LoanRecord, PurchaseRecord, ReservationRecord, SaleRecord};
    use crate::generator::{FactGenerator, GeneratorConfig};
    use rust_decimal_macros::dec;

    #[test]
    fn header_matches_field_order() {
        let sale = SaleRecord {
            date_key: 40,
            member_key: 1001,
            book_key: 2002,
            staff_key: 1003,
            order_id: "S00000".into(),
            order_qty: 2,
            order_unit_price: dec!(31.25),
            order_total_price: dec!(62.50),
        };
        let mut buffer = Vec::new();
        write_records_to(&mut buffer, &[sale]).unwrap();

        let text = String::from_utf8(buffer).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("date_key,member_key,book_key,staff_key,order_id,order_qty,order_unit_price,order_total_price")
        );
        assert_eq!(lines.next(), Some("40,1001,2002,1003,S00000,2,31.25,62.50"));
    }

    #[test]
    fn records_land_in_the_named_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("purchase_fact.csv");
        let purchase = PurchaseRecord {
            date_key: 170,
            book_key: 1500,
            staff_key: 1001,
            supplier_key: 1002,
            purchase_id: "P00000".into(),
            purchase_quantity: 12,
            purchase_unit_cost: dec!(20.00),
            purchase_total_cost: dec!(240.00),
        };

        write_records(&path, &[purchase.clone(), purchase]).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let rows: Vec<PurchaseRecord> = reader.deserialize().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].purchase_total_cost, dec!(240.00));
    }

    fn header_of<T: FactRow>(records: &[T]) -> String {
        let mut buffer = Vec::new();
        write_records_to(&mut buffer, records).unwrap();
        String::from_utf8(buffer)
            .unwrap()
            .lines()
            .next()
            .unwrap_or_default()
            .to_string()
    }

    #[test]
    fn empty_files_still_carry_the_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sales_fact.csv");

        write_records::<SaleRecord>(&path, &[]).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.trim_end(), SaleRecord::COLUMNS.join(","));
    }

    #[test]
    fn column_lists_match_serialized_headers() {
        let mut generator = FactGenerator::new(&GeneratorConfig {
            seed: Some(3),
            ..GeneratorConfig::default()
        })
        .unwrap();

        assert_eq!(header_of(&generator.loans(1)), header_of::<LoanRecord>(&[]));
        assert_eq!(header_of(&generator.sales(1)), header_of::<SaleRecord>(&[]));
        assert_eq!(
            header_of(&generator.purchases(1)),
            header_of::<PurchaseRecord>(&[])
        );
        assert_eq!(
            header_of(&generator.reservations(1)),
            header_of::<ReservationRecord>(&[])
        );
    }
}
