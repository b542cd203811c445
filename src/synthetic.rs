//! Synthetic credit card applicants shaped like the UCI default dataset.
//!
//! Used to produce sample raw files for local runs and end-to-end tests.
//! Risky applicants carry late repayment history and high utilisation and
//! default far more often than reliable ones.

use crate::data::Table;
use crate::types::{CreditApplication, PREDICTOR_COLUMNS};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Seeded applicant generator
pub struct ApplicantGenerator {
    rng: StdRng,
    counter: u64,
}

impl ApplicantGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            counter: 0,
        }
    }

    fn base(&mut self) -> CreditApplication {
        self.counter += 1;
        let limit = (self.rng.gen_range(1..=50) * 10_000) as f64;
        let mut app = CreditApplication::new(limit, self.rng.gen_range(21..=75));
        app.sex = self.rng.gen_range(1..=2);
        app.education = self.rng.gen_range(0..=6);
        app.marriage = self.rng.gen_range(0..=3);
        app
    }

    /// Applicant who pays on time and keeps balances low
    pub fn generate_reliable(&mut self) -> CreditApplication {
        let mut app = self.base();
        let limit = app.limit_bal;

        let statuses: [i32; 6] = std::array::from_fn(|_| self.rng.gen_range(-2..=0));
        set_statuses(&mut app, statuses);

        let bills: [f64; 6] = std::array::from_fn(|_| (limit * self.rng.gen_range(0.0..0.4)).round());
        let payments: [f64; 6] = std::array::from_fn(|i| (bills[i] * self.rng.gen_range(0.5..1.0)).round());
        set_amounts(&mut app, bills, payments);
        app
    }

    /// Applicant with recent delinquencies and near-limit balances
    pub fn generate_risky(&mut self) -> CreditApplication {
        let mut app = self.base();
        let limit = app.limit_bal;

        let statuses: [i32; 6] = std::array::from_fn(|_| self.rng.gen_range(1..=4));
        set_statuses(&mut app, statuses);

        let bills: [f64; 6] = std::array::from_fn(|_| (limit * self.rng.gen_range(0.7..1.1)).round());
        let payments: [f64; 6] = std::array::from_fn(|i| (bills[i] * self.rng.gen_range(0.0..0.1)).round());
        set_amounts(&mut app, bills, payments);
        app
    }

    /// Applicant with its default label
    pub fn generate(&mut self, risky_rate: f64) -> (CreditApplication, bool) {
        if self.rng.gen_bool(risky_rate) {
            let app = self.generate_risky();
            (app, self.rng.gen_bool(0.75))
        } else {
            let app = self.generate_reliable();
            (app, self.rng.gen_bool(0.08))
        }
    }

    /// Raw table with an identifier column first and the label column last
    pub fn raw_table(&mut self, rows: usize, risky_rate: f64, id_column: &str, target_column: &str) -> Table {
        let mut columns = vec![id_column.to_string()];
        columns.extend(PREDICTOR_COLUMNS.iter().map(|c| c.to_string()));
        columns.push(target_column.to_string());

        let data = (0..rows)
            .map(|_| {
                let (app, defaulted) = self.generate(risky_rate);
                let mut row = Vec::with_capacity(columns.len());
                row.push(self.counter as f64);
                row.extend_from_slice(&app.values());
                row.push(if defaulted { 1.0 } else { 0.0 });
                row
            })
            .collect();
        Table::new(columns, data)
    }
}

fn set_statuses(app: &mut CreditApplication, s: [i32; 6]) {
    app.pay_0 = s[0];
    app.pay_2 = s[1];
    app.pay_3 = s[2];
    app.pay_4 = s[3];
    app.pay_5 = s[4];
    app.pay_6 = s[5];
}

fn set_amounts(app: &mut CreditApplication, bills: [f64; 6], payments: [f64; 6]) {
    app.bill_amt1 = bills[0];
    app.bill_amt2 = bills[1];
    app.bill_amt3 = bills[2];
    app.bill_amt4 = bills[3];
    app.bill_amt5 = bills[4];
    app.bill_amt6 = bills[5];
    app.pay_amt1 = payments[0];
    app.pay_amt2 = payments[1];
    app.pay_amt3 = payments[2];
    app.pay_amt4 = payments[3];
    app.pay_amt5 = payments[4];
    app.pay_amt6 = payments[5];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_table_layout() {
        let table = ApplicantGenerator::new(7).raw_table(20, 0.3, "ID", "default.payment.next.month");

        assert_eq!(table.n_rows(), 20);
        assert_eq!(table.columns()[0], "ID");
        assert_eq!(table.columns().last().map(String::as_str), Some("default.payment.next.month"));
        assert_eq!(table.value(0, "ID").unwrap(), 1.0);
        assert_eq!(table.value(19, "ID").unwrap(), 20.0);
    }

    #[test]
    fn test_generation_is_seeded() {
        let a = ApplicantGenerator::new(1).raw_table(5, 0.5, "ID", "y");
        let b = ApplicantGenerator::new(1).raw_table(5, 0.5, "ID", "y");
        assert_eq!(a.rows(), b.rows());
    }

    #[test]
    fn test_profiles() {
        let mut generator = ApplicantGenerator::new(3);
        let risky = generator.generate_risky();
        assert!(risky.pay_0 >= 1);
        assert!(risky.bill_amt1 >= risky.pay_amt1);

        let reliable = generator.generate_reliable();
        assert!(reliable.pay_0 <= 0);
        assert!(reliable.bill_amt1 <= reliable.limit_bal);
    }
}
