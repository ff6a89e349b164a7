//! Implements the very simple `Sheet` trait using in-memory data for testing purposes.
//!
//! Note: this is compiled even in the "production" version of this app so that we can run the whole
//! app, top-to-bottom, without using Google Sheets. Writes live only as long as the process.

use crate::error::Res;
use crate::store::Sheet;
use anyhow::{anyhow, Context};
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::{Arc, Mutex, MutexGuard};

type Worksheets = HashMap<String, Vec<Vec<String>>>;

/// An implementation of the `Sheet` trait that does not use Google sheets. It can hold any data in
/// memory and can be seeded with sample ledger rows. Clones share the same data, the way two
/// clients share one spreadsheet.
#[derive(Debug, Default, Clone)]
pub(crate) struct TestSheet {
    data: Arc<Mutex<Worksheets>>,
}

impl TestSheet {
    /// Create a new `TestSheet` using `data`. The map key is sheet name and the map value is the
    /// rows of the sheet.
    pub(crate) fn new(data: Worksheets) -> Self {
        Self {
            data: Arc::new(Mutex::new(data)),
        }
    }

    fn lock(&self) -> Res<MutexGuard<'_, Worksheets>> {
        self.data
            .lock()
            .map_err(|_| anyhow!("The in-memory sheet data is poisoned"))
    }

    /// A `TestSheet` whose `worksheet` holds the sample ledger.
    pub(crate) fn seeded(worksheet: &str) -> Self {
        let mut data = HashMap::new();
        data.insert(worksheet.to_string(), seed_rows());
        Self::new(data)
    }

    /// A `TestSheet` with an existing but empty `worksheet`.
    pub(crate) fn empty(worksheet: &str) -> Self {
        let mut data = HashMap::new();
        data.insert(worksheet.to_string(), Vec::new());
        Self::new(data)
    }
}

#[async_trait::async_trait]
impl Sheet for TestSheet {
    async fn get(&mut self, sheet_name: &str) -> Res<Vec<Vec<String>>> {
        let data = self.lock()?;
        let rows = data
            .get(sheet_name)
            .with_context(|| format!("Sheet '{sheet_name}' not found"))?;
        Ok(rows.clone())
    }

    async fn append_rows(&mut self, sheet_name: &str, rows: &[Vec<String>]) -> Res<()> {
        let mut data = self.lock()?;
        let sheet = data
            .get_mut(sheet_name)
            .with_context(|| format!("Sheet '{sheet_name}' not found"))?;
        // Like the Sheets API, trailing blank rows are not part of the table
        while sheet
            .last()
            .is_some_and(|row| row.iter().all(|cell| cell.trim().is_empty()))
        {
            sheet.pop();
        }
        sheet.extend(rows.iter().cloned());
        Ok(())
    }
}

/// The sample ledger, or no rows if the embedded CSV cannot be read.
fn seed_rows() -> Vec<Vec<String>> {
    load_csv(LEDGER_DATA).unwrap_or_default()
}

/// Loads data from a CSV-formatted string.
fn load_csv(csv_data: &str) -> Res<Vec<Vec<String>>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(Cursor::new(csv_data.as_bytes()));

    let mut rows: Vec<Vec<String>> = Vec::new();
    for result in rdr.records() {
        let record = result.context("Invalid CSV record")?;
        rows.push(record.iter().map(|field| field.to_string()).collect());
    }
    Ok(rows)
}

/// Seed ledger rows. The header is the current one; a few rows use the labels and formats of the
/// first version of the sheet, and one row has a date that cannot be parsed.
const LEDGER_DATA: &str = r##"Timestamp,Owner,Date,Kind,Category,Description,Amount,Payment Method
2024-01-02 08:10:00,Carol,2024-01-02,Income,Salary,January salary,4200.00,Transfer
2024-01-03 09:12:44,Marcio,2024-01-03,Income,Salary,January salary,3800.00,Transfer
2024-01-05 19:30:12,Carol,2024-01-05,Expense,Housing,Rent,1800.00,Transfer
2024-01-07 12:01:55,Marcio,2024-01-07,Expense,Food,Groceries,312.47,Debit
2024-01-12 21:15:03,Carol,2024-01-12,Expense,Leisure,Cinema,64.00,Credit
2024-01-18 07:45:30,Marcio,2024-01-18,Expense,Transport,Fuel,220.10,Pix
2024-01-26 10:20:00,Carol,2024-01-26,Expense,Health,Pharmacy,89.90,Credit
2024-02-01 08:05:00,Carol,2024-02-01,Receita,Salary,February salary,"R$ 4,200.00",Transfer
2024-02-02 08:06:00,Marcio,2024-02-02,Income,Salary,February salary,3800.00,Transfer
2024-02-05 19:00:00,Carol,2024-02-05,Expense,Housing,Rent,1800.00,Transfer
2024-02-09 13:40:21,Marcio,2024-02-09,Despesa,Food,Restaurant,145.60,Credit
2024-02-14 20:11:11,Marcio,2024-02-14,Expense,Leisure,Valentine's dinner,230.00,Credit
2024-02-20 09:00:00,Carol,2024-02-20,Expense,Education,Online course,199.00,Pix
2024-02-22 18:30:00,Carol,2024-02-31,Expense,Food,Bakery,18.50,Cash
2024-03-01 08:00:00,Carol,2024-03-01,Income,Salary,March salary,4200.00,Transfer
2024-03-01 08:01:00,Marcio,2024-03-01,Income,Salary,March salary,3800.00,Transfer
2024-03-04 19:05:00,Carol,2024-03-04,Expense,Housing,Rent,1800.00,Transfer
2024-03-08 11:22:33,Marcio,2024-03-08,Expense,Food,Groceries,287.35,Debit
2024-03-15 16:45:00,Marcio,2024-03-15,Expense,Investment,Index fund,1000.00,Transfer
2024-03-21 07:50:00,Carol,2024-03-21,Expense,Transport,Bus pass,95.00,Pix
"##;
