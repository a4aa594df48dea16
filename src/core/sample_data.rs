//! Synthetic CSV datasets for the two change-data-capture scenarios.
//!
//! Scenario A (customers) carries a `last_updated_ts` column for
//! watermark-based ingestion. Scenario B (products) has no timestamp and is
//! meant for hash-based change detection. Each scenario produces an initial
//! load and two deltas mixing new and modified rows. Output is deterministic
//! for a given seed.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveDate, NaiveDateTime};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::error::Result;
use crate::utils::io;

pub const DEFAULT_SEED: u64 = 42;
pub const WITH_TIMESTAMP_DIR: &str = "scenario_with_timestamp";
pub const WITHOUT_TIMESTAMP_DIR: &str = "scenario_without_timestamp";

const FIRST_NAMES: &[&str] = &[
    "James", "Mary", "John", "Patricia", "Robert", "Jennifer", "Michael", "Linda", "William",
    "Elizabeth", "David", "Barbara", "Richard", "Susan", "Joseph", "Jessica", "Thomas", "Sarah",
    "Charles", "Karen", "Christopher", "Nancy", "Daniel", "Lisa", "Matthew", "Betty", "Anthony",
    "Margaret", "Mark", "Sandra",
];

const LAST_NAMES: &[&str] = &[
    "Smith", "Johnson", "Williams", "Brown", "Jones", "Garcia", "Miller", "Davis", "Rodriguez",
    "Martinez", "Hernandez", "Lopez", "Gonzalez", "Wilson", "Anderson", "Thomas", "Taylor",
    "Moore", "Jackson", "Martin", "Lee", "Perez", "Thompson", "White", "Harris", "Sanchez",
    "Clark", "Ramirez", "Lewis", "Robinson",
];

/// Cities paired index-for-index with `STATES`.
const CITIES: &[&str] = &[
    "New York", "Los Angeles", "Chicago", "Houston", "Phoenix", "Philadelphia", "San Antonio",
    "San Diego", "Dallas", "San Jose", "Austin", "Jacksonville", "Fort Worth", "Columbus",
    "Charlotte", "Seattle", "Denver", "Boston",
];

const STATES: &[&str] = &[
    "NY", "CA", "IL", "TX", "AZ", "PA", "TX", "CA", "TX", "CA", "TX", "FL", "TX", "OH", "NC",
    "WA", "CO", "MA",
];

const EMAIL_DOMAINS: &[&str] = &[
    "gmail.com",
    "yahoo.com",
    "outlook.com",
    "hotmail.com",
    "company.com",
];

const PRODUCT_CATEGORIES: &[&str] = &[
    "Electronics",
    "Clothing",
    "Home & Garden",
    "Sports",
    "Books",
    "Toys",
];
const PRODUCT_ADJECTIVES: &[&str] = &[
    "Premium", "Basic", "Pro", "Ultra", "Eco", "Smart", "Classic", "Modern",
];
const PRODUCT_NOUNS: &[&str] = &[
    "Widget", "Gadget", "Device", "Tool", "Kit", "Set", "Pack", "Bundle",
];

const CUSTOMER_HEADER: &[&str] = &[
    "customer_id",
    "first_name",
    "last_name",
    "email",
    "phone",
    "city",
    "state",
    "credit_limit",
    "last_updated_ts",
];

const PRODUCT_HEADER: &[&str] = &[
    "product_id",
    "product_name",
    "category",
    "price",
    "stock_quantity",
    "supplier_id",
    "is_active",
];

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleFile {
    pub scenario: String,
    pub path: String,
    pub records: usize,
    pub new_records: usize,
    pub modified_records: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleDataReport {
    pub output_dir: String,
    pub seed: u64,
    pub files: Vec<SampleFile>,
    pub final_customers: usize,
    pub final_products: usize,
}

#[derive(Debug, Clone)]
struct Customer {
    id: u32,
    first_name: &'static str,
    last_name: &'static str,
    email: String,
    phone: String,
    city: &'static str,
    state: &'static str,
    credit_limit: f64,
    last_updated: NaiveDateTime,
}

impl Customer {
    fn row(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.first_name.to_string(),
            self.last_name.to_string(),
            self.email.clone(),
            self.phone.clone(),
            self.city.to_string(),
            self.state.to_string(),
            format!("{:.2}", self.credit_limit),
            self.last_updated.format("%Y-%m-%d %H:%M:%S").to_string(),
        ]
    }
}

#[derive(Debug, Clone)]
struct Product {
    id: u32,
    name: String,
    category: &'static str,
    price: f64,
    stock_quantity: u32,
    supplier: u32,
    is_active: bool,
}

impl Product {
    fn row(&self) -> Vec<String> {
        vec![
            format!("PROD-{:04}", self.id),
            self.name.clone(),
            self.category.to_string(),
            format!("{:.2}", self.price),
            self.stock_quantity.to_string(),
            format!("SUP-{:03}", self.supplier),
            self.is_active.to_string(),
        ]
    }
}

/// Generate both scenarios under `output_dir`.
pub fn generate(output_dir: &Path, seed: u64) -> Result<SampleDataReport> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut files = Vec::new();

    let customers = generate_customers(&output_dir.join(WITH_TIMESTAMP_DIR), &mut rng, &mut files)?;
    let products =
        generate_products(&output_dir.join(WITHOUT_TIMESTAMP_DIR), &mut rng, &mut files)?;

    Ok(SampleDataReport {
        output_dir: output_dir.display().to_string(),
        seed,
        files,
        final_customers: customers,
        final_products: products,
    })
}

fn base_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 1, 1)
        .and_then(|d| d.and_hms_opt(10, 0, 0))
        .expect("2025-01-01 10:00:00 is a valid timestamp")
}

fn generate_customers(dir: &Path, rng: &mut StdRng, files: &mut Vec<SampleFile>) -> Result<usize> {
    io::ensure_dir(dir, "create customer scenario dir")?;
    log_status!("sample-data", "Generating customers with timestamp in {}", dir.display());

    let base = base_time();
    let mut customers: BTreeMap<u32, Customer> = BTreeMap::new();

    for id in 1..=20 {
        let ts = base + Duration::minutes(rng.random_range(0..=60));
        customers.insert(id, new_customer(rng, id, ts));
    }
    let initial: Vec<Customer> = customers.values().cloned().collect();
    files.push(write_customers(dir, "customers_with_ts_initial.csv", &initial, initial.len(), 0)?);

    let delta1_time = base + Duration::hours(2);
    let mut delta1 = Vec::new();
    for id in 21..=25 {
        let ts = delta1_time + Duration::minutes(rng.random_range(0..=30));
        let customer = new_customer(rng, id, ts);
        customers.insert(id, customer.clone());
        delta1.push(customer);
    }
    for id in [3, 7, 15] {
        let ts = delta1_time + Duration::minutes(rng.random_range(0..=30));
        if let Some(customer) = customers.get_mut(&id) {
            customer.credit_limit = round2(customer.credit_limit * 1.2);
            customer.last_updated = ts;
            delta1.push(customer.clone());
        }
    }
    files.push(write_customers(dir, "customers_with_ts_delta1.csv", &delta1, 5, 3)?);

    let delta2_time = base + Duration::hours(4);
    let mut delta2 = Vec::new();
    for id in 26..=28 {
        let ts = delta2_time + Duration::minutes(rng.random_range(0..=30));
        let customer = new_customer(rng, id, ts);
        customers.insert(id, customer.clone());
        delta2.push(customer);
    }
    for id in [1, 10, 21, 25] {
        let ts = delta2_time + Duration::minutes(rng.random_range(0..=30));
        let city = pick(rng, CITIES);
        let new_phone = phone(rng);
        if let Some(customer) = customers.get_mut(&id) {
            customer.city = city;
            customer.phone = new_phone;
            customer.last_updated = ts;
            delta2.push(customer.clone());
        }
    }
    files.push(write_customers(dir, "customers_with_ts_delta2.csv", &delta2, 3, 4)?);

    Ok(customers.len())
}

fn generate_products(dir: &Path, rng: &mut StdRng, files: &mut Vec<SampleFile>) -> Result<usize> {
    io::ensure_dir(dir, "create product scenario dir")?;
    log_status!("sample-data", "Generating products without timestamp in {}", dir.display());

    let mut products: BTreeMap<u32, Product> = BTreeMap::new();

    for id in 1..=25 {
        products.insert(id, new_product(rng, id));
    }
    let initial: Vec<Product> = products.values().cloned().collect();
    files.push(write_products(dir, "products_no_ts_initial.csv", &initial, initial.len(), 0)?);

    let mut delta1 = Vec::new();
    for id in 26..=30 {
        let product = new_product(rng, id);
        products.insert(id, product.clone());
        delta1.push(product);
    }
    for id in [2, 8, 15, 22] {
        let factor = rng.random_range(0.8..1.3);
        let stock = rng.random_range(0..=500);
        if let Some(product) = products.get_mut(&id) {
            product.price = round2(product.price * factor);
            product.stock_quantity = stock;
            delta1.push(product.clone());
        }
    }
    files.push(write_products(dir, "products_no_ts_delta1.csv", &delta1, 5, 4)?);

    let mut delta2 = Vec::new();
    for id in 31..=34 {
        let product = new_product(rng, id);
        products.insert(id, product.clone());
        delta2.push(product);
    }
    for id in [1, 5, 12, 26, 28, 30] {
        let factor = rng.random_range(0.9..1.2);
        let stock = rng.random_range(0..=500);
        let active = rng.random_bool(0.5);
        if let Some(product) = products.get_mut(&id) {
            product.price = round2(product.price * factor);
            product.stock_quantity = stock;
            product.is_active = active;
            delta2.push(product.clone());
        }
    }
    files.push(write_products(dir, "products_no_ts_delta2.csv", &delta2, 4, 6)?);

    Ok(products.len())
}

fn new_customer(rng: &mut StdRng, id: u32, ts: NaiveDateTime) -> Customer {
    let first_name = pick(rng, FIRST_NAMES);
    let last_name = pick(rng, LAST_NAMES);
    let city_idx = rng.random_range(0..CITIES.len());
    let email = format!(
        "{}.{}{}@{}",
        first_name.to_lowercase(),
        last_name.to_lowercase(),
        id,
        pick(rng, EMAIL_DOMAINS)
    );

    Customer {
        id,
        first_name,
        last_name,
        email,
        phone: phone(rng),
        city: CITIES[city_idx],
        state: STATES[city_idx],
        credit_limit: round2(rng.random_range(1000.0..=50000.0)),
        last_updated: ts,
    }
}

fn new_product(rng: &mut StdRng, id: u32) -> Product {
    let category = pick(rng, PRODUCT_CATEGORIES);
    let name = format!(
        "{} {} {}",
        pick(rng, PRODUCT_ADJECTIVES),
        pick(rng, PRODUCT_NOUNS),
        id
    );

    Product {
        id,
        name,
        category,
        price: round2(rng.random_range(9.99..=999.99)),
        stock_quantity: rng.random_range(0..=500),
        supplier: rng.random_range(1..=20),
        // 75% active
        is_active: rng.random_bool(0.75),
    }
}

fn phone(rng: &mut StdRng) -> String {
    format!(
        "({}) {}-{}",
        rng.random_range(200..=999),
        rng.random_range(200..=999),
        rng.random_range(1000..=9999)
    )
}

fn pick<R: Rng + ?Sized>(rng: &mut R, pool: &[&'static str]) -> &'static str {
    pool[rng.random_range(0..pool.len())]
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn write_customers(
    dir: &Path,
    file_name: &str,
    records: &[Customer],
    new_records: usize,
    modified_records: usize,
) -> Result<SampleFile> {
    let rows: Vec<Vec<String>> = records.iter().map(Customer::row).collect();
    write_scenario_file(
        WITH_TIMESTAMP_DIR,
        dir.join(file_name),
        CUSTOMER_HEADER,
        &rows,
        new_records,
        modified_records,
    )
}

fn write_products(
    dir: &Path,
    file_name: &str,
    records: &[Product],
    new_records: usize,
    modified_records: usize,
) -> Result<SampleFile> {
    let rows: Vec<Vec<String>> = records.iter().map(Product::row).collect();
    write_scenario_file(
        WITHOUT_TIMESTAMP_DIR,
        dir.join(file_name),
        PRODUCT_HEADER,
        &rows,
        new_records,
        modified_records,
    )
}

fn write_scenario_file(
    scenario: &str,
    path: PathBuf,
    header: &[&str],
    rows: &[Vec<String>],
    new_records: usize,
    modified_records: usize,
) -> Result<SampleFile> {
    let mut content = csv_line(header.iter().copied());
    for row in rows {
        content.push_str(&csv_line(row.iter().map(String::as_str)));
    }

    io::write_file(&path, &content, &format!("write {}", path.display()))?;
    log_status!("sample-data", "Created {} ({} records)", path.display(), rows.len());

    Ok(SampleFile {
        scenario: scenario.to_string(),
        path: path.display().to_string(),
        records: rows.len(),
        new_records,
        modified_records,
    })
}

/// One RFC 4180 line, CRLF-terminated, quoting only where required.
fn csv_line<'a>(fields: impl Iterator<Item = &'a str>) -> String {
    let mut line = fields
        .map(|field| {
            if field.contains([',', '"', '\n', '\r']) {
                format!("\"{}\"", field.replace('"', "\"\""))
            } else {
                field.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(",");
    line.push_str("\r\n");
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn read_lines(path: &str) -> Vec<String> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn generates_six_files_with_expected_counts() {
        let dir = TempDir::new().unwrap();
        let report = generate(dir.path(), DEFAULT_SEED).unwrap();

        let counts: Vec<(usize, usize, usize)> = report
            .files
            .iter()
            .map(|f| (f.records, f.new_records, f.modified_records))
            .collect();
        assert_eq!(
            counts,
            vec![
                (20, 20, 0),
                (8, 5, 3),
                (7, 3, 4),
                (25, 25, 0),
                (9, 5, 4),
                (10, 4, 6),
            ]
        );
        assert_eq!(report.final_customers, 28);
        assert_eq!(report.final_products, 34);

        for file in &report.files {
            assert_eq!(read_lines(&file.path).len(), file.records + 1);
        }
    }

    #[test]
    fn same_seed_produces_identical_output() {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        let ra = generate(a.path(), 7).unwrap();
        let rb = generate(b.path(), 7).unwrap();

        for (fa, fb) in ra.files.iter().zip(rb.files.iter()) {
            assert_eq!(
                std::fs::read_to_string(&fa.path).unwrap(),
                std::fs::read_to_string(&fb.path).unwrap()
            );
        }
    }

    #[test]
    fn customer_files_carry_timestamps_in_window() {
        let dir = TempDir::new().unwrap();
        let report = generate(dir.path(), DEFAULT_SEED).unwrap();

        let delta1 = read_lines(&report.files[1].path);
        assert_eq!(delta1[0], CUSTOMER_HEADER.join(","));
        for line in &delta1[1..] {
            let ts = line.rsplit(',').next().unwrap();
            assert!(ts.starts_with("2025-01-01 12:"), "{}", ts);
        }

        let ids: Vec<&str> = delta1[1..]
            .iter()
            .map(|l| l.split(',').next().unwrap())
            .collect();
        assert_eq!(ids, vec!["21", "22", "23", "24", "25", "3", "7", "15"]);
    }

    #[test]
    fn product_files_have_no_timestamp_column() {
        let dir = TempDir::new().unwrap();
        let report = generate(dir.path(), DEFAULT_SEED).unwrap();

        let initial = read_lines(&report.files[3].path);
        assert_eq!(initial[0], PRODUCT_HEADER.join(","));
        assert!(initial[1].starts_with("PROD-0001,"));
        assert!(report.files[3].path.contains(WITHOUT_TIMESTAMP_DIR));
    }

    #[test]
    fn csv_line_quotes_only_when_needed() {
        assert_eq!(csv_line(["a", "b c"].into_iter()), "a,b c\r\n");
        assert_eq!(csv_line(["x,y", "say \"hi\""].into_iter()), "\"x,y\",\"say \"\"hi\"\"\"\r\n");
    }
}
