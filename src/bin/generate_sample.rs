use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};

const HEADERS: [&str; 11] = [
    "Asset Number",
    "City",
    "Office or Warehouse",
    "Major Category Desp",
    "Minor Category Desp",
    "Asset Description",
    "Date Placed in Service",
    "Asset Cost",
    "Depreciation Reserve",
    "Net Book Value",
    "Remaining Life",
];

/// (major, minor, description, base cost, useful life in years)
const CATALOGUE: [(&str, &str, &str, f64, u32); 8] = [
    ("IT Equipment", "Laptops", "Dell Latitude 5440", 4_200.0, 4),
    ("IT Equipment", "Servers", "HPE ProLiant DL380", 38_000.0, 5),
    ("Vehicles", "Trucks", "Isuzu NPR 3.5t", 145_000.0, 8),
    ("Vehicles", "Cars", "Toyota Corolla", 82_000.0, 5),
    ("Furniture", "Desks", "Sit-stand desk", 2_600.0, 10),
    ("Furniture", "Racking", "Pallet racking bay", 9_500.0, 15),
    ("Machinery", "Forklifts", "Electric forklift 2t", 96_000.0, 10),
    ("Machinery", "Generators", "Diesel generator 100kVA", 120_000.0, 12),
];

const CITIES: [&str; 4] = ["Riyadh", "Jeddah", "Dammam", "Madinah"];

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn below(&mut self, n: usize) -> usize {
        (self.next_u64() % n as u64) as usize
    }
}

fn main() {
    let mut rng = SimpleRng::new(42);
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    let date_format = Format::new().set_num_format("yyyy-mm-dd");
    let money_format = Format::new().set_num_format("#,##0.00");

    // Title row above the header, as exported by most ERPs.
    sheet
        .write_string(0, 0, "Fixed Asset Register – as of 2024-12-31")
        .expect("Failed to write title");
    for (col, name) in HEADERS.iter().enumerate() {
        sheet
            .write_string(1, col as u16, *name)
            .expect("Failed to write header");
    }

    let n_assets = 400;
    for i in 0..n_assets {
        let row = i as u32 + 2;
        let (major, minor, description, base_cost, life) = CATALOGUE[rng.below(CATALOGUE.len())];
        let city = CITIES[rng.below(CITIES.len())];
        let site = if rng.next_f64() < 0.6 { "Office" } else { "Warehouse" };

        let year = 2016 + rng.below(9) as u16;
        let month = 1 + rng.below(12) as u8;
        let day = 1 + rng.below(28) as u8;
        let age_years = (2024 - year) as f64 + (12 - month) as f64 / 12.0;

        let cost = (base_cost * (0.85 + 0.3 * rng.next_f64())).round();
        let depreciation = (cost * (age_years / life as f64).min(1.0)).round();
        let remaining = (life as f64 - age_years).max(0.0);

        sheet
            .write_number(row, 0, 100_000.0 + i as f64)
            .expect("Failed to write asset number");
        for (col, text) in [city, site, major, minor, description].into_iter().enumerate() {
            sheet
                .write_string(row, col as u16 + 1, text)
                .expect("Failed to write text cell");
        }

        // A handful of rows carry the kind of date text real registers have.
        if i % 97 == 13 {
            sheet
                .write_string(row, 6, "pending capitalisation")
                .expect("Failed to write date");
        } else {
            let date = ExcelDateTime::from_ymd(year, month, day).expect("valid date");
            sheet
                .write_datetime_with_format(row, 6, &date, &date_format)
                .expect("Failed to write date");
        }

        // One asset without a cost yet.
        if i != 57 {
            sheet
                .write_number_with_format(row, 7, cost, &money_format)
                .expect("Failed to write cost");
        }
        sheet
            .write_number_with_format(row, 8, depreciation, &money_format)
            .expect("Failed to write depreciation");
        sheet
            .write_number_with_format(row, 9, cost - depreciation, &money_format)
            .expect("Failed to write net book value");
        sheet
            .write_number(row, 10, (remaining * 10.0).round() / 10.0)
            .expect("Failed to write remaining life");
    }

    let output_path = "sample_assets.xlsx";
    workbook.save(output_path).expect("Failed to write workbook");

    println!("Wrote {n_assets} assets to {output_path}");
}
