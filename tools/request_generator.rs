//! Test Request Generator
//!
//! Generates random credit applicant records and posts them to the scoring
//! service for load and smoke testing.
//!
//! Usage: `request-generator [base_url] [count] [high_risk_rate] [delay_ms]`

use rand::Rng;
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::{info, warn};

/// Applicant record generator
struct ApplicantGenerator {
    rng: rand::rngs::ThreadRng,
}

impl ApplicantGenerator {
    fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
        }
    }

    /// Applicant who pays on time and carries modest balances
    fn generate_low_risk(&mut self) -> Map<String, Value> {
        let limit_bal = self.rng.gen_range(50_000.0..500_000.0_f64).round();
        let bill = self.rng.gen_range(0.0..limit_bal * 0.3).round();

        let age = self.rng.gen_range(25..60);
        let mut record = self.base_record(limit_bal, age);
        for month in ["PAY_0", "PAY_2", "PAY_3", "PAY_4", "PAY_5", "PAY_6"] {
            record.insert(month.to_string(), json!(self.rng.gen_range(-2..=0)));
        }
        for i in 1..=6 {
            record.insert(format!("BILL_AMT{i}"), json!(bill));
            record.insert(
                format!("PAY_AMT{i}"),
                json!((bill * self.rng.gen_range(0.5..1.0)).round()),
            );
        }
        record
    }

    /// Applicant with payment delays and balances near the limit
    fn generate_high_risk(&mut self) -> Map<String, Value> {
        let limit_bal = self.rng.gen_range(10_000.0..80_000.0_f64).round();
        let bill = self.rng.gen_range(limit_bal * 0.8..limit_bal * 1.2).round();

        let age = self.rng.gen_range(21..35);
        let mut record = self.base_record(limit_bal, age);
        for month in ["PAY_0", "PAY_2", "PAY_3", "PAY_4", "PAY_5", "PAY_6"] {
            record.insert(month.to_string(), json!(self.rng.gen_range(1..=4)));
        }
        for i in 1..=6 {
            record.insert(format!("BILL_AMT{i}"), json!(bill));
            record.insert(
                format!("PAY_AMT{i}"),
                json!((bill * self.rng.gen_range(0.0..0.05)).round()),
            );
        }
        record
    }

    fn base_record(&mut self, limit_bal: f64, age: i32) -> Map<String, Value> {
        let mut record = Map::new();
        record.insert("LIMIT_BAL".to_string(), json!(limit_bal));
        record.insert("AGE".to_string(), json!(age));
        record.insert(
            "SEX".to_string(),
            json!(self.random_choice(&["male", "female"])),
        );
        record.insert(
            "EDUCATION".to_string(),
            json!(self.random_choice(&["graduate", "university", "high_school", "others"])),
        );
        record.insert(
            "MARRIAGE".to_string(),
            json!(self.random_choice(&["married", "single", "others"])),
        );
        record
    }

    fn random_choice<'a>(&mut self, choices: &[&'a str]) -> &'a str {
        choices[self.rng.gen_range(0..choices.len())]
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("request_generator=info".parse()?),
        )
        .init();

    info!("Starting Test Request Generator");

    let args: Vec<String> = std::env::args().collect();
    let base_url = args
        .get(1)
        .map(|s| s.trim_end_matches('/'))
        .unwrap_or("http://localhost:8000");
    let count: u64 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(100);
    let high_risk_rate = parse_rate(args.get(3).map(String::as_str));
    let delay_ms: u64 = args.get(4).and_then(|s| s.parse().ok()).unwrap_or(50);

    info!(
        base_url = %base_url,
        count = count,
        high_risk_rate = high_risk_rate,
        delay_ms = delay_ms,
        "Configuration loaded"
    );

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()?;
    let url = format!("{}/predict", base_url);

    let mut generator = ApplicantGenerator::new();
    let mut rng = rand::thread_rng();

    let mut sent = 0u64;
    let mut positives = 0u64;
    let mut failures = 0u64;

    for i in 0..count {
        let record = if rng.gen_bool(high_risk_rate) {
            generator.generate_high_risk()
        } else {
            generator.generate_low_risk()
        };
        let body = json!({ "data": record });

        match client.post(&url).json(&body).send().await {
            Ok(response) if response.status().is_success() => {
                let result: Value = response.json().await?;
                sent += 1;
                if result["prediction"] == 1 {
                    positives += 1;
                }
            }
            Ok(response) => {
                failures += 1;
                warn!(status = %response.status(), "Request rejected");
            }
            Err(e) if sent == 0 && failures == 0 => {
                warn!(error = %e, "Service unreachable. Running in dry-run mode.");
                return run_dry_mode(count - i, high_risk_rate, delay_ms).await;
            }
            Err(e) => {
                failures += 1;
                warn!(error = %e, "Request failed");
            }
        }

        if (i + 1) % 10 == 0 {
            info!(
                "Sent {}/{} requests ({} predicted default, {} failed)",
                i + 1,
                count,
                positives,
                failures
            );
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    info!(
        "Completed! Scored {} records ({} predicted default, {} failed)",
        sent, positives, failures
    );

    Ok(())
}

/// High-risk share of generated records, clamped to `[0, 1]`
fn parse_rate(arg: Option<&str>) -> f64 {
    let rate = arg.and_then(|s| s.parse::<f64>().ok()).unwrap_or(0.2);
    if rate.is_nan() {
        0.2
    } else {
        rate.clamp(0.0, 1.0)
    }
}

async fn run_dry_mode(count: u64, high_risk_rate: f64, delay_ms: u64) -> anyhow::Result<()> {
    info!("Running in dry-run mode (no service connection)");

    let mut generator = ApplicantGenerator::new();
    let mut rng = rand::thread_rng();

    for i in 0..count {
        let record = if rng.gen_bool(high_risk_rate) {
            generator.generate_high_risk()
        } else {
            generator.generate_low_risk()
        };

        if (i + 1) % 10 == 0 || i == 0 {
            let json = serde_json::to_string_pretty(&json!({ "data": record }))?;
            info!("Sample request {}:\n{}", i + 1, json);
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    Ok(())
}
