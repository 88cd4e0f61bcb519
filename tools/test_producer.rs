//! Test Customer Producer
//!
//! Generates customer records, sends them to the scoring subject over NATS
//! request/reply and logs each reply.

use churn_risk_pipeline::types::RawCustomerRecord;
use rand::Rng;
use std::time::Duration;
use tracing::{info, warn};

const INTERNET_DEPENDENT: [&str; 6] = [
    "OnlineSecurity",
    "OnlineBackup",
    "DeviceProtection",
    "TechSupport",
    "StreamingTV",
    "StreamingMovies",
];

/// Customer record generator for testing
struct CustomerGenerator {
    rng: rand::rngs::ThreadRng,
    customer_counter: u64,
}

impl CustomerGenerator {
    fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
            customer_counter: 0,
        }
    }

    /// Generate a plausible customer record
    fn generate(&mut self) -> RawCustomerRecord {
        self.customer_counter += 1;

        let phone = self.rng.gen_bool(0.9);
        let internet = self.random_choice(&["DSL", "Fiber optic", "No"]);
        let tenure: u32 = self.rng.gen_range(0..73);
        let monthly: f64 = (self.rng.gen_range(18.0..120.0_f64) * 100.0).round() / 100.0;

        let mut record = RawCustomerRecord::new()
            .with("customerID", format!("{:04}-TEST", self.customer_counter))
            .with("gender", self.random_choice(&["Male", "Female"]))
            .with("SeniorCitizen", u8::from(self.rng.gen_bool(0.16)))
            .with("Partner", self.yes_no(0.5))
            .with("Dependents", self.yes_no(0.3))
            .with("tenure", tenure)
            .with("PhoneService", if phone { "Yes" } else { "No" })
            .with("InternetService", internet)
            .with(
                "Contract",
                self.random_choice(&["Month-to-month", "One year", "Two year"]),
            )
            .with("PaperlessBilling", self.yes_no(0.6))
            .with(
                "PaymentMethod",
                self.random_choice(&[
                    "Electronic check",
                    "Mailed check",
                    "Bank transfer (automatic)",
                    "Credit card (automatic)",
                ]),
            )
            .with("MonthlyCharges", monthly)
            .with("TotalCharges", format!("{:.2}", monthly * tenure as f64));

        let multiple_lines = if phone { self.yes_no(0.4) } else { "No phone service" };
        record.insert("MultipleLines", multiple_lines);

        for field in INTERNET_DEPENDENT {
            let value = if internet == "No" {
                "No internet service"
            } else {
                self.yes_no(0.4)
            };
            record.insert(field, value);
        }

        record
    }

    /// Generate a record the pipeline must reject
    fn generate_malformed(&mut self) -> RawCustomerRecord {
        let mut record = self.generate();
        match self.rng.gen_range(0..3) {
            0 => record.insert("Partner", "Maybe"),
            1 => record.insert("tenure", "twelve"),
            _ => record.insert("gender", "Unspecified"),
        }
        record
    }

    fn yes_no(&mut self, p_yes: f64) -> &'static str {
        if self.rng.gen_bool(p_yes) {
            "Yes"
        } else {
            "No"
        }
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
                .add_directive("test_producer=info".parse()?),
        )
        .init();

    info!("Starting Test Customer Producer");

    // Parse arguments
    let args: Vec<String> = std::env::args().collect();
    let nats_url = args.get(1).map(|s| s.as_str()).unwrap_or("nats://localhost:4222");
    let subject = args.get(2).map(|s| s.as_str()).unwrap_or("churn.score");
    let count: u64 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(20);
    let malformed_rate: f64 = args.get(4).and_then(|s| s.parse().ok()).unwrap_or(0.1);
    let delay_ms: u64 = args.get(5).and_then(|s| s.parse().ok()).unwrap_or(100);

    info!(
        nats_url = %nats_url,
        subject = %subject,
        count = count,
        malformed_rate = malformed_rate,
        delay_ms = delay_ms,
        "Configuration loaded"
    );

    let client = match async_nats::connect(nats_url).await {
        Ok(c) => {
            info!("Connected to NATS");
            c
        }
        Err(e) => {
            warn!(error = %e, "Failed to connect to NATS. Running in dry-run mode.");
            return run_dry_mode(count, malformed_rate).await;
        }
    };

    let mut generator = CustomerGenerator::new();
    let mut rng = rand::thread_rng();

    for i in 0..count {
        let record = if rng.gen_bool(malformed_rate) {
            generator.generate_malformed()
        } else {
            generator.generate()
        };
        let customer_id = record.customer_id();
        let payload = serde_json::to_vec(&record)?;

        match client.request(subject.to_string(), payload.into()).await {
            Ok(reply) => {
                let body = String::from_utf8_lossy(&reply.payload);
                info!(request = i + 1, customer_id = %customer_id, reply = %body, "Scored");
            }
            Err(e) => warn!(request = i + 1, customer_id = %customer_id, error = %e, "Request failed"),
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    info!("Completed! Sent {} customer records", count);

    Ok(())
}

async fn run_dry_mode(count: u64, malformed_rate: f64) -> anyhow::Result<()> {
    info!("Running in dry-run mode (no NATS connection)");

    let mut generator = CustomerGenerator::new();
    let mut rng = rand::thread_rng();

    for i in 0..count {
        let record = if rng.gen_bool(malformed_rate) {
            generator.generate_malformed()
        } else {
            generator.generate()
        };

        if (i + 1) % 10 == 0 || i == 0 {
            info!("Sample record {}:\n{}", i + 1, serde_json::to_string_pretty(&record)?);
        }
    }

    Ok(())
}
