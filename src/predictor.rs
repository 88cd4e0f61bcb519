//! Prediction orchestration: encode, scale, classify, tier.
//!
//! `ChurnPredictor` is built once from explicitly loaded artifacts and is
//! read-only afterwards, so one instance can be shared across any number of
//! concurrent requests without coordination.

use crate::error::{Artifact, ScoringError, ScoringResult};
use crate::feature_encoder::FeatureEncoder;
use crate::models::classifier::ChurnClassifier;
use crate::models::scaler::{FeatureScaler, ScalerAdapter};
use crate::schema::FeatureSchema;
use crate::types::customer::RawCustomerRecord;
use crate::types::prediction::PredictionResult;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Process-wide artifacts, fixed at startup.
///
/// A missing classifier or scaler puts the predictor in a permanently
/// degraded state.
#[derive(Clone)]
pub struct Artifacts {
    pub schema: Arc<FeatureSchema>,
    pub classifier: Option<Arc<dyn ChurnClassifier>>,
    pub scaler: Option<Arc<dyn FeatureScaler>>,
}

impl Artifacts {
    pub fn new(
        schema: FeatureSchema,
        classifier: Option<Arc<dyn ChurnClassifier>>,
        scaler: Option<Arc<dyn FeatureScaler>>,
    ) -> Self {
        Self {
            schema: Arc::new(schema),
            classifier,
            scaler,
        }
    }
}

/// Artifact availability report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub model_loaded: bool,
    pub scaler_loaded: bool,
}

/// Scores raw customer records against the loaded classifier
pub struct ChurnPredictor {
    encoder: FeatureEncoder,
    adapter: ScalerAdapter,
    classifier: Option<Arc<dyn ChurnClassifier>>,
    scaler: Option<Arc<dyn FeatureScaler>>,
}

impl ChurnPredictor {
    /// Build the predictor.
    ///
    /// Fails only when the schema lacks a scaled column, which
    /// `FeatureSchema::new` already rules out.
    pub fn new(artifacts: Artifacts) -> ScoringResult<Self> {
        let adapter = ScalerAdapter::new(&artifacts.schema)?;
        Ok(Self {
            encoder: FeatureEncoder::new(artifacts.schema),
            adapter,
            classifier: artifacts.classifier,
            scaler: artifacts.scaler,
        })
    }

    pub fn schema(&self) -> &FeatureSchema {
        self.encoder.schema()
    }

    pub fn is_ready(&self) -> bool {
        self.classifier.is_some() && self.scaler.is_some()
    }

    pub fn health(&self) -> HealthStatus {
        HealthStatus {
            status: if self.is_ready() { "healthy" } else { "unhealthy" },
            model_loaded: self.classifier.is_some(),
            scaler_loaded: self.scaler.is_some(),
        }
    }

    /// Score a JSON payload
    pub fn predict_json(&self, payload: &[u8]) -> ScoringResult<PredictionResult> {
        self.ensure_ready()?;
        let record = RawCustomerRecord::from_json(payload)?;
        self.predict(&record)
    }

    /// Score one customer record.
    ///
    /// Every encoding and scaling check runs before the classifier is
    /// invoked; a failure anywhere is returned, never replaced by a default
    /// prediction.
    pub fn predict(&self, record: &RawCustomerRecord) -> ScoringResult<PredictionResult> {
        let (classifier, scaler) = self.ensure_ready()?;

        if record.is_empty() {
            return Err(ScoringError::EmptyInput);
        }

        let customer_id = record.customer_id();
        let mut features = self.encoder.encode(record)?;
        self.adapter.apply(scaler.as_ref(), &mut features)?;

        let (will_churn, [_, churn_probability]) = classifier.classify(&features)?;
        if !(0.0..=1.0).contains(&churn_probability) {
            return Err(ScoringError::internal(format!(
                "classifier returned probability {} outside [0, 1]",
                churn_probability
            )));
        }

        let result = PredictionResult::new(customer_id, will_churn, churn_probability);

        debug!(
            customer_id = %result.customer_id,
            model = classifier.name(),
            churn_probability = result.prediction.churn_probability,
            risk_level = result.risk_level().as_str(),
            "Customer scored"
        );

        Ok(result)
    }

    fn ensure_ready(&self) -> ScoringResult<(&Arc<dyn ChurnClassifier>, &Arc<dyn FeatureScaler>)> {
        let classifier = self
            .classifier
            .as_ref()
            .ok_or(ScoringError::MissingArtifact(Artifact::Classifier))?;
        let scaler = self
            .scaler
            .as_ref()
            .ok_or(ScoringError::MissingArtifact(Artifact::Scaler))?;
        Ok((classifier, scaler))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature_encoder::SERVICE_FIELDS;
    use crate::models::scaler::AffineScaler;
    use crate::types::features::FeatureVector;
    use crate::types::prediction::RiskLevel;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Returns a fixed probability and records every vector it sees
    struct FixedClassifier {
        probability: f64,
        calls: AtomicUsize,
        seen: Mutex<Vec<Vec<f64>>>,
    }

    impl FixedClassifier {
        fn new(probability: f64) -> Arc<Self> {
            Arc::new(Self {
                probability,
                calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    impl ChurnClassifier for FixedClassifier {
        fn name(&self) -> &str {
            "fixed"
        }

        fn predict(&self, features: &FeatureVector) -> ScoringResult<bool> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(features.values().to_vec());
            Ok(self.probability >= 0.5)
        }

        fn predict_probability(&self, _features: &FeatureVector) -> ScoringResult<[f64; 2]> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok([1.0 - self.probability, self.probability])
        }
    }

    /// Answers only through `classify`, counting each evaluation
    struct SingleRunClassifier {
        runs: AtomicUsize,
    }

    impl ChurnClassifier for SingleRunClassifier {
        fn name(&self) -> &str {
            "single-run"
        }

        fn predict(&self, _features: &FeatureVector) -> ScoringResult<bool> {
            Err(ScoringError::internal("predict called separately"))
        }

        fn predict_probability(&self, _features: &FeatureVector) -> ScoringResult<[f64; 2]> {
            Err(ScoringError::internal("predict_probability called separately"))
        }

        fn classify(&self, _features: &FeatureVector) -> ScoringResult<(bool, [f64; 2])> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            Ok((true, [0.2, 0.8]))
        }
    }

    fn scaler() -> Arc<dyn FeatureScaler> {
        Arc::new(AffineScaler::Standard {
            mean: [32.0, 65.0, 3.0],
            scale: [24.0, 30.0, 2.0],
        })
    }

    fn predictor(classifier: Arc<FixedClassifier>) -> ChurnPredictor {
        let artifacts = Artifacts::new(FeatureSchema::telco(), Some(classifier), Some(scaler()));
        ChurnPredictor::new(artifacts).unwrap()
    }

    fn phone_only_record() -> RawCustomerRecord {
        let mut record = RawCustomerRecord::new()
            .with("tenure", 1)
            .with("MonthlyCharges", 70.70)
            .with("Contract", "Month-to-month");
        for field in SERVICE_FIELDS {
            record.insert(field, "No");
        }
        record.insert("PhoneService", "Yes");
        record
    }

    #[test]
    fn test_phone_only_customer_scored_deterministically() {
        let classifier = FixedClassifier::new(0.6321);
        let predictor = predictor(classifier.clone());
        let record = phone_only_record();

        let first = predictor.predict(&record).unwrap();
        let second = predictor.predict(&record).unwrap();

        assert_eq!(
            serde_json::to_vec(&first).unwrap(),
            serde_json::to_vec(&second).unwrap()
        );
        assert_eq!(first.customer_id, "Unknown");
        assert!(first.prediction.will_churn);
        assert_eq!(first.risk_level(), RiskLevel::Medium);

        // Scaled tenure, MonthlyCharges and total_services reach the model
        let seen = classifier.seen.lock().unwrap();
        assert_eq!(seen[0], seen[1]);
        assert!((seen[0][4] - (1.0 - 32.0) / 24.0).abs() < 1e-12);
        assert!((seen[0][7] - (70.70 - 65.0) / 30.0).abs() < 1e-12);
        assert_eq!(seen[0][8], (1.0 - 3.0) / 2.0);
        assert_eq!(seen[0][12], 1.0); // InternetService_No
    }

    #[test]
    fn test_one_classifier_run_per_request() {
        let classifier = Arc::new(SingleRunClassifier {
            runs: AtomicUsize::new(0),
        });
        let artifacts = Artifacts::new(
            FeatureSchema::telco(),
            Some(classifier.clone()),
            Some(scaler()),
        );
        let predictor = ChurnPredictor::new(artifacts).unwrap();

        let result = predictor.predict(&phone_only_record()).unwrap();
        assert_eq!(result.prediction.churn_probability, 0.8);
        assert_eq!(result.risk_level(), RiskLevel::High);
        assert_eq!(classifier.runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_missing_scaler_refuses_scoring() {
        let classifier = FixedClassifier::new(0.9);
        let artifacts = Artifacts::new(FeatureSchema::telco(), Some(classifier.clone()), None);
        let predictor = ChurnPredictor::new(artifacts).unwrap();

        let err = predictor.predict(&phone_only_record()).unwrap_err();

        assert_eq!(err, ScoringError::MissingArtifact(Artifact::Scaler));
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 0);
        assert!(!predictor.is_ready());
    }

    #[test]
    fn test_missing_classifier_refuses_scoring() {
        let artifacts = Artifacts::new(FeatureSchema::telco(), None, Some(scaler()));
        let predictor = ChurnPredictor::new(artifacts).unwrap();

        assert_eq!(
            predictor.predict(&phone_only_record()).unwrap_err(),
            ScoringError::MissingArtifact(Artifact::Classifier)
        );
        assert_eq!(
            predictor.health(),
            HealthStatus {
                status: "unhealthy",
                model_loaded: false,
                scaler_loaded: true,
            }
        );
    }

    #[test]
    fn test_invalid_field_never_reaches_classifier() {
        let classifier = FixedClassifier::new(0.1);
        let predictor = predictor(classifier.clone());

        let err = predictor
            .predict(&phone_only_record().with("Partner", "Maybe"))
            .unwrap_err();

        assert_eq!(err.field(), Some("Partner"));
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_empty_input() {
        let predictor = predictor(FixedClassifier::new(0.1));
        assert_eq!(
            predictor.predict(&RawCustomerRecord::new()),
            Err(ScoringError::EmptyInput)
        );
        assert_eq!(predictor.predict_json(b"{}"), Err(ScoringError::EmptyInput));
    }

    #[test]
    fn test_missing_artifact_checked_before_payload() {
        let artifacts = Artifacts::new(FeatureSchema::telco(), None, None);
        let predictor = ChurnPredictor::new(artifacts).unwrap();

        assert_eq!(
            predictor.predict_json(b"{}"),
            Err(ScoringError::MissingArtifact(Artifact::Classifier))
        );
    }

    #[test]
    fn test_tier_boundaries_through_pipeline() {
        let record = phone_only_record().with("customerID", "7590-VHVEG");

        let cases = [
            (0.70, RiskLevel::High),
            (0.40, RiskLevel::Medium),
            (0.3999, RiskLevel::Low),
        ];
        for (probability, expected) in cases {
            let result = predictor(FixedClassifier::new(probability))
                .predict(&record)
                .unwrap();
            assert_eq!(result.risk_level(), expected, "p = {}", probability);
            assert_eq!(result.customer_id, "7590-VHVEG");
        }
    }

    #[test]
    fn test_out_of_range_probability_is_internal_error() {
        let predictor = predictor(FixedClassifier::new(1.5));
        let err = predictor.predict(&phone_only_record()).unwrap_err();
        assert_eq!(err.kind(), "internal");
    }

    #[test]
    fn test_concurrent_scoring_shares_predictor() {
        let predictor = predictor(FixedClassifier::new(0.75));
        let expected = predictor.predict(&phone_only_record()).unwrap();

        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| predictor.predict(&phone_only_record()).unwrap()))
                .collect();
            for handle in handles {
                assert_eq!(handle.join().unwrap(), expected);
            }
        });
    }

    #[test]
    fn test_logistic_artifacts_end_to_end() {
        use crate::models::classifier::LogisticClassifier;
        use std::collections::HashMap;

        let schema = FeatureSchema::telco();
        let mut coefficients: HashMap<String, f64> =
            schema.names().iter().map(|n| (n.clone(), 0.0)).collect();
        coefficients.insert("tenure".to_string(), -1.2);
        coefficients.insert("Contract_Two year".to_string(), -2.0);
        coefficients.insert("PaymentMethod_Electronic check".to_string(), 0.8);
        let classifier = Arc::new(LogisticClassifier::new(&schema, -0.5, &coefficients, 0.5).unwrap());

        let artifacts = Artifacts::new(schema, Some(classifier), Some(scaler()));
        let predictor = ChurnPredictor::new(artifacts).unwrap();

        let new_customer = RawCustomerRecord::new()
            .with("customerID", "9237-HQITU")
            .with("tenure", 2)
            .with("MonthlyCharges", 70.7)
            .with("Contract", "Month-to-month")
            .with("PaymentMethod", "Electronic check");
        let loyal_customer = RawCustomerRecord::new()
            .with("customerID", "5575-GNVDE")
            .with("tenure", 72)
            .with("MonthlyCharges", 56.95)
            .with("Contract", "Two year")
            .with("PaymentMethod", "Mailed check");

        let risky = predictor.predict(&new_customer).unwrap();
        let loyal = predictor.predict(&loyal_customer).unwrap();

        assert!(risky.prediction.will_churn);
        assert_eq!(risky.risk_level(), RiskLevel::High);
        assert!(!loyal.prediction.will_churn);
        assert_eq!(loyal.risk_level(), RiskLevel::Low);
        assert!(
            (risky.prediction.churn_probability + risky.prediction.retention_probability - 1.0)
                .abs()
                < 1e-9
        );
    }

    #[test]
    fn test_health_when_ready() {
        let predictor = predictor(FixedClassifier::new(0.2));
        assert_eq!(predictor.health().status, "healthy");
        assert_eq!(predictor.schema().len(), 30);
    }
}
