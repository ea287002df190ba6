//! End-to-end pipeline tests
//!
//! Train → publish → load → predict through the public API.

use crate::artifacts::{ArtifactStatus, ArtifactStore};
use crate::error::Error;
use crate::models::{FraudVerdict, LabeledRecord, TransactionRecord};
use crate::policy::{resolve, AssistanceHeuristic, DecisionPolicy, DecisionSource, FinancialSnapshot};
use crate::predictor::Predictor;
use crate::source::{CsvSource, RecordSource};
use crate::test_utils::{labeled_dataset, quick_config};
use crate::trainer::Trainer;

fn train_and_publish(store: &ArtifactStore, records: &[LabeledRecord]) {
    let lock = store.lock().unwrap();
    let artifacts = Trainer::with_config(quick_config()).train(records).unwrap();
    store.publish(&lock, &artifacts).unwrap();
}

// ========== Pipeline Tests ==========

#[test]
fn test_twenty_records_end_to_end() {
    let categories = ["payment", "purchase", "withdrawal", "transfer"];
    let types = ["credit", "debit"];
    let records: Vec<LabeledRecord> = (0..20)
        .map(|i| {
            let amount = 10.0 + (50_000.0 - 10.0) * i as f64 / 19.0;
            LabeledRecord::new(
                TransactionRecord::new(amount, categories[i % 4], types[i % 2]),
                i % 2 == 1,
            )
        })
        .collect();

    let dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::new(dir.path());
    train_and_publish(&store, &records);

    let predictor = Predictor::load(store).unwrap();
    let verdict = predictor
        .predict(&TransactionRecord::new(99_999.0, "purchase", "debit"))
        .unwrap();

    let FraudVerdict::Scored {
        is_fraud,
        probability,
    } = verdict
    else {
        panic!("expected a scored verdict, got {:?}", verdict);
    };
    assert!((0.0..=1.0).contains(&probability));
    // Two classes: the fraud probability crossing one half decides the verdict
    if probability > 0.5 {
        assert!(is_fraud);
    } else if probability < 0.5 {
        assert!(!is_fraud);
    }
}

#[test]
fn test_imbalanced_training_through_store() {
    let records = labeled_dataset(95, 5, 17);
    let dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::new(dir.path());
    train_and_publish(&store, &records);

    let predictor = Predictor::load(store).unwrap();
    let flagged = records
        .iter()
        .filter(|r| r.is_fraud)
        .filter(|r| predictor.predict(&r.record).unwrap().is_fraud() == Some(true))
        .count();
    assert!(flagged > 0, "every fraud row scored as legitimate");

    let legit_flagged = records
        .iter()
        .filter(|r| !r.is_fraud)
        .filter(|r| predictor.predict(&r.record).unwrap().is_fraud() == Some(true))
        .count();
    assert!(legit_flagged < 95, "every legitimate row scored as fraud");
}

#[test]
fn test_untrained_then_trained() {
    let dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::new(dir.path().join("artifacts"));
    assert_eq!(store.status().unwrap(), ArtifactStatus::Untrained);

    let predictor = Predictor::load(store.clone()).unwrap();
    let record = TransactionRecord::new(42_000.0, "transfer", "debit");
    assert_eq!(predictor.predict(&record).unwrap(), FraudVerdict::Untrained);

    train_and_publish(&store, &labeled_dataset(40, 10, 8));

    assert!(matches!(store.status().unwrap(), ArtifactStatus::Trained(_)));
    assert!(predictor.predict(&record).unwrap().is_scored());
}

#[test]
fn test_unknown_and_missing_fields_still_score() {
    let dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::new(dir.path());
    train_and_publish(&store, &labeled_dataset(30, 10, 4));
    let predictor = Predictor::load(store).unwrap();

    for record in [
        TransactionRecord::new(150.0, "crypto", "wire"),
        TransactionRecord::default(),
        TransactionRecord::new(-20.0, "PURCHASE", " Debit "),
        TransactionRecord::new(f64::NAN, "payment", "credit"),
    ] {
        let probability = predictor.predict(&record).unwrap().probability().unwrap();
        assert!((0.0..=1.0).contains(&probability), "{:?}", record);
    }
}

#[test]
fn test_concurrent_training_is_serialized() {
    let dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::new(dir.path());
    let held = store.lock().unwrap();

    let second = ArtifactStore::new(dir.path());
    assert!(matches!(second.lock(), Err(Error::Locked(_))));
    drop(held);
    assert!(second.lock().is_ok());
}

#[test]
fn test_csv_to_prediction() {
    let mut csv = String::from("amount,category,transaction_type,is_fraud\n");
    for record in labeled_dataset(30, 10, 12) {
        csv.push_str(&format!(
            "{},{},{},{}\n",
            record.record.amount.unwrap_or_default(),
            record.record.category.as_deref().unwrap_or(""),
            record.record.transaction_type.as_deref().unwrap_or(""),
            if record.is_fraud { "yes" } else { "no" }
        ));
    }

    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("history.csv");
    std::fs::write(&csv_path, csv).unwrap();

    let records = CsvSource::new(&csv_path).load_labeled().unwrap();
    assert_eq!(records.len(), 40);

    let store = ArtifactStore::new(dir.path().join("artifacts"));
    train_and_publish(&store, &records);
    let predictor = Predictor::load(store).unwrap();
    assert!(predictor
        .predict(&TransactionRecord::new(35_000.0, "transfer", "debit"))
        .unwrap()
        .is_scored());
}

// ========== Policy Tests ==========

#[test]
fn test_policy_falls_back_when_untrained() {
    let dir = tempfile::tempdir().unwrap();
    let predictor = Predictor::load(ArtifactStore::new(dir.path())).unwrap();
    let verdict = predictor.predict(&TransactionRecord::default()).unwrap();

    let struggling = FinancialSnapshot {
        income: 30_000.0,
        expenses: 25_000.0,
        credit_score: 720.0,
        ..Default::default()
    };
    let decision = resolve(
        DecisionPolicy::ModelFirst,
        &AssistanceHeuristic::default(),
        &verdict,
        &struggling,
    );
    assert!(decision.flagged);
    assert_eq!(decision.source, DecisionSource::Heuristic);
}
