//! Contract scenarios run through the runtime with the offline models.

use std::time::Duration;

use pactum_core::config::StoreBackend;
use pactum_core::{
    ContractField, FieldValue, JobOutcome, JobStatus, PactumConfig, PactumRuntime,
    RenewalCategory, StrategyKind,
};
use pactum_models::ModelFactory;

async fn start() -> PactumRuntime {
    let mut config = PactumConfig::default();
    config.store.backend = StoreBackend::Memory;
    config.worker.worker_count = 2;
    PactumRuntime::start(config, ModelFactory::offline())
        .await
        .unwrap()
}

fn signature_page(block: &str) -> String {
    format!(
        "\x0c{}{}",
        "Each party has read and understood this agreement.\n".repeat(20),
        block
    )
}

async fn analyze(runtime: &PactumRuntime, text: &str) -> JobOutcome {
    let mut events = runtime.events().subscribe();
    let id = runtime
        .service()
        .submit(text.as_bytes().to_vec(), "contract.txt", Some("text/plain"))
        .await
        .unwrap();

    let status = tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            let event = events.recv_for(&id).await.unwrap();
            if event.is_terminal() {
                break event.status;
            }
        }
    })
    .await
    .unwrap();
    assert_eq!(status, JobStatus::Completed);
    runtime.service().result(&id).await.unwrap()
}

#[tokio::test]
async fn test_subscription_agreement() {
    let runtime = start().await;
    let text = format!(
        "MASTER SUBSCRIPTION AGREEMENT\n\n\
         This Agreement is entered into by and between Acme Widgets, Inc. (\"Customer\") \
         and Globex Corporation (\"Vendor\").\n\n\
         The subscription fee is $1,200.00 per month. Payment is due Net 30.\n\n\
         This agreement automatically renews for successive one-year terms.\n\n\
         Primary contact: Hank Scorpio\n{}",
        signature_page("By: Jane Doe\nTitle: Chief Financial Officer\n")
    );
    let outcome = analyze(&runtime, &text).await;
    let result = &outcome.result;

    assert!(outcome.gaps.is_empty(), "unexpected gaps: {:?}", outcome.gaps);
    assert_eq!(
        result.get(ContractField::CustomerName).unwrap().value,
        FieldValue::text("Acme Widgets, Inc")
    );
    assert_eq!(
        result.get(ContractField::VendorName).unwrap().value,
        FieldValue::text("Globex Corporation")
    );
    assert_eq!(
        result.get(ContractField::BillingCycle).unwrap().value,
        FieldValue::text("$1,200.00 per month")
    );
    assert_eq!(result.get(ContractField::PaymentTerms).unwrap().confidence, 0.95);

    // the signature block outranks the named contact
    let signatory = result.get(ContractField::AuthorizedSignatory).unwrap();
    assert_eq!(signatory.source, StrategyKind::Layout);
    assert_eq!(signatory.value.render(), "Jane Doe, Chief Financial Officer");

    let renewal = result.get(ContractField::RenewalTerms).unwrap();
    assert!(renewal.confidence >= 0.65);
    assert!(matches!(
        renewal.value,
        FieldValue::Renewal { category: RenewalCategory::Affirmative, .. }
    ));
    runtime.shutdown().await;
}

#[tokio::test]
async fn test_sparse_letter_agreement() {
    let runtime = start().await;
    let text = "Letter agreement between the undersigned parties.\n\
                Invoices are payable within 45 days from the invoice date.\n\
                This Agreement will not automatically renew.\n";
    let outcome = analyze(&runtime, text).await;

    assert_eq!(
        outcome.gaps.fields(),
        &[
            ContractField::CustomerName,
            ContractField::VendorName,
            ContractField::AuthorizedSignatory,
            ContractField::BillingCycle,
        ]
    );
    let terms = outcome.result.get(ContractField::PaymentTerms).unwrap();
    assert_eq!(terms.value, FieldValue::text("45 days from the invoice date"));
    assert_eq!(terms.confidence, 0.90);
    assert!(matches!(
        outcome.result.get(ContractField::RenewalTerms).unwrap().value,
        FieldValue::Renewal { category: RenewalCategory::Negative, .. }
    ));
    runtime.shutdown().await;
}
