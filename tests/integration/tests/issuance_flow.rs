//! Integration test: issuance across identity, credentials and messaging.

use std::collections::HashSet;
use std::sync::Arc;

use sigil_core::Network;
use sigil_credentials::{
    CredentialError, CredentialIssuer, CredentialRequest, CredentialVerifier, DeliveryStatus,
    IssuerSettings, JwtCredentialSigner,
};
use sigil_crypto::KeyStore;
use sigil_identity::{
    DidResolutionRegistry, IdentityResolver, InMemoryLedger, LedgerDidProvider, LedgerDidResolver,
};
use sigil_integration_tests::{
    offline_agent, CountingProvider, CountingSigner, FailingGateway, KEY_SUBJECT, TESTNET_ISSUER,
    VDA_SUBJECT,
};

struct Wiring {
    issuer: Arc<CredentialIssuer>,
    verifier: CredentialVerifier,
    provider: Arc<CountingProvider>,
    signer: Arc<CountingSigner>,
    ledger: Arc<InMemoryLedger>,
}

fn wire(identifier: &str, gateway: Option<Arc<FailingGateway>>) -> Wiring {
    let keystore = Arc::new(KeyStore::new());
    let ledger = Arc::new(InMemoryLedger::new());
    let provider = Arc::new(CountingProvider::new(Arc::new(LedgerDidProvider::new(
        Network::Testnet,
        keystore.clone(),
        ledger.clone(),
    ))));
    let signer = Arc::new(CountingSigner::new(Arc::new(JwtCredentialSigner::new(
        keystore,
    ))));
    let identities = Arc::new(IdentityResolver::new(provider.clone()));
    let mut issuer =
        CredentialIssuer::new(IssuerSettings::new(identifier), identities, signer.clone());
    if let Some(gateway) = gateway {
        issuer = issuer.with_gateway(gateway);
    }

    let mut registry = DidResolutionRegistry::new();
    registry.register("cheqd", Arc::new(LedgerDidResolver::new(ledger.clone())));
    Wiring {
        issuer: Arc::new(issuer),
        verifier: CredentialVerifier::new(Arc::new(registry)),
        provider,
        signer,
        ledger,
    }
}

#[tokio::test]
async fn test_issuer_did_is_stable() {
    let agent = offline_agent().await;
    let first = agent.issuer_identifier().await.expect("first");
    let second = agent.issuer_identifier().await.expect("second");
    assert_eq!(first.did, second.did);
    assert_eq!(first.kid, second.kid);
}

#[tokio::test]
async fn test_issued_credential_verifies() {
    let agent = offline_agent().await;
    let outcome = agent
        .issue_credential(
            CredentialRequest::new(KEY_SUBJECT)
                .with_type("KycBasic")
                .with_attribute("country", serde_json::json!("BR")),
        )
        .await
        .expect("issuance should succeed");

    let credential = outcome.credential;
    assert_eq!(credential.credential_subject.id.as_deref(), Some(KEY_SUBJECT));
    assert_eq!(credential.credential_subject.claims["country"], "BR");
    assert_eq!(credential.proof.proof_type, "JwtProof2020");

    let result = agent.verify_credential(credential.clone()).await.unwrap();
    assert!(result.verified, "{:?}", result.error);
    assert_eq!(result.issuer, credential.issuer.id);

    // the bare JWT verifies too
    let result = agent
        .verify_credential(credential.jwt().to_string())
        .await
        .unwrap();
    assert!(result.verified);
}

#[tokio::test]
async fn test_context_and_type_are_extended_not_replaced() {
    let agent = offline_agent().await;
    let request: CredentialRequest = serde_json::from_value(serde_json::json!({
        "subjectDid": KEY_SUBJECT,
        "@context": ["https://example.org/ctx"],
        "type": ["Person"]
    }))
    .unwrap();

    let credential = agent.issue_credential(request).await.unwrap().credential;
    assert_eq!(
        credential.context,
        vec![
            "https://example.org/ctx".to_string(),
            "https://www.w3.org/2018/credentials/v1".to_string()
        ]
    );
    assert_eq!(
        credential.types,
        vec!["Person".to_string(), "VerifiableCredential".to_string()]
    );
}

#[tokio::test]
async fn test_no_jwt_aliases_in_output() {
    let agent = offline_agent().await;
    let mut request = CredentialRequest::new(KEY_SUBJECT);
    request.expiration_date = Some("2099-01-01T00:00:00Z".into());
    let credential = agent.issue_credential(request).await.unwrap().credential;

    let json = serde_json::to_value(&credential).unwrap();
    for alias in ["vc", "sub", "iss", "nbf", "exp"] {
        assert!(json.get(alias).is_none(), "{alias} present in {json}");
    }
    assert_eq!(json["expirationDate"], "2099-01-01T00:00:00Z");
    assert!(json["proof"]["jwt"].as_str().unwrap().split('.').count() == 3);
}

#[tokio::test]
async fn test_bad_network_fails_before_signing() {
    let wiring = wire("did:cheqd:bogusnet:abc123", None);
    let err = wiring
        .issuer
        .issue(CredentialRequest::new(KEY_SUBJECT))
        .await
        .unwrap_err();
    assert!(matches!(err, CredentialError::InvalidNetwork(_)));
    assert_eq!(wiring.signer.calls(), 0);
    assert_eq!(wiring.provider.creations(), 0);
    assert!(wiring.ledger.is_empty());
}

#[tokio::test]
async fn test_failed_delivery_keeps_credential() {
    let gateway = Arc::new(FailingGateway::default());
    let wiring = wire(TESTNET_ISSUER, Some(gateway.clone()));

    let outcome = wiring
        .issuer
        .issue(CredentialRequest::new(VDA_SUBJECT).with_type("Membership"))
        .await
        .expect("delivery failure must not fail issuance");
    assert_eq!(gateway.attempts(), 1);
    assert!(matches!(outcome.delivery, DeliveryStatus::Failed(ref reason) if reason.contains("inbox unreachable")));

    let result = wiring.verifier.verify(outcome.credential).await.unwrap();
    assert!(result.verified);
}

#[tokio::test]
async fn test_non_messaging_subject_skips_delivery() {
    let gateway = Arc::new(FailingGateway::default());
    let wiring = wire(TESTNET_ISSUER, Some(gateway.clone()));
    let outcome = wiring
        .issuer
        .issue(CredentialRequest::new(KEY_SUBJECT))
        .await
        .unwrap();
    assert!(matches!(outcome.delivery, DeliveryStatus::Skipped(_)));
    assert_eq!(gateway.attempts(), 0);
}

#[tokio::test]
async fn test_concurrent_issuance_creates_one_issuer() {
    let wiring = wire(TESTNET_ISSUER, None);

    let tasks: Vec<_> = (0..16)
        .map(|i| {
            let issuer = wiring.issuer.clone();
            tokio::spawn(async move {
                issuer
                    .issue(
                        CredentialRequest::new(KEY_SUBJECT)
                            .with_attribute("n", serde_json::json!(i)),
                    )
                    .await
            })
        })
        .collect();

    let mut issuers = HashSet::new();
    for joined in futures::future::join_all(tasks).await {
        let outcome = joined.expect("task panicked").expect("issuance failed");
        issuers.insert(outcome.credential.issuer.id);
    }
    assert_eq!(issuers.len(), 1);
    assert_eq!(wiring.provider.creations(), 1);
    assert_eq!(wiring.ledger.write_count(), 1);
    assert_eq!(wiring.signer.calls(), 16);
}

#[tokio::test]
async fn test_ledger_outage_is_identity_creation_error() {
    let wiring = wire(TESTNET_ISSUER, None);
    wiring.ledger.set_available(false);
    let err = wiring
        .issuer
        .issue(CredentialRequest::new(KEY_SUBJECT))
        .await
        .unwrap_err();
    assert!(matches!(err, CredentialError::IdentityCreation(_)));
    assert_eq!(wiring.signer.calls(), 0);

    // the failure is not cached
    wiring.ledger.set_available(true);
    assert!(wiring
        .issuer
        .issue(CredentialRequest::new(KEY_SUBJECT))
        .await
        .is_ok());
}
