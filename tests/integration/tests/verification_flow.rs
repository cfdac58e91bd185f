//! Integration test: verification against documents from several resolvers.

use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use sigil_agent::Agent;
use sigil_credentials::{CredentialError, CredentialRequest, FailureCode, VerifyInput};
use sigil_crypto::jws::{attach_signature, signing_input};
use sigil_crypto::{sign, JwsHeader, KeyPair};
use sigil_identity::DidDocument;
use sigil_integration_tests::{offline_agent, offline_config, KEY_SUBJECT};

fn signed_jwt(kp: &KeyPair, kid: &str, claims: Value) -> String {
    let header = JwsHeader::eddsa_jwt(Some(kid.to_string()));
    let input = signing_input(&header, &claims).unwrap();
    attach_signature(&input, &sign(input.as_bytes(), kp))
}

fn claims_for(issuer: &str) -> Value {
    json!({
        "vc": {
            "@context": ["https://www.w3.org/2018/credentials/v1"],
            "type": ["VerifiableCredential", "Employment"],
            "credentialSubject": {"employer": "ACME"}
        },
        "sub": KEY_SUBJECT,
        "iss": issuer,
        "nbf": 1_700_000_000
    })
}

#[tokio::test]
async fn test_unregistered_issuer_method_is_error() {
    let agent = offline_agent().await;
    let kp = KeyPair::generate();
    let jwt = signed_jwt(&kp, "did:example:123#key-1", claims_for("did:example:123"));

    let err = agent.verify_credential(jwt).await.unwrap_err();
    assert!(matches!(err, CredentialError::UnresolvableIssuer(_)), "{err:?}");
}

#[tokio::test]
async fn test_did_web_issuer() {
    let server = MockServer::start().await;
    let authority = server.uri().trim_start_matches("http://").replace(':', "%3A");
    let did = format!("did:web:{}", authority);
    let kid = format!("{}#key-1", did);

    let kp = KeyPair::generate();
    let document = DidDocument::with_ed25519_key(&did, "key-1", &kp.public_key());
    Mock::given(method("GET"))
        .and(path("/.well-known/did.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&document))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = offline_config();
    config.resolver.insecure_web = true;
    let agent = Agent::builder(config).build().await.unwrap();

    let jwt = signed_jwt(&kp, &kid, claims_for(&did));
    let result = agent.verify_credential(jwt.clone()).await.unwrap();
    assert!(result.verified, "{:?}", result.error);
    assert_eq!(result.issuer, did);

    // second verification is served from the document cache
    let forged = signed_jwt(&KeyPair::generate(), &kid, claims_for(&did));
    let result = agent.verify_credential(forged).await.unwrap();
    assert!(!result.verified);
    assert_eq!(result.error.unwrap().code, FailureCode::SignatureMismatch);
}

#[tokio::test]
async fn test_did_key_issuer_offline() {
    let agent = offline_agent().await;
    let kp = KeyPair::generate();
    let did = sigil_identity::did_key_from_public_key(&kp.public_key());
    let kid = format!("{}#{}", did, did.method_specific_id());

    let jwt = signed_jwt(&kp, &kid, claims_for(did.as_str()));
    let input = VerifyInput::parse(&jwt).unwrap();
    assert!(agent.verify_credential(input).await.unwrap().verified);
}

#[tokio::test]
async fn test_structured_credential_round_trip_and_tamper() {
    let agent = offline_agent().await;
    let credential = agent
        .issue_credential(
            CredentialRequest::new(KEY_SUBJECT).with_attribute("level", json!("gold")),
        )
        .await
        .unwrap()
        .credential;

    // serialized and parsed back, as a holder would present it
    let text = serde_json::to_string(&credential).unwrap();
    let result = agent
        .verify_credential(VerifyInput::parse(&text).unwrap())
        .await
        .unwrap();
    assert!(result.verified);

    let mut tampered: Value = serde_json::from_str(&text).unwrap();
    tampered["credentialSubject"]["level"] = json!("platinum");
    let result = agent
        .verify_credential(VerifyInput::from_value(tampered).unwrap())
        .await
        .unwrap();
    assert!(!result.verified);
    assert_eq!(result.error.unwrap().code, FailureCode::PayloadMismatch);
}

#[tokio::test]
async fn test_unsigned_members_cannot_be_swapped() {
    let agent = offline_agent().await;
    let mut request = CredentialRequest::new(KEY_SUBJECT).with_attribute("level", json!("gold"));
    request.credential_schema = Some("https://example.org/schemas/membership.json".into());
    let credential = agent.issue_credential(request).await.unwrap().credential;
    let original = serde_json::to_value(&credential).unwrap();

    let edits: Vec<(&str, Box<dyn Fn(&mut Value)>)> = vec![
        (
            "@context",
            Box::new(|c: &mut Value| {
                c["@context"] = json!([
                    "https://evil.example/ctx",
                    "https://www.w3.org/2018/credentials/v1"
                ])
            }),
        ),
        (
            "credentialSchema",
            Box::new(|c: &mut Value| {
                c["credentialSchema"] = json!("https://evil.example/schema.json")
            }),
        ),
        (
            "issuanceDate",
            Box::new(|c: &mut Value| c["issuanceDate"] = json!("2015-01-01T00:00:00Z")),
        ),
        (
            "id",
            Box::new(|c: &mut Value| {
                c["id"] = json!("urn:uuid:00000000-0000-4000-8000-0000000000ff")
            }),
        ),
        (
            "credentialStatus",
            Box::new(|c: &mut Value| {
                c["credentialStatus"] = json!({"id": "https://evil.example/status/7"})
            }),
        ),
    ];
    for (member, edit) in edits {
        let mut tampered = original.clone();
        edit(&mut tampered);
        let result = agent
            .verify_credential(VerifyInput::from_value(tampered).unwrap())
            .await
            .unwrap();
        assert!(!result.verified, "{member} edit accepted");
        let error = result.error.unwrap();
        assert_eq!(error.code, FailureCode::PayloadMismatch, "{member}");
        assert!(error.message.starts_with(member), "{}", error.message);
    }
}

#[tokio::test]
async fn test_malformed_input() {
    let agent = offline_agent().await;
    assert!(matches!(
        agent.verify_credential("definitely not a jwt").await,
        Err(CredentialError::MalformedCredential(_))
    ));
    assert!(VerifyInput::parse("{\"proof\": 7}").is_err());
}
