//! Wire contract tests for the relay HTTP surface
//!
//! Every route answers HTTP 200 with a `{result, return}` body; these tests
//! pin the return code for each admission verdict.

use std::sync::Arc;

use actix_web::body::MessageBody;
use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{test, web, App, Error};

use hushpost_crypto::{digest, Fingerprint, Keypair};
use hushpost_proto::{
    pow, ApiResponse, Envelope, PeerMac, ProbeRequest, RecvRequest, ReturnCode, SendRequest,
};
use hushpost_relay::{
    configure, json_config, AppState, MemoryMailbox, RelayConfig, RelayService,
};

fn relay_app(
    config: RelayConfig,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = Error,
        InitError = (),
    >,
> {
    let service =
        Arc::new(RelayService::new(config.clone(), Arc::new(MemoryMailbox::new())).unwrap());

    App::new()
        .app_data(web::Data::new(AppState { service }))
        .app_data(json_config(config.max_request_bytes))
        .configure(configure)
}

fn low_difficulty_config() -> RelayConfig {
    RelayConfig {
        pow_difficulty: 4,
        ..RelayConfig::default()
    }
}

fn sealed(recipient: &Keypair, difficulty: u8) -> (Fingerprint, String) {
    let sender = Keypair::generate();
    let envelope = Envelope::seal(
        &sender,
        "sender-name",
        &recipient.public(),
        "hello",
        "first post",
        difficulty,
    )
    .unwrap();
    (recipient.fingerprint(), envelope.encode().unwrap())
}

fn unknown_mailbox() -> Fingerprint {
    Fingerprint::from_bytes(digest(&[b"nobody home"]))
}

#[actix_web::test]
async fn send_then_recv_roundtrip() {
    let app = test::init_service(relay_app(low_difficulty_config())).await;
    let recipient = Keypair::generate();
    let (fp, envelope) = sealed(&recipient, 4);

    let req = test::TestRequest::post()
        .uri("/email/send")
        .set_json(SendRequest {
            recipient: fp,
            envelope: envelope.clone(),
            mac: None,
        })
        .to_request();
    let body: ApiResponse = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body.code, ReturnCode::Ok.as_i32());

    // ordinal 0 is the size, as a decimal string
    let req = test::TestRequest::post()
        .uri("/email/recv")
        .set_json(RecvRequest {
            recipient: fp,
            ordinal: 0,
        })
        .to_request();
    let body: ApiResponse = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body.code, ReturnCode::Ok.as_i32());
    assert_eq!(body.result, "1");

    // ordinal 1 returns the envelope, still openable by the recipient
    let req = test::TestRequest::post()
        .uri("/email/recv")
        .set_json(RecvRequest {
            recipient: fp,
            ordinal: 1,
        })
        .to_request();
    let body: ApiResponse = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body.code, ReturnCode::Ok.as_i32());

    let fetched = Envelope::decode(&body.result).unwrap();
    let content = fetched.open(&recipient).unwrap();
    assert_eq!(content.title, "hello");
    assert_eq!(content.body, "first post");
}

#[actix_web::test]
async fn duplicate_send_is_acknowledged_once_stored() {
    let app = test::init_service(relay_app(low_difficulty_config())).await;
    let recipient = Keypair::generate();
    let (fp, envelope) = sealed(&recipient, 4);

    for _ in 0..2 {
        let req = test::TestRequest::post()
            .uri("/email/send")
            .set_json(SendRequest {
                recipient: fp,
                envelope: envelope.clone(),
                mac: None,
            })
            .to_request();
        let body: ApiResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body.code, ReturnCode::Ok.as_i32());
    }

    let req = test::TestRequest::post()
        .uri("/email/recv")
        .set_json(RecvRequest {
            recipient: fp,
            ordinal: 0,
        })
        .to_request();
    let body: ApiResponse = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body.result, "1");
}

#[actix_web::test]
async fn wrong_method_returns_bad_method() {
    let app = test::init_service(relay_app(RelayConfig::default())).await;

    let req = test::TestRequest::get().uri("/email/send").to_request();
    let body: ApiResponse = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body.code, ReturnCode::BadMethod.as_i32());

    let req = test::TestRequest::put().uri("/email/recv").to_request();
    let body: ApiResponse = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body.code, ReturnCode::BadMethod.as_i32());
}

#[actix_web::test]
async fn oversized_body_rejected_before_parse() {
    let config = RelayConfig {
        max_request_bytes: 256,
        ..low_difficulty_config()
    };
    let app = test::init_service(relay_app(config)).await;

    let req = test::TestRequest::post()
        .uri("/email/send")
        .set_json(SendRequest {
            recipient: unknown_mailbox(),
            envelope: "A".repeat(1024),
            mac: None,
        })
        .to_request();
    let body: ApiResponse = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body.code, ReturnCode::Oversized.as_i32());
}

#[actix_web::test]
async fn malformed_body_rejected() {
    let app = test::init_service(relay_app(RelayConfig::default())).await;

    let req = test::TestRequest::post()
        .uri("/email/send")
        .insert_header(("content-type", "application/json"))
        .set_payload("{definitely not json")
        .to_request();
    let body: ApiResponse = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body.code, ReturnCode::MalformedRequest.as_i32());
}

#[actix_web::test]
async fn malformed_envelope_rejected() {
    let app = test::init_service(relay_app(RelayConfig::default())).await;

    let req = test::TestRequest::post()
        .uri("/email/send")
        .set_json(SendRequest {
            recipient: unknown_mailbox(),
            envelope: "!!! not an envelope".to_string(),
            mac: None,
        })
        .to_request();
    let body: ApiResponse = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body.code, ReturnCode::MalformedEnvelope.as_i32());
}

#[actix_web::test]
async fn insufficient_pow_rejected() {
    let config = RelayConfig {
        pow_difficulty: 12,
        ..RelayConfig::default()
    };
    let app = test::init_service(relay_app(config)).await;

    let recipient = Keypair::generate();
    let sender = Keypair::generate();
    let mut envelope = Envelope::seal(
        &sender,
        "sender-name",
        &recipient.public(),
        "hello",
        "body",
        0,
    )
    .unwrap();
    while pow::verify(&envelope.content_hash, 12, envelope.pow_nonce) {
        envelope.pow_nonce += 1;
    }

    let req = test::TestRequest::post()
        .uri("/email/send")
        .set_json(SendRequest {
            recipient: recipient.fingerprint(),
            envelope: envelope.encode().unwrap(),
            mac: None,
        })
        .to_request();
    let body: ApiResponse = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body.code, ReturnCode::FailedProof.as_i32());
}

#[actix_web::test]
async fn trusted_relay_enforces_mac() {
    let config = RelayConfig {
        auth_secret: Some("federation secret".to_string()),
        ..low_difficulty_config()
    };
    let app = test::init_service(relay_app(config)).await;

    let recipient = Keypair::generate();
    let (fp, envelope_str) = sealed(&recipient, 4);
    let envelope = Envelope::decode(&envelope_str).unwrap();

    let req = test::TestRequest::post()
        .uri("/email/send")
        .set_json(SendRequest {
            recipient: fp,
            envelope: envelope_str.clone(),
            mac: None,
        })
        .to_request();
    let body: ApiResponse = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body.code, ReturnCode::FailedMac.as_i32());

    let mac = PeerMac::seal("federation secret", &envelope.content_hash).unwrap();
    let req = test::TestRequest::post()
        .uri("/email/send")
        .set_json(SendRequest {
            recipient: fp,
            envelope: envelope_str,
            mac: Some(mac),
        })
        .to_request();
    let body: ApiResponse = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body.code, ReturnCode::Ok.as_i32());
}

#[actix_web::test]
async fn recv_misses_report_no_data() {
    let app = test::init_service(relay_app(RelayConfig::default())).await;

    // size of an empty mailbox is still a success
    let req = test::TestRequest::post()
        .uri("/email/recv")
        .set_json(RecvRequest {
            recipient: unknown_mailbox(),
            ordinal: 0,
        })
        .to_request();
    let body: ApiResponse = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body.code, ReturnCode::Ok.as_i32());
    assert_eq!(body.result, "0");

    let req = test::TestRequest::post()
        .uri("/email/recv")
        .set_json(RecvRequest {
            recipient: unknown_mailbox(),
            ordinal: 1,
        })
        .to_request();
    let body: ApiResponse = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body.code, ReturnCode::NoData.as_i32());
}

#[actix_web::test]
async fn probe_checks_the_shared_secret() {
    let config = RelayConfig {
        auth_secret: Some("federation secret".to_string()),
        ..RelayConfig::default()
    };
    let app = test::init_service(relay_app(config)).await;

    let req = test::TestRequest::post()
        .uri("/")
        .set_json(ProbeRequest {
            mac: PeerMac::seal_probe("wrong secret").unwrap(),
        })
        .to_request();
    let body: ApiResponse = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body.code, ReturnCode::FailedMac.as_i32());

    let req = test::TestRequest::post()
        .uri("/")
        .set_json(ProbeRequest {
            mac: PeerMac::seal_probe("federation secret").unwrap(),
        })
        .to_request();
    let body: ApiResponse = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body.code, ReturnCode::Ok.as_i32());
}

#[actix_web::test]
async fn banner_is_served() {
    let app = test::init_service(relay_app(RelayConfig::default())).await;

    let req = test::TestRequest::get().uri("/").to_request();
    let body = test::call_and_read_body(&app, req).await;
    assert!(std::str::from_utf8(&body).unwrap().contains("hushpost"));
}
