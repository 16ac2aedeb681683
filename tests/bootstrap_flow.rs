//! End-to-end flow of an ID-site session against a mocked identity API:
//! 1. The browser lands on the site with the token in the `jwt=` parameter.
//! 2. The bootstrap strips the token, resolves the organization parent
//!    resource and exchanges the token for a bearer credential.
//! 3. A password login is followed by a multi-factor challenge, with the
//!    credential rotating on every response.

use anyhow::{bail, Result};
use base64ct::{Base64UrlUnpadded, Encoding};
use idsite::{
    browser::{
        CookieJar, CookieStore, LocationAccessor, StaticLocation, ORGANIZATION_NAME_KEY_COOKIE,
        SESSION_COOKIE,
    },
    session::{Bootstrap, BootstrapState, IdSiteOptions, LoginRequest, SessionError},
};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use std::{net::TcpListener, sync::Arc};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn can_bind_localhost() -> bool {
    TcpListener::bind("127.0.0.1:0").is_ok()
}

fn signed_token(claims: &Value) -> String {
    format!(
        "{}.{}.{}",
        Base64UrlUnpadded::encode_string(br#"{"alg":"HS256","typ":"JWT","kid":"k1"}"#),
        Base64UrlUnpadded::encode_string(claims.to_string().as_bytes()),
        Base64UrlUnpadded::encode_string(b"signature")
    )
}

fn rotating(status: u16, credential: &str, body: &Value) -> ResponseTemplate {
    ResponseTemplate::new(status)
        .insert_header("Authorization", format!("Bearer {credential}").as_str())
        .set_body_json(body)
}

#[tokio::test]
async fn organization_login_with_second_factor() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    let api = format!("{}/v1", server.uri());
    let organization = format!("{api}/organizations/org1");

    let jwt = signed_token(&json!({
        "iss": "https://id.example.com",
        "sub": "client-id",
        "appHref": format!("{api}/applications/app1"),
        "asnk": true,
        "ash": organization,
        "onk": "acme",
        "require_mfa": ["sms"],
        "state": "opaque-state"
    }));

    Mock::given(method("GET"))
        .and(path("/v1/organizations/org1"))
        .and(query_param("expand", "idSiteModel,customData"))
        .and(header("Authorization", format!("Bearer {jwt}").as_str()))
        .respond_with(rotating(
            200,
            "credential-1",
            &json!({
                "href": organization,
                "idSiteModel": { "passwordPolicy": { "minLength": 8 } },
                "customData": { "brand": "Acme" }
            }),
        ))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/organizations/org1/loginAttempts"))
        .and(header("Authorization", "Bearer credential-1"))
        .and(body_json(json!({ "type": "basic", "value": "amFuZTpzM2NyZXQh" })))
        .respond_with(rotating(
            200,
            "credential-2",
            &json!({ "account": { "href": format!("{api}/accounts/acc1") } }),
        ))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/accounts/acc1/factors"))
        .and(header("Authorization", "Bearer credential-2"))
        .respond_with(rotating(
            200,
            "credential-3",
            &json!({ "items": [ { "href": format!("{api}/factors/f1"), "type": "SMS" } ] }),
        ))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/factors/f1/challenges"))
        .and(header("Authorization", "Bearer credential-3"))
        .respond_with(rotating(
            201,
            "credential-4",
            &json!({ "href": format!("{api}/challenges/c1"), "status": "CREATED" }),
        ))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/challenges/c1"))
        .and(header("Authorization", "Bearer credential-4"))
        .and(body_json(json!({ "code": "123456" })))
        .respond_with(rotating(
            200,
            "credential-5",
            &json!({ "status": "SUCCESS", "serviceProviderCallbackUrl": "https://app/cb" }),
        ))
        .expect(1)
        .mount(&server)
        .await;

    let location = Arc::new(StaticLocation::new(format!(
        "https://id.example.com/?jwt={jwt}&lang=en#/login"
    )));
    let cookies = Arc::new(CookieJar::new());

    let bootstrap = Bootstrap::new(IdSiteOptions::new(location.clone(), cookies.clone()));
    assert_eq!(bootstrap.state(), BootstrapState::AwaitingHandshake);
    assert_eq!(location.href(), "https://id.example.com/?lang=en#/login");

    let site = bootstrap.finish().await?;
    assert_eq!(site.context().parent_resource_url, organization);
    assert!(site.requires_mfa());
    assert_eq!(site.organization_name_key().as_deref(), Some("acme"));
    assert_eq!(site.custom_data()["brand"], "Acme");
    assert_eq!(cookies.get(SESSION_COOKIE).as_deref(), Some("credential-1"));
    assert_eq!(cookies.get(ORGANIZATION_NAME_KEY_COOKIE).as_deref(), Some("acme"));

    let login = LoginRequest::basic("jane", SecretString::from("s3cret!".to_string()));
    let attempt = site.login(&login, None)?.await?;

    let factors = site.get_factors(&attempt["account"])?.await?;
    let challenge = site.create_challenge(&factors["items"][0], None)?.await?;
    let result = site
        .update_challenge(&challenge, &json!({ "code": "123456" }))?
        .await?;

    assert_eq!(result["status"], "SUCCESS");
    assert_eq!(site.credential().expose_secret(), "credential-5");
    // Only the bootstrap persists the credential.
    assert_eq!(cookies.get(SESSION_COOKIE).as_deref(), Some("credential-1"));
    Ok(())
}

#[tokio::test]
async fn stripped_renewal_header_fails_the_bootstrap() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    let jwt = signed_token(&json!({
        "appHref": format!("{}/v1/applications/app1", server.uri())
    }));

    Mock::given(method("GET"))
        .and(path("/v1/applications/app1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "idSiteModel": {} })))
        .expect(1)
        .mount(&server)
        .await;

    let location = Arc::new(StaticLocation::new("https://id.example.com/"));
    let cookies = Arc::new(CookieJar::new());
    let options = IdSiteOptions::new(location, cookies.clone()).with_jwt(jwt);

    match Bootstrap::new(options).finish().await {
        Err(err @ SessionError::NoAuthTokenHeader) => {
            assert_eq!(err.code(), Some("NO_AUTH_TOKEN_HEADER"));
        }
        Err(err) => bail!("unexpected error: {err}"),
        Ok(_) => bail!("bootstrap succeeded without a credential"),
    }
    assert_eq!(cookies.get(SESSION_COOKIE), None);
    Ok(())
}
