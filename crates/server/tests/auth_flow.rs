use std::net::SocketAddr;

use axum::Router;
use reqwest::StatusCode as HttpStatusCode;
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use server::routes;
use server::startup::build_state;

struct TestApp {
    base_url: String,
    admin_email: String,
}

async fn start_server() -> anyhow::Result<TestApp> {
    let url = match std::env::var("DATABASE_URL") {
        Ok(u) => u,
        Err(_) => {
            eprintln!("DATABASE_URL missing; skip auth flow tests.");
            return Err(anyhow::anyhow!("missing DATABASE_URL"));
        }
    };
    let admin_email = format!("admin_{}@example.com", Uuid::new_v4());

    let mut cfg = configs::AppConfig::default();
    cfg.database.url = url;
    cfg.storage.image_dir = format!("target/test-data/{}/images", Uuid::new_v4());
    cfg.auth.jwt_secret = "test-secret".into();
    cfg.auth.admin_emails = vec![admin_email.clone()];
    cfg.auth.rate_limit_per_minute = 1000;

    let state = build_state(&cfg).await?;
    let app: Router = routes::build_router(CorsLayer::very_permissive(), state);

    let listener = TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0)).await?;
    let addr: SocketAddr = listener.local_addr()?;
    let base_url = format!("http://{}:{}", addr.ip(), addr.port());

    tokio::spawn(async move {
        let svc = app.into_make_service_with_connect_info::<SocketAddr>();
        if let Err(e) = axum::serve(listener, svc).await {
            eprintln!("server error: {}", e);
        }
    });

    Ok(TestApp { base_url, admin_email })
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .cookie_store(true)
        .build()
        .expect("reqwest client")
}

async fn register_and_login(
    c: &reqwest::Client,
    base_url: &str,
    email: &str,
    password: &str,
) -> anyhow::Result<()> {
    let res = c
        .post(format!("{base_url}/api/v1/auth/register"))
        .json(&json!({ "email": email, "name": "Tester", "password": password }))
        .send()
        .await?;
    anyhow::ensure!(res.status() == HttpStatusCode::CREATED, "register failed: {}", res.status());

    let res = c
        .post(format!("{base_url}/api/v1/auth/login"))
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await?;
    anyhow::ensure!(res.status() == HttpStatusCode::OK, "login failed: {}", res.status());
    Ok(())
}

#[tokio::test]
async fn auth_register_login_me_logout() -> anyhow::Result<()> {
    if std::env::var("SKIP_DB_TESTS").is_ok() {
        return Ok(());
    }
    let app = match start_server().await {
        Ok(a) => a,
        Err(_) => return Ok(()),
    };
    let c = client();
    let email = format!("user_{}@example.com", Uuid::new_v4());
    let password = "S3curePass!";

    // register
    let res = c
        .post(format!("{}/api/v1/auth/register", app.base_url))
        .json(&json!({ "email": email, "name": "Tester", "password": password }))
        .send()
        .await?;
    assert_eq!(res.status(), HttpStatusCode::CREATED);

    // duplicate email conflicts
    let res = c
        .post(format!("{}/api/v1/auth/register", app.base_url))
        .json(&json!({ "email": email, "name": "Tester", "password": password }))
        .send()
        .await?;
    assert_eq!(res.status(), HttpStatusCode::CONFLICT);

    // wrong password
    let res = c
        .post(format!("{}/api/v1/auth/login", app.base_url))
        .json(&json!({ "email": email, "password": "WrongPass1" }))
        .send()
        .await?;
    assert_eq!(res.status(), HttpStatusCode::UNAUTHORIZED);

    // login sets the auth cookie
    let res = c
        .post(format!("{}/api/v1/auth/login", app.base_url))
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await?;
    assert_eq!(res.status(), HttpStatusCode::OK);
    let me = res.json::<serde_json::Value>().await?;
    assert_eq!(me["email"], email.as_str());

    // cookie-backed me
    let res = c.get(format!("{}/api/v1/auth/me", app.base_url)).send().await?;
    assert_eq!(res.status(), HttpStatusCode::OK);
    let me = res.json::<serde_json::Value>().await?;
    assert_eq!(me["email"], email.as_str());

    // logout clears the cookie
    let res = c.post(format!("{}/api/v1/auth/logout", app.base_url)).send().await?;
    assert_eq!(res.status(), HttpStatusCode::NO_CONTENT);
    let res = c.get(format!("{}/api/v1/auth/me", app.base_url)).send().await?;
    assert_eq!(res.status(), HttpStatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn auth_api_key_issue_and_task_scoping() -> anyhow::Result<()> {
    if std::env::var("SKIP_DB_TESTS").is_ok() {
        return Ok(());
    }
    let app = match start_server().await {
        Ok(a) => a,
        Err(_) => return Ok(()),
    };
    let c = client();
    let email = format!("owner_{}@example.com", Uuid::new_v4());
    register_and_login(&c, &app.base_url, &email, "S3curePass!").await?;

    // issue a key (cookie auth)
    let res = c
        .post(format!("{}/api/v1/auth/api-keys", app.base_url))
        .json(&json!({ "label": "ci" }))
        .send()
        .await?;
    assert_eq!(res.status(), HttpStatusCode::CREATED);
    let body = res.json::<serde_json::Value>().await?;
    let key = body["key"].as_str().expect("plaintext key").to_string();
    assert!(key.starts_with("sk_"));

    // generate a task owned by the key's user, via a fresh cookie-less client
    let bare = reqwest::Client::new();
    let res = bare
        .post(format!("{}/api/v1/generate", app.base_url))
        .header("X-Api-Key", &key)
        .json(&json!({ "prompt": "an owned task" }))
        .send()
        .await?;
    assert_eq!(res.status(), HttpStatusCode::CREATED);
    let task_id = res.json::<serde_json::Value>().await?["task_id"]
        .as_str()
        .expect("task id")
        .to_string();

    // the key's listing contains it
    let res = bare
        .get(format!("{}/api/v1/tasks", app.base_url))
        .header("X-Api-Key", &key)
        .send()
        .await?;
    assert_eq!(res.status(), HttpStatusCode::OK);
    let list = res.json::<serde_json::Value>().await?;
    let ids: Vec<&str> = list["tasks"]
        .as_array()
        .expect("tasks array")
        .iter()
        .filter_map(|t| t["id"].as_str())
        .collect();
    assert!(ids.contains(&task_id.as_str()));

    // an anonymous caller sees neither the task nor may fetch it
    let res = bare.get(format!("{}/api/v1/tasks", app.base_url)).send().await?;
    let list = res.json::<serde_json::Value>().await?;
    let ids: Vec<&str> = list["tasks"]
        .as_array()
        .expect("tasks array")
        .iter()
        .filter_map(|t| t["id"].as_str())
        .collect();
    assert!(!ids.contains(&task_id.as_str()));

    let res = bare
        .get(format!("{}/api/v1/tasks/{}", app.base_url, task_id))
        .send()
        .await?;
    assert_eq!(res.status(), HttpStatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn admin_gates_model_configs_and_image_delete() -> anyhow::Result<()> {
    if std::env::var("SKIP_DB_TESTS").is_ok() {
        return Ok(());
    }
    let app = match start_server().await {
        Ok(a) => a,
        Err(_) => return Ok(()),
    };

    // regular user is forbidden
    let user = client();
    let email = format!("user_{}@example.com", Uuid::new_v4());
    register_and_login(&user, &app.base_url, &email, "S3curePass!").await?;
    let res = user.get(format!("{}/api/v1/models", app.base_url)).send().await?;
    assert_eq!(res.status(), HttpStatusCode::FORBIDDEN);

    // admin may manage model configs
    let admin = client();
    register_and_login(&admin, &app.base_url, &app.admin_email, "S3curePass!").await?;

    let res = admin
        .post(format!("{}/api/v1/models", app.base_url))
        .json(&json!({
            "name": format!("e2e_model_{}", Uuid::new_v4()),
            "api_base_url": "https://ark.example.com/api/v3",
            "api_key": "ak-e2e",
            "model": "seedream"
        }))
        .send()
        .await?;
    assert_eq!(res.status(), HttpStatusCode::CREATED);
    let created = res.json::<serde_json::Value>().await?;
    let id = created["id"].as_str().expect("id").to_string();
    // api_key never appears in responses
    assert!(created.get("api_key").is_none());

    let res = admin
        .put(format!("{}/api/v1/models/{}", app.base_url, id))
        .json(&json!({
            "name": created["name"],
            "api_base_url": "https://ark.example.com/api/v3",
            "model": "seedream-pro",
            "is_active": false
        }))
        .send()
        .await?;
    assert_eq!(res.status(), HttpStatusCode::OK);
    let updated = res.json::<serde_json::Value>().await?;
    assert_eq!(updated["model"], "seedream-pro");
    assert_eq!(updated["is_active"], false);

    // pinning a task to an inactive config is a client error
    let res = admin
        .post(format!("{}/api/v1/generate", app.base_url))
        .json(&json!({ "prompt": "uses a model", "model_config_id": id }))
        .send()
        .await?;
    assert_eq!(res.status(), HttpStatusCode::BAD_REQUEST);

    let res = admin
        .delete(format!("{}/api/v1/models/{}", app.base_url, id))
        .send()
        .await?;
    assert_eq!(res.status(), HttpStatusCode::NO_CONTENT);

    // deleting an image requires admin; unknown file is 404
    let res = user
        .delete(format!("{}/api/v1/images/nope.jpg", app.base_url))
        .send()
        .await?;
    assert_eq!(res.status(), HttpStatusCode::FORBIDDEN);
    let res = admin
        .delete(format!("{}/api/v1/images/nope.jpg", app.base_url))
        .send()
        .await?;
    assert_eq!(res.status(), HttpStatusCode::NOT_FOUND);
    Ok(())
}
