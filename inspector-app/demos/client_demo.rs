//! Client demo walking through the dashboard flows against a local server.
//!
//! Run with: cargo run -p inspector-app --example client_demo --no-default-features --features sqlite

use std::net::SocketAddr;
use std::sync::Arc;

use inspector_client::InspectorClient;
use inspector_hex::inbound::{HttpServer, SessionManager};
use inspector_hex::outbound::PatternAnalyzer;
use inspector_hex::{AdminCredentials, InspectorService};
use inspector_repo::build_repo;
use inspector_types::{SmsSearchRequest, UpdateSettingsRequest, UserStatus};
use premiumy::{PremiumyClient, PremiumyConfig};
use tempfile::tempdir;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr: SocketAddr = listener.local_addr()?;

    // Temp file-backed SQLite DB
    let tmp = tempdir()?;
    let db_url = format!("sqlite://{}?mode=rwc", tmp.path().join("inspector.db").display());
    println!("🚀 Starting server on {addr}...");
    println!("   Database: {db_url}");

    let repo = build_repo(&db_url).await?;
    let service = InspectorService::new(
        repo,
        Arc::new(PremiumyClient::new(PremiumyConfig::default())?),
        Arc::new(PatternAnalyzer::new()),
        AdminCredentials {
            username: "admin".into(),
            password: "panel-pass".into(),
        },
    );
    service.ensure_admin("admin@example.com", "admin-password").await?;

    let router = HttpServer::new(service, SessionManager::new("demo-secret", false)).router();
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router.into_make_service()).await {
            eprintln!("server error: {e}");
        }
    });

    let base_url = format!("http://{addr}");

    // ─────────────────────────────────────────────────────────────────────────
    // Demo: user and admin flows
    // ─────────────────────────────────────────────────────────────────────────

    let mut alice = InspectorClient::new(&base_url);
    println!("✅ Server health: {}", alice.health().await?);

    let site = alice.site_settings().await?;
    println!("✅ Site: {} (sign-up open: {})", site.site_name, site.signup_enabled);

    let profile = alice
        .signup("Alice", "alice@example.com", "correct-horse")
        .await?;
    alice.login("alice@example.com", "correct-horse").await?;
    println!("✅ Signed in as {} (id={})", profile.email, profile.id);

    let req = SmsSearchRequest {
        start_date: today(),
        end_date: today(),
        sender_id: None,
        phone: None,
        page: None,
        per_page: None,
    };
    match alice.search_sms(&req).await {
        Ok(result) => println!("✅ {} records", result.total),
        Err(e) => println!("✅ Search refused before configuration: {e}"),
    }

    let analysis = alice
        .analyze_message("Telegram code: 48213. Log in at https://t.me/login")
        .await?;
    println!(
        "✅ Analyzer '{}' found code {:?} and link {:?}",
        analysis.analyzer, analysis.info.confirmation_code, analysis.info.link
    );

    // Admin session: user login first, then the panel password
    let mut admin = InspectorClient::new(&base_url);
    admin.login("admin@example.com", "admin-password").await?;
    admin.admin_login("admin", "panel-pass").await?;

    let saved = admin
        .update_settings(&UpdateSettingsRequest {
            site_name: Some("Relay Desk".into()),
            ..Default::default()
        })
        .await?;
    println!("✅ Site renamed to {}", saved.settings.site_name);

    admin.set_number_permission(profile.id, true).await?;
    let numbers = alice.add_numbers(vec!["447700900123".into()]).await?;
    println!("✅ Alice added a number, list: {numbers:?}");

    admin.set_user_status(profile.id, UserStatus::Blocked).await?;
    let blocked = alice.list_numbers().await;
    println!("✅ Blocked user refused: {}", blocked.is_err());
    println!("   /me still answers: {:?}", alice.me().await?.status);

    println!("\n📋 Users:");
    for user in admin.list_users().await? {
        println!("   - {} ({}) {}", user.email, user.id, user.status);
    }

    admin.admin_logout().await?;
    println!("\n🎉 Demo completed successfully!");
    Ok(())
}

fn today() -> chrono::NaiveDate {
    chrono::Utc::now().date_naive()
}
