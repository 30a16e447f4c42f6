use church_donation_core::domains::connection::DbStatus;
use church_donation_core::AppContext;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("🔍 Backend Connection Check");
    println!("===========================");

    let context = match AppContext::initialize() {
        Ok(context) => context,
        Err(e) => {
            eprintln!("❌ Configuration error: {}", e);
            eprintln!("   Set SUPABASE_URL and SUPABASE_ANON_KEY (or add them to .env)");
            std::process::exit(1);
        }
    };

    let config = context.config();
    println!("📍 Backend: {}", config.backend_url);
    println!("   Schema: {}", config.schema);
    println!("   Subscription ceiling: {}", config.max_subscriptions);
    println!("   Realtime events/s: {}", config.events_per_second);

    let connections = context.connections()?;
    let options = connections.client().options().clone();
    println!("\n⚙️  Client options");
    println!("   persist_session: {}", options.persist_session);
    println!("   auto_refresh_token: {}", options.auto_refresh_token);
    println!("   detect_session_in_url: {}", options.detect_session_in_url);

    println!("\n🩺 Health check");
    let report = connections.check_health().await;
    let status = &report.status;
    println!(
        "   Subscriptions: {}/{} ({:.0}%)",
        status.active_count,
        status.ceiling,
        status.usage_percentage()
    );
    println!("   Checked at: {}", report.checked_at);

    match report.db_status {
        DbStatus::Connected => println!("\n✅ Database reachable"),
        _ => {
            println!("\n❌ Database status: {:?}", report.db_status);
            if let Some(error) = &report.error {
                println!("   {}", error);
            }
            context.shutdown();
            std::process::exit(2);
        }
    }

    context.shutdown();
    Ok(())
}
