use atelier::checkout::{CheckoutService, PayoutEngine, Reconciler, ReversalEngine};
use atelier::gateway::{
    CachingTaxIdValidator, HttpPaymentGateway, HttpShippingQuoter, PaymentGateway, ShippingQuoter,
    TaxIdValidator,
};
use atelier::{api, config::Config, db::init_db, Repository};
use std::net::SocketAddr;
use std::sync::Arc;

/// Registry validator placeholder: without an upstream configured we treat
/// every id as unvalidated, which resolves to the standard tax treatment.
#[derive(Debug)]
struct NoopTaxIdValidator;

#[async_trait::async_trait]
impl TaxIdValidator for NoopTaxIdValidator {
    async fn validate(
        &self,
        _country: &atelier::Country,
        _tax_id: &str,
    ) -> Result<bool, atelier::gateway::GatewayError> {
        Ok(false)
    }
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    // Load configuration
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let port = config.port;

    // Initialize database and dependencies
    let pool = match init_db(&config.database_path).await {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Failed to initialize database: {}", e);
            std::process::exit(1);
        }
    };

    let repo = Arc::new(Repository::new(pool));

    // The gateway client is owned here and injected everywhere it is used.
    let gateway: Arc<dyn PaymentGateway> = Arc::new(HttpPaymentGateway::new(
        config.payment_api_url.clone(),
        config.payment_secret_key.clone(),
    ));
    let quoter: Option<Arc<dyn ShippingQuoter>> = config
        .shipping_api_url
        .clone()
        .map(|url| Arc::new(HttpShippingQuoter::new(url)) as Arc<dyn ShippingQuoter>);
    let vat: Arc<dyn TaxIdValidator> = Arc::new(CachingTaxIdValidator::new(
        Arc::new(NoopTaxIdValidator),
        repo.clone(),
        config.vat_cache_ttl_minutes,
    ));

    let checkout = Arc::new(CheckoutService::new(
        repo.clone(),
        gateway.clone(),
        quoter,
        vat,
        config.clone(),
    ));
    let payouts = Arc::new(PayoutEngine::new(
        repo.clone(),
        gateway.clone(),
        config.platform_fee_bps,
        config.payout_delay_days,
    ));
    let reversals = Arc::new(ReversalEngine::new(repo.clone(), gateway.clone()));
    let reconciler = Arc::new(Reconciler::new(repo.clone(), payouts, reversals));

    // Create router
    let app = api::create_router(api::AppState::new(repo, config, checkout, reconciler));

    // Bind to address
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    tracing::info!("Server listening on {}", addr);

    // Run server
    if let Err(e) = axum::serve(listener, app).await {
        eprintln!("Server error: {}", e);
        std::process::exit(1);
    }
}
