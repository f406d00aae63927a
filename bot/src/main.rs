use std::sync::Arc;
use std::time::Duration;

use hacksquad_bot::{
    api::{prometheus::PrometheusClient, UpstreamClient},
    config::Env,
    Context,
};
use rocket::routes;
use shared::discord::DiscordSubscriber;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, EnvFilter};

#[rocket::get("/metrics")]
pub async fn metrics(
    state: &rocket::State<Context>,
) -> Option<(
    rocket::http::ContentType,
    rocket::response::content::RawHtml<String>,
)> {
    let metrics = state.prometheus.encode().ok()?;
    Some((
        rocket::http::ContentType::new(
            "application/openmetrics-text",
            " version=1.0.0; charset=utf-8",
        ),
        rocket::response::content::RawHtml(metrics),
    ))
}

#[rocket::get("/health")]
pub fn health() -> &'static str {
    "ok"
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let env = Env::from_env()?;
    let discord = env.discord_webhook_url.clone().map(DiscordSubscriber::new);

    let subscriber = tracing_subscriber::registry()
        .with(discord)
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer());
    tracing::subscriber::set_global_default(subscriber)?;

    let prometheus: Arc<PrometheusClient> = Default::default();
    let context = Context::new(
        UpstreamClient::new(env.endpoints()?),
        env.cache_settings(),
        env.query_settings()?,
        prometheus,
    );

    tokio::select! {
        _ = warm_up(context.clone(), env.warmup_interval()) => {
        }
        _ = signal::ctrl_c() => {
            warn!("Received SIGINT. Exiting.");
        }
        _ = rocket::build()
            .mount("/", routes![metrics, health])
            .manage(context)
            .launch() => {

            }
    }
    warn!("Exiting bot...");

    Ok(())
}

async fn warm_up(context: Context, interval: Option<Duration>) {
    let Some(interval) = interval else {
        return std::future::pending().await;
    };
    info!("Refreshing cache every {} seconds", interval.as_secs());

    let mut interval = tokio::time::interval(interval);
    loop {
        interval.tick().await;
        if let Err(e) = context.warm_up().await {
            error!("Failed to warm up cache: {e}");
        }
    }
}
