use anyhow::Result;
use pricelight::clock::ClockSource;
use pricelight::config::Config;
use pricelight::control::{ControlLoop, actuator_from_config};
use pricelight::logging::{get_logger, init_logging};
use pricelight::prices::{HttpPriceSource, PriceFetcher};
use pricelight::render::{Renderer, TextCanvas};
use pricelight::situation::{Situation, SituationHub};
use pricelight::web::{self, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid config: {}", e))?;
    init_logging(&config.logging).map_err(|e| anyhow::anyhow!("Logging init failed: {}", e))?;

    let logger = get_logger("main");
    logger.info(&format!(
        "Pricelight {} starting ({} {}, threshold {} {}/kWh)",
        env!("APP_VERSION"),
        config.prices.geography,
        config.prices.timezone,
        config.control.max_price,
        config.prices.currency
    ));

    let (hub, handle) = SituationHub::new(Situation::default());
    let hub_task = tokio::spawn(hub.run());

    // Fetch task: clock + prices, publishing into the hub
    let clock = ClockSource::from_config(&config.clock);
    let source = HttpPriceSource::new(&config.prices)
        .map_err(|e| anyhow::anyhow!("Failed to create price client: {}", e))?;
    let fetcher = PriceFetcher::new(Box::new(source), &config.prices)
        .map_err(|e| anyhow::anyhow!("Failed to create price fetcher: {}", e))?;
    let fetch_task = tokio::spawn(fetcher.run(clock, handle.clone()));

    // Control task: outputs and display
    let tz = config
        .prices
        .tz()
        .map_err(|e| anyhow::anyhow!("Invalid time zone: {}", e))?;
    let control = ControlLoop::new(
        handle.subscribe(),
        actuator_from_config(&config.control),
        TextCanvas::new(),
        Renderer::from_config(&config.display, tz),
        &config.control,
        &config.prices.currency,
    );
    let control_task = tokio::spawn(control.run());

    if config.web.enabled {
        let state = AppState {
            situation: handle.clone(),
            max_price: config.control.max_price,
            currency: config.prices.currency.clone(),
        };
        let host = config.web.host.clone();
        let port = config.web.port;
        let web_logger = get_logger("web");
        tokio::spawn(async move {
            if let Err(e) = web::serve(state, &host, port).await {
                web_logger.error(&e.to_string());
            }
        });
    }

    // The tasks run for the lifetime of the process
    let (hub_res, fetch_res, control_res) = tokio::join!(hub_task, fetch_task, control_task);
    for (name, res) in [("hub", hub_res), ("fetch", fetch_res), ("control", control_res)] {
        if let Err(e) = res {
            logger.error(&format!("{} task ended: {}", name, e));
        }
    }
    Ok(())
}
