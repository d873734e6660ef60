use std::error::Error;
use std::sync::{Arc, Mutex};
use talkdeck::controller::{Controller, CATALOG_FALLBACK_DELAY};
use talkdeck::{config_loader, engine, panel};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let (event_tx, mut event_rx) = tokio::sync::mpsc::unbounded_channel();

    let settings = config_loader::SETTINGS
        .read()
        .map_err(|_| "settings lock poisoned")?;
    let listen_addr = settings.listen_addr.clone();
    let phrases = settings.phrases.clone();
    let engine = engine::build(&settings, event_tx);
    drop(settings);

    let state = Arc::new(Mutex::new(match engine {
        Some(engine) => Controller::new(engine, phrases),
        None => {
            warn!("no speech support available, panel starts disabled");
            Controller::unsupported()
        }
    }));

    // Initial catalog load. Some platforms only report voices later, via a
    // CatalogChanged event or not at all; the fallback timer covers the rest.
    if let Ok(mut ctl) = state.lock() {
        ctl.refresh_voices();
    }

    let pump_state = state.clone();
    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            if let Ok(mut ctl) = pump_state.lock() {
                ctl.handle_engine_event(event);
            }
        }
    });

    let fallback_state = state.clone();
    tokio::spawn(async move {
        tokio::time::sleep(CATALOG_FALLBACK_DELAY).await;
        if let Ok(mut ctl) = fallback_state.lock() {
            ctl.catalog_fallback();
        }
    });

    info!("talkdeck {} starting", env!("CARGO_PKG_VERSION"));
    panel::start_server(&listen_addr, state).await;

    Ok(())
}
