// Point d'entree du demon de routage : charge la configuration locale,
// demarre un ecouteur TCP par interface, arme les timers periodiques et,
// si configure, le canal de controle.

use linkstate_router::config::{read_router_config, RouterConfig};
use linkstate_router::control::serve_control;
use linkstate_router::error::Result;
use linkstate_router::router::RouterHandle;
use linkstate_router::timer::TokioTimerService;
use linkstate_router::transport::{serve_tcp, TcpTransport};
use std::sync::Arc;

fn init_logging() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let config_dir = std::env::var("OSPF_CONFIG_DIR").unwrap_or_else(|_| "config".to_string());
    let config: RouterConfig = read_router_config(&config_dir)?;

    log::info!("starting router {}", config.router_id);

    let transport = Arc::new(TcpTransport);
    let timers = Arc::new(TokioTimerService);
    let router = RouterHandle::from_config(&config, transport, timers);

    for iface in &config.interfaces {
        let bind_addr = format!("0.0.0.0:{}", iface.listen_port);
        let iface_name = iface.name.clone();
        let router = Arc::clone(&router);
        tokio::spawn(async move {
            if let Err(e) = serve_tcp(&bind_addr, iface_name, router).await {
                log::error!("interface listener stopped: {}", e);
            }
        });
    }

    let _periodic = router.start();

    if let Some(control_port) = config.control_port {
        let bind_addr = format!("0.0.0.0:{}", control_port);
        let router = Arc::clone(&router);
        tokio::spawn(async move {
            if let Err(e) = serve_control(&bind_addr, router).await {
                log::error!("control channel stopped: {}", e);
            }
        });
    }

    log::info!("router {} up", config.router_id);
    tokio::signal::ctrl_c().await.ok();
    log::info!("shutting down");
    Ok(())
}
