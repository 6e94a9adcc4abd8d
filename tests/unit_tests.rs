// Verifications au niveau des frontieres publiques de la bibliotheque:
// chargement de configuration, construction d'un routeur a partir d'icelle,
// et rejet propre d'une configuration d'interface invalide.

use linkstate_router::config::read_router_config_for;
use linkstate_router::router::RouterHandle;
use linkstate_router::timer::TokioTimerService;
use linkstate_router::transport::TcpTransport;
use linkstate_router::types::RouterId;
use std::fs;
use std::io::Write;
use std::net::Ipv4Addr;
use std::sync::Arc;

fn write_config(dir: &std::path::Path, name: &str, body: &str) {
    fs::create_dir_all(dir).unwrap();
    let mut f = fs::File::create(dir.join(format!("config_{}.toml", name))).unwrap();
    writeln!(f, "{}", body).unwrap();
}

#[tokio::test]
async fn router_handle_builds_its_interfaces_from_a_parsed_config() {
    let dir = std::env::temp_dir().join(format!("linkstate_it_cfg_{}", std::process::id()));
    write_config(
        &dir,
        "R1",
        r#"
        router_id = "R1"

        [[interfaces]]
        name = "eth0"
        address = "10.9.0.1"
        netmask = "255.255.255.0"
        bandwidth_bps = 1.0e8
        listen_port = 9500
        peer_addr = "10.9.0.2"
        peer_port = 9501
        "#,
    );

    let config = read_router_config_for(dir.to_str().unwrap(), "R1").unwrap();
    assert_eq!(config.interfaces.len(), 1);

    let handle = RouterHandle::from_config(&config, Arc::new(TcpTransport), Arc::new(TokioTimerService));
    assert!(handle.neighbors_snapshot().await.is_empty());

    fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn iface_config_on_an_unconfigured_name_is_a_config_error() {
    let handle = RouterHandle::new(RouterId::new("R1"), Arc::new(TcpTransport), Arc::new(TokioTimerService));
    let result = handle
        .iface_config("ghost", Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(255, 255, 255, 0), "10.0.0.2", 9000)
        .await;
    assert!(result.is_err());
}
