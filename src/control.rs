// Canal de controle hors-bande : un petit serveur UDP JSON permettant
// d'inspecter ou de piloter un routeur en cours d'execution. N'a aucune
// incidence sur la correction du protocole — pure commodite d'observation.

use crate::error::Result;
use crate::router::RouterHandle;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::UdpSocket;

#[derive(Debug, Deserialize)]
struct ControlMessage {
    #[allow(dead_code)]
    message_type: u8,
    command: String,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status")]
enum ControlResponse {
    Ok { detail: String },
    Error { detail: String },
}

pub async fn serve_control(bind_addr: &str, router: Arc<RouterHandle>) -> Result<()> {
    let socket = UdpSocket::bind(bind_addr).await?;
    log::info!("control channel listening on {}", bind_addr);
    let mut buf = [0u8; 4096];
    loop {
        let (len, src) = match socket.recv_from(&mut buf).await {
            Ok(pair) => pair,
            Err(e) => {
                log::warn!("control channel recv failed: {}", e);
                continue;
            }
        };
        let response = handle_command(&buf[..len], &router).await;
        let serialized = serde_json::to_vec(&response).unwrap_or_default();
        if let Err(e) = socket.send_to(&serialized, src).await {
            log::warn!("control channel send to {} failed: {}", src, e);
        }
    }
}

async fn handle_command(payload: &[u8], router: &Arc<RouterHandle>) -> ControlResponse {
    let message: ControlMessage = match serde_json::from_slice(payload) {
        Ok(m) => m,
        Err(e) => return ControlResponse::Error { detail: format!("malformed control message: {}", e) },
    };

    match message.command.as_str() {
        "connexion" => ControlResponse::Ok { detail: "connected".into() },
        "enable" => {
            router.enable();
            ControlResponse::Ok { detail: "protocol enabled".into() }
        }
        "disable" => {
            router.disable();
            ControlResponse::Ok { detail: "protocol disabled".into() }
        }
        "routing-table" => {
            let table = router.routing_table_snapshot().await;
            if table.is_empty() {
                ControlResponse::Ok { detail: "routing table is empty".into() }
            } else {
                let lines: Vec<String> = table
                    .iter()
                    .map(|r| {
                        format!(
                            "{}/{} via {} metric {:.3} ({})",
                            r.dest_network,
                            r.netmask,
                            r.gateway.map(|g| g.to_string()).unwrap_or_else(|| "-".to_string()),
                            r.metric,
                            r.iface
                        )
                    })
                    .collect();
                ControlResponse::Ok { detail: lines.join("\n") }
            }
        }
        "neighbors" => {
            let neighbors = router.neighbors_snapshot().await;
            if neighbors.is_empty() {
                ControlResponse::Ok { detail: "no neighbors".into() }
            } else {
                let lines: Vec<String> = neighbors.iter().map(|n| n.to_string()).collect();
                ControlResponse::Ok { detail: lines.join("\n") }
            }
        }
        other => ControlResponse::Error { detail: format!("unknown command '{}'", other) },
    }
}
