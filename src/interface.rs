// Etat local d'une interface point-a-point : adressage, cout et voisin attendu.

use crate::config::InterfaceConfig;
use crate::types::{link_cost, network_address};
use std::net::Ipv4Addr;

/// Une interface du routeur local, derivee de sa configuration TOML. Le
/// `peer` n'est connu avec certitude qu'apres le premier Hello recu dessus;
/// avant cela l'adjacence est simplement absente de `Router::neighbors`.
#[derive(Debug, Clone)]
pub struct Interface {
    pub name: String,
    pub address: Ipv4Addr,
    pub netmask: Ipv4Addr,
    pub cost: f64,
    pub listen_port: u16,
    pub peer_addr: String,
    pub peer_port: u16,
    pub enabled: bool,
}

impl Interface {
    pub fn network(&self) -> Ipv4Addr {
        network_address(self.address, self.netmask)
    }

    pub fn peer_endpoint(&self) -> String {
        format!("{}:{}", self.peer_addr, self.peer_port)
    }
}

impl From<&InterfaceConfig> for Interface {
    fn from(cfg: &InterfaceConfig) -> Self {
        Interface {
            name: cfg.name.clone(),
            address: cfg.address,
            netmask: cfg.netmask,
            cost: link_cost(cfg.bandwidth_bps),
            listen_port: cfg.listen_port,
            peer_addr: cfg.peer_addr.clone(),
            peer_port: cfg.peer_port,
            enabled: cfg.enabled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> InterfaceConfig {
        InterfaceConfig {
            name: "eth0".into(),
            address: Ipv4Addr::new(10, 0, 0, 1),
            netmask: Ipv4Addr::new(255, 255, 255, 0),
            bandwidth_bps: 1.0e8,
            listen_port: 8900,
            peer_addr: "10.0.0.2".into(),
            peer_port: 8901,
            enabled: true,
        }
    }

    #[test]
    fn cost_derives_from_bandwidth_base_ratio() {
        let iface = Interface::from(&cfg());
        assert!((iface.cost - 1.0).abs() < 1e-9);
    }

    #[test]
    fn network_masks_the_host_bits_of_the_address() {
        let iface = Interface::from(&cfg());
        assert_eq!(iface.network(), Ipv4Addr::new(10, 0, 0, 0));
    }

    #[test]
    fn peer_endpoint_combines_address_and_port() {
        let iface = Interface::from(&cfg());
        assert_eq!(iface.peer_endpoint(), "10.0.0.2:8901");
    }
}
