// Orchestrateur central : adjacence Hello, origination/rafraichissement des LSA,
// inondation, et reconstruction de la table de routage. `Router` est une
// structure synchrone et pure — toute mutation produit un `Outbox` decrivant
// les paquets a emettre, sans jamais toucher le reseau elle-meme. `RouterHandle`
// enveloppe un `Router` derriere un mutex et pilote timers/transport autour de lui.

use crate::config::RouterConfig;
use crate::error::{AppError, Result};
use crate::interface::Interface;
use crate::lsdb::Lsdb;
use crate::route::{Route, RoutingTable};
use crate::timer::{TimerCallback, TimerHandle, TimerService};
use crate::transport::Transport;
use crate::types::{
    network_address, RouterId, AGE_INTERVAL, AGE_INTERVAL_SECS, DEAD_INTERVAL, INITIAL_SEQUENCE_NUMBER,
    LS_REFRESH_TIME, COST_EPSILON, HELLO_INTERVAL,
};
use crate::wire::{HelloPacket, LinkEntry, LinkStatePacket, WirePacket};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::net::Ipv4Addr;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Paquets a transmettre suite a une mutation, chacun adresse a un endpoint `ip:port`.
pub type Outbox = Vec<(String, WirePacket)>;

#[derive(Debug, Clone, PartialEq, Eq)]
struct SeenEntry {
    iface_name: String,
    address: Ipv4Addr,
    netmask: Ipv4Addr,
}

pub struct HelloOutcome {
    pub neighbor_id: RouterId,
    pub outbox: Outbox,
}

/// Coeur de la logique du protocole, sans aucune dependance a tokio ou au
/// reseau : testable en appelant directement ses methodes.
pub struct Router {
    pub id: RouterId,
    interfaces: BTreeMap<String, Interface>,
    seen: BTreeMap<RouterId, SeenEntry>,
    neighbors: BTreeMap<RouterId, SeenEntry>,
    lsdb: Lsdb,
    routing_table: RoutingTable,
}

impl Router {
    pub fn new(id: RouterId) -> Self {
        Router {
            id,
            interfaces: BTreeMap::new(),
            seen: BTreeMap::new(),
            neighbors: BTreeMap::new(),
            lsdb: Lsdb::new(),
            routing_table: RoutingTable::new(),
        }
    }

    pub fn from_config(config: &RouterConfig) -> Self {
        let mut router = Router::new(RouterId::new(config.router_id.clone()));
        for iface_cfg in &config.interfaces {
            router.interfaces.insert(iface_cfg.name.clone(), Interface::from(iface_cfg));
        }
        router
    }

    pub fn iface_create(&mut self, name: &str, bandwidth_bps: f64, listen_port: u16) {
        self.interfaces.insert(
            name.to_string(),
            Interface {
                name: name.to_string(),
                address: Ipv4Addr::UNSPECIFIED,
                netmask: Ipv4Addr::UNSPECIFIED,
                cost: crate::types::link_cost(bandwidth_bps),
                listen_port,
                peer_addr: String::new(),
                peer_port: 0,
                enabled: true,
            },
        );
    }

    pub fn iface_config(
        &mut self,
        name: &str,
        address: Ipv4Addr,
        netmask: Ipv4Addr,
        remote_host: &str,
        remote_port: u16,
    ) -> Result<()> {
        let iface = self
            .interfaces
            .get_mut(name)
            .ok_or_else(|| AppError::ConfigError(format!("unknown interface '{}'", name)))?;
        iface.address = address;
        iface.netmask = netmask;
        iface.peer_addr = remote_host.to_string();
        iface.peer_port = remote_port;
        Ok(())
    }

    pub fn routing_table(&self) -> &RoutingTable {
        &self.routing_table
    }

    pub fn lsdb(&self) -> &Lsdb {
        &self.lsdb
    }

    pub fn neighbor_ids(&self) -> impl Iterator<Item = &RouterId> {
        self.neighbors.keys()
    }

    pub fn is_neighbor(&self, rid: &RouterId) -> bool {
        self.neighbors.contains_key(rid)
    }

    pub fn is_seen(&self, rid: &RouterId) -> bool {
        self.seen.contains_key(rid)
    }

    /// spec.md 4.2: traite un Hello entrant, promeut l'adjacence si on apparait
    /// dans le `seen` de l'emetteur. Le rearmement du dead-timer est a la charge
    /// de l'appelant (il a besoin de `neighbor_id`, renvoye dans `HelloOutcome`).
    pub fn on_hello_received(&mut self, iface_name: &str, packet: HelloPacket) -> HelloOutcome {
        let neighbor_id = packet.router_id.clone();
        self.seen.insert(
            neighbor_id.clone(),
            SeenEntry {
                iface_name: iface_name.to_string(),
                address: packet.address,
                netmask: packet.netmask,
            },
        );

        let mut outbox = Vec::new();
        if packet.seen.contains(&self.id) {
            outbox.extend(self.sync_lsdb(&neighbor_id));
        }
        HelloOutcome { neighbor_id, outbox }
    }

    /// spec.md 4.2: emission periodique de Hello sur chaque interface, suivie
    /// d'une synchronisation pour tout voisin vu mais pas encore adjacent.
    pub fn hello_tick(&mut self) -> Outbox {
        let mut outbox = Vec::new();
        let seen_ids: BTreeSet<RouterId> = self.seen.keys().cloned().collect();

        for iface in self.interfaces.values() {
            if !iface.enabled {
                continue;
            }
            let packet = HelloPacket {
                router_id: self.id.clone(),
                address: iface.address,
                netmask: iface.netmask,
                seen: seen_ids.clone(),
            };
            outbox.push((iface.peer_endpoint(), packet.into()));
        }

        let to_sync: Vec<RouterId> = self
            .seen
            .keys()
            .filter(|rid| !self.neighbors.contains_key(*rid))
            .cloned()
            .collect();
        for rid in to_sync {
            outbox.extend(self.sync_lsdb(&rid));
        }
        outbox
    }

    fn sync_lsdb(&mut self, neighbor_id: &RouterId) -> Outbox {
        let mut outbox = Vec::new();
        let topology_changed = !self.neighbors.contains_key(neighbor_id);
        let entry = match self.seen.get(neighbor_id) {
            Some(e) => e.clone(),
            None => return outbox,
        };
        self.neighbors.insert(neighbor_id.clone(), entry.clone());

        if !self.lsdb.contains(&self.id) {
            outbox.extend(self.advertise());
        } else if topology_changed {
            outbox.extend(self.advertise());
            if let Some(iface) = self.interfaces.get(&entry.iface_name) {
                let dest = iface.peer_endpoint();
                for (_, lsa) in self.lsdb.iter() {
                    outbox.push((dest.clone(), lsa.clone().into()));
                }
            }
        }
        outbox
    }

    /// spec.md 4.2: retrait d'un voisin, typiquement appele par l'expiration du dead-timer.
    pub fn break_adjacency(&mut self, neighbor_id: &RouterId) -> Outbox {
        self.neighbors.remove(neighbor_id);
        self.seen.remove(neighbor_id);
        self.advertise()
    }

    /// spec.md 4.3: (re)origine la LSA locale a partir des adjacences courantes,
    /// l'inonde, et recalcule la table de routage.
    fn advertise(&mut self) -> Outbox {
        let mut networks = BTreeMap::new();
        for (neighbor_id, entry) in &self.neighbors {
            let iface = match self.interfaces.get(&entry.iface_name) {
                Some(iface) => iface,
                None => continue,
            };
            let netadd = network_address(entry.address, entry.netmask);
            networks.insert(
                netadd,
                LinkEntry {
                    peer: neighbor_id.clone(),
                    cost: iface.cost,
                    local_address: entry.address,
                    netmask: entry.netmask,
                },
            );
        }

        let seq_no = match self.lsdb.get(&self.id) {
            Some(old) => old.seq_no.wrapping_add(1),
            None => INITIAL_SEQUENCE_NUMBER,
        };
        let lsa = LinkStatePacket {
            adv_router: self.id.clone(),
            seq_no,
            age: 1,
            networks,
        };
        self.lsdb.insert(lsa.clone());

        let mut outbox = self.flood(&lsa, None);
        self.update_routing_table();
        outbox.shrink_to_fit();
        outbox
    }

    /// spec.md 4.3: reorigination periodique pour empecher MaxAge ailleurs.
    pub fn refresh_lsa(&mut self) -> Outbox {
        if self.lsdb.contains(&self.id) {
            self.advertise()
        } else {
            Vec::new()
        }
    }

    /// spec.md 4.3: vieillissement periodique de la LSDB. Ne declenche PAS de
    /// recalcul SPF (comportement preserve tel quel, voir la documentation de conception).
    pub fn age_tick(&mut self) -> Vec<RouterId> {
        self.lsdb.update(AGE_INTERVAL_SECS)
    }

    /// spec.md 4.4: transmet sur chaque interface adjacente sauf celle de reception.
    fn flood(&self, lsa: &LinkStatePacket, source_iface: Option<&str>) -> Outbox {
        let mut already_sent = BTreeSet::new();
        let mut outbox = Vec::new();
        for entry in self.neighbors.values() {
            if Some(entry.iface_name.as_str()) == source_iface {
                continue;
            }
            if !already_sent.insert(entry.iface_name.clone()) {
                continue;
            }
            if let Some(iface) = self.interfaces.get(&entry.iface_name) {
                outbox.push((iface.peer_endpoint(), lsa.clone().into()));
            }
        }
        outbox
    }

    /// spec.md 4.5: traite une LSA entrante.
    pub fn on_lsa_received(&mut self, iface_name: &str, packet: LinkStatePacket) -> Outbox {
        let is_own = packet.adv_router == self.id;
        let seq_no = packet.seq_no;

        if self.lsdb.insert(packet.clone()) {
            if is_own {
                self.advertise()
            } else {
                let mut outbox = self.flood(&packet, Some(iface_name));
                self.update_routing_table();
                outbox.shrink_to_fit();
                outbox
            }
        } else if is_own && seq_no == INITIAL_SEQUENCE_NUMBER {
            self.advertise()
        } else {
            Vec::new()
        }
    }

    /// spec.md 4.6: reconstruit entierement la table de routage depuis la LSDB.
    fn update_routing_table(&mut self) {
        self.routing_table.clear();

        let paths = self.lsdb.get_shortest_paths(&self.id);
        if paths.is_empty() {
            return;
        }

        let mut networks: BTreeMap<Ipv4Addr, BTreeMap<RouterId, (f64, Ipv4Addr)>> = BTreeMap::new();
        for (node, lsa) in self.lsdb.iter() {
            for (net, link) in &lsa.networks {
                networks
                    .entry(*net)
                    .or_default()
                    .insert(node.clone(), (link.cost, link.netmask));
            }
        }

        let mut gateways: Vec<(f64, Ipv4Addr, String)> = Vec::new();

        for (net, reporters) in &networks {
            if reporters.len() != 2 {
                continue; // reseaux stub/transit non modelises
            }
            let mut iter = reporters.iter();
            let (n1, (cost1, mask1)) = iter.next().unwrap();
            let (n2, (cost2, mask2)) = iter.next().unwrap();

            if *n1 == self.id || *n2 == self.id {
                let (other, cost, netmask) = if *n1 == self.id {
                    (n2.clone(), *cost1, *mask1)
                } else {
                    (n1.clone(), *cost2, *mask2)
                };
                if let Some(entry) = self.neighbors.get(&other) {
                    self.routing_table.push(Route {
                        dest_network: *net,
                        netmask,
                        gateway: None,
                        metric: cost,
                        iface: entry.iface_name.clone(),
                    });
                    gateways.push((cost, entry.address, entry.iface_name.clone()));
                }
            } else {
                let candidates = [
                    (n1.clone(), *cost1, *mask1),
                    (n2.clone(), *cost2, *mask2),
                ];
                let mut best: Option<(RouterId, f64, Ipv4Addr)> = None;
                for (dest, link_cost, mask) in candidates {
                    if let Some((_, path_cost)) = paths.get(&dest) {
                        let total = path_cost + link_cost;
                        let better = match &best {
                            None => true,
                            Some((_, best_cost, _)) => total < *best_cost - COST_EPSILON,
                        };
                        if better {
                            best = Some((dest, total, mask));
                        }
                    }
                }
                if let Some((dest, total_cost, mask)) = best {
                    if let Some((next_hop, _)) = paths.get(&dest) {
                        if let Some(entry) = self.neighbors.get(next_hop) {
                            self.routing_table.push(Route {
                                dest_network: *net,
                                netmask: mask,
                                gateway: Some(entry.address),
                                metric: total_cost,
                                iface: entry.iface_name.clone(),
                            });
                        }
                    }
                }
            }
        }

        if let Some((cost, gateway, iface)) = gateways
            .into_iter()
            .min_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal))
        {
            self.routing_table.push(Route {
                dest_network: Ipv4Addr::new(0, 0, 0, 0),
                netmask: Ipv4Addr::new(0, 0, 0, 0),
                gateway: Some(gateway),
                metric: cost,
                iface,
            });
        }
    }
}

/// Enveloppe async d'un `Router` : possede le mutex d'exclusion, le transport
/// et le service de timers, et arme/desarme les dead-timers par voisin.
pub struct RouterHandle {
    router: Mutex<Router>,
    transport: Arc<dyn Transport>,
    timers: Arc<dyn TimerService>,
    dead_timers: Mutex<HashMap<RouterId, TimerHandle>>,
    enabled: std::sync::atomic::AtomicBool,
}

impl RouterHandle {
    pub fn new(id: RouterId, transport: Arc<dyn Transport>, timers: Arc<dyn TimerService>) -> Arc<Self> {
        Arc::new(RouterHandle {
            router: Mutex::new(Router::new(id)),
            transport,
            timers,
            dead_timers: Mutex::new(HashMap::new()),
            enabled: std::sync::atomic::AtomicBool::new(true),
        })
    }

    pub fn from_config(config: &RouterConfig, transport: Arc<dyn Transport>, timers: Arc<dyn TimerService>) -> Arc<Self> {
        Arc::new(RouterHandle {
            router: Mutex::new(Router::from_config(config)),
            transport,
            timers,
            dead_timers: Mutex::new(HashMap::new()),
            enabled: std::sync::atomic::AtomicBool::new(true),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(std::sync::atomic::Ordering::SeqCst)
    }

    pub fn enable(&self) {
        self.enabled.store(true, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn disable(&self) {
        self.enabled.store(false, std::sync::atomic::Ordering::SeqCst);
    }

    pub async fn iface_create(&self, name: &str, bandwidth_bps: f64, listen_port: u16) {
        self.router.lock().await.iface_create(name, bandwidth_bps, listen_port);
    }

    pub async fn iface_config(
        &self,
        name: &str,
        address: Ipv4Addr,
        netmask: Ipv4Addr,
        remote_host: &str,
        remote_port: u16,
    ) -> Result<()> {
        self.router
            .lock()
            .await
            .iface_config(name, address, netmask, remote_host, remote_port)
    }

    /// Point d'entree unique pour un paquet recu sur `iface_name`.
    pub async fn deliver(self: &Arc<Self>, iface_name: &str, packet: WirePacket) {
        if !self.is_enabled() {
            log::debug!("protocol disabled, ignoring inbound packet on {}", iface_name);
            return;
        }
        match packet {
            WirePacket::Hello(hello) => {
                let outcome = {
                    let mut router = self.router.lock().await;
                    router.on_hello_received(iface_name, hello)
                };
                self.rearm_dead_timer(outcome.neighbor_id).await;
                self.transmit(outcome.outbox).await;
            }
            WirePacket::Lsa(lsa) => {
                let outbox = {
                    let mut router = self.router.lock().await;
                    router.on_lsa_received(iface_name, lsa)
                };
                self.transmit(outbox).await;
            }
        }
    }

    async fn rearm_dead_timer(self: &Arc<Self>, neighbor_id: RouterId) {
        let this = Arc::clone(self);
        let callback_neighbor = neighbor_id.clone();
        let callback: TimerCallback = Box::new(move || {
            let this = Arc::clone(&this);
            let neighbor_id = callback_neighbor.clone();
            Box::pin(async move {
                this.on_dead_timer(neighbor_id).await;
            })
        });
        let handle = self.timers.after(DEAD_INTERVAL, callback);
        let previous = self.dead_timers.lock().await.insert(neighbor_id, handle);
        if let Some(previous) = previous {
            previous.cancel();
        }
    }

    async fn on_dead_timer(self: &Arc<Self>, neighbor_id: RouterId) {
        self.dead_timers.lock().await.remove(&neighbor_id);
        let outbox = {
            let mut router = self.router.lock().await;
            router.break_adjacency(&neighbor_id)
        };
        log::info!("neighbor {} declared down (dead interval elapsed)", neighbor_id);
        self.transmit(outbox).await;
    }

    pub async fn hello_tick(self: &Arc<Self>) {
        if !self.is_enabled() {
            return;
        }
        let outbox = self.router.lock().await.hello_tick();
        self.transmit(outbox).await;
    }

    pub async fn refresh_lsa_tick(self: &Arc<Self>) {
        if !self.is_enabled() {
            return;
        }
        let outbox = self.router.lock().await.refresh_lsa();
        self.transmit(outbox).await;
    }

    pub async fn age_tick(self: &Arc<Self>) {
        let flushed = self.router.lock().await.age_tick();
        if !flushed.is_empty() {
            log::info!("MaxAge flush: {:?}", flushed);
        }
    }

    /// Arme les trois timers periodiques (Hello, rafraichissement, vieillissement).
    /// Les poignees retournees annulent leur timer quand elles sont droppees.
    pub fn start(self: &Arc<Self>) -> Vec<TimerHandle> {
        let mut handles = Vec::new();

        let hello_self = Arc::clone(self);
        handles.push(self.timers.every(
            HELLO_INTERVAL,
            Box::new(move || {
                let hello_self = Arc::clone(&hello_self);
                Box::pin(async move { hello_self.hello_tick().await })
            }),
        ));

        let refresh_self = Arc::clone(self);
        handles.push(self.timers.every(
            LS_REFRESH_TIME,
            Box::new(move || {
                let refresh_self = Arc::clone(&refresh_self);
                Box::pin(async move { refresh_self.refresh_lsa_tick().await })
            }),
        ));

        let age_self = Arc::clone(self);
        handles.push(self.timers.every(
            AGE_INTERVAL,
            Box::new(move || {
                let age_self = Arc::clone(&age_self);
                Box::pin(async move { age_self.age_tick().await })
            }),
        ));

        handles
    }

    /// Annule tous les dead-timers en cours. Les timers periodiques sont
    /// annules en droppant les poignees retournees par `start`.
    pub async fn stop(&self, periodic: Vec<TimerHandle>) {
        for handle in periodic {
            handle.cancel();
        }
        let mut dead_timers = self.dead_timers.lock().await;
        for (_, handle) in dead_timers.drain() {
            handle.cancel();
        }
    }

    async fn transmit(&self, outbox: Outbox) {
        for (dest, packet) in outbox {
            if let Err(e) = self.transport.send(&dest, packet).await {
                log::warn!("transport send to {} failed: {}", dest, e);
            }
        }
    }

    pub async fn routing_table_snapshot(&self) -> RoutingTable {
        self.router.lock().await.routing_table().clone()
    }

    pub async fn neighbors_snapshot(&self) -> Vec<RouterId> {
        self.router.lock().await.neighbor_ids().cloned().collect()
    }
}
