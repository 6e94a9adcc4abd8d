// Plus courts chemins sur le graphe non orienté dérivé de la LSDB.

use crate::lsdb::Lsdb;
use crate::types::{RouterId, COST_EPSILON};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap};

/// Entrée de tas min : coût croissant, puis `router_id` lexicographiquement
/// plus petit en priorité pour garder le résultat déterministe sur coût égal.
#[derive(Debug, Clone, PartialEq)]
struct HeapEntry {
    cost: f64,
    router: RouterId,
}

impl Eq for HeapEntry {}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .partial_cmp(&self.cost)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.router.cmp(&self.router))
    }
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn build_adjacency(lsdb: &Lsdb) -> BTreeMap<RouterId, Vec<(RouterId, f64)>> {
    let mut adj: BTreeMap<RouterId, Vec<(RouterId, f64)>> = BTreeMap::new();
    for (router, lsa) in lsdb.iter() {
        adj.entry(router.clone()).or_default();
        for entry in lsa.networks.values() {
            adj.entry(router.clone())
                .or_default()
                .push((entry.peer.clone(), entry.cost));
            adj.entry(entry.peer.clone())
                .or_default()
                .push((router.clone(), entry.cost));
        }
    }
    adj
}

/// Dijkstra depuis `source` sur le graphe des routeurs vus dans la LSDB et des
/// liens dérivés des `networks` de chaque LSA. Retourne toujours `source` elle-même
/// mappée à `(source, 0.0)`.
pub fn shortest_paths(lsdb: &Lsdb, source: &RouterId) -> BTreeMap<RouterId, (RouterId, f64)> {
    let adj = build_adjacency(lsdb);

    let mut dist: BTreeMap<RouterId, f64> = BTreeMap::new();
    let mut next_hop: BTreeMap<RouterId, RouterId> = BTreeMap::new();
    let mut heap = BinaryHeap::new();

    dist.insert(source.clone(), 0.0);
    next_hop.insert(source.clone(), source.clone());
    heap.push(HeapEntry {
        cost: 0.0,
        router: source.clone(),
    });

    while let Some(HeapEntry { cost, router }) = heap.pop() {
        if let Some(&best) = dist.get(&router) {
            if cost > best + COST_EPSILON {
                continue; // entrée de tas périmée
            }
        }
        let Some(neighbors) = adj.get(&router) else {
            continue;
        };
        for (peer, weight) in neighbors {
            let new_cost = cost + weight;
            let improves = match dist.get(peer) {
                None => true,
                Some(&best) => new_cost < best - COST_EPSILON,
            };
            if improves {
                dist.insert(peer.clone(), new_cost);
                let hop = if router == *source {
                    peer.clone()
                } else {
                    next_hop.get(&router).cloned().unwrap_or_else(|| peer.clone())
                };
                next_hop.insert(peer.clone(), hop);
                heap.push(HeapEntry {
                    cost: new_cost,
                    router: peer.clone(),
                });
            }
        }
    }

    dist.into_iter()
        .map(|(router, cost)| {
            let hop = next_hop.get(&router).cloned().unwrap_or_else(|| router.clone());
            (router, (hop, cost))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::{LinkEntry, LinkStatePacket};
    use std::collections::BTreeMap as Map;
    use std::net::Ipv4Addr;

    fn link(peer: &str, cost: f64) -> LinkEntry {
        LinkEntry {
            peer: RouterId::new(peer),
            cost,
            local_address: Ipv4Addr::new(0, 0, 0, 0),
            netmask: Ipv4Addr::new(255, 255, 255, 0),
        }
    }

    fn lsa(router: &str, links: Vec<(&str, f64)>) -> LinkStatePacket {
        let mut networks = Map::new();
        for (i, (peer, cost)) in links.into_iter().enumerate() {
            networks.insert(Ipv4Addr::new(10, 0, i as u8, 0), link(peer, cost));
        }
        LinkStatePacket {
            adv_router: RouterId::new(router),
            seq_no: 1,
            age: 1,
            networks,
        }
    }

    #[test]
    fn source_maps_to_itself_at_zero_cost() {
        let mut db = Lsdb::new();
        db.insert(lsa("A", vec![]));
        let paths = shortest_paths(&db, &RouterId::new("A"));
        assert_eq!(paths[&RouterId::new("A")], (RouterId::new("A"), 0.0));
    }

    #[test]
    fn three_router_line_accumulates_cost_through_next_hop() {
        let mut db = Lsdb::new();
        db.insert(lsa("A", vec![("B", 1.0)]));
        db.insert(lsa("B", vec![("A", 1.0), ("C", 4.0)]));
        db.insert(lsa("C", vec![("B", 4.0)]));

        let paths = shortest_paths(&db, &RouterId::new("A"));
        let (hop, cost) = &paths[&RouterId::new("C")];
        assert_eq!(*hop, RouterId::new("B"));
        assert!((cost - 5.0).abs() < 1e-9);
    }

    #[test]
    fn tie_break_prefers_lexicographically_smaller_router_id() {
        // A connects to both B and C at equal cost; B and C both reach D at equal
        // cost too, so the path to D through B vs C ties; B < C must win.
        let mut db = Lsdb::new();
        db.insert(lsa("A", vec![("B", 1.0), ("C", 1.0)]));
        db.insert(lsa("B", vec![("A", 1.0), ("D", 1.0)]));
        db.insert(lsa("C", vec![("A", 1.0), ("D", 1.0)]));
        db.insert(lsa("D", vec![("B", 1.0), ("C", 1.0)]));

        let paths = shortest_paths(&db, &RouterId::new("A"));
        let (hop, _) = &paths[&RouterId::new("D")];
        assert_eq!(*hop, RouterId::new("B"));
    }

    #[test]
    fn unreachable_router_is_absent_from_the_result() {
        let mut db = Lsdb::new();
        db.insert(lsa("A", vec![]));
        db.insert(lsa("B", vec![])); // isolated, no shared link with A
        let paths = shortest_paths(&db, &RouterId::new("A"));
        assert!(!paths.contains_key(&RouterId::new("B")));
    }
}
