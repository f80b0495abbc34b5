use crate::distance::Distance;
use crate::MAX_NODES;

/// Maintains in-distance and out-distance vectors, their chosen hops, and
/// per-entry refresh ticks. One instance per node, rooted at `self_id`.
#[derive(Debug, Clone)]
pub struct UnicastTable {
    self_id: u8,
    in_distance: [Distance; MAX_NODES],
    in_prev_hop: [Option<u8>; MAX_NODES],
    in_refresh: [Option<u32>; MAX_NODES],
    out_distance: [Distance; MAX_NODES],
    out_next_hop: [Option<u8>; MAX_NODES],
    out_refresh: [Option<u32>; MAX_NODES],
}

impl UnicastTable {
    pub fn new(self_id: u8) -> Self {
        let mut table = Self {
            self_id,
            in_distance: [Distance::INFINITY; MAX_NODES],
            in_prev_hop: [None; MAX_NODES],
            in_refresh: [None; MAX_NODES],
            out_distance: [Distance::INFINITY; MAX_NODES],
            out_next_hop: [None; MAX_NODES],
            out_refresh: [None; MAX_NODES],
        };
        table.in_distance[self_id as usize] = Distance::ZERO;
        table.out_distance[self_id as usize] = Distance::ZERO;
        table
    }

    pub fn in_distance(&self, id: u8) -> Distance {
        self.in_distance[id as usize]
    }

    pub fn in_prev_hop(&self, id: u8) -> Option<u8> {
        self.in_prev_hop[id as usize]
    }

    pub fn out_distance(&self, id: u8) -> Distance {
        self.out_distance[id as usize]
    }

    pub fn out_next_hop(&self, id: u8) -> Option<u8> {
        self.out_next_hop[id as usize]
    }

    pub fn in_distance_vector(&self) -> [Distance; MAX_NODES] {
        self.in_distance
    }

    pub fn out_distance_vector(&self) -> [Distance; MAX_NODES] {
        self.out_distance
    }

    /// Direct in-neighbors: nodes one hop away on the reverse path.
    pub fn in_neighbors(&self) -> Vec<u8> {
        (0..MAX_NODES)
            .filter(|&k| self.in_distance[k].hops() == Some(1))
            .map(|k| k as u8)
            .collect()
    }

    /// Unconditionally (re)establish `id` as a direct in-neighbor, mirroring
    /// `node.py`'s `refresh_in_neighbor` on every received HELLO.
    pub fn refresh_in_neighbor(&mut self, id: u8, now: u32) {
        self.in_distance[id as usize] = Distance::finite(1);
        self.in_prev_hop[id as usize] = Some(id);
        self.in_refresh[id as usize] = Some(now);
    }

    /// Drop liveness on any direct neighbor not heard from within `expiry`
    /// ticks, invalidating every entry that depended on it.
    pub fn purge_expired(&mut self, now: u32, expiry: u32) {
        for k in 0..MAX_NODES {
            if k == self.self_id as usize {
                continue;
            }
            if let Some(last) = self.in_refresh[k] {
                if now.saturating_sub(last) > expiry {
                    self.in_refresh[k] = None;
                    let k = k as u8;
                    for m in 0..MAX_NODES {
                        if self.in_prev_hop[m] == Some(k) {
                            self.in_distance[m] = Distance::INFINITY;
                            self.in_prev_hop[m] = None;
                        }
                    }
                }
            }
            if let Some(last) = self.out_refresh[k] {
                if now.saturating_sub(last) > expiry {
                    self.out_refresh[k] = None;
                    let k = k as u8;
                    for m in 0..MAX_NODES {
                        if self.out_next_hop[m] == Some(k) {
                            self.out_distance[m] = Distance::INFINITY;
                            self.out_next_hop[m] = None;
                        }
                    }
                }
            }
        }
    }

    /// The IN-DISTANCE case table: withdrawal, improvement, tie-break on
    /// lower sender id, and cost-rise-on-chosen-hop, matching `node.py`'s
    /// `process_in_distance_msg`.
    pub fn apply_in_distance(&mut self, sender: u8, advertised: &[Distance; MAX_NODES]) {
        for k in 0..MAX_NODES {
            if k == self.self_id as usize {
                continue;
            }
            let adv = advertised[k];
            let curr = self.in_distance[k];
            let via = self.in_prev_hop[k];

            if adv.is_infinity() {
                if via == Some(sender) && !curr.is_infinity() {
                    self.in_distance[k] = Distance::INFINITY;
                    self.in_prev_hop[k] = None;
                }
                continue;
            }

            let candidate = adv.successor();

            if curr.is_infinity() || candidate.shorter_than(curr) {
                if !candidate.is_infinity() {
                    self.in_distance[k] = candidate;
                    self.in_prev_hop[k] = Some(sender);
                }
                continue;
            }

            if candidate == curr && via.is_some_and(|v| sender < v) {
                self.in_prev_hop[k] = Some(sender);
            }

            if curr.shorter_than(candidate) && via == Some(sender) {
                self.in_distance[k] = candidate;
                if candidate.is_infinity() {
                    self.in_prev_hop[k] = None;
                }
            }
        }
    }

    /// The DVECTOR case table, mirrored onto the out-side with transitive
    /// invalidation of nodes reached via the withdrawn one, matching
    /// `node.py`'s `update_out_distances`.
    pub fn update_out_distances(&mut self, origin: u8, advertised: &[Distance; MAX_NODES]) {
        for k in 0..MAX_NODES {
            let adv = advertised[k];
            let curr = self.out_distance[k];
            let next_hop = self.out_next_hop[k];

            if adv.is_infinity() {
                if next_hop == Some(origin) && !curr.is_infinity() {
                    self.out_distance[k] = Distance::INFINITY;
                    self.out_next_hop[k] = None;
                    let k_id = k as u8;
                    for m in 0..MAX_NODES {
                        if self.out_next_hop[m] == Some(k_id) {
                            self.out_distance[m] = Distance::INFINITY;
                            self.out_next_hop[m] = None;
                        }
                    }
                }
                continue;
            }

            let candidate = adv.successor();

            if curr.is_infinity() || candidate.shorter_than(curr) {
                if !candidate.is_infinity() {
                    self.out_distance[k] = candidate;
                    self.out_next_hop[k] = Some(origin);
                }
                continue;
            }

            if candidate == curr && next_hop.is_some_and(|v| origin < v) {
                self.out_next_hop[k] = Some(origin);
            }

            if curr.shorter_than(candidate) && next_hop == Some(origin) {
                self.out_distance[k] = candidate;
                if candidate.is_infinity() {
                    self.out_next_hop[k] = None;
                }
            }
        }
    }

    pub fn mark_out_refreshed(&mut self, origin: u8, now: u32) {
        self.out_refresh[origin as usize] = Some(now);
    }

    /// Whether `sender` lies on the chosen shortest reverse path from
    /// `origin` to self, i.e. whether a DVECTOR from `origin` via `sender`
    /// should be flooded onward.
    pub fn should_flood(&self, sender: u8, origin: u8) -> bool {
        self.in_distance[sender as usize].hops() == Some(1) && self.in_prev_hop[origin as usize] == Some(sender)
    }

    /// The chosen reverse-path parent toward `root`, if reachable.
    pub fn parent(&self, root: u8) -> Option<u8> {
        if self.in_distance[root as usize].is_infinity() {
            None
        } else {
            self.in_prev_hop[root as usize]
        }
    }

    /// This node's own next hop toward `parent`, if reachable.
    pub fn next_hop_toward(&self, parent: u8) -> Option<u8> {
        if self.out_distance[parent as usize].is_infinity() {
            None
        } else {
            self.out_next_hop[parent as usize]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_table_has_zero_self_distance_and_no_others() {
        let table = UnicastTable::new(2);
        assert_eq!(table.in_distance(2), Distance::ZERO);
        assert_eq!(table.out_distance(2), Distance::ZERO);
        assert_eq!(table.in_distance(0), Distance::INFINITY);
        assert_eq!(table.in_prev_hop(0), None);
    }

    #[test]
    fn hello_establishes_direct_neighbor() {
        let mut table = UnicastTable::new(1);
        table.refresh_in_neighbor(0, 7);
        assert_eq!(table.in_distance(0), Distance::finite(1));
        assert_eq!(table.in_prev_hop(0), Some(0));
        assert_eq!(table.in_neighbors(), vec![0]);
    }

    #[test]
    fn in_distance_improves_then_ties_break_on_lower_id() {
        let mut table = UnicastTable::new(2);
        // direct neighbors 0 and 1
        table.refresh_in_neighbor(1, 0);
        table.refresh_in_neighbor(0, 0);
        // both now advertise node 5 at distance 3 -> both give candidate 4
        let mut adv = [Distance::INFINITY; MAX_NODES];
        adv[5] = Distance::finite(3);
        table.apply_in_distance(1, &adv);
        assert_eq!(table.in_prev_hop(5), Some(1));
        table.apply_in_distance(0, &adv);
        // tie at same distance, lower id (0) wins
        assert_eq!(table.in_prev_hop(5), Some(0));
        assert_eq!(table.in_distance(5), Distance::finite(4));
    }

    #[test]
    fn in_distance_withdrawal_clears_only_if_via_sender() {
        let mut table = UnicastTable::new(0);
        table.refresh_in_neighbor(1, 0);
        let mut adv = [Distance::INFINITY; MAX_NODES];
        adv[2] = Distance::finite(1);
        table.apply_in_distance(1, &adv);
        assert_eq!(table.in_distance(2), Distance::finite(2));

        let mut withdraw = [Distance::INFINITY; MAX_NODES];
        withdraw[2] = Distance::INFINITY;
        table.apply_in_distance(1, &withdraw);
        assert_eq!(table.in_distance(2), Distance::INFINITY);
        assert_eq!(table.in_prev_hop(2), None);
    }

    #[test]
    fn in_distance_clamps_at_horizon() {
        let mut table = UnicastTable::new(0);
        table.refresh_in_neighbor(1, 0);
        let mut adv = [Distance::INFINITY; MAX_NODES];
        adv[3] = Distance::finite(MAX_NODES as u8 - 1);
        table.apply_in_distance(1, &adv);
        assert_eq!(table.in_distance(3), Distance::INFINITY);
        assert_eq!(table.in_prev_hop(3), None);
    }

    #[test]
    fn purge_expired_invalidates_dependents() {
        let mut table = UnicastTable::new(0);
        table.refresh_in_neighbor(1, 0);
        let mut adv = [Distance::INFINITY; MAX_NODES];
        adv[2] = Distance::finite(1);
        table.apply_in_distance(1, &adv);
        assert_eq!(table.in_distance(2), Distance::finite(2));

        table.purge_expired(31, 30);
        assert_eq!(table.in_distance(1), Distance::INFINITY);
        assert_eq!(table.in_prev_hop(1), None);
        assert_eq!(table.in_distance(2), Distance::INFINITY);
        assert_eq!(table.in_prev_hop(2), None);
    }

    #[test]
    fn update_out_distances_mirrors_in_distance_rules() {
        let mut table = UnicastTable::new(0);
        table.refresh_in_neighbor(1, 0);
        let mut adv = [Distance::INFINITY; MAX_NODES];
        adv[3] = Distance::finite(2);
        table.update_out_distances(1, &adv);
        assert_eq!(table.out_distance(3), Distance::finite(3));
        assert_eq!(table.out_next_hop(3), Some(1));
    }

    #[test]
    fn should_flood_only_on_shortest_path_hop() {
        let mut table = UnicastTable::new(2);
        table.refresh_in_neighbor(1, 0);
        let mut adv = [Distance::INFINITY; MAX_NODES];
        adv[0] = Distance::finite(1);
        table.apply_in_distance(1, &adv);
        assert_eq!(table.in_prev_hop(0), Some(1));
        assert!(table.should_flood(1, 0));
        assert!(!table.should_flood(5, 0));
    }
}
