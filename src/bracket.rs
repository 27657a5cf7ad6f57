use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, warn};

use crate::data_loader::{Team, TeamId};
use crate::ranking::RankingResult;
use crate::ranking_context::RankingContext;
use crate::util::haversine_miles;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PodMember {
    pub team: TeamId,
    pub pr: usize,
    pub seed_tier: usize,       // 1 = hosts
    pub distance_miles: f64,    // To the host. Infinite when either side has no coordinates
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pod {
    pub host: PodMember,
    pub visitors: Vec<PodMember>,
}

impl Pod {
    pub fn teams(&self) -> impl Iterator<Item = &PodMember> {
        std::iter::once(&self.host).chain(&self.visitors)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HostOption {
    pub host: TeamId,
    pub distance_miles: f64,
    pub unlikely: bool,     // Same conference as the team
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Bracket {
    pub pods: Vec<Pod>,
    pub unplaced: Vec<TeamId>,  // Only when there are too few hosts to take everyone
}

impl Bracket {
    pub fn pod_of(&self, team: TeamId) -> Option<&Pod> {
        self.pods.iter().find(|p| p.teams().any(|m| m.team == team))
    }

    pub fn is_host(&self, team: TeamId) -> bool {
        self.pods.iter().any(|p| p.host.team == team)
    }
}

fn distance(a: &Team, b: &Team) -> f64 {
    match (a.coordinates(), b.coordinates()) {
        (Some(a), Some(b)) => haversine_miles(a, b),
        _ => f64::INFINITY,
    }
}

/// Builds the projected field: PR order, cut at the field size, split into four tiers.
/// Top tier teams host. Tiers two to four then pick pods one team at a time, in PR order,
/// each taking the pod with the fewest visitors, then no conference clash, then the shortest
/// trip. Earlier picks constrain later ones, so the order here is part of the result.
pub fn assemble_bracket(teams: &[Team], rankings: &[RankingResult], ctx: &RankingContext) -> Bracket {
    let by_id: HashMap<TeamId, &Team> = teams.iter().map(|t| (t.id, t)).collect();

    let mut field: Vec<&RankingResult> = rankings.iter().filter(|r| by_id.contains_key(&r.team)).collect();
    field.sort_by_key(|r| r.pr);
    field.truncate(ctx.field_size);

    let tier_size = ctx.tier_size();
    if tier_size == 0 {
        warn!(field_size = ctx.field_size, "field too small for four seed tiers, no bracket");
        return Bracket::default();
    }
    let (hosts, visitors) = field.split_at(tier_size.min(field.len()));

    let pods: Vec<Pod> = hosts
        .iter()
        .map(|r| Pod {
            host: PodMember { team: r.team, pr: r.pr, seed_tier: 1, distance_miles: 0.0 },
            visitors: Vec::new(),
        })
        .collect();

    let bracket = visitors
        .iter()
        .enumerate()
        .fold(Bracket { pods, unplaced: Vec::new() }, |mut bracket, (i, r)| {
            let seed_tier = i / tier_size + 2;
            let team = by_id[&r.team];

            match pick_pod(&bracket.pods, team, &by_id, ctx.pod_visitor_cap) {
                Some((pod_idx, distance_miles)) => bracket.pods[pod_idx].visitors.push(PodMember {
                    team: r.team,
                    pr: r.pr,
                    seed_tier,
                    distance_miles,
                }),
                None => bracket.unplaced.push(r.team),
            }
            bracket
        });

    if !bracket.unplaced.is_empty() {
        warn!(unplaced = bracket.unplaced.len(), "pods full, teams left without a site");
    }
    debug!(pods = bracket.pods.len(), field = field.len(), "bracket assembled");

    bracket
}

// Best open pod for `team` and its distance to that host. Remaining ties go to the better host.
fn pick_pod(pods: &[Pod], team: &Team, by_id: &HashMap<TeamId, &Team>, cap: usize) -> Option<(usize, f64)> {
    let conference_clash = |pod: &Pod| pod.teams().any(|m| by_id[&m.team].conference == team.conference);

    pods.iter()
        .enumerate()
        .filter(|(_, pod)| pod.visitors.len() < cap)
        .map(|(idx, pod)| (idx, pod.visitors.len(), conference_clash(pod), distance(team, by_id[&pod.host.team])))
        .min_by(|a, b| {
            a.1.cmp(&b.1)
                .then(a.2.cmp(&b.2))
                .then(a.3.total_cmp(&b.3))
                .then(a.0.cmp(&b.0))
        })
        .map(|(idx, _, _, miles)| (idx, miles))
}

/// Every host, nearest first, for a team that is not itself hosting. Same-conference hosts stay
/// in the list but are flagged, since the pod assembly avoids them.
pub fn closest_hosts(team: &Team, teams: &[Team], bracket: &Bracket) -> Vec<HostOption> {
    if bracket.is_host(team.id) { return Vec::new(); }
    let by_id: HashMap<TeamId, &Team> = teams.iter().map(|t| (t.id, t)).collect();

    let mut options: Vec<HostOption> = bracket
        .pods
        .iter()
        .filter_map(|pod| by_id.get(&pod.host.team))
        .map(|host| HostOption {
            host: host.id,
            distance_miles: distance(team, host),
            unlikely: host.conference == team.conference,
        })
        .collect();

    options.sort_by(|a, b| a.distance_miles.total_cmp(&b.distance_miles));
    options
}
