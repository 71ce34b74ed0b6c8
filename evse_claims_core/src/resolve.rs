//evse_claims_core/resolve.rs

use std::cmp::Ordering;

use crate::{cfg::ResolveCfg, cfg::TieBreak, claim::Claim, claim::ClaimSet, clients::ClientRegistry};

/// Outcome of ranking a [`ClaimSet`]: contenders best-first plus the
/// disabled claims that sat out.
///
/// Holds borrows only, so it is recomputed from the set whenever needed.
#[derive(Clone, Debug)]
pub struct Arbitration<'a> {
    ranked: Vec<(&'a Claim, i32)>,
    excluded: Vec<&'a Claim>,
}

impl<'a> Arbitration<'a> {
    /// The claim in control, or `None` when nothing is contending.
    pub fn controller(&self) -> Option<&'a Claim> {
        self.ranked.first().map(|(c, _)| *c)
    }

    pub fn controller_id(&self) -> Option<u32> {
        self.controller().map(|c| c.client)
    }

    pub fn is_in_control(&self, client: u32) -> bool {
        self.controller_id() == Some(client)
    }

    /// Zero-based position among contenders. Disabled or absent claims have no rank.
    pub fn rank_of(&self, client: u32) -> Option<usize> {
        self.ranked.iter().position(|(c, _)| c.client == client)
    }

    /// Look up any claim seen by this arbitration, contending or not.
    pub fn claim(&self, client: u32) -> Option<&'a Claim> {
        self.ranked
            .iter()
            .map(|(c, _)| *c)
            .chain(self.excluded.iter().copied())
            .find(|c| c.client == client)
    }

    /// Effective priority each contender was ranked with.
    pub fn priority_of(&self, client: u32) -> Option<i32> {
        self.ranked
            .iter()
            .find(|(c, _)| c.client == client)
            .map(|(_, p)| *p)
    }

    pub fn ranked(&self) -> impl Iterator<Item = &'a Claim> + '_ {
        self.ranked.iter().map(|(c, _)| *c)
    }

    pub fn excluded(&self) -> &[&'a Claim] {
        &self.excluded
    }

    pub fn is_empty(&self) -> bool {
        self.ranked.is_empty()
    }
}

fn compare(a: (&Claim, i32), b: (&Claim, i32), tie_break: TieBreak) -> Ordering {
    // Higher priority first; ties fall back to client id.
    b.1.cmp(&a.1).then_with(|| match tie_break {
        TieBreak::LowestClientId => a.0.client.cmp(&b.0.client),
        TieBreak::HighestClientId => b.0.client.cmp(&a.0.client),
    })
}

pub fn arbitrate<'a>(
    claims: &'a ClaimSet,
    registry: &ClientRegistry,
    cfg: &ResolveCfg,
) -> Arbitration<'a> {
    let mut ranked = Vec::with_capacity(claims.len());
    let mut excluded = Vec::new();

    for c in claims {
        if c.is_disabled() {
            excluded.push(c);
            continue;
        }
        ranked.push((c, c.effective_priority(registry, cfg.fallback_priority)));
    }

    // Client ids are unique within a set, so this is a total order.
    ranked.sort_by(|a, b| compare(*a, *b, cfg.tie_break));

    Arbitration { ranked, excluded }
}

/// Convenience: just the controlling claim, using default cfg.
pub fn resolve<'a>(claims: &'a ClaimSet, registry: &ClientRegistry) -> Option<&'a Claim> {
    arbitrate(claims, registry, &ResolveCfg::default()).controller()
}
