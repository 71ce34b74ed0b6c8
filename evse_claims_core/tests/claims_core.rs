use std::collections::HashSet;

use evse_claims_core::*;

#[test]
fn builtin_table_order_and_ids() {
    let r = builtin_clients();
    let names: Vec<&str> = r.all().iter().map(|c| c.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["manual", "divert", "boost", "timer", "limit", "error", "ohm", "ocpp", "rfid", "mqtt", "shaper"]
    );

    let ids: HashSet<u32> = r.all().iter().map(|c| c.id).collect();
    assert_eq!(ids.len(), r.all().len());

    assert_eq!(r.lookup_by_name("manual").map(|c| c.id), Some(65537));
    assert_eq!(r.lookup_by_name("limit").map(|c| c.id), Some(65542));
    assert_eq!(r.lookup_by_name("shaper").map(|c| c.id), Some(65548));
    assert_eq!(r.name_of(65546), Some("rfid"));
    assert_eq!(r.name_of(99999), None);
    assert_eq!(r.name_of(0), None);
}

#[test]
fn builtin_priorities() {
    let r = builtin_clients();
    let expect = [
        ("manual", 1000),
        ("divert", 50),
        ("boost", 200),
        ("timer", 100),
        ("limit", 1100),
        ("error", 10000),
        ("ohm", 500),
        ("ocpp", 1050),
        ("rfid", 1030),
        ("mqtt", 500),
        ("shaper", 5000),
    ];
    for (name, prio) in expect {
        assert_eq!(r.lookup_by_name(name).map(|c| c.priority), Some(prio), "{name}");
    }

    let max = r.all().iter().map(|c| c.priority).max().unwrap();
    let min = r.all().iter().map(|c| c.priority).min().unwrap();
    assert_eq!(r.lookup_by_name("error").unwrap().priority, max);
    assert_eq!(r.lookup_by_name("divert").unwrap().priority, min);
}

#[test]
fn empty_or_all_disabled_has_no_controller() {
    let r = builtin_clients();
    assert!(resolve(&ClaimSet::new(), &r).is_none());

    let set = ClaimSet::from_claims([
        Claim::new(clients::MANUAL).with_state(ClaimState::Disabled),
        Claim::new(clients::TIMER).with_state(ClaimState::Disabled),
    ]);
    let arb = arbitrate(&set, &r, &ResolveCfg::default());
    assert!(arb.controller().is_none());
    assert!(arb.is_empty());
    assert_eq!(arb.excluded().len(), 2);
}

#[test]
fn winner_outranks_every_contender() {
    let r = builtin_clients();
    let cfg = ResolveCfg::default();
    let sets = [
        ClaimSet::from_claims([
            Claim::new(clients::DIVERT),
            Claim::new(clients::MANUAL).with_priority(1000),
            Claim::new(clients::RFID),
        ]),
        ClaimSet::from_claims([
            Claim::new(clients::SHAPER),
            Claim::new(clients::ERROR).with_state("disabled"),
            Claim::new(clients::LIMIT),
        ]),
        ClaimSet::from_claims([
            Claim::new(clients::OHM),
            Claim::new(clients::MQTT),
            Claim::new(clients::BOOST).with_priority(20000),
        ]),
    ];

    for set in &sets {
        let arb = arbitrate(set, &r, &cfg);
        let winner = arb.controller().unwrap();
        let wp = arb.priority_of(winner.client).unwrap();
        for c in arb.ranked() {
            assert!(wp >= arb.priority_of(c.client).unwrap());
        }
        // Same input, same answer.
        assert_eq!(arbitrate(set, &r, &cfg).controller_id(), Some(winner.client));
    }

    assert_eq!(arbitrate(&sets[0], &r, &cfg).controller_id(), Some(clients::RFID));
    assert_eq!(arbitrate(&sets[1], &r, &cfg).controller_id(), Some(clients::SHAPER));
    assert_eq!(arbitrate(&sets[2], &r, &cfg).controller_id(), Some(clients::BOOST));
}

#[test]
fn device_priority_overrides_registry() {
    let r = builtin_clients();
    let set = ClaimSet::from_claims([
        Claim::new(clients::DIVERT).with_priority(2000),
        Claim::new(clients::MANUAL),
    ]);
    let arb = arbitrate(&set, &r, &ResolveCfg::default());
    assert!(arb.is_in_control(clients::DIVERT));
    assert_eq!(arb.rank_of(clients::MANUAL), Some(1));
}
