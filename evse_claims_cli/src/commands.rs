//! One function per subcommand. Each returns the text to print.

use std::fmt::Write as _;

use anyhow::{anyhow, Context};
use serde_json::{Map, Value};

use evse_claims_core::{Claim, ClientRegistry};
use evse_claims_store::{ClaimStore, HttpApi};

fn client_label(registry: &ClientRegistry, client: u32) -> String {
    match registry.name_of(client) {
        Some(name) => format!("{name} ({client})"),
        None => format!("unknown ({client})"),
    }
}

fn payload_summary(claim: &Claim) -> String {
    claim
        .payload
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Map `--client` to an id; `None` means the store's own identity.
pub fn parse_client(registry: &ClientRegistry, reference: Option<&str>) -> anyhow::Result<Option<u32>> {
    match reference {
        None => Ok(None),
        Some(r) => registry
            .resolve_ref(r)
            .map(Some)
            .ok_or_else(|| anyhow!("unknown client {r:?}")),
    }
}

pub async fn list<A: HttpApi>(store: &ClaimStore<A>) -> anyhow::Result<String> {
    store.try_download().await.context("downloading claims")?;

    let registry = store.registry();
    let mut out = String::new();
    store.with_arbitration(|arb| {
        if arb.is_empty() && arb.excluded().is_empty() {
            out.push_str("no claims\n");
            return;
        }
        for (rank, c) in arb.ranked().enumerate() {
            let marker = if rank == 0 { '*' } else { ' ' };
            let _ = writeln!(
                out,
                "{marker} {:<18} prio {:>5}  {}  {}",
                client_label(registry, c.client),
                arb.priority_of(c.client).unwrap_or_default(),
                c.state,
                payload_summary(c),
            );
        }
        for c in arb.excluded() {
            let _ = writeln!(
                out,
                "- {:<18} {:>10}  {}  {}",
                client_label(registry, c.client),
                "",
                c.state,
                payload_summary(c),
            );
        }
    });
    Ok(out)
}

pub async fn controller<A: HttpApi>(store: &ClaimStore<A>) -> anyhow::Result<String> {
    store.try_download().await.context("downloading claims")?;

    Ok(match store.controller() {
        Some(c) => client_label(store.registry(), c.client),
        None => "none".to_string(),
    })
}

pub async fn claim<A: HttpApi>(
    store: &ClaimStore<A>,
    client: Option<&str>,
    payload: &str,
) -> anyhow::Result<String> {
    let client = parse_client(store.registry(), client)?;
    let payload: Map<String, Value> =
        serde_json::from_str(payload).context("claim payload must be a JSON object")?;

    store
        .try_upload(&payload, client)
        .await
        .context("uploading claim")?;

    let id = client.unwrap_or(store.own_client());
    Ok(format!("claimed {}", client_label(store.registry(), id)))
}

pub async fn release<A: HttpApi>(store: &ClaimStore<A>, client: Option<&str>) -> anyhow::Result<String> {
    let client = parse_client(store.registry(), client)?;

    store.try_release(client).await.context("releasing claim")?;

    let id = client.unwrap_or(store.own_client());
    Ok(format!("released {}", client_label(store.registry(), id)))
}

pub fn clients(registry: &ClientRegistry) -> String {
    let mut out = String::new();
    for c in registry.all() {
        let _ = writeln!(out, "{:<8} {:>6}  prio {:>5}", c.name, c.id, c.priority);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use evse_claims_store::{MockApi, StoreConfig};
    use serde_json::json;

    fn store() -> ClaimStore<MockApi> {
        ClaimStore::new(MockApi::new(), StoreConfig::default())
    }

    #[tokio::test]
    async fn list_marks_controller_first() {
        let s = store();
        s.api().push_response(json!([
            { "client": 65538, "state": "active", "charge_current": 6 },
            { "client": 65537, "state": "active", "priority": 1000 },
            { "client": 65543, "state": "disabled" }
        ]));

        let out = list(&s).await.unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("* manual (65537)"));
        assert!(lines[1].contains("divert (65538)"));
        assert!(lines[1].contains("charge_current=6"));
        assert!(lines[2].starts_with("- error (65543)"));
    }

    #[tokio::test]
    async fn controller_reports_none_for_empty_list() {
        let s = store();
        s.api().push_response(json!([]));
        assert_eq!(controller(&s).await.unwrap(), "none");
    }

    #[tokio::test]
    async fn claim_rejects_non_object_payload() {
        let s = store();
        assert!(claim(&s, None, "[1,2]").await.is_err());
        assert_eq!(s.api().call_count(), 0);
    }

    #[tokio::test]
    async fn claim_and_release_by_name() {
        let s = store();
        let out = claim(&s, Some("boost"), r#"{"state":"active"}"#).await.unwrap();
        assert_eq!(out, "claimed boost (65539)");
        assert_eq!(s.api().last_request().unwrap().path, "/claims/65539");

        let out = release(&s, None).await.unwrap();
        assert_eq!(out, "released manual (65537)");

        assert!(release(&s, Some("nobody")).await.is_err());
    }

    #[tokio::test]
    async fn failures_surface_as_errors() {
        let s = store();
        s.api().push_response(json!({ "msg": "error" }));
        assert!(release(&s, Some("65538")).await.is_err());
    }
}
