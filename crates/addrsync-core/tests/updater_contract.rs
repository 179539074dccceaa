//! Contract Test: Record Reconciliation
//!
//! Constraints verified:
//! - The submitted value is add(mask(public, bits), offset)
//! - An unchanged value is never resubmitted
//! - A failed submission blocks further attempts for the requested cooldown
//! - A permanent failure blocks further attempts for the life of the updater
//! - Dry runs compute values without submitting

mod common;

use addrsync_core::lookup::STALE_AFTER;
use addrsync_core::{RecordType, RetryAfter, UpdateOutcome, Updater, Updaters};
use common::*;
use std::time::Duration;

const COOLDOWN: Duration = Duration::from_secs(15 * 60);

#[tokio::test]
async fn submits_masked_value_plus_offset() {
    let discovery = ScriptedDiscovery::answering("echo", ip("203.0.113.42"));
    let service = ScriptedService::new("host.example");

    let mut updater = Updater::new(RecordType::A, service.boxed(), lookup_with(&[&discovery]))
        .unwrap()
        .with_offset(8, Some(ip("0.0.0.5")))
        .unwrap();

    assert_eq!(
        updater.update().await,
        UpdateOutcome::Submitted { ip: ip("203.0.113.5") }
    );
    assert_eq!(service.submissions(), vec![ip("203.0.113.5")]);
    assert_eq!(updater.submitted(), Some(ip("203.0.113.5")));
}

#[tokio::test]
async fn submits_slaac_address_in_public_prefix() {
    let discovery = ScriptedDiscovery::answering("echo", ip("2001:db8:1:2:aaaa:bbbb:cccc:dddd"));
    let service = ScriptedService::new("nas.example");
    let lookup = lookup_with(&[&discovery]);

    let config =
        addrsync_core::RecordConfig::new(duck("nas"), "AAAA").with_slaac("00:00:5e:00:53:01");
    let registry = addrsync_core::ServiceRegistry::new();
    registry.register_service("duck", Box::new(ScriptedFactory(service.clone())));

    let mut updater = Updater::from_config(&config, &registry, lookup).unwrap();
    updater.update().await;

    assert_eq!(
        service.submissions(),
        vec![ip("2001:db8:1:2:200:5eff:fe00:5301")]
    );
}

#[tokio::test(start_paused = true)]
async fn unchanged_value_is_not_resubmitted() {
    let discovery = ScriptedDiscovery::answering("echo", ip("203.0.113.42"));
    let service = ScriptedService::new("host.example");
    let mut updater =
        Updater::new(RecordType::A, service.boxed(), lookup_with(&[&discovery])).unwrap();

    updater.update().await;
    for _ in 0..5 {
        tokio::time::advance(Duration::from_secs(300)).await;
        assert_eq!(
            updater.update().await,
            UpdateOutcome::Unchanged { ip: ip("203.0.113.42") }
        );
    }
    assert_eq!(service.submit_count(), 1);

    // A new public address is picked up once the cache goes stale
    discovery.set_answer(RecordType::A, Some(ip("203.0.113.43")));
    tokio::time::advance(STALE_AFTER).await;
    updater.update().await;
    assert_eq!(service.submissions(), vec![ip("203.0.113.42"), ip("203.0.113.43")]);
}

#[tokio::test]
async fn unresolved_address_does_nothing() {
    let discovery = ScriptedDiscovery::new("down");
    let service = ScriptedService::new("host.example");
    let mut updater =
        Updater::new(RecordType::Aaaa, service.boxed(), lookup_with(&[&discovery])).unwrap();

    assert_eq!(updater.update().await, UpdateOutcome::Unresolved);
    assert_eq!(service.submit_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn failure_starts_cooldown() {
    let discovery = ScriptedDiscovery::answering("echo", ip("203.0.113.42"));
    let service = ScriptedService::new("host.example");
    service.fail_next(RetryAfter::Delay(COOLDOWN));
    let mut updater =
        Updater::new(RecordType::A, service.boxed(), lookup_with(&[&discovery])).unwrap();

    assert!(matches!(
        updater.update().await,
        UpdateOutcome::Failed { retry: RetryAfter::Delay(d), .. } if d == COOLDOWN
    ));
    assert_eq!(updater.submitted(), None);

    tokio::time::advance(COOLDOWN - Duration::from_secs(1)).await;
    assert_eq!(
        updater.update().await,
        UpdateOutcome::CoolingDown { ip: ip("203.0.113.42") }
    );
    assert_eq!(service.submit_count(), 1);

    tokio::time::advance(Duration::from_secs(1)).await;
    assert_eq!(
        updater.update().await,
        UpdateOutcome::Submitted { ip: ip("203.0.113.42") }
    );
    assert_eq!(service.submit_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn cooldown_ends_with_latest_value() {
    let discovery = ScriptedDiscovery::answering("echo", ip("203.0.113.42"));
    let service = ScriptedService::new("host.example");
    service.fail_next(RetryAfter::Delay(COOLDOWN));
    let mut updater =
        Updater::new(RecordType::A, service.boxed(), lookup_with(&[&discovery])).unwrap();

    updater.update().await;
    discovery.set_answer(RecordType::A, Some(ip("203.0.113.50")));
    tokio::time::advance(COOLDOWN).await;
    updater.update().await;

    assert_eq!(service.submissions(), vec![ip("203.0.113.42"), ip("203.0.113.50")]);
}

#[tokio::test(start_paused = true)]
async fn cooldown_holds_while_value_keeps_changing() {
    let discovery = ScriptedDiscovery::answering("echo", ip("203.0.113.42"));
    let service = ScriptedService::new("host.example");
    service.fail_next(RetryAfter::Delay(COOLDOWN));
    let mut updater =
        Updater::new(RecordType::A, service.boxed(), lookup_with(&[&discovery])).unwrap();

    assert!(matches!(updater.update().await, UpdateOutcome::Failed { .. }));

    discovery.set_answer(RecordType::A, Some(ip("203.0.113.50")));
    tokio::time::advance(STALE_AFTER).await;
    assert!(STALE_AFTER < COOLDOWN);
    assert_eq!(
        updater.update().await,
        UpdateOutcome::CoolingDown { ip: ip("203.0.113.50") }
    );

    tokio::time::advance(COOLDOWN - STALE_AFTER - Duration::from_secs(1)).await;
    assert_eq!(
        updater.update().await,
        UpdateOutcome::CoolingDown { ip: ip("203.0.113.50") }
    );
    assert_eq!(service.submit_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn unrepresentable_delay_stops_submissions() {
    let discovery = ScriptedDiscovery::answering("echo", ip("203.0.113.42"));
    let service = ScriptedService::new("host.example");
    service.fail_next(RetryAfter::Delay(Duration::MAX));
    let mut updater =
        Updater::new(RecordType::A, service.boxed(), lookup_with(&[&discovery])).unwrap();

    assert!(matches!(
        updater.update().await,
        UpdateOutcome::Failed { retry: RetryAfter::Delay(Duration::MAX), .. }
    ));

    tokio::time::advance(Duration::from_secs(10 * 365 * 24 * 3600)).await;
    assert_eq!(
        updater.update().await,
        UpdateOutcome::CoolingDown { ip: ip("203.0.113.42") }
    );
    assert_eq!(service.submit_count(), 1);
}

#[tokio::test]
async fn transport_failure_retries_next_tick() {
    let discovery = ScriptedDiscovery::answering("echo", ip("203.0.113.42"));
    let service = ScriptedService::new("host.example");
    service.fail_next(RetryAfter::NextTick);
    let mut updater =
        Updater::new(RecordType::A, service.boxed(), lookup_with(&[&discovery])).unwrap();

    assert!(matches!(updater.update().await, UpdateOutcome::Failed { .. }));
    assert_eq!(
        updater.update().await,
        UpdateOutcome::Submitted { ip: ip("203.0.113.42") }
    );
}

#[tokio::test(start_paused = true)]
async fn permanent_failure_stops_submissions() {
    let discovery = ScriptedDiscovery::answering("echo", ip("203.0.113.42"));
    let service = ScriptedService::new("host.example");
    service.fail_next(RetryAfter::Never);
    let mut updater =
        Updater::new(RecordType::A, service.boxed(), lookup_with(&[&discovery])).unwrap();

    assert!(matches!(
        updater.update().await,
        UpdateOutcome::Failed { retry: RetryAfter::Never, .. }
    ));

    discovery.set_answer(RecordType::A, Some(ip("203.0.113.99")));
    for _ in 0..3 {
        tokio::time::advance(Duration::from_secs(365 * 24 * 3600)).await;
        assert_eq!(
            updater.update().await,
            UpdateOutcome::CoolingDown { ip: ip("203.0.113.99") }
        );
    }
    assert_eq!(service.submit_count(), 1);
}

#[tokio::test]
async fn dry_run_never_submits() {
    let discovery = ScriptedDiscovery::answering("echo", ip("203.0.113.42"));
    let service = ScriptedService::new("host.example");
    let updater = Updater::new(RecordType::A, service.boxed(), lookup_with(&[&discovery]))
        .unwrap()
        .with_offset(24, Some(ip("0.0.0.1")))
        .unwrap();

    assert_eq!(updater.dry_run().await, Some(ip("203.0.0.1")));
    assert_eq!(service.submit_count(), 0);
}

#[tokio::test]
async fn updaters_share_one_lookup() {
    let discovery = ScriptedDiscovery::answering("echo", ip("203.0.113.42"));
    let lookup = lookup_with(&[&discovery]);
    let first = ScriptedService::new("one.example");
    let second = ScriptedService::new("two.example");

    let mut updaters = Updaters::new(lookup);
    updaters.push(Updater::new(RecordType::A, first.boxed(), updaters.lookup()).unwrap());
    updaters.push(
        Updater::new(RecordType::A, second.boxed(), updaters.lookup())
            .unwrap()
            .with_offset(8, Some(ip("0.0.0.7")))
            .unwrap(),
    );

    let outcomes = updaters.update().await;
    assert_eq!(
        outcomes,
        vec![
            UpdateOutcome::Submitted { ip: ip("203.0.113.42") },
            UpdateOutcome::Submitted { ip: ip("203.0.113.7") },
        ]
    );
    assert_eq!(discovery.call_count(), 1);

    assert_eq!(
        updaters.dry_run().await,
        vec![Some(ip("203.0.113.42")), Some(ip("203.0.113.7"))]
    );
}

#[tokio::test]
async fn failures_are_isolated_per_updater() {
    let discovery = ScriptedDiscovery::answering("echo", ip("203.0.113.42"));
    let lookup = lookup_with(&[&discovery]);
    let broken = ScriptedService::new("broken.example");
    broken.fail_next(RetryAfter::Never);
    let healthy = ScriptedService::new("healthy.example");

    let mut updaters = Updaters::new(lookup);
    updaters.push(Updater::new(RecordType::A, broken.boxed(), updaters.lookup()).unwrap());
    updaters.push(Updater::new(RecordType::A, healthy.boxed(), updaters.lookup()).unwrap());

    updaters.update().await;
    assert_eq!(healthy.submissions(), vec![ip("203.0.113.42")]);
}
