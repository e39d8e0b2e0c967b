//! MdnsResolver Tests
//!
//! Covers:
//! - Pass-through of non-`.local` names
//! - Cache hits, timed queries and failed lookups
//! - Engine ownership and close

mod common;

use common::{record, MockDns, MockEngine};
use mdnsnet::base::neterror::NetError;
use mdnsnet::dns::{
    AddressFamily, MdnsConfig, MdnsResolver, MdnsResolverBuilder, Name, Resolve, AI_NUMERICHOST,
    AI_NUMERICSERV,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn resolver(engine: &Arc<MockEngine>, dns: &Arc<MockDns>) -> MdnsResolver {
    MdnsResolverBuilder::new()
        .resolver(dns.clone())
        .shared_engine(engine.clone())
        .query_timeout(Duration::from_millis(100))
        .build()
        .unwrap()
}

fn default_dns() -> Arc<MockDns> {
    Arc::new(MockDns::answering(vec![record("localhost", "127.0.0.1", 0)]))
}

#[tokio::test]
async fn test_resolve_localhost_delegates_to_dns() {
    let engine = Arc::new(MockEngine::new());
    let dns = default_dns();
    let resolver = resolver(&engine, &dns);

    let results = resolver.resolve_host("localhost").await.unwrap();

    assert_eq!(results, vec![record("localhost", "127.0.0.1", 0)]);
    assert_eq!(dns.calls(), 1);
    assert_eq!(engine.cache_probes.load(std::sync::atomic::Ordering::SeqCst), 0);
    assert_eq!(engine.requests(), 0);
}

#[tokio::test]
async fn test_resolve_mdns_name_unspec() {
    let engine = Arc::new(MockEngine::new().with_answers(&["127.0.0.1", "::1"]));
    let dns = default_dns();
    let resolver = resolver(&engine, &dns);

    let result = resolver
        .resolve(Name::new("localhost.local"), 0, AddressFamily::Unspecified)
        .await
        .unwrap();

    assert_eq!(result.len(), 2);
    assert_eq!(result[0].hostname, "localhost.local.");
    assert_eq!(result[0].host, "127.0.0.1");
    assert_eq!(result[0].family, AddressFamily::Inet);
    assert_eq!(result[0].flags, AI_NUMERICHOST | AI_NUMERICSERV);
    assert_eq!(result[1].hostname, "localhost.local.");
    assert_eq!(result[1].host, "::1");
    assert_eq!(result[1].family, AddressFamily::Inet6);
    assert_eq!(engine.requests(), 1);
    assert_eq!(dns.calls(), 0);
}

#[tokio::test]
async fn test_resolve_mdns_name_unspec_from_cache() {
    let engine = Arc::new(MockEngine::new().with_cache(&["127.0.0.1", "::1"]));
    let dns = default_dns();
    let resolver = resolver(&engine, &dns);

    let result = resolver
        .resolve(Name::new("localhost.local"), 80, AddressFamily::Unspecified)
        .await
        .unwrap();

    assert_eq!(result.len(), 2);
    assert_eq!(result[0].hostname, "localhost.local.");
    assert_eq!(result[0].host, "127.0.0.1");
    assert_eq!(result[0].port, 80);
    assert_eq!(result[1].hostname, "localhost.local.");
    assert_eq!(result[1].host, "::1");
    assert_eq!(result[1].port, 80);
    // Served from cache: the query primitive never ran
    assert_eq!(engine.requests(), 0);
}

#[tokio::test]
async fn test_resolve_mdns_name_unspec_no_results() {
    let engine = Arc::new(MockEngine::new());
    let dns = default_dns();
    let resolver = resolver(&engine, &dns);

    let err = resolver
        .resolve(Name::new("localhost.local"), 0, AddressFamily::Unspecified)
        .await
        .unwrap_err();

    assert_eq!(err, NetError::MdnsLookupFailed);
    assert_eq!(err.to_string(), "MDNS lookup failed");
    assert_eq!(engine.requests(), 1);
}

#[tokio::test]
async fn test_resolve_mdns_name_unspec_trailing_dot() {
    let engine = Arc::new(MockEngine::new().with_answers(&["127.0.0.1", "::1"]));
    let dns = default_dns();
    let resolver = resolver(&engine, &dns);

    let bare = resolver
        .resolve(Name::new("localhost.local"), 0, AddressFamily::Unspecified)
        .await
        .unwrap();
    let dotted = resolver
        .resolve(Name::new("localhost.local."), 0, AddressFamily::Unspecified)
        .await
        .unwrap();

    assert_eq!(bare, dotted);
    assert_eq!(dotted.len(), 2);
    assert_eq!(dotted[0].hostname, "localhost.local.");
    assert_eq!(dotted[0].host, "127.0.0.1");
    assert_eq!(dotted[1].host, "::1");
}

#[tokio::test]
async fn test_resolve_mdns_name_af_inet() {
    let engine = Arc::new(MockEngine::new().with_answers(&["127.0.0.1", "::1"]));
    let dns = default_dns();
    let resolver = resolver(&engine, &dns);

    let result = resolver
        .resolve(Name::new("localhost.local"), 0, AddressFamily::Inet)
        .await
        .unwrap();

    assert_eq!(result.len(), 1);
    assert_eq!(result[0].hostname, "localhost.local.");
    assert_eq!(result[0].host, "127.0.0.1");
}

#[tokio::test]
async fn test_resolve_mdns_name_af_inet6() {
    let engine = Arc::new(MockEngine::new().with_answers(&["127.0.0.1", "::1"]));
    let dns = default_dns();
    let resolver = resolver(&engine, &dns);

    let result = resolver
        .resolve(Name::new("localhost.local"), 0, AddressFamily::Inet6)
        .await
        .unwrap();

    assert_eq!(result.len(), 1);
    assert_eq!(result[0].hostname, "localhost.local.");
    assert_eq!(result[0].host, "::1");
}

#[tokio::test]
async fn test_resolve_suffix_is_case_insensitive() {
    let engine = Arc::new(MockEngine::new().with_answers(&["10.0.0.9"]));
    let dns = default_dns();
    let resolver = resolver(&engine, &dns);

    let result = resolver.resolve_host("Printer.LOCAL").await.unwrap();

    assert_eq!(result.len(), 1);
    assert_eq!(result[0].hostname, "Printer.LOCAL.");
    assert_eq!(dns.calls(), 0);
}

#[tokio::test]
async fn test_resolve_uses_learned_port() {
    let engine = Arc::new(MockEngine::new().with_answers(&["10.0.0.9"]).with_port(9100));
    let dns = default_dns();
    let resolver = resolver(&engine, &dns);

    let result = resolver
        .resolve(Name::new("printer.local"), 0, AddressFamily::Inet)
        .await
        .unwrap();

    assert_eq!(result[0].port, 9100);
}

#[tokio::test]
async fn test_query_timeout_reaches_engine() {
    let engine = Arc::new(MockEngine::new().with_answers(&["10.0.0.9"]));
    let dns = default_dns();
    let resolver = resolver(&engine, &dns);

    resolver.resolve_host("printer.local").await.unwrap();

    assert_eq!(
        *engine.last_timeout.lock().unwrap(),
        Some(Duration::from_millis(100))
    );
}

#[tokio::test]
async fn test_zero_timeout_skips_query() {
    let engine = Arc::new(MockEngine::new().with_answers(&["10.0.0.9"]));
    let dns = default_dns();
    let resolver = MdnsResolverBuilder::new()
        .resolver(dns.clone())
        .shared_engine(engine.clone())
        .query_timeout(Duration::ZERO)
        .build()
        .unwrap();

    let err = resolver.resolve_host("printer.local").await.unwrap_err();

    assert_eq!(err, NetError::MdnsLookupFailed);
    assert_eq!(engine.requests(), 0);
    assert_eq!(dns.calls(), 0);
}

#[tokio::test]
async fn test_disabled_query_still_serves_cache() {
    let engine = Arc::new(MockEngine::new().with_cache(&["10.0.0.9"]));
    let dns = default_dns();
    let resolver = MdnsResolverBuilder::new()
        .resolver(dns.clone())
        .shared_engine(engine.clone())
        .config(MdnsConfig::new().disable_query())
        .build()
        .unwrap();

    let result = resolver.resolve_host("printer.local").await.unwrap();

    assert_eq!(result[0].host, "10.0.0.9");
    assert_eq!(resolver.config().query_timeout, None);
}

#[tokio::test]
async fn test_resolve_mdns_passed_in_engine() {
    let engine = Arc::new(MockEngine::new().with_answers(&["127.0.0.1", "::1"]));
    let dns = default_dns();
    let resolver = resolver(&engine, &dns);

    assert!(!resolver.is_engine_owner());
    assert!(resolver.has_engine());

    let result = resolver
        .resolve(Name::new("localhost.local"), 0, AddressFamily::Unspecified)
        .await
        .unwrap();

    assert_eq!(result.len(), 2);
    assert_eq!(result[0].host, "127.0.0.1");
    assert_eq!(result[1].host, "::1");
}

#[tokio::test]
async fn test_create_destroy_resolver_shared_engine() {
    let engine = Arc::new(MockEngine::new());
    let dns = default_dns();
    let resolver = resolver(&engine, &dns);

    resolver.close().await;

    assert!(!resolver.has_engine());
    assert!(!resolver.is_engine_owner());
    // The caller still owns the engine
    assert!(!engine.is_closed());
    assert!(dns.is_closed());
}

#[tokio::test]
async fn test_create_destroy_resolver_owned_engine() {
    let engine = Arc::new(MockEngine::new());
    let dns = default_dns();
    let resolver = MdnsResolverBuilder::new()
        .resolver(dns.clone())
        .owned_engine(engine.clone())
        .build()
        .unwrap();

    resolver.close().await;

    assert!(!resolver.has_engine());
    assert!(resolver.is_engine_owner());
    assert!(engine.is_closed());
    assert!(dns.is_closed());
}

#[tokio::test]
async fn test_closed_resolver_rejects_local_names() {
    let engine = Arc::new(MockEngine::new().with_answers(&["10.0.0.9"]));
    let dns = default_dns();
    let resolver = resolver(&engine, &dns);
    resolver.close().await;

    let err = resolver.resolve_host("printer.local").await.unwrap_err();

    assert_eq!(err, NetError::ResolverClosed);
    assert_eq!(engine.requests(), 0);
}

#[tokio::test]
async fn test_default_engine_is_owned() {
    // Needs a network interface for the mDNS daemon; skip when unavailable.
    let resolver = match MdnsResolver::builder().resolver(default_dns()).build() {
        Ok(resolver) => resolver,
        Err(e) => {
            println!("default discovery engine unavailable: {e}");
            return;
        }
    };

    assert!(resolver.is_engine_owner());
    resolver.close().await;
    assert!(!resolver.has_engine());
    assert!(resolver.is_engine_owner());
}

#[tokio::test(start_paused = true)]
async fn test_resolve_with_cancel_abandons_query() {
    let engine = Arc::new(
        MockEngine::new()
            .with_answers(&["10.0.0.9"])
            .with_delay(Duration::from_secs(5)),
    );
    let dns = default_dns();
    let resolver = MdnsResolverBuilder::new()
        .resolver(dns.clone())
        .shared_engine(engine.clone())
        .build()
        .unwrap();
    let token = CancellationToken::new();

    let lookup =
        resolver.resolve_with_cancel(Name::new("printer.local"), 0, AddressFamily::Inet, &token);
    let cancel = async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        token.cancel();
    };
    let (result, ()) = tokio::join!(lookup, cancel);

    assert_eq!(result.unwrap_err(), NetError::Aborted);
    assert_eq!(engine.requests(), 1);
    assert_eq!(engine.completed(), 0);
}

#[tokio::test]
async fn test_resolve_with_cancel_unfired_token() {
    let engine = Arc::new(MockEngine::new().with_answers(&["10.0.0.9"]));
    let dns = default_dns();
    let resolver = resolver(&engine, &dns);
    let token = CancellationToken::new();

    let local = resolver
        .resolve_with_cancel(Name::new("printer.local"), 0, AddressFamily::Inet, &token)
        .await
        .unwrap();
    let other = resolver
        .resolve_with_cancel(Name::new("localhost"), 0, AddressFamily::Inet, &token)
        .await
        .unwrap();

    assert_eq!(local[0].host, "10.0.0.9");
    assert_eq!(other, vec![record("localhost", "127.0.0.1", 0)]);
}
