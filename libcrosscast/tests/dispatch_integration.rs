//! Dispatch integration tests
//!
//! These run the real Telegram, VK and Twitter adapters with recording wire
//! clients from `libcrosscast::platforms::mock`, so credential resolution,
//! validation and result shaping are exercised end to end without network.

use libcrosscast::credentials::CredentialSet;
use libcrosscast::dispatcher::{DispatchReport, Dispatcher};
use libcrosscast::error::DispatchError;
use libcrosscast::platforms::mock::{MockTelegramClient, MockTwitterApi, MockWallApi};
use libcrosscast::platforms::telegram::TelegramPlatform;
use libcrosscast::platforms::twitter::TwitterPlatform;
use libcrosscast::platforms::vk::VkPlatform;
use libcrosscast::platforms::Platform;
use libcrosscast::types::{ErrorKind, MessageId, PlatformId};

const TELEGRAM_BOT: &[(&str, &str)] = &[
    ("TELEGRAM_BOT_TOKEN", "123456:ABC-DEF"),
    ("TELEGRAM_CHANNEL_ID", "@crosscast_news"),
];

const VK_WALL: &[(&str, &str)] = &[("VK_ACCESS_TOKEN", "vk1.a.token"), ("VK_OWNER_ID", "-42")];

const TWITTER_OAUTH2: &[(&str, &str)] = &[
    ("TWITTER_CLIENT_ID", "cid"),
    ("TWITTER_CLIENT_SECRET", "csecret"),
    ("TWITTER_ACCESS_TOKEN", "token"),
    ("TWITTER_ACCESS_TOKEN_SECRET", "token-secret"),
];

/// Wire mocks shared with the adapters inside a dispatcher
struct Wire {
    telegram: MockTelegramClient,
    vk: MockWallApi,
    twitter: MockTwitterApi,
}

impl Wire {
    fn new() -> Self {
        Self {
            telegram: MockTelegramClient::new(),
            vk: MockWallApi::new(),
            twitter: MockTwitterApi::new(),
        }
    }

    fn dispatcher(
        &self,
        telegram: &[(&str, &str)],
        vk: &[(&str, &str)],
        twitter: &[(&str, &str)],
    ) -> Dispatcher {
        let adapters: Vec<Box<dyn Platform>> = vec![
            Box::new(TelegramPlatform::with_client(
                CredentialSet::from_pairs(telegram),
                Box::new(self.telegram.clone()),
            )),
            Box::new(VkPlatform::with_client(
                CredentialSet::from_pairs(vk),
                Box::new(self.vk.clone()),
            )),
            Box::new(TwitterPlatform::with_client(
                CredentialSet::from_pairs(twitter),
                Box::new(self.twitter.clone()),
            )),
        ];
        Dispatcher::new(adapters)
    }

    fn sends(&self) -> usize {
        self.telegram.posted().len() + self.vk.posted().len() + self.twitter.create_calls()
    }
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn test_hello_to_all_platforms() {
    let wire = Wire::new();
    let dispatcher = wire.dispatcher(TELEGRAM_BOT, VK_WALL, TWITTER_OAUTH2);

    let results = dispatcher.dispatch("Hello", &names(&["all"])).await.unwrap();

    assert_eq!(results.len(), 3);
    assert!(results.all_succeeded());

    let order: Vec<_> = results.iter().map(|r| r.platform).collect();
    assert_eq!(
        order,
        vec![PlatformId::Telegram, PlatformId::Vk, PlatformId::Twitter]
    );

    assert!(matches!(results[0].message_id, Some(MessageId::Int(_))));
    assert!(matches!(results[1].message_id, Some(MessageId::Int(_))));
    assert!(matches!(&results[2].message_id, Some(MessageId::Str(id)) if !id.is_empty()));

    assert_eq!(results[0].method.as_deref(), Some("bot"));
    assert_eq!(results[2].method.as_deref(), Some("oauth2"));

    assert_eq!(wire.telegram.posted(), vec!["Hello".to_string()]);
    assert_eq!(wire.vk.posted(), vec![(-42, "Hello".to_string())]);
    assert_eq!(wire.twitter.posted(), vec!["Hello".to_string()]);
}

#[tokio::test]
async fn test_missing_credentials_on_one_platform_sends_nothing() {
    let wire = Wire::new();
    let dispatcher = wire.dispatcher(TELEGRAM_BOT, VK_WALL, &[]);

    let results = dispatcher
        .dispatch("Hello", &names(&["vk", "twitter"]))
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].platform, PlatformId::Twitter);
    assert_eq!(results[0].error_kind, Some(ErrorKind::Configuration));
    assert!(wire.vk.posted().is_empty());
    assert_eq!(wire.sends(), 0);
}

#[tokio::test]
async fn test_overlong_message_to_microblog_and_unconfigured_wall() {
    let wire = Wire::new();
    let dispatcher = wire.dispatcher(&[], &[], TWITTER_OAUTH2);

    let results = dispatcher
        .dispatch(&"x".repeat(281), &names(&["twitter", "vk"]))
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| !r.success));
    assert_eq!(results[0].error_kind, Some(ErrorKind::Validation));
    assert!(results[0].error.as_ref().unwrap().contains("280"));
    assert_eq!(results[1].error_kind, Some(ErrorKind::Configuration));
    assert_eq!(wire.sends(), 0);
}

#[tokio::test]
async fn test_overlong_message_blocks_configured_wall() {
    let wire = Wire::new();
    let dispatcher = wire.dispatcher(&[], VK_WALL, TWITTER_OAUTH2);

    let results = dispatcher
        .dispatch(&"x".repeat(281), &names(&["microblog", "wall"]))
        .await
        .unwrap();

    assert_eq!(results.failed_platforms(), vec![PlatformId::Twitter]);
    assert!(wire.vk.posted().is_empty());
    assert_eq!(wire.sends(), 0);
}

#[tokio::test]
async fn test_message_at_the_limit_is_sent() {
    let wire = Wire::new();
    let dispatcher = wire.dispatcher(&[], &[], TWITTER_OAUTH2);

    let results = dispatcher
        .dispatch(&"x".repeat(280), &names(&["twitter"]))
        .await
        .unwrap();

    assert!(results[0].success);
    assert!(results[0].message_id.is_some());
}

#[tokio::test]
async fn test_emoji_count_double_against_the_limit() {
    let wire = Wire::new();
    let dispatcher = wire.dispatcher(TELEGRAM_BOT, &[], TWITTER_OAUTH2);

    let results = dispatcher
        .dispatch(&"😀".repeat(141), &names(&["telegram", "twitter"]))
        .await
        .unwrap();

    assert_eq!(results.failed_platforms(), vec![PlatformId::Twitter]);
    assert_eq!(results[0].error_kind, Some(ErrorKind::Validation));
    assert_eq!(wire.sends(), 0);

    let results = dispatcher
        .dispatch(&"😀".repeat(140), &names(&["twitter"]))
        .await
        .unwrap();
    assert!(results[0].success);
}

#[tokio::test]
async fn test_bearer_capability_error_is_isolated() {
    let wire = Wire::new();
    let dispatcher = wire.dispatcher(TELEGRAM_BOT, VK_WALL, &[("TWITTER_BEARER_TOKEN", "AAAA")]);

    let results = dispatcher.dispatch("Hello", &names(&["all"])).await.unwrap();

    assert_eq!(results.len(), 3);
    assert!(results[0].success);
    assert!(results[1].success);
    assert!(!results[2].success);
    assert_eq!(results[2].error_kind, Some(ErrorKind::Capability));
    assert_eq!(wire.twitter.create_calls(), 0);
}

#[tokio::test]
async fn test_unknown_names_only() {
    let wire = Wire::new();
    let dispatcher = wire.dispatcher(TELEGRAM_BOT, VK_WALL, TWITTER_OAUTH2);

    let error = dispatcher
        .dispatch("Hello", &names(&["friendster"]))
        .await
        .unwrap_err();

    assert!(matches!(error, DispatchError::NoPlatformsSelected { .. }));
    assert_eq!(wire.sends(), 0);
}

#[tokio::test]
async fn test_status_reflects_schemes() {
    let wire = Wire::new();
    let dispatcher = wire.dispatcher(TELEGRAM_BOT, &[("VK_ACCESS_TOKEN", "t")], TWITTER_OAUTH2);

    let status = dispatcher.status();

    assert_eq!(status[0].method, Some("bot"));
    assert!(!status[1].configured);
    assert_eq!(status[2].method, Some("oauth2"));
}

#[tokio::test]
async fn test_test_all_cleans_up_every_canary() {
    let wire = Wire::new();
    let dispatcher = wire.dispatcher(TELEGRAM_BOT, VK_WALL, TWITTER_OAUTH2);

    let outcomes = dispatcher.test_all().await;

    assert!(outcomes.iter().all(|(_, outcome)| outcome.success));
    assert_eq!(wire.telegram.deleted().len(), 1);
    assert_eq!(wire.vk.delete_calls(), 1);
    assert_eq!(wire.twitter.delete_calls(), 1);
}
