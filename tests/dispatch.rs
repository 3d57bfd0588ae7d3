mod common;

use std::{sync::atomic::Ordering, time::Duration};

use chatdispatch::bot::{
    chat_event::chat_event::{ChannelId, ChatEvent, MessageId},
    permissions::permissions::PermissionLevel,
};
use chrono::TimeDelta;
use common::{Harness, Outgoing};

/// `event` edited to `content`, `secs` seconds after it was sent.
fn edited_after(event: &ChatEvent, content: &str, secs: i64) -> ChatEvent {
    let mut edited = event.edited(content);
    edited.edited_timestamp = Some(event.timestamp + TimeDelta::seconds(secs));
    edited
}

#[tokio::test(start_paused = true)]
async fn own_messages_are_ignored() {
    let h = Harness::new().await;
    let mut event = h.message("!echo loop");
    event.own_message = true;

    h.send(event).await;
    assert!(h.outgoing().is_empty());
}

#[tokio::test(start_paused = true)]
async fn unknown_command_gets_a_hint() {
    let h = Harness::new().await;
    h.say("!nope").await;
    assert_eq!(h.last_text(), "Unknown command. Use `!help` to view the list of all commands.");
}

#[tokio::test(start_paused = true)]
async fn unknown_command_can_stay_silent() {
    let mut config = common::test_config();
    config.unknown_command_response = false;
    let h = Harness::with_config(config).await;

    h.say("!nope").await;
    assert!(h.outgoing().is_empty());
}

#[tokio::test(start_paused = true)]
async fn mentions_work_as_prefix() {
    let h = Harness::new().await;

    h.say("<@bot> echo one").await;
    assert_eq!(h.last_text(), "one");
    h.say("<@!bot>echo two").await;
    assert_eq!(h.last_text(), "two");
    h.say("<@someone> echo three").await;
    assert_eq!(h.texts().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn direct_messages_accept_bare_command_names() {
    let h = Harness::new().await;

    h.send(h.direct("echo hi")).await;
    assert_eq!(h.last_text(), "hi");

    h.send(h.direct("hello there")).await;
    assert_eq!(h.texts().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn guard_failures_are_explained() {
    let h = Harness::new().await;

    h.say("!secret").await;
    assert_eq!(h.last_text(), "The `secret` command can only be used by the bot owner.");
    h.send(h.from("owner", "!secret")).await;
    assert_eq!(h.last_text(), "ran secret");

    h.send(h.direct("!serveronly")).await;
    assert_eq!(h.last_text(), "The `serveronly` command must be used in a server channel.");

    h.say("!spicy").await;
    assert_eq!(h.last_text(), "The `spicy` command can only be used in NSFW channels.");
    h.send(h.message("!spicy").nsfw(true)).await;
    assert_eq!(h.last_text(), "ran spicy");

    h.say("!modonly").await;
    assert_eq!(h.last_text(), "You need to be moderator to use the `modonly` command.");
    h.send(h.message("!modonly").with_permission(PermissionLevel::Administrator)).await;
    assert_eq!(h.last_text(), "ran modonly");
}

#[tokio::test(start_paused = true)]
async fn throttled_usage_reports_the_wait() {
    let h = Harness::new().await;

    h.say("!limited").await;
    h.say("!limited").await;
    assert_eq!(h.last_text(), "You may not use the `limited` command again for another 10.0 seconds.");
    assert_eq!(h.calls_of("limited").len(), 1);

    tokio::time::sleep(Duration::from_secs(11)).await;
    h.say("!limited").await;
    assert_eq!(h.calls_of("limited").len(), 2);
}

#[tokio::test(start_paused = true)]
async fn owners_are_not_throttled() {
    let h = Harness::new().await;
    for _ in 0..3 {
        h.send(h.from("owner", "!limited")).await;
    }
    assert_eq!(h.calls_of("limited").len(), 3);
}

#[tokio::test(start_paused = true)]
async fn denied_invocations_do_not_use_the_throttle() {
    let h = Harness::new().await;
    h.send(h.from("owner", "!disable limited")).await;
    h.say("!limited").await;
    assert_eq!(h.last_text(), "The `limited` command is disabled.");

    h.send(h.from("owner", "!enable limited")).await;
    h.say("!limited").await;
    assert_eq!(h.last_text(), "ran limited");
    assert_eq!(h.calls_of("limited").len(), 1);
}

#[tokio::test(start_paused = true)]
async fn edit_inside_window_rewrites_the_response() {
    let h = Harness::new().await;
    let original = h.say("!echo hello").await;

    h.send(original.edited("!echo goodbye")).await;

    let outgoing = h.outgoing();
    assert_eq!(outgoing.len(), 2);
    assert_eq!(
        outgoing[1],
        Outgoing::Edited { id: MessageId::new("r0"), channel: ChannelId::new("c1"), content: "goodbye".into() }
    );
    assert_eq!(h.calls_of("echo").len(), 2);
}

#[tokio::test(start_paused = true)]
async fn edit_after_window_is_ignored() {
    let h = Harness::new().await;
    let original = h.say("!echo hello").await;

    tokio::time::sleep(Duration::from_secs(31)).await;
    assert!(h.dispatcher.links().is_empty());

    h.send(edited_after(&original, "!echo goodbye", 31)).await;
    assert_eq!(h.outgoing().len(), 1);
    assert_eq!(h.calls_of("echo").len(), 1);
}

#[tokio::test(start_paused = true)]
async fn unchanged_edit_is_ignored() {
    let h = Harness::new().await;
    let original = h.say("!echo hello").await;

    h.send(original.edited("!echo hello")).await;
    assert_eq!(h.outgoing().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn editing_a_prompting_command_replaces_the_session() {
    let h = Harness::new().await;
    let original = h.say("!add 2").await;
    assert_eq!(h.dispatcher.pending_sessions(), 1);

    h.send(original.edited("!add 2 3")).await;

    assert_eq!(h.dispatcher.pending_sessions(), 0);
    let calls = h.calls_of("add");
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].integer("b"), Some(3));
    assert_eq!(
        h.outgoing().last(),
        Some(&Outgoing::Edited { id: MessageId::new("r0"), channel: ChannelId::new("c1"), content: "ran add".into() })
    );
    // the superseded session leaves without a cancellation message
    assert!(!h.texts().iter().any(|t| t.starts_with("Cancelled")));
}

#[tokio::test(start_paused = true)]
async fn command_edited_into_plain_text_removes_its_responses() {
    let h = Harness::new().await;
    let original = h.say("!echo hello").await;

    h.send(original.edited("never mind")).await;
    assert_eq!(
        h.outgoing().last(),
        Some(&Outgoing::Deleted { id: MessageId::new("r0"), channel: ChannelId::new("c1") })
    );
    assert!(h.dispatcher.links().get(&original.id).is_none());
    assert_eq!(h.calls_of("echo").len(), 1);

    // editing it back into a command runs it as a fresh one
    h.send(original.edited("!echo back")).await;
    assert_eq!(
        h.outgoing().last(),
        Some(&Outgoing::Sent { id: MessageId::new("r1"), channel: ChannelId::new("c1"), content: "back".into() })
    );
}

#[tokio::test(start_paused = true)]
async fn plain_message_edited_into_a_command_runs() {
    let h = Harness::new().await;
    let original = h.say("hello").await;
    assert!(h.outgoing().is_empty());

    h.send(original.edited("!echo hey")).await;
    assert_eq!(h.last_text(), "hey");
}

#[tokio::test(start_paused = true)]
async fn late_or_disabled_promotion_is_ignored() {
    let h = Harness::new().await;
    let original = h.say("hello").await;
    h.send(edited_after(&original, "!echo hey", 45)).await;
    assert!(h.outgoing().is_empty());

    let mut config = common::test_config();
    config.non_command_editable = false;
    let h = Harness::with_config(config).await;
    let original = h.say("hello").await;
    h.send(original.edited("!echo hey")).await;
    assert!(h.outgoing().is_empty());
}

#[tokio::test(start_paused = true)]
async fn failing_action_is_reported() {
    let h = Harness::new().await;
    h.say("!fail").await;

    let outgoing = h.outgoing();
    assert_eq!(outgoing.len(), 2);
    assert_eq!(outgoing[0].channel(), &ChannelId::new("c1"));
    assert_eq!(outgoing[0].content(), "An error occurred while running the command. The error has been reported.");
    assert_eq!(outgoing[1].channel(), &ChannelId::new("ops"));
    assert!(outgoing[1].content().contains("database is on fire"));
    assert!(outgoing[1].content().contains("`fail`"));
}

#[tokio::test(start_paused = true)]
async fn panicking_action_is_contained() {
    let h = Harness::new().await;
    h.say("!boom").await;

    let texts = h.texts();
    assert_eq!(texts[0], "An error occurred while running the command. The error has been reported.");
    assert!(texts[1].contains("kaboom"));

    h.say("!echo still alive").await;
    assert_eq!(h.last_text(), "still alive");
}

#[tokio::test(start_paused = true)]
async fn delivery_failures_are_not_fatal() {
    let h = Harness::new().await;
    h.client.fail.store(true, Ordering::SeqCst);

    h.dispatcher.handle_message(h.message("!echo lost")).await.unwrap();
    assert_eq!(h.calls_of("echo").len(), 1);
}
