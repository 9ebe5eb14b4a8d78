//! End-to-end dialogue and finalize scenarios against in-memory sinks

mod common;

use anyhow::Result;
use common::{button, captioned_photo, photo, submitter, text, MemoryHarness};
use uld_intake::dialogue::messages::{
    CANCEL, CONFIRM_PROCEED, CONFIRM_SUBMIT, DETAILS_MISSING, PHOTO_MISSING,
};
use uld_intake::dialogue::Event;
use uld_intake::ledger::{ACTIVITY_HEADER, MOVEMENT_HEADER};
use uld_intake::session::Stage;
use uld_intake::sinks::memory::PostedMessage;

#[tokio::test]
async fn test_inbound_submission_reaches_every_sink() -> Result<()> {
    let h = MemoryHarness::new();
    let who = submitter(1);

    h.bot.handle(&who, Event::StartCmd).await;
    h.bot.handle(&who, button("Inbound")).await;
    h.bot.handle(&who, text("CNT123\n5\nNone")).await;
    h.bot.handle(&who, photo("p1")).await;
    h.bot.handle(&who, photo("p2")).await;
    h.bot.handle(&who, button(CONFIRM_PROCEED)).await;
    assert_eq!(h.bot.stage(1).await, Stage::Confirm);

    let replies = h.bot.handle(&who, button(CONFIRM_SUBMIT)).await;
    assert_eq!(replies.last().map(|r| r.text.as_str()), Some("Submission complete!"));
    assert_eq!(h.bot.stage(1).await, Stage::Idle);

    let rows = h.ledger.rows("Inbound").await;
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0], MOVEMENT_HEADER.to_vec());
    let row = &rows[1];
    assert_eq!(row[1], "Checker 1 (@checker1)");
    assert_eq!(&row[2..5], &["CNT123", "5", "None"]);
    assert!(row[5].ends_with(".jpg"));
    assert!(row[6].ends_with(".jpg"));
    assert_eq!(&row[7..], &["", ""]);

    let files = h.store.files().await;
    assert_eq!(files.len(), 2);
    assert!(files[0].name.starts_with("photo_1_"));
    assert!(files[1].name.starts_with("photo_2_"));
    assert_eq!(h.store.folders_named("CNT123").await.len(), 1);

    assert_eq!(h.mailer.sent().await.len(), 1);
    assert_eq!(h.notifier.posts().await.len(), 1);

    let entries = h.journal.entries().await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].links.len(), 2);
    assert!(entries[0].failed_sinks.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_other_activity_label_is_recorded() -> Result<()> {
    let h = MemoryHarness::new();
    let who = submitter(2);

    h.bot.handle(&who, Event::StartCmd).await;
    h.bot.handle(&who, button("GeneralActivity")).await;
    h.bot.handle(&who, button("Others")).await;
    assert_eq!(h.bot.stage(2).await, Stage::CollectOtherActivityLabel);
    h.bot.handle(&who, text("Re-labeling")).await;
    assert_eq!(h.bot.stage(2).await, Stage::AwaitingData);

    let session = h.bot.sessions().get(2).await.expect("session");
    assert_eq!(session.partial.activity.as_deref(), Some("Re-labeling"));

    h.bot
        .handle(&who, captioned_photo("p1", "PO-77\n12 cartons\nrelabelled for export"))
        .await;
    h.bot.handle(&who, button(CONFIRM_PROCEED)).await;
    h.bot.handle(&who, button(CONFIRM_SUBMIT)).await;

    let rows = h.ledger.rows("General Activity").await;
    assert_eq!(rows[0], ACTIVITY_HEADER.to_vec());
    assert_eq!(rows[1][2], "PO-77");
    assert_eq!(rows[1][3], "Re-labeling");
    assert_eq!(rows[1][4], "Qty: 12 cartons; Notes: relabelled for export");
    assert_eq!(rows[1][8], rows[1][5]);

    let subject = &h.mailer.sent().await[0].subject;
    assert!(subject.starts_with("[GeneralActivity - Re-labeling] PO-77"));
    Ok(())
}

#[tokio::test]
async fn test_confirm_preconditions_are_enforced() -> Result<()> {
    let h = MemoryHarness::new();
    let who = submitter(3);

    h.bot.handle(&who, Event::StartCmd).await;
    h.bot.handle(&who, button("Outbound")).await;

    let replies = h.bot.handle(&who, button(CONFIRM_PROCEED)).await;
    assert_eq!(replies[0].text, PHOTO_MISSING);

    h.bot.handle(&who, text("CNT1\n1\nok")).await;
    let replies = h.bot.handle(&who, button(CONFIRM_PROCEED)).await;
    assert_eq!(replies[0].text, PHOTO_MISSING);

    let h = MemoryHarness::new();
    h.bot.handle(&who, Event::StartCmd).await;
    h.bot.handle(&who, button("Outbound")).await;
    h.bot.handle(&who, photo("p1")).await;
    let replies = h.bot.handle(&who, button(CONFIRM_PROCEED)).await;
    assert_eq!(replies[0].text, DETAILS_MISSING);
    assert_eq!(h.bot.stage(3).await, Stage::AwaitingData);
    Ok(())
}

#[tokio::test]
async fn test_cancel_clears_session_and_nothing_is_sent() -> Result<()> {
    let h = MemoryHarness::new();
    let who = submitter(4);

    h.bot.handle(&who, Event::StartCmd).await;
    h.bot.handle(&who, button("Inbound")).await;
    h.bot.handle(&who, text("CNT9\n2\nx")).await;
    h.bot.handle(&who, photo("p1")).await;
    h.bot.handle(&who, button(CONFIRM_PROCEED)).await;
    h.bot.handle(&who, button(CANCEL)).await;

    assert_eq!(h.bot.stage(4).await, Stage::Idle);
    assert!(h.bot.sessions().get(4).await.is_none());
    assert!(h.store.files().await.is_empty());
    assert!(h.notifier.posts().await.is_empty());

    h.bot.handle(&who, Event::StartCmd).await;
    let session = h.bot.sessions().get(4).await.expect("session");
    assert!(session.partial.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_malformed_details_do_not_advance() -> Result<()> {
    let h = MemoryHarness::new();
    let who = submitter(5);

    h.bot.handle(&who, Event::StartCmd).await;
    h.bot.handle(&who, button("Inbound")).await;
    h.bot.handle(&who, text("CNT1\n5")).await;
    h.bot.handle(&who, captioned_photo("p1", "only one line")).await;

    let session = h.bot.sessions().get(5).await.expect("session");
    assert!(session.partial.details.is_none());
    assert!(session.partial.photos.is_empty());
    assert_eq!(session.stage, Stage::AwaitingData);
    Ok(())
}

#[tokio::test]
async fn test_email_outage_is_isolated() -> Result<()> {
    let h = MemoryHarness::new();
    h.mailer.fail_with("relay unreachable").await;
    let who = submitter(6);

    h.bot.handle(&who, Event::StartCmd).await;
    h.bot.handle(&who, button("Outbound")).await;
    h.bot.handle(&who, captioned_photo("p1", "CNT5\n3\nnone")).await;
    h.bot.handle(&who, button(CONFIRM_PROCEED)).await;
    let replies = h.bot.handle(&who, button(CONFIRM_SUBMIT)).await;

    let texts: Vec<_> = replies.iter().map(|r| r.text.as_str()).collect();
    assert!(texts.contains(&"Submission complete!"));
    assert!(texts.iter().any(|t| t.contains("relay unreachable")));
    assert_eq!(h.ledger.rows("Outbound").await.len(), 2);
    assert!(matches!(
        h.notifier.posts().await.as_slice(),
        [PostedMessage::Album { .. }]
    ));
    assert_eq!(h.journal.entries().await[0].failed_sinks, vec!["email"]);
    assert_eq!(h.bot.stage(6).await, Stage::Idle);
    Ok(())
}

#[tokio::test]
async fn test_concurrent_submitters_share_reference_folder() -> Result<()> {
    let h = MemoryHarness::new();

    let mut handles = Vec::new();
    for id in 10..14 {
        let bot = h.bot.clone();
        handles.push(tokio::spawn(async move {
            let who = submitter(id);
            bot.handle(&who, Event::StartCmd).await;
            bot.handle(&who, button("Inbound")).await;
            bot.handle(&who, captioned_photo(&format!("p{id}"), "CNT-SHARED\n1\nok"))
                .await;
            bot.handle(&who, button(CONFIRM_PROCEED)).await;
            bot.handle(&who, button(CONFIRM_SUBMIT)).await
        }));
    }
    for handle in handles {
        handle.await?;
    }

    assert_eq!(h.store.folders_named("CNT-SHARED").await.len(), 1);
    assert_eq!(h.store.folders_named("Submissions").await.len(), 1);
    let rows = h.ledger.rows("Inbound").await;
    assert_eq!(rows.len(), 5);
    assert_eq!(rows.iter().filter(|r| r[0] == "Timestamp").count(), 1);
    assert_eq!(h.journal.entries().await.len(), 4);
    Ok(())
}
